use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// An element in the owned XML tree. Names and attribute keys are kept
/// verbatim, including namespace prefixes and `xmlns` declarations, so a
/// parsed document can be re-serialized without altering its content.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_attribute(key, value);
        self
    }

    pub fn push_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    pub fn push_child(&mut self, node: XmlNode) {
        self.children.push(node);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text and comment nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }
}

/// A parsed input document bound to the path it was read from. The path is
/// what identifier generation derives its basename from.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub path: PathBuf,
    pub root: XmlElement,
}

/// Structural failures while building the tree from reader events.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),
    #[error("unexpected end of document (unclosed element '{0}')")]
    UnclosedElement(String),
    #[error("no root element found")]
    MissingRoot,
    #[error("content outside the root element")]
    ContentOutsideRoot,
}

/// A document that could not be loaded, with the offending path attached.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("XML parse error in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: XmlError,
    },
}

/// Read and parse an input document, wrapping any failure with the path.
pub fn parse_document(path: &Path) -> Result<XmlDocument, ParseError> {
    let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root = parse_source(&source).map_err(|source| ParseError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(XmlDocument {
        path: path.to_path_buf(),
        root,
    })
}

/// Parse a well-formed XML document into an owned element tree.
///
/// Whitespace-only text is dropped (the composer re-indents everything on
/// output); other text and attribute values are unescaped, CDATA sections
/// become text, and comments are preserved. The XML declaration, doctype,
/// and processing instructions are not part of the tree.
pub fn parse_source(source: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::ContentOutsideRoot);
                }
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.push_element(element),
                    None if root.is_none() => root = Some(element),
                    None => return Err(XmlError::ContentOutsideRoot),
                }
            }
            Event::End(_) => {
                // Mismatched end tags are rejected by the reader itself
                // before we get here.
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.push_element(element),
                        None => root = Some(element),
                    }
                }
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(quick_xml::Error::from)?.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.push_child(XmlNode::Text(value)),
                    None => return Err(XmlError::ContentOutsideRoot),
                }
            }
            Event::CData(cdata) => {
                let value = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.push_child(XmlNode::Text(value)),
                    None => return Err(XmlError::ContentOutsideRoot),
                }
            }
            Event::Comment(comment) => {
                let value = String::from_utf8_lossy(comment.as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(XmlNode::Comment(value));
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => {
                if let Some(open) = stack.last() {
                    return Err(XmlError::UnclosedElement(open.name.clone()));
                }
                return root.ok_or(XmlError::MissingRoot);
            }
        }
    }
}

fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(quick_xml::Error::from)?
            .into_owned();
        element.push_attribute(key, value);
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_attributes() {
        let root = parse_source(
            r#"<?xml version="1.0"?>
<Benchmark xmlns="http://checklists.nist.gov/xccdf/1.2" id="xccdf_bench">
  <title>Example</title>
  <Rule id="rule-1" severity="high"/>
</Benchmark>"#,
        )
        .expect("well-formed document");

        assert_eq!(root.name, "Benchmark");
        assert_eq!(
            root.attribute("xmlns"),
            Some("http://checklists.nist.gov/xccdf/1.2")
        );
        assert_eq!(root.attribute("id"), Some("xccdf_bench"));

        let children: Vec<_> = root.child_elements().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "title");
        assert_eq!(children[0].children, vec![XmlNode::Text("Example".into())]);
        assert_eq!(children[1].attribute("severity"), Some("high"));
    }

    #[test]
    fn unescapes_text_and_attribute_values() {
        let root = parse_source(r#"<a note="x &amp; y">1 &lt; 2</a>"#).expect("parse");
        assert_eq!(root.attribute("note"), Some("x & y"));
        assert_eq!(root.children, vec![XmlNode::Text("1 < 2".into())]);
    }

    #[test]
    fn drops_whitespace_only_text() {
        let root = parse_source("<a>\n  <b/>\n</a>").expect("parse");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn keeps_comments_and_cdata() {
        let root = parse_source("<a><!-- note --><![CDATA[1 < 2]]></a>").expect("parse");
        assert_eq!(
            root.children,
            vec![
                XmlNode::Comment(" note ".into()),
                XmlNode::Text("1 < 2".into()),
            ]
        );
    }

    #[test]
    fn rejects_mismatched_end_tag() {
        assert!(parse_source("<a><b></a>").is_err());
    }

    #[test]
    fn rejects_unclosed_root() {
        let err = parse_source("<a><b></b>").expect_err("truncated document");
        assert!(matches!(err, XmlError::UnclosedElement(name) if name == "a"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(parse_source(""), Err(XmlError::MissingRoot)));
    }

    #[test]
    fn rejects_second_root_element() {
        assert!(matches!(
            parse_source("<a/><b/>"),
            Err(XmlError::ContentOutsideRoot)
        ));
    }

    #[test]
    fn parse_document_names_the_file_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.xml");
        fs::write(&path, "<a><b></a>").expect("write");

        let err = parse_document(&path).expect_err("malformed input");
        assert!(err.to_string().contains("broken.xml"));
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn parse_document_reports_missing_file() {
        let err = parse_document(Path::new("/nonexistent/input.xml")).expect_err("missing file");
        assert!(matches!(err, ParseError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/input.xml"));
    }
}
