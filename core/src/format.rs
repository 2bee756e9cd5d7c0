use crate::document::{XmlElement, XmlNode};
use quick_xml::escape::{escape, partial_escape};

/// Declaration emitted as the first line of every rendered document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub indent_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { indent_width: 2 }
    }
}

/// Serialize an element tree to its final text form in one pass.
///
/// The output starts with the UTF-8 declaration, indents by
/// `indent_width` spaces per depth, self-closes childless elements, keeps
/// an element whose only child is text on a single line, and contains no
/// blank lines. Interior whitespace runs in text and comments (including
/// newlines) collapse to single spaces. Names are written verbatim, so no
/// synthetic namespace prefix can appear. Ends with a trailing newline.
pub fn render(root: &XmlElement, options: &FormatOptions) -> String {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    out.push('\n');
    render_element(root, 0, options, &mut out);
    out
}

fn render_element(element: &XmlElement, depth: usize, options: &FormatOptions, out: &mut String) {
    let pad = " ".repeat(depth * options.indent_width);

    out.push_str(&pad);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    match element.children.as_slice() {
        [] => {
            out.push_str("/>\n");
        }
        [XmlNode::Text(text)] => {
            out.push('>');
            out.push_str(&partial_escape(collapse_whitespace(text).as_str()));
            out.push_str("</");
            out.push_str(&element.name);
            out.push_str(">\n");
        }
        children => {
            out.push_str(">\n");
            let child_pad = " ".repeat((depth + 1) * options.indent_width);
            for child in children {
                match child {
                    XmlNode::Element(child) => render_element(child, depth + 1, options, out),
                    XmlNode::Text(text) => {
                        let collapsed = collapse_whitespace(text);
                        if !collapsed.is_empty() {
                            out.push_str(&child_pad);
                            out.push_str(&partial_escape(collapsed.as_str()));
                            out.push('\n');
                        }
                    }
                    XmlNode::Comment(comment) => {
                        out.push_str(&child_pad);
                        out.push_str("<!--");
                        out.push_str(&collapse_whitespace(comment));
                        out.push_str("-->\n");
                    }
                }
            }
            out.push_str(&pad);
            out.push_str("</");
            out.push_str(&element.name);
            out.push_str(">\n");
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
