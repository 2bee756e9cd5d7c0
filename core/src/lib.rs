pub mod compose;
pub mod document;
pub mod format;

pub use compose::{
    component_id, ref_id, run_timestamp, ComposeError, ComposeSummary, Composer, Composition,
    Namespaces, DEFAULT_ID_PREFIX,
};
pub use document::{
    parse_document, parse_source, ParseError, XmlDocument, XmlElement, XmlError, XmlNode,
};
pub use format::{render, FormatOptions, XML_DECLARATION};
