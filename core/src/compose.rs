use crate::document::{XmlDocument, XmlElement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use time::OffsetDateTime;

pub const DEFAULT_ID_PREFIX: &str = "org.open-scap";

const SCAP_VERSION: &str = "1.2";
const SCHEMATRON_VERSION: &str = "1.2";
const USE_CASE: &str = "OTHER";

/// Logical name under which the XCCDF content refers to its companion OVAL
/// file; the catalog maps it to the OVAL component reference.
const OVAL_CATALOG_NAME: &str = "oval.xml";

/// Namespace URIs used by the assembled datastream. Passed explicitly to the
/// composer rather than registered in any process-wide serializer state, so
/// concurrent invocations cannot observe each other.
#[derive(Debug, Clone)]
pub struct Namespaces {
    pub source: String,
    pub xlink: String,
    pub catalog: String,
}

impl Namespaces {
    pub fn scap_1_2() -> Self {
        Self {
            source: "http://scap.nist.gov/schema/scap/source/1.2".to_string(),
            xlink: "http://www.w3.org/1999/xlink".to_string(),
            catalog: "urn:oasis:names:tc:entity:xmlns:xml:catalog".to_string(),
        }
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::scap_1_2()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(
        "XCCDF and OVAL inputs share the basename '{0}'; \
         the generated component ids would collide"
    )]
    BasenameCollision(String),
}

/// Assembles a SCAP 1.2 `data-stream-collection` tree from two parsed
/// input documents.
#[derive(Debug)]
pub struct Composer {
    id_prefix: String,
    namespaces: Namespaces,
}

/// The assembled tree plus the identifiers that went into it.
#[derive(Debug)]
pub struct Composition {
    pub collection: XmlElement,
    pub summary: ComposeSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeSummary {
    pub collection_id: String,
    pub datastream_id: String,
    pub xccdf_component_id: String,
    pub xccdf_ref_id: String,
    pub oval_component_id: String,
    pub oval_ref_id: String,
    pub timestamp: String,
}

impl fmt::Display for ComposeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collection: {}", self.collection_id)?;
        writeln!(f, "Datastream: {}", self.datastream_id)?;
        writeln!(
            f,
            "  checklist: {} -> {}",
            self.xccdf_ref_id, self.xccdf_component_id
        )?;
        writeln!(
            f,
            "  check:     {} -> {}",
            self.oval_ref_id, self.oval_component_id
        )?;
        write!(f, "Timestamp: {}", self.timestamp)
    }
}

impl Composer {
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            namespaces: Namespaces::scap_1_2(),
        }
    }

    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Build the full collection tree. The timestamp is captured once per
    /// run by the caller and shared by both embedded components.
    pub fn compose(
        &self,
        xccdf: &XmlDocument,
        oval: &XmlDocument,
        timestamp: &str,
    ) -> Result<Composition, ComposeError> {
        let xccdf_base = basename(&xccdf.path);
        let oval_base = basename(&oval.path);
        if xccdf_base == oval_base {
            return Err(ComposeError::BasenameCollision(xccdf_base));
        }

        let summary = ComposeSummary {
            collection_id: format!(
                "scap_{}_collection_from_xccdf_{}",
                self.id_prefix, xccdf_base
            ),
            datastream_id: format!(
                "scap_{}_datastream_from_xccdf_{}",
                self.id_prefix, xccdf_base
            ),
            xccdf_component_id: component_id(&self.id_prefix, &xccdf.path),
            xccdf_ref_id: ref_id(&self.id_prefix, &xccdf.path),
            oval_component_id: component_id(&self.id_prefix, &oval.path),
            oval_ref_id: ref_id(&self.id_prefix, &oval.path),
            timestamp: timestamp.to_string(),
        };

        let mut checklist_ref = XmlElement::new("component-ref")
            .with_attribute("id", &summary.xccdf_ref_id)
            .with_attribute("xlink:href", format!("#{}", summary.xccdf_component_id));
        let mut catalog = XmlElement::new("cat:catalog");
        catalog.push_element(
            XmlElement::new("cat:uri")
                .with_attribute("name", OVAL_CATALOG_NAME)
                .with_attribute("uri", format!("#{}", summary.oval_ref_id)),
        );
        checklist_ref.push_element(catalog);

        let check_ref = XmlElement::new("component-ref")
            .with_attribute("id", &summary.oval_ref_id)
            .with_attribute("xlink:href", format!("#{}", summary.oval_component_id));

        let mut checklists = XmlElement::new("checklists");
        checklists.push_element(checklist_ref);
        let mut checks = XmlElement::new("checks");
        checks.push_element(check_ref);

        let mut data_stream = XmlElement::new("data-stream")
            .with_attribute("id", &summary.datastream_id)
            .with_attribute("scap-version", SCAP_VERSION)
            .with_attribute("use-case", USE_CASE);
        data_stream.push_element(checklists);
        data_stream.push_element(checks);

        let mut collection = XmlElement::new("data-stream-collection")
            .with_attribute("xmlns", &self.namespaces.source)
            .with_attribute("xmlns:xlink", &self.namespaces.xlink)
            .with_attribute("xmlns:cat", &self.namespaces.catalog)
            .with_attribute("id", &summary.collection_id)
            .with_attribute("schematron-version", SCHEMATRON_VERSION);
        collection.push_element(data_stream);

        // Components are direct children of the collection, XCCDF first.
        for (document, id) in [
            (xccdf, &summary.xccdf_component_id),
            (oval, &summary.oval_component_id),
        ] {
            let mut component = XmlElement::new("component")
                .with_attribute("id", id)
                .with_attribute("timestamp", timestamp);
            component.push_element(document.root.clone());
            collection.push_element(component);
        }

        Ok(Composition {
            collection,
            summary,
        })
    }
}

/// `scap_<prefix>_comp_<basename>`, reproducible across runs.
pub fn component_id(prefix: &str, path: &Path) -> String {
    format!("scap_{}_comp_{}", prefix, basename(path))
}

/// `scap_<prefix>_cref_<basename>`, reproducible across runs.
pub fn ref_id(prefix: &str, path: &Path) -> String {
    format!("scap_{}_cref_{}", prefix, basename(path))
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// One wall-clock capture per run, shared by both embedded components.
pub fn run_timestamp() -> String {
    let format =
        time::format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]");
    match format {
        Ok(format) => OffsetDateTime::now_utc()
            .format(&format)
            .unwrap_or_else(|_| "unknown".to_string()),
        Err(_) => "unknown".to_string(),
    }
}
