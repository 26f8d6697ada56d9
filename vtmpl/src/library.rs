//! Content library element state.

/// Content version govc reports for an element left behind by an import that
/// never completed. Such an element cannot be deployed and has to be
/// re-imported.
// TODO: confirm against vCenter 8 that a healthy first import never reports "1".
pub const CORRUPTED_CONTENT_VERSION: &str = "1";

/// State of an OVA-derived element in a content library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryElementState {
    Absent,
    Corrupted,
    Valid(String),
}

impl LibraryElementState {
    /// Classify the raw content version returned by the library.
    pub fn classify(content_version: Option<&str>) -> Self {
        match content_version {
            None => LibraryElementState::Absent,
            Some(CORRUPTED_CONTENT_VERSION) => LibraryElementState::Corrupted,
            Some(version) => LibraryElementState::Valid(version.to_string()),
        }
    }

    pub fn needs_import(&self) -> bool {
        !matches!(self, LibraryElementState::Valid(_))
    }
}

/// Path of a template inside a content library.
pub fn element_path(library: &str, name: &str) -> String {
    format!("{}/{}", library.trim_end_matches('/'), name)
}
