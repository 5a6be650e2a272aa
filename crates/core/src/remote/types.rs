use serde::{Deserialize, Serialize};

/// One entry of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Path relative to the listed root, starting with `/`.
    pub path: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub is_directory: bool,
}

impl RemoteFile {
    /// Whether this entry passes the content type filter. An empty filter
    /// accepts every file.
    pub fn matches_content_types(&self, content_types: &[String]) -> bool {
        !self.is_directory
            && (content_types.is_empty() || content_types.iter().any(|t| t == &self.content_type))
    }
}
