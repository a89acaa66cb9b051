use serde::{Deserialize, Serialize};

/// Kind of change applied to a file within a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// File was created.
    Added,
    /// File was deleted.
    Removed,
    /// File content or location changed.
    Modified,
}

/// Per-file change metadata inside a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFileSummary {
    /// Last path component.
    pub file_name: String,
    /// Full path relative to the repository root.
    pub file_path: String,
    /// Directory components leading to `file_name`.
    #[serde(default)]
    pub file_path_segments: Vec<String>,
    /// Revision to pass back when fetching the file.
    pub revision_id: String,
    /// Number of added lines.
    #[serde(default)]
    pub added_lines: u32,
    /// Number of removed lines.
    #[serde(default)]
    pub removed_lines: u32,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Whether the file has been marked read.
    #[serde(default)]
    pub is_read: bool,
}

impl ReviewFileSummary {
    /// Build an unread summary for `file_path`, deriving name and segments.
    pub fn new(
        file_path: impl Into<String>,
        revision_id: impl Into<String>,
        change_type: ChangeType,
        added_lines: u32,
        removed_lines: u32,
    ) -> Self {
        let file_path = file_path.into();
        let (file_path_segments, file_name) = split_file_path(&file_path);
        Self {
            file_name,
            file_path,
            file_path_segments,
            revision_id: revision_id.into(),
            added_lines,
            removed_lines,
            change_type,
            is_read: false,
        }
    }
}

/// Content of one file at one revision of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewFileChanges {
    /// File text or inline diff, depending on the backend.
    pub text: String,
    /// Whether the file has been marked read.
    #[serde(default)]
    pub is_read: bool,
}

impl ReviewFileChanges {
    /// Unread content wrapper.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_read: false,
        }
    }
}

/// Split a slash-separated path into its directory segments and file name.
///
/// Empty segments (leading, trailing, or doubled slashes) are ignored.
pub fn split_file_path(path: &str) -> (Vec<String>, String) {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect();
    let file_name = segments.pop().unwrap_or_default();
    (segments, file_name)
}
