use serde::{Deserialize, Serialize};

use super::file::split_file_path;
use super::review::User;

/// A single message inside a discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Backend identifier of the comment.
    pub id: String,
    /// Comment author.
    pub user: User,
    /// Markdown or plain-text body.
    pub text: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// File anchor of an inline discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFileDiscussion {
    /// Last path component.
    pub file_name: String,
    /// Full path relative to the repository root.
    pub file_path: String,
    /// Directory components leading to `file_name`.
    #[serde(default)]
    pub file_path_segments: Vec<String>,
    /// Revision the discussion was started on.
    #[serde(default)]
    pub revision: Option<String>,
    /// 1-based line number when the backend reports one.
    #[serde(default)]
    pub line: Option<u32>,
}

impl ReviewFileDiscussion {
    /// Build an anchor from a repository-relative path.
    pub fn new(file_path: impl Into<String>, revision: Option<String>, line: Option<u32>) -> Self {
        let file_path = file_path.into();
        let (file_path_segments, file_name) = split_file_path(&file_path);
        Self {
            file_name,
            file_path,
            file_path_segments,
            revision,
            line,
        }
    }
}

/// A comment thread attached to a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDiscussion {
    /// Backend identifier of the thread.
    pub id: String,
    /// Distinct comment authors in order of first appearance.
    #[serde(default)]
    pub participants: Vec<User>,
    /// Comments ordered oldest first.
    #[serde(default)]
    pub comments: Vec<ReviewComment>,
    /// Whether the thread has been resolved.
    #[serde(default)]
    pub resolved: bool,
    /// Inline anchor, absent for review-level threads.
    #[serde(default)]
    pub file: Option<ReviewFileDiscussion>,
}

impl ReviewDiscussion {
    /// Assemble a discussion, sorting comments and deriving participants.
    pub fn new(
        id: impl Into<String>,
        mut comments: Vec<ReviewComment>,
        resolved: bool,
        file: Option<ReviewFileDiscussion>,
    ) -> Self {
        comments.sort_by_key(|comment| comment.timestamp);

        let mut participants: Vec<User> = Vec::new();
        for comment in &comments {
            if !participants.iter().any(|user| user.name == comment.user.name) {
                participants.push(comment.user.clone());
            }
        }

        Self {
            id: id.into(),
            participants,
            comments,
            resolved,
            file,
        }
    }
}
