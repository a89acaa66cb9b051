use serde::{Deserialize, Serialize};

/// Account shown next to reviews and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name, falling back to the backend login when no name is set.
    pub name: String,
    /// Avatar image location when the backend exposes one.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            avatar_url,
        }
    }
}

/// Overall verdict of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// No decisive verdict yet.
    #[default]
    Pending,
    /// At least one reviewer approved and nobody rejected.
    Approved,
    /// At least one reviewer requested changes.
    Rejected,
}

impl ReviewState {
    /// Fold individual reviewer verdicts into a review state.
    ///
    /// A single rejection wins over any number of approvals.
    pub fn aggregate(verdicts: impl IntoIterator<Item = Self>) -> Self {
        verdicts
            .into_iter()
            .fold(Self::Pending, |state, verdict| match (state, verdict) {
                (Self::Rejected, _) | (_, Self::Rejected) => Self::Rejected,
                (Self::Approved, _) | (_, Self::Approved) => Self::Approved,
                _ => Self::Pending,
            })
    }
}

/// A code review, pull request, or merge request normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Provider-scoped identifier, passed back for discussion and file lookups.
    pub id: String,
    /// Review title.
    pub title: String,
    /// Source branch under review, empty when unknown.
    #[serde(default)]
    pub branch_name: String,
    /// Authors of the change.
    #[serde(default)]
    pub authors: Vec<User>,
    /// Requested or participating reviewers.
    #[serde(default)]
    pub reviewers: Vec<User>,
    /// Whether the review is still open.
    pub open: bool,
    /// Aggregated reviewer verdict.
    #[serde(default)]
    pub state: ReviewState,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: Option<u64>,
    /// Last update time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub updated_at: Option<u64>,
}
