mod error;
mod session;

pub use error::CoreError;
pub use session::{open, ReviewSession};

#[allow(
    clippy::doc_markdown,
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::empty_line_after_doc_comments,
    clippy::missing_safety_doc
)]
mod scaffolding {
    use super::{open, CoreError, ReviewSession};
    use crate::{
        ChangeType, ProviderModule, ProviderSettings, Review, ReviewComment, ReviewDiscussion,
        ReviewFileChanges, ReviewFileDiscussion, ReviewFileSummary, ReviewState, User,
    };

    uniffi::include_scaffolding!("loupe_core");
}

pub use scaffolding::*;
