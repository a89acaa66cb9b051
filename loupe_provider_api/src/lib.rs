mod types;

pub use loupe_api::ProviderKind;
pub use types::{ProviderError, ProviderResult};

use loupe_api::{Review, ReviewDiscussion, ReviewFileChanges, ReviewFileSummary};

/// Capability set implemented once per review backend.
///
/// Implementations normalize backend payloads into the shared `loupe_api`
/// shapes and translate every failure into [`ProviderError`].
pub trait ReviewProvider: Send + Sync {
    /// Backend kind served by this client.
    fn kind(&self) -> ProviderKind;

    /// List the reviews visible to the configured account.
    ///
    /// # Errors
    ///
    /// Implementors surface transport and backend failures.
    fn list_reviews(&self) -> ProviderResult<Vec<Review>>;

    /// List comment threads of a review.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] for unknown or malformed review ids.
    fn list_discussions(&self, review_id: &str) -> ProviderResult<Vec<ReviewDiscussion>>;

    /// List changed files of a review.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] for unknown or malformed review ids.
    fn list_file_summaries(&self, review_id: &str) -> ProviderResult<Vec<ReviewFileSummary>>;

    /// Fetch one file of a review at `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] when the file or revision does not exist.
    fn fetch_file(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
    ) -> ProviderResult<ReviewFileChanges>;

    /// Whether the backend keeps its own per-file read markers.
    fn supports_remote_read_state(&self) -> bool {
        false
    }

    /// Push a read marker to the backend. Backends without markers ignore it.
    ///
    /// # Errors
    ///
    /// Implementors surface transport and backend failures.
    fn set_remote_read_state(
        &self,
        _review_id: &str,
        _file_path: &str,
        _revision: &str,
        _read: bool,
    ) -> ProviderResult<()> {
        Ok(())
    }
}
