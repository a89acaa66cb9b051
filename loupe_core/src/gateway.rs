use std::sync::Arc;

use loupe_api::{ProviderSettings, Review, ReviewDiscussion, ReviewFileChanges, ReviewFileSummary};
use loupe_provider_api::{ProviderResult, ReviewProvider};
use loupe_providers::ProviderClient;
use tracing::{debug, instrument};

use crate::read_state::{ReadStateKey, ReadStateStore};
use crate::registry::ProviderRegistry;
use crate::{Error, Result};

/// High-level façade dispatching review requests to provider clients.
///
/// Every call is an independent round trip: resolve the provider in the
/// current registry generation, invoke the client, then annotate file results
/// with the locally tracked read state. Backend read flags are only trusted
/// when remote sync is enabled.
#[derive(Clone)]
pub struct ReviewGateway {
    registry: Arc<ProviderRegistry>,
    read_state: Arc<ReadStateStore>,
    sync_remote_read_state: bool,
}

impl ReviewGateway {
    /// Create a gateway over `registry` and `read_state`.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, read_state: Arc<ReadStateStore>) -> Self {
        Self {
            registry,
            read_state,
            sync_remote_read_state: false,
        }
    }

    /// Also push read markers to backends that support them.
    #[must_use]
    pub fn with_remote_read_state(mut self, enabled: bool) -> Self {
        self.sync_remote_read_state = enabled;
        self
    }

    /// Settings of every configured provider.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderSettings> {
        self.registry.providers()
    }

    /// List the reviews visible to a provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for unknown ids or propagates provider failures.
    #[instrument(skip(self))]
    pub fn get_reviews(&self, provider_id: &str) -> Result<Vec<Review>> {
        let client = self.client(provider_id)?;
        let reviews = Self::invoke(provider_id, client.list_reviews())?;
        debug!(count = reviews.len(), "listed reviews");
        Ok(reviews)
    }

    /// List the discussions of one review.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for unknown ids or propagates provider failures.
    #[instrument(skip(self))]
    pub fn get_review_discussions(
        &self,
        provider_id: &str,
        review_id: &str,
    ) -> Result<Vec<ReviewDiscussion>> {
        let client = self.client(provider_id)?;
        Self::invoke(provider_id, client.list_discussions(review_id))
    }

    /// List the changed files of one review, annotated with read state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for unknown ids, provider failures,
    /// or [`Error::Storage`] when read state cannot be consulted.
    #[instrument(skip(self))]
    pub fn get_review_file_summaries(
        &self,
        provider_id: &str,
        review_id: &str,
    ) -> Result<Vec<ReviewFileSummary>> {
        let client = self.client(provider_id)?;
        let mut files = Self::invoke(provider_id, client.list_file_summaries(review_id))?;
        for file in &mut files {
            let key = ReadStateKey::new(provider_id, review_id, &file.file_path, &file.revision_id);
            file.is_read = self.annotate(&key, file.is_read)?;
        }
        Ok(files)
    }

    /// Fetch one file of a review, annotated with read state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for unknown ids, provider failures,
    /// or [`Error::Storage`] when read state cannot be consulted.
    #[instrument(skip(self))]
    pub fn get_review_file(
        &self,
        provider_id: &str,
        review_id: &str,
        file_path: &str,
        revision: &str,
    ) -> Result<ReviewFileChanges> {
        let client = self.client(provider_id)?;
        let mut file = Self::invoke(provider_id, client.fetch_file(review_id, file_path, revision))?;
        let key = ReadStateKey::new(provider_id, review_id, file_path, revision);
        file.is_read = self.annotate(&key, file.is_read)?;
        Ok(file)
    }

    /// Record the read flag of one file.
    ///
    /// The flag is always stored locally first. When remote sync is enabled
    /// and the backend keeps its own markers, the flag is then pushed there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for unknown ids, [`Error::Storage`]
    /// when the local write fails, or the provider failure of a remote push.
    #[instrument(skip(self))]
    pub fn mark_file_read(
        &self,
        provider_id: &str,
        review_id: &str,
        file_path: &str,
        revision: &str,
        read: bool,
    ) -> Result<()> {
        let client = self.client(provider_id)?;
        let key = ReadStateKey::new(provider_id, review_id, file_path, revision);
        self.read_state.set(&key, read)?;

        if self.sync_remote_read_state && client.supports_remote_read_state() {
            debug!("pushing read marker to backend");
            Self::invoke(
                provider_id,
                client.set_remote_read_state(review_id, file_path, revision, read),
            )?;
        }
        Ok(())
    }

    /// Replace the configured providers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming every rejected entry.
    #[instrument(skip_all, fields(count = modules.len()))]
    pub fn configure_modules(&self, modules: Vec<ProviderSettings>) -> Result<()> {
        self.registry.configure(modules)
    }

    fn client(&self, provider_id: &str) -> Result<Arc<ProviderClient>> {
        self.registry.resolve(provider_id)
    }

    /// A local marker always wins. Without one a file is unread, unless remote
    /// sync is on, in which case the backend's own flag is reported.
    fn annotate(&self, key: &ReadStateKey, backend_flag: bool) -> Result<bool> {
        let fallback = self.sync_remote_read_state && backend_flag;
        Ok(self.read_state.lookup(key)?.unwrap_or(fallback))
    }

    fn invoke<T>(provider_id: &str, result: ProviderResult<T>) -> Result<T> {
        result.map_err(|source| Error::Provider {
            provider: provider_id.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for ReviewGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.registry.snapshot();
        let provider_ids: Vec<&str> = snapshot.ids().collect();
        f.debug_struct("ReviewGateway")
            .field("providers", &provider_ids)
            .field("sync_remote_read_state", &self.sync_remote_read_state)
            .finish_non_exhaustive()
    }
}
