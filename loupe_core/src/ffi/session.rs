use std::sync::Arc;

use tracing::{error, info};

use crate::{
    logging, Bridge, CoreConfig, Operation, ProviderRegistry, ProviderSettings, ReadStateStore,
    Response, Review, ReviewDiscussion, ReviewFileChanges, ReviewFileSummary, ReviewGateway,
};

use super::CoreError;

type Result<T> = std::result::Result<T, CoreError>;

/// High-level handle exposed to Swift via `UniFFI`.
#[derive(Debug)]
pub struct ReviewSession {
    bridge: Bridge,
    gateway: Arc<ReviewGateway>,
}

impl ReviewSession {
    /// Build a session from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the read-state database cannot be opened.
    pub fn with_config(config: &CoreConfig) -> crate::Result<Self> {
        let read_state = ReadStateStore::open(&config.data_dir)?;
        let registry = ProviderRegistry::new(config.endpoints.clone());
        let gateway = Arc::new(
            ReviewGateway::new(Arc::new(registry), Arc::new(read_state))
                .with_remote_read_state(config.sync_remote_read_state),
        );

        Ok(Self {
            bridge: Bridge::new(Arc::clone(&gateway)),
            gateway,
        })
    }

    /// List the reviews visible to a provider.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown providers or the provider's failure.
    pub async fn get_reviews(&self, provider_id: String) -> Result<Vec<Review>> {
        match self.call(Operation::GetReviews { provider_id }).await? {
            Response::Reviews(reviews) => Ok(reviews),
            other => Err(unexpected(&other)),
        }
    }

    /// List the discussions of a review.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown providers or the provider's failure.
    pub async fn get_review_discussions(
        &self,
        provider_id: String,
        review_id: String,
    ) -> Result<Vec<ReviewDiscussion>> {
        let operation = Operation::GetReviewDiscussions {
            provider_id,
            review_id,
        };
        match self.call(operation).await? {
            Response::Discussions(discussions) => Ok(discussions),
            other => Err(unexpected(&other)),
        }
    }

    /// List the changed files of a review with their read flags.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown providers, the provider's failure, or `Storage`.
    pub async fn get_review_file_summaries(
        &self,
        provider_id: String,
        review_id: String,
    ) -> Result<Vec<ReviewFileSummary>> {
        let operation = Operation::GetReviewFileSummaries {
            provider_id,
            review_id,
        };
        match self.call(operation).await? {
            Response::FileSummaries(files) => Ok(files),
            other => Err(unexpected(&other)),
        }
    }

    /// Fetch one file of a review with its read flag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown providers, the provider's failure, or `Storage`.
    pub async fn get_review_file(
        &self,
        provider_id: String,
        review_id: String,
        file_path: String,
        revision: String,
    ) -> Result<ReviewFileChanges> {
        let operation = Operation::GetReviewFile {
            provider_id,
            review_id,
            file_path,
            revision,
        };
        match self.call(operation).await? {
            Response::File(file) => Ok(file),
            other => Err(unexpected(&other)),
        }
    }

    /// Record the read flag of one file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown providers or `Storage` when the write fails.
    pub async fn mark_file_read(
        &self,
        provider_id: String,
        review_id: String,
        file_path: String,
        revision: String,
        read: bool,
    ) -> Result<()> {
        let operation = Operation::MarkFileRead {
            provider_id,
            review_id,
            file_path,
            revision,
            read,
        };
        self.acknowledged(operation).await
    }

    /// Replace every configured provider.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when any entry is rejected; the previous
    /// providers stay active in that case.
    pub async fn configure_modules(&self, modules: Vec<ProviderSettings>) -> Result<()> {
        self.acknowledged(Operation::ConfigureModules { modules }).await
    }

    /// Settings of the configured providers.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderSettings> {
        self.gateway.providers()
    }

    async fn acknowledged(&self, operation: Operation) -> Result<()> {
        match self.call(operation).await? {
            Response::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    async fn call(&self, operation: Operation) -> Result<Response> {
        let reply = self.bridge.submit(operation);
        match reply.await {
            Ok(outcome) => outcome.map_err(CoreError::from),
            Err(_canceled) => {
                error!("request worker exited without replying");
                Err(CoreError::Internal)
            }
        }
    }
}

fn unexpected(response: &Response) -> CoreError {
    error!(?response, "bridge answered with a mismatched response");
    CoreError::Internal
}

/// Open a review session via the `UniFFI` namespace function.
///
/// Configuration comes from the environment on top of defaults rooted at
/// `data_dir`; logging is initialized on first open.
///
/// # Errors
///
/// Returns an error when the configuration is invalid or the read-state
/// database cannot be opened.
pub fn open(data_dir: String) -> Result<Arc<ReviewSession>> {
    let config = CoreConfig::from_env(data_dir).map_err(CoreError::from)?;
    logging::init(&config.log_filter);
    info!(data_dir = %config.data_dir.display(), "opening review session");

    let session = ReviewSession::with_config(&config).map_err(CoreError::from)?;
    Ok(Arc::new(session))
}
