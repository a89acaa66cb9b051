//! Asynchronous request/reply bridge in front of the [`ReviewGateway`].
//!
//! Each submitted [`Operation`] runs on its own named worker thread and its
//! outcome is delivered once through a [`ReplyPort`]. Callers await the
//! returned [`Reply`] and never block on each other's backend round trips.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use futures::channel::oneshot;
use loupe_api::{ProviderSettings, Review, ReviewDiscussion, ReviewFileChanges, ReviewFileSummary};
use tracing::{debug, error};

use crate::gateway::ReviewGateway;
use crate::{wire, Result};

/// One call across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// List reviews of a provider.
    GetReviews {
        /// Provider to query.
        provider_id: String,
    },
    /// List discussions of a review.
    GetReviewDiscussions {
        /// Provider to query.
        provider_id: String,
        /// Review to inspect.
        review_id: String,
    },
    /// List changed files of a review.
    GetReviewFileSummaries {
        /// Provider to query.
        provider_id: String,
        /// Review to inspect.
        review_id: String,
    },
    /// Fetch one file of a review.
    GetReviewFile {
        /// Provider to query.
        provider_id: String,
        /// Review containing the file.
        review_id: String,
        /// Path of the file.
        file_path: String,
        /// Revision to fetch.
        revision: String,
    },
    /// Record the read flag of one file.
    MarkFileRead {
        /// Provider owning the review.
        provider_id: String,
        /// Review containing the file.
        review_id: String,
        /// Path of the file.
        file_path: String,
        /// Revision the flag applies to.
        revision: String,
        /// New flag.
        read: bool,
    },
    /// Replace the configured providers.
    ConfigureModules {
        /// Complete new provider set.
        modules: Vec<ProviderSettings>,
    },
}

impl Operation {
    /// Short name used in logs and worker thread names.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetReviews { .. } => "get_reviews",
            Self::GetReviewDiscussions { .. } => "get_review_discussions",
            Self::GetReviewFileSummaries { .. } => "get_review_file_summaries",
            Self::GetReviewFile { .. } => "get_review_file",
            Self::MarkFileRead { .. } => "mark_file_read",
            Self::ConfigureModules { .. } => "configure_modules",
        }
    }
}

/// Successful outcome of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Result of [`Operation::GetReviews`].
    Reviews(Vec<Review>),
    /// Result of [`Operation::GetReviewDiscussions`].
    Discussions(Vec<ReviewDiscussion>),
    /// Result of [`Operation::GetReviewFileSummaries`].
    FileSummaries(Vec<ReviewFileSummary>),
    /// Result of [`Operation::GetReviewFile`].
    File(ReviewFileChanges),
    /// Acknowledgement of [`Operation::MarkFileRead`] and [`Operation::ConfigureModules`].
    Done,
}

/// Single-use sender completing one request.
pub type ReplyPort = oneshot::Sender<Result<Response>>;

/// Receiving half of a [`ReplyPort`]; resolves to `Canceled` only if the
/// worker died before replying.
pub type Reply = oneshot::Receiver<Result<Response>>;

/// Runs operations against a gateway off the caller's thread.
#[derive(Debug, Clone)]
pub struct Bridge {
    gateway: Arc<ReviewGateway>,
    next_request: Arc<AtomicU64>,
}

impl Bridge {
    /// Bridge in front of `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<ReviewGateway>) -> Self {
        Self {
            gateway,
            next_request: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start `operation` on a worker thread and return its pending reply.
    pub fn submit(&self, operation: Operation) -> Reply {
        let (port, reply) = oneshot::channel();
        let request = self.next_request.fetch_add(1, Ordering::Relaxed);
        let name = operation.name();
        let gateway = Arc::clone(&self.gateway);

        let spawned = thread::Builder::new()
            .name(format!("loupe-{name}-{request}"))
            .spawn(move || {
                debug!(request, operation = name, "request started");
                let outcome = execute(&gateway, operation);
                if let Err(err) = &outcome {
                    debug!(request, operation = name, error = %err, "request failed");
                }
                respond(port, outcome);
            });
        if let Err(err) = spawned {
            error!(request, operation = name, error = %err, "failed to spawn request worker");
        }
        reply
    }

    /// Decode a wire payload and submit it; malformed input is answered
    /// immediately with [`crate::Error::Serialization`].
    pub fn submit_encoded(&self, code: i32, payload: &[u8]) -> Reply {
        match wire::decode_operation(code, payload) {
            Ok(operation) => self.submit(operation),
            Err(err) => {
                let (port, reply) = oneshot::channel();
                respond(port, Err(err));
                reply
            }
        }
    }
}

fn execute(gateway: &ReviewGateway, operation: Operation) -> Result<Response> {
    let response = match operation {
        Operation::GetReviews { provider_id } => {
            Response::Reviews(gateway.get_reviews(&provider_id)?)
        }
        Operation::GetReviewDiscussions {
            provider_id,
            review_id,
        } => Response::Discussions(gateway.get_review_discussions(&provider_id, &review_id)?),
        Operation::GetReviewFileSummaries {
            provider_id,
            review_id,
        } => Response::FileSummaries(gateway.get_review_file_summaries(&provider_id, &review_id)?),
        Operation::GetReviewFile {
            provider_id,
            review_id,
            file_path,
            revision,
        } => Response::File(gateway.get_review_file(
            &provider_id,
            &review_id,
            &file_path,
            &revision,
        )?),
        Operation::MarkFileRead {
            provider_id,
            review_id,
            file_path,
            revision,
            read,
        } => {
            gateway.mark_file_read(&provider_id, &review_id, &file_path, &revision, read)?;
            Response::Done
        }
        Operation::ConfigureModules { modules } => {
            gateway.configure_modules(modules)?;
            Response::Done
        }
    };
    Ok(response)
}

fn respond(port: ReplyPort, outcome: Result<Response>) {
    if port.send(outcome).is_err() {
        debug!("caller dropped the reply before completion");
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use loupe_providers::ProviderEndpoints;

    use super::*;
    use crate::read_state::ReadStateStore;
    use crate::registry::ProviderRegistry;
    use crate::Error;

    fn bridge() -> Bridge {
        let gateway = ReviewGateway::new(
            Arc::new(ProviderRegistry::new(ProviderEndpoints::default())),
            Arc::new(ReadStateStore::in_memory().expect("store")),
        );
        Bridge::new(Arc::new(gateway))
    }

    #[test]
    fn replies_through_port() {
        let bridge = bridge();
        let reply = bridge.submit(Operation::ConfigureModules { modules: Vec::new() });
        assert_eq!(block_on(reply).expect("reply").expect("configure"), Response::Done);

        let reply = bridge.submit(Operation::GetReviews {
            provider_id: "missing".into(),
        });
        assert!(matches!(
            block_on(reply).expect("reply"),
            Err(Error::ProviderNotFound { .. })
        ));
    }

    #[test]
    fn malformed_payload_is_answered_immediately() {
        let reply = bridge().submit_encoded(wire::GET_REVIEWS, &[1, 0]);
        assert!(matches!(
            block_on(reply).expect("reply"),
            Err(Error::Serialization { .. })
        ));
    }
}
