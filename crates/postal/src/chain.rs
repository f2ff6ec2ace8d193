//! Fallback orchestrator walking the configured provider order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use postal_core::{LookupRequest, NormalizedResult};
use tracing::{debug, warn};

use crate::registry::ProviderRegistry;
use crate::settings::{DEFAULT_CHAIN_DEADLINE, ProviderOrder};

/// What happened when one provider was consulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The provider returned data.
    Found,
    /// The provider answered without data, or is disabled.
    Empty,
    /// The upstream call failed; the reason is the error message.
    Unavailable(String),
    /// The provider is missing configuration it needs.
    Misconfigured(String),
    /// The identifier is not in the registry.
    Unknown,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found => f.write_str("found"),
            Self::Empty => f.write_str("empty"),
            Self::Unavailable(reason) => write!(f, "unavailable: {reason}"),
            Self::Misconfigured(reason) => write!(f, "misconfigured: {reason}"),
            Self::Unknown => f.write_str("unknown provider"),
        }
    }
}

/// One consulted provider and its outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Identifier as written in the order.
    pub provider: String,
    /// Outcome of the call.
    pub outcome: AttemptOutcome,
}

/// Result of walking the chain once.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// First result found, if any.
    pub result: Option<NormalizedResult>,
    /// Every provider consulted, in order.
    pub attempts: Vec<Attempt>,
    /// True if the walk was cut short by the chain deadline.
    pub deadline_exceeded: bool,
}

impl Resolution {
    /// Number of attempts that reached an adapter.
    #[must_use]
    pub fn providers_called(&self) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| attempt.outcome != AttemptOutcome::Unknown)
            .count()
    }
}

/// Sequential provider fallback.
///
/// Providers are awaited one at a time in the given order and the first one
/// returning data wins. Failures of any kind move on to the next provider;
/// nothing escapes [`resolve`](Self::resolve) as an error.
#[derive(Clone, Debug)]
pub struct ProviderChain {
    registry: Arc<ProviderRegistry>,
    deadline: Option<Duration>,
}

impl ProviderChain {
    /// Creates a chain over `registry` with the default deadline.
    #[must_use]
    pub const fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            deadline: Some(DEFAULT_CHAIN_DEADLINE),
        }
    }

    /// Sets the overall deadline for one walk; `None` disables it.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// The registry providers are resolved from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Walks `order` for `request` and returns the first result found.
    ///
    /// When the deadline elapses the in-flight call is dropped and the
    /// result is absent.
    pub async fn resolve(&self, request: &LookupRequest, order: &ProviderOrder) -> Resolution {
        let mut attempts = Vec::with_capacity(order.len());

        let result = match self.deadline {
            Some(deadline) => {
                let walked =
                    tokio::time::timeout(deadline, self.walk(request, order, &mut attempts)).await;
                let Ok(result) = walked else {
                    warn!(
                        request = %request,
                        deadline = ?deadline,
                        attempted = attempts.len(),
                        "Provider chain deadline exceeded"
                    );
                    return Resolution {
                        result: None,
                        attempts,
                        deadline_exceeded: true,
                    };
                };
                result
            }
            None => self.walk(request, order, &mut attempts).await,
        };

        if result.is_none() {
            debug!(
                request = %request,
                attempted = attempts.len(),
                "All providers exhausted"
            );
        }

        Resolution {
            result,
            attempts,
            deadline_exceeded: false,
        }
    }

    async fn walk(
        &self,
        request: &LookupRequest,
        order: &ProviderOrder,
        attempts: &mut Vec<Attempt>,
    ) -> Option<NormalizedResult> {
        for id in order.iter() {
            let Some(descriptor) = self.registry.resolve(id) else {
                debug!(provider = id, "Unknown provider in order, skipping");
                attempts.push(Attempt {
                    provider: id.to_string(),
                    outcome: AttemptOutcome::Unknown,
                });
                continue;
            };

            debug!(provider = id, request = %request, "Trying provider");

            let outcome = match descriptor.adapter().fetch(request).await {
                Ok(Some(result)) => {
                    debug!(provider = id, request = %request, "Provider returned data");
                    attempts.push(Attempt {
                        provider: id.to_string(),
                        outcome: AttemptOutcome::Found,
                    });
                    return Some(result);
                }
                Ok(None) => AttemptOutcome::Empty,
                Err(e) if e.is_configuration() => {
                    warn!(provider = id, error = %e, "Provider misconfigured, trying next");
                    AttemptOutcome::Misconfigured(e.to_string())
                }
                Err(e) => {
                    warn!(provider = id, error = %e, "Provider failed, trying next");
                    AttemptOutcome::Unavailable(e.to_string())
                }
            };

            attempts.push(Attempt {
                provider: id.to_string(),
                outcome,
            });
        }

        None
    }
}
