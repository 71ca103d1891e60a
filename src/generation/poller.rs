use crate::{
    Error, Result,
    config::PollingConfig,
    prediction::{PredictionClient, PredictionHandle, PredictionState},
};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedPrediction {
    pub id: String,
    pub output: Url,
    pub attempts: u32,
}

/// Polls a prediction on a fixed interval until it succeeds with a usable
/// output URL, fails, or runs out of time.
pub struct StatusPoller<'a> {
    client: &'a dyn PredictionClient,
    interval: Duration,
    max_duration: Duration,
    max_attempts: Option<u32>,
}

impl<'a> StatusPoller<'a> {
    pub fn new(client: &'a dyn PredictionClient, config: &PollingConfig) -> Self {
        Self {
            client,
            interval: config.interval(),
            max_duration: config.max_duration(),
            max_attempts: config.max_attempts,
        }
    }

    pub async fn poll_until_complete(&self, handle: &PredictionHandle) -> Result<CompletedPrediction> {
        let deadline = Instant::now() + self.max_duration;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts: u32 = 0;

        loop {
            ticker.tick().await;

            if Instant::now() >= deadline || self.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(
                    "Giving up on prediction {} after {} polls",
                    handle.id, attempts
                );
                return Err(Error::PollTimeout {
                    id: handle.id.clone(),
                    attempts,
                });
            }

            attempts += 1;

            // A stalled request must not outlive the deadline.
            let response =
                tokio::time::timeout_at(deadline, self.client.get_prediction(&handle.id)).await;
            let status = match response {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    warn!("Poll {} for prediction {} failed: {}", attempts, handle.id, e);
                    continue;
                }
                Err(_) => {
                    warn!(
                        "Poll {} for prediction {} still pending at the deadline",
                        attempts, handle.id
                    );
                    return Err(Error::PollTimeout {
                        id: handle.id.clone(),
                        attempts,
                    });
                }
            };

            if status.status.is_failure() {
                let reason = status
                    .error
                    .clone()
                    .unwrap_or_else(|| status.status.as_str().to_string());
                warn!("Prediction {} ended with {}: {}", handle.id, status.status.as_str(), reason);
                return Err(Error::PredictionFailed {
                    id: handle.id.clone(),
                    reason,
                });
            }

            match status.output_url() {
                Some(output) => {
                    info!(
                        "Prediction {} succeeded after {} polls: {}",
                        handle.id, attempts, output
                    );
                    return Ok(CompletedPrediction {
                        id: handle.id.clone(),
                        output,
                        attempts,
                    });
                }
                None if status.status == PredictionState::Succeeded => {
                    warn!(
                        "Prediction {} succeeded without a usable output ({:?}); still polling",
                        handle.id, status.output
                    );
                }
                None => {
                    debug!(
                        "Prediction {} is {} (poll {})",
                        handle.id,
                        status.status.as_str(),
                        attempts
                    );
                }
            }
        }
    }
}
