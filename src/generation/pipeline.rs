use super::fsm::{GenerationEvent, GenerationSnapshot, GenerationStateMachine};
use super::poller::{CompletedPrediction, StatusPoller};
use crate::{
    Result,
    audio::AudioPlayer,
    config::PollingConfig,
    history::{GenerationRecord, HistoryStorage},
    prediction::PredictionClient,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Runs one prompt through submit, poll and play.
pub struct Generator {
    client: Arc<dyn PredictionClient>,
    player: Arc<AudioPlayer>,
    polling: PollingConfig,
    history: Option<Arc<HistoryStorage>>,
}

impl Generator {
    pub fn new(
        client: Arc<dyn PredictionClient>,
        player: Arc<AudioPlayer>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            client,
            player,
            polling,
            history: None,
        }
    }

    pub fn with_history(mut self, history: Arc<HistoryStorage>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn player(&self) -> &Arc<AudioPlayer> {
        &self.player
    }

    /// Creates the state machine for `prompt` and drives it to a terminal
    /// state. Failures are logged and recorded in the snapshot rather than
    /// returned.
    pub async fn run(&self, prompt: &str) -> GenerationSnapshot {
        let fsm = GenerationStateMachine::new(prompt);
        let (updates, _) = watch::channel(fsm.snapshot());
        self.run_with_updates(fsm, &updates).await
    }

    pub async fn run_with_updates(
        &self,
        mut fsm: GenerationStateMachine,
        updates: &watch::Sender<GenerationSnapshot>,
    ) -> GenerationSnapshot {
        if let Err(e) = self.drive(&mut fsm, updates).await {
            error!("Generation {} failed: {}", fsm.context.id, e);
            if !fsm.is_terminal() {
                // Only fails for terminal states, which were just ruled out.
                let _ = fsm.transition(GenerationEvent::ErrorOccurred {
                    message: e.to_string(),
                });
            }
        }

        // Recorded before the terminal snapshot goes out, so waiters see it.
        self.record(&fsm).await;

        let snapshot = fsm.snapshot();
        updates.send_replace(snapshot.clone());
        snapshot
    }

    async fn drive(
        &self,
        fsm: &mut GenerationStateMachine,
        updates: &watch::Sender<GenerationSnapshot>,
    ) -> Result<()> {
        fsm.transition(GenerationEvent::Submit)?;
        updates.send_replace(fsm.snapshot());

        info!("Submitting prompt for generation {}", fsm.context.id);
        let handle = self.client.create_prediction(&fsm.context.prompt).await?;

        fsm.transition(GenerationEvent::PredictionCreated {
            prediction_id: handle.id.clone(),
        })?;
        updates.send_replace(fsm.snapshot());

        let CompletedPrediction {
            output, attempts, ..
        } = StatusPoller::new(self.client.as_ref(), &self.polling)
            .poll_until_complete(&handle)
            .await?;

        fsm.transition(GenerationEvent::PredictionSucceeded {
            output_url: output.to_string(),
            attempts,
        })?;
        updates.send_replace(fsm.snapshot());

        self.player.play_url(&output).await?;

        fsm.transition(GenerationEvent::PlaybackStarted)?;

        Ok(())
    }

    async fn record(&self, fsm: &GenerationStateMachine) {
        let Some(history) = &self.history else {
            return;
        };

        let record = GenerationRecord::from_snapshot(&fsm.snapshot());
        if let Err(e) = history.save(record).await {
            warn!("Failed to record generation {}: {}", fsm.context.id, e);
        }
    }
}
