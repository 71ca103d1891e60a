use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Generation states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Submitting,
    Polling,
    Done,
    Failed,
}

// Generation events
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Submit,
    PredictionCreated { prediction_id: String },
    PredictionSucceeded { output_url: String, attempts: u32 },
    PlaybackStarted,
    ErrorOccurred { message: String },
}

// Everything known about one generation; replaced wholesale by the next prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    pub id: Uuid,
    pub prompt: String,
    pub prediction_id: Option<String>,
    pub output_url: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Point-in-time view of a generation, published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSnapshot {
    pub state: GenerationState,
    pub loading: bool,
    #[serde(flatten)]
    pub context: GenerationContext,
}

impl GenerationContext {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            prediction_id: None,
            output_url: None,
            attempts: 0,
            last_error: None,
            started_at: Utc::now(),
        }
    }
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

pub struct GenerationStateMachine {
    state: GenerationState,
    pub context: GenerationContext,
}

impl GenerationStateMachine {
    pub fn new(prompt: impl Into<String>) -> Self {
        let context = GenerationContext::new(prompt);
        debug!("Creating generation {}", context.id);
        Self {
            state: GenerationState::Idle,
            context,
        }
    }

    pub fn current_state(&self) -> GenerationState {
        self.state
    }

    pub fn transition(&mut self, event: GenerationEvent) -> Result<()> {
        let old_state = self.state;
        debug!(
            "Generation {} processing event {:?} in state {:?}",
            self.context.id, event, old_state
        );

        let new_state = match (&self.state, &event) {
            (GenerationState::Idle, GenerationEvent::Submit) => GenerationState::Submitting,
            (GenerationState::Submitting, GenerationEvent::PredictionCreated { .. }) => {
                GenerationState::Polling
            }
            // The output is kept even if playback later fails
            (GenerationState::Polling, GenerationEvent::PredictionSucceeded { .. })
                if self.context.output_url.is_none() =>
            {
                GenerationState::Polling
            }
            (GenerationState::Polling, GenerationEvent::PlaybackStarted)
                if self.context.output_url.is_some() =>
            {
                GenerationState::Done
            }
            (
                GenerationState::Idle | GenerationState::Submitting | GenerationState::Polling,
                GenerationEvent::ErrorOccurred { .. },
            ) => GenerationState::Failed,
            _ => {
                warn!(
                    "Invalid generation transition from {:?} with event {:?}",
                    self.state, event
                );
                return Err(Error::InvalidTransition {
                    current: self.state.as_str().to_string(),
                    requested: format!("{event:?}"),
                });
            }
        };

        match event {
            GenerationEvent::Submit | GenerationEvent::PlaybackStarted => {}
            GenerationEvent::PredictionCreated { prediction_id } => {
                self.context.prediction_id = Some(prediction_id);
            }
            GenerationEvent::PredictionSucceeded {
                output_url,
                attempts,
            } => {
                self.context.output_url = Some(output_url);
                self.context.attempts = attempts;
            }
            GenerationEvent::ErrorOccurred { message } => {
                self.context.last_error = Some(message);
            }
        }

        info!(
            "Generation {} state transition: {:?} -> {:?}",
            self.context.id, old_state, new_state
        );

        self.state = new_state;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            GenerationState::Submitting | GenerationState::Polling
        )
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        GenerationSnapshot {
            state: self.state,
            loading: self.is_loading(),
            context: self.context.clone(),
        }
    }
}
