use super::fsm::{GenerationSnapshot, GenerationStateMachine};
use super::pipeline::Generator;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

struct ActiveGeneration {
    id: Uuid,
    task: JoinHandle<GenerationSnapshot>,
    updates: watch::Receiver<GenerationSnapshot>,
}

/// Owns the lifecycle of generations. At most one is in flight; a new
/// prompt aborts the previous one before starting.
pub struct Session {
    generator: Arc<Generator>,
    current: Mutex<Option<ActiveGeneration>>,
}

impl Session {
    pub fn new(generator: Arc<Generator>) -> Self {
        Self {
            generator,
            current: Mutex::new(None),
        }
    }

    pub fn generator(&self) -> &Arc<Generator> {
        &self.generator
    }

    pub async fn submit(&self, prompt: impl Into<String>) -> Uuid {
        let fsm = GenerationStateMachine::new(prompt);
        let id = fsm.context.id;
        let (updates_tx, updates_rx) = watch::channel(fsm.snapshot());

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            if !previous.task.is_finished() {
                info!(
                    "Aborting generation {} in favour of {}",
                    previous.id, id
                );
                previous.task.abort();
            }
        }

        let generator = Arc::clone(&self.generator);
        let task = tokio::spawn(async move {
            generator.run_with_updates(fsm, &updates_tx).await
        });

        debug!("Generation {} started", id);
        *current = Some(ActiveGeneration {
            id,
            task,
            updates: updates_rx,
        });
        id
    }

    /// Latest state of the most recent generation, if any was submitted.
    pub async fn snapshot(&self) -> Option<GenerationSnapshot> {
        let current = self.current.lock().await;
        current
            .as_ref()
            .map(|active| active.updates.borrow().clone())
    }

    /// Waits for the most recent generation to reach a terminal state.
    /// Returns `None` if nothing was submitted or the task was aborted.
    pub async fn wait(&self) -> Option<GenerationSnapshot> {
        let mut updates = {
            let current = self.current.lock().await;
            current.as_ref()?.updates.clone()
        };

        let snapshot = updates
            .wait_for(|snapshot| snapshot.state.is_terminal())
            .await
            .ok()?;
        Some(snapshot.clone())
    }
}
