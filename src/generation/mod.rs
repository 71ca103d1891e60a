pub mod fsm;
mod pipeline;
mod poller;
mod session;

pub use fsm::{
    GenerationContext, GenerationEvent, GenerationSnapshot, GenerationState,
    GenerationStateMachine,
};
pub use pipeline::Generator;
pub use poller::{CompletedPrediction, StatusPoller};
pub use session::Session;
