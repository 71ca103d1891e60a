mod output;
mod player;

pub use output::{AudioOutput, LoopingSource, NullOutput, RodioOutput, Track, looping_source};
pub use player::AudioPlayer;
