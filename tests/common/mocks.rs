use riffloop::{
    Result,
    audio::{AudioOutput, Track},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Audio output that records what it was asked to play instead of making sound.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    pub played: Arc<Mutex<Vec<Track>>>,
    pub stops: Arc<AtomicUsize>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played_urls(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|track| track.url.clone())
            .collect()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AudioOutput for RecordingOutput {
    fn play_looped(&self, track: Track) -> Result<()> {
        riffloop::audio::looping_source(track.bytes.clone())?;
        self.played.lock().unwrap().push(track);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
