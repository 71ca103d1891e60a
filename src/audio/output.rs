use crate::{Error, Result};
use rodio::{Decoder, OutputStream, Sink, decoder::LoopedDecoder};
use std::io::Cursor;
use std::sync::{Mutex, mpsc};
use std::thread;
use tracing::{debug, error, info};

pub type LoopingSource = LoopedDecoder<Cursor<Vec<u8>>>;

/// Downloaded audio, ready to hand to an output.
#[derive(Debug, Clone)]
pub struct Track {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Somewhere a track can be looped. Playing a new track replaces the old one.
pub trait AudioOutput: Send + Sync {
    fn play_looped(&self, track: Track) -> Result<()>;

    fn stop(&self) -> Result<()>;
}

/// Decodes `bytes` into a source that seeks back to the start whenever it
/// runs out, forever.
pub fn looping_source(bytes: Vec<u8>) -> Result<LoopingSource> {
    Decoder::new_looped(Cursor::new(bytes))
        .map_err(|e| Error::audio(format!("Failed to decode audio: {e}")))
}

enum Command {
    Play(LoopingSource),
    Stop,
    Shutdown,
}

/// Output on the default audio device.
///
/// The rodio stream is not `Send`, so it lives on its own thread and is
/// driven over a channel.
pub struct RodioOutput {
    commands: mpsc::Sender<Command>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl RodioOutput {
    pub fn open(volume: f32) -> Result<Self> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let worker = thread::Builder::new()
            .name("riffloop-audio".to_string())
            .spawn(move || run_device(receiver, ready_tx, volume))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Audio output opened");
                Ok(Self {
                    commands,
                    worker: Mutex::new(Some(worker)),
                })
            }
            Ok(Err(e)) => Err(Error::audio(format!("Failed to open audio output: {e}"))),
            Err(_) => Err(Error::audio("Audio thread exited during startup")),
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::audio("Audio thread is not running"))
    }
}

impl AudioOutput for RodioOutput {
    fn play_looped(&self, track: Track) -> Result<()> {
        let source = looping_source(track.bytes)?;
        debug!("Queueing looped playback of {}", track.url);
        self.send(Command::Play(source))
    }

    fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

fn run_device(
    commands: mpsc::Receiver<Command>,
    ready: mpsc::SyncSender<std::result::Result<(), String>>,
    volume: f32,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut current: Option<Sink> = None;

    while let Ok(command) = commands.recv() {
        match command {
            Command::Play(source) => {
                if let Some(previous) = current.take() {
                    previous.stop();
                }
                match Sink::try_new(&handle) {
                    Ok(sink) => {
                        sink.set_volume(volume);
                        sink.append(source);
                        sink.play();
                        current = Some(sink);
                    }
                    Err(e) => error!("Failed to create audio sink: {}", e),
                }
            }
            Command::Stop => {
                if let Some(sink) = current.take() {
                    sink.stop();
                }
            }
            Command::Shutdown => break,
        }
    }

    debug!("Audio thread shutting down");
}

/// Output for machines without a sound device: decodes the track so bad
/// audio is still reported, then discards it.
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play_looped(&self, track: Track) -> Result<()> {
        looping_source(track.bytes)?;
        info!("No audio device; skipping playback of {}", track.url);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}
