use riffloop::{
    audio::AudioPlayer,
    config::{
        ArtConfig, AudioConfig, Config, GenerationConfig, HistoryConfig, LogsConfig,
        PollingConfig, ReplicateConfig, ServerConfig,
    },
    generation::Generator,
    history::HistoryStorage,
    prediction::ReplicateClient,
};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use super::RecordingOutput;

pub const TEST_TOKEN: &str = "r8_test_token";
pub const TEST_VERSION: &str = "test-model-version";

/// Create a test configuration pointing every endpoint at `base_url`
pub fn create_test_config(base_url: &str) -> Config {
    Config {
        replicate: ReplicateConfig {
            base_url: base_url.to_string(),
            api_token: TEST_TOKEN.to_string(),
            model_version: TEST_VERSION.to_string(),
            request_timeout_secs: 30,
        },
        generation: GenerationConfig::default(),
        polling: fast_polling(),
        audio: AudioConfig::default(),
        art: ArtConfig {
            enabled: true,
            url: format!("{base_url}/art"),
            save_path: None,
        },
        history: HistoryConfig {
            database_path: ":memory:".to_string(),
        },
        server: ServerConfig::default(),
        logs: LogsConfig {
            level: "debug".to_string(),
        },
    }
}

/// Polling settings that keep tests quick
pub fn fast_polling() -> PollingConfig {
    PollingConfig {
        interval_ms: 2,
        max_duration_secs: 30,
        max_attempts: None,
    }
}

pub fn create_test_client(server: &MockServer) -> ReplicateClient {
    let config = create_test_config(&server.uri());
    ReplicateClient::new(config.replicate, config.generation)
}

/// Generator wired to the mock server, a recording output and in-memory history
pub async fn create_test_generator(
    server: &MockServer,
) -> (Generator, RecordingOutput, Arc<HistoryStorage>) {
    let config = create_test_config(&server.uri());
    let output = RecordingOutput::new();
    let player = Arc::new(AudioPlayer::new(Box::new(output.clone())));
    let history = Arc::new(HistoryStorage::new(":memory:").await.unwrap());

    let generator = Generator::new(
        Arc::new(create_test_client(server)),
        player,
        config.polling,
    )
    .with_history(Arc::clone(&history));

    (generator, output, history)
}

pub fn status_body(status: &str, output: Option<&str>) -> Value {
    json!({
        "id": "abc123",
        "status": status,
        "output": output,
        "error": null,
    })
}

/// Serve a small WAV file at `audio_path` on the mock server
pub async fn mount_audio(server: &MockServer, audio_path: &str) {
    Mock::given(method("GET"))
        .and(path(audio_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/wav")
                .set_body_bytes(wav_bytes(&[0, 1000, 2000, 1000])),
        )
        .mount(server)
        .await;
}

/// Count requests received for an exact path
pub async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

/// Minimal 16-bit mono PCM WAV file
pub fn wav_bytes(samples: &[i16]) -> Vec<u8> {
    let sample_rate: u32 = 8000;
    let data_len = (samples.len() * 2) as u32;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
