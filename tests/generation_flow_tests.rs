use pretty_assertions::assert_eq;
use riffloop::{
    audio::AudioPlayer,
    generation::{GenerationState, Generator, Session},
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

mod common;
use common::{
    RecordingOutput, create_test_client, create_test_generator, fast_polling, mount_audio,
    request_count, status_body, wav_bytes,
};

async fn mount_creation(server: &MockServer, prompt: &str, id: &str) {
    Mock::given(method("POST"))
        .and(path("/predictions"))
        .and(body_partial_json(json!({ "input": { "prompt": prompt } })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": id })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_lofi_beat_end_to_end() {
    let server = MockServer::start().await;
    let output_url = format!("{}/x/y.wav", server.uri());

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .and(body_partial_json(json!({ "input": { "prompt": "lofi beat" } })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "abc123" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/predictions/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing", None)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/predictions/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("succeeded", Some(output_url.as_str()))),
        )
        .mount(&server)
        .await;
    mount_audio(&server, "/x/y.wav").await;

    let (generator, output, history) = create_test_generator(&server).await;
    let snapshot = generator.run("lofi beat").await;

    assert_eq!(snapshot.state, GenerationState::Done);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.context.prompt, "lofi beat");
    assert_eq!(snapshot.context.prediction_id.as_deref(), Some("abc123"));
    assert_eq!(snapshot.context.output_url.as_deref(), Some(output_url.as_str()));
    assert_eq!(snapshot.context.attempts, 3);
    assert_eq!(snapshot.context.last_error, None);

    assert_eq!(output.played_urls(), vec![output_url.clone()]);
    assert_eq!(generator.player().now_playing(), Some(output_url.clone()));

    let records = history.recent(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].succeeded());
    assert_eq!(records[0].output_url.as_deref(), Some(output_url.as_str()));
}

#[tokio::test]
async fn test_submission_failure_clears_loading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let (generator, output, history) = create_test_generator(&server).await;
    let snapshot = generator.run("lofi beat").await;

    assert_eq!(snapshot.state, GenerationState::Failed);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.context.prediction_id, None);
    assert!(
        snapshot
            .context
            .last_error
            .as_deref()
            .unwrap()
            .contains("upstream down")
    );
    assert!(output.played_urls().is_empty());

    let records = history.recent(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, "failed");
}

#[tokio::test]
async fn test_failed_prediction_is_terminal() {
    let server = MockServer::start().await;
    mount_creation(&server, "doomed", "bad1").await;
    Mock::given(method("GET"))
        .and(path("/predictions/bad1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "output": null,
            "error": "model crashed",
        })))
        .mount(&server)
        .await;

    let (generator, output, _history) = create_test_generator(&server).await;
    let snapshot = generator.run("doomed").await;

    assert_eq!(snapshot.state, GenerationState::Failed);
    assert_eq!(snapshot.context.prediction_id.as_deref(), Some("bad1"));
    assert!(
        snapshot
            .context
            .last_error
            .as_deref()
            .unwrap()
            .contains("model crashed")
    );
    assert!(output.played_urls().is_empty());
}

#[tokio::test]
async fn test_unplayable_output_fails_generation() {
    let server = MockServer::start().await;
    let output_url = format!("{}/broken.wav", server.uri());
    mount_creation(&server, "glitch", "g1").await;
    Mock::given(method("GET"))
        .and(path("/predictions/g1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("succeeded", Some(output_url.as_str()))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.wav"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not audio at all"))
        .mount(&server)
        .await;

    let (generator, output, history) = create_test_generator(&server).await;
    let snapshot = generator.run("glitch").await;

    assert_eq!(snapshot.state, GenerationState::Failed);
    assert!(!snapshot.loading);
    assert!(output.played_urls().is_empty());
    assert_eq!(generator.player().now_playing(), None);

    // The produced output survives the playback failure
    assert_eq!(snapshot.context.output_url.as_deref(), Some(output_url.as_str()));
    assert_eq!(snapshot.context.attempts, 1);
    let records = history.recent(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, "failed");
    assert_eq!(records[0].output_url.as_deref(), Some(output_url.as_str()));
    assert!(records[0].error.is_some());
}

#[tokio::test]
async fn test_stalled_audio_download_times_out() {
    let server = MockServer::start().await;
    let output_url = format!("{}/slow.wav", server.uri());
    mount_creation(&server, "slow", "s1").await;
    Mock::given(method("GET"))
        .and(path("/predictions/s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("succeeded", Some(output_url.as_str()))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.wav"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(wav_bytes(&[0, 1000]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let output = RecordingOutput::new();
    let player = Arc::new(
        AudioPlayer::new(Box::new(output.clone()))
            .with_download_timeout(Duration::from_millis(200)),
    );
    let generator = Generator::new(Arc::new(create_test_client(&server)), player, fast_polling());

    let started = Instant::now();
    let snapshot = generator.run("slow").await;

    assert_eq!(snapshot.state, GenerationState::Failed);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(output.played_urls().is_empty());
    assert_eq!(snapshot.context.output_url.as_deref(), Some(output_url.as_str()));
}

#[tokio::test]
async fn test_session_new_prompt_replaces_in_flight_generation() {
    let server = MockServer::start().await;
    let second_url = format!("{}/second.wav", server.uri());

    mount_creation(&server, "first", "first-id").await;
    mount_creation(&server, "second", "second-id").await;
    Mock::given(method("GET"))
        .and(path("/predictions/first-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing", None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/predictions/second-id"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("succeeded", Some(second_url.as_str()))),
        )
        .mount(&server)
        .await;
    mount_audio(&server, "/second.wav").await;

    let (generator, output, _history) = create_test_generator(&server).await;
    let session = Session::new(Arc::new(generator));

    assert!(session.snapshot().await.is_none());

    let first_id = session.submit("first").await;

    // Let the first generation reach the polling loop
    for _ in 0..200 {
        if request_count(&server, "/predictions/first-id").await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.context.id, first_id);
    assert_eq!(snapshot.state, GenerationState::Polling);
    assert!(snapshot.loading);

    let second_id = session.submit("second").await;
    let finished = session.wait().await.unwrap();

    assert_eq!(finished.context.id, second_id);
    assert_eq!(finished.state, GenerationState::Done);
    assert_eq!(output.played_urls(), vec![second_url]);

    // The aborted generation no longer polls
    let polls = request_count(&server, "/predictions/first-id").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(request_count(&server, "/predictions/first-id").await, polls);
}
