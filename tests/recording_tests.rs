//! Recording state tests
//!
//! These tests verify the capture state machine through the session and
//! that the microphone handle is released on every path.

use polypal::audio::{
    AudioCaptureController, CaptureOutcome, CaptureState, MicAffordance, MockAudioHost,
};
use polypal::chat::{ChatSession, EntryBody};
use polypal::integration::ChatConfig;
use polypal::messages::{AudioSource, ConversationStore, MemoryStore, Sender};
use std::sync::Arc;

fn session(host: MockAudioHost) -> ChatSession {
    let store = ConversationStore::new(Arc::new(MemoryStore::new()));
    ChatSession::new(ChatConfig::default().without_bot_reply(), store, Box::new(host)).unwrap()
}

#[test]
fn test_initial_state_is_idle() {
    let session = session(MockAudioHost::new());
    assert_eq!(session.capture_state(), CaptureState::Idle);
    assert_eq!(session.mic_affordance(), MicAffordance::START);
}

#[test]
fn test_toggle_cycles_through_recording() {
    let host = MockAudioHost::new();
    let probe = host.probe();
    let mut session = session(host);
    session.select("Ana");

    assert_eq!(session.toggle_recording(), CaptureOutcome::Started);
    assert_eq!(session.capture_state(), CaptureState::Recording);
    assert_eq!(session.mic_affordance(), MicAffordance::STOP);
    assert_eq!(probe.active(), 1);

    let outcome = session.toggle_recording();
    assert!(matches!(outcome, CaptureOutcome::Finished(_)));
    assert_eq!(session.capture_state(), CaptureState::Idle);
    assert_eq!(session.mic_affordance(), MicAffordance::START);
    assert_eq!(probe.active(), 0);
}

#[test]
fn test_finished_recording_is_shown_from_ephemeral_handle() {
    let mut session = session(MockAudioHost::new());
    session.select("Ana");
    session.toggle_recording();
    session.toggle_recording();

    let entry = session.log().last().unwrap();
    assert_eq!(entry.sender, Sender::User);
    match &entry.body {
        EntryBody::Audio {
            source: AudioSource::Ephemeral(handle),
            duration_label,
        } => {
            assert!(handle.as_str().starts_with("blob:polypal/"));
            assert_eq!(duration_label.as_deref(), Some("1s"));
        }
        other => panic!("unexpected entry: {:?}", other),
    }
}

#[test]
fn test_stop_without_recording_leaks_nothing() {
    let host = MockAudioHost::new();
    let probe = host.probe();
    let mut controller = AudioCaptureController::new(Box::new(host));

    assert_eq!(controller.stop(), CaptureOutcome::Stopped);
    assert_eq!(controller.state(), CaptureState::Idle);
    assert_eq!(probe.acquired(), 0);
    assert_eq!(probe.active(), 0);
}

#[test]
fn test_unsupported_host_alerts_without_acquiring() {
    let host = MockAudioHost::unsupported();
    let probe = host.probe();
    let mut session = session(host);

    assert!(matches!(
        session.toggle_recording(),
        CaptureOutcome::Unavailable(_)
    ));
    assert_eq!(
        session.last_alert(),
        Some("Audio recording is not supported on this device.")
    );
    assert_eq!(session.capture_state(), CaptureState::Idle);
    assert_eq!(probe.acquired(), 0);
}

#[test]
fn test_denied_permission_returns_to_idle() {
    let mut session = session(MockAudioHost::denied());
    session.toggle_recording();
    assert_eq!(session.capture_state(), CaptureState::Idle);
    assert!(!session.is_recording());
}

#[test]
fn test_empty_recording_reports_failure() {
    let host = MockAudioHost::new().with_chunks(Vec::new());
    let probe = host.probe();
    let mut session = session(host);
    session.select("Ana");

    session.toggle_recording();
    let outcome = session.toggle_recording();

    assert!(matches!(outcome, CaptureOutcome::EncodingFailed(_)));
    assert_eq!(
        session.log().last().unwrap().body,
        EntryBody::Text("Voice message failed to record properly.".into())
    );
    assert!(session.store().load("Ana").is_empty());
    assert_eq!(probe.active(), 0);
}

#[test]
fn test_recording_survives_frames_without_polling() {
    // A minimized window stops calling poll_events while audio keeps coming
    let host = MockAudioHost::new().with_chunks(vec![vec![0.25; 1600]; 400]);
    let mut session = session(host);
    session.select("Ana");

    session.toggle_recording();
    let outcome = session.toggle_recording();

    match outcome {
        CaptureOutcome::Finished(artifact) => assert_eq!(artifact.duration_ms, Some(40_000)),
        other => panic!("unexpected outcome: {:?}", other),
    }
    match &session.log().last().unwrap().body {
        EntryBody::Audio { duration_label, .. } => {
            assert_eq!(duration_label.as_deref(), Some("40s"))
        }
        other => panic!("unexpected entry: {:?}", other),
    }
}

#[test]
fn test_dropping_session_mid_recording_releases_input() {
    let host = MockAudioHost::new();
    let probe = host.probe();
    {
        let mut session = session(host);
        session.toggle_recording();
        assert_eq!(probe.active(), 1);
    }
    assert_eq!(probe.active(), 0);
}
