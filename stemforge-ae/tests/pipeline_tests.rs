//! End-to-end pipeline behavior with stub engines

mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use stemforge_ae::engines::EngineSet;
use stemforge_ae::models::JobState;

#[tokio::test(flavor = "multi_thread")]
async fn successful_job_produces_full_artifact_set() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, storage) = build_test_manager(dir.path(), 1, stub_engines());

    let job_id = manager
        .submit("track.wav", b"RIFF....", Some("htdemucs"))
        .await
        .unwrap();
    let record = wait_for_terminal(&storage, job_id).await;

    assert_eq!(record.state, JobState::Success);
    assert_eq!(record.progress, 100);
    assert!(record.stage.is_empty());
    assert!(record.error.is_none());

    // Two vocal, three drum, three instrument sub-stems plus bass
    assert_eq!(record.artifacts.stems.len(), 9);
    assert_eq!(
        record.artifacts.stems,
        vec![
            "bass.wav",
            "guitars.wav",
            "harmony.wav",
            "hats.wav",
            "keys_synth.wav",
            "kick.wav",
            "snare.wav",
            "vocals_backing.wav",
            "vocals_lead.wav",
        ]
    );

    // Coarse source stems were removed after refinement
    assert!(!storage.stems_dir(job_id).join("vocals.wav").exists());
    assert!(!storage.stems_dir(job_id).join("drums.wav").exists());
    assert!(!storage.stems_dir(job_id).join("other.wav").exists());

    assert_eq!(
        record.artifacts.midi,
        vec![
            "bass.mid",
            "drums.mid",
            "guitars.mid",
            "harmony.mid",
            "harmony_composite.mid",
            "keys_synth.mid",
            "melody_lead.mid",
        ]
    );
    assert_eq!(record.artifacts.project, vec!["project.rpp"]);

    let rpp = std::fs::read_to_string(storage.job_dir(job_id).join("project.rpp")).unwrap();
    assert!(rpp.starts_with("<REAPER_PROJECT 0.1 \"6.75/win64\" 1680192000"));
    assert!(rpp.contains("FILE \"stems/vocals_lead.wav\""));
    assert!(rpp.contains("FILE \"midi/harmony_composite.mid\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn transcription_failure_terminates_job_but_keeps_stems() {
    let dir = tempfile::tempdir().unwrap();
    let engines = EngineSet {
        transcriber: Arc::new(FailingTranscriber),
        ..stub_engines()
    };
    let (manager, storage) = build_test_manager(dir.path(), 1, engines);

    let job_id = manager
        .submit("track.wav", b"RIFF....", None)
        .await
        .unwrap();
    let record = wait_for_terminal(&storage, job_id).await;

    assert_eq!(record.state, JobState::Failed);
    let error = record.error.as_ref().unwrap();
    assert_eq!(error.stage, "Transcription");
    assert!(error.cause.contains("model exited with status 1"));

    // Artifacts written by earlier stages stay on disk and stay listed
    assert_eq!(record.artifacts.stems.len(), 9);
    assert!(record.artifacts.project.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn reviewer_report_is_attached_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let engines = EngineSet {
        validator: Some(Arc::new(StubValidator)),
        ..stub_engines()
    };
    let (manager, storage) = build_test_manager(dir.path(), 1, engines);

    let job_id = manager
        .submit("track.flac", b"fLaC....", None)
        .await
        .unwrap();
    let record = wait_for_terminal(&storage, job_id).await;

    assert_eq!(record.state, JobState::Success);
    let report = record.validation_report.as_ref().unwrap();
    assert!(report.contains("all plausible"));
}

#[tokio::test(flavor = "multi_thread")]
async fn reviewer_failure_never_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let engines = EngineSet {
        validator: Some(Arc::new(FailingValidator)),
        ..stub_engines()
    };
    let (manager, storage) = build_test_manager(dir.path(), 1, engines);

    let job_id = manager
        .submit("track.wav", b"RIFF....", None)
        .await
        .unwrap();
    let record = wait_for_terminal(&storage, job_id).await;

    assert_eq!(record.state, JobState::Success);
    assert!(record.validation_report.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_fails_job_at_next_stage_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let engines = EngineSet {
        separator: Arc::new(StubSeparator::slow(Duration::from_millis(300))),
        ..stub_engines()
    };
    let (manager, storage) = build_test_manager(dir.path(), 1, engines);

    let job_id = manager
        .submit("track.wav", b"RIFF....", None)
        .await
        .unwrap();
    manager.cancel(job_id).await.unwrap();

    let record = wait_for_terminal(&storage, job_id).await;
    assert_eq!(record.state, JobState::Failed);
    assert_eq!(record.error.as_ref().unwrap().cause, "cancelled");
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_is_monotone_while_polling() {
    let dir = tempfile::tempdir().unwrap();
    let engines = EngineSet {
        separator: Arc::new(StubSeparator::slow(Duration::from_millis(100))),
        ..stub_engines()
    };
    let (manager, storage) = build_test_manager(dir.path(), 1, engines);

    let job_id = manager
        .submit("track.wav", b"RIFF....", None)
        .await
        .unwrap();

    let mut last_progress = 0u8;
    loop {
        let record = storage.read_status(job_id).unwrap();
        assert!(record.progress >= last_progress);
        last_progress = record.progress;
        if record.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last_progress, 100);
}
