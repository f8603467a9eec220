//! Per-frame worker tests: frame skipping, status classification and errors


use gaze_proctor::{
    app::FrameWorker,
    attention::AttentionStatus,
    config::ScreenConfig,
    face_normalization::FaceNormalizer,
    gaze_processor::{GazePoint, GazeProcessor},
};
use opencv::{
    core::{Mat, Rect},
    prelude::*,
};
use test_helpers::*;

#[test]
fn test_skipped_frames_report_instruction_until_first_estimate() {
    let face = Rect::new(200, 120, 180, 200);
    let processor = fake_processor(FixedLocator(Some(face)), FixedModel((0.5, 0.5)));
    let mut worker = FrameWorker::new(processor, 5, true);
    let frame = create_face_like_image(480, 640, face).unwrap();

    for _ in 0..4 {
        let processed = worker.process(&frame);
        assert_eq!(processed.snapshot.status, AttentionStatus::Instruction);
        assert_eq!(processed.snapshot.gaze, None);
    }

    let processed = worker.process(&frame);
    assert_eq!(processed.snapshot.status, AttentionStatus::Ok);
    assert_eq!(processed.snapshot.gaze, Some(GazePoint::new(320, 240)));
    assert_eq!(processed.snapshot.frame_index, 5);

    // Estimate is reused on skipped frames
    let processed = worker.process(&frame);
    assert_eq!(processed.snapshot.gaze, Some(GazePoint::new(320, 240)));
}

#[test]
fn test_model_runs_on_every_nth_frame_only() {
    let model = RecordingModel::default();
    let shapes = model.shapes.clone();
    let face = Rect::new(200, 120, 180, 200);
    let mut worker = FrameWorker::new(fake_processor(FixedLocator(Some(face)), model), 3, true);
    let frame = create_face_like_image(480, 640, face).unwrap();

    for _ in 0..10 {
        worker.process(&frame);
    }
    assert_eq!(shapes.lock().len(), 3);
}

#[test]
fn test_missing_face_is_cheating() {
    let mut worker = FrameWorker::new(fake_processor(FixedLocator(None), FixedModel((0.5, 0.5))), 1, true);
    let frame = create_test_image(480, 640, 0.0).unwrap();

    let processed = worker.process(&frame);
    assert_eq!(processed.snapshot.status, AttentionStatus::Cheating);
    assert!(processed.rendered.is_some());
}

#[test]
fn test_off_screen_gaze_is_cheating() {
    let face = Rect::new(200, 120, 180, 200);
    let mut worker = FrameWorker::new(fake_processor(FixedLocator(Some(face)), FixedModel((1.2, 0.5))), 1, true);
    let frame = create_face_like_image(480, 640, face).unwrap();

    let processed = worker.process(&frame);
    assert_eq!(processed.snapshot.status, AttentionStatus::Cheating);
    assert_eq!(processed.snapshot.gaze, Some(GazePoint::new(768, 240)));
}

#[test]
fn test_frames_resized_to_screen() {
    let face = Rect::new(100, 60, 90, 100);
    let mut worker = FrameWorker::new(fake_processor(FixedLocator(Some(face)), FixedModel((0.5, 0.5))), 1, true);
    let frame = create_test_image(240, 320, 20.0).unwrap();

    let rendered = worker.process(&frame).rendered.unwrap();
    assert_eq!((rendered.cols(), rendered.rows()), (640, 480));
}

#[test]
fn test_frames_kept_at_capture_size_without_resize() {
    let mut worker = FrameWorker::new(fake_processor(FixedLocator(None), FixedModel((0.5, 0.5))), 1, false);
    let frame = create_test_image(240, 320, 20.0).unwrap();

    let rendered = worker.process(&frame).rendered.unwrap();
    assert_eq!((rendered.cols(), rendered.rows()), (320, 240));
}

#[test]
fn test_empty_frame_is_error_status() {
    let mut worker = FrameWorker::new(fake_processor(FixedLocator(None), FixedModel((0.5, 0.5))), 1, true);

    let processed = worker.process(&Mat::default());
    assert_eq!(processed.snapshot.status, AttentionStatus::Error);
    assert!(processed.rendered.is_none());

    // Loop keeps going after an error
    let frame = create_test_image(480, 640, 0.0).unwrap();
    assert_eq!(worker.process(&frame).snapshot.status, AttentionStatus::Cheating);
    assert_eq!(worker.frame_index(), 2);
}

#[test]
fn test_unavailable_inference_is_error_status() {
    let processor = GazeProcessor::new(None, None, FaceNormalizer::new(30, 224), ScreenConfig::webcam());
    let mut worker = FrameWorker::new(processor, 1, true);
    let frame = create_test_image(480, 640, 0.0).unwrap();

    let processed = worker.process(&frame);
    assert_eq!(processed.snapshot.status, AttentionStatus::Error);
    assert!(processed.rendered.is_some());
}
