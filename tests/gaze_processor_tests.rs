//! Gaze pipeline tests with stand-in locators and models


use gaze_proctor::{
    config::{DetectorConfig, ScreenConfig},
    face_detection::{CascadeFaceLocator, FaceLocator},
    face_normalization::FaceNormalizer,
    gaze_processor::{GazePoint, GazeProcessor},
    Error,
};
use opencv::core::Rect;
use proptest::prelude::*;
use test_helpers::*;

#[test]
fn test_no_face_gives_none() {
    let mut processor = fake_processor(FixedLocator(None), FixedModel((0.5, 0.5)));
    let frame = create_test_image(480, 640, 0.0).unwrap();

    assert_eq!(processor.get_gaze_coordinates(&frame), None);
    assert!(matches!(
        processor.try_gaze_coordinates(&frame),
        Err(Error::NoFaceDetected)
    ));
}

#[test]
fn test_face_maps_to_screen_pixels() {
    let face = Rect::new(250, 150, 140, 160);
    let mut processor = fake_processor(FixedLocator(Some(face)), FixedModel((0.25, 0.75)));
    let frame = create_face_like_image(480, 640, face).unwrap();

    assert_eq!(processor.get_gaze_coordinates(&frame), Some(GazePoint::new(160, 360)));
}

#[test]
fn test_full_hd_screen_mapping() {
    let face = Rect::new(250, 150, 140, 160);
    let mut processor = GazeProcessor::new(
        Some(Box::new(FixedLocator(Some(face)))),
        Some(Box::new(FixedModel((0.5, 0.5)))),
        FaceNormalizer::new(30, 224),
        ScreenConfig::full_hd(),
    );
    let frame = create_face_like_image(480, 640, face).unwrap();

    assert_eq!(processor.get_gaze_coordinates(&frame), Some(GazePoint::new(960, 540)));
}

#[test]
fn test_model_receives_batched_nhwc_tensor() {
    let model = RecordingModel::default();
    let shapes = model.shapes.clone();
    let face = Rect::new(100, 100, 80, 80);
    let mut processor = fake_processor(FixedLocator(Some(face)), model);
    let frame = create_face_like_image(480, 640, face).unwrap();

    processor.get_gaze_coordinates(&frame).unwrap();
    assert_eq!(*shapes.lock(), vec![vec![1, 224, 224, 3]]);
}

#[test]
fn test_idempotent_on_identical_frames() {
    let face = Rect::new(200, 120, 180, 200);
    let mut processor = fake_processor(FixedLocator(Some(face)), MeanIntensityModel);
    let frame = create_face_like_image(480, 640, face).unwrap();

    let first = processor.get_gaze_coordinates(&frame);
    let second = processor.get_gaze_coordinates(&frame);
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_out_of_range_output_not_clamped() {
    let face = Rect::new(200, 120, 180, 200);
    let mut processor = fake_processor(FixedLocator(Some(face)), FixedModel((1.5, -0.2)));
    let frame = create_face_like_image(480, 640, face).unwrap();

    let gaze = processor.get_gaze_coordinates(&frame).unwrap();
    assert_eq!(gaze, GazePoint::new(960, -96));
    assert!(!gaze.is_on_screen(ScreenConfig::webcam()));
}

#[test]
fn test_non_finite_output_gives_none() {
    let face = Rect::new(200, 120, 180, 200);
    let mut processor = fake_processor(FixedLocator(Some(face)), FixedModel((f32::NAN, 0.5)));
    let frame = create_face_like_image(480, 640, face).unwrap();

    assert_eq!(processor.get_gaze_coordinates(&frame), None);
}

#[test]
fn test_detector_failure_gives_none() {
    let mut processor = fake_processor(FailingLocator, FixedModel((0.5, 0.5)));
    let frame = create_test_image(480, 640, 0.0).unwrap();

    assert_eq!(processor.get_gaze_coordinates(&frame), None);
    assert!(processor.try_gaze_coordinates(&frame).is_err());
}

#[test]
fn test_box_at_frame_corner_is_clamped() {
    let face = Rect::new(600, 440, 40, 40);
    let mut processor = fake_processor(FixedLocator(Some(face)), FixedModel((0.5, 0.5)));
    let frame = create_face_like_image(480, 640, face).unwrap();

    assert_eq!(processor.get_gaze_coordinates(&frame), Some(GazePoint::new(320, 240)));
}

#[test]
fn test_box_outside_frame_is_degenerate() {
    let mut processor = fake_processor(FixedLocator(Some(Rect::new(700, 500, 10, 10))), FixedModel((0.5, 0.5)));
    let frame = create_test_image(480, 640, 0.0).unwrap();

    assert!(matches!(
        processor.try_gaze_coordinates(&frame),
        Err(Error::DegenerateCrop(_))
    ));
    assert_eq!(processor.get_gaze_coordinates(&frame), None);
}

#[test]
fn test_unavailable_processor_gives_none() {
    let mut processor = GazeProcessor::new(
        Some(Box::new(FixedLocator(Some(Rect::new(0, 0, 50, 50))))),
        None,
        FaceNormalizer::new(30, 224),
        ScreenConfig::webcam(),
    );
    let frame = create_test_image(480, 640, 0.0).unwrap();

    assert!(!processor.is_available());
    assert!(processor.has_locator());
    assert_eq!(processor.get_gaze_coordinates(&frame), None);
    assert!(matches!(
        processor.try_gaze_coordinates(&frame),
        Err(Error::ModelLoad(_))
    ));
}

#[test]
#[ignore = "Requires OpenCV cascade data"]
fn test_cascade_finds_no_face_in_blank_frame() {
    let mut locator = CascadeFaceLocator::new(&DetectorConfig::default()).unwrap();
    let frame = create_test_image(480, 640, 0.0).unwrap();

    assert_eq!(locator.locate(&frame).unwrap(), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unit_output_lands_on_screen(nx in 0.0f32..=1.0, ny in 0.0f32..=1.0) {
        let face = Rect::new(200, 120, 180, 200);
        let mut processor = fake_processor(FixedLocator(Some(face)), FixedModel((nx, ny)));
        let frame = create_test_image(240, 320, 90.0).unwrap();

        let gaze = processor.get_gaze_coordinates(&frame).unwrap();
        prop_assert!((0..=640).contains(&gaze.x));
        prop_assert!((0..=480).contains(&gaze.y));
    }
}
