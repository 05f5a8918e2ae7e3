mod common;

use common::{Dataset, FakeDecoder, ramp_image, sample_labels, spacing};
use ndarray::Array3;
use nifti_volume::session::{HIDE_OVERLAY_TEXT, SHOW_OVERLAY_TEXT};
use nifti_volume::{
    DegeneratePolicy, PairingError, SelectOutcome, Session, SessionError, SessionState, SoftwareRenderer,
    ViewerConfig, Volume,
};

fn session_for(dataset: &Dataset, decoder: FakeDecoder) -> Session<FakeDecoder, SoftwareRenderer> {
    let config = ViewerConfig {
        screenshot_dir: dataset.root.path().to_path_buf(),
        ..ViewerConfig::default()
    };
    Session::new(decoder, SoftwareRenderer::default(), &config)
}

fn loaded_session(dataset: &Dataset) -> Session<FakeDecoder, SoftwareRenderer> {
    let (image, label) = dataset.touch_pair("case001.nii.gz");
    let s = spacing(2.0, 2.0, 2.0);
    let decoder = FakeDecoder::default()
        .with_image(&image, ramp_image(s))
        .with_labels(&label, sample_labels(s));
    let mut session = session_for(dataset, decoder);
    let outcome = session.select_files(Some(image.as_path())).unwrap();
    assert!(matches!(outcome, SelectOutcome::Loaded(_)));
    session
}

#[test]
fn starts_empty() {
    let dataset = Dataset::new();
    let session = session_for(&dataset, FakeDecoder::default());
    assert_eq!(session.state(), &SessionState::Empty);
    assert_eq!(session.label_visible(), None);
    assert_eq!(session.report_html(), "<b>体积统计信息：</b>");
    assert_eq!(session.renderer().actor_count(), 0);
}

#[test]
fn load_reports_label_volumes() {
    let dataset = Dataset::new();
    let session = loaded_session(&dataset);

    assert!(session.is_loaded());
    assert_eq!(session.label_visible(), Some(true));
    assert_eq!(session.overlay_button_text(), HIDE_OVERLAY_TEXT);
    assert_eq!(session.renderer().actor_count(), 2);

    let stats = session.stats().unwrap();
    assert_eq!(stats.voxel_volume_mm3, 8.0);
    assert_eq!(stats.volume_mm3(1), Some(16.0));
    assert_eq!(stats.volume_mm3(2), Some(8.0));
    assert_eq!(stats.get(0), None);
    assert_eq!(
        session.report_html(),
        "<b>体积统计（单位：mm³）</b><br>标签 1: 16.00 mm³<br>标签 2: 8.00 mm³"
    );
}

#[test]
fn cancelled_selection_changes_nothing() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);
    let before = session.state().clone();
    assert_eq!(session.select_files(None).unwrap(), SelectOutcome::Cancelled);
    assert_eq!(session.state(), &before);

    let mut empty = session_for(&dataset, FakeDecoder::default());
    assert_eq!(empty.select_files(None).unwrap(), SelectOutcome::Cancelled);
    assert_eq!(empty.state(), &SessionState::Empty);
}

#[test]
fn missing_label_keeps_current_scene() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);
    let before = session.state().clone();

    let orphan = dataset.image("case002.nii.gz");
    std::fs::write(&orphan, b"").unwrap();
    let outcome = session.select_files(Some(orphan.as_path())).unwrap();

    let expected = dataset.label("case002.nii.gz");
    assert_eq!(
        outcome,
        SelectOutcome::LabelNotFound {
            attempted: expected.clone()
        }
    );
    assert_eq!(
        outcome.status_message(),
        Some(format!("未找到标签文件：{}", expected.display()))
    );
    assert_eq!(session.state(), &before);
    assert_eq!(session.renderer().actor_count(), 2);
}

#[test]
fn image_outside_marker_directory_is_not_its_own_label() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);
    let before = session.state().clone();

    let scans = dataset.root.path().join("scans");
    std::fs::create_dir_all(&scans).unwrap();
    let stray = scans.join("case001.nii.gz");
    std::fs::write(&stray, b"").unwrap();
    let s = spacing(1.0, 1.0, 1.0);
    let decoder = FakeDecoder::default()
        .with_image(&stray, ramp_image(s))
        .with_labels(&stray, sample_labels(s));
    let mut fresh = session_for(&dataset, decoder);

    for target in [&mut session, &mut fresh] {
        let outcome = target.select_files(Some(stray.as_path())).unwrap();
        assert_eq!(
            outcome,
            SelectOutcome::LabelNotFound {
                attempted: stray.clone()
            }
        );
    }
    assert_eq!(session.state(), &before);
    assert_eq!(fresh.state(), &SessionState::Empty);
    assert_eq!(fresh.renderer().actor_count(), 0);
}

#[test]
fn toggling_twice_restores_visibility() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);
    let SessionState::Loaded(scene) = session.state().clone() else {
        panic!("expected a loaded scene");
    };

    assert!(!session.toggle_overlay().unwrap());
    assert_eq!(session.overlay_button_text(), SHOW_OVERLAY_TEXT);
    assert_eq!(session.renderer().is_visible(scene.label_actor), Some(false));
    assert_eq!(session.renderer().is_visible(scene.image_actor), Some(true));

    assert!(session.toggle_overlay().unwrap());
    assert_eq!(session.label_visible(), Some(true));
    assert_eq!(session.renderer().is_visible(scene.label_actor), Some(true));
}

#[test]
fn reload_resets_overlay_and_replaces_actors() {
    let dataset = Dataset::new();
    let (image, label) = dataset.touch_pair("case001.nii.gz");
    let s = spacing(1.0, 1.0, 1.0);
    let decoder = FakeDecoder::default()
        .with_image(&image, ramp_image(s))
        .with_labels(&label, sample_labels(s));
    let mut session = session_for(&dataset, decoder);

    session.select_files(Some(image.as_path())).unwrap();
    session.toggle_overlay().unwrap();
    assert_eq!(session.label_visible(), Some(false));

    session.select_files(Some(image.as_path())).unwrap();
    assert_eq!(session.label_visible(), Some(true));
    assert_eq!(session.renderer().actor_count(), 2);
    assert_eq!(session.stats().unwrap().volume_mm3(1), Some(2.0));
}

#[test]
fn decode_failure_keeps_previous_scene() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);
    let before = session.state().clone();

    let (broken, _) = dataset.touch_pair("broken.nii.gz");
    let err = session.select_files(Some(broken.as_path())).unwrap_err();
    assert!(matches!(err, SessionError::Decode(_)));
    assert_eq!(session.state(), &before);
    assert_eq!(session.renderer().actor_count(), 2);
}

#[test]
fn empty_volume_keeps_previous_scene() {
    let dataset = Dataset::new();
    let (image, label) = dataset.touch_pair("case001.nii.gz");
    let (hollow_image, hollow_label) = dataset.touch_pair("hollow.nii.gz");
    let s = spacing(2.0, 2.0, 2.0);
    let decoder = FakeDecoder::default()
        .with_image(&image, ramp_image(s))
        .with_labels(&label, sample_labels(s))
        .with_image(&hollow_image, Volume::new(Array3::zeros((0, 2, 2)), s))
        .with_labels(&hollow_label, Volume::new(Array3::zeros((0, 2, 2)), s));
    let mut session = session_for(&dataset, decoder);
    session.select_files(Some(image.as_path())).unwrap();
    let before = session.state().clone();

    let err = session.select_files(Some(hollow_image.as_path())).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Misregistered(PairingError::EmptyVolume((0, 2, 2)))
    ));
    assert_eq!(session.state(), &before);
    assert_eq!(session.renderer().actor_count(), 2);
}

#[test]
fn misregistered_pair_is_rejected() {
    let dataset = Dataset::new();
    let (image, label) = dataset.touch_pair("case001.nii.gz");
    let decoder = FakeDecoder::default()
        .with_image(&image, ramp_image(spacing(1.0, 1.0, 1.0)))
        .with_labels(&label, sample_labels(spacing(1.0, 1.0, 3.0)));
    let mut session = session_for(&dataset, decoder);

    let err = session.select_files(Some(image.as_path())).unwrap_err();
    assert!(matches!(err, SessionError::Misregistered(_)));
    assert_eq!(session.state(), &SessionState::Empty);
}

#[test]
fn constant_image_policies() {
    let dataset = Dataset::new();
    let (image, label) = dataset.touch_pair("flat.nii.gz");
    let s = spacing(1.0, 1.0, 1.0);
    let flat = Volume::new(Array3::from_elem((2, 2, 2), 0.5f32), s);
    let decoder = || {
        FakeDecoder::default()
            .with_image(&image, flat.clone())
            .with_labels(&label, sample_labels(s))
    };

    let mut zeroing = session_for(&dataset, decoder());
    assert!(matches!(
        zeroing.select_files(Some(image.as_path())).unwrap(),
        SelectOutcome::Loaded(_)
    ));

    let config = ViewerConfig {
        degenerate_policy: DegeneratePolicy::Reject,
        ..ViewerConfig::default()
    };
    let mut rejecting = Session::new(decoder(), SoftwareRenderer::default(), &config);
    let err = rejecting.select_files(Some(image.as_path())).unwrap_err();
    assert!(matches!(err, SessionError::Normalize(_)));
    assert!(!rejecting.is_loaded());
}

#[test]
fn actions_require_a_loaded_pair() {
    let dataset = Dataset::new();
    let mut session = session_for(&dataset, FakeDecoder::default());
    assert!(matches!(session.toggle_overlay(), Err(SessionError::NotLoaded)));
    assert!(matches!(session.export_screenshot(), Err(SessionError::NotLoaded)));
}

#[test]
fn screenshot_is_timestamped_png() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);

    let path = session.export_screenshot().unwrap();
    assert_eq!(path.parent(), Some(dataset.root.path()));
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("screenshot_") && name.ends_with(".png"));
    assert_eq!(name.len(), "screenshot_yyyymmdd_hhmmss.png".len());

    let frame = image::open(&path).unwrap();
    assert_eq!((frame.width(), frame.height()), (2, 2));
    assert!(session.is_loaded());
}

#[test]
fn hidden_overlay_changes_the_frame() {
    let dataset = Dataset::new();
    let mut session = loaded_session(&dataset);
    let shown = dataset.root.path().join("shown.png");
    let hidden = dataset.root.path().join("hidden.png");

    session.export_screenshot_to(&shown).unwrap();
    session.toggle_overlay().unwrap();
    session.export_screenshot_to(&hidden).unwrap();

    let shown = image::open(&shown).unwrap().to_rgb8();
    let hidden = image::open(&hidden).unwrap().to_rgb8();
    assert_ne!(shown.as_raw(), hidden.as_raw());
}
