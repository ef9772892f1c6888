//! End-to-end checks across guest, filters, analysis and the capture loop

use std::time::Duration;

use luma_analysis::{FrameAnalyzer, Severity, Status};
use luma_core::{AlertFlags, Frame, FrameSize, LumaError};
use luma_filter::{apply, apply_named, Filter, TonePreset};
use luma_guest::{MemoryConfig, NativeGuest, Session, HEAP_BASE};
use luma_runtime::{CaptureConfig, CaptureLoop, FrameSource, TickOutcome};
use luma_test::{OfflineSource, RecordingDisplay, Scenario, Scene, SceneSource, SKIN};
use proptest::prelude::*;

const FACE_SIZE: FrameSize = FrameSize::new(40, 30);

fn processed_flags(outcomes: Vec<Option<TickOutcome>>) -> Vec<AlertFlags> {
    outcomes
        .into_iter()
        .filter_map(|o| match o {
            Some(TickOutcome::Processed(report)) => Some(report.flags),
            _ => None,
        })
        .collect()
}

// ============================================================================
// STILL IMAGES
// ============================================================================

#[test]
fn grayscale_reference_frame() {
    let mut session = Session::new(NativeGuest::with_config(MemoryConfig::still_image()));
    let mut frame = Frame::from_rgba(
        FrameSize::new(2, 2),
        vec![
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 255, 255, //
            10, 10, 10, 255,
        ],
    )
    .unwrap();

    apply(&mut session, &mut frame, &Filter::Grayscale).unwrap();

    assert_eq!(
        frame.as_bytes(),
        &[
            76, 76, 76, 255, //
            150, 150, 150, 255, //
            29, 29, 29, 255, //
            10, 10, 10, 255,
        ]
    );
    assert_eq!(session.live_buffers(), 0);
}

#[test]
fn every_named_filter_runs_without_leaking() {
    let mut session = Session::new(NativeGuest::with_config(MemoryConfig::still_image()));
    let original = Frame::from_fn(FrameSize::new(64, 48), |x, y| {
        [(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8, 255]
    });

    for name in [
        "grayscale",
        "invert",
        "brightness:40",
        "threshold:100",
        "sepia",
        "contrast:1.5",
        "saturation:0.5",
        "edgeDetect",
        "blur",
        "vintage",
        "cool",
        "warm",
    ] {
        let mut frame = original.clone();
        let filter = apply_named(&mut session, &mut frame, name).unwrap();
        assert_eq!(frame.size(), original.size(), "{}", filter);
        assert!(frame.pixels().all(|px| px[3] == 255), "{} touched alpha", filter);
    }

    assert_eq!(session.live_buffers(), 0);
    assert_eq!(session.arena_stats().unwrap().live_allocations, 0);
    assert_eq!(session.epoch(), 0);
}

#[test]
fn threshold_is_binary_and_deterministic() {
    let mut session = Session::new(NativeGuest::new());
    let source = Frame::from_fn(FrameSize::new(32, 32), |x, y| {
        [(x * 8) as u8, (y * 8) as u8, 128, 200]
    });

    let mut a = source.clone();
    let mut b = source.clone();
    apply(&mut session, &mut a, &Filter::Threshold(128)).unwrap();
    apply(&mut session, &mut b, &Filter::Threshold(128)).unwrap();

    assert_eq!(a, b);
    for px in a.pixels() {
        assert!(px[..3].iter().all(|&c| c == 0 || c == 255));
        assert_eq!(px[3], 200);
    }
}

#[test]
fn unknown_filter_leaves_frame_untouched() {
    let mut session = Session::new(NativeGuest::new());
    let mut frame = Frame::filled(FrameSize::new(4, 4), SKIN);

    let err = apply_named(&mut session, &mut frame, "lomo").unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(frame, Frame::filled(FrameSize::new(4, 4), SKIN));
    assert_eq!(session.live_buffers(), 0);
}

// ============================================================================
// LIVE ANALYSIS
// ============================================================================

#[test]
fn scripted_scenes_raise_expected_alerts() {
    let script = vec![
        Scene::centred_face(),
        Scene::centred_face(),
        Scene::TwoFaces,
        Scene::Empty,
        Scene::Solid([250, 250, 250, 255]),
    ];
    let mut scenario = Scenario::new(FACE_SIZE, script).unwrap();
    scenario.start().unwrap();

    assert_eq!(scenario.run_frames(5), 5);
    let reports = scenario.metrics().reports();

    assert!(reports[0].flags.is_empty());
    assert!(reports[1].flags.is_empty());
    assert_eq!(reports[1].status(), Status::Nominal);
    assert_eq!(reports[1].metrics.face_presence, 100);

    assert!(reports[2].flags.multiple_faces());
    assert!(!reports[2].flags.no_face());
    assert!(!reports[2].flags.looking_away());

    assert_eq!(reports[3].flags, AlertFlags(AlertFlags::NO_FACE));
    assert_eq!(reports[3].alerts.len(), 1);
    assert_eq!(reports[3].alerts[0].severity, Severity::Info);
    assert_eq!(reports[3].status(), Status::Alert);

    let flash = reports[4].flags;
    assert!(flash.brightness_change());
    assert!(flash.excessive_motion());
    assert!(flash.no_face());
    assert_eq!(reports[4].metrics.motion_score, 100);

    assert_eq!(scenario.capture().status(), Status::Alert);
    scenario.stop().unwrap();
    assert_eq!(scenario.live_buffers(), 0);
    assert_eq!(scenario.capture().status(), Status::Idle);
}

#[test]
fn face_moving_right_is_looking_away() {
    let script = vec![Scene::centred_face(), Scene::face_right()];
    let mut scenario = Scenario::new(FACE_SIZE, script).unwrap();
    scenario.start().unwrap();

    scenario.run_frames(2);
    let report = scenario.metrics().last().unwrap();
    assert!(report.flags.looking_away());
    assert!(!report.flags.no_face());
    assert!(!report.flags.multiple_faces());

    scenario.stop().unwrap();
}

#[test]
fn one_previous_buffer_while_running_none_after_stop() {
    let mut scenario = Scenario::new(FACE_SIZE, vec![Scene::Noise]).unwrap();
    scenario.start().unwrap();

    for _ in 0..10 {
        assert_eq!(scenario.run_frames(1), 1);
        assert_eq!(scenario.live_buffers(), 1);
    }

    scenario.stop().unwrap();
    assert_eq!(scenario.live_buffers(), 0);
    let arena = scenario.capture().memory_stats().arena.unwrap();
    assert_eq!(arena.live_allocations, 0);
    assert_eq!(arena.high_water, HEAP_BASE);
}

#[test]
fn memory_settles_after_first_frame() {
    // 160x120 frames need more than the single initial page
    let size = FrameSize::new(160, 120);
    let config = CaptureConfig {
        width: size.width,
        height: size.height,
        ..Default::default()
    };
    let mut scenario =
        Scenario::with_config(size, vec![Scene::Noise], config, MemoryConfig::tiny(1, 16)).unwrap();
    scenario.start().unwrap();

    scenario.run_frames(1);
    let settled = scenario.capture().memory_stats();
    assert!(settled.epoch > 0);
    assert!(settled.pages > 1);

    scenario.run_frames(20);
    let later = scenario.capture().memory_stats();
    assert_eq!(later.pages, settled.pages);
    assert_eq!(later.epoch, settled.epoch);
    assert_eq!(later.arena.unwrap().peak, settled.arena.unwrap().peak);

    scenario.stop().unwrap();
}

#[test]
fn throttle_processes_at_target_rate() {
    let config = CaptureConfig {
        target_fps: 20,
        width: FACE_SIZE.width,
        height: FACE_SIZE.height,
        tick_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let mut scenario = Scenario::with_config(
        FACE_SIZE,
        vec![Scene::centred_face()],
        config,
        MemoryConfig::default(),
    )
    .unwrap();
    scenario.start().unwrap();

    // One second of 10ms ticks at a 50ms target interval
    scenario.advance(100);
    let stats = scenario.capture().stats().clone();
    assert_eq!(stats.frames_processed, 20);
    assert_eq!(stats.skipped_ticks, 80);
    assert_eq!(stats.measured_fps, 20);

    scenario.stop().unwrap();
}

#[test]
fn restart_does_not_leak_or_compare_across_runs() {
    let mut scenario = Scenario::new(
        FACE_SIZE,
        vec![Scene::Empty, Scene::Empty, Scene::Solid([250, 250, 250, 255])],
    )
    .unwrap();

    scenario.start().unwrap();
    scenario.run_frames(2);
    scenario.stop().unwrap();
    assert_eq!(scenario.live_buffers(), 0);

    scenario.start().unwrap();
    let flags = processed_flags(scenario.advance(1));
    assert_eq!(flags, vec![AlertFlags::NONE]);
    assert_eq!(scenario.metrics().last().unwrap().frame_number, 1);
    assert_eq!(scenario.live_buffers(), 1);

    scenario.stop().unwrap();
    assert_eq!(scenario.live_buffers(), 0);
}

#[test]
fn device_dropout_is_reported_and_skipped() {
    let script = vec![
        Scene::centred_face(),
        Scene::Unavailable,
        Scene::centred_face(),
    ];
    let mut scenario = Scenario::new(FACE_SIZE, script).unwrap();
    scenario.start().unwrap();

    scenario.run_frames(2);
    assert_eq!(scenario.errors().len(), 1);
    assert!(matches!(scenario.errors()[0], LumaError::SourceUnavailable(_)));
    assert!(scenario.capture().is_running());
    assert_eq!(scenario.capture().stats().recoverable_errors, 1);
    assert_eq!(scenario.live_buffers(), 1);

    scenario.stop().unwrap();
}

#[test]
fn display_failure_keeps_analysis_going() {
    let config = CaptureConfig {
        width: FACE_SIZE.width,
        height: FACE_SIZE.height,
        ..Default::default()
    };
    let display = RecordingDisplay::new().fail_on(2);
    let mut scenario = Scenario::with_display(
        FACE_SIZE,
        vec![Scene::centred_face()],
        config,
        MemoryConfig::default(),
        display,
    )
    .unwrap();
    scenario.start().unwrap();

    scenario.run_frames(3);
    assert_eq!(scenario.metrics().len(), 3);
    assert_eq!(scenario.display().len(), 2);
    assert!(matches!(scenario.errors()[0], LumaError::DisplayError(_)));
    assert_eq!(scenario.live_buffers(), 1);

    scenario.stop().unwrap();
}

#[test]
fn offline_source_never_starts() {
    let session = Session::new(NativeGuest::new());
    let mut capture =
        CaptureLoop::new(session, OfflineSource, CaptureConfig::default()).unwrap();

    assert!(matches!(capture.start(), Err(LumaError::SourceUnavailable(_))));
    assert!(!capture.is_running());
    assert_eq!(capture.session().live_buffers(), 0);
}

#[test]
fn stale_window_is_rederived_after_growth() {
    let mut session = Session::new(NativeGuest::with_config(MemoryConfig::tiny(1, 16)));
    let marker = session.upload(&[0xAB; 32]).unwrap();
    let window = session.window(&marker);

    let mut analyzer = FrameAnalyzer::new();
    let size = FrameSize::new(160, 120);
    let mut source = SceneSource::constant(size, Scene::Noise);
    source.open(size).unwrap();
    let frame = source.next_frame().unwrap().unwrap();
    analyzer.process(&mut session, &frame).unwrap();
    let epoch = session.epoch();
    assert!(epoch > window.epoch());

    let view = session.rederive(window).unwrap();
    assert!(view.iter().all(|&b| b == 0xAB));
    assert_eq!(view.epoch(), epoch);
    drop(view);
    assert_eq!(session.rederived_views(), 1);

    analyzer.stop(&mut session).unwrap();
    session.release(marker).unwrap();
    assert_eq!(session.live_buffers(), 0);
}

#[test]
fn preset_changes_tone() {
    let mut session = Session::new(NativeGuest::new());
    let grey = Frame::filled(FrameSize::new(9, 9), [120, 120, 120, 255]);

    let mut warm = grey.clone();
    apply(&mut session, &mut warm, &Filter::Preset(TonePreset::Warm)).unwrap();
    let mut cool = grey.clone();
    apply(&mut session, &mut cool, &Filter::Preset(TonePreset::Cool)).unwrap();

    let [wr, _, wb, _] = warm.pixel(4, 4);
    let [cr, _, cb, _] = cool.pixel(4, 4);
    assert!(wr > wb);
    assert!(cb > cr);
}

// ============================================================================
// ASYNC DRIVER
// ============================================================================

#[tokio::test(start_paused = true)]
async fn run_stops_from_another_task() {
    let mut scenario = Scenario::new(FACE_SIZE, vec![Scene::centred_face()]).unwrap();
    let handle = scenario.capture().stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.stop();
    });

    let stats = scenario.capture_mut().run().await.unwrap();
    assert!(stats.frames_processed >= 10, "{}", stats);
    assert!(!scenario.capture().is_running());
    assert_eq!(scenario.live_buffers(), 0);
    assert_eq!(scenario.metrics().len() as u64, stats.frames_processed);
    assert!(scenario.metrics().statuses().iter().all(|s| *s == Status::Nominal));
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_arbitrary_frame_sizes_never_leak(
        sizes in proptest::collection::vec((1u32..48, 1u32..48), 1..12)
    ) {
        let mut session = Session::new(NativeGuest::with_config(MemoryConfig::tiny(1, 8)));
        let mut analyzer = FrameAnalyzer::new();

        for (w, h) in sizes {
            let frame = Frame::filled(FrameSize::new(w, h), [w as u8, h as u8, 7, 255]);
            analyzer.process(&mut session, &frame).unwrap();
            prop_assert_eq!(session.live_buffers(), 1);
        }

        analyzer.stop(&mut session).unwrap();
        let arena = session.arena_stats().unwrap();
        prop_assert_eq!(arena.live_allocations, 0);
        prop_assert_eq!(arena.high_water, HEAP_BASE);
    }

    #[test]
    fn prop_invert_round_trips_through_guest(
        w in 1u32..24,
        h in 1u32..24,
        seed in any::<u8>(),
    ) {
        let mut session = Session::new(NativeGuest::new());
        let original = Frame::from_fn(FrameSize::new(w, h), |x, y| {
            [seed.wrapping_add(x as u8), seed ^ (y as u8), (x * y) as u8, seed]
        });
        let mut frame = original.clone();

        apply(&mut session, &mut frame, &Filter::Invert).unwrap();
        apply(&mut session, &mut frame, &Filter::Invert).unwrap();

        prop_assert_eq!(frame, original);
        prop_assert_eq!(session.live_buffers(), 0);
    }
}
