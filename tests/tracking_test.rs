use constellation_track::{
    AdvancePolicy, ConsistencyThresholds, ConstellationConfig, ConstellationTracker, Frame, InMemoryFrames,
    Metric, Point2D, SessionConfig, SessionEvent, SessionState, StepOutcome, StopReason, TrackError,
    TrackingSession,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn blank() -> Frame {
    Frame::filled(64, 64, 0).unwrap()
}

/// Smooth texture shifted by (dr, dc).
fn textured(width: usize, height: usize, dr: i32, dc: i32) -> Frame {
    Frame::from_fn(width, height, |r, c| {
        let r = (r as i32 - dr) as f32;
        let c = (c as i32 - dc) as f32;
        let v = 128.0 + 60.0 * (r * 0.45).sin() + 60.0 * (c * 0.3 + r * 0.1).cos();
        v.clamp(0.0, 255.0) as u8
    })
    .unwrap()
}

fn checkerboard() -> Frame {
    Frame::from_fn(64, 64, |r, c| if (r / 4 + c / 4) % 2 == 0 { 0 } else { 255 }).unwrap()
}

fn session(frames: Vec<Frame>, tracker: ConstellationConfig, config: SessionConfig) -> TrackingSession<InMemoryFrames> {
    let backend = ConstellationTracker::new(tracker).unwrap();
    TrackingSession::new(InMemoryFrames::from(frames), Box::new(backend), config).unwrap()
}

#[test]
fn test_blank_frames_keep_constellation() {
    let mut s = session(vec![blank(), blank()], ConstellationConfig::default(), SessionConfig::default());
    let click = Point2D::new(32, 32);

    let activated = s.handle(SessionEvent::Select(click)).unwrap();
    assert!(matches!(activated, StepOutcome::Activated(_)));
    assert_eq!(s.state(), SessionState::Tracking);

    // event-gated: the next click advances one frame
    let StepOutcome::Advanced(snapshot) = s.handle(SessionEvent::Select(click)).unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(snapshot.frame_index, 1);
    let state = snapshot.output.as_constellation().unwrap();
    assert_eq!(state.center, click);
    assert_eq!(state.shape_change(), 0.0);

    let done = s.handle(SessionEvent::Select(click)).unwrap();
    assert!(matches!(done, StepOutcome::Stopped(StopReason::Exhausted)));
}

#[test]
fn test_click_near_corner_fails_initialization() {
    let mut s = session(vec![blank(), blank()], ConstellationConfig::default(), SessionConfig::default());
    let err = s.handle(SessionEvent::Select(Point2D::new(1, 1))).unwrap_err();
    assert!(matches!(err, TrackError::Initialization { .. }));
    assert_eq!(s.state(), SessionState::AwaitingSelection);

    // a new selection is still accepted
    assert!(matches!(
        s.handle(SessionEvent::Select(Point2D::new(30, 30))).unwrap(),
        StepOutcome::Activated(_)
    ));
}

#[test]
fn test_painted_out_target_exceeds_correlation_threshold() {
    let first = checkerboard();
    let mut rng = StdRng::seed_from_u64(42);
    let noise: Vec<u8> = (0..64 * 64).map(|_| rng.random()).collect();
    let second = Frame::from_fn(64, 64, |r, c| {
        if (16..48).contains(&r) && (16..48).contains(&c) {
            noise[r * 64 + c]
        } else if (r / 4 + c / 4) % 2 == 0 {
            0
        } else {
            255
        }
    })
    .unwrap();

    let tracker = ConstellationConfig::default().with_min_match_confidence(0.1);
    let config = SessionConfig::default()
        .with_advance(AdvancePolicy::Auto)
        .with_thresholds(ConsistencyThresholds::default().with_max_correlation_error(0.25));
    let mut s = session(vec![first, second], tracker, config);

    let snapshots = s
        .run([SessionEvent::Select(Point2D::new(32, 32)), SessionEvent::Advance])
        .unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        s.state(),
        SessionState::Stopped(StopReason::ThresholdExceeded(Metric::CorrelationError))
    );
    let error = s.last_snapshot().unwrap().metrics().unwrap().correlation_error;
    assert!(error > 0.25, "correlation error {error}");
    assert!(s.backend_kind().is_none());
}

#[test]
fn test_total_loss_stops_without_new_state() {
    let frames = vec![Frame::filled(48, 48, 0).unwrap(), Frame::filled(48, 48, 255).unwrap()];
    let mut s = session(frames, ConstellationConfig::default(), SessionConfig::default());
    s.handle(SessionEvent::Select(Point2D::new(24, 24))).unwrap();

    let outcome = s.handle(SessionEvent::Select(Point2D::new(24, 24))).unwrap();
    assert!(matches!(outcome, StepOutcome::Stopped(StopReason::TrackLost)));
    assert!(matches!(s.last_error(), Some(TrackError::TrackLoss { .. })));
    // the only reported state is the one from activation
    assert_eq!(s.last_snapshot().unwrap().frame_index, 0);
}

#[test]
fn test_leaving_the_frame_is_a_boundary_violation() {
    let prev = textured(40, 40, 0, 0);
    let curr = textured(40, 40, -3, 0);
    let config = SessionConfig::default().with_advance(AdvancePolicy::Auto);
    let mut s = session(vec![prev, curr], ConstellationConfig::default(), config);

    s.handle(SessionEvent::Select(Point2D::new(7, 20))).unwrap();
    let outcome = s.step().unwrap();
    assert!(matches!(outcome, StepOutcome::Stopped(StopReason::BoundaryViolation)));
    match s.last_error() {
        Some(TrackError::BoundaryViolation { point_index, position }) => {
            assert_eq!(*point_index, 3);
            assert_eq!(*position, Point2D::new(-1, 20));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_gradual_exit_is_not_pinned_to_the_edge() {
    // scene drifts up one row per frame; the top point reaches row -1 on the third update
    let frames: Vec<Frame> = (0..7).map(|i| textured(40, 40, -i, 0)).collect();
    let config = SessionConfig::default().with_advance(AdvancePolicy::Auto);
    let mut s = session(frames, ConstellationConfig::default(), config);

    s.handle(SessionEvent::Select(Point2D::new(7, 20))).unwrap();
    let snapshots = s.run(std::iter::repeat_n(SessionEvent::Advance, 6)).unwrap();
    assert_eq!(snapshots.len(), 2);
    let last = snapshots[1].output.as_constellation().unwrap();
    assert_eq!(last.top, Point2D::new(0, 20));
    assert_eq!(last.center, Point2D::new(5, 20));

    assert_eq!(s.state(), SessionState::Stopped(StopReason::BoundaryViolation));
    assert_eq!(s.frame_index(), 3);
    assert!(matches!(
        s.last_error(),
        Some(TrackError::BoundaryViolation { point_index: 3, position }) if *position == Point2D::new(-1, 20)
    ));
}

#[test]
fn test_noise_frame_loses_track_with_defaults() {
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Frame::from_fn(64, 64, |_, _| rng.random()).unwrap();
    for first in [checkerboard(), textured(64, 64, 0, 0)] {
        let mut tracker = ConstellationTracker::new(ConstellationConfig::default()).unwrap();
        let s0 = tracker.activate(&first, Point2D::new(32, 32)).unwrap();
        let err = tracker.update(&first, &noise, &s0).unwrap_err();
        match err {
            TrackError::TrackLoss { best_confidence } => {
                assert!(best_confidence < ConstellationConfig::default().min_match_confidence)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!tracker.is_tracking_activated());
    }

    let mut s = session(
        vec![checkerboard(), noise.clone()],
        ConstellationConfig::default(),
        SessionConfig::default(),
    );
    s.handle(SessionEvent::Select(Point2D::new(32, 32))).unwrap();
    let outcome = s.handle(SessionEvent::Select(Point2D::new(32, 32))).unwrap();
    assert!(matches!(outcome, StepOutcome::Stopped(StopReason::TrackLost)));
}

#[test]
fn test_identical_frames_are_idempotent() {
    let frame = textured(64, 64, 0, 0);
    let mut tracker = ConstellationTracker::new(ConstellationConfig::default()).unwrap();
    let s0 = tracker.activate(&frame, Point2D::new(30, 25)).unwrap();
    let s1 = tracker.update(&frame, &frame, &s0).unwrap();
    assert_eq!(s1.points(), s0.points());
    assert_eq!(s1.shape_change(), 0.0);
    assert!(s1.correlation_error() < 1e-6);
}

#[test]
fn test_activation_inside_margin() {
    let frame = blank();
    let mut tracker = ConstellationTracker::new(ConstellationConfig::default()).unwrap();
    for row in (6..58).step_by(3) {
        for col in (6..58).step_by(5) {
            let state = tracker.activate(&frame, Point2D::new(row, col)).unwrap();
            let points = state.points();
            for (i, p) in points.iter().enumerate() {
                assert!(frame.contains(*p));
                assert!(points[i + 1..].iter().all(|q| q != p));
            }
        }
    }
}

#[test]
fn test_activation_near_edges_fails() {
    let frame = blank();
    let mut tracker = ConstellationTracker::new(ConstellationConfig::default()).unwrap();
    let near_edge = (-2..=5).chain(58..66);
    for v in near_edge {
        for click in [Point2D::new(v, 32), Point2D::new(32, v)] {
            assert!(
                matches!(tracker.activate(&frame, click), Err(TrackError::Initialization { .. })),
                "click {click} should fail"
            );
        }
    }
    assert!(!tracker.is_tracking_activated());
}

#[test]
fn test_auto_policy_walks_to_the_end() {
    let frames: Vec<Frame> = (0..4).map(|i| textured(64, 64, i, i)).collect();
    let config = SessionConfig::default().with_advance(AdvancePolicy::Auto);
    let mut s = session(frames, ConstellationConfig::default(), config);

    s.handle(SessionEvent::Select(Point2D::new(30, 30))).unwrap();
    // selections do not advance under the auto policy
    assert!(matches!(
        s.handle(SessionEvent::Select(Point2D::new(10, 10))).unwrap(),
        StepOutcome::Ignored
    ));
    let snapshots = s.run(std::iter::repeat_n(SessionEvent::Advance, 10)).unwrap();
    assert_eq!(snapshots.len(), 3);
    let last = snapshots[2].output.as_constellation().unwrap();
    assert_eq!(last.center, Point2D::new(33, 33));
    assert_eq!(last.frame_index, 3);
    assert_eq!(s.state(), SessionState::Stopped(StopReason::Exhausted));
}

#[test]
fn test_event_gated_ignores_advance() {
    let mut s = session(vec![blank(), blank()], ConstellationConfig::default(), SessionConfig::default());
    s.handle(SessionEvent::Select(Point2D::new(32, 32))).unwrap();
    assert!(matches!(s.step().unwrap(), StepOutcome::Ignored));
    assert_eq!(s.frame_index(), 0);

    assert!(matches!(
        s.handle(SessionEvent::Quit).unwrap(),
        StepOutcome::Stopped(StopReason::Quit)
    ));

    // re-selection happens on a fresh session over the same frames
    let frames = s.into_source();
    let backend = ConstellationTracker::new(ConstellationConfig::default()).unwrap();
    let mut again = TrackingSession::new(frames, Box::new(backend), SessionConfig::default()).unwrap();
    assert!(matches!(
        again.handle(SessionEvent::Select(Point2D::new(20, 20))).unwrap(),
        StepOutcome::Activated(_)
    ));
}
