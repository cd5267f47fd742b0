use crate::backend::{BackendKind, BackendOutput, TrackingBackend};
use crate::error::{Result, TrackError};
use crate::frame::{FrameSource, Point2D};
use crate::session::config::{AdvancePolicy, SessionConfig};
use crate::session::event::SessionEvent;
use crate::session::state::{SessionState, StopReason};
use crate::tracker::ConsistencyMetrics;

/// Immutable result of one activation or update, handed to consumers.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Frame the output refers to.
    pub frame_index: usize,
    pub output: BackendOutput,
}

impl Snapshot {
    pub fn metrics(&self) -> Option<&ConsistencyMetrics> {
        self.output.metrics()
    }
}

/// What handling one event did.
#[derive(Debug)]
pub enum StepOutcome {
    /// The backend was activated on the displayed frame.
    Activated(Snapshot),
    /// One frame pair was processed and tracking continues.
    Advanced(Snapshot),
    /// A recoverable backend failure consumed this frame pair; tracking continues.
    Skipped { frame_index: usize, error: TrackError },
    /// The session stopped while handling the event.
    Stopped(StopReason),
    /// The event has no effect in the current state.
    Ignored,
}

/// Owns the frame walk and the active backend.
///
/// All mutable tracking state lives here. The backend is dropped when the
/// session stops; a new target needs a new session, see [`Self::into_source`].
pub struct TrackingSession<S: FrameSource> {
    source: S,
    backend: Option<Box<dyn TrackingBackend>>,
    config: SessionConfig,
    state: SessionState,
    frame_index: usize,
    last_click: Option<Point2D>,
    last_snapshot: Option<Snapshot>,
    last_error: Option<TrackError>,
    consecutive_failures: usize,
}

impl<S: FrameSource> TrackingSession<S> {
    /// Create a session showing frame `config.start_index`.
    pub fn new(source: S, backend: Box<dyn TrackingBackend>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        if config.start_index >= source.len() {
            return Err(TrackError::FrameSourceExhausted {
                index: config.start_index,
                len: source.len(),
            });
        }
        Ok(Self {
            frame_index: config.start_index,
            source,
            backend: Some(backend),
            config,
            state: SessionState::AwaitingSelection,
            last_click: None,
            last_snapshot: None,
            last_error: None,
            consecutive_failures: 0,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Index of the displayed frame.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn last_click(&self) -> Option<Point2D> {
        self.last_click
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Error behind the most recent backend failure, if any.
    pub fn last_error(&self) -> Option<&TrackError> {
        self.last_error.as_ref()
    }

    /// Kind of the active backend; `None` once stopped.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the session and hand back its frames.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Handle one external event.
    ///
    /// A selection that cannot be initialized is returned as an error and
    /// leaves the session awaiting a new selection.
    pub fn handle(&mut self, event: SessionEvent) -> Result<StepOutcome> {
        match (self.state, event) {
            (SessionState::Stopped(_), _) => Ok(StepOutcome::Ignored),
            (_, SessionEvent::Quit) => Ok(self.stop(StopReason::Quit)),
            (SessionState::AwaitingSelection, SessionEvent::Select(click)) => {
                self.last_click = Some(click);
                self.activate(Some(click))
            }
            (SessionState::AwaitingSelection, SessionEvent::Advance) => {
                if self.backend_kind().is_some_and(|kind| !kind.needs_selection()) {
                    self.activate(None)
                } else {
                    Ok(StepOutcome::Ignored)
                }
            }
            (SessionState::Tracking, SessionEvent::Select(click)) => {
                self.last_click = Some(click);
                match self.config.advance {
                    AdvancePolicy::EventGated => Ok(self.advance()),
                    AdvancePolicy::Auto => Ok(StepOutcome::Ignored),
                }
            }
            (SessionState::Tracking, SessionEvent::Advance) => match self.config.advance {
                AdvancePolicy::Auto => Ok(self.advance()),
                AdvancePolicy::EventGated => Ok(StepOutcome::Ignored),
            },
        }
    }

    /// Request the next frame, as [`SessionEvent::Advance`].
    pub fn step(&mut self) -> Result<StepOutcome> {
        self.handle(SessionEvent::Advance)
    }

    /// Feed `events` until they run out or the session stops, collecting the
    /// snapshots produced on the way.
    pub fn run<I>(&mut self, events: I) -> Result<Vec<Snapshot>>
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        let mut snapshots = Vec::new();
        for event in events {
            if self.state.is_stopped() {
                break;
            }
            match self.handle(event)? {
                StepOutcome::Activated(snapshot) | StepOutcome::Advanced(snapshot) => {
                    snapshots.push(snapshot)
                }
                _ => {}
            }
        }
        Ok(snapshots)
    }

    fn activate(&mut self, selection: Option<Point2D>) -> Result<StepOutcome> {
        let frame = self.source.frame(self.frame_index).ok_or(TrackError::FrameSourceExhausted {
            index: self.frame_index,
            len: self.source.len(),
        })?;
        let backend = self
            .backend
            .as_mut()
            .ok_or(TrackError::InvalidState("session has no backend"))?;

        let output = backend.activate(frame, selection)?;
        tracing::info!(
            frame = self.frame_index,
            backend = ?backend.kind(),
            selection = ?selection,
            "tracking started"
        );
        self.state = SessionState::Tracking;
        Ok(StepOutcome::Activated(self.record(output)))
    }

    /// Process the pair (displayed frame, next frame) and move to the next frame.
    fn advance(&mut self) -> StepOutcome {
        let next = self.frame_index + 1;
        let (Some(prev), Some(curr)) = (self.source.frame(self.frame_index), self.source.frame(next))
        else {
            tracing::debug!(index = next, len = self.source.len(), "no frame left");
            return self.stop(StopReason::Exhausted);
        };
        let Some(backend) = self.backend.as_mut() else {
            return self.stop(StopReason::BackendFailure);
        };

        let result = backend.update(prev, curr);
        let still_active = backend.is_active();
        self.frame_index = next;

        match result {
            Ok(output) => {
                self.consecutive_failures = 0;
                if !still_active {
                    return self.stop(StopReason::TrackLost);
                }
                let exceeded = output
                    .metrics()
                    .and_then(|m| self.config.thresholds.exceeded(m));
                let snapshot = self.record(output);
                match exceeded {
                    Some(metric) => self.stop(StopReason::ThresholdExceeded(metric)),
                    None => StepOutcome::Advanced(snapshot),
                }
            }
            Err(error) if error.is_recoverable() && self.consecutive_failures < self.config.max_backend_retries => {
                self.consecutive_failures += 1;
                tracing::warn!(
                    frame = next,
                    attempt = self.consecutive_failures,
                    max = self.config.max_backend_retries,
                    %error,
                    "backend update failed, retrying on next frame pair"
                );
                StepOutcome::Skipped {
                    frame_index: next,
                    error,
                }
            }
            Err(error) => {
                let reason = match error {
                    TrackError::TrackLoss { .. } => StopReason::TrackLost,
                    TrackError::BoundaryViolation { .. } => StopReason::BoundaryViolation,
                    _ => StopReason::BackendFailure,
                };
                tracing::warn!(frame = next, %error, "backend update failed");
                self.last_error = Some(error);
                self.stop(reason)
            }
        }
    }

    fn record(&mut self, output: BackendOutput) -> Snapshot {
        let snapshot = Snapshot {
            frame_index: self.frame_index,
            output,
        };
        self.last_snapshot = Some(snapshot.clone());
        snapshot
    }

    /// Enter the terminal state and release the backend.
    fn stop(&mut self, reason: StopReason) -> StepOutcome {
        if let Some(mut backend) = self.backend.take() {
            backend.deactivate();
        }
        tracing::info!(frame = self.frame_index, %reason, "tracking stopped");
        self.state = SessionState::Stopped(reason);
        StepOutcome::Stopped(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::flow::{FlowMethod, MotionField};
    use crate::frame::{Frame, InMemoryFrames};

    /// Replays scripted update results.
    struct Scripted {
        updates: VecDeque<Result<BackendOutput>>,
        active: bool,
    }

    impl Scripted {
        fn new(updates: Vec<Result<BackendOutput>>) -> Box<Self> {
            Box::new(Self {
                updates: updates.into(),
                active: false,
            })
        }
    }

    fn motion() -> BackendOutput {
        BackendOutput::Motion(MotionField::Sparse(Vec::new()))
    }

    impl TrackingBackend for Scripted {
        fn kind(&self) -> BackendKind {
            BackendKind::OpticalFlow(FlowMethod::LucasKanade)
        }

        fn activate(&mut self, _frame: &Frame, _selection: Option<Point2D>) -> Result<BackendOutput> {
            self.active = true;
            Ok(motion())
        }

        fn update(&mut self, _prev: &Frame, _curr: &Frame) -> Result<BackendOutput> {
            self.updates.pop_front().unwrap_or_else(|| Ok(motion()))
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn deactivate(&mut self) {
            self.active = false;
        }
    }

    fn frames(n: usize) -> InMemoryFrames {
        (0..n)
            .map(|_| Frame::filled(16, 16, 0).unwrap())
            .collect::<Vec<_>>()
            .into()
    }

    fn flow_error() -> Result<BackendOutput> {
        Err(TrackError::FlowComputation("diverged".into()))
    }

    #[test]
    fn test_empty_source_rejected() {
        let result = TrackingSession::new(frames(0), Scripted::new(vec![]), SessionConfig::default());
        assert!(matches!(result, Err(TrackError::FrameSourceExhausted { index: 0, len: 0 })));
    }

    #[test]
    fn test_advance_without_selection_activates_selectionless_backend() {
        let config = SessionConfig::default().with_advance(AdvancePolicy::Auto);
        let mut session = TrackingSession::new(frames(3), Scripted::new(vec![]), config).unwrap();
        assert!(matches!(session.step().unwrap(), StepOutcome::Activated(_)));
        assert!(session.state().is_tracking());
        assert_eq!(session.frame_index(), 0);
    }

    #[test]
    fn test_retries_are_bounded() {
        let config = SessionConfig::default()
            .with_advance(AdvancePolicy::Auto)
            .with_max_backend_retries(1);
        let updates = vec![flow_error(), Ok(motion()), flow_error(), flow_error()];
        let mut session = TrackingSession::new(frames(10), Scripted::new(updates), config).unwrap();
        session.step().unwrap();

        assert!(matches!(session.step().unwrap(), StepOutcome::Skipped { frame_index: 1, .. }));
        assert!(matches!(session.step().unwrap(), StepOutcome::Advanced(_)));
        assert!(matches!(session.step().unwrap(), StepOutcome::Skipped { frame_index: 3, .. }));
        assert!(matches!(
            session.step().unwrap(),
            StepOutcome::Stopped(StopReason::BackendFailure)
        ));
        assert!(matches!(session.last_error(), Some(TrackError::FlowComputation(_))));
        assert!(session.backend_kind().is_none());
    }

    #[test]
    fn test_inactive_backend_after_update_stops() {
        struct Fading(usize);
        impl TrackingBackend for Fading {
            fn kind(&self) -> BackendKind {
                BackendKind::OpticalFlow(FlowMethod::Farneback)
            }
            fn activate(&mut self, _: &Frame, _: Option<Point2D>) -> Result<BackendOutput> {
                self.0 = 1;
                Ok(motion())
            }
            fn update(&mut self, _: &Frame, _: &Frame) -> Result<BackendOutput> {
                self.0 = self.0.saturating_sub(1);
                Ok(motion())
            }
            fn is_active(&self) -> bool {
                self.0 > 0
            }
            fn deactivate(&mut self) {
                self.0 = 0;
            }
        }

        let mut session =
            TrackingSession::new(frames(4), Box::new(Fading(0)), SessionConfig::default()).unwrap();
        session.handle(SessionEvent::Select(Point2D::new(4, 4))).unwrap();
        let outcome = session.handle(SessionEvent::Select(Point2D::new(4, 4))).unwrap();
        assert!(matches!(outcome, StepOutcome::Stopped(StopReason::TrackLost)));
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut session =
            TrackingSession::new(frames(2), Scripted::new(vec![]), SessionConfig::default()).unwrap();
        assert!(matches!(
            session.handle(SessionEvent::Quit).unwrap(),
            StepOutcome::Stopped(StopReason::Quit)
        ));
        assert!(matches!(
            session.handle(SessionEvent::Select(Point2D::new(8, 8))).unwrap(),
            StepOutcome::Ignored
        ));
        assert_eq!(session.state(), SessionState::Stopped(StopReason::Quit));
        assert_eq!(session.into_source().len(), 2);
    }
}
