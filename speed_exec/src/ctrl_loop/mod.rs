//! # Control loop module
//!
//! The control loop runs the speed controller on a fixed period. Each cycle (tick) it:
//!
//! 1. Takes the profile time of this cycle from the carried state (`t1`),
//! 2. Looks up the target speed one period ahead (`Vt2`),
//! 3. Reads the measured speed (`Vr1`), substituting the fallback speed if none is available,
//! 4. Computes the command from the control law,
//! 5. Sends the command (replacing a non-finite command with a neutral one),
//! 6. Sleeps until the next period boundary,
//! 7. Re-samples the clock, checks for the end of the profile and rolls the state forward.
//!
//! At the end of the profile the loop either wraps, restarting the profile from the beginning,
//! or finishes, depending on the configured mode. Faults within a tick never stop the loop, they
//! are logged and counted in the [`LoopStats`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, error, info, trace, warn};
use serde::Serialize;

use util::{
    archive::{ArchiveError, Archived, Archiver},
    time::{Clock, CycleWait, FixedRateTimer},
};

use crate::{
    actuation::ActuationSink,
    feedback::FeedbackSource,
    profile::ProfileTable,
    speed_ctrl::{self, ControlLaw, ControlState},
};

pub use params::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything one vehicle's tracking run owns: the profile, the carried controller state and the
/// handles to the vehicle.
pub struct TrackingSession<F, A> {
    profile: Arc<ProfileTable>,

    state: ControlState,

    feedback: F,

    sink: A,
}

/// The fixed period control loop.
pub struct ControlLoop<C> {
    params: Params,

    law: Box<dyn ControlLaw>,

    period_s: f64,

    default_command: f64,

    clock: C,

    /// Cycle timer, `None` until the loop is started
    timer: Option<FixedRateTimer>,

    /// Clock time at which the profile (re)started
    origin_s: f64,

    /// Clock time at which the end of the profile was detected, the origin of the next lap
    wrap_origin_s: f64,

    state: LoopState,

    stats: LoopStats,

    archiver: Option<Archiver>,

    last_report: Option<TickReport>,
}

/// Counters describing the health of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopStats {
    pub ticks: u64,

    /// Number of times the profile was restarted
    pub wraps: u64,

    pub feedback_unavailable: u64,

    pub consec_feedback_unavailable: u64,

    pub max_consec_feedback_unavailable: u64,

    /// Set once `feedback_degraded_ticks` consecutive ticks had no feedback, cleared when
    /// feedback returns
    pub feedback_degraded: bool,

    pub non_finite_commands: u64,

    pub transport_failures: u64,

    pub overruns: u64,

    pub max_overrun_s: f64,
}

/// Record of a single tick, traced and archived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,

    /// Profile time of the previous tick (`t0`)
    pub prev_time_s: f64,

    /// Profile time of this tick (`t1`)
    pub time_s: f64,

    pub target_speed_ms: f64,

    /// Target speed one period ahead (`Vt2`)
    pub next_target_speed_ms: f64,

    /// Speed given to the law, the fallback speed if no feedback was available
    pub measured_speed_ms: f64,

    pub feedback_available: bool,

    /// Command computed by the law
    pub law_command: f64,

    /// Command actually sent
    pub command: f64,

    pub sent: bool,

    /// True if the profile wrapped at the start of this tick
    pub wrapped: bool,

    pub overrun_s: Option<f64>,

    #[serde(skip)]
    pub faults: Vec<TickFault>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// State of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    /// Profile time is before the end of the profile.
    Tracking,

    /// The end of the profile has been reached, the profile restarts at the start of the next tick.
    WrapPending,

    /// The end of the profile has been reached and the loop is not wrapping.
    Finished,
}

/// Faults which can occur during a tick. None of these stop the loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickFault {
    #[error("The control law produced a non-finite command ({0}), a neutral command was sent")]
    NonFiniteCommand(f64),

    #[error("No feedback available, the fallback speed was used")]
    FeedbackUnavailable,

    #[error("The command could not be sent: {0}")]
    TransportFailure(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<F: FeedbackSource, A: ActuationSink> TrackingSession<F, A> {
    /// Create a new session at the start of the profile.
    ///
    /// The loop driving the session resets its state with the loop's own default command when it
    /// starts.
    pub fn new(
        profile: Arc<ProfileTable>,
        ctrl_params: &speed_ctrl::Params,
        feedback: F,
        sink: A,
    ) -> Self {
        Self {
            profile,
            state: ControlState::new(ctrl_params.default_command),
            feedback,
            sink,
        }
    }

    pub fn profile(&self) -> &ProfileTable {
        &self.profile
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    /// Release the vehicle handles.
    pub fn into_parts(self) -> (F, A) {
        (self.feedback, self.sink)
    }
}

impl<C: Clock> ControlLoop<C> {
    /// Create a new loop using the law selected by the speed control parameters.
    pub fn new(ctrl_params: &speed_ctrl::Params, params: Params, clock: C) -> Self {
        Self::with_law(
            ctrl_params.build_law(),
            ctrl_params.period_s,
            ctrl_params.default_command,
            params,
            clock,
        )
    }

    /// Create a new loop with the given law.
    pub fn with_law(
        law: Box<dyn ControlLaw>,
        period_s: f64,
        default_command: f64,
        params: Params,
        clock: C,
    ) -> Self {
        Self {
            params,
            law,
            period_s,
            default_command,
            clock,
            timer: None,
            origin_s: 0.0,
            wrap_origin_s: 0.0,
            state: LoopState::Tracking,
            stats: LoopStats::default(),
            archiver: None,
            last_report: None,
        }
    }

    /// Archive every tick report to the given archiver.
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Start the profile from now.
    ///
    /// If kickstart is enabled the default command is sent immediately so that the vehicle has
    /// started responding by the time the first gain estimate is made.
    pub fn start<F, A>(&mut self, session: &mut TrackingSession<F, A>)
    where
        F: FeedbackSource,
        A: ActuationSink,
    {
        self.origin_s = self.clock.now_s();
        self.timer = Some(FixedRateTimer::new(self.period_s, self.origin_s));
        self.state = LoopState::Tracking;
        session.state = ControlState::new(self.default_command);

        info!(
            "Starting {} law with period {:.03} s, profile ends at {:.03} s ({:?} mode)",
            self.law.name(),
            self.period_s,
            session.profile.end_time_s(),
            self.params.mode
        );

        if self.params.kickstart {
            debug!("Kickstart command: {}", self.default_command);

            if let Err(e) = session.sink.send(self.default_command, &self.params.aux_axes) {
                warn!("Could not send the kickstart command: {}", e);
                self.stats.transport_failures += 1;
            }
        }
    }

    /// Execute one tick of the loop.
    ///
    /// The loop is started first if it has not been already. Returns `None` without doing anything
    /// once the loop has finished.
    pub fn tick<F, A>(&mut self, session: &mut TrackingSession<F, A>) -> Option<TickReport>
    where
        F: FeedbackSource,
        A: ActuationSink,
    {
        if self.timer.is_none() {
            self.start(session);
        }

        let mut wrapped = false;
        match self.state {
            LoopState::Finished => return None,
            LoopState::WrapPending => {
                self.origin_s = self.wrap_origin_s;
                session.state = ControlState::new(self.default_command);
                self.stats.wraps += 1;
                self.state = LoopState::Tracking;
                wrapped = true;

                info!("End of profile reached, restarting (wrap {})", self.stats.wraps);
            }
            LoopState::Tracking => (),
        }

        self.stats.ticks += 1;
        let mut faults = Vec::new();

        // ---- TARGET ----

        let t1 = session.state.current_time_s;
        let vt1 = session.profile.lookup(t1);
        let vt2 = session.profile.lookup(t1 + self.period_s);

        // ---- FEEDBACK ----

        let (vr1, feedback_available) = match session.feedback.read() {
            Some(v) => {
                if self.stats.feedback_degraded {
                    self.stats.feedback_degraded = false;
                    info!(
                        "Feedback recovered after {} ticks",
                        self.stats.consec_feedback_unavailable
                    );
                }
                self.stats.consec_feedback_unavailable = 0;
                (v, true)
            }
            None => {
                self.stats.feedback_unavailable += 1;
                self.stats.consec_feedback_unavailable += 1;
                self.stats.max_consec_feedback_unavailable = self
                    .stats
                    .max_consec_feedback_unavailable
                    .max(self.stats.consec_feedback_unavailable);

                if !self.stats.feedback_degraded
                    && self.stats.consec_feedback_unavailable >= self.params.feedback_degraded_ticks
                {
                    self.stats.feedback_degraded = true;
                    error!(
                        "No feedback for {} consecutive ticks, input is degraded",
                        self.stats.consec_feedback_unavailable
                    );
                } else {
                    debug!("{}", TickFault::FeedbackUnavailable);
                }

                faults.push(TickFault::FeedbackUnavailable);
                (self.params.fallback_speed_ms, false)
            }
        };

        // ---- LAW ----

        let input = session.state.law_input(vr1, vt2, self.period_s);
        let law_command = self.law.next_command(&input);

        let command = if law_command.is_finite() {
            law_command
        } else {
            let fault = TickFault::NonFiniteCommand(law_command);
            warn!("{}", fault);
            self.stats.non_finite_commands += 1;
            faults.push(fault);
            0.0
        };

        // ---- ACTUATION ----

        let sent = match session.sink.send(command, &self.params.aux_axes) {
            Ok(()) => true,
            Err(e) => {
                let fault = TickFault::TransportFailure(e.to_string());
                warn!("{}", fault);
                self.stats.transport_failures += 1;
                faults.push(fault);
                false
            }
        };

        // ---- WAIT ----

        let wait = match self.timer.as_mut() {
            Some(timer) => timer.wait(&mut self.clock),
            None => CycleWait::OnTime,
        };
        let overrun_s = match wait {
            CycleWait::Overrun(o) => {
                self.stats.overruns += 1;
                self.stats.max_overrun_s = self.stats.max_overrun_s.max(o);
                Some(o)
            }
            CycleWait::OnTime => None,
        };

        // ---- ROLL STATE ----

        let now_s = self.clock.now_s();
        let elapsed_s = now_s - self.origin_s;

        // A non-finite measurement is not carried, it would poison the next estimate
        let carried_speed_ms = if vr1.is_finite() {
            vr1
        } else {
            session.state.previous_measured_speed_ms
        };
        session.state.advance(carried_speed_ms, command, elapsed_s);

        if elapsed_s >= session.profile.end_time_s() {
            self.state = match self.params.mode {
                LoopMode::Wrap => {
                    self.wrap_origin_s = now_s;
                    LoopState::WrapPending
                }
                LoopMode::Once => {
                    info!("End of profile reached, stopping");
                    LoopState::Finished
                }
            };
        }

        let report = TickReport {
            tick: self.stats.ticks,
            prev_time_s: input.prev_time_s,
            time_s: t1,
            target_speed_ms: vt1,
            next_target_speed_ms: vt2,
            measured_speed_ms: vr1,
            feedback_available,
            law_command,
            command,
            sent,
            wrapped,
            overrun_s,
            faults,
        };

        trace!(
            "t0 = {:.03}, t1 = {:.03}, Vt1 = {:.03}, Vt2 = {:.03}, Vr1 = {:.03}, g1 = {:.04}",
            report.prev_time_s,
            report.time_s,
            report.target_speed_ms,
            report.next_target_speed_ms,
            report.measured_speed_ms,
            report.command
        );

        self.last_report = Some(report.clone());

        if self.archiver.is_some() {
            if let Err(e) = self.write() {
                warn!("Could not archive the tick: {}", e);
            }
        }

        Some(report)
    }

    /// Run the loop until it finishes or `cancel` is set.
    ///
    /// Cancellation is checked between ticks. A loop which was already started is not restarted.
    pub fn run<F, A>(&mut self, session: &mut TrackingSession<F, A>, cancel: &AtomicBool) -> LoopStats
    where
        F: FeedbackSource,
        A: ActuationSink,
    {
        if self.timer.is_none() {
            self.start(session);
        }

        while !cancel.load(Ordering::Relaxed) {
            if self.tick(session).is_none() {
                break;
            }
        }

        if cancel.load(Ordering::Relaxed) {
            info!("Control loop cancelled");
        }

        info!(
            "Control loop stopped after {} ticks and {} wraps",
            self.stats.ticks, self.stats.wraps
        );

        self.stats.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn origin_s(&self) -> f64 {
        self.origin_s
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

impl<C> Archived for ControlLoop<C> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match (self.archiver.as_mut(), self.last_report.as_ref()) {
            (Some(a), Some(r)) => a.serialise(r),
            (None, _) => Err(ArchiveError::NotInitialised),
            (Some(_), None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{actuation::ActuationError, profile::ProfileSample, speed_ctrl::LawInput};
    use comms_if::net::zmq;
    use std::collections::VecDeque;
    use util::time::SteppedClock;

    /// Feedback which plays back a script, then repeats the last entry.
    struct Scripted {
        script: VecDeque<Option<f64>>,
        last: Option<f64>,
        reads: usize,
    }

    impl Scripted {
        fn new(script: &[Option<f64>]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                last: None,
                reads: 0,
            }
        }
    }

    impl FeedbackSource for Scripted {
        fn read(&mut self) -> Option<f64> {
            self.reads += 1;
            if let Some(s) = self.script.pop_front() {
                self.last = s;
            }
            self.last
        }
    }

    /// Sink recording everything sent, optionally failing.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<(f64, Vec<f64>)>,
        fail: bool,
    }

    impl ActuationSink for Recorder {
        fn send(&mut self, command: f64, aux: &[f64]) -> Result<(), ActuationError> {
            if self.fail {
                return Err(ActuationError::SendError(zmq::Error::EAGAIN));
            }
            self.sent.push((command, aux.to_vec()));
            Ok(())
        }
    }

    /// Law always returning NaN
    struct NanLaw;

    impl ControlLaw for NanLaw {
        fn name(&self) -> &'static str {
            "nan"
        }

        fn next_command(&self, _input: &LawInput) -> f64 {
            std::f64::NAN
        }
    }

    fn ramp_profile() -> Arc<ProfileTable> {
        Arc::new(
            ProfileTable::new(vec![
                ProfileSample::new(0.0, 0.0),
                ProfileSample::new(1.0, 10.0),
                ProfileSample::new(2.0, 20.0),
            ])
            .unwrap(),
        )
    }

    fn ctrl_params() -> speed_ctrl::Params {
        speed_ctrl::Params::with_period(1.0)
    }

    fn ctrl_loop(mode: LoopMode, kickstart: bool) -> ControlLoop<SteppedClock> {
        let ctrl = ctrl_params();
        let params = Params {
            mode,
            kickstart,
            feedback_degraded_ticks: 3,
            ..Default::default()
        };

        ControlLoop::new(&ctrl, params, SteppedClock::new(100.0))
    }

    #[test]
    fn test_first_ticks_without_response() {
        let mut cl = ctrl_loop(LoopMode::Once, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        let r1 = cl.tick(&mut session).unwrap();
        assert_eq!(r1.time_s, 0.0);
        assert_eq!(r1.next_target_speed_ms, 10.0);
        assert_eq!(r1.command, 0.1);

        let r2 = cl.tick(&mut session).unwrap();
        assert_eq!(r2.time_s, 1.0);
        assert_eq!(r2.next_target_speed_ms, 20.0);
        assert!(r2.command.is_finite());
        assert!(r2.command >= -1.0 && r2.command <= 1.0);

        assert_eq!(session.sink().sent.len(), 2);
        assert_eq!(session.sink().sent[0], (0.1, vec![0.0]));
    }

    #[test]
    fn test_gain_estimate_after_response() {
        let mut cl = ctrl_loop(LoopMode::Wrap, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0), Some(5.0)]),
            Recorder::default(),
        );

        cl.tick(&mut session);
        let r2 = cl.tick(&mut session).unwrap();

        // g0 = 0.1 gave +5 m/s over 1 s, need +15 m/s, so 0.3
        assert!((r2.command - 0.3).abs() < 1e-12);
        assert_eq!(session.state().previous_command, r2.command);
    }

    #[test]
    fn test_wraps_once_at_end() {
        let mut cl = ctrl_loop(LoopMode::Wrap, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(1.0)]),
            Recorder::default(),
        );

        cl.tick(&mut session);
        assert_eq!(cl.state(), LoopState::Tracking);
        cl.tick(&mut session);
        assert_eq!(cl.state(), LoopState::WrapPending);
        assert_eq!(cl.origin_s(), 100.0);

        let r3 = cl.tick(&mut session).unwrap();
        assert!(r3.wrapped);
        assert!(r3.time_s.abs() < 1e-9);
        assert_eq!(cl.origin_s(), 102.0);
        assert_eq!(cl.stats().wraps, 1);
        assert_eq!(cl.state(), LoopState::Tracking);

        let r4 = cl.tick(&mut session).unwrap();
        assert!(!r4.wrapped);
        assert!((r4.time_s - 1.0).abs() < 1e-9);
        assert_eq!(cl.stats().wraps, 1);
        assert_eq!(cl.origin_s(), 102.0);
    }

    #[test]
    fn test_wrap_origin_is_end_of_lap() {
        let ctrl = speed_ctrl::Params::with_period(0.5);
        let params = Params {
            kickstart: false,
            ..Default::default()
        };
        let mut cl = ControlLoop::new(&ctrl, params, SteppedClock::new(0.0));
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl,
            Scripted::new(&[Some(1.0)]),
            Recorder::default(),
        );

        cl.start(&mut session);

        // Every tick takes 0.05 s of processing before sleeping
        let mut lap_times = Vec::new();
        for _ in 0..8 {
            cl.clock_mut().advance(0.05);
            let r = cl.tick(&mut session).unwrap();
            if cl.stats().wraps == 1 {
                lap_times.push(r.time_s);
            }
        }

        assert_eq!(cl.origin_s(), 2.0);
        assert_eq!(lap_times.len(), 4);
        for (k, t) in lap_times.iter().enumerate() {
            assert!((t - 0.5 * k as f64).abs() < 1e-9, "lap time {} at tick {}", t, k);
        }
    }

    #[test]
    fn test_fallback_speed_used() {
        let ctrl = speed_ctrl::Params::with_period(0.5);
        let params = Params {
            fallback_speed_ms: 2.5,
            kickstart: false,
            feedback_degraded_ticks: 3,
            ..Default::default()
        };
        let mut cl = ControlLoop::new(&ctrl, params, SteppedClock::new(0.0));
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[None, None, None, Some(3.0)]),
            Recorder::default(),
        );

        for k in 1..=3 {
            let r = cl.tick(&mut session).unwrap();
            assert!(!r.feedback_available);
            assert_eq!(r.measured_speed_ms, 2.5);
            assert_eq!(r.faults, vec![TickFault::FeedbackUnavailable]);
            assert!(r.command.is_finite());
            assert!((cl.clock().now_s() - 0.5 * k as f64).abs() < 1e-12);
        }

        assert_eq!(cl.stats().feedback_unavailable, 3);
        assert_eq!(cl.stats().consec_feedback_unavailable, 3);

        let r = cl.tick(&mut session).unwrap();
        assert!(r.feedback_available);
        assert_eq!(r.measured_speed_ms, 3.0);
        assert_eq!(cl.stats().consec_feedback_unavailable, 0);
        assert_eq!(cl.stats().max_consec_feedback_unavailable, 3);
        assert_eq!(session.sink().sent.len(), 4);
    }

    #[test]
    fn test_feedback_degraded_and_recovered() {
        let mut cl = ctrl_loop(LoopMode::Wrap, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(1.0), None, None, None, None, Some(2.0), Some(2.0), None]),
            Recorder::default(),
        );

        cl.tick(&mut session);
        assert!(!cl.stats().feedback_degraded);

        cl.tick(&mut session);
        cl.tick(&mut session);
        assert!(!cl.stats().feedback_degraded);

        // Third consecutive tick without feedback
        cl.tick(&mut session);
        assert!(cl.stats().feedback_degraded);

        cl.tick(&mut session);
        assert!(cl.stats().feedback_degraded);
        assert_eq!(cl.stats().consec_feedback_unavailable, 4);

        let r = cl.tick(&mut session).unwrap();
        assert!(r.feedback_available);
        assert!(!cl.stats().feedback_degraded);
        assert_eq!(cl.stats().consec_feedback_unavailable, 0);

        cl.tick(&mut session);
        assert!(!cl.stats().feedback_degraded);

        // A single missing sample is not degraded
        cl.tick(&mut session);
        assert!(!cl.stats().feedback_degraded);
        assert_eq!(cl.stats().max_consec_feedback_unavailable, 4);
    }

    #[test]
    fn test_non_finite_command_sends_neutral() {
        let mut cl = ControlLoop::with_law(
            Box::new(NanLaw),
            1.0,
            0.1,
            Params {
                kickstart: false,
                ..Default::default()
            },
            SteppedClock::new(0.0),
        );
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        let r = cl.tick(&mut session).unwrap();
        assert!(r.law_command.is_nan());
        assert_eq!(r.command, 0.0);
        assert_eq!(session.sink().sent[0].0, 0.0);
        assert_eq!(cl.stats().non_finite_commands, 1);

        // The neutral command is not carried forward as zero
        assert_eq!(session.state().previous_command, 0.1);
    }

    #[test]
    fn test_non_finite_feedback() {
        let mut cl = ctrl_loop(LoopMode::Wrap, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(1.0), Some(std::f64::NAN), Some(2.0)]),
            Recorder::default(),
        );

        cl.tick(&mut session);
        let r2 = cl.tick(&mut session).unwrap();
        assert_eq!(r2.command, 0.0);
        assert!(matches!(r2.faults.as_slice(), [TickFault::NonFiniteCommand(_)]));
        assert_eq!(session.state().previous_measured_speed_ms, 1.0);

        let r3 = cl.tick(&mut session).unwrap();
        assert!(r3.command.is_finite());
        assert_eq!(cl.stats().non_finite_commands, 1);
    }

    #[test]
    fn test_transport_failure_does_not_stop() {
        let mut cl = ctrl_loop(LoopMode::Wrap, true);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder {
                sent: Vec::new(),
                fail: true,
            },
        );

        for _ in 0..5 {
            let r = cl.tick(&mut session).unwrap();
            assert!(!r.sent);
        }

        // Kickstart plus five ticks
        assert_eq!(cl.stats().transport_failures, 6);
        assert_eq!(cl.stats().ticks, 5);
    }

    #[test]
    fn test_kickstart() {
        let mut cl = ctrl_loop(LoopMode::Once, true);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        cl.start(&mut session);
        assert_eq!(session.sink().sent, vec![(0.1, vec![0.0])]);
        assert_eq!(session.feedback().reads, 0);
    }

    #[test]
    fn test_run_after_start_does_not_restart() {
        let mut cl = ctrl_loop(LoopMode::Once, true);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        cl.start(&mut session);
        let stats = cl.run(&mut session, &AtomicBool::new(false));

        // One kickstart plus two ticks
        assert_eq!(stats.ticks, 2);
        assert_eq!(session.sink().sent.len(), 3);
        assert_eq!(cl.origin_s(), 100.0);
    }

    #[test]
    fn test_session_uses_loop_default_command() {
        let mut cl = ControlLoop::with_law(
            Box::new(NanLaw),
            1.0,
            0.2,
            Params::default(),
            SteppedClock::new(0.0),
        );
        let mut ctrl = ctrl_params();
        ctrl.default_command = 0.5;
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl,
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );
        assert_eq!(session.state().default_command(), 0.5);

        cl.start(&mut session);
        assert_eq!(session.state().default_command(), 0.2);
        assert_eq!(session.state().previous_command, 0.2);
        assert_eq!(session.sink().sent[0].0, 0.2);

        cl.tick(&mut session);
        assert_eq!(session.state().previous_command, 0.2);
    }

    #[test]
    fn test_once_mode_finishes() {
        let mut cl = ctrl_loop(LoopMode::Once, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        let stats = cl.run(&mut session, &AtomicBool::new(false));

        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.wraps, 0);
        assert_eq!(cl.state(), LoopState::Finished);
        assert!(cl.tick(&mut session).is_none());
    }

    #[test]
    fn test_cancelled_before_first_tick() {
        let mut cl = ctrl_loop(LoopMode::Wrap, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        let stats = cl.run(&mut session, &AtomicBool::new(true));
        assert_eq!(stats.ticks, 0);
        assert!(session.sink().sent.is_empty());
    }

    #[test]
    fn test_overrun_counted() {
        let mut cl = ctrl_loop(LoopMode::Wrap, false);
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        cl.start(&mut session);
        cl.clock_mut().advance(1.5);

        let r = cl.tick(&mut session).unwrap();
        assert!((r.overrun_s.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(cl.stats().overruns, 1);

        let r = cl.tick(&mut session).unwrap();
        assert_eq!(r.overrun_s, None);
    }

    #[test]
    fn test_archives_ticks() {
        let mut path = std::env::temp_dir();
        path.push(format!("speed_exec_ctrl_loop_{}", std::process::id()));
        path.push("ticks.csv");

        let mut cl = ctrl_loop(LoopMode::Once, false).with_archiver(Archiver::create(&path).unwrap());
        let mut session = TrackingSession::new(
            ramp_profile(),
            &ctrl_params(),
            Scripted::new(&[Some(0.0)]),
            Recorder::default(),
        );

        cl.run(&mut session, &AtomicBool::new(false));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("tick,prev_time_s,time_s,"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
