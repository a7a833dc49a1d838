//! Speed tracking executable entry point.
//!
//! # Architecture
//!
//! The execution consists of:
//!
//!     - Create the session and start logging
//!     - Load and validate the parameters, applying any command line overrides
//!     - Check the vehicle is offroad
//!     - Load the speed profile
//!     - Connect to the vehicle (or create a simulated one)
//!     - Run the control loop until the profile ends or the process is stopped
//!     - Save a summary of the run to the session directory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};
use structopt::StructOpt;

// Internal
use speed_lib::{
    actuation::{ActuationClient, ActuationSink},
    ctrl_loop::{ControlLoop, LoopMode, LoopStats, TrackingSession},
    feedback::{FeedbackSource, TelemetryClient},
    params::SpeedExecParams,
    precondition::check_offroad,
    profile::ProfileTable,
    sim::SimVehicle,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
    time::{Clock, MonotonicClock, SteppedClock},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Archive file for the tick reports, relative to the session archive directory
const TICK_ARCHIVE: &str = "ctrl_loop.csv";

/// Run summary file, relative to the session directory
const SUMMARY_FILE: &str = "summary.json";

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Drive the vehicle along a recorded speed profile.
#[derive(Debug, StructOpt)]
#[structopt(name = "speed_exec")]
struct Opts {
    /// CSV file containing the profile's time (s) and speed columns
    #[structopt(parse(from_os_str))]
    profile: PathBuf,

    /// Parameter file
    #[structopt(long, parse(from_os_str), default_value = "params/speed_exec.toml")]
    params: PathBuf,

    /// Override the control period in seconds
    #[structopt(long)]
    period: Option<f64>,

    /// Stop at the end of the profile rather than restarting it
    #[structopt(long)]
    once: bool,

    /// Drive a simulated vehicle instead of the real one
    #[structopt(long)]
    sim: bool,

    /// Directory the session directory is created in
    #[structopt(long, parse(from_os_str), default_value = "sessions")]
    sessions_dir: PathBuf,

    /// Log every tick
    #[structopt(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("speed_exec", &opts.sessions_dir)
        .wrap_err("Failed to create the session")?;

    let log_level = match opts.verbose {
        true => LevelFilter::Trace,
        false => LevelFilter::Info,
    };
    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Speed Tracking Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: SpeedExecParams =
        util::params::load(&opts.params).wrap_err("Could not load the parameters")?;

    if let Some(period_s) = opts.period {
        info!("Control period overridden to {} s", period_s);
        params.ctrl.period_s = period_s;
    }
    if opts.once {
        params.loop_.mode = LoopMode::Once;
    }

    params.validate().wrap_err("Invalid parameters")?;
    info!("Exec parameters loaded");

    // ---- PRECONDITIONS ----

    if opts.sim {
        info!("Simulation mode, the offroad check is skipped");
    } else {
        check_offroad(&params.precondition).wrap_err("Precondition check failed")?;
    }

    // ---- LOAD PROFILE ----

    let profile = Arc::new(
        ProfileTable::from_csv(&opts.profile, &params.profile)
            .wrap_err_with(|| format!("Failed to load the profile {:?}", opts.profile))?,
    );

    let archiver =
        Archiver::from_path(&session, TICK_ARCHIVE).wrap_err("Failed to create the tick archive")?;

    // The loop runs until the profile ends (once mode) or the process is stopped
    let cancel = AtomicBool::new(false);

    // ---- RUN ----

    let stats = if opts.sim {
        let vehicle = SimVehicle::new(params.sim.clone(), params.ctrl.period_s).into_handle();

        // A single pass of the profile can be simulated as fast as possible, a wrapping one is run
        // in real time so it can be watched and stopped.
        match params.loop_.mode {
            LoopMode::Once => run(
                &params,
                profile,
                vehicle.clone(),
                vehicle,
                SteppedClock::new(0.0),
                archiver,
                &cancel,
            ),
            LoopMode::Wrap => run(
                &params,
                profile,
                vehicle.clone(),
                vehicle,
                MonotonicClock::new(),
                archiver,
                &cancel,
            ),
        }
    } else {
        info!("Initialising network");

        let zmq_ctx = comms_if::net::zmq::Context::new();

        let telemetry = TelemetryClient::new(&zmq_ctx, &params.net)
            .wrap_err("Failed to initialise the TelemetryClient")?;
        info!("TelemetryClient initialised");

        let actuation = ActuationClient::new(&zmq_ctx, &params.net)
            .wrap_err("Failed to initialise the ActuationClient")?;
        info!("ActuationClient initialised");

        run(
            &params,
            profile,
            telemetry,
            actuation,
            MonotonicClock::new(),
            archiver,
            &cancel,
        )
    };

    // ---- SUMMARY ----

    let summary_path = session
        .save_json(SUMMARY_FILE, &stats)
        .wrap_err("Failed to save the run summary")?;
    info!("Run summary saved to {:?}", summary_path);

    Ok(())
}

/// Build a tracking session and control loop and run them.
fn run<F, A, C>(
    params: &SpeedExecParams,
    profile: Arc<ProfileTable>,
    feedback: F,
    sink: A,
    clock: C,
    archiver: Archiver,
    cancel: &AtomicBool,
) -> LoopStats
where
    F: FeedbackSource,
    A: ActuationSink,
    C: Clock,
{
    let mut session = TrackingSession::new(profile, &params.ctrl, feedback, sink);

    let mut ctrl_loop =
        ControlLoop::new(&params.ctrl, params.loop_.clone(), clock).with_archiver(archiver);

    ctrl_loop.run(&mut session, cancel)
}
