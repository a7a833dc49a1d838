//! # Feedback module
//!
//! Feedback sources provide the measured speed of the vehicle to the control loop. A read must
//! never block for longer than a control period, if no measurement is available the source returns
//! `None` and the loop falls back to a configured speed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use log::{debug, warn};

use comms_if::{
    eqpt::SpeedTelemetry,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of measured vehicle speed.
pub trait FeedbackSource {
    /// Get the latest measured speed in meters/second, or `None` if no measurement is available.
    fn read(&mut self) -> Option<f64>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Subscribes to the speed telemetry published by the vehicle.
pub struct TelemetryClient {
    socket: MonitoredSocket,

    latest: Option<SpeedTelemetry>,

    max_age_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum TelemetryClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemetryClient {
    /// Create a new telemetry client connected to the telemetry endpoint.
    ///
    /// The client does not wait for the vehicle to be present, until the first message arrives
    /// reads return `None`.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TelemetryClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 0,
            recv_timeout: 0,
            conflate: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            socket_options,
            &params.telemetry_endpoint,
        )
        .map_err(TelemetryClientError::SocketError)?;

        Ok(Self {
            socket,
            latest: None,
            max_age_s: params.max_telemetry_age_s,
        })
    }

    /// Receive everything that is queued on the socket, keeping only the newest sample.
    fn drain(&mut self) {
        loop {
            match self.socket.recv_string(zmq::DONTWAIT) {
                Ok(Ok(s)) => match serde_json::from_str::<SpeedTelemetry>(&s) {
                    Ok(tm) => self.latest = Some(tm),
                    Err(e) => warn!("Could not deserialize telemetry: {}", e),
                },
                Ok(Err(_)) => warn!("Recieved non UTF-8 telemetry message"),
                Err(zmq::Error::EAGAIN) => break,
                Err(e) => {
                    warn!("Could not recieve telemetry: {}", e);
                    break;
                }
            }
        }
    }
}

impl<F: FeedbackSource + ?Sized> FeedbackSource for Box<F> {
    fn read(&mut self) -> Option<f64> {
        (**self).read()
    }
}

impl FeedbackSource for TelemetryClient {
    fn read(&mut self) -> Option<f64> {
        self.drain();

        let speed_ms = self
            .latest
            .as_ref()
            .and_then(|tm| fresh_speed(tm, self.max_age_s, Utc::now()));

        if speed_ms.is_none() && !self.socket.connected() {
            debug!("Telemetry publisher not connected");
        }

        speed_ms
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the speed from a telemetry sample, or `None` if it is older than `max_age_s`.
pub fn fresh_speed(tm: &SpeedTelemetry, max_age_s: Option<f64>, now: DateTime<Utc>) -> Option<f64> {
    match max_age_s {
        Some(max) if tm.age_s(now) > max => None,
        _ => Some(tm.speed_ms),
    }
}
