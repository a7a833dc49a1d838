//! # Actuation module
//!
//! Actuation sinks take the gas/brake command computed by the control loop and transmit it to
//! the vehicle. Sending is fire and forget, a failure is reported to the caller but is never
//! retried here.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use comms_if::{
    eqpt::ActuationDems,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A destination for gas/brake commands.
pub trait ActuationSink {
    /// Send a command in [-1, 1] along with the values of the auxiliary axes.
    fn send(&mut self, command: f64, aux: &[f64]) -> Result<(), ActuationError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Publishes actuation demands to the vehicle.
pub struct ActuationClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ActuationError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not serialize the demands: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send demands to the vehicle: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuationClient {
    /// Create a new actuation client bound to the actuation endpoint.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, ActuationError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 0,
            send_timeout: 10,
            send_hwm: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.actuation_endpoint,
        )
        .map_err(ActuationError::SocketError)?;

        Ok(Self { socket })
    }

    /// Return if a subscriber is connected.
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }
}

impl<A: ActuationSink + ?Sized> ActuationSink for Box<A> {
    fn send(&mut self, command: f64, aux: &[f64]) -> Result<(), ActuationError> {
        (**self).send(command, aux)
    }
}

impl ActuationSink for ActuationClient {
    fn send(&mut self, command: f64, aux: &[f64]) -> Result<(), ActuationError> {
        let dems = ActuationDems::new(command, aux);

        let dems_str = serde_json::to_string(&dems).map_err(ActuationError::SerializationError)?;

        trace!("Sending demands: {}", dems_str);

        self.socket
            .send(&dems_str, 0)
            .map_err(ActuationError::SendError)
    }
}
