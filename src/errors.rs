// Error types for hairpin

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum HairpinError {
    // Errors for the server connection
    #[snafu(display("Unable to connect to race server at {host}:{port}"))]
    ServerConnectError {
        host: String,
        port: u16,
        source: io::Error,
    },
    #[snafu(display("Error reading from race server"))]
    ServerReadError { source: io::Error },
    #[snafu(display("Error writing to race server"))]
    ServerWriteError { source: io::Error },

    // Errors while decoding inbound messages
    #[snafu(display("Malformed server message: {line}"))]
    MalformedMessage {
        line: String,
        source: serde_json::Error,
    },
    #[snafu(display("Malformed {msg_type} payload"))]
    MalformedPayload {
        msg_type: String,
        source: serde_json::Error,
    },
    #[snafu(display("Track piece {index} is neither a straight nor a bend"))]
    InvalidPiece { index: usize },
    #[snafu(display("Race initialization carried a track with no pieces"))]
    EmptyTrack,

    // Errors raised by the control core
    #[snafu(display("Car positions received before race initialization"))]
    MissingTrack,
    #[snafu(display("Car positions received before the car identity was assigned"))]
    MissingIdentity,
    #[snafu(display("No telemetry entry for own car color {color}"))]
    MissingOwnCar { color: String },
    #[snafu(display("Telemetry references lane {lane} but the track has {lanes} lanes"))]
    UnknownLane { lane: usize, lanes: usize },
}
