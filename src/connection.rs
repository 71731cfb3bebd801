// Newline-framed JSON over a blocking TCP socket

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use log::debug;
use serde_json::Value;

use crate::errors::HairpinError;
use crate::protocol::{self, Inbound};

/// Blocking connection to the race server. One JSON message per line in both
/// directions; the server paces the session, so reads simply block until the
/// next message arrives.
pub struct ServerConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl ServerConnection {
    pub fn connect(host: &str, port: u16) -> Result<Self, HairpinError> {
        let connect_error = |source| HairpinError::ServerConnectError {
            host: host.to_string(),
            port,
            source,
        };
        let writer = TcpStream::connect((host, port)).map_err(connect_error)?;
        let reader = writer.try_clone().map_err(connect_error)?;
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Next inbound message, or `None` once the server has closed the
    /// connection.
    pub fn receive(&mut self) -> Result<Option<Inbound>, HairpinError> {
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| HairpinError::ServerReadError { source: e })?;
            if read == 0 {
                return Ok(None);
            }
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            debug!("<- {line}");
            return protocol::parse_line(line).map(Some);
        }
    }

    pub fn send(&mut self, message: &Value) -> Result<(), HairpinError> {
        let mut line = message.to_string();
        debug!("-> {line}");
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|e| HairpinError::ServerWriteError { source: e })
    }
}
