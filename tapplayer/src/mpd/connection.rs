use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::errors::PlayerError;
use crate::mpd::commands::{ACK, EOL, GREETING_PREFIX, IDLE, OK};

/// `key: value` lines of one daemon answer.
pub type MpdDictionary = BTreeMap<String, String>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// One text-protocol session with the daemon.
///
/// A connection carries at most one command at a time; owners serialise
/// access (the control connection lives behind the player's session lock,
/// the idle connection belongs to the listener thread alone).
#[derive(Debug)]
pub struct MpdConnection {
    host: String,
    port: u16,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    version: String,
}

impl MpdConnection {
    /// Opens a session and consumes the daemon's greeting line.
    ///
    /// `timeout` bounds reads and writes; `None` lets reads block forever,
    /// which is what the idle connection needs.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self, PlayerError> {
        let stream = open_stream(host, port, timeout)?;
        let writer = stream.try_clone().map_err(|e| {
            PlayerError::transport(format!("Failed to clone socket for {}:{}: {}", host, port, e))
        })?;

        let mut conn = MpdConnection {
            host: host.to_string(),
            port,
            reader: BufReader::new(stream),
            writer,
            version: String::new(),
        };

        let greeting = conn.read_line()?;
        let Some(version) = greeting.strip_prefix(GREETING_PREFIX) else {
            return Err(PlayerError::protocol(format!(
                "Unexpected greeting from {}:{}: {}",
                host, port, greeting
            )));
        };
        conn.version = version.trim().to_string();
        debug!(host = host, port = port, version = %conn.version, "Connected to daemon");

        Ok(conn)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Protocol version announced in the greeting.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sends `text` and discards the answer up to its terminator.
    pub fn command(&mut self, text: &str) -> Result<(), PlayerError> {
        self.send(text)?;
        self.read_response(text).map(|_| ())
    }

    /// Sends `command` and parses the answer into a dictionary.
    pub fn read_dictionary(&mut self, command: &str) -> Result<MpdDictionary, PlayerError> {
        self.send(command)?;
        self.read_response(command)
    }

    /// Blocks until the daemon reports a change and returns the first line
    /// of its answer (`changed: <subsystem>`).
    pub fn idle(&mut self) -> Result<String, PlayerError> {
        self.send(IDLE)?;
        self.read_line()
    }

    /// Writes `text`, terminated by a newline, and flushes.
    pub fn send(&mut self, text: &str) -> Result<(), PlayerError> {
        debug!(host = %self.host, command = %text.trim_end(), "Sending daemon command");

        let mut payload = text.to_string();
        if !payload.ends_with(EOL) {
            payload.push_str(EOL);
        }

        self.writer.write_all(payload.as_bytes()).map_err(|e| {
            PlayerError::transport(format!(
                "Failed to write command {} to {}: {}",
                text.trim_end(),
                self.host,
                e
            ))
        })?;
        self.writer.flush().map_err(|e| {
            PlayerError::transport(format!("Failed to flush stream for {}: {}", self.host, e))
        })
    }

    /// Reads one line without its terminator.
    pub fn read_line(&mut self) -> Result<String, PlayerError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).map_err(|e| {
            PlayerError::transport(format!("Failed to read from {}: {}", self.host, e))
        })?;
        if read == 0 {
            return Err(PlayerError::protocol(format!(
                "Connection to {} closed before the answer terminator",
                self.host
            )));
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!(host = %self.host, line = %line, "Daemon line");
        Ok(line)
    }

    fn read_response(&mut self, command: &str) -> Result<MpdDictionary, PlayerError> {
        let mut dictionary = MpdDictionary::new();
        loop {
            let line = self.read_line()?;
            if line == OK {
                return Ok(dictionary);
            }
            if line.starts_with(ACK) {
                return Err(PlayerError::DaemonAck {
                    command: command.trim_end().to_string(),
                    message: line,
                });
            }
            let (key, value) = parse_line(&line)?;
            dictionary.insert(key, value);
        }
    }

    pub fn disconnect(self) {
        let _ = self.writer.shutdown(Shutdown::Both);
    }
}

/// Splits a `key: value` answer line.
pub fn parse_line(line: &str) -> Result<(String, String), PlayerError> {
    match line.split_once(':') {
        Some((key, value)) if !key.is_empty() => {
            Ok((key.to_string(), value.trim_start().to_string()))
        }
        _ => Err(PlayerError::protocol(format!("Malformed answer line: {}", line))),
    }
}

fn open_stream(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream, PlayerError> {
    let address = if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{host}:{port}")
    };

    let mut last_err = None;
    for addr in address.to_socket_addrs().map_err(|e| {
        PlayerError::transport(format!("Failed to resolve {}: {}", address, e))
    })? {
        match TcpStream::connect_timeout(&addr, timeout.unwrap_or(CONNECT_TIMEOUT)) {
            Ok(stream) => {
                stream
                    .set_read_timeout(timeout)
                    .and_then(|_| stream.set_write_timeout(timeout))
                    .map_err(|e| {
                        PlayerError::transport(format!(
                            "Failed to set socket timeouts for {}: {}",
                            address, e
                        ))
                    })?;
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(err) => {
                last_err = Some((addr, err));
            }
        }
    }

    match last_err {
        Some((addr, err)) => Err(PlayerError::transport(format!(
            "Failed to connect to {} via {}: {}",
            host, addr, err
        ))),
        None => Err(PlayerError::transport(format!(
            "No socket addresses resolved for {}",
            address
        ))),
    }
}
