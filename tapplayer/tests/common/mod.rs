//! Scripted stand-in for the music daemon.
//!
//! Accepts any number of connections on `127.0.0.1:0`, greets them, records
//! every command and answers from a shared [`DaemonState`]. `idle` requests
//! block until the test pushes a subsystem name with [`FakeDaemon::notify`].
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tapplayer::MpdSettings;

#[derive(Debug, Default)]
pub struct DaemonState {
    /// Value reported as `volume:`; `-1` means no mixer.
    pub volume: String,
    /// When false `setvol` is accepted but the reported volume never moves.
    pub mixer: bool,
    pub status: BTreeMap<String, String>,
    pub current: BTreeMap<String, String>,
    /// `(file, title)` entries of the daemon playlist.
    pub playlist: Vec<(String, Option<String>)>,
    /// Every request received, batches kept as one framed string.
    pub commands: Vec<String>,
    pub idle_requests: usize,
}

pub struct FakeDaemon {
    pub port: u16,
    state: Arc<Mutex<DaemonState>>,
    idle_tx: Sender<String>,
}

impl FakeDaemon {
    pub fn start() -> Self {
        Self::serve_on(TcpListener::bind("127.0.0.1:0").unwrap())
    }

    /// Starts the daemon on a known port, e.g. one a player already targets.
    pub fn start_at(port: u16) -> Self {
        Self::serve_on(TcpListener::bind(("127.0.0.1", port)).unwrap())
    }

    fn serve_on(listener: TcpListener) -> Self {
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(DaemonState {
            volume: "50".to_string(),
            mixer: true,
            ..Default::default()
        }));
        let (idle_tx, idle_rx) = unbounded::<String>();

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let state = Arc::clone(&accept_state);
                let idle_rx = idle_rx.clone();
                thread::spawn(move || serve(stream, state, idle_rx));
            }
        });

        FakeDaemon { port, state, idle_tx }
    }

    /// Settings pointing at this daemon with short test timings.
    pub fn settings(&self) -> MpdSettings {
        MpdSettings {
            duration_poll_attempts: 5,
            duration_poll_interval: Duration::from_millis(10),
            reconnect_delay: Duration::from_millis(50),
            timeout: Duration::from_secs(2),
            ..MpdSettings::new("127.0.0.1", self.port)
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, DaemonState> {
        self.state.lock().unwrap()
    }

    /// Wakes one pending `idle` request with `changed: <subsystem>`.
    pub fn notify(&self, subsystem: &str) {
        self.idle_tx.send(subsystem.to_string()).unwrap();
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    pub fn idle_requests(&self) -> usize {
        self.state().idle_requests
    }

    /// Waits until `condition` holds on the daemon state.
    pub fn wait_for(&self, timeout: Duration, condition: impl Fn(&DaemonState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition(&self.state()) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

fn serve(stream: TcpStream, state: Arc<Mutex<DaemonState>>, idle_rx: Receiver<String>) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    if writer.write_all(b"OK MPD 0.23.5\n").is_err() {
        return;
    }

    let mut batch: Option<String> = None;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let request = line.trim_end_matches('\n').to_string();

        if let Some(pending) = batch.as_mut() {
            pending.push_str(&request);
            pending.push('\n');
            if request == "command_list_end" {
                let framed = batch.take().unwrap_or_default();
                state.lock().unwrap().commands.push(framed);
                if writer.write_all(b"OK\n").is_err() {
                    return;
                }
            }
            continue;
        }
        if request == "command_list_begin" {
            batch = Some(format!("{}\n", request));
            continue;
        }

        let answer = if request == "idle" {
            state.lock().unwrap().idle_requests += 1;
            match idle_rx.recv() {
                Ok(subsystem) => format!("changed: {}\nOK\n", subsystem),
                Err(_) => return,
            }
        } else {
            answer(&request, &mut state.lock().unwrap())
        };

        if writer.write_all(answer.as_bytes()).is_err() {
            return;
        }
    }
}

fn answer(request: &str, state: &mut DaemonState) -> String {
    state.commands.push(request.to_string());

    let mut out = String::new();
    if request == "status" {
        out.push_str(&format!("volume: {}\n", state.volume));
        for (key, value) in &state.status {
            out.push_str(&format!("{}: {}\n", key, value));
        }
    } else if request == "currentsong" {
        for (key, value) in &state.current {
            out.push_str(&format!("{}: {}\n", key, value));
        }
    } else if let Some(level) = request.strip_prefix("setvol ") {
        if state.mixer {
            state.volume = level.trim().to_string();
        }
    } else if request == "playlist" {
        for (index, (file, _)) in state.playlist.iter().enumerate() {
            out.push_str(&format!("{}:file: {}\n", index, file));
        }
    } else if let Some(index) = request.strip_prefix("playlistinfo ") {
        let index: usize = index.trim().parse().unwrap_or(usize::MAX);
        if let Some((file, title)) = state.playlist.get(index) {
            out.push_str(&format!("file: {}\n", file));
            if let Some(title) = title {
                out.push_str(&format!("Title: {}\n", title));
            }
        }
    } else if request.starts_with("load missing") {
        return "ACK [50@0] {load} No such playlist\n".to_string();
    }
    out.push_str("OK\n");
    out
}
