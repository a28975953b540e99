use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use slidekit::clock::{Clock, SystemClock};
use slidekit::ipc;
use slidekit::logging;

/// Longest sleep when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

fn write_line(stdout: &mut io::Stdout, resp: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn main() {
    logging::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "slidekitd starting");

    let mut state = ipc::AppState::new();
    let clock = SystemClock;

    // Stdin is read on its own thread so debounce deadlines can fire while
    // the host is quiet.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut stdout = io::stdout();
    loop {
        let wait = match state.next_deadline() {
            Some(deadline) => {
                Duration::from_millis(deadline.saturating_sub(clock.now_ms()).max(0) as u64)
            }
            None => IDLE_WAIT,
        };

        let line = match rx.recv_timeout(wait) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => {
                state.tick();
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        // Timers that came due while the line was in flight go first.
        state.tick();

        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                write_line(
                    &mut stdout,
                    &serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    }),
                );
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        write_line(&mut stdout, &resp);
    }

    state.flush();
    tracing::info!("stdin closed; pending writes flushed");
}
