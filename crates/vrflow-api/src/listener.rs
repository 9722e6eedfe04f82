//! TCP push listener: a dedicated OS thread holding a persistent
//! connection to the gateway's control port for unsolicited frames.
//!
//! The gateway pushes binary state-change frames whenever a unit
//! changes; there is no subscription handshake, just a socket to hold
//! open. The listener reconnects forever with a fixed backoff until
//! told to stop, scans every receive buffer with the frame codec, and
//! hands decoded updates to the supplied handler on the listener
//! thread. Connectivity transitions are reported through a `watch`
//! channel so the owner can expose availability.

use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::frame;
use crate::frame::PushUpdate;

/// Fixed delay before reconnecting after a failure.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bounded blocking-read timeout. Idle expiry is expected and is not
/// an error.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

const READ_BUF: usize = 1024;
const STOP_POLL: Duration = Duration::from_millis(250);

/// Handle to the running listener thread.
///
/// Dropping without calling [`stop`](Self::stop) detaches the thread;
/// owners are expected to stop it during shutdown.
pub struct PushListener {
    stop: Arc<AtomicBool>,
    socket: Arc<Mutex<Option<TcpStream>>>,
    thread: Option<JoinHandle<()>>,
}

impl PushListener {
    /// Spawn the listener thread.
    ///
    /// `on_update` runs on the listener thread for every decoded frame;
    /// it must hand off quickly and never block. `connected` is driven
    /// `true`/`false` on connect/disconnect transitions.
    pub fn spawn<F>(
        host: String,
        port: u16,
        connected: watch::Sender<bool>,
        on_update: F,
    ) -> Self
    where
        F: Fn(PushUpdate) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let socket: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));

        let thread = {
            let stop = Arc::clone(&stop);
            let socket = Arc::clone(&socket);
            thread::spawn(move || run_loop(&host, port, &stop, &socket, &connected, &on_update))
        };

        Self {
            stop,
            socket,
            thread: Some(thread),
        }
    }

    /// Stop the listener: raise the stop flag, shut the socket down to
    /// unblock any in-flight read, and join the thread. The join is
    /// bounded in practice by the read timeout.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(stream) = lock_slot(&self.socket).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("push listener thread panicked");
            }
        }
    }
}

/// connect → read → scan, forever, with fixed-backoff reconnect.
fn run_loop(
    host: &str,
    port: u16,
    stop: &AtomicBool,
    socket_slot: &Mutex<Option<TcpStream>>,
    connected: &watch::Sender<bool>,
    on_update: &(dyn Fn(PushUpdate) + Send),
) {
    info!(host, port, "push listener starting");

    while !stop.load(Ordering::SeqCst) {
        let mut stream = match connect(host, port) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(host, port, error = %e, "push connect failed");
                connected.send_replace(false);
                backoff(stop);
                continue;
            }
        };
        info!(host, port, "push stream connected");
        connected.send_replace(true);

        // Keep a duplicate handle so stop() can unblock the read.
        if let Ok(duplicate) = stream.try_clone() {
            lock_slot(socket_slot).replace(duplicate);
        }

        read_until_error(&mut stream, stop, on_update);

        connected.send_replace(false);
        lock_slot(socket_slot).take();
        drop(stream);

        if !stop.load(Ordering::SeqCst) {
            backoff(stop);
        }
    }

    connected.send_replace(false);
    info!(host, port, "push listener stopped");
}

/// Read the stream until a socket error or EOF; idle timeouts keep the
/// loop alive. Logs the first idle expiry of a run at debug, later
/// ones at trace.
fn read_until_error(
    stream: &mut TcpStream,
    stop: &AtomicBool,
    on_update: &(dyn Fn(PushUpdate) + Send),
) {
    let mut buf = [0u8; READ_BUF];
    let mut idle_logged = false;

    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        match stream.read(&mut buf) {
            Ok(0) => {
                debug!("push stream closed by peer");
                return;
            }
            Ok(n) => {
                idle_logged = false;
                trace!(bytes = n, "push stream data");
                for update in frame::scan(&buf[..n]) {
                    debug!(key = %update.key(), "push frame decoded");
                    on_update(update);
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                if idle_logged {
                    trace!("push read idle");
                } else {
                    debug!("push read idle");
                    idle_logged = true;
                }
            }
            Err(e) => {
                warn!(error = %e, "push read error");
                return;
            }
        }
    }
}

/// Open the push socket with a bounded read timeout and TCP keepalive
/// so a half-dead gateway link is detected instead of hanging.
fn connect(host: &str, port: u16) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect((host, port))?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(1))
        .with_interval(Duration::from_secs(3));
    let sock = SockRef::from(&stream);
    sock.set_tcp_keepalive(&keepalive)?;

    Ok(stream)
}

/// Sleep the reconnect delay in small slices so a stop request is not
/// held up behind the full backoff.
fn backoff(stop: &AtomicBool) {
    let mut remaining = RECONNECT_DELAY;
    while !stop.load(Ordering::SeqCst) && remaining > Duration::ZERO {
        let slice = remaining.min(STOP_POLL);
        thread::sleep(slice);
        remaining -= slice;
    }
}

/// Mutex around the socket handle; a poisoned lock just yields the
/// inner value, the stream is still usable for shutdown.
fn lock_slot(slot: &Mutex<Option<TcpStream>>) -> MutexGuard<'_, Option<TcpStream>> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::mpsc;

    fn sample_update() -> PushUpdate {
        PushUpdate {
            grp: 0,
            oa: 1,
            ia: 2,
            on: 1,
            temp_set: 25,
            mode: 1,
            fan: 0,
            temp_in: 27,
            alarm: 0,
        }
    }

    #[test]
    fn frame_behind_garbage_reaches_handler() {
        let server = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let server_thread = thread::spawn(move || {
            let (mut conn, _) = server.accept().unwrap();
            let mut bytes = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
            bytes.extend_from_slice(&frame::encode(&sample_update()));
            conn.write_all(&bytes).unwrap();
            // Hold the connection open until the client goes away.
            let mut sink = [0u8; 16];
            let _ = conn.read(&mut sink);
        });

        let (update_tx, update_rx) = mpsc::channel();
        let (connected, mut connected_rx) = watch::channel(false);
        let listener = PushListener::spawn(
            addr.ip().to_string(),
            addr.port(),
            connected,
            move |update| {
                let _ = update_tx.send(update);
            },
        );

        let update = update_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(update, sample_update());
        assert_eq!(update.key(), "1_2");
        assert!(*connected_rx.borrow_and_update());

        listener.stop();
        server_thread.join().unwrap();
    }

    #[test]
    fn stop_returns_promptly_and_reports_disconnected() {
        let server = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let server_thread = thread::spawn(move || {
            let (mut conn, _) = server.accept().unwrap();
            let mut sink = [0u8; 16];
            let _ = conn.read(&mut sink);
        });

        let (connected, connected_rx) = watch::channel(false);
        let listener =
            PushListener::spawn(addr.ip().to_string(), addr.port(), connected, |_| {});

        // Wait for the connection to come up before tearing down.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !*connected_rx.borrow() {
            assert!(std::time::Instant::now() < deadline, "listener never connected");
            thread::sleep(Duration::from_millis(10));
        }

        let started = std::time::Instant::now();
        listener.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!*connected_rx.borrow());

        server_thread.join().unwrap();
    }

    #[test]
    fn connect_failure_marks_disconnected_and_keeps_retrying() {
        // Bind then drop to get a port nothing listens on.
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let (connected, connected_rx) = watch::channel(true);
        let listener =
            PushListener::spawn(addr.ip().to_string(), addr.port(), connected, |_| {});

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while *connected_rx.borrow() {
            assert!(
                std::time::Instant::now() < deadline,
                "connect failure never reported"
            );
            thread::sleep(Duration::from_millis(10));
        }

        listener.stop();
    }
}
