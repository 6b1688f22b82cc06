//! # Command server
//!
//! The command server listens for the controller, accepts a single client at a time and runs its
//! session:
//!
//! - The acceptor thread waits for clients. After each accept it goes straight back to waiting,
//!   so a client which disconnects can reconnect. A new client supersedes the current one.
//! - Each session has a reader thread, which assembles command frames and parses them, and a
//!   writer thread, which sends an image frame from the [`ImageSource`] every telemetry interval.
//!
//! Nothing here touches control state. Everything the control thread needs to know is pushed as a
//! [`ServerEvent`] onto the action queue.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::{ErrorKind, Read},
    net::{Shutdown, SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use log::{debug, error, info, trace, warn};

use super::{
    frame::{write_frame, FrameError, FrameReader},
    queue::ActionSender,
    NetParams, NetParamsError,
};
use crate::{eqpt::cam::ImageSource, tc::Command};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period at which the acceptor checks for new clients and for shutdown.
const ACCEPT_POLL_PERIOD: Duration = Duration::from_millis(20);

/// Size of the buffer used for each socket read.
const READ_BUF_LEN: usize = 4096;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Image source shared by all sessions of a server.
type SharedSource = Arc<Mutex<dyn ImageSource>>;

/// The command server.
///
/// Dropping the server stops the acceptor and closes the active session.
pub struct CmdServer {
    local_addr: SocketAddr,

    shared: Arc<Shared>,

    acceptor_jh: Option<JoinHandle<()>>,
}

/// State shared between the server handle and the acceptor thread.
struct Shared {
    shutdown: AtomicBool,

    next_session_id: AtomicU64,

    active: Mutex<Option<ClientSession>>,

    source: SharedSource,

    events: ActionSender<ServerEvent>,

    telemetry_interval: Duration,

    read_timeout: Option<Duration>,

    max_frame_len: usize,
}

/// A single client session.
struct ClientSession {
    link: Arc<SessionLink>,

    reader_jh: Option<JoinHandle<()>>,

    writer_jh: Option<JoinHandle<()>>,
}

/// Connection state shared by the reader and writer threads of a session.
struct SessionLink {
    id: u64,

    peer: SocketAddr,

    stream: TcpStream,

    /// Authoritative connection flag. Once false the session is over and any I/O error is
    /// ignored.
    connected: AtomicBool,

    events: ActionSender<ServerEvent>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Events produced by the server for the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A new client was accepted.
    ClientConnected {
        session_id: u64,
        peer: SocketAddr,
    },

    /// A command was received from the client.
    Command {
        session_id: u64,
        cmd: Command,
    },

    /// The session ended.
    ClientDisconnected {
        session_id: u64,
        reason: DisconnectReason,
    },

    /// The acceptor failed and stopped, no new client will be accepted.
    AcceptorHalted(String),
}

/// Reasons for a session ending.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DisconnectReason {
    #[error("the client closed the connection")]
    PeerClosed,

    #[error("no data received within the read timeout")]
    ReadTimeout,

    #[error("read failed: {0}")]
    ReadError(String),

    #[error("invalid framing: {0}")]
    Framing(FrameError),

    #[error("the command was not valid UTF-8")]
    InvalidUtf8,

    #[error("write failed: {0}")]
    WriteError(String),

    #[error("the image source is unavailable")]
    SourceUnavailable,

    #[error("superseded by a new client")]
    Superseded,

    #[error("server shutdown")]
    Shutdown,
}

/// Errors which can occur in the [`CmdServer`].
#[derive(Debug, thiserror::Error)]
pub enum CmdServerError {
    #[error("Invalid network parameters: {0}")]
    InvalidParams(NetParamsError),

    #[error("Could not bind to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Could not configure the listener: {0}")]
    ListenerError(std::io::Error),

    #[error("Could not start the acceptor thread: {0}")]
    SpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdServer {
    /// Create a new command server and start accepting clients.
    ///
    /// This function does not wait for a client before returning.
    ///
    /// ## Arguments
    /// - `params`: network parameters, giving the endpoint and session timings
    /// - `source`: source of the images sent to clients
    /// - `events`: sender for the action queue drained by the control thread
    pub fn new<S>(
        params: &NetParams,
        source: S,
        events: ActionSender<ServerEvent>,
    ) -> Result<Self, CmdServerError>
    where
        S: ImageSource + 'static,
    {
        let telemetry_interval = params.telemetry_interval()
            .map_err(CmdServerError::InvalidParams)?;
        let read_timeout = params.read_timeout()
            .map_err(CmdServerError::InvalidParams)?;

        let listener = TcpListener::bind(params.cmd_endpoint.as_str())
            .map_err(|e| CmdServerError::BindError(params.cmd_endpoint.clone(), e))?;

        // Non-blocking so the acceptor can notice shutdown requests
        listener
            .set_nonblocking(true)
            .map_err(CmdServerError::ListenerError)?;

        let local_addr = listener.local_addr().map_err(CmdServerError::ListenerError)?;

        let source: SharedSource = Arc::new(Mutex::new(source));

        let shared = Arc::new(Shared {
            shutdown: AtomicBool::new(false),
            next_session_id: AtomicU64::new(1),
            active: Mutex::new(None),
            source,
            events,
            telemetry_interval,
            read_timeout,
            max_frame_len: params.max_frame_len,
        });

        let shared_clone = shared.clone();
        let acceptor_jh = thread::Builder::new()
            .name("cmd_acceptor".into())
            .spawn(move || acceptor_thread(listener, shared_clone))
            .map_err(CmdServerError::SpawnError)?;

        info!("CmdServer listening on {}", local_addr);

        Ok(Self {
            local_addr,
            shared,
            acceptor_jh: Some(acceptor_jh),
        })
    }

    /// The address the server is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Return if a client is currently connected.
    pub fn is_client_connected(&self) -> bool {
        match *self.shared.active.lock().expect("CmdServer: active mutex poisoned") {
            Some(ref s) => s.link.is_connected(),
            None => false,
        }
    }

    /// Stop accepting clients and close the active session, waiting for all threads to exit.
    pub fn shutdown(&mut self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Stopping CmdServer");

        if let Some(jh) = self.acceptor_jh.take() {
            jh.join().ok();
        }

        let session = self.shared.active.lock()
            .expect("CmdServer: active mutex poisoned")
            .take();

        if let Some(s) = session {
            s.close(DisconnectReason::Shutdown);
        }

        info!("CmdServer stopped");
    }
}

impl Drop for CmdServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    /// Start a session for a newly accepted client, closing any previous session first.
    fn start_session(&self, stream: TcpStream, peer: SocketAddr) {
        let previous = self.active.lock()
            .expect("CmdServer: active mutex poisoned")
            .take();

        if let Some(p) = previous {
            info!("Client {} superseded by {}", p.link.peer, peer);
            p.close(DisconnectReason::Superseded);
        }

        // The accepted stream must block, whatever the listener mode
        let configured = stream.set_nonblocking(false)
            .and_then(|_| stream.set_read_timeout(self.read_timeout))
            .and_then(|_| stream.set_nodelay(true));

        if let Err(e) = configured {
            warn!("Could not configure the connection to {}: {}", peer, e);
            stream.shutdown(Shutdown::Both).ok();
            return;
        }

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let events = self.events.clone();

        let link = Arc::new(SessionLink {
            id,
            peer,
            stream,
            connected: AtomicBool::new(true),
            events: events.clone(),
        });

        info!("Client {} connected (session {})", peer, id);
        events.push(ServerEvent::ClientConnected { session_id: id, peer });

        let reader_link = link.clone();
        let max_frame_len = self.max_frame_len;
        let reader_jh = thread::Builder::new()
            .name(format!("cmd_reader_{}", id))
            .spawn(move || reader_thread(reader_link, max_frame_len));

        let writer_link = link.clone();
        let source = self.source.clone();
        let interval = self.telemetry_interval;
        let writer_jh = thread::Builder::new()
            .name(format!("tm_writer_{}", id))
            .spawn(move || writer_thread(writer_link, source, interval));

        let session = match (reader_jh, writer_jh) {
            (Ok(r), Ok(w)) => ClientSession {
                link,
                reader_jh: Some(r),
                writer_jh: Some(w),
            },
            (r, w) => {
                error!("Could not start the threads for session {}", id);
                let session = ClientSession {
                    link,
                    reader_jh: r.ok(),
                    writer_jh: w.ok(),
                };
                session.close(DisconnectReason::Shutdown);
                return;
            }
        };

        *self.active.lock().expect("CmdServer: active mutex poisoned") = Some(session);
    }
}

impl ClientSession {
    /// Close the session and wait for its threads to exit.
    fn close(mut self, reason: DisconnectReason) {
        self.link.disconnect(reason);

        if let Some(jh) = self.reader_jh.take() {
            jh.join().ok();
        }
        if let Some(jh) = self.writer_jh.take() {
            jh.join().ok();
        }
    }
}

impl SessionLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// End the session.
    ///
    /// Only the first call has any effect: it shuts the socket down, which also unblocks the other
    /// thread, and pushes the single `ClientDisconnected` event. Returns true for that first call.
    fn disconnect(&self, reason: DisconnectReason) -> bool {
        if self.connected
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        match reason {
            DisconnectReason::PeerClosed
            | DisconnectReason::Superseded
            | DisconnectReason::Shutdown => {
                info!("Session {} with {} closed: {}", self.id, self.peer, reason)
            },
            _ => error!("Session {} with {} terminated: {}", self.id, self.peer, reason),
        }

        self.stream.shutdown(Shutdown::Both).ok();

        self.events.push(ServerEvent::ClientDisconnected {
            session_id: self.id,
            reason,
        });

        true
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn acceptor_thread(listener: TcpListener, shared: Arc<Shared>) {
    while !shared.shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => shared.start_session(stream, peer),
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_PERIOD),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Error accepting client, no further clients will be accepted: {}", e);
                shared.events.push(ServerEvent::AcceptorHalted(e.to_string()));
                break;
            }
        }
    }

    debug!("Acceptor exited");
}

fn reader_thread(link: Arc<SessionLink>, max_frame_len: usize) {
    let mut reader = FrameReader::new(max_frame_len);
    let mut buf = [0u8; READ_BUF_LEN];

    while link.is_connected() {
        let num_bytes = match (&link.stream).read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                link.disconnect(DisconnectReason::ReadTimeout);
                break;
            },
            Err(e) => {
                link.disconnect(DisconnectReason::ReadError(e.to_string()));
                break;
            }
        };

        let frames = match reader.push(&buf[..num_bytes]) {
            Ok(f) => f,
            Err(FrameError::Closed) => {
                link.disconnect(DisconnectReason::PeerClosed);
                break;
            },
            Err(e) => {
                link.disconnect(DisconnectReason::Framing(e));
                break;
            }
        };

        for frame in frames {
            let text = match String::from_utf8(frame) {
                Ok(t) => t,
                Err(_) => {
                    link.disconnect(DisconnectReason::InvalidUtf8);
                    return;
                }
            };

            match Command::parse(&text) {
                Ok(cmd) => {
                    if !link.is_connected() {
                        return;
                    }

                    debug!("Received command \"{}\"", text);

                    link.events.push(ServerEvent::Command {
                        session_id: link.id,
                        cmd,
                    });
                },
                Err(e) => warn!("Dropping command \"{}\": {}", text, e),
            }
        }
    }
}

fn writer_thread(link: Arc<SessionLink>, source: SharedSource, interval: Duration) {
    while link.is_connected() {
        let cycle_start = Instant::now();

        let frame = match source.lock() {
            Ok(mut s) => s.capture(),
            Err(_) => {
                link.disconnect(DisconnectReason::SourceUnavailable);
                break;
            }
        };

        match frame {
            Ok(data) => {
                if let Err(e) = write_frame(&mut &link.stream, &data) {
                    link.disconnect(DisconnectReason::WriteError(e.to_string()));
                    break;
                }
                trace!("Sent {} byte frame to session {}", data.len(), link.id);
            },
            Err(e) => warn!("Could not capture a frame for session {}: {}", link.id, e),
        }

        if let Some(d) = interval.checked_sub(cycle_start.elapsed()) {
            thread::sleep(d);
        }
    }
}
