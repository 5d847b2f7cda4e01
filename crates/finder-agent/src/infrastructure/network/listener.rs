//! ConfirmationListener: waits for a discovered peer to prove it is alive.
//!
//! The peer answers a discovery probe by sending the literal `heartbeat`
//! token, either as a UDP datagram or over a TCP connection.  Both paths reply
//! with `EXIT` and raise a [`Confirmation`] on the event channel.
//!
//! - **UDP**: one socket, one receive loop.  Any other payload is ignored.
//! - **TCP**: one accept loop.  Every accepted connection gets its own task
//!   with an idle timer; each chunk of data restarts the timer, and a
//!   connection silent for the idle timeout (60 s by default) is closed.
//!
//! A connection is tracked in the pending-connection registry from accept
//! until it is closed, whichever way that happens.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use finder_core::protocol::{defaults::TCP_IDLE_TIMEOUT, EXIT};
use finder_core::{Confirmation, Token, Transport};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, trace, warn};

/// Receive buffer size for both transports.
const RECV_BUFFER_SIZE: usize = 2048;

/// Error type for the confirmation listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("{transport} bind failed on {addr}: {source}")]
    BindFailed {
        transport: Transport,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of [`ConfirmationListener::start_listening`], one result per
/// transport.  A failed transport does not prevent the other from listening.
#[derive(Debug)]
pub struct ListenerStatus {
    pub tcp: Result<SocketAddr, ListenerError>,
    pub udp: Result<SocketAddr, ListenerError>,
}

impl ListenerStatus {
    /// Returns `true` if at least one transport is listening.
    pub fn any_listening(&self) -> bool {
        self.tcp.is_ok() || self.udp.is_ok()
    }
}

/// Registry key of an accepted TCP connection.
pub type ConnectionId = u64;

/// A TCP connection that has been accepted and not yet closed.
#[derive(Debug, Clone)]
pub struct PendingConnection {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub accepted_at: Instant,
    /// Last time data arrived; the idle timer counts from here.
    pub last_activity: Instant,
}

/// State shared between the listener handle and its tasks.
#[derive(Clone)]
struct ListenerContext {
    events: mpsc::Sender<Confirmation>,
    idle_timeout: Duration,
    connections: Arc<Mutex<HashMap<ConnectionId, PendingConnection>>>,
    next_id: Arc<AtomicU64>,
}

impl ListenerContext {
    fn register(&self, peer: SocketAddr) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        self.registry().insert(
            id,
            PendingConnection {
                id,
                peer,
                accepted_at: now,
                last_activity: now,
            },
        );
        id
    }

    fn touch(&self, id: ConnectionId) {
        if let Some(conn) = self.registry().get_mut(&id) {
            conn.last_activity = Instant::now();
        }
    }

    fn unregister(&self, id: ConnectionId) {
        self.registry().remove(&id);
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, PendingConnection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a confirmation without waiting, so a full channel never stalls
    /// the receive path.
    fn emit(&self, confirmation: Confirmation) {
        info!(
            "heartbeat from {} via {}",
            confirmation.peer, confirmation.transport
        );
        match self.events.try_send(confirmation) {
            Ok(()) => {}
            Err(TrySendError::Full(c)) => {
                debug!("confirmation channel full; dropped event from {}", c.peer)
            }
            Err(TrySendError::Closed(_)) => {
                debug!("confirmation receiver dropped; event discarded")
            }
        }
    }
}

/// Accepts heartbeats on UDP and TCP and reports confirmed peers.
pub struct ConfirmationListener {
    ctx: ListenerContext,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConfirmationListener {
    /// Creates a listener that reports confirmations on `events`.
    pub fn new(events: mpsc::Sender<Confirmation>) -> Self {
        Self {
            ctx: ListenerContext {
                events,
                idle_timeout: TCP_IDLE_TIMEOUT,
                connections: Arc::new(Mutex::new(HashMap::new())),
                next_id: Arc::new(AtomicU64::new(1)),
            },
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the TCP idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.ctx.idle_timeout = idle_timeout;
        self
    }

    /// Binds both transports on `bind_ip`.
    ///
    /// Bind failures are logged and reported per transport; they never abort
    /// the other transport.
    pub async fn start_listening(
        &self,
        bind_ip: IpAddr,
        tcp_port: u16,
        udp_port: u16,
    ) -> ListenerStatus {
        let tcp = self.listen_tcp(SocketAddr::new(bind_ip, tcp_port)).await;
        let udp = self.listen_udp(SocketAddr::new(bind_ip, udp_port)).await;

        for result in [&tcp, &udp] {
            match result {
                Ok(addr) => info!("listening for heartbeats on {addr}"),
                Err(e) => warn!("{e}"),
            }
        }
        ListenerStatus { tcp, udp }
    }

    /// Binds the UDP path and starts its receive loop.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::BindFailed`] if the socket cannot be bound.
    pub async fn listen_udp(&self, addr: SocketAddr) -> Result<SocketAddr, ListenerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ListenerError::BindFailed {
                transport: Transport::Udp,
                addr,
                source,
            })?;
        let local = socket
            .local_addr()
            .map_err(|source| ListenerError::BindFailed {
                transport: Transport::Udp,
                addr,
                source,
            })?;

        let task = tokio::spawn(udp_loop(socket, self.ctx.clone()));
        self.track(task);
        Ok(local)
    }

    /// Binds the TCP path and starts its accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::BindFailed`] if the listener cannot be bound.
    pub async fn listen_tcp(&self, addr: SocketAddr) -> Result<SocketAddr, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::BindFailed {
                transport: Transport::Tcp,
                addr,
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| ListenerError::BindFailed {
                transport: Transport::Tcp,
                addr,
                source,
            })?;

        let task = tokio::spawn(accept_loop(listener, self.ctx.clone()));
        self.track(task);
        Ok(local)
    }

    /// Snapshot of the TCP connections currently open, oldest first.
    pub fn open_connections(&self) -> Vec<PendingConnection> {
        let mut open: Vec<_> = self.ctx.registry().values().cloned().collect();
        open.sort_by_key(|c| c.id);
        open
    }

    /// Closes both transports and every open connection.
    pub fn shutdown(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        self.ctx.registry().clear();
        info!("confirmation listener shut down");
    }

    fn track(&self, task: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }
}

impl Drop for ConfirmationListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Transport loops ───────────────────────────────────────────────────────────

async fn udp_loop(socket: UdpSocket, ctx: ListenerContext) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                // e.g. ICMP port-unreachable surfacing as a reset on Windows.
                debug!("UDP receive error: {e}");
                continue;
            }
        };

        match Token::classify(&buf[..len]) {
            Some(Token::Heartbeat) => {}
            other => {
                trace!("ignoring {len}-byte datagram from {peer} ({other:?})");
                continue;
            }
        }
        if let Err(e) = socket.send_to(EXIT, peer).await {
            warn!("failed to send EXIT to {peer}: {e}");
        }
        ctx.emit(Confirmation::new(peer, Transport::Udp));
    }
}

async fn accept_loop(listener: TcpListener, ctx: ListenerContext) {
    // Dropping the set (when this task is aborted) aborts every connection task.
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = ctx.register(peer);
                    debug!("accepted connection {id} from {peer}");
                    connections.spawn(serve_connection(stream, peer, id, ctx.clone()));
                }
                Err(e) => warn!("TCP accept failed: {e}"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    ctx: ListenerContext,
) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        let len = match tokio::time::timeout(ctx.idle_timeout, stream.read(&mut buf)).await {
            Err(_) => {
                info!(
                    "closing connection from {peer}: idle for {:?}",
                    ctx.idle_timeout
                );
                break;
            }
            Ok(Ok(0)) => {
                debug!("connection {id} closed by {peer}");
                break;
            }
            Ok(Ok(len)) => len,
            Ok(Err(e)) => {
                debug!("read error on connection {id} from {peer}: {e}");
                break;
            }
        };

        ctx.touch(id);
        match Token::classify(&buf[..len]) {
            Some(Token::Heartbeat) => {}
            other => {
                trace!("ignoring {len} bytes from {peer} ({other:?})");
                continue;
            }
        }
        if let Err(e) = stream.write_all(EXIT).await {
            warn!("failed to send EXIT to {peer}: {e}");
            break;
        }
        ctx.emit(Confirmation::new(peer, Transport::Tcp));
    }
    ctx.unregister(id);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
