//! The local SOCKS5 mini-server (§4.3): accepts inbound CONNECT requests from the target, keyed
//! by digest, and pairs each with a pending transfer registered by the manager.

use crate::socks5::wire::*;
use crate::util::error::{BytestreamError, Result, Socks5Stage};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Duration;

struct PendingEntry {
    sender: Option<oneshot::Sender<TcpStream>>,
    receiver: Option<oneshot::Receiver<TcpStream>>,
}

// A plain (non-async) lock: every critical section below is a single map operation with no
// `.await` inside it, which is what lets `PendingTransferGuard::drop` remove an entry
// synchronously — including when it runs because the owning future was cancelled, not unwound.
type PendingMap = Arc<parking_lot::Mutex<HashMap<String, PendingEntry>>>;

/// A loopback-bound SOCKS5 listener the target connects back to when the initiator advertises
/// itself as a stream host.
pub struct LocalSocks5Proxy {
    bind_addr: SocketAddr,
    addresses: parking_lot::RwLock<Vec<String>>,
    port: OnceCell<u16>,
    pending: PendingMap,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl LocalSocks5Proxy {
    /// `bind_addr` with port 0 requests an ephemeral port. The loopback address is pre-seeded as
    /// the initial advertised address (§4.3: "initially the loopback interface").
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            addresses: parking_lot::RwLock::new(vec!["127.0.0.1".to_string()]),
            port: OnceCell::new(),
            pending: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            accept_task: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn port(&self) -> Option<u16> {
        self.port.get().copied()
    }

    pub fn local_addresses(&self) -> Vec<String> {
        self.addresses.read().clone()
    }

    /// Append a new advertised address. Appends, never replaces (§4.3).
    pub fn add_local_address(&self, addr: impl Into<String>) {
        self.addresses.write().push(addr.into());
    }

    /// Idempotent: a second `start()` while already running is a no-op.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let listener = TcpListener::bind(self.bind_addr).await?;
        let port = listener.local_addr()?.port();
        let _ = self.port.set(port);
        tracing::info!(port, "local SOCKS5 proxy listening");

        let pending = self.pending.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "local SOCKS5 proxy: inbound connection");
                        let pending = pending.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_inbound(stream, pending).await {
                                tracing::debug!("local SOCKS5 proxy: connection error: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("local SOCKS5 proxy: accept error: {e}");
                        break;
                    }
                }
            }
        });

        *self.accept_task.lock().await = Some(handle);
        Ok(())
    }

    /// Closes the listener and cancels every pending transfer with `Canceled`.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.accept_task.lock().await.take() {
            handle.abort();
        }
        self.pending.lock().clear();
    }

    /// Register a pending transfer for `digest`. Replaces any existing entry for the same digest
    /// (§4.3: "last writer wins"). Pair with `Arc<LocalSocks5Proxy>::guard_transfer` to get
    /// drop-on-cancel cleanup, or call `remove_transfer` explicitly once the transfer is no
    /// longer wanted.
    pub fn add_transfer(&self, digest: impl Into<String>) {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            digest.into(),
            PendingEntry {
                sender: Some(tx),
                receiver: Some(rx),
            },
        );
    }

    /// Cancel and drop a pending transfer immediately.
    pub fn remove_transfer(&self, digest: &str) {
        self.pending.lock().remove(digest);
    }

    /// Wrap an already-registered `digest` in an RAII guard that removes it on drop (§5: "any
    /// pending transfer registered on the local proxy is removed" on cancellation) — including
    /// when the guard is dropped because the `Future` holding it was cancelled outright, which is
    /// the case a plain early-return `remove_transfer` call cannot cover.
    pub fn guard_transfer(self: &Arc<Self>, digest: impl Into<String>) -> PendingTransferGuard {
        PendingTransferGuard {
            proxy: self.clone(),
            digest: digest.into(),
        }
    }

    /// Block until the inbound connection carrying `digest` arrives, or `deadline` elapses.
    /// Removes the entry from the pending map in every case — success, cancellation, or
    /// timeout — so a completed transfer never lingers in the map (§4.3).
    pub async fn socket_for(&self, digest: &str, deadline: Duration) -> Result<TcpStream> {
        let receiver = {
            let mut pending = self.pending.lock();
            pending.get_mut(digest).and_then(|entry| entry.receiver.take())
        };
        let result = match receiver {
            Some(receiver) => match tokio::time::timeout(deadline, receiver).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(_)) => Err(BytestreamError::Canceled),
                Err(_) => Err(BytestreamError::Timeout),
            },
            None => Err(BytestreamError::Canceled),
        };
        self.pending.lock().remove(digest);
        result
    }
}

/// RAII handle for a registered pending transfer (`LocalSocks5Proxy::add_transfer`). Removing the
/// entry only happens here or in `socket_for`/`remove_transfer`; dropping this guard after one of
/// those already ran is a harmless no-op (removing an absent key).
///
/// Crucially, this also fires when the `Future` that owns the guard is dropped without running to
/// completion — e.g. the outer `establish_session` timeout in `manager.rs` cancelling the
/// in-flight negotiation — which is the case plain early-return cleanup cannot cover.
pub struct PendingTransferGuard {
    proxy: Arc<LocalSocks5Proxy>,
    digest: String,
}

impl Drop for PendingTransferGuard {
    fn drop(&mut self) {
        self.proxy.remove_transfer(&self.digest);
    }
}

/// Server side of the SOCKS5 handshake (§4.3): read greeting, unconditionally accept "no
/// authentication", read the CONNECT request, and either pair the digest with a pending transfer
/// or reply host-unreachable.
async fn handle_inbound(mut stream: TcpStream, pending: PendingMap) -> Result<()> {
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    if greeting[0] != VERSION {
        return Err(BytestreamError::Protocol {
            at: Socks5Stage::Greeting,
            detail: format!("unsupported SOCKS version 0x{:02x}", greeting[0]),
        });
    }
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream
        .write_all(&[VERSION, AUTH_NO_AUTHENTICATION])
        .await?;

    let mut req_header = [0u8; 4];
    stream.read_exact(&mut req_header).await?;
    if req_header[3] != ATYP_DOMAIN {
        stream
            .write_all(&encode_ipv4_reply(REPLY_HOST_UNREACHABLE))
            .await?;
        return Err(BytestreamError::Protocol {
            at: Socks5Stage::Request,
            detail: format!("unsupported request ATYP 0x{:02x}", req_header[3]),
        });
    }

    let mut len_buf = [0u8; 1];
    stream.read_exact(&mut len_buf).await?;
    let mut domain_buf = vec![0u8; len_buf[0] as usize];
    stream.read_exact(&mut domain_buf).await?;
    let digest = String::from_utf8(domain_buf).map_err(|e| BytestreamError::Protocol {
        at: Socks5Stage::Request,
        detail: format!("invalid digest bytes: {e}"),
    })?;

    let mut port_buf = [0u8; 2];
    stream.read_exact(&mut port_buf).await?;

    let sender = {
        let mut pending = pending.lock();
        pending.get_mut(&digest).and_then(|entry| entry.sender.take())
    };

    match sender {
        Some(tx) => {
            stream
                .write_all(&encode_domain_message(REPLY_SUCCEEDED, &digest))
                .await?;
            let _ = tx.send(stream);
            Ok(())
        }
        None => {
            stream
                .write_all(&encode_ipv4_reply(REPLY_HOST_UNREACHABLE))
                .await?;
            Err(BytestreamError::Protocol {
                at: Socks5Stage::Request,
                detail: format!("no pending transfer for digest {digest}"),
            })
        }
    }
}
