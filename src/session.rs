//! The opened duplex byte stream handed back to the caller of `establish_session` (§3, §4.7).

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A live, negotiated byte stream to the remote party. Implements `AsyncRead`/`AsyncWrite` by
/// delegating to the underlying socket so callers can use it exactly like a `TcpStream`, and
/// exposes owned split halves for callers that want to move reader and writer to separate tasks
/// — the shape the teacher's own `Stream` type (`session/stream.rs`) offers, minus the
/// multiplexing machinery this spec has no use for.
pub struct BytestreamSession {
    socket: TcpStream,
}

impl BytestreamSession {
    pub(crate) fn new(socket: TcpStream) -> Self {
        Self { socket }
    }

    /// Split into owned read/write halves for independent forwarding tasks.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.socket.into_split()
    }

    /// Gracefully shut down the write half; the peer observes EOF.
    pub async fn close(mut self) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.socket.shutdown().await
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.peer_addr()
    }
}

impl AsyncRead for BytestreamSession {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.socket).poll_read(cx, buf)
    }
}

impl AsyncWrite for BytestreamSession {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.socket).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.socket).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.socket).poll_shutdown(cx)
    }
}
