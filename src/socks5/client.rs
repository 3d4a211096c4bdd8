//! The SOCKS5 client handshake (§4.2): connect to a stream host, negotiate "no authentication",
//! request the digest as a domain-name address, and hand back the live socket.

use crate::socks5::wire::*;
use crate::stream_host::StreamHost;
use crate::util::error::{BytestreamError, Result, Socks5Stage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Duration;

/// Runs the initiator side of the SOCKS5 handshake documented in §4.2 and §6.
pub struct Socks5Client;

impl Socks5Client {
    /// Connect to `host`, perform the handshake addressing `digest`, and return the connected
    /// socket. `deadline` bounds the whole operation, not just the TCP connect.
    pub async fn connect(host: &StreamHost, digest: &str, deadline: Duration) -> Result<TcpStream> {
        match tokio::time::timeout(deadline, Self::connect_inner(host, digest)).await {
            Ok(result) => result,
            Err(_) => Err(BytestreamError::Timeout),
        }
    }

    async fn connect_inner(host: &StreamHost, digest: &str) -> Result<TcpStream> {
        tracing::debug!(%host, "socks5 client: connecting");
        let mut stream = TcpStream::connect((host.address.as_str(), host.port)).await?;

        // Greeting: VER=5, NMETHODS=1, METHODS=[NoAuth].
        stream
            .write_all(&[VERSION, 0x01, AUTH_NO_AUTHENTICATION])
            .await?;

        let mut greeting_reply = [0u8; 2];
        stream.read_exact(&mut greeting_reply).await?;
        if greeting_reply != [VERSION, AUTH_NO_AUTHENTICATION] {
            return Err(BytestreamError::Protocol {
                at: Socks5Stage::Greeting,
                detail: format!("unexpected greeting reply {greeting_reply:02x?}"),
            });
        }

        // Request: VER, CMD=CONNECT, RSV, ATYP=Domain, LEN, digest, PORT=0.
        let request = encode_domain_message(CMD_CONNECT, digest);
        stream.write_all(&request).await?;

        let mut reply_header = [0u8; 4];
        stream.read_exact(&mut reply_header).await?;
        if reply_header[0] != VERSION {
            return Err(BytestreamError::Protocol {
                at: Socks5Stage::Reply,
                detail: format!("unexpected reply version 0x{:02x}", reply_header[0]),
            });
        }
        if reply_header[1] != REPLY_SUCCEEDED {
            return Err(BytestreamError::Protocol {
                at: Socks5Stage::Reply,
                detail: format!("proxy returned REP=0x{:02x}", reply_header[1]),
            });
        }

        // Consume the bound-address portion of the reply per ATYP.
        let atyp = reply_header[3];
        let addr_len = match atyp {
            ATYP_IPV4 => 4,
            ATYP_IPV6 => 16,
            ATYP_DOMAIN => {
                let mut len_buf = [0u8; 1];
                stream.read_exact(&mut len_buf).await?;
                len_buf[0] as usize
            }
            other => {
                return Err(BytestreamError::Protocol {
                    at: Socks5Stage::Reply,
                    detail: format!("unsupported reply ATYP 0x{other:02x}"),
                });
            }
        };
        let mut remainder = vec![0u8; addr_len + 2]; // + BND.PORT
        stream.read_exact(&mut remainder).await?;

        tracing::debug!(%host, "socks5 client: handshake complete");
        Ok(stream)
    }
}
