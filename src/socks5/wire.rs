//! Shared SOCKS5 wire constants and the domain-name-address encode/decode helpers both the
//! client and the local proxy need (§4.2, §4.3, §6). Grounded closely on the teacher's
//! `client/socks5.rs` constant block.

pub const VERSION: u8 = 0x05;

pub const AUTH_NO_AUTHENTICATION: u8 = 0x00;
#[allow(dead_code)]
pub const AUTH_NOT_ACCEPTABLE: u8 = 0xFF;

pub const CMD_CONNECT: u8 = 0x01;

pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x03;
pub const ATYP_IPV6: u8 = 0x04;

pub const REPLY_SUCCEEDED: u8 = 0x00;
pub const REPLY_GENERAL_FAILURE: u8 = 0x01;
pub const REPLY_HOST_UNREACHABLE: u8 = 0x04;

/// Build the fixed-shape `[VER, CMD, RSV, ATYP=Domain, LEN, domain..., PORT(2)]` request/reply
/// body XEP-0065 mandates: the "address" is always the 40-character digest and the port is
/// always 0 (§6).
pub fn encode_domain_message(cmd_or_reply: u8, domain: &str) -> Vec<u8> {
    let domain_bytes = domain.as_bytes();
    debug_assert!(domain_bytes.len() <= 255);
    let mut out = Vec::with_capacity(7 + domain_bytes.len());
    out.push(VERSION);
    out.push(cmd_or_reply);
    out.push(0x00); // RSV
    out.push(ATYP_DOMAIN);
    out.push(domain_bytes.len() as u8);
    out.extend_from_slice(domain_bytes);
    out.extend_from_slice(&0u16.to_be_bytes()); // PORT = 0
    out
}

/// A fixed IPv4 `0.0.0.0:0` reply, used when the local proxy has no pending transfer for the
/// requested digest (§4.3: "reply `[0x05,0x04,…]`").
pub fn encode_ipv4_reply(reply: u8) -> [u8; 10] {
    [VERSION, reply, 0x00, ATYP_IPV4, 0, 0, 0, 0, 0, 0]
}
