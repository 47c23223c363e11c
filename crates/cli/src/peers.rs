//! peer lists: `name: address` lines in a file, or `name=address` flags

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use pegsol_cluster::DEFAULT_PORT;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("line {line}: expected `name: address`")]
    Malformed { line: usize },
    #[error("line {line}: cannot resolve '{addr}'")]
    Unresolvable { line: usize, addr: String },
    #[error("'{0}': expected name=address")]
    BadFlag(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub name: String,
    pub addr: SocketAddr,
}

/// Resolve `host`, `host:port`, `ip` or `ip:port`; a missing port means 4296.
fn resolve(addr: &str) -> Option<SocketAddr> {
    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return Some(sock);
    }
    if let Ok(ip) = addr.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return Some(SocketAddr::new(ip, DEFAULT_PORT));
    }
    let found = if addr.contains(':') {
        addr.to_socket_addrs()
    } else {
        (addr, DEFAULT_PORT).to_socket_addrs()
    };
    found.ok()?.next()
}

/// One peer per line, `#` starts a comment, blank lines are skipped.
pub fn parse_peers(text: &str) -> Result<Vec<Peer>, PeerError> {
    let mut peers = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let (name, addr) = content
            .split_once(':')
            .map(|(name, addr)| (name.trim(), addr.trim()))
            .filter(|(name, addr)| !name.is_empty() && !addr.is_empty())
            .ok_or(PeerError::Malformed { line })?;
        let addr_str = addr.to_string();
        let addr = resolve(addr).ok_or(PeerError::Unresolvable {
            line,
            addr: addr_str,
        })?;
        peers.push(Peer {
            name: name.to_string(),
            addr,
        });
    }
    Ok(peers)
}

pub fn parse_peer_flag(flag: &str) -> Result<Peer, PeerError> {
    let bad = || PeerError::BadFlag(flag.to_string());
    let (name, addr) = flag.split_once('=').ok_or_else(bad)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(bad());
    }
    let addr = resolve(addr.trim()).ok_or_else(bad)?;
    Ok(Peer {
        name: name.to_string(),
        addr,
    })
}
