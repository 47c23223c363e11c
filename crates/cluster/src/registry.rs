//! startup registration of peers with retry

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

use crate::config::RetryPolicy;
use crate::coordinator::Coordinator;
use crate::error::{ClusterError, Result};
use crate::worker::WorkerLink;

/// Connect to `addr`, retrying per `retry`.
pub fn connect_with_retry(
    name: &str,
    addr: SocketAddr,
    retry: &RetryPolicy,
    coordinator: &Coordinator,
) -> Result<WorkerLink> {
    let timeout = coordinator.config().io_timeout();
    for attempt in 1..=retry.attempts {
        match WorkerLink::connect(addr, timeout) {
            Ok(link) => return Ok(link),
            Err(e) => {
                debug!("{name} at {addr}: attempt {attempt}/{} failed: {e}", retry.attempts);
                if attempt < retry.attempts {
                    thread::sleep(retry.interval());
                }
            }
        }
    }
    Err(ClusterError::Unreachable {
        name: name.to_string(),
        addr,
        attempts: retry.attempts,
    })
}

/// Register a peer in the background. The handle yields whether it joined.
pub fn register_peer(
    coordinator: Arc<Coordinator>,
    name: String,
    addr: SocketAddr,
    retry: RetryPolicy,
) -> Result<JoinHandle<bool>> {
    let handle = thread::Builder::new()
        .name(format!("pegsol-register-{name}"))
        .spawn(move || match connect_with_retry(&name, addr, &retry, &coordinator) {
            Ok(link) => {
                coordinator.add_worker(link);
                info!("{name} at {addr} registered");
                true
            }
            Err(e) => {
                error!("{e}");
                false
            }
        })?;
    Ok(handle)
}

/// Register every peer and wait until each has joined or given up.
/// Returns the names of peers that never answered.
pub fn register_all(
    coordinator: &Arc<Coordinator>,
    peers: impl IntoIterator<Item = (String, SocketAddr)>,
) -> Result<Vec<String>> {
    let retry = coordinator.config().retry;
    let mut handles = Vec::new();
    for (name, addr) in peers {
        let handle = register_peer(Arc::clone(coordinator), name.clone(), addr, retry)?;
        handles.push((name, handle));
    }
    let mut missing = Vec::new();
    for (name, handle) in handles {
        if !handle.join().unwrap_or(false) {
            missing.push(name);
        }
    }
    Ok(missing)
}
