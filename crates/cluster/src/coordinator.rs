//! coordinator: splits the first jumps of a board across itself and its workers
//!
//! Jumps are dealt round-robin over `cluster_size + 1` slots; slot 0 stays
//! local, slot `k` goes to the `k`-th registered worker. Worker results
//! arrive on a listener thread, one connection per result, and are forwarded
//! to the evaluation in flight through a channel.
//!
//! Results carry no round id. A worker that misses the result timeout still
//! owes its verdicts, so the coordinator remembers them: owed results are
//! discarded on arrival, an owing worker gets no records, and an owed jump is
//! searched locally instead of being handed out again.

use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use pegsol_core::{Board, Move, Suggestion};
use pegsol_engine::{generate_moves, winning_suggestions, SearchTask, Solver};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ClusterConfig;
use crate::error::Result;
use crate::wire::{ResultRecord, WorkRecord};
use crate::worker::WorkerLink;

/// Slot of the `index`-th first jump; 0 is the coordinator itself.
#[inline]
pub fn slot_of(index: usize, cluster_size: usize) -> usize {
    index % (cluster_size + 1)
}

pub fn assign_slots(total: usize, cluster_size: usize) -> Vec<usize> {
    (0..total).map(|i| slot_of(i, cluster_size)).collect()
}

/// Whether a worker will receive another record after the one at `index`
/// when every slot is dealt. True exactly when the same slot comes round
/// again before the list ends.
#[inline]
pub fn has_more_work(total: usize, index: usize, cluster_size: usize) -> bool {
    total - index > cluster_size + 1
}

/// Size of the coordinator's own share, `ceil(total / (cluster_size + 1))`.
/// Only a diagnostic: the round waits for every dispatched jump instead.
pub fn expected_result_count(total: usize, cluster_size: usize) -> usize {
    total.div_ceil(cluster_size + 1)
}

/// Who searches which first jump in one round, as indices into the move list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundPlan {
    pub local: Vec<usize>,
    /// One share per worker, in cluster order.
    pub remote: Vec<Vec<usize>>,
}

impl RoundPlan {
    /// Deal `moves` round-robin. A slot whose worker is not `available`, and
    /// any jump in `owed`, stays local.
    pub fn deal(moves: &[Move], available: &[bool], owed: &FxHashSet<Move>) -> Self {
        let cluster_size = available.len();
        let mut plan = Self {
            local: Vec::new(),
            remote: vec![Vec::new(); cluster_size],
        };
        for (i, mv) in moves.iter().enumerate() {
            match slot_of(i, cluster_size) {
                0 => plan.local.push(i),
                slot if available[slot - 1] && !owed.contains(mv) => plan.remote[slot - 1].push(i),
                _ => plan.local.push(i),
            }
        }
        plan
    }
}

/// Where worker results go. Shared with the listener threads.
#[derive(Debug, Default)]
struct Routing {
    /// Installed for the duration of a round.
    inbox: Option<Sender<(Move, bool)>>,
    /// Verdicts still owed by workers from rounds that timed out.
    owed: Vec<(Move, SocketAddr)>,
}

impl Routing {
    fn owes(&self, worker: SocketAddr) -> bool {
        self.owed.iter().any(|(_, owing)| *owing == worker)
    }

    fn route(&mut self, mv: Move, winnable: bool, peer: &str) {
        if let Some(pos) = self.owed.iter().position(|(owed, _)| *owed == mv) {
            let (_, worker) = self.owed.swap_remove(pos);
            info!(
                "discarding late result {mv} owed by {worker}, {} still owed",
                self.owed.len()
            );
            return;
        }
        match self.inbox.as_ref() {
            Some(tx) => {
                let _ = tx.send((mv, winnable));
            }
            None => debug!("no evaluation in flight, dropping {mv} from {peer}"),
        }
    }
}

type SharedRouting = Arc<Mutex<Routing>>;

pub struct Coordinator {
    config: ClusterConfig,
    solver: Solver,
    cluster: Mutex<Vec<WorkerLink>>,
    routing: SharedRouting,
    local_addr: SocketAddr,
    listening: Arc<AtomicBool>,
}

impl Coordinator {
    /// Bind the result listener and start accepting worker results.
    pub fn bind(config: ClusterConfig) -> Result<Self> {
        let solver = Solver::new(config.search.clone())?;
        let listener = TcpListener::bind(config.listen)?;
        let local_addr = listener.local_addr()?;
        let routing = SharedRouting::default();
        let listening = Arc::new(AtomicBool::new(true));

        {
            let routing = Arc::clone(&routing);
            let listening = Arc::clone(&listening);
            let io_timeout = config.io_timeout();
            thread::Builder::new()
                .name("pegsol-results".into())
                .spawn(move || accept_results(listener, routing, listening, io_timeout))?;
        }
        info!("coordinator accepting results on {local_addr}");

        Ok(Self {
            config,
            solver,
            cluster: Mutex::new(Vec::new()),
            routing,
            local_addr,
            listening,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn cluster_size(&self) -> usize {
        self.cluster.lock().len()
    }

    /// Results still owed by workers from rounds that timed out.
    pub fn owed_results(&self) -> usize {
        self.routing.lock().owed.len()
    }

    /// Append a worker. Blocks while an evaluation is running.
    pub fn add_worker(&self, link: WorkerLink) {
        let mut cluster = self.cluster.lock();
        info!("worker {} joined, cluster size {}", link.addr(), cluster.len() + 1);
        cluster.push(link);
    }

    /// Send the shutdown flag to every worker and forget them.
    pub fn shutdown_cluster(&self) {
        let mut cluster = self.cluster.lock();
        for link in cluster.iter_mut() {
            match link.send_control(true) {
                Ok(()) => debug!("sent shutdown to {}", link.addr()),
                Err(e) => warn!("could not send shutdown to {}: {e}", link.addr()),
            }
        }
        info!("released {} workers", cluster.len());
        cluster.clear();
    }

    /// All winning first jumps of `board`, local results first in jump order,
    /// then worker results in arrival order. Worker results that do not show
    /// up before the result timeout are left out and become owed.
    pub fn evaluate(&self, board: &Board) -> Vec<Suggestion> {
        let mut cluster = self.cluster.lock();
        let moves = generate_moves(board);
        let (tx, rx) = unbounded();
        let plan = {
            let mut routing = self.routing.lock();
            routing.inbox = Some(tx);
            let owed: FxHashSet<Move> = routing.owed.iter().map(|(mv, _)| *mv).collect();
            let available: Vec<bool> = cluster
                .iter()
                .map(|link| {
                    let busy = routing.owes(link.addr());
                    if busy {
                        debug!("{} still owes results, skipping it", link.addr());
                    }
                    !busy
                })
                .collect();
            RoundPlan::deal(&moves, &available, &owed)
        };
        info!(
            "evaluating {} first jumps over {} slots, {} local (round-robin share {})",
            moves.len(),
            cluster.len() + 1,
            plan.local.len(),
            expected_result_count(moves.len(), cluster.len())
        );

        let (mut pending, undelivered) = dispatch(&mut cluster, board, &moves, &plan);
        let mut local = plan.local;
        local.extend(undelivered);
        local.sort_unstable();
        let local_tasks: Vec<SearchTask> = local
            .into_iter()
            .map(|i| SearchTask::root(board, moves[i]))
            .collect();

        let (local, mut remote) = thread::scope(|s| {
            let local = s.spawn(|| self.solver.run_tasks(&local_tasks));
            let remote = self.collect(&rx, &mut pending);
            (local.join(), remote)
        });

        {
            let mut routing = self.routing.lock();
            routing.inbox = None;
            // results that raced the deadline
            for (mv, winnable) in rx.try_iter() {
                if pending.remove(&mv).is_some() {
                    remote.push((mv, winnable));
                }
            }
            for (mv, worker) in pending {
                warn!("{worker} still owes {mv}");
                routing.owed.push((mv, worker));
            }
        }
        cluster.retain(|link| {
            if link.is_broken() {
                warn!("dropping worker {} after a failed send", link.addr());
            }
            !link.is_broken()
        });

        let mut suggestions = match local {
            Ok(outcomes) => winning_suggestions(&outcomes),
            Err(_) => {
                error!("local search panicked, keeping worker results only");
                Vec::new()
            }
        };
        suggestions.extend(
            remote
                .into_iter()
                .filter(|(_, winnable)| *winnable)
                .map(|(mv, _)| mv.suggestion()),
        );
        suggestions
    }

    /// Wait for the result of every jump in `pending`, or until the timeout.
    /// Jumps still in `pending` afterwards never reported.
    fn collect(
        &self,
        rx: &Receiver<(Move, bool)>,
        pending: &mut FxHashMap<Move, SocketAddr>,
    ) -> Vec<(Move, bool)> {
        let expected = pending.len();
        // a timeout too far out to represent means no deadline
        let deadline = Instant::now().checked_add(self.config.result_timeout());
        let mut results = Vec::with_capacity(expected);
        while !pending.is_empty() {
            let received = match deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((mv, winnable)) => {
                    if pending.remove(&mv).is_some() {
                        debug!("result {mv}: {winnable}");
                        results.push((mv, winnable));
                    } else {
                        debug!("ignoring undispatched or duplicate result {mv}");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "timed out with {} of {expected} worker results missing",
                        pending.len()
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        results
    }

    /// Stop accepting results. Also runs on drop.
    pub fn stop_listening(&self) {
        if !self.listening.swap(false, Ordering::SeqCst) {
            return;
        }
        // wake the blocking accept
        let wake = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.local_addr.port())
            }
            IpAddr::V6(ip) if ip.is_unspecified() => {
                SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), self.local_addr.port())
            }
            _ => self.local_addr,
        };
        let _ = TcpStream::connect_timeout(&wake, Duration::from_secs(1));
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

/// Announce the round to every worker with a share, then send its records.
/// Returns the jumps handed out with the worker that owes each, and the move
/// indices that could not be delivered.
fn dispatch(
    cluster: &mut [WorkerLink],
    board: &Board,
    moves: &[Move],
    plan: &RoundPlan,
) -> (FxHashMap<Move, SocketAddr>, Vec<usize>) {
    let mut pending = FxHashMap::default();
    let mut undelivered = Vec::new();

    for (link, share) in cluster.iter_mut().zip(&plan.remote) {
        if share.is_empty() {
            continue;
        }
        if let Err(e) = link.send_control(false) {
            warn!("could not start round on {}: {e}", link.addr());
            link.mark_broken();
            undelivered.extend_from_slice(share);
            continue;
        }
        for (j, &i) in share.iter().enumerate() {
            let mv = moves[i];
            let record = WorkRecord {
                mv,
                board: *board,
                has_more_work: j + 1 < share.len(),
            };
            if let Err(e) = link.send_work(&record) {
                warn!("could not send {mv} to {}: {e}", link.addr());
                link.mark_broken();
                undelivered.extend_from_slice(&share[j..]);
                break;
            }
            debug!("sent {mv} to {}", link.addr());
            pending.insert(mv, link.addr());
        }
    }
    (pending, undelivered)
}

fn accept_results(
    listener: TcpListener,
    routing: SharedRouting,
    listening: Arc<AtomicBool>,
    io_timeout: Duration,
) {
    for stream in listener.incoming() {
        if !listening.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("result listener: {e}");
                continue;
            }
        };
        let routing = Arc::clone(&routing);
        let spawned = thread::Builder::new()
            .name("pegsol-result".into())
            .spawn(move || read_result(stream, &routing, io_timeout));
        if let Err(e) = spawned {
            error!("could not spawn result reader: {e}");
        }
    }
    debug!("result listener stopped");
}

fn read_result(stream: TcpStream, routing: &SharedRouting, io_timeout: Duration) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown peer".into());
    if let Err(e) = stream.set_read_timeout(Some(io_timeout)) {
        warn!("{peer}: {e}");
    }
    match ResultRecord::read_from(&mut BufReader::new(stream)) {
        Ok(ResultRecord::Labeled { mv, winnable }) => routing.lock().route(mv, winnable, &peer),
        Ok(ResultRecord::Unlabeled) => warn!("{peer} sent a result without a jump"),
        Err(e) => warn!("bad result from {peer}: {e}"),
    }
}
