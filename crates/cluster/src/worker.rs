//! worker side of the cluster, plus the coordinator's handle on a worker
//!
//! A worker holds one long-lived control connection from the coordinator.
//! Each round starts with a `false` control flag followed by work records up
//! to the one with `has_more_work == false`; a `true` flag ends the session.
//! Every result goes back over its own short-lived connection to the
//! coordinator's result port.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info, warn};
use pegsol_engine::{is_valid_move, Outcome, SearchTask, Solver};

use crate::config::WorkerConfig;
use crate::error::{ClusterError, Result};
use crate::wire::{read_bool, write_bool, ResultRecord, WorkRecord};

/// Coordinator-held control connection to one worker.
pub struct WorkerLink {
    addr: SocketAddr,
    writer: BufWriter<TcpStream>,
    broken: bool,
}

impl WorkerLink {
    pub fn connect(addr: SocketAddr, timeout: Duration) -> std::io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Self {
            addr,
            writer: BufWriter::new(stream),
            broken: false,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `true` tells the worker to end its session.
    pub fn send_control(&mut self, shutdown: bool) -> std::io::Result<()> {
        write_bool(&mut self.writer, shutdown)?;
        self.writer.flush()
    }

    pub fn send_work(&mut self, record: &WorkRecord) -> std::io::Result<()> {
        record.write_to(&mut self.writer)?;
        self.writer.flush()
    }

    pub(crate) fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub(crate) fn is_broken(&self) -> bool {
        self.broken
    }
}

impl std::fmt::Debug for WorkerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerLink")
            .field("addr", &self.addr)
            .field("broken", &self.broken)
            .finish()
    }
}

/// A worker process: accepts coordinator sessions one at a time and searches
/// the first jumps it is handed.
pub struct WorkerNode {
    listener: TcpListener,
    config: WorkerConfig,
    solver: Solver,
}

impl WorkerNode {
    pub fn bind(config: WorkerConfig) -> Result<Self> {
        let solver = Solver::new(config.search.clone())?;
        let listener = TcpListener::bind(config.listen)?;
        info!("worker listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            config,
            solver,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve coordinator sessions until the listener fails. A session that
    /// ends in error is logged and the next one accepted.
    pub fn serve(&self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept()?;
            match self.serve_session(stream) {
                Ok(()) => info!("session with {peer} closed"),
                Err(e) => warn!("session with {peer} aborted: {e}"),
            }
        }
    }

    /// Accept exactly one coordinator session and serve it to the end.
    pub fn accept_session(&self) -> Result<()> {
        let (stream, _) = self.listener.accept()?;
        self.serve_session(stream)
    }

    pub fn serve_session(&self, stream: TcpStream) -> Result<()> {
        let peer = stream.peer_addr()?;
        let reply_addr = SocketAddr::new(peer.ip(), self.config.reply_port);
        info!("coordinator {peer} connected, replying to {reply_addr}");

        let mut reader = BufReader::new(stream);
        loop {
            if read_bool(&mut reader)? {
                info!("coordinator {peer} asked for shutdown");
                return Ok(());
            }
            let sent = self.run_round(&mut reader, reply_addr)?;
            debug!("round finished, {sent} results sent");
        }
    }

    /// Run one round. Records are read and spawned on this thread while a
    /// reporter joins the searches in receipt order and sends each result
    /// as soon as it is known. Returns how many results were delivered.
    fn run_round<R: Read>(&self, reader: &mut R, reply_addr: SocketAddr) -> Result<usize> {
        let (order_tx, order_rx) = unbounded::<Receiver<Outcome>>();
        thread::scope(|s| {
            let reporter = s.spawn(move || {
                let mut sent = 0usize;
                for rx in order_rx {
                    // a panicked search drops its sender
                    let Ok(outcome) = rx.recv() else {
                        warn!("search task died before reporting");
                        continue;
                    };
                    match self.report(reply_addr, outcome) {
                        Ok(()) => sent += 1,
                        Err(e) => warn!("could not deliver result to {reply_addr}: {e}"),
                    }
                }
                sent
            });
            let received = self.spawn_records(reader, order_tx);
            let sent = reporter.join().unwrap_or_default();
            received.map(|count| {
                if sent < count {
                    warn!("{} of {count} results were not delivered", count - sent);
                }
                sent
            })
        })
    }

    /// Read records up to the last one of the round, spawning a search per
    /// record. Each search's result channel is queued on `order` as soon as
    /// the search is spawned. Returns once every search has finished.
    fn spawn_records<R: Read>(
        &self,
        reader: &mut R,
        order: Sender<Receiver<Outcome>>,
    ) -> Result<usize> {
        let solver = &self.solver;
        solver.pool().in_place_scope(|scope| {
            let mut count = 0usize;
            loop {
                let record = WorkRecord::read_from(reader)?;
                if !is_valid_move(&record.board, &record.mv) {
                    return Err(ClusterError::IllegalMove(record.mv));
                }
                debug!("task {count}: {}", record.mv);
                let task = SearchTask::root(&record.board, record.mv);
                let (tx, rx) = bounded(1);
                scope.spawn(move |_| {
                    let _ = tx.send(solver.outcome(&task));
                });
                // the reporter outlives every record of the round
                let _ = order.send(rx);
                count += 1;
                if !record.has_more_work {
                    return Ok(count);
                }
            }
        })
    }

    fn report(&self, reply_addr: SocketAddr, outcome: Outcome) -> Result<()> {
        let record = ResultRecord::from(outcome);
        let stream = TcpStream::connect_timeout(&reply_addr, self.config.io_timeout())?;
        let mut writer = BufWriter::new(stream);
        record.write_to(&mut writer)?;
        writer.flush()?;
        debug!("sent {record:?} to {reply_addr}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegsol_core::{Board, Move, Variant};
    use pegsol_engine::SearchConfig;
    use std::io::ErrorKind;
    use std::time::Instant;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn collector() -> (TcpListener, u16) {
        let listener = TcpListener::bind(loopback()).unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn node(reply_port: u16) -> WorkerNode {
        WorkerNode::bind(
            WorkerConfig::default()
                .with_listen(loopback())
                .with_reply_port(reply_port)
                .with_search(SearchConfig::default().with_threads(2)),
        )
        .unwrap()
    }

    fn read_result(listener: &TcpListener) -> ResultRecord {
        let (mut stream, _) = listener.accept().unwrap();
        ResultRecord::read_from(&mut stream).unwrap()
    }

    #[test]
    fn test_round_results_follow_record_order() {
        let (results, port) = collector();
        let worker = node(port);
        let addr = worker.local_addr().unwrap();
        let handle = thread::spawn(move || worker.accept_session());

        let board = Board::with_pegs(Variant::English, &[23, 24, 32]).unwrap();
        let mut link = WorkerLink::connect(addr, Duration::from_secs(5)).unwrap();
        link.send_control(false).unwrap();
        for (mv, more) in [(Move::new(24, 23, 22), true), (Move::new(23, 24, 25), false)] {
            link.send_work(&WorkRecord {
                mv,
                board,
                has_more_work: more,
            })
            .unwrap();
        }

        assert_eq!(
            read_result(&results),
            ResultRecord::Labeled {
                mv: Move::new(24, 23, 22),
                winnable: false
            }
        );
        assert_eq!(
            read_result(&results),
            ResultRecord::Labeled {
                mv: Move::new(23, 24, 25),
                winnable: true
            }
        );

        link.send_control(true).unwrap();
        assert!(handle.join().unwrap().is_ok());
    }

    /// Accept one result, or give up after `wait`.
    fn read_result_within(listener: &TcpListener, wait: Duration) -> Option<ResultRecord> {
        listener.set_nonblocking(true).unwrap();
        let deadline = Instant::now() + wait;
        let record = loop {
            match listener.accept() {
                Ok((mut stream, _)) => {
                    stream.set_nonblocking(false).unwrap();
                    break Some(ResultRecord::read_from(&mut stream).unwrap());
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break None;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("accept failed: {e}"),
            }
        };
        listener.set_nonblocking(false).unwrap();
        record
    }

    #[test]
    fn test_finished_task_is_reported_while_round_is_open() {
        let (results, port) = collector();
        let worker = node(port);
        let addr = worker.local_addr().unwrap();
        let handle = thread::spawn(move || worker.accept_session());

        let mut link = WorkerLink::connect(addr, Duration::from_secs(5)).unwrap();
        link.send_control(false).unwrap();
        link.send_work(&WorkRecord {
            mv: Move::new(23, 24, 25),
            board: Board::with_pegs(Variant::English, &[23, 24]).unwrap(),
            has_more_work: true,
        })
        .unwrap();

        // the round's last record has not been sent yet
        assert_eq!(
            read_result_within(&results, Duration::from_secs(5)),
            Some(ResultRecord::Labeled {
                mv: Move::new(23, 24, 25),
                winnable: true
            })
        );

        link.send_work(&WorkRecord {
            mv: Move::new(2, 3, 4),
            board: Board::with_pegs(Variant::English, &[2, 3]).unwrap(),
            has_more_work: false,
        })
        .unwrap();
        assert_eq!(
            read_result(&results),
            ResultRecord::Labeled {
                mv: Move::new(2, 3, 4),
                winnable: true
            }
        );

        link.send_control(true).unwrap();
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_session_survives_several_rounds() {
        let (results, port) = collector();
        let worker = node(port);
        let addr = worker.local_addr().unwrap();
        let handle = thread::spawn(move || worker.accept_session());

        let mut link = WorkerLink::connect(addr, Duration::from_secs(5)).unwrap();
        let boards = [
            (Board::with_pegs(Variant::English, &[2, 3]).unwrap(), Move::new(2, 3, 4)),
            (Board::with_pegs(Variant::European, &[24, 25]).unwrap(), Move::new(25, 24, 23)),
        ];
        for (board, mv) in boards {
            link.send_control(false).unwrap();
            link.send_work(&WorkRecord {
                mv,
                board,
                has_more_work: false,
            })
            .unwrap();
            assert_eq!(
                read_result(&results),
                ResultRecord::Labeled { mv, winnable: true }
            );
        }

        link.send_control(true).unwrap();
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_illegal_jump_ends_session() {
        let (_results, port) = collector();
        let worker = node(port);
        let addr = worker.local_addr().unwrap();
        let handle = thread::spawn(move || worker.accept_session());

        let mut link = WorkerLink::connect(addr, Duration::from_secs(5)).unwrap();
        link.send_control(false).unwrap();
        link.send_work(&WorkRecord {
            mv: Move::new(2, 3, 4),
            board: Board::with_pegs(Variant::English, &[2]).unwrap(),
            has_more_work: false,
        })
        .unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, ClusterError::IllegalMove(mv) if mv == Move::new(2, 3, 4)));
    }

    #[test]
    fn test_dropped_coordinator_is_io_error() {
        let worker = node(1);
        let addr = worker.local_addr().unwrap();
        let handle = thread::spawn(move || worker.accept_session());

        let link = WorkerLink::connect(addr, Duration::from_secs(5)).unwrap();
        drop(link);
        assert!(matches!(handle.join().unwrap(), Err(ClusterError::Io(_))));
    }
}
