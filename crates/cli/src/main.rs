use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use pegsol_cluster::{
    register_all, ClusterConfig, ClusterError, Coordinator, WorkerConfig, WorkerNode,
};
use pegsol_core::{Board, BoardError, HoleId, Move, Suggestion, Variant};
use pegsol_engine::{apply_move, generate_moves, is_solved, EngineError, SearchConfig, Solver};
use serde::Serialize;
use thiserror::Error;

mod peers;

use peers::{parse_peer_flag, parse_peers, Peer, PeerError};

#[derive(Parser)]
#[command(name = "pegsol")]
#[command(about = "Distributed peg-solitaire solver")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve coordinator sessions until killed
    Worker {
        /// Address to accept the coordinator on
        #[arg(long)]
        listen: Option<SocketAddr>,
        /// Coordinator port that results are sent to
        #[arg(long)]
        reply_port: Option<u16>,
        /// JSON worker configuration
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Print the first jumps that keep a board winnable
    Suggest {
        #[command(flatten)]
        board: BoardArgs,
        /// Worker to register, as name=address (repeatable)
        #[arg(long = "peer", value_name = "NAME=ADDR")]
        peers: Vec<String>,
        /// File of `name: address` lines
        #[arg(long)]
        peers_file: Option<PathBuf>,
        /// Address worker results arrive on
        #[arg(long)]
        listen: Option<SocketAddr>,
        /// Longest wait for worker results
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// JSON cluster configuration
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Play a board out to one peg on this machine
    Solve {
        #[command(flatten)]
        board: BoardArgs,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// List the legal jumps of a board
    Moves {
        #[command(flatten)]
        board: BoardArgs,
    },
}

#[derive(Args)]
struct BoardArgs {
    /// Board shape
    #[arg(long, default_value_t = Variant::English)]
    variant: Variant,
    /// Comma-separated empty holes; default is the centre
    #[arg(long, value_delimiter = ',', conflicts_with = "pegs")]
    empty: Option<Vec<HoleId>>,
    /// Comma-separated occupied holes; every other hole is empty
    #[arg(long, value_delimiter = ',')]
    pegs: Option<Vec<HoleId>>,
}

impl BoardArgs {
    fn board(&self) -> Result<Board, BoardError> {
        match (&self.empty, &self.pegs) {
            (_, Some(pegs)) => Board::with_pegs(self.variant, pegs),
            (Some(empty), None) => Board::new(self.variant, empty),
            (None, None) => Ok(Board::standard(self.variant)),
        }
    }
}

#[derive(Args)]
struct SearchArgs {
    /// Search threads, 0 for one per core
    #[arg(long)]
    threads: Option<usize>,
    /// Jump count at or below which a position is swept sequentially
    #[arg(long)]
    exhaustive_threshold: Option<usize>,
}

impl SearchArgs {
    fn apply(&self, mut config: SearchConfig) -> SearchConfig {
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(threshold) = self.exhaustive_threshold {
            config = config.with_exhaustive_move_threshold(threshold);
        }
        config
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Peers(#[from] PeerError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config<T: Default + serde::de::DeserializeOwned>(
    path: Option<&Path>,
) -> Result<T, CliError> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    serde_json::from_str(&read_text(path)?).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Serialize)]
struct SuggestionReport {
    suggestions: Vec<Suggestion>,
}

#[derive(Serialize)]
struct SolveReport {
    winnable: bool,
    line: Vec<Move>,
}

#[derive(Serialize)]
struct MovesReport {
    moves: Vec<Move>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn run_worker(config: WorkerConfig) -> Result<(), CliError> {
    let node = WorkerNode::bind(config)?;
    node.serve()?;
    Ok(())
}

fn run_suggest(config: ClusterConfig, board: Board, peers: Vec<Peer>) -> Result<(), CliError> {
    let coordinator = Arc::new(Coordinator::bind(config)?);
    let missing = register_all(
        &coordinator,
        peers.into_iter().map(|peer| (peer.name, peer.addr)),
    )?;
    if !missing.is_empty() {
        warn!("continuing without {}", missing.join(", "));
    }
    info!("cluster size {}", coordinator.cluster_size());

    let suggestions = coordinator.evaluate(&board);
    coordinator.shutdown_cluster();
    print_json(&SuggestionReport { suggestions })
}

/// Follow the first winning jump until one peg is left.
fn run_solve(config: SearchConfig, mut board: Board) -> Result<bool, CliError> {
    let solver = Solver::new(config)?;
    let mut line = Vec::new();
    while !is_solved(&board) {
        let Some(next) = solver.evaluate(&board).first().copied() else {
            break;
        };
        let Some(mv) = generate_moves(&board)
            .into_iter()
            .find(|mv| mv.start == next.start && mv.end == next.end)
        else {
            break;
        };
        info!("{mv}");
        board = apply_move(&board, &mv);
        line.push(mv);
    }
    let winnable = is_solved(&board);
    print_json(&SolveReport { winnable, line })?;
    Ok(winnable)
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Command::Worker {
            listen,
            reply_port,
            config,
            search,
        } => {
            let mut config: WorkerConfig = load_config(config.as_deref())?;
            if let Some(listen) = listen {
                config = config.with_listen(listen);
            }
            if let Some(port) = reply_port {
                config = config.with_reply_port(port);
            }
            config.search = search.apply(config.search);
            run_worker(config)?;
        }
        Command::Suggest {
            board,
            peers,
            peers_file,
            listen,
            timeout_secs,
            config,
            search,
        } => {
            let mut config: ClusterConfig = load_config(config.as_deref())?;
            if let Some(listen) = listen {
                config = config.with_listen(listen);
            }
            if let Some(secs) = timeout_secs {
                config = config.with_result_timeout(Duration::from_secs(secs));
            }
            config.search = search.apply(config.search);

            let mut all = match peers_file {
                Some(path) => parse_peers(&read_text(&path)?)?,
                None => Vec::new(),
            };
            for flag in &peers {
                all.push(parse_peer_flag(flag)?);
            }
            run_suggest(config, board.board()?, all)?;
        }
        Command::Solve { board, search } => {
            let config = search.apply(SearchConfig::default());
            if !run_solve(config, board.board()?)? {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Moves { board } => {
            let moves = generate_moves(&board.board()?).into_vec();
            print_json(&MovesReport { moves })?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
