use std::io;
use std::net::SocketAddr;

use pegsol_core::{BoardError, Move};
use pegsol_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("hole id {0} is outside the 7x7 grid")]
    HoleOutOfRange(i32),
    #[error("cell byte {0:#04x} carries unknown bits")]
    BadCell(u8),
    #[error("invalid board: {0}")]
    Board(#[from] BoardError),
    #[error("jump {0} is not legal on the received board")]
    IllegalMove(Move),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("unable to connect to {name} at {addr} after {attempts} attempts")]
    Unreachable {
        name: String,
        addr: SocketAddr,
        attempts: u32,
    },
}

pub type Result<T> = std::result::Result<T, ClusterError>;
