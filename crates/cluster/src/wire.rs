//! fixed-layout binary framing between coordinator and workers
//!
//! All integers are big-endian `i32`, booleans are one byte (zero = false).
//!
//! * control flag: `bool`, `true` ends the worker session
//! * work record: `start, jumped, end: i32`, 49 cell bytes row-major
//!   (bit 0 enabled, bit 1 occupied), `has_more_work: bool`
//! * result record, one per connection: `start, jumped, end: i32, winnable: bool`,
//!   or the single byte `0xFF` for a task without a labelled jump. Hole ids
//!   are below 49, so a labelled record always opens with `0x00`.

use std::io::{self, Read, Write};

use pegsol_core::{Board, Cell, HoleId, Move, Snapshot, HOLES};
use pegsol_engine::Outcome;

use crate::error::{ClusterError, Result};

pub const DEFAULT_PORT: u16 = 4296;
pub const RESULT_SENTINEL: u8 = 0xFF;

const CELL_ENABLED: u8 = 0b01;
const CELL_OCCUPIED: u8 = 0b10;

pub fn write_bool<W: Write>(w: &mut W, value: bool) -> io::Result<()> {
    w.write_all(&[value as u8])
}

pub fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0] != 0)
}

fn write_i32<W: Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn hole(raw: i32) -> Result<HoleId> {
    if (0..HOLES as i32).contains(&raw) {
        Ok(raw as HoleId)
    } else {
        Err(ClusterError::HoleOutOfRange(raw))
    }
}

pub fn write_move<W: Write>(w: &mut W, mv: &Move) -> io::Result<()> {
    write_i32(w, mv.start as i32)?;
    write_i32(w, mv.jumped as i32)?;
    write_i32(w, mv.end as i32)
}

pub fn read_move<R: Read>(r: &mut R) -> Result<Move> {
    let start = hole(read_i32(r)?)?;
    let jumped = hole(read_i32(r)?)?;
    let end = hole(read_i32(r)?)?;
    Ok(Move::new(start, jumped, end))
}

pub fn encode_cell(cell: Cell) -> u8 {
    let mut byte = 0;
    if cell.enabled {
        byte |= CELL_ENABLED;
    }
    if cell.occupied {
        byte |= CELL_OCCUPIED;
    }
    byte
}

pub fn decode_cell(byte: u8) -> Result<Cell> {
    if byte & !(CELL_ENABLED | CELL_OCCUPIED) != 0 {
        return Err(ClusterError::BadCell(byte));
    }
    Ok(Cell {
        enabled: byte & CELL_ENABLED != 0,
        occupied: byte & CELL_OCCUPIED != 0,
    })
}

pub fn write_board<W: Write>(w: &mut W, board: &Board) -> io::Result<()> {
    let mut bytes = [0u8; HOLES];
    for (byte, cell) in bytes.iter_mut().zip(board.snapshot()) {
        *byte = encode_cell(cell);
    }
    w.write_all(&bytes)
}

pub fn read_board<R: Read>(r: &mut R) -> Result<Board> {
    let mut bytes = [0u8; HOLES];
    r.read_exact(&mut bytes)?;
    let mut cells: Snapshot = [Cell::default(); HOLES];
    for (cell, &byte) in cells.iter_mut().zip(bytes.iter()) {
        *cell = decode_cell(byte)?;
    }
    Ok(Board::from_snapshot(&cells)?)
}

/// One delegated first jump. `board` is the position *before* the jump.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WorkRecord {
    pub mv: Move,
    pub board: Board,
    pub has_more_work: bool,
}

impl WorkRecord {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_move(w, &self.mv)?;
        write_board(w, &self.board)?;
        write_bool(w, self.has_more_work)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mv = read_move(r)?;
        let board = read_board(r)?;
        let has_more_work = read_bool(r)?;
        Ok(Self {
            mv,
            board,
            has_more_work,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResultRecord {
    Labeled { mv: Move, winnable: bool },
    Unlabeled,
}

impl From<Outcome> for ResultRecord {
    fn from(outcome: Outcome) -> Self {
        match outcome.label {
            Some(mv) => ResultRecord::Labeled {
                mv,
                winnable: outcome.winnable,
            },
            None => ResultRecord::Unlabeled,
        }
    }
}

impl ResultRecord {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            ResultRecord::Labeled { mv, winnable } => {
                write_move(w, mv)?;
                write_bool(w, *winnable)
            }
            ResultRecord::Unlabeled => w.write_all(&[RESULT_SENTINEL]),
        }
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut head = [0u8; 4];
        r.read_exact(&mut head[..1])?;
        if head[0] == RESULT_SENTINEL {
            return Ok(ResultRecord::Unlabeled);
        }
        r.read_exact(&mut head[1..])?;
        let start = hole(i32::from_be_bytes(head))?;
        let jumped = hole(read_i32(r)?)?;
        let end = hole(read_i32(r)?)?;
        let winnable = read_bool(r)?;
        Ok(ResultRecord::Labeled {
            mv: Move::new(start, jumped, end),
            winnable,
        })
    }
}
