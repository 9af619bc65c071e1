use std::path::PathBuf;

use thiserror::Error;

use crate::state::{Address, MEM_SIZE, PC_START_ADDR};

/// Fatal conditions raised while executing an instruction.
///
/// The instruction that raised one of these has not modified any state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Chip8Error {
    #[error("stack overflow: call at {pc:#05X} with a full call stack")]
    StackOverflow { pc: Address },
    #[error("stack underflow: return at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: Address },
    #[error("unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: Address },
    #[error(
        "program of {size} bytes does not fit in the {} bytes after {:#05X}",
        MEM_SIZE - PC_START_ADDR as usize,
        PC_START_ADDR
    )]
    ProgramTooLarge { size: usize },
}

/// Failures of the ROM loader. These never come out of the interpreter itself.
#[derive(Debug, Error)]
pub enum RomError {
    #[error("failed to read ROM {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ROM {path} is empty")]
    Empty { path: PathBuf },
    #[error(
        "ROM {path} is {size} bytes, only {} fit after {:#05X}",
        MEM_SIZE - PC_START_ADDR as usize,
        PC_START_ADDR
    )]
    TooLarge { path: PathBuf, size: usize },
    #[error("memory image {path} is {size} bytes, expected exactly {}", MEM_SIZE)]
    BadImageSize { path: PathBuf, size: usize },
}
