//! A CHIP-8 interpreter core.
//!
//! [`Chip8`] owns the whole machine: 4 KiB of memory with the hex font at
//! address 0, sixteen 8-bit registers, I, PC, a 16-deep call stack, the two
//! timers, the keypad and a 64x32 monochrome display. Everything that touches
//! the outside world (pacing, timers, input, rendering, ROM files) is left to
//! the caller.

pub mod chip8;
pub mod display;
pub mod error;
pub mod instruction;
pub mod rom;
pub mod state;

pub use chip8::Chip8;
pub use display::{DISPLAY_HEIGHT, DISPLAY_WIDTH, DisplayBuffer};
pub use error::{Chip8Error, RomError};
pub use rom::{Rom, RomLayout};
pub use state::{ExecState, Key, MEM_SIZE, PC_START_ADDR, Register};
