use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::display::DisplayBuffer;
use crate::error::Chip8Error;
use crate::instruction::{PcUpdate, decode};
use crate::state::{
    ADDRESS_MASK, Address, Chip8State, ExecState, Key, MEM_SIZE, NUM_REGISTERS, STACK_DEPTH,
    Timer,
};

/// A single CHIP-8 machine.
///
/// The interpreter never keeps time on its own: the caller drives [`Chip8::cycle`]
/// at whatever rate it likes, decrements the timers through
/// [`Chip8::set_delay_timer`]/[`Chip8::set_sound_timer`] and reports key
/// changes through [`Chip8::set_key`].
pub struct Chip8 {
    state: Chip8State,
    rng: Box<dyn RngCore>,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Uses `rng` as the source for `CXNN`.
    pub fn with_rng(rng: impl RngCore + 'static) -> Self {
        Chip8 {
            state: Chip8State::new(),
            rng: Box::new(rng),
        }
    }

    /// Builds a machine whose memory is exactly `image`.
    pub fn from_image(image: &[u8; MEM_SIZE]) -> Self {
        let mut chip8 = Self::new();
        chip8.load_into_memory(image);
        chip8
    }

    /// Executes at most one instruction.
    ///
    /// While parked on the key-wait instruction this does nothing. On error the
    /// machine is left exactly as it was before the call.
    pub fn cycle(&mut self) -> Result<(), Chip8Error> {
        if let ExecState::WaitingForKey(_) = self.state.exec {
            return Ok(());
        }

        let pc = self.state.pc;
        let high_byte = u16::from(self.state.memory.read(pc));
        let low_byte = u16::from(self.state.memory.read(pc.wrapping_add(1)));
        let opcode = (high_byte << 8) | low_byte;
        trace!("{pc:#05X}: {opcode:#06X}");

        let Some(instruction) = decode(opcode) else {
            warn!("unknown opcode {opcode:#06X} at {pc:#05X}");
            return Err(Chip8Error::UnknownOpcode { opcode, pc });
        };
        let update = instruction
            .execute(&mut self.state, &mut *self.rng)
            .inspect_err(|e| warn!("{e}"))?;

        let next_pc = match update {
            PcUpdate::Next => pc.wrapping_add(2),
            PcUpdate::Skip => pc.wrapping_add(4),
            PcUpdate::Jump(target) => target,
            PcUpdate::Hold => pc,
        };
        self.state.pc = next_pc & ADDRESS_MASK;
        Ok(())
    }

    /// Zeroes every register, timer, the stack, display and keypad, reseeds the
    /// font and aborts any pending key wait.
    pub fn reset(&mut self) {
        debug!("reset");
        self.state.reset();
    }

    /// Replaces memory verbatim, font region included. Nothing else changes.
    pub fn load_into_memory(&mut self, image: &[u8; MEM_SIZE]) {
        debug!("loaded {MEM_SIZE} byte memory image");
        self.state.memory.replace(image);
    }

    /// Copies `program` to the start address, keeping the font.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.state.memory.load_program(program)?;
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Records a key change. A press while parked on the key-wait instruction
    /// stores the lowest held key in the waiting register and resumes.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.state.keypad.set(key, pressed);
        if !pressed {
            return;
        }
        if let ExecState::WaitingForKey(reg) = self.state.exec {
            if let Some(held) = self.state.keypad.first_pressed() {
                debug!("key {held:?} resumes execution into {reg:?}");
                self.state.registers.write(reg, held.index());
                self.state.pc = self.state.pc.wrapping_add(2) & ADDRESS_MASK;
                self.state.exec = ExecState::Running;
            }
        }
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.state.keypad.is_key_pressed(key)
    }

    pub fn set_delay_timer(&mut self, value: Timer) {
        self.state.delay_timer = value;
    }

    pub fn set_sound_timer(&mut self, value: Timer) {
        self.state.sound_timer = value;
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.state.display
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        self.state.registers.as_array()
    }

    pub fn register(&self, index: usize) -> u8 {
        self.registers()[index]
    }

    pub fn stack(&self) -> &[Address; STACK_DEPTH] {
        self.state.stack.slots()
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        self.state.memory.as_bytes()
    }

    pub fn i(&self) -> Address {
        self.state.index
    }

    pub fn pc(&self) -> Address {
        self.state.pc
    }

    pub fn sp(&self) -> u8 {
        self.state.stack.sp()
    }

    pub fn delay_timer(&self) -> Timer {
        self.state.delay_timer
    }

    pub fn sound_timer(&self) -> Timer {
        self.state.sound_timer
    }

    pub fn exec_state(&self) -> ExecState {
        self.state.exec
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
