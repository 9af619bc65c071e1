use log::debug;
use rand::{Rng, RngCore};

use crate::display::FONT_HEIGHT;
use crate::error::Chip8Error;
use crate::state::{Address, Chip8State, ExecState, FONT_ADDR, Key, Register};

/// How the program counter moves once an instruction has run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PcUpdate {
    /// Fall through to the next instruction (+2).
    Next,
    /// Skip the next instruction (+4).
    Skip,
    /// Transfer control; the default advance is suppressed.
    Jump(Address),
    /// Stay on this instruction.
    Hold,
}

impl PcUpdate {
    fn skip_if(condition: bool) -> Self {
        if condition {
            PcUpdate::Skip
        } else {
            PcUpdate::Next
        }
    }
}

pub trait Instruction {
    /// Applies the instruction to `state`. On error nothing has been modified.
    fn execute(
        &self,
        state: &mut Chip8State,
        rng: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error>;
}

/// Returns `None` for words that do not name an instruction.
pub fn decode(raw: u16) -> Option<Box<dyn Instruction>> {
    let decoded = DecodedInstruction::new(raw);

    let instruction: Box<dyn Instruction> = match decoded.opcode {
        0x0 => match decoded.nnn {
            0x0E0 => Box::new(ClearScreen),
            0x0EE => Box::new(SubroutineReturn),
            _ => Box::new(Sys(decoded)),
        },
        0x1 => Box::new(Jump(decoded)),
        0x2 => Box::new(SubroutineCall(decoded)),
        0x3 => Box::new(SkipIfEqImmediate(decoded)),
        0x4 => Box::new(SkipIfNeqImmediate(decoded)),
        0x5 => Box::new(SkipIfXEqY(decoded)),
        0x6 => Box::new(SetImmediate(decoded)),
        0x7 => Box::new(AddImmediate(decoded)),
        0x8 => match decoded.n {
            0x0 => Box::new(SetXToY(decoded)),
            0x1 => Box::new(BinaryOr(decoded)),
            0x2 => Box::new(BinaryAnd(decoded)),
            0x3 => Box::new(BinaryXor(decoded)),
            0x4 => Box::new(AddWithCarry(decoded)),
            0x5 => Box::new(SubtractYFromX(decoded)),
            0x6 => Box::new(RightShift(decoded)),
            0x7 => Box::new(SubtractXFromY(decoded)),
            0xE => Box::new(LeftShift(decoded)),
            _ => return None,
        },
        0x9 => Box::new(SkipIfXNeqY(decoded)),
        0xA => Box::new(SetIndex(decoded)),
        0xB => Box::new(JumpWithOffset(decoded)),
        0xC => Box::new(Random(decoded)),
        0xD => Box::new(Draw(decoded)),
        0xE => match decoded.nn {
            0x9E => Box::new(SkipIfKeyPressed(decoded)),
            0xA1 => Box::new(SkipIfKeyNotPressed(decoded)),
            _ => return None,
        },
        0xF => match decoded.nn {
            0x07 => Box::new(GetDelayTimer(decoded)),
            0x0A => Box::new(WaitForKey(decoded)),
            0x15 => Box::new(SetDelayTimer(decoded)),
            0x18 => Box::new(SetSoundTimer(decoded)),
            0x1E => Box::new(AddToIndex(decoded)),
            0x29 => Box::new(FontChar(decoded)),
            0x33 => Box::new(BinaryCodedDecimal(decoded)),
            0x55 => Box::new(Store(decoded)),
            0x65 => Box::new(Load(decoded)),
            _ => return None,
        },
        _ => unreachable!("opcode is a single nibble"),
    };
    Some(instruction)
}

struct DecodedInstruction {
    /// First nibble. Selects the instruction family.
    opcode: u8,
    /// Second nibble. Names one of the 16 registers.
    x: Register,
    /// Third nibble. Names one of the 16 registers.
    y: Register,
    /// Fourth nibble. A 4-bit number.
    n: u8,
    /// The second byte (third and fourth nibbles). An 8-bit immediate number.
    nn: u8,
    /// The second, third, and fourth nibbles. A 12-bit immediate address.
    nnn: Address,
}
impl DecodedInstruction {
    fn new(raw: u16) -> Self {
        DecodedInstruction {
            opcode: (raw >> 12) as u8,
            x: Register::from_nibble((raw >> 8) as u8),
            y: Register::from_nibble((raw >> 4) as u8),
            n: (raw & 0x0F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}

/// 0NNN. Machine-code routines are not emulated; this behaves as a jump.
struct Sys(DecodedInstruction);
impl Instruction for Sys {
    fn execute(
        &self,
        _: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::Jump(self.0.nnn))
    }
}

struct ClearScreen;
impl Instruction for ClearScreen {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        state.display.clear();
        Ok(PcUpdate::Next)
    }
}

struct Jump(DecodedInstruction);
impl Instruction for Jump {
    fn execute(
        &self,
        _: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::Jump(self.0.nnn))
    }
}

struct SubroutineCall(DecodedInstruction);
impl Instruction for SubroutineCall {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        if !state.stack.push(state.pc.wrapping_add(2)) {
            return Err(Chip8Error::StackOverflow { pc: state.pc });
        }
        Ok(PcUpdate::Jump(self.0.nnn))
    }
}

struct SubroutineReturn;
impl Instruction for SubroutineReturn {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        match state.stack.pop() {
            Some(return_address) => Ok(PcUpdate::Jump(return_address)),
            None => Err(Chip8Error::StackUnderflow { pc: state.pc }),
        }
    }
}

struct SkipIfEqImmediate(DecodedInstruction);
impl Instruction for SkipIfEqImmediate {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::skip_if(
            state.registers.read(self.0.x) == self.0.nn,
        ))
    }
}

struct SkipIfNeqImmediate(DecodedInstruction);
impl Instruction for SkipIfNeqImmediate {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::skip_if(
            state.registers.read(self.0.x) != self.0.nn,
        ))
    }
}

struct SkipIfXEqY(DecodedInstruction);
impl Instruction for SkipIfXEqY {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::skip_if(
            state.registers.read(self.0.x) == state.registers.read(self.0.y),
        ))
    }
}

struct SkipIfXNeqY(DecodedInstruction);
impl Instruction for SkipIfXNeqY {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::skip_if(
            state.registers.read(self.0.x) != state.registers.read(self.0.y),
        ))
    }
}

struct SetImmediate(DecodedInstruction);
impl Instruction for SetImmediate {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        state.registers.write(self.0.x, self.0.nn);
        Ok(PcUpdate::Next)
    }
}

/// 7XNN. Wraps without touching VF.
struct AddImmediate(DecodedInstruction);
impl Instruction for AddImmediate {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        state
            .registers
            .write(self.0.x, value_x.wrapping_add(self.0.nn));
        Ok(PcUpdate::Next)
    }
}

struct SetXToY(DecodedInstruction);
impl Instruction for SetXToY {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_y = state.registers.read(self.0.y);
        state.registers.write(self.0.x, value_y);
        Ok(PcUpdate::Next)
    }
}

struct BinaryOr(DecodedInstruction);
impl Instruction for BinaryOr {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let value_y = state.registers.read(self.0.y);
        state.registers.write(self.0.x, value_x | value_y);
        Ok(PcUpdate::Next)
    }
}

struct BinaryAnd(DecodedInstruction);
impl Instruction for BinaryAnd {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let value_y = state.registers.read(self.0.y);
        state.registers.write(self.0.x, value_x & value_y);
        Ok(PcUpdate::Next)
    }
}

struct BinaryXor(DecodedInstruction);
impl Instruction for BinaryXor {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let value_y = state.registers.read(self.0.y);
        state.registers.write(self.0.x, value_x ^ value_y);
        Ok(PcUpdate::Next)
    }
}

// The flag is always derived from the operands as they were before the
// result is written, and written last, so VF ends up holding the flag even
// when it is also the destination.

struct AddWithCarry(DecodedInstruction);
impl Instruction for AddWithCarry {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let value_y = state.registers.read(self.0.y);
        let (sum, carry) = value_x.overflowing_add(value_y);

        state.registers.write(self.0.x, sum);
        state.registers.write(Register::VF, u8::from(carry));
        Ok(PcUpdate::Next)
    }
}

struct SubtractYFromX(DecodedInstruction);
impl Instruction for SubtractYFromX {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let value_y = state.registers.read(self.0.y);
        let no_borrow = value_x >= value_y;

        state.registers.write(self.0.x, value_x.wrapping_sub(value_y));
        state.registers.write(Register::VF, u8::from(no_borrow));
        Ok(PcUpdate::Next)
    }
}

struct SubtractXFromY(DecodedInstruction);
impl Instruction for SubtractXFromY {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let value_y = state.registers.read(self.0.y);
        let no_borrow = value_y >= value_x;

        state.registers.write(self.0.x, value_y.wrapping_sub(value_x));
        state.registers.write(Register::VF, u8::from(no_borrow));
        Ok(PcUpdate::Next)
    }
}

/// 8XY6. Shifts VX in place; VY is ignored.
struct RightShift(DecodedInstruction);
impl Instruction for RightShift {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        state.registers.write(self.0.x, value_x >> 1);
        state.registers.write(Register::VF, value_x & 0x01);
        Ok(PcUpdate::Next)
    }
}

/// 8XYE. Shifts VX in place; VY is ignored.
struct LeftShift(DecodedInstruction);
impl Instruction for LeftShift {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        state.registers.write(self.0.x, value_x << 1);
        state.registers.write(Register::VF, value_x >> 7);
        Ok(PcUpdate::Next)
    }
}

struct SetIndex(DecodedInstruction);
impl Instruction for SetIndex {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        state.index = self.0.nnn;
        Ok(PcUpdate::Next)
    }
}

struct JumpWithOffset(DecodedInstruction);
impl Instruction for JumpWithOffset {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let offset = Address::from(state.registers.read(Register::V0));
        Ok(PcUpdate::Jump(self.0.nnn + offset))
    }
}

struct Random(DecodedInstruction);
impl Instruction for Random {
    fn execute(
        &self,
        state: &mut Chip8State,
        rng: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let random_value = rng.random::<u8>() & self.0.nn;
        state.registers.write(self.0.x, random_value);
        Ok(PcUpdate::Next)
    }
}

/// DXYN. Reads N rows from I; VF reports whether any lit pixel was erased.
struct Draw(DecodedInstruction);
impl Instruction for Draw {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let x = state.registers.read(self.0.x);
        let y = state.registers.read(self.0.y);

        state.registers.write(Register::VF, 0);
        if state.draw_sprite(x, y, self.0.n) {
            state.registers.write(Register::VF, 1);
        }
        Ok(PcUpdate::Next)
    }
}

fn key_in(state: &Chip8State, reg: Register) -> bool {
    Key::from_index(state.registers.read(reg))
        .is_some_and(|key| state.keypad.is_key_pressed(key))
}

struct SkipIfKeyPressed(DecodedInstruction);
impl Instruction for SkipIfKeyPressed {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::skip_if(key_in(state, self.0.x)))
    }
}

struct SkipIfKeyNotPressed(DecodedInstruction);
impl Instruction for SkipIfKeyNotPressed {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        Ok(PcUpdate::skip_if(!key_in(state, self.0.x)))
    }
}

struct GetDelayTimer(DecodedInstruction);
impl Instruction for GetDelayTimer {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        state.registers.write(self.0.x, state.delay_timer);
        Ok(PcUpdate::Next)
    }
}

/// FX0A. Parks the interpreter until the keypad reports a press.
struct WaitForKey(DecodedInstruction);
impl Instruction for WaitForKey {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        debug!("waiting for a key press into {:?}", self.0.x);
        state.exec = ExecState::WaitingForKey(self.0.x);
        Ok(PcUpdate::Hold)
    }
}

struct SetDelayTimer(DecodedInstruction);
impl Instruction for SetDelayTimer {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        state.delay_timer = state.registers.read(self.0.x);
        Ok(PcUpdate::Next)
    }
}

struct SetSoundTimer(DecodedInstruction);
impl Instruction for SetSoundTimer {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        state.sound_timer = state.registers.read(self.0.x);
        Ok(PcUpdate::Next)
    }
}

/// FX1E. I is not masked, so it may grow past 12 bits.
struct AddToIndex(DecodedInstruction);
impl Instruction for AddToIndex {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        state.index = state.index.wrapping_add(Address::from(value_x));
        Ok(PcUpdate::Next)
    }
}

struct FontChar(DecodedInstruction);
impl Instruction for FontChar {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = Address::from(state.registers.read(self.0.x));
        state.index = FONT_ADDR + value_x * FONT_HEIGHT as Address;
        Ok(PcUpdate::Next)
    }
}

struct BinaryCodedDecimal(DecodedInstruction);
impl Instruction for BinaryCodedDecimal {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        let value_x = state.registers.read(self.0.x);
        let bcd = [value_x / 100, (value_x / 10) % 10, value_x % 10];
        for (offset, digit) in (0..).zip(bcd) {
            state.memory.write(state.index.wrapping_add(offset), digit);
        }
        Ok(PcUpdate::Next)
    }
}

/// FX55. Leaves I where it was.
struct Store(DecodedInstruction);
impl Instruction for Store {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        for offset in 0..=self.0.x.index() as Address {
            let value = state.registers.read(Register::from_nibble(offset as u8));
            state.memory.write(state.index.wrapping_add(offset), value);
        }
        Ok(PcUpdate::Next)
    }
}

/// FX65. Leaves I where it was.
struct Load(DecodedInstruction);
impl Instruction for Load {
    fn execute(
        &self,
        state: &mut Chip8State,
        _: &mut dyn RngCore,
    ) -> Result<PcUpdate, Chip8Error> {
        for offset in 0..=self.0.x.index() as Address {
            let value = state.memory.read(state.index.wrapping_add(offset));
            state.registers.write(Register::from_nibble(offset as u8), value);
        }
        Ok(PcUpdate::Next)
    }
}
