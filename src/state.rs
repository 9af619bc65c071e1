use crate::display::{DisplayBuffer, FONT};
use crate::error::Chip8Error;

pub type Timer = u8;
pub type Address = u16;

pub const MEM_SIZE: usize = 4096;
pub const ADDRESS_MASK: Address = 0x0FFF;
pub const FONT_ADDR: Address = 0x000;
pub const PC_START_ADDR: Address = 0x200;
pub const NUM_REGISTERS: usize = 16;
pub const NUM_KEYS: usize = 16;
pub const STACK_DEPTH: usize = 16;

pub struct Memory {
    data: [u8; MEM_SIZE],
}
impl Memory {
    /// Zeroed memory with the font glyphs seeded at `FONT_ADDR`.
    pub fn new() -> Self {
        let data = {
            let mut data = [0; MEM_SIZE];
            let font_start = usize::from(FONT_ADDR);
            data[font_start..font_start + FONT.len()].copy_from_slice(&FONT);
            data
        };

        Memory { data }
    }

    /// Reads a byte. Only the low 12 bits of `addr` are used.
    pub fn read(&self, addr: Address) -> u8 {
        self.data[usize::from(addr & ADDRESS_MASK)]
    }

    /// Writes a byte. Only the low 12 bits of `addr` are used.
    pub fn write(&mut self, addr: Address, value: u8) {
        self.data[usize::from(addr & ADDRESS_MASK)] = value;
    }

    /// Replaces the whole store verbatim, font region included.
    pub fn replace(&mut self, image: &[u8; MEM_SIZE]) {
        self.data = *image;
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        let start = usize::from(PC_START_ADDR);
        if program.len() > MEM_SIZE - start {
            return Err(Chip8Error::ProgramTooLarge {
                size: program.len(),
            });
        }
        self.data[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Copies `rows` bytes starting at `addr`, wrapping past the top of memory.
    pub fn read_sprite(&self, addr: Address, rows: u8) -> Vec<u8> {
        (0..u16::from(rows))
            .map(|row| self.read(addr.wrapping_add(row)))
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8; MEM_SIZE] {
        &self.data
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}
impl Register {
    /// Maps a decoded nibble onto a register. Bits above the low four are ignored.
    pub fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Register::V0,
            0x1 => Register::V1,
            0x2 => Register::V2,
            0x3 => Register::V3,
            0x4 => Register::V4,
            0x5 => Register::V5,
            0x6 => Register::V6,
            0x7 => Register::V7,
            0x8 => Register::V8,
            0x9 => Register::V9,
            0xA => Register::VA,
            0xB => Register::VB,
            0xC => Register::VC,
            0xD => Register::VD,
            0xE => Register::VE,
            _ => Register::VF,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// V0..VF. VF doubles as the carry/borrow/collision flag, so any instruction
/// that reports a flag clobbers whatever was stored there.
pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}
impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    pub fn as_array(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-depth return address stack. `sp` is the number of live entries.
pub struct CallStack {
    slots: [Address; STACK_DEPTH],
    sp: u8,
}
impl CallStack {
    pub fn new() -> Self {
        CallStack {
            slots: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        usize::from(self.sp) >= STACK_DEPTH
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    /// Returns false, changing nothing, when the stack is full.
    pub fn push(&mut self, addr: Address) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[usize::from(self.sp)] = addr;
        self.sp += 1;
        true
    }

    pub fn pop(&mut self) -> Option<Address> {
        if self.is_empty() {
            return None;
        }
        self.sp -= 1;
        Some(self.slots[usize::from(self.sp)])
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn slots(&self) -> &[Address; STACK_DEPTH] {
        &self.slots
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
}
impl Key {
    pub const ALL: [Key; NUM_KEYS] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
        Key::KeyA,
        Key::KeyB,
        Key::KeyC,
        Key::KeyD,
        Key::KeyE,
        Key::KeyF,
    ];

    pub fn from_index(index: u8) -> Option<Key> {
        Key::ALL.get(usize::from(index)).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

pub struct Keypad {
    keys: [bool; NUM_KEYS],
}
impl Keypad {
    pub fn new() -> Self {
        Keypad {
            keys: [false; NUM_KEYS],
        }
    }

    pub fn set(&mut self, key: Key, pressed: bool) {
        self.keys[usize::from(key.index())] = pressed;
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys[usize::from(key.index())]
    }

    /// Lowest-numbered key currently held, if any.
    pub fn first_pressed(&self) -> Option<Key> {
        Key::ALL.into_iter().find(|&key| self.is_key_pressed(key))
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the fetch loop is live or parked on the key-wait instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecState {
    Running,
    WaitingForKey(Register),
}

pub struct Chip8State {
    pub memory: Memory,
    pub registers: RegisterBank,
    pub pc: Address,
    pub index: Address,
    pub stack: CallStack,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    pub display: DisplayBuffer,
    pub keypad: Keypad,
    pub exec: ExecState,
}
impl Chip8State {
    pub fn new() -> Self {
        Chip8State {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PC_START_ADDR,
            index: 0,
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            display: DisplayBuffer::new(),
            keypad: Keypad::new(),
            exec: ExecState::Running,
        }
    }

    pub fn reset(&mut self) {
        *self = Chip8State::new();
    }

    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: u8) -> bool {
        let sprite = self.memory.read_sprite(self.index, rows);
        self.display
            .draw_sprite(usize::from(x), usize::from(y), &sprite)
    }
}

impl Default for Chip8State {
    fn default() -> Self {
        Self::new()
    }
}
