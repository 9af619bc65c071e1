//! Instruction-level behaviour driven through the public interface, one program
//! at a time. Memory starts out all zero (no font) unless a test says otherwise.

use chip8_interp::display::FONT;
use chip8_interp::{Chip8, Chip8Error, ExecState, Key, MEM_SIZE, PC_START_ADDR, Register};
use rand::SeedableRng;
use rand::rngs::StdRng;

const START: u16 = PC_START_ADDR;

struct Fixture {
    cpu: Chip8,
    memory: [u8; MEM_SIZE],
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            cpu: Chip8::with_rng(StdRng::seed_from_u64(0xC8)),
            memory: [0; MEM_SIZE],
        }
    }

    /// Places one instruction at `address` and reloads the whole image.
    fn load(&mut self, address: u16, high: u8, low: u8) {
        self.memory[usize::from(address) & 0xFFF] = high;
        self.memory[(usize::from(address) + 1) & 0xFFF] = low;
        self.cpu.load_into_memory(&self.memory);
    }

    fn program(&mut self, words: &[u16]) {
        for (address, word) in (START..).step_by(2).zip(words) {
            let [high, low] = word.to_be_bytes();
            self.load(address, high, low);
        }
    }

    fn cycles(&mut self, n: usize) {
        for _ in 0..n {
            self.cpu.cycle().unwrap();
        }
    }
}

#[test]
fn sys_sets_pc_to_address() {
    let mut f = Fixture::new();
    f.load(START, 0x0F, 0xFF);
    f.cycles(1);
    assert_eq!(f.cpu.pc(), 0xFFF);
}

#[test]
fn cls_clears_display_buffer() {
    let mut f = Fixture::new();
    f.program(&[0xA200, 0xD00F, 0x00E0]);
    f.cycles(2);
    assert!(!f.cpu.display().is_blank());

    f.cycles(1);
    assert!(f.cpu.display().is_blank());
    assert_eq!(f.cpu.pc(), START + 6);
}

#[test]
fn cls_on_fresh_machine() {
    let mut f = Fixture::new();
    f.load(START, 0x00, 0xE0);
    f.cycles(1);
    assert!(f.cpu.display().as_bits().not_any());
}

#[test]
fn ret_returns_from_subroutine() {
    let mut f = Fixture::new();
    f.load(START, 0x2F, 0xFF);
    // The second byte of an instruction at 0xFFF wraps to address 0.
    f.load(0xFFF, 0x00, 0xEE);

    f.cycles(1);
    let sp_after_call = f.cpu.sp();
    f.cycles(1);

    assert_eq!(f.cpu.pc(), START + 2);
    assert_eq!(f.cpu.sp(), sp_after_call - 1);
}

#[test]
fn jumps_to_correct_address() {
    let mut f = Fixture::new();
    f.load(START, 0x1F, 0xFF);
    f.cycles(1);
    assert_eq!(f.cpu.pc(), 0xFFF);
}

#[test]
fn call_pushes_return_address_and_jumps() {
    let mut f = Fixture::new();
    f.load(START, 0x2F, 0xFF);
    f.cycles(1);

    assert_eq!(f.cpu.pc(), 0xFFF);
    assert_eq!(f.cpu.sp(), 1);
    assert_eq!(f.cpu.stack()[usize::from(f.cpu.sp()) - 1], START + 2);
}

#[test]
fn nested_calls_unwind_in_order() {
    let mut f = Fixture::new();
    // 200: call 300; 202: jump 202
    // 300: call 400; 302: ret
    // 400: ret
    f.program(&[0x2300, 0x1202]);
    f.load(0x300, 0x24, 0x00);
    f.load(0x302, 0x00, 0xEE);
    f.load(0x400, 0x00, 0xEE);

    f.cycles(2);
    assert_eq!((f.cpu.pc(), f.cpu.sp()), (0x400, 2));
    f.cycles(1);
    assert_eq!((f.cpu.pc(), f.cpu.sp()), (0x302, 1));
    f.cycles(1);
    assert_eq!((f.cpu.pc(), f.cpu.sp()), (START + 2, 0));
}

#[test]
fn seventeenth_nested_call_is_a_stack_overflow() {
    let mut f = Fixture::new();
    // Calls itself forever.
    f.program(&[0x2200]);
    f.cycles(16);
    assert_eq!(f.cpu.sp(), 16);

    assert_eq!(
        f.cpu.cycle(),
        Err(Chip8Error::StackOverflow { pc: START })
    );
    assert_eq!(f.cpu.sp(), 16);
    assert_eq!(f.cpu.pc(), START);
}

#[test]
fn return_with_empty_stack_is_an_underflow() {
    let mut f = Fixture::new();
    f.program(&[0x00EE]);
    assert_eq!(
        f.cpu.cycle(),
        Err(Chip8Error::StackUnderflow { pc: START })
    );
    assert_eq!(f.cpu.pc(), START);
    assert_eq!(f.cpu.sp(), 0);
}

#[test]
fn skip_if_equal_byte() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x30FF]);
    f.cycles(2);
    assert_eq!(f.cpu.pc(), START + 6);

    let mut f = Fixture::new();
    f.program(&[0x60FE, 0x30FF]);
    f.cycles(2);
    assert_eq!(f.cpu.pc(), START + 4);
}

#[test]
fn skip_if_not_equal_byte() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x40FF]);
    f.cycles(2);
    assert_eq!(f.cpu.pc(), START + 4);

    let mut f = Fixture::new();
    f.program(&[0x6001, 0x40FF]);
    f.cycles(2);
    assert_eq!(f.cpu.pc(), START + 6);
}

#[test]
fn skip_if_registers_equal() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x61FF, 0x5010]);
    f.cycles(3);
    assert_eq!(f.cpu.pc(), START + 8);
}

#[test]
fn skip_if_registers_not_equal() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x6101, 0x9010]);
    f.cycles(3);
    assert_eq!(f.cpu.pc(), START + 8);

    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x61FF, 0x9010]);
    f.cycles(3);
    assert_eq!(f.cpu.pc(), START + 6);
}

#[test]
fn load_byte_into_register() {
    let mut f = Fixture::new();
    f.load(START, 0x60, 0xFF);
    f.cycles(1);
    assert_eq!(f.cpu.register(0), 0xFF);
}

#[test]
fn add_byte_wraps_and_keeps_vf() {
    let mut f = Fixture::new();
    f.program(&[0x6002, 0x7010]);
    f.cycles(2);
    assert_eq!(f.cpu.register(0), 0x12);

    let mut f = Fixture::new();
    f.program(&[0x6F07, 0x6AFF, 0x7A02]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0xA), 0x01);
    assert_eq!(f.cpu.register(0xF), 0x07);
}

#[test]
fn copy_register() {
    let mut f = Fixture::new();
    f.program(&[0x61FF, 0x8010]);
    f.cycles(2);
    assert_eq!(f.cpu.register(0), 0xFF);
}

#[test]
fn bitwise_or_and_xor() {
    let mut f = Fixture::new();
    f.program(&[0x60DA, 0x612C, 0x8011]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0xFE);

    let mut f = Fixture::new();
    f.program(&[0x60FB, 0x612D, 0x8012]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0x29);

    let mut f = Fixture::new();
    f.program(&[0x60FB, 0x612D, 0x8013]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0xD6);
}

#[test]
fn add_registers_sets_carry() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x6102, 0x8014]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0x01);
    assert_eq!(f.cpu.register(0xF), 0x01);

    let mut f = Fixture::new();
    f.program(&[0x6F01, 0x6010, 0x6120, 0x8014]);
    f.cycles(4);
    assert_eq!(f.cpu.register(0), 0x30);
    assert_eq!(f.cpu.register(0xF), 0x00);
}

#[test]
fn subtract_sets_not_borrow() {
    let mut f = Fixture::new();
    f.program(&[0x6001, 0x61FF, 0x8015]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0x02);
    assert_eq!(f.cpu.register(0xF), 0x00);

    // Equal operands do not borrow.
    let mut f = Fixture::new();
    f.program(&[0x6042, 0x6142, 0x8015]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0x00);
    assert_eq!(f.cpu.register(0xF), 0x01);
}

#[test]
fn reverse_subtract_sets_not_borrow() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0x6101, 0x8017]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0x02);
    assert_eq!(f.cpu.register(0xF), 0x00);

    let mut f = Fixture::new();
    f.program(&[0x6001, 0x61FF, 0x8017]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0), 0xFE);
    assert_eq!(f.cpu.register(0xF), 0x01);
}

#[test]
fn subtract_flag_is_taken_before_the_result_is_written() {
    // 8F15: VF is the destination. 0x05 >= 0x03 so no borrow, and the flag
    // replaces the difference.
    let mut f = Fixture::new();
    f.program(&[0x6F05, 0x6103, 0x8F15]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0xF), 0x01);

    // 8F17: VF is the destination of VY - VX. 0x03 < 0x05 so a borrow.
    let mut f = Fixture::new();
    f.program(&[0x6F05, 0x6103, 0x8F17]);
    f.cycles(3);
    assert_eq!(f.cpu.register(0xF), 0x00);
}

#[test]
fn shift_right_and_left() {
    let mut f = Fixture::new();
    f.program(&[0x60AD, 0x8006]);
    f.cycles(2);
    assert_eq!(f.cpu.register(0), 0x56);
    assert_eq!(f.cpu.register(0xF), 0x01);

    let mut f = Fixture::new();
    f.program(&[0x60AD, 0x800E]);
    f.cycles(2);
    assert_eq!(f.cpu.register(0), 0x5A);
    assert_eq!(f.cpu.register(0xF), 0x01);
}

#[test]
fn load_i_from_address() {
    let mut f = Fixture::new();
    f.load(START, 0xAF, 0xFF);
    f.cycles(1);
    assert_eq!(f.cpu.i(), 0xFFF);
}

#[test]
fn jump_off_v0() {
    let mut f = Fixture::new();
    f.program(&[0x6020, 0xBF00]);
    f.cycles(2);
    assert_eq!(f.cpu.pc(), 0xF20);
}

#[test]
fn random_is_masked_by_byte() {
    for seed in 0..32 {
        let mut cpu = Chip8::with_rng(StdRng::seed_from_u64(seed));
        cpu.load_program(&[0xC0, 0x0F, 0xC1, 0x00]).unwrap();
        cpu.cycle().unwrap();
        cpu.cycle().unwrap();
        assert!(cpu.register(0) <= 0x0F);
        assert_eq!(cpu.register(1), 0);
    }
}

#[test]
fn random_is_reproducible_with_the_same_seed() {
    let run = |seed| {
        let mut cpu = Chip8::with_rng(StdRng::seed_from_u64(seed));
        cpu.load_program(&[0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF]).unwrap();
        for _ in 0..3 {
            cpu.cycle().unwrap();
        }
        cpu.registers()[..3].to_vec()
    };
    assert_eq!(run(99), run(99));
}

#[test]
fn draw_font_glyph_and_collide() {
    let mut cpu = Chip8::with_rng(StdRng::seed_from_u64(0));
    // V0 = 8, V1 = 3, I = glyph for 8, draw twice.
    cpu.load_program(&[0x60, 0x08, 0x61, 0x03, 0xF0, 0x29, 0xD0, 0x15, 0xD0, 0x15])
        .unwrap();
    cpu.cycle().unwrap();
    cpu.cycle().unwrap();
    cpu.cycle().unwrap();
    assert_eq!(cpu.i(), 8 * 5);

    cpu.cycle().unwrap();
    assert_eq!(cpu.register(0xF), 0);
    for (row, byte) in FONT[40..45].iter().enumerate() {
        for bit in 0..8 {
            let lit = (byte >> (7 - bit)) & 1 == 1;
            assert_eq!(cpu.display().pixel(8 + bit, 3 + row), lit);
        }
    }

    cpu.cycle().unwrap();
    assert_eq!(cpu.register(0xF), 1);
    assert!(cpu.display().is_blank());
    assert_eq!(cpu.i(), 8 * 5);
}

#[test]
fn draw_wraps_around_both_edges() {
    let mut cpu = Chip8::with_rng(StdRng::seed_from_u64(0));
    // V0 = 60, V1 = 30, I = 0x300 (two rows of 0xFF), draw 2 rows.
    cpu.load_program(&[0x60, 60, 0x61, 30, 0xA3, 0x00, 0xD0, 0x12]).unwrap();
    let mut image = *cpu.memory();
    image[0x300] = 0xFF;
    image[0x301] = 0xFF;
    cpu.load_into_memory(&image);
    for _ in 0..4 {
        cpu.cycle().unwrap();
    }

    for y in [30, 31] {
        for x in (60..64).chain(0..4) {
            assert!(cpu.display().pixel(x, y), "({x}, {y}) should be lit");
        }
        assert!(!cpu.display().pixel(4, y));
        assert!(!cpu.display().pixel(59, y));
    }
    assert!(!cpu.display().pixel(60, 0));
}

#[test]
fn skip_if_key_pressed() {
    let mut f = Fixture::new();
    f.cpu.set_key(Key::Key0, true);
    f.load(START, 0xE0, 0x9E);
    f.cycles(1);
    assert_eq!(f.cpu.pc(), START + 4);

    let mut f = Fixture::new();
    f.load(START, 0xE0, 0x9E);
    f.cycles(1);
    assert_eq!(f.cpu.pc(), START + 2);
}

#[test]
fn skip_if_key_not_pressed() {
    let mut f = Fixture::new();
    f.cpu.set_key(Key::Key0, false);
    f.load(START, 0xE0, 0xA1);
    f.cycles(1);
    assert_eq!(f.cpu.pc(), START + 4);

    let mut f = Fixture::new();
    f.cpu.set_key(Key::KeyE, true);
    f.program(&[0x650E, 0xE5A1]);
    f.cycles(2);
    assert_eq!(f.cpu.pc(), START + 4);
}

#[test]
fn load_from_delay_timer() {
    let mut f = Fixture::new();
    f.cpu.set_delay_timer(5);
    f.load(START, 0xF0, 0x07);
    f.cycles(1);
    assert_eq!(f.cpu.register(0), 0x05);
}

#[test]
fn key_wait_stalls_until_a_press() {
    let mut f = Fixture::new();
    f.program(&[0xF30A, 0x6001]);

    f.cycles(1);
    assert_eq!(f.cpu.pc(), START);
    assert_eq!(f.cpu.exec_state(), ExecState::WaitingForKey(Register::V3));

    // Stays parked for as long as nothing is pressed.
    f.cycles(10);
    assert_eq!(f.cpu.pc(), START);
    assert_eq!(f.cpu.register(0), 0);

    f.cpu.set_key(Key::KeyD, true);
    assert_eq!(f.cpu.pc(), START + 2);
    assert_eq!(f.cpu.register(3), 0xD);
    assert_eq!(f.cpu.exec_state(), ExecState::Running);

    f.cycles(1);
    assert_eq!(f.cpu.register(0), 1);
    assert_eq!(f.cpu.pc(), START + 4);
}

#[test]
fn set_delay_and_sound_timers() {
    let mut f = Fixture::new();
    f.program(&[0x60FF, 0xF015]);
    f.cycles(2);
    assert_eq!(f.cpu.delay_timer(), 0xFF);

    let mut f = Fixture::new();
    f.program(&[0x60FF, 0xF018]);
    f.cycles(2);
    assert_eq!(f.cpu.sound_timer(), 0xFF);
}

#[test]
fn add_register_to_i() {
    let mut f = Fixture::new();
    f.program(&[0xAABA, 0x6002, 0xF01E]);
    f.cycles(3);
    assert_eq!(f.cpu.i(), 0xABC);
}

#[test]
fn load_sprite_address() {
    let mut f = Fixture::new();
    f.program(&[0x600F, 0xF029]);
    f.cycles(2);
    assert_eq!(f.cpu.i(), 0x0F * 5);
}

#[test]
fn write_bcd() {
    let mut f = Fixture::new();
    f.program(&[0xA300, 0x6089, 0xF033]);
    f.cycles(3);
    assert_eq!(&f.cpu.memory()[0x300..0x303], &[1, 3, 7]);
    assert_eq!(f.cpu.i(), 0x300);

    let mut f = Fixture::new();
    f.program(&[0xA300, 0x6007, 0xF033]);
    f.cycles(3);
    assert_eq!(&f.cpu.memory()[0x300..0x303], &[0, 0, 7]);
}

#[test]
fn store_registers_into_memory() {
    let mut f = Fixture::new();
    f.program(&[0xAABA, 0x6032, 0x6114, 0xF155, 0x6000, 0x6100, 0xF165]);
    f.cycles(7);

    assert_eq!(f.cpu.register(0), 0x32);
    assert_eq!(f.cpu.register(1), 0x14);
    assert_eq!(f.cpu.i(), 0xABA);
}

#[test]
fn load_memory_into_registers() {
    let mut f = Fixture::new();
    f.program(&[0xAABA, 0xF165]);
    f.memory[0xABA] = 0x32;
    f.memory[0xABB] = 0x14;
    f.memory[0xABC] = 0x99;
    f.cpu.load_into_memory(&f.memory);

    f.cycles(2);
    assert_eq!(f.cpu.register(0), 0x32);
    assert_eq!(f.cpu.register(1), 0x14);
    assert_eq!(f.cpu.register(2), 0x00);
    assert_eq!(f.cpu.i(), 0xABA);
}

#[test]
fn load_into_memory_touches_nothing_else() {
    let mut f = Fixture::new();
    f.program(&[0x6042, 0xA123]);
    f.cycles(2);
    f.cpu.set_delay_timer(9);

    f.cpu.load_into_memory(&[0; MEM_SIZE]);
    assert_eq!(f.cpu.register(0), 0x42);
    assert_eq!(f.cpu.i(), 0x123);
    assert_eq!(f.cpu.pc(), START + 4);
    assert_eq!(f.cpu.delay_timer(), 9);
    assert!(f.cpu.memory().iter().all(|&b| b == 0));
}

#[test]
fn reset_reseeds_font_and_zeroes_state() {
    let mut f = Fixture::new();
    f.program(&[0x6042, 0x2300]);
    f.cycles(2);
    f.cpu.set_sound_timer(4);
    f.cpu.set_key(Key::Key1, true);

    f.cpu.reset();
    assert_eq!(f.cpu.pc(), START);
    assert_eq!(f.cpu.sp(), 0);
    assert_eq!(f.cpu.register(0), 0);
    assert_eq!(f.cpu.sound_timer(), 0);
    assert!(!f.cpu.is_key_pressed(Key::Key1));
    assert_eq!(&f.cpu.memory()[..FONT.len()], &FONT[..]);
    assert!(f.cpu.memory()[FONT.len()..].iter().all(|&b| b == 0));
}

#[test]
fn from_image_keeps_memory_verbatim() {
    let mut image = [0u8; MEM_SIZE];
    image[0x000] = 0xAB;
    image[0x200] = 0x60;
    image[0x201] = 0x42;
    image[0xFFF] = 0x7E;

    let mut cpu = Chip8::from_image(&image);
    cpu.cycle().unwrap();

    assert_eq!(cpu.pc(), START + 2);
    assert_eq!(cpu.register(0), 0x42);
    assert_ne!(cpu.memory()[0x000], FONT[0]);
    assert_eq!(&cpu.memory()[..], &image[..]);
}
