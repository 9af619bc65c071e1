use bitvec::{BitArr, array::BitArray, slice::BitSlice};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const FONT_HEIGHT: usize = 5;

/// Hex digit glyphs 0-F, five rows each, stored back to back.
pub const FONT: [u8; 16 * FONT_HEIGHT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Monochrome 64x32 frame buffer, one bit per pixel, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    pixels: BitArr!(for DISPLAY_WIDTH * DISPLAY_HEIGHT),
}

impl DisplayBuffer {
    pub fn new() -> Self {
        DisplayBuffer {
            pixels: BitArray::ZERO,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + x % DISPLAY_WIDTH]
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.not_any()
    }

    pub fn as_bits(&self) -> &BitSlice<usize> {
        &self.pixels[..DISPLAY_WIDTH * DISPLAY_HEIGHT]
    }

    pub fn rows(&self) -> impl Iterator<Item = &BitSlice<usize>> {
        self.as_bits().chunks_exact(DISPLAY_WIDTH)
    }

    /// XORs `sprite` onto the screen with its top-left corner at (`x`, `y`).
    ///
    /// The origin is wrapped onto the screen first and every lit sprite pixel
    /// wraps on its own, so a sprite hanging off an edge reappears on the
    /// opposite side. Returns true if any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let origin_x = x % DISPLAY_WIDTH;
        let origin_y = y % DISPLAY_HEIGHT;
        let mut collision = false;

        for (row, &byte) in sprite.iter().enumerate() {
            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let pixel_x = (origin_x + bit) % DISPLAY_WIDTH;
                let pixel_y = (origin_y + row) % DISPLAY_HEIGHT;
                let index = pixel_y * DISPLAY_WIDTH + pixel_x;

                let current_pixel = self.pixels[index];
                if current_pixel {
                    collision = true;
                }
                self.pixels.set(index, !current_pixel);
            }
        }
        collision
    }
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}
