use crate::constants::{
    SCREEN_HEIGHT,
    SCREEN_SIZE,
    SCREEN_WIDTH,
};

/// What happens to sprite pixels that land past the right or bottom edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpriteEdge {
    /// Drop the pixels.
    #[default]
    Clip,
    /// Continue on the opposite edge.
    Wrap,
}

impl SpriteEdge {
    /// How many of `height` sprite rows starting at row `y` reach the screen.
    /// Rows that are never drawn are never read from memory.
    pub fn visible_rows(self, y: u8, height: usize) -> usize {
        match self {
            SpriteEdge::Clip => height.min(SCREEN_HEIGHT.saturating_sub(y as usize)),
            SpriteEdge::Wrap => height,
        }
    }
}

/// 64x32 monochrome screen, one `bool` per pixel, row major.
#[derive(Clone)]
pub struct FrameBuffer {
    pixels: [bool; SCREEN_SIZE],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [false; SCREEN_SIZE],
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < SCREEN_WIDTH && y < SCREEN_HEIGHT && self.pixels[y * SCREEN_WIDTH + x]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(SCREEN_WIDTH)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.pixels
    }

    /// XORs `sprite` rows onto the screen with the top left corner at (`x`, `y`).
    ///
    /// Each byte is one row, most significant bit leftmost. Returns `true` when
    /// any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8], edge: SpriteEdge) -> bool {
        let (x, y) = match edge {
            SpriteEdge::Clip => (x as usize, y as usize),
            SpriteEdge::Wrap => (x as usize % SCREEN_WIDTH, y as usize % SCREEN_HEIGHT),
        };

        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            let Some(py) = place(y + row, SCREEN_HEIGHT, edge) else {
                break;
            };

            for col in 0..8 {
                if byte & (0x80 >> col) == 0 {
                    continue;
                }
                let Some(px) = place(x + col, SCREEN_WIDTH, edge) else {
                    break;
                };

                let pixel = &mut self.pixels[py * SCREEN_WIDTH + px];
                collision |= *pixel;
                *pixel ^= true;
            }
        }
        collision
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn place(pos: usize, limit: usize, edge: SpriteEdge) -> Option<usize> {
    match edge {
        SpriteEdge::Clip => (pos < limit).then_some(pos),
        SpriteEdge::Wrap => Some(pos % limit),
    }
}
