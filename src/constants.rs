pub const TOTAL_RAM: usize = 0x1000;
pub const MEMORY_OFFSET: usize = 0x200;
pub const AVAILABLE_RAM: usize = TOTAL_RAM - MEMORY_OFFSET;
pub const FONT_GLYPH_SIZE: usize = 5;

pub const STACK_SIZE: usize = 16;
pub const REGISTER_COUNT: usize = 16;
pub const KEY_COUNT: usize = 16;
pub const FLAG_REGISTER: usize = 0xF;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

pub const INSTRUCTIONS_PER_SECOND: u32 = 600;
pub const TIMER_HZ: u32 = 60;
