use std::path::PathBuf;

use anyhow::{
    Context,
    Error,
};
use log::info;

pub mod clock;
pub mod constants;
pub mod display;
pub mod dump;
pub mod emulator;
pub mod frontend;
pub mod instruction;
pub mod mem;
pub mod process;

pub use display::SpriteEdge;
pub use emulator::{
    Emulator,
    ErrorCode,
    Quirks,
};
pub use mem::RomError;
pub use process::VmError;

#[derive(Debug, Clone)]
pub struct Config {
    pub rom: PathBuf,
    pub clock_speed: u32,
    pub pixel_size: i32,
    pub quirks: Quirks,
    pub dump: Option<PathBuf>,
}

/// Loads the ROM and hands the VM to the window loop. Returns once the window closes.
pub fn run(config: Config) -> Result<(), Error> {
    let mut emulator = Emulator::with_quirks(config.quirks);
    emulator
        .load_file(&config.rom)
        .with_context(|| format!("cannot load {}", config.rom.display()))?;
    info!(
        "running {} at {} instructions/s ({:?} sprite edges)",
        config.rom.display(),
        config.clock_speed,
        config.quirks.sprite_edge
    );

    let frontend = frontend::Frontend {
        emulator,
        pacer: clock::Pacer::new(config.clock_speed),
        pixel_size: config.pixel_size,
        dump: config.dump,
    };
    macroquad::Window::from_config(frontend::window_conf(config.pixel_size), frontend.run());

    Ok(())
}
