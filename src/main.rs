use std::path::PathBuf;

use anyhow::{
    ensure,
    Result,
};
use chip8vm::{
    constants,
    Config,
    Quirks,
    SpriteEdge,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Interpreter for 8-bit CHIP-8 programs")]
struct Args {
    /// Path to a raw program image
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = constants::INSTRUCTIONS_PER_SECOND)]
    clock_speed: u32,

    /// Size of one screen pixel in window pixels
    #[arg(long, default_value_t = 10)]
    pixel_size: i32,

    /// Wrap sprites around the screen edges instead of clipping them
    #[arg(long)]
    wrap_sprites: bool,

    /// Write a VM dump here when the program halts or the window closes
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    ensure!(args.clock_speed > 0, "clock speed must be positive");
    ensure!(args.pixel_size > 0, "pixel size must be positive");

    let sprite_edge = if args.wrap_sprites {
        SpriteEdge::Wrap
    } else {
        SpriteEdge::Clip
    };

    chip8vm::run(Config {
        rom: args.rom,
        clock_speed: args.clock_speed,
        pixel_size: args.pixel_size,
        quirks: Quirks { sprite_edge },
        dump: args.dump,
    })
}
