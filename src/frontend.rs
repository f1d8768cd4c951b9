use std::{
    fs,
    path::PathBuf,
    time::Duration,
};

use log::{
    error,
    info,
    warn,
};
use macroquad::{
    color::{
        self,
        Color,
    },
    input::{
        is_key_down,
        is_key_pressed,
        KeyCode,
    },
    shapes::draw_rectangle,
    time::get_frame_time,
    window::{
        clear_background,
        next_frame,
        Conf,
    },
};

use crate::{
    clock::Pacer,
    constants,
    emulator::Emulator,
};

// Longest frame credited to the pacer.
const MAX_FRAME: Duration = Duration::from_millis(100);

const LIT: Color = Color {
    r: 0.0,
    g: 0.5,
    b: 0.0,
    a: 1.0,
};

// 1 2 3 C / 4 5 6 D / 7 8 9 E / A 0 B F on the left hand side of a QWERTY keyboard
const KEY_MAP: [(KeyCode, u8); constants::KEY_COUNT] = [
    (KeyCode::X, 0x0),
    (KeyCode::Key1, 0x1),
    (KeyCode::Key2, 0x2),
    (KeyCode::Key3, 0x3),
    (KeyCode::Q, 0x4),
    (KeyCode::W, 0x5),
    (KeyCode::E, 0x6),
    (KeyCode::A, 0x7),
    (KeyCode::S, 0x8),
    (KeyCode::D, 0x9),
    (KeyCode::Z, 0xA),
    (KeyCode::C, 0xB),
    (KeyCode::Key4, 0xC),
    (KeyCode::R, 0xD),
    (KeyCode::F, 0xE),
    (KeyCode::V, 0xF),
];

pub struct Frontend {
    pub emulator: Emulator,
    pub pacer: Pacer,
    pub pixel_size: i32,
    pub dump: Option<PathBuf>,
}

pub fn window_conf(pixel_size: i32) -> Conf {
    Conf {
        window_title: "chip8vm".to_owned(),
        window_width: constants::SCREEN_WIDTH as i32 * pixel_size,
        window_height: constants::SCREEN_HEIGHT as i32 * pixel_size,
        ..Default::default()
    }
}

fn frame_elapsed(seconds: f32) -> Duration {
    Duration::from_secs_f32(seconds.max(0.0)).min(MAX_FRAME)
}

fn sample_keys() -> u16 {
    KEY_MAP
        .iter()
        .filter(|(code, _)| is_key_down(*code))
        .fold(0u16, |mask, (_, key)| mask | (1 << *key))
}

fn render(emulator: &mut Emulator, pixel_size: i32) {
    clear_background(color::BLACK);
    let size = pixel_size as f32;
    for (y, row) in emulator.frame_buffer().rows().enumerate() {
        for (x, _) in row.iter().enumerate().filter(|(_, lit)| **lit) {
            draw_rectangle(x as f32 * size, y as f32 * size, size, size, LIT);
        }
    }
    emulator.clear_draw_flag();
}

fn write_dump(emulator: &Emulator, path: &Option<PathBuf>) {
    let Some(path) = path else {
        return;
    };
    match fs::write(path, emulator.dump().to_string()) {
        Ok(()) => info!("wrote vm dump to {}", path.display()),
        Err(err) => error!("failed writing vm dump to {}: {}", path.display(), err),
    }
}

impl Frontend {
    /// Runs until Escape is pressed. Keys are sampled once per frame, then the
    /// frame's share of instructions and timer ticks is executed.
    pub async fn run(mut self) {
        let mut halted = false;

        loop {
            if is_key_pressed(KeyCode::Escape) {
                break;
            }

            let budget = self.pacer.advance(frame_elapsed(get_frame_time()));

            self.emulator.update_keys(sample_keys());
            for _ in 0..budget.steps {
                if self.emulator.step().is_err() {
                    break;
                }
            }
            for _ in 0..budget.ticks {
                self.emulator.tick_timers();
            }

            if !halted && !self.emulator.is_running() {
                halted = true;
                warn!("vm halted with {:?}", self.emulator.error());
                write_dump(&self.emulator, &self.dump);
            }

            render(&mut self.emulator, self.pixel_size);
            next_frame().await;
        }

        write_dump(&self.emulator, &self.dump);
    }
}
