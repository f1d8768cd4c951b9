use std::path::Path;

use log::{
    debug,
    error,
    trace,
};

use crate::{
    constants,
    display::{
        FrameBuffer,
        SpriteEdge,
    },
    instruction::Instruction,
    mem::{
        AddressStack,
        KeyPad,
        Ram,
        Registers,
        Rom,
        RomError,
    },
    process::{
        self,
        DrawTarget,
        Flow,
        VmError,
    },
};

/// Behaviors where interpreters for this instruction set disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    pub sprite_edge: SpriteEdge,
}

/// Latched lifecycle code. The numeric values are what the diagnostic dump prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorCode {
    None,
    StackOverflow,
    StackUnderflow,
    UnknownInstruction,
    #[default]
    NoRomLoaded,
    AddressOutOfBounds,
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::StackOverflow => 1,
            ErrorCode::StackUnderflow => 2,
            ErrorCode::UnknownInstruction => 3,
            ErrorCode::NoRomLoaded => 4,
            ErrorCode::AddressOutOfBounds => 5,
        }
    }
}

impl From<&VmError> for ErrorCode {
    fn from(value: &VmError) -> Self {
        match value {
            VmError::UnknownInstruction(_) => ErrorCode::UnknownInstruction,
            VmError::StackOverflow => ErrorCode::StackOverflow,
            VmError::StackUnderflow => ErrorCode::StackUnderflow,
            VmError::AddressOutOfBounds(_) => ErrorCode::AddressOutOfBounds,
        }
    }
}

/// The whole machine. The caller drives it: [`Emulator::update_keys`] with the
/// current key mask, [`Emulator::step`] at the instruction rate and
/// [`Emulator::tick_timers`] at 60 Hz.
#[derive(Clone)]
pub struct Emulator {
    quirks: Quirks,
    memory: Ram,
    pc: u16,
    stack: AddressStack,
    registers: Registers,
    index_register: u16,
    delay_timer: u8,
    sound_timer: u8,
    keypad: KeyPad,
    frame: FrameBuffer,
    draw_flag: bool,
    opcode: u16,
    running: bool,
    error: ErrorCode,
    waiting_for_key: Option<usize>,
}

impl Emulator {
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        Self {
            quirks,
            memory: Ram::new(),
            pc: constants::MEMORY_OFFSET as u16,
            stack: AddressStack::default(),
            registers: Registers::default(),
            index_register: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: KeyPad::default(),
            frame: FrameBuffer::new(),
            draw_flag: false,
            opcode: 0,
            running: false,
            error: ErrorCode::NoRomLoaded,
            waiting_for_key: None,
        }
    }

    /// Resets to the power-on state: font installed, PC at 0x200, no program.
    pub fn initialize(&mut self) {
        *self = Self::with_quirks(self.quirks);
    }

    /// Loads a program image from memory. Rejected images leave the VM untouched.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), RomError> {
        let rom = Rom::from_bytes(bytes)?;
        self.load_rom(&rom);
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RomError> {
        let rom = Rom::load(path)?;
        self.load_rom(&rom);
        Ok(())
    }

    pub fn load_rom(&mut self, rom: &Rom) {
        self.initialize();
        self.memory = Ram::load(rom);
        self.running = true;
        self.error = ErrorCode::None;
        debug!("loaded {} byte program at {:#05X}", rom.len(), constants::MEMORY_OFFSET);
    }

    /// Executes one instruction.
    ///
    /// Does nothing while halted or waiting for a key. A fatal condition is
    /// latched into [`Emulator::error`], stops the VM and is returned once;
    /// later calls are no-ops until the next load.
    pub fn step(&mut self) -> Result<(), VmError> {
        if !self.running || self.waiting_for_key.is_some() {
            return Ok(());
        }

        let result = self.cycle();
        if let Err(err) = &result {
            error!("halting at {:#05X}: {}", self.pc, err);
            self.error = ErrorCode::from(err);
            self.running = false;
        }
        result
    }

    fn cycle(&mut self) -> Result<(), VmError> {
        let op_code = self.memory.op_code(self.pc as usize)?;
        self.opcode = op_code;

        let instruction = Instruction::decode(op_code);
        trace!("{:#05X}: {:04X}  {}", self.pc, op_code, instruction);

        if let Flow::Next = self.execute(instruction)? {
            self.pc += 2;
        }
        Ok(())
    }

    fn execute(&mut self, instruction: Instruction) -> process::Outcome {
        match instruction {
            Instruction::ClearScreen => process::op_00E0(&mut self.frame, &mut self.draw_flag),
            Instruction::Return => process::op_00EE(&mut self.pc, &mut self.stack),
            Instruction::Sys { nnn } => process::op_0NNN(nnn),
            Instruction::Jump { nnn } => process::op_1NNN(&mut self.pc, nnn),
            Instruction::Call { nnn } => process::op_2NNN(&mut self.stack, &mut self.pc, nnn),
            Instruction::SkipEqByte { x, nn } => process::op_3XNN(&self.registers, x, nn, &mut self.pc),
            Instruction::SkipNeqByte { x, nn } => process::op_4XNN(&self.registers, x, nn, &mut self.pc),
            Instruction::SkipEqReg { x, y } => process::op_5XY0(&self.registers, x, y, &mut self.pc),
            Instruction::LoadByte { x, nn } => process::op_6XNN(&mut self.registers, x, nn),
            Instruction::AddByte { x, nn } => process::op_7XNN(&mut self.registers, x, nn),
            Instruction::LoadReg { x, y } => process::op_8XY0(&mut self.registers, x, y),
            Instruction::Or { x, y } => process::op_8XY1(&mut self.registers, x, y),
            Instruction::And { x, y } => process::op_8XY2(&mut self.registers, x, y),
            Instruction::Xor { x, y } => process::op_8XY3(&mut self.registers, x, y),
            Instruction::AddReg { x, y } => process::op_8XY4(&mut self.registers, x, y),
            Instruction::SubReg { x, y } => process::op_8XY5(&mut self.registers, x, y),
            Instruction::ShiftRight { x } => process::op_8XY6(&mut self.registers, x),
            Instruction::SubReversed { x, y } => process::op_8XY7(&mut self.registers, x, y),
            Instruction::ShiftLeft { x } => process::op_8XYE(&mut self.registers, x),
            Instruction::SkipNeqReg { x, y } => process::op_9XY0(&self.registers, x, y, &mut self.pc),
            Instruction::LoadIndex { nnn } => process::op_ANNN(&mut self.index_register, nnn),
            Instruction::JumpOffset { nnn } => process::op_BNNN(&self.registers, &mut self.pc, nnn),
            Instruction::Random { x, nn } => process::op_CXNN(&mut self.registers, x, nn),
            Instruction::Draw { x, y, n } => process::op_DXYN(
                &self.memory,
                &mut self.registers,
                self.index_register,
                DrawTarget {
                    frame: &mut self.frame,
                    draw_flag: &mut self.draw_flag,
                    edge: self.quirks.sprite_edge,
                },
                (x, y, n),
            ),
            Instruction::SkipKeyPressed { x } => process::op_EX9E(&self.registers, x, &self.keypad, &mut self.pc),
            Instruction::SkipKeyReleased { x } => process::op_EXA1(&self.registers, x, &self.keypad, &mut self.pc),
            Instruction::LoadDelay { x } => process::op_FX07(&mut self.registers, x, self.delay_timer),
            Instruction::WaitKey { x } => {
                debug!("waiting for a key press into V{:X}", x);
                process::op_FX0A(x, &mut self.waiting_for_key)
            }
            Instruction::SetDelay { x } => process::op_FX15(&self.registers, x, &mut self.delay_timer),
            Instruction::SetSound { x } => process::op_FX18(&self.registers, x, &mut self.sound_timer),
            Instruction::AddIndex { x } => process::op_FX1E(&mut self.registers, x, &mut self.index_register),
            Instruction::FontSprite { x } => process::op_FX29(&self.registers, x, &mut self.index_register),
            Instruction::StoreBcd { x } => {
                process::op_FX33(&self.registers, x, &mut self.memory, self.index_register)
            }
            Instruction::StoreRegisters { x } => {
                process::op_FX55(&self.registers, x, &mut self.memory, &mut self.index_register)
            }
            Instruction::LoadRegisters { x } => {
                process::op_FX65(&mut self.registers, x, &self.memory, &mut self.index_register)
            }
            Instruction::Unknown(op_code) => process::op_unknown(op_code),
        }
    }

    /// One 60 Hz tick: both timers count down toward zero and stay there.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Latches all 16 keys from `mask` (bit k is key k) and resolves a pending
    /// key wait with the lowest key that is down.
    pub fn update_keys(&mut self, mask: u16) {
        let first_down = self.keypad.update(mask);

        if let (Some(x), Some(key)) = (self.waiting_for_key, first_down) {
            debug!("key {:X} resolves wait into V{:X}", key, x);
            self.registers.set(x, key);
            self.waiting_for_key = None;
        }
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Set by clear-screen and draw. Stays set until the renderer clears it.
    pub fn draw_flag(&self) -> bool {
        self.draw_flag
    }

    pub fn clear_draw_flag(&mut self) {
        self.draw_flag = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_waiting_for_key(&self) -> bool {
        self.waiting_for_key.is_some()
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn index(&self) -> u16 {
        self.index_register
    }

    pub fn register(&self, x: usize) -> u8 {
        self.registers.get(x)
    }

    pub fn registers(&self) -> &[u8] {
        self.registers.as_slice()
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.pointer()
    }

    pub fn stack(&self) -> &[u16] {
        self.stack.slots()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn keys(&self) -> &[bool] {
        self.keypad.as_slice()
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_bytes()
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::FONT;

    fn emulator_with(program: &[u8]) -> Emulator {
        let mut emulator = Emulator::new();
        emulator.load(program).unwrap();
        emulator
    }

    #[test]
    fn new_vm_is_idle_with_font() {
        let mut emulator = Emulator::new();
        assert!(!emulator.is_running());
        assert_eq!(emulator.error(), ErrorCode::NoRomLoaded);
        assert_eq!(emulator.pc(), 0x200);
        assert_eq!(&emulator.memory()[..FONT.len()], &FONT[..]);
        assert_eq!(emulator.step(), Ok(()));
        assert_eq!(emulator.pc(), 0x200);
    }

    #[test]
    fn rejected_load_keeps_prior_state() {
        let mut emulator = emulator_with(&[0x60, 0x2A]);
        emulator.step().unwrap();

        assert!(matches!(emulator.load(&[]), Err(RomError::Empty)));
        assert!(emulator.load(&[0; constants::AVAILABLE_RAM + 1]).is_err());
        assert!(emulator.load_file("no/such/rom.ch8").is_err());

        assert_eq!(emulator.register(0), 0x2A);
        assert_eq!(emulator.pc(), 0x202);
        assert!(emulator.is_running());
    }

    #[test]
    fn reload_resets_everything_but_quirks() {
        let quirks = Quirks {
            sprite_edge: SpriteEdge::Wrap,
        };
        let mut emulator = Emulator::with_quirks(quirks);
        emulator.load(&[0x60, 0x05, 0xF0, 0x15]).unwrap();
        emulator.step().unwrap();
        emulator.step().unwrap();
        emulator.update_keys(0xFFFF);
        assert_eq!(emulator.delay_timer(), 5);

        emulator.load(&[0x00, 0xE0]).unwrap();
        assert_eq!(emulator.register(0), 0);
        assert_eq!(emulator.delay_timer(), 0);
        assert!(emulator.keys().iter().all(|k| !k));
        assert_eq!(emulator.quirks(), quirks);
        assert_eq!(emulator.error(), ErrorCode::None);
    }

    #[test]
    fn unknown_instruction_halts_without_advancing() {
        let mut emulator = emulator_with(&[0xFF, 0xFF]);
        assert_eq!(emulator.step(), Err(VmError::UnknownInstruction(0xFFFF)));
        assert!(!emulator.is_running());
        assert_eq!(emulator.error(), ErrorCode::UnknownInstruction);
        assert_eq!(emulator.pc(), 0x200);

        assert_eq!(emulator.step(), Ok(()));
        assert_eq!(emulator.pc(), 0x200);
    }

    #[test]
    fn skips_jump_two_extra_bytes() {
        // V0 = 7; SE V0, 7; (skipped) LD V1, 1; LD V2, 2
        let mut emulator = emulator_with(&[0x60, 0x07, 0x30, 0x07, 0x61, 0x01, 0x62, 0x02]);
        emulator.step().unwrap();
        emulator.step().unwrap();
        assert_eq!(emulator.pc(), 0x206);
        emulator.step().unwrap();
        assert_eq!(emulator.register(1), 0);
        assert_eq!(emulator.register(2), 2);
    }

    #[test]
    fn return_resumes_after_call() {
        // CALL 0x206; LD V1, 1; (pad); RET
        let mut emulator = emulator_with(&[0x22, 0x06, 0x61, 0x01, 0x00, 0x00, 0x00, 0xEE]);
        emulator.step().unwrap();
        assert_eq!(emulator.pc(), 0x206);
        assert_eq!(emulator.stack_pointer(), 1);
        emulator.step().unwrap();
        assert_eq!(emulator.pc(), 0x202);
        assert_eq!(emulator.stack_pointer(), 0);
        emulator.step().unwrap();
        assert_eq!(emulator.register(1), 1);
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut emulator = emulator_with(&[0x00, 0xEE]);
        assert_eq!(emulator.step(), Err(VmError::StackUnderflow));
        assert_eq!(emulator.error(), ErrorCode::StackUnderflow);
        assert!(!emulator.is_running());
    }

    #[test]
    fn fetch_past_end_of_memory_is_fatal() {
        // JP 0xFFF
        let mut emulator = emulator_with(&[0x1F, 0xFF]);
        emulator.step().unwrap();
        assert_eq!(emulator.pc(), 0xFFF);
        assert_eq!(emulator.step(), Err(VmError::AddressOutOfBounds(0x1000)));
        assert_eq!(emulator.error(), ErrorCode::AddressOutOfBounds);
    }

    #[test]
    fn draw_and_clear_raise_draw_flag() {
        // LD F, V0; DRW V0, V0, 5; CLS
        let mut emulator = emulator_with(&[0xF0, 0x29, 0xD0, 0x05, 0x00, 0xE0]);
        emulator.step().unwrap();
        assert!(!emulator.draw_flag());
        emulator.step().unwrap();
        assert!(emulator.draw_flag());
        assert!(emulator.frame_buffer().pixel(0, 0));
        assert!(emulator.frame_buffer().pixel(0, 1));
        assert!(!emulator.frame_buffer().pixel(1, 1));

        emulator.clear_draw_flag();
        emulator.step().unwrap();
        assert!(emulator.draw_flag());
        assert!(emulator.frame_buffer().as_slice().iter().all(|p| !p));
    }

    #[test]
    fn draw_reading_past_memory_is_fatal() {
        // LD I, 0xFFE; DRW V0, V0, 4
        let mut emulator = emulator_with(&[0xAF, 0xFE, 0xD0, 0x04]);
        emulator.step().unwrap();
        assert_eq!(emulator.step(), Err(VmError::AddressOutOfBounds(0x1000)));
        assert!(!emulator.is_running());
    }

    #[test]
    fn clipped_rows_are_not_read() {
        // LD V0, 0xF0; LD I, 0xFFE; LD [I], V0; LD I, 0xFFE; LD V0, 0; LD V1, 31; DRW V0, V1, 4
        let program = [
            0x60, 0xF0, 0xAF, 0xFE, 0xF0, 0x55, 0xAF, 0xFE, 0x60, 0x00, 0x61, 0x1F, 0xD0, 0x14,
        ];
        let mut emulator = emulator_with(&program);
        for _ in 0..7 {
            emulator.step().unwrap();
        }
        assert!(emulator.is_running());
        assert_eq!(emulator.error(), ErrorCode::None);
        assert_eq!(emulator.pc(), 0x20E);
        assert!(emulator.draw_flag());
        assert_eq!(emulator.register(0xF), 0);
        assert!(emulator.frame_buffer().pixel(0, 31));
        assert!(emulator.frame_buffer().pixel(3, 31));
        assert!(!emulator.frame_buffer().pixel(4, 31));
    }

    #[test]
    fn wrapped_rows_past_memory_are_fatal() {
        let quirks = Quirks {
            sprite_edge: SpriteEdge::Wrap,
        };
        let mut emulator = Emulator::with_quirks(quirks);
        emulator.load(&[0xAF, 0xFE, 0x60, 0x00, 0x61, 0x1F, 0xD0, 0x14]).unwrap();
        for _ in 0..3 {
            emulator.step().unwrap();
        }
        assert_eq!(emulator.step(), Err(VmError::AddressOutOfBounds(0x1000)));
        assert_eq!(emulator.error(), ErrorCode::AddressOutOfBounds);
    }

    #[test]
    fn key_skips_consult_keypad() {
        // LD V0, 3; SKP V0; LD V1, 1; SKNP V0; LD V2, 2
        let program = [0x60, 0x03, 0xE0, 0x9E, 0x61, 0x01, 0xE0, 0xA1, 0x62, 0x02];
        let mut emulator = emulator_with(&program);
        emulator.update_keys(1 << 3);
        for _ in 0..5 {
            emulator.step().unwrap();
        }
        assert_eq!(emulator.register(1), 0);
        assert_eq!(emulator.register(2), 2);
    }

    #[test]
    fn key_wait_resolves_with_lowest_key() {
        // LD V5, K; LD V6, 1
        let mut emulator = emulator_with(&[0xF5, 0x0A, 0x66, 0x01]);
        emulator.step().unwrap();
        assert!(emulator.is_waiting_for_key());
        assert_eq!(emulator.pc(), 0x202);

        emulator.update_keys(0);
        emulator.step().unwrap();
        assert!(emulator.is_waiting_for_key());
        assert_eq!(emulator.register(6), 0);

        emulator.update_keys((1 << 9) | (1 << 4));
        assert!(!emulator.is_waiting_for_key());
        assert_eq!(emulator.register(5), 4);
        emulator.step().unwrap();
        assert_eq!(emulator.register(6), 1);
    }

    #[test]
    fn timers_are_driven_externally() {
        // LD V0, 2; LD DT, V0; LD ST, V0; LD V1, DT
        let mut emulator = emulator_with(&[0x60, 0x02, 0xF0, 0x15, 0xF0, 0x18, 0xF1, 0x07]);
        for _ in 0..3 {
            emulator.step().unwrap();
        }
        emulator.tick_timers();
        emulator.step().unwrap();
        assert_eq!(emulator.register(1), 1);
        assert_eq!(emulator.sound_timer(), 1);

        emulator.tick_timers();
        emulator.tick_timers();
        assert_eq!(emulator.delay_timer(), 0);
        assert_eq!(emulator.sound_timer(), 0);
    }

    #[test]
    fn sys_is_a_no_op() {
        let mut emulator = emulator_with(&[0x01, 0x23, 0x60, 0x01]);
        emulator.step().unwrap();
        assert_eq!(emulator.pc(), 0x202);
        assert!(emulator.is_running());
    }
}
