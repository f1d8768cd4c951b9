//! Opcode decoding.
//!
//! The top nibble picks an instruction group. Groups 0, 8 and E reuse that
//! nibble for unrelated operations and are split again on the low nibble; in
//! group F the low nibble splits first and the `Fx?5` family splits once more on
//! the third nibble.

use std::fmt;

/// A decoded 16-bit opcode. `x`/`y` are register indices, `nn` an immediate
/// byte, `nnn` a 12-bit address and `n` a 4-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 0nn0
    ClearScreen,
    /// 0nnE
    Return,
    /// 0nnn, any other low nibble
    Sys { nnn: u16 },
    /// 1nnn
    Jump { nnn: u16 },
    /// 2nnn
    Call { nnn: u16 },
    /// 3xnn
    SkipEqByte { x: usize, nn: u8 },
    /// 4xnn
    SkipNeqByte { x: usize, nn: u8 },
    /// 5xy?
    SkipEqReg { x: usize, y: usize },
    /// 6xnn
    LoadByte { x: usize, nn: u8 },
    /// 7xnn
    AddByte { x: usize, nn: u8 },
    /// 8xy0
    LoadReg { x: usize, y: usize },
    /// 8xy1
    Or { x: usize, y: usize },
    /// 8xy2
    And { x: usize, y: usize },
    /// 8xy3
    Xor { x: usize, y: usize },
    /// 8xy4
    AddReg { x: usize, y: usize },
    /// 8xy5
    SubReg { x: usize, y: usize },
    /// 8xy6
    ShiftRight { x: usize },
    /// 8xy7
    SubReversed { x: usize, y: usize },
    /// 8xyE
    ShiftLeft { x: usize },
    /// 9xy?
    SkipNeqReg { x: usize, y: usize },
    /// Annn
    LoadIndex { nnn: u16 },
    /// Bnnn
    JumpOffset { nnn: u16 },
    /// Cxnn
    Random { x: usize, nn: u8 },
    /// Dxyn
    Draw { x: usize, y: usize, n: u8 },
    /// Ex?E
    SkipKeyPressed { x: usize },
    /// Ex?1
    SkipKeyReleased { x: usize },
    /// Fx?7
    LoadDelay { x: usize },
    /// Fx?A
    WaitKey { x: usize },
    /// Fx15
    SetDelay { x: usize },
    /// Fx?8
    SetSound { x: usize },
    /// Fx?E
    AddIndex { x: usize },
    /// Fx?9
    FontSprite { x: usize },
    /// Fx?3
    StoreBcd { x: usize },
    /// Fx55
    StoreRegisters { x: usize },
    /// Fx65
    LoadRegisters { x: usize },
    Unknown(u16),
}

impl Instruction {
    pub fn decode(op_code: u16) -> Self {
        let x = ((op_code & 0x0F00) >> 8) as usize;
        let y = ((op_code & 0x00F0) >> 4) as usize;
        let n = (op_code & 0x000F) as u8;
        let nn = (op_code & 0x00FF) as u8;
        let nnn = op_code & 0x0FFF;

        match op_code >> 12 {
            0x0 => match n {
                0x0 => Self::ClearScreen,
                0xE => Self::Return,
                _ => Self::Sys { nnn },
            },
            0x1 => Self::Jump { nnn },
            0x2 => Self::Call { nnn },
            0x3 => Self::SkipEqByte { x, nn },
            0x4 => Self::SkipNeqByte { x, nn },
            0x5 => Self::SkipEqReg { x, y },
            0x6 => Self::LoadByte { x, nn },
            0x7 => Self::AddByte { x, nn },
            0x8 => match n {
                0x0 => Self::LoadReg { x, y },
                0x1 => Self::Or { x, y },
                0x2 => Self::And { x, y },
                0x3 => Self::Xor { x, y },
                0x4 => Self::AddReg { x, y },
                0x5 => Self::SubReg { x, y },
                0x6 => Self::ShiftRight { x },
                0x7 => Self::SubReversed { x, y },
                0xE => Self::ShiftLeft { x },
                _ => Self::Unknown(op_code),
            },
            0x9 => Self::SkipNeqReg { x, y },
            0xA => Self::LoadIndex { nnn },
            0xB => Self::JumpOffset { nnn },
            0xC => Self::Random { x, nn },
            0xD => Self::Draw { x, y, n },
            0xE => match n {
                0xE => Self::SkipKeyPressed { x },
                0x1 => Self::SkipKeyReleased { x },
                _ => Self::Unknown(op_code),
            },
            0xF => match n {
                0x3 => Self::StoreBcd { x },
                0x5 => match y {
                    0x1 => Self::SetDelay { x },
                    0x5 => Self::StoreRegisters { x },
                    0x6 => Self::LoadRegisters { x },
                    _ => Self::Unknown(op_code),
                },
                0x7 => Self::LoadDelay { x },
                0x8 => Self::SetSound { x },
                0x9 => Self::FontSprite { x },
                0xA => Self::WaitKey { x },
                0xE => Self::AddIndex { x },
                _ => Self::Unknown(op_code),
            },
            _ => Self::Unknown(op_code),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ClearScreen => write!(f, "CLS"),
            Self::Return => write!(f, "RET"),
            Self::Sys { nnn } => write!(f, "SYS {nnn:#05X}"),
            Self::Jump { nnn } => write!(f, "JP {nnn:#05X}"),
            Self::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Self::SkipEqByte { x, nn } => write!(f, "SE V{x:X}, {nn:#04X}"),
            Self::SkipNeqByte { x, nn } => write!(f, "SNE V{x:X}, {nn:#04X}"),
            Self::SkipEqReg { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Self::LoadByte { x, nn } => write!(f, "LD V{x:X}, {nn:#04X}"),
            Self::AddByte { x, nn } => write!(f, "ADD V{x:X}, {nn:#04X}"),
            Self::LoadReg { x, y } => write!(f, "LD V{x:X}, V{y:X}"),
            Self::Or { x, y } => write!(f, "OR V{x:X}, V{y:X}"),
            Self::And { x, y } => write!(f, "AND V{x:X}, V{y:X}"),
            Self::Xor { x, y } => write!(f, "XOR V{x:X}, V{y:X}"),
            Self::AddReg { x, y } => write!(f, "ADD V{x:X}, V{y:X}"),
            Self::SubReg { x, y } => write!(f, "SUB V{x:X}, V{y:X}"),
            Self::ShiftRight { x } => write!(f, "SHR V{x:X}"),
            Self::SubReversed { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            Self::ShiftLeft { x } => write!(f, "SHL V{x:X}"),
            Self::SkipNeqReg { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            Self::LoadIndex { nnn } => write!(f, "LD I, {nnn:#05X}"),
            Self::JumpOffset { nnn } => write!(f, "JP V0, {nnn:#05X}"),
            Self::Random { x, nn } => write!(f, "RND V{x:X}, {nn:#04X}"),
            Self::Draw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            Self::SkipKeyPressed { x } => write!(f, "SKP V{x:X}"),
            Self::SkipKeyReleased { x } => write!(f, "SKNP V{x:X}"),
            Self::LoadDelay { x } => write!(f, "LD V{x:X}, DT"),
            Self::WaitKey { x } => write!(f, "LD V{x:X}, K"),
            Self::SetDelay { x } => write!(f, "LD DT, V{x:X}"),
            Self::SetSound { x } => write!(f, "LD ST, V{x:X}"),
            Self::AddIndex { x } => write!(f, "ADD I, V{x:X}"),
            Self::FontSprite { x } => write!(f, "LD F, V{x:X}"),
            Self::StoreBcd { x } => write!(f, "LD B, V{x:X}"),
            Self::StoreRegisters { x } => write!(f, "LD [I], V{x:X}"),
            Self::LoadRegisters { x } => write!(f, "LD V{x:X}, [I]"),
            Self::Unknown(op_code) => write!(f, "??? {op_code:#06X}"),
        }
    }
}
