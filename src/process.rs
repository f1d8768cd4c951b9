#![allow(non_snake_case)]
use log::warn;
use thiserror::Error;

use crate::{
    constants,
    display::{
        FrameBuffer,
        SpriteEdge,
    },
    mem::{
        AddressStack,
        KeyPad,
        Ram,
        RamError,
        Registers,
        StackError,
    },
};

/// Fatal run-time conditions. Any of these halts the VM until the next load.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VmError {
    #[error("unknown instruction {0:#06X}")]
    UnknownInstruction(u16),

    #[error("call stack overflow")]
    StackOverflow,

    #[error("return with empty call stack")]
    StackUnderflow,

    #[error("address {0:#X} out of bounds")]
    AddressOutOfBounds(usize),
}

impl From<RamError> for VmError {
    fn from(value: RamError) -> Self {
        match value {
            RamError::InvalidAddress(addr) => VmError::AddressOutOfBounds(addr),
        }
    }
}

impl From<StackError> for VmError {
    fn from(value: StackError) -> Self {
        match value {
            StackError::Overflow => VmError::StackOverflow,
            StackError::Underflow => VmError::StackUnderflow,
        }
    }
}

/// What the cycle does with the program counter after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Advance past the instruction.
    Next,
    /// The handler already placed the program counter.
    Jump,
}

pub type Outcome = Result<Flow, VmError>;

fn checked_target(addr: usize) -> Result<u16, VmError> {
    if addr >= constants::TOTAL_RAM {
        return Err(VmError::AddressOutOfBounds(addr));
    }
    Ok(addr as u16)
}

fn skip_if(condition: bool, pc: &mut u16) -> Outcome {
    if condition {
        *pc += 2;
    }
    Ok(Flow::Next)
}

pub fn op_00E0(frame: &mut FrameBuffer, draw_flag: &mut bool) -> Outcome {
    frame.clear();
    *draw_flag = true;
    Ok(Flow::Next)
}

/// Resumes at the saved call site; the auto-advance then steps past the call.
pub fn op_00EE(pc: &mut u16, stack: &mut AddressStack) -> Outcome {
    *pc = stack.pop()?;
    Ok(Flow::Next)
}

pub fn op_0NNN(nnn: u16) -> Outcome {
    warn!("ignoring machine code routine call {:#05X}", nnn);
    Ok(Flow::Next)
}

pub fn op_1NNN(pc: &mut u16, nnn: u16) -> Outcome {
    *pc = checked_target(nnn as usize)?;
    Ok(Flow::Jump)
}

pub fn op_2NNN(stack: &mut AddressStack, pc: &mut u16, nnn: u16) -> Outcome {
    let target = checked_target(nnn as usize)?;
    stack.push(*pc)?;
    *pc = target;
    Ok(Flow::Jump)
}

pub fn op_3XNN(registers: &Registers, x: usize, nn: u8, pc: &mut u16) -> Outcome {
    skip_if(registers.get(x) == nn, pc)
}

pub fn op_4XNN(registers: &Registers, x: usize, nn: u8, pc: &mut u16) -> Outcome {
    skip_if(registers.get(x) != nn, pc)
}

pub fn op_5XY0(registers: &Registers, x: usize, y: usize, pc: &mut u16) -> Outcome {
    skip_if(registers.get(x) == registers.get(y), pc)
}

pub fn op_6XNN(registers: &mut Registers, x: usize, nn: u8) -> Outcome {
    registers.set(x, nn);
    Ok(Flow::Next)
}

pub fn op_7XNN(registers: &mut Registers, x: usize, nn: u8) -> Outcome {
    registers.set(x, registers.get(x).wrapping_add(nn));
    Ok(Flow::Next)
}

pub fn op_8XY0(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    registers.set(x, registers.get(y));
    Ok(Flow::Next)
}

pub fn op_8XY1(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    registers.set(x, registers.get(x) | registers.get(y));
    Ok(Flow::Next)
}

pub fn op_8XY2(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    registers.set(x, registers.get(x) & registers.get(y));
    Ok(Flow::Next)
}

pub fn op_8XY3(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    registers.set(x, registers.get(x) ^ registers.get(y));
    Ok(Flow::Next)
}

pub fn op_8XY4(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    let (val, carry) = registers.get(x).overflowing_add(registers.get(y));
    registers.set(x, val);
    registers.set_flag(carry);
    Ok(Flow::Next)
}

/// VF = 1 when no borrow was needed (Vx >= Vy).
pub fn op_8XY5(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    let (val, borrow) = registers.get(x).overflowing_sub(registers.get(y));
    registers.set(x, val);
    registers.set_flag(!borrow);
    Ok(Flow::Next)
}

pub fn op_8XY6(registers: &mut Registers, x: usize) -> Outcome {
    let vx = registers.get(x);
    registers.set(x, vx >> 1);
    registers.set_flag(vx & 0x01 != 0);
    Ok(Flow::Next)
}

/// VF = 1 when no borrow was needed (Vy >= Vx).
pub fn op_8XY7(registers: &mut Registers, x: usize, y: usize) -> Outcome {
    let (val, borrow) = registers.get(y).overflowing_sub(registers.get(x));
    registers.set(x, val);
    registers.set_flag(!borrow);
    Ok(Flow::Next)
}

pub fn op_8XYE(registers: &mut Registers, x: usize) -> Outcome {
    let vx = registers.get(x);
    registers.set(x, vx << 1);
    registers.set_flag(vx & 0x80 != 0);
    Ok(Flow::Next)
}

pub fn op_9XY0(registers: &Registers, x: usize, y: usize, pc: &mut u16) -> Outcome {
    skip_if(registers.get(x) != registers.get(y), pc)
}

pub fn op_ANNN(index_register: &mut u16, nnn: u16) -> Outcome {
    *index_register = checked_target(nnn as usize)?;
    Ok(Flow::Next)
}

pub fn op_BNNN(registers: &Registers, pc: &mut u16, nnn: u16) -> Outcome {
    *pc = checked_target(nnn as usize + registers.get(0) as usize)?;
    Ok(Flow::Jump)
}

pub fn op_CXNN(registers: &mut Registers, x: usize, nn: u8) -> Outcome {
    registers.set(x, rand::random::<u8>() & nn);
    Ok(Flow::Next)
}

pub struct DrawTarget<'a> {
    pub frame: &'a mut FrameBuffer,
    pub draw_flag: &'a mut bool,
    pub edge: SpriteEdge,
}

pub fn op_DXYN(
    memory: &Ram,
    registers: &mut Registers,
    index_register: u16,
    target: DrawTarget<'_>,
    (x, y, n): (usize, usize, u8),
) -> Outcome {
    let (vx, vy) = (registers.get(x), registers.get(y));
    let rows = target.edge.visible_rows(vy, n as usize);
    let sprite = memory.slice(index_register as usize, rows)?;
    let collision = target.frame.draw_sprite(vx, vy, sprite, target.edge);
    registers.set_flag(collision);
    *target.draw_flag = true;
    Ok(Flow::Next)
}

pub fn op_EX9E(registers: &Registers, x: usize, keypad: &KeyPad, pc: &mut u16) -> Outcome {
    skip_if(keypad.is_key_pressed(registers.get(x)), pc)
}

pub fn op_EXA1(registers: &Registers, x: usize, keypad: &KeyPad, pc: &mut u16) -> Outcome {
    skip_if(!keypad.is_key_pressed(registers.get(x)), pc)
}

pub fn op_FX07(registers: &mut Registers, x: usize, delay_timer: u8) -> Outcome {
    registers.set(x, delay_timer);
    Ok(Flow::Next)
}

/// Parks the VM until a key comes down; the key lands in Vx when the wait resolves.
pub fn op_FX0A(x: usize, waiting_for_key: &mut Option<usize>) -> Outcome {
    *waiting_for_key = Some(x);
    Ok(Flow::Next)
}

pub fn op_FX15(registers: &Registers, x: usize, delay_timer: &mut u8) -> Outcome {
    *delay_timer = registers.get(x);
    Ok(Flow::Next)
}

pub fn op_FX18(registers: &Registers, x: usize, sound_timer: &mut u8) -> Outcome {
    *sound_timer = registers.get(x);
    Ok(Flow::Next)
}

/// The sum is stored unmasked; VF only reports that it left the 12-bit range.
pub fn op_FX1E(registers: &mut Registers, x: usize, index_register: &mut u16) -> Outcome {
    let sum = index_register.wrapping_add(registers.get(x) as u16);
    *index_register = sum;
    registers.set_flag(sum > 0xFFF);
    Ok(Flow::Next)
}

pub fn op_FX29(registers: &Registers, x: usize, index_register: &mut u16) -> Outcome {
    *index_register = registers.get(x) as u16 * constants::FONT_GLYPH_SIZE as u16;
    Ok(Flow::Next)
}

pub fn op_FX33(registers: &Registers, x: usize, memory: &mut Ram, index_register: u16) -> Outcome {
    let val = registers.get(x);
    let digits = memory.slice_mut(index_register as usize, 3)?;
    digits.copy_from_slice(&[val / 100, val / 10 % 10, val % 10]);
    Ok(Flow::Next)
}

/// Copies V0..=Vx to memory at I, then moves I past the block.
pub fn op_FX55(registers: &Registers, x: usize, memory: &mut Ram, index_register: &mut u16) -> Outcome {
    let len = x + 1;
    memory
        .slice_mut(*index_register as usize, len)?
        .copy_from_slice(&registers.as_slice()[..len]);
    *index_register += len as u16;
    Ok(Flow::Next)
}

/// Copies memory at I into V0..=Vx, then moves I past the block.
pub fn op_FX65(registers: &mut Registers, x: usize, memory: &Ram, index_register: &mut u16) -> Outcome {
    let len = x + 1;
    registers.as_mut_slice()[..len].copy_from_slice(memory.slice(*index_register as usize, len)?);
    *index_register += len as u16;
    Ok(Flow::Next)
}

pub fn op_unknown(op_code: u16) -> Outcome {
    Err(VmError::UnknownInstruction(op_code))
}
