use std::{
    fs,
    io,
    path::Path,
};

use thiserror::Error;

use crate::constants;

#[rustfmt::skip]
pub const FONT: [u8; 80] = [
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
    0xF0, 0x80, 0xF0, 0x80, 0x80  // F
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RamError {
    #[error("invalid address {0:#05X}")]
    InvalidAddress(usize),
}

/// The 4 KiB address space. Every access is bounds checked; nothing wraps.
#[derive(Clone)]
pub struct Ram {
    memory: [u8; constants::TOTAL_RAM],
}

impl Ram {
    /// Blank memory with the font installed at address 0.
    pub fn new() -> Self {
        let mut memory = [0; constants::TOTAL_RAM];
        memory[0..FONT.len()].copy_from_slice(&FONT);

        Ram { memory }
    }

    pub fn load(rom: &Rom) -> Self {
        let mut ram = Ram::new();
        let start = constants::MEMORY_OFFSET;
        ram.memory[start..start + rom.len()].copy_from_slice(rom.data());

        ram
    }

    pub fn op_code(&self, pc: usize) -> Result<u16, RamError> {
        let high = self.get(pc)?;
        let low = self.get(pc + 1)?;
        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn get<T: Into<usize>>(&self, index: T) -> Result<u8, RamError> {
        let idx = index.into();
        self.memory.get(idx).ok_or(RamError::InvalidAddress(idx)).copied()
    }

    /// Borrows `len` bytes starting at `start`, failing on the first address past the end.
    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8], RamError> {
        let end = start + len;
        if end > constants::TOTAL_RAM {
            return Err(RamError::InvalidAddress(start.max(constants::TOTAL_RAM)));
        }
        Ok(&self.memory[start..end])
    }

    pub fn slice_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8], RamError> {
        let end = start + len;
        if end > constants::TOTAL_RAM {
            return Err(RamError::InvalidAddress(start.max(constants::TOTAL_RAM)));
        }
        Ok(&mut self.memory[start..end])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.memory
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

/// General purpose registers V0-VF.
///
/// VF doubles as the carry/borrow/collision output. Instructions that produce a
/// flag compute it from the operands first and write it with [`Registers::set_flag`]
/// after the destination, so when the destination is VF itself the flag wins.
#[derive(Clone, Default)]
pub struct Registers([u8; constants::REGISTER_COUNT]);

impl Registers {
    pub fn get(&self, x: usize) -> u8 {
        self.0[x & 0xF]
    }

    pub fn set(&mut self, x: usize, val: u8) {
        self.0[x & 0xF] = val;
    }

    pub fn set_flag(&mut self, flag: bool) {
        self.0[constants::FLAG_REGISTER] = flag as u8;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

#[derive(Error, Debug)]
pub enum RomError {
    #[error("loading rom failed {0}")]
    IoError(#[from] io::Error),

    #[error("rom is empty")]
    Empty,

    #[error("out of memory {rom_size:?} > {ram_size:?}")]
    OutOfMemory { rom_size: usize, ram_size: usize },
}

/// A validated program image: non-empty and small enough to fit above 0x200.
#[derive(Clone, Debug)]
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> Result<Self, RomError> {
        let data = bytes.into();

        if data.is_empty() {
            return Err(RomError::Empty);
        }

        if data.len() > constants::AVAILABLE_RAM {
            return Err(RomError::OutOfMemory {
                rom_size: data.len(),
                ram_size: constants::AVAILABLE_RAM,
            });
        }

        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StackError {
    #[error("stack overflow")]
    Overflow,

    #[error("stack underflow")]
    Underflow,
}

#[derive(Clone, Default)]
pub struct AddressStack {
    slots: [u16; constants::STACK_SIZE],
    sp: usize,
}

impl AddressStack {
    pub fn push<T: Into<u16>>(&mut self, val: T) -> Result<(), StackError> {
        let slot = self.slots.get_mut(self.sp).ok_or(StackError::Overflow)?;
        *slot = val.into();
        self.sp += 1;
        Ok(())
    }

    pub fn pop<T: From<u16>>(&mut self) -> Result<T, StackError> {
        self.sp = self.sp.checked_sub(1).ok_or(StackError::Underflow)?;
        Ok(T::from(self.slots[self.sp]))
    }

    pub fn pointer(&self) -> usize {
        self.sp
    }

    /// Every slot, including stale ones above the stack pointer.
    pub fn slots(&self) -> &[u16] {
        &self.slots
    }
}

/// Latched state of the 16 hex keys.
#[derive(Clone, Default)]
pub struct KeyPad {
    keys: [bool; constants::KEY_COUNT],
}

impl KeyPad {
    /// Replaces every latch from `mask` (bit k is key k) and returns the lowest pressed key.
    pub fn update(&mut self, mask: u16) -> Option<u8> {
        for (k, key) in self.keys.iter_mut().enumerate() {
            *key = mask & (1 << k) != 0;
        }
        self.keys.iter().position(|&down| down).map(|k| k as u8)
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.keys
    }
}
