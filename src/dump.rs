use std::fmt::{
    self,
    Write,
};

use crate::emulator::Emulator;

const ROW: usize = 16;

/// Human readable snapshot of the VM, produced by [`Emulator::dump`].
pub struct Dump<'a>(&'a Emulator);

impl Emulator {
    pub fn dump(&self) -> Dump<'_> {
        Dump(self)
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vm = self.0;

        writeln!(f, "VM Memory:")?;
        write_hex_grid(f, vm.memory())?;
        f.write_str("\n\n")?;

        writeln!(f, "Program Stack:")?;
        for (i, addr) in vm.stack().iter().enumerate().rev() {
            writeln!(f, "[{:X}]=0x{:04X}", i, addr)?;
        }
        f.write_char('\n')?;

        writeln!(f, "Registers [V0-VF]:")?;
        for (i, val) in vm.registers().iter().enumerate() {
            writeln!(f, "[V{:X}]=0x{:02X}", i, val)?;
        }
        f.write_char('\n')?;

        writeln!(f, "Keys [0-F]:")?;
        for (i, down) in vm.keys().iter().enumerate() {
            writeln!(f, "[k{:X}]={}", i, *down as u8)?;
        }
        f.write_char('\n')?;

        writeln!(f, "Screen Buffer:")?;
        for row in vm.frame_buffer().rows() {
            let line: String = row.iter().map(|&lit| if lit { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        f.write_char('\n')?;

        writeln!(f, "Other registers and flags:")?;
        writeln!(f, "PC=0x{:04X}", vm.pc())?;
        writeln!(f, "opcode=0x{:04X}", vm.opcode())?;
        writeln!(f, "SP=0x{:04X}", vm.stack_pointer())?;
        writeln!(f, "I=0x{:04X}", vm.index())?;
        writeln!(f, "DT=0x{:04X}", vm.delay_timer())?;
        writeln!(f, "ST=0x{:04X}", vm.sound_timer())?;
        writeln!(f, "err={}", vm.error().code())
    }
}

fn write_hex_grid(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("     ")?;
    for col in 0..ROW {
        write!(f, "{:02X} ", col)?;
    }

    for (row, chunk) in bytes.chunks(ROW).enumerate() {
        write!(f, "\n{:03X}  ", row * ROW)?;
        let cells: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        f.write_str(&cells.join(" "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_appear_in_order() {
        let mut emulator = Emulator::new();
        emulator.load(&[0x6A, 0x42]).unwrap();
        emulator.step().unwrap();

        let text = emulator.dump().to_string();
        let sections = [
            "VM Memory:",
            "Program Stack:",
            "Registers [V0-VF]:",
            "Keys [0-F]:",
            "Screen Buffer:",
            "Other registers and flags:",
        ];
        let positions: Vec<usize> = sections.iter().map(|s| text.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rows_are_addressed_hex() {
        let mut emulator = Emulator::new();
        emulator.load(&[0x6A, 0x42]).unwrap();
        let text = emulator.dump().to_string();

        assert!(text.contains("000  F0 90 90 90 F0 20 60 20 20 70 F0 10 F0 80 F0 F0\n"));
        assert!(text.contains("\n200  6A 42 00"));
        assert!(text.contains("\nFF0  00"));
    }

    #[test]
    fn registers_and_flags_reflect_state() {
        let mut emulator = Emulator::new();
        emulator.load(&[0x6A, 0x42]).unwrap();
        emulator.update_keys(1 << 2);
        emulator.step().unwrap();

        let text = emulator.dump().to_string();
        assert!(text.contains("[VA]=0x42\n"));
        assert!(text.contains("[k2]=1\n"));
        assert!(text.contains("[k3]=0\n"));
        assert!(text.contains("[F]=0x0000\n"));
        assert!(text.ends_with("PC=0x0202\nopcode=0x6A42\nSP=0x0000\nI=0x0000\nDT=0x0000\nST=0x0000\nerr=0\n"));
        assert_eq!(text.lines().filter(|l| l.len() == 64).count(), 32);
    }
}
