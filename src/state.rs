//! Register file: four word GPRs, ZF/CF, IP and SP.
//!
//! Low-byte access is explicit masking rather than reinterpreting register
//! storage, so the result does not depend on host byte order.

use crate::memory::STACK_SLOTS;
use std::fmt;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 4;

const ZF_BIT: u8 = 0x01;
const CF_BIT: u8 = 0x02;

/// A validated register index (R0..R3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(u8);

impl Reg {
    pub const R0: Reg = Reg(0);
    pub const R1: Reg = Reg(1);
    pub const R2: Reg = Reg(2);
    pub const R3: Reg = Reg(3);

    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < GPR_COUNT).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = Reg> {
        (0..GPR_COUNT as u8).map(Reg)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    gprs: [u16; GPR_COUNT],
    pub zf: bool,
    pub cf: bool,
    /// Byte offset of the next opcode in the data space.
    pub ip: u16,
    /// Stack slot index, not a byte offset.
    pub sp: u16,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            gprs: [0; GPR_COUNT],
            zf: false,
            cf: false,
            ip: 0,
            sp: STACK_SLOTS as u16,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, reg: Reg) -> u16 {
        self.gprs[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: u16) {
        self.gprs[reg.index()] = value;
    }

    pub fn gprs(&self) -> [u16; GPR_COUNT] {
        self.gprs
    }

    pub fn low(&self, reg: Reg) -> u8 {
        (self.gprs[reg.index()] & 0xFF) as u8
    }

    /// Replace the low byte, keeping the high byte.
    pub fn set_low(&mut self, reg: Reg, value: u8) {
        let slot = &mut self.gprs[reg.index()];
        *slot = (*slot & 0xFF00) | value as u16;
    }

    /// Zero the whole register, then place `value` in the low byte (MOVX).
    pub fn set_extended(&mut self, reg: Reg, value: u8) {
        self.gprs[reg.index()] = value as u16;
    }

    /// Packed flags: ZF in bit 0, CF in bit 1, all other bits zero.
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.zf {
            flags |= ZF_BIT;
        }
        if self.cf {
            flags |= CF_BIT;
        }
        flags
    }

    /// Only ZF/CF are kept; unused bits are dropped.
    pub fn set_flags(&mut self, flags: u8) {
        self.zf = flags & ZF_BIT != 0;
        self.cf = flags & CF_BIT != 0;
    }

    /// Add rule on a word: carry when the sum wrapped below the prior operand.
    pub fn set_zf_cf_word(&mut self, result: u16, before: u16) {
        self.zf = result == 0;
        self.cf = result < before;
    }

    /// Add rule restricted to the low byte.
    pub fn set_zf_cf_byte(&mut self, result: u8, before: u8) {
        self.zf = result == 0;
        self.cf = result < before;
    }

    /// Subtract rule on a word: borrow when the difference wrapped above the prior operand.
    pub fn set_borrow_word(&mut self, result: u16, before: u16) {
        self.zf = result == 0;
        self.cf = result > before;
    }

    pub fn set_borrow_byte(&mut self, result: u8, before: u8) {
        self.zf = result == 0;
        self.cf = result > before;
    }

    /// XOR family: ZF from the result, CF always cleared.
    pub fn set_logic(&mut self, result_is_zero: bool) {
        self.zf = result_is_zero;
        self.cf = false;
    }

    /// CMP family: ZF on equality, CF when the source is above the destination.
    pub fn set_compare<T: Ord>(&mut self, dst: T, src: T) {
        self.zf = dst == src;
        self.cf = src > dst;
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reg in Reg::all() {
            write!(f, "{reg}=0x{:04X} ", self.get(reg))?;
        }
        write!(
            f,
            "IP=0x{:04X} SP=0x{:04X} ZF={} CF={}",
            self.ip, self.sp, self.zf as u8, self.cf as u8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_register_file_is_zeroed_with_empty_stack() {
        let regs = RegisterFile::new();
        assert_eq!(regs.gprs(), [0; GPR_COUNT]);
        assert_eq!(regs.flags(), 0);
        assert_eq!(regs.ip, 0);
        assert_eq!(regs.sp, STACK_SLOTS as u16);
    }

    #[test]
    fn register_selector_accepts_only_four_registers() {
        assert_eq!(Reg::new(3), Some(Reg::R3));
        assert_eq!(Reg::new(4), None);
        assert_eq!(Reg::new(0xFF), None);
        assert_eq!(Reg::all().count(), GPR_COUNT);
    }

    #[test]
    fn low_byte_write_keeps_high_byte() {
        let mut regs = RegisterFile::new();
        regs.set(Reg::R1, 0xABCD);
        regs.set_low(Reg::R1, 0x34);
        assert_eq!(regs.get(Reg::R1), 0xAB34);
        assert_eq!(regs.low(Reg::R1), 0x34);
    }

    #[test]
    fn extended_write_clears_high_byte() {
        let mut regs = RegisterFile::new();
        regs.set(Reg::R2, 0xFFFF);
        regs.set_extended(Reg::R2, 0x15);
        assert_eq!(regs.get(Reg::R2), 0x0015);
    }

    #[test]
    fn flags_facade_ignores_unused_bits() {
        let mut regs = RegisterFile::new();
        regs.set_flags(0xFF);
        assert!(regs.zf);
        assert!(regs.cf);
        assert_eq!(regs.flags(), 0b11);

        regs.set_flags(0b1111_1100);
        assert_eq!(regs.flags(), 0);
    }

    #[test]
    fn carry_and_borrow_rules() {
        let mut regs = RegisterFile::new();
        regs.set_zf_cf_word(0x0000, 0xFFFF);
        assert!(regs.zf && regs.cf);
        regs.set_zf_cf_word(0x0005, 0x0003);
        assert!(!regs.zf && !regs.cf);

        regs.set_borrow_byte(0xFF, 0x00);
        assert!(!regs.zf && regs.cf);
        regs.set_borrow_word(0x0000, 0x0001);
        assert!(regs.zf && !regs.cf);
    }

    #[test]
    fn compare_sets_carry_when_source_is_above() {
        let mut regs = RegisterFile::new();
        regs.set_compare(5u16, 9u16);
        assert!(!regs.zf && regs.cf);
        regs.set_compare(9u8, 9u8);
        assert!(regs.zf && !regs.cf);
    }

    #[test]
    fn display_lists_registers_and_flags() {
        let mut regs = RegisterFile::new();
        regs.set(Reg::R0, 5);
        regs.zf = true;
        let text = regs.to_string();
        assert!(text.starts_with("R0=0x0005 R1=0x0000"));
        assert!(text.ends_with("IP=0x0000 SP=0x0100 ZF=1 CF=0"));
    }
}
