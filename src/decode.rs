//! Operand fetch and disassembly.
//!
//! Decoding reads the opcode at `ip`, validates register selectors and pulls
//! the fixed operand bytes through the bounds-checked [`AddressSpace`]
//! accessors. It never mutates machine state.

use crate::memory::AddressSpace;
use crate::opcodes::{lookup, Layout, Op, OpcodeEntry};
use crate::state::Reg;
use crate::Fault;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    Pair { dst: Reg, src: Reg },
    Reg(Reg),
    RegImm8(Reg, u8),
    RegImm16(Reg, u16),
    RegAddr(Reg, u16),
    Addr(u16),
}

/// One fully decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the opcode byte.
    pub addr: u16,
    pub entry: &'static OpcodeEntry,
    pub operands: Operands,
}

impl Instruction {
    pub fn op(&self) -> Op {
        self.entry.op
    }

    /// Address of the byte right after the whole encoding.
    pub fn next_ip(&self) -> u16 {
        self.addr.wrapping_add(self.entry.encoded_len())
    }
}

struct Cursor<'a> {
    memory: &'a AddressSpace,
    start: u16,
    pos: u16,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8, Fault> {
        let value = self.memory.read_byte(self.pos)?;
        self.pos = self.pos.wrapping_add(1);
        Ok(value)
    }

    fn word(&mut self) -> Result<u16, Fault> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn reg(&mut self) -> Result<Reg, Fault> {
        let selector = self.byte()?;
        Reg::new(selector).ok_or(Fault::InvalidRegisterSelector {
            selector,
            ip: self.start,
        })
    }

    fn pair(&mut self) -> Result<(Reg, Reg), Fault> {
        let selector = self.byte()?;
        let invalid = Fault::InvalidRegisterSelector {
            selector,
            ip: self.start,
        };
        let dst = Reg::new(selector >> 4).ok_or(invalid.clone())?;
        let src = Reg::new(selector & 0x0F).ok_or(invalid)?;
        Ok((dst, src))
    }
}

/// Decode the instruction whose opcode byte sits at `ip`.
pub fn decode(memory: &AddressSpace, ip: u16) -> Result<Instruction, Fault> {
    let opcode = memory.read_byte(ip)?;
    let entry = lookup(opcode).ok_or(Fault::InvalidOpcode { opcode, ip })?;
    let mut cursor = Cursor {
        memory,
        start: ip,
        pos: ip.wrapping_add(1),
    };
    let operands = match entry.layout {
        Layout::None => Operands::None,
        Layout::RegPair => {
            let (dst, src) = cursor.pair()?;
            Operands::Pair { dst, src }
        }
        Layout::Reg => Operands::Reg(cursor.reg()?),
        Layout::RegImm8 => {
            let reg = cursor.reg()?;
            Operands::RegImm8(reg, cursor.byte()?)
        }
        Layout::RegImm16 => {
            let reg = cursor.reg()?;
            Operands::RegImm16(reg, cursor.word()?)
        }
        Layout::RegAddr => {
            let reg = cursor.reg()?;
            Operands::RegAddr(reg, cursor.word()?)
        }
        Layout::Addr => Operands::Addr(cursor.word()?),
    };
    Ok(Instruction {
        addr: ip,
        entry,
        operands,
    })
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.entry.mnemonic;
        match (self.op(), self.operands) {
            (_, Operands::None) => write!(f, "{mnemonic}"),
            (Op::StoreByteInd, Operands::Pair { dst, src }) => {
                write!(f, "{mnemonic} BYTE [{dst}],{src}")
            }
            (Op::MovxByteInd, Operands::Pair { dst, src }) => {
                write!(f, "{mnemonic} {dst},BYTE [{src}]")
            }
            (_, Operands::Pair { dst, src }) => write!(f, "{mnemonic} {dst},{src}"),
            (_, Operands::Reg(reg)) => write!(f, "{mnemonic} {reg}"),
            (_, Operands::RegImm8(reg, imm)) => write!(f, "{mnemonic} {reg},{imm:02X}h"),
            (_, Operands::RegImm16(reg, imm)) => write!(f, "{mnemonic} {reg},{imm:04X}h"),
            (Op::MovxByteAddr, Operands::RegAddr(reg, addr)) => {
                write!(f, "{mnemonic} {reg},BYTE [{addr:04X}]")
            }
            (Op::StoreByteAddr, Operands::RegAddr(reg, addr)) => {
                write!(f, "{mnemonic} BYTE [{addr:04X}],{reg}")
            }
            (Op::StoreWordAddr, Operands::RegAddr(reg, addr)) => {
                write!(f, "{mnemonic} WORD [{addr:04X}],{reg}")
            }
            (_, Operands::RegAddr(reg, addr)) => write!(f, "{mnemonic} {reg},WORD [{addr:04X}]"),
            (_, Operands::Addr(addr)) => write!(f, "{mnemonic} {addr:04X}"),
        }
    }
}

/// Linear sweep over a memory range. Yields the first decode fault, then stops.
pub struct Disassembler<'a> {
    memory: &'a AddressSpace,
    ip: u16,
    end: u16,
    done: bool,
}

impl<'a> Disassembler<'a> {
    pub fn new(memory: &'a AddressSpace, start: u16, end: u16) -> Self {
        Self {
            memory,
            ip: start,
            end,
            done: false,
        }
    }
}

impl Iterator for Disassembler<'_> {
    type Item = Result<Instruction, Fault>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.ip >= self.end {
            return None;
        }
        match decode(self.memory, self.ip) {
            Ok(instr) => {
                self.ip = instr.next_ip();
                Some(Ok(instr))
            }
            Err(fault) => {
                self.done = true;
                Some(Err(fault))
            }
        }
    }
}
