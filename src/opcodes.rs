//! Static opcode table.
//!
//! Every instruction is one opcode byte followed by a fixed operand layout.
//! The table below is the single definition of opcode values, mnemonics,
//! layouts and families; the [`Op`] enum and [`OPCODES`] are generated from it.

/// Operand bytes that follow the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    None,
    /// One byte: destination register in the high nibble, source in the low nibble.
    RegPair,
    /// One register byte.
    Reg,
    /// Register byte, then an immediate byte.
    RegImm8,
    /// Register byte, then a little-endian immediate word.
    RegImm16,
    /// Register byte, then a little-endian absolute address.
    RegAddr,
    /// Little-endian absolute address.
    Addr,
}

impl Layout {
    pub fn operand_len(self) -> u16 {
        match self {
            Layout::None => 0,
            Layout::RegPair | Layout::Reg => 1,
            Layout::RegImm8 | Layout::Addr => 2,
            Layout::RegImm16 | Layout::RegAddr => 3,
        }
    }
}

/// Handler group an opcode is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    DataMovement,
    Arithmetic,
    Control,
    Stack,
    Io,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub opcode: u8,
    pub op: Op,
    pub mnemonic: &'static str,
    pub layout: Layout,
    pub family: Family,
}

impl OpcodeEntry {
    /// Encoded length, opcode byte included.
    pub fn encoded_len(&self) -> u16 {
        1 + self.layout.operand_len()
    }
}

macro_rules! opcode_table {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal, $mnemonic:literal, $layout:ident, $family:ident; )*) => {
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Op {
            $( $(#[$doc])* $variant = $code, )*
        }

        impl Op {
            pub const fn entry(self) -> &'static OpcodeEntry {
                match self {
                    $(
                        Op::$variant => &OpcodeEntry {
                            opcode: $code,
                            op: Op::$variant,
                            mnemonic: $mnemonic,
                            layout: Layout::$layout,
                            family: Family::$family,
                        },
                    )*
                }
            }
        }

        pub static OPCODES: &[OpcodeEntry] = &[ $( *Op::$variant.entry(), )* ];
    };
}

opcode_table! {
    /// NOP
    Nop = 0x90, "NOP", None, System;
    /// MOV Rd,Rs
    Mov = 0x10, "MOV", RegPair, DataMovement;
    /// MOVX Rd,BYTE [addr]
    MovxByteAddr = 0x12, "MOVX", RegAddr, DataMovement;
    /// MOV Rd,WORD [addr]
    MovWordAddr = 0x14, "MOV", RegAddr, DataMovement;
    /// MOVX Rd,imm8
    MovxImm = 0x16, "MOVX", RegImm8, DataMovement;
    /// MOV Rd,imm16
    MovImm = 0x18, "MOV", RegImm16, DataMovement;
    /// MOV BYTE [addr],Rs
    StoreByteAddr = 0x1C, "MOV", RegAddr, DataMovement;
    /// MOV WORD [addr],Rs
    StoreWordAddr = 0x1F, "MOV", RegAddr, DataMovement;
    /// MOV BYTE [Rd],Rs
    StoreByteInd = 0x55, "MOV", RegPair, DataMovement;
    /// MOVX Rd,BYTE [Rs]
    MovxByteInd = 0x56, "MOVX", RegPair, DataMovement;
    /// JMP addr
    Jmp = 0xE0, "JMP", Addr, Control;
    /// JZ addr: ZF
    Jz = 0xE2, "JZ", Addr, Control;
    /// JNZ addr: !ZF
    Jnz = 0xE3, "JNZ", Addr, Control;
    /// JAE addr: ZF || !CF
    Jae = 0xE4, "JAE", Addr, Control;
    /// JBE addr: ZF || CF
    Jbe = 0xE6, "JBE", Addr, Control;
    /// JB addr: CF && !ZF
    Jb = 0xE8, "JB", Addr, Control;
    /// JA addr: !CF && !ZF
    Ja = 0xEC, "JA", Addr, Control;
    /// ADD Rd,imm16
    AddImm = 0xAD, "ADD", RegImm16, Arithmetic;
    /// ADD Rd,Rs
    AddReg = 0xA5, "ADD", RegPair, Arithmetic;
    /// ADDL Rd,Rs
    AddlReg = 0xA2, "ADDL", RegPair, Arithmetic;
    /// SUB Rd,imm16
    SubImm = 0x5B, "SUB", RegImm16, Arithmetic;
    /// SUB Rd,Rs
    SubReg = 0x5C, "SUB", RegPair, Arithmetic;
    /// SUBL Rd,Rs
    SublReg = 0x5D, "SUBL", RegPair, Arithmetic;
    /// ADDL Rd,imm8
    AddlImm = 0xA1, "ADDL", RegImm8, Arithmetic;
    /// SUBL Rd,imm8
    SublImm = 0x51, "SUBL", RegImm8, Arithmetic;
    /// XOR Rd,Rs
    Xor = 0xF0, "XOR", RegPair, Arithmetic;
    /// XORL Rd,Rs
    Xorl = 0xF1, "XORL", RegPair, Arithmetic;
    /// CMP Rd,Rs
    Cmp = 0x70, "CMP", RegPair, Arithmetic;
    /// CMPL Rd,Rs
    Cmpl = 0x71, "CMPL", RegPair, Arithmetic;
    /// PUSH Rs
    Push = 0xAF, "PUSH", Reg, Stack;
    /// POP Rd
    Pop = 0xAE, "POP", Reg, Stack;
    /// Pop a word and print it in decimal with a newline.
    PrintInt = 0xC0, "PRINT_INT", None, Io;
    /// Pop an address and print the NUL-terminated string there.
    PrintStr = 0xC2, "PRINT_STR", None, Io;
    /// Pop an address and store one input line there, NUL-terminated.
    ScanStr = 0x89, "SCAN_STR", None, Io;
    /// HALT
    Halt = 0xED, "HALT", None, System;
}

/// Look up an opcode byte. `None` means the byte is not an instruction.
pub fn lookup(opcode: u8) -> Option<&'static OpcodeEntry> {
    OPCODES.iter().find(|entry| entry.opcode == opcode)
}

impl Op {
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        lookup(opcode).map(|entry| entry.op).ok_or(opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn opcode_bytes_are_unique() {
        let mut seen = HashSet::new();
        for entry in OPCODES {
            assert!(seen.insert(entry.opcode), "duplicate opcode {:02X}", entry.opcode);
            assert_eq!(entry.op as u8, entry.opcode);
        }
        assert_eq!(OPCODES.len(), 35);
    }

    #[test]
    fn lookup_finds_catalogue_entries() {
        let mov = lookup(0x10).expect("MOV present");
        assert_eq!(mov.mnemonic, "MOV");
        assert_eq!(mov.layout, Layout::RegPair);
        assert_eq!(mov.encoded_len(), 2);

        let add = lookup(0xAD).expect("ADD imm present");
        assert_eq!(add.family, Family::Arithmetic);
        assert_eq!(add.encoded_len(), 4);

        let jnz = lookup(0xE3).expect("JNZ present");
        assert_eq!(jnz.op, Op::Jnz);
        assert_eq!(jnz.encoded_len(), 3);

        assert_eq!(lookup(0xED).map(|e| e.op), Some(Op::Halt));
    }

    #[test]
    fn undefined_bytes_are_not_instructions() {
        for byte in [0x00, 0xFF, 0xDB, 0x11, 0xE1, 0xEE] {
            assert!(lookup(byte).is_none(), "0x{byte:02X} should be undefined");
        }
    }

    #[test]
    fn encoded_lengths_match_layouts() {
        let expected = [
            (Op::Nop, 1),
            (Op::MovxByteAddr, 4),
            (Op::MovxImm, 3),
            (Op::MovImm, 4),
            (Op::StoreWordAddr, 4),
            (Op::StoreByteInd, 2),
            (Op::AddlImm, 3),
            (Op::Push, 2),
            (Op::PrintStr, 1),
        ];
        for (op, len) in expected {
            assert_eq!(op.entry().encoded_len(), len, "{op:?}");
        }
    }

    #[test]
    fn op_round_trips_to_entry() {
        for entry in OPCODES {
            assert_eq!(entry.op.entry(), entry);
            assert_eq!(Op::try_from(entry.opcode), Ok(entry.op));
        }
        assert_eq!(Op::try_from(0xFF), Err(0xFF));
    }
}
