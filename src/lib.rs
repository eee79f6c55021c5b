//! vm16: a small register-based virtual machine.
//!
//! The machine has a 4 KiB byte-addressed space shared by code and data, a
//! 256-slot word stack that grows downward, four 16-bit general-purpose
//! registers and two condition flags (ZF, CF). A fetch/decode/execute loop
//! interprets a compact one-byte-opcode encoding until the program halts or
//! faults. All arithmetic is unsigned and wraps at the operand width.
//!
//! The host supplies the program image and a [`Console`] that receives printed
//! output and provides input lines; everything else lives in [`Machine`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod console;
pub mod decode;
pub mod exec;
pub mod machine;
pub mod memory;
pub mod opcodes;
pub mod state;

pub use config::RunConfig;
pub use console::{BufferConsole, Console, StdConsole, StreamConsole};
pub use decode::{decode, Disassembler, Instruction, Operands};
pub use exec::{execute, Flow};
pub use machine::{Exit, Machine, MachineSnapshot, RunSummary};
pub use memory::{AddressSpace, DATA_SIZE, STACK_SLOTS};
pub use opcodes::{lookup, Family, Layout, Op, OpcodeEntry, OPCODES};
pub use state::{Reg, RegisterFile, GPR_COUNT};

pub type Result<T> = std::result::Result<T, VmError>;

/// Host-side failures: anything that goes wrong outside instruction execution.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("program image is {len} bytes, but only {capacity} bytes of memory are available")]
    ImageTooLarge { len: usize, capacity: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
}

/// Conditions that stop the machine mid-program. None of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    #[error("invalid opcode 0x{opcode:02X} at 0x{ip:04X}")]
    InvalidOpcode { opcode: u8, ip: u16 },
    #[error("invalid register selector 0x{selector:02X} at 0x{ip:04X}")]
    InvalidRegisterSelector { selector: u8, ip: u16 },
    #[error("address 0x{addr:04X} is outside the data space")]
    OutOfBoundsAddress { addr: u32 },
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("string at 0x{addr:04X} has no terminator before the end of memory")]
    UnterminatedString { addr: u16 },
    #[error("input of {len} bytes does not fit at 0x{addr:04X} ({capacity} bytes left)")]
    InputOverrun { addr: u16, len: usize, capacity: usize },
    #[error("console error: {message}")]
    Console { message: String },
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
}

/// Fault categories, one per class of malformed or out-of-range execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    InvalidOpcode,
    InvalidRegisterSelector,
    OutOfBoundsAddress,
    StackOverflow,
    StackUnderflow,
    UnterminatedOrOversizedIo,
    /// Raised by the host environment rather than the program.
    Host,
}

impl Fault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::InvalidOpcode { .. } => FaultKind::InvalidOpcode,
            Fault::InvalidRegisterSelector { .. } => FaultKind::InvalidRegisterSelector,
            Fault::OutOfBoundsAddress { .. } => FaultKind::OutOfBoundsAddress,
            Fault::StackOverflow => FaultKind::StackOverflow,
            Fault::StackUnderflow => FaultKind::StackUnderflow,
            Fault::UnterminatedString { .. } | Fault::InputOverrun { .. } => {
                FaultKind::UnterminatedOrOversizedIo
            }
            Fault::Console { .. } | Fault::StepLimitExceeded { .. } => FaultKind::Host,
        }
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::Console {
            message: err.to_string(),
        }
    }
}
