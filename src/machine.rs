//! A machine instance: one address space, one register file, one run loop.
//!
//! Instances share nothing, so independent programs run on independent
//! `Machine` values. A machine runs until HALT or the first fault and is not
//! resumable afterwards.

use crate::config::RunConfig;
use crate::console::Console;
use crate::decode::{decode, Disassembler};
use crate::exec::{execute, Flow};
use crate::memory::AddressSpace;
use crate::state::{RegisterFile, GPR_COUNT};
use crate::{Fault, Result};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Stack entries captured by [`Machine::snapshot`].
const SNAPSHOT_STACK_DEPTH: usize = 4;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exit {
    Halted,
    Faulted(Fault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub exit: Exit,
    /// Instructions retired, HALT included; the faulting instruction is not counted.
    pub steps: u64,
}

impl RunSummary {
    pub fn fault(&self) -> Option<&Fault> {
        match &self.exit {
            Exit::Faulted(fault) => Some(fault),
            Exit::Halted => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub memory: AddressSpace,
    pub regs: RegisterFile,
    config: RunConfig,
    steps: u64,
    exit: Option<Exit>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            memory: AddressSpace::new(),
            regs: RegisterFile::new(),
            config: RunConfig::default(),
            steps: 0,
            exit: None,
        }
    }

    /// Fresh machine with `image` loaded at offset 0. Oversized images are rejected.
    pub fn with_image(image: &[u8]) -> Result<Self> {
        let mut machine = Self::new();
        machine.memory.load_image(image)?;
        debug!("loaded {} byte image", image.len());
        Ok(machine)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = fs::read(path)?;
        debug!("read image from {}", path.display());
        Self::with_image(&image)
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// `None` while the machine can still execute.
    pub fn exit(&self) -> Option<&Exit> {
        self.exit.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.exit.is_none()
    }

    /// Execute one instruction. Once the machine has stopped, every call
    /// reports the same terminal outcome again without executing anything.
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> std::result::Result<Flow, Fault> {
        match &self.exit {
            Some(Exit::Halted) => return Ok(Flow::Halt),
            Some(Exit::Faulted(fault)) => return Err(fault.clone()),
            None => {}
        }
        let ip = self.regs.ip;
        let outcome = self.fetch_and_execute(console);
        match &outcome {
            Ok(Flow::Continue) => {}
            Ok(Flow::Halt) => {
                debug!("halted at 0x{ip:04X} after {} steps", self.steps);
                self.exit = Some(Exit::Halted);
            }
            Err(fault) => {
                warn!("fault at 0x{ip:04X} after {} steps: {fault}", self.steps);
                self.exit = Some(Exit::Faulted(fault.clone()));
            }
        }
        outcome
    }

    fn fetch_and_execute<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
    ) -> std::result::Result<Flow, Fault> {
        if let Some(limit) = self.config.max_steps {
            if self.steps >= limit {
                return Err(Fault::StepLimitExceeded { limit });
            }
        }
        let instr = decode(&self.memory, self.regs.ip)?;
        if self.config.trace {
            trace!("{:04X}: {instr} [{}]", instr.addr, self.regs);
        }
        self.regs.ip = instr.next_ip();
        let flow = execute(&instr, &mut self.regs, &mut self.memory, console)?;
        self.steps += 1;
        Ok(flow)
    }

    /// Run until HALT or a fault.
    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> RunSummary {
        let exit = loop {
            match self.step(console) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => break Exit::Halted,
                Err(fault) => break Exit::Faulted(fault),
            }
        };
        RunSummary {
            exit,
            steps: self.steps,
        }
    }

    /// Linear disassembly of `[0, end)`.
    pub fn disassemble(&self, end: u16) -> Disassembler<'_> {
        Disassembler::new(&self.memory, 0, end)
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            gprs: self.regs.gprs(),
            ip: self.regs.ip,
            sp: self.regs.sp,
            flags: self.regs.flags(),
            zf: self.regs.zf,
            cf: self.regs.cf,
            stack_top: self
                .memory
                .stack_window(self.regs.sp, SNAPSHOT_STACK_DEPTH)
                .to_vec(),
            steps: self.steps,
            exit: self.exit.clone(),
        }
    }
}

/// Register/stack dump for post-mortem inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub gprs: [u16; GPR_COUNT],
    pub ip: u16,
    /// Stack slot index: 256 when empty, 0 when full.
    pub sp: u16,
    pub flags: u8,
    pub zf: bool,
    pub cf: bool,
    /// Up to four words, top of stack first.
    pub stack_top: Vec<u16>,
    pub steps: u64,
    #[serde(default)]
    pub exit: Option<Exit>,
}

impl MachineSnapshot {
    /// `sp` as a byte offset into the word stack.
    pub fn sp_byte_offset(&self) -> u16 {
        self.sp * 2
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
