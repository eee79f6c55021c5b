//! Instruction semantics, one handler per opcode family.
//!
//! Handlers run after `ip` has already been advanced past the instruction.
//! Every check happens before the access it guards, so a faulting instruction
//! leaves no partial effect behind beyond the operands it already popped.

use crate::console::Console;
use crate::decode::{Instruction, Operands};
use crate::memory::{AddressSpace, DATA_SIZE};
use crate::opcodes::{Family, Op};
use crate::state::RegisterFile;
use crate::Fault;

/// What the loop should do after an instruction retires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

type Step = Result<Flow, Fault>;

pub fn execute<C: Console + ?Sized>(
    instr: &Instruction,
    regs: &mut RegisterFile,
    memory: &mut AddressSpace,
    console: &mut C,
) -> Step {
    match instr.entry.family {
        Family::DataMovement => data_movement(instr, regs, memory),
        Family::Arithmetic => arithmetic(instr, regs),
        Family::Control => control(instr, regs),
        Family::Stack => stack(instr, regs, memory),
        Family::Io => io(instr, regs, memory, console),
        Family::System => match instr.op() {
            Op::Halt => Ok(Flow::Halt),
            _ => Ok(Flow::Continue),
        },
    }
}

/// Decoder/table disagreement; treated like an undefined opcode.
fn malformed(instr: &Instruction) -> Fault {
    Fault::InvalidOpcode {
        opcode: instr.entry.opcode,
        ip: instr.addr,
    }
}

fn data_movement(instr: &Instruction, regs: &mut RegisterFile, memory: &mut AddressSpace) -> Step {
    match (instr.op(), instr.operands) {
        (Op::Mov, Operands::Pair { dst, src }) => regs.set(dst, regs.get(src)),
        (Op::MovxByteAddr, Operands::RegAddr(reg, addr)) => {
            let value = memory.read_byte(addr)?;
            regs.set_extended(reg, value);
        }
        (Op::MovWordAddr, Operands::RegAddr(reg, addr)) => {
            let value = memory.read_word(addr)?;
            regs.set(reg, value);
        }
        (Op::MovxImm, Operands::RegImm8(reg, imm)) => regs.set_extended(reg, imm),
        (Op::MovImm, Operands::RegImm16(reg, imm)) => regs.set(reg, imm),
        (Op::StoreByteAddr, Operands::RegAddr(reg, addr)) => {
            memory.write_byte(addr, regs.low(reg))?;
        }
        (Op::StoreWordAddr, Operands::RegAddr(reg, addr)) => {
            memory.write_word(addr, regs.get(reg))?;
        }
        (Op::StoreByteInd, Operands::Pair { dst, src }) => {
            memory.write_byte(regs.get(dst), regs.low(src))?;
        }
        (Op::MovxByteInd, Operands::Pair { dst, src }) => {
            let value = memory.read_byte(regs.get(src))?;
            regs.set_extended(dst, value);
        }
        _ => return Err(malformed(instr)),
    }
    Ok(Flow::Continue)
}

fn arithmetic(instr: &Instruction, regs: &mut RegisterFile) -> Step {
    match (instr.op(), instr.operands) {
        (Op::AddImm, Operands::RegImm16(reg, imm)) => {
            let before = regs.get(reg);
            let result = before.wrapping_add(imm);
            regs.set_zf_cf_word(result, before);
            regs.set(reg, result);
        }
        (Op::AddReg, Operands::Pair { dst, src }) => {
            let before = regs.get(dst);
            let result = before.wrapping_add(regs.get(src));
            regs.set_zf_cf_word(result, before);
            regs.set(dst, result);
        }
        (Op::AddlReg, Operands::Pair { dst, src }) => {
            let before = regs.low(dst);
            let result = before.wrapping_add(regs.low(src));
            regs.set_zf_cf_byte(result, before);
            regs.set_low(dst, result);
        }
        (Op::AddlImm, Operands::RegImm8(reg, imm)) => {
            let before = regs.low(reg);
            let result = before.wrapping_add(imm);
            regs.set_zf_cf_byte(result, before);
            regs.set_low(reg, result);
        }
        (Op::SubImm, Operands::RegImm16(reg, imm)) => {
            let before = regs.get(reg);
            let result = before.wrapping_sub(imm);
            regs.set_borrow_word(result, before);
            regs.set(reg, result);
        }
        (Op::SubReg, Operands::Pair { dst, src }) => {
            let before = regs.get(dst);
            let result = before.wrapping_sub(regs.get(src));
            regs.set_borrow_word(result, before);
            regs.set(dst, result);
        }
        (Op::SublReg, Operands::Pair { dst, src }) => {
            let before = regs.low(dst);
            let result = before.wrapping_sub(regs.low(src));
            regs.set_borrow_byte(result, before);
            regs.set_low(dst, result);
        }
        (Op::SublImm, Operands::RegImm8(reg, imm)) => {
            let before = regs.low(reg);
            let result = before.wrapping_sub(imm);
            regs.set_borrow_byte(result, before);
            regs.set_low(reg, result);
        }
        (Op::Xor, Operands::Pair { dst, src }) => {
            let result = regs.get(dst) ^ regs.get(src);
            regs.set_logic(result == 0);
            regs.set(dst, result);
        }
        (Op::Xorl, Operands::Pair { dst, src }) => {
            let result = regs.low(dst) ^ regs.low(src);
            regs.set_logic(result == 0);
            regs.set_low(dst, result);
        }
        // Register values are compared, never bounds-checked as addresses.
        (Op::Cmp, Operands::Pair { dst, src }) => {
            let (lhs, rhs) = (regs.get(dst), regs.get(src));
            regs.set_compare(lhs, rhs);
        }
        (Op::Cmpl, Operands::Pair { dst, src }) => {
            let (lhs, rhs) = (regs.low(dst), regs.low(src));
            regs.set_compare(lhs, rhs);
        }
        _ => return Err(malformed(instr)),
    }
    Ok(Flow::Continue)
}

fn control(instr: &Instruction, regs: &mut RegisterFile) -> Step {
    let Operands::Addr(target) = instr.operands else {
        return Err(malformed(instr));
    };
    // The target is validated even when the branch is not taken.
    if target as usize >= DATA_SIZE {
        return Err(Fault::OutOfBoundsAddress {
            addr: target as u32,
        });
    }
    let (zf, cf) = (regs.zf, regs.cf);
    let taken = match instr.op() {
        Op::Jmp => true,
        Op::Jz => zf,
        Op::Jnz => !zf,
        Op::Jae => zf || !cf,
        Op::Jbe => zf || cf,
        Op::Jb => cf && !zf,
        Op::Ja => !cf && !zf,
        _ => return Err(malformed(instr)),
    };
    if taken {
        regs.ip = target;
    }
    Ok(Flow::Continue)
}

fn stack(instr: &Instruction, regs: &mut RegisterFile, memory: &mut AddressSpace) -> Step {
    match (instr.op(), instr.operands) {
        (Op::Push, Operands::Reg(reg)) => {
            let value = regs.get(reg);
            memory.push(&mut regs.sp, value)?;
        }
        (Op::Pop, Operands::Reg(reg)) => {
            let value = memory.pop(&mut regs.sp)?;
            regs.set(reg, value);
        }
        _ => return Err(malformed(instr)),
    }
    Ok(Flow::Continue)
}

fn io<C: Console + ?Sized>(
    instr: &Instruction,
    regs: &mut RegisterFile,
    memory: &mut AddressSpace,
    console: &mut C,
) -> Step {
    let value = memory.pop(&mut regs.sp)?;
    match instr.op() {
        Op::PrintInt => {
            console.write(format!("{value}\n").as_bytes())?;
        }
        Op::PrintStr => {
            let text = memory.read_cstr(value)?;
            console.write(text)?;
        }
        Op::ScanStr => {
            let capacity = AddressSpace::cstr_capacity(value)?;
            let line = console.read_line(capacity - 1)?;
            memory.write_cstr(value, &line)?;
        }
        _ => return Err(malformed(instr)),
    }
    Ok(Flow::Continue)
}
