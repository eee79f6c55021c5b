use proptest::prelude::*;
use vm16_core::{BufferConsole, Flow, Machine, Reg};

fn reg() -> impl Strategy<Value = Reg> {
    (0u8..4).prop_map(|n| Reg::new(n).unwrap())
}

fn pair(dst: Reg, src: Reg) -> u8 {
    ((dst.index() as u8) << 4) | src.index() as u8
}

/// Machine with `bytes` at 0 and the given register values, flags preset.
fn machine(bytes: &[u8], gprs: [u16; 4], zf: bool, cf: bool) -> Machine {
    let mut machine = Machine::with_image(bytes).unwrap();
    for (reg, value) in Reg::all().zip(gprs) {
        machine.regs.set(reg, value);
    }
    machine.regs.zf = zf;
    machine.regs.cf = cf;
    machine
}

fn step(machine: &mut Machine) {
    let flow = machine.step(&mut BufferConsole::buffered("")).unwrap();
    assert_eq!(flow, Flow::Continue);
}

proptest! {
    #[test]
    fn mov_copies_without_touching_flags(
        gprs in any::<[u16; 4]>(), dst in reg(), src in reg(), zf in any::<bool>(), cf in any::<bool>()
    ) {
        let mut m = machine(&[0x10, pair(dst, src)], gprs, zf, cf);
        step(&mut m);
        prop_assert_eq!(m.regs.get(dst), gprs[src.index()]);
        prop_assert_eq!((m.regs.zf, m.regs.cf), (zf, cf));
        prop_assert_eq!(m.regs.ip, 2);
    }

    #[test]
    fn add_sets_zero_and_carry(gprs in any::<[u16; 4]>(), dst in reg(), src in reg()) {
        let mut m = machine(&[0xA5, pair(dst, src)], gprs, false, false);
        step(&mut m);
        let before = gprs[dst.index()];
        let result = before.wrapping_add(gprs[src.index()]);
        prop_assert_eq!(m.regs.get(dst), result);
        prop_assert_eq!(m.regs.zf, result == 0);
        prop_assert_eq!(m.regs.cf, result < before);
    }

    #[test]
    fn sub_immediate_borrows(value in any::<u16>(), imm in any::<u16>(), dst in reg()) {
        let [lo, hi] = imm.to_le_bytes();
        let mut gprs = [0; 4];
        gprs[dst.index()] = value;
        let mut m = machine(&[0x5B, dst.index() as u8, lo, hi], gprs, false, false);
        step(&mut m);
        prop_assert_eq!(m.regs.get(dst), value.wrapping_sub(imm));
        prop_assert_eq!(m.regs.cf, imm > value);
        prop_assert_eq!(m.regs.zf, value == imm);
    }

    #[test]
    fn add_immediate_sets_zero_and_carry(value in any::<u16>(), imm in any::<u16>(), dst in reg()) {
        let [lo, hi] = imm.to_le_bytes();
        let mut gprs = [0; 4];
        gprs[dst.index()] = value;
        let mut m = machine(&[0xAD, dst.index() as u8, lo, hi], gprs, false, false);
        step(&mut m);
        let result = value.wrapping_add(imm);
        prop_assert_eq!(m.regs.get(dst), result);
        prop_assert_eq!(m.regs.zf, result == 0);
        prop_assert_eq!(m.regs.cf, result < value);
    }

    #[test]
    fn sub_register_borrows(gprs in any::<[u16; 4]>(), dst in reg(), src in reg()) {
        let mut m = machine(&[0x5C, pair(dst, src)], gprs, false, false);
        step(&mut m);
        let before = gprs[dst.index()];
        let result = before.wrapping_sub(gprs[src.index()]);
        prop_assert_eq!(m.regs.get(dst), result);
        prop_assert_eq!(m.regs.zf, result == 0);
        prop_assert_eq!(m.regs.cf, result > before);
    }

    #[test]
    fn low_byte_immediate_ops_wrap_within_byte(
        value in any::<u16>(), imm in any::<u8>(), dst in reg(), add in any::<bool>()
    ) {
        let opcode = if add { 0xA1 } else { 0x51 };
        let mut gprs = [0; 4];
        gprs[dst.index()] = value;
        let mut m = machine(&[opcode, dst.index() as u8, imm], gprs, false, false);
        step(&mut m);
        let before = value as u8;
        let result = if add { before.wrapping_add(imm) } else { before.wrapping_sub(imm) };
        prop_assert_eq!(m.regs.get(dst), (value & 0xFF00) | result as u16);
        prop_assert_eq!(m.regs.zf, result == 0);
        let carry = if add { result < before } else { result > before };
        prop_assert_eq!(m.regs.cf, carry);
    }

    #[test]
    fn low_byte_register_ops_wrap_within_byte(
        gprs in any::<[u16; 4]>(), dst in reg(), src in reg(), add in any::<bool>()
    ) {
        let opcode = if add { 0xA2 } else { 0x5D };
        let mut m = machine(&[opcode, pair(dst, src)], gprs, false, false);
        step(&mut m);
        let before = gprs[dst.index()] as u8;
        let operand = gprs[src.index()] as u8;
        let result = if add { before.wrapping_add(operand) } else { before.wrapping_sub(operand) };
        prop_assert_eq!(m.regs.get(dst), (gprs[dst.index()] & 0xFF00) | result as u16);
        prop_assert_eq!(m.regs.zf, result == 0);
        let carry = if add { result < before } else { result > before };
        prop_assert_eq!(m.regs.cf, carry);
    }

    #[test]
    fn push_then_pop_restores_value(gprs in any::<[u16; 4]>(), src in reg(), dst in reg()) {
        let mut m = machine(&[0xAF, src.index() as u8, 0xAE, dst.index() as u8], gprs, false, false);
        step(&mut m);
        step(&mut m);
        prop_assert_eq!(m.regs.get(dst), gprs[src.index()]);
        prop_assert_eq!(m.regs.sp, 256);
    }

    #[test]
    fn movx_clears_high_byte(old in any::<u16>(), imm in any::<u8>(), dst in reg()) {
        let mut gprs = [0; 4];
        gprs[dst.index()] = old;
        let mut m = machine(&[0x16, dst.index() as u8, imm], gprs, false, false);
        step(&mut m);
        prop_assert_eq!(m.regs.get(dst), imm as u16);
    }

    #[test]
    fn xor_with_self_clears(gprs in any::<[u16; 4]>(), dst in reg(), cf in any::<bool>()) {
        let mut m = machine(&[0xF0, pair(dst, dst)], gprs, false, cf);
        step(&mut m);
        prop_assert_eq!(m.regs.get(dst), 0);
        prop_assert!(m.regs.zf);
        prop_assert!(!m.regs.cf);
    }

    #[test]
    fn low_byte_ops_keep_high_byte(gprs in any::<[u16; 4]>(), dst in reg(), src in reg(), op in prop::sample::select(vec![0xA2u8, 0x5D, 0xF1])) {
        let mut m = machine(&[op, pair(dst, src)], gprs, false, false);
        step(&mut m);
        prop_assert_eq!(m.regs.get(dst) & 0xFF00, gprs[dst.index()] & 0xFF00);
    }

    #[test]
    fn compare_leaves_registers_alone(gprs in any::<[u16; 4]>(), dst in reg(), src in reg()) {
        let mut m = machine(&[0x70, pair(dst, src)], gprs, false, false);
        step(&mut m);
        let (lhs, rhs) = (gprs[dst.index()], gprs[src.index()]);
        prop_assert_eq!(m.regs.gprs(), gprs);
        prop_assert_eq!(m.regs.zf, lhs == rhs);
        prop_assert_eq!(m.regs.cf, rhs > lhs);
    }
}
