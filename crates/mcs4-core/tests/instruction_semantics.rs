//! Table-driven coverage of the 46 instruction semantics.

#![allow(clippy::pedantic, clippy::nursery)]

use bitflags as _;
use log as _;
use mcs4_core::{
    step_one, Address, Byte, CoreConfig, CoreState, DclCode, FaultCode, FetchMachine,
    IndexRegister, Nibble, RamLines, RegisterPair, SrcAddress,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn execute(program: &[u8], setup: impl FnOnce(&mut CoreState)) -> CoreState {
    let mut state = CoreState::default();
    state.memory.rom.load_image(program, 0).expect("program fits");
    setup(&mut state);
    let pc = state.registers.pc();
    let retired = step_one(&mut state, &mut FetchMachine::new(), &CoreConfig::default())
        .expect("instruction retires");
    assert_eq!(retired.pc, pc);
    state
}

fn acc_and_carry(state: &CoreState) -> (u8, bool) {
    (state.registers.accumulator().value(), state.registers.carry())
}

#[rstest]
#[case(5, 3, false, 8, false)]
#[case(9, 8, true, 2, true)]
#[case(15, 1, false, 0, true)]
#[case(15, 15, true, 15, true)]
fn add_includes_incoming_carry(
    #[case] acc: u8,
    #[case] reg: u8,
    #[case] carry: bool,
    #[case] expected: u8,
    #[case] carry_out: bool,
) {
    let state = execute(&[0x86], |state| {
        state.registers.set_accumulator(Nibble::new(acc));
        state.registers.set_index(IndexRegister::R6, Nibble::new(reg));
        state.registers.set_carry(carry);
    });
    assert_eq!(acc_and_carry(&state), (expected, carry_out));
}

#[rstest]
#[case(5, 3, false, 2, true)]
#[case(5, 3, true, 1, true)]
#[case(2, 3, false, 15, false)]
#[case(0, 0, false, 0, true)]
fn sub_treats_carry_as_borrow_in(
    #[case] acc: u8,
    #[case] reg: u8,
    #[case] borrow: bool,
    #[case] expected: u8,
    #[case] no_borrow_out: bool,
) {
    let state = execute(&[0x9A], |state| {
        state.registers.set_accumulator(Nibble::new(acc));
        state.registers.set_index(IndexRegister::R10, Nibble::new(reg));
        state.registers.set_carry(borrow);
    });
    assert_eq!(acc_and_carry(&state), (expected, no_borrow_out));
}

#[rstest]
#[case::clb(0xF0, 9, true, 0, false)]
#[case::clc(0xF1, 9, true, 9, false)]
#[case::iac_overflow(0xF2, 15, false, 0, true)]
#[case::iac(0xF2, 4, true, 5, false)]
#[case::cmc(0xF3, 4, true, 4, false)]
#[case::cma(0xF4, 0b1010, true, 0b0101, true)]
#[case::ral(0xF5, 0b1001, false, 0b0010, true)]
#[case::ral_carry_in(0xF5, 0b0001, true, 0b0011, false)]
#[case::rar(0xF6, 0b1001, false, 0b0100, true)]
#[case::rar_carry_in(0xF6, 0b0010, true, 0b1001, false)]
#[case::tcc_set(0xF7, 7, true, 1, false)]
#[case::tcc_clear(0xF7, 7, false, 0, false)]
#[case::dac(0xF8, 5, false, 4, true)]
#[case::dac_borrow(0xF8, 0, true, 15, false)]
#[case::tcs_set(0xF9, 0, true, 10, false)]
#[case::tcs_clear(0xF9, 0, false, 9, false)]
#[case::stc(0xFA, 3, false, 3, true)]
#[case::daa_over_nine(0xFB, 0xA, false, 0, true)]
#[case::daa_noop(0xFB, 5, false, 5, false)]
#[case::daa_carry_in(0xFB, 3, true, 9, true)]
#[case::daa_fifteen(0xFB, 0xF, false, 5, true)]
#[case::kbp_zero(0xFC, 0b0000, true, 0, true)]
#[case::kbp_one(0xFC, 0b0001, false, 1, false)]
#[case::kbp_two(0xFC, 0b0010, false, 2, false)]
#[case::kbp_four(0xFC, 0b0100, false, 3, false)]
#[case::kbp_eight(0xFC, 0b1000, false, 4, false)]
#[case::kbp_many(0xFC, 0b0110, false, 15, false)]
fn accumulator_group(
    #[case] opcode: u8,
    #[case] acc: u8,
    #[case] carry: bool,
    #[case] expected: u8,
    #[case] carry_out: bool,
) {
    let state = execute(&[opcode], |state| {
        state.registers.set_accumulator(Nibble::new(acc));
        state.registers.set_carry(carry);
    });
    assert_eq!(acc_and_carry(&state), (expected, carry_out));
}

#[rstest]
#[case::never(0x0, 0, false, false, false)]
#[case::always(0x8, 3, false, true, true)]
#[case::test_low(0x1, 3, false, false, true)]
#[case::test_high(0x1, 3, false, true, false)]
#[case::not_test_low(0x9, 3, false, true, true)]
#[case::carry(0x2, 3, true, true, true)]
#[case::no_carry(0xA, 3, true, true, false)]
#[case::zero(0x4, 0, false, true, true)]
#[case::nonzero(0xC, 1, false, true, true)]
#[case::zero_or_carry(0x6, 2, true, true, true)]
fn jcn_evaluates_condition_bits(
    #[case] condition: u8,
    #[case] acc: u8,
    #[case] carry: bool,
    #[case] test: bool,
    #[case] jumps: bool,
) {
    let state = execute(&[0x10 | condition, 0x40], |state| {
        state.registers.set_accumulator(Nibble::new(acc));
        state.registers.set_carry(carry);
        state.registers.set_test(test);
    });
    let expected = if jumps { 0x040 } else { 0x002 };
    assert_eq!(state.registers.pc(), Address::new(expected));
}

#[test]
fn nop_changes_only_program_counter_and_counters() {
    let before = CoreState::default();
    let state = execute(&[0x00], |_| {});
    assert_eq!(state.registers.pc(), Address::new(0x001));
    assert_eq!(state.registers.index_registers(), before.registers.index_registers());
    assert_eq!(state.counters.instructions, 1);
}

#[test]
fn fim_loads_both_halves_of_pair() {
    let state = execute(&[0x26, 0xA5], |_| {});
    assert_eq!(state.registers.index(IndexRegister::R6), Nibble::new(0xA));
    assert_eq!(state.registers.index(IndexRegister::R7), Nibble::new(0x5));
    assert_eq!(state.registers.pc(), Address::new(0x002));
}

#[test]
fn src_latches_pair_onto_address_bus() {
    let state = execute(&[0x25], |state| {
        state.registers.set_pair(RegisterPair::P2, Byte::new(0x9C));
    });
    assert_eq!(state.memory.control.src(), SrcAddress::new(Byte::new(0x9C)));
}

#[test]
fn jin_jumps_within_current_page() {
    let state = execute(&[], |state| {
        state.memory.rom.load_image(&[0x35], 0x210).expect("fits");
        state.registers.set_pc(Address::new(0x210));
        state.registers.set_pair(RegisterPair::P2, Byte::new(0x7E));
    });
    assert_eq!(state.registers.pc(), Address::new(0x27E));
}

#[test]
fn jun_and_jms_take_twelve_bit_targets() {
    let state = execute(&[0x4A, 0xBC], |_| {});
    assert_eq!(state.registers.pc(), Address::new(0xABC));
    assert!(state.registers.stack().is_empty());

    let state = execute(&[0x5A, 0xBC], |_| {});
    assert_eq!(state.registers.pc(), Address::new(0xABC));
    assert_eq!(state.registers.stack().entries(), &[Address::new(0x002)]);
}

#[test]
fn bbl_pops_and_loads_accumulator() {
    let state = execute(&[0xCE], |state| {
        state.registers.stack_mut().push_evicting(Address::new(0x345));
    });
    assert_eq!(state.registers.pc(), Address::new(0x345));
    assert_eq!(state.registers.accumulator(), Nibble::new(0xE));
    assert!(state.registers.stack().is_empty());
}

#[rstest]
#[case(0x0, 0x1, 0x040)]
#[case(0xE, 0xF, 0x040)]
#[case(0xF, 0x0, 0x002)]
fn isz_skips_only_on_wrap(#[case] start: u8, #[case] after: u8, #[case] pc: u16) {
    let state = execute(&[0x7B, 0x40], |state| {
        state.registers.set_index(IndexRegister::R11, Nibble::new(start));
        state.registers.set_carry(true);
    });
    assert_eq!(state.registers.index(IndexRegister::R11), Nibble::new(after));
    assert_eq!(state.registers.pc(), Address::new(pc));
    assert!(state.registers.carry());
}

#[test]
fn ld_and_ldm_load_accumulator() {
    let state = execute(&[0xA3], |state| {
        state.registers.set_index(IndexRegister::R3, Nibble::new(0xB));
    });
    assert_eq!(state.registers.accumulator(), Nibble::new(0xB));

    let state = execute(&[0xD8], |_| {});
    assert_eq!(state.registers.accumulator(), Nibble::new(8));
}

#[test]
fn fin_fetches_indirect_through_pair_zero() {
    let state = execute(&[0x34], |state| {
        state.memory.rom.load_image(&[0xC3], 0x0A0).expect("fits");
        state.registers.set_pair(RegisterPair::P0, Byte::new(0xA0));
    });
    assert_eq!(state.registers.pair(RegisterPair::P2), Byte::new(0xC3));
}

#[rstest]
#[case::wr0(0xE4, 0)]
#[case::wr1(0xE5, 1)]
#[case::wr2(0xE6, 2)]
#[case::wr3(0xE7, 3)]
fn status_writes_target_src_register(#[case] opcode: u8, #[case] index: usize) {
    let state = execute(&[opcode], |state| {
        state
            .memory
            .control
            .latch_src(SrcAddress::new(Byte::new(0b10_01_0000)));
        state.registers.set_accumulator(Nibble::new(0x6));
    });
    let bank = state.memory.ram.bank(2).expect("bank 2");
    assert_eq!(bank.status(1, index), Ok(Nibble::new(0x6)));
}

#[rstest]
#[case::rd0(0xEC, 0)]
#[case::rd1(0xED, 1)]
#[case::rd2(0xEE, 2)]
#[case::rd3(0xEF, 3)]
fn status_reads_target_src_register(#[case] opcode: u8, #[case] index: usize) {
    let state = execute(&[opcode], |state| {
        state
            .memory
            .ram
            .bank_mut(0)
            .expect("bank 0")
            .set_status(3, index, Nibble::new(0xD))
            .expect("in range");
        state
            .memory
            .control
            .latch_src(SrcAddress::new(Byte::new(0b00_11_0000)));
    });
    assert_eq!(state.registers.accumulator(), Nibble::new(0xD));
}

#[test]
fn rdm_adm_read_addressed_character() {
    let setup = |state: &mut CoreState| {
        state
            .memory
            .ram
            .bank_mut(1)
            .expect("bank 1")
            .set_character(2, 7, Nibble::new(9))
            .expect("in range");
        state
            .memory
            .control
            .latch_src(SrcAddress::new(Byte::new(0b01_10_0111)));
        state.registers.set_accumulator(Nibble::new(8));
    };
    let state = execute(&[0xE9], setup);
    assert_eq!(state.registers.accumulator(), Nibble::new(9));

    let state = execute(&[0xEB], setup);
    assert_eq!(acc_and_carry(&state), (1, true));
}

#[test]
fn wmp_latches_output_port_of_selected_banks() {
    let state = execute(&[0xE1], |state| {
        state.memory.control.designate(DclCode::from_accumulator(Nibble::new(0b101)));
        state.registers.set_accumulator(Nibble::new(0x3));
    });
    assert_eq!(state.memory.control.ram_lines(), RamLines::CM_RAM1 | RamLines::CM_RAM3);
    for bank in [4, 12] {
        assert_eq!(state.memory.ram.bank(bank).expect("bank").output_port(), Nibble::new(0x3));
    }
    assert_eq!(state.memory.ram.bank(0).expect("bank").output_port(), Nibble::ZERO);
}

#[test]
fn wpm_retires_without_effect() {
    let before = CoreState::default();
    let state = execute(&[0xE3], |_| {});
    assert_eq!(state.registers, {
        let mut expected = before.registers.clone();
        expected.set_pc(Address::new(0x001));
        expected
    });
    assert_eq!(state.memory.ram, before.memory.ram);
}

#[rstest]
#[case(0b000, RamLines::CM_RAM0)]
#[case(0b011, RamLines::CM_RAM1.union(RamLines::CM_RAM2))]
#[case(0b111, RamLines::CM_RAM1.union(RamLines::CM_RAM2).union(RamLines::CM_RAM3))]
#[case(0b1100, RamLines::CM_RAM3)]
fn dcl_selects_lines_from_accumulator(#[case] acc: u8, #[case] lines: RamLines) {
    let state = execute(&[0xFD], |state| {
        state.registers.set_accumulator(Nibble::new(acc));
    });
    assert_eq!(state.memory.control.ram_lines(), lines);
}

#[test]
fn undefined_encodings_fault_without_side_effects() {
    for opcode in [0xFE_u8, 0xFF] {
        let mut state = CoreState::default();
        state.memory.rom.load_image(&[opcode], 0).expect("fits");
        let before = state.clone();
        let error = step_one(&mut state, &mut FetchMachine::new(), &CoreConfig::default())
            .expect_err("undefined");
        assert_eq!(error.code(), FaultCode::UnknownOpcode);
        assert_eq!(state, before);
    }
}

#[test]
fn every_defined_first_byte_retires_or_faults_precisely() {
    for first in 0x00_u8..=0xFD {
        let mut state = CoreState::default();
        state.memory.rom.load_image(&[first, 0x00], 0).expect("fits");
        let before = state.clone();
        match step_one(&mut state, &mut FetchMachine::new(), &CoreConfig::default()) {
            Ok(retired) => assert_eq!(retired.pc, Address::ZERO),
            Err(error) => {
                assert_eq!(error.code(), FaultCode::StackUnderflow, "{first:02X}");
                assert_eq!(state, before);
            }
        }
    }
}
