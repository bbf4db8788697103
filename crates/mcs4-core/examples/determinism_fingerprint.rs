//! Prints a fingerprint of the machine state after a fixed BCD program, for
//! comparing builds across hosts.

use std::collections::BTreeSet;

use bitflags as _;
use log as _;
use mcs4_core::{Address, EmulatorEngine, RAM_BANK_COUNT};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

/// 58 + 67 in decimal, digit by digit, stored to bank 0 register 0.
const PROGRAM: [u8; 28] = [
    0x20, 0x00, 0xD8, 0xB2, 0xD7, 0xB3, 0xF1, 0xA2, 0x83, 0xFB, 0x21, 0xE0, 0xD5, 0xB2, 0xD6,
    0xB3, 0xA2, 0x83, 0xFB, 0x61, 0x21, 0xE0, 0xF7, 0x61, 0x21, 0xE0, 0x40, 0x1A,
];

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn fingerprint() -> String {
    let mut engine = EmulatorEngine::default();
    engine
        .load_rom_image(&PROGRAM, 0)
        .expect("program should fit");
    let outcome = engine
        .run_to_breakpoint_within(&BTreeSet::from([Address::new(0x01A)]), 1_000)
        .expect("program should not fault");

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_bytes(&mut hash, &outcome.instructions.to_le_bytes());
    hash_bytes(&mut hash, &outcome.cycles.to_le_bytes());

    let snapshot = engine.snapshot();
    hash_bytes(&mut hash, &snapshot.pc.value().to_le_bytes());
    hash_bytes(
        &mut hash,
        &[
            snapshot.accumulator.value(),
            u8::from(snapshot.carry),
            snapshot.ram_bank,
            snapshot.src_address.value(),
        ],
    );
    for register in snapshot.index_registers {
        hash_bytes(&mut hash, &[register.value()]);
    }
    for bank in 0..RAM_BANK_COUNT {
        let image = engine.read_ram_bank(bank).expect("bank index in range");
        for character in image.iter().flatten() {
            hash_bytes(&mut hash, &[character.value()]);
        }
    }

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
