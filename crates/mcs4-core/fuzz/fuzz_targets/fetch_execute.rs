#![no_main]

use libfuzzer_sys::fuzz_target;
use mcs4_core::{
    decode, Byte, CoreConfig, EmulatorEngine, FetchMachine, FetchStatus, Nibble,
    StackOverflowPolicy,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let _ = decode(Byte::new(data[0]), Byte::new(data[1]));

    // Drive the fetch machine with raw nibbles, including out-of-sequence calls.
    let mut fetch = FetchMachine::new();
    for byte in data.iter().take(16) {
        match byte >> 6 {
            0 => {
                let _ = fetch.begin();
            }
            1 => {
                let _ = fetch.take();
            }
            _ => {
                if let Ok(FetchStatus::Complete) = fetch.feed(Nibble::new(*byte)) {
                    let _ = fetch.take();
                }
            }
        }
    }

    let config = CoreConfig {
        run_cycle_budget: 256,
        stack_overflow: if data[2] & 1 == 0 {
            StackOverflowPolicy::EvictOldest
        } else {
            StackOverflowPolicy::Fault
        },
        tracing_enabled: false,
    };
    let mut engine = EmulatorEngine::new(config);
    let image = &data[3..data.len().min(3 + 4096)];
    if engine.load_rom_image(image, 0).is_err() {
        return;
    }
    engine.set_test(data[2] & 2 != 0);
    let before = engine.snapshot();
    if engine.step().is_err() {
        assert_eq!(engine.snapshot().pc, before.pc);
        return;
    }
    let _ = engine.run(256);
});
