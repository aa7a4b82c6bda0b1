//! Fuzz target: command decoder
//!
//! Drives arbitrary payloads through `decode` under both policies and
//! checks that anything accepted with in-range levels re-encodes to a
//! payload the strict policy accepts back unchanged.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use smarthome::app::commands::{decode, Command, CommandPolicy, COMMAND_CAPACITY};

fuzz_target!(|data: &[u8]| {
    let _ = decode(data, CommandPolicy::STRICT);

    if let Ok(cmd) = decode(data, CommandPolicy::PERMISSIVE) {
        let wire = cmd.encode();
        assert!(wire.len() <= COMMAND_CAPACITY);

        let in_range = match cmd {
            Command::DeviceControl(levels) => levels.iter().all(|l| l.is_valid()),
            _ => true,
        };
        if in_range {
            assert_eq!(decode(&wire, CommandPolicy::STRICT), Ok(cmd));
        }
    }
});
