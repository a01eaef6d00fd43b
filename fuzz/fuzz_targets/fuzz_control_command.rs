#![no_main]

use audioswitch::utils::ControlCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Socket input is untrusted; parsing must never panic
    let line = String::from_utf8_lossy(data);
    if let Ok(command) = line.parse::<ControlCommand>() {
        assert_eq!(command.to_string().parse::<ControlCommand>(), Ok(command));
    }
});
