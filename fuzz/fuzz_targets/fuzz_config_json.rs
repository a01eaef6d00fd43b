#![no_main]

use audioswitch::config::AppConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary config files must parse or fail cleanly, and whatever parses
    // must serialize back
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = serde_json::from_str::<AppConfig>(s) {
            let _ = serde_json::to_string(&config);
        }
    }
});
