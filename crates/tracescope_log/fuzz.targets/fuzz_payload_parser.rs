#![no_main]
use libfuzzer_sys::fuzz_target;
use tracescope_log::TracePayload;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(payload) = TracePayload::from_json(text) {
        let _ = payload.source_lines();
        let _ = payload.to_json_pretty();
    }
});
