#![no_main]
use libfuzzer_sys::fuzz_target;
use tracescope_log::{EventLog, TracePayload};
use tracescope_replay::reconstruct;

// First two bytes pick the step, the rest is the trace
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let step = i64::from(i16::from_le_bytes([data[0], data[1]]));
    let Ok(text) = std::str::from_utf8(&data[2..]) else {
        return;
    };
    if let Ok(payload) = TracePayload::from_json(text) {
        let log = EventLog::from_payload(payload);
        let state = reconstruct(log.events(), step);
        let _ = state.call_tree().walk();
    }
});
