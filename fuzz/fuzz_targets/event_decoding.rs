#![no_main]

//! Fuzz target for event envelope decoding.
//!
//! Decoding runs on verified but otherwise arbitrary bytes; it must reject
//! garbage without panicking and keep accepted envelopes intact.

use hookline_core::Event;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(event) = Event::from_slice(data) {
        let encoded = serde_json::to_vec(&event).expect("decoded events serialize");
        let decoded = Event::from_slice(&encoded).expect("serialized events decode");
        assert_eq!(decoded.id, event.id);
        assert_eq!(decoded.event_type, event.event_type);
    }
});
