#![no_main]

//! Fuzz target for signature header parsing and verification.
//!
//! The first byte splits the input into a header and a body. Verification
//! must never panic, and anything it accepts must round-trip through the
//! header generator.

use std::time::Duration;

use hookline_api::crypto::{generate_signature_header, SignatureHeader, SignatureVerifier, SigningSecret};
use libfuzzer_sys::fuzz_target;

const NOW: i64 = 1_700_000_000;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (header_bytes, body) = rest.split_at(split);
    let header = String::from_utf8_lossy(header_bytes);

    let secrets = vec![SigningSecret::from("whsec_fuzz"), SigningSecret::new(header_bytes)];
    let verifier = SignatureVerifier::new(secrets.clone(), Duration::from_secs(300));

    if let Ok(parsed) = header.parse::<SignatureHeader>() {
        let reparsed: SignatureHeader =
            parsed.to_string().parse().expect("displayed header must parse");
        assert_eq!(reparsed, parsed);
    }

    let _ = verifier.verify(body, &header, NOW);

    // A header we generate ourselves must always verify.
    let generated = generate_signature_header(&secrets, NOW, body).expect("HMAC accepts any key");
    assert!(verifier.verify(body, &generated, NOW).is_ok());
});
