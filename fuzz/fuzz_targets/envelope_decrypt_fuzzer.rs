//! Fuzz target for envelope decryption
//!
//! Seals a real envelope, lets the fuzzer corrupt it, then decrypts.
//!
//! # Strategy
//!
//! - Bit flips in the decoded ciphertext or nonce (re-encoded as valid base64)
//! - Raw string replacement of any envelope field
//! - Missing nonce
//! - Decrypting with the wrong pair's secret
//!
//! # Invariants
//!
//! - Decryption NEVER panics
//! - An unmodified envelope always decrypts to the original text
//! - A modified ciphertext, nonce or key NEVER yields plaintext

#![no_main]

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use libfuzzer_sys::fuzz_target;
use parley_crypto::{
    DecryptionError, NONCE_SIZE, SessionId, decrypt_envelope, derive_session_secret,
    encrypt_envelope,
};

#[derive(Debug, Clone, Arbitrary)]
struct EnvelopeScenario {
    sender: String,
    recipient: String,
    plaintext: String,
    nonce: [u8; NONCE_SIZE],
    message_number: u64,
    mutation: Mutation,
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    None,
    FlipCiphertextBit { index: u16, bit: u8 },
    FlipNonceBit { index: u8, bit: u8 },
    DropNonce,
    ReplaceCiphertext(String),
    ReplaceNonce(String),
    ReplaceNumbers { number: String, previous: String },
    WrongPeer(String),
}

fuzz_target!(|scenario: EnvelopeScenario| {
    if scenario.sender.is_empty() || scenario.recipient.is_empty() {
        return;
    }

    let session = SessionId::canonicalize(&scenario.sender, &scenario.recipient);
    let secret = derive_session_secret(&session);
    let mut envelope = encrypt_envelope(
        &scenario.sender,
        &scenario.recipient,
        &scenario.plaintext,
        &secret,
        scenario.nonce,
        scenario.message_number,
    );

    let mut key = secret;
    let tampered = match scenario.mutation {
        Mutation::None => false,
        Mutation::FlipCiphertextBit { index, bit } => {
            let Ok(mut bytes) = BASE64.decode(&envelope.encrypted_content) else {
                unreachable!("sealed ciphertext is valid base64");
            };
            let i = index as usize % bytes.len();
            bytes[i] ^= 1 << (bit % 8);
            envelope.encrypted_content = BASE64.encode(&bytes);
            true
        },
        Mutation::FlipNonceBit { index, bit } => {
            let mut nonce = scenario.nonce;
            nonce[index as usize % NONCE_SIZE] ^= 1 << (bit % 8);
            envelope.nonce = Some(BASE64.encode(nonce));
            true
        },
        Mutation::DropNonce => {
            envelope.nonce = None;
            true
        },
        Mutation::ReplaceCiphertext(text) => {
            let changed = text != envelope.encrypted_content;
            envelope.encrypted_content = text;
            changed
        },
        Mutation::ReplaceNonce(text) => {
            let changed = Some(&text) != envelope.nonce.as_ref();
            envelope.nonce = Some(text);
            changed
        },
        Mutation::ReplaceNumbers { number, previous } => {
            // Numbers are not authenticated
            envelope.message_number = number;
            envelope.previous_message_number = previous;
            false
        },
        Mutation::WrongPeer(other) => {
            let wrong = SessionId::canonicalize(&scenario.sender, &other);
            let changed = wrong.as_key() != session.as_key();
            key = derive_session_secret(&wrong);
            changed
        },
    };

    match decrypt_envelope(&envelope, &key) {
        Ok(plaintext) => {
            assert!(!tampered, "tampered envelope decrypted");
            assert_eq!(plaintext, scenario.plaintext);
        },
        Err(DecryptionError::MissingNonce) => assert!(envelope.nonce.is_none()),
        Err(_) => assert!(tampered, "untampered envelope rejected"),
    }
});
