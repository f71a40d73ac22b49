//! Short code encoders.
//!
//! A link id is turned into its short code by a positional encoding over a
//! fixed alphabet, most significant digit first. Zero encodes to the first
//! alphabet character.

use thiserror::Error;

use crate::config::EncoderKind;

/// Errors produced when decoding a short code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("empty code")]
    Empty,
    #[error("invalid character {0:?} in code")]
    InvalidChar(char),
    #[error("code overflows a 64-bit id")]
    Overflow,
}

/// Converts between numeric link ids and short codes.
pub trait Encoder: Send + Sync {
    fn encode(&self, value: u64) -> String;
    fn decode(&self, code: &str) -> Result<u64, CodecError>;
}

const BASE62_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+-";

/// Base62 encoder (`A-Z a-z 0-9`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Base62;

/// URL-safe base64 positional encoder (`A-Z a-z 0-9 + -`), 6 bits per digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64;

fn encode_with(alphabet: &[u8], mut value: u64) -> String {
    let radix = alphabet.len() as u64;
    if value == 0 {
        return (alphabet[0] as char).to_string();
    }
    let mut digits = Vec::with_capacity(11);
    while value > 0 {
        digits.push(alphabet[(value % radix) as usize]);
        value /= radix;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

fn decode_with(alphabet: &[u8], code: &str) -> Result<u64, CodecError> {
    if code.is_empty() {
        return Err(CodecError::Empty);
    }
    let radix = alphabet.len() as u64;
    code.chars().try_fold(0u64, |acc, c| {
        let digit = alphabet
            .iter()
            .position(|&b| b as char == c)
            .ok_or(CodecError::InvalidChar(c))? as u64;
        acc.checked_mul(radix)
            .and_then(|v| v.checked_add(digit))
            .ok_or(CodecError::Overflow)
    })
}

impl Encoder for Base62 {
    fn encode(&self, value: u64) -> String {
        encode_with(BASE62_ALPHABET, value)
    }

    fn decode(&self, code: &str) -> Result<u64, CodecError> {
        decode_with(BASE62_ALPHABET, code)
    }
}

impl Encoder for Base64 {
    fn encode(&self, value: u64) -> String {
        encode_with(BASE64_ALPHABET, value)
    }

    fn decode(&self, code: &str) -> Result<u64, CodecError> {
        decode_with(BASE64_ALPHABET, code)
    }
}

/// Resolve the configured encoder.
pub fn encoder(kind: EncoderKind) -> &'static dyn Encoder {
    match kind {
        EncoderKind::Base62 => &Base62,
        EncoderKind::Base64 => &Base64,
    }
}
