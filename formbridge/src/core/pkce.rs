//! PKCE verifier/challenge pairs and opaque anti-CSRF state.
//!
//! Random material comes from the operating system RNG. Everything is encoded
//! as URL-safe base64 without padding so it can travel in query strings and
//! cookies unchanged.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::AuthorizationError;

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Code verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

pub fn generate_challenge_pair() -> PkcePair {
    let verifier = random_token(VERIFIER_BYTES);
    let challenge = challenge_for(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}

/// S256 challenge: base64url(SHA-256(ascii bytes of the encoded verifier)).
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub fn generate_state() -> String {
    random_token(STATE_BYTES)
}

/// `len` random bytes, base64url encoded without padding.
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare the state stored before the redirect with the one returned by the
/// provider. Both must be present and exactly equal.
pub fn verify_state(stored: Option<&str>, returned: Option<&str>) -> Result<(), AuthorizationError> {
    match (stored, returned) {
        (Some(stored), Some(returned)) if stored == returned => Ok(()),
        (Some(_), Some(_)) => Err(AuthorizationError::StateMismatch),
        _ => Err(AuthorizationError::MissingState),
    }
}
