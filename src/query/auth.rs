//! `chap-sha1` authentication request.
//!
//! ```text
//! step1    = sha1(password)
//! step2    = sha1(step1)
//! step3    = sha1(salt[0..20] ++ step2)
//! scramble = step1 XOR step3
//! ```
//!
//! The salt is the base64-decoded salt from the server greeting.

use rmpv::Value;
use sha1::{Digest, Sha1};

use super::Query;
use crate::error::{IprotoError, Result};
use crate::protocol::{codes, keys};

/// Mechanism name sent in the auth tuple.
pub const AUTH_MECHANISM: &str = "chap-sha1";

/// Length of a sha1 digest and therefore of the scramble.
pub const SCRAMBLE_SIZE: usize = 20;

/// Compute the `chap-sha1` scramble for a password and decoded salt.
pub fn scramble(password: &str, salt: &[u8]) -> Result<[u8; SCRAMBLE_SIZE]> {
    if salt.len() < SCRAMBLE_SIZE {
        return Err(IprotoError::Auth(format!(
            "salt too short: {} bytes",
            salt.len()
        )));
    }

    let step1 = Sha1::digest(password.as_bytes());
    let step2 = Sha1::digest(step1);

    let mut hasher = Sha1::new();
    hasher.update(&salt[..SCRAMBLE_SIZE]);
    hasher.update(step2);
    let step3 = hasher.finalize();

    let mut out = [0u8; SCRAMBLE_SIZE];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = step1[i] ^ step3[i];
    }
    Ok(out)
}

/// Authentication request, sent once during the handshake.
#[derive(Debug, Clone)]
pub struct Auth {
    user: String,
    password: String,
    salt: Vec<u8>,
}

impl Auth {
    /// `salt` is the decoded greeting salt.
    pub fn new(user: impl Into<String>, password: impl Into<String>, salt: Vec<u8>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            salt,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Query for Auth {
    fn request_code(&self) -> u8 {
        codes::AUTH
    }

    fn pack_body(&self, _default_space: &str, buf: &mut Vec<u8>) -> Result<()> {
        let scramble = scramble(&self.password, &self.salt)?;

        buf.push(0x82);
        buf.push(keys::USER_NAME);
        rmpv::encode::write_value(buf, &Value::from(self.user.as_str()))?;
        buf.push(keys::TUPLE);
        buf.push(0x92);
        rmpv::encode::write_value(buf, &Value::from(AUTH_MECHANISM))?;
        // scramble travels as a raw fixstr
        buf.push(0xa0 | SCRAMBLE_SIZE as u8);
        buf.extend_from_slice(&scramble);
        Ok(())
    }
}
