//! Server greeting banner.
//!
//! The server opens every connection with a fixed 128-byte banner:
//! ```text
//! bytes   0..64   version line ("Tarantool 2.11.1 (Binary) <uuid>\n", space padded)
//! bytes  64..108  base64 auth salt
//! bytes 108..128  padding
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::wire_format::{GREETING_SALT_SIZE, GREETING_SIZE, GREETING_VERSION_SIZE};
use crate::error::{IprotoError, Result};

/// Greeting metadata kept on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Raw version bytes (64).
    pub version: Bytes,
    /// Raw base64 salt bytes (44).
    pub salt: Bytes,
}

impl Greeting {
    /// Split a raw banner into version and salt.
    pub fn parse(raw: &[u8; GREETING_SIZE]) -> Self {
        let raw = Bytes::copy_from_slice(raw);
        Self {
            version: raw.slice(..GREETING_VERSION_SIZE),
            salt: raw.slice(GREETING_VERSION_SIZE..GREETING_VERSION_SIZE + GREETING_SALT_SIZE),
        }
    }

    /// Read the banner from the stream.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; GREETING_SIZE];
        reader.read_exact(&mut raw).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                IprotoError::Protocol("Connection closed before greeting".to_string())
            } else {
                IprotoError::Io(e)
            }
        })?;
        Ok(Self::parse(&raw))
    }

    /// Version line without padding.
    pub fn version_line(&self) -> String {
        String::from_utf8_lossy(&self.version)
            .trim_end_matches(['\0', ' ', '\n'])
            .to_string()
    }

    /// Decoded salt bytes, as used by `chap-sha1`.
    pub fn decoded_salt(&self) -> Result<Vec<u8>> {
        let trimmed: Vec<u8> = self
            .salt
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace() && *b != 0)
            .collect();
        Ok(BASE64.decode(trimmed)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_SALT: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

    pub(crate) fn raw_greeting(version: &str, salt: &str) -> [u8; GREETING_SIZE] {
        let mut raw = [b' '; GREETING_SIZE];
        raw[..version.len()].copy_from_slice(version.as_bytes());
        raw[GREETING_VERSION_SIZE - 1] = b'\n';
        raw[GREETING_VERSION_SIZE..GREETING_VERSION_SIZE + salt.len()]
            .copy_from_slice(salt.as_bytes());
        raw[GREETING_SIZE - 1] = b'\n';
        raw
    }

    #[test]
    fn test_parse_splits_version_and_salt() {
        let raw = raw_greeting("Tarantool 2.11.1 (Binary)", TEST_SALT);
        let greeting = Greeting::parse(&raw);

        assert_eq!(greeting.version.len(), GREETING_VERSION_SIZE);
        assert_eq!(greeting.salt.len(), GREETING_SALT_SIZE);
        assert_eq!(greeting.version_line(), "Tarantool 2.11.1 (Binary)");
        assert_eq!(&greeting.salt[..], TEST_SALT.as_bytes());
    }

    #[test]
    fn test_decoded_salt() {
        let greeting = Greeting::parse(&raw_greeting("Tarantool", TEST_SALT));
        let salt = greeting.decoded_salt().unwrap();
        assert_eq!(salt, (0u8..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_decoded_salt_rejects_garbage() {
        let greeting = Greeting::parse(&raw_greeting("Tarantool", "!!!!not-base64!!!!"));
        assert!(matches!(greeting.decoded_salt(), Err(IprotoError::Salt(_))));
    }

    #[tokio::test]
    async fn test_read_short_greeting() {
        let short = [b' '; 100];
        let err = Greeting::read(&mut &short[..]).await.unwrap_err();
        assert!(matches!(err, IprotoError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_full_greeting() {
        let raw = raw_greeting("Tarantool 3.0.0", TEST_SALT);
        let greeting = Greeting::read(&mut &raw[..]).await.unwrap();
        assert_eq!(greeting.version_line(), "Tarantool 3.0.0");
    }
}
