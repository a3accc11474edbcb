//! Symmetric content key protecting one post body.

use zeroize::Zeroize;

use crate::CryptoError;

/// Size of a content key in bytes.
pub const CONTENT_KEY_SIZE: usize = 32;

/// Ephemeral symmetric key for one post.
///
/// Never persisted in the clear. It only exists transiently inside wrap and
/// unwrap calls and is zeroized when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey {
    bytes: [u8; CONTENT_KEY_SIZE],
}

impl ContentKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Parse from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; CONTENT_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength { expected: CONTENT_KEY_SIZE, actual: bytes.len() }
        })?;
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}
