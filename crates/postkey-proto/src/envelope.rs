//! Published envelope and its CBOR wire form.

use bytes::Bytes;
use postkey_crypto::{Fingerprint, IV_SIZE};
use serde::{Deserialize, Serialize};

use crate::{EnvelopeError, Result, SlotLayout, VersionTag};

/// Maximum encoded envelope size accepted by [`Envelope::decode`] (1 MiB).
pub const MAX_ENVELOPE_SIZE: usize = 1024 * 1024;

/// Maximum number of recipient slots in one envelope.
pub const MAX_RECIPIENTS: usize = 4096;

/// Wrapped content key as published for one post.
///
/// # Invariants
///
/// - `version` is fixed at construction. No codec changes it.
/// - `recipients` is `Some` exactly when `version` uses the manifest layout.
/// - Fields are read-only; replacing an envelope produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    version: VersionTag,
    iv: [u8; IV_SIZE],
    payload: Bytes,
    recipients: Option<Vec<Fingerprint>>,
}

/// On-the-wire shape. Kept separate so decoding can reject unknown tags
/// before any layout-specific check runs.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    v: i8,
    #[serde(with = "cbor_bytes")]
    iv: Vec<u8>,
    #[serde(with = "cbor_bytes")]
    payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipients: Option<Vec<Fingerprint>>,
}

impl Envelope {
    pub(crate) fn new(
        version: VersionTag,
        iv: [u8; IV_SIZE],
        payload: impl Into<Bytes>,
        recipients: Option<Vec<Fingerprint>>,
    ) -> Self {
        debug_assert_eq!(
            recipients.is_some(),
            version.layout() == SlotLayout::Manifest,
            "recipient manifest must match layout"
        );
        Self { version, iv, payload: payload.into(), recipients }
    }

    /// Version of the codec that produced this envelope.
    pub fn version(&self) -> VersionTag {
        self.version
    }

    /// Nonce shared by every slot in this envelope.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Encoded slot list.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Recipient fingerprints, in slot order. `None` for combined layouts.
    pub fn recipients(&self) -> Option<&[Fingerprint]> {
        self.recipients.as_deref()
    }

    /// Serialize to CBOR.
    ///
    /// # Errors
    ///
    /// - `CborEncode` if serialization fails
    /// - `TooLarge` if the result exceeds [`MAX_ENVELOPE_SIZE`]
    pub fn encode(&self) -> Result<Vec<u8>> {
        let wire = WireEnvelope {
            v: self.version.wire(),
            iv: self.iv.to_vec(),
            payload: self.payload.to_vec(),
            recipients: self.recipients.clone(),
        };

        let mut out = Vec::new();
        ciborium::ser::into_writer(&wire, &mut out)
            .map_err(|e| EnvelopeError::CborEncode(e.to_string()))?;

        if out.len() > MAX_ENVELOPE_SIZE {
            return Err(EnvelopeError::TooLarge { size: out.len(), max: MAX_ENVELOPE_SIZE });
        }

        Ok(out)
    }

    /// Parse from CBOR.
    ///
    /// The size limit is checked before any parsing happens.
    ///
    /// # Errors
    ///
    /// - `TooLarge` if `bytes` exceeds [`MAX_ENVELOPE_SIZE`]
    /// - `CborDecode` if `bytes` is not a valid envelope map
    /// - `VersionUnsupported` if the tag has no codec
    /// - `Malformed` for a wrong iv length, too many recipients, or a
    ///   manifest that does not match the version's layout
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_ENVELOPE_SIZE {
            return Err(EnvelopeError::TooLarge { size: bytes.len(), max: MAX_ENVELOPE_SIZE });
        }

        let wire: WireEnvelope = ciborium::de::from_reader(bytes)
            .map_err(|e| EnvelopeError::CborDecode(e.to_string()))?;

        let version = VersionTag::try_from(wire.v)?;

        let iv: [u8; IV_SIZE] = wire.iv.as_slice().try_into().map_err(|_| {
            EnvelopeError::Malformed(format!("iv must be {IV_SIZE} bytes, got {}", wire.iv.len()))
        })?;

        if let Some(recipients) = &wire.recipients
            && recipients.len() > MAX_RECIPIENTS
        {
            return Err(EnvelopeError::Malformed(format!(
                "{} recipients exceeds limit of {MAX_RECIPIENTS}",
                recipients.len()
            )));
        }

        match (version.layout(), &wire.recipients) {
            (SlotLayout::Manifest, Some(_)) | (SlotLayout::Combined, None) => {},
            (SlotLayout::Manifest, None) => {
                return Err(EnvelopeError::Malformed(format!(
                    "version {version} requires a recipient manifest"
                )));
            },
            (SlotLayout::Combined, Some(_)) => {
                return Err(EnvelopeError::Malformed(format!(
                    "version {version} must not carry a recipient manifest"
                )));
            },
        }

        Ok(Self { version, iv, payload: Bytes::from(wire.payload), recipients: wire.recipients })
    }
}

/// Encode `Vec<u8>` as a CBOR byte string rather than an array of integers.
pub(crate) mod cbor_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        ciborium::value::Value::deserialize(deserializer).and_then(|value| match value {
            ciborium::value::Value::Bytes(bytes) => Ok(bytes),
            other => Err(serde::de::Error::custom(format!("expected byte string, got {other:?}"))),
        })
    }
}
