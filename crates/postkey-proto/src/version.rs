//! Protocol version tags.

use crate::EnvelopeError;

/// How an envelope represents multiple recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLayout {
    /// One anonymous list of slots. Unwrap trial-decrypts; only the owner,
    /// who holds the sealed roster, can regenerate it.
    Combined,
    /// Slots indexed by a plaintext fingerprint manifest. Appendable.
    Manifest,
}

/// Closed set of envelope versions.
///
/// Wire values are negative, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionTag {
    /// `-40`: combined slots, published at the legacy `(post, author)` locator
    V40,
    /// `-39`: combined slots, published at the current locator
    V39,
    /// `-38`: per-recipient manifest, published at the current locator
    V38,
}

impl VersionTag {
    /// Every supported version, oldest first.
    pub const ALL: [Self; 3] = [Self::V40, Self::V39, Self::V38];

    /// Version used for new posts.
    pub const LATEST: Self = Self::V38;

    /// Tag as written on the wire.
    #[must_use]
    pub const fn wire(self) -> i8 {
        match self {
            Self::V40 => -40,
            Self::V39 => -39,
            Self::V38 => -38,
        }
    }

    /// Parse a wire tag. `None` for tags no codec handles.
    #[must_use]
    pub const fn from_wire(tag: i8) -> Option<Self> {
        match tag {
            -40 => Some(Self::V40),
            -39 => Some(Self::V39),
            -38 => Some(Self::V38),
            _ => None,
        }
    }

    /// Recipient representation used by this version.
    #[must_use]
    pub const fn layout(self) -> SlotLayout {
        match self {
            Self::V40 | Self::V39 => SlotLayout::Combined,
            Self::V38 => SlotLayout::Manifest,
        }
    }

    /// Whether envelopes of this version live at the legacy locator.
    #[must_use]
    pub const fn uses_legacy_locator(self) -> bool {
        matches!(self, Self::V40)
    }

    /// Context label bound into every slot of this version.
    pub(crate) const fn context(self) -> &'static [u8] {
        match self {
            Self::V40 => b"postkey/alpha-40",
            Self::V39 => b"postkey/alpha-39",
            Self::V38 => b"postkey/alpha-38",
        }
    }
}

impl TryFrom<i8> for VersionTag {
    type Error = EnvelopeError;

    fn try_from(tag: i8) -> Result<Self, Self::Error> {
        Self::from_wire(tag).ok_or(EnvelopeError::VersionUnsupported(tag))
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire())
    }
}

impl std::str::FromStr for VersionTag {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag: i8 = s
            .trim()
            .parse()
            .map_err(|_| EnvelopeError::Malformed(format!("invalid version tag: {s:?}")))?;
        Self::try_from(tag)
    }
}
