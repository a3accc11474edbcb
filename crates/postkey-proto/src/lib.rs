//! Postkey envelope protocol.
//!
//! An [`Envelope`] is the published, wrapped form of a post's content key.
//! Every envelope is tagged with the [`VersionTag`] of the codec that
//! produced it, and that tag never changes. Codecs for retired versions stay
//! in the tree forever: old posts must remain readable, and the share-target
//! protocol still appends recipients to them.
//!
//! # Versions
//!
//! | tag   | layout   | locator | extension                      |
//! |-------|----------|---------|--------------------------------|
//! | `-40` | combined | legacy  | owner regenerates all slots    |
//! | `-39` | combined | current | owner regenerates all slots    |
//! | `-38` | manifest | current | append slots, existing intact  |
//!
//! # Invariants
//!
//! - The version set is closed. Dispatch is an exhaustive `match` over
//!   [`VersionTag`]; an unknown tag can only appear while decoding bytes,
//!   where it becomes [`EnvelopeError::VersionUnsupported`].
//! - A wire format is never altered after release. New requirements become a
//!   new tag.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
mod envelope;
mod errors;
mod version;

pub use codec::{extend, unwrap, wrap};
pub use envelope::{Envelope, MAX_ENVELOPE_SIZE, MAX_RECIPIENTS};
pub use errors::{EnvelopeError, Result};
pub use version::{SlotLayout, VersionTag};
