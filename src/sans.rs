//! Allocation-free building blocks for decoding dives.
//!
//! This module is intended for applications that need fine control over
//! decoding, such as those running on embedded systems. See [`crate::avec`]
//! for interfaces covering common decoding patterns.
//!
//! # Architecture
//!
//! Decoding a dive happens in two stages over the same bytes:
//!
//! 1. [`header::Header::parse`] validates the dive and derives its mode,
//!    profile geometry, gas mixes and tanks. Legacy dives are checked for an
//!    exact size match; anything after the stored length is ignored.
//!
//! 2. [`sample::Samples`] walks the profile using the header, yielding
//!    events one logical sample at a time. On the Genius, every record is
//!    validated (see [`record`]) as it is reached, so a corrupt record late in
//!    a profile only fails iteration once it is reached.
//!
//! All reads are bounds-checked through [`bytes`].

pub mod bytes;
pub mod check;
pub mod header;
pub mod record;
pub mod sample;
