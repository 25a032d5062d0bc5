#![no_std]

//! An efficient decoder for dive logs from the Mares Icon HD family of dive
//! computers.
//!
//! Seven models are supported. The Icon HD, Icon HD Net Ready, Puck Pro
//! (Quad Air), Smart, Smart Air and Smart Apnea store a fixed header at the
//! tail of each dive. The Genius stores its header at the start of the dive,
//! followed by a stream of framed, checksummed records.
//!
//! Most users should begin with the [`Parser`](avec::slice::Parser) session
//! or the one-shot functions in the [`avec`] module. The building blocks
//! (bounds-checked reads, record validation, header and profile decoding)
//! live in [`sans`] and neither allocate nor perform I/O.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable reader-based decoder (default).

#[cfg(test)]
extern crate std;

pub mod avec;
pub mod sans;
