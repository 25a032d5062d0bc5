//! Convenience interfaces for common decoding patterns.
//!
//! [`Parser`] binds a model to the bytes of one dive and answers queries for
//! the date, header fields and profile, building the header on first use.
//!
//! The one-shot functions in this module decode a whole dive, publishing to
//! the [`FromDive`] and [`FromSamples`] traits.

pub mod field;
#[cfg(feature = "std")]
pub mod reader;
pub mod slice;

#[cfg(feature = "std")]
pub use reader::decode as decode_reader;
pub use slice::{Parser, decode as decode_slice};

use crate::sans::sample::{Deco, Event};

use field::{DateTime, FieldValue};

/// Produce receivers for the parts of a dive.
///
/// Header fields are published first, in a fixed order: dive time, maximum
/// depth, atmospheric pressure, salinity, minimum and maximum temperature,
/// dive mode, then the gas mix count followed by each gas mix, and the tank
/// count followed by each tank.
#[allow(unused_variables)]
pub trait FromDive {
    /// Add the date and time the dive started.
    fn add_datetime(&mut self, datetime: DateTime) {}
    /// Add a header field.
    fn add_field(&mut self, field: FieldValue) {}
    /// Retrieve a receiver for the profile, if one exists.
    fn samples(&mut self) -> Option<&mut dyn FromSamples> {
        None
    }
}

/// Receive profile events.
///
/// Events of one logical sample arrive in a fixed order: time, depth,
/// temperature, gas mix change, deco status, alarm events, tank pressure.
/// Not every sample carries every event.
///
/// The default implementation of each method ignores received values.
#[allow(unused_variables)]
pub trait FromSamples {
    /// Add the time in seconds since the start of the dive.
    fn add_time(&mut self, time: u32) {}
    /// Add the depth in metres.
    fn add_depth(&mut self, depth: f64) {}
    /// Add the water temperature in degrees Celsius.
    fn add_temperature(&mut self, temperature: f64) {}
    /// Add a switch to the gas mix with this index.
    fn add_gas_mix(&mut self, index: usize) {}
    /// Add the decompression status.
    fn add_deco(&mut self, deco: Deco) {}
    /// Add the pressure in bar of the tank with this index.
    fn add_pressure(&mut self, tank: usize, pressure: f64) {}
    /// Add an alarm event.
    fn add_event(&mut self, event: Event) {}
}
