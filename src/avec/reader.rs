//! Reader-based decoder implementation.
//!
//! _Requires Cargo feature `std`._

use std::{io::Read, vec::Vec};

use thiserror::Error;

use crate::sans::header::Model;

use super::{FromDive, slice};

extern crate std;

/// Errors occurring while decoding from a reader.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An error decoding the bytes read.
    #[error(transparent)]
    Decode(#[from] slice::Error),
}

/// Decode a dive from a reader, publishing to a receiver.
///
/// The reader is consumed to its end; everything read is taken to be one
/// dive as downloaded from the computer.
///
/// This method is also re-exported as `regulator::avec::decode_reader`.
///
/// _Requires Cargo feature `std`._
pub fn decode(r: &mut impl Read, model: Model, o: &mut impl FromDive) -> Result<(), Error> {
    let mut data = Vec::new();
    r.read_to_end(&mut data)?;

    log::debug!("Read {} bytes of {model:?} dive.", data.len());

    Ok(slice::decode(&data, model, o)?)
}
