//! Slice-based decoder implementation.

use core::cell::OnceCell;

use thiserror::Error;

use crate::sans::{
    header::{Header, HeaderError, Model},
    sample::{Sample, SampleError, Samples},
};

use super::{
    FromDive, FromSamples,
    field::{self, DateTime, FieldError, FieldKind, FieldValue},
};

/// Errors occurring while decoding from a slice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The dive header is malformed.
    #[error("Invalid dive header: {0}")]
    Header(#[from] HeaderError),
    /// The profile is malformed.
    #[error("Invalid profile: {0}")]
    Sample(#[from] SampleError),
    /// A field could not be read.
    #[error("Invalid field: {0}")]
    Field(#[from] FieldError),
}

/// Broad classes of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The data is malformed, truncated or corrupt.
    DataFormat,
    /// The request, object version or gas mix/tank index is not available.
    Unsupported,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Header(HeaderError::UnsupportedObject { .. })
            | Self::Sample(SampleError::UnsupportedObject { .. })
            | Self::Field(FieldError::Unsupported(_))
            | Self::Field(FieldError::Index { .. }) => ErrorKind::Unsupported,
            _ => ErrorKind::DataFormat,
        }
    }
}

/// A decoding session over the bytes of one dive.
///
/// The header is built on the first query and reused by later ones until new
/// bytes are supplied with [`Parser::set_data`]. A failure to build it is
/// remembered the same way.
#[derive(Debug)]
pub struct Parser<'a> {
    model: Model,
    data: &'a [u8],
    header: OnceCell<Result<Header, HeaderError>>,
}

impl<'a> Parser<'a> {
    pub fn new(model: Model, data: &'a [u8]) -> Self {
        Self {
            model,
            data,
            header: OnceCell::new(),
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Bind the session to the bytes of another dive.
    pub fn set_data(&mut self, data: &'a [u8]) {
        self.data = data;
        self.header = OnceCell::new();
    }

    /// The dive header, built on first use.
    pub fn header(&self) -> Result<&Header, Error> {
        self.header
            .get_or_init(|| Header::parse(self.data, self.model))
            .as_ref()
            .map_err(|err| Error::Header(err.clone()))
    }

    /// The date and time the dive started.
    pub fn datetime(&self) -> Result<DateTime, Error> {
        let header = self.header()?;
        Ok(field::datetime(self.data, header)?)
    }

    /// A header field.
    pub fn field(&self, kind: FieldKind) -> Result<FieldValue, Error> {
        let header = self.header()?;
        Ok(field::field(self.data, header, kind)?)
    }

    /// An iterator over the profile.
    pub fn samples(&self) -> Result<Samples<'_>, Error> {
        let header = self.header()?;
        Ok(Samples::new(self.data, header))
    }

    /// Decode the profile, publishing to a receiver.
    ///
    /// Events are published as they are decoded; on error, the events of the
    /// samples preceding the failure have already been received.
    ///
    /// Callers wanting all or nothing must discard what they received on `Err`.
    pub fn samples_foreach<O: FromSamples + ?Sized>(&self, o: &mut O) -> Result<(), Error> {
        for sample in self.samples()? {
            publish(sample?, o);
        }

        Ok(())
    }
}

fn publish<O: FromSamples + ?Sized>(sample: Sample, o: &mut O) {
    match sample {
        Sample::Time(time) => o.add_time(time),
        Sample::Depth(depth) => o.add_depth(depth),
        Sample::Temperature(temperature) => o.add_temperature(temperature),
        Sample::GasMix(index) => o.add_gas_mix(index),
        Sample::Deco(deco) => o.add_deco(deco),
        Sample::Pressure { tank, value } => o.add_pressure(tank, value),
        Sample::Event(event) => o.add_event(event),
    }
}

/// Decode a dive from a slice, publishing to a receiver.
///
/// This method is also re-exported as `regulator::avec::decode_slice`.
pub fn decode(r: &[u8], model: Model, o: &mut impl FromDive) -> Result<(), Error> {
    let parser = Parser::new(model, r);
    let header = parser.header()?;

    o.add_datetime(parser.datetime()?);

    for kind in [
        FieldKind::DiveTime,
        FieldKind::MaxDepth,
        FieldKind::Atmospheric,
        FieldKind::Salinity,
        FieldKind::TemperatureMinimum,
        FieldKind::TemperatureMaximum,
        FieldKind::DiveMode,
    ] {
        o.add_field(parser.field(kind)?);
    }

    o.add_field(FieldValue::GasMixCount(header.gas_mixes.len()));
    for i in 0..header.gas_mixes.len() {
        o.add_field(parser.field(FieldKind::GasMix(i))?);
    }

    o.add_field(FieldValue::TankCount(header.tanks.len()));
    for i in 0..header.tanks.len() {
        o.add_field(parser.field(FieldKind::Tank(i))?);
    }

    if let Some(o) = o.samples() {
        parser.samples_foreach(o)?;
    }

    Ok(())
}
