//! Header fields.
//!
//! Fields are read from fixed offsets within the dive header. Offsets differ
//! for the Genius, the Smart Apnea, legacy dives in freedive mode, and all
//! other legacy dives.

use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::FromBytes;

use crate::sans::{
    bytes::{self, OutOfBounds},
    header::{self, DiveMode, Header, Model},
};

/// Cubic metres per cubic foot.
const CUFT: f64 = 0.028316846592;
/// Pascal per psi.
const PSI: f64 = 6894.75729;
/// Pascal per standard atmosphere.
const ATM: f64 = 101325.0;
/// Pascal per bar.
const BAR: f64 = 100000.0;
/// Standard gravity.
const GRAVITY: f64 = 9.80665;
/// Pascal per metre of sea water.
const MSW: f64 = BAR / 10.0;

/// Header fields that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    DiveTime,
    MaxDepth,
    AverageDepth,
    GasMixCount,
    /// The gas mix with this index.
    GasMix(usize),
    TankCount,
    /// The tank with this index.
    Tank(usize),
    Atmospheric,
    Salinity,
    TemperatureSurface,
    TemperatureMinimum,
    TemperatureMaximum,
    DiveMode,
    DecoModel,
    Location,
}

/// A decoded header field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Seconds.
    DiveTime(u32),
    /// Metres.
    MaxDepth(f64),
    GasMixCount(usize),
    GasMix(Gas),
    TankCount(usize),
    Tank(Cylinder),
    /// Bar.
    Atmospheric(f64),
    Salinity(Salinity),
    /// Degrees Celsius.
    TemperatureMinimum(f64),
    /// Degrees Celsius.
    TemperatureMaximum(f64),
    DiveMode(DiveKind),
}

/// A breathing gas, as fractions summing to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gas {
    pub oxygen: f64,
    pub helium: f64,
    pub nitrogen: f64,
}

impl From<header::GasMix> for Gas {
    fn from(mix: header::GasMix) -> Self {
        let oxygen = mix.oxygen as f64 / 100.0;
        let helium = mix.helium as f64 / 100.0;
        Self {
            oxygen,
            helium,
            nitrogen: 1.0 - oxygen - helium,
        }
    }
}

/// Units a tank was configured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Metric,
    Imperial,
}

/// A tank, in metric units regardless of how it was configured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub units: Units,
    /// Water capacity in litres.
    pub volume: f64,
    /// Bar.
    pub work_pressure: f64,
    /// Bar.
    pub begin_pressure: f64,
    /// Bar.
    pub end_pressure: f64,
    /// The gas mix breathed from this tank, if known.
    pub gas_mix: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Water {
    Fresh,
    Salt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Salinity {
    pub water: Water,
    /// Kilograms per cubic metre, zero if unknown.
    pub density: f64,
}

/// Broad classification of a dive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiveKind {
    OpenCircuit,
    Gauge,
    Freedive,
}

impl From<DiveMode> for DiveKind {
    fn from(mode: DiveMode) -> Self {
        match mode {
            DiveMode::Air
            | DiveMode::Nitrox
            | DiveMode::NitroxSingle
            | DiveMode::NitroxMulti
            | DiveMode::Trimix => Self::OpenCircuit,
            DiveMode::Gauge => Self::Gauge,
            DiveMode::Freedive => Self::Freedive,
        }
    }
}

/// Local date and time. Seconds are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

/// An error reading a header field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The field is not recorded by these models.
    #[error("Field {0:?} is not supported.")]
    Unsupported(FieldKind),
    /// No gas mix or tank exists at the requested index.
    #[error("Index {index} is out of range ({count} available).")]
    Index { index: usize, count: usize },
    /// An imperial tank without working pressure has no defined volume.
    #[error("Tank {0} has no working pressure.")]
    WorkPressure(usize),
    /// Unknown water type code.
    #[error("Unknown water type ({0}).")]
    Salinity(u8),
    /// Unknown dive mode code.
    #[error("Unknown dive mode ({0}).")]
    DiveMode(u8),
    /// The field lies outside the dive.
    #[error(transparent)]
    EndOfSlice(#[from] OutOfBounds),
}

struct Offsets {
    datetime: usize,
    max_depth: usize,
    atmospheric: usize,
    /// Atmospheric pressure units per bar.
    atmospheric_scale: f64,
    temperature_minimum: usize,
    temperature_maximum: usize,
}

impl Offsets {
    const GENIUS: Self = Self {
        datetime: 0x08,
        max_depth: 0x22,
        atmospheric: 0x3E,
        atmospheric_scale: 1000.0,
        temperature_minimum: 0x28,
        temperature_maximum: 0x26,
    };

    const APNEA: Self = Self {
        datetime: 0x40,
        max_depth: 0x3A,
        atmospheric: 0x38,
        atmospheric_scale: 1000.0,
        temperature_minimum: 0x3E,
        temperature_maximum: 0x3C,
    };

    const FREEDIVE: Self = Self {
        datetime: 0x20,
        max_depth: 0x1A,
        atmospheric: 0x18,
        atmospheric_scale: 1000.0,
        temperature_minimum: 0x1C,
        temperature_maximum: 0x1E,
    };

    const DEFAULT: Self = Self {
        datetime: 0x02,
        max_depth: 0x00,
        atmospheric: 0x22,
        atmospheric_scale: 8000.0,
        temperature_minimum: 0x42,
        temperature_maximum: 0x44,
    };

    fn of(header: &Header) -> &'static Self {
        match header.model {
            Model::Genius => &Self::GENIUS,
            Model::SmartApnea => &Self::APNEA,
            _ if header.is_legacy_freedive() => &Self::FREEDIVE,
            _ => &Self::DEFAULT,
        }
    }
}

bitfield! {
    struct Timestamp(u32) {
        [0..5] hour: u16,
        [5..11] minute: u16,
        [11..16] day: u16,
        [16..20] month: u16,
        [20..32] year: u16,
    }
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct LegacyDateTime {
    hour: [u8; 2],
    minute: [u8; 2],
    day: [u8; 2],
    month: [u8; 2],
    year: [u8; 2],
}

/// Read the date and time a dive started.
pub fn datetime(data: &[u8], header: &Header) -> Result<DateTime, FieldError> {
    let p = header.fields(data)?;
    let offset = Offsets::of(header).datetime;

    Ok(if header.model == Model::Genius {
        let timestamp = Timestamp(bytes::u32_le(p, offset)?);
        DateTime {
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
            hour: timestamp.hour(),
            minute: timestamp.minute(),
            second: 0,
        }
    } else {
        let LegacyDateTime {
            hour,
            minute,
            day,
            month,
            year,
        } = zerocopy::transmute!(bytes::take::<10>(p, offset)?);
        DateTime {
            year: u16::from_le_bytes(year).wrapping_add(1900),
            month: u16::from_le_bytes(month).wrapping_add(1),
            day: u16::from_le_bytes(day),
            hour: u16::from_le_bytes(hour),
            minute: u16::from_le_bytes(minute),
            second: 0,
        }
    })
}

/// Read a header field.
pub fn field(data: &[u8], header: &Header, kind: FieldKind) -> Result<FieldValue, FieldError> {
    let p = header.fields(data)?;
    let offsets = Offsets::of(header);

    let temperature = |offset| -> Result<f64, FieldError> {
        Ok(bytes::u16_le(p, offset)? as i16 as f64 / 10.0)
    };

    Ok(match kind {
        FieldKind::DiveTime => FieldValue::DiveTime(dive_time(data, header, p)?),
        FieldKind::MaxDepth => {
            FieldValue::MaxDepth(bytes::u16_le(p, offsets.max_depth)? as f64 / 10.0)
        }
        FieldKind::GasMixCount => FieldValue::GasMixCount(header.gas_mixes.len()),
        FieldKind::GasMix(index) => {
            let mix = header.gas_mixes.get(index).ok_or(FieldError::Index {
                index,
                count: header.gas_mixes.len(),
            })?;
            FieldValue::GasMix(Gas::from(*mix))
        }
        FieldKind::TankCount => FieldValue::TankCount(header.tanks.len()),
        FieldKind::Tank(index) => FieldValue::Tank(cylinder(header, p, index)?),
        FieldKind::Atmospheric => FieldValue::Atmospheric(
            bytes::u16_le(p, offsets.atmospheric)? as f64 / offsets.atmospheric_scale,
        ),
        FieldKind::Salinity => FieldValue::Salinity(salinity(header)?),
        FieldKind::TemperatureMinimum => {
            FieldValue::TemperatureMinimum(temperature(offsets.temperature_minimum)?)
        }
        FieldKind::TemperatureMaximum => {
            FieldValue::TemperatureMaximum(temperature(offsets.temperature_maximum)?)
        }
        FieldKind::DiveMode => FieldValue::DiveMode(
            header
                .dive_mode()
                .map(DiveKind::from)
                .ok_or(FieldError::DiveMode(header.mode))?,
        ),
        FieldKind::AverageDepth
        | FieldKind::TemperatureSurface
        | FieldKind::DecoModel
        | FieldKind::Location => Err(FieldError::Unsupported(kind))?,
    })
}

fn dive_time(data: &[u8], header: &Header, p: &[u8]) -> Result<u32, FieldError> {
    let samples = header.samples as u32;

    Ok(match header.model {
        Model::Genius => samples * header.interval,
        Model::SmartApnea => bytes::u16_le(p, 0x24)? as u32,
        _ if header.is_legacy_freedive() => {
            // Sum the dive time of every segment.
            let mut dive_time = 0;
            for i in 0..header.samples {
                dive_time += bytes::u16_le(data, 4 + i * header.sample_size + 2)? as u32;
            }
            dive_time
        }
        _ => samples * header.interval,
    })
}

fn cylinder(header: &Header, p: &[u8], index: usize) -> Result<Cylinder, FieldError> {
    let tank = header.tanks.get(index).ok_or(FieldError::Index {
        index,
        count: header.tanks.len(),
    })?;

    let (units, volume, work_pressure) = if header.is_metric(p)? {
        (
            Units::Metric,
            tank.volume as f64,
            tank.work_pressure as f64,
        )
    } else {
        if tank.work_pressure == 0 {
            Err(FieldError::WorkPressure(index))?;
        }
        let work_pressure = tank.work_pressure as f64;
        (
            Units::Imperial,
            tank.volume as f64 * CUFT * 1000.0 / (work_pressure * PSI / ATM),
            work_pressure * PSI / BAR,
        )
    };

    Ok(Cylinder {
        units,
        volume,
        work_pressure,
        begin_pressure: tank.begin_pressure as f64 / 100.0,
        end_pressure: tank.end_pressure as f64 / 100.0,
        gas_mix: (index < header.gas_mixes.len()).then_some(index),
    })
}

fn salinity(header: &Header) -> Result<Salinity, FieldError> {
    let code = header.salinity_code();

    Ok(match header.model {
        Model::Genius => match code {
            0 => Salinity {
                water: Water::Salt,
                density: 0.0,
            },
            1 => Salinity {
                water: Water::Fresh,
                density: 0.0,
            },
            // EN 13319
            2 => Salinity {
                water: Water::Salt,
                density: MSW / GRAVITY,
            },
            _ => Err(FieldError::Salinity(code))?,
        },
        Model::SmartApnea => Salinity {
            water: if code == 0 { Water::Fresh } else { Water::Salt },
            density: 1000.0 + code as f64,
        },
        _ => Salinity {
            water: if code != 0 { Water::Fresh } else { Water::Salt },
            density: 0.0,
        },
    })
}
