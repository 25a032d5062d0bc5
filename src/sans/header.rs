//! Dive headers and the model table.
//!
//! A [`Header`] holds everything derived from the fixed part of a dive: the
//! dive mode, profile geometry, settings, and the active gas mixes and tanks.
//! It is built once per dive by [`Header::parse`] and is read-only afterward.

use tartan_bitfield::bitfield;
use thiserror::Error;
use tinyvec::ArrayVec;
use zerocopy::FromBytes;

use super::{
    bytes::{self, OutOfBounds},
    record::RecordKind,
};

/// Most gas mixes (and tanks) any model records.
pub const MAX_GAS_MIXES: usize = 5;

/// Gas mixes and tanks recorded by the legacy models.
const LEGACY_SLOTS: usize = 3;

/// End pressure recorded for a tank without a transmitter.
pub const NO_TRANSMITTER: u16 = 36000;

/// Size of the Genius dive header.
pub const GENIUS_HEADER_SIZE: usize = 0xB8;

/// Size of a legacy air integration block.
pub const AIR_BLOCK_SIZE: usize = 8;

/// Supported dive computer models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    /// Icon HD.
    IconHd,
    /// Icon HD Net Ready.
    IconHdNet,
    /// Puck Pro, Quad Air.
    QuadAir,
    /// Smart Air.
    SmartAir,
    /// Smart, Puck 2.
    Smart,
    /// Smart Apnea.
    SmartApnea,
    /// Genius.
    Genius,
}

/// The two structurally different dive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Fixed header at the tail of the dive.
    Legacy,
    /// Header at the start, profile of framed records.
    RecordStream,
}

/// Per-model layout constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub family: Family,
    /// Bytes at the tail of a legacy dive holding the type and sample count.
    pub tail: usize,
    /// Whether the sample count precedes the type field.
    pub count_first: bool,
    /// Whether the header is preceded by 4 bytes not counted in its size.
    pub prefixed: bool,
    /// Whether the profile interleaves tank pressures every 4 samples.
    pub air_integrated: bool,
    /// Offset of the legacy tank table within the header.
    pub tank_offset: Option<usize>,
}

impl Model {
    /// Look up a model by its hardware identifier.
    pub const fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0x14 => Self::IconHd,
            0x15 => Self::IconHdNet,
            0x1C => Self::Genius,
            0x23 => Self::QuadAir,
            0x24 => Self::SmartAir,
            0x10 => Self::Smart,
            0x01_0010 => Self::SmartApnea,
            _ => return None,
        })
    }

    /// The hardware identifier of this model.
    pub const fn id(self) -> u32 {
        match self {
            Self::IconHd => 0x14,
            Self::IconHdNet => 0x15,
            Self::Genius => 0x1C,
            Self::QuadAir => 0x23,
            Self::SmartAir => 0x24,
            Self::Smart => 0x10,
            Self::SmartApnea => 0x01_0010,
        }
    }

    pub const fn family(self) -> Family {
        self.layout().family
    }

    pub const fn layout(self) -> Layout {
        const fn legacy(
            tail: usize,
            prefixed: bool,
            air_integrated: bool,
            tank_offset: Option<usize>,
        ) -> Layout {
            Layout {
                family: Family::Legacy,
                tail,
                count_first: !prefixed,
                prefixed,
                air_integrated,
                tank_offset,
            }
        }

        match self {
            Self::IconHd => legacy(0x5C, true, false, None),
            Self::IconHdNet => legacy(0x80, true, true, Some(0x58)),
            Self::QuadAir => legacy(0x84, true, true, Some(0x5C)),
            Self::SmartAir => legacy(4, false, true, Some(0x5C)),
            Self::Smart => legacy(4, false, false, None),
            Self::SmartApnea => legacy(6, false, false, None),
            Self::Genius => Layout {
                family: Family::RecordStream,
                tail: 0,
                count_first: false,
                prefixed: false,
                air_integrated: true,
                tank_offset: None,
            },
        }
    }

    /// Header and sample sizes for a dive mode code.
    const fn sizes(self, mode: u8) -> (usize, usize) {
        match self {
            Self::IconHd => (0x5C, 8),
            Self::IconHdNet => (0x80, 12),
            Self::QuadAir | Self::SmartAir => (0x84, 12),
            Self::Smart if mode == LEGACY_FREEDIVE => (0x2E, 6),
            Self::Smart => (0x5C, 8),
            Self::SmartApnea => (0x50, 14),
            Self::Genius => (GENIUS_HEADER_SIZE, RecordKind::Sample.size()),
        }
    }
}

const LEGACY_AIR: u8 = 0;
const LEGACY_GAUGE: u8 = 1;
const LEGACY_NITROX: u8 = 2;
const LEGACY_FREEDIVE: u8 = 3;

/// The dive mode as configured on the computer.
///
/// Legacy models use `Air`, `Nitrox`, `Gauge` and `Freedive`. The Genius
/// distinguishes single and multi-gas nitrox, and trimix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiveMode {
    Air,
    /// Up to three nitrox mixes.
    Nitrox,
    NitroxSingle,
    NitroxMulti,
    Trimix,
    Gauge,
    Freedive,
}

impl DiveMode {
    /// Interpret a mode code for a model family.
    pub const fn from_code(family: Family, code: u8) -> Option<Self> {
        Some(match (family, code) {
            (Family::Legacy, LEGACY_AIR) => Self::Air,
            (Family::Legacy, LEGACY_GAUGE) => Self::Gauge,
            (Family::Legacy, LEGACY_NITROX) => Self::Nitrox,
            (Family::Legacy, LEGACY_FREEDIVE) => Self::Freedive,
            (Family::RecordStream, 0) => Self::Air,
            (Family::RecordStream, 1) => Self::NitroxSingle,
            (Family::RecordStream, 2) => Self::NitroxMulti,
            (Family::RecordStream, 3) => Self::Trimix,
            (Family::RecordStream, 4) => Self::Gauge,
            (Family::RecordStream, 5) => Self::Freedive,
            _ => return None,
        })
    }
}

/// A breathing gas, in whole percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasMix {
    pub oxygen: u8,
    pub helium: u8,
}

impl GasMix {
    pub const AIR: Self = Self {
        oxygen: 21,
        helium: 0,
    };

    /// The remainder after oxygen and helium.
    pub fn nitrogen(&self) -> u8 {
        100u8.saturating_sub(self.oxygen).saturating_sub(self.helium)
    }
}

/// A tank as stored in the header, in device units.
///
/// Pressures are in 1/100 bar. Volume and working pressure are in litres and
/// bar when the dive uses metric units, otherwise cubic feet and psi.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tank {
    pub volume: u16,
    pub work_pressure: u16,
    pub begin_pressure: u16,
    pub end_pressure: u16,
}

impl Tank {
    /// Whether a transmitter reported pressures for this tank.
    pub fn is_fitted(&self) -> bool {
        self.begin_pressure != 0 || (self.end_pressure != 0 && self.end_pressure != NO_TRANSMITTER)
    }
}

/// An error building a dive header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The dive does not fit in the supplied bytes.
    #[error("A dive of {length} bytes overflows a buffer of {size} bytes.")]
    Overflow { length: usize, size: usize },
    /// The dive is too short to hold its header.
    #[error("A dive of {length} bytes is shorter than its {minimum} byte header.")]
    TooShort { length: usize, minimum: usize },
    /// Calculated and stored dive sizes do not match.
    #[error("Calculated ({calculated}) and stored ({stored}) sizes are not equal.")]
    SizeMismatch { stored: usize, calculated: u64 },
    /// Unknown object type or version.
    #[error("Unsupported object type ({kind}) or version ({major}.{minor}).")]
    UnsupportedObject { kind: u16, major: u8, minor: u8 },
    /// A field lies outside the dive.
    #[error(transparent)]
    EndOfSlice(#[from] OutOfBounds),
}

/// Values derived from the fixed part of a dive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub model: Model,
    /// Raw dive mode code, see [`Header::dive_mode`].
    pub mode: u8,
    /// Number of logical samples in the profile.
    pub samples: usize,
    pub sample_size: usize,
    pub header_size: usize,
    pub settings: u32,
    /// Seconds between samples.
    pub interval: u32,
    /// Samples recorded per interval.
    pub sample_rate: u32,
    /// Active gas mixes, always a prefix of the slots.
    pub gas_mixes: ArrayVec<[GasMix; MAX_GAS_MIXES]>,
    /// Fitted tanks, always a prefix of the slots.
    pub tanks: ArrayVec<[Tank; MAX_GAS_MIXES]>,
    /// Bytes belonging to this dive. Anything after is ignored.
    pub length: usize,
}

bitfield! {
    struct TypeWord(u16) {
        [0..2] mode: u8,
    }
}

bitfield! {
    struct LegacySettings(u16) {
        [4] fresh_water,
        [8] metric,
        [10..12] interval: u8,
    }
}

bitfield! {
    struct ApneaSettings(u16) {
        [0..6] salinity: u8,
        [9..11] sample_rate: u8,
    }
}

bitfield! {
    struct GeniusSettings(u32) {
        [0..4] mode: u8,
        [5..7] salinity: u8,
    }
}

bitfield! {
    struct LegacyGasFlags(u8) {
        [7] disabled,
    }
}

bitfield! {
    struct GasParameters(u32) {
        [0..7] oxygen: u8,
        [7..14] nitrogen: u8,
        [14..21] helium: u8,
        [21..23] state: u8,
        [23] changed,
    }
}

const GAS_OFF: u8 = 0;

#[repr(C, packed)]
#[derive(FromBytes)]
struct TypeCount {
    first: [u8; 2],
    second: [u8; 2],
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct ObjectTag {
    kind: [u8; 2],
    major: u8,
    minor: u8,
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct GasSlot {
    parameters: [u8; 4],
    begin_pressure: [u8; 2],
    end_pressure: [u8; 2],
    volume: [u8; 2],
    work_pressure: [u8; 2],
    _reserved: [u8; 8],
}

/// Read an object type and version tag.
pub(crate) fn object_tag(r: &[u8], offset: usize) -> Result<(u16, u8, u8), OutOfBounds> {
    let ObjectTag { kind, major, minor } = zerocopy::transmute!(bytes::take::<4>(r, offset)?);
    Ok((u16::from_le_bytes(kind), major, minor))
}

impl Header {
    /// Build the header of a dive.
    pub fn parse(data: &[u8], model: Model) -> Result<Self, HeaderError> {
        let header = match model.family() {
            Family::Legacy => parse_legacy(data, model),
            Family::RecordStream => parse_genius(data, model),
        }?;

        log::debug!(
            "{:?} dive: mode {}, {} samples every {} s, {} gas mixes, {} tanks.",
            header.model,
            header.mode,
            header.samples,
            header.interval,
            header.gas_mixes.len(),
            header.tanks.len(),
        );

        Ok(header)
    }

    /// The dive mode, if the code is known for this model.
    pub fn dive_mode(&self) -> Option<DiveMode> {
        DiveMode::from_code(self.model.family(), self.mode)
    }

    /// Whether this is a legacy dive in freedive mode.
    pub fn is_legacy_freedive(&self) -> bool {
        self.model.family() == Family::Legacy && self.mode == LEGACY_FREEDIVE
    }

    /// Locate the bytes header fields are read from.
    ///
    /// Genius headers start the dive. Legacy headers end it, after an extra 4
    /// bytes on prefixed models.
    pub fn fields<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], OutOfBounds> {
        let start = match self.model.family() {
            Family::RecordStream => 0,
            Family::Legacy if self.model.layout().prefixed => self.length - self.header_size + 4,
            Family::Legacy => self.length - self.header_size,
        };

        data.get(start..self.length).ok_or(OutOfBounds {
            offset: start,
            width: self.length.saturating_sub(start),
            len: data.len(),
        })
    }

    /// Whether volume and working pressure are stored in metric units.
    pub fn is_metric(&self, fields: &[u8]) -> Result<bool, OutOfBounds> {
        Ok(match self.model.family() {
            Family::RecordStream => bytes::u8_at(fields, 0x34)? != 0,
            Family::Legacy => LegacySettings(self.settings as u16).metric(),
        })
    }

    /// Water type code: fresh water flag (legacy), density offset (apnea) or
    /// water type (Genius).
    pub fn salinity_code(&self) -> u8 {
        match self.model {
            Model::Genius => GeniusSettings(self.settings).salinity(),
            Model::SmartApnea => ApneaSettings(self.settings as u16).salinity(),
            _ => LegacySettings(self.settings as u16).fresh_water() as u8,
        }
    }
}

fn parse_legacy(data: &[u8], model: Model) -> Result<Header, HeaderError> {
    let layout = model.layout();
    let size = data.len();

    let length = bytes::u32_le(data, 0).map_err(|_| HeaderError::Overflow { length: 4, size })?;
    let length = length as usize;

    if length > size {
        Err(HeaderError::Overflow { length, size })?;
    }

    if length < 4 + layout.tail {
        Err(HeaderError::TooShort {
            length,
            minimum: 4 + layout.tail,
        })?;
    }

    // Everything after the stored length belongs to another dive.
    let data = &data[..length];

    let TypeCount { first, second } =
        zerocopy::transmute!(bytes::take::<4>(data, length - layout.tail)?);
    let (kind, samples) = if layout.count_first {
        (second, first)
    } else {
        (first, second)
    };

    let mode = TypeWord(u16::from_le_bytes(kind)).mode();
    let samples = u16::from_le_bytes(samples) as usize;

    let (header_size, sample_size) = model.sizes(mode);

    if length < 4 + header_size {
        Err(HeaderError::TooShort {
            length,
            minimum: 4 + header_size,
        })?;
    }

    let start = length - header_size + if layout.prefixed { 4 } else { 0 };
    let p = &data[start..];

    let settings = if model == Model::SmartApnea {
        bytes::u16_le(p, 0x1C)?
    } else if mode == LEGACY_FREEDIVE {
        bytes::u16_le(p, 0x08)?
    } else {
        bytes::u16_le(p, 0x0C)?
    };

    let (interval, sample_rate) = if model == Model::SmartApnea {
        (1, 1u32 << ApneaSettings(settings).sample_rate())
    } else {
        const INTERVALS: [u32; 4] = [1, 5, 10, 20];
        (INTERVALS[LegacySettings(settings).interval() as usize], 1)
    };

    let mut calculated = 4 + header_size as u64 + samples as u64 * sample_size as u64;
    if layout.air_integrated {
        calculated += (samples / 4) as u64 * AIR_BLOCK_SIZE as u64;
    } else if model == Model::SmartApnea {
        let dive_time = bytes::u32_le(p, 0x24)?;
        calculated += dive_time as u64 * sample_rate as u64 * 2;
    }

    if calculated != length as u64 {
        Err(HeaderError::SizeMismatch {
            stored: length,
            calculated,
        })?;
    }

    let mut gas_mixes = ArrayVec::new();
    match mode {
        LEGACY_GAUGE | LEGACY_FREEDIVE => {}
        LEGACY_AIR => gas_mixes.push(GasMix::AIR),
        _ => {
            for i in 0..LEGACY_SLOTS {
                let slot = 0x10 + i * 4;
                if LegacyGasFlags(bytes::u8_at(p, slot + 1)?).disabled() {
                    break;
                }
                gas_mixes.push(GasMix {
                    oxygen: bytes::u8_at(p, slot)?,
                    helium: 0,
                });
            }
        }
    }

    let mut tanks = ArrayVec::new();
    if let Some(offset) = layout.tank_offset {
        for i in 0..LEGACY_SLOTS {
            let tank = Tank {
                volume: bytes::u16_le(p, offset + 0x0C + i * 8)?,
                work_pressure: bytes::u16_le(p, offset + 0x0C + i * 8 + 2)?,
                begin_pressure: bytes::u16_le(p, offset + i * 4)?,
                end_pressure: bytes::u16_le(p, offset + i * 4 + 2)?,
            };
            if !tank.is_fitted() {
                break;
            }
            tanks.push(tank);
        }
    }

    Ok(Header {
        model,
        mode,
        samples,
        sample_size,
        header_size,
        settings: settings as u32,
        interval,
        sample_rate,
        gas_mixes,
        tanks,
        length,
    })
}

fn parse_genius(data: &[u8], model: Model) -> Result<Header, HeaderError> {
    let size = data.len();

    let (kind, major, minor) =
        object_tag(data, 0).map_err(|_| HeaderError::Overflow { length: 4, size })?;
    if (kind, major, minor) != (1, 0, 0) {
        Err(HeaderError::UnsupportedObject { kind, major, minor })?;
    }

    if GENIUS_HEADER_SIZE > size {
        Err(HeaderError::Overflow {
            length: GENIUS_HEADER_SIZE,
            size,
        })?;
    }

    let samples = bytes::u16_le(data, 0x20)? as usize;
    let settings = bytes::u32_le(data, 0x0C)?;
    let mode = GeniusSettings(settings).mode();

    // The profile starts with a 4 byte object tag.
    let length = GENIUS_HEADER_SIZE
        + 4
        + RecordKind::DiveStart.size()
        + RecordKind::Tissue.size()
        + samples * RecordKind::Sample.size()
        + (samples / 4) * RecordKind::AirIntegration.size()
        + RecordKind::DiveEnd.size();

    // Trailing bytes are tolerated here, unlike legacy dives.
    if length > size {
        Err(HeaderError::Overflow { length, size })?;
    }

    let mut gas_mixes = ArrayVec::new();
    let mut tanks = ArrayVec::new();

    for i in 0..MAX_GAS_MIXES {
        let GasSlot {
            parameters,
            begin_pressure,
            end_pressure,
            volume,
            work_pressure,
            ..
        } = zerocopy::transmute!(bytes::take::<20>(data, 0x54 + i * 20)?);

        let parameters = GasParameters(u32::from_le_bytes(parameters));
        let oxygen = parameters.oxygen();
        let nitrogen = parameters.nitrogen();
        let helium = parameters.helium();

        if oxygen as u32 + nitrogen as u32 + helium as u32 != 100 {
            log::warn!("Invalid gas mix ({helium}% He, {oxygen}% O2, {nitrogen}% N2).");
        }

        if parameters.changed() {
            log::trace!("Gas mix {i} was changed during the dive.");
        }

        // Active mixes come first; one after a gap is ignored.
        if parameters.state() != GAS_OFF && gas_mixes.len() == i {
            gas_mixes.push(GasMix { oxygen, helium });
        }

        let tank = Tank {
            volume: u16::from_le_bytes(volume),
            work_pressure: u16::from_le_bytes(work_pressure),
            begin_pressure: u16::from_le_bytes(begin_pressure),
            end_pressure: u16::from_le_bytes(end_pressure),
        };

        if tank.is_fitted() && tanks.len() == i {
            tanks.push(tank);
        }
    }

    Ok(Header {
        model,
        mode,
        samples,
        sample_size: RecordKind::Sample.size(),
        header_size: GENIUS_HEADER_SIZE,
        settings,
        interval: 5,
        sample_rate: 1,
        gas_mixes,
        tanks,
        length: size,
    })
}
