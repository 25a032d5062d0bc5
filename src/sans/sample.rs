//! Profile decoding.
//!
//! [`Samples`] walks the profile of a dive and yields [`Sample`] events in
//! order. For every logical sample the time always comes first, followed by
//! depth, temperature, gas mix changes, deco status, alarm events and, every
//! fourth sample on air integrated models, tank pressure.
//!
//! Decoding stops at the first error. Events already decoded for the failing
//! sample are yielded before the error.

use core::iter::FusedIterator;

use tartan_bitfield::bitfield;
use thiserror::Error;
use tinyvec::ArrayVec;
use zerocopy::FromBytes;

use super::{
    bytes::{self, OutOfBounds},
    header::{self, AIR_BLOCK_SIZE, Family, Header, Model},
    record::{self, MARKER, RecordError, RecordKind},
};

/// A single profile event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Seconds since the start of the dive.
    Time(u32),
    /// Depth in metres.
    Depth(f64),
    /// Water temperature in degrees Celsius.
    Temperature(f64),
    /// Index of the gas mix now breathed.
    GasMix(usize),
    /// Decompression status.
    Deco(Deco),
    /// Tank pressure in bar.
    Pressure { tank: usize, value: f64 },
    /// An alarm raised by the computer.
    Event(Event),
}

impl Default for Sample {
    fn default() -> Self {
        Self::Time(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoKind {
    /// Within no-decompression limits.
    Ndl,
    /// A decompression stop is required.
    DecoStop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deco {
    pub kind: DecoKind,
    /// Seconds.
    pub time: u32,
    /// Stop depth in metres, zero within no-decompression limits.
    pub depth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Ascending too fast.
    Ascent,
    /// Above the decompression ceiling.
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub alarm: Alarm,
}

/// Alarms of the Genius, by bit position in the alarm word.
///
/// Variants are listed in bit order from bit 1 (`SlowDown`) to bit 27
/// (`GasAdded`); bit 0 carries no alarm. See [`Alarm::from_bit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    SlowDown,
    FastAscent,
    UncontrolledAscent,
    ModReached,
    CnsDanger,
    CnsExtreme,
    MissedDeco,
    DiveViolationDeco,
    LowBattery,
    VeryLowBattery,
    ProbeLowBattery,
    LowTankPressure,
    TankReserveReached,
    TankLostLink,
    MaxDiveDepth,
    RunAwayDeco,
    TankHalfReached,
    NoDecoTwoMinutes,
    NoDecoToDeco,
    MultigasTankIsLow,
    DiveTimeHalf,
    DiveTimeFull,
    GasSwitchpoint,
    GasIgnored,
    GasChanged,
    GasNotChanged,
    GasAdded,
}

impl Alarm {
    pub const fn from_bit(bit: u32) -> Option<Self> {
        Some(match bit {
            1 => Self::SlowDown,
            2 => Self::FastAscent,
            3 => Self::UncontrolledAscent,
            4 => Self::ModReached,
            5 => Self::CnsDanger,
            6 => Self::CnsExtreme,
            7 => Self::MissedDeco,
            8 => Self::DiveViolationDeco,
            9 => Self::LowBattery,
            10 => Self::VeryLowBattery,
            11 => Self::ProbeLowBattery,
            12 => Self::LowTankPressure,
            13 => Self::TankReserveReached,
            14 => Self::TankLostLink,
            15 => Self::MaxDiveDepth,
            16 => Self::RunAwayDeco,
            17 => Self::TankHalfReached,
            18 => Self::NoDecoTwoMinutes,
            19 => Self::NoDecoToDeco,
            20 => Self::MultigasTankIsLow,
            21 => Self::DiveTimeHalf,
            22 => Self::DiveTimeFull,
            23 => Self::GasSwitchpoint,
            24 => Self::GasIgnored,
            25 => Self::GasChanged,
            26 => Self::GasNotChanged,
            27 => Self::GasAdded,
            _ => return None,
        })
    }

    /// The event reported for this alarm, if any.
    pub const fn event(self) -> Option<EventKind> {
        match self {
            Self::FastAscent | Self::UncontrolledAscent => Some(EventKind::Ascent),
            Self::MissedDeco | Self::DiveViolationDeco => Some(EventKind::Ceiling),
            _ => None,
        }
    }
}

/// An error decoding a profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// A framed record failed validation.
    #[error("Invalid record: {0}")]
    Record(#[from] RecordError),
    /// A sample refers to a gas mix that is not active.
    #[error("Gas mix index {index} is out of range ({count} gas mixes).")]
    GasMix { index: usize, count: usize },
    /// The elapsed time no longer fits in 32 bits of seconds.
    #[error("Dive time overflows at sample {count}.")]
    TimeOverflow { count: usize },
    /// Unknown profile object type or version.
    #[error("Unsupported object type ({kind}) or version ({major}.{minor}).")]
    UnsupportedObject { kind: u16, major: u8, minor: u8 },
    /// A sample lies outside the dive.
    #[error(transparent)]
    EndOfSlice(#[from] OutOfBounds),
}

bitfield! {
    struct LegacyStatus(u16) {
        [0..12] temperature: u16,
        [12..16] gas_mix: u8,
    }
}

bitfield! {
    struct SampleMisc(u32) {
        [6..10] gas_mix: u8,
        [18] deco_stop,
        [19..26] deco_depth: u8,
    }
}

/// Head of a legacy sample.
#[repr(C, packed)]
#[derive(FromBytes)]
struct LegacySample {
    depth: [u8; 2],
    status: [u8; 2],
}

/// Head of a freedive or apnea sample.
#[repr(C, packed)]
#[derive(FromBytes)]
struct Segment {
    max_depth: [u8; 2],
    dive_time: [u8; 2],
    surface_time: [u8; 2],
}

/// A `DPRS` record.
#[repr(C, packed)]
#[derive(FromBytes)]
struct SampleRecord {
    _head: [u8; 4],
    depth: [u8; 2],
    _reserved0: [u8; 2],
    temperature: [u8; 2],
    _reserved1: [u8; 4],
    deco_time: [u8; 2],
    alarms: [u8; 4],
    _reserved2: [u8; 4],
    misc: [u8; 4],
    _crc: [u8; 2],
    _tail: [u8; 4],
}

/// Most events a single decoding step produces.
const PENDING: usize = 12;

#[derive(Debug)]
enum State {
    /// Genius profile tag and leading records.
    Profile,
    /// Next logical sample.
    Sample,
    /// Sub-samples of an apnea dive.
    Dive { remaining: usize },
    /// Genius dive end record.
    Trailer,
    Failed(SampleError),
    Done,
}

/// Iterator over the profile of a dive.
///
/// Construct with [`Samples::new`] from the same bytes the header was built
/// from. Iteration is a single forward pass; start over with a new iterator.
#[derive(Debug)]
pub struct Samples<'a> {
    data: &'a [u8],
    header: &'a Header,
    offset: usize,
    marker: usize,
    time: u32,
    count: usize,
    previous_gas_mix: Option<usize>,
    pending: ArrayVec<[Sample; PENDING]>,
    state: State,
}

impl<'a> Samples<'a> {
    pub fn new(data: &'a [u8], header: &'a Header) -> Self {
        if header.sample_rate > 1 {
            // One second is the smallest representable step.
            log::warn!("Multiple samples per second are not supported!");
        }

        let (data, offset, state) = match header.model.family() {
            Family::Legacy => (data.get(..header.length).unwrap_or(data), 4, State::Sample),
            Family::RecordStream => (data, header.header_size, State::Profile),
        };

        Self {
            data,
            header,
            offset,
            marker: 0,
            time: 0,
            count: 0,
            previous_gas_mix: None,
            pending: ArrayVec::new(),
            state,
        }
    }

    fn step(&mut self) -> Result<(), SampleError> {
        match self.state {
            State::Profile => self.profile(),
            State::Sample if self.count == self.header.samples => {
                self.state = match self.header.model.family() {
                    Family::Legacy => State::Done,
                    Family::RecordStream => State::Trailer,
                };
                Ok(())
            }
            State::Sample => match self.header.model {
                Model::SmartApnea => self.apnea(),
                Model::Genius => self.genius(),
                _ if self.header.is_legacy_freedive() => self.freedive(),
                _ => self.legacy(),
            },
            State::Dive { remaining } => self.dive(remaining),
            State::Trailer => {
                record::validate(self.data, self.offset, RecordKind::DiveEnd)?;
                self.offset += RecordKind::DiveEnd.size();
                self.state = State::Done;
                Ok(())
            }
            State::Failed(_) | State::Done => Ok(()),
        }
    }

    fn profile(&mut self) -> Result<(), SampleError> {
        let (kind, major, minor) = header::object_tag(self.data, self.offset)?;
        if (kind, major, minor) != (0, 2, 0) {
            Err(SampleError::UnsupportedObject { kind, major, minor })?;
        }
        self.offset += 4;

        for kind in [RecordKind::DiveStart, RecordKind::Tissue] {
            record::validate(self.data, self.offset, kind)?;
            self.offset += kind.size();
        }

        self.marker = MARKER;
        self.state = State::Sample;
        Ok(())
    }

    /// A surface interval followed by a dive sampled at the sample rate.
    fn apnea(&mut self) -> Result<(), SampleError> {
        let Segment {
            dive_time,
            surface_time,
            ..
        } = zerocopy::transmute!(bytes::take::<6>(self.data, self.offset)?);

        self.advance(u16::from_le_bytes(surface_time) as u32)?;
        self.pending.push(Sample::Time(self.time));
        self.pending.push(Sample::Depth(0.0));

        self.offset += self.header.sample_size;
        self.count += 1;

        self.state = State::Dive {
            remaining: u16::from_le_bytes(dive_time) as usize,
        };
        Ok(())
    }

    fn dive(&mut self, remaining: usize) -> Result<(), SampleError> {
        if remaining == 0 {
            self.state = State::Sample;
            return Ok(());
        }

        let depth = bytes::u16_le(self.data, self.offset)?;

        self.advance(self.header.interval)?;
        self.pending.push(Sample::Time(self.time));
        self.pending.push(Sample::Depth(depth as f64 / 10.0));

        // Only the first sample of each second is kept.
        self.offset += 2 * self.header.sample_rate as usize;
        self.state = State::Dive {
            remaining: remaining - 1,
        };
        Ok(())
    }

    /// A surface interval followed by a single dive.
    fn freedive(&mut self) -> Result<(), SampleError> {
        let Segment {
            max_depth,
            dive_time,
            surface_time,
        } = zerocopy::transmute!(bytes::take::<6>(self.data, self.offset)?);

        self.advance(u16::from_le_bytes(surface_time) as u32)?;
        self.pending.push(Sample::Time(self.time));
        self.pending.push(Sample::Depth(0.0));

        self.advance(u16::from_le_bytes(dive_time) as u32)?;
        self.pending.push(Sample::Time(self.time));
        self.pending
            .push(Sample::Depth(u16::from_le_bytes(max_depth) as f64 / 10.0));

        self.offset += self.header.sample_size;
        self.count += 1;
        Ok(())
    }

    fn legacy(&mut self) -> Result<(), SampleError> {
        let LegacySample { depth, status } =
            zerocopy::transmute!(bytes::take::<4>(self.data, self.offset)?);
        let status = LegacyStatus(u16::from_le_bytes(status));
        let gas_mix = status.gas_mix() as usize;

        self.common(u16::from_le_bytes(depth), status.temperature(), gas_mix)?;

        self.offset += self.header.sample_size;
        self.count += 1;

        self.air_integration(gas_mix)
    }

    fn genius(&mut self) -> Result<(), SampleError> {
        let record = record::validate(self.data, self.offset, RecordKind::Sample)?;
        let SampleRecord {
            depth,
            temperature,
            deco_time,
            alarms,
            misc,
            ..
        } = zerocopy::transmute!(bytes::take::<34>(record, 0)?);
        let misc = SampleMisc(u32::from_le_bytes(misc));
        let gas_mix = misc.gas_mix() as usize;

        self.common(
            u16::from_le_bytes(depth),
            u16::from_le_bytes(temperature),
            gas_mix,
        )?;

        let time = u16::from_le_bytes(deco_time) as u32 * 60;
        self.pending.push(Sample::Deco(if misc.deco_stop() {
            Deco {
                kind: DecoKind::DecoStop,
                time,
                depth: misc.deco_depth() as f64,
            }
        } else {
            Deco {
                kind: DecoKind::Ndl,
                time,
                depth: 0.0,
            }
        }));

        let alarms = u32::from_le_bytes(alarms);
        for bit in (0..u32::BITS).filter(|&bit| alarms & (1 << bit) != 0) {
            let Some(alarm) = Alarm::from_bit(bit) else {
                continue;
            };
            if let Some(kind) = alarm.event() {
                self.pending.push(Sample::Event(Event { kind, alarm }));
            }
        }

        self.offset += self.header.sample_size;
        self.count += 1;

        self.air_integration(gas_mix)
    }

    /// Move the dive clock forward.
    fn advance(&mut self, seconds: u32) -> Result<(), SampleError> {
        self.time = self
            .time
            .checked_add(seconds)
            .ok_or(SampleError::TimeOverflow { count: self.count })?;
        Ok(())
    }

    /// Time, depth, temperature and gas mix changes.
    fn common(&mut self, depth: u16, temperature: u16, gas_mix: usize) -> Result<(), SampleError> {
        self.advance(self.header.interval)?;
        self.pending.push(Sample::Time(self.time));
        self.pending.push(Sample::Depth(depth as f64 / 10.0));
        self.pending
            .push(Sample::Temperature(temperature as f64 / 10.0));

        let count = self.header.gas_mixes.len();
        if count > 0 {
            if gas_mix >= count {
                Err(SampleError::GasMix {
                    index: gas_mix,
                    count,
                })?;
            }
            if self.previous_gas_mix != Some(gas_mix) {
                self.pending.push(Sample::GasMix(gas_mix));
                self.previous_gas_mix = Some(gas_mix);
            }
        }

        Ok(())
    }

    /// Tank pressure following every fourth sample.
    fn air_integration(&mut self, gas_mix: usize) -> Result<(), SampleError> {
        if !self.header.model.layout().air_integrated || self.count % 4 != 0 {
            return Ok(());
        }

        let (pressure, size) = match self.header.model.family() {
            Family::Legacy => (bytes::u16_le(self.data, self.offset)?, AIR_BLOCK_SIZE),
            Family::RecordStream => {
                let record = record::validate(self.data, self.offset, RecordKind::AirIntegration)?;
                (
                    bytes::u16_le(record, self.marker)?,
                    RecordKind::AirIntegration.size(),
                )
            }
        };

        // The tank follows the gas mix in use.
        if gas_mix < self.header.tanks.len() {
            self.pending.push(Sample::Pressure {
                tank: gas_mix,
                value: pressure as f64 / 100.0,
            });
        } else if pressure != 0 {
            log::warn!("Invalid tank {gas_mix} with non-zero pressure.");
        }

        self.offset += size;
        Ok(())
    }
}

impl Iterator for Samples<'_> {
    type Item = Result<Sample, SampleError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sample) = self.pending.pop() {
                return Some(Ok(sample));
            }

            match core::mem::replace(&mut self.state, State::Done) {
                State::Done => return None,
                State::Failed(err) => return Some(Err(err)),
                state => self.state = state,
            }

            if let Err(err) = self.step() {
                self.state = State::Failed(err);
            }

            // Events are popped from the back.
            self.pending.reverse();
        }
    }
}

impl FusedIterator for Samples<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_bits_follow_variant_order() {
        assert_eq!(Alarm::from_bit(0), None);
        assert_eq!(Alarm::from_bit(1), Some(Alarm::SlowDown));
        assert_eq!(Alarm::from_bit(7), Some(Alarm::MissedDeco));
        assert_eq!(Alarm::from_bit(27), Some(Alarm::GasAdded));
        assert_eq!(Alarm::from_bit(28), None);
    }

    #[test]
    fn only_ascent_and_deco_alarms_raise_events() {
        let raised: usize = (0..32)
            .filter_map(Alarm::from_bit)
            .filter(|alarm| alarm.event().is_some())
            .count();
        assert_eq!(raised, 4);
        assert_eq!(
            Alarm::UncontrolledAscent.event(),
            Some(EventKind::Ascent)
        );
        assert_eq!(
            Alarm::DiveViolationDeco.event(),
            Some(EventKind::Ceiling)
        );
    }
}
