#![allow(dead_code)]

//! Builders for synthetic dives.

use regulator::sans::{check::compute_crc, header::Model};

/// Header size for a legacy model and mode.
pub fn header_size(model: Model, mode: u16) -> usize {
    match model {
        Model::IconHd => 0x5C,
        Model::IconHdNet => 0x80,
        Model::QuadAir | Model::SmartAir => 0x84,
        Model::Smart if mode == 3 => 0x2E,
        Model::Smart => 0x5C,
        Model::SmartApnea => 0x50,
        Model::Genius => unreachable!(),
    }
}

/// Assemble a legacy dive from its profile bytes.
///
/// The closure receives the header as the decoder addresses it, after the
/// 4 byte prefix on models that have one.
pub fn legacy(
    model: Model,
    mode: u16,
    samples: u16,
    profile: &[u8],
    header: impl FnOnce(&mut [u8]),
) -> Vec<u8> {
    let size = header_size(model, mode);
    let (count_first, prefixed, tail) = match model {
        Model::Smart | Model::SmartAir => (true, false, 4),
        Model::SmartApnea => (true, false, 6),
        _ => (false, true, size),
    };

    let mut data = vec![0; 4];
    data.extend_from_slice(profile);
    data.extend(vec![0; size]);
    let length = data.len();

    let p = length - size + if prefixed { 4 } else { 0 };
    header(&mut data[p..]);

    let t = length - tail;
    let (first, second) = if count_first {
        (samples, mode)
    } else {
        (mode, samples)
    };
    data[t..t + 2].copy_from_slice(&first.to_le_bytes());
    data[t + 2..t + 4].copy_from_slice(&second.to_le_bytes());

    data[..4].copy_from_slice(&(length as u32).to_le_bytes());
    data
}

/// A legacy sample, padded to the sample size.
pub fn legacy_sample(size: usize, depth: u16, temperature: u16, gas_mix: u8) -> Vec<u8> {
    let mut sample = vec![0; size];
    sample[..2].copy_from_slice(&depth.to_le_bytes());
    let status = temperature & 0x0FFF | (gas_mix as u16) << 12;
    sample[2..4].copy_from_slice(&status.to_le_bytes());
    sample
}

/// A freedive or apnea segment, padded to the sample size.
pub fn segment(size: usize, max_depth: u16, dive_time: u16, surface_time: u16) -> Vec<u8> {
    let mut sample = vec![0; size];
    sample[..2].copy_from_slice(&max_depth.to_le_bytes());
    sample[2..4].copy_from_slice(&dive_time.to_le_bytes());
    sample[4..6].copy_from_slice(&surface_time.to_le_bytes());
    sample
}

pub fn put_u16(r: &mut [u8], offset: usize, value: u16) {
    r[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(r: &mut [u8], offset: usize, value: u32) {
    r[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// An Icon HD nitrox dive: two mixes, three samples every 5 s, fresh water.
pub fn iconhd_nitrox() -> Vec<u8> {
    let mut profile = legacy_sample(8, 100, 215, 0);
    profile.extend(legacy_sample(8, 150, 210, 0));
    profile.extend(legacy_sample(8, 120, 205, 1));

    legacy(Model::IconHd, 2, 3, &profile, |p| {
        put_u16(p, 0x00, 150);
        // 14:30 on 12 June 2021.
        put_u16(p, 0x02, 14);
        put_u16(p, 0x04, 30);
        put_u16(p, 0x06, 12);
        put_u16(p, 0x08, 5);
        put_u16(p, 0x0A, 121);
        put_u16(p, 0x0C, 0x0410);
        p[0x10] = 21;
        p[0x14] = 50;
        p[0x19] = 0x80;
        put_u16(p, 0x22, 8104);
        put_u16(p, 0x42, 205);
        put_u16(p, 0x44, 215);
    })
}

pub const DSTR: [u8; 4] = *b"DSTR";
pub const TISS: [u8; 4] = *b"TISS";
pub const DPRS: [u8; 4] = *b"DPRS";
pub const AIRS: [u8; 4] = *b"AIRS";
pub const DEND: [u8; 4] = *b"DEND";

/// A framed record with a valid checksum.
pub fn record(tag: [u8; 4], size: usize, payload: impl FnOnce(&mut [u8])) -> Vec<u8> {
    let mut record = vec![0; size];
    record[..4].copy_from_slice(&tag);
    payload(&mut record[4..size - 6]);
    let crc = compute_crc(0, &record[4..size - 6]);
    record[size - 6..size - 4].copy_from_slice(&crc.to_le_bytes());
    record[size - 4..].copy_from_slice(&tag);
    record
}

#[derive(Debug, Clone, Default)]
pub struct GeniusSample {
    pub depth: u16,
    pub temperature: u16,
    pub gas_mix: u32,
    pub alarms: u32,
    /// Stop depth, if a stop is required.
    pub deco_stop: Option<u32>,
    /// Minutes.
    pub deco_time: u16,
    /// Pressure recorded after every fourth sample.
    pub pressure: u16,
}

pub fn genius_sample(sample: &GeniusSample) -> Vec<u8> {
    record(DPRS, 34, |payload| {
        put_u16(payload, 0x00, sample.depth);
        put_u16(payload, 0x04, sample.temperature);
        put_u16(payload, 0x0A, sample.deco_time);
        put_u32(payload, 0x0C, sample.alarms);
        let mut misc = sample.gas_mix << 6;
        if let Some(depth) = sample.deco_stop {
            misc |= 1 << 18 | depth << 19;
        }
        put_u32(payload, 0x14, misc);
    })
}

/// Assemble a Genius dive from its samples.
///
/// The closure receives the 0xB8 byte header after the object tag, settings
/// and sample count are filled in.
pub fn genius(settings: u32, samples: &[GeniusSample], header: impl FnOnce(&mut [u8])) -> Vec<u8> {
    let mut data = vec![0; 0xB8];
    data[0] = 1;
    put_u32(&mut data, 0x0C, settings);
    put_u16(&mut data, 0x20, samples.len() as u16);
    header(&mut data);

    data.extend_from_slice(&[0, 0, 2, 0]);
    data.extend(record(DSTR, 58, |_| {}));
    data.extend(record(TISS, 138, |_| {}));

    for (i, sample) in samples.iter().enumerate() {
        data.extend(genius_sample(sample));
        if (i + 1) % 4 == 0 {
            data.extend(record(AIRS, 16, |payload| {
                put_u16(payload, 0, sample.pressure)
            }));
        }
    }

    data.extend(record(DEND, 162, |_| {}));
    data
}

/// Write a Genius gas mix slot.
pub fn gas_slot(header: &mut [u8], i: usize, oxygen: u32, helium: u32, state: u32) {
    let nitrogen = 100 - oxygen - helium;
    let parameters = oxygen | nitrogen << 7 | helium << 14 | state << 21;
    put_u32(header, 0x54 + i * 20, parameters);
}

/// Write the tank part of a Genius gas mix slot.
pub fn tank_slot(header: &mut [u8], i: usize, begin: u16, end: u16, volume: u16, work: u16) {
    let slot = 0x54 + i * 20;
    put_u16(header, slot + 4, begin);
    put_u16(header, slot + 6, end);
    put_u16(header, slot + 8, volume);
    put_u16(header, slot + 10, work);
}
