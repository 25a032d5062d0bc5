//! Helper for computing cyclic redundancy checks.

/// Accumulate a slice of bytes into a CRC-16/CCITT value (polynomial
/// `0x1021`, most significant bit first, no final XOR).
pub fn compute_crc(init: u16, r: &[u8]) -> u16 {
    r.iter().fold(init, |acc, b| crc_byte(acc, *b))
}

/// Accumulate a single byte into a cyclic redundancy check value.
fn crc_byte(mut crc: u16, b: u8) -> u16 {
    const CRC_TABLE: [u16; 16] = [
        0x0000, 0x1021, 0x2042, 0x3063, 0x4084, 0x50A5, 0x60C6, 0x70E7, 0x8108, 0x9129, 0xA14A,
        0xB16B, 0xC18C, 0xD1AD, 0xE1CE, 0xF1EF,
    ];

    let index = ((crc >> 12) ^ (b >> 4) as u16) & 0xF;
    crc = (crc << 4) ^ CRC_TABLE[index as usize];

    let index = ((crc >> 12) ^ (b & 0xF) as u16) & 0xF;
    crc = (crc << 4) ^ CRC_TABLE[index as usize];

    crc
}
