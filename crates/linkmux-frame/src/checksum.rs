//! CRC-16/CCITT-FALSE.
//!
//! Polynomial `0x1021`, seed `0xFFFF`, MSB-first, no final XOR. Both ends of
//! a link must agree on these values; changing them is a wire break.

/// Generator polynomial.
pub const POLYNOMIAL: u16 = 0x1021;

/// Initial register value for [`compute`].
pub const SEED: u16 = 0xFFFF;

static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Fold one byte into a running checksum.
#[inline]
pub fn update(crc: u16, byte: u8) -> u16 {
    let index = ((crc >> 8) ^ u16::from(byte)) & 0x00FF;
    (crc << 8) ^ TABLE[index as usize]
}

/// Checksum of a whole buffer, starting from [`SEED`].
pub fn compute(bytes: &[u8]) -> u16 {
    bytes.iter().fold(SEED, |crc, &byte| update(crc, byte))
}
