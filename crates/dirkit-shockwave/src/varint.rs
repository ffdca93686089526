//! Base-128 variable-length integers used by Afterburner chunks.
//!
//! Each byte contributes its low seven bits, most significant group first;
//! a set high bit means another byte follows.

use std::io::{self, Read};

use byteorder::ReadBytesExt;

/// Read one varint, returning the value and the number of bytes consumed
pub fn read_varint<R: Read>(reader: &mut R) -> io::Result<(u32, usize)> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;
    loop {
        let b = reader.read_u8()?;
        consumed += 1;
        value = (value << 7) | u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Ok((value, consumed));
        }
    }
}

/// Encode a value in the same big-group-first form
pub fn encode_varint(mut value: u32) -> Vec<u8> {
    let mut groups = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    groups.reverse();
    groups
}
