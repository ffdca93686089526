//! PackBits-style run-length coding used by BITD payloads
//!
//! A signed control byte `c` introduces each run: `c >= 0` copies the next
//! `c + 1` bytes, `c < 0` repeats the next byte `1 - c` times. End of input
//! at a control byte ends the stream.

use crate::error::{Result, ShockwaveError};

const MAX_LITERAL: usize = 128;
const MAX_REPEAT: usize = 129;

/// Decode runs, handing each output byte to `emit`
fn unpack_into(data: &[u8], mut emit: impl FnMut(u8)) -> Result<()> {
    let mut src = 0usize;
    while let Some(&control) = data.get(src) {
        src += 1;
        let control = control as i8;
        if control >= 0 {
            let count = control as usize + 1;
            let literal = data.get(src..src + count).ok_or_else(|| {
                ShockwaveError::CorruptBitmap(format!(
                    "literal run of {} bytes at {} runs past end of data ({} bytes)",
                    count,
                    src,
                    data.len()
                ))
            })?;
            literal.iter().copied().for_each(&mut emit);
            src += count;
        } else {
            let count = (1 - i16::from(control)) as usize;
            let value = *data.get(src).ok_or_else(|| {
                ShockwaveError::CorruptBitmap(format!("repeat run at {} has no value byte", src))
            })?;
            src += 1;
            for _ in 0..count {
                emit(value);
            }
        }
    }
    Ok(())
}

/// Decode a run-length stream into a flat byte buffer
pub fn unpack(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    unpack_into(data, |b| out.push(b))?;
    Ok(out)
}

/// Decode a run-length stream of planar scanlines.
///
/// Output accumulates into a `width * planes` buffer; each time it fills,
/// `flush` receives the whole scanline (plane 0 first) and the buffer
/// starts over. Runs may continue across a scanline boundary. Returns the
/// number of scanlines flushed; a trailing partial scanline is dropped.
pub fn unpack_scanlines(
    data: &[u8],
    width: usize,
    planes: usize,
    mut flush: impl FnMut(&[u8]),
) -> Result<usize> {
    let mut line = vec![0u8; width * planes];
    if line.is_empty() {
        return Ok(0);
    }
    let mut filled = 0usize;
    let mut lines = 0usize;
    unpack_into(data, |b| {
        line[filled] = b;
        filled += 1;
        if filled == line.len() {
            flush(&line);
            filled = 0;
            lines += 1;
        }
    })?;
    if filled > 0 {
        tracing::debug!("Dropped partial scanline of {} bytes", filled);
    }
    Ok(lines)
}

fn run_length(data: &[u8]) -> usize {
    data.iter()
        .take(MAX_REPEAT)
        .take_while(|&&b| b == data[0])
        .count()
}

/// Encode bytes with the same scheme. Repeats of two or more identical
/// bytes become repeat runs; everything else goes into literal runs.
pub fn pack(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / MAX_LITERAL + 1);
    let mut i = 0;
    while i < data.len() {
        let run = run_length(&data[i..]);
        if run >= 2 {
            out.push((1 - run as i16) as i8 as u8);
            out.push(data[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < data.len() && i - start < MAX_LITERAL && run_length(&data[i..]) < 2 {
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&data[start..i]);
    }
    out
}
