//! Container signature and byte-order detection

use std::io::Cursor;

use crate::codec::Codec;
use crate::error::{Result, ShockwaveError};
use crate::reader::{ChunkReader, Endianness};
use crate::tag::ChunkTag;

/// Size of the `RIFX <len> <codec>` header
pub const HEADER_LEN: u64 = 12;

/// Parsed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub endian: Endianness,
    /// Declared length following the signature
    pub length: u32,
    pub codec: Codec,
}

/// What the leading bytes of a blob describe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// `MZ` executable, possibly a projector with embedded movies
    Executable,
    Container(ContainerHeader),
}

/// Determine byte order from a signature tag
pub fn endian_for(magic: [u8; 4]) -> Result<Endianness> {
    match &magic {
        b"RIFX" => Ok(Endianness::Big),
        b"XFIR" => Ok(Endianness::Little),
        _ => Err(ShockwaveError::UnknownContainer(magic)),
    }
}

/// Inspect the first bytes of a blob
pub fn detect(data: &[u8]) -> Result<Signature> {
    if data.starts_with(b"MZ") {
        return Ok(Signature::Executable);
    }

    let mut magic = [0u8; 4];
    let n = data.len().min(4);
    magic[..n].copy_from_slice(&data[..n]);
    let endian = endian_for(magic)?;

    let mut reader = ChunkReader::new(Cursor::new(data), endian);
    reader.skip(4)?;
    let header_tag = ChunkTag(magic);
    let length = reader
        .read_u32()
        .map_err(ShockwaveError::truncated(header_tag))?;
    let codec_tag = reader
        .read_tag()
        .map_err(ShockwaveError::truncated(header_tag))?;
    let codec = Codec::from_tag(codec_tag).ok_or(ShockwaveError::UnknownCodec(codec_tag))?;

    tracing::debug!(
        "Signature {} length={} codec={} ({:?})",
        header_tag,
        length,
        codec.tag,
        codec.kind
    );

    Ok(Signature::Container(ContainerHeader {
        endian,
        length,
        codec,
    }))
}
