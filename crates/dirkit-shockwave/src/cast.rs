//! Cast member metadata needed by the resource decoders
//!
//! Only the parts of a `CASt` chunk the bitmap path relies on are read:
//! the member type, its name, and the bitmap geometry/depth/palette.

use std::io::Cursor;

use crate::bitmap::BitmapParams;
use crate::error::{Result, ShockwaveError};
use crate::palette::BuiltinPalette;
use crate::reader::{ChunkReader, Endianness};
use crate::tag::ChunkTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Bitmap = 1,
    FilmLoop = 2,
    Field = 3,
    Palette = 4,
    Pict = 5,
    Sound = 6,
    Button = 7,
    Shape = 8,
    Movie = 9,
    DigitalVideo = 10,
    Script = 11,
    Text = 12,
    Ole = 13,
    Transition = 14,
    Xtra = 15,
    Unknown = 255,
}

impl From<u32> for CastType {
    fn from(v: u32) -> Self {
        match v {
            1 => CastType::Bitmap,
            2 => CastType::FilmLoop,
            3 => CastType::Field,
            4 => CastType::Palette,
            5 => CastType::Pict,
            6 => CastType::Sound,
            7 => CastType::Button,
            8 => CastType::Shape,
            9 => CastType::Movie,
            10 => CastType::DigitalVideo,
            11 => CastType::Script,
            12 => CastType::Text,
            13 => CastType::Ole,
            14 => CastType::Transition,
            15 => CastType::Xtra,
            _ => CastType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: u16,
    pub height: u16,
    pub reg_x: i16,
    pub reg_y: i16,
    pub bit_depth: u8,
    pub bit_alpha: u8,
    pub palette_ref: i16,
}

impl BitmapInfo {
    pub fn has_alpha(&self) -> bool {
        self.bit_alpha > 0
    }

    pub fn params(&self) -> BitmapParams {
        BitmapParams {
            width: self.width,
            height: self.height,
            depth: self.bit_depth,
            palette_id: self.palette_ref,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastMember {
    pub cast_type: CastType,
    pub name: String,
    pub bitmap: Option<BitmapInfo>,
}

impl CastMember {
    pub fn bitmap(name: impl Into<String>, info: BitmapInfo) -> Self {
        Self {
            cast_type: CastType::Bitmap,
            name: name.into(),
            bitmap: Some(info),
        }
    }

    /// Parse a Director 5+ `CASt` payload. Cast data is big-endian
    /// whatever the container byte order.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = ChunkReader::new(Cursor::new(payload), Endianness::Big);
        let truncated = ShockwaveError::truncated;

        let cast_type = CastType::from(reader.read_u32().map_err(truncated(ChunkTag::CAST))?);
        let info_len = reader.read_u32().map_err(truncated(ChunkTag::CAST))?;
        let specific_len = reader.read_u32().map_err(truncated(ChunkTag::CAST))?;
        tracing::trace!(
            "CASt type={:?} info_len={} specific_len={}",
            cast_type,
            info_len,
            specific_len
        );

        let info_start = reader.pos()?;
        let name = if info_len > 0 {
            read_name(&mut reader).map_err(truncated(ChunkTag::CAST))?
        } else {
            String::new()
        };
        reader.seek_to(info_start + u64::from(info_len))?;

        let bitmap = match cast_type {
            CastType::Bitmap => {
                let specific = reader.read_up_to(specific_len as usize)?;
                Some(parse_bitmap_info(&specific).map_err(truncated(ChunkTag::CAST))?)
            }
            _ => None,
        };

        Ok(Self {
            cast_type,
            name,
            bitmap,
        })
    }
}

/// First string of the info block: 16 x i16 header, offset table, strings
fn read_name(reader: &mut ChunkReader<Cursor<&[u8]>>) -> std::io::Result<String> {
    reader.skip(32)?;
    let field_count = reader.read_u16()?;
    reader.skip(i64::from(field_count) * 4)?;
    let _field_data_len = reader.read_u32()?;
    if field_count == 0 {
        return Ok(String::new());
    }
    let len = reader.read_u8()? as usize;
    let bytes = reader.read_bytes(len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Bitmap-specific data. Short records predate the depth field and are
/// 1-bit.
fn parse_bitmap_info(data: &[u8]) -> std::io::Result<BitmapInfo> {
    let mut reader = ChunkReader::new(Cursor::new(data), Endianness::Big);
    let _flags = reader.read_u16()?;
    let top = reader.read_i16()?;
    let left = reader.read_i16()?;
    let bottom = reader.read_i16()?;
    let right = reader.read_i16()?;
    reader.skip(8)?;
    let reg_y = reader.read_i16()?;
    let reg_x = reader.read_i16()?;

    let (bit_alpha, bit_depth, palette_ref) = match reader.read_u8() {
        Ok(bit_alpha) => {
            let bit_depth = reader.read_u8()?;
            let _unknown = reader.read_u16()?;
            (bit_alpha, bit_depth, reader.read_i16()?)
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            (0, 1, BuiltinPalette::SystemMac.id())
        }
        Err(e) => return Err(e),
    };

    Ok(BitmapInfo {
        width: (right - left) as u16,
        height: (bottom - top) as u16,
        reg_x: reg_x - left,
        reg_y: reg_y - top,
        bit_depth,
        bit_alpha,
        palette_ref,
    })
}
