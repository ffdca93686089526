//! Downstream decoder seam
//!
//! A [`ResourceDecoder`] turns the bytes of one resource kind into
//! something usable. The session runs it across every resource of its
//! tag and collects one [`DecodeOutcome`] per resource; a failing
//! resource never stops the run.

use std::collections::HashMap;

use crate::bitmap::{self, DecodedBitmap};
use crate::cast::CastMember;
use crate::error::{Result, ShockwaveError};
use crate::palette::PaletteRegistry;
use crate::resource::Resource;
use crate::tag::ChunkTag;
use crate::version::Version;

/// Everything a decoder may consult besides the resource itself
pub struct DecodeContext<'a> {
    /// Cast metadata keyed by the resource id of the owning cast chunk
    pub casts: &'a HashMap<u32, CastMember>,
    pub palettes: &'a PaletteRegistry,
    pub version: Version,
}

impl DecodeContext<'_> {
    /// Cast member owning a resource, via its KEY* link
    pub fn cast_for(&self, resource: &Resource) -> Option<&CastMember> {
        let cast_id = u32::try_from(resource.cast_id()?).ok()?;
        self.casts.get(&cast_id)
    }
}

#[derive(Debug)]
pub enum DecodeOutcome<T> {
    Complete { id: u32, value: T },
    /// The resource could not be decoded
    Incomplete { id: u32, reason: String },
    /// The resource is of a kind or subtype the decoder does not handle
    Unhandled { id: u32, tag: ChunkTag, detail: String },
}

impl<T> DecodeOutcome<T> {
    pub fn id(&self) -> u32 {
        match self {
            DecodeOutcome::Complete { id, .. }
            | DecodeOutcome::Incomplete { id, .. }
            | DecodeOutcome::Unhandled { id, .. } => *id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeOutcome::Complete { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            DecodeOutcome::Complete { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Classify a decoder result. `UnhandledType` and unsupported depths
    /// are "unhandled"; every other error is "incomplete".
    pub(crate) fn from_result(resource: &Resource, result: Result<T>) -> Self {
        let id = resource.id();
        match result {
            Ok(value) => DecodeOutcome::Complete { id, value },
            Err(ShockwaveError::UnhandledType { tag, detail }) => {
                DecodeOutcome::Unhandled { id, tag, detail }
            }
            Err(ShockwaveError::UnsupportedDepth(depth)) => DecodeOutcome::Unhandled {
                id,
                tag: resource.tag(),
                detail: format!("{}-bit bitmap", depth),
            },
            Err(e) => DecodeOutcome::Incomplete {
                id,
                reason: e.to_string(),
            },
        }
    }
}

pub trait ResourceDecoder {
    type Output;

    /// Resource kind this decoder consumes
    fn tag(&self) -> ChunkTag;

    /// Decode one resolved resource
    fn decode(&self, resource: &Resource, bytes: &[u8], ctx: &DecodeContext<'_>)
        -> Result<Self::Output>;
}

/// BITD decoder driven by the owning bitmap cast member
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapDecoder;

impl ResourceDecoder for BitmapDecoder {
    type Output = DecodedBitmap;

    fn tag(&self) -> ChunkTag {
        ChunkTag::BITD
    }

    fn decode(
        &self,
        resource: &Resource,
        bytes: &[u8],
        ctx: &DecodeContext<'_>,
    ) -> Result<DecodedBitmap> {
        let cast = ctx.cast_for(resource).ok_or_else(|| ShockwaveError::UnhandledType {
            tag: ChunkTag::BITD,
            detail: format!("resource {} has no cast metadata", resource.id()),
        })?;
        let info = cast.bitmap.as_ref().ok_or_else(|| ShockwaveError::UnhandledType {
            tag: ChunkTag::BITD,
            detail: format!("cast member {:?} is {:?}, not a bitmap", cast.name, cast.cast_type),
        })?;
        bitmap::decode_bitd(bytes, &info.params(), ctx.palettes)
    }
}
