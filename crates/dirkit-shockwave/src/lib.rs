//! Director / Shockwave container extraction
//!
//! This crate builds resource tables for Macromedia Director movies:
//! - RIFX/XFIR signature and byte-order detection
//! - Standard (imap/mmap) and Afterburner (ABMP/FGEI/ILS) indexes
//! - Movies embedded in Windows projector executables
//! - BITD bitmap decoding to PNG
//!
//! Start with [`Session::open`] for a bare container or [`open_any`] for
//! anything that might be a projector.

pub mod afterburner;
pub mod bitmap;
pub mod cast;
pub mod codec;
pub mod decode;
pub mod error;
pub mod exe;
pub mod key;
pub mod palette;
pub mod reader;
pub mod resource;
pub mod session;
pub mod signature;
pub mod standard;
pub mod store;
pub mod tag;
pub mod varint;
pub mod version;

pub use bitmap::{convert_bitmap, decode_bitd, BitmapParams, DecodedBitmap};
pub use cast::{BitmapInfo, CastMember, CastType};
pub use codec::{Codec, CodecKind};
pub use decode::{BitmapDecoder, DecodeContext, DecodeOutcome, ResourceDecoder};
pub use error::{Result, ShockwaveError, Warning};
pub use palette::{BuiltinPalette, Palette, PaletteRegistry};
pub use reader::Endianness;
pub use resource::{Compression, Resource, ResourceMeta};
pub use session::{open_any, Extraction, Movie, Session};
pub use store::ResourceStore;
pub use tag::ChunkTag;
pub use version::Version;
