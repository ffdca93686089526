//! Four-character chunk tags

use std::fmt;

/// A four-character chunk tag, always stored in reading order
/// (little-endian files are un-reversed on read).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    pub const RIFX: ChunkTag = ChunkTag(*b"RIFX");
    pub const XFIR: ChunkTag = ChunkTag(*b"XFIR");
    pub const IMAP: ChunkTag = ChunkTag(*b"imap");
    pub const MMAP: ChunkTag = ChunkTag(*b"mmap");
    pub const KEY: ChunkTag = ChunkTag(*b"KEY*");
    pub const FVER: ChunkTag = ChunkTag(*b"Fver");
    pub const FCDR: ChunkTag = ChunkTag(*b"Fcdr");
    pub const ABMP: ChunkTag = ChunkTag(*b"ABMP");
    pub const FGEI: ChunkTag = ChunkTag(*b"FGEI");
    pub const ILS: ChunkTag = ChunkTag(*b"ILS ");
    pub const BITD: ChunkTag = ChunkTag(*b"BITD");
    pub const CAST: ChunkTag = ChunkTag(*b"CASt");
    pub const CLUT: ChunkTag = ChunkTag(*b"CLUT");
    pub const FILE: ChunkTag = ChunkTag(*b"File");
    pub const DICT: ChunkTag = ChunkTag(*b"Dict");

    pub const fn new(bytes: [u8; 4]) -> Self {
        ChunkTag(bytes)
    }

    /// Build a tag from bytes as stored on disk
    pub fn from_stored(mut bytes: [u8; 4], little_endian: bool) -> Self {
        if little_endian {
            bytes.reverse();
        }
        ChunkTag(bytes)
    }

    /// Bytes as they would be stored on disk
    pub fn to_stored(self, little_endian: bool) -> [u8; 4] {
        let mut bytes = self.0;
        if little_endian {
            bytes.reverse();
        }
        bytes
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Whether this tag belongs to the closed set of chunk types that
    /// KEY* records may reference.
    pub fn is_known(&self) -> bool {
        KNOWN_TAGS.contains(self)
    }

    /// Whether this tag names a nested container header rather than a resource
    pub fn is_container(&self) -> bool {
        *self == ChunkTag::RIFX || *self == ChunkTag::XFIR
    }
}

/// Tags accepted in KEY* records and used for downstream dispatch
pub const KNOWN_TAGS: [ChunkTag; 29] = [
    ChunkTag(*b"ABMP"),
    ChunkTag(*b"BITD"),
    ChunkTag(*b"CAS*"),
    ChunkTag(*b"CASt"),
    ChunkTag(*b"CLUT"),
    ChunkTag(*b"ediM"),
    ChunkTag(*b"Fcdr"),
    ChunkTag(*b"FCOL"),
    ChunkTag(*b"FGEI"),
    ChunkTag(*b"Fmap"),
    ChunkTag(*b"Fver"),
    ChunkTag(*b"FXmp"),
    ChunkTag(*b"GRID"),
    ChunkTag(*b"ILS "),
    ChunkTag(*b"mmap"),
    ChunkTag(*b"VWCF"),
    ChunkTag(*b"DRCF"),
    ChunkTag(*b"KEY*"),
    ChunkTag(*b"LctX"),
    ChunkTag(*b"Lnam"),
    ChunkTag(*b"MCsL"),
    ChunkTag(*b"snd "),
    ChunkTag(*b"Sord"),
    ChunkTag(*b"STXT"),
    ChunkTag(*b"VWFI"),
    ChunkTag(*b"VWLB"),
    ChunkTag(*b"XMED"),
    ChunkTag(*b"XTRl"),
    ChunkTag(*b"VWSC"),
];

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self)
    }
}

impl From<&[u8; 4]> for ChunkTag {
    fn from(bytes: &[u8; 4]) -> Self {
        ChunkTag(*bytes)
    }
}

impl std::str::FromStr for ChunkTag {
    type Err = String;

    /// Parses a tag; shorter names are padded with spaces (`"ILS"` -> `"ILS "`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(format!("chunk tag must be 1-4 bytes: {:?}", s));
        }
        let mut tag = [b' '; 4];
        tag[..bytes.len()].copy_from_slice(bytes);
        Ok(ChunkTag(tag))
    }
}
