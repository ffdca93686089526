//! Codec tag lookup: which index scheme a container uses

use crate::tag::ChunkTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Flat imap/mmap index with absolute offsets
    Standard,
    /// Compressed Fver/Fcdr/ABMP/FGEI/ILS index
    Afterburner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    pub tag: ChunkTag,
    pub kind: CodecKind,
}

impl Codec {
    /// Look up a codec tag (already un-reversed)
    pub fn from_tag(tag: ChunkTag) -> Option<Self> {
        let kind = match tag.as_bytes() {
            b"MV85" | b"MV93" | b"MC93" | b"MC95" => CodecKind::Standard,
            b"FGDM" | b"FGDC" => CodecKind::Afterburner,
            _ => return None,
        };
        Some(Codec { tag, kind })
    }

    pub fn is_afterburner(&self) -> bool {
        self.kind == CodecKind::Afterburner
    }
}
