//! Resource entries: pending index entries and resolved payloads

use crate::tag::ChunkTag;

/// Offset value marking an Afterburner entry stored in the ILS stream
pub const DEFERRED_OFFSET: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Raw,
    Zlib,
}

impl Compression {
    /// ABMP compression type: 0 is zlib, anything else is stored as-is
    pub fn from_abmp(kind: u32) -> Self {
        if kind == 0 {
            Compression::Zlib
        } else {
            Compression::Raw
        }
    }
}

/// Index metadata shared by both resource states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    pub tag: ChunkTag,
    /// Absolute offset in the container, or [`DEFERRED_OFFSET`]
    pub offset: i64,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub compression: Compression,
    /// Cast slot owning this resource, linked through KEY*
    pub cast_id: Option<i32>,
}

impl ResourceMeta {
    pub fn is_deferred(&self) -> bool {
        self.offset == DEFERRED_OFFSET
    }
}

/// A resource either awaiting its bytes or fully materialized.
/// Bytes only exist on the `Resolved` side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Pending { id: u32, meta: ResourceMeta },
    Resolved { id: u32, meta: ResourceMeta, bytes: Vec<u8> },
}

impl Resource {
    pub fn pending(id: u32, meta: ResourceMeta) -> Self {
        Resource::Pending { id, meta }
    }

    pub fn id(&self) -> u32 {
        match self {
            Resource::Pending { id, .. } | Resource::Resolved { id, .. } => *id,
        }
    }

    pub fn meta(&self) -> &ResourceMeta {
        match self {
            Resource::Pending { meta, .. } | Resource::Resolved { meta, .. } => meta,
        }
    }

    pub(crate) fn meta_mut(&mut self) -> &mut ResourceMeta {
        match self {
            Resource::Pending { meta, .. } | Resource::Resolved { meta, .. } => meta,
        }
    }

    pub fn tag(&self) -> ChunkTag {
        self.meta().tag
    }

    pub fn cast_id(&self) -> Option<i32> {
        self.meta().cast_id
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Resource::Resolved { bytes, .. } => Some(bytes),
            Resource::Pending { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resource::Resolved { .. })
    }

    /// Attach bytes. Resolved resources are immutable and stay as they are;
    /// returns whether the resource changed state.
    pub(crate) fn resolve(&mut self, bytes: Vec<u8>) -> bool {
        if let Resource::Pending { id, meta } = self {
            *self = Resource::Resolved {
                id: *id,
                meta: meta.clone(),
                bytes,
            };
            return true;
        }
        false
    }
}
