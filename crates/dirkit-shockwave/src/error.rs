//! Error and warning types

use crate::tag::ChunkTag;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShockwaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown container signature: {0:?}")]
    UnknownContainer([u8; 4]),

    #[error("Unknown codec: {0}")]
    UnknownCodec(ChunkTag),

    #[error("Unsupported bit depth: {0}")]
    UnsupportedDepth(u8),

    #[error("Failed to inflate {chunk} chunk: {source}")]
    Inflate {
        chunk: ChunkTag,
        #[source]
        source: std::io::Error,
    },

    #[error("Truncated {chunk} chunk: {source}")]
    Truncated {
        chunk: ChunkTag,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected {expected} chunk at offset {offset}, found {found}")]
    UnexpectedChunk {
        expected: ChunkTag,
        found: ChunkTag,
        offset: u64,
    },

    #[error("Resource {id} ({tag}) lies outside the container (offset {offset}, length {len})")]
    OutOfBounds {
        id: u32,
        tag: ChunkTag,
        offset: i64,
        len: u64,
    },

    #[error("Not a Director projector")]
    NotAnExecutable,

    #[error("No embedded Director movie found: {0}")]
    NoEmbeddedContainer(String),

    #[error("Palette {0} is not registered")]
    PaletteNotFound(i16),

    #[error("Missing {0} resource")]
    MissingResource(ChunkTag),

    #[error("Unhandled {tag} subtype: {detail}")]
    UnhandledType { tag: ChunkTag, detail: String },

    #[error("Corrupt bitmap data: {0}")]
    CorruptBitmap(String),

    #[error("Invalid palette data: {0}")]
    InvalidPalette(String),

    #[error("Failed to encode image: {0}")]
    ImageEncode(#[from] png::EncodingError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShockwaveError {
    /// Wrap a read failure inside a named chunk
    pub(crate) fn truncated(chunk: ChunkTag) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ShockwaveError::Truncated { chunk, source }
    }

    pub(crate) fn inflate(chunk: ChunkTag) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ShockwaveError::Inflate { chunk, source }
    }
}

pub type Result<T> = std::result::Result<T, ShockwaveError>;

/// A recoverable problem noticed while building a resource table.
///
/// Warnings never change control flow; they are collected on the session
/// and logged as they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// KEY* record whose chunk type is outside the known tag set
    InvalidKeyRecord { element_index: i32, tag: ChunkTag },
    /// KEY* record pointing at a resource id that does not exist
    OrphanKeyRecord { element_index: i32, tag: ChunkTag },
    /// Container has no KEY* table, so no resource is linked to a cast
    MissingKeyTable,
    /// Deferred Afterburner entry that the ILS stream never delivered
    UnresolvedIlsEntry { id: u32, tag: ChunkTag },
    /// Fver/Fcdr body could not be interpreted
    MetadataChunk { chunk: ChunkTag, message: String },
    /// Fewer bytes available than a resource entry declares
    ShortRead { id: u32, expected: usize, actual: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::InvalidKeyRecord { element_index, tag } => {
                write!(f, "KEY* record {} has unknown type {}", element_index, tag)
            }
            Warning::OrphanKeyRecord { element_index, tag } => {
                write!(f, "KEY* record {} ({}) has no matching resource", element_index, tag)
            }
            Warning::MissingKeyTable => write!(f, "no KEY* resource"),
            Warning::UnresolvedIlsEntry { id, tag } => {
                write!(f, "resource {} ({}) was not found in the ILS stream", id, tag)
            }
            Warning::MetadataChunk { chunk, message } => write!(f, "{}: {}", chunk, message),
            Warning::ShortRead { id, expected, actual } => {
                write!(f, "resource {} expected {} bytes, got {}", id, expected, actual)
            }
        }
    }
}

/// Collects warnings and mirrors each one to the log
#[derive(Debug, Default)]
pub(crate) struct WarningSink {
    warnings: Vec<Warning>,
}

impl WarningSink {
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}
