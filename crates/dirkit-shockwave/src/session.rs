//! One opened container and everything derived from it
//!
//! A [`Session`] owns the resource store built for a single RIFX/XFIR
//! container along with its byte order, codec, version and the cast
//! metadata the decoders consult. Projectors go through [`open_any`],
//! which yields one session per embedded movie.

use std::collections::HashMap;
use std::io::Cursor;

use crate::afterburner::{self, CompressionDescriptor, FverChunk};
use crate::bitmap::DecodedBitmap;
use crate::cast::CastMember;
use crate::codec::{Codec, CodecKind};
use crate::decode::{BitmapDecoder, DecodeContext, DecodeOutcome, ResourceDecoder};
use crate::error::{Result, ShockwaveError, Warning, WarningSink};
use crate::exe::{self, EmbeddedFile};
use crate::key::KeyTable;
use crate::palette::{Palette, PaletteRegistry};
use crate::reader::{ChunkReader, Endianness};
use crate::resource::Resource;
use crate::signature::{self, ContainerHeader, Signature};
use crate::standard;
use crate::store::ResourceStore;
use crate::tag::ChunkTag;
use crate::version::Version;

#[derive(Debug)]
pub struct Session {
    header: ContainerHeader,
    version: Version,
    base_offset: i64,
    store: ResourceStore,
    keys: Option<KeyTable>,
    fver: Option<FverChunk>,
    compression_types: Vec<CompressionDescriptor>,
    casts: HashMap<u32, CastMember>,
    warnings: Vec<Warning>,
}

impl Session {
    /// Open a RIFX/XFIR container held in memory
    pub fn open(data: &[u8]) -> Result<Self> {
        Self::open_with_base(data, 0)
    }

    /// Open a container whose stored offsets count from `base_offset`
    /// rather than from its first byte. Executables are rejected here;
    /// see [`open_any`].
    pub fn open_with_base(data: &[u8], base_offset: i64) -> Result<Self> {
        let header = match signature::detect(data)? {
            Signature::Container(header) => header,
            Signature::Executable => {
                let mut magic = [0u8; 4];
                let n = data.len().min(4);
                magic[..n].copy_from_slice(&data[..n]);
                return Err(ShockwaveError::UnknownContainer(magic));
            }
        };
        tracing::info!(
            "Opening {:?} container, codec {} ({} bytes)",
            header.endian,
            header.codec.tag,
            data.len()
        );

        let mut reader = ChunkReader::new(Cursor::new(data), header.endian);
        let mut warnings = WarningSink::default();
        let mut session = match header.codec.kind {
            CodecKind::Standard => {
                let index = standard::build(&mut reader, base_offset, &mut warnings)?;
                Session {
                    header,
                    version: index.version,
                    base_offset,
                    store: index.store,
                    keys: index.keys,
                    fver: None,
                    compression_types: Vec::new(),
                    casts: HashMap::new(),
                    warnings: Vec::new(),
                }
            }
            CodecKind::Afterburner => {
                let index = afterburner::build(&mut reader, &mut warnings)?;
                Session {
                    header,
                    version: index.version,
                    base_offset,
                    store: index.store,
                    keys: index.keys,
                    fver: index.fver,
                    compression_types: index.compression_types,
                    casts: HashMap::new(),
                    warnings: Vec::new(),
                }
            }
        };
        session.warnings = warnings.into_vec();

        let casts = session.load_casts();
        tracing::info!(
            "{} resources ({} resolved), {} cast members, {} warnings",
            session.store.len(),
            session.store.resolved_count(),
            casts,
            session.warnings.len()
        );
        Ok(session)
    }

    pub fn endian(&self) -> Endianness {
        self.header.endian
    }

    pub fn codec(&self) -> Codec {
        self.header.codec
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn base_offset(&self) -> i64 {
        self.base_offset
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn keys(&self) -> Option<&KeyTable> {
        self.keys.as_ref()
    }

    /// Afterburner version chunk, when present and readable
    pub fn fver(&self) -> Option<&FverChunk> {
        self.fver.as_ref()
    }

    /// Afterburner compression descriptors from Fcdr
    pub fn compression_types(&self) -> &[CompressionDescriptor] {
        &self.compression_types
    }

    /// Recoverable problems found while building the table
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn all_resources(&self) -> &[Resource] {
        self.store.all()
    }

    pub fn resource_by_id(&self, id: u32) -> Option<&Resource> {
        self.store.get(id)
    }

    pub fn resources_by_tag(&self, tag: ChunkTag) -> Vec<&Resource> {
        self.store.by_tag(tag)
    }

    pub fn casts(&self) -> &HashMap<u32, CastMember> {
        &self.casts
    }

    /// Add or replace cast metadata for the cast chunk with resource id `id`
    pub fn register_cast(&mut self, id: u32, member: CastMember) {
        self.casts.insert(id, member);
    }

    /// Parse every resolved `CASt` resource into the cast map. Members that
    /// fail to parse are skipped. Returns the number of members known.
    pub fn load_casts(&mut self) -> usize {
        for resource in self.store.by_tag(ChunkTag::CAST) {
            let Some(bytes) = resource.bytes() else {
                continue;
            };
            match CastMember::parse(bytes) {
                Ok(member) => {
                    tracing::trace!("Cast #{}: {:?} {:?}", resource.id(), member.cast_type, member.name);
                    self.casts.insert(resource.id(), member);
                }
                Err(e) => tracing::debug!("Skipping cast #{}: {}", resource.id(), e),
            }
        }
        self.casts.len()
    }

    /// Parse a CLUT resource into a palette
    pub fn clut_palette(&self, id: u32) -> Result<Palette> {
        let resource = self
            .store
            .get(id)
            .filter(|r| r.tag() == ChunkTag::CLUT)
            .ok_or(ShockwaveError::MissingResource(ChunkTag::CLUT))?;
        let bytes = resource
            .bytes()
            .ok_or(ShockwaveError::MissingResource(ChunkTag::CLUT))?;
        Palette::from_clut(bytes)
    }

    pub fn decode_context<'a>(&'a self, palettes: &'a PaletteRegistry) -> DecodeContext<'a> {
        DecodeContext {
            casts: &self.casts,
            palettes,
            version: self.version,
        }
    }

    /// Run a decoder over every resource of its tag. Failures become
    /// `Incomplete`/`Unhandled` outcomes; the run always finishes.
    pub fn run_decoder<D: ResourceDecoder>(
        &self,
        decoder: &D,
        palettes: &PaletteRegistry,
    ) -> Vec<DecodeOutcome<D::Output>> {
        let ctx = self.decode_context(palettes);
        self.store
            .by_tag(decoder.tag())
            .into_iter()
            .map(|resource| {
                let outcome = match resource.bytes() {
                    Some(bytes) => DecodeOutcome::from_result(
                        resource,
                        decoder.decode(resource, bytes, &ctx),
                    ),
                    None => DecodeOutcome::Incomplete {
                        id: resource.id(),
                        reason: "resource bytes were never resolved".to_string(),
                    },
                };
                match &outcome {
                    DecodeOutcome::Incomplete { id, reason } => {
                        tracing::warn!("{} #{} incomplete: {}", decoder.tag(), id, reason)
                    }
                    DecodeOutcome::Unhandled { id, tag, detail } => {
                        tracing::info!("{} #{} unhandled: {}", tag, id, detail)
                    }
                    DecodeOutcome::Complete { .. } => {}
                }
                outcome
            })
            .collect()
    }

    /// Decode one BITD resource
    pub fn decode_bitmap(&self, id: u32, palettes: &PaletteRegistry) -> Result<DecodedBitmap> {
        let resource = self
            .store
            .get(id)
            .filter(|r| r.tag() == ChunkTag::BITD)
            .ok_or(ShockwaveError::MissingResource(ChunkTag::BITD))?;
        let bytes = resource
            .bytes()
            .ok_or(ShockwaveError::MissingResource(ChunkTag::BITD))?;
        BitmapDecoder.decode(resource, bytes, &self.decode_context(palettes))
    }
}

/// One movie found in an input file
#[derive(Debug)]
pub struct Movie {
    /// Name from the projector's file table; empty for a bare container
    pub name: String,
    pub session: Result<Session>,
}

/// Everything recovered from one input file
#[derive(Debug, Default)]
pub struct Extraction {
    pub movies: Vec<Movie>,
    /// Non-movie files packed into a projector
    pub artifacts: Vec<EmbeddedFile>,
}

/// Open a bare container or every movie inside a projector.
///
/// Projector movies are opened in the order the installer lists them.
/// A movie that fails to open is reported in its slot and does not stop
/// the others.
pub fn open_any(data: &[u8]) -> Result<Extraction> {
    match signature::detect(data)? {
        Signature::Container(_) => Ok(Extraction {
            movies: vec![Movie {
                name: String::new(),
                session: Session::open(data),
            }],
            artifacts: Vec::new(),
        }),
        Signature::Executable => {
            let unwrapped = exe::unwrap_executable(data)?;
            let mut extraction = Extraction::default();
            for file in unwrapped.files {
                if !file.is_container() {
                    tracing::debug!("Keeping {} ({:?}) as artifact", file.name, file.kind);
                    extraction.artifacts.push(file);
                    continue;
                }
                tracing::info!("Opening embedded movie {}", file.name);
                let session = Session::open_with_base(&file.bytes, file.base_offset);
                if let Err(e) = &session {
                    tracing::error!("Failed to open {}: {}", file.name, e);
                }
                extraction.movies.push(Movie {
                    name: file.name,
                    session,
                });
            }
            Ok(extraction)
        }
    }
}
