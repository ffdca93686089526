//! Afterburner (compressed) movies
//!
//! Layout after the 12-byte header:
//!
//! ```text
//! Fver  varint len, 3 varints
//! Fcdr  varint len, zlib { u16 count, count x GUID, count x cstring }
//! ABMP  varint len, varint kind, varint size, zlib { entries }
//! FGEI  varint len; payload offsets are relative to here
//! ```
//!
//! Entries with a real offset are read directly (pass 1). Entries marked
//! with offset -1 live back to back inside the `ILS ` resource and are
//! consumed from it in order (pass 2).

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor, Read, Seek};

use flate2::read::ZlibDecoder;

use crate::error::{Result, ShockwaveError, Warning, WarningSink};
use crate::key::KeyTable;
use crate::reader::{read_exact_len, ChunkReader, Endianness};
use crate::resource::{Compression, Resource, ResourceMeta, DEFERRED_OFFSET};
use crate::signature::HEADER_LEN;
use crate::store::{AfterburnerTable, ResourceStore};
use crate::tag::ChunkTag;
use crate::version::Version;

/// Inflated Fcdr bodies are capped at this multiple of the stored length
const FCDR_INFLATE_RATIO: u64 = 10;

/// Version codes carried by `Fver`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FverChunk {
    pub format_version: u32,
    pub imap_version: u32,
    pub director_version: u32,
}

impl FverChunk {
    /// Release that wrote the movie; older headers only carry the format code
    pub fn version(&self) -> Version {
        let code = if self.director_version != 0 {
            self.director_version
        } else {
            self.format_version
        };
        Version::from_code(code as i32)
    }
}

/// One compression scheme declared in `Fcdr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionDescriptor {
    pub guid: Guid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

/// One ABMP directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbmpEntry {
    pub id: u32,
    /// Relative to the FGEI payload, or -1 for ILS entries
    pub offset: i32,
    pub compressed_len: u32,
    pub decompressed_len: u32,
    pub compression_type: u32,
    pub tag: ChunkTag,
}

impl AbmpEntry {
    fn meta(&self, offset: i64) -> ResourceMeta {
        ResourceMeta {
            tag: self.tag,
            offset,
            compressed_size: self.compressed_len,
            uncompressed_size: self.decompressed_len,
            compression: Compression::from_abmp(self.compression_type),
            cast_id: None,
        }
    }
}

/// Result of building an Afterburner table
#[derive(Debug)]
pub struct AfterburnerIndex {
    pub store: ResourceStore,
    pub version: Version,
    pub fver: Option<FverChunk>,
    pub compression_types: Vec<CompressionDescriptor>,
    pub entries: Vec<AbmpEntry>,
    pub keys: Option<KeyTable>,
}

/// Inflate `data`, stopping after `limit` output bytes
pub(crate) fn inflate(chunk: ChunkTag, data: &[u8], limit: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(limit)
        .read_to_end(&mut out)
        .map_err(ShockwaveError::inflate(chunk))?;
    tracing::trace!("{}: inflated {} -> {} bytes", chunk, data.len(), out.len());
    Ok(out)
}

/// Tag plus varint length; returns the payload start and length
fn read_header<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    expected: ChunkTag,
) -> Result<(u64, u64)> {
    let offset = reader.pos()?;
    let found = reader
        .read_tag()
        .map_err(ShockwaveError::truncated(expected))?;
    if found != expected {
        return Err(ShockwaveError::UnexpectedChunk {
            expected,
            found,
            offset,
        });
    }
    let length = reader
        .read_varint()
        .map_err(ShockwaveError::truncated(expected))?;
    let start = reader.pos()?;
    tracing::debug!("{} chunk at {} ({} bytes)", expected, start, length);
    Ok((start, u64::from(length)))
}

/// Format codes from 0x401 on carry the imap and Director version too
const FVER_EXTENDED: u32 = 0x401;

fn parse_fver_body(body: &[u8]) -> io::Result<FverChunk> {
    let mut body = Cursor::new(body);
    let mut next = || crate::varint::read_varint(&mut body).map(|(v, _)| v);
    let format_version = next()?;
    if format_version < FVER_EXTENDED {
        return Ok(FverChunk {
            format_version,
            ..Default::default()
        });
    }
    Ok(FverChunk {
        format_version,
        imap_version: next()?,
        director_version: next()?,
    })
}

fn read_fver<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    warnings: &mut WarningSink,
) -> Result<Option<FverChunk>> {
    let (start, length) = read_header(reader, ChunkTag::FVER)?;
    let body = reader
        .read_bytes(length as usize)
        .map_err(ShockwaveError::truncated(ChunkTag::FVER))?;

    reader.seek_to(start + length)?;

    match parse_fver_body(&body) {
        Ok(fver) => {
            tracing::debug!(
                "Fver: format={:#x} imap={:#x} director={:#x}",
                fver.format_version,
                fver.imap_version,
                fver.director_version
            );
            Ok(Some(fver))
        }
        Err(e) => {
            warnings.push(Warning::MetadataChunk {
                chunk: ChunkTag::FVER,
                message: e.to_string(),
            });
            Ok(None)
        }
    }
}

fn parse_fcdr_body(body: Vec<u8>, endian: Endianness) -> io::Result<Vec<CompressionDescriptor>> {
    let mut reader = ChunkReader::new(Cursor::new(body), endian);
    let count = reader.read_u16()?;
    let mut guids = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let data1 = reader.read_u32()?;
        let data2 = reader.read_u16()?;
        let data3 = reader.read_u16()?;
        let mut data4 = [0u8; 8];
        reader.get_mut().read_exact(&mut data4)?;
        guids.push(Guid {
            data1,
            data2,
            data3,
            data4,
        });
    }
    guids
        .into_iter()
        .map(|guid| {
            Ok(CompressionDescriptor {
                guid,
                name: reader.read_cstring()?,
            })
        })
        .collect()
}

fn read_fcdr<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    warnings: &mut WarningSink,
) -> Result<Vec<CompressionDescriptor>> {
    let (start, length) = read_header(reader, ChunkTag::FCDR)?;
    let compressed = reader
        .read_bytes(length as usize)
        .map_err(ShockwaveError::truncated(ChunkTag::FCDR))?;
    let body = inflate(ChunkTag::FCDR, &compressed, length * FCDR_INFLATE_RATIO)?;
    reader.seek_to(start + length)?;

    match parse_fcdr_body(body, reader.endian()) {
        Ok(descriptors) => {
            for d in &descriptors {
                tracing::debug!("Fcdr: {} {}", d.guid, d.name);
            }
            Ok(descriptors)
        }
        Err(e) => {
            warnings.push(Warning::MetadataChunk {
                chunk: ChunkTag::FCDR,
                message: e.to_string(),
            });
            Ok(Vec::new())
        }
    }
}

fn parse_abmp_body(body: Vec<u8>, endian: Endianness) -> io::Result<Vec<AbmpEntry>> {
    let mut reader = ChunkReader::new(Cursor::new(body), endian);
    reader.read_varint()?;
    reader.read_varint()?;
    let count = reader.read_varint()?;

    let mut entries = Vec::with_capacity(count.min(0x10000) as usize);
    for _ in 0..count {
        let entry = AbmpEntry {
            id: reader.read_varint()?,
            offset: reader.read_varint()? as i32,
            compressed_len: reader.read_varint()?,
            decompressed_len: reader.read_varint()?,
            compression_type: reader.read_varint()?,
            tag: reader.read_tag()?,
        };
        tracing::trace!(
            "ABMP #{} {} offset={} comp={} decomp={} type={}",
            entry.id,
            entry.tag,
            entry.offset,
            entry.compressed_len,
            entry.decompressed_len,
            entry.compression_type
        );
        entries.push(entry);
    }
    Ok(entries)
}

fn read_abmp<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<Vec<AbmpEntry>> {
    let truncated = ShockwaveError::truncated;
    let (start, length) = read_header(reader, ChunkTag::ABMP)?;
    let compression_type = reader.read_varint().map_err(truncated(ChunkTag::ABMP))?;
    let uncompressed_len = reader.read_varint().map_err(truncated(ChunkTag::ABMP))?;
    tracing::debug!(
        "ABMP: compression={} uncompressed={}",
        compression_type,
        uncompressed_len
    );

    let header_len = reader.pos()? - start;
    let compressed = reader
        .read_bytes(length.saturating_sub(header_len) as usize)
        .map_err(truncated(ChunkTag::ABMP))?;
    let body = inflate(ChunkTag::ABMP, &compressed, u64::from(uncompressed_len))?;
    reader.seek_to(start + length)?;

    let entries = parse_abmp_body(body, reader.endian()).map_err(truncated(ChunkTag::ABMP))?;
    tracing::debug!("ABMP: {} entries", entries.len());
    Ok(entries)
}

/// Pass 1: entries stored at their own offset
fn read_direct<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    entry: &AbmpEntry,
    offset: u64,
    warnings: &mut WarningSink,
) -> Result<Vec<u8>> {
    reader.seek_to(offset)?;
    let data = reader.read_up_to(entry.compressed_len as usize)?;
    if data.len() < entry.compressed_len as usize {
        warnings.push(Warning::ShortRead {
            id: entry.id,
            expected: entry.compressed_len as usize,
            actual: data.len(),
        });
    }
    match Compression::from_abmp(entry.compression_type) {
        Compression::Zlib => {
            let out = inflate(entry.tag, &data, u64::from(entry.decompressed_len))?;
            if out.len() != entry.decompressed_len as usize {
                tracing::debug!(
                    "{} #{}: inflated to {} bytes, expected {}",
                    entry.tag,
                    entry.id,
                    out.len(),
                    entry.decompressed_len
                );
            }
            Ok(out)
        }
        Compression::Raw => Ok(data),
    }
}

/// Pass 2: walk the ILS stream in order.
///
/// The stream is a sequence of `varint id, bytes` records. It ends at the
/// end of the data, or at the first id that is unknown or whose entry has
/// a zero compressed length.
fn read_ils(
    ils: &[u8],
    deferred: &mut HashMap<u32, AbmpEntry>,
    table: &mut AfterburnerTable,
) -> Result<usize> {
    let mut cursor = Cursor::new(ils);
    let mut count = 0;
    loop {
        let id = match crate::varint::read_varint(&mut cursor) {
            Ok((id, _)) => id,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        let entry = match deferred.get(&id) {
            Some(entry) if entry.compressed_len != 0 => *entry,
            _ => {
                tracing::debug!("ILS: stream ends at id {}", id);
                break;
            }
        };

        let bytes = read_exact_len(&mut cursor, entry.decompressed_len as usize)
            .map_err(ShockwaveError::truncated(ChunkTag::ILS))?;
        tracing::trace!("ILS: #{} {} ({} bytes)", id, entry.tag, bytes.len());

        let mut resource = Resource::pending(id, entry.meta(DEFERRED_OFFSET));
        resource.resolve(bytes);
        if table.insert(resource) {
            count += 1;
        }
        deferred.remove(&id);
    }
    Ok(count)
}

fn link_keys(
    store: &mut ResourceStore,
    endian: Endianness,
    warnings: &mut WarningSink,
) -> Option<KeyTable> {
    let Some(payload) = store.first_by_tag(ChunkTag::KEY).and_then(|r| r.bytes()) else {
        warnings.push(Warning::MissingKeyTable);
        return None;
    };
    match KeyTable::parse(payload, endian) {
        Ok(keys) => {
            keys.link(store, warnings);
            Some(keys)
        }
        Err(e) => {
            warnings.push(Warning::MetadataChunk {
                chunk: ChunkTag::KEY,
                message: e.to_string(),
            });
            None
        }
    }
}

/// Build the resource table of an Afterburner movie.
pub fn build<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    warnings: &mut WarningSink,
) -> Result<AfterburnerIndex> {
    reader.seek_to(HEADER_LEN)?;

    let fver = read_fver(reader, warnings)?;
    let version = fver.map(|f| f.version()).unwrap_or(Version::D2_0);
    tracing::info!("Movie version: {}", version);

    let compression_types = read_fcdr(reader, warnings)?;
    let entries = read_abmp(reader)?;

    let (fgei_start, fgei_len) = read_header(reader, ChunkTag::FGEI)?;
    let base = fgei_start + fgei_len;

    let mut table = AfterburnerTable::default();
    let mut deferred = HashMap::new();
    for entry in &entries {
        if i64::from(entry.offset) == DEFERRED_OFFSET {
            deferred.insert(entry.id, *entry);
            continue;
        }
        let offset = base as i64 + i64::from(entry.offset);
        if offset < 0 {
            return Err(ShockwaveError::OutOfBounds {
                id: entry.id,
                tag: entry.tag,
                offset,
                len: reader.seek(io::SeekFrom::End(0))?,
            });
        }
        let bytes = read_direct(reader, entry, offset as u64, warnings)?;
        let mut resource = Resource::pending(entry.id, entry.meta(offset));
        resource.resolve(bytes);
        if !table.insert(resource) {
            tracing::debug!("ABMP: duplicate id {} ignored", entry.id);
        }
    }
    let direct = table.len();
    tracing::debug!("Pass 1: {} resources, {} deferred", direct, deferred.len());

    if !deferred.is_empty() {
        let ils = table
            .first_by_tag(ChunkTag::ILS)
            .and_then(Resource::bytes)
            .map(<[u8]>::to_vec)
            .ok_or(ShockwaveError::MissingResource(ChunkTag::ILS))?;
        let from_ils = read_ils(&ils, &mut deferred, &mut table)?;
        tracing::debug!("Pass 2: {} resources from ILS", from_ils);
    }

    // Entries the ILS stream never delivered stay pending, in ABMP order
    for entry in entries.iter().filter(|e| deferred.contains_key(&e.id)) {
        if table.insert(Resource::pending(entry.id, entry.meta(DEFERRED_OFFSET))) {
            warnings.push(Warning::UnresolvedIlsEntry {
                id: entry.id,
                tag: entry.tag,
            });
        }
    }

    let mut store = ResourceStore::Afterburner(table);
    let keys = link_keys(&mut store, reader.endian(), warnings);

    tracing::debug!(
        "Afterburner table: {} resources, {} resolved",
        store.len(),
        store.resolved_count()
    );

    Ok(AfterburnerIndex {
        store,
        version,
        fver,
        compression_types,
        entries,
        keys,
    })
}
