//! Standard (uncompressed) movies: imap -> mmap -> KEY* -> payloads
//!
//! The mmap is a flat directory of `{tag, size, offset}` entries whose
//! offsets point at `tag + size` chunk headers in the same file. Resource
//! ids are mmap positions.

use std::io::{self, Read, Seek};

use crate::error::{Result, ShockwaveError, Warning, WarningSink};
use crate::key::KeyTable;
use crate::reader::ChunkReader;
use crate::resource::{Compression, Resource, ResourceMeta, DEFERRED_OFFSET};
use crate::signature::HEADER_LEN;
use crate::store::{ResourceStore, StandardTable};
use crate::tag::ChunkTag;
use crate::version::Version;

/// Smallest mmap header after the chunk's own tag and length
const MMAP_HEADER_LEN: u64 = 24;
/// Smallest mmap entry: tag, size, offset, flags, unused, next
const MMAP_ENTRY_LEN: u64 = 20;
/// Bytes of `tag + size` in front of every payload
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImapChunk {
    pub length: u32,
    pub map_count: u32,
    pub map_offset: u32,
    pub file_version: u32,
    pub reserved: i16,
    pub unknown: i16,
    pub reserved2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmapHeader {
    pub length: u32,
    pub header_size: i16,
    pub entry_size: i16,
    pub num_entries: i32,
    pub non_zero: i32,
    pub first_free: i32,
    pub first_junk1: i32,
    pub first_junk2: i32,
}

/// Result of building a Standard table
#[derive(Debug)]
pub struct StandardIndex {
    pub store: ResourceStore,
    pub version: Version,
    pub imap: ImapChunk,
    pub mmap: MmapHeader,
    pub keys: Option<KeyTable>,
}

fn expect_tag<R: Read + Seek>(reader: &mut ChunkReader<R>, expected: ChunkTag) -> Result<()> {
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
    Ok(())
}

fn read_imap<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<ImapChunk> {
    reader.seek_to(HEADER_LEN)?;
    expect_tag(reader, ChunkTag::IMAP)?;
    let read = |reader: &mut ChunkReader<R>| -> io::Result<ImapChunk> {
        Ok(ImapChunk {
            length: reader.read_u32()?,
            map_count: reader.read_u32()?,
            map_offset: reader.read_u32()?,
            file_version: reader.read_u32()?,
            reserved: reader.read_i16()?,
            unknown: reader.read_i16()?,
            reserved2: reader.read_i32()?,
        })
    };
    let imap = read(reader).map_err(ShockwaveError::truncated(ChunkTag::IMAP))?;
    tracing::debug!(
        "imap: maps={} mmap_offset={} file_version={}",
        imap.map_count,
        imap.map_offset,
        imap.file_version
    );
    Ok(imap)
}

fn read_mmap<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    offset: u64,
    base_offset: i64,
) -> Result<(MmapHeader, Vec<Resource>)> {
    reader.seek_to(offset)?;
    expect_tag(reader, ChunkTag::MMAP)?;
    let truncated = ShockwaveError::truncated;

    let read_header = |reader: &mut ChunkReader<R>| -> io::Result<MmapHeader> {
        Ok(MmapHeader {
            length: reader.read_u32()?,
            header_size: reader.read_i16()?,
            entry_size: reader.read_i16()?,
            num_entries: reader.read_i32()?,
            non_zero: reader.read_i32()?,
            first_free: reader.read_i32()?,
            first_junk1: reader.read_i32()?,
            first_junk2: reader.read_i32()?,
        })
    };
    let header = read_header(reader).map_err(truncated(ChunkTag::MMAP))?;
    tracing::debug!(
        "mmap: {} entries (header={} entry={})",
        header.num_entries,
        header.header_size,
        header.entry_size
    );

    let entries_start = offset + 8 + (header.header_size.max(0) as u64).max(MMAP_HEADER_LEN);
    let stride = (header.entry_size.max(0) as u64).max(MMAP_ENTRY_LEN);

    let count = header.num_entries.max(0) as u32;
    let mut resources = Vec::with_capacity(count.min(0x10000) as usize);
    for id in 0..count {
        reader.seek_to(entries_start + u64::from(id) * stride)?;
        let tag = reader.read_tag().map_err(truncated(ChunkTag::MMAP))?;
        let size = reader.read_i32().map_err(truncated(ChunkTag::MMAP))?;
        let raw_offset = reader.read_i32().map_err(truncated(ChunkTag::MMAP))?;
        // flags, unused, next free
        reader.read_i16().map_err(truncated(ChunkTag::MMAP))?;
        reader.read_i16().map_err(truncated(ChunkTag::MMAP))?;
        reader.read_i32().map_err(truncated(ChunkTag::MMAP))?;

        let mut entry_offset = i64::from(raw_offset);
        if base_offset > 0 {
            if tag.is_container() && entry_offset != base_offset {
                tracing::debug!(
                    "mmap: {} offset {} does not match base offset {}",
                    tag,
                    entry_offset,
                    base_offset
                );
            }
            entry_offset -= base_offset;
            if entry_offset < 0 {
                entry_offset = DEFERRED_OFFSET;
            }
        }

        let size = size.max(0) as u32;
        tracing::trace!("mmap #{}: {} size={} offset={}", id, tag, size, entry_offset);
        resources.push(Resource::pending(
            id,
            ResourceMeta {
                tag,
                offset: entry_offset,
                compressed_size: size,
                uncompressed_size: size,
                compression: Compression::Raw,
                cast_id: None,
            },
        ));
    }

    Ok((header, resources))
}

/// Read a payload at `offset`, dropping the repeated chunk header
fn read_payload<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    id: u32,
    meta: &ResourceMeta,
    data_len: u64,
    warnings: &mut WarningSink,
) -> Result<Vec<u8>> {
    if meta.offset < 0 || meta.offset as u64 >= data_len {
        return Err(ShockwaveError::OutOfBounds {
            id,
            tag: meta.tag,
            offset: meta.offset,
            len: data_len,
        });
    }
    reader.seek_to(meta.offset as u64)?;
    let expected = meta.compressed_size as usize + CHUNK_HEADER_LEN;
    let mut bytes = reader.read_up_to(expected)?;
    if bytes.len() < expected {
        warnings.push(Warning::ShortRead {
            id,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes.split_off(CHUNK_HEADER_LEN.min(bytes.len())))
}

fn read_keys<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    store: &ResourceStore,
    data_len: u64,
    warnings: &mut WarningSink,
) -> Result<Option<KeyTable>> {
    let Some(key) = store
        .by_tag(ChunkTag::KEY)
        .into_iter()
        .find(|r| !r.meta().is_deferred())
    else {
        warnings.push(Warning::MissingKeyTable);
        return Ok(None);
    };
    let payload = read_payload(reader, key.id(), key.meta(), data_len, warnings)?;
    match KeyTable::parse(&payload, reader.endian()) {
        Ok(table) => Ok(Some(table)),
        Err(e) => {
            warnings.push(Warning::MetadataChunk {
                chunk: ChunkTag::KEY,
                message: e.to_string(),
            });
            Ok(None)
        }
    }
}

/// Build the resource table of a Standard movie.
///
/// `base_offset` is subtracted from every stored offset; it is non-zero
/// for movies lifted out of a projector, whose offsets still count from
/// the start of the executable.
pub fn build<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    base_offset: i64,
    warnings: &mut WarningSink,
) -> Result<StandardIndex> {
    let data_len = reader.seek(io::SeekFrom::End(0))?;

    let imap = read_imap(reader)?;
    let version = Version::from_code(imap.file_version as i32);
    tracing::info!("Movie version: {}", version);

    let mmap_offset = i64::from(imap.map_offset) - base_offset;
    if mmap_offset < 0 {
        return Err(ShockwaveError::OutOfBounds {
            id: 0,
            tag: ChunkTag::MMAP,
            offset: mmap_offset,
            len: data_len,
        });
    }
    let (mmap, entries) = read_mmap(reader, mmap_offset as u64, base_offset)?;
    let mut store = ResourceStore::Standard(StandardTable::from_entries(entries));

    let keys = read_keys(reader, &store, data_len, warnings)?;
    if let Some(keys) = &keys {
        keys.link(&mut store, warnings);
    }

    for resource in store.iter_mut() {
        if resource.meta().is_deferred() {
            continue;
        }
        let bytes = read_payload(reader, resource.id(), resource.meta(), data_len, warnings)?;
        resource.resolve(bytes);
    }

    tracing::debug!(
        "Standard table: {} resources, {} resolved",
        store.len(),
        store.resolved_count()
    );

    Ok(StandardIndex {
        store,
        version,
        imap,
        mmap,
        keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Endianness;
    use std::io::Cursor;

    fn be32(v: u32) -> [u8; 4] {
        v.to_be_bytes()
    }

    /// RIFX header, imap at 12, mmap at 44 with two entries, one BITD payload
    fn tiny_movie() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFX");
        out.extend_from_slice(&be32(0));
        out.extend_from_slice(b"MV93");
        // imap @12
        out.extend_from_slice(b"imap");
        out.extend_from_slice(&be32(24));
        out.extend_from_slice(&be32(1));
        out.extend_from_slice(&be32(44));
        out.extend_from_slice(&be32(1218));
        out.extend_from_slice(&[0; 12]);
        assert_eq!(out.len(), 44);
        // mmap @44
        out.extend_from_slice(b"mmap");
        out.extend_from_slice(&be32(24 + 2 * 20));
        out.extend_from_slice(&24u16.to_be_bytes());
        out.extend_from_slice(&20u16.to_be_bytes());
        out.extend_from_slice(&be32(2));
        out.extend_from_slice(&be32(2));
        out.extend_from_slice(&[0xff; 12]);
        let payload_at = 44 + 8 + 24 + 40;
        for (tag, size, offset) in [(b"RIFX", 0u32, 0u32), (b"BITD", 3, payload_at)] {
            out.extend_from_slice(tag);
            out.extend_from_slice(&be32(size));
            out.extend_from_slice(&be32(offset));
            out.extend_from_slice(&[0; 8]);
        }
        assert_eq!(out.len() as u32, payload_at);
        out.extend_from_slice(b"BITD");
        out.extend_from_slice(&be32(3));
        out.extend_from_slice(&[7, 8, 9]);
        out
    }

    #[test]
    fn builds_tiny_movie() {
        let data = tiny_movie();
        let mut reader = ChunkReader::new(Cursor::new(&data[..]), Endianness::Big);
        let mut warnings = WarningSink::default();
        let index = build(&mut reader, 0, &mut warnings).unwrap();

        assert_eq!(index.version, Version::D6_0);
        assert_eq!(index.mmap.num_entries, 2);
        assert_eq!(index.store.len(), 2);
        assert_eq!(index.store.get(1).unwrap().bytes(), Some(&[7u8, 8, 9][..]));
        assert!(index.keys.is_none());
        assert_eq!(warnings.into_vec(), vec![Warning::MissingKeyTable]);
    }

    #[test]
    fn wrong_imap_tag_is_fatal() {
        let mut data = tiny_movie();
        data[12..16].copy_from_slice(b"junk");
        let mut reader = ChunkReader::new(Cursor::new(&data[..]), Endianness::Big);
        let err = build(&mut reader, 0, &mut WarningSink::default()).unwrap_err();
        assert!(matches!(err, ShockwaveError::UnexpectedChunk { expected, .. } if expected == ChunkTag::IMAP));
    }

    #[test]
    fn truncated_mmap_is_fatal() {
        let data = tiny_movie();
        let cut = &data[..60];
        let mut reader = ChunkReader::new(Cursor::new(cut), Endianness::Big);
        let err = build(&mut reader, 0, &mut WarningSink::default()).unwrap_err();
        assert!(matches!(err, ShockwaveError::Truncated { chunk, .. } if chunk == ChunkTag::MMAP));
    }

    #[test]
    fn offset_past_end_is_fatal() {
        let mut data = tiny_movie();
        // BITD entry offset field
        let entry = 44 + 8 + 24 + 20 + 8;
        data[entry..entry + 4].copy_from_slice(&be32(10_000));
        let mut reader = ChunkReader::new(Cursor::new(&data[..]), Endianness::Big);
        let err = build(&mut reader, 0, &mut WarningSink::default()).unwrap_err();
        assert!(matches!(err, ShockwaveError::OutOfBounds { id: 1, .. }));
    }
}
