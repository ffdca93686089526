//! Projector unwrapping
//!
//! A Director projector carries its movies inside an installer archive
//! that reuses the RIFX layout with its own `APPL` codec. Its mmap lists
//! `File` entries (raw payloads) and one `Dict` entry naming them in the
//! same order.

use std::io::Cursor;

use crate::error::{Result, ShockwaveError};
use crate::reader::{ChunkReader, Endianness};
use crate::tag::ChunkTag;

const IMAP_POS: u64 = 0xC;
const MMAP_POS: u64 = 0x2C;
const MMAP_ENTRY_SIZE_POS: u64 = MMAP_POS + 10;
const MMAP_COUNT_POS: u64 = MMAP_POS + 0x10;
const MMAP_ENTRIES_POS: u64 = MMAP_POS + 32;
const MIN_ENTRY_SIZE: u64 = 12;
/// Larger Dict table lengths mean the table uses the other byte order
const DICT_TOC_LIMIT: u32 = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    /// A RIFX/XFIR movie or cast
    Container,
    /// A `.x32`/`.x16` Xtra
    Xtra,
    Other,
}

/// A file recovered from a projector's installer archive
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    /// Path as recorded in the Dict table
    pub name: String,
    pub bytes: Vec<u8>,
    /// Position of the file in the executable; container offsets count from there
    pub base_offset: i64,
    pub kind: EmbeddedKind,
}

impl EmbeddedFile {
    /// Last path component, with either separator
    pub fn file_name(&self) -> &str {
        self.name
            .rsplit(|c: char| c == '\\' || c == '/')
            .next()
            .unwrap_or(self.name.as_str())
    }

    pub fn is_container(&self) -> bool {
        self.kind == EmbeddedKind::Container
    }
}

/// Every file recovered from a projector
#[derive(Debug, Clone)]
pub struct Unwrapped {
    pub endian: Endianness,
    /// Offset of the installer archive in the executable
    pub archive_offset: usize,
    pub files: Vec<EmbeddedFile>,
}

impl Unwrapped {
    pub fn containers(&self) -> impl Iterator<Item = &EmbeddedFile> {
        self.files.iter().filter(|f| f.is_container())
    }
}

#[derive(Debug)]
struct ArchiveEntry {
    tag: ChunkTag,
    offset: u32,
    content: Vec<u8>,
}

fn find_marker(data: &[u8], head: &[u8; 4], tail: &[u8; 4]) -> Option<usize> {
    data.windows(12)
        .position(|w| &w[..4] == head && &w[8..] == tail)
}

fn classify(name: &str, bytes: &[u8]) -> EmbeddedKind {
    if bytes.starts_with(b"RIFX") || bytes.starts_with(b"XFIR") {
        EmbeddedKind::Container
    } else if name.contains(".x32") || name.contains(".x16") {
        EmbeddedKind::Xtra
    } else {
        EmbeddedKind::Other
    }
}

fn archive_endian(magic: &[u8]) -> Result<Endianness> {
    match magic {
        b"XFIR" | b"FFIR" => Ok(Endianness::Little),
        b"RIFX" | b"RIFF" => Ok(Endianness::Big),
        _ => {
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&magic[..4]);
            Err(ShockwaveError::UnknownContainer(tag))
        }
    }
}

fn read_archive(archive: &[u8], endian: Endianness) -> Result<Vec<ArchiveEntry>> {
    let mut reader = ChunkReader::new(Cursor::new(archive), endian);
    let truncated = ShockwaveError::truncated;

    reader.seek_to(IMAP_POS)?;
    let tag = reader.read_tag().map_err(truncated(ChunkTag::IMAP))?;
    if tag != ChunkTag::IMAP {
        return Err(ShockwaveError::UnexpectedChunk {
            expected: ChunkTag::IMAP,
            found: tag,
            offset: IMAP_POS,
        });
    }

    reader.seek_to(MMAP_POS)?;
    let tag = reader.read_tag().map_err(truncated(ChunkTag::MMAP))?;
    if tag != ChunkTag::MMAP {
        return Err(ShockwaveError::UnexpectedChunk {
            expected: ChunkTag::MMAP,
            found: tag,
            offset: MMAP_POS,
        });
    }
    reader.seek_to(MMAP_ENTRY_SIZE_POS)?;
    let entry_size = reader.read_i16().map_err(truncated(ChunkTag::MMAP))?;
    reader.seek_to(MMAP_COUNT_POS)?;
    let count = reader.read_u32().map_err(truncated(ChunkTag::MMAP))?;

    // The first entry's offset is where the archive started in the
    // original file; every other offset is relative to it.
    reader.seek_to(MMAP_ENTRIES_POS + 8)?;
    let rel = reader.read_u32().map_err(truncated(ChunkTag::MMAP))?;

    let stride = (entry_size.max(0) as u64).max(MIN_ENTRY_SIZE);
    tracing::debug!("Installer mmap: {} entries, stride {}, rel {}", count, stride, rel);

    let mut entries = Vec::with_capacity(count.min(0x10000) as usize);
    for i in 0..u64::from(count) {
        reader.seek_to(MMAP_ENTRIES_POS + i * stride)?;
        let tag = reader.read_tag().map_err(truncated(ChunkTag::MMAP))?;
        let size = reader.read_u32().map_err(truncated(ChunkTag::MMAP))?;
        let mut offset = reader.read_u32().map_err(truncated(ChunkTag::MMAP))?;
        if offset != 0 {
            offset = offset.wrapping_sub(rel);
        }

        let start = (offset as usize).min(archive.len());
        let end = start.saturating_add(size as usize + 8).min(archive.len());
        tracing::trace!("Installer #{} {} size={} offset={}", i, tag, size, offset);
        entries.push(ArchiveEntry {
            tag,
            offset,
            content: archive[start..end].to_vec(),
        });
    }
    Ok(entries)
}

/// Parse the Dict table of file names.
///
/// Win16 projectors switch byte order after the chunk header; that is
/// detected from an implausibly large table length.
pub fn parse_dict(data: &[u8], endian: Endianness) -> Result<Vec<String>> {
    let body = data.get(8..).unwrap_or(&[]);
    let truncated = ShockwaveError::truncated;

    let mut endian = endian;
    let mut reader = ChunkReader::new(Cursor::new(body), Endianness::Little);
    let mut toc_len = reader.read_u32().map_err(truncated(ChunkTag::DICT))?;
    if toc_len > DICT_TOC_LIMIT {
        endian = endian.swapped();
        toc_len = toc_len.swap_bytes();
    }

    let mut reader = ChunkReader::new(Cursor::new(body), endian);
    reader.seek_to(0x10)?;
    let name_count = reader.read_u32().map_err(truncated(ChunkTag::DICT))?;
    reader.seek_to(0x18 + u64::from(toc_len))?;
    let unk1 = reader.read_i16().map_err(truncated(ChunkTag::DICT))?;
    reader.skip(i64::from(unk1) - 0x12)?;

    let mut names = Vec::with_capacity(name_count.min(0x10000) as usize);
    for _ in 0..name_count {
        let len = reader.read_u32().map_err(truncated(ChunkTag::DICT))?;
        let bytes = reader
            .read_bytes(len as usize)
            .map_err(truncated(ChunkTag::DICT))?;
        reader.skip(i64::from((4 - len % 4) % 4))?;
        names.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(names)
}

/// Recover the files packed into a projector executable.
pub fn unwrap_executable(data: &[u8]) -> Result<Unwrapped> {
    let archive_offset = find_marker(data, b"XFIR", b"LPPA")
        .or_else(|| find_marker(data, b"RIFX", b"APPL"))
        .ok_or(ShockwaveError::NotAnExecutable)?;
    let archive = &data[archive_offset..];
    let endian = archive_endian(&archive[..4])?;
    tracing::info!(
        "Installer archive at {} ({:?})",
        archive_offset,
        endian
    );

    let entries = read_archive(archive, endian)?;
    let dict = entries
        .iter()
        .find(|e| e.tag == ChunkTag::DICT)
        .ok_or_else(|| ShockwaveError::NoEmbeddedContainer("no Dict entry".to_string()))?;
    let names = parse_dict(&dict.content, endian)?;

    let files: Vec<EmbeddedFile> = entries
        .iter()
        .filter(|e| e.tag == ChunkTag::FILE)
        .zip(names)
        .map(|(entry, name)| {
            let kind = classify(&name, &entry.content);
            let base_offset = i64::from(entry.offset) + archive_offset as i64;
            tracing::debug!("Found {} at {} ({:?})", name, base_offset, kind);
            EmbeddedFile {
                name,
                bytes: entry.content.clone(),
                base_offset,
                kind,
            }
        })
        .collect();

    if !files.iter().any(EmbeddedFile::is_container) {
        return Err(ShockwaveError::NoEmbeddedContainer(format!(
            "none of {} files is a movie",
            files.len()
        )));
    }

    Ok(Unwrapped {
        endian,
        archive_offset,
        files,
    })
}
