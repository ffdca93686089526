//! In-memory container builders shared by the integration tests

#![allow(dead_code)]

use std::io::Write;

use dirkit_shockwave::varint::encode_varint;
use dirkit_shockwave::ChunkTag;
use flate2::write::ZlibEncoder;

/// Byte sink that writes in one container byte order
pub struct Out {
    little: bool,
    pub buf: Vec<u8>,
}

impl Out {
    pub fn new(little: bool) -> Self {
        Self {
            little,
            buf: Vec::new(),
        }
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let b = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.u16(v as u16)
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let b = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    /// Tag in stored order (reversed in little-endian files)
    pub fn tag(&mut self, tag: &[u8; 4]) -> &mut Self {
        self.buf
            .extend_from_slice(&ChunkTag(*tag).to_stored(self.little));
        self
    }

    pub fn varint(&mut self, v: u32) -> &mut Self {
        self.buf.extend(encode_varint(v));
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn key_table(little: bool, records: &[(i32, i32, &[u8; 4])]) -> Vec<u8> {
    let mut out = Out::new(little);
    out.i16(12)
        .i16(12)
        .i32(records.len() as i32)
        .i32(records.len() as i32);
    for (element, cast, tag) in records {
        out.i32(*element).i32(*cast).tag(tag);
    }
    out.buf
}

/// Bitmap `CASt` payload; cast data is big-endian in every container
pub fn bitmap_cast(name: &str, width: i16, height: i16, depth: u8, palette: i16) -> Vec<u8> {
    let mut info = Out::new(false);
    info.bytes(&[0; 32])
        .u16(1)
        .u32(0)
        .u32(name.len() as u32 + 1)
        .bytes(&[name.len() as u8])
        .bytes(name.as_bytes());

    let mut specific = Out::new(false);
    specific
        .u16(0)
        .i16(0)
        .i16(0)
        .i16(height)
        .i16(width)
        .bytes(&[0; 8])
        .i16(0)
        .i16(0)
        .bytes(&[0, depth])
        .u16(0)
        .i16(palette);

    let mut out = Out::new(false);
    out.u32(1)
        .u32(info.len() as u32)
        .u32(specific.len() as u32)
        .bytes(&info.buf)
        .bytes(&specific.buf);
    out.buf
}

const IMAP_AT: u32 = 12;
const MMAP_AT: u32 = 44;
const MMAP_HEADER: u32 = 24;
const MMAP_ENTRY: u32 = 20;

/// Standard movie: header, imap, mmap, then one chunk per entry in
/// `chunks`. Ids 0-2 are the container, imap and mmap; `chunks[i]` gets
/// id `i + 3`. Stored offsets are shifted by `base`.
pub fn standard_movie(
    little: bool,
    file_version: u32,
    base: u32,
    chunks: &[(&[u8; 4], Vec<u8>)],
) -> Vec<u8> {
    let count = chunks.len() as u32 + 3;
    let mmap_len = MMAP_HEADER + count * MMAP_ENTRY;
    let mut pos = MMAP_AT + 8 + mmap_len;
    let mut offsets = Vec::new();
    for (_, payload) in chunks {
        offsets.push(pos);
        pos += 8 + payload.len() as u32;
    }
    let total = pos;

    let mut out = Out::new(little);
    out.bytes(if little { b"XFIR" } else { b"RIFX" })
        .u32(total - 8)
        .tag(b"MV93");

    out.tag(b"imap")
        .u32(24)
        .u32(1)
        .u32(MMAP_AT + base)
        .u32(file_version)
        .bytes(&[0; 12]);
    assert_eq!(out.len() as u32, MMAP_AT);

    out.tag(b"mmap")
        .u32(mmap_len)
        .i16(MMAP_HEADER as i16)
        .i16(MMAP_ENTRY as i16)
        .i32(count as i32)
        .i32(count as i32)
        .i32(-1)
        .i32(-1)
        .i32(-1);
    let mut entry = |tag: &[u8; 4], size: u32, offset: u32| {
        out.tag(tag).u32(size).u32(offset).bytes(&[0; 8]);
    };
    entry(b"RIFX", total - 8, base);
    entry(b"imap", 24, IMAP_AT + base);
    entry(b"mmap", mmap_len, MMAP_AT + base);
    for ((tag, payload), offset) in chunks.iter().zip(&offsets) {
        entry(tag, payload.len() as u32, offset + base);
    }

    for (tag, payload) in chunks {
        out.tag(tag).u32(payload.len() as u32).bytes(payload);
    }
    assert_eq!(out.len() as u32, total);
    out.buf
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Inline { zlib: bool },
    Ils,
}

pub struct AbEntry {
    pub id: u32,
    pub tag: [u8; 4],
    pub payload: Vec<u8>,
    pub placement: Placement,
}

impl AbEntry {
    pub fn new(id: u32, tag: &[u8; 4], payload: Vec<u8>, placement: Placement) -> Self {
        Self {
            id,
            tag: *tag,
            payload,
            placement,
        }
    }
}

pub const COMPRESSOR_GUID: [u8; 16] = [
    0x04, 0xE9, 0x99, 0xAC, 0x70, 0x00, 0x36, 0x0B, 0x00, 0x08, 0x00, 0x00, 0x34, 0x7A, 0x37, 0x07,
];

/// Little-endian Afterburner movie
pub struct Afterburner {
    pub director_version: u32,
    /// Id of the ILS entry, if the movie has one
    pub ils_id: Option<u32>,
    pub entries: Vec<AbEntry>,
    pub corrupt_abmp: bool,
}

impl Afterburner {
    pub fn new(entries: Vec<AbEntry>) -> Self {
        Self {
            director_version: 1410,
            ils_id: Some(2),
            entries,
            corrupt_abmp: false,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        // FGEI-relative data area: ILS first, then inline entries
        let mut data = Vec::new();
        let mut abmp_entries: Vec<(u32, i32, u32, u32, u32, [u8; 4])> = Vec::new();

        if let Some(ils_id) = self.ils_id {
            let mut stream = Vec::new();
            for e in self.entries.iter().filter(|e| e.placement == Placement::Ils) {
                stream.extend(encode_varint(e.id));
                stream.extend_from_slice(&e.payload);
            }
            let packed = zlib(&stream);
            abmp_entries.push((
                ils_id,
                data.len() as i32,
                packed.len() as u32,
                stream.len() as u32,
                0,
                *b"ILS ",
            ));
            data.extend(packed);
        }

        for e in &self.entries {
            match e.placement {
                Placement::Ils => abmp_entries.push((
                    e.id,
                    -1,
                    e.payload.len() as u32,
                    e.payload.len() as u32,
                    1,
                    e.tag,
                )),
                Placement::Inline { zlib: packed } => {
                    let stored = if packed { zlib(&e.payload) } else { e.payload.clone() };
                    abmp_entries.push((
                        e.id,
                        data.len() as i32,
                        stored.len() as u32,
                        e.payload.len() as u32,
                        if packed { 0 } else { 1 },
                        e.tag,
                    ));
                    data.extend(stored);
                }
            }
        }

        let mut body = Out::new(true);
        body.varint(0).varint(0).varint(abmp_entries.len() as u32);
        for (id, offset, comp, decomp, kind, tag) in &abmp_entries {
            body.varint(*id)
                .varint(*offset as u32)
                .varint(*comp)
                .varint(*decomp)
                .varint(*kind)
                .tag(tag);
        }
        let packed_body = if self.corrupt_abmp {
            vec![0u8; 16]
        } else {
            zlib(&body.buf)
        };
        let mut abmp = Out::new(true);
        abmp.varint(0).varint(body.len() as u32).bytes(&packed_body);

        let mut fver = Out::new(true);
        fver.varint(0x501).varint(0x4c1).varint(self.director_version);

        let mut fcdr_body = Out::new(true);
        fcdr_body.u16(1).bytes(&COMPRESSOR_GUID).bytes(b"zlib\0");
        let fcdr = zlib(&fcdr_body.buf);

        let mut out = Out::new(true);
        out.bytes(b"XFIR").u32(0).tag(b"FGDM");
        out.tag(b"Fver").varint(fver.len() as u32).bytes(&fver.buf);
        out.tag(b"Fcdr").varint(fcdr.len() as u32).bytes(&fcdr);
        out.tag(b"ABMP").varint(abmp.len() as u32).bytes(&abmp.buf);
        out.tag(b"FGEI").varint(0);
        out.bytes(&data);

        let total = (out.len() - 8) as u32;
        out.buf[4..8].copy_from_slice(&total.to_le_bytes());
        out.buf
    }
}

/// Where the installer archive starts inside a fake projector
pub const ARCHIVE_AT: u32 = 0x40;
const ARCHIVE_MMAP_AT: usize = 0x2C;
const ARCHIVE_ENTRIES_AT: u32 = 0x4C;

pub fn dict(names: &[&str]) -> Vec<u8> {
    let mut out = Out::new(true);
    out.tag(b"Dict").u32(0);
    out.u32(0).bytes(&[0; 12]).u32(names.len() as u32).bytes(&[0; 4]).i16(0x12);
    for name in names {
        out.u32(name.len() as u32).bytes(name.as_bytes());
        out.bytes(&vec![0; (4 - name.len() % 4) % 4]);
    }
    let size = (out.len() - 8) as u32;
    out.buf[4..8].copy_from_slice(&size.to_le_bytes());
    out.buf
}

/// Windows projector with an XFIR/APPL installer archive holding one
/// `File` entry per name. `make(i, position)` builds file `i` given its
/// absolute position in the executable.
pub fn projector(
    names: &[&str],
    with_dict: bool,
    make: impl Fn(usize, u32) -> Vec<u8>,
) -> Vec<u8> {
    let dict = dict(names);
    let entry_count = 1 + u32::from(with_dict) + names.len() as u32;
    let mut pos = ARCHIVE_ENTRIES_AT + entry_count * MMAP_ENTRY;
    let dict_pos = pos;
    if with_dict {
        pos += dict.len() as u32;
    }
    let mut files = Vec::new();
    for i in 0..names.len() {
        let content = make(i, ARCHIVE_AT + pos);
        files.push((pos, content));
        pos += files[i].1.len() as u32;
    }

    let mut out = Out::new(true);
    out.bytes(b"XFIR").u32(pos - 8).bytes(b"LPPA");
    out.tag(b"imap").bytes(&[0; 28]);
    assert_eq!(out.len(), ARCHIVE_MMAP_AT);
    out.tag(b"mmap")
        .u32(0)
        .i16(MMAP_HEADER as i16)
        .i16(MMAP_ENTRY as i16)
        .bytes(&[0; 4])
        .u32(entry_count)
        .bytes(&[0; 12]);
    assert_eq!(out.len() as u32, ARCHIVE_ENTRIES_AT);

    let rel = ARCHIVE_AT;
    out.tag(b"RIFX").u32(0).u32(rel).bytes(&[0; 8]);
    if with_dict {
        out.tag(b"Dict")
            .u32(dict.len() as u32 - 8)
            .u32(rel + dict_pos)
            .bytes(&[0; 8]);
    }
    for (file_pos, content) in &files {
        out.tag(b"File")
            .u32(content.len() as u32 - 8)
            .u32(rel + file_pos)
            .bytes(&[0; 8]);
    }
    if with_dict {
        out.bytes(&dict);
    }
    for (_, content) in &files {
        out.bytes(content);
    }

    let mut exe = b"MZ".to_vec();
    exe.resize(ARCHIVE_AT as usize, 0);
    exe.extend(out.buf);
    exe
}
