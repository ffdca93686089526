//! Endianness-aware reader over a seekable container stream

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::tag::ChunkTag;
use crate::varint;

/// Byte order of a container, chosen by its signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// `RIFX` files
    Big,
    /// `XFIR` files
    Little,
}

impl Endianness {
    pub fn is_little(self) -> bool {
        self == Endianness::Little
    }

    pub fn swapped(self) -> Self {
        match self {
            Endianness::Big => Endianness::Little,
            Endianness::Little => Endianness::Big,
        }
    }
}

/// Reader wrapper that applies the container byte order to multi-byte
/// reads and un-reverses chunk tags in little-endian files.
pub struct ChunkReader<R> {
    inner: R,
    endian: Endianness,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(inner: R, endian: Endianness) -> Self {
        Self { inner, endian }
    }

    pub fn endian(&self) -> Endianness {
        self.endian
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        match self.endian {
            Endianness::Big => self.inner.read_u16::<BigEndian>(),
            Endianness::Little => self.inner.read_u16::<LittleEndian>(),
        }
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        match self.endian {
            Endianness::Big => self.inner.read_i16::<BigEndian>(),
            Endianness::Little => self.inner.read_i16::<LittleEndian>(),
        }
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        match self.endian {
            Endianness::Big => self.inner.read_u32::<BigEndian>(),
            Endianness::Little => self.inner.read_u32::<LittleEndian>(),
        }
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        match self.endian {
            Endianness::Big => self.inner.read_i32::<BigEndian>(),
            Endianness::Little => self.inner.read_i32::<LittleEndian>(),
        }
    }

    /// Little-endian files store FourCCs reversed
    pub fn read_tag(&mut self) -> io::Result<ChunkTag> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(ChunkTag::from_stored(buf, self.endian.is_little()))
    }

    pub fn read_varint(&mut self) -> io::Result<u32> {
        varint::read_varint(&mut self.inner).map(|(value, _)| value)
    }

    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        read_exact_len(&mut self.inner, len)
    }

    /// Read up to `len` bytes, stopping early at end of stream
    pub fn read_up_to(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Null-terminated string (terminator consumed, not returned)
    pub fn read_cstring(&mut self) -> io::Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.inner.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }

    pub fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Start(pos))
    }

    pub fn pos(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn skip(&mut self, n: i64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Current(n))
    }

    /// Borrow the underlying stream, e.g. to hand it to a decompressor
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

/// Read exactly `len` bytes. The buffer grows with the data actually
/// present, so a length taken from the file never sizes an allocation.
pub(crate) fn read_exact_len<R: Read>(reader: R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {} bytes, {} available", len, buf.len()),
        ));
    }
    Ok(buf)
}
