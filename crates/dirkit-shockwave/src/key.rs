//! KEY* table: links resource ids to the cast slots that own them

use std::io::Cursor;

use crate::error::{Result, ShockwaveError, Warning, WarningSink};
use crate::reader::{ChunkReader, Endianness};
use crate::store::ResourceStore;
use crate::tag::ChunkTag;

/// Element indices at or above this are cast numbers offset by it
const CAST_NUMBER_BASE: i32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRecord {
    /// Resource id of the owned chunk
    pub element_index: i32,
    /// Resource id of the owning cast chunk
    pub cast_index: i32,
    pub tag: ChunkTag,
    /// `element_index - 1024` for element indices from 1024 up
    pub cast_number: Option<i32>,
}

impl KeyRecord {
    pub fn new(element_index: i32, cast_index: i32, tag: ChunkTag) -> Self {
        let cast_number =
            (element_index >= CAST_NUMBER_BASE).then(|| element_index - CAST_NUMBER_BASE);
        Self {
            element_index,
            cast_index,
            tag,
            cast_number,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.tag.is_known()
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    pub header_size: i16,
    pub record_size: i16,
    pub record_count: i32,
    pub active_count: i32,
    pub records: Vec<KeyRecord>,
}

impl KeyTable {
    /// Parse a KEY* payload (chunk header already stripped)
    pub fn parse(payload: &[u8], endian: Endianness) -> Result<Self> {
        let mut reader = ChunkReader::new(Cursor::new(payload), endian);
        let truncated = ShockwaveError::truncated;

        let header_size = reader.read_i16().map_err(truncated(ChunkTag::KEY))?;
        let record_size = reader.read_i16().map_err(truncated(ChunkTag::KEY))?;
        let record_count = reader.read_i32().map_err(truncated(ChunkTag::KEY))?;
        let active_count = reader.read_i32().map_err(truncated(ChunkTag::KEY))?;

        tracing::debug!(
            "KEY* header={} record_size={} records={} active={}",
            header_size,
            record_size,
            record_count,
            active_count
        );

        let mut records = Vec::with_capacity(record_count.clamp(0, 0x10000) as usize);
        for i in 0..record_count.max(0) {
            let element_index = reader.read_i32().map_err(truncated(ChunkTag::KEY))?;
            let cast_index = reader.read_i32().map_err(truncated(ChunkTag::KEY))?;
            let tag = reader.read_tag().map_err(truncated(ChunkTag::KEY))?;
            let record = KeyRecord::new(element_index, cast_index, tag);
            tracing::trace!(
                "KEY* record {}: element={} cast={} type={} cast_no={:?}",
                i,
                element_index,
                cast_index,
                tag,
                record.cast_number
            );
            records.push(record);
        }

        Ok(Self {
            header_size,
            record_size,
            record_count,
            active_count,
            records,
        })
    }

    /// Attach each valid record's cast index to its resource. Invalid and
    /// orphaned records only produce warnings.
    pub(crate) fn link(&self, store: &mut ResourceStore, warnings: &mut WarningSink) -> usize {
        let mut linked = 0;
        for record in &self.records {
            if !record.is_valid() {
                warnings.push(Warning::InvalidKeyRecord {
                    element_index: record.element_index,
                    tag: record.tag,
                });
                continue;
            }
            if record.element_index <= 0 {
                continue;
            }
            match store.get_mut(record.element_index as u32) {
                Some(resource) => {
                    resource.meta_mut().cast_id = Some(record.cast_index);
                    tracing::trace!(
                        "Mapped {} #{} to cast {}",
                        resource.tag(),
                        record.element_index,
                        record.cast_index
                    );
                    linked += 1;
                }
                None => warnings.push(Warning::OrphanKeyRecord {
                    element_index: record.element_index,
                    tag: record.tag,
                }),
            }
        }
        tracing::debug!("KEY*: linked {} of {} records", linked, self.records.len());
        linked
    }
}
