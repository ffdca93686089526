//! Queryable resource table for one opened container.
//!
//! The two index schemes keep their resources differently: a Standard
//! mmap is dense and addressed by position, while Afterburner entries
//! arrive in ABMP/ILS order with sparse ids. Both expose the same query
//! surface through [`ResourceStore`], whose variant is fixed when the
//! container is opened.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::resource::Resource;
use crate::tag::ChunkTag;

#[derive(Debug, Default)]
struct TagIndex(HashMap<ChunkTag, Vec<usize>>);

impl TagIndex {
    fn insert(&mut self, tag: ChunkTag, position: usize) {
        self.0.entry(tag).or_default().push(position);
    }

    fn positions(&self, tag: ChunkTag) -> &[usize] {
        self.0.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resources from an mmap; position equals resource id
#[derive(Debug, Default)]
pub struct StandardTable {
    resources: Vec<Resource>,
    by_tag: TagIndex,
}

impl StandardTable {
    /// Build from mmap entries in index order
    pub(crate) fn from_entries(resources: Vec<Resource>) -> Self {
        let mut by_tag = TagIndex::default();
        for (position, res) in resources.iter().enumerate() {
            debug_assert_eq!(res.id() as usize, position);
            by_tag.insert(res.tag(), position);
        }
        Self { resources, by_tag }
    }

    fn position(&self, id: u32) -> Option<usize> {
        let position = id as usize;
        (position < self.resources.len()).then_some(position)
    }
}

/// Resources from ABMP and ILS, kept in materialization order
#[derive(Debug, Default)]
pub struct AfterburnerTable {
    resources: Vec<Resource>,
    by_id: HashMap<u32, usize>,
    by_tag: TagIndex,
}

impl AfterburnerTable {
    /// Add a resource; returns false if the id is already present
    pub(crate) fn insert(&mut self, resource: Resource) -> bool {
        if self.by_id.contains_key(&resource.id()) {
            return false;
        }
        let position = self.resources.len();
        self.by_id.insert(resource.id(), position);
        self.by_tag.insert(resource.tag(), position);
        self.resources.push(resource);
        true
    }

    fn position(&self, id: u32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub(crate) fn first_by_tag(&self, tag: ChunkTag) -> Option<&Resource> {
        self.by_tag.positions(tag).first().map(|&p| &self.resources[p])
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug)]
pub enum ResourceStore {
    Standard(StandardTable),
    Afterburner(AfterburnerTable),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapEntry {
    chunk_type: String,
    resource_id: u32,
    offset: i64,
    cast_id: Option<i32>,
}

impl ResourceStore {
    fn parts(&self) -> (&[Resource], &TagIndex) {
        match self {
            ResourceStore::Standard(t) => (&t.resources, &t.by_tag),
            ResourceStore::Afterburner(t) => (&t.resources, &t.by_tag),
        }
    }

    fn position(&self, id: u32) -> Option<usize> {
        match self {
            ResourceStore::Standard(t) => t.position(id),
            ResourceStore::Afterburner(t) => t.position(id),
        }
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut Resource> {
        let position = self.position(id)?;
        match self {
            ResourceStore::Standard(t) => t.resources.get_mut(position),
            ResourceStore::Afterburner(t) => t.resources.get_mut(position),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Resource> {
        match self {
            ResourceStore::Standard(t) => t.resources.iter_mut(),
            ResourceStore::Afterburner(t) => t.resources.iter_mut(),
        }
    }

    pub fn is_afterburner(&self) -> bool {
        matches!(self, ResourceStore::Afterburner(_))
    }

    /// Every resource, resolved or not, in table order
    pub fn all(&self) -> &[Resource] {
        self.parts().0
    }

    pub fn get(&self, id: u32) -> Option<&Resource> {
        self.position(id).map(|p| &self.parts().0[p])
    }

    pub fn by_tag(&self, tag: ChunkTag) -> Vec<&Resource> {
        let (resources, by_tag) = self.parts();
        by_tag
            .positions(tag)
            .iter()
            .map(|&p| &resources[p])
            .collect()
    }

    /// First resource with the given tag
    pub fn first_by_tag(&self, tag: ChunkTag) -> Option<&Resource> {
        let (resources, by_tag) = self.parts();
        by_tag.positions(tag).first().map(|&p| &resources[p])
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// Number of resources whose bytes are available
    pub fn resolved_count(&self) -> usize {
        self.all().iter().filter(|r| r.is_resolved()).count()
    }

    /// Resource map as pretty JSON, skipping nested container headers
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<MapEntry> = self
            .all()
            .iter()
            .filter(|r| !r.tag().is_container())
            .map(|r| MapEntry {
                chunk_type: r.tag().to_string(),
                resource_id: r.id(),
                offset: r.meta().offset,
                cast_id: r.cast_id(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Compression, ResourceMeta};

    fn res(id: u32, tag: &[u8; 4], offset: i64) -> Resource {
        Resource::pending(
            id,
            ResourceMeta {
                tag: ChunkTag(*tag),
                offset,
                compressed_size: 0,
                uncompressed_size: 0,
                compression: Compression::Raw,
                cast_id: None,
            },
        )
    }

    #[test]
    fn standard_lookup_by_position() {
        let store = ResourceStore::Standard(StandardTable::from_entries(vec![
            res(0, b"RIFX", 0),
            res(1, b"imap", 12),
            res(2, b"BITD", 100),
            res(3, b"BITD", 200),
        ]));
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(2).unwrap().meta().offset, 100);
        assert!(store.get(4).is_none());
        let bitds: Vec<u32> = store.by_tag(ChunkTag::BITD).iter().map(|r| r.id()).collect();
        assert_eq!(bitds, vec![2, 3]);
        assert!(store.by_tag(ChunkTag::CLUT).is_empty());
    }

    #[test]
    fn afterburner_sparse_ids() {
        let mut table = AfterburnerTable::default();
        assert!(table.insert(res(40, b"BITD", 10)));
        assert!(table.insert(res(3, b"KEY*", 0)));
        assert!(!table.insert(res(40, b"CLUT", 0)));
        let mut store = ResourceStore::Afterburner(table);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(40).unwrap().tag(), ChunkTag::BITD);
        assert_eq!(store.first_by_tag(ChunkTag::KEY).unwrap().id(), 3);

        store.get_mut(40).unwrap().resolve(vec![1, 2]);
        assert_eq!(store.resolved_count(), 1);
    }

    #[test]
    fn json_map_skips_container_header() {
        let store = ResourceStore::Standard(StandardTable::from_entries(vec![
            res(0, b"RIFX", 0),
            res(1, b"BITD", 64),
        ]));
        let json = store.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["chunkType"], "BITD");
        assert_eq!(entries[0]["resourceId"], 1);
        assert_eq!(entries[0]["offset"], 64);
    }
}
