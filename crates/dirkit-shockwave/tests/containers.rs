mod common;

use std::collections::BTreeSet;

use common::{bitmap_cast, key_table, standard_movie, AbEntry, Afterburner, Placement};
use dirkit_shockwave::{
    BitmapDecoder, ChunkTag, CodecKind, DecodeOutcome, Endianness, PaletteRegistry, Session,
    ShockwaveError, Version, Warning,
};

/// KEY*, CASt, BITD, STXT at ids 3-6
fn standard_chunks(little: bool) -> Vec<(&'static [u8; 4], Vec<u8>)> {
    vec![
        (
            b"KEY*",
            key_table(
                little,
                &[(5, 4, b"BITD"), (6, 4, b"STXT"), (7, 4, b"free"), (40, 4, b"BITD")],
            ),
        ),
        (b"CASt", bitmap_cast("dot", 2, 2, 8, -3)),
        (b"BITD", vec![0, 255, 255, 0]),
        (b"STXT", b"hello".to_vec()),
    ]
}

#[test]
fn standard_table_covers_every_mmap_entry() {
    let data = standard_movie(false, 1700, 0, &standard_chunks(false));
    let session = Session::open(&data).unwrap();

    assert_eq!(session.endian(), Endianness::Big);
    assert_eq!(session.codec().kind, CodecKind::Standard);
    assert_eq!(session.version(), Version::D8_5);

    assert_eq!(session.all_resources().len(), 7);
    for id in 0..7 {
        let resource = session.resource_by_id(id).unwrap();
        let offset = resource.meta().offset;
        assert!(offset == -1 || (0..data.len() as i64).contains(&offset));
        assert!(resource.is_resolved());
    }
    assert!(session.resource_by_id(7).is_none());

    let text = session.resource_by_id(6).unwrap();
    assert_eq!(text.bytes(), Some(&b"hello"[..]));
    assert_eq!(text.cast_id(), Some(4));

    let bitmaps = session.resources_by_tag(ChunkTag::BITD);
    assert_eq!(bitmaps.len(), 1);
    assert_eq!(bitmaps[0].id(), 5);
    assert_eq!(bitmaps[0].cast_id(), Some(4));
}

#[test]
fn key_problems_are_warnings() {
    let data = standard_movie(false, 1700, 0, &standard_chunks(false));
    let session = Session::open(&data).unwrap();

    assert!(session
        .warnings()
        .contains(&Warning::InvalidKeyRecord { element_index: 7, tag: ChunkTag(*b"free") }));
    assert!(session
        .warnings()
        .contains(&Warning::OrphanKeyRecord { element_index: 40, tag: ChunkTag::BITD }));
    assert_eq!(session.keys().unwrap().records.len(), 4);
}

#[test]
fn little_endian_movie_reads_the_same() {
    let be = Session::open(&standard_movie(false, 1700, 0, &standard_chunks(false))).unwrap();
    let le = Session::open(&standard_movie(true, 1700, 0, &standard_chunks(true))).unwrap();

    assert_eq!(le.endian(), Endianness::Little);
    assert_eq!(be.all_resources().len(), le.all_resources().len());
    for (a, b) in be.all_resources().iter().zip(le.all_resources()) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.tag(), b.tag());
        assert_eq!(a.cast_id(), b.cast_id());
        // byte-order independent payloads
        if [ChunkTag::CAST, ChunkTag::BITD, ChunkTag(*b"STXT")].contains(&a.tag()) {
            assert_eq!(a.bytes(), b.bytes());
        }
    }
}

#[test]
fn cast_metadata_drives_bitmap_decoding() {
    let session = Session::open(&standard_movie(false, 1700, 0, &standard_chunks(false))).unwrap();
    let member = &session.casts()[&4];
    assert_eq!(member.name, "dot");
    assert_eq!(member.bitmap.as_ref().unwrap().bit_depth, 8);

    let palettes = PaletteRegistry::with_builtins();
    let image = session.decode_bitmap(5, &palettes).unwrap();
    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(image.pixel(0, 0).unwrap(), [255, 255, 255, 255]);
    assert_eq!(image.pixel(1, 0).unwrap(), [0, 0, 0, 255]);
    assert_eq!(image.pixel(0, 1).unwrap(), [0, 0, 0, 255]);

    let outcomes = session.run_decoder(&BitmapDecoder, &palettes);
    assert_eq!(outcomes.len(), 1);
    let png = outcomes[0].value().unwrap().to_png().unwrap();
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn missing_palette_is_incomplete_not_fatal() {
    let session = Session::open(&standard_movie(false, 1700, 0, &standard_chunks(false))).unwrap();
    let outcomes = session.run_decoder(&BitmapDecoder, &PaletteRegistry::new());
    assert!(matches!(outcomes[0], DecodeOutcome::Incomplete { id: 5, .. }));
}

#[test]
fn nested_offsets_are_rebased() {
    let data = standard_movie(true, 1224, 5000, &standard_chunks(true));
    let session = Session::open_with_base(&data, 5000).unwrap();
    assert_eq!(session.base_offset(), 5000);
    assert_eq!(session.version(), Version::D7_0);
    assert_eq!(session.resource_by_id(0).unwrap().meta().offset, 0);
    assert_eq!(session.resource_by_id(6).unwrap().bytes(), Some(&b"hello"[..]));

    // Without the correction the mmap offset points past the data
    assert!(Session::open(&data).is_err());
}

#[test]
fn movie_without_key_table() {
    let data = standard_movie(false, 1700, 0, &[(b"BITD", vec![1, 2, 3])]);
    let session = Session::open(&data).unwrap();
    assert_eq!(session.warnings(), &[Warning::MissingKeyTable]);
    assert_eq!(session.resource_by_id(3).unwrap().cast_id(), None);
    assert!(session.keys().is_none());
}

#[test]
fn map_json_lists_resources() {
    let session = Session::open(&standard_movie(false, 1700, 0, &standard_chunks(false))).unwrap();
    let json: serde_json::Value = serde_json::from_str(&session.store().to_json().unwrap()).unwrap();
    let entries = json.as_array().unwrap();
    // container header skipped
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[4]["chunkType"], "BITD");
    assert_eq!(entries[4]["resourceId"], 5);
    assert_eq!(entries[4]["castId"], 4);
}

fn afterburner_entries() -> Vec<AbEntry> {
    vec![
        AbEntry::new(
            3,
            b"KEY*",
            key_table(true, &[(5, 4, b"BITD"), (6, 4, b"STXT")]),
            Placement::Inline { zlib: true },
        ),
        AbEntry::new(4, b"CASt", bitmap_cast("dot", 2, 2, 8, -3), Placement::Inline { zlib: false }),
        AbEntry::new(5, b"BITD", vec![0, 255, 255, 0], Placement::Ils),
        AbEntry::new(6, b"STXT", b"deferred text".to_vec(), Placement::Ils),
        AbEntry::new(7, b"CLUT", vec![0, 0, 0, 1, 0xFF, 0, 0x80, 0, 0x10, 0], Placement::Inline { zlib: true }),
    ]
}

#[test]
fn afterburner_passes_partition_abmp_ids() {
    let data = Afterburner::new(afterburner_entries()).build();
    let session = Session::open(&data).unwrap();

    assert_eq!(session.endian(), Endianness::Little);
    assert_eq!(session.codec().kind, CodecKind::Afterburner);
    assert_eq!(session.version(), Version::D8_0);
    assert_eq!(session.fver().unwrap().director_version, 1410);

    let all: BTreeSet<u32> = session.all_resources().iter().map(|r| r.id()).collect();
    let direct: BTreeSet<u32> = session
        .all_resources()
        .iter()
        .filter(|r| !r.meta().is_deferred())
        .map(|r| r.id())
        .collect();
    let from_ils: BTreeSet<u32> = session
        .all_resources()
        .iter()
        .filter(|r| r.meta().is_deferred())
        .map(|r| r.id())
        .collect();

    assert_eq!(all, BTreeSet::from([2, 3, 4, 5, 6, 7]));
    assert_eq!(direct, BTreeSet::from([2, 3, 4, 7]));
    assert_eq!(from_ils, BTreeSet::from([5, 6]));
    assert!(direct.is_disjoint(&from_ils));
    assert!(session.all_resources().iter().all(|r| r.is_resolved()));
    assert!(session.warnings().is_empty());
}

#[test]
fn afterburner_payloads_and_links() {
    let session = Session::open(&Afterburner::new(afterburner_entries()).build()).unwrap();

    assert_eq!(session.resource_by_id(6).unwrap().bytes(), Some(&b"deferred text"[..]));
    assert_eq!(session.resource_by_id(5).unwrap().cast_id(), Some(4));

    let palette = session.clut_palette(7).unwrap();
    assert_eq!(palette.get(0), [0xFF, 0x80, 0x10]);

    let compressors = session.compression_types();
    assert_eq!(compressors.len(), 1);
    assert_eq!(compressors[0].name, "zlib");
    assert_eq!(compressors[0].guid.to_string(), "AC99E904-0070-0B36-0008-0000347A3707");

    let image = session
        .decode_bitmap(5, &PaletteRegistry::with_builtins())
        .unwrap();
    assert_eq!(image.pixel(1, 1).unwrap(), [255, 255, 255, 255]);
}

#[test]
fn zero_length_ils_entry_ends_the_stream() {
    let data = Afterburner::new(vec![
        AbEntry::new(10, b"STXT", b"a".to_vec(), Placement::Ils),
        AbEntry::new(11, b"STXT", Vec::new(), Placement::Ils),
        AbEntry::new(12, b"STXT", b"b".to_vec(), Placement::Ils),
    ])
    .build();
    let session = Session::open(&data).unwrap();

    assert!(session.resource_by_id(10).unwrap().is_resolved());
    assert!(!session.resource_by_id(11).unwrap().is_resolved());
    assert!(!session.resource_by_id(12).unwrap().is_resolved());
    assert_eq!(session.all_resources().len(), 4);

    let unresolved: Vec<u32> = session
        .warnings()
        .iter()
        .filter_map(|w| match w {
            Warning::UnresolvedIlsEntry { id, .. } => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(unresolved, vec![11, 12]);
    assert!(session.warnings().contains(&Warning::MissingKeyTable));
}

#[test]
fn deferred_entries_without_ils_are_fatal() {
    let mut movie = Afterburner::new(vec![AbEntry::new(5, b"STXT", b"x".to_vec(), Placement::Ils)]);
    movie.ils_id = None;
    assert!(matches!(
        Session::open(&movie.build()),
        Err(ShockwaveError::MissingResource(tag)) if tag == ChunkTag::ILS
    ));
}

#[test]
fn corrupt_abmp_is_fatal() {
    let mut movie = Afterburner::new(afterburner_entries());
    movie.corrupt_abmp = true;
    assert!(matches!(
        Session::open(&movie.build()),
        Err(ShockwaveError::Inflate { chunk, .. }) if chunk == ChunkTag::ABMP
    ));
}

#[test]
fn unknown_signature_is_fatal() {
    assert!(matches!(
        Session::open(b"RIFF\0\0\0\0WAVEfmt "),
        Err(ShockwaveError::UnknownContainer(_))
    ));
}
