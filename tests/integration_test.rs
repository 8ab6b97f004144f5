use ipktool::archive::{IpkArchive, IpkEntry, HEADER_BLOB_LEN, PATCH_SENTINEL};
use ipktool::codec;
use ipktool::dir::{export_dir, import_dir};
use ipktool::{Endian, IpkError, IpkStream};
use std::io::Cursor;
use tempfile::tempdir;

fn bundle() -> IpkArchive {
    let mut ar = IpkArchive::new();
    ar.header_blob = *b"\x01\x02\x03\x04....opaque.metadata.....";
    for (path, contents, tag) in [
        (
            "world/jd2016/tex/banner.png.ckd",
            vec![0x42u8; 512], // compresses well -> exercises the zlib path
            0x1111_1111u32,
        ),
        (
            "world/jd2016/songdesc.tpl",
            b"plain template, stored verbatim".to_vec(),
            0x2222_2222,
        ),
        (
            "world/jd2016/timeline/main.dtape.ckd",
            b"dance tape dance tape dance tape".to_vec(),
            0x3333_3333,
        ),
    ] {
        ar.entries.push(IpkEntry {
            path: path.into(),
            contents,
            tag,
        });
    }
    ar
}

fn encode(ar: &IpkArchive) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    ar.write_to(&mut buf).unwrap();
    buf.into_inner()
}

#[test]
fn container_roundtrip() {
    let ar = bundle();
    let raw = encode(&ar);
    let back = IpkArchive::read_from(Cursor::new(raw)).unwrap();

    assert_eq!(back.header_blob, ar.header_blob);
    assert_eq!(back.entries.len(), ar.entries.len());
    // Entry order, paths, contents and tags all survive.
    for (a, b) in ar.entries.iter().zip(&back.entries) {
        assert_eq!(a, b);
    }
}

#[test]
fn offsets_and_alignment_are_correct() {
    let raw = encode(&bundle());
    assert_eq!(raw.len() % 4, 0);

    let mut r = IpkStream::new(Cursor::new(&raw), Endian::Big);
    r.read_u32().unwrap(); // magic
    r.read_i32().unwrap(); // version
    r.read_i32().unwrap(); // version2
    let base = r.read_u32().unwrap();
    let count = r.read_i32().unwrap();
    r.read_bytes(HEADER_BLOB_LEN).unwrap();

    // The header+table region ends exactly at the (4-aligned) base offset.
    assert_eq!(base % 4, 0);

    for _ in 0..count {
        assert_eq!(r.read_u32().unwrap(), 1); // entry version
        let raw_size = r.read_u32().unwrap();
        let packed_size = r.read_u32().unwrap();
        r.read_i64().unwrap(); // timestamp
        let offset = r.read_u64().unwrap();
        r.read_pstring().unwrap();
        r.read_pstring().unwrap();
        r.read_u32().unwrap(); // tag
        r.read_u32().unwrap(); // type code

        // Every data region starts 4-aligned, relative offsets included.
        let start = u64::from(base) + offset;
        assert_eq!(start % 4, 0);

        let stored_len = if packed_size > 0 { packed_size } else { raw_size };
        let stored = &raw[start as usize..(start + u64::from(stored_len)) as usize];
        let unpacked_len = if packed_size > 0 {
            codec::decompress(stored).unwrap().len()
        } else {
            stored.len()
        };
        assert_eq!(unpacked_len, raw_size as usize);
    }
}

#[test]
fn diff_then_apply_reproduces_the_modified_archive() {
    let original = bundle();
    let mut modified = bundle();
    modified.entries[2].contents = b"completely re-timed dance tape".to_vec();

    // Through the container: the patch survives encode/decode.
    let patch_raw = encode(&original.diff_with(&modified));
    let patch = IpkArchive::read_from(Cursor::new(patch_raw)).unwrap();
    assert_eq!(patch.header_blob, PATCH_SENTINEL);

    let mut target = bundle();
    target.apply_patch(&patch).unwrap();
    for (a, b) in modified.entries.iter().zip(&target.entries) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.contents, b.contents);
    }
}

#[test]
fn patch_is_idempotent_through_the_container() {
    let original = bundle();
    let mut modified = bundle();
    modified.entries[0].contents = vec![0x99; 600];

    let patch_raw = encode(&original.diff_with(&modified));
    let patch = IpkArchive::read_from(Cursor::new(patch_raw)).unwrap();

    let mut target = bundle();
    target.apply_patch(&patch).unwrap();
    target.apply_patch(&patch).unwrap();
    assert_eq!(target.entries[0].contents, vec![0x99; 600]);
}

#[test]
fn conflicting_patch_rejects_without_mutation() {
    let original = bundle();
    let mut modified = bundle();
    modified.entries[1].contents = b"edited template".to_vec();
    let patch = original.diff_with(&modified);

    let mut drifted = bundle();
    drifted.entries[1].contents = b"some other edit entirely".to_vec();
    let before = drifted.clone();

    assert!(matches!(
        drifted.apply_patch(&patch),
        Err(IpkError::PatchConflict { .. })
    ));
    assert_eq!(drifted, before);
}

#[test]
fn plain_archive_is_not_accepted_as_a_patch() {
    let mut target = bundle();
    let not_a_patch = bundle();
    assert!(matches!(
        target.apply_patch(&not_a_patch),
        Err(IpkError::NotAPatch)
    ));
}

#[test]
fn unpack_edit_repack_diff_apply_end_to_end() {
    let dir = tempdir().unwrap();
    let shipped = bundle();

    // Unpack to disk, edit one file, reimport.
    export_dir(&shipped, dir.path()).unwrap();
    let edited_path = dir.path().join("world/jd2016/songdesc.tpl");
    std::fs::write(&edited_path, b"modded template").unwrap();
    let modded = import_dir(dir.path()).unwrap();

    // Tags round-trip through the sidecars.
    assert_eq!(
        modded.entry("world/jd2016/songdesc.tpl").unwrap().tag,
        0x2222_2222
    );

    let patch = shipped.diff_with(&modded);
    assert_eq!(patch.entries.len(), 1);

    let mut patched = bundle();
    patched.apply_patch(&patch).unwrap();
    assert_eq!(
        patched.entry("world/jd2016/songdesc.tpl").unwrap().contents,
        b"modded template"
    );
}

#[test]
fn truncated_container_fails_cleanly() {
    let raw = encode(&bundle());
    let cut = &raw[..raw.len() / 3];
    assert!(IpkArchive::read_from(Cursor::new(cut.to_vec())).is_err());
}

#[test]
fn wrong_version_reports_expected_and_actual() {
    let mut raw = encode(&bundle());
    // version is the i32 at offset 4 (big-endian)
    raw[4..8].copy_from_slice(&99i32.to_be_bytes());
    match IpkArchive::read_from(Cursor::new(raw)) {
        Err(IpkError::BadVersion { expected: 5, actual: 99 }) => {}
        other => panic!("expected BadVersion, got {other:?}"),
    }
}
