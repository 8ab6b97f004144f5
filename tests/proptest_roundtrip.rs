use ipktool::archive::{IpkArchive, IpkEntry};
use proptest::prelude::*;
use std::io::Cursor;

fn entry_strategy() -> impl Strategy<Value = IpkEntry> {
    (
        "[a-z]{1,8}/[a-z]{1,12}",
        prop_oneof![Just(".tpl"), Just(".png.ckd"), Just(".dtape.ckd"), Just(".wav.ckd")],
        proptest::collection::vec(any::<u8>(), 0..2048),
        any::<u32>(),
    )
        .prop_map(|(stem, suffix, contents, tag)| IpkEntry {
            path: format!("{stem}{suffix}"),
            contents,
            tag,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_archive_roundtrips(
        entries in proptest::collection::vec(entry_strategy(), 0..12),
        blob in proptest::array::uniform28(any::<u8>()),
    ) {
        let ar = IpkArchive { header_blob: blob, entries };
        let mut buf = Cursor::new(Vec::new());
        ar.write_to(&mut buf).unwrap();
        buf.set_position(0);
        let back = IpkArchive::read_from(&mut buf).unwrap();

        prop_assert_eq!(back.header_blob, ar.header_blob);
        prop_assert_eq!(back.entries, ar.entries);
        prop_assert_eq!(buf.get_ref().len() % 4, 0);
    }

    #[test]
    fn diff_apply_is_an_inverse_for_single_edits(
        base_contents in proptest::collection::vec(any::<u8>(), 1..512),
        edit in proptest::collection::vec(any::<u8>(), 1..512),
    ) {
        prop_assume!(base_contents != edit);

        let mut original = IpkArchive::new();
        original.entries.push(IpkEntry {
            path: "maps/x/file.tpl".into(),
            contents: base_contents,
            tag: 1,
        });
        let mut modified = original.clone();
        modified.entries[0].contents = edit.clone();

        let patch = original.diff_with(&modified);
        let mut target = original.clone();
        target.apply_patch(&patch).unwrap();
        prop_assert_eq!(&target.entries[0].contents, &edit);

        // Idempotent re-apply.
        target.apply_patch(&patch).unwrap();
        prop_assert_eq!(&target.entries[0].contents, &edit);
    }
}
