use super::*;

#[test]
fn round_trips_entries_and_reports_progress() {
    let mut a = FrameArchive::new();
    a.add_entry("one.bin", vec![1u8; 1000]).unwrap();
    a.add_entry("two.bin", b"hello".to_vec()).unwrap();

    let mut seen = Vec::new();
    let bytes = a
        .finalize(&CancelToken::new(), &mut |p| seen.push(p.percent))
        .unwrap()
        .unwrap();
    assert_eq!(&bytes[..4], ARCHIVE_MAGIC);
    assert_eq!(seen, vec![50.0, 100.0]);

    let entries = read_archive(&bytes).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], ("one.bin".to_owned(), vec![1u8; 1000]));
    assert_eq!(entries[1], ("two.bin".to_owned(), b"hello".to_vec()));
}

#[test]
fn cancelled_finalize_yields_none() {
    let mut a = FrameArchive::new();
    a.add_entry("x", vec![0; 10]).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(a.finalize(&cancel, &mut |_| {}).unwrap().is_none());
}

#[test]
fn rejects_duplicates_and_garbage() {
    let mut a = FrameArchive::new();
    a.add_entry("x", vec![]).unwrap();
    assert!(a.add_entry("x", vec![]).is_err());
    assert!(a.add_entry("", vec![]).is_err());
    assert!(read_archive(b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00").is_err());
    assert!(read_archive(b"FL").is_err());
}

#[test]
fn entry_names_pad_to_total() {
    assert_eq!(frame_entry_name(FrameIndex(7), 10), "frame_00007.png");
    assert_eq!(frame_entry_name(FrameIndex(7), 1_000_000), "frame_000007.png");
}
