use peak_alloc::PeakAlloc;
use steertab_core::prelude::*;

#[test]
#[ignore = "test should be run manually"]
fn test_build_table_does_not_allocate() {
    #[global_allocator]
    static PEAK_ALLOC: PeakAlloc = PeakAlloc;

    let bins = [
        BinRange::new(0, 125),
        BinRange::new(125, 250),
        BinRange::new(250, 500),
        BinRange::new(500, 1000),
    ];
    // warm up the inverse table and the tracing callsites
    let _ = build_table(&bins, EncodingMode::Exclusive, 2).unwrap();
    let _ = to_permille(0);

    let before = PEAK_ALLOC.current_usage();
    let exclusive = build_table(&bins, EncodingMode::Exclusive, 2).unwrap();
    let bitmask = build_table(&bins, EncodingMode::Bitmask, 4).unwrap();
    let after = PEAK_ALLOC.current_usage();
    println!("build_table used {} bytes of heap.", after.saturating_sub(before));
    assert_eq!(before, after);
    assert_eq!(exclusive[1023], 3);
    assert_eq!(bitmask[1023], 1 << 3);
}
