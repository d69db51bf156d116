//! Fuzz test for packed controller geometry
//!
//! Decoding any register triple must stay within the encoding's limits, and
//! packing the decoded counts must give the same registers back.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rawhdd_core::{PackedGeometry, SECTOR_SIZE};

fuzz_target!(|data: (u8, u8, u8)| {
    let (cl, ch, dh) = data;
    let packed = PackedGeometry { cl, ch, dh };
    let geometry = packed.decode();

    assert!(geometry.cylinders >= 1 && geometry.cylinders <= 1024);
    assert!(geometry.heads >= 1 && geometry.heads <= 256);
    assert!(geometry.sectors <= 63);

    if geometry.sectors > 0 {
        assert_eq!(
            PackedGeometry::pack(geometry.cylinders, geometry.heads, geometry.sectors),
            packed
        );
    }

    // Size helpers must not overflow for anything the encoding can express
    let _ = geometry.total_bytes(SECTOR_SIZE);
    let _ = geometry.track_bytes(SECTOR_SIZE);
    let _ = geometry.lba(geometry.cylinders - 1, geometry.heads - 1, geometry.sectors.max(1));
});
