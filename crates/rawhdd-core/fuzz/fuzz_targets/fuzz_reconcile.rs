//! Fuzz test for geometry reconciliation
//!
//! Tests that arbitrary readings and overrides never panic and never produce
//! a geometry with a zero field.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rawhdd_core::{
    geometry, DriveSelector, Error, GeometryOverrides, GeometrySource, PackedGeometry,
    TableGeometry,
};

#[derive(Debug, Arbitrary)]
struct Input {
    table_cylinders: u32,
    table_heads: u32,
    packed: Option<(u8, u8, u8)>,
    cylinders: Option<u32>,
    heads: Option<u32>,
    sectors: Option<u32>,
    drive: u8,
}

impl GeometrySource for Input {
    fn read_table_geometry(&mut self, _drive: DriveSelector) -> TableGeometry {
        TableGeometry {
            cylinders: self.table_cylinders,
            heads: self.table_heads,
        }
    }

    fn read_controller_geometry(&mut self, _drive: DriveSelector) -> rawhdd_core::Result<PackedGeometry> {
        self.packed
            .map(|(cl, ch, dh)| PackedGeometry { cl, ch, dh })
            .ok_or_else(|| Error::GeometryUnavailable("fuzz".to_string()))
    }
}

fuzz_target!(|input: Input| {
    let mut input = input;
    let overrides = GeometryOverrides {
        cylinders: input.cylinders,
        heads: input.heads,
        sectors: input.sectors,
        drive: Some(DriveSelector::new(input.drive)),
    };
    let drive = DriveSelector::new(input.drive);

    match geometry::resolve(&mut input, drive, &overrides) {
        Ok(chs) => {
            assert!(chs.geometry.is_complete());
            assert_eq!(chs.overridden, overrides.any_geometry());
            if overrides.full_geometry().is_some() {
                assert!(!chs.mismatch);
            }
        }
        Err(Error::GeometryUnavailable(_) | Error::IncompleteGeometry { .. }) => {}
        Err(e) => panic!("unexpected error: {e}"),
    }
});
