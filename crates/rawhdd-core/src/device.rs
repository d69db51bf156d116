//! Drive selection and the raw sector device interface

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Offset added to a drive index to form its BIOS drive number
pub const FIRST_HARD_DRIVE: u8 = 0x80;

/// Highest drive index that still has a BIOS drive number
pub const MAX_DRIVE_INDEX: u8 = u8::MAX - FIRST_HARD_DRIVE;

/// Identifies the physical drive to image
///
/// Operators count drives from 0; the device layer addresses them by BIOS
/// drive number (`0x80` for the first hard drive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriveSelector {
    index: u8,
}

impl DriveSelector {
    /// Select the drive at a 0-based index
    pub fn new(index: u8) -> Self {
        Self { index }
    }

    /// 0-based drive index
    pub fn index(&self) -> u8 {
        self.index
    }

    /// BIOS drive number, or `None` past [`MAX_DRIVE_INDEX`]
    pub fn bios_code(&self) -> Option<u8> {
        FIRST_HARD_DRIVE.checked_add(self.index)
    }
}

impl fmt::Display for DriveSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

/// Raw sector access to a drive
///
/// Reads fill `buffer` in place. A failed read may leave the buffer partly
/// overwritten; callers must not assume its contents.
#[cfg_attr(test, mockall::automock)]
pub trait SectorDevice {
    /// Read every sector of one track into `buffer`
    ///
    /// `buffer` holds exactly one track.
    fn read_track(
        &mut self,
        drive: DriveSelector,
        cylinder: u32,
        head: u32,
        buffer: &mut [u8],
    ) -> io::Result<()>;

    /// Read one sector (1-based) into `buffer`
    fn read_sector(
        &mut self,
        drive: DriveSelector,
        cylinder: u32,
        head: u32,
        sector: u32,
        buffer: &mut [u8],
    ) -> io::Result<()>;

    /// Reset the drive controller
    fn reset_controller(&mut self, drive: DriveSelector);
}

impl<D: SectorDevice + ?Sized> SectorDevice for &mut D {
    fn read_track(
        &mut self,
        drive: DriveSelector,
        cylinder: u32,
        head: u32,
        buffer: &mut [u8],
    ) -> io::Result<()> {
        (**self).read_track(drive, cylinder, head, buffer)
    }

    fn read_sector(
        &mut self,
        drive: DriveSelector,
        cylinder: u32,
        head: u32,
        sector: u32,
        buffer: &mut [u8],
    ) -> io::Result<()> {
        (**self).read_sector(drive, cylinder, head, sector, buffer)
    }

    fn reset_controller(&mut self, drive: DriveSelector) {
        (**self).reset_controller(drive);
    }
}

impl<D: SectorDevice + ?Sized> SectorDevice for Box<D> {
    fn read_track(
        &mut self,
        drive: DriveSelector,
        cylinder: u32,
        head: u32,
        buffer: &mut [u8],
    ) -> io::Result<()> {
        (**self).read_track(drive, cylinder, head, buffer)
    }

    fn read_sector(
        &mut self,
        drive: DriveSelector,
        cylinder: u32,
        head: u32,
        sector: u32,
        buffer: &mut [u8],
    ) -> io::Result<()> {
        (**self).read_sector(drive, cylinder, head, sector, buffer)
    }

    fn reset_controller(&mut self, drive: DriveSelector) {
        (**self).reset_controller(drive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_selector_encoding() {
        let drive = DriveSelector::new(0);
        assert_eq!(drive.index(), 0);
        assert_eq!(drive.bios_code(), Some(0x80));

        let drive = DriveSelector::new(1);
        assert_eq!(drive.bios_code(), Some(0x81));
        assert_eq!(drive.to_string(), "1");
    }

    #[test]
    fn test_drive_selector_code_does_not_wrap() {
        assert_eq!(MAX_DRIVE_INDEX, 127);
        assert_eq!(DriveSelector::new(MAX_DRIVE_INDEX).bios_code(), Some(0xFF));
        assert_eq!(DriveSelector::new(MAX_DRIVE_INDEX + 1).bios_code(), None);
        assert_eq!(DriveSelector::new(200).bios_code(), None);
    }

    #[test]
    fn test_drive_selector_default_is_first_drive() {
        assert_eq!(DriveSelector::default().bios_code(), Some(FIRST_HARD_DRIVE));
    }

    #[test]
    fn test_boxed_device_forwards() {
        let mut mock = MockSectorDevice::new();
        mock.expect_reset_controller().times(1).return_const(());
        mock.expect_read_sector()
            .times(1)
            .returning(|_, _, _, _, buf| {
                buf.fill(0x5A);
                Ok(())
            });

        let mut device: Box<dyn SectorDevice> = Box::new(mock);
        device.reset_controller(DriveSelector::new(0));

        let mut buf = [0u8; 4];
        device
            .read_sector(DriveSelector::new(0), 0, 0, 1, &mut buf)
            .unwrap();
        assert_eq!(buf, [0x5A; 4]);
    }
}
