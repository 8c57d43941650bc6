//! SD card storage, FAT volume 0, files in the root directory
use super::{Stream, StorageSink, LINE_ENDING};
use crate::records::LINE_CAPACITY;
use core::fmt::Debug;
use embedded_hal as hal;
use embedded_sdmmc as sd;
use hal::spi::FullDuplex;

/// Time source for the FAT directory entries. File dates are not part of the
/// logs (every line carries its own timestamp), so a fixed date is stamped.
pub struct FixedTimeSource;

impl sd::TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> sd::Timestamp {
        // 2010-01-01T00:00:00, the lower plausible bound
        sd::Timestamp {
            year_since_1970: 40,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// Variants of errors
#[derive(Debug)]
pub enum SdError {
    /// The volume was never mounted, or its last mount failed
    NoVolume,
    /// Error from the card or the file system
    Card(sd::Error<sd::SdMmcError>),
    /// The line and its terminator do not fit a [`Frame`]
    LineTooLong,
}

impl From<sd::Error<sd::SdMmcError>> for SdError {
    fn from(e: sd::Error<sd::SdMmcError>) -> Self {
        SdError::Card(e)
    }
}

/// A line with its terminator, written to the card in one piece.
pub type Frame = heapless::String<{ LINE_CAPACITY + LINE_ENDING.len() }>;

/// Terminate `line` in a single buffer, so that a failed write never leaves
/// a line without its terminator on the card.
fn frame(line: &str) -> Result<Frame, SdError> {
    let mut frame = Frame::new();
    frame.push_str(line).map_err(|_| SdError::LineTooLong)?;
    frame.push_str(LINE_ENDING).map_err(|_| SdError::LineTooLong)?;
    Ok(frame)
}

/// One open file and the root directory it was opened from.
pub struct SdHandle {
    directory: sd::Directory,
    file: sd::File,
}

/// SD card over SPI. The chip select line is bound at construction.
pub struct SdStorage<SPI, CS>
where
    SPI: hal::spi::FullDuplex<u8>,
    <SPI as FullDuplex<u8>>::Error: Debug,
    CS: hal::digital::v2::OutputPin,
{
    controller: sd::Controller<sd::SdMmcSpi<SPI, CS>, FixedTimeSource>,
    volume: Option<sd::Volume>,
}

impl<SPI, CS> SdStorage<SPI, CS>
where
    SPI: hal::spi::FullDuplex<u8>,
    <SPI as FullDuplex<u8>>::Error: Debug,
    CS: hal::digital::v2::OutputPin,
{
    pub fn new(spi: SPI, cs: CS) -> Self {
        SdStorage {
            controller: sd::Controller::new(sd::SdMmcSpi::new(spi, cs), FixedTimeSource),
            volume: None,
        }
    }
}

impl<SPI, CS> StorageSink for SdStorage<SPI, CS>
where
    SPI: hal::spi::FullDuplex<u8>,
    <SPI as FullDuplex<u8>>::Error: Debug,
    CS: hal::digital::v2::OutputPin,
{
    type Handle = SdHandle;
    type Error = SdError;

    fn init_volume(&mut self) -> Result<(), Self::Error> {
        self.volume = None;
        self.controller
            .device()
            .init()
            .map_err(|e| SdError::Card(sd::Error::DeviceError(e)))?;
        self.volume = Some(self.controller.get_volume(sd::VolumeIdx(0))?);
        Ok(())
    }

    fn open_append(&mut self, stream: Stream) -> Result<Self::Handle, Self::Error> {
        let volume = self.volume.as_mut().ok_or(SdError::NoVolume)?;
        let directory = self.controller.open_root_dir(volume)?;
        match self.controller.open_file_in_dir(
            volume,
            &directory,
            stream.file_name(),
            sd::Mode::ReadWriteCreateOrAppend,
        ) {
            Ok(file) => Ok(SdHandle { directory, file }),
            Err(e) => {
                self.controller.close_dir(volume, directory);
                Err(e.into())
            }
        }
    }

    fn write_line(&mut self, handle: &mut Self::Handle, line: &str) -> Result<(), Self::Error> {
        let frame = frame(line)?;
        let volume = self.volume.as_mut().ok_or(SdError::NoVolume)?;
        self.controller
            .write(volume, &mut handle.file, frame.as_bytes())?;
        Ok(())
    }

    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        let volume = self.volume.as_ref().ok_or(SdError::NoVolume)?;
        let closed = self.controller.close_file(volume, handle.file);
        self.controller.close_dir(volume, handle.directory);
        Ok(closed?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Line;

    #[test]
    fn frame_carries_its_terminator() {
        let frame = frame("2021-03-09T20:00:00, 10(968), 21").unwrap();
        assert_eq!(frame.as_str(), "2021-03-09T20:00:00, 10(968), 21\r\n");
    }

    #[test]
    fn longest_line_fits_a_frame() {
        let mut line = Line::new();
        for _ in 0..LINE_CAPACITY {
            line.push('x').unwrap();
        }
        let frame = frame(&line).unwrap();
        assert_eq!(frame.len(), LINE_CAPACITY + 2);
        assert!(frame.ends_with("x\r\n"));
    }

    #[test]
    fn oversized_line_is_refused_whole() {
        let line = "x".repeat(LINE_CAPACITY + 1);
        assert!(matches!(frame(&line), Err(SdError::LineTooLong)));
    }
}
