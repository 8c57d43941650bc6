//! DS3231 RTC Interface
// https://www.analog.com/media/en/technical-documentation/data-sheets/ds3231.pdf

use super::{ClockSource, Date, Datetime, Time};
use embedded_hal::blocking::i2c;

/// Variants of errors
#[derive(Debug, PartialEq, Eq)]
pub enum Error<CommE> {
    /// I²C bus error, including a device that does not acknowledge
    Comm(CommE),
    /// Invalid data read from the device
    InvalidInputData,
}

/// Hours in either 12-hour (AM/PM) or 24-hour format
#[derive(Debug, Clone, Copy, PartialEq)]
enum Hours {
    /// AM [1-12]
    AM(u8),
    /// PM [1-12]
    PM(u8),
    /// 24H format [0-23]
    H24(u8),
}

struct Register;

impl Register {
    const SECONDS: u8 = 0x00;
    const MINUTES: u8 = 0x01;
    const HOURS: u8 = 0x02;
    const DOM: u8 = 0x04;
    const MONTH: u8 = 0x05;
    const YEAR: u8 = 0x06;
    const CONTROL: u8 = 0x0E;
    const TEMP_MSB: u8 = 0x11;
}

struct BitFlags;

impl BitFlags {
    const H24_H12: u8 = 0b0100_0000;
    const AM_PM: u8 = 0b0010_0000;
    const CENTURY: u8 = 0b1000_0000;
}

const DEVICE_ADDRESS: u8 = 0b110_1000;

/// Base of the two-digit year register; the century flag adds 100.
const BASE_YEAR: u16 = 2000;

#[derive(Debug, Default)]
pub struct Ds3231<I2C>
where
    I2C: i2c::Write + i2c::WriteRead,
{
    i2c: I2C,
}

impl<I2C, CommE> Ds3231<I2C>
where
    I2C: i2c::Write<Error = CommE> + i2c::WriteRead<Error = CommE>,
{
    /// Create a new instance of the DS3231 device.
    /// Nothing is sent on the bus until [`ClockSource::init`].
    pub fn new(i2c: I2C) -> Self {
        Ds3231 { i2c }
    }

    /// Give back the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn datetime(&mut self) -> Result<Datetime, Error<CommE>> {
        let mut data = [0; 8];
        self.read_data(&mut data)?;

        let century = data[Register::MONTH as usize + 1] & BitFlags::CENTURY != 0;
        let year = BASE_YEAR
            + if century { 100 } else { 0 }
            + packed_bcd_to_decimal(data[Register::YEAR as usize + 1]) as u16;
        let month = packed_bcd_to_decimal(data[Register::MONTH as usize + 1] & !BitFlags::CENTURY);
        let day = packed_bcd_to_decimal(data[Register::DOM as usize + 1]);
        let hour = hours_from_register(data[Register::HOURS as usize + 1]);
        let minute = packed_bcd_to_decimal(data[Register::MINUTES as usize + 1]);
        let second = packed_bcd_to_decimal(data[Register::SECONDS as usize + 1]);

        Ok(Datetime {
            date: Date { year, month, day },
            time: Time {
                hour: get_h24(hour)?,
                minute,
                second,
            },
        })
    }

    /// Integer part of the on-die temperature sensor, in degrees Celsius.
    pub fn temperature(&mut self) -> Result<i8, Error<CommE>> {
        let mut data = [Register::TEMP_MSB, 0, 0];
        self.read_data(&mut data)?;
        Ok(data[1] as i8)
    }

    /// Read the control register, which fails when nothing answers on the bus.
    fn probe(&mut self) -> Result<(), Error<CommE>> {
        let mut data = [Register::CONTROL, 0];
        self.read_data(&mut data)
    }

    /// Read the RTC via the I2C interface.
    /// `payload[0]` is the first register, the rest is filled by the device.
    fn read_data(&mut self, payload: &mut [u8]) -> Result<(), Error<CommE>> {
        let len = payload.len();
        self.i2c
            .write_read(DEVICE_ADDRESS, &[payload[0]], &mut payload[1..len])
            .map_err(Error::Comm)
    }
}

impl<I2C, CommE> ClockSource for Ds3231<I2C>
where
    I2C: i2c::Write<Error = CommE> + i2c::WriteRead<Error = CommE>,
{
    type Error = Error<CommE>;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.probe()
    }

    fn now(&mut self) -> Result<Datetime, Self::Error> {
        self.datetime()
    }

    fn temperature(&mut self) -> Result<i8, Self::Error> {
        Ds3231::temperature(self)
    }
}

/// Transform a number in packed BCD format to decimal
fn packed_bcd_to_decimal(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0xF)
}

fn hours_from_register(data: u8) -> Hours {
    if is_24h_format(data) {
        Hours::H24(packed_bcd_to_decimal(data & !BitFlags::H24_H12))
    } else if is_am(data) {
        Hours::AM(packed_bcd_to_decimal(
            data & !(BitFlags::H24_H12 | BitFlags::AM_PM),
        ))
    } else {
        Hours::PM(packed_bcd_to_decimal(
            data & !(BitFlags::H24_H12 | BitFlags::AM_PM),
        ))
    }
}

fn is_24h_format(hours_data: u8) -> bool {
    hours_data & BitFlags::H24_H12 == 0
}

fn is_am(hours_data: u8) -> bool {
    hours_data & BitFlags::AM_PM == 0
}

/// 12 AM is midnight and 12 PM is noon.
fn get_h24<CommE>(hour: Hours) -> Result<u8, Error<CommE>> {
    match hour {
        Hours::H24(h) if h > 23 => Err(Error::InvalidInputData),
        Hours::H24(h) => Ok(h),
        Hours::AM(h) | Hours::PM(h) if !(1..=12).contains(&h) => Err(Error::InvalidInputData),
        Hours::AM(12) => Ok(0),
        Hours::AM(h) => Ok(h),
        Hours::PM(12) => Ok(12),
        Hours::PM(h) => Ok(h + 12),
    }
}
