//! Clocks, date and time management
pub use datetime::{Date, Datetime, Time};
pub use ds3231::Ds3231;

pub mod datetime;
pub mod ds3231;

/// The only authoritative source of wall time, plus the temperature sensor
/// that sits on the same chip.
pub trait ClockSource {
    type Error;

    /// Check that the clock answers. An error means the clock is absent.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Current date and time.
    fn now(&mut self) -> Result<Datetime, Self::Error>;

    /// Ambient temperature, whole degrees.
    fn temperature(&mut self) -> Result<i8, Self::Error>;
}
