//! Faults that stop the controller

use crate::clock::Datetime;

/// Conditions under which the controller can no longer honor the
/// irrigation window, and therefore halts until a manual reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The clock did not answer at boot
    ClockNotFound,
    /// The clock stopped answering while running
    ClockUnreadable,
    /// The clock answered with a year outside the plausible bounds
    ImplausibleTime(Datetime),
}

impl Fault {
    /// Timestamp to log the fault with, when the clock gave one.
    pub fn timestamp(&self) -> Option<Datetime> {
        match self {
            Fault::ImplausibleTime(datetime) => Some(*datetime),
            Fault::ClockNotFound | Fault::ClockUnreadable => None,
        }
    }
}

impl ufmt::uDisplay for Fault {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Fault::ClockNotFound => f.write_str("Clock not found"),
            Fault::ClockUnreadable => f.write_str("Clock unreadable"),
            Fault::ImplausibleTime(_) => f.write_str("Clock implausible"),
        }
    }
}
