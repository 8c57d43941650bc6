//! Lines written to the operational and data logs
use crate::{clock::Datetime, error::Fault, sensor::MoistureReading};

/// Room for the longest record, `2100-12-31T23:59:59, -11582(65535), -128`.
pub const LINE_CAPACITY: usize = 64;

/// One log line, without its terminator.
pub type Line = heapless::String<LINE_CAPACITY>;

/// Render anything displayable into a line.
pub fn render<T: ufmt::uDisplay>(record: &T) -> Line {
    let mut line = Line::new();
    ufmt::uwrite!(&mut line, "{}", record).ok();
    line
}

/// Operational milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SetupComplete,
    ValveOn,
    ValveOff,
    Fault(Fault),
}

impl ufmt::uDisplay for Event {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Event::SetupComplete => f.write_str("Setup complete"),
            Event::ValveOn => f.write_str("Valve on"),
            Event::ValveOff => f.write_str("Valve off"),
            Event::Fault(fault) => ufmt::uDisplay::fmt(fault, f),
        }
    }
}

/// Line of `log.csv`: `<timestamp> <event>`, or the bare event when the
/// clock could not give a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp: Option<Datetime>,
    pub event: Event,
}

impl ufmt::uDisplay for EventRecord {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        if let Some(timestamp) = self.timestamp {
            ufmt::uwrite!(f, "{} ", timestamp)?;
        }
        ufmt::uDisplay::fmt(&self.event, f)
    }
}

/// Line of `datalog.csv`: `<timestamp>, <moisture%>(<raw>), <temperature>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecord {
    pub timestamp: Datetime,
    pub moisture: MoistureReading,
    pub temperature: i8,
}

impl ufmt::uDisplay for DataRecord {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        ufmt::uwrite!(
            f,
            "{}, {}({}), {}",
            self.timestamp,
            self.moisture.percent,
            self.moisture.raw,
            self.temperature
        )
    }
}
