//! Build-time configuration of the controller
use crate::sensor::MoistureCalibration;

/// Hours during which the valve may open. The window spans midnight:
/// `start_hour` is in the evening and `stop_hour` in the morning, both
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrrigationWindow {
    pub start_hour: u8,
    pub stop_hour: u8,
}

impl IrrigationWindow {
    /// Build an overnight window. A window with `start_hour <= stop_hour`
    /// would contain every hour of the day and is rejected, at compile time
    /// when used in a constant.
    pub const fn new(start_hour: u8, stop_hour: u8) -> Self {
        assert!(start_hour > stop_hour, "irrigation window must span midnight");
        Self {
            start_hour,
            stop_hour,
        }
    }

    /// True when `hour` falls within the window.
    pub fn contains(&self, hour: u8) -> bool {
        hour >= self.start_hour || hour <= self.stop_hour
    }
}

/// Everything the controller needs to know, fixed for the lifetime of the
/// system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Irrigate only when the moisture percentage is strictly below this
    pub moisture_threshold: i16,
    /// Low-power time between two cycles
    pub sleep_ms: u32,
    /// Permitted irrigation hours
    pub window: IrrigationWindow,
    /// How long the valve stays open once triggered
    pub valve_on_ms: u32,
    /// Smallest year the clock may plausibly report
    pub min_year: u16,
    /// Largest year the clock may plausibly report
    pub max_year: u16,
    /// Raw-to-percentage mapping of the probe
    pub calibration: MoistureCalibration,
    /// Pause between a fatal fault being logged and the halt
    pub fault_delay_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            moisture_threshold: 40,
            sleep_ms: 10 * 60 * 1000,
            window: IrrigationWindow::new(19, 7),
            valve_on_ms: 30 * 1000,
            min_year: 2010,
            max_year: 2100,
            calibration: MoistureCalibration::default(),
            fault_delay_ms: 1000,
        }
    }
}

impl Config {
    /// The irrigation predicate: soil too dry and within the window.
    pub fn should_irrigate(&self, moisture_percent: i16, hour: u8) -> bool {
        moisture_percent < self.moisture_threshold && self.window.contains(hour)
    }
}
