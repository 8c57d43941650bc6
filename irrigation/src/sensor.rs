//! Soil moisture acquisition

/// Raw analog sampling of the moisture probe.
pub trait MoistureSensor {
    /// One sample, in the platform's analog range.
    fn read_raw(&mut self) -> u16;
}

/// Raw readings of the probe in bone-dry soil and in saturated soil.
/// A capacitive probe reads higher when drier, hence `dry_raw > wet_raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoistureCalibration {
    pub dry_raw: u16,
    pub wet_raw: u16,
}

impl Default for MoistureCalibration {
    fn default() -> Self {
        Self {
            dry_raw: 1024,
            wet_raw: 467,
        }
    }
}

/// Moisture sample of the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoistureReading {
    /// Sample as read
    pub raw: u16,
    /// 0 at `dry_raw`, 100 at `wet_raw`. Readings beyond the calibration
    /// points extrapolate past 0 or 100.
    pub percent: i16,
}

impl MoistureReading {
    /// Map a raw sample onto the calibration. Calibration points closer than
    /// about 200 counts apart can extrapolate past the `i16` range for raw
    /// values far away from them: the percentage then saturates.
    pub fn from_raw(raw: u16, calibration: &MoistureCalibration) -> Self {
        let percent = map(
            raw as i32,
            calibration.dry_raw as i32,
            calibration.wet_raw as i32,
            0,
            100,
        );
        Self {
            raw,
            percent: percent.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        }
    }
}

/// Integer linear re-mapping, truncating toward zero and never clamping.
fn map(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}
