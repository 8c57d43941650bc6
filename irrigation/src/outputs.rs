//! Digital outputs: the valve relays and the status indicator
use embedded_hal::digital::v2::OutputPin;

/// In-memory state of the valve. Never persisted: `Off` at every boot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    #[default]
    Off,
    On,
}

/// Discrete ON/OFF control of the irrigation valve.
pub trait ValveActuator {
    fn set_state(&mut self, energized: bool);
}

/// Generic digital output, driven in logical terms.
pub struct DigitalOutput<P: OutputPin> {
    /// Pin to drive.
    pin: P,
    /// Mapping between the electric level of the pin (+3.3V or +5V)
    /// and the logical level of the output.
    logical_level_high: bool,
}

impl<P: OutputPin> DigitalOutput<P> {
    /// Initialize the structure, leaving the output inactive.
    pub fn init(pin: P, logical_level_high: bool) -> Self {
        let mut out = Self {
            pin,
            logical_level_high,
        };
        out.set(false);
        out
    }

    /// Set the pin to the electrical level matching the logical state.
    /// Pin errors are ignored: the lines are plain GPIOs.
    pub fn set(&mut self, active: bool) {
        if active == self.logical_level_high {
            self.pin.set_high().ok();
        } else {
            self.pin.set_low().ok();
        }
    }

    /// Give back the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

/// One logical valve behind two relay channels wired in parallel.
/// Both channels are always driven identically.
pub struct RelayValve<A: OutputPin, B: OutputPin> {
    first: DigitalOutput<A>,
    second: DigitalOutput<B>,
}

impl<A: OutputPin, B: OutputPin> RelayValve<A, B> {
    /// Initialize the relays, de-energized.
    pub fn init(first: A, second: B, logical_level_high: bool) -> Self {
        Self {
            first: DigitalOutput::init(first, logical_level_high),
            second: DigitalOutput::init(second, logical_level_high),
        }
    }

    /// Give back the pins.
    pub fn release(self) -> (A, B) {
        (self.first.release(), self.second.release())
    }
}

impl<A: OutputPin, B: OutputPin> ValveActuator for RelayValve<A, B> {
    fn set_state(&mut self, energized: bool) {
        self.first.set(energized);
        self.second.set(energized);
    }
}
