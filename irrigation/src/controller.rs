//! The duty cycle: wake, validate time, sample, log, decide, actuate, sleep.
//!
//! Everything runs sequentially on one core. The only suspension points are
//! the valve hold (a blocking delay) and the low-power sleep; neither can be
//! cut short.
use crate::{
    clock::{ClockSource, Datetime},
    config::Config,
    error::Fault,
    outputs::{DigitalOutput, ValveActuator, ValveState},
    power::{self, PowerManager},
    records::{self, DataRecord, Event, EventRecord},
    sensor::{MoistureReading, MoistureSensor},
    storage::{self, StorageSink, Stream},
};
use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};

/// Phases of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Power-on initialization, run once
    Boot,
    /// Top of the cycle: remount storage, read and check the clock
    ValidateTime,
    /// Read moisture and temperature
    Sample,
    /// Append the data record
    Log,
    /// Apply the irrigation predicate
    EvaluateIrrigation,
    /// Valve open, timed hold, valve closed
    Actuate,
    /// Low-power sleep until the next cycle
    Sleep,
    /// Terminal: low-power sleep forever, until a manual reset
    FatalHalt,
}

/// Hardware driven by the controller.
pub struct Peripherals<CLK, STO, SEN, VAL, PWR, DLY, IND, CON>
where
    IND: OutputPin,
{
    /// RTC, also the temperature sensor
    pub clock: CLK,
    /// Persistent logs
    pub storage: STO,
    /// Soil moisture probe
    pub sensor: SEN,
    /// Irrigation valve
    pub valve: VAL,
    /// Sleep primitive
    pub power: PWR,
    /// Busy-wait delay, for the valve hold
    pub delay: DLY,
    /// Inactive during normal cycles, active on a fatal fault
    pub indicator: DigitalOutput<IND>,
    /// Diagnostics channel, best-effort
    pub console: CON,
}

/// Readings of the cycle in progress. Nothing survives the sleep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub timestamp: Option<Datetime>,
    pub moisture: Option<MoistureReading>,
    pub temperature: Option<i8>,
    /// Outcome of the irrigation predicate, once evaluated
    pub irrigate: Option<bool>,
}

pub struct Controller<CLK, STO, SEN, VAL, PWR, DLY, IND, CON>
where
    IND: OutputPin,
{
    config: Config,
    io: Peripherals<CLK, STO, SEN, VAL, PWR, DLY, IND, CON>,
    phase: Phase,
    valve: ValveState,
    cycle: Cycle,
    /// Diagnostic only
    completed_cycles: u32,
}

impl<CLK, STO, SEN, VAL, PWR, DLY, IND, CON> Controller<CLK, STO, SEN, VAL, PWR, DLY, IND, CON>
where
    CLK: ClockSource,
    STO: StorageSink,
    SEN: MoistureSensor,
    VAL: ValveActuator,
    PWR: PowerManager,
    DLY: DelayMs<u32>,
    IND: OutputPin,
    CON: ufmt::uWrite,
{
    /// Create the controller in the `Boot` phase. Nothing is touched until
    /// the first [`Controller::step`].
    pub fn new(config: Config, io: Peripherals<CLK, STO, SEN, VAL, PWR, DLY, IND, CON>) -> Self {
        Self {
            config,
            io,
            phase: Phase::Boot,
            valve: ValveState::Off,
            cycle: Cycle::default(),
            completed_cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    pub fn valve_state(&self) -> ValveState {
        self.valve
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    pub fn peripherals(&self) -> &Peripherals<CLK, STO, SEN, VAL, PWR, DLY, IND, CON> {
        &self.io
    }

    /// Run the state machine forever.
    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Step until the controller is back at the top of a cycle, or halted.
    /// From `Boot`, this only runs the boot sequence.
    pub fn run_cycle(&mut self) -> Phase {
        loop {
            match self.step() {
                phase @ (Phase::ValidateTime | Phase::FatalHalt) => return phase,
                _ => {}
            }
        }
    }

    /// Execute the current phase and move to the next one.
    pub fn step(&mut self) -> Phase {
        self.phase = match self.phase {
            Phase::Boot => self.boot(),
            Phase::ValidateTime => self.validate_time(),
            Phase::Sample => self.sample(),
            Phase::Log => self.log(),
            Phase::EvaluateIrrigation => self.evaluate_irrigation(),
            Phase::Actuate => self.actuate(),
            Phase::Sleep => self.sleep(),
            Phase::FatalHalt => self.halt(),
        };
        self.phase
    }

    fn boot(&mut self) -> Phase {
        // First side effect, whatever state the relays powered up in
        self.close_valve();

        ufmt::uwriteln!(&mut self.io.console, "Initializing storage").ok();
        self.mount_storage();

        if self.io.clock.init().is_err() {
            return self.fatal(Fault::ClockNotFound);
        }
        let now = match self.io.clock.now() {
            Ok(now) => now,
            Err(_) => return self.fatal(Fault::ClockUnreadable),
        };
        self.record(Some(now), Event::SetupComplete);

        Phase::ValidateTime
    }

    fn validate_time(&mut self) -> Phase {
        self.cycle = Cycle::default();
        // The card may have been reset or swapped during the sleep
        self.mount_storage();
        self.io.indicator.set(false);

        match self.read_time() {
            Ok(now) => {
                ufmt::uwriteln!(&mut self.io.console, "Time {}", now).ok();
                self.cycle.timestamp = Some(now);
                Phase::Sample
            }
            Err(fault) => self.fatal(fault),
        }
    }

    fn sample(&mut self) -> Phase {
        let moisture = MoistureReading::from_raw(self.io.sensor.read_raw(), &self.config.calibration);
        let temperature = match self.io.clock.temperature() {
            Ok(temperature) => temperature,
            Err(_) => return self.fatal(Fault::ClockUnreadable),
        };
        ufmt::uwriteln!(
            &mut self.io.console,
            "Moisture {}% ({}), temperature {}",
            moisture.percent,
            moisture.raw,
            temperature
        )
        .ok();

        self.cycle.moisture = Some(moisture);
        self.cycle.temperature = Some(temperature);
        Phase::Log
    }

    fn log(&mut self) -> Phase {
        if let (Some(timestamp), Some(moisture), Some(temperature)) = (
            self.cycle.timestamp,
            self.cycle.moisture,
            self.cycle.temperature,
        ) {
            let line = records::render(&DataRecord {
                timestamp,
                moisture,
                temperature,
            });
            self.append(Stream::Data, &line);
        }
        Phase::EvaluateIrrigation
    }

    fn evaluate_irrigation(&mut self) -> Phase {
        let irrigate = match (self.cycle.timestamp, self.cycle.moisture) {
            (Some(timestamp), Some(moisture)) => self
                .config
                .should_irrigate(moisture.percent, timestamp.time.hour),
            _ => false,
        };
        self.cycle.irrigate = Some(irrigate);

        if irrigate {
            Phase::Actuate
        } else {
            Phase::Sleep
        }
    }

    /// Open the valve, hold it for the configured duration, close it.
    /// The hold blocks: no sensor, fault or clock is looked at meanwhile.
    fn actuate(&mut self) -> Phase {
        self.record(self.cycle.timestamp, Event::ValveOn);
        self.open_valve();
        self.io.delay.delay_ms(self.config.valve_on_ms);
        self.close_valve();

        // The hold took time: the start-of-cycle timestamp is stale
        match self.read_time() {
            Ok(now) => {
                self.record(Some(now), Event::ValveOff);
                Phase::Sleep
            }
            Err(fault) => {
                // Same timestamp as the fault line that follows
                self.record(fault.timestamp(), Event::ValveOff);
                self.fatal(fault)
            }
        }
    }

    fn sleep(&mut self) -> Phase {
        if self.valve == ValveState::On {
            self.close_valve();
        }
        ufmt::uwriteln!(&mut self.io.console, "Sleeping {} ms", self.config.sleep_ms).ok();
        power::sleep_for(&mut self.io.power, self.config.sleep_ms);
        self.completed_cycles = self.completed_cycles.wrapping_add(1);
        Phase::ValidateTime
    }

    /// One bounded sleep. The halt is this phase repeating forever.
    fn halt(&mut self) -> Phase {
        self.io.power.sleep(PWR::MAX_SLEEP_MS);
        Phase::FatalHalt
    }

    /// Log the fault (best-effort), show it, and give up.
    fn fatal(&mut self, fault: Fault) -> Phase {
        self.record(fault.timestamp(), Event::Fault(fault));
        self.io.indicator.set(true);
        self.io.delay.delay_ms(self.config.fault_delay_ms);
        ufmt::uwriteln!(&mut self.io.console, "Halted").ok();
        Phase::FatalHalt
    }

    /// Read the clock and reject implausible years.
    fn read_time(&mut self) -> Result<Datetime, Fault> {
        let now = self
            .io
            .clock
            .now()
            .map_err(|_| Fault::ClockUnreadable)?;
        if now.is_plausible(self.config.min_year, self.config.max_year) {
            Ok(now)
        } else {
            Err(Fault::ImplausibleTime(now))
        }
    }

    fn open_valve(&mut self) {
        self.io.valve.set_state(true);
        self.valve = ValveState::On;
    }

    fn close_valve(&mut self) {
        self.io.valve.set_state(false);
        self.valve = ValveState::Off;
    }

    fn mount_storage(&mut self) {
        if self.io.storage.init_volume().is_err() {
            ufmt::uwriteln!(&mut self.io.console, "Storage init failed").ok();
        }
    }

    fn record(&mut self, timestamp: Option<Datetime>, event: Event) {
        let line = records::render(&EventRecord { timestamp, event });
        self.append(Stream::Operational, &line);
    }

    /// Best-effort write: a failure is only reported on the console.
    fn append(&mut self, stream: Stream, line: &str) {
        ufmt::uwriteln!(&mut self.io.console, "{}", line).ok();
        if storage::append_line(&mut self.io.storage, stream, line).is_err() {
            ufmt::uwriteln!(&mut self.io.console, "Cannot write {}", stream.file_name()).ok();
        }
    }
}
