//! Recording stand-ins for the peripherals, all sharing one journal so the
//! order of side effects across devices can be checked.
#![allow(dead_code)]

use core::convert::Infallible;
use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};
use irrigation::{
    clock::{ClockSource, Datetime},
    outputs::{DigitalOutput, RelayValve},
    power::PowerManager,
    sensor::MoistureSensor,
    storage::{StorageSink, Stream, LINE_ENDING},
    Config, Controller, Peripherals,
};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    string::String,
    vec::Vec,
};

/// Side effects, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Electrical level driven on a pin: 'A'/'B' are the relays, 'L' the indicator
    Pin(char, bool),
    ClockInit,
    ClockNow,
    Temperature,
    ReadRaw,
    Mount,
    Open(Stream),
    Write(Stream, String),
    Close(Stream),
    Delay(u32),
    Sleep(u32),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub struct Line {
    id: char,
    journal: Journal,
}

impl OutputPin for Line {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.journal.borrow_mut().push(Call::Pin(self.id, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.journal.borrow_mut().push(Call::Pin(self.id, true));
        Ok(())
    }
}

/// Clock answering with queued timestamps, then repeating the last one.
pub struct FakeClock {
    journal: Journal,
    pub present: Rc<Cell<bool>>,
    pub times: Rc<RefCell<VecDeque<Datetime>>>,
    last: Datetime,
    pub temperature: i8,
}

impl ClockSource for FakeClock {
    type Error = ();

    fn init(&mut self) -> Result<(), Self::Error> {
        self.journal.borrow_mut().push(Call::ClockInit);
        if self.present.get() {
            Ok(())
        } else {
            Err(())
        }
    }

    fn now(&mut self) -> Result<Datetime, Self::Error> {
        self.journal.borrow_mut().push(Call::ClockNow);
        if !self.present.get() {
            return Err(());
        }
        if let Some(next) = self.times.borrow_mut().pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }

    fn temperature(&mut self) -> Result<i8, Self::Error> {
        self.journal.borrow_mut().push(Call::Temperature);
        if self.present.get() {
            Ok(self.temperature)
        } else {
            Err(())
        }
    }
}

/// Contents of the two files on the fake card
#[derive(Debug, Default)]
pub struct Files {
    pub operational: String,
    pub data: String,
}

impl Files {
    fn stream(&mut self, stream: Stream) -> &mut String {
        match stream {
            Stream::Operational => &mut self.operational,
            Stream::Data => &mut self.data,
        }
    }
}

/// Card that can be pulled out, or refuse one stream, at any time.
pub struct FakeCard {
    journal: Journal,
    pub inserted: Rc<Cell<bool>>,
    pub refused: Rc<Cell<Option<Stream>>>,
    pub files: Rc<RefCell<Files>>,
    mounted: bool,
    open: bool,
}

impl StorageSink for FakeCard {
    type Handle = Stream;
    type Error = &'static str;

    fn init_volume(&mut self) -> Result<(), Self::Error> {
        self.journal.borrow_mut().push(Call::Mount);
        self.mounted = self.inserted.get();
        if self.mounted {
            Ok(())
        } else {
            Err("no card")
        }
    }

    fn open_append(&mut self, stream: Stream) -> Result<Self::Handle, Self::Error> {
        assert!(!self.open, "a second handle was opened");
        self.journal.borrow_mut().push(Call::Open(stream));
        if !self.mounted || !self.inserted.get() {
            return Err("not mounted");
        }
        if self.refused.get() == Some(stream) {
            return Err("refused");
        }
        self.open = true;
        Ok(stream)
    }

    fn write_line(&mut self, handle: &mut Self::Handle, line: &str) -> Result<(), Self::Error> {
        assert!(self.open);
        self.journal
            .borrow_mut()
            .push(Call::Write(*handle, String::from(line)));
        let mut files = self.files.borrow_mut();
        let file = files.stream(*handle);
        file.push_str(line);
        file.push_str(LINE_ENDING);
        Ok(())
    }

    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        self.journal.borrow_mut().push(Call::Close(handle));
        self.open = false;
        Ok(())
    }
}

pub struct FakeProbe {
    journal: Journal,
    pub raw: Rc<Cell<u16>>,
}

impl MoistureSensor for FakeProbe {
    fn read_raw(&mut self) -> u16 {
        self.journal.borrow_mut().push(Call::ReadRaw);
        self.raw.get()
    }
}

pub struct FakePower {
    journal: Journal,
}

impl PowerManager for FakePower {
    const MAX_SLEEP_MS: u32 = 8000;

    fn sleep(&mut self, duration_ms: u32) {
        assert!(duration_ms <= Self::MAX_SLEEP_MS);
        self.journal.borrow_mut().push(Call::Sleep(duration_ms));
    }
}

/// Busy-wait that can take the clock away while it waits.
pub struct FakeDelay {
    journal: Journal,
    clock_present: Rc<Cell<bool>>,
    clock_lost_on_delay: Rc<Cell<bool>>,
}

impl DelayMs<u32> for FakeDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.journal.borrow_mut().push(Call::Delay(ms));
        if self.clock_lost_on_delay.get() {
            self.clock_present.set(false);
        }
    }
}

#[derive(Default, Clone)]
pub struct Console(pub Rc<RefCell<String>>);

impl ufmt::uWrite for Console {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.0.borrow_mut().push_str(s);
        Ok(())
    }
}

pub type TestController = Controller<
    FakeClock,
    FakeCard,
    FakeProbe,
    RelayValve<Line, Line>,
    FakePower,
    FakeDelay,
    Line,
    Console,
>;

/// Controller plus the handles to steer and observe its peripherals.
pub struct Rig {
    pub controller: TestController,
    pub journal: Journal,
    pub clock_present: Rc<Cell<bool>>,
    pub clock_lost_on_delay: Rc<Cell<bool>>,
    pub times: Rc<RefCell<VecDeque<Datetime>>>,
    pub card_inserted: Rc<Cell<bool>>,
    pub refused: Rc<Cell<Option<Stream>>>,
    pub files: Rc<RefCell<Files>>,
    pub raw: Rc<Cell<u16>>,
    pub console: Console,
}

/// Raw reading mapping to 10 % with the default calibration
pub const RAW_10_PERCENT: u16 = 968;
/// Raw reading mapping to 75 % with the default calibration
pub const RAW_75_PERCENT: u16 = 606;

/// Test configuration: threshold 20 %, window 19h-7h.
pub fn config() -> Config {
    Config {
        moisture_threshold: 20,
        sleep_ms: 20_000,
        valve_on_ms: 5_000,
        fault_delay_ms: 100,
        ..Config::default()
    }
}

impl Rig {
    pub fn new(config: Config, times: &[Datetime]) -> Self {
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let clock_present = Rc::new(Cell::new(true));
        let clock_lost_on_delay = Rc::new(Cell::new(false));
        let times = Rc::new(RefCell::new(times.iter().copied().collect::<VecDeque<_>>()));
        let card_inserted = Rc::new(Cell::new(true));
        let refused = Rc::new(Cell::new(None));
        let files = Rc::new(RefCell::new(Files::default()));
        let raw = Rc::new(Cell::new(RAW_75_PERCENT));
        let console = Console::default();

        let line = |id| Line {
            id,
            journal: journal.clone(),
        };
        let io = Peripherals {
            clock: FakeClock {
                journal: journal.clone(),
                present: clock_present.clone(),
                times: times.clone(),
                last: Datetime::new(2021, 3, 9, 12, 0, 0),
                temperature: 21,
            },
            storage: FakeCard {
                journal: journal.clone(),
                inserted: card_inserted.clone(),
                refused: refused.clone(),
                files: files.clone(),
                mounted: false,
                open: false,
            },
            sensor: FakeProbe {
                journal: journal.clone(),
                raw: raw.clone(),
            },
            valve: RelayValve::init(line('A'), line('B'), false),
            power: FakePower {
                journal: journal.clone(),
            },
            delay: FakeDelay {
                journal: journal.clone(),
                clock_present: clock_present.clone(),
                clock_lost_on_delay: clock_lost_on_delay.clone(),
            },
            indicator: DigitalOutput::init(line('L'), true),
            console: console.clone(),
        };
        let controller = Controller::new(config, io);
        // Only what the controller does is of interest
        journal.borrow_mut().clear();

        Rig {
            controller,
            journal,
            clock_present,
            clock_lost_on_delay,
            times,
            card_inserted,
            refused,
            files,
            raw,
            console,
        }
    }

    /// Boot, which must succeed.
    pub fn booted(config: Config, times: &[Datetime]) -> Self {
        let mut rig = Self::new(config, times);
        assert_eq!(rig.controller.run_cycle(), irrigation::Phase::ValidateTime);
        rig
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.borrow().clone()
    }

    pub fn clear(&self) {
        self.journal.borrow_mut().clear();
    }

    pub fn operational(&self) -> String {
        self.files.borrow().operational.clone()
    }

    pub fn data(&self) -> String {
        self.files.borrow().data.clone()
    }

    pub fn console(&self) -> String {
        self.console.0.borrow().clone()
    }
}
