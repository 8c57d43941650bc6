//! Power-down sleep, woken by the watchdog interrupt.
//!
//! The watchdog runs from its own 128 kHz oscillator, which keeps going in
//! power-down mode: it is the only wake-up source. Its periods are powers of
//! two of 16 ms, so a sleep is a sequence of decreasing periods, and the
//! remainder below 16 ms is busy-waited.
use embedded_hal::blocking::delay::DelayMs;
use irrigation::power::PowerManager;

/// Watchdog prescaler settings (WDP3..0) with their nominal period.
///
/// ╔═════╦════════╗
/// ║ WDP ║ Period ║
/// ╠═════╬════════╣
/// ║   0 ║  16 ms ║
/// ║   1 ║  32 ms ║
/// ║   2 ║  64 ms ║
/// ║   3 ║ 125 ms ║
/// ║   4 ║ 250 ms ║
/// ║   5 ║ 500 ms ║
/// ║   6 ║    1 s ║
/// ║   7 ║    2 s ║
/// ║   8 ║    4 s ║
/// ║   9 ║    8 s ║
/// ╚═════╩════════╝
const PERIODS_MS: [(u8, u16); 10] = [
    (9, 8000),
    (8, 4000),
    (7, 2000),
    (6, 1000),
    (5, 500),
    (4, 250),
    (3, 125),
    (2, 64),
    (1, 32),
    (0, 16),
];

// WDTCSR bits (see the doc of the microprocessor)
const WDIF: u8 = 1 << 7;
const WDIE: u8 = 1 << 6;
const WDP3: u8 = 1 << 5;
const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;

/// Owner of the watchdog and of the sleep controller
pub struct WatchdogSleep {
    wdt: arduino_hal::pac::WDT,
    cpu: arduino_hal::pac::CPU,
}

impl WatchdogSleep {
    /// Take the registers and make sure no reset is pending from the watchdog.
    pub fn new(wdt: arduino_hal::pac::WDT, cpu: arduino_hal::pac::CPU) -> Self {
        cpu.mcusr.modify(|_, w| w.wdrf().clear_bit());
        let power = Self { wdt, cpu };
        power.stop_watchdog();
        power
    }

    /// Arm the watchdog in interrupt-only mode (no reset) for one period.
    fn start_watchdog(&self, prescaler: u8) {
        let prescaler = (prescaler & 0x07) | if prescaler & 0x08 != 0 { WDP3 } else { 0 };
        avr_device::interrupt::free(|_| {
            // Timed sequence: the second write must follow within 4 cycles
            self.wdt
                .wdtcsr
                .write(|w| unsafe { w.bits(WDCE | WDE) });
            self.wdt
                .wdtcsr
                .write(|w| unsafe { w.bits(WDIF | WDIE | prescaler) });
        });
    }

    fn stop_watchdog(&self) {
        avr_device::interrupt::free(|_| {
            avr_device::asm::wdr();
            self.wdt
                .wdtcsr
                .write(|w| unsafe { w.bits(WDCE | WDE) });
            self.wdt.wdtcsr.write(|w| unsafe { w.bits(0) });
        });
    }

    /// One watchdog period in power-down, with the ADC off.
    fn power_down(&mut self, prescaler: u8) {
        // The ADC is owned by the moisture sensor, only its enable bit is
        // touched here, and restored on wake-up.
        let adc = unsafe { &*arduino_hal::pac::ADC::ptr() };
        let adc_enabled = adc.adcsra.read().aden().bit_is_set();
        adc.adcsra.modify(|_, w| w.aden().clear_bit());

        self.start_watchdog(prescaler);
        self.cpu.smcr.write(|w| w.sm().pdown().se().set_bit());
        avr_device::asm::sleep();
        self.cpu.smcr.write(|w| w.se().clear_bit());
        self.stop_watchdog();

        if adc_enabled {
            adc.adcsra.modify(|_, w| w.aden().set_bit());
        }
    }
}

impl PowerManager for WatchdogSleep {
    const MAX_SLEEP_MS: u32 = 8000;

    fn sleep(&mut self, duration_ms: u32) {
        let mut remaining = duration_ms.min(Self::MAX_SLEEP_MS);
        for (prescaler, period) in PERIODS_MS {
            while remaining >= period as u32 {
                self.power_down(prescaler);
                remaining -= period as u32;
            }
        }
        if remaining > 0 {
            arduino_hal::Delay::new().delay_ms(remaining as u16);
        }
    }
}

/// Watchdog interrupt: nothing to do, waking up is the point.
#[avr_device::interrupt(atmega328p)]
fn WDT() {}
