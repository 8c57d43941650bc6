//! Irrigation controller and data logger for ATMEGA328P microprocessor
// Compiler commands appropriate for bare-metal development
#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

/*
References:
ATMEGA238p: https://www.e-lab.de/downloads/DOCs/mega328P.pdf
Arduino: https://content.arduino.cc/assets/A000066-full-pinout.pdf
DS3231: https://www.analog.com/media/en/technical-documentation/data-sheets/DS3231.pdf

          +---O---+
      PC6 |1    28| PC5  I2C.SCL - d19 (DS3231)
  RXD PD0 |2    27| PC4  I2C.SDA - d18 (DS3231)
  TXD PD1 |3    26| PC3
      PD2 |4    25| PC2
      PD3 |5    24| PC1
      PD4 |6    23| PC0  Moisture probe - a0
      VCC |7    22| GND
      GND |8    21| AREF
      PB6 |9    20| AVCC
      PB7 |10   19| PB5  SPI.CLK - d13 (SD card)
      PD5 |11   18| PB4  SPI.MISO - d12 (SD card)
      PD6 |12   17| PB3  SPI.MOSI - d11 (SD card)
      PD7 |13   16| PB2  SPI.CS - d10 (SD card)
      PB0 |14   15| PB1
          +-------+
*/

// Pinout of the peripherals, either as ATMETA32P port or arduino labels
type ValveRelayOutput1 = arduino_hal::hal::port::PD4; // d4
type ValveRelayOutput2 = arduino_hal::hal::port::PD5; // d5
type IndicatorOutput = arduino_hal::hal::port::PD6; // d6
type MoistureInput = arduino_hal::hal::port::PC0; // a0

/// Mapping between the electric levels (+5V) and the logical level of the valve relays
const VALVE_LOGICAL_LEVEL_HIGH: bool = false;
/// Mapping between the electric levels (+5V) and the logical level of the fault indicator
const INDICATOR_LOGICAL_LEVEL_HIGH: bool = true;
/// Baud rate of the diagnostics console
const SERIAL_BAUD_RATE: u32 = 57600;
/// Frequency of the I2C bus to the RTC
const I2C_FREQUENCY: u32 = 50000;

/// Behavior of the controller
const CONFIG: Config = Config {
    moisture_threshold: 40,
    sleep_ms: 10 * 60 * 1000,
    window: IrrigationWindow::new(19, 7),
    valve_on_ms: 30 * 1000,
    min_year: 2010,
    max_year: 2100,
    calibration: MoistureCalibration {
        dry_raw: 1024,
        wet_raw: 467,
    },
    fault_delay_ms: 1000,
};

use crate::{power::WatchdogSleep, sensor::AdcMoisture};
use arduino_hal::{
    port::{
        mode::{Io, Output},
        Pin, PinOps,
    },
    spi,
};
use core::{
    panic::PanicInfo,
    sync::atomic::{self, Ordering},
};
use irrigation::{
    clock::Ds3231,
    outputs::{DigitalOutput, RelayValve},
    sensor::MoistureCalibration,
    storage::sd::SdStorage,
    Config, Controller, IrrigationWindow, Peripherals,
};

mod power;
mod sensor;

/// Configure a relay line as an output, driven to its inactive level
/// without ever passing by the active one.
fn relay_output<MODE: Io, PIN: PinOps>(pin: Pin<MODE, PIN>) -> Pin<Output, PIN> {
    if VALVE_LOGICAL_LEVEL_HIGH {
        pin.into_output()
    } else {
        pin.into_output_high()
    }
}

/// Entry point: initialization of the devices and endless duty cycle
#[arduino_hal::entry]
fn main() -> ! {
    // Acquire hardware objects
    let dp = arduino_hal::Peripherals::take().unwrap();
    let pins = arduino_hal::pins!(dp);

    // Relays first: the valve must be closed whatever happens next
    let valve = RelayValve::init(
        relay_output(pins.d4),
        relay_output(pins.d5),
        VALVE_LOGICAL_LEVEL_HIGH,
    );
    let indicator = DigitalOutput::init(pins.d6.into_output(), INDICATOR_LOGICAL_LEVEL_HIGH);

    let console = arduino_hal::default_serial!(dp, pins, SERIAL_BAUD_RATE);

    let i2c = arduino_hal::I2c::new(
        dp.TWI,
        pins.a4.into_pull_up_input(),
        pins.a5.into_pull_up_input(),
        I2C_FREQUENCY,
    );

    // The card is initialized at a slow clock, and stays there
    let (spi, chip_select) = arduino_hal::Spi::new(
        dp.SPI,
        pins.d13.into_output(),
        pins.d11.into_output(),
        pins.d12.into_pull_up_input(),
        pins.d10.into_output(),
        spi::Settings {
            data_order: spi::DataOrder::MostSignificantFirst,
            clock: spi::SerialClockRate::OscfOver128,
            mode: embedded_hal::spi::MODE_0,
        },
    );

    let mut adc = arduino_hal::Adc::new(dp.ADC, Default::default());
    let moisture_channel = pins.a0.into_analog_input(&mut adc);

    let power = WatchdogSleep::new(dp.WDT, dp.CPU);
    // The watchdog interrupt is the wake-up source
    unsafe { avr_device::interrupt::enable() };

    Controller::new(
        CONFIG,
        Peripherals {
            clock: Ds3231::new(i2c),
            storage: SdStorage::new(spi, chip_select),
            sensor: AdcMoisture::init(adc, moisture_channel),
            valve,
            power,
            delay: arduino_hal::Delay::new(),
            indicator,
            console,
        },
    )
    .run()
}

/// Panic handler: close the valve, then do nothing
#[inline(never)]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    avr_device::interrupt::disable();
    let dp = unsafe { arduino_hal::Peripherals::steal() };
    let pins = arduino_hal::pins!(dp);
    relay_output::<_, ValveRelayOutput1>(pins.d4);
    relay_output::<_, ValveRelayOutput2>(pins.d5);
    let mut indicator: Pin<Output, IndicatorOutput> = pins.d6.into_output();
    if INDICATOR_LOGICAL_LEVEL_HIGH {
        indicator.set_high();
    } else {
        indicator.set_low();
    }
    loop {
        atomic::compiler_fence(Ordering::SeqCst);
    }
}
