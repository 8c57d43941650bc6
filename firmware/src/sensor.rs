//! Capacitive soil moisture probe on an analog input
use crate::MoistureInput;
use arduino_hal::port::{mode::Analog, Pin};
use irrigation::sensor::MoistureSensor;

pub struct AdcMoisture {
    adc: arduino_hal::Adc,
    channel: Pin<Analog, MoistureInput>,
}

impl AdcMoisture {
    pub fn init(adc: arduino_hal::Adc, channel: Pin<Analog, MoistureInput>) -> Self {
        Self { adc, channel }
    }
}

impl MoistureSensor for AdcMoisture {
    fn read_raw(&mut self) -> u16 {
        self.channel.analog_read(&mut self.adc)
    }
}
