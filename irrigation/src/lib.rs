//! Control loop of a battery-powered irrigation controller and
//! environmental data logger.
//!
//! Every cycle reads the RTC, samples soil moisture and temperature, appends
//! a record to an SD card, opens the valve when the soil is dry within the
//! irrigation window, then sleeps. The peripherals are reached through the
//! traits of each module, so the whole loop runs on the host in tests.
#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod outputs;
pub mod power;
pub mod records;
pub mod sensor;
pub mod storage;

pub use config::{Config, IrrigationWindow};
pub use controller::{Controller, Peripherals, Phase};
pub use error::Fault;
