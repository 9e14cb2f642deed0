// Licensed under the Apache-2.0 license

//! I2C master emulation and slave verification.
//!
//! The layers, bottom up:
//!
//! * [`bitfield`] and [`frame`]: fixed-width fields and the frames built from them
//! * [`timing`]: quarter/half/full bit periods for a bus frequency
//! * [`bus_driver`]: START, STOP, bit cells and acknowledge slots on two lines
//! * [`capture`]: reassembly of slave-driven bytes
//! * [`checker`] and [`sequencer`]: verified write and read bursts
//! * [`i2c_controller`]: the same bus as a plain embedded-hal `I2c` master

pub mod bitfield;
pub mod bus_driver;
pub mod capture;
pub mod checker;
pub mod common;
pub mod error;
pub mod frame;
pub mod i2c_controller;
pub mod sequencer;
pub mod timing;
pub mod traits;

pub use bitfield::{Address7, BitField, BitFieldError, Byte};
pub use bus_driver::{BitOrder, BusDriver};
pub use capture::SlaveByteCapture;
pub use checker::{ExpectationChecker, ExpectedSnapshot};
pub use common::{Ack, BenchConfig, BenchConfigBuilder, ConfigurationError, Direction, I2cSpeed};
pub use error::{Error, Field, Mismatch};
pub use frame::{FrameBuilder, ReadFrame, WriteFrame};
pub use i2c_controller::I2cController;
pub use sequencer::{BurstReport, Phase, TransactionSequencer};
pub use timing::BusTiming;
pub use traits::{DeviceOutputs, DeviceProbe, DeviceUnderTest, Strobe, StrobeLog};
