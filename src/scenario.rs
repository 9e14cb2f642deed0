// Licensed under the Apache-2.0 license

//! Scenario runner.
//!
//! A scenario gets its own bus session: the device is wrapped in a fresh
//! [`SimBus`], held in reset for the configured number of cycles, and driven
//! by a [`TransactionSequencer`] until the scenario either completes or hits
//! its first mismatch. Nothing survives the session except the report.

use crate::common::Logger;
use crate::i2c::bitfield::{Address7, Byte};
use crate::i2c::bus_driver::BusDriver;
use crate::i2c::checker::ExpectationChecker;
use crate::i2c::common::{BenchConfig, ConfigurationError};
use crate::i2c::error::{Error, Mismatch};
use crate::i2c::frame::{FrameBuilder, ReadFrame, WriteFrame};
use crate::i2c::sequencer::{BurstReport, TransactionSequencer};
use crate::i2c::timing::BusTiming;
use crate::i2c::traits::{DeviceOutputs, DeviceProbe, DeviceUnderTest};
use crate::sim::SimBus;
use core::cell::RefCell;
use core::convert::Infallible;
use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// START immediately followed by STOP
    Empty,
    /// Random write burst
    Write { len: usize },
    /// Random register read burst
    Read { len: usize },
    /// Write burst, then a read burst from the same base register
    WriteThenRead { write_len: usize, read_len: usize },
    /// Write burst starting from a fixed frame
    WriteFrame { frame: WriteFrame, len: usize },
    /// Read burst starting from a fixed frame
    ReadFrame { frame: ReadFrame, len: usize },
}

/// Scenarios the functional suite runs at every speed.
pub const STANDARD_SUITE: [Scenario; 7] = [
    Scenario::Empty,
    Scenario::Write { len: 1 },
    Scenario::Write { len: 4 },
    Scenario::Read { len: 1 },
    Scenario::Read { len: 4 },
    Scenario::WriteThenRead {
        write_len: 3,
        read_len: 3,
    },
    Scenario::Write { len: 16 },
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub written: Option<BurstReport>,
    pub read: Option<BurstReport>,
    /// Field comparisons performed
    pub checks: u32,
    /// Decoded outputs when the session ended
    pub outputs: DeviceOutputs,
    /// Simulated bus time
    pub elapsed_ns: u64,
}

impl ScenarioReport {
    /// Strobes seen over the whole scenario.
    #[must_use]
    pub fn strobes(&self) -> u32 {
        self.written.as_ref().map_or(0, |r| r.strobes) + self.read.as_ref().map_or(0, |r| r.strobes)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScenarioError {
    Config(ConfigurationError),
    Bench(Error<Infallible>),
}

impl ScenarioError {
    /// The mismatch that ended the scenario, if that is what happened.
    #[must_use]
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            ScenarioError::Bench(Error::Mismatch(m)) => Some(m),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for ScenarioError {
    fn from(e: ConfigurationError) -> Self {
        ScenarioError::Config(e)
    }
}

impl From<Error<Infallible>> for ScenarioError {
    fn from(e: Error<Infallible>) -> Self {
        ScenarioError::Bench(e)
    }
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Config(e) => write!(f, "configuration: {e}"),
            ScenarioError::Bench(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScenarioError {}

/// Run `scenario` against `device` in a fresh bus session.
///
/// # Errors
///
/// Returns the configuration error or the first mismatch.
pub fn run_scenario<D, L>(
    config: &BenchConfig,
    device: D,
    scenario: Scenario,
    logger: L,
) -> Result<ScenarioReport, ScenarioError>
where
    D: DeviceUnderTest,
    L: Logger,
{
    let timing = BusTiming::new(config.bus_frequency)?;
    let bus = RefCell::new(SimBus::new(device, config));
    bus.borrow_mut().reset(config.reset_cycles);

    let (scl, sda, delay, probe) = SimBus::split(&bus);
    let mut driver = BusDriver::new(scl, sda, delay, timing);
    driver.idle().map_err(Error::Pin)?;

    let mut frames = FrameBuilder::new(ChaCha8Rng::seed_from_u64(config.seed));
    if let Some(address) = config.device_address {
        frames = frames.with_address(Address7::truncate(address));
    }

    let mut sequencer = TransactionSequencer::new(driver, probe, ExpectationChecker::new(logger));
    let mut report = ScenarioReport::default();
    let result = run_steps(&mut sequencer, &mut frames, scenario, &mut report);
    report.checks = sequencer.checker().checks();

    let (_, _, mut checker) = sequencer.release();
    match &result {
        Ok(()) => checker.logger_mut().info(format_args!(
            "{scenario:?} @ {} Hz: {} checks, {} strobes",
            config.bus_frequency.raw(),
            report.checks,
            report.strobes()
        )),
        Err(e) => checker
            .logger_mut()
            .error(format_args!("{scenario:?} @ {} Hz failed: {e}", config.bus_frequency.raw())),
    }
    result?;

    let bus = bus.borrow();
    report.outputs = bus.device().outputs();
    report.elapsed_ns = bus.now_ns();
    Ok(report)
}

fn run_steps<SCL, SDA, D, P, L, R, E>(
    sequencer: &mut TransactionSequencer<SCL, SDA, D, P, L>,
    frames: &mut FrameBuilder<R>,
    scenario: Scenario,
    report: &mut ScenarioReport,
) -> Result<(), Error<E>>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    P: DeviceProbe,
    L: Logger,
    R: RngCore,
{
    match scenario {
        Scenario::Empty => sequencer.empty_transaction()?,
        Scenario::Write { len } => {
            let mut frame = frames.write();
            report.written = Some(sequencer.write(&mut frame, len, frames.rng_mut())?);
        }
        Scenario::Read { len } => {
            let mut frame = frames.read();
            report.read = Some(sequencer.read(&mut frame, len, frames.rng_mut())?);
        }
        Scenario::WriteThenRead {
            write_len,
            read_len,
        } => {
            let mut frame = frames.write();
            report.written = Some(sequencer.write(&mut frame, write_len, frames.rng_mut())?);
            let mut readback = ReadFrame::new(
                frame.address(),
                frame.register(),
                Byte::random(frames.rng_mut()),
            );
            report.read = Some(sequencer.read(&mut readback, read_len, frames.rng_mut())?);
        }
        Scenario::WriteFrame { mut frame, len } => {
            report.written = Some(sequencer.write(&mut frame, len, frames.rng_mut())?);
        }
        Scenario::ReadFrame { mut frame, len } => {
            report.read = Some(sequencer.read(&mut frame, len, frames.rng_mut())?);
        }
    }
    Ok(())
}
