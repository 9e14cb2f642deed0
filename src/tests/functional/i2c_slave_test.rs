// Licensed under the Apache-2.0 license

use crate::common::NoOpLogger;
use crate::i2c::bitfield::{Address7, Byte};
use crate::i2c::bus_driver::BusDriver;
use crate::i2c::common::{BenchConfig, BenchConfigBuilder, I2cSpeed};
use crate::i2c::frame::{ReadFrame, WriteFrame};
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::timing::BusTiming;
use crate::i2c::traits::DeviceUnderTest;
use crate::scenario::{run_scenario, Scenario, ScenarioError, STANDARD_SUITE};
use crate::sim::{RegisterSlave, SimBus};
use core::cell::RefCell;
use core::fmt;
use embedded_hal::i2c::I2c;
use embedded_io::{Write, WriteFmtError};
use hex_literal::hex;

/// Why the functional suite stopped.
#[derive(Debug)]
pub enum SuiteError<E> {
    /// The report sink failed
    Io(WriteFmtError<E>),
    /// A scenario hit a mismatch or a bad configuration
    Scenario(ScenarioError),
    /// A scenario passed its checks but produced the wrong result
    Unexpected(&'static str),
}

impl<E> From<WriteFmtError<E>> for SuiteError<E> {
    fn from(e: WriteFmtError<E>) -> Self {
        SuiteError::Io(e)
    }
}

impl<E> From<ScenarioError> for SuiteError<E> {
    fn from(e: ScenarioError) -> Self {
        SuiteError::Scenario(e)
    }
}

impl<E: fmt::Debug> fmt::Display for SuiteError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteError::Io(e) => write!(f, "output error: {e:?}"),
            SuiteError::Scenario(e) => write!(f, "{e}"),
            SuiteError::Unexpected(what) => write!(f, "unexpected result: {what}"),
        }
    }
}

fn ensure<E>(condition: bool, what: &'static str) -> Result<(), SuiteError<E>> {
    if condition {
        Ok(())
    } else {
        Err(SuiteError::Unexpected(what))
    }
}

pub fn run_i2c_slave_tests<W: Write>(out: &mut W) -> Result<(), SuiteError<W::Error>> {
    writeln!(out, "\r\n=== I2C Slave Bench Tests ===\r")?;

    test_write_vector(out)?;
    test_read_vector(out)?;
    test_standard_suite(out)?;
    test_fixed_address(out)?;
    test_controller_write_read(out)?;

    writeln!(out, "\r\n=== All I2C Slave Bench Tests Passed ===\r")?;
    Ok(())
}

fn test_write_vector<W: Write>(out: &mut W) -> Result<(), SuiteError<W::Error>> {
    write!(out, "Testing write vector 0x55/0xa9/0x3c... ")?;

    let frame = WriteFrame::new(
        Address7::truncate(0x55),
        Byte::truncate(0xA9),
        Byte::truncate(0x3C),
    );
    let report = run_scenario(
        &BenchConfig::default(),
        RegisterSlave::new(),
        Scenario::WriteFrame { frame, len: 1 },
        NoOpLogger,
    )?;
    let written = report.written.ok_or(SuiteError::Unexpected("no write report"))?;
    ensure(written.bytes.as_slice() == hex!("3C"), "written bytes")?;
    ensure(written.strobes == 1, "one strobe per written byte")?;

    writeln!(out, "PASSED\r")?;
    Ok(())
}

fn test_read_vector<W: Write>(out: &mut W) -> Result<(), SuiteError<W::Error>> {
    write!(out, "Testing read vector 0x7e... ")?;

    let frame = ReadFrame::new(
        Address7::truncate(0x55),
        Byte::truncate(0x00),
        Byte::truncate(0x7E),
    );
    let report = run_scenario(
        &BenchConfig::default(),
        RegisterSlave::new(),
        Scenario::ReadFrame { frame, len: 1 },
        NoOpLogger,
    )?;
    let read = report.read.ok_or(SuiteError::Unexpected("no read report"))?;
    ensure(read.bytes.as_slice() == hex!("7E"), "captured bytes")?;
    ensure(read.strobes == 0, "NACKed byte must not strobe")?;

    writeln!(out, "PASSED\r")?;
    Ok(())
}

fn test_standard_suite<W: Write>(out: &mut W) -> Result<(), SuiteError<W::Error>> {
    for speed in I2cSpeed::ALL {
        write!(out, "Testing scenario suite at {} Hz... ", speed.frequency().raw())?;
        let config = BenchConfigBuilder::new()
            .speed(speed)
            .build()
            .map_err(ScenarioError::Config)?;
        for scenario in STANDARD_SUITE {
            run_scenario(&config, RegisterSlave::new(), scenario, NoOpLogger)?;
        }
        writeln!(out, "PASSED\r")?;
    }
    Ok(())
}

fn test_fixed_address<W: Write>(out: &mut W) -> Result<(), SuiteError<W::Error>> {
    write!(out, "Testing fixed device address... ")?;

    let config = BenchConfigBuilder::new()
        .device_address(0x3A)
        .speed(I2cSpeed::Fast)
        .build()
        .map_err(ScenarioError::Config)?;
    let report = run_scenario(
        &config,
        RegisterSlave::with_address(0x3A),
        Scenario::WriteThenRead {
            write_len: 2,
            read_len: 2,
        },
        NoOpLogger,
    )?;
    ensure(report.outputs.address == 0x3A, "decoded address")?;

    writeln!(out, "PASSED\r")?;
    Ok(())
}

fn test_controller_write_read<W: Write>(out: &mut W) -> Result<(), SuiteError<W::Error>> {
    write!(out, "Testing embedded-hal controller write_read... ")?;

    let config = BenchConfig::default();
    let bus = RefCell::new(SimBus::new(RegisterSlave::new(), &config));
    bus.borrow_mut().reset(config.reset_cycles);
    bus.borrow_mut().device_mut().load_source_byte(0xC3);

    let (scl, sda, delay, _probe) = SimBus::split(&bus);
    let timing = BusTiming::new(config.bus_frequency).map_err(ScenarioError::Config)?;
    let mut i2c = I2cController::new(BusDriver::new(scl, sda, delay, timing), NoOpLogger);

    let mut buffer = [0u8; 3];
    i2c.write_read(0x50, &hex!("20"), &mut buffer)
        .map_err(|e| SuiteError::Scenario(ScenarioError::Bench(e)))?;
    ensure(buffer == hex!("C3C3C3"), "bytes read through the controller")?;
    ensure(bus.borrow().device().outputs().register == 0x22, "register after two ACKed reads")?;

    writeln!(out, "PASSED\r")?;
    Ok(())
}
