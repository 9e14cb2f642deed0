// Licensed under the Apache-2.0 license

//! Transaction sequencing and per-byte verification.
//!
//! The sequencer walks the bus through
//!
//! ```text
//! IDLE -> START -> ADDR_RW -> ACK -> [REG_ADDR -> ACK] -> DATA(0..n) -> ACK/NACK -> STOP -> IDLE
//! ```
//!
//! and asks the [`ExpectationChecker`] to compare the device's decoded
//! outputs after every framed byte. A read access is always a register
//! pointer write, a STOP, and a fresh START in read direction; the read
//! burst therefore starts at the register the write phase set.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::bitfield::Byte;
use crate::i2c::bus_driver::BusDriver;
use crate::i2c::capture::SlaveByteCapture;
use crate::i2c::checker::{ExpectationChecker, ExpectedSnapshot};
use crate::i2c::common::{Ack, Direction};
use crate::i2c::error::Error;
use crate::i2c::frame::{ReadFrame, WriteFrame};
use crate::i2c::traits::DeviceProbe;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use rand::RngCore;

/// Bytes of a burst kept in its report.
pub const REPORT_DEPTH: usize = 64;

/// Bus phase of the running transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Start,
    AddrRw,
    Ack,
    RegAddr,
    Data,
    Stop,
}

impl Phase {
    /// Whether the bus may move from `prev` to `self`.
    #[must_use]
    pub const fn may_follow(self, prev: Phase) -> bool {
        matches!(
            (prev, self),
            (Phase::Idle, Phase::Start)
                | (Phase::Start, Phase::AddrRw)
                | (Phase::Start, Phase::Stop)
                | (Phase::AddrRw, Phase::Ack)
                | (Phase::RegAddr, Phase::Ack)
                | (Phase::Data, Phase::Ack)
                | (Phase::Ack, Phase::RegAddr)
                | (Phase::Ack, Phase::Data)
                | (Phase::Ack, Phase::Stop)
                | (Phase::Stop, Phase::Idle)
        )
    }
}

/// Outcome of one verified burst.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurstReport {
    pub direction: Direction,
    pub address: u8,
    pub base_register: u8,
    /// Register the device decoded before the first data byte
    pub start_register: u8,
    /// Bytes written or captured, first `REPORT_DEPTH` only
    pub bytes: Vec<u8, REPORT_DEPTH>,
    /// Burst length
    pub len: usize,
    /// Valid strobes observed during the burst
    pub strobes: u32,
}

impl BurstReport {
    fn new(direction: Direction, address: u8, base_register: u8) -> Self {
        Self {
            direction,
            address,
            base_register,
            start_register: 0,
            bytes: Vec::new(),
            len: 0,
            strobes: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        self.len += 1;
        // Bytes past the report depth are counted, not kept.
        let _ = self.bytes.push(byte);
    }
}

pub struct TransactionSequencer<SCL, SDA, D, P, L: Logger = NoOpLogger> {
    driver: BusDriver<SCL, SDA, D>,
    probe: P,
    checker: ExpectationChecker<L>,
    phase: Phase,
}

impl<SCL, SDA, D, P, L, E> TransactionSequencer<SCL, SDA, D, P, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    P: DeviceProbe,
    L: Logger,
{
    pub fn new(driver: BusDriver<SCL, SDA, D>, probe: P, checker: ExpectationChecker<L>) -> Self {
        Self {
            driver,
            probe,
            checker,
            phase: Phase::Idle,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn checker(&self) -> &ExpectationChecker<L> {
        &self.checker
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    /// Tear the session down into its parts.
    pub fn release(self) -> (BusDriver<SCL, SDA, D>, P, ExpectationChecker<L>) {
        (self.driver, self.probe, self.checker)
    }

    fn enter(&mut self, next: Phase) {
        debug_assert!(
            next.may_follow(self.phase),
            "illegal bus phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        self.checker
            .logger_mut()
            .debug(format_args!("phase {:?} -> {:?}", self.phase, next));
        self.phase = next;
    }

    fn start(&mut self) -> Result<(), Error<E>> {
        self.enter(Phase::Start);
        self.driver.start().map_err(Error::Pin)
    }

    fn stop(&mut self) -> Result<(), Error<E>> {
        self.enter(Phase::Stop);
        self.driver.stop().map_err(Error::Pin)?;
        self.enter(Phase::Idle);
        Ok(())
    }

    /// STOP, then the device must have deselected.
    fn stop_released(&mut self, burst_index: usize) -> Result<(), Error<E>> {
        self.stop()?;
        let observed = self.probe.outputs();
        self.checker.check_released(&observed, burst_index)?;
        Ok(())
    }

    /// Send a master byte in `phase` and return the device's acknowledge.
    fn send_framed(&mut self, phase: Phase, byte: Byte) -> Result<Ack, Error<E>> {
        self.enter(phase);
        self.driver.send_byte(byte.value()).map_err(Error::Pin)?;
        self.enter(Phase::Ack);
        self.driver.sample_ack().map_err(Error::Pin)
    }

    /// Nothing may strobe between transactions.
    fn check_quiet(&mut self, expected: &ExpectedSnapshot) -> Result<(), Error<E>> {
        let strobes = self.probe.take_strobes();
        self.checker
            .check_strobes(&ExpectedSnapshot { valid: false, ..*expected }, &strobes)?;
        Ok(())
    }

    /// Address phase: `address‖rw`, device ACK, then decoded address and direction.
    fn address_phase(&mut self, combined: Byte, expected: &ExpectedSnapshot) -> Result<(), Error<E>> {
        let ack = self.send_framed(Phase::AddrRw, combined)?;
        self.checker.check_device_ack(ack, 0)?;
        let observed = self.probe.outputs();
        self.checker.check_address(expected, &observed)?;
        self.check_quiet(expected)
    }

    /// Register pointer phase of a write access.
    fn register_phase(&mut self, register: Byte, expected: &ExpectedSnapshot) -> Result<(), Error<E>> {
        let ack = self.send_framed(Phase::RegAddr, register)?;
        self.checker.check_device_ack(ack, 0)?;
        let observed = self.probe.outputs();
        self.checker.check_outputs(expected, &observed)?;
        self.check_quiet(expected)
    }

    /// Abort handling: a failed transaction still ends with STOP.
    fn finish<T>(&mut self, result: Result<T, Error<E>>) -> Result<T, Error<E>> {
        if result.is_err() && self.phase != Phase::Idle {
            // Best effort; the mismatch is what gets reported.
            let _ = self.driver.stop();
            self.phase = Phase::Idle;
        }
        result
    }

    /// START immediately followed by STOP; the device must not change.
    ///
    /// # Errors
    ///
    /// Returns a mismatch for the first decoded output that changed.
    pub fn empty_transaction(&mut self) -> Result<(), Error<E>> {
        let result = self.empty_inner();
        self.finish(result)
    }

    fn empty_inner(&mut self) -> Result<(), Error<E>> {
        let before = self.probe.outputs();
        let idle = ExpectedSnapshot::address_phase(before.address, before.direction, before.register);
        self.check_quiet(&idle)?;

        self.start()?;
        self.stop_released(0)?;

        let after = self.probe.outputs();
        let strobes = self.probe.take_strobes();
        self.checker.check_unchanged(&before, &after, &strobes)?;
        self.checker.logger_mut().debug(format_args!("empty transaction left device unchanged"));
        Ok(())
    }

    /// Write burst of `len` data bytes starting at `frame.register()`.
    ///
    /// The first byte is `frame.data()`; the data field is regenerated from
    /// `rng` after each acknowledged byte that is not the last. With
    /// `len == 0` only the register pointer is written.
    ///
    /// # Errors
    ///
    /// Returns the first mismatch; the bus is still taken through STOP.
    pub fn write<R: RngCore + ?Sized>(
        &mut self,
        frame: &mut WriteFrame,
        len: usize,
        rng: &mut R,
    ) -> Result<BurstReport, Error<E>> {
        let result = self.write_inner(frame, len, rng);
        self.finish(result)
    }

    fn write_inner<R: RngCore + ?Sized>(
        &mut self,
        frame: &mut WriteFrame,
        len: usize,
        rng: &mut R,
    ) -> Result<BurstReport, Error<E>> {
        let address = frame.address().value();
        let base = frame.register().value();
        let expected = ExpectedSnapshot::address_phase(address, Direction::Write, base);
        let mut report = BurstReport::new(Direction::Write, address, base);

        self.checker
            .logger_mut()
            .debug(format_args!("write x{len}: {frame}"));
        self.check_quiet(&expected)?;
        self.start()?;
        self.address_phase(frame.address_write(), &expected)?;
        self.register_phase(frame.register(), &expected)?;
        report.start_register = self.probe.outputs().register;

        let mut last = expected;
        for index in 0..len {
            let data = frame.data();
            let ack = self.send_framed(Phase::Data, data)?;
            self.checker.check_device_ack(ack, index)?;

            last = expected.at_byte(index, data.value(), true);
            let observed = self.probe.outputs();
            self.checker.check_outputs(&last, &observed)?;
            let strobes = self.probe.take_strobes();
            self.checker.check_strobes(&last, &strobes)?;
            report.strobes += strobes.count();
            report.push(data.value());
            self.checker.logger_mut().debug(format_args!(
                "wrote [{index}] reg 0x{:02x} <- 0x{:02x}",
                last.register(),
                data.value()
            ));

            if index + 1 < len {
                frame.new_data(rng);
            }
        }

        self.stop_released(last.offset)?;
        self.check_quiet(&last)?;
        Ok(report)
    }

    /// Register read: pointer write, STOP, START in read direction, then a
    /// burst of `len` bytes sourced by the device.
    ///
    /// Before each byte the device is loaded with `frame.data_from_slave()`,
    /// regenerated from `rng` for every byte after the first. The master
    /// ACKs every byte except the last, which it NACKs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRead`] for `len == 0` without touching the bus,
    /// otherwise the first mismatch; the bus is still taken through STOP.
    pub fn read<R: RngCore + ?Sized>(
        &mut self,
        frame: &mut ReadFrame,
        len: usize,
        rng: &mut R,
    ) -> Result<BurstReport, Error<E>> {
        // A selected read device drives SDA until a byte has been NACKed.
        if len == 0 {
            return Err(Error::EmptyRead);
        }
        let result = self.read_inner(frame, len, rng);
        self.finish(result)
    }

    fn read_inner<R: RngCore + ?Sized>(
        &mut self,
        frame: &mut ReadFrame,
        len: usize,
        rng: &mut R,
    ) -> Result<BurstReport, Error<E>> {
        let address = frame.address().value();
        let base = frame.register().value();
        let pointer = ExpectedSnapshot::address_phase(address, Direction::Write, base);

        self.checker
            .logger_mut()
            .debug(format_args!("read x{len}: {frame}"));
        self.check_quiet(&pointer)?;
        self.start()?;
        self.address_phase(frame.address_write(), &pointer)?;
        self.register_phase(frame.register(), &pointer)?;
        self.stop_released(0)?;

        let expected = ExpectedSnapshot::address_phase(address, Direction::Read, base);
        let mut report = BurstReport::new(Direction::Read, address, base);
        self.start()?;
        self.probe.load_source_byte(frame.data_from_slave().value());
        self.address_phase(frame.address_read(), &expected)?;
        // The restart must not disturb the pointer set by the write phase.
        let observed = self.probe.outputs();
        self.checker.check_outputs(&expected, &observed)?;
        report.start_register = observed.register;

        let mut last = expected;
        for index in 0..len {
            let programmed = frame.data_from_slave().value();
            self.enter(Phase::Data);
            let captured = SlaveByteCapture::capture(&mut self.driver).map_err(Error::Pin)?;
            self.checker.check_captured(programmed, captured, index)?;

            let byte = expected.at_byte(index, captured, false);
            let observed = self.probe.outputs();
            self.checker.check_outputs(&byte, &observed)?;

            let more = index + 1 < len;
            if more {
                frame.new_data_from_slave(rng);
                self.probe.load_source_byte(frame.data_from_slave().value());
            }
            self.enter(Phase::Ack);
            let ack = if more { Ack::Ack } else { Ack::Nack };
            self.driver.drive_ack(ack).map_err(Error::Pin)?;

            // The commit strobe lands at the byte boundary and only for ACKed bytes.
            last = expected.at_byte(index, captured, more);
            let strobes = self.probe.take_strobes();
            self.checker.check_strobes(&last, &strobes)?;
            report.strobes += strobes.count();
            report.push(captured);
            self.checker.logger_mut().debug(format_args!(
                "read [{index}] reg 0x{:02x} -> 0x{captured:02x} ({ack:?})",
                byte.register()
            ));
        }

        self.stop_released(last.offset)?;
        self.check_quiet(&last)?;
        Ok(report)
    }
}
