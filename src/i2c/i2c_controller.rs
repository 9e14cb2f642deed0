// Licensed under the Apache-2.0 license

//! Plain I2C master on top of the bit-level bus driver.
//!
//! This module implements the embedded-hal `I2c` trait with the same bus
//! timing the verification sequencer uses, so ordinary driver code can talk
//! to the device under test without any checking in the way.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::bus_driver::BusDriver;
use crate::i2c::capture::SlaveByteCapture;
use crate::i2c::common::{Ack, Direction};
use crate::i2c::error::Error;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::{NoAcknowledgeSource, Operation, SevenBitAddress};

pub struct I2cController<SCL, SDA, D, L: Logger = NoOpLogger> {
    pub driver: BusDriver<SCL, SDA, D>,
    pub logger: L,
}

impl<SCL, SDA, D, L, E> I2cController<SCL, SDA, D, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    L: Logger,
{
    pub fn new(driver: BusDriver<SCL, SDA, D>, logger: L) -> Self {
        Self { driver, logger }
    }

    fn address(&mut self, address: SevenBitAddress, direction: Direction) -> Result<(), Error<E>> {
        self.driver.start().map_err(Error::Pin)?;
        self.driver
            .send_byte(((address & 0x7f) << 1) | direction.bit())
            .map_err(Error::Pin)?;
        match self.driver.sample_ack().map_err(Error::Pin)? {
            Ack::Ack => Ok(()),
            Ack::Nack => Err(Error::NoAcknowledge(NoAcknowledgeSource::Address)),
        }
    }

    fn run(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error<E>> {
        let mut current: Option<Direction> = None;
        for index in 0..operations.len() {
            // The last byte before a direction change or the end is NACKed.
            let next_is_read = matches!(operations.get(index + 1), Some(Operation::Read(_)));
            let Some(operation) = operations.get_mut(index) else {
                break;
            };
            let direction = match operation {
                Operation::Read(_) => Direction::Read,
                Operation::Write(_) => Direction::Write,
            };
            if current != Some(direction) {
                self.address(address, direction)?;
                current = Some(direction);
            }

            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        self.driver.send_byte(byte).map_err(Error::Pin)?;
                        if self.driver.sample_ack().map_err(Error::Pin)? == Ack::Nack {
                            return Err(Error::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                    }
                }
                Operation::Read(buffer) if buffer.is_empty() => {
                    // A selected device drives its first bit until a byte is NACKed.
                    if !next_is_read {
                        let _ = SlaveByteCapture::capture(&mut self.driver).map_err(Error::Pin)?;
                        self.driver.drive_ack(Ack::Nack).map_err(Error::Pin)?;
                    }
                }
                Operation::Read(buffer) => {
                    let len = buffer.len();
                    for (i, slot) in buffer.iter_mut().enumerate() {
                        *slot = SlaveByteCapture::capture(&mut self.driver).map_err(Error::Pin)?;
                        let last = i + 1 == len && !next_is_read;
                        let ack = if last { Ack::Nack } else { Ack::Ack };
                        self.driver.drive_ack(ack).map_err(Error::Pin)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<SCL, SDA, D, L, E> embedded_hal::i2c::ErrorType for I2cController<SCL, SDA, D, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    L: Logger,
    E: Debug,
{
    type Error = Error<E>;
}

impl<SCL, SDA, D, L, E> embedded_hal::i2c::I2c for I2cController<SCL, SDA, D, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    L: Logger,
    E: Debug,
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.logger.debug(format_args!(
            "i2c transaction addr 0x{address:02x}, {} operation(s)",
            operations.len()
        ));
        if operations.is_empty() {
            return Ok(());
        }
        let result = self.run(address, operations);
        // The bus is released whatever happened.
        let stop = self.driver.stop().map_err(Error::Pin);
        if let Err(e) = &result {
            self.logger.error(format_args!("i2c transaction failed: {e}"));
        }
        result.and(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::BenchConfig;
    use crate::i2c::timing::BusTiming;
    use crate::i2c::traits::DeviceUnderTest;
    use crate::sim::{RegisterSlave, SimBus};
    use core::cell::RefCell;
    use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

    fn bench(slave: RegisterSlave) -> RefCell<SimBus<RegisterSlave>> {
        let config = BenchConfig::default();
        let mut bus = SimBus::new(slave, &config);
        bus.reset(config.reset_cycles);
        RefCell::new(bus)
    }

    #[test]
    fn test_write_sets_register_and_data() {
        let bus = bench(RegisterSlave::new());
        let (scl, sda, delay, _probe) = SimBus::split(&bus);
        let timing = BusTiming::new(BenchConfig::default().bus_frequency).unwrap();
        let mut i2c = I2cController::new(BusDriver::new(scl, sda, delay, timing), NoOpLogger);

        i2c.write(0x55, &[0xA9, 0x3C, 0x12]).unwrap();
        let out = bus.borrow().device().outputs();
        assert_eq!((out.address, out.register, out.data), (0x55, 0xAA, 0x12));
        assert!(!out.selected);
    }

    #[test]
    fn test_write_read_with_repeated_start() {
        let bus = bench(RegisterSlave::new());
        bus.borrow_mut().device_mut().load_source_byte(0x5A);
        let (scl, sda, delay, _probe) = SimBus::split(&bus);
        let timing = BusTiming::new(BenchConfig::default().bus_frequency).unwrap();
        let mut i2c = I2cController::new(BusDriver::new(scl, sda, delay, timing), NoOpLogger);

        let mut buffer = [0u8; 2];
        i2c.write_read(0x55, &[0x10], &mut buffer).unwrap();
        assert_eq!(buffer, [0x5A, 0x5A]);
        // First byte ACKed and committed, second NACKed.
        assert_eq!(bus.borrow().device().outputs().register, 0x11);
    }

    #[test]
    fn test_address_nack() {
        let bus = bench(RegisterSlave::with_address(0x22));
        let (scl, sda, delay, _probe) = SimBus::split(&bus);
        let timing = BusTiming::new(BenchConfig::default().bus_frequency).unwrap();
        let mut i2c = I2cController::new(BusDriver::new(scl, sda, delay, timing), NoOpLogger);

        let err = i2c.write(0x55, &[0x00]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        // The bus was still stopped, so the right address works next.
        i2c.write(0x22, &[0x01, 0x02]).unwrap();
        assert_eq!(bus.borrow().device().outputs().data, 0x02);
    }

    #[test]
    fn test_empty_read_buffer_releases_the_bus() {
        let bus = bench(RegisterSlave::new());
        bus.borrow_mut().device_mut().load_source_byte(0x00);
        let (scl, sda, delay, _probe) = SimBus::split(&bus);
        let timing = BusTiming::new(BenchConfig::default().bus_frequency).unwrap();
        let mut i2c = I2cController::new(BusDriver::new(scl, sda, delay, timing), NoOpLogger);

        i2c.read(0x55, &mut []).unwrap();
        let out = bus.borrow().device().outputs();
        assert!(!out.selected);
        assert!(bus.borrow().sda_level());

        i2c.write(0x55, &[0x20, 0x3C]).unwrap();
        let out = bus.borrow().device().outputs();
        assert_eq!((out.direction, out.register, out.data), (Direction::Write, 0x20, 0x3C));
    }

    #[test]
    fn test_no_operations_leave_the_bus_alone() {
        let bus = bench(RegisterSlave::new());
        let (scl, sda, delay, _probe) = SimBus::split(&bus);
        let timing = BusTiming::new(BenchConfig::default().bus_frequency).unwrap();
        let mut i2c = I2cController::new(BusDriver::new(scl, sda, delay, timing), NoOpLogger);

        let before = bus.borrow().now_ns();
        i2c.transaction(0x55, &mut []).unwrap();
        assert_eq!(bus.borrow().now_ns(), before);
        assert!(bus.borrow().scl_level() && bus.borrow().sda_level());
    }
}
