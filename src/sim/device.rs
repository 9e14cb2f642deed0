// Licensed under the Apache-2.0 license

//! Behavioral model of a register-addressed I2C slave.
//!
//! The model is clocked from the system clock and only sees the sampled
//! SCL/SDA levels, like a synthesized slave would:
//!
//! * START and STOP are SDA edges while SCL is high.
//! * Incoming bits are shifted in on SCL rising edges, MSB first.
//! * SDA is only changed on SCL falling edges.
//!
//! In write direction the first byte after the address is the register
//! pointer; every further byte is committed with a one-cycle data-valid
//! pulse and the pointer advances by one before each byte after the first.
//! In read direction the byte loaded through the side channel is shifted
//! out; a master ACK commits it (register and data as shifted) and advances
//! the pointer, a master NACK commits nothing.

use crate::i2c::common::Direction;
use crate::i2c::traits::{DeviceOutputs, DeviceUnderTest};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Address,
    Register,
    Write,
    Read,
    /// Not addressed, or done after a NACK; wait for START or STOP
    Ignore,
}

#[derive(Clone, Debug)]
pub struct RegisterSlave {
    address: Option<u8>,
    state: State,
    /// State entered once the acknowledge slot ends
    next: State,
    prev_scl: bool,
    prev_sda: bool,
    shift: u8,
    bits: u8,
    drive: bool,
    first_write: bool,
    master_ack: bool,
    source: u8,
    tx: u8,
    advance_pending: bool,
    outputs: DeviceOutputs,
}

impl Default for RegisterSlave {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterSlave {
    /// Slave that decodes and acknowledges any address.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            address: None,
            state: State::Idle,
            next: State::Idle,
            prev_scl: true,
            prev_sda: true,
            shift: 0,
            bits: 0,
            drive: true,
            first_write: true,
            master_ack: false,
            source: 0,
            tx: 0,
            advance_pending: false,
            outputs: DeviceOutputs {
                address: 0,
                direction: Direction::Write,
                register: 0,
                data: 0,
                valid: false,
                selected: false,
            },
        }
    }

    /// Slave that only answers `address`.
    #[must_use]
    pub const fn with_address(address: u8) -> Self {
        let mut slave = Self::new();
        slave.address = Some(address & 0x7f);
        slave
    }

    fn on_start(&mut self) {
        self.state = State::Address;
        self.shift = 0;
        self.bits = 0;
        self.drive = true;
    }

    fn on_stop(&mut self) {
        self.state = State::Idle;
        self.drive = true;
        self.outputs.selected = false;
    }

    fn receiving(&self) -> bool {
        matches!(self.state, State::Address | State::Register | State::Write)
    }

    fn on_rise(&mut self, sda: bool) {
        if self.receiving() && self.bits < 8 {
            self.shift = (self.shift << 1) | u8::from(sda);
            self.bits += 1;
        } else if self.state == State::Read && self.bits == 8 {
            self.master_ack = !sda;
        }
    }

    fn on_fall(&mut self) {
        if self.receiving() {
            match self.bits {
                8 => self.byte_received(),
                9 => {
                    self.drive = true;
                    self.bits = 0;
                    self.shift = 0;
                    self.state = self.next;
                    if self.state == State::Read {
                        self.load_tx();
                        self.outputs.data = self.tx;
                    }
                }
                _ => {}
            }
        } else if self.state == State::Read {
            self.read_fall();
        }
    }

    fn byte_received(&mut self) {
        let byte = self.shift;
        self.bits = 9;
        match self.state {
            State::Address => {
                let address = byte >> 1;
                if self.address.is_some_and(|own| own != address) {
                    self.state = State::Ignore;
                    self.drive = true;
                    return;
                }
                let direction = Direction::from_bit(byte & 1 == 1);
                self.outputs.address = address;
                self.outputs.direction = direction;
                self.outputs.selected = true;
                self.next = match direction {
                    Direction::Write => State::Register,
                    Direction::Read => State::Read,
                };
            }
            State::Register => {
                self.outputs.register = byte;
                self.first_write = true;
                self.next = State::Write;
            }
            State::Write => {
                if !self.first_write {
                    self.outputs.register = self.outputs.register.wrapping_add(1);
                }
                self.first_write = false;
                self.outputs.data = byte;
                self.outputs.valid = true;
                self.next = State::Write;
            }
            _ => {}
        }
        self.drive = false;
    }

    fn load_tx(&mut self) {
        self.tx = self.source;
        self.bits = 0;
        self.drive = self.tx & 0x80 != 0;
    }

    fn read_fall(&mut self) {
        match self.bits {
            0..=6 => {
                self.bits += 1;
                self.drive = (self.tx << self.bits) & 0x80 != 0;
            }
            7 => {
                self.bits = 8;
                self.drive = true;
            }
            _ => {
                if self.master_ack {
                    // Commit with the current register and data, advance next cycle.
                    self.outputs.valid = true;
                    self.advance_pending = true;
                    self.load_tx();
                } else {
                    self.state = State::Ignore;
                    self.drive = true;
                }
            }
        }
    }
}

impl DeviceUnderTest for RegisterSlave {
    fn reset(&mut self) {
        let address = self.address;
        *self = Self::new();
        self.address = address;
    }

    fn clock(&mut self, scl: bool, sda: bool) -> bool {
        self.outputs.valid = false;
        if self.advance_pending {
            self.advance_pending = false;
            self.outputs.register = self.outputs.register.wrapping_add(1);
            self.outputs.data = self.tx;
        }

        let rise = scl && !self.prev_scl;
        let fall = !scl && self.prev_scl;
        let held_high = scl && self.prev_scl;

        if held_high && self.prev_sda && !sda {
            self.on_start();
        } else if held_high && !self.prev_sda && sda {
            self.on_stop();
        } else if self.state != State::Idle && self.state != State::Ignore {
            if rise {
                self.on_rise(sda);
            } else if fall {
                self.on_fall();
            }
        }

        self.prev_scl = scl;
        self.prev_sda = sda;
        self.drive
    }

    fn outputs(&self) -> DeviceOutputs {
        self.outputs
    }

    fn load_source_byte(&mut self, byte: u8) {
        self.source = byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive level pairs through the model, one clock each.
    fn run(slave: &mut RegisterSlave, levels: &[(bool, bool)]) -> Vec<bool> {
        levels.iter().map(|&(scl, sda)| slave.clock(scl, sda)).collect()
    }

    fn start() -> Vec<(bool, bool)> {
        vec![(true, true), (true, false), (false, false)]
    }

    fn stop() -> Vec<(bool, bool)> {
        vec![(false, false), (true, false), (true, true)]
    }

    /// Eight bits plus a released acknowledge slot; returns the ACK-slot drive.
    fn byte(slave: &mut RegisterSlave, value: u8) -> bool {
        for i in (0..8).rev() {
            let bit = value & (1 << i) != 0;
            run(slave, &[(false, bit), (true, bit), (true, bit), (false, bit)]);
        }
        let drives = run(slave, &[(false, true), (true, true), (true, true)]);
        let ack = drives.iter().any(|released| !released);
        run(slave, &[(false, true)]);
        ack
    }

    #[test]
    fn test_write_commits_register_and_data() {
        let mut slave = RegisterSlave::new();
        run(&mut slave, &start());
        assert!(byte(&mut slave, 0x55 << 1));
        let out = slave.outputs();
        assert_eq!((out.address, out.direction, out.selected), (0x55, Direction::Write, true));

        assert!(byte(&mut slave, 0xA9));
        assert_eq!(slave.outputs().register, 0xA9);

        assert!(byte(&mut slave, 0x3C));
        assert!(byte(&mut slave, 0x12));
        let out = slave.outputs();
        assert_eq!((out.register, out.data), (0xAA, 0x12));

        run(&mut slave, &stop());
        assert!(!slave.outputs().selected);
        assert_eq!(slave.outputs().register, 0xAA);
    }

    #[test]
    fn test_fixed_address_ignores_others() {
        let mut slave = RegisterSlave::with_address(0x22);
        run(&mut slave, &start());
        assert!(!byte(&mut slave, 0x55 << 1));
        assert!(!slave.outputs().selected);

        run(&mut slave, &stop());
        run(&mut slave, &start());
        assert!(byte(&mut slave, 0x22 << 1));
        assert!(slave.outputs().selected);
    }

    #[test]
    fn test_read_shifts_out_source_byte() {
        let mut slave = RegisterSlave::new();
        slave.load_source_byte(0x7E);
        run(&mut slave, &start());
        assert!(byte(&mut slave, (0x55 << 1) | 1));
        assert_eq!(slave.outputs().direction, Direction::Read);

        let mut value = 0u8;
        for _ in 0..8 {
            let levels = run(&mut slave, &[(true, true), (true, true), (false, true)]);
            value = (value << 1) | u8::from(levels[0]);
        }
        assert_eq!(value, 0x7E);
    }

    #[test]
    fn test_reset_keeps_address_filter() {
        let mut slave = RegisterSlave::with_address(0x10);
        run(&mut slave, &start());
        byte(&mut slave, 0x10 << 1);
        slave.reset();
        assert_eq!(slave.outputs(), DeviceOutputs::default());
        assert_eq!(slave.address, Some(0x10));
    }
}
