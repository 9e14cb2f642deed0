// Licensed under the Apache-2.0 license

//! Transaction descriptors.
//!
//! A frame is built once per logical transaction from fresh random fields.
//! Only its data byte is ever replaced, between the bytes of a burst.

use crate::i2c::bitfield::{Address7, Byte};
use crate::i2c::common::Direction;
use core::fmt;
use rand::RngCore;

/// Descriptor of a master-to-slave transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WriteFrame {
    address: Address7,
    register: Byte,
    data: Byte,
}

impl WriteFrame {
    #[must_use]
    pub const fn new(address: Address7, register: Byte, data: Byte) -> Self {
        Self {
            address,
            register,
            data,
        }
    }

    #[must_use]
    pub const fn address(&self) -> Address7 {
        self.address
    }

    #[must_use]
    pub const fn rw(&self) -> Direction {
        Direction::Write
    }

    /// Combined `address‖0` byte sent after START.
    #[must_use]
    pub const fn address_write(&self) -> Byte {
        self.address.append_bit(false)
    }

    #[must_use]
    pub const fn register(&self) -> Byte {
        self.register
    }

    #[must_use]
    pub const fn data(&self) -> Byte {
        self.data
    }

    /// Replace the data byte for the next byte of a burst.
    pub fn new_data<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        self.data = Byte::random(rng);
    }
}

impl fmt::Display for WriteFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WriteFrame(addr_slv: {}, rw_wr: {}, addr_slv_wr: {}, addr_reg: {}, data: {})",
            self.address,
            self.rw().bit(),
            self.address_write(),
            self.register,
            self.data
        )
    }
}

/// Descriptor of a register-pointer write followed by a slave-to-master read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadFrame {
    address: Address7,
    register: Byte,
    data_from_slave: Byte,
}

impl ReadFrame {
    #[must_use]
    pub const fn new(address: Address7, register: Byte, data_from_slave: Byte) -> Self {
        Self {
            address,
            register,
            data_from_slave,
        }
    }

    #[must_use]
    pub const fn address(&self) -> Address7 {
        self.address
    }

    #[must_use]
    pub const fn rw_write(&self) -> Direction {
        Direction::Write
    }

    #[must_use]
    pub const fn rw_read(&self) -> Direction {
        Direction::Read
    }

    /// Combined `address‖0` byte used to set the register pointer.
    #[must_use]
    pub const fn address_write(&self) -> Byte {
        self.address.append_bit(false)
    }

    /// Combined `address‖1` byte sent after the restart.
    #[must_use]
    pub const fn address_read(&self) -> Byte {
        self.address.append_bit(true)
    }

    #[must_use]
    pub const fn register(&self) -> Byte {
        self.register
    }

    /// Byte the device is told to source next.
    #[must_use]
    pub const fn data_from_slave(&self) -> Byte {
        self.data_from_slave
    }

    pub fn new_data_from_slave<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        self.data_from_slave = Byte::random(rng);
    }
}

impl fmt::Display for ReadFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReadFrame(addr_slv: {}, rw_wr: {}, rw_rd: {}, addr_slv_wr: {}, addr_slv_rd: {}, \
             addr_reg: {}, data_from_slv: {})",
            self.address,
            self.rw_write().bit(),
            self.rw_read().bit(),
            self.address_write(),
            self.address_read(),
            self.register,
            self.data_from_slave
        )
    }
}

/// Produces frames with random fields from an owned PRNG.
pub struct FrameBuilder<R: RngCore> {
    rng: R,
    fixed_address: Option<Address7>,
}

impl<R: RngCore> FrameBuilder<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            fixed_address: None,
        }
    }

    /// Always use `address` instead of a random one.
    #[must_use]
    pub fn with_address(mut self, address: Address7) -> Self {
        self.fixed_address = Some(address);
        self
    }

    fn address(&mut self) -> Address7 {
        match self.fixed_address {
            Some(address) => address,
            None => Address7::random(&mut self.rng),
        }
    }

    pub fn write(&mut self) -> WriteFrame {
        let address = self.address();
        WriteFrame::new(address, Byte::random(&mut self.rng), Byte::random(&mut self.rng))
    }

    pub fn read(&mut self) -> ReadFrame {
        let address = self.address();
        ReadFrame::new(address, Byte::random(&mut self.rng), Byte::random(&mut self.rng))
    }

    /// The PRNG used for in-burst data regeneration.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}
