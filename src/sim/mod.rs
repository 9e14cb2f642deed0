// Licensed under the Apache-2.0 license

//! Cycle-based simulation of an open-drain two-wire bus.
//!
//! [`SimBus`] owns the device under test and the resolved line levels.
//! Both lines are wired-AND: a line is high only when neither the master nor
//! the device pulls it low. Time only moves when the master waits; every
//! system clock period inside a wait the device is clocked once and the
//! data-valid output is monitored for rising edges.
//!
//! The master side talks to the kernel through embedded-hal handles
//! ([`SimScl`], [`SimSda`], [`SimDelay`]) and the checker through
//! [`SimProbe`]. All of them borrow the same `RefCell`, so a bench is single
//! threaded and every handle sees the same instant.

pub mod device;

use crate::i2c::common::BenchConfig;
use crate::i2c::traits::{DeviceOutputs, DeviceProbe, DeviceUnderTest, Strobe, StrobeLog};
use core::cell::RefCell;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

pub use device::RegisterSlave;

pub struct SimBus<D> {
    device: D,
    scl: bool,
    sda: bool,
    device_sda: bool,
    now_ns: u64,
    next_tick_ns: u64,
    period_ns: u64,
    cycles: u64,
    last_valid: bool,
    strobes: StrobeLog,
}

impl<D: DeviceUnderTest> SimBus<D> {
    /// Bus with both lines released, clocked at the configured system clock.
    pub fn new(device: D, config: &BenchConfig) -> Self {
        Self {
            device,
            scl: true,
            sda: true,
            device_sda: true,
            now_ns: 0,
            next_tick_ns: 0,
            period_ns: u64::from(config.system_clock_period_ns()),
            cycles: 0,
            last_valid: false,
            strobes: StrobeLog::default(),
        }
    }

    /// Hold the device in reset for `cycles` system clock cycles.
    pub fn reset(&mut self, cycles: u32) {
        self.scl = true;
        self.sda = true;
        self.device_sda = true;
        for _ in 0..cycles {
            self.device.reset();
            self.now_ns = self.next_tick_ns;
            self.next_tick_ns += self.period_ns;
            self.cycles += 1;
        }
        self.last_valid = false;
        self.strobes = StrobeLog::default();
    }

    /// Let `ns` nanoseconds of bus time pass.
    pub fn advance(&mut self, ns: u64) {
        let target = self.now_ns.saturating_add(ns);
        while self.next_tick_ns <= target {
            self.now_ns = self.next_tick_ns;
            self.tick();
            self.next_tick_ns += self.period_ns;
        }
        self.now_ns = target;
    }

    fn tick(&mut self) {
        self.device_sda = self.device.clock(self.scl, self.sda_level());
        let outputs = self.device.outputs();
        if outputs.valid && !self.last_valid {
            self.strobes.record(Strobe {
                register: outputs.register,
                data: outputs.data,
                direction: outputs.direction,
            });
        }
        self.last_valid = outputs.valid;
        self.cycles += 1;
    }

    /// Resolved SCL level.
    #[must_use]
    pub fn scl_level(&self) -> bool {
        self.scl
    }

    /// Resolved SDA level.
    #[must_use]
    pub fn sda_level(&self) -> bool {
        self.sda && self.device_sda
    }

    #[must_use]
    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    /// System clock cycles elapsed since construction.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Split a shared kernel into master-side pins, delay and the probe.
    pub fn split(
        bus: &RefCell<Self>,
    ) -> (SimScl<'_, D>, SimSda<'_, D>, SimDelay<'_, D>, SimProbe<'_, D>) {
        (
            SimScl { bus },
            SimSda { bus },
            SimDelay { bus },
            SimProbe { bus },
        )
    }
}

/// Master SCL output.
pub struct SimScl<'a, D> {
    bus: &'a RefCell<SimBus<D>>,
}

impl<D> ErrorType for SimScl<'_, D> {
    type Error = Infallible;
}

impl<D> OutputPin for SimScl<'_, D> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.bus.borrow_mut().scl = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.bus.borrow_mut().scl = true;
        Ok(())
    }
}

/// Master SDA output with read-back of the resolved line.
pub struct SimSda<'a, D> {
    bus: &'a RefCell<SimBus<D>>,
}

impl<D> ErrorType for SimSda<'_, D> {
    type Error = Infallible;
}

impl<D> OutputPin for SimSda<'_, D> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.bus.borrow_mut().sda = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.bus.borrow_mut().sda = true;
        Ok(())
    }
}

impl<D: DeviceUnderTest> InputPin for SimSda<'_, D> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.bus.borrow().sda_level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.bus.borrow().sda_level())
    }
}

/// Delay that advances simulated time.
pub struct SimDelay<'a, D> {
    bus: &'a RefCell<SimBus<D>>,
}

impl<D: DeviceUnderTest> DelayNs for SimDelay<'_, D> {
    fn delay_ns(&mut self, ns: u32) {
        self.bus.borrow_mut().advance(u64::from(ns));
    }
}

/// Checker-side access to the simulated device.
pub struct SimProbe<'a, D> {
    bus: &'a RefCell<SimBus<D>>,
}

impl<D: DeviceUnderTest> DeviceProbe for SimProbe<'_, D> {
    fn outputs(&mut self) -> DeviceOutputs {
        self.bus.borrow().device.outputs()
    }

    fn take_strobes(&mut self) -> StrobeLog {
        core::mem::take(&mut self.bus.borrow_mut().strobes)
    }

    fn load_source_byte(&mut self, byte: u8) {
        self.bus.borrow_mut().device.load_source_byte(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every clocked level pair and pulls SDA low on request.
    #[derive(Default)]
    struct Recorder {
        clocks: u32,
        pull_sda: bool,
        last: Option<(bool, bool)>,
        valid: bool,
    }

    impl DeviceUnderTest for Recorder {
        fn reset(&mut self) {
            self.clocks = 0;
            self.valid = false;
        }

        fn clock(&mut self, scl: bool, sda: bool) -> bool {
            self.clocks += 1;
            self.last = Some((scl, sda));
            // Pulse valid on every fourth cycle.
            self.valid = self.clocks % 4 == 0;
            !self.pull_sda
        }

        fn outputs(&self) -> DeviceOutputs {
            DeviceOutputs {
                valid: self.valid,
                ..DeviceOutputs::default()
            }
        }

        fn load_source_byte(&mut self, _byte: u8) {}
    }

    #[test]
    fn test_device_clocked_once_per_period() {
        let bus = RefCell::new(SimBus::new(Recorder::default(), &BenchConfig::default()));
        bus.borrow_mut().advance(100);
        // Ticks at 0, 20, 40, 60, 80 and 100 ns.
        assert_eq!(bus.borrow().device().clocks, 6);
        assert_eq!(bus.borrow().now_ns(), 100);

        bus.borrow_mut().advance(10);
        assert_eq!(bus.borrow().device().clocks, 6);
        bus.borrow_mut().advance(10);
        assert_eq!(bus.borrow().device().clocks, 7);
    }

    #[test]
    fn test_lines_are_wired_and() {
        let bus = RefCell::new(SimBus::new(Recorder::default(), &BenchConfig::default()));
        let (mut scl, mut sda, mut delay, _probe) = SimBus::split(&bus);
        assert!(sda.is_high().unwrap());

        bus.borrow_mut().device_mut().pull_sda = true;
        delay.delay_ns(20);
        assert!(sda.is_low().unwrap());

        bus.borrow_mut().device_mut().pull_sda = false;
        sda.set_low().unwrap();
        scl.set_low().unwrap();
        delay.delay_ns(20);
        assert!(sda.is_low().unwrap());
        assert_eq!(bus.borrow().device().last, Some((false, false)));
    }

    #[test]
    fn test_probe_drains_valid_rising_edges() {
        let bus = RefCell::new(SimBus::new(Recorder::default(), &BenchConfig::default()));
        bus.borrow_mut().reset(2);
        let (_scl, _sda, mut delay, mut probe) = SimBus::split(&bus);

        // Eight cycles after reset: valid on cycles 4 and 8.
        delay.delay_ns(8 * 20);
        assert_eq!(probe.take_strobes().count(), 2);
        assert_eq!(probe.take_strobes().count(), 0);
    }
}
