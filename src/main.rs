// Licensed under the Apache-2.0 license

use std::io::Write as _;
use std::process::ExitCode;

use i2c_slave_bench::common::{LogLevel, Logger, WriterLogger};
use i2c_slave_bench::i2c::common::{BenchConfigBuilder, I2cSpeed};
use i2c_slave_bench::scenario::{run_scenario, Scenario};
use i2c_slave_bench::sim::RegisterSlave;
use i2c_slave_bench::tests::functional::i2c_slave_test::run_i2c_slave_tests;

/// Host console for the bench output.
struct Stdout(std::io::Stdout);

impl embedded_io::ErrorType for Stdout {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for Stdout {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().map_err(|_| embedded_io::ErrorKind::Other)
    }
}

fn main() -> ExitCode {
    let mut console = Stdout(std::io::stdout());

    if let Err(e) = run_i2c_slave_tests(&mut console) {
        let _ = writeln!(std::io::stderr(), "i2c slave bench failed: {e}");
        return ExitCode::FAILURE;
    }

    // One logged burst so the phase trace is visible.
    let mut logger = WriterLogger::new(Stdout(std::io::stdout()), LogLevel::Debug);
    let config = match BenchConfigBuilder::new().speed(I2cSpeed::Fast).build() {
        Ok(config) => config,
        Err(e) => {
            logger.error(format_args!("bad configuration: {e}"));
            return ExitCode::FAILURE;
        }
    };
    let scenario = Scenario::WriteThenRead {
        write_len: 2,
        read_len: 2,
    };
    match run_scenario(&config, RegisterSlave::new(), scenario, &mut logger) {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
