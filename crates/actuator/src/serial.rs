use crate::{Actuator, ActuatorError, Command};
use serialport::SerialPort;
use std::io::Write;
use std::thread;
use std::time::Duration;

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Actuator on a serial line (an Arduino-class board over USB CDC).
///
/// Generic over the writer so the wire behaviour can be exercised without a
/// device; in production `W` is the boxed port returned by `serialport`.
pub struct SerialActuator<W: Write = Box<dyn SerialPort>> {
    port: W,
    name: String,
    bytes_written: u64,
}

impl SerialActuator {
    /// Open `path` at 8N1/`baud_rate`, then wait `settle` for the board to
    /// come out of its auto-reset before the first command.
    pub fn open(path: &str, baud_rate: u32, settle: Duration) -> Result<Self, ActuatorError> {
        let port = serialport::new(path, baud_rate)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|source| ActuatorError::Open {
                path: path.to_string(),
                source,
            })?;

        tracing::info!(
            port = %path,
            baud_rate,
            settle_ms = settle.as_millis() as u64,
            "Serial port opened, waiting for board to settle"
        );
        if !settle.is_zero() {
            thread::sleep(settle);
        }

        Ok(Self::from_writer(port, path))
    }
}

impl<W: Write> SerialActuator<W> {
    pub fn from_writer(port: W, name: &str) -> Self {
        Self {
            port,
            name: name.to_string(),
            bytes_written: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl<W: Write> Actuator for SerialActuator<W> {
    fn send(&mut self, command: Command) -> Result<(), ActuatorError> {
        self.port
            .write_all(&[command.as_byte()])
            .map_err(ActuatorError::Write)?;
        self.port.flush().map_err(ActuatorError::Flush)?;
        self.bytes_written += 1;

        tracing::debug!(port = %self.name, %command, "Command written");
        Ok(())
    }
}

impl<W: Write> Drop for SerialActuator<W> {
    fn drop(&mut self) {
        tracing::info!(
            port = %self.name,
            bytes_written = self.bytes_written,
            "Serial port closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Writer that fails on demand and records flushes.
    #[derive(Default)]
    struct FakePort {
        written: Vec<u8>,
        flushes: usize,
        fail_write: bool,
        fail_flush: bool,
    }

    impl Write for FakePort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_write {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.fail_flush {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "stalled"));
            }
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_send_writes_single_byte_and_flushes() {
        let mut actuator = SerialActuator::from_writer(FakePort::default(), "fake");

        actuator.send(Command::Activate).unwrap();
        actuator.send(Command::Deactivate).unwrap();

        assert_eq!(actuator.port.written, b"MS");
        assert_eq!(actuator.port.flushes, 2);
        assert_eq!(actuator.bytes_written(), 2);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let port = FakePort {
            fail_write: true,
            ..Default::default()
        };
        let mut actuator = SerialActuator::from_writer(port, "fake");

        let err = actuator.send(Command::Activate).unwrap_err();
        assert!(matches!(err, ActuatorError::Write(_)));
        assert_eq!(actuator.bytes_written(), 0);
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let port = FakePort {
            fail_flush: true,
            ..Default::default()
        };
        let mut actuator = SerialActuator::from_writer(port, "fake");

        let err = actuator.send(Command::Deactivate).unwrap_err();
        assert!(matches!(err, ActuatorError::Flush(_)));
    }

    #[test]
    fn test_boxed_actuator_dispatches() {
        let mut actuator: Box<dyn Actuator> =
            Box::new(SerialActuator::from_writer(Vec::<u8>::new(), "vec"));
        assert!(actuator.send(Command::Activate).is_ok());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = SerialActuator::open("/dev/does-not-exist-tty", 9600, Duration::ZERO);
        match result {
            Err(ActuatorError::Open { path, .. }) => assert_eq!(path, "/dev/does-not-exist-tty"),
            Err(other) => panic!("Expected Open error, got {:?}", other),
            Ok(_) => panic!("Opening a missing device should fail"),
        }
    }
}
