pub mod command;
pub mod error;
pub mod serial;

pub use command::Command;
pub use error::ActuatorError;
pub use serial::SerialActuator;

/// One-way command channel to the physical actuator.
pub trait Actuator {
    fn send(&mut self, command: Command) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn send(&mut self, command: Command) -> Result<(), ActuatorError> {
        (**self).send(command)
    }
}
