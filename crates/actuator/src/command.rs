use std::fmt;

/// Commands understood by the actuator firmware. Each one is a single ASCII
/// byte on the wire with no framing or terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Switch the indicator on (`'M'`).
    Activate,
    /// Switch the indicator off (`'S'`).
    Deactivate,
}

impl Command {
    pub const fn as_byte(self) -> u8 {
        match self {
            Command::Activate => b'M',
            Command::Deactivate => b'S',
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Activate => f.write_str("activate"),
            Command::Deactivate => f.write_str("deactivate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bytes() {
        assert_eq!(Command::Activate.as_byte(), 0x4D);
        assert_eq!(Command::Deactivate.as_byte(), 0x53);
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::Activate.to_string(), "activate");
        assert_eq!(Command::Deactivate.to_string(), "deactivate");
    }
}
