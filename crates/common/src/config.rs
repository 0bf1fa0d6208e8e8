use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&env_string("ENVIRONMENT", "development"))
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Read `key` and parse it, falling back to `default` when unset or unparsable.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

pub fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn environment_parse_accepts_prod_aliases() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("PROD"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }

    #[test]
    fn environment_as_str_round_trips() {
        assert_eq!(
            Environment::parse(Environment::Production.as_str()),
            Environment::Production
        );
        assert_eq!(Environment::Development.as_str(), "development");
    }

    #[test]
    #[serial]
    fn env_or_falls_back_on_missing_and_invalid() {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            env::remove_var("COMMON_TEST_NUMBER");
        }
        assert_eq!(env_or("COMMON_TEST_NUMBER", 42u32), 42);

        unsafe {
            env::set_var("COMMON_TEST_NUMBER", "not-a-number");
        }
        assert_eq!(env_or("COMMON_TEST_NUMBER", 42u32), 42);

        unsafe {
            env::set_var("COMMON_TEST_NUMBER", " 7 ");
        }
        assert_eq!(env_or("COMMON_TEST_NUMBER", 42u32), 7);

        unsafe {
            env::remove_var("COMMON_TEST_NUMBER");
        }
    }

    #[test]
    #[serial]
    fn env_string_reads_value() {
        unsafe {
            env::set_var("COMMON_TEST_STRING", "/dev/ttyUSB0");
        }
        assert_eq!(env_string("COMMON_TEST_STRING", "x"), "/dev/ttyUSB0");
        unsafe {
            env::remove_var("COMMON_TEST_STRING");
        }
        assert_eq!(env_string("COMMON_TEST_STRING", "x"), "x");
    }
}
