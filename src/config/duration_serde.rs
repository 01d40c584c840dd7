//! Human-readable durations for the `[http]` timeouts.
//!
//! Values may be written either as plain seconds (`epg_timeout = 30`) or as a
//! humantime string (`epg_timeout = "30s"`, `connect_timeout = "1m 30s"`).

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let duration_str = humantime::format_duration(*duration).to_string();
    serializer.serialize_str(&duration_str)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a timeout as seconds (number) or human-readable string (e.g., '30s', '2m')")
        }

        fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(seconds))
        }

        fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(seconds)
                .map(Duration::from_secs)
                .map_err(|_| de::Error::custom(format!("Timeout {seconds} must not be negative")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(value)
                .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        timeout: Duration,
    }

    #[test]
    fn test_accepts_seconds_and_strings() {
        let numeric: Holder = toml::from_str("timeout = 45").unwrap();
        assert_eq!(numeric.timeout, Duration::from_secs(45));

        let human: Holder = toml::from_str("timeout = \"1m 30s\"").unwrap();
        assert_eq!(human.timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_rejects_garbage() {
        let result: Result<Holder, _> = toml::from_str("timeout = \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_human_readable() {
        let out = toml::to_string(&Holder {
            timeout: Duration::from_secs(30),
        })
        .unwrap();
        assert!(out.contains("timeout = \"30s\""));
    }
}
