use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Deserialize a humantime-style string (`"5m"`, `"30s"`, `"1h"`) into a
/// [`Duration`], the way the rate limiter's config parsing does it.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize as SerdeDeserialize;

    #[derive(SerdeDeserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "deserialize_duration")]
        value: Duration,
    }

    #[test]
    fn parses_minutes() {
        let w: Wrapper = toml::from_str("value = \"5m\"").unwrap();
        assert_eq!(w.value, Duration::from_secs(300));
    }

    #[test]
    fn parses_seconds() {
        let w: Wrapper = toml::from_str("value = \"30s\"").unwrap();
        assert_eq!(w.value, Duration::from_secs(30));
    }

    #[test]
    fn rejects_garbage() {
        let err = toml::from_str::<Wrapper>("value = \"not-a-duration\"");
        assert!(err.is_err());
    }
}
