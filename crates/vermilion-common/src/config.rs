// config.rs — keyed configuration lookup with typed defaults
//
// The embedder populates a Config from whatever source it likes (command
// line, saved settings, a parsed ini); the engine only ever reads from it.

use std::collections::HashMap;

/// Keys the renderer and window glue recognize, with their defaults:
///
/// | key          | type   | default      |
/// |--------------|--------|--------------|
/// | `Monitor`    | number | `0`          |
/// | `WindowMode` | string | `"windowed"` |
/// | `Width`      | number | `640`        |
/// | `Height`     | number | `480`        |
/// | `GPUIndex`   | number | `-1` (auto)  |
///
/// Unknown keys are kept and ignored.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Store a value, replacing any previous one under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a numeric value. Missing or unparsable entries yield the
    /// caller's default.
    pub fn number(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    log::warn!("config key {:?} has non-numeric value {:?}", key, raw);
                    default
                }
            },
            None => default,
        }
    }

    /// Look up a string value, or the caller's default when absent.
    pub fn string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(raw) => raw.as_str(),
            None => default,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_keys() {
        let cfg = Config::new();
        assert_eq!(cfg.number("Width", 640.0), 640.0);
        assert_eq!(cfg.number("GPUIndex", -1.0), -1.0);
        assert_eq!(cfg.string("WindowMode", "windowed"), "windowed");
    }

    #[test]
    fn test_set_and_get() {
        let mut cfg = Config::new();
        cfg.set("Width", "800");
        cfg.set("Height", "600");
        cfg.set("WindowMode", "resizable");
        assert_eq!(cfg.number("Width", 640.0), 800.0);
        assert_eq!(cfg.number("Height", 480.0), 600.0);
        assert_eq!(cfg.string("WindowMode", "windowed"), "resizable");
    }

    #[test]
    fn test_non_numeric_falls_back() {
        let mut cfg = Config::new();
        cfg.set("GPUIndex", "fastest");
        assert_eq!(cfg.number("GPUIndex", -1.0), -1.0);
    }

    #[test]
    fn test_replacing_a_value() {
        let mut cfg = Config::new();
        cfg.set("Monitor", "0");
        cfg.set("Monitor", "1");
        assert_eq!(cfg.number("Monitor", 0.0), 1.0);
    }
}
