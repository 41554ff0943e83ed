//! Validated configuration, replacing the distilled source's untyped
//! options bag. Unknown keys are rejected when parsing from JSON so typos
//! fail loudly instead of silently falling back to a default.

use serde_json::Value;

use crate::embed::DEFAULT_EMBED_STRENGTH;
use crate::error::WatermarkError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_HOP_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    pub secret: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub embed_strength: f64,
    pub hop_size: usize,
}

impl WatermarkOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        WatermarkOptions {
            secret: secret.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            embed_strength: DEFAULT_EMBED_STRENGTH,
            hop_size: DEFAULT_HOP_SIZE,
        }
    }

    pub fn samples_per_bit(&self) -> usize {
        4 * self.hop_size
    }

    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.secret.is_empty() {
            return Err(WatermarkError::InvalidConfig("secret must not be empty".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(WatermarkError::InvalidConfig("sample_rate must be positive".to_string()));
        }
        if self.channels == 0 {
            return Err(WatermarkError::InvalidConfig("channels must be positive".to_string()));
        }
        if self.hop_size == 0 {
            return Err(WatermarkError::InvalidConfig("hop_size must be positive".to_string()));
        }
        if !(self.embed_strength.is_finite() && self.embed_strength > 0.0) {
            return Err(WatermarkError::InvalidConfig("embed_strength must be positive".to_string()));
        }
        Ok(())
    }
}

const KNOWN_KEYS: &[&str] = &["secret", "sample_rate", "channels", "embed_strength", "hop_size"];

impl TryFrom<Value> for WatermarkOptions {
    type Error = WatermarkError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = value
            .as_object()
            .ok_or_else(|| WatermarkError::InvalidConfig("options must be a JSON object".to_string()))?;

        for key in map.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                return Err(WatermarkError::InvalidConfig(format!("unknown option key: {key}")));
            }
        }

        let secret = map
            .get("secret")
            .and_then(Value::as_str)
            .ok_or_else(|| WatermarkError::InvalidConfig("missing required option: secret".to_string()))?
            .to_string();

        let mut options = WatermarkOptions::new(secret);

        if let Some(v) = map.get("sample_rate") {
            options.sample_rate = v
                .as_u64()
                .ok_or_else(|| WatermarkError::InvalidConfig("sample_rate must be an integer".to_string()))?
                as u32;
        }
        if let Some(v) = map.get("channels") {
            options.channels = v
                .as_u64()
                .ok_or_else(|| WatermarkError::InvalidConfig("channels must be an integer".to_string()))?
                as u16;
        }
        if let Some(v) = map.get("hop_size") {
            options.hop_size = v
                .as_u64()
                .ok_or_else(|| WatermarkError::InvalidConfig("hop_size must be an integer".to_string()))?
                as usize;
        }
        if let Some(v) = map.get("embed_strength") {
            options.embed_strength = v
                .as_f64()
                .ok_or_else(|| WatermarkError::InvalidConfig("embed_strength must be a number".to_string()))?;
        }

        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_spec_table() {
        let opts = WatermarkOptions::new("secret");
        assert_eq!(opts.sample_rate, 44100);
        assert_eq!(opts.channels, 2);
        assert_eq!(opts.hop_size, 1024);
        assert_eq!(opts.samples_per_bit(), 4096);
        assert!((opts.embed_strength - 0.007).abs() < 1e-12);
    }

    #[test]
    fn rejects_unknown_keys() {
        let v = json!({ "secret": "s", "typo_field": 1 });
        let result = WatermarkOptions::try_from(v);
        assert!(matches!(result, Err(WatermarkError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_missing_secret() {
        let v = json!({ "sample_rate": 44100 });
        assert!(WatermarkOptions::try_from(v).is_err());
    }

    #[test]
    fn accepts_full_known_set() {
        let v = json!({
            "secret": "s",
            "sample_rate": 48000,
            "channels": 1,
            "embed_strength": 0.01,
            "hop_size": 2048,
        });
        let opts = WatermarkOptions::try_from(v).unwrap();
        assert_eq!(opts.sample_rate, 48000);
        assert_eq!(opts.channels, 1);
        assert_eq!(opts.hop_size, 2048);
    }
}
