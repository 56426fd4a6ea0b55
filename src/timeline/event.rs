use serde::{Deserialize, Deserializer, Serialize};

/// Kind of discrete performance event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A percussion hit
    DrumHit,
    /// An on/off control change
    Toggle,
}

/// What happened, independent of when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Instrument or control identifier (e.g. "snare")
    pub identifier: String,

    /// Strength of the event (0.0 to 1.0)
    #[serde(deserialize_with = "deserialize_intensity")]
    pub intensity: f32,

    /// Sample the event played, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

impl EventPayload {
    pub fn new(identifier: impl Into<String>, intensity: f32) -> Self {
        Self {
            identifier: identifier.into(),
            intensity: clamp_intensity(intensity),
            sample: None,
        }
    }

    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.sample = Some(sample.into());
        self
    }
}

/// A payload stamped with its offset from the start of recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: EventKind,

    /// Seconds since recording started
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: f64,

    #[serde(flatten)]
    pub payload: EventPayload,
}

impl TimelineEvent {
    pub fn new(kind: EventKind, timestamp: f64, payload: EventPayload) -> Self {
        Self {
            kind,
            timestamp,
            payload,
        }
    }
}

fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    }
}

fn deserialize_intensity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    f32::deserialize(deserializer).map(clamp_intensity)
}

/// Stored timestamps must be finite and non-negative
fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let timestamp = f64::deserialize(deserializer)?;
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "timestamp {} is not a non-negative offset",
            timestamp
        )));
    }
    Ok(timestamp)
}
