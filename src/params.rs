//! Accumulation parameters and the JSON parameter store.
//!
//! Every field must be present. Enum fields take either the numeric id used
//! by existing launch files or the variant name, so both
//! `"decay_function": 2` and `"decay_function": "EXPONENTIAL"` load.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayFunction {
    None,
    Linear,
    Exponential,
    Step,
}

impl DecayFunction {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::None),
            1 => Some(Self::Linear),
            2 => Some(Self::Exponential),
            3 => Some(Self::Step),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "LINEAR" => Some(Self::Linear),
            "EXPONENTIAL" => Some(Self::Exponential),
            "STEP" => Some(Self::Step),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceMethod {
    Time,
    Number,
}

impl SliceMethod {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::Time),
            1 => Some(Self::Number),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "TIME" => Some(Self::Time),
            "NUMBER" | "COUNT" => Some(Self::Number),
            _ => None,
        }
    }
}

/// Immutable configuration shared by the slicer and the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationParams {
    pub event_contribution: f32,
    /// Slope (potential per second) for LINEAR, tau in microseconds for
    /// EXPONENTIAL, hold time in microseconds for STEP.
    pub decay_param: f64,
    pub min_potential: f32,
    pub max_potential: f32,
    pub neutral_potential: f32,
    pub rectify_polarity: bool,
    pub synchronous_decay: bool,
    pub decay_function: DecayFunction,
    pub slice_method: SliceMethod,
    /// Window length in microseconds.
    pub accumulation_time: i64,
    pub accumulation_number: usize,
}

impl Default for AccumulationParams {
    fn default() -> Self {
        Self {
            event_contribution: 0.15,
            decay_param: 1e6,
            min_potential: 0.0,
            max_potential: 1.0,
            neutral_potential: 0.0,
            rectify_polarity: false,
            synchronous_decay: false,
            decay_function: DecayFunction::Exponential,
            slice_method: SliceMethod::Time,
            accumulation_time: 33_000,
            accumulation_number: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnumValue {
    Id(i64),
    Name(String),
}

impl EnumValue {
    fn describe(&self) -> String {
        match self {
            EnumValue::Id(id) => id.to_string(),
            EnumValue::Name(name) => name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawParams {
    accumulation_time: i64,
    accumulation_number: i64,
    synchronous_decay: bool,
    min_potential: f32,
    max_potential: f32,
    neutral_potential: f32,
    event_contribution: f32,
    rectify_polarity: bool,
    decay_param: f64,
    slice_method: EnumValue,
    decay_function: EnumValue,
}

impl TryFrom<RawParams> for AccumulationParams {
    type Error = ConfigError;

    fn try_from(raw: RawParams) -> Result<Self, Self::Error> {
        let decay_function = match &raw.decay_function {
            EnumValue::Id(id) => DecayFunction::from_id(*id),
            EnumValue::Name(name) => DecayFunction::from_name(name),
        }
        .ok_or_else(|| ConfigError::UnknownVariant {
            field: "decay_function",
            value: raw.decay_function.describe(),
        })?;

        let slice_method = match &raw.slice_method {
            EnumValue::Id(id) => SliceMethod::from_id(*id),
            EnumValue::Name(name) => SliceMethod::from_name(name),
        }
        .ok_or_else(|| ConfigError::UnknownVariant {
            field: "slice_method",
            value: raw.slice_method.describe(),
        })?;

        let accumulation_number =
            usize::try_from(raw.accumulation_number).map_err(|_| ConfigError::Invalid {
                field: "accumulation_number",
                reason: format!("{} is negative", raw.accumulation_number),
            })?;

        let params = AccumulationParams {
            event_contribution: raw.event_contribution,
            decay_param: raw.decay_param,
            min_potential: raw.min_potential,
            max_potential: raw.max_potential,
            neutral_potential: raw.neutral_potential,
            rectify_polarity: raw.rectify_polarity,
            synchronous_decay: raw.synchronous_decay,
            decay_function,
            slice_method,
            accumulation_time: raw.accumulation_time,
            accumulation_number,
        };
        params.validate()?;
        Ok(params)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

impl AccumulationParams {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawParams = serde_json::from_str(json)?;
        raw.try_into()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check the invariants the decay model and the slicer rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("event_contribution", self.event_contribution),
            ("min_potential", self.min_potential),
            ("max_potential", self.max_potential),
            ("neutral_potential", self.neutral_potential),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, format!("{value} is not finite")));
            }
        }
        if !self.decay_param.is_finite() {
            return Err(invalid("decay_param", format!("{} is not finite", self.decay_param)));
        }
        if self.min_potential >= self.max_potential {
            return Err(invalid(
                "max_potential",
                format!("{} must exceed min_potential {}", self.max_potential, self.min_potential),
            ));
        }
        if !(self.min_potential..=self.max_potential).contains(&self.neutral_potential) {
            return Err(invalid(
                "neutral_potential",
                format!(
                    "{} outside [{}, {}]",
                    self.neutral_potential, self.min_potential, self.max_potential
                ),
            ));
        }
        if self.decay_function != DecayFunction::None && self.decay_param <= 0.0 {
            return Err(invalid("decay_param", "must be positive for a decaying function"));
        }
        match self.slice_method {
            SliceMethod::Time if self.accumulation_time <= 0 => {
                Err(invalid("accumulation_time", "must be positive"))
            }
            SliceMethod::Number if self.accumulation_number == 0 => {
                Err(invalid("accumulation_number", "must be positive"))
            }
            _ => Ok(()),
        }
    }

    pub fn log_summary(&self) {
        info!("-------- Parameters --------");
        info!("accumulation_time: {}us", self.accumulation_time);
        info!("accumulation_number: {}", self.accumulation_number);
        info!("synchronous_decay: {}", self.synchronous_decay);
        info!("min_potential: {}", self.min_potential);
        info!("max_potential: {}", self.max_potential);
        info!("neutral_potential: {}", self.neutral_potential);
        info!("event_contribution: {}", self.event_contribution);
        info!("rectify_polarity: {}", self.rectify_polarity);
        info!("decay_param: {}", self.decay_param);
        info!("slice_method: {:?}", self.slice_method);
        info!("decay_function: {:?}", self.decay_function);
    }
}
