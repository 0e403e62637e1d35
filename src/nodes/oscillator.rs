/*
 * OrbitalModulator - Professional Modular Synthesizer
 * Copyright (c) 2025 MACHIKO LAB
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

use serde::{Deserialize, Serialize};

use crate::parameters::{AudioParam, ParamName, Parameterizable};

/// Detune range in cents shared by every detunable resource.
pub const DETUNE_RANGE: f32 = 153_600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OscillatorType {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Custom,
}

/// Oscillator resource state as exposed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorProperties {
    pub frequency: AudioParam,
    pub detune: AudioParam,
    #[serde(rename = "type")]
    pub oscillator_type: OscillatorType,
}

impl OscillatorProperties {
    pub fn new(sample_rate: f32) -> Self {
        let nyquist = sample_rate / 2.0;
        Self {
            frequency: AudioParam::new(440.0, -nyquist, nyquist),
            detune: AudioParam::new(0.0, -DETUNE_RANGE, DETUNE_RANGE),
            oscillator_type: OscillatorType::Sine,
        }
    }

    /// Copies the live values of `other` while keeping this resource's bounds.
    pub fn copy_values_from(&mut self, other: &OscillatorProperties) {
        self.frequency.set_value(other.frequency.value);
        self.detune.set_value(other.detune.value);
        self.oscillator_type = other.oscillator_type;
    }
}

impl Parameterizable for OscillatorProperties {
    fn param_names(&self) -> &'static [ParamName] {
        &[ParamName::Frequency, ParamName::Detune]
    }

    fn param(&self, name: ParamName) -> Option<&AudioParam> {
        match name {
            ParamName::Frequency => Some(&self.frequency),
            ParamName::Detune => Some(&self.detune),
            _ => None,
        }
    }

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        match name {
            ParamName::Frequency => Some(&mut self.frequency),
            ParamName::Detune => Some(&mut self.detune),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oscillator_defaults() {
        let osc = OscillatorProperties::new(48000.0);
        assert_eq!(osc.frequency.value, 440.0);
        assert_eq!(osc.frequency.max_value, 24000.0);
        assert_eq!(osc.frequency.min_value, -24000.0);
        assert_eq!(osc.detune.value, 0.0);
        assert_eq!(osc.oscillator_type, OscillatorType::Sine);
    }

    #[test]
    fn test_oscillator_parameters() {
        let mut osc = OscillatorProperties::new(44100.0);

        assert!(osc.set_parameter("frequency", 880.0).is_ok());
        assert_eq!(osc.get_parameter("frequency").unwrap(), 880.0);

        // ナイキスト周波数を超える値はエラー
        assert!(osc.set_parameter("frequency", 30000.0).is_err());
        assert!(osc.set_parameter("gain", 1.0).is_err());
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_value(OscillatorType::Sawtooth).unwrap();
        assert_eq!(json, serde_json::json!("sawtooth"));
    }
}
