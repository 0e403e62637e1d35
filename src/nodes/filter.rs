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

use super::oscillator::DETUNE_RANGE;
use crate::parameters::{AudioParam, ParamName, Parameterizable};

/// Upper bound of the filter gain in dB (40 * log10 of the largest f32).
pub const FILTER_GAIN_MAX: f32 = 1541.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiquadFilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Lowshelf,
    Highshelf,
    Peaking,
    Notch,
    Allpass,
}

impl BiquadFilterType {
    /// Whether the `gain` parameter affects this response.
    pub fn uses_gain(&self) -> bool {
        matches!(
            self,
            BiquadFilterType::Lowshelf | BiquadFilterType::Highshelf | BiquadFilterType::Peaking
        )
    }
}

/// バイクアッドフィルター
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiquadFilterProperties {
    pub frequency: AudioParam,
    pub detune: AudioParam,
    #[serde(rename = "Q")]
    pub q: AudioParam,
    pub gain: AudioParam,
    #[serde(rename = "type")]
    pub filter_type: BiquadFilterType,
}

impl BiquadFilterProperties {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frequency: AudioParam::new(350.0, 0.0, sample_rate / 2.0),
            detune: AudioParam::new(0.0, -DETUNE_RANGE, DETUNE_RANGE),
            q: AudioParam::new(1.0, -f32::MAX, f32::MAX),
            gain: AudioParam::new(0.0, -f32::MAX, FILTER_GAIN_MAX),
            filter_type: BiquadFilterType::Lowpass,
        }
    }
}

impl Parameterizable for BiquadFilterProperties {
    fn param_names(&self) -> &'static [ParamName] {
        &[
            ParamName::Frequency,
            ParamName::Detune,
            ParamName::Q,
            ParamName::Gain,
        ]
    }

    fn param(&self, name: ParamName) -> Option<&AudioParam> {
        match name {
            ParamName::Frequency => Some(&self.frequency),
            ParamName::Detune => Some(&self.detune),
            ParamName::Q => Some(&self.q),
            ParamName::Gain => Some(&self.gain),
            ParamName::PlaybackRate => None,
        }
    }

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        match name {
            ParamName::Frequency => Some(&mut self.frequency),
            ParamName::Detune => Some(&mut self.detune),
            ParamName::Q => Some(&mut self.q),
            ParamName::Gain => Some(&mut self.gain),
            ParamName::PlaybackRate => None,
        }
    }
}
