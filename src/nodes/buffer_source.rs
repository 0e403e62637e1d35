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

/// One-shot sample playback resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSourceProperties {
    pub playback_rate: AudioParam,
    pub detune: AudioParam,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub loop_start: f32,
    pub loop_end: f32,
}

impl BufferSourceProperties {
    pub fn new() -> Self {
        Self {
            playback_rate: AudioParam::new(1.0, -f32::MAX, f32::MAX),
            detune: AudioParam::new(0.0, -DETUNE_RANGE, DETUNE_RANGE),
            looping: false,
            loop_start: 0.0,
            loop_end: 0.0,
        }
    }

    pub fn copy_values_from(&mut self, other: &BufferSourceProperties) {
        self.playback_rate.set_value(other.playback_rate.value);
        self.detune.set_value(other.detune.value);
        self.looping = other.looping;
        self.loop_start = other.loop_start.max(0.0);
        self.loop_end = other.loop_end.max(0.0);
    }
}

impl Default for BufferSourceProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameterizable for BufferSourceProperties {
    fn param_names(&self) -> &'static [ParamName] {
        &[ParamName::PlaybackRate, ParamName::Detune]
    }

    fn param(&self, name: ParamName) -> Option<&AudioParam> {
        match name {
            ParamName::PlaybackRate => Some(&self.playback_rate),
            ParamName::Detune => Some(&self.detune),
            _ => None,
        }
    }

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        match name {
            ParamName::PlaybackRate => Some(&mut self.playback_rate),
            ParamName::Detune => Some(&mut self.detune),
            _ => None,
        }
    }
}
