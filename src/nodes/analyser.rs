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

use crate::parameters::{AudioParam, ParamName, ParameterError, Parameterizable};

pub const MIN_FFT_SIZE: u32 = 32;
pub const MAX_FFT_SIZE: u32 = 32768;

/// アナライザー設定
///
/// None of these are automatable, so they are plain fields rather than
/// [`AudioParam`]s. Setters enforce the engine's validity rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyserProperties {
    fft_size: u32,
    min_decibels: f32,
    max_decibels: f32,
    smoothing_time_constant: f32,
}

impl AnalyserProperties {
    pub fn new() -> Self {
        Self {
            fft_size: 2048,
            min_decibels: -100.0,
            max_decibels: -30.0,
            smoothing_time_constant: 0.8,
        }
    }

    pub fn fft_size(&self) -> u32 {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> u32 {
        self.fft_size / 2
    }

    pub fn min_decibels(&self) -> f32 {
        self.min_decibels
    }

    pub fn max_decibels(&self) -> f32 {
        self.max_decibels
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.smoothing_time_constant
    }

    /// FFT サイズは 32..=32768 の 2 のべき乗
    pub fn set_fft_size(&mut self, fft_size: u32) -> Result<(), ParameterError> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(ParameterError::InvalidValue {
                name: "fftSize".to_string(),
                reason: format!(
                    "{} is not a power of two in [{}, {}]",
                    fft_size, MIN_FFT_SIZE, MAX_FFT_SIZE
                ),
            });
        }
        self.fft_size = fft_size;
        Ok(())
    }

    pub fn set_decibel_range(&mut self, min: f32, max: f32) -> Result<(), ParameterError> {
        if !(min < max) {
            return Err(ParameterError::InvalidValue {
                name: "minDecibels".to_string(),
                reason: format!("minDecibels {} must be below maxDecibels {}", min, max),
            });
        }
        self.min_decibels = min;
        self.max_decibels = max;
        Ok(())
    }

    pub fn set_smoothing_time_constant(&mut self, value: f32) -> Result<(), ParameterError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ParameterError::OutOfRange {
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        self.smoothing_time_constant = value;
        Ok(())
    }

    /// Applies every field of `other`, validating as a whole.
    pub fn copy_values_from(&mut self, other: &AnalyserProperties) -> Result<(), ParameterError> {
        let mut next = self.clone();
        next.set_fft_size(other.fft_size)?;
        next.set_decibel_range(other.min_decibels, other.max_decibels)?;
        next.set_smoothing_time_constant(other.smoothing_time_constant)?;
        *self = next;
        Ok(())
    }
}

impl Default for AnalyserProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameterizable for AnalyserProperties {
    fn param_names(&self) -> &'static [ParamName] {
        &[]
    }

    fn param(&self, _name: ParamName) -> Option<&AudioParam> {
        None
    }

    fn param_mut(&mut self, _name: ParamName) -> Option<&mut AudioParam> {
        None
    }
}
