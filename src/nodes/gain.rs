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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainProperties {
    pub gain: AudioParam,
}

impl GainProperties {
    pub fn new() -> Self {
        Self {
            gain: AudioParam::new(1.0, -f32::MAX, f32::MAX),
        }
    }
}

impl Default for GainProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameterizable for GainProperties {
    fn param_names(&self) -> &'static [ParamName] {
        &[ParamName::Gain]
    }

    fn param(&self, name: ParamName) -> Option<&AudioParam> {
        match name {
            ParamName::Gain => Some(&self.gain),
            _ => None,
        }
    }

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        match name {
            ParamName::Gain => Some(&mut self.gain),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_parameter() {
        let mut gain = GainProperties::new();
        assert_eq!(gain.get_parameter("gain").unwrap(), 1.0);
        assert!(gain.set_parameter("gain", 0.25).is_ok());
        assert_eq!(gain.gain.value, 0.25);
        assert_eq!(gain.param_names(), &[ParamName::Gain]);
    }
}
