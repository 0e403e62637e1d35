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

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// パラメーターエンドポイント - エンジンが公開する数値パラメーター
///
/// `value` is the live value; the bounds and default are fixed by the engine
/// when the resource is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioParam {
    pub value: f32,
    pub default_value: f32,
    pub min_value: f32,
    pub max_value: f32,
}

impl AudioParam {
    pub fn new(default_value: f32, min_value: f32, max_value: f32) -> Self {
        Self {
            value: default_value,
            default_value,
            min_value,
            max_value,
        }
    }

    /// 値の検証
    pub fn validate(&self, value: f32) -> Result<f32, ParameterError> {
        if (self.min_value..=self.max_value).contains(&value) {
            Ok(value)
        } else {
            Err(ParameterError::OutOfRange {
                value,
                min: self.min_value,
                max: self.max_value,
            })
        }
    }

    /// 範囲外の値はクランプされる。NaN は無視。
    pub fn set_value(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.value = value.clamp(self.min_value, self.max_value);
    }

    pub fn try_set_value(&mut self, value: f32) -> Result<(), ParameterError> {
        self.value = self.validate(value)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.value = self.default_value;
    }
}

/// パラメーター名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    Frequency,
    Detune,
    Gain,
    Q,
    PlaybackRate,
}

impl ParamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::Frequency => "frequency",
            ParamName::Detune => "detune",
            ParamName::Gain => "gain",
            ParamName::Q => "Q",
            ParamName::PlaybackRate => "playbackRate",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = ParameterError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "frequency" => Ok(ParamName::Frequency),
            "detune" => Ok(ParamName::Detune),
            "gain" => Ok(ParamName::Gain),
            "Q" | "q" => Ok(ParamName::Q),
            "playbackRate" | "playback_rate" => Ok(ParamName::PlaybackRate),
            _ => Err(ParameterError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// パラメーターエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("Parameter '{name}' not found")]
    NotFound { name: String },

    #[error("Parameter value {value} out of range [{min}, {max}]")]
    OutOfRange { value: f32, min: f32, max: f32 },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

/// パラメーター管理トレイト - ノードのパラメーター操作を統一
pub trait Parameterizable {
    /// このノード種別が持つ数値パラメーター
    fn param_names(&self) -> &'static [ParamName];

    fn param(&self, name: ParamName) -> Option<&AudioParam>;

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam>;

    /// パラメーターを取得
    fn get_parameter(&self, name: &str) -> Result<f32, ParameterError> {
        let param_name = name.parse::<ParamName>()?;
        self.param(param_name)
            .map(|param| param.value)
            .ok_or_else(|| ParameterError::NotFound {
                name: name.to_string(),
            })
    }

    /// パラメーターを設定（範囲外はエラー）
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), ParameterError> {
        let param_name = name.parse::<ParamName>()?;
        match self.param_mut(param_name) {
            Some(param) => param.try_set_value(value),
            None => Err(ParameterError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// 全パラメーターを取得
    fn get_all_parameters(&self) -> HashMap<String, f32> {
        self.param_names()
            .iter()
            .filter_map(|name| self.param(*name).map(|p| (name.to_string(), p.value)))
            .collect()
    }

    fn parameter_names(&self) -> Vec<&'static str> {
        self.param_names().iter().map(ParamName::as_str).collect()
    }

    fn has_parameter(&self, name: &str) -> bool {
        self.get_parameter(name).is_ok()
    }
}
