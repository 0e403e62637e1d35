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

//! Engine boundary
//!
//! The synthesis engine allocates and renders resources; the graph only
//! issues commands to it. Commands are synchronous and fire-and-forget:
//! `connect` and `disconnect` return nothing to inspect.

mod recording;

pub use recording::{EngineCommand, EngineLog, RecordingEngine};

use std::fmt;

use thiserror::Error;

use crate::nodes::{ChannelConfig, NodeKind, NodeProperties};
use crate::parameters::ParamName;

/// エンジンリソースの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// 接続先: リソースの主入力か、パラメーターエンドポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectTarget {
    Input(ResourceId),
    Param(ResourceId, ParamName),
}

impl ConnectTarget {
    pub fn resource(&self) -> ResourceId {
        match self {
            ConnectTarget::Input(resource) | ConnectTarget::Param(resource, _) => *resource,
        }
    }
}

/// エンジンエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Failed to allocate {kind} resource: {reason}")]
    AllocationFailed { kind: NodeKind, reason: String },

    /// ワンショットの制約違反など
    #[error("Invalid state for {resource}: {reason}")]
    InvalidState { resource: ResourceId, reason: String },

    #[error("{resource} ({kind}) does not support {operation}")]
    Unsupported {
        resource: ResourceId,
        kind: NodeKind,
        operation: &'static str,
    },
}

impl EngineError {
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            EngineError::AllocationFailed { .. } => None,
            EngineError::InvalidState { resource, .. } | EngineError::Unsupported { resource, .. } => {
                Some(*resource)
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// エンジンが返すリソースハンドル
///
/// The handle owns the resource's parameter endpoints. `start` and `stop`
/// apply to one-shot kinds and may each succeed at most once per handle.
pub trait EngineHandle {
    fn resource_id(&self) -> ResourceId;

    fn kind(&self) -> NodeKind;

    fn properties(&self) -> &NodeProperties;

    fn properties_mut(&mut self) -> &mut NodeProperties;

    fn channel_config(&self) -> ChannelConfig;

    fn connect(&mut self, target: ConnectTarget);

    /// Severs every outgoing connection of this resource.
    fn disconnect(&mut self);

    fn start(&mut self) -> EngineResult<()>;

    fn stop(&mut self) -> EngineResult<()>;
}

/// エンジンのファクトリープリミティブ
pub trait AudioEngine {
    fn create_oscillator(&mut self) -> EngineResult<Box<dyn EngineHandle>>;

    fn create_gain(&mut self) -> EngineResult<Box<dyn EngineHandle>>;

    fn create_biquad_filter(&mut self) -> EngineResult<Box<dyn EngineHandle>>;

    fn create_analyser(&mut self) -> EngineResult<Box<dyn EngineHandle>>;

    fn create_buffer_source(&mut self) -> EngineResult<Box<dyn EngineHandle>>;

    fn create(&mut self, kind: NodeKind) -> EngineResult<Box<dyn EngineHandle>> {
        match kind {
            NodeKind::Oscillator => self.create_oscillator(),
            NodeKind::Gain => self.create_gain(),
            NodeKind::BiquadFilter => self.create_biquad_filter(),
            NodeKind::Analyser => self.create_analyser(),
            NodeKind::BufferSource => self.create_buffer_source(),
        }
    }
}
