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

pub mod audio;
pub mod config;
pub mod errors;
pub mod graph;
pub mod nodes;
pub mod parameters;
pub mod serialization;

pub use audio::{AudioEngine, ConnectTarget, EngineError, EngineHandle, EngineLog, RecordingEngine, ResourceId};
pub use config::{ConfigError, EngineConfig, GraphConfig, LoggingConfig};
pub use errors::{Endpoint, GraphError, GraphResult};
pub use graph::{AudioGraph, Reachable, ResourceState};
pub use nodes::{ChannelConfig, GraphNode, NodeId, NodeKind, NodeProperties, Position};
pub use parameters::{AudioParam, ParamName, Parameterizable, ParameterError};
pub use serialization::NodeSnapshot;
