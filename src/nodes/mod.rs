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

//! Graph nodes: identity and metadata wrapped around one engine resource.

pub mod analyser;
pub mod buffer_source;
pub mod filter;
pub mod gain;
pub mod oscillator;

pub use analyser::AnalyserProperties;
pub use buffer_source::BufferSourceProperties;
pub use filter::{BiquadFilterProperties, BiquadFilterType};
pub use gain::GainProperties;
pub use oscillator::{OscillatorProperties, OscillatorType};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::{EngineHandle, ResourceId};
use crate::errors::GraphError;
use crate::graph::ResourceState;
use crate::parameters::{AudioParam, ParamName, ParameterError, Parameterizable};

/// ノードの一意識別子
///
/// Opaque and graph-allocated. It says nothing about the node's kind and is
/// never reused by the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Create from raw ID value
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// ノードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Oscillator,
    Gain,
    BiquadFilter,
    Analyser,
    BufferSource,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Oscillator,
        NodeKind::Gain,
        NodeKind::BiquadFilter,
        NodeKind::Analyser,
        NodeKind::BufferSource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Oscillator => "Oscillator",
            NodeKind::Gain => "Gain",
            NodeKind::BiquadFilter => "BiquadFilter",
            NodeKind::Analyser => "Analyser",
            NodeKind::BufferSource => "BufferSource",
        }
    }

    /// ワンショットリソース（一度 stop すると再スタートできない）
    pub fn is_one_shot(&self) -> bool {
        matches!(self, NodeKind::Oscillator | NodeKind::BufferSource)
    }

    /// Oscillators take modulation on their frequency parameter instead of
    /// an audio input.
    pub fn input_param(&self) -> Option<ParamName> {
        match self {
            NodeKind::Oscillator => Some(ParamName::Frequency),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = GraphError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| GraphError::UnknownNodeKind {
                kind: tag.to_string(),
            })
    }
}

/// GUI 等で使う 2D 座標（コアでは解釈しない）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelCountMode {
    #[default]
    Max,
    ClampedMax,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelInterpretation {
    #[default]
    Speakers,
    Discrete,
}

/// エンジンが決めるチャンネル構成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub number_of_inputs: u32,
    pub number_of_outputs: u32,
    pub channel_count: u32,
    pub channel_count_mode: ChannelCountMode,
    pub channel_interpretation: ChannelInterpretation,
}

impl ChannelConfig {
    /// Default layout for a resource of `kind`; sources have no inputs.
    pub fn for_kind(kind: NodeKind, channel_count: u32) -> Self {
        let number_of_inputs = match kind {
            NodeKind::Oscillator | NodeKind::BufferSource => 0,
            _ => 1,
        };
        Self {
            number_of_inputs,
            number_of_outputs: 1,
            channel_count,
            channel_count_mode: ChannelCountMode::Max,
            channel_interpretation: ChannelInterpretation::Speakers,
        }
    }
}

/// 種類ごとのプロパティ
///
/// Internally tagged with `kind`, so a flattened value yields the wire tag
/// next to the kind-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeProperties {
    Oscillator(OscillatorProperties),
    Gain(GainProperties),
    BiquadFilter(BiquadFilterProperties),
    Analyser(AnalyserProperties),
    BufferSource(BufferSourceProperties),
}

impl NodeProperties {
    /// Engine defaults for a freshly allocated resource of `kind`.
    pub fn defaults(kind: NodeKind, sample_rate: f32) -> Self {
        match kind {
            NodeKind::Oscillator => NodeProperties::Oscillator(OscillatorProperties::new(sample_rate)),
            NodeKind::Gain => NodeProperties::Gain(GainProperties::new()),
            NodeKind::BiquadFilter => {
                NodeProperties::BiquadFilter(BiquadFilterProperties::new(sample_rate))
            }
            NodeKind::Analyser => NodeProperties::Analyser(AnalyserProperties::new()),
            NodeKind::BufferSource => NodeProperties::BufferSource(BufferSourceProperties::new()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeProperties::Oscillator(_) => NodeKind::Oscillator,
            NodeProperties::Gain(_) => NodeKind::Gain,
            NodeProperties::BiquadFilter(_) => NodeKind::BiquadFilter,
            NodeProperties::Analyser(_) => NodeKind::Analyser,
            NodeProperties::BufferSource(_) => NodeKind::BufferSource,
        }
    }

    /// Copies live values from `other` onto `self`, keeping the bounds this
    /// resource was allocated with. Both sides must be the same kind.
    pub fn copy_values_from(&mut self, other: &NodeProperties) -> Result<(), ParameterError> {
        match (self, other) {
            (NodeProperties::Oscillator(dst), NodeProperties::Oscillator(src)) => {
                dst.copy_values_from(src);
            }
            (NodeProperties::Gain(dst), NodeProperties::Gain(src)) => {
                dst.gain.set_value(src.gain.value);
            }
            (NodeProperties::BiquadFilter(dst), NodeProperties::BiquadFilter(src)) => {
                copy_param_values(dst, src);
                dst.filter_type = src.filter_type;
            }
            (NodeProperties::Analyser(dst), NodeProperties::Analyser(src)) => {
                dst.copy_values_from(src)?;
            }
            (NodeProperties::BufferSource(dst), NodeProperties::BufferSource(src)) => {
                dst.copy_values_from(src);
            }
            (dst, src) => {
                return Err(ParameterError::InvalidValue {
                    name: "kind".to_string(),
                    reason: format!("cannot copy {} values onto {}", src.kind(), dst.kind()),
                });
            }
        }
        Ok(())
    }
}

fn copy_param_values<P: Parameterizable>(dst: &mut P, src: &P) {
    for name in src.param_names() {
        if let (Some(value), Some(param)) = (src.param(*name).map(|p| p.value), dst.param_mut(*name)) {
            param.set_value(value);
        }
    }
}

impl Parameterizable for NodeProperties {
    fn param_names(&self) -> &'static [ParamName] {
        match self {
            NodeProperties::Oscillator(p) => p.param_names(),
            NodeProperties::Gain(p) => p.param_names(),
            NodeProperties::BiquadFilter(p) => p.param_names(),
            NodeProperties::Analyser(p) => p.param_names(),
            NodeProperties::BufferSource(p) => p.param_names(),
        }
    }

    fn param(&self, name: ParamName) -> Option<&AudioParam> {
        match self {
            NodeProperties::Oscillator(p) => p.param(name),
            NodeProperties::Gain(p) => p.param(name),
            NodeProperties::BiquadFilter(p) => p.param(name),
            NodeProperties::Analyser(p) => p.param(name),
            NodeProperties::BufferSource(p) => p.param(name),
        }
    }

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        match self {
            NodeProperties::Oscillator(p) => p.param_mut(name),
            NodeProperties::Gain(p) => p.param_mut(name),
            NodeProperties::BiquadFilter(p) => p.param_mut(name),
            NodeProperties::Analyser(p) => p.param_mut(name),
            NodeProperties::BufferSource(p) => p.param_mut(name),
        }
    }
}

/// グラフノード - エンジンリソースのハンドルとメタデータ
///
/// Only [`crate::graph::AudioGraph`] creates these. `kind` and `uuid` are
/// fixed for the node's life (parsing a document overwrites `uuid` once,
/// right after creation). `connected` and `has_input` are maintained by the
/// graph's connection operations.
pub struct GraphNode {
    id: NodeId,
    uuid: Uuid,
    kind: NodeKind,
    position: Position,
    connected: bool,
    has_input: bool,
    state: ResourceState,
    handle: Box<dyn EngineHandle>,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, handle: Box<dyn EngineHandle>, position: Position) -> Self {
        let kind = handle.kind();
        Self {
            id,
            uuid: Uuid::new_v4(),
            kind,
            position,
            connected: false,
            has_input: false,
            state: ResourceState::Idle,
            handle,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub(crate) fn set_uuid(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// true iff the node currently has at least one outgoing edge
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// true once the node has been the destination of any connect
    pub fn has_input(&self) -> bool {
        self.has_input
    }

    pub(crate) fn mark_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub(crate) fn mark_has_input(&mut self) {
        self.has_input = true;
    }

    /// Meaningful for one-shot kinds only; always false otherwise.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ResourceState) {
        self.state = state;
    }

    pub fn resource_id(&self) -> ResourceId {
        self.handle.resource_id()
    }

    pub fn channel_config(&self) -> ChannelConfig {
        self.handle.channel_config()
    }

    pub fn properties(&self) -> &NodeProperties {
        self.handle.properties()
    }

    pub(crate) fn handle_mut(&mut self) -> &mut dyn EngineHandle {
        self.handle.as_mut()
    }

    pub fn oscillator(&self) -> Option<&OscillatorProperties> {
        match self.handle.properties() {
            NodeProperties::Oscillator(p) => Some(p),
            _ => None,
        }
    }

    pub fn oscillator_mut(&mut self) -> Option<&mut OscillatorProperties> {
        match self.handle.properties_mut() {
            NodeProperties::Oscillator(p) => Some(p),
            _ => None,
        }
    }

    pub fn gain(&self) -> Option<&GainProperties> {
        match self.handle.properties() {
            NodeProperties::Gain(p) => Some(p),
            _ => None,
        }
    }

    pub fn gain_mut(&mut self) -> Option<&mut GainProperties> {
        match self.handle.properties_mut() {
            NodeProperties::Gain(p) => Some(p),
            _ => None,
        }
    }

    pub fn biquad_filter(&self) -> Option<&BiquadFilterProperties> {
        match self.handle.properties() {
            NodeProperties::BiquadFilter(p) => Some(p),
            _ => None,
        }
    }

    pub fn biquad_filter_mut(&mut self) -> Option<&mut BiquadFilterProperties> {
        match self.handle.properties_mut() {
            NodeProperties::BiquadFilter(p) => Some(p),
            _ => None,
        }
    }

    pub fn analyser(&self) -> Option<&AnalyserProperties> {
        match self.handle.properties() {
            NodeProperties::Analyser(p) => Some(p),
            _ => None,
        }
    }

    pub fn analyser_mut(&mut self) -> Option<&mut AnalyserProperties> {
        match self.handle.properties_mut() {
            NodeProperties::Analyser(p) => Some(p),
            _ => None,
        }
    }

    pub fn buffer_source(&self) -> Option<&BufferSourceProperties> {
        match self.handle.properties() {
            NodeProperties::BufferSource(p) => Some(p),
            _ => None,
        }
    }

    pub fn buffer_source_mut(&mut self) -> Option<&mut BufferSourceProperties> {
        match self.handle.properties_mut() {
            NodeProperties::BufferSource(p) => Some(p),
            _ => None,
        }
    }

    /// Copies kind-specific values from `properties` onto this node.
    pub(crate) fn apply_properties(&mut self, properties: &NodeProperties) -> Result<(), ParameterError> {
        self.handle.properties_mut().copy_values_from(properties)
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("connected", &self.connected)
            .field("has_input", &self.has_input)
            .field("state", &self.state)
            .field("resource", &self.handle.resource_id())
            .finish()
    }
}

impl Parameterizable for GraphNode {
    fn param_names(&self) -> &'static [ParamName] {
        self.handle.properties().param_names()
    }

    fn param(&self, name: ParamName) -> Option<&AudioParam> {
        self.handle.properties().param(name)
    }

    fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        self.handle.properties_mut().param_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_parsing() {
        assert_eq!("BiquadFilter".parse::<NodeKind>().unwrap(), NodeKind::BiquadFilter);
        match "OscillatorNode".parse::<NodeKind>() {
            Err(GraphError::UnknownNodeKind { kind }) => assert_eq!(kind, "OscillatorNode"),
            other => panic!("Expected UnknownNodeKind, got {:?}", other),
        }
    }

    #[test]
    fn test_one_shot_kinds() {
        assert!(NodeKind::Oscillator.is_one_shot());
        assert!(NodeKind::BufferSource.is_one_shot());
        assert!(!NodeKind::Gain.is_one_shot());
        assert_eq!(NodeKind::Oscillator.input_param(), Some(ParamName::Frequency));
        assert_eq!(NodeKind::Analyser.input_param(), None);
    }

    #[test]
    fn test_properties_tagged_with_kind() {
        let props = NodeProperties::defaults(NodeKind::Gain, 48000.0);
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json["kind"], "Gain");
        assert_eq!(json["gain"]["defaultValue"], 1.0);
    }

    #[test]
    fn test_copy_between_kinds_fails() {
        let mut gain = NodeProperties::defaults(NodeKind::Gain, 48000.0);
        let osc = NodeProperties::defaults(NodeKind::Oscillator, 48000.0);
        assert!(gain.copy_values_from(&osc).is_err());
    }

    #[test]
    fn test_copy_keeps_bounds() {
        let mut low_rate = NodeProperties::defaults(NodeKind::BiquadFilter, 8000.0);
        let mut high_rate = NodeProperties::defaults(NodeKind::BiquadFilter, 96000.0);
        if let NodeProperties::BiquadFilter(filter) = &mut high_rate {
            filter.frequency.value = 10000.0;
            filter.filter_type = BiquadFilterType::Notch;
        }

        low_rate.copy_values_from(&high_rate).unwrap();
        match low_rate {
            NodeProperties::BiquadFilter(filter) => {
                assert_eq!(filter.frequency.value, 4000.0);
                assert_eq!(filter.frequency.max_value, 4000.0);
                assert_eq!(filter.filter_type, BiquadFilterType::Notch);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_channel_config_for_sources() {
        let osc = ChannelConfig::for_kind(NodeKind::Oscillator, 2);
        assert_eq!(osc.number_of_inputs, 0);
        assert_eq!(osc.number_of_outputs, 1);
        let json = serde_json::to_value(ChannelConfig::for_kind(NodeKind::Gain, 2)).unwrap();
        assert_eq!(json["channelCountMode"], "max");
        assert_eq!(json["channelInterpretation"], "speakers");
    }
}
