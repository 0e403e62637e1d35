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

//! Node snapshots
//!
//! A node serializes to a flat JSON document:
//!
//! ```json
//! {
//!   "kind": "Gain",
//!   "position": { "x": 0.0, "y": 0.0 },
//!   "uuid": "8d5c7c3e-4f0b-4f51-9a0e-6f1f3f3f1a2b",
//!   "connected": false,
//!   "hasInput": false,
//!   "numberOfInputs": 1,
//!   "numberOfOutputs": 1,
//!   "channelCount": 2,
//!   "channelCountMode": "max",
//!   "channelInterpretation": "speakers",
//!   "gain": { "value": 1.0, "defaultValue": 1.0, "minValue": -3.4e38, "maxValue": 3.4e38 }
//! }
//! ```
//!
//! Edges are not part of a snapshot. Parsing restores position, uuid and the
//! kind fields onto a freshly allocated node; channel layout and the
//! connection flags come from the engine and the graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{GraphError, GraphResult};
use crate::graph::AudioGraph;
use crate::nodes::{ChannelConfig, GraphNode, NodeId, NodeKind, NodeProperties, Position};

/// シリアライズ用スナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub position: Position,
    pub uuid: Uuid,
    pub connected: bool,
    pub has_input: bool,
    #[serde(flatten)]
    pub channels: ChannelConfig,
    #[serde(flatten)]
    pub properties: NodeProperties,
}

impl NodeSnapshot {
    pub fn kind(&self) -> NodeKind {
        self.properties.kind()
    }
}

/// The subset of a document that parsing applies.
#[derive(Debug, Deserialize)]
struct NodeDocument {
    #[serde(default)]
    position: Position,
    #[serde(default)]
    uuid: Option<Uuid>,
    #[serde(flatten)]
    properties: NodeProperties,
}

impl GraphNode {
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            position: self.position(),
            uuid: self.uuid(),
            connected: self.is_connected(),
            has_input: self.has_input(),
            channels: self.channel_config(),
            properties: self.properties().clone(),
        }
    }

    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

fn kind_tag(document: &Value) -> GraphResult<NodeKind> {
    match document.get("kind") {
        Some(Value::String(tag)) => tag.parse(),
        Some(other) => Err(GraphError::invalid_document(&format!(
            "kind must be a string, got {}",
            other
        ))),
        None => Err(GraphError::invalid_document("missing kind")),
    }
}

impl AudioGraph {
    /// Creates a node from a JSON document produced by [`GraphNode::to_json`].
    ///
    /// The new node gets the document's position, uuid and kind fields, an
    /// empty edge list and cleared connection flags. A missing uuid keeps the
    /// freshly assigned one. Nothing is inserted if parsing fails.
    ///
    /// Re-serializing the parsed node reproduces the document for every field
    /// except `connected` and `hasInput`, which always come back `false`
    /// since edges are not part of a snapshot.
    pub fn parse_json(&mut self, json: &str) -> GraphResult<NodeId> {
        let document: Value = serde_json::from_str(json)?;
        let kind = kind_tag(&document)?;
        let document: NodeDocument = serde_json::from_value(document)?;
        debug_assert_eq!(document.properties.kind(), kind);

        self.restore_parts(document.position, document.uuid, &document.properties)
    }

    /// Creates a node carrying the snapshot's position, uuid and kind fields.
    pub fn restore(&mut self, snapshot: &NodeSnapshot) -> GraphResult<NodeId> {
        self.restore_parts(snapshot.position, Some(snapshot.uuid), &snapshot.properties)
    }

    fn restore_parts(
        &mut self,
        position: Position,
        uuid: Option<Uuid>,
        properties: &NodeProperties,
    ) -> GraphResult<NodeId> {
        let mut node = self.build_node(properties.kind(), position)?;
        node.apply_properties(properties)?;
        if let Some(uuid) = uuid {
            node.set_uuid(uuid);
        }

        let uuid = node.uuid();
        let id = self.add_node(node)?;
        debug!(node = %id, %uuid, kind = %properties.kind(), "restored node");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingEngine;
    use crate::nodes::{BiquadFilterType, OscillatorType};
    use crate::parameters::Parameterizable;

    fn graph() -> AudioGraph {
        AudioGraph::with_engine(RecordingEngine::default())
    }

    #[test]
    fn test_round_trip_every_kind() {
        let mut graph = graph();
        for kind in NodeKind::ALL {
            let id = graph.create_node(kind, Some(Position::new(12.5, -3.0))).unwrap();
            let json = graph.node(id).unwrap().to_json().unwrap();

            let parsed = graph.parse_json(&json).unwrap();
            assert_ne!(parsed, id);
            let node = graph.node(parsed).unwrap();
            assert_eq!(node.kind(), kind);
            assert_eq!(node.to_json().unwrap(), json);
        }
    }

    #[test]
    fn test_round_trip_keeps_mutated_values() {
        let mut graph = graph();
        let osc = graph.create_oscillator(None).unwrap();
        {
            let props = graph.node_mut(osc).unwrap().oscillator_mut().unwrap();
            props.frequency.value = 666.0;
            props.detune.value = -50.0;
            props.oscillator_type = OscillatorType::Triangle;
        }
        let filter = graph.create_biquad_filter(None).unwrap();
        {
            let node = graph.node_mut(filter).unwrap();
            node.set_parameter("Q", 12.0).unwrap();
            node.biquad_filter_mut().unwrap().filter_type = BiquadFilterType::Highshelf;
        }
        let analyser = graph.create_analyser(None).unwrap();
        graph
            .node_mut(analyser)
            .unwrap()
            .analyser_mut()
            .unwrap()
            .set_fft_size(512)
            .unwrap();

        for id in [osc, filter, analyser] {
            let snapshot = graph.node(id).unwrap().snapshot();
            let json = graph.node(id).unwrap().to_string();
            let parsed = graph.parse_json(&json).unwrap();
            assert_eq!(graph.node(parsed).unwrap().snapshot(), snapshot);
        }

        let copy = graph.find_by_uuid(graph.node(osc).unwrap().uuid());
        assert_eq!(copy, Some(osc));
    }

    #[test]
    fn test_wire_field_names() {
        let mut graph = graph();
        let filter = graph.create_biquad_filter(Some(Position::new(1.0, 2.0))).unwrap();
        let json: Value = serde_json::from_str(&graph.node(filter).unwrap().to_json().unwrap()).unwrap();

        assert_eq!(json["kind"], "BiquadFilter");
        assert_eq!(json["position"]["x"], 1.0);
        assert_eq!(json["position"]["y"], 2.0);
        assert_eq!(json["connected"], false);
        assert_eq!(json["hasInput"], false);
        assert_eq!(json["numberOfInputs"], 1);
        assert_eq!(json["channelCountMode"], "max");
        assert_eq!(json["type"], "lowpass");
        assert_eq!(json["Q"]["defaultValue"], 1.0);
        assert_eq!(json["frequency"]["value"], 350.0);
        assert_eq!(json["frequency"]["maxValue"], 24000.0);
        assert_eq!(
            json["uuid"].as_str().unwrap(),
            graph.node(filter).unwrap().uuid().to_string()
        );
    }

    #[test]
    fn test_parsed_node_starts_unconnected() {
        let mut graph = graph();
        let a = graph.create_gain(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        graph.connect(a, b).unwrap();

        let snapshot = graph.node(a).unwrap().snapshot();
        assert!(snapshot.connected);

        let parsed = graph.restore(&snapshot).unwrap();
        let node = graph.node(parsed).unwrap();
        assert!(!node.is_connected());
        assert!(!node.has_input());
        assert!(graph.edges(parsed).unwrap().is_empty());
        assert_eq!(node.uuid(), snapshot.uuid);

        // b は入力を受けているので、JSON 経由でも両フラグだけが落ちる
        let snapshot = graph.node(b).unwrap().snapshot();
        assert!(snapshot.has_input);
        let json = graph.node(b).unwrap().to_json().unwrap();
        let reparsed = graph.parse_json(&json).unwrap();
        let expected = NodeSnapshot {
            connected: false,
            has_input: false,
            ..snapshot
        };
        assert_eq!(graph.node(reparsed).unwrap().snapshot(), expected);
    }

    #[test]
    fn test_minimal_document() {
        let mut graph = graph();
        let id = graph
            .parse_json(
                r#"{
                    "kind": "Gain",
                    "gain": { "value": 0.25, "defaultValue": 1.0, "minValue": -1.0, "maxValue": 1.0 }
                }"#,
            )
            .unwrap();

        let node = graph.node(id).unwrap();
        assert_eq!(node.position(), Position::default());
        assert!(!node.uuid().is_nil());
        assert_eq!(node.get_parameter("gain").unwrap(), 0.25);
        // 範囲はエンジンが決める
        assert_eq!(node.gain().unwrap().gain.max_value, f32::MAX);
    }

    #[test]
    fn test_rejected_documents() {
        let mut graph = graph();

        match graph.parse_json(r#"{"kind": "Reverb", "position": {"x": 0, "y": 0}}"#) {
            Err(GraphError::UnknownNodeKind { kind }) => assert_eq!(kind, "Reverb"),
            other => panic!("Expected UnknownNodeKind, got {:?}", other),
        }
        assert!(matches!(
            graph.parse_json(r#"{"position": {"x": 0, "y": 0}}"#),
            Err(GraphError::InvalidDocument { .. })
        ));
        assert!(matches!(
            graph.parse_json(r#"{"kind": 3}"#),
            Err(GraphError::InvalidDocument { .. })
        ));
        assert!(matches!(graph.parse_json("{\"kind\":"), Err(GraphError::Json(_))));
        // gain フィールドが欠けている
        assert!(matches!(graph.parse_json(r#"{"kind": "Gain"}"#), Err(GraphError::Json(_))));

        assert!(graph.is_empty());
    }

    #[test]
    fn test_invalid_analyser_values_rejected() {
        let mut graph = graph();
        let analyser = graph.create_analyser(None).unwrap();
        let mut json: Value =
            serde_json::from_str(&graph.node(analyser).unwrap().to_json().unwrap()).unwrap();
        json["fftSize"] = serde_json::json!(1000);

        assert!(matches!(
            graph.parse_json(&json.to_string()),
            Err(GraphError::Parameter(_))
        ));
        assert_eq!(graph.len(), 1);
    }
}
