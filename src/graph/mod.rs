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

//! Audio graph
//!
//! Owns every live [`GraphNode`] together with its ordered list of outgoing
//! edges, and mirrors each logical connection onto the engine.
//!
//! Removing a node drops only its own edge list. Edges elsewhere that name
//! the removed node stay in place and are skipped when connections are
//! replayed to the engine.

mod lifecycle;
mod traversal;

pub use lifecycle::ResourceState;
pub use traversal::Reachable;

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::audio::{AudioEngine, ConnectTarget};
use crate::errors::{GraphError, GraphResult};
use crate::nodes::{GraphNode, NodeId, NodeKind, Position};

struct Slot {
    node: GraphNode,
    edges: Vec<NodeId>,
}

pub struct AudioGraph {
    engine: Box<dyn AudioEngine>,
    nodes: HashMap<NodeId, Slot>,
    /// 挿入順
    order: Vec<NodeId>,
    next_id: u64,
}

/// Engine endpoint a connection to `dest` lands on.
fn connect_target(dest: &GraphNode) -> ConnectTarget {
    match dest.kind().input_param() {
        Some(param) => ConnectTarget::Param(dest.resource_id(), param),
        None => ConnectTarget::Input(dest.resource_id()),
    }
}

impl AudioGraph {
    pub fn new(engine: Box<dyn AudioEngine>) -> Self {
        Self {
            engine,
            nodes: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    pub fn with_engine<E: AudioEngine + 'static>(engine: E) -> Self {
        Self::new(Box::new(engine))
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Allocates an engine resource and wraps it, without inserting it.
    pub(crate) fn build_node(&mut self, kind: NodeKind, position: Position) -> GraphResult<GraphNode> {
        let handle = self.engine.create(kind)?;
        let id = self.allocate_id();
        Ok(GraphNode::new(id, handle, position))
    }

    pub(crate) fn insert(&mut self, node: GraphNode, edges: Vec<NodeId>) -> NodeId {
        let id = node.id();
        self.next_id = self.next_id.max(id.raw() + 1);
        self.order.push(id);
        self.nodes.insert(id, Slot { node, edges });
        id
    }

    /// Creates a node of `kind` at `position` (origin if omitted) and adds it
    /// with an empty edge list.
    pub fn create_node(&mut self, kind: NodeKind, position: Option<Position>) -> GraphResult<NodeId> {
        let node = self.build_node(kind, position.unwrap_or_default())?;
        debug!(node = %node.id(), uuid = %node.uuid(), %kind, "created node");
        self.add_node(node)
    }

    pub fn create_oscillator(&mut self, position: Option<Position>) -> GraphResult<NodeId> {
        self.create_node(NodeKind::Oscillator, position)
    }

    pub fn create_gain(&mut self, position: Option<Position>) -> GraphResult<NodeId> {
        self.create_node(NodeKind::Gain, position)
    }

    pub fn create_biquad_filter(&mut self, position: Option<Position>) -> GraphResult<NodeId> {
        self.create_node(NodeKind::BiquadFilter, position)
    }

    pub fn create_analyser(&mut self, position: Option<Position>) -> GraphResult<NodeId> {
        self.create_node(NodeKind::Analyser, position)
    }

    pub fn create_buffer_source(&mut self, position: Option<Position>) -> GraphResult<NodeId> {
        self.create_node(NodeKind::BufferSource, position)
    }

    /// Adds a node with an empty edge list.
    pub fn add_node(&mut self, mut node: GraphNode) -> GraphResult<NodeId> {
        if self.nodes.contains_key(&node.id()) {
            return Err(GraphError::DuplicateNode { id: node.id() });
        }
        node.mark_connected(false);
        Ok(self.insert(node, Vec::new()))
    }

    /// Removes a node and its own edge list, handing the node back.
    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let slot = self.nodes.remove(&id)?;
        self.order.retain(|other| *other != id);
        debug!(node = %id, dropped_edges = slot.edges.len(), "removed node");
        Some(slot.node)
    }

    /// Engine targets for `edges`, skipping destinations no longer present.
    fn resolve_targets(&self, src: NodeId, edges: &[NodeId]) -> Vec<ConnectTarget> {
        edges
            .iter()
            .filter_map(|dest| match self.nodes.get(dest) {
                Some(slot) => Some(connect_target(&slot.node)),
                None => {
                    warn!(source = %src, destination = %dest, "skipping edge to a node no longer in the graph");
                    None
                }
            })
            .collect()
    }

    /// Connect nodes together
    ///
    /// Appends `dest` to `src`'s edges (duplicates allowed) and connects the
    /// engine resources.
    pub fn connect(&mut self, src: NodeId, dest: NodeId) -> GraphResult<()> {
        if !self.nodes.contains_key(&src) {
            return Err(GraphError::source_not_found(src));
        }
        let target = match self.nodes.get(&dest) {
            Some(slot) => connect_target(&slot.node),
            None => return Err(GraphError::destination_not_found(dest)),
        };

        let slot = self
            .nodes
            .get_mut(&src)
            .ok_or_else(|| GraphError::source_not_found(src))?;
        slot.node.handle_mut().connect(target);
        slot.edges.push(dest);
        slot.node.mark_connected(true);

        if let Some(dest_slot) = self.nodes.get_mut(&dest) {
            dest_slot.node.mark_has_input();
        }

        debug!(source = %src, destination = %dest, ?target, "connected");
        Ok(())
    }

    /// Disconnects every `src -> dest` edge.
    ///
    /// The engine can only sever all of a resource's outputs at once, so the
    /// remaining edges are connected again in order afterwards.
    pub fn disconnect(&mut self, src: NodeId, dest: NodeId) -> GraphResult<()> {
        let edges = match self.nodes.get(&src) {
            Some(slot) => &slot.edges,
            None => return Err(GraphError::source_not_found(src)),
        };
        if !self.nodes.contains_key(&dest) {
            return Err(GraphError::destination_not_found(dest));
        }
        if edges.is_empty() {
            return Ok(());
        }

        let remaining: Vec<NodeId> = edges.iter().copied().filter(|edge| *edge != dest).collect();
        let targets = self.resolve_targets(src, &remaining);

        let slot = self
            .nodes
            .get_mut(&src)
            .ok_or_else(|| GraphError::source_not_found(src))?;
        let handle = slot.node.handle_mut();
        handle.disconnect();
        for target in targets {
            handle.connect(target);
        }
        slot.edges = remaining;
        if slot.edges.is_empty() {
            slot.node.mark_connected(false);
        }

        debug!(source = %src, destination = %dest, remaining = slot.edges.len(), "disconnected");
        Ok(())
    }

    /// Replays `src`'s edge list onto the engine, in order.
    ///
    /// Used after the resource behind a node was swapped and holds no
    /// engine-level connections of its own.
    pub fn reconnect(&mut self, src: NodeId) -> GraphResult<()> {
        let edges = match self.nodes.get(&src) {
            Some(slot) => &slot.edges,
            None => return Err(GraphError::source_not_found(src)),
        };
        let targets = self.resolve_targets(src, edges);

        let slot = self
            .nodes
            .get_mut(&src)
            .ok_or_else(|| GraphError::source_not_found(src))?;
        let count = targets.len();
        let handle = slot.node.handle_mut();
        for target in targets {
            handle.connect(target);
        }

        debug!(source = %src, connections = count, "reconnected");
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id).map(|slot| &slot.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id).map(|slot| &mut slot.node)
    }

    /// Outgoing edges of `id`, in connection order.
    pub fn edges(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&id).map(|slot| slot.edges.as_slice())
    }

    /// Get node by index (insertion order)
    pub fn get_node(&self, index: usize) -> Option<&GraphNode> {
        self.order.get(index).and_then(|id| self.node(*id))
    }

    /// Get oscillator by index; `None` if the node there is another kind.
    pub fn get_oscillator(&self, index: usize) -> Option<&GraphNode> {
        self.get_node(index)
            .filter(|node| node.kind() == NodeKind::Oscillator)
    }

    pub fn get_gain(&self, index: usize) -> Option<&GraphNode> {
        self.get_node(index).filter(|node| node.kind() == NodeKind::Gain)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.order.iter().filter_map(|id| self.node(*id))
    }

    /// First node carrying `uuid`, in insertion order.
    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<NodeId> {
        self.iter().find(|node| node.uuid() == uuid).map(|node| node.id())
    }

    pub(crate) fn take_edges(&mut self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get_mut(&id)
            .map(|slot| std::mem::take(&mut slot.edges))
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn engine_mut(&mut self) -> &mut dyn AudioEngine {
        self.engine.as_mut()
    }
}

impl std::fmt::Debug for AudioGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for id in &self.order {
            if let Some(slot) = self.nodes.get(id) {
                map.entry(id, &slot.edges);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{EngineError, EngineLog, RecordingEngine};
    use crate::config::EngineConfig;
    use crate::parameters::{ParamName, Parameterizable};

    fn graph() -> (AudioGraph, EngineLog) {
        let engine = RecordingEngine::default();
        let log = engine.log();
        (AudioGraph::with_engine(engine), log)
    }

    #[test]
    fn test_create_all_kinds() {
        let (mut graph, _) = graph();

        let osc = graph.create_oscillator(None).unwrap();
        let gain = graph.create_gain(None).unwrap();
        let filter = graph.create_biquad_filter(None).unwrap();
        let analyser = graph.create_analyser(Some(Position::new(10.0, -5.0))).unwrap();
        let source = graph.create_buffer_source(None).unwrap();

        for id in [osc, gain, filter, analyser, source] {
            assert!(graph.contains(id));
            assert_eq!(graph.edges(id), Some(&[][..]));
            let node = graph.node(id).unwrap();
            assert!(!node.is_connected());
            assert!(!node.has_input());
            assert!(!node.is_running());
        }
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.node(osc).unwrap().position(), Position::default());
        assert_eq!(graph.node(analyser).unwrap().position(), Position::new(10.0, -5.0));
        assert_eq!(graph.node(filter).unwrap().kind(), NodeKind::BiquadFilter);
    }

    #[test]
    fn test_every_kind_gets_a_uuid() {
        let (mut graph, _) = graph();
        let ids: Vec<NodeId> = NodeKind::ALL
            .into_iter()
            .map(|kind| graph.create_node(kind, None).unwrap())
            .collect();

        let mut uuids: Vec<Uuid> = ids.iter().map(|id| graph.node(*id).unwrap().uuid()).collect();
        assert!(uuids.iter().all(|uuid| !uuid.is_nil()));
        uuids.sort();
        uuids.dedup();
        assert_eq!(uuids.len(), ids.len());
        assert!(graph.find_by_uuid(uuids[0]).is_some());
        assert!(graph.find_by_uuid(Uuid::nil()).is_none());
    }

    #[test]
    fn test_allocation_failure_leaves_graph_untouched() {
        let config = EngineConfig {
            max_resources: Some(1),
            ..EngineConfig::default()
        };
        let mut graph = AudioGraph::with_engine(RecordingEngine::new(&config));
        graph.create_gain(None).unwrap();

        match graph.create_oscillator(None) {
            Err(GraphError::Engine(EngineError::AllocationFailed { kind, .. })) => {
                assert_eq!(kind, NodeKind::Oscillator)
            }
            other => panic!("Expected allocation failure, got {:?}", other),
        }
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_removed_node_releases_engine_slot() {
        let config = EngineConfig {
            max_resources: Some(2),
            ..EngineConfig::default()
        };
        let mut graph = AudioGraph::with_engine(RecordingEngine::new(&config));
        let a = graph.create_gain(None).unwrap();
        graph.create_gain(None).unwrap();
        assert!(graph.create_gain(None).is_err());

        // 取り出したノードを保持している間は枠を使い続ける
        let detached = graph.remove_node(a).unwrap();
        assert!(graph.create_gain(None).is_err());
        drop(detached);
        assert!(graph.create_gain(None).is_ok());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_connect_sets_flags_and_appends() {
        let (mut graph, log) = graph();
        let a = graph.create_gain(None).unwrap();
        let b = graph.create_biquad_filter(None).unwrap();
        let c = graph.create_analyser(None).unwrap();

        graph.connect(a, b).unwrap();
        graph.connect(a, c).unwrap();

        assert!(graph.node(a).unwrap().is_connected());
        assert!(graph.node(b).unwrap().has_input());
        assert!(graph.node(c).unwrap().has_input());
        assert!(!graph.node(b).unwrap().is_connected());
        assert_eq!(graph.edges(a).unwrap().last(), Some(&c));

        let resource = graph.node(a).unwrap().resource_id();
        assert_eq!(
            log.live_connections(resource),
            vec![
                ConnectTarget::Input(graph.node(b).unwrap().resource_id()),
                ConnectTarget::Input(graph.node(c).unwrap().resource_id()),
            ]
        );
    }

    #[test]
    fn test_connect_to_oscillator_targets_frequency() {
        let (mut graph, log) = graph();
        let lfo = graph.create_oscillator(None).unwrap();
        let carrier = graph.create_oscillator(None).unwrap();

        graph.connect(lfo, carrier).unwrap();

        let carrier_resource = graph.node(carrier).unwrap().resource_id();
        assert_eq!(
            log.live_connections(graph.node(lfo).unwrap().resource_id()),
            vec![ConnectTarget::Param(carrier_resource, ParamName::Frequency)]
        );
    }

    #[test]
    fn test_connect_same_pair_twice_keeps_duplicates() {
        let (mut graph, _) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_gain(None).unwrap();

        graph.connect(a, b).unwrap();
        graph.connect(a, b).unwrap();
        assert_eq!(graph.edges(a).unwrap(), &[b, b]);

        // 重複はすべて削除される
        graph.disconnect(a, b).unwrap();
        assert!(graph.edges(a).unwrap().is_empty());
        assert!(!graph.node(a).unwrap().is_connected());
    }

    #[test]
    fn test_connect_missing_nodes() {
        let (mut graph, log) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        graph.remove_node(b);
        let before = log.len();

        match graph.connect(a, b) {
            Err(GraphError::NodeNotFound { which, id }) => {
                assert_eq!(which, crate::errors::Endpoint::Destination);
                assert_eq!(id, b);
            }
            other => panic!("Expected NodeNotFound, got {:?}", other),
        }
        match graph.connect(b, a) {
            Err(GraphError::NodeNotFound { which, .. }) => {
                assert_eq!(which, crate::errors::Endpoint::Source)
            }
            other => panic!("Expected NodeNotFound, got {:?}", other),
        }
        match graph.disconnect(a, b) {
            Err(GraphError::NodeNotFound { which, .. }) => {
                assert_eq!(which, crate::errors::Endpoint::Destination)
            }
            other => panic!("Expected NodeNotFound, got {:?}", other),
        }
        match graph.disconnect(b, a) {
            Err(GraphError::NodeNotFound { which, id }) => {
                assert_eq!(which, crate::errors::Endpoint::Source);
                assert_eq!(id, b);
            }
            other => panic!("Expected NodeNotFound, got {:?}", other),
        }
        match graph.reconnect(b) {
            Err(GraphError::NodeNotFound { which, id }) => {
                assert_eq!(which, crate::errors::Endpoint::Source);
                assert_eq!(id, b);
            }
            other => panic!("Expected NodeNotFound, got {:?}", other),
        }

        assert!(graph.edges(a).unwrap().is_empty());
        assert!(!graph.node(a).unwrap().is_connected());
        assert_eq!(log.len(), before);
    }

    #[test]
    fn test_disconnect_single_edge() {
        let (mut graph, _) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_gain(None).unwrap();

        graph.connect(a, b).unwrap();
        graph.disconnect(a, b).unwrap();

        assert!(graph.edges(a).unwrap().is_empty());
        assert!(!graph.node(a).unwrap().is_connected());
        assert!(graph.contains(b));
        // has_input は「入力を受けたことがある」フラグ
        assert!(graph.node(b).unwrap().has_input());
    }

    #[test]
    fn test_disconnect_preserves_other_edges() {
        let (mut graph, log) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        let c = graph.create_biquad_filter(None).unwrap();
        let d = graph.create_oscillator(None).unwrap();

        graph.connect(a, b).unwrap();
        graph.connect(a, c).unwrap();
        graph.connect(a, d).unwrap();
        graph.disconnect(a, c).unwrap();

        assert_eq!(graph.edges(a).unwrap(), &[b, d]);
        assert!(graph.node(a).unwrap().is_connected());

        // エンジン側も残りの接続が復元されている
        let b_res = graph.node(b).unwrap().resource_id();
        let d_res = graph.node(d).unwrap().resource_id();
        assert_eq!(
            log.live_connections(graph.node(a).unwrap().resource_id()),
            vec![
                ConnectTarget::Input(b_res),
                ConnectTarget::Param(d_res, ParamName::Frequency),
            ]
        );
    }

    #[test]
    fn test_disconnect_without_edges_is_noop() {
        let (mut graph, log) = graph();
        let a = graph.create_gain(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        let before = log.len();

        graph.disconnect(a, b).unwrap();
        assert_eq!(log.len(), before);
    }

    #[test]
    fn test_reconnect_replays_edges_in_order() {
        let (mut graph, log) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        let c = graph.create_analyser(None).unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(a, c).unwrap();

        let a_res = graph.node(a).unwrap().resource_id();
        graph.node_mut(a).unwrap().handle_mut().disconnect();
        assert!(log.live_connections(a_res).is_empty());

        graph.reconnect(a).unwrap();
        assert_eq!(
            log.live_connections(a_res),
            vec![
                ConnectTarget::Input(graph.node(b).unwrap().resource_id()),
                ConnectTarget::Input(graph.node(c).unwrap().resource_id()),
            ]
        );
    }

    #[test]
    fn test_remove_node_leaves_dangling_edges() {
        let (mut graph, log) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        let c = graph.create_gain(None).unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(a, c).unwrap();

        let removed = graph.remove_node(b).unwrap();
        assert_eq!(removed.id(), b);
        assert!(!graph.contains(b));
        assert_eq!(graph.edges(a).unwrap(), &[b, c]);
        assert!(graph.remove_node(b).is_none());

        // 宛先が消えたエッジはエンジンへの再接続でスキップされる
        graph.reconnect(a).unwrap();
        let c_res = graph.node(c).unwrap().resource_id();
        let a_res = graph.node(a).unwrap().resource_id();
        assert!(log
            .live_connections(a_res)
            .contains(&ConnectTarget::Input(c_res)));

        // b is no longer addressable even though a still lists it
        assert!(graph.disconnect(a, b).is_err());
    }

    #[test]
    fn test_add_node_rejects_duplicates() {
        let (mut graph, _) = graph();
        let a = graph.create_gain(None).unwrap();

        let node = graph.remove_node(a).unwrap();
        assert_eq!(graph.add_node(node).unwrap(), a);

        let duplicate = GraphNode::new(a, graph.engine_mut().create_gain().unwrap(), Position::default());
        match graph.add_node(duplicate) {
            Err(GraphError::DuplicateNode { id }) => assert_eq!(id, a),
            other => panic!("Expected DuplicateNode, got {:?}", other),
        }
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_readded_node_starts_without_edges() {
        let (mut graph, _) = graph();
        let a = graph.create_gain(None).unwrap();
        let b = graph.create_gain(None).unwrap();
        graph.connect(a, b).unwrap();

        let node = graph.remove_node(a).unwrap();
        assert!(node.is_connected());
        graph.add_node(node).unwrap();

        assert!(graph.edges(a).unwrap().is_empty());
        assert!(!graph.node(a).unwrap().is_connected());
        // 再追加は末尾に入る
        assert_eq!(graph.get_node(1).unwrap().id(), a);
    }

    #[test]
    fn test_get_node_by_index() {
        let (mut graph, _) = graph();
        let osc = graph.create_oscillator(None).unwrap();
        let gain = graph.create_gain(None).unwrap();

        let index = graph.len() - 2;
        graph
            .node_mut(osc)
            .unwrap()
            .set_parameter("frequency", 123.0)
            .unwrap();

        let node = graph.get_oscillator(index).unwrap();
        assert_eq!(node.id(), osc);
        assert_eq!(node.get_parameter("frequency").unwrap(), 123.0);

        assert_eq!(graph.get_gain(1).unwrap().id(), gain);
        assert!(graph.get_gain(0).is_none());
        assert!(graph.get_node(2).is_none());
    }

    #[test]
    fn test_edges_hold_live_identities() {
        let (mut graph, _) = graph();
        let a = graph.create_oscillator(None).unwrap();
        let b = graph.create_oscillator(None).unwrap();
        graph.connect(a, b).unwrap();

        graph
            .node_mut(b)
            .unwrap()
            .oscillator_mut()
            .unwrap()
            .frequency
            .value = 99.0;

        let first = graph.edges(a).unwrap()[0];
        assert_eq!(graph.node(first).unwrap().oscillator().unwrap().frequency.value, 99.0);
    }

    #[test]
    fn test_self_connection_allowed() {
        let (mut graph, _) = graph();
        let a = graph.create_gain(None).unwrap();
        graph.connect(a, a).unwrap();
        let node = graph.node(a).unwrap();
        assert!(node.is_connected());
        assert!(node.has_input());
        assert_eq!(graph.edges(a).unwrap(), &[a]);
    }
}
