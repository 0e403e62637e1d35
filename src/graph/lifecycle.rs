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

//! One-shot resource lifecycle
//!
//! An engine resource of a one-shot kind can be started once and, once
//! stopped, never again. Stopping therefore swaps in a fresh resource that
//! takes over the old node's position and outgoing edges.

use tracing::{debug, info};

use super::AudioGraph;
use crate::errors::{GraphError, GraphResult};
use crate::nodes::{GraphNode, NodeId, NodeKind};
use crate::parameters::{ParamName, Parameterizable};

/// ワンショットリソースの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceState {
    #[default]
    Idle,
    Running,
}

impl ResourceState {
    pub fn is_running(&self) -> bool {
        matches!(self, ResourceState::Running)
    }
}

/// The parameter whose value survives a replacement.
fn carried_param(kind: NodeKind) -> Option<ParamName> {
    match kind {
        NodeKind::Oscillator => Some(ParamName::Frequency),
        NodeKind::BufferSource => Some(ParamName::PlaybackRate),
        _ => None,
    }
}

fn one_shot(node: &GraphNode) -> GraphResult<()> {
    if node.kind().is_one_shot() {
        Ok(())
    } else {
        Err(GraphError::NotOneShot {
            id: node.id(),
            kind: node.kind(),
        })
    }
}

impl AudioGraph {
    /// Starts a one-shot resource. Starting a running node does nothing and
    /// never reaches the engine.
    pub fn start(&mut self, id: NodeId) -> GraphResult<NodeId> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| GraphError::source_not_found(id))?;
        one_shot(node)?;

        if node.is_running() {
            return Ok(id);
        }

        node.handle_mut().start()?;
        node.set_state(ResourceState::Running);
        debug!(node = %id, "started");
        Ok(id)
    }

    pub fn is_running(&self, id: NodeId) -> bool {
        self.node(id).map(GraphNode::is_running).unwrap_or(false)
    }

    /// Stops a running one-shot node and replaces it.
    ///
    /// Returns the id of the node now standing in the graph: `id` itself when
    /// the node was idle, otherwise a new node (new uuid, idle) at the same
    /// position that holds the old edge list and is reconnected on the
    /// engine. The old node is removed. Edges of other nodes that pointed at
    /// it are left as they are.
    ///
    /// The replacement resource is allocated first. If the engine then fails
    /// to stop the old resource, the replacement is dropped (releasing its
    /// engine resource) and the graph is left unchanged.
    pub fn stop_and_replace(&mut self, id: NodeId) -> GraphResult<NodeId> {
        let node = self
            .node(id)
            .ok_or_else(|| GraphError::source_not_found(id))?;
        one_shot(node)?;

        if !node.is_running() {
            return Ok(id);
        }

        let kind = node.kind();
        let position = node.position();
        let carried = carried_param(kind)
            .and_then(|name| node.param(name).map(|param| (name, param.value)));

        // 先に新しいリソースを確保する。失敗しても古いノードはそのまま。
        let mut replacement = self.build_node(kind, position)?;

        let old = self
            .node_mut(id)
            .ok_or_else(|| GraphError::source_not_found(id))?;
        if let Err(err) = old.handle_mut().stop() {
            drop(replacement);
            return Err(err.into());
        }
        old.set_state(ResourceState::Idle);

        let edges = self.take_edges(id);
        self.remove_node(id);

        if let Some((name, value)) = carried {
            if let Some(param) = replacement.param_mut(name) {
                param.set_value(value);
            }
        }
        replacement.mark_connected(!edges.is_empty());

        let edge_count = edges.len();
        let new_id = self.insert(replacement, edges);
        self.reconnect(new_id)?;

        info!(old = %id, new = %new_id, %kind, edges = edge_count, "replaced stopped resource");
        Ok(new_id)
    }
}
