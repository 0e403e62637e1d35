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

use std::collections::HashSet;

use super::AudioGraph;
use crate::errors::{GraphError, GraphResult};
use crate::nodes::{GraphNode, NodeId};

/// Depth-first walk over outgoing edges.
///
/// Yields each reachable node once, `start` first. Cycles terminate because
/// a node is marked visited when it is first discovered. Edges to nodes no
/// longer in the graph are skipped.
pub struct Reachable<'a> {
    graph: &'a AudioGraph,
    stack: Vec<NodeId>,
    visited: HashSet<NodeId>,
}

impl<'a> Iterator for Reachable<'a> {
    type Item = &'a GraphNode;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        while let Some(id) = self.stack.pop() {
            let Some(node) = graph.node(id) else {
                continue;
            };
            for next in graph.edges(id).unwrap_or_default() {
                if graph.contains(*next) && self.visited.insert(*next) {
                    self.stack.push(*next);
                }
            }
            return Some(node);
        }
        None
    }
}

impl AudioGraph {
    /// Every node reachable from `start` by following edges, `start` included.
    pub fn reachable(&self, start: NodeId) -> GraphResult<Reachable<'_>> {
        if !self.contains(start) {
            return Err(GraphError::source_not_found(start));
        }
        let mut visited = HashSet::new();
        visited.insert(start);
        Ok(Reachable {
            graph: self,
            stack: vec![start],
            visited,
        })
    }

    /// true if a signal leaving `from` can arrive at `to`.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> GraphResult<bool> {
        if !self.contains(to) {
            return Err(GraphError::destination_not_found(to));
        }
        Ok(self.reachable(from)?.any(|node| node.id() == to))
    }
}
