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

//! In-memory engine that renders nothing and records every command.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use super::{AudioEngine, ConnectTarget, EngineError, EngineHandle, EngineResult, ResourceId};
use crate::config::EngineConfig;
use crate::nodes::{ChannelConfig, NodeKind, NodeProperties};

/// エンジンに発行されたコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Create { resource: ResourceId, kind: NodeKind },
    Connect { source: ResourceId, target: ConnectTarget },
    Disconnect { source: ResourceId },
    Start { resource: ResourceId },
    Stop { resource: ResourceId },
}

/// Shared command log. Clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    commands: Rc<RefCell<Vec<EngineCommand>>>,
}

impl EngineLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, command: EngineCommand) {
        trace!(?command, "engine command");
        self.commands.borrow_mut().push(command);
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }

    pub fn count(&self, predicate: impl Fn(&EngineCommand) -> bool) -> usize {
        self.commands.borrow().iter().filter(|c| predicate(c)).count()
    }

    pub fn starts(&self, resource: ResourceId) -> usize {
        self.count(|c| matches!(c, EngineCommand::Start { resource: r } if *r == resource))
    }

    pub fn stops(&self, resource: ResourceId) -> usize {
        self.count(|c| matches!(c, EngineCommand::Stop { resource: r } if *r == resource))
    }

    /// Replays the log into the connections `source` currently holds at the
    /// engine level, in the order they were made. Repeated connections to
    /// the same target collapse into one.
    pub fn live_connections(&self, source: ResourceId) -> Vec<ConnectTarget> {
        let mut live: Vec<ConnectTarget> = Vec::new();
        for command in self.commands.borrow().iter() {
            match command {
                EngineCommand::Connect { source: s, target } if *s == source => {
                    if !live.contains(target) {
                        live.push(*target);
                    }
                }
                EngineCommand::Disconnect { source: s } if *s == source => live.clear(),
                _ => {}
            }
        }
        live
    }
}

/// 記録用エンジン
#[derive(Debug)]
pub struct RecordingEngine {
    sample_rate: f32,
    channel_count: u32,
    max_resources: Option<usize>,
    /// 生存中のハンドル数。ハンドルの Drop で減る。
    live: Rc<Cell<usize>>,
    next_resource: u64,
    log: EngineLog,
}

impl RecordingEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channel_count: config.channel_count,
            max_resources: config.max_resources,
            live: Rc::new(Cell::new(0)),
            next_resource: 1,
            log: EngineLog::new(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Handles allocated by this engine that have not been dropped yet.
    pub fn live_resources(&self) -> usize {
        self.live.get()
    }

    /// Handle to the shared command log.
    pub fn log(&self) -> EngineLog {
        self.log.clone()
    }

    fn allocate(&mut self, kind: NodeKind) -> EngineResult<Box<dyn EngineHandle>> {
        if let Some(limit) = self.max_resources {
            if self.live.get() >= limit {
                return Err(EngineError::AllocationFailed {
                    kind,
                    reason: format!("resource limit of {} reached", limit),
                });
            }
        }

        let resource = ResourceId::from_raw(self.next_resource);
        self.next_resource += 1;
        self.live.set(self.live.get() + 1);
        self.log.push(EngineCommand::Create { resource, kind });

        Ok(Box::new(RecordingHandle {
            resource,
            kind,
            properties: NodeProperties::defaults(kind, self.sample_rate),
            channels: ChannelConfig::for_kind(kind, self.channel_count),
            started: false,
            stopped: false,
            live: Rc::clone(&self.live),
            log: self.log.clone(),
        }))
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl AudioEngine for RecordingEngine {
    fn create_oscillator(&mut self) -> EngineResult<Box<dyn EngineHandle>> {
        self.allocate(NodeKind::Oscillator)
    }

    fn create_gain(&mut self) -> EngineResult<Box<dyn EngineHandle>> {
        self.allocate(NodeKind::Gain)
    }

    fn create_biquad_filter(&mut self) -> EngineResult<Box<dyn EngineHandle>> {
        self.allocate(NodeKind::BiquadFilter)
    }

    fn create_analyser(&mut self) -> EngineResult<Box<dyn EngineHandle>> {
        self.allocate(NodeKind::Analyser)
    }

    fn create_buffer_source(&mut self) -> EngineResult<Box<dyn EngineHandle>> {
        self.allocate(NodeKind::BufferSource)
    }
}

#[derive(Debug)]
struct RecordingHandle {
    resource: ResourceId,
    kind: NodeKind,
    properties: NodeProperties,
    channels: ChannelConfig,
    started: bool,
    stopped: bool,
    live: Rc<Cell<usize>>,
    log: EngineLog,
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

impl RecordingHandle {
    fn require_one_shot(&self, operation: &'static str) -> EngineResult<()> {
        if self.kind.is_one_shot() {
            Ok(())
        } else {
            Err(EngineError::Unsupported {
                resource: self.resource,
                kind: self.kind,
                operation,
            })
        }
    }

    fn invalid(&self, reason: &str) -> EngineError {
        EngineError::InvalidState {
            resource: self.resource,
            reason: reason.to_string(),
        }
    }
}

impl EngineHandle for RecordingHandle {
    fn resource_id(&self) -> ResourceId {
        self.resource
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn properties(&self) -> &NodeProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut NodeProperties {
        &mut self.properties
    }

    fn channel_config(&self) -> ChannelConfig {
        self.channels
    }

    fn connect(&mut self, target: ConnectTarget) {
        self.log.push(EngineCommand::Connect {
            source: self.resource,
            target,
        });
    }

    fn disconnect(&mut self) {
        self.log.push(EngineCommand::Disconnect {
            source: self.resource,
        });
    }

    fn start(&mut self) -> EngineResult<()> {
        self.require_one_shot("start")?;
        if self.started {
            return Err(self.invalid("start called more than once"));
        }
        self.started = true;
        self.log.push(EngineCommand::Start {
            resource: self.resource,
        });
        Ok(())
    }

    fn stop(&mut self) -> EngineResult<()> {
        self.require_one_shot("stop")?;
        if !self.started {
            return Err(self.invalid("stop called before start"));
        }
        if self.stopped {
            return Err(self.invalid("stop called more than once"));
        }
        self.stopped = true;
        self.log.push(EngineCommand::Stop {
            resource: self.resource,
        });
        Ok(())
    }
}
