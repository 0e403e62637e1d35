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

use std::fmt;

use thiserror::Error;

use crate::audio::{EngineError, ResourceId};
use crate::nodes::{NodeId, NodeKind};
use crate::parameters::ParameterError;

/// 接続操作のどちら側のノードか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => write!(f, "source"),
            Endpoint::Destination => write!(f, "destination"),
        }
    }
}

/// グラフ操作全体のエラー型
#[derive(Debug, Error)]
pub enum GraphError {
    /// 同じノードが既にグラフに存在する
    #[error("Node {id} already exists in the graph")]
    DuplicateNode { id: NodeId },

    /// ノードが見つからない
    #[error("Couldn't find {which} node {id}")]
    NodeNotFound { which: Endpoint, id: NodeId },

    /// ドキュメントの kind が既知のノード種別ではない
    #[error("Unknown node kind '{kind}'")]
    UnknownNodeKind { kind: String },

    /// start / stop はワンショットリソースのみ
    #[error("Node {id} is a {kind} node and cannot be started or stopped")]
    NotOneShot { id: NodeId, kind: NodeKind },

    #[error("Invalid node document: {reason}")]
    InvalidDocument { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

/// 結果型のエイリアス
pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub fn source_not_found(id: NodeId) -> Self {
        GraphError::NodeNotFound {
            which: Endpoint::Source,
            id,
        }
    }

    pub fn destination_not_found(id: NodeId) -> Self {
        GraphError::NodeNotFound {
            which: Endpoint::Destination,
            id,
        }
    }

    pub fn invalid_document(reason: &str) -> Self {
        GraphError::InvalidDocument {
            reason: reason.to_string(),
        }
    }

    /// エンジン側のリソースに紐づくエラーなら、その ID を返す
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            GraphError::Engine(err) => err.resource(),
            _ => None,
        }
    }
}
