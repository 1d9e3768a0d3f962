// Copyright 2024 Surfcut Developers

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//     http://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types shared by the flow network, the max-flow solver and the
//! surface solver.

use thiserror::Error;

/// Result type alias for surfcut operations
pub type Result<T> = std::result::Result<T, SurfcutError>;

#[derive(Error, Debug)]
pub enum SurfcutError {
    /// Node id out of range, or an edge from a node to itself
    #[error("invalid node {node}: {reason}")]
    InvalidNode { node: usize, reason: &'static str },

    /// Negative or NaN capacity, or a sum that no longer fits the capacity type
    #[error("invalid capacity {value}: {reason}")]
    InvalidCapacity { value: String, reason: &'static str },

    /// Missing, empty, wrong-length, negative or non-finite level costs
    #[error("invalid level costs: {0}")]
    InvalidLevelCost(String),

    /// Unknown column, self adjacency or negative gradient bound
    #[error("invalid adjacency: {0}")]
    InvalidAdjacency(String),

    /// Insertion beyond the reservation made at construction
    #[error("{what} capacity exceeded: requested {requested}, reserved {reserved}")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        reserved: usize,
    },

    #[error("query before the problem was solved")]
    NotSolved,

    #[error("the problem has already been solved and can not be modified")]
    AlreadySolved,

    #[error("solve interrupted")]
    Interrupted,

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurfcutError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        SurfcutError::Parse {
            line,
            message: message.into(),
        }
    }
}
