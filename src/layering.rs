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

//! Reduction of a surface problem to a single minimum cut.
//!
//! Every column with `L` levels is represented by a chain of `L - 1` flow
//! nodes. Chain node `l` on the source side means "the surface passes at
//! level `l` or above", so a column's level is the number of its chain nodes
//! on the source side:
//!
//! ```text
//!   level:     0     1     2     3
//!   chain:        n1 <- n2 <- n3        (infinite arcs, top to bottom)
//!   x_l:          1     1     0   =>  level 2
//! ```
//!
//! The cost of a column is `cost[0] + sum_l (cost[l] - cost[l-1]) * x_l`.
//! Positive differences are paid when `x_l = 1` (sink capacity), negative
//! ones when `x_l = 0` (source capacity) plus a constant. Gradient bounds
//! `|level(a) - level(b)| <= d` become infinite arcs `a(l) -> b(l - d)` in
//! both directions.

use crate::basetypes::*;
use crate::error::{Result, SurfcutError};
use crate::graph::FlowNetwork;

use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::debug;

/// Columns with per-level costs, linked by gradient constraints.
///
/// Node weights hold the level costs of a column (`None` until set), edge
/// weights the maximal level difference allowed between the two columns.
#[derive(Debug, Clone)]
pub struct SurfaceProblem {
    graph: UnGraph<Option<Vec<f64>>, usize>,
    num_levels: usize,
}

impl SurfaceProblem {
    pub fn new(num_levels: usize) -> Result<Self> {
        Self::with_capacity(0, 0, num_levels)
    }

    /// Reserves room for the estimated number of columns and adjacencies.
    /// More can be added later.
    pub fn with_capacity(num_columns: usize, num_adjacencies: usize, num_levels: usize) -> Result<Self> {
        if num_levels == 0 {
            return Err(SurfcutError::InvalidLevelCost(
                "a column needs at least one level".to_string(),
            ));
        }
        Ok(SurfaceProblem {
            graph: UnGraph::with_capacity(num_columns, num_adjacencies),
            num_levels,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    pub fn num_columns(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_adjacencies(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds `num_columns` columns, returns the id of the first one.
    pub fn add_columns(&mut self, num_columns: usize) -> NodeId {
        let first = self.graph.node_count();
        for _ in 0..num_columns {
            self.graph.add_node(None);
        }
        first
    }

    pub fn set_level_costs(&mut self, column: NodeId, costs: &[f64]) -> Result<()> {
        let index = self.column_index(column)?;
        if costs.is_empty() {
            return Err(SurfcutError::InvalidLevelCost(format!(
                "column {} got an empty cost vector",
                column
            )));
        }
        if costs.len() != self.num_levels {
            return Err(SurfcutError::InvalidLevelCost(format!(
                "column {} got {} costs, expected one per level ({})",
                column,
                costs.len(),
                self.num_levels
            )));
        }
        if let Some((level, cost)) = costs
            .iter()
            .find_position(|cost| !(cost.is_finite() && **cost >= 0.0))
        {
            return Err(SurfcutError::InvalidLevelCost(format!(
                "column {} level {} has cost {}, costs must be finite and non-negative",
                column, level, cost
            )));
        }
        self.graph[index] = Some(costs.to_vec());
        Ok(())
    }

    pub fn level_costs(&self, column: NodeId) -> Option<&[f64]> {
        self.graph
            .node_weight(NodeIndex::new(column))
            .and_then(|costs| costs.as_deref())
    }

    /// Constrains `|level(u) - level(v)| <= max_gradient`.
    pub fn add_adjacency(&mut self, u: NodeId, v: NodeId, max_gradient: i64) -> Result<()> {
        if u >= self.num_columns() || v >= self.num_columns() {
            return Err(SurfcutError::InvalidAdjacency(format!(
                "({}, {}) references an unknown column, there are {}",
                u,
                v,
                self.num_columns()
            )));
        }
        if u == v {
            return Err(SurfcutError::InvalidAdjacency(format!(
                "column {} can not be adjacent to itself",
                u
            )));
        }
        if max_gradient < 0 {
            return Err(SurfcutError::InvalidAdjacency(format!(
                "({}, {}) has negative gradient bound {}",
                u, v, max_gradient
            )));
        }
        self.graph
            .add_edge(NodeIndex::new(u), NodeIndex::new(v), max_gradient as usize);
        Ok(())
    }

    /// `(u, v, max_gradient)` for every adjacency, in insertion order.
    pub fn adjacencies(&self) -> impl Iterator<Item = (NodeId, NodeId, usize)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    /// Sum of the costs of the given levels, one per column.
    pub fn cost_of(&self, levels: &[usize]) -> Result<f64> {
        if levels.len() != self.num_columns() {
            return Err(SurfcutError::InvalidLevelCost(format!(
                "got {} levels for {} columns",
                levels.len(),
                self.num_columns()
            )));
        }
        levels
            .iter()
            .enumerate()
            .map(|(column, &level)| {
                self.costs(column)?.get(level).copied().ok_or_else(|| {
                    SurfcutError::InvalidLevelCost(format!(
                        "level {} of column {} is out of range",
                        level, column
                    ))
                })
            })
            .sum()
    }

    fn costs(&self, column: NodeId) -> Result<&[f64]> {
        self.level_costs(column).ok_or_else(|| {
            SurfcutError::InvalidLevelCost(format!("no level costs set for column {}", column))
        })
    }

    fn column_index(&self, column: NodeId) -> Result<NodeIndex> {
        if column >= self.num_columns() {
            return Err(SurfcutError::InvalidNode {
                node: column,
                reason: "column id out of range",
            });
        }
        Ok(NodeIndex::new(column))
    }
}

/// Flow network built from a [`SurfaceProblem`], together with what is
/// needed to read levels back from its cut.
#[derive(Debug, Clone)]
pub struct LayeredGraph {
    network: FlowNetwork<f64>,
    num_columns: usize,
    num_levels: usize,
    offset: f64,
}

impl LayeredGraph {
    pub fn network(&self) -> &FlowNetwork<f64> {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut FlowNetwork<f64> {
        &mut self.network
    }

    /// Constant to add to the cut value to get the surface cost.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Flow node standing for "column is at `level` or above", for levels
    /// in `1..num_levels`.
    pub fn chain_node(&self, column: NodeId, level: usize) -> Option<NodeId> {
        if column >= self.num_columns || level == 0 || level >= self.num_levels {
            return None;
        }
        Some(chain_node(self.num_levels, column, level))
    }

    /// Level selected for `column` by the solved network: the last chain
    /// position before the cut.
    pub fn decode_level(&self, column: NodeId) -> Result<usize> {
        if column >= self.num_columns {
            return Err(SurfcutError::InvalidNode {
                node: column,
                reason: "column id out of range",
            });
        }
        for level in 1..self.num_levels {
            let node = chain_node(self.num_levels, column, level);
            if self.network.get_segment(node)? == TerminalType::Sink {
                return Ok(level - 1);
            }
        }
        Ok(self.num_levels - 1)
    }

    pub fn decode_levels(&self) -> Result<Vec<usize>> {
        (0..self.num_columns)
            .map(|column| self.decode_level(column))
            .collect()
    }
}

#[inline(always)]
fn chain_node(num_levels: usize, column: NodeId, level: usize) -> NodeId {
    column * (num_levels - 1) + level - 1
}

pub struct SurfaceLayerBuilder<'a> {
    problem: &'a SurfaceProblem,
    config: SolverConfig,
}

impl<'a> SurfaceLayerBuilder<'a> {
    pub fn new(problem: &'a SurfaceProblem, config: SolverConfig) -> Self {
        SurfaceLayerBuilder { problem, config }
    }

    pub fn build(&self) -> Result<LayeredGraph> {
        let problem = self.problem;
        let num_levels = problem.num_levels();
        let num_columns = problem.num_columns();
        let chain_len = num_levels - 1;

        let mut costs = Vec::with_capacity(num_columns);
        for column in 0..num_columns {
            costs.push(problem.costs(column)?);
        }

        let num_nodes = num_columns * chain_len;
        let num_chain_edges = num_columns * chain_len.saturating_sub(1);
        let num_cross_edges: usize = problem
            .adjacencies()
            .map(|(_, _, d)| 2 * chain_len.saturating_sub(d))
            .sum();
        if self.config.log_level.enabled(LogLevel::Debug) {
            debug!(
                columns = num_columns,
                levels = num_levels,
                nodes = num_nodes,
                edges = num_chain_edges + num_cross_edges,
                "building layered graph"
            );
        }

        let mut network = FlowNetwork::with_config(
            num_nodes,
            num_chain_edges + num_cross_edges,
            self.config.clone(),
        );
        network.add_nodes(num_nodes)?;
        let infinity = <f64 as FlowNum>::big_value();
        let node = |column: NodeId, level: usize| chain_node(num_levels, column, level);

        let mut offset = 0.0;
        for (column, column_costs) in costs.iter().enumerate() {
            offset += column_costs[0];
            for (level, (below, above)) in column_costs.iter().tuple_windows().enumerate() {
                let delta = above - below;
                let n = node(column, level + 1);
                if delta >= 0.0 {
                    network.add_tedge(n, 0.0, delta)?;
                } else {
                    network.add_tedge(n, -delta, 0.0)?;
                    offset += delta;
                }
            }
            for (lower, upper) in (1..num_levels).tuple_windows() {
                network.add_edge(node(column, upper), node(column, lower), infinity, 0.0)?;
            }
        }

        for (a, b, d) in problem.adjacencies() {
            for level in (d + 1)..num_levels {
                network.add_edge(node(a, level), node(b, level - d), infinity, 0.0)?;
                network.add_edge(node(b, level), node(a, level - d), infinity, 0.0)?;
            }
        }

        Ok(LayeredGraph {
            network,
            num_columns,
            num_levels,
            offset,
        })
    }
}
