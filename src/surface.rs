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

use crate::basetypes::*;
use crate::error::{Result, SurfcutError};
use crate::layering::{SurfaceLayerBuilder, SurfaceProblem};

use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Solution {
    levels: Vec<usize>,
    value: f64,
    stats: SolveStats,
}

/// Finds the cost-minimal surface through a set of columns.
///
/// Each column gets one of `num_levels` levels; neighbouring columns may
/// differ by at most their gradient bound. The problem is solved exactly
/// with one minimum cut on the layered graph.
#[derive(Debug, Clone)]
pub struct SurfaceSolver {
    problem: SurfaceProblem,
    max_gradient: i64,
    config: SolverConfig,
    solution: Option<Solution>,
}

impl SurfaceSolver {
    /// Creates a solver for an estimated number of nodes (columns) and
    /// edges. More can be added later.
    pub fn new(num_nodes: usize, num_edges: usize, num_levels: usize, max_gradient: i64) -> Result<Self> {
        Self::with_config(
            num_nodes,
            num_edges,
            num_levels,
            max_gradient,
            SolverConfig::default(),
        )
    }

    pub fn with_config(
        num_nodes: usize,
        num_edges: usize,
        num_levels: usize,
        max_gradient: i64,
        config: SolverConfig,
    ) -> Result<Self> {
        if max_gradient < 0 {
            return Err(SurfcutError::InvalidAdjacency(format!(
                "maximal gradient must be non-negative, got {}",
                max_gradient
            )));
        }
        Ok(SurfaceSolver {
            problem: SurfaceProblem::with_capacity(num_nodes, num_edges, num_levels)?,
            max_gradient,
            config,
            solution: None,
        })
    }

    pub fn problem(&self) -> &SurfaceProblem {
        &self.problem
    }

    pub fn num_levels(&self) -> usize {
        self.problem.num_levels()
    }

    pub fn max_gradient(&self) -> i64 {
        self.max_gradient
    }

    /// Adds `num_nodes` columns and returns the id of the first one.
    pub fn add_nodes(&mut self, num_nodes: usize) -> Result<NodeId> {
        self.check_mutable()?;
        Ok(self.problem.add_columns(num_nodes))
    }

    /// Adds a neighbourhood edge limited by the solver's maximal gradient.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) -> Result<()> {
        self.add_edge_with_gradient(u, v, self.max_gradient)
    }

    pub fn add_edge_with_gradient(&mut self, u: NodeId, v: NodeId, max_gradient: i64) -> Result<()> {
        self.check_mutable()?;
        self.problem.add_adjacency(u, v, max_gradient)
    }

    /// Sets the costs of passing the surface through each level of column `n`.
    pub fn set_level_costs(&mut self, n: NodeId, costs: &[f64]) -> Result<()> {
        self.check_mutable()?;
        self.problem.set_level_costs(n, costs)
    }

    /// Solves the problem and returns the cost of the optimal surface.
    pub fn min_surface(&mut self) -> Result<f64> {
        if let Some(solution) = &self.solution {
            return Ok(solution.value);
        }

        let mut layered = SurfaceLayerBuilder::new(&self.problem, self.config.clone()).build()?;
        let cut = layered.network_mut().maxflow()?;
        let levels = layered.decode_levels()?;
        let value = self.problem.cost_of(&levels)?;

        if self.config.log_level.enabled(LogLevel::Debug) {
            debug!(
                cut,
                offset = layered.offset(),
                value,
                "decoded surface levels"
            );
        }
        if self.config.log_level.enabled(LogLevel::User) {
            info!(
                columns = levels.len(),
                value,
                "found minimal surface"
            );
        }

        self.solution = Some(Solution {
            levels,
            value,
            stats: *layered.network().stats(),
        });
        Ok(value)
    }

    /// Level at which the surface passes through column `n`.
    pub fn level(&self, n: NodeId) -> Result<usize> {
        if n >= self.problem.num_columns() {
            return Err(SurfcutError::InvalidNode {
                node: n,
                reason: "column id out of range",
            });
        }
        self.levels().map(|levels| levels[n])
    }

    pub fn levels(&self) -> Result<&[usize]> {
        self.solution
            .as_ref()
            .map(|solution| solution.levels.as_slice())
            .ok_or(SurfcutError::NotSolved)
    }

    /// Max-flow statistics of the last `min_surface` call.
    pub fn stats(&self) -> Option<&SolveStats> {
        self.solution.as_ref().map(|solution| &solution.stats)
    }

    /// Writes the layered flow network of the current problem as an LP file.
    pub fn dump_lp(&self, path: impl AsRef<Path>) -> Result<()> {
        let layered = SurfaceLayerBuilder::new(&self.problem, self.config.clone()).build()?;
        layered.network().dump_lp(path)
    }

    fn check_mutable(&self) -> Result<()> {
        if self.solution.is_some() {
            return Err(SurfcutError::AlreadySolved);
        }
        Ok(())
    }
}
