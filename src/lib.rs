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
use crate::graph::{sister, Parent};

use num_traits::identities::zero;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, trace};

pub mod basetypes;
pub mod error;
pub mod graph;
pub mod layering;
pub mod lp;
pub mod surface;

pub use crate::error::SurfcutError as Error;
pub use crate::graph::FlowNetwork;
pub use crate::layering::{LayeredGraph, SurfaceLayerBuilder, SurfaceProblem};
pub use crate::surface::SurfaceSolver;

/// Boykov-Kolmogorov augmenting path solver.
///
/// Two search trees are grown from the source and the sink. When they touch,
/// the path through the touching arc is augmented, and the nodes cut off by
/// saturated arcs (orphans) are re-attached to their tree or released. The
/// trees survive between augmentations, which is what makes the method fast
/// on grid-like graphs.
///
/// The solver borrows the network for the duration of one solve and writes
/// the flow value, the final tree labels and the statistics back into it.
pub struct MaxFlowSolver<'a, NUM: FlowNum> {
    graph: &'a mut FlowNetwork<NUM>,
    active: VecDeque<NodeId>,
    orphans: VecDeque<NodeId>,
    time: u64,
    stats: SolveStats,
}

impl<'a, NUM: FlowNum> MaxFlowSolver<'a, NUM> {
    pub fn new(graph: &'a mut FlowNetwork<NUM>) -> Self {
        let node_count = graph.node_count();
        MaxFlowSolver {
            graph,
            active: VecDeque::with_capacity(node_count),
            orphans: VecDeque::new(),
            time: 0,
            stats: SolveStats::default(),
        }
    }

    pub fn run(mut self) -> Result<NUM> {
        let start = Instant::now();
        let log_level = self.graph.config.log_level;
        if log_level.enabled(LogLevel::Debug) {
            debug!(
                nodes = self.graph.node_count(),
                edges = self.graph.edge_count(),
                resumed = self.graph.started,
                "solving max-flow"
            );
        }

        if !self.graph.started {
            self.push_terminal_flow();
            self.graph.started = true;
        }
        self.init_trees();

        let mut current: Option<NodeId> = None;
        loop {
            if self.graph.config.interrupted() {
                self.finish(start);
                if log_level.enabled(LogLevel::User) {
                    info!(flow = %self.graph.flow, "max-flow interrupted");
                }
                return Err(SurfcutError::Interrupted);
            }

            // Keep growing from the node that found the last path.
            let resumed = current.take().and_then(|i| {
                let node = &mut self.graph.nodes[i];
                node.active = false;
                (node.parent != Parent::Free).then_some(i)
            });
            let i = match resumed.or_else(|| self.next_active()) {
                Some(i) => i,
                None => break,
            };

            self.stats.growth_steps += 1;
            let meeting_arc = self.grow(i);
            self.time += 1;

            if let Some(arc) = meeting_arc {
                self.graph.nodes[i].active = true;
                current = Some(i);
                let bottleneck = self.augment(arc);
                self.stats.augmentations += 1;
                if log_level.enabled(LogLevel::All) {
                    trace!(arc, bottleneck = %bottleneck, "augmented");
                }
                self.adopt_orphans();
            }
        }

        self.graph.solved = true;
        self.finish(start);
        if log_level.enabled(LogLevel::User) {
            info!(
                flow = %self.graph.flow,
                augmentations = self.stats.augmentations,
                elapsed_ms = self.stats.elapsed.as_millis() as u64,
                "max-flow solved"
            );
        }
        Ok(self.graph.flow)
    }

    fn finish(&mut self, start: Instant) {
        self.stats.elapsed = start.elapsed();
        let total = &mut self.graph.stats;
        total.growth_steps += self.stats.growth_steps;
        total.augmentations += self.stats.augmentations;
        total.orphans += self.stats.orphans;
        total.elapsed += self.stats.elapsed;
    }

    // Flow that can go straight source -> n -> sink is pushed up front, the
    // remainder is kept as a signed residual.
    fn push_terminal_flow(&mut self) {
        let mut flow = self.graph.flow;
        for node in self.graph.nodes.iter_mut() {
            let direct = if node.cap_source < node.cap_sink {
                node.cap_source
            } else {
                node.cap_sink
            };
            flow += direct;
            node.flow_source = direct;
            node.flow_sink = direct;
            node.tr_cap = node.cap_source - node.cap_sink;
        }
        self.graph.flow = flow;
    }

    fn init_trees(&mut self) {
        self.active.clear();
        self.orphans.clear();
        self.time = 0;
        for i in 0..self.graph.nodes.len() {
            let node = &mut self.graph.nodes[i];
            node.active = false;
            node.ts = 0;
            if node.tr_cap == zero() {
                node.parent = Parent::Free;
                node.dist = 0;
                continue;
            }
            node.is_sink = node.tr_cap < zero();
            node.parent = Parent::Terminal;
            node.dist = 1;
            self.set_active(i);
        }
    }

    fn set_active(&mut self, i: NodeId) {
        let node = &mut self.graph.nodes[i];
        if !node.active {
            node.active = true;
            self.active.push_back(i);
        }
    }

    fn next_active(&mut self) -> Option<NodeId> {
        while let Some(i) = self.active.pop_front() {
            let node = &mut self.graph.nodes[i];
            node.active = false;
            if node.parent != Parent::Free {
                return Some(i);
            }
        }
        None
    }

    fn set_orphan_front(&mut self, i: NodeId) {
        self.graph.nodes[i].parent = Parent::Orphan;
        self.orphans.push_front(i);
    }

    fn set_orphan_rear(&mut self, i: NodeId) {
        self.graph.nodes[i].parent = Parent::Orphan;
        self.orphans.push_back(i);
    }

    /// Arc whose residual capacity links a node of the given tree to the
    /// neighbour reached by `arc`, in the direction flow would travel.
    #[inline(always)]
    fn tree_link(arc: usize, is_sink: bool) -> usize {
        if is_sink {
            arc
        } else {
            sister(arc)
        }
    }

    /// Extends the tree of `i` over its residual arcs. Returns the arc (in
    /// source to sink direction) joining the two trees, if one is found.
    fn grow(&mut self, i: NodeId) -> Option<usize> {
        let (is_sink, ts, dist) = {
            let node = &self.graph.nodes[i];
            (node.is_sink, node.ts, node.dist)
        };

        let mut next = self.graph.nodes[i].first;
        while let Some(arc) = next {
            next = self.graph.arcs[arc].next;
            let outward = if is_sink { sister(arc) } else { arc };
            if !(self.graph.arcs[outward].r_cap > zero()) {
                continue;
            }
            let j = self.graph.arcs[arc].head;
            let neighbour = &mut self.graph.nodes[j];
            if neighbour.parent == Parent::Free {
                neighbour.is_sink = is_sink;
                neighbour.parent = Parent::Arc(sister(arc));
                neighbour.ts = ts;
                neighbour.dist = dist + 1;
                self.set_active(j);
            } else if neighbour.is_sink != is_sink {
                return Some(outward);
            } else if neighbour.ts <= ts && neighbour.dist > dist {
                // j is closer to the terminal through i
                neighbour.parent = Parent::Arc(sister(arc));
                neighbour.ts = ts;
                neighbour.dist = dist + 1;
            }
        }
        None
    }

    fn augment(&mut self, middle: usize) -> NUM {
        let source_end = self.graph.arcs[sister(middle)].head;
        let sink_end = self.graph.arcs[middle].head;

        // bottleneck
        let mut bottleneck = self.graph.arcs[middle].r_cap;
        let mut i = source_end;
        while let Parent::Arc(a) = self.graph.nodes[i].parent {
            let r_cap = self.graph.arcs[sister(a)].r_cap;
            if bottleneck > r_cap {
                bottleneck = r_cap;
            }
            i = self.graph.arcs[a].head;
        }
        if bottleneck > self.graph.nodes[i].tr_cap {
            bottleneck = self.graph.nodes[i].tr_cap;
        }
        let mut i = sink_end;
        while let Parent::Arc(a) = self.graph.nodes[i].parent {
            let r_cap = self.graph.arcs[a].r_cap;
            if bottleneck > r_cap {
                bottleneck = r_cap;
            }
            i = self.graph.arcs[a].head;
        }
        let sink_residual = zero::<NUM>() - self.graph.nodes[i].tr_cap;
        if bottleneck > sink_residual {
            bottleneck = sink_residual;
        }

        // push
        self.graph.push_arc(middle, bottleneck);

        let mut i = source_end;
        while let Parent::Arc(a) = self.graph.nodes[i].parent {
            let parent = self.graph.arcs[a].head;
            self.graph.push_arc(sister(a), bottleneck);
            if !(self.graph.arcs[sister(a)].r_cap > zero()) {
                self.set_orphan_front(i);
            }
            i = parent;
        }
        let root = &mut self.graph.nodes[i];
        root.tr_cap -= bottleneck;
        root.flow_source += bottleneck;
        if root.tr_cap == zero() {
            self.set_orphan_front(i);
        }

        let mut i = sink_end;
        while let Parent::Arc(a) = self.graph.nodes[i].parent {
            let parent = self.graph.arcs[a].head;
            self.graph.push_arc(a, bottleneck);
            if !(self.graph.arcs[a].r_cap > zero()) {
                self.set_orphan_front(i);
            }
            i = parent;
        }
        let root = &mut self.graph.nodes[i];
        root.tr_cap += bottleneck;
        root.flow_sink += bottleneck;
        if root.tr_cap == zero() {
            self.set_orphan_front(i);
        }

        // never above the source capacity total, which add_tedge keeps in range
        self.graph.flow += bottleneck;
        bottleneck
    }

    fn adopt_orphans(&mut self) {
        while let Some(i) = self.orphans.pop_front() {
            self.stats.orphans += 1;
            self.process_orphan(i);
        }
    }

    /// Looks for a new parent of `i` in its own tree, preferring the one
    /// closest to the terminal. Without one, `i` becomes free and its
    /// children become orphans.
    fn process_orphan(&mut self, i: NodeId) {
        let is_sink = self.graph.nodes[i].is_sink;
        let mut best: Option<(usize, u32)> = None;

        let mut next = self.graph.nodes[i].first;
        while let Some(arc) = next {
            next = self.graph.arcs[arc].next;
            if !(self.graph.arcs[Self::tree_link(arc, is_sink)].r_cap > zero()) {
                continue;
            }
            let j = self.graph.arcs[arc].head;
            let neighbour = &self.graph.nodes[j];
            if neighbour.is_sink != is_sink || neighbour.parent == Parent::Free {
                continue;
            }
            if let Some(d) = self.terminal_distance(j) {
                if best.map_or(true, |(_, d_min)| d < d_min) {
                    best = Some((arc, d));
                }
                self.mark_path(j, d);
            }
        }

        match best {
            Some((arc, d)) => {
                let node = &mut self.graph.nodes[i];
                node.parent = Parent::Arc(arc);
                node.ts = self.time;
                node.dist = d + 1;
            }
            None => self.release_orphan(i, is_sink),
        }
    }

    /// Distance from `j` to its terminal, or `None` if the path runs into an
    /// orphan. Nodes verified in the current round carry `ts == time`.
    fn terminal_distance(&mut self, mut j: NodeId) -> Option<u32> {
        let mut d = 0;
        loop {
            let node = &mut self.graph.nodes[j];
            if node.ts == self.time {
                return Some(d + node.dist);
            }
            d += 1;
            match node.parent {
                Parent::Terminal => {
                    node.ts = self.time;
                    node.dist = 1;
                    return Some(d);
                }
                Parent::Arc(a) => j = self.graph.arcs[a].head,
                Parent::Orphan | Parent::Free => return None,
            }
        }
    }

    fn mark_path(&mut self, mut j: NodeId, mut d: u32) {
        while self.graph.nodes[j].ts != self.time {
            let node = &mut self.graph.nodes[j];
            node.ts = self.time;
            node.dist = d;
            d = d.saturating_sub(1);
            match node.parent {
                Parent::Arc(a) => j = self.graph.arcs[a].head,
                _ => break,
            }
        }
    }

    fn release_orphan(&mut self, i: NodeId, is_sink: bool) {
        self.graph.nodes[i].parent = Parent::Free;

        let mut next = self.graph.nodes[i].first;
        while let Some(arc) = next {
            next = self.graph.arcs[arc].next;
            let j = self.graph.arcs[arc].head;
            let neighbour = &self.graph.nodes[j];
            if neighbour.is_sink != is_sink || neighbour.parent == Parent::Free {
                continue;
            }
            let parent = neighbour.parent;
            if self.graph.arcs[Self::tree_link(arc, is_sink)].r_cap > zero() {
                self.set_active(j);
            }
            if let Parent::Arc(a) = parent {
                if self.graph.arcs[a].head == i {
                    self.set_orphan_rear(j);
                }
            }
        }
    }
}

impl<NUM: FlowNum> FlowNetwork<NUM> {
    /// Computes the maximum flow. Calling it again without modifications
    /// returns the same value; after an interruption it resumes from the
    /// flow pushed so far.
    pub fn maxflow(&mut self) -> Result<NUM> {
        if self.solved {
            return Ok(self.flow);
        }
        MaxFlowSolver::new(self).run()
    }

    pub fn max_flow_value(&self) -> Result<NUM> {
        if !self.solved {
            return Err(SurfcutError::NotSolved);
        }
        Ok(self.flow)
    }

    /// Side of the minimum cut node `n` belongs to. Nodes reached by neither
    /// tree are on the sink side.
    pub fn get_segment(&self, n: NodeId) -> Result<TerminalType> {
        self.check_node(n)?;
        if !self.solved {
            return Err(SurfcutError::NotSolved);
        }
        let node = &self.nodes[n];
        if node.parent != Parent::Free && !node.is_sink {
            Ok(TerminalType::Source)
        } else {
            Ok(TerminalType::Sink)
        }
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }
}
