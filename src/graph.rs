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

use num_traits::identities::zero;

/// Link from a node towards the root of its search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parent {
    /// Not in any tree.
    Free,
    /// Directly attached to the source or the sink.
    Terminal,
    /// Lost its parent during the last augmentation, waiting for adoption.
    Orphan,
    /// Arc going from this node to its parent.
    Arc(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Node<NUM: FlowNum> {
    /// Head of the singly linked list of outgoing arcs.
    pub first: Option<usize>,
    pub cap_source: NUM,
    pub cap_sink: NUM,
    /// Residual terminal capacity: positive towards the source, negative
    /// towards the sink.
    pub tr_cap: NUM,
    /// Flow received from the source and sent to the sink.
    pub flow_source: NUM,
    pub flow_sink: NUM,
    pub parent: Parent,
    pub is_sink: bool,
    pub active: bool,
    pub ts: u64,
    pub dist: u32,
}

impl<NUM: FlowNum> Node<NUM> {
    fn new() -> Self {
        Node {
            first: None,
            cap_source: zero(),
            cap_sink: zero(),
            tr_cap: zero(),
            flow_source: zero(),
            flow_sink: zero(),
            parent: Parent::Free,
            is_sink: false,
            active: false,
            ts: 0,
            dist: 0,
        }
    }
}

/// One direction of an edge. Arcs `2k` and `2k + 1` are sisters.
#[derive(Debug, Clone)]
pub(crate) struct FlowArc<NUM: FlowNum> {
    pub head: NodeId,
    /// Next arc leaving the same tail.
    pub next: Option<usize>,
    pub cap: NUM,
    pub r_cap: NUM,
}

#[inline(always)]
pub(crate) fn sister(arc: usize) -> usize {
    arc ^ 1
}

/// Directed flow network with terminal edges to an implicit source and sink.
///
/// Storage is reserved once at construction; node and arc indices stay
/// stable for the whole lifetime of the network, which is what lets the
/// solver keep its search trees as plain indices.
#[derive(Debug, Clone)]
pub struct FlowNetwork<NUM: FlowNum> {
    pub(crate) nodes: Vec<Node<NUM>>,
    pub(crate) arcs: Vec<FlowArc<NUM>>,
    /// Net flow of every edge in its `u -> v` direction.
    flows: Vec<NUM>,
    /// Sum of all source capacities, an upper bound of the flow value.
    source_total: NUM,
    node_num_max: usize,
    edge_num_max: usize,
    pub(crate) config: SolverConfig,
    pub(crate) flow: NUM,
    /// Terminal capacities were pushed through and trees exist.
    pub(crate) started: bool,
    pub(crate) solved: bool,
    pub(crate) stats: SolveStats,
}

impl<NUM: FlowNum> FlowNetwork<NUM> {
    pub fn new(node_num_max: usize, edge_num_max: usize) -> Self {
        Self::with_config(node_num_max, edge_num_max, SolverConfig::default())
    }

    pub fn with_config(node_num_max: usize, edge_num_max: usize, config: SolverConfig) -> Self {
        FlowNetwork {
            nodes: Vec::with_capacity(node_num_max),
            arcs: Vec::with_capacity(2 * edge_num_max),
            flows: Vec::with_capacity(edge_num_max),
            source_total: zero(),
            node_num_max,
            edge_num_max,
            config,
            flow: zero(),
            started: false,
            solved: false,
            stats: SolveStats::default(),
        }
    }

    pub fn node_num_max(&self) -> usize {
        self.node_num_max
    }

    pub fn edge_num_max(&self) -> usize {
        self.edge_num_max
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arcs.len() / 2
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Adds `num_nodes` nodes and returns the id of the first one. The ids of
    /// the new nodes are contiguous.
    pub fn add_nodes(&mut self, num_nodes: usize) -> Result<NodeId> {
        self.check_mutable()?;
        let first = self.nodes.len();
        let requested = first.saturating_add(num_nodes);
        if requested > self.node_num_max {
            return Err(SurfcutError::CapacityExceeded {
                what: "node",
                requested,
                reserved: self.node_num_max,
            });
        }
        self.nodes.extend((0..num_nodes).map(|_| Node::new()));
        Ok(first)
    }

    /// Adds an edge `u -> v` with capacity `cap` and a reverse capacity
    /// `rev_cap` for `v -> u`.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, cap: NUM, rev_cap: NUM) -> Result<EdgeId> {
        self.check_mutable()?;
        self.check_node(u)?;
        self.check_node(v)?;
        if u == v {
            return Err(SurfcutError::InvalidNode {
                node: u,
                reason: "an edge can not connect a node to itself",
            });
        }
        check_capacity(cap)?;
        check_capacity(rev_cap)?;
        // residuals move between the two arcs and may reach cap + rev_cap
        checked_sum(cap, rev_cap)?;
        let edge = self.edge_count();
        if edge + 1 > self.edge_num_max {
            return Err(SurfcutError::CapacityExceeded {
                what: "edge",
                requested: edge + 1,
                reserved: self.edge_num_max,
            });
        }

        let forward = 2 * edge;
        self.arcs.push(FlowArc {
            head: v,
            next: self.nodes[u].first,
            cap,
            r_cap: cap,
        });
        self.nodes[u].first = Some(forward);
        self.arcs.push(FlowArc {
            head: u,
            next: self.nodes[v].first,
            cap: rev_cap,
            r_cap: rev_cap,
        });
        self.nodes[v].first = Some(sister(forward));
        self.flows.push(zero());
        Ok(edge)
    }

    /// Adds terminal capacities to node `n`. Repeated calls accumulate.
    pub fn add_tedge(&mut self, n: NodeId, cap_source: NUM, cap_sink: NUM) -> Result<()> {
        self.check_mutable()?;
        self.check_node(n)?;
        check_capacity(cap_source)?;
        check_capacity(cap_sink)?;
        let node = &self.nodes[n];
        let total_source = checked_sum(node.cap_source, cap_source)?;
        let total_sink = checked_sum(node.cap_sink, cap_sink)?;
        if total_source.is_unbounded() && total_sink.is_unbounded() {
            return Err(SurfcutError::InvalidCapacity {
                value: format!("{}", total_source),
                reason: "a node can not be tied to both terminals without bound",
            });
        }
        let source_total = checked_sum(self.source_total, cap_source)?;

        let node = &mut self.nodes[n];
        node.cap_source = total_source;
        node.cap_sink = total_sink;
        self.source_total = source_total;
        Ok(())
    }

    /// Endpoints `(u, v)` of edge `e` as passed to `add_edge`.
    pub fn edge_endpoints(&self, e: EdgeId) -> Option<(NodeId, NodeId)> {
        let forward = 2 * e;
        if forward + 1 >= self.arcs.len() {
            return None;
        }
        Some((self.arcs[sister(forward)].head, self.arcs[forward].head))
    }

    /// Forward and reverse capacity of edge `e`.
    pub fn edge_capacity(&self, e: EdgeId) -> Option<(NUM, NUM)> {
        self.edge_endpoints(e)?;
        Some((self.arcs[2 * e].cap, self.arcs[2 * e + 1].cap))
    }

    /// Net flow pushed along edge `e` from `u` to `v`; negative when the
    /// flow runs from `v` to `u`.
    pub fn edge_flow(&self, e: EdgeId) -> Option<NUM> {
        self.flows.get(e).copied()
    }

    /// Accumulated `(cap_source, cap_sink)` of node `n`.
    pub fn terminal_capacity(&self, n: NodeId) -> Option<(NUM, NUM)> {
        self.nodes.get(n).map(|node| (node.cap_source, node.cap_sink))
    }

    /// Flow `(from the source, to the sink)` through the terminal edges of
    /// node `n`.
    pub fn terminal_flow(&self, n: NodeId) -> Option<(NUM, NUM)> {
        self.nodes
            .get(n)
            .map(|node| (node.flow_source, node.flow_sink))
    }

    /// Sends `amount` of flow along `arc`.
    pub(crate) fn push_arc(&mut self, arc: usize, amount: NUM) {
        self.arcs[arc].r_cap -= amount;
        self.arcs[sister(arc)].r_cap += amount;
        if arc % 2 == 0 {
            self.flows[arc / 2] += amount;
        } else {
            self.flows[arc / 2] -= amount;
        }
    }

    pub(crate) fn check_node(&self, n: NodeId) -> Result<()> {
        if n >= self.nodes.len() {
            return Err(SurfcutError::InvalidNode {
                node: n,
                reason: "node id out of range",
            });
        }
        Ok(())
    }

    fn check_mutable(&self) -> Result<()> {
        if self.started {
            return Err(SurfcutError::AlreadySolved);
        }
        Ok(())
    }
}

fn check_capacity<NUM: FlowNum>(cap: NUM) -> Result<()> {
    if !cap.is_valid_capacity() {
        return Err(SurfcutError::InvalidCapacity {
            value: format!("{}", cap),
            reason: "capacities must be non-negative numbers",
        });
    }
    Ok(())
}

fn checked_sum<NUM: FlowNum>(a: NUM, b: NUM) -> Result<NUM> {
    a.add_checked(&b).ok_or_else(|| SurfcutError::InvalidCapacity {
        value: format!("{} + {}", a, b),
        reason: "the sum overflows the capacity type",
    })
}
