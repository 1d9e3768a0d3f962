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

use itertools::Itertools;
use std::fs;
use surfcut::basetypes::*;
use surfcut::error::{Result, SurfcutError};
use surfcut::FlowNetwork;

/// A DIMACS max-flow instance. The source and sink are ordinary nodes of
/// the network tied to their terminal with unbounded capacity.
pub struct DimacsGraph<NUM: FlowNum> {
    pub network: FlowNetwork<NUM>,
    pub source: NodeId,
    pub sink: NodeId,
}

pub fn parsed_graph<NUM: FlowNum>(filename: &str, config: SolverConfig) -> Result<DimacsGraph<NUM>> {
    let contents = fs::read_to_string(filename)?;
    parse_dimacs(&contents, config)
}

fn field<T: std::str::FromStr>(line: usize, value: &str, what: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| SurfcutError::parse(line, format!("invalid {} '{}'", what, value)))
}

// DIMACS ids are 1-based
fn node_id(line: usize, value: &str, node_count: usize) -> Result<NodeId> {
    let id: usize = field(line, value, "node id")?;
    if id == 0 || id > node_count {
        return Err(SurfcutError::parse(
            line,
            format!("node id {} outside 1..={}", id, node_count),
        ));
    }
    Ok(id - 1)
}

pub fn parse_dimacs<NUM: FlowNum>(contents: &str, config: SolverConfig) -> Result<DimacsGraph<NUM>> {
    let mut network: Option<FlowNetwork<NUM>> = None;
    let mut source = None;
    let mut sink = None;

    for (index, x) in contents.lines().enumerate() {
        let line = index + 1;
        let mut tokens = x.split_whitespace();
        match tokens.next() {
            None | Some("c") => continue,
            Some("p") => {
                if network.is_some() {
                    return Err(SurfcutError::parse(line, "duplicate problem line"));
                }
                let (kind, nodes, arcs) = tokens
                    .collect_tuple()
                    .ok_or_else(|| SurfcutError::parse(line, "expected 'p max NODES ARCS'"))?;
                if kind != "max" {
                    return Err(SurfcutError::parse(
                        line,
                        format!("unsupported problem type '{}'", kind),
                    ));
                }
                let nodes: usize = field(line, nodes, "node count")?;
                let arcs: usize = field(line, arcs, "arc count")?;
                let mut graph = FlowNetwork::with_config(nodes, arcs, config.clone());
                graph.add_nodes(nodes)?;
                network = Some(graph);
            }
            Some("n") => {
                let graph = network
                    .as_mut()
                    .ok_or_else(|| SurfcutError::parse(line, "node line before problem line"))?;
                let (id, kind) = tokens
                    .collect_tuple()
                    .ok_or_else(|| SurfcutError::parse(line, "expected 'n ID s|t'"))?;
                let id = node_id(line, id, graph.node_count())?;
                match kind {
                    "s" => {
                        graph.add_tedge(id, NUM::big_value(), num_traits::zero())?;
                        source = Some(id);
                    }
                    "t" => {
                        graph.add_tedge(id, num_traits::zero(), NUM::big_value())?;
                        sink = Some(id);
                    }
                    other => {
                        return Err(SurfcutError::parse(
                            line,
                            format!("unknown terminal '{}'", other),
                        ))
                    }
                }
            }
            Some("a") => {
                let graph = network
                    .as_mut()
                    .ok_or_else(|| SurfcutError::parse(line, "arc line before problem line"))?;
                let (u, v, capacity) = tokens
                    .collect_tuple()
                    .ok_or_else(|| SurfcutError::parse(line, "expected 'a U V CAPACITY'"))?;
                let u = node_id(line, u, graph.node_count())?;
                let v = node_id(line, v, graph.node_count())?;
                let capacity: NUM = field(line, capacity, "capacity")?;
                graph.add_edge(u, v, capacity, num_traits::zero())?;
            }
            Some(other) => {
                return Err(SurfcutError::parse(
                    line,
                    format!("unknown line type '{}'", other),
                ))
            }
        }
    }

    let network = network.ok_or_else(|| SurfcutError::parse(0, "missing problem line"))?;
    let source = source.ok_or_else(|| SurfcutError::parse(0, "missing source node"))?;
    let sink = sink.ok_or_else(|| SurfcutError::parse(0, "missing sink node"))?;
    Ok(DimacsGraph {
        network,
        source,
        sink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "c two paths from 1 to 4\n\
                         p max 4 5\n\
                         n 1 s\n\
                         n 4 t\n\
                         a 1 2 4\n\
                         a 1 3 2\n\
                         a 2 3 3\n\
                         a 2 4 1\n\
                         a 3 4 5\n";

    #[test]
    fn test_parse_and_solve_small_instance() {
        let mut parsed = parse_dimacs::<i64>(SMALL, SolverConfig::default()).unwrap();
        assert_eq!(parsed.source, 0);
        assert_eq!(parsed.sink, 3);
        assert_eq!(parsed.network.node_count(), 4);
        assert_eq!(parsed.network.edge_count(), 5);
        assert_eq!(parsed.network.edge_endpoints(2), Some((1, 2)));
        assert_eq!(parsed.network.maxflow().unwrap(), 6);
        assert_eq!(
            parsed.network.get_segment(parsed.source).unwrap(),
            TerminalType::Source
        );
        assert_eq!(
            parsed.network.get_segment(parsed.sink).unwrap(),
            TerminalType::Sink
        );
    }

    #[test]
    fn test_float_capacities() {
        let text = "p max 2 1\nn 1 s\nn 2 t\na 1 2 2.5\n";
        let mut parsed = parse_dimacs::<f64>(text, SolverConfig::default()).unwrap();
        assert_eq!(parsed.network.maxflow().unwrap(), 2.5);
    }

    #[test]
    fn test_malformed_input_reports_line() {
        let cases = [
            ("n 1 s\n", 1),
            ("p max 2 1\nn 3 s\n", 2),
            ("p max 2 1\nn 1 x\n", 2),
            ("p max 2 1\nn 1 s\nn 2 t\na 1 2\n", 4),
            ("p max 2 1\nn 1 s\nn 2 t\na 1 2 -3\n", 4),
            ("p min 2 1\n", 1),
            ("p max 2 1\nq\n", 2),
        ];
        for (text, expected) in cases {
            match parse_dimacs::<i64>(text, SolverConfig::default()) {
                Err(SurfcutError::Parse { line, .. }) => assert_eq!(line, expected, "{}", text),
                Err(SurfcutError::InvalidCapacity { .. }) => assert_eq!(expected, 4),
                other => panic!("expected an error for {:?}, got {:?}", text, other.is_ok()),
            }
        }
        assert!(parse_dimacs::<i64>("p max 2 0\nn 1 s\n", SolverConfig::default()).is_err());
    }
}
