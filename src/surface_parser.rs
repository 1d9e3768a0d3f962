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
use surfcut::SurfaceSolver;

// Line format, ids are 0-based:
//   p surface COLUMNS LEVELS MAX_GRADIENT
//   n COLUMN COST_0 ... COST_{LEVELS-1}
//   e U V [MAX_GRADIENT]
//   c comment
pub fn parsed_surface(filename: &str, config: SolverConfig) -> Result<SurfaceSolver> {
    let contents = fs::read_to_string(filename)?;
    parse_surface(&contents, config)
}

fn field<T: std::str::FromStr>(line: usize, value: &str, what: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| SurfcutError::parse(line, format!("invalid {} '{}'", what, value)))
}

pub fn parse_surface(contents: &str, config: SolverConfig) -> Result<SurfaceSolver> {
    let mut solver: Option<SurfaceSolver> = None;

    for (index, x) in contents.lines().enumerate() {
        let line = index + 1;
        let mut tokens = x.split_whitespace();
        let kind = match tokens.next() {
            None | Some("c") => continue,
            Some(kind) => kind,
        };
        if kind == "p" {
            if solver.is_some() {
                return Err(SurfcutError::parse(line, "duplicate problem line"));
            }
            let (name, columns, levels, gradient) = tokens.collect_tuple().ok_or_else(|| {
                SurfcutError::parse(line, "expected 'p surface COLUMNS LEVELS MAX_GRADIENT'")
            })?;
            if name != "surface" {
                return Err(SurfcutError::parse(
                    line,
                    format!("unsupported problem type '{}'", name),
                ));
            }
            let columns: usize = field(line, columns, "column count")?;
            let levels: usize = field(line, levels, "level count")?;
            let gradient: i64 = field(line, gradient, "gradient")?;
            let mut s = SurfaceSolver::with_config(columns, 0, levels, gradient, config.clone())?;
            s.add_nodes(columns)?;
            solver = Some(s);
            continue;
        }

        let s = solver
            .as_mut()
            .ok_or_else(|| SurfcutError::parse(line, "expected the problem line first"))?;
        match kind {
            "n" => {
                let column = tokens
                    .next()
                    .ok_or_else(|| SurfcutError::parse(line, "expected 'n COLUMN COSTS...'"))?;
                let column: NodeId = field(line, column, "column")?;
                let costs = tokens
                    .map(|cost| field::<f64>(line, cost, "cost"))
                    .collect::<Result<Vec<_>>>()?;
                s.set_level_costs(column, &costs)?;
            }
            "e" => {
                let ids = tokens.collect_vec();
                match ids.as_slice() {
                    [u, v] => s.add_edge(field(line, u, "column")?, field(line, v, "column")?)?,
                    [u, v, d] => s.add_edge_with_gradient(
                        field(line, u, "column")?,
                        field(line, v, "column")?,
                        field(line, d, "gradient")?,
                    )?,
                    _ => return Err(SurfcutError::parse(line, "expected 'e U V [MAX_GRADIENT]'")),
                }
            }
            other => {
                return Err(SurfcutError::parse(
                    line,
                    format!("unknown line type '{}'", other),
                ))
            }
        }
    }

    solver.ok_or_else(|| SurfcutError::parse(0, "missing problem line"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_solve() {
        let text = "c three columns in a line\n\
                    p surface 3 5 1\n\
                    n 0 5 0 5 5 5\n\
                    n 1 5 5 0 5 5\n\
                    n 2 5 5 5 0 5\n\
                    e 0 1\n\
                    e 1 2\n";
        let mut solver = parse_surface(text, SolverConfig::default()).unwrap();
        assert_eq!(solver.problem().num_adjacencies(), 2);
        assert_eq!(solver.min_surface().unwrap(), 0.0);
        assert_eq!(solver.levels().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_per_edge_gradient() {
        let text = "p surface 2 4 3\nn 0 0 9 9 9\nn 1 9 9 9 0\ne 0 1 0\n";
        let mut solver = parse_surface(text, SolverConfig::default()).unwrap();
        assert_eq!(solver.problem().adjacencies().next(), Some((0, 1, 0)));
        assert_eq!(solver.min_surface().unwrap(), 9.0);
        assert_eq!(solver.level(0).unwrap(), solver.level(1).unwrap());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_surface("n 0 1 2\n", SolverConfig::default()),
            Err(SurfcutError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_surface("p surface 1 2 1\nn 0 1 x\n", SolverConfig::default()),
            Err(SurfcutError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_surface("p surface 1 2 1\nn 0 1\n", SolverConfig::default()),
            Err(SurfcutError::InvalidLevelCost(_))
        ));
        assert!(matches!(
            parse_surface("p surface 2 2 1\ne 0 5\n", SolverConfig::default()),
            Err(SurfcutError::InvalidAdjacency(_))
        ));
        assert!(matches!(
            parse_surface("p surface 2 2 1\ne 0\n", SolverConfig::default()),
            Err(SurfcutError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_surface("p surface 2 2 -1\n", SolverConfig::default()),
            Err(SurfcutError::InvalidAdjacency(_))
        ));
    }
}
