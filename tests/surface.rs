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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use surfcut::basetypes::*;
use surfcut::{SurfaceLayerBuilder, SurfaceProblem, SurfaceSolver};

fn quiet() -> SolverConfig {
    SolverConfig::default().with_log_level(LogLevel::Quiet)
}

// Integer valued costs keep every sum exact in f64.
fn random_costs(rng: &mut StdRng, num_levels: usize) -> Vec<f64> {
    (0..num_levels).map(|_| rng.gen_range(0..20) as f64).collect()
}

/// Optimal cost of a chain of columns where neighbours differ by at most
/// `max_gradient` levels.
fn chain_optimum(costs: &[Vec<f64>], max_gradient: usize) -> f64 {
    let mut best = costs[0].clone();
    for column in &costs[1..] {
        best = column
            .iter()
            .enumerate()
            .map(|(level, cost)| {
                let low = level.saturating_sub(max_gradient);
                let high = (level + max_gradient).min(best.len() - 1);
                let reachable = best[low..=high].iter().cloned().fold(f64::INFINITY, f64::min);
                cost + reachable
            })
            .collect();
    }
    best.into_iter().fold(f64::INFINITY, f64::min)
}

fn chain_solver(costs: &[Vec<f64>], num_levels: usize, max_gradient: usize) -> SurfaceSolver {
    let num_columns = costs.len();
    let mut solver = SurfaceSolver::with_config(
        num_columns,
        num_columns - 1,
        num_levels,
        max_gradient as i64,
        quiet(),
    )
    .unwrap();
    solver.add_nodes(num_columns).unwrap();
    for (column, c) in costs.iter().enumerate() {
        solver.set_level_costs(column, c).unwrap();
    }
    for column in 1..num_columns {
        solver.add_edge(column - 1, column).unwrap();
    }
    solver
}

fn assert_feasible(solver: &SurfaceSolver, max_gradient: usize) {
    let levels = solver.levels().unwrap();
    for (a, b, d) in solver.problem().adjacencies() {
        assert!(d <= max_gradient);
        assert!(
            levels[a].abs_diff(levels[b]) <= d,
            "columns {} and {} at {} and {}",
            a,
            b,
            levels[a],
            levels[b]
        );
    }
}

#[test]
fn test_independent_columns_take_their_minimum() {
    let mut rng = StdRng::seed_from_u64(17);
    let num_levels = 6;
    let costs: Vec<Vec<f64>> = (0..40).map(|_| random_costs(&mut rng, num_levels)).collect();

    let mut solver = SurfaceSolver::with_config(costs.len(), 0, num_levels, 1, quiet()).unwrap();
    solver.add_nodes(costs.len()).unwrap();
    for (column, c) in costs.iter().enumerate() {
        solver.set_level_costs(column, c).unwrap();
    }

    let expected: f64 = costs
        .iter()
        .map(|c| c.iter().cloned().fold(f64::INFINITY, f64::min))
        .sum();
    assert_eq!(solver.min_surface().unwrap(), expected);
    for (column, c) in costs.iter().enumerate() {
        let level = solver.level(column).unwrap();
        assert_eq!(c[level], c.iter().cloned().fold(f64::INFINITY, f64::min));
    }
}

#[test]
fn test_random_chains_match_dynamic_programming() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..30 {
        let num_columns = rng.gen_range(2..40);
        let num_levels = rng.gen_range(2..9);
        let max_gradient = rng.gen_range(0..3);
        let costs: Vec<Vec<f64>> = (0..num_columns)
            .map(|_| random_costs(&mut rng, num_levels))
            .collect();

        let mut solver = chain_solver(&costs, num_levels, max_gradient);
        let value = solver.min_surface().unwrap();
        assert_eq!(value, chain_optimum(&costs, max_gradient));
        assert_feasible(&solver, max_gradient);
        assert_eq!(solver.problem().cost_of(solver.levels().unwrap()).unwrap(), value);
    }
}

#[test]
fn test_long_chain_with_unit_gradient() {
    let mut rng = StdRng::seed_from_u64(1000);
    let (num_columns, num_levels) = (500, 20);
    let costs: Vec<Vec<f64>> = (0..num_columns)
        .map(|_| random_costs(&mut rng, num_levels))
        .collect();

    let mut solver = chain_solver(&costs, num_levels, 1);
    assert_eq!(solver.min_surface().unwrap(), chain_optimum(&costs, 1));
    assert_feasible(&solver, 1);
    assert!(solver.stats().unwrap().augmentations > 0);
}

#[test]
fn test_small_grid_matches_exhaustive_search() {
    // 2 x 3 grid with per-edge gradient bounds
    let mut rng = StdRng::seed_from_u64(31);
    let num_levels = 3;
    let num_columns = 6;
    let pairs = [(0, 1), (1, 2), (3, 4), (4, 5), (0, 3), (1, 4), (2, 5)];

    for _ in 0..20 {
        let costs: Vec<Vec<f64>> = (0..num_columns)
            .map(|_| random_costs(&mut rng, num_levels))
            .collect();
        let bounds: Vec<usize> = pairs.iter().map(|_| rng.gen_range(0..3)).collect();

        let mut solver =
            SurfaceSolver::with_config(num_columns, pairs.len(), num_levels, 2, quiet()).unwrap();
        solver.add_nodes(num_columns).unwrap();
        for (column, c) in costs.iter().enumerate() {
            solver.set_level_costs(column, c).unwrap();
        }
        for (&(u, v), &d) in pairs.iter().zip(&bounds) {
            solver.add_edge_with_gradient(u, v, d as i64).unwrap();
        }

        let mut best = f64::INFINITY;
        for code in 0..num_levels.pow(num_columns as u32) {
            let levels: Vec<usize> = (0..num_columns)
                .map(|column| code / num_levels.pow(column as u32) % num_levels)
                .collect();
            let feasible = pairs
                .iter()
                .zip(&bounds)
                .all(|(&(u, v), &d)| levels[u].abs_diff(levels[v]) <= d);
            if feasible {
                let cost: f64 = levels.iter().enumerate().map(|(c, &l)| costs[c][l]).sum();
                best = best.min(cost);
            }
        }

        assert_eq!(solver.min_surface().unwrap(), best);
        assert_feasible(&solver, 2);
    }
}

#[test]
fn test_fractional_costs() {
    let mut solver = SurfaceSolver::with_config(2, 1, 3, 1, quiet()).unwrap();
    solver.add_nodes(2).unwrap();
    solver.set_level_costs(0, &[0.25, 0.75, 2.5]).unwrap();
    solver.set_level_costs(1, &[3.5, 1.5, 0.125]).unwrap();
    solver.add_edge(0, 1).unwrap();
    // (0, 1) costs 1.75, (1, 2) costs 0.875, (1, 1) costs 2.25
    assert_eq!(solver.min_surface().unwrap(), 0.875);
    assert_eq!(solver.levels().unwrap(), &[1, 2]);
}

#[test]
fn test_layered_network_flow_is_conserved() {
    let mut rng = StdRng::seed_from_u64(41);
    let (num_columns, num_levels) = (6, 5);
    let mut problem = SurfaceProblem::new(num_levels).unwrap();
    problem.add_columns(num_columns);
    for column in 0..num_columns {
        problem
            .set_level_costs(column, &random_costs(&mut rng, num_levels))
            .unwrap();
    }
    for column in 1..num_columns {
        problem.add_adjacency(column - 1, column, 1).unwrap();
    }

    let mut layered = SurfaceLayerBuilder::new(&problem, quiet()).build().unwrap();
    let cut = layered.network_mut().maxflow().unwrap();
    let network = layered.network();

    let mut excess = vec![0.0; network.node_count()];
    let mut from_source = 0.0;
    for n in 0..network.node_count() {
        let (fs, ft) = network.terminal_flow(n).unwrap();
        let (cap_source, cap_sink) = network.terminal_capacity(n).unwrap();
        assert!(fs.is_finite() && ft.is_finite());
        assert!(0.0 <= fs && fs <= cap_source);
        assert!(0.0 <= ft && ft <= cap_sink);
        excess[n] += fs - ft;
        from_source += fs;
    }
    for e in 0..network.edge_count() {
        let (u, v) = network.edge_endpoints(e).unwrap();
        let (cap, rev_cap) = network.edge_capacity(e).unwrap();
        let f = network.edge_flow(e).unwrap();
        assert!(f.is_finite(), "edge {} carries {}", e, f);
        assert!(-rev_cap <= f && f <= cap);
        excess[u] -= f;
        excess[v] += f;
    }
    assert!(excess.iter().all(|x| *x == 0.0), "{:?}", excess);
    assert_eq!(from_source, cut);
}
