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

use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::path::PathBuf;
use std::process::ExitCode;
use surfcut::basetypes::*;
use surfcut::error::Result;
use tracing::error;

use crate::dimacs_parser::parsed_graph;
use crate::surface_parser::parsed_surface;
mod dimacs_parser;
mod surface_parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// quiet, error, user, debug or all
    #[arg(short, long, global = true, default_value_t = LogLevel::User)]
    log_level: LogLevel,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Maximum flow of a DIMACS max-flow file
    Maxflow {
        /// path to file
        #[arg(short, long)]
        filename: String,
        /// read capacities as floating point numbers
        #[arg(long)]
        float: bool,
        /// print the side of the cut of every node
        #[arg(short, long)]
        segments: bool,
        /// write the network as an LP file
        #[arg(long)]
        dump_lp: Option<PathBuf>,
    },
    /// Minimal surface of a surface file
    Surface {
        /// path to file
        #[arg(short, long)]
        filename: String,
        /// write the layered network as an LP file
        #[arg(long)]
        dump_lp: Option<PathBuf>,
    },
}

fn solve_maxflow<NUM: FlowNum>(
    filename: &str,
    segments: bool,
    dump_lp: Option<PathBuf>,
    config: SolverConfig,
) -> Result<()> {
    let mut parsed = parsed_graph::<NUM>(filename, config)?;
    if let Some(path) = dump_lp {
        parsed.network.dump_lp(path)?;
    }
    let flow = parsed.network.maxflow()?;
    print_status(filename, &format!("{}", flow), parsed.network.stats());
    if segments {
        println!("source = {}, sink = {}", parsed.source + 1, parsed.sink + 1);
        for n in 0..parsed.network.node_count() {
            println!("{} {}", n + 1, parsed.network.get_segment(n)?);
        }
    }
    Ok(())
}

fn solve_surface(filename: &str, dump_lp: Option<PathBuf>, config: SolverConfig) -> Result<()> {
    let mut solver = parsed_surface(filename, config)?;
    if let Some(path) = dump_lp {
        solver.dump_lp(path)?;
    }
    let cost = solver.min_surface()?;
    let stats = solver.stats().copied().unwrap_or_default();
    print_status(filename, &format!("{}", cost), &stats);
    let levels = solver.levels()?;
    println!("levels = {}", levels.iter().join(" "));
    Ok(())
}

fn print_status(file: &str, value: &str, stats: &SolveStats) {
    println!(
        "{:?}, value = {}, augmentations = {}, time = {:.3}",
        file,
        value,
        stats.augmentations,
        stats.elapsed.as_secs_f64()
    );
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level.level_filter())
        .with_target(false)
        .init();
    let log_level = args.log_level;
    let config = SolverConfig::default().with_log_level(log_level);

    let result = match args.command {
        Command::Maxflow {
            filename,
            float,
            segments,
            dump_lp,
        } => {
            if float {
                solve_maxflow::<f64>(&filename, segments, dump_lp, config)
            } else {
                solve_maxflow::<i64>(&filename, segments, dump_lp, config)
            }
        }
        Command::Surface { filename, dump_lp } => solve_surface(&filename, dump_lp, config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if log_level.enabled(LogLevel::Error) {
                error!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}
