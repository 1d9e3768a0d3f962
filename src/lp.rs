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

//! Export of a flow network as a linear program in CPLEX LP format, for
//! checking the max-flow value with an external LP solver.
//!
//! Variables: `s<n>` / `t<n>` for the terminal edges of node `n`, `f<k>` /
//! `r<k>` for the forward / reverse direction of edge `k`.

use crate::basetypes::*;
use crate::error::Result;
use crate::graph::{sister, FlowNetwork};

use itertools::Itertools;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const TERMS_PER_LINE: usize = 8;

fn arc_var(arc: usize) -> String {
    if arc % 2 == 0 {
        format!("f{}", arc / 2)
    } else {
        format!("r{}", arc / 2)
    }
}

fn upper_bound<NUM: FlowNum>(cap: NUM) -> String {
    match cap.to_f64() {
        Some(value) if value.is_infinite() => "+inf".to_string(),
        _ => format!("{}", cap),
    }
}

pub fn write_lp<NUM: FlowNum, W: Write>(network: &FlowNetwork<NUM>, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "\\ flow network with {} nodes and {} edges",
        network.node_count(),
        network.edge_count()
    )?;

    writeln!(out, "Maximize")?;
    if network.node_count() == 0 {
        writeln!(out, " obj:")?;
    }
    for (index, mut chunk) in (0..network.node_count())
        .map(|n| format!("s{}", n))
        .chunks(TERMS_PER_LINE)
        .into_iter()
        .enumerate()
    {
        let prefix = if index == 0 { " obj: " } else { "  + " };
        writeln!(out, "{}{}", prefix, chunk.join(" + "))?;
    }

    // flow conservation
    writeln!(out, "Subject To")?;
    for (n, node) in network.nodes.iter().enumerate() {
        let mut terms = vec![format!("s{}", n), format!("- t{}", n)];
        let mut next = node.first;
        while let Some(arc) = next {
            terms.push(format!("- {}", arc_var(arc)));
            terms.push(format!("+ {}", arc_var(sister(arc))));
            next = network.arcs[arc].next;
        }
        let lines = terms
            .chunks(TERMS_PER_LINE)
            .map(|chunk| chunk.join(" "))
            .join("\n   ");
        writeln!(out, " n{}: {} = 0", n, lines)?;
    }

    writeln!(out, "Bounds")?;
    for (n, node) in network.nodes.iter().enumerate() {
        writeln!(out, " 0 <= s{} <= {}", n, upper_bound(node.cap_source))?;
        writeln!(out, " 0 <= t{} <= {}", n, upper_bound(node.cap_sink))?;
    }
    for (arc, data) in network.arcs.iter().enumerate() {
        writeln!(out, " 0 <= {} <= {}", arc_var(arc), upper_bound(data.cap))?;
    }
    writeln!(out, "End")?;
    Ok(())
}

impl<NUM: FlowNum> FlowNetwork<NUM> {
    /// Writes the network as an LP whose optimum is the maximum flow.
    pub fn dump_lp(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write_lp(self, &mut out)?;
        out.flush()?;
        Ok(())
    }
}
