// src/bin/mesh_tree_replay.rs
//! Replays a recorded stream of mesh events into a topology store and
//! prints the resulting tree document.
//!
//! Input is JSON lines, one `MeshEvent` per line, e.g.
//!   {"type":"node_updated","node":"24:6f:28:bb:00:01","parent":"24:6f:28:aa:00:01","layer":2}
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mesh_tree::{apply_event, MeshEvent, MeshTreeStore, NodeAddr};

#[derive(Parser, Debug)]
#[command(name = "mesh-tree-replay", about = "Replay mesh events and print the topology tree")]
struct Args {
    /// Address of the local (root) node
    #[arg(long)]
    local: NodeAddr,

    /// JSON-lines event file; reads stdin when omitted
    events: Option<PathBuf>,

    /// Routing table to reconcile against after replay (comma separated)
    #[arg(long, value_delimiter = ',')]
    reachable: Option<Vec<NodeAddr>>,

    /// Pretty-print the tree instead of a single line
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let store = MeshTreeStore::new(args.local);

    let reader: Box<dyn BufRead> = match &args.events {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut applied = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: MeshEvent =
            serde_json::from_str(line).with_context(|| format!("line {}", i + 1))?;
        match apply_event(&store, &event) {
            Ok(_) => applied += 1,
            Err(e) => log::warn!("line {}: {}", i + 1, e),
        }
    }
    log::info!("Applied {} event(s), tracking {} node(s)", applied, store.len()?);

    if let Some(reachable) = &args.reachable {
        let result = store.reconcile(reachable)?;
        if result.changed() {
            log::info!("Reconcile removed {} node(s)", result.removed.len());
        }
    }

    let document = if args.pretty {
        serde_json::to_string_pretty(&store.tree()?)?
    } else {
        store.render()?
    };
    println!("{}", document);

    Ok(())
}
