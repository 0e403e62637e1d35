/*
 * OrbitalModulator - Professional Modular Synthesizer
 * Copyright (c) 2025 MACHIKO LAB
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Builds a small patch on the recording engine, renews a running
//! oscillator and prints node snapshots before and after.
//!
//! ```text
//! cargo run --example patch_roundtrip -- [config.toml]
//! ```

use anyhow::{Context, Result};
use orbital_graph::{AudioGraph, GraphConfig, NodeKind, Parameterizable, Position, RecordingEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => GraphConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => GraphConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let engine = RecordingEngine::new(&config.engine);
    let log = engine.log();
    let mut graph = AudioGraph::with_engine(engine);

    println!("🎛️  Building patch");
    let lfo = graph.create_oscillator(Some(Position::new(0.0, 0.0)))?;
    let osc = graph.create_oscillator(Some(Position::new(200.0, 0.0)))?;
    let filter = graph.create_biquad_filter(Some(Position::new(400.0, 0.0)))?;
    let vca = graph.create_gain(Some(Position::new(600.0, 0.0)))?;
    let scope = graph.create_analyser(Some(Position::new(800.0, 0.0)))?;

    graph.connect(lfo, osc)?;
    graph.connect(osc, filter)?;
    graph.connect(osc, scope)?;
    graph.connect(filter, vca)?;

    if let Some(node) = graph.node_mut(lfo) {
        node.set_parameter("frequency", 2.0)?;
    }
    if let Some(node) = graph.node_mut(osc) {
        node.set_parameter("frequency", 110.0)?;
    }

    graph.start(lfo)?;
    graph.start(osc)?;

    let reachable: Vec<String> = graph
        .reachable(lfo)?
        .map(|node| node.kind().to_string())
        .collect();
    println!("🔗 Reachable from LFO: {}", reachable.join(" -> "));

    let before = graph
        .node(osc)
        .map(|node| node.to_string())
        .context("oscillator missing")?;
    println!("📄 Before: {}", before);

    let osc = graph.stop_and_replace(osc)?;
    let node = graph.node(osc).context("replacement missing")?;
    println!("♻️  Replaced oscillator, running = {}", node.is_running());
    println!("📄 After:  {}", node);
    let json = node.to_json()?;

    // スナップショットから複製
    let copy = graph.parse_json(&json)?;
    let copy = graph.node(copy).context("copy missing")?;
    println!(
        "✅ Parsed copy: {} {} at ({}, {})",
        copy.kind(),
        copy.uuid(),
        copy.position().x,
        copy.position().y
    );

    let oscillators = graph
        .iter()
        .filter(|node| node.kind() == NodeKind::Oscillator)
        .count();
    println!(
        "📊 {} nodes ({} oscillators), {} engine commands",
        graph.len(),
        oscillators,
        log.len()
    );

    Ok(())
}
