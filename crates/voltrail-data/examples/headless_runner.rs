//! Load a level, play a short scripted solution and log the power state.
//!
//! ```text
//! RUST_LOG=debug cargo run -p voltrail-data --example headless_runner [level]
//! ```

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use voltrail_core::coord::Direction;
use voltrail_data::load_level;
use voltrail_world::{RotationDirection, World, WorldEvent, WorldEventKind};

enum Step {
    Move(&'static str, Direction),
    Rotate(&'static str, RotationDirection),
}

const SCRIPT: &[Step] = &[
    Step::Move("relay", Direction::East),
    Step::Move("relay", Direction::East),
    Step::Rotate("relay", RotationDirection::Right),
    Step::Rotate("relay", RotationDirection::Left),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("levels/demo.ron"));
    let mut world = load_level(&path)?;

    for kind in [WorldEventKind::BlockEnergized, WorldEventKind::BlockDeenergized] {
        world.events_mut().on_passive(
            kind,
            Box::new(|event| match event {
                WorldEvent::BlockEnergized { block, tick } => {
                    tracing::info!(?block, tick, "energized");
                }
                WorldEvent::BlockDeenergized { block, tick } => {
                    tracing::info!(?block, tick, "de-energized");
                }
                _ => {}
            }),
        );
    }

    report(&world);
    for step in SCRIPT {
        let outcome = match *step {
            Step::Move(name, direction) => {
                let block = world.block_by_name(name).ok_or("unknown block in script")?;
                world.move_block(block, direction)
            }
            Step::Rotate(name, direction) => {
                let block = world.block_by_name(name).ok_or("unknown block in script")?;
                world.rotate(block, direction)
            }
        };
        if let Err(err) = outcome {
            tracing::warn!(%err, "command rejected");
        }
        let settled = world.settle(10_000)?;
        tracing::info!(steps = settled.steps_run, tick = world.tick(), "settled");
        report(&world);
    }
    Ok(())
}

fn report(world: &World) {
    for (id, block) in world.blocks() {
        let Some(snapshot) = world.block_snapshot(id) else {
            continue;
        };
        tracing::info!(
            name = block.name(),
            position = %snapshot.position,
            facing = ?snapshot.facing,
            powered = snapshot.powered,
            "block"
        );
    }
}
