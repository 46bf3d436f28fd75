//! Integration test: blocks sliding along rails and turning in place while
//! the power network rewires around them.
//!
//! Layout, seen from above (+Z up the page, one character per cell):
//!
//! ```text
//!   . . G .      G  generator, wired south
//!   R - - - L    R  relay on the track, wired north and east
//!                L  lamp, wired west
//! ```
//!
//! The relay has to end up directly below the generator for the lamp to
//! light.

use voltrail_core::coord::{Coordinate, Direction, Rotation};
use voltrail_core::fixed::Fixed64;
use voltrail_core::id::{BlockId, RailStopId};
use voltrail_core::test_utils::cell;
use voltrail_power::PowerLatch;
use voltrail_world::{
    BlockSpec, CommandError, MotionState, RotationDirection, TransitionKind, UnreachableReason,
    World, WorldBuilder, WorldConfig, WorldEventKind,
};

use Direction::*;

const TICKS_PER_CELL: u64 = 4;
const ROTATION_TICKS: u64 = 8;

struct Puzzle {
    world: World,
    relay: BlockId,
    lamp_block: BlockId,
    lamp: PowerLatch,
    stops: Vec<RailStopId>,
}

fn track(builder: &mut WorldBuilder, xs: &[i32]) -> Vec<RailStopId> {
    xs.iter()
        .map(|&x| {
            let at = cell(x, 0, 0);
            builder.add_rail(at.offset(East, 1)).unwrap();
            builder.add_rail(at.offset(West, 1)).unwrap();
            builder.add_rail_stop(at).unwrap()
        })
        .collect()
}

fn puzzle() -> Puzzle {
    let lamp = PowerLatch::new();
    let mut builder = WorldBuilder::new(WorldConfig {
        rotation_ticks: ROTATION_TICKS,
        ticks_per_cell: TICKS_PER_CELL,
        ..WorldConfig::default()
    });
    let stops = track(&mut builder, &[0, 1, 2]);
    builder
        .add_block(
            BlockSpec::new("generator", cell(2, 0, 1))
                .connectors([South])
                .power_source(true)
                .interactable(false),
        )
        .unwrap();
    let relay = builder
        .add_block(
            BlockSpec::new("relay", cell(0, 0, 0))
                .connectors([North, East])
                .midpoint(),
        )
        .unwrap();
    let lamp_block = builder
        .add_block(
            BlockSpec::new("lamp", cell(3, 0, 0))
                .connectors([West])
                .interactable(false)
                .sink(lamp.clone()),
        )
        .unwrap();
    Puzzle {
        world: builder.build().unwrap(),
        relay,
        lamp_block,
        lamp,
        stops,
    }
}

fn slide(world: &mut World, block: BlockId, direction: Direction) {
    world.move_block(block, direction).unwrap();
    world.settle(100).unwrap();
}

// ---------------------------------------------------------------------------
// Test 1: Sliding the relay under the generator lights the lamp
// ---------------------------------------------------------------------------
#[test]
fn relay_slides_into_place() {
    let Puzzle {
        mut world,
        relay,
        lamp_block,
        lamp,
        stops,
    } = puzzle();
    assert!(!world.is_powered(relay));
    assert!(!lamp.is_powered());
    assert_eq!(world.movement_options(relay), vec![East, West]);

    slide(&mut world, relay, East);
    assert_eq!(world.block(relay).unwrap().home_rail_stop(), Some(stops[1]));
    assert!(!world.is_powered(relay));

    slide(&mut world, relay, East);
    assert_eq!(world.grid().block_position(relay), Some(cell(2, 0, 0)));
    assert_eq!(world.rails().occupant(stops[2]), Some(relay));
    assert_eq!(world.rails().occupant(stops[0]), None);
    assert!(world.is_powered(relay));
    assert!(world.is_powered(lamp_block));
    assert!(lamp.is_powered());
    assert!(world.power().node(relay).unwrap().midpoint().unwrap().is_lit());
}

// ---------------------------------------------------------------------------
// Test 2: Leaving the powered spot darkens the lamp as soon as the move starts
// ---------------------------------------------------------------------------
#[test]
fn moving_away_tears_power_down_immediately() {
    let Puzzle {
        mut world,
        relay,
        lamp_block,
        lamp,
        ..
    } = puzzle();
    slide(&mut world, relay, East);
    slide(&mut world, relay, East);
    assert!(lamp.is_powered());

    world.move_block(relay, West).unwrap();
    assert_eq!(world.block(relay).unwrap().motion(), MotionState::Moving);
    assert!(!world.is_powered(relay));
    assert!(!world.is_powered(lamp_block));
    assert!(!lamp.is_powered());

    world.settle(100).unwrap();
    assert_eq!(world.grid().block_position(relay), Some(cell(1, 0, 0)));
    assert!(!lamp.is_powered());
}

// ---------------------------------------------------------------------------
// Test 3: Turning the relay on the powered spot re-routes its outputs
// ---------------------------------------------------------------------------
#[test]
fn rotation_on_the_powered_spot() {
    let Puzzle {
        mut world,
        relay,
        lamp,
        ..
    } = puzzle();
    slide(&mut world, relay, East);
    slide(&mut world, relay, East);

    world.rotate(relay, RotationDirection::Left).unwrap();
    assert!(!lamp.is_powered(), "dark for the whole turn");
    world.advance(ROTATION_TICKS - 1).unwrap();
    assert!(!lamp.is_powered());
    world.step().unwrap();

    // North/East turned a quarter left faces West/North: the generator still
    // reaches the relay, but nothing points at the lamp any more.
    assert_eq!(world.grid().facing(relay), Some(Rotation::Cw270));
    assert!(world.is_powered(relay));
    assert!(!lamp.is_powered());

    world.rotate(relay, RotationDirection::Right).unwrap();
    world.settle(100).unwrap();
    assert!(lamp.is_powered());
}

// ---------------------------------------------------------------------------
// Test 4: A move toward an occupied stop is refused
// ---------------------------------------------------------------------------
#[test]
fn occupied_stop_blocks_the_move() {
    let mut builder = WorldBuilder::new(WorldConfig {
        ticks_per_cell: TICKS_PER_CELL,
        ..WorldConfig::default()
    });
    track(&mut builder, &[0, 1]);
    let left = builder.add_block(BlockSpec::new("left", cell(0, 0, 0))).unwrap();
    let right = builder.add_block(BlockSpec::new("right", cell(1, 0, 0))).unwrap();
    let mut world = builder.build().unwrap();

    let err = world.move_block(left, East).unwrap_err();
    assert_eq!(
        err,
        CommandError::Unreachable {
            block: left,
            reason: UnreachableReason::NoFreeStop,
        }
    );
    assert_eq!(world.events().buffered_count(WorldEventKind::MoveBlocked), 1);
    assert!(world.block(left).unwrap().is_idle());

    let err = world.move_block(right, East).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Unreachable {
            reason: UnreachableReason::NoFreeStop,
            ..
        }
    ));
    let err = world.move_block(left, North).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Unreachable {
            reason: UnreachableReason::NoRail,
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// Test 5: Rotating half way through a move is illegal
// ---------------------------------------------------------------------------
#[test]
fn rotate_half_way_through_a_move_is_rejected() {
    let Puzzle {
        mut world, relay, ..
    } = puzzle();
    world.move_block(relay, East).unwrap();
    world.advance(TICKS_PER_CELL / 2).unwrap();

    assert_eq!(world.transition_progress(relay), Some(Fixed64::from_num(0.5)));
    let position = world.interpolated_position(relay).unwrap();
    assert_eq!(position[0], Fixed64::from_num(2.5));

    let err = world.rotate(relay, RotationDirection::Right).unwrap_err();
    assert_eq!(
        err,
        CommandError::IllegalTransition {
            block: relay,
            state: MotionState::Moving,
        }
    );
    assert_eq!(world.transition(relay).unwrap().kind(), TransitionKind::Move);

    // The move finishes on schedule and the block accepts commands again.
    world.advance(TICKS_PER_CELL / 2).unwrap();
    assert_eq!(world.grid().block_position(relay), Some(cell(1, 0, 0)));
    world.rotate(relay, RotationDirection::Right).unwrap();
}

// ---------------------------------------------------------------------------
// Test 6: Two blocks cannot claim the same destination
// ---------------------------------------------------------------------------
#[test]
fn shared_destination_goes_to_the_first_mover() {
    let mut builder = WorldBuilder::new(WorldConfig {
        ticks_per_cell: TICKS_PER_CELL,
        ..WorldConfig::default()
    });
    track(&mut builder, &[0, 1, 2]);
    let west = builder.add_block(BlockSpec::new("west", cell(0, 0, 0))).unwrap();
    let east = builder.add_block(BlockSpec::new("east", cell(2, 0, 0))).unwrap();
    let mut world = builder.build().unwrap();

    world.move_block(west, East).unwrap();
    let err = world.move_block(east, West).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Unreachable {
            reason: UnreachableReason::NoFreeStop,
            ..
        }
    ));

    world.settle(100).unwrap();
    assert_eq!(world.block_at(cell(1, 0, 0)), Some(west));
    assert_eq!(world.block_at(cell(2, 0, 0)), Some(east));
}

// ---------------------------------------------------------------------------
// Test 7: Raw input vectors must be a single axis
// ---------------------------------------------------------------------------
#[test]
fn diagonal_input_is_unreachable() {
    let Puzzle {
        mut world, relay, ..
    } = puzzle();
    let err = world.move_toward(relay, (1, 0, 1)).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Unreachable {
            reason: UnreachableReason::NotAxisAligned,
            ..
        }
    ));

    world.move_toward(relay, (3, 0, 0)).unwrap();
    world.settle(100).unwrap();
    assert_eq!(
        world.grid().block_position(relay),
        Some(Coordinate::new(5, 0, 0))
    );
}
