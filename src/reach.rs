//! Flood fill over a level, to find ice nobody can ever melt.

use aglet::Coord;
use ahash::AHashSet;

use crate::{Direction, Level, Tile};

/// Every ice cell that can't be reached by walking from `from`.
///
/// This is optimistic: locks count as open and teleports count as reusable,
/// so an empty result doesn't promise a perfect run exists. A non-empty one
/// does promise it doesn't.
///
/// The result is in row-major order.
pub fn unreachable_ice(level: &Level, from: Coord, debug: bool) -> Vec<Coord> {
  let reachable = flood(level, from, debug);

  let missed = level
    .grid()
    .iter()
    .filter(|&(coord, tile)| {
      tile.melt_weight() > 0 && !reachable.contains(&coord)
    })
    .map(|(coord, _)| coord)
    .collect::<Vec<_>>();
  dbgprn!(debug, "{} ice cells out of reach: {:?}", missed.len(), &missed);
  missed
}

fn flood(level: &Level, from: Coord, debug: bool) -> AHashSet<Coord> {
  let mut seen = AHashSet::new();
  if !level.grid().inside(from) {
    return seen;
  }
  let pair = level.teleports();

  let mut todo = vec![from];
  while let Some(here) = todo.pop() {
    if !seen.insert(here) {
      continue;
    }
    for dir in Direction::ALL {
      let Some(next) = dir.step(here) else {
        continue;
      };
      match level.tile(next) {
        // Locks open eventually, if the keys are out there.
        Some(Tile::Lock) => todo.push(next),
        Some(tile) if !tile.is_obstacle() => todo.push(next),
        _ => {}
      }
    }
    if let Some(exit) = pair.and_then(|p| p.exit_for(here)) {
      dbgprn!(debug, "teleport {} links to {}", here, exit);
      todo.push(exit);
    }
  }
  seen
}
