use aglet::Coord;
use indexmap::IndexSet;
use thiserror::Error;

use crate::{Tile, TileGrid};

/// Two teleports bonded to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeleportPair([Coord; 2]);

impl TeleportPair {
  pub fn new(a: Coord, b: Coord) -> Self {
    Self([a, b])
  }

  pub fn ends(&self) -> [Coord; 2] {
    self.0
  }

  /// Where you come out if you walk into `entry`.
  pub fn exit_for(&self, entry: Coord) -> Option<Coord> {
    let [a, b] = self.0;
    if entry == a {
      Some(b)
    } else if entry == b {
      Some(a)
    } else {
      None
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
  #[error("start {0} is outside the grid")]
  StartOutside(Coord),
  #[error("{what} at {pos} is outside the grid")]
  ItemOutside { what: &'static str, pos: Coord },
  #[error("teleports come in pairs, found {0}")]
  UnpairedTeleports(usize),
  #[error("both ends of the teleport pair are at {0}")]
  TeleportToItself(Coord),
  #[error("start {0} is on {1:?}, which can't be stood on")]
  StartBlocked(Coord, Tile),
  #[error("start {0} is under a block")]
  StartUnderBlock(Coord),
  #[error("{what} at {pos} sits on {tile:?}")]
  ItemBlocked {
    what: &'static str,
    pos: Coord,
    tile: Tile,
  },
}

/// One puzzle: the board plus everything that sits on top of it.
///
/// The totals are worked out when the level is built. A `Game` mutates its
/// level as it goes, so a fresh copy has to be loaded to start over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
  grid: TileGrid,
  start: Coord,
  coin_bags: IndexSet<Coord>,
  keys: IndexSet<Coord>,
  blocks: Vec<Coord>,
  teleports: Option<TeleportPair>,

  total_melt_weight: u32,
  total_score: u32,
}

impl Level {
  pub fn new(
    grid: TileGrid,
    start: Coord,
    coin_bags: impl IntoIterator<Item = Coord>,
    keys: impl IntoIterator<Item = Coord>,
    blocks: impl IntoIterator<Item = Coord>,
    teleports: impl IntoIterator<Item = Coord>,
  ) -> Result<Self, LevelError> {
    if !grid.inside(start) {
      return Err(LevelError::StartOutside(start));
    }

    let coin_bags = coin_bags.into_iter().collect::<IndexSet<_>>();
    let keys = keys.into_iter().collect::<IndexSet<_>>();
    let mut blocks_dedup = Vec::new();
    for block in blocks {
      if !blocks_dedup.contains(&block) {
        blocks_dedup.push(block);
      }
    }

    let outside = coin_bags
      .iter()
      .map(|&c| ("coin bag", c))
      .chain(keys.iter().map(|&c| ("key", c)))
      .chain(blocks_dedup.iter().map(|&c| ("block", c)))
      .find(|&(_, c)| !grid.inside(c));
    if let Some((what, pos)) = outside {
      return Err(LevelError::ItemOutside { what, pos });
    }

    let start_tile = grid.get(start).unwrap_or_default();
    if start_tile.is_obstacle() {
      return Err(LevelError::StartBlocked(start, start_tile));
    }
    if blocks_dedup.contains(&start) {
      return Err(LevelError::StartUnderBlock(start));
    }
    let stuck_block = blocks_dedup
      .iter()
      .map(|&b| (b, grid.get(b).unwrap_or_default()))
      .find(|(_, tile)| tile.is_obstacle());
    if let Some((pos, tile)) = stuck_block {
      return Err(LevelError::ItemBlocked {
        what: "block",
        pos,
        tile,
      });
    }

    let teleports = teleports.into_iter().collect::<Vec<_>>();
    let teleports = match teleports.as_slice() {
      [] => None,
      [a, b] => {
        for &end in [a, b] {
          if !grid.inside(end) {
            return Err(LevelError::ItemOutside {
              what: "teleport",
              pos: end,
            });
          }
        }
        if a == b {
          return Err(LevelError::TeleportToItself(*a));
        }
        Some(TeleportPair::new(*a, *b))
      }
      more => return Err(LevelError::UnpairedTeleports(more.len())),
    };

    let total_melt_weight =
      grid.iter().map(|(_, tile)| tile.melt_weight()).sum::<u32>();
    let total_score = total_melt_weight + 100 * coin_bags.len() as u32;

    Ok(Self {
      grid,
      start,
      coin_bags,
      keys,
      blocks: blocks_dedup,
      teleports,
      total_melt_weight,
      total_score,
    })
  }

  pub fn grid(&self) -> &TileGrid {
    &self.grid
  }

  pub(crate) fn grid_mut(&mut self) -> &mut TileGrid {
    &mut self.grid
  }

  pub fn width(&self) -> u32 {
    self.grid.width()
  }

  pub fn height(&self) -> u32 {
    self.grid.height()
  }

  /// Shorthand for looking at the grid. `None` outside of it.
  pub fn tile(&self, coord: Coord) -> Option<Tile> {
    self.grid.get(coord)
  }

  pub fn start(&self) -> Coord {
    self.start
  }

  pub fn coin_bags(&self) -> impl ExactSizeIterator<Item = Coord> + '_ {
    self.coin_bags.iter().copied()
  }

  pub fn keys(&self) -> impl ExactSizeIterator<Item = Coord> + '_ {
    self.keys.iter().copied()
  }

  pub fn blocks(&self) -> &[Coord] {
    &self.blocks
  }

  pub fn teleports(&self) -> Option<TeleportPair> {
    self.teleports
  }

  pub fn has_coin_bag(&self, coord: Coord) -> bool {
    self.coin_bags.contains(&coord)
  }

  pub fn has_key(&self, coord: Coord) -> bool {
    self.keys.contains(&coord)
  }

  pub fn has_block(&self, coord: Coord) -> bool {
    self.blocks.contains(&coord)
  }

  /// Thin ice counts once, thick ice twice.
  pub fn total_melt_weight(&self) -> u32 {
    self.total_melt_weight
  }

  /// Melt weight plus 100 per coin bag.
  pub fn total_score(&self) -> u32 {
    self.total_score
  }

  pub(crate) fn take_coin_bag(&mut self, coord: Coord) -> bool {
    self.coin_bags.shift_remove(&coord)
  }

  pub(crate) fn take_key(&mut self, coord: Coord) -> bool {
    self.keys.shift_remove(&coord)
  }

  /// Move the block at `from` to `to`. Returns false if there was no block.
  pub(crate) fn move_block(&mut self, from: Coord, to: Coord) -> bool {
    match self.blocks.iter_mut().find(|b| **b == from) {
      Some(block) => {
        *block = to;
        true
      }
      None => false,
    }
  }

  /// Burn the teleport pair: both ends turn to floor and it won't fire again.
  pub(crate) fn consume_teleports(&mut self) {
    if let Some(pair) = self.teleports.take() {
      for end in pair.ends() {
        // Both ends were bounds checked on construction.
        let _ = self.grid.set_tile(end, Tile::Floor);
      }
    }
  }
}
