/// Print a trace line to stderr, but only when the first argument is true.
macro_rules! dbgprn {
  ($doit:expr, $fmt:literal, $($args:expr),* $(,)?) => {
    if $doit {
      eprintln!($fmt, $($args,)*);
    }
  };

  ($doit:expr, $fmt:literal) => {
    if $doit {
      eprintln!($fmt);
    }
  }
}

pub mod game;
mod grid;
mod level;
pub mod level_set;
mod parse;
pub mod reach;

pub use game::{BlockMove, Game, Moved, Progress, Rejected, Rules};
pub use grid::{OutOfBounds, TileGrid};
pub use level::{Level, LevelError, TeleportPair};
pub use level_set::{LevelList, LevelSet, LevelSource, LoadError, Progression};
pub use parse::{parse_to_level, write_level, DecodeError};

use aglet::{Coord, CoordVec};

/// Board width the shipped levels are drawn at.
pub const GRID_WIDTH: u32 = 19;
/// Board height the shipped levels are drawn at.
pub const GRID_HEIGHT: u32 = 15;

/// Every kind of tile the game knows about.
///
/// The discriminants are stable; they double as observation channels.
/// `CoinBag` and `Block` are only ever used as rendering markers, the grid
/// itself never stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Tile {
  /// Out of play.
  #[default]
  Empty = 0,
  Wall = 1,
  ThinIce = 2,
  ThickIce = 3,
  Lock = 4,
  /// Walkable floor that never melts. `TILE` in the level format.
  Floor = 5,
  Teleport = 6,
  Finish = 7,
  Water = 8,
  CoinBag = 9,
  Block = 10,
}

impl Tile {
  pub const COUNT: usize = 11;

  pub const ALL: [Tile; Tile::COUNT] = [
    Tile::Empty,
    Tile::Wall,
    Tile::ThinIce,
    Tile::ThickIce,
    Tile::Lock,
    Tile::Floor,
    Tile::Teleport,
    Tile::Finish,
    Tile::Water,
    Tile::CoinBag,
    Tile::Block,
  ];

  /// Tiles nothing can ever enter: the player, or a pushed block.
  pub fn is_obstacle(self) -> bool {
    matches!(self, Tile::Empty | Tile::Wall | Tile::Water | Tile::Lock)
  }

  /// How much melt progress this tile is worth.
  pub fn melt_weight(self) -> u32 {
    match self {
      Tile::ThinIce => 1,
      Tile::ThickIce => 2,
      _ => 0,
    }
  }

  /// What this tile turns into once the player steps off it.
  pub fn melted(self) -> Tile {
    match self {
      Tile::ThinIce => Tile::Water,
      Tile::ThickIce => Tile::ThinIce,
      other => other,
    }
  }

  pub fn index(self) -> usize {
    self as usize
  }
}

/// The four ways the player can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Up,
  Right,
  Down,
  Left,
}

impl Direction {
  /// Action order, as used by [`Game::legal_moves`].
  pub const ALL: [Direction; 4] =
    [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

  /// Order in which neighbours are scanned for a lock to open.
  pub const SCAN: [Direction; 4] =
    [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

  pub fn deltas(self) -> CoordVec {
    match self {
      Direction::Up => CoordVec::new(0, -1),
      Direction::Right => CoordVec::new(1, 0),
      Direction::Down => CoordVec::new(0, 1),
      Direction::Left => CoordVec::new(-1, 0),
    }
  }

  /// The neighbour of `coord` in this direction, if it isn't off the top or
  /// left edge. The far edges are the grid's business.
  pub fn step(self, coord: Coord) -> Option<Coord> {
    (coord.to_icoord() + self.deltas()).to_coord()
  }

  pub fn from_char(c: char) -> Option<Direction> {
    match c.to_ascii_uppercase() {
      'U' => Some(Direction::Up),
      'R' => Some(Direction::Right),
      'D' => Some(Direction::Down),
      'L' => Some(Direction::Left),
      _ => None,
    }
  }
}
