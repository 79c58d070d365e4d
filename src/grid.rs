use aglet::{Coord, Grid};
use thiserror::Error;

use crate::Tile;

/// Tried to touch a cell outside the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("({x}, {y}) is outside the {width}x{height} grid")]
pub struct OutOfBounds {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

/// A dense, bounds-checked board of tiles.
///
/// Every cell inside the bounds holds a tile; there are no holes.
#[derive(Debug, Clone)]
pub struct TileGrid {
  tiles: Grid<Tile>,
}

impl TileGrid {
  /// Make a `width` x `height` board with every cell set to `fill`.
  pub fn filled(width: u32, height: u32, fill: Tile) -> Self {
    let mut tiles = Grid::new(width, height);
    for y in 0..height {
      for x in 0..width {
        tiles.insert(Coord::new(x, y), fill);
      }
    }
    Self { tiles }
  }

  /// Build a board from rows, top to bottom.
  ///
  /// Returns `None` if there are no rows, the rows are empty, or they aren't
  /// all the same length.
  pub fn from_rows<R: AsRef<[Tile]>>(rows: &[R]) -> Option<Self> {
    let height = rows.len();
    let width = rows.first()?.as_ref().len();
    if width == 0 || rows.iter().any(|r| r.as_ref().len() != width) {
      return None;
    }

    let mut tiles = Grid::new(width as u32, height as u32);
    for (y, row) in rows.iter().enumerate() {
      for (x, &tile) in row.as_ref().iter().enumerate() {
        tiles.insert(Coord::new(x as u32, y as u32), tile);
      }
    }
    Some(Self { tiles })
  }

  pub fn width(&self) -> u32 {
    self.tiles.width()
  }

  pub fn height(&self) -> u32 {
    self.tiles.height()
  }

  pub fn inside(&self, coord: Coord) -> bool {
    coord.x < self.width() && coord.y < self.height()
  }

  /// The tile at `coord`.
  pub fn tile(&self, coord: Coord) -> Result<Tile, OutOfBounds> {
    self.get(coord).ok_or_else(|| self.out_of_bounds(coord))
  }

  /// Like [`TileGrid::tile`] for callers that only care whether it's there.
  pub fn get(&self, coord: Coord) -> Option<Tile> {
    if !self.inside(coord) {
      return None;
    }
    Some(self.tiles.get(coord).copied().unwrap_or_default())
  }

  pub fn set_tile(&mut self, coord: Coord, tile: Tile) -> Result<(), OutOfBounds> {
    if !self.inside(coord) {
      return Err(self.out_of_bounds(coord));
    }
    self.tiles.insert(coord, tile);
    Ok(())
  }

  /// Every cell in row-major order.
  pub fn iter(&self) -> impl Iterator<Item = (Coord, Tile)> + '_ {
    let width = self.width();
    (0..self.height()).flat_map(move |y| {
      (0..width).map(move |x| {
        let coord = Coord::new(x, y);
        (coord, self.tiles.get(coord).copied().unwrap_or_default())
      })
    })
  }

  pub fn count(&self, tile: Tile) -> usize {
    self.iter().filter(|&(_, t)| t == tile).count()
  }

  fn out_of_bounds(&self, coord: Coord) -> OutOfBounds {
    OutOfBounds {
      x: coord.x,
      y: coord.y,
      width: self.width(),
      height: self.height(),
    }
  }
}

impl PartialEq for TileGrid {
  fn eq(&self, other: &Self) -> bool {
    self.width() == other.width()
      && self.height() == other.height()
      && self.iter().zip(other.iter()).all(|(a, b)| a == b)
  }
}

impl Eq for TileGrid {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn out_of_bounds_is_an_error() {
    let mut grid = TileGrid::filled(3, 2, Tile::ThinIce);
    assert!(grid.inside(Coord::new(2, 1)));
    assert!(!grid.inside(Coord::new(3, 1)));
    assert!(!grid.inside(Coord::new(0, 2)));

    let err = grid.tile(Coord::new(3, 0)).unwrap_err();
    assert_eq!(
      err,
      OutOfBounds {
        x: 3,
        y: 0,
        width: 3,
        height: 2
      }
    );
    assert!(grid.set_tile(Coord::new(0, 5), Tile::Wall).is_err());
    assert_eq!(grid.get(Coord::new(9, 9)), None);
  }

  #[test]
  fn set_then_get() {
    let mut grid = TileGrid::filled(3, 3, Tile::Wall);
    grid.set_tile(Coord::new(1, 2), Tile::Finish).unwrap();
    assert_eq!(grid.tile(Coord::new(1, 2)), Ok(Tile::Finish));
    assert_eq!(grid.count(Tile::Finish), 1);
    assert_eq!(grid.count(Tile::Wall), 8);
  }

  #[test]
  fn iterates_row_major() {
    let grid = TileGrid::from_rows(&[
      vec![Tile::Wall, Tile::ThinIce],
      vec![Tile::ThickIce, Tile::Finish],
    ])
    .unwrap();
    let seen = grid.iter().collect::<Vec<_>>();
    assert_eq!(
      seen,
      vec![
        (Coord::new(0, 0), Tile::Wall),
        (Coord::new(1, 0), Tile::ThinIce),
        (Coord::new(0, 1), Tile::ThickIce),
        (Coord::new(1, 1), Tile::Finish),
      ]
    );
    // restartable
    assert_eq!(grid.iter().count(), 4);
  }

  #[test]
  fn ragged_rows_are_refused() {
    let rows = vec![vec![Tile::Wall, Tile::Wall], vec![Tile::Wall]];
    assert!(TileGrid::from_rows(&rows).is_none());
    let none: Vec<Vec<Tile>> = Vec::new();
    assert!(TileGrid::from_rows(&none).is_none());
  }
}
