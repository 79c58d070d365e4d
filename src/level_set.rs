//! Where levels come from, and which one comes next.

use std::{
  fs, io,
  path::{Path, PathBuf},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::{parse_to_level, write_level, DecodeError, Level};

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("couldn't access {path:?}: {source}")]
  Io { path: PathBuf, source: io::Error },
  #[error("couldn't read {path:?}: {source}")]
  Decode { path: PathBuf, source: DecodeError },
  #[error("there is no level {index}")]
  Missing { index: usize },
}

/// How to pick the level after this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progression {
  /// 0, 1, 2, ... up to the last one, then stop.
  #[default]
  Sequential,
  /// Uniformly random forever.
  Random,
}

/// Anything a `Game` can pull pristine levels from.
///
/// Games mutate their level in place, so starting over always goes back to
/// the source for a fresh copy.
pub trait LevelSource {
  fn load(&self, index: usize) -> Result<Level, LoadError>;

  /// The index to play after `current`, or `None` when there isn't one.
  fn next_index(&mut self, current: usize) -> Option<usize>;
}

#[derive(Debug, Clone)]
struct Order {
  max_index: usize,
  progression: Progression,
  rng: ChaCha8Rng,
}

impl Order {
  fn new(max_index: usize, progression: Progression, seed: u64) -> Self {
    Self {
      max_index,
      progression,
      rng: ChaCha8Rng::seed_from_u64(seed),
    }
  }

  fn next_index(&mut self, current: usize) -> Option<usize> {
    match self.progression {
      Progression::Sequential if current >= self.max_index => None,
      Progression::Sequential => Some(current + 1),
      Progression::Random => Some(self.rng.gen_range(0..=self.max_index)),
    }
  }
}

/// A folder of `level_XXXX.txt` files, numbered from zero.
#[derive(Debug, Clone)]
pub struct LevelSet {
  folder: PathBuf,
  order: Order,
}

impl LevelSet {
  pub const DEFAULT_SEED: u64 = 42;

  pub fn new(
    folder: impl Into<PathBuf>,
    max_index: usize,
    progression: Progression,
    seed: u64,
  ) -> Self {
    Self {
      folder: folder.into(),
      order: Order::new(max_index, progression, seed),
    }
  }

  pub fn folder(&self) -> &Path {
    &self.folder
  }

  pub fn max_index(&self) -> usize {
    self.order.max_index
  }

  pub fn len(&self) -> usize {
    self.order.max_index + 1
  }

  /// Always false: a set has at least level 0.
  pub fn is_empty(&self) -> bool {
    false
  }

  pub fn progression(&self) -> Progression {
    self.order.progression
  }

  pub fn path(&self, index: usize) -> PathBuf {
    self.folder.join(format!("level_{:04}.txt", index))
  }

  /// Read and decode level `index`.
  pub fn get_level(&self, index: usize) -> Result<Level, LoadError> {
    let path = self.path(index);
    let text = match fs::read_to_string(&path) {
      Ok(it) => it,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(LoadError::Missing { index })
      }
      Err(source) => return Err(LoadError::Io { path, source }),
    };
    parse_to_level(&text).map_err(|source| LoadError::Decode { path, source })
  }

  /// Encode `level` and write it as level `index`, making the folder if it
  /// isn't there yet.
  pub fn save_level(&self, level: &Level, index: usize) -> Result<(), LoadError> {
    fs::create_dir_all(&self.folder).map_err(|source| LoadError::Io {
      path: self.folder.clone(),
      source,
    })?;
    let path = self.path(index);
    fs::write(&path, write_level(level))
      .map_err(|source| LoadError::Io { path, source })
  }

  pub fn next_index(&mut self, current: usize) -> Option<usize> {
    self.order.next_index(current)
  }
}

impl LevelSource for LevelSet {
  fn load(&self, index: usize) -> Result<Level, LoadError> {
    self.get_level(index)
  }

  fn next_index(&mut self, current: usize) -> Option<usize> {
    LevelSet::next_index(self, current)
  }
}

/// Levels held in memory, for embedding and tests.
#[derive(Debug, Clone)]
pub struct LevelList {
  levels: Vec<Level>,
  order: Order,
}

impl LevelList {
  /// Returns `None` if `levels` is empty.
  pub fn new(
    levels: Vec<Level>,
    progression: Progression,
    seed: u64,
  ) -> Option<Self> {
    let max_index = levels.len().checked_sub(1)?;
    Some(Self {
      levels,
      order: Order::new(max_index, progression, seed),
    })
  }

  /// Just the one level, played once.
  pub fn single(level: Level) -> Self {
    Self {
      levels: vec![level],
      order: Order::new(0, Progression::Sequential, LevelSet::DEFAULT_SEED),
    }
  }

  pub fn len(&self) -> usize {
    self.levels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.levels.is_empty()
  }
}

impl LevelSource for LevelList {
  fn load(&self, index: usize) -> Result<Level, LoadError> {
    self
      .levels
      .get(index)
      .cloned()
      .ok_or(LoadError::Missing { index })
  }

  fn next_index(&mut self, current: usize) -> Option<usize> {
    self.order.next_index(current)
  }
}

#[cfg(test)]
mod tests {
  use aglet::Coord;

  use super::*;
  use crate::{Tile, TileGrid};

  fn tiny() -> Level {
    let grid = TileGrid::from_rows(&[[Tile::ThinIce, Tile::Finish]]).unwrap();
    Level::new(grid, Coord::new(0, 0), [], [], [], []).unwrap()
  }

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
      .join(format!("thin-ice-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
  }

  #[test]
  fn sequential_stops_at_the_end() {
    let mut set = LevelSet::new("unused", 2, Progression::Sequential, 0);
    assert_eq!(set.next_index(0), Some(1));
    assert_eq!(set.next_index(1), Some(2));
    assert_eq!(set.next_index(2), None);
    assert_eq!(set.len(), 3);
    assert!(!set.is_empty());
  }

  #[test]
  fn random_is_seeded_and_in_range() {
    let mut a = LevelSet::new("unused", 5, Progression::Random, 7);
    let mut b = LevelSet::new("unused", 5, Progression::Random, 7);
    let xs = (0..50).map(|_| a.next_index(5)).collect::<Vec<_>>();
    let ys = (0..50).map(|_| b.next_index(5)).collect::<Vec<_>>();
    assert_eq!(xs, ys);
    assert!(xs.iter().all(|x| matches!(x, Some(0..=5))));
  }

  #[test]
  fn saves_and_loads() {
    let dir = scratch_dir("saves_and_loads");
    let set = LevelSet::new(&dir, 3, Progression::Sequential, 0);
    set.save_level(&tiny(), 3).unwrap();
    assert!(dir.join("level_0003.txt").exists());
    assert_eq!(set.get_level(3).unwrap(), tiny());
    let _ = fs::remove_dir_all(&dir);
  }

  #[test]
  fn missing_file_is_reported() {
    let dir = scratch_dir("missing_file");
    let set = LevelSet::new(&dir, 0, Progression::Sequential, 0);
    assert!(matches!(set.get_level(0), Err(LoadError::Missing { index: 0 })));
  }

  #[test]
  fn bad_file_is_a_decode_error() {
    let dir = scratch_dir("bad_file");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("level_0000.txt"), "this is not a level\n").unwrap();
    let set = LevelSet::new(&dir, 0, Progression::Sequential, 0);
    assert!(matches!(set.get_level(0), Err(LoadError::Decode { .. })));
    let _ = fs::remove_dir_all(&dir);
  }

  #[test]
  fn empty_list_is_refused() {
    assert!(LevelList::new(vec![], Progression::Sequential, 0).is_none());
    let list = LevelList::new(vec![tiny(), tiny()], Progression::Sequential, 0)
      .unwrap();
    assert_eq!(list.len(), 2);
    assert!(!list.is_empty());
  }

  #[test]
  fn list_hands_out_copies() {
    let list = LevelList::single(tiny());
    assert_eq!(list.load(0).unwrap(), tiny());
    assert!(matches!(list.load(1), Err(LoadError::Missing { index: 1 })));
  }
}
