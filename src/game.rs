//! The play session: walking around, melting ice, and deciding when a level
//! is over.

use aglet::Coord;

use crate::{reach, Direction, Level, LevelSource, LoadError, Tile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rules {
  /// Only let the player through the finish once every bit of ice is melted.
  pub perfect_score_required: bool,
}

/// The block the last move shoved, and which way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMove {
  pub position: Coord,
  pub direction: Direction,
}

/// Why a move didn't happen. Nothing about the game changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
  /// Off the edge of the board.
  Edge,
  /// Something solid is in the way.
  Obstacle(Tile),
  /// There's a block in the way and it can't be pushed.
  BlockStuck,
  /// Every level has been played.
  SessionOver,
}

/// What a move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moved {
  pub from: Coord,
  pub to: Coord,
  pub teleported: bool,
  pub pushed: Option<BlockMove>,
  pub unlocked: Option<Coord>,
  pub coin_bag: bool,
  pub key: bool,
}

/// The verdict after a move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
  /// Keep going.
  Continue,
  /// Made it through the finish. The next level is already loaded, unless
  /// there isn't one.
  Success,
  /// Reached the finish without melting everything, with perfection
  /// required. The level has been reloaded.
  NotSufficient { ratio: f32 },
  /// Nowhere left to go. The level has been reloaded.
  GameOver,
  /// The last level is behind us; nothing more will happen.
  Exhausted,
}

impl Progress {
  /// How much of the level's ice was melted, as the score for this verdict.
  pub fn ratio(&self) -> f32 {
    match self {
      Progress::Success => 1.0,
      Progress::NotSufficient { ratio } => *ratio,
      _ => 0.0,
    }
  }

  /// Whether this attempt at the level is over.
  pub fn is_done(&self) -> bool {
    !matches!(self, Progress::Continue)
  }
}

struct Plan {
  dest: Coord,
  teleported: bool,
  /// Block from, block to.
  push: Option<(Coord, Coord)>,
}

/// One player working through levels from a [`LevelSource`].
#[derive(Debug)]
pub struct Game<S> {
  source: S,
  rules: Rules,
  debug: bool,

  level_index: usize,
  level: Level,
  player: Coord,

  /// Banked from finished levels.
  points: u32,
  /// Earned on this attempt at this level.
  current_points: u32,
  /// Steps taken on this attempt; measured against the level's total melt
  /// weight at the finish.
  current_melt_weight: u32,
  keys_obtained: u32,
  block_move: Option<BlockMove>,
  solved_count: u32,
  exhausted: bool,
}

impl<S: LevelSource> Game<S> {
  /// Start at level `level_index` of `source`.
  pub fn new(
    source: S,
    level_index: usize,
    rules: Rules,
  ) -> Result<Self, LoadError> {
    let level = source.load(level_index)?;
    let player = level.start();
    Ok(Self {
      source,
      rules,
      debug: false,
      level_index,
      level,
      player,
      points: 0,
      current_points: 0,
      current_melt_weight: 0,
      keys_obtained: 0,
      block_move: None,
      solved_count: 0,
      exhausted: false,
    })
  }

  /// Print what the game is doing to stderr.
  pub fn set_debug(&mut self, debug: bool) {
    self.debug = debug;
  }

  /// Try to take one step.
  pub fn move_player(&mut self, dir: Direction) -> Result<Moved, Rejected> {
    let plan = match self.plan(dir) {
      Ok(it) => it,
      Err(why) => {
        dbgprn!(self.debug, "{:?} from {} rejected: {:?}", dir, self.player, why);
        return Err(why);
      }
    };
    let from = self.player;

    if let Some(tile) = self.level.tile(from) {
      self.set_tile(from, tile.melted());
    }
    if plan.teleported {
      dbgprn!(self.debug, "teleported to {}", plan.dest);
      self.level.consume_teleports();
    }

    self.block_move = plan.push.map(|(block_from, block_to)| {
      dbgprn!(self.debug, "pushed block {} -> {}", block_from, block_to);
      self.level.move_block(block_from, block_to);
      BlockMove {
        position: block_to,
        direction: dir,
      }
    });

    let mut dest = plan.dest;
    let mut teleported = plan.teleported;
    let unlocked = self.unlock_near(dest);

    if self.level.tile(dest) == Some(Tile::Teleport) {
      if let Some(exit) = self.teleport_exit(dest) {
        dbgprn!(self.debug, "landed on teleport {}, sent on to {}", dest, exit);
        self.level.consume_teleports();
        dest = exit;
        teleported = true;
      }
    }

    self.player = dest;
    self.current_points += 1;
    self.current_melt_weight += 1;

    let coin_bag = self.level.take_coin_bag(dest);
    if coin_bag {
      self.current_points += 100;
    }
    let key = self.level.take_key(dest);
    if key {
      self.keys_obtained += 1;
    }

    Ok(Moved {
      from,
      to: dest,
      teleported,
      pushed: self.block_move,
      unlocked,
      coin_bag,
      key,
    })
  }

  /// Whether `move_player(dir)` would go through.
  pub fn can_move(&self, dir: Direction) -> bool {
    self.plan(dir).is_ok()
  }

  /// [`Game::can_move`] for each of [`Direction::ALL`], in that order.
  pub fn legal_moves(&self) -> [bool; 4] {
    Direction::ALL.map(|dir| self.can_move(dir))
  }

  /// Nothing the player does from here can change anything.
  pub fn is_stuck(&self) -> bool {
    let lock_openable = self.keys_obtained > 0
      && Direction::SCAN.iter().any(|&dir| {
        self
          .neighbour(self.player, dir)
          .and_then(|n| self.level.tile(n))
          == Some(Tile::Lock)
      });
    !lock_openable && !Direction::ALL.iter().any(|&dir| self.can_move(dir))
  }

  /// If the player is on the finish, settle the level.
  ///
  /// Returns `None` when they aren't.
  pub fn check_finish(&mut self) -> Result<Option<Progress>, LoadError> {
    if self.exhausted {
      return Ok(Some(Progress::Exhausted));
    }
    if self.level.tile(self.player) != Some(Tile::Finish) {
      return Ok(None);
    }

    let total = self.level.total_melt_weight();
    if !self.rules.perfect_score_required || self.current_melt_weight == total {
      self.load_next_level()?;
      return Ok(Some(Progress::Success));
    }

    let ratio = if total == 0 {
      0.0
    } else {
      self.current_melt_weight as f32 / total as f32
    };
    dbgprn!(
      self.debug,
      "finish reached with {}/{} melted, starting over",
      self.current_melt_weight,
      total
    );
    self.reload_level()?;
    Ok(Some(Progress::NotSufficient { ratio }))
  }

  /// Work out what the last move means: finished, stuck, or neither.
  pub fn check_progress(&mut self) -> Result<Progress, LoadError> {
    if let Some(done) = self.check_finish()? {
      return Ok(done);
    }
    if self.is_stuck() {
      dbgprn!(self.debug, "stuck at {}, starting over", self.player);
      self.reload_level()?;
      return Ok(Progress::GameOver);
    }
    Ok(Progress::Continue)
  }

  /// Throw away this attempt and start the level again from a fresh copy.
  pub fn reload_level(&mut self) -> Result<(), LoadError> {
    self.level = self.source.load(self.level_index)?;
    self.player = self.level.start();
    self.current_points = 0;
    self.current_melt_weight = 0;
    self.keys_obtained = 0;
    self.block_move = None;
    dbgprn!(self.debug, "loaded level {}", self.level_index);
    Ok(())
  }

  /// Bank this attempt's points and move on to whichever level the source
  /// says is next.
  ///
  /// The level only counts as solved if every bit of ice was melted.
  pub fn load_next_level(&mut self) -> Result<(), LoadError> {
    self.points += self.current_points;
    self.current_points = 0;
    if self.current_melt_weight == self.level.total_melt_weight() {
      self.solved_count += 1;
    }

    match self.source.next_index(self.level_index) {
      Some(next) => {
        self.level_index = next;
        self.reload_level()
      }
      None => {
        dbgprn!(self.debug, "no level after {}", self.level_index);
        self.exhausted = true;
        Ok(())
      }
    }
  }

  /// Whether every ice cell left can still be walked to.
  pub fn all_ice_reachable(&self) -> bool {
    reach::unreachable_ice(&self.level, self.player, self.debug).is_empty()
  }
}

impl<S> Game<S> {
  pub fn level(&self) -> &Level {
    &self.level
  }

  pub fn level_index(&self) -> usize {
    self.level_index
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn rules(&self) -> Rules {
    self.rules
  }

  pub fn player(&self) -> Coord {
    self.player
  }

  pub fn points(&self) -> u32 {
    self.points
  }

  pub fn current_points(&self) -> u32 {
    self.current_points
  }

  /// Banked points plus this attempt's, for display.
  pub fn total_points(&self) -> u32 {
    self.points + self.current_points
  }

  pub fn current_melt_weight(&self) -> u32 {
    self.current_melt_weight
  }

  pub fn keys_obtained(&self) -> u32 {
    self.keys_obtained
  }

  pub fn block_move(&self) -> Option<BlockMove> {
    self.block_move
  }

  pub fn solved_count(&self) -> u32 {
    self.solved_count
  }

  pub fn is_exhausted(&self) -> bool {
    self.exhausted
  }

  /// One-hot planes, channel-major: `Tile::COUNT` channels of
  /// `height * width` cells each.
  ///
  /// Each cell lights up its tile's channel. Coin bags and blocks light up
  /// their marker channels too, and the player's cell lights up the `Empty`
  /// channel.
  pub fn observation(&self) -> Vec<f32> {
    let width = self.level.width() as usize;
    let plane = width * self.level.height() as usize;
    let at = |channel: Tile, c: Coord| {
      channel.index() * plane + c.y as usize * width + c.x as usize
    };

    let mut out = vec![0.0; Tile::COUNT * plane];
    for (coord, tile) in self.level.grid().iter() {
      out[at(tile, coord)] = 1.0;
    }
    for coin in self.level.coin_bags() {
      out[at(Tile::CoinBag, coin)] = 1.0;
    }
    for &block in self.level.blocks() {
      out[at(Tile::Block, block)] = 1.0;
    }
    out[at(Tile::Empty, self.player)] = 1.0;
    out
  }

  /// The board as text, one line per row.
  ///
  /// `@` is the player, `B` a block, `$` a coin bag and `k` a key; underneath
  /// `#` is wall, `.` thin ice, `:` thick ice, `L` a lock, `_` floor, `T` a
  /// teleport, `F` the finish and `~` water.
  pub fn render_ascii(&self) -> String {
    let mut out = String::new();
    for y in 0..self.level.height() {
      for x in 0..self.level.width() {
        let coord = Coord::new(x, y);
        let ch = if coord == self.player {
          '@'
        } else if self.level.has_block(coord) {
          'B'
        } else if self.level.has_coin_bag(coord) {
          '$'
        } else if self.level.has_key(coord) {
          'k'
        } else {
          match self.level.tile(coord).unwrap_or_default() {
            Tile::Empty | Tile::CoinBag | Tile::Block => ' ',
            Tile::Wall => '#',
            Tile::ThinIce => '.',
            Tile::ThickIce => ':',
            Tile::Lock => 'L',
            Tile::Floor => '_',
            Tile::Teleport => 'T',
            Tile::Finish => 'F',
            Tile::Water => '~',
          }
        };
        out.push(ch);
      }
      out.push('\n');
    }
    out
  }

  fn plan(&self, dir: Direction) -> Result<Plan, Rejected> {
    if self.exhausted {
      return Err(Rejected::SessionOver);
    }
    let target = self.neighbour(self.player, dir).ok_or(Rejected::Edge)?;
    let tile = self.level.tile(target).ok_or(Rejected::Edge)?;
    if tile.is_obstacle() {
      return Err(Rejected::Obstacle(tile));
    }

    let (dest, teleported) = match self.teleport_exit(target) {
      Some(exit) if tile == Tile::Teleport => (exit, true),
      _ => (target, false),
    };

    let push = if self.level.has_block(dest) {
      Some((dest, self.block_landing(dest, dir)?))
    } else {
      None
    };

    Ok(Plan {
      dest,
      teleported,
      push,
    })
  }

  /// Where the block at `block` ends up if shoved towards `dir`.
  fn block_landing(&self, block: Coord, dir: Direction) -> Result<Coord, Rejected> {
    let far = self.neighbour(block, dir).ok_or(Rejected::BlockStuck)?;
    let tile = self.level.tile(far).ok_or(Rejected::BlockStuck)?;
    if tile.is_obstacle() {
      return Err(Rejected::BlockStuck);
    }
    // Blocks ride teleports for free and don't use them up.
    let landing = match self.teleport_exit(far) {
      Some(exit) if tile == Tile::Teleport => exit,
      _ => far,
    };
    // Coming out of a teleport the player can be pushing back towards
    // where they stand.
    if landing == block
      || landing == self.player
      || self.level.has_block(landing)
    {
      return Err(Rejected::BlockStuck);
    }
    Ok(landing)
  }

  /// Open the first lock next to `around`, if there's a key to spend.
  fn unlock_near(&mut self, around: Coord) -> Option<Coord> {
    if self.keys_obtained == 0 {
      return None;
    }
    let lock = Direction::SCAN.iter().find_map(|&dir| {
      self
        .neighbour(around, dir)
        .filter(|&n| self.level.tile(n) == Some(Tile::Lock))
    })?;
    self.keys_obtained -= 1;
    self.set_tile(lock, Tile::ThinIce);
    dbgprn!(self.debug, "unlocked {}", lock);
    Some(lock)
  }

  fn neighbour(&self, coord: Coord, dir: Direction) -> Option<Coord> {
    dir.step(coord).filter(|&n| self.level.grid().inside(n))
  }

  fn teleport_exit(&self, entry: Coord) -> Option<Coord> {
    self.level.teleports()?.exit_for(entry)
  }

  fn set_tile(&mut self, coord: Coord, tile: Tile) {
    // Only ever called with coords that came off the board.
    let res = self.level.grid_mut().set_tile(coord, tile);
    debug_assert!(res.is_ok(), "{:?}", res);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{LevelList, TileGrid};

  fn game(rows: &[Vec<Tile>], start: Coord) -> Game<LevelList> {
    let grid = TileGrid::from_rows(rows).unwrap();
    let level = Level::new(grid, start, [], [], [], []).unwrap();
    Game::new(LevelList::single(level), 0, Rules::default()).unwrap()
  }

  #[test]
  fn rejected_moves_change_nothing() {
    use crate::Tile::*;
    let mut g = game(
      &[vec![ThinIce, Wall], vec![Water, Finish]],
      Coord::new(0, 0),
    );
    let before = g.level().clone();
    assert_eq!(g.move_player(Direction::Up), Err(Rejected::Edge));
    assert_eq!(g.move_player(Direction::Left), Err(Rejected::Edge));
    assert_eq!(g.move_player(Direction::Right), Err(Rejected::Obstacle(Wall)));
    assert_eq!(g.move_player(Direction::Down), Err(Rejected::Obstacle(Water)));
    assert_eq!(g.level(), &before);
    assert_eq!(g.player(), Coord::new(0, 0));
    assert_eq!(g.current_points(), 0);
    assert_eq!(g.legal_moves(), [false; 4]);
  }

  #[test]
  fn thick_ice_takes_two_visits() {
    use crate::Tile::*;
    let mut g = game(&[vec![ThickIce, ThinIce]], Coord::new(0, 0));
    g.move_player(Direction::Right).unwrap();
    assert_eq!(g.level().tile(Coord::new(0, 0)), Some(ThinIce));
    g.move_player(Direction::Left).unwrap();
    assert_eq!(g.level().tile(Coord::new(1, 0)), Some(Water));
    assert_eq!(g.current_melt_weight(), 2);
  }

  #[test]
  fn empty_is_out_of_play() {
    use crate::Tile::*;
    let mut g = game(&[vec![ThinIce, Empty]], Coord::new(0, 0));
    assert_eq!(g.move_player(Direction::Right), Err(Rejected::Obstacle(Empty)));
  }

  #[test]
  fn observation_shape_and_player() {
    use crate::Tile::*;
    let g = game(&[vec![ThinIce, Finish, Wall]], Coord::new(0, 0));
    let obs = g.observation();
    assert_eq!(obs.len(), Tile::COUNT * 3);
    let plane = 3;
    assert_eq!(obs[ThinIce.index() * plane], 1.0);
    assert_eq!(obs[Finish.index() * plane + 1], 1.0);
    assert_eq!(obs[Wall.index() * plane + 2], 1.0);
    assert_eq!(obs[Empty.index() * plane], 1.0);
    assert_eq!(obs.iter().sum::<f32>(), 4.0);
  }

  #[test]
  fn ascii_board() {
    use crate::Tile::*;
    let g = game(
      &[vec![ThinIce, ThickIce, Finish], vec![Wall, Water, Floor]],
      Coord::new(0, 0),
    );
    assert_eq!(g.render_ascii(), "@:F\n#~_\n");
  }
}
