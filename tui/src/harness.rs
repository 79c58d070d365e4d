//! Play harness

use std::io::{self, Stdout, Write};

use aglet::Coord;
use crossterm::{
  cursor::{Hide, MoveTo, Show},
  event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
  style::{
    Attribute, Attributes, Color, Colors, Print, ResetColor, SetAttributes,
    SetColors, SetForegroundColor,
  },
  terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
  },
  QueueableCommand,
};
use thin_ice::{Direction, Game, LevelSet, Progress, Tile};

const START_X: u16 = 2;
const START_Y: u16 = 1;

const TILE_STRIDE_X: u16 = 2;

/// Where the board is drawn; the HUD goes above it.
const BOARD_X: u16 = 2;
const BOARD_Y: u16 = 4;

pub struct PlayHarness {
  game: Game<LevelSet>,
  status: Status,
  must_redraw: bool,
}

impl PlayHarness {
  /// Transfer runtime to the harness.
  /// This will only return once the player is through.
  pub fn enter(game: Game<LevelSet>) -> eyre::Result<()> {
    let mut harness = Self {
      game,
      status: Status::JustStarted,
      must_redraw: true,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.queue(EnterAlternateScreen)?.queue(Hide)?.flush()?;

    let res = harness.spin(&mut stdout);

    stdout.queue(Show)?.queue(LeaveAlternateScreen)?.flush()?;
    disable_raw_mode()?;

    res
  }

  fn spin(&mut self, stdout: &mut Stdout) -> eyre::Result<()> {
    loop {
      self.draw(stdout)?;

      if let Event::Key(ev) = event::read()? {
        if matches!(ev.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
          let quit = self.update(ev.code, ev.modifiers)?;
          if quit {
            break;
          }
        }
      }
    }
    Ok(())
  }

  /// return whether to quit
  fn update(&mut self, key: KeyCode, mods: KeyModifiers) -> eyre::Result<bool> {
    if key == KeyCode::Char('c') && mods.contains(KeyModifiers::CONTROL) {
      return Ok(true);
    }
    if key == KeyCode::Char('l') && mods.contains(KeyModifiers::CONTROL) {
      self.must_redraw = true;
      return Ok(false);
    }
    if self.game.is_exhausted() {
      // any key leaves once it's all over
      return Ok(true);
    }

    let dir = match key {
      KeyCode::Left | KeyCode::Char('h') => Some(Direction::Left),
      KeyCode::Right | KeyCode::Char('l') => Some(Direction::Right),
      KeyCode::Up | KeyCode::Char('k') => Some(Direction::Up),
      KeyCode::Down | KeyCode::Char('j') => Some(Direction::Down),
      _ => None,
    };

    if let Some(dir) = dir {
      let level_before = self.game.level_index();
      if self.game.move_player(dir).is_err() {
        return Ok(false);
      }
      let progress = self.game.check_progress()?;
      if progress.is_done() {
        self.status = Status::Verdict(progress, level_before);
        self.must_redraw = true;
      } else {
        self.status = Status::Playing;
      }
    } else if matches!(key, KeyCode::Char('r') | KeyCode::Char('R')) {
      self.game.reload_level()?;
      self.status = Status::JustStarted;
      self.must_redraw = true;
    }

    Ok(false)
  }

  fn draw(&mut self, stdout: &mut Stdout) -> io::Result<()> {
    if self.must_redraw {
      stdout.queue(Clear(ClearType::All))?;
      self.must_redraw = false;
    }

    let level = self.game.level();
    stdout
      .queue(MoveTo(START_X, START_Y))?
      .queue(ResetColor)?
      .queue(Clear(ClearType::CurrentLine))?
      .queue(Print(format!(
        "Level {}   points {}   melted {}/{}   keys {}   solved {}",
        self.game.level_index(),
        self.game.total_points(),
        self.game.current_melt_weight(),
        level.total_melt_weight(),
        self.game.keys_obtained(),
        self.game.solved_count(),
      )))?;

    stdout
      .queue(MoveTo(START_X, START_Y + 1))?
      .queue(Clear(ClearType::CurrentLine))?;
    match self.status {
      Status::JustStarted | Status::Playing => {}
      Status::Verdict(Progress::Success, level) => {
        stdout
          .queue(SetForegroundColor(Color::Green))?
          .queue(Print(format!("level {} done!", level)))?;
      }
      Status::Verdict(Progress::NotSufficient { ratio }, _) => {
        stdout
          .queue(SetForegroundColor(Color::Yellow))?
          .queue(Print(format!(
            "only {:.0}% melted, try again",
            ratio * 100.0
          )))?;
      }
      Status::Verdict(Progress::GameOver, _) => {
        stdout
          .queue(SetForegroundColor(Color::Red))?
          .queue(Print("stuck! starting over"))?;
      }
      Status::Verdict(Progress::Continue | Progress::Exhausted, _) => {}
    }
    if self.game.is_exhausted() {
      stdout
        .queue(SetForegroundColor(Color::Green))?
        .queue(Print("   that was the last level, press any key"))?;
    }

    for y in 0..level.height() {
      for x in 0..level.width() {
        let coord = Coord::new(x, y);
        let (ch, cols, fmt) = if coord == self.game.player() {
          player_display()
        } else if level.has_block(coord) {
          overlay_display('■', Color::DarkGrey)
        } else if level.has_coin_bag(coord) {
          overlay_display('$', Color::DarkRed)
        } else if level.has_key(coord) {
          overlay_display('k', Color::DarkYellow)
        } else {
          tile_display(level.tile(coord).unwrap_or_default())
        };
        let screenpos = grid_to_screen(coord);
        stdout
          .queue(MoveTo(screenpos.0, screenpos.1))?
          .queue(SetColors(cols))?
          .queue(SetAttributes(fmt))?
          .queue(Print(ch))?;
      }
    }

    stdout.queue(ResetColor)?.flush()?;
    Ok(())
  }
}

enum Status {
  JustStarted,
  Playing,
  /// Temporarily display to the player, along with the level it was for.
  Verdict(Progress, usize),
}

fn tile_display(tile: Tile) -> (char, Colors, Attributes) {
  let (ch, fg, bg) = match tile {
    Tile::Empty | Tile::CoinBag | Tile::Block => (' ', Color::Reset, Color::Reset),
    Tile::Wall => ('#', Color::White, Color::DarkBlue),
    Tile::ThinIce => ('.', Color::Blue, Color::White),
    Tile::ThickIce => (':', Color::DarkCyan, Color::Cyan),
    Tile::Lock => ('L', Color::Black, Color::Yellow),
    Tile::Floor => ('_', Color::Blue, Color::Grey),
    Tile::Teleport => ('T', Color::Black, Color::Green),
    Tile::Finish => ('F', Color::Black, Color::Magenta),
    Tile::Water => ('~', Color::Cyan, Color::DarkBlue),
  };
  (ch, Colors::new(fg, bg), Attribute::NormalIntensity.into())
}

fn overlay_display(ch: char, fg: Color) -> (char, Colors, Attributes) {
  (
    ch,
    Colors::new(fg, Color::White),
    Attributes::default() | Attribute::Bold,
  )
}

fn player_display() -> (char, Colors, Attributes) {
  (
    '@',
    Colors::new(Color::Red, Color::White),
    Attributes::default() | Attribute::Bold,
  )
}

fn grid_to_screen(coord: Coord) -> (u16, u16) {
  (
    coord.x as u16 * TILE_STRIDE_X + BOARD_X,
    coord.y as u16 + BOARD_Y,
  )
}
