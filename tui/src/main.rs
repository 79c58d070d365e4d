mod harness;

use std::{
  fs,
  path::{Path, PathBuf},
};

use argh::FromArgs;
use ariadne::{Label, Report, ReportKind, Source};
use eyre::eyre;
use harness::PlayHarness;
use thin_ice::{
  reach, Direction, Game, Level, LevelList, LevelSet, Progress, Progression,
  Rules,
};

fn main() -> eyre::Result<()> {
  let args: ArgsEntrypoint = argh::from_env();

  match args.sub {
    Subcommands::Play(play) => play.run()?,
    Subcommands::Info(info) => info.run()?,
    Subcommands::Replay(replay) => replay.run()?,
  }

  Ok(())
}

#[derive(FromArgs, Debug)]
/// Thin Ice: melt every tile on the way to the exit.
struct ArgsEntrypoint {
  #[argh(subcommand)]
  sub: Subcommands,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Subcommands {
  Play(CmdPlay),
  Info(CmdInfo),
  Replay(CmdReplay),
}

/// Play a folder of levels in the terminal.
///
/// Controls:
/// - Arrow keys or HJKL to move.
/// - R to start the level over.
/// - Ctrl+C to quit.
/// - Ctrl+L to redraw the screen.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "play")]
struct CmdPlay {
  /// folder holding `level_XXXX.txt` files.
  #[argh(positional)]
  folder: PathBuf,
  /// level to start on.
  #[argh(option, default = "0")]
  level: usize,
  /// highest level index; defaults to however many files are in a row.
  #[argh(option)]
  max: Option<usize>,
  /// pick levels at random instead of in order.
  #[argh(switch)]
  random: bool,
  /// seed for random level order.
  #[argh(option, default = "LevelSet::DEFAULT_SEED")]
  seed: u64,
  /// only count a level as passed if every tile was melted.
  #[argh(switch)]
  perfect: bool,
}

impl CmdPlay {
  fn run(&self) -> eyre::Result<()> {
    let max_index = match self.max {
      Some(it) => it,
      None => count_levels(&self.folder)
        .checked_sub(1)
        .ok_or_else(|| eyre!("no levels in {}", self.folder.display()))?,
    };
    let progression = if self.random {
      Progression::Random
    } else {
      Progression::Sequential
    };
    let set = LevelSet::new(&self.folder, max_index, progression, self.seed);
    let rules = Rules {
      perfect_score_required: self.perfect,
    };
    let game = Game::new(set, self.level, rules)?;
    PlayHarness::enter(game)?;
    Ok(())
  }
}

/// Describe a single level file.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "info")]
struct CmdInfo {
  /// path to a level file.
  #[argh(positional)]
  path: PathBuf,
}

impl CmdInfo {
  fn run(&self) -> eyre::Result<()> {
    let level = load_level_file(&self.path)?;
    println!("size:        {}x{}", level.width(), level.height());
    println!("start:       {}", level.start());
    println!("melt weight: {}", level.total_melt_weight());
    println!("max score:   {}", level.total_score());
    println!("coin bags:   {}", level.coin_bags().len());
    println!("keys:        {}", level.keys().len());
    println!("blocks:      {}", level.blocks().len());
    match level.teleports() {
      Some(pair) => {
        let [a, b] = pair.ends();
        println!("teleports:   {} <-> {}", a, b);
      }
      None => println!("teleports:   none"),
    }
    let missed = reach::unreachable_ice(&level, level.start(), false);
    if !missed.is_empty() {
      println!("unreachable: {:?}", missed);
    }

    let game = Game::new(LevelList::single(level), 0, Rules::default())?;
    print!("{}", game.render_ascii());
    Ok(())
  }
}

/// Play a fixed list of moves on a level and report what happened.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "replay")]
struct CmdReplay {
  /// path to a level file.
  #[argh(positional)]
  path: PathBuf,
  /// moves as a string of U, D, L, R.
  #[argh(positional)]
  moves: String,
  /// only count the level as passed if every tile was melted.
  #[argh(switch)]
  perfect: bool,
  /// trace what the game is doing on stderr.
  #[argh(switch)]
  debug: bool,
}

impl CmdReplay {
  fn run(&self) -> eyre::Result<()> {
    let moves = self
      .moves
      .chars()
      .filter(|c| !c.is_whitespace())
      .map(|c| {
        Direction::from_char(c).ok_or_else(|| eyre!("{:?} isn't a move", c))
      })
      .collect::<eyre::Result<Vec<_>>>()?;

    let level = load_level_file(&self.path)?;
    let rules = Rules {
      perfect_score_required: self.perfect,
    };
    let mut game = Game::new(LevelList::single(level), 0, rules)?;
    game.set_debug(self.debug);

    for (i, dir) in moves.into_iter().enumerate() {
      match game.move_player(dir) {
        Ok(moved) => println!("{:>3} {:?}: {} -> {}", i, dir, moved.from, moved.to),
        Err(why) => println!("{:>3} {:?}: rejected, {:?}", i, dir, why),
      }
      let progress = game.check_progress()?;
      if progress.is_done() {
        println!("    {:?} (ratio {:.3})", progress, progress.ratio());
        if progress == Progress::Success {
          break;
        }
      }
    }

    print!("{}", game.render_ascii());
    println!(
      "points {}  melted {}/{}  solved {}",
      game.total_points(),
      game.current_melt_weight(),
      game.level().total_melt_weight(),
      game.solved_count(),
    );
    Ok(())
  }
}

/// How many `level_XXXX.txt` files there are counting up from zero.
fn count_levels(folder: &Path) -> usize {
  let numbering = LevelSet::new(folder, 0, Progression::Sequential, 0);
  (0..).take_while(|&i| numbering.path(i).exists()).count()
}

/// Read a level file, pointing at the bad spot if it doesn't parse.
fn load_level_file(path: &Path) -> eyre::Result<Level> {
  let text = fs::read_to_string(path)?;
  thin_ice::parse_to_level(&text).map_err(|e| {
    if let Some(offset) = e.offset() {
      let end = (offset + 1).min(text.len());
      let start = offset.min(end);
      let _ = Report::build(ReportKind::Error, (), start)
        .with_message(format!("couldn't read {}", path.display()))
        .with_label(Label::new(start..end).with_message(e.to_string()))
        .finish()
        .eprint(Source::from(text.as_str()));
    }
    eyre!("{}: {}", path.display(), e)
  })
}
