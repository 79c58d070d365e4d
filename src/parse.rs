use aglet::Coord;
use nom::{
  branch::alt,
  bytes::complete::tag,
  character::complete::{
    char, line_ending, multispace0, none_of, space0, u32 as number,
  },
  combinator::{cut, eof, map, map_opt, opt},
  error::{context, VerboseError, VerboseErrorKind},
  multi::{many0, many1, separated_list0},
  sequence::{preceded, separated_pair, terminated, tuple},
  Finish, IResult, Parser,
};
use thiserror::Error;

use crate::{Level, LevelError, Tile, TileGrid};

type Res<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Why a level file couldn't be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
  #[error("syntax error at byte {offset}: {message}")]
  Syntax { offset: usize, message: String },
  #[error("grid row {row} is {found} wide, expected {expected}")]
  RaggedGrid {
    row: usize,
    found: usize,
    expected: usize,
  },
  #[error(transparent)]
  Level(#[from] LevelError),
}

impl DecodeError {
  /// Byte offset into the input the error points at, if it has one.
  pub fn offset(&self) -> Option<usize> {
    match self {
      DecodeError::Syntax { offset, .. } => Some(*offset),
      _ => None,
    }
  }
}

/// Parse the text of a `level_XXXX.txt` file into a level.
pub fn parse_to_level(s: &str) -> Result<Level, DecodeError> {
  let (rest, (header, rows)) = level(s)
    .finish()
    .map_err(|e| flatten_error(s, e))?;
  debug_assert_eq!(rest, "");

  let expected = rows[0].len();
  if let Some((row, found)) = rows
    .iter()
    .map(|r| r.len())
    .enumerate()
    .find(|&(_, len)| len != expected)
  {
    return Err(DecodeError::RaggedGrid {
      row,
      found,
      expected,
    });
  }

  let mut coin_bags = header.coin_bags;
  let mut keys = header.keys;
  let mut blocks = header.blocks;
  let mut tiles = Vec::with_capacity(rows.len());
  for (y, row) in rows.into_iter().enumerate() {
    let mut line = Vec::with_capacity(row.len());
    for (x, glyph) in row.into_iter().enumerate() {
      let coord = Coord::new(x as u32, y as u32);
      match glyph.overlay {
        Overlay::CoinBag => coin_bags.push(coord),
        Overlay::Key => keys.push(coord),
        Overlay::Block => blocks.push(coord),
        Overlay::Start | Overlay::Nothing => {}
      }
      line.push(glyph.tile);
    }
    tiles.push(line);
  }

  // Rows are non-empty and all the same width by now.
  let grid = TileGrid::from_rows(&tiles).ok_or(DecodeError::RaggedGrid {
    row: 0,
    found: 0,
    expected,
  })?;
  let level = Level::new(
    grid,
    header.start,
    coin_bags,
    keys,
    blocks,
    header.teleports,
  )?;
  Ok(level)
}

/// Write a level out in the same format [`parse_to_level`] reads.
///
/// Where an item sits on a tile the format has no glyph for (a coin bag on
/// thick ice, say) the item wins and the tile underneath reads back as thin
/// ice. The start is the same: `A` is always thin ice, so a start on thick
/// ice or floor changes the level's melt weight on the way back in. Water has
/// no glyph either and is written as `0`.
pub fn write_level(level: &Level) -> String {
  let mut out = String::new();
  let start = level.start();
  out.push_str(&format!("START:{},{}\n", start.x, start.y));
  // One more than the real total. Older readers subtract it back off.
  out.push_str(&format!("TOTAL_TILES:{}\n", level.total_melt_weight() + 1));
  out.push_str(&format!("COIN_BAGS:{}\n", join_coords(level.coin_bags())));
  out.push_str(&format!("KEYS:{}\n", join_coords(level.keys())));
  out.push_str(&format!(
    "BLOCKS:{}\n",
    join_coords(level.blocks().iter().copied())
  ));
  out.push_str(&format!(
    "TELEPORTS:{}\n",
    join_coords(level.teleports().into_iter().flat_map(|p| p.ends()))
  ));

  for y in 0..level.height() {
    for x in 0..level.width() {
      let coord = Coord::new(x, y);
      let tile = level.tile(coord).unwrap_or_default();
      let overlay = if coord == start {
        Overlay::Start
      } else if level.has_coin_bag(coord) {
        Overlay::CoinBag
      } else if level.has_key(coord) {
        Overlay::Key
      } else if level.has_block(coord) {
        Overlay::Block
      } else {
        Overlay::Nothing
      };
      out.push(Glyph { tile, overlay }.to_char());
    }
    out.push('\n');
  }
  out
}

fn join_coords(coords: impl Iterator<Item = Coord>) -> String {
  coords
    .map(|c| format!("{},{}", c.x, c.y))
    .collect::<Vec<_>>()
    .join(";")
}

struct Header {
  start: Coord,
  coin_bags: Vec<Coord>,
  keys: Vec<Coord>,
  blocks: Vec<Coord>,
  teleports: Vec<Coord>,
}

fn level(s: &str) -> Res<(Header, Vec<Vec<Glyph>>)> {
  let (s, header) = header(s)?;
  let (s, _blank) = multispace0(s)?;
  let (s, rows) = context("grid", many1(grid_row))(s)?;
  let (s, _trail) = multispace0(s)?;
  let (s, _) = eof(s)?;
  Ok((s, (header, rows)))
}

fn header(s: &str) -> Res<Header> {
  let (s, start) = field("START:", coord)(s)?;
  // Stored off by one, and recomputed from the grid anyway.
  let (s, _total_tiles) = field("TOTAL_TILES:", number)(s)?;
  let (s, coin_bags) = field("COIN_BAGS:", coord_list)(s)?;
  let (s, keys) = field("KEYS:", coord_list)(s)?;
  let (s, blocks) = field("BLOCKS:", coord_list)(s)?;
  let (s, teleports) = field("TELEPORTS:", coord_list)(s)?;
  Ok((
    s,
    Header {
      start,
      coin_bags,
      keys,
      blocks,
      teleports,
    },
  ))
}

fn field<'a, O, F>(
  name: &'static str,
  inner: F,
) -> impl FnMut(&'a str) -> Res<'a, O>
where
  F: Parser<&'a str, O, VerboseError<&'a str>>,
{
  context(
    name,
    preceded(tag(name), terminated(inner, tuple((space0, line_ending)))),
  )
}

fn coord(s: &str) -> Res<Coord> {
  map(separated_pair(number, char(','), number), |(x, y)| Coord::new(x, y))(s)
}

fn coord_list(s: &str) -> Res<Vec<Coord>> {
  terminated(separated_list0(char(';'), coord), opt(char(';')))(s)
}

fn grid_row(s: &str) -> Res<Vec<Glyph>> {
  // Once a row has started, anything but a glyph before the line ends is
  // fatal, so the error points at the bad character.
  let (s, first) = glyph(s)?;
  let (s, mut row) = cut(context(
    "row",
    terminated(many0(glyph), tuple((space0, alt((line_ending, eof))))),
  ))(s)?;
  row.insert(0, first);
  Ok((s, row))
}

fn glyph(s: &str) -> Res<Glyph> {
  context("tile", map_opt(none_of(" \t\r\n"), Glyph::from_char))(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
  Nothing,
  Start,
  CoinBag,
  Key,
  Block,
}

/// One character of the grid: the tile underneath plus whatever sits on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
  tile: Tile,
  overlay: Overlay,
}

impl Glyph {
  fn from_char(c: char) -> Option<Glyph> {
    let (tile, overlay) = match c {
      '0' => (Tile::Empty, Overlay::Nothing),
      '1' => (Tile::Wall, Overlay::Nothing),
      '2' => (Tile::ThinIce, Overlay::Nothing),
      '3' => (Tile::ThickIce, Overlay::Nothing),
      '4' => (Tile::Lock, Overlay::Nothing),
      '5' => (Tile::Floor, Overlay::Nothing),
      '6' => (Tile::ThinIce, Overlay::Block),
      '7' => (Tile::Teleport, Overlay::Nothing),
      '8' => (Tile::ThinIce, Overlay::CoinBag),
      '9' => (Tile::Finish, Overlay::Nothing),
      'A' => (Tile::ThinIce, Overlay::Start),
      'B' => (Tile::ThinIce, Overlay::Key),
      'C' => (Tile::ThickIce, Overlay::Key),
      'D' => (Tile::Floor, Overlay::Key),
      'E' => (Tile::ThickIce, Overlay::Block),
      _ => return None,
    };
    Some(Glyph { tile, overlay })
  }

  fn to_char(self) -> char {
    match (self.overlay, self.tile) {
      (Overlay::Start, _) => 'A',
      (Overlay::CoinBag, _) => '8',
      (Overlay::Key, Tile::ThinIce) => 'B',
      (Overlay::Key, Tile::ThickIce) => 'C',
      (Overlay::Key, Tile::Floor) => 'D',
      (Overlay::Block, Tile::ThinIce) => '6',
      (Overlay::Block, Tile::ThickIce) => 'E',
      (_, tile) => plain_char(tile),
    }
  }
}

fn plain_char(tile: Tile) -> char {
  match tile {
    Tile::Wall => '1',
    Tile::ThinIce => '2',
    Tile::ThickIce => '3',
    Tile::Lock => '4',
    Tile::Floor => '5',
    Tile::Teleport => '7',
    Tile::Finish => '9',
    Tile::Empty | Tile::Water | Tile::CoinBag | Tile::Block => '0',
  }
}

fn flatten_error(input: &str, e: VerboseError<&str>) -> DecodeError {
  let offset = e
    .errors
    .first()
    .map(|(rest, _)| input.len() - rest.len())
    .unwrap_or(0);
  let message = e
    .errors
    .iter()
    .map(|(_, kind)| match kind {
      VerboseErrorKind::Context(ctx) => format!("in {}", ctx),
      VerboseErrorKind::Char(c) => format!("expected {:?}", c),
      VerboseErrorKind::Nom(kind) => format!("{:?}", kind),
    })
    .collect::<Vec<_>>()
    .join(", ");
  DecodeError::Syntax { offset, message }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SMALL: &str = "START:1,1
TOTAL_TILES:8
COIN_BAGS:2,1
KEYS:1,2
BLOCKS:
TELEPORTS:
11111
1A821
1B391
11111
";

  #[test]
  fn reads_a_level() {
    let level = parse_to_level(SMALL).unwrap();
    assert_eq!(level.width(), 5);
    assert_eq!(level.height(), 4);
    assert_eq!(level.start(), Coord::new(1, 1));
    assert_eq!(level.coin_bags().collect::<Vec<_>>(), vec![Coord::new(2, 1)]);
    assert_eq!(level.keys().collect::<Vec<_>>(), vec![Coord::new(1, 2)]);
    assert_eq!(level.tile(Coord::new(1, 1)), Some(Tile::ThinIce));
    assert_eq!(level.tile(Coord::new(2, 2)), Some(Tile::ThickIce));
    assert_eq!(level.tile(Coord::new(3, 2)), Some(Tile::Finish));
    // A, 8, 2, B are thin; 3 is thick
    assert_eq!(level.total_melt_weight(), 4 + 2);
  }

  #[test]
  fn writes_what_it_reads() {
    let level = parse_to_level(SMALL).unwrap();
    let text = write_level(&level);
    assert_eq!(text.replace("TOTAL_TILES:7", "TOTAL_TILES:8"), SMALL);
    assert_eq!(parse_to_level(&text).unwrap(), level);
  }

  #[test]
  fn overlay_glyphs_fill_in_missing_items() {
    let text = "START:0,0
TOTAL_TILES:1
COIN_BAGS:
KEYS:
BLOCKS:
TELEPORTS:
A6E
8CD
";
    let level = parse_to_level(text).unwrap();
    assert_eq!(level.blocks(), &[Coord::new(1, 0), Coord::new(2, 0)]);
    assert_eq!(level.tile(Coord::new(2, 0)), Some(Tile::ThickIce));
    assert_eq!(level.coin_bags().collect::<Vec<_>>(), vec![Coord::new(0, 1)]);
    assert_eq!(
      level.keys().collect::<Vec<_>>(),
      vec![Coord::new(1, 1), Coord::new(2, 1)]
    );
    assert_eq!(level.tile(Coord::new(2, 1)), Some(Tile::Floor));
  }

  #[test]
  fn teleports_come_from_the_header() {
    let text = "START:0,0
TOTAL_TILES:2
COIN_BAGS:
KEYS:
BLOCKS:
TELEPORTS:1,0;3,0;
A797
";
    let level = parse_to_level(text).unwrap();
    let pair = level.teleports().unwrap();
    assert_eq!(pair.ends(), [Coord::new(1, 0), Coord::new(3, 0)]);
  }

  #[test]
  fn crlf_and_trailing_blank_lines() {
    let text = SMALL.replace('\n', "\r\n") + "\r\n\r\n";
    assert_eq!(parse_to_level(&text).unwrap(), parse_to_level(SMALL).unwrap());
  }

  #[test]
  fn unknown_glyph_is_an_error() {
    let text = SMALL.replace("1B391", "1B3Z1");
    let err = parse_to_level(&text).unwrap_err();
    assert!(matches!(err, DecodeError::Syntax { .. }), "{:?}", err);
    let offset = err.offset().unwrap();
    assert!(text[offset..].starts_with("Z1\n"), "{:?}", err);
  }

  #[test]
  fn start_on_a_wall_is_an_error() {
    let text = SMALL.replace("START:1,1", "START:0,1");
    assert_eq!(
      parse_to_level(&text).unwrap_err(),
      DecodeError::Level(LevelError::StartBlocked(Coord::new(0, 1), Tile::Wall))
    );
  }

  #[test]
  fn start_is_always_written_as_thin_ice() {
    let grid = TileGrid::from_rows(&[[Tile::ThickIce, Tile::Finish]]).unwrap();
    let level = Level::new(grid, Coord::new(0, 0), [], [], [], []).unwrap();
    assert_eq!(level.total_melt_weight(), 2);
    let text = write_level(&level);
    assert!(text.ends_with("A9\n"), "{}", text);
    let back = parse_to_level(&text).unwrap();
    assert_eq!(back.tile(Coord::new(0, 0)), Some(Tile::ThinIce));
    assert_eq!(back.total_melt_weight(), 1);
  }

  #[test]
  fn missing_header_is_an_error() {
    let text = SMALL.replace("KEYS:1,2\n", "");
    let err = parse_to_level(&text).unwrap_err();
    let offset = err.offset().unwrap();
    assert!(text[offset..].starts_with("BLOCKS:"), "{:?}", err);
  }

  #[test]
  fn ragged_grid_is_an_error() {
    let text = SMALL.replace("1B391", "1B39");
    assert_eq!(
      parse_to_level(&text).unwrap_err(),
      DecodeError::RaggedGrid {
        row: 2,
        found: 4,
        expected: 5
      }
    );
  }

  #[test]
  fn unpaired_teleport_is_an_error() {
    let text = SMALL.replace("TELEPORTS:", "TELEPORTS:1,1");
    assert!(matches!(
      parse_to_level(&text).unwrap_err(),
      DecodeError::Level(LevelError::UnpairedTeleports(1))
    ));
  }
}
