//! Puzzle records as delivered by the puzzle API or the Lichess puzzle CSV.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PuzzleError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub fen: String,
    /// UCI moves. `moves[0]` is the opponent's setup move, the rest is the solution.
    #[serde(deserialize_with = "de_moves")]
    pub moves: Vec<String>,
    #[serde(default, deserialize_with = "de_loose_int")]
    pub rating: Option<i32>,
    #[serde(default, deserialize_with = "de_themes")]
    pub themes: Vec<String>,
    #[serde(default, alias = "gameUrl")]
    pub game_url: Option<String>,
    #[serde(default, deserialize_with = "de_loose_int")]
    pub popularity: Option<i32>,
}

impl Puzzle {
    pub fn setup_move(&self) -> Option<&str> {
        self.moves.first().map(String::as_str)
    }

    pub fn solution(&self) -> &[String] {
        self.moves.get(1..).unwrap_or(&[])
    }

    /// Shape check only; legality is checked by replaying on a board.
    pub fn check_shape(&self) -> Result<(), PuzzleError> {
        if self.moves.is_empty() {
            return Err(PuzzleError::EmptyMoves(self.id.clone()));
        }
        if self.fen.trim().is_empty() {
            return Err(PuzzleError::Malformed(format!("puzzle {} has no FEN", self.id)));
        }
        Ok(())
    }
}

/// Split a space separated move line, dropping empty tokens.
pub fn split_moves(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrLine {
    List(Vec<String>),
    Line(String),
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match TextOrNumber::deserialize(d)? {
        TextOrNumber::Text(s) => s.trim().to_string(),
        TextOrNumber::Number(n) => n.to_string(),
    })
}

fn de_moves<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match ListOrLine::deserialize(d)? {
        ListOrLine::List(list) => list
            .iter()
            .flat_map(|m| split_moves(m))
            .collect(),
        ListOrLine::Line(line) => split_moves(&line),
    })
}

fn de_loose_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Ok(match Option::<TextOrNumber>::deserialize(d)? {
        Some(TextOrNumber::Number(n)) => i32::try_from(n).ok(),
        Some(TextOrNumber::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

fn de_themes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<ListOrLine>::deserialize(d)? {
        Some(ListOrLine::List(list)) => list,
        Some(ListOrLine::Line(line)) => split_moves(&line),
        None => Vec::new(),
    })
}

/// Result of importing a Lichess puzzle CSV.
#[derive(Debug, Default)]
pub struct CsvImport {
    pub puzzles: Vec<Puzzle>,
    /// 1-based line numbers of rows that could not be parsed
    pub skipped_lines: Vec<usize>,
}

/// Parse one row of the Lichess puzzle database:
/// `PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags`.
/// Split files carry an extra leading row-number column, which is dropped.
pub fn parse_csv_row(line: &str) -> Result<Puzzle, PuzzleError> {
    let mut fields: Vec<&str> = line.trim().split(',').collect();
    if fields.len() == 11 {
        fields.remove(0);
    }
    if fields.len() < 4 {
        return Err(PuzzleError::Malformed(format!(
            "expected at least 4 columns, got {}",
            fields.len()
        )));
    }

    let field = |i: usize| fields.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());

    let id = field(0).ok_or_else(|| PuzzleError::Malformed("missing PuzzleId".into()))?;
    let fen = field(1).ok_or_else(|| PuzzleError::Malformed("missing FEN".into()))?;
    let moves = split_moves(field(2).unwrap_or(""));

    let puzzle = Puzzle {
        id: id.to_string(),
        fen: fen.to_string(),
        moves,
        rating: field(3).and_then(|s| s.parse().ok()),
        themes: field(7).map(split_moves).unwrap_or_default(),
        game_url: field(8).map(str::to_string),
        popularity: field(5).and_then(|s| s.parse().ok()),
    };
    puzzle.check_shape()?;
    Ok(puzzle)
}

/// Parse a whole CSV document. The first line is treated as a header when it
/// starts with `PuzzleId` (optionally after a row-number column).
pub fn parse_csv(content: &str) -> CsvImport {
    let mut import = CsvImport::default();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if i == 0 && trimmed.contains("PuzzleId") {
            continue;
        }
        match parse_csv_row(trimmed) {
            Ok(puzzle) => import.puzzles.push(puzzle),
            Err(e) => {
                tracing::debug!(line = i + 1, error = %e, "Skipping CSV row");
                import.skipped_lines.push(i + 1);
            }
        }
    }

    import
}
