#![allow(dead_code)]

use puzzle_core::Puzzle;

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Puzzle 00008 from the Lichess puzzle database: Black's setup move, White to solve.
pub const LICHESS_00008: &str = "00008,r6k/pp2r2p/4Rp1Q/3p4/8/1N1P2R1/PqP2bPP/7K b - - 0 24,\
f2g3 e6e7 b2b1 b3c1 b1c1 h6c1,1852,74,97,444,crushing hangingPiece long middlegame,\
https://lichess.org/787zsVup/black#48,";

/// Fonts commonly present on Linux hosts, for tests that draw text.
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

pub fn puzzle(id: &str, fen: &str, moves: &[&str], rating: Option<i32>) -> Puzzle {
    Puzzle {
        id: id.to_string(),
        fen: fen.to_string(),
        moves: moves.iter().map(|m| m.to_string()).collect(),
        rating,
        themes: Vec::new(),
        game_url: None,
        popularity: None,
    }
}

/// A small pool of legal puzzles from the starting position.
pub fn pool() -> Vec<Puzzle> {
    vec![
        puzzle("open-e4", START, &["e2e4", "e7e5"], Some(1500)),
        puzzle("open-d4", START, &["d2d4", "d7d5", "c2c4"], Some(1600)),
        puzzle("one-move", START, &["g1f3"], None),
        puzzle("italian", START, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"], Some(1300)),
    ]
}

pub fn system_font() -> Option<std::path::PathBuf> {
    FONT_CANDIDATES
        .iter()
        .map(std::path::PathBuf::from)
        .find(|p| p.is_file())
}

/// Fresh directory under the system temp dir, unique per test name and process.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("puzzle_reel_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
