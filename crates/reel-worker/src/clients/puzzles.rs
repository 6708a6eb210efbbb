use std::path::Path;
use std::time::Duration;

use puzzle_core::puzzle::parse_csv;
use puzzle_core::Puzzle;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::PuzzleQuery;
use crate::error::WorkerError;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

pub struct PuzzleApiClient {
    client: Client,
    base_url: String,
}

impl PuzzleApiClient {
    pub fn new(base_url: &str) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .user_agent("PuzzleReel/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one random puzzle rated at least `min`.
    pub async fn random_by_rating(
        &self,
        min: i32,
        max: Option<i32>,
    ) -> Result<Puzzle, WorkerError> {
        let url = format!("{}/puzzle/random-by-rating", self.base_url);
        let mut params = vec![("min", min.to_string())];
        if let Some(max) = max {
            params.push(("max", max.to_string()));
        }

        let resp = self.client.get(&url).query(&params).send().await?;
        if !resp.status().is_success() {
            return Err(WorkerError::Fetch(format!("{url}: HTTP {}", resp.status())));
        }

        let text = resp.text().await?;
        let puzzle: Puzzle = serde_json::from_str(&text)?;
        info!(puzzle_id = %puzzle.id, rating = ?puzzle.rating, "Fetched puzzle");
        Ok(puzzle)
    }

    /// Run one themed search and return the records that parse.
    pub async fn search(&self, query: &PuzzleQuery, limit: u32) -> Result<Vec<Puzzle>, WorkerError> {
        let url = format!("{}/puzzles", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&search_params(query, limit))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WorkerError::Fetch(format!("{url}: HTTP {}", resp.status())));
        }

        let text = resp.text().await?;
        parse_search_body(&text)
    }

    /// Run every query, skipping the ones that fail, and pool the results.
    pub async fn fetch_pool(&self, queries: &[PuzzleQuery], limit: u32) -> Vec<Puzzle> {
        let mut pool = Vec::new();
        for query in queries {
            match self.search(query, limit).await {
                Ok(puzzles) => {
                    info!(
                        query = %format!("{}={}", query.key, query.value),
                        count = puzzles.len(),
                        "Fetched themed puzzles"
                    );
                    pool.extend(puzzles);
                }
                Err(e) => {
                    warn!(
                        query = %format!("{}={}", query.key, query.value),
                        error = %e,
                        "Puzzle query failed"
                    );
                }
            }
        }
        pool
    }
}

fn search_params(query: &PuzzleQuery, limit: u32) -> Vec<(String, String)> {
    vec![
        (query.key.clone(), query.value.clone()),
        ("min".to_string(), query.min_rating.to_string()),
        ("max".to_string(), query.max_rating.to_string()),
        ("limit".to_string(), limit.to_string()),
    ]
}

/// Parse a `{results: [...]}` body. Records that don't deserialize are dropped.
fn parse_search_body(text: &str) -> Result<Vec<Puzzle>, WorkerError> {
    let body: SearchResponse = serde_json::from_str(text)?;
    let mut puzzles = Vec::with_capacity(body.results.len());
    for record in body.results {
        match serde_json::from_value::<Puzzle>(record) {
            Ok(puzzle) => puzzles.push(puzzle),
            Err(e) => warn!(error = %e, "Skipping unreadable puzzle record"),
        }
    }
    Ok(puzzles)
}

/// Shuffle the pool and keep `count`. A shortfall is logged, not an error.
pub fn select_puzzles<R: Rng + ?Sized>(
    mut pool: Vec<Puzzle>,
    count: usize,
    rng: &mut R,
) -> Vec<Puzzle> {
    let collected = pool.len();
    pool.shuffle(rng);
    pool.truncate(count);

    if pool.len() < count {
        warn!(requested = count, selected = pool.len(), "Fewer puzzles than requested");
    }
    info!(collected, selected = pool.len(), "Puzzles selected");
    pool
}

/// Load puzzles from a Lichess puzzle CSV, keeping those inside the rating range.
pub fn load_csv(path: &Path, min: i32, max: Option<i32>) -> Result<Vec<Puzzle>, WorkerError> {
    let content = std::fs::read_to_string(path)?;
    let import = parse_csv(&content);
    if !import.skipped_lines.is_empty() {
        warn!(
            path = %path.display(),
            skipped = import.skipped_lines.len(),
            "Skipped malformed CSV rows"
        );
    }

    let puzzles: Vec<Puzzle> = import
        .puzzles
        .into_iter()
        .filter(|p| match p.rating {
            Some(r) => r >= min && max.map_or(true, |max| r <= max),
            None => true,
        })
        .collect();
    info!(path = %path.display(), count = puzzles.len(), "Loaded CSV puzzles");
    Ok(puzzles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn puzzle(id: &str) -> Puzzle {
        Puzzle {
            id: id.to_string(),
            fen: START.to_string(),
            moves: vec!["e2e4".to_string()],
            rating: Some(1500),
            themes: Vec::new(),
            game_url: None,
            popularity: None,
        }
    }

    #[test]
    fn test_search_params() {
        let query = PuzzleQuery {
            key: "q".into(),
            value: "mate in 2".into(),
            min_rating: 1200,
            max_rating: 2500,
        };
        let params = search_params(&query, 100);
        assert_eq!(params[0], ("q".to_string(), "mate in 2".to_string()));
        assert_eq!(params[3], ("limit".to_string(), "100".to_string()));
    }

    #[test]
    fn test_parse_search_body_skips_bad_records() {
        let body = format!(
            r#"{{"results": [
                {{"id": 7, "fen": "{START}", "moves": "e2e4 e7e5", "rating": "1650"}},
                {{"fen": "{START}"}},
                {{"id": "abc", "fen": "{START}", "moves": ["d2d4"], "themes": "fork pin"}}
            ]}}"#
        );
        let puzzles = parse_search_body(&body).unwrap();
        assert_eq!(puzzles.len(), 2);
        assert_eq!(puzzles[0].id, "7");
        assert_eq!(puzzles[0].rating, Some(1650));
        assert_eq!(puzzles[1].themes, vec!["fork", "pin"]);
    }

    #[test]
    fn test_parse_search_body_without_results() {
        assert!(parse_search_body("{}").unwrap().is_empty());
        assert!(parse_search_body("not json").is_err());
    }

    #[test]
    fn test_select_puzzles() {
        let pool: Vec<Puzzle> = (0..10).map(|i| puzzle(&i.to_string())).collect();

        let picked = select_puzzles(pool.clone(), 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(picked.len(), 3);
        let again = select_puzzles(pool.clone(), 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(picked, again);

        let short = select_puzzles(pool, 20, &mut StdRng::seed_from_u64(1));
        assert_eq!(short.len(), 10);
    }

    #[test]
    fn test_load_csv_filters_rating() {
        let dir = std::env::temp_dir().join(format!("puzzle_reel_csv_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("puzzles.csv");
        let csv = format!(
            "PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags\n\
             a1,{START},e2e4 e7e5,900,80,90,100,opening,,\n\
             a2,{START},e2e4 e7e5,1500,80,90,100,fork,,\n\
             a3,{START},e2e4 e7e5,2600,80,90,100,fork,,\n\
             broken\n"
        );
        std::fs::write(&path, csv).unwrap();

        let puzzles = load_csv(&path, 1000, Some(2000)).unwrap();
        let ids: Vec<&str> = puzzles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a2"]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
