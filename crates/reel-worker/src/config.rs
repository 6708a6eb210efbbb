//! Worker configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use puzzle_core::TimelineConfig;

use crate::error::WorkerError;

pub const DEFAULT_PUZZLE_API_URL: &str = "https://roynek.com/Chess_Sol_Puzzles/api";
pub const DEFAULT_SOCIAL_API_URL: &str =
    "https://roynek.com/alltrenders/codes/python_API/social-media";
pub const DEFAULT_PUZZLE_LINK_BASE: &str = "https://roynek.com/Chess_Sol_Puzzles/public/?puzzle=";
pub const DEFAULT_MEDIA_URL_BASE: &str = "https://roynek.com/Chess_Sol_Puzzles/auto_post/";

/// Themed batch queries used when `PUZZLE_QUERIES` is unset.
pub const DEFAULT_PUZZLE_QUERIES: &str = "q=endgame:1500-3000;q=mate in 2:1200-2500;\
q=mate:1500-2800;theme=crushing:1400-2600;q=fork:1300-2400;q=pin:1300-2400;\
q=skewer:1400-2500";

/// Which kind of video a run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// One puzzle, published when social targets are configured
    Short,
    /// A batch of puzzles separated by break frames
    Marathon,
}

impl RunMode {
    fn default_output(self) -> &'static str {
        match self {
            RunMode::Short => "chess_short.mp4",
            RunMode::Marathon => "output_video/chess_long.mp4",
        }
    }

    fn default_timeline(self) -> TimelineConfig {
        match self {
            RunMode::Short => TimelineConfig::default(),
            RunMode::Marathon => TimelineConfig {
                initial_pause_secs: 2.0,
                countdown_secs: 10,
                ..TimelineConfig::default()
            },
        }
    }
}

/// One themed query against the batch puzzle endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleQuery {
    /// Query parameter name, e.g. `q` or `theme`
    pub key: String,
    pub value: String,
    pub min_rating: i32,
    pub max_rating: i32,
}

impl FromStr for PuzzleQuery {
    type Err = WorkerError;

    /// `key=value:min-max`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || WorkerError::config(format!("Invalid puzzle query '{s}', expected key=value:min-max"));

        let (pair, range) = s.trim().rsplit_once(':').ok_or_else(bad)?;
        let (key, value) = pair.split_once('=').ok_or_else(bad)?;
        let (min, max) = range.split_once('-').ok_or_else(bad)?;
        let min_rating: i32 = min.trim().parse().map_err(|_| bad())?;
        let max_rating: i32 = max.trim().parse().map_err(|_| bad())?;

        if key.trim().is_empty() || value.trim().is_empty() || min_rating > max_rating {
            return Err(bad());
        }

        Ok(Self {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
            min_rating,
            max_rating,
        })
    }
}

pub fn parse_queries(s: &str) -> Result<Vec<PuzzleQuery>, WorkerError> {
    s.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// A platform to publish to, optionally scoped to an ordered page list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocialTarget {
    pub platform: String,
    pub pages: Option<String>,
}

/// `facebook:3,x` -> facebook (pages "3") and x (no pages)
pub fn parse_targets(s: &str) -> Result<Vec<SocialTarget>, WorkerError> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (platform, pages) = match part.split_once(':') {
                Some((platform, pages)) => (platform.trim(), Some(pages.trim())),
                None => (part, None),
            };
            if platform.is_empty() {
                return Err(WorkerError::config(format!("Invalid social target '{part}'")));
            }
            Ok(SocialTarget {
                platform: platform.to_string(),
                pages: pages.filter(|p| !p.is_empty()).map(String::from),
            })
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub fps: Option<u32>,
    pub countdown_secs: Option<u32>,
    pub move_secs: Option<f64>,
    pub initial_pause_secs: Option<f64>,
    pub final_pause_secs: Option<f64>,
    pub break_secs: Option<f64>,

    /// Frame width and height in pixels
    pub board_size: u32,
    pub font_path: PathBuf,
    pub frames_dir: PathBuf,
    /// Overrides the per-mode default output path
    pub output_video: Option<PathBuf>,

    pub background_music: Option<PathBuf>,
    pub click_sound: Option<PathBuf>,
    pub music_volume: f32,
    pub sfx_volume: f32,
    /// Explicit ffmpeg binary; auto-detected when unset
    pub ffmpeg_path: Option<PathBuf>,

    pub puzzle_api_url: String,
    /// Read puzzles from a local Lichess CSV instead of the API
    pub puzzle_csv: Option<PathBuf>,
    pub min_rating: i32,
    pub max_rating: Option<i32>,
    pub queries: Vec<PuzzleQuery>,
    pub num_puzzles: usize,
    pub per_query_limit: u32,

    pub social_api_url: String,
    /// Empty disables publishing
    pub social_targets: Vec<SocialTarget>,
    pub puzzle_link_base: String,
    pub media_url_base: String,

    pub render_workers: usize,
    pub keep_frames: bool,
    pub rng_seed: Option<u64>,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys fall back to defaults;
    /// set but unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let queries = match get("PUZZLE_QUERIES") {
            Some(v) => parse_queries(&v)?,
            None => parse_queries(DEFAULT_PUZZLE_QUERIES)?,
        };
        let social_targets = match get("SOCIAL_TARGETS") {
            Some(v) => parse_targets(&v)?,
            None => Vec::new(),
        };

        let render_workers = parse_opt(&get, "RENDER_WORKERS")?
            .unwrap_or_else(num_cpus::get)
            .max(1);

        let config = Self {
            fps: parse_opt(&get, "FPS")?,
            countdown_secs: parse_opt(&get, "COUNTDOWN_SECS")?,
            move_secs: parse_opt(&get, "MOVE_SECS")?,
            initial_pause_secs: parse_opt(&get, "INITIAL_PAUSE_SECS")?,
            final_pause_secs: parse_opt(&get, "FINAL_PAUSE_SECS")?,
            break_secs: parse_opt(&get, "BREAK_SECS")?,
            board_size: parse_opt(&get, "BOARD_SIZE")?.unwrap_or(800),
            font_path: get("FONT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./Roboto-Regular.ttf")),
            frames_dir: get("FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("frames")),
            output_video: get("OUTPUT_VIDEO").map(PathBuf::from),
            background_music: get("BACKGROUND_MUSIC").map(PathBuf::from),
            click_sound: get("CLICK_SOUND").map(PathBuf::from),
            music_volume: parse_opt(&get, "MUSIC_VOLUME")?.unwrap_or(0.2),
            sfx_volume: parse_opt(&get, "SFX_VOLUME")?.unwrap_or(0.5),
            ffmpeg_path: get("FFMPEG_PATH").map(PathBuf::from),
            puzzle_api_url: get("PUZZLE_API_URL")
                .unwrap_or_else(|| DEFAULT_PUZZLE_API_URL.to_string()),
            puzzle_csv: get("PUZZLE_CSV").map(PathBuf::from),
            min_rating: parse_opt(&get, "MIN_RATING")?.unwrap_or(1000),
            max_rating: parse_opt(&get, "MAX_RATING")?,
            queries,
            num_puzzles: parse_opt(&get, "NUM_PUZZLES")?.unwrap_or(5),
            per_query_limit: parse_opt(&get, "PER_QUERY_LIMIT")?.unwrap_or(100),
            social_api_url: get("SOCIAL_API_URL")
                .unwrap_or_else(|| DEFAULT_SOCIAL_API_URL.to_string()),
            social_targets,
            puzzle_link_base: get("PUZZLE_LINK_BASE")
                .unwrap_or_else(|| DEFAULT_PUZZLE_LINK_BASE.to_string()),
            media_url_base: get("MEDIA_URL_BASE")
                .unwrap_or_else(|| DEFAULT_MEDIA_URL_BASE.to_string()),
            render_workers,
            keep_frames: get("KEEP_FRAMES").map(|v| parse_bool(&v)).unwrap_or(false),
            rng_seed: parse_opt(&get, "RNG_SEED")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), WorkerError> {
        if self.fps == Some(0) {
            return Err(WorkerError::config("FPS must be positive"));
        }
        if self.board_size < 8 {
            return Err(WorkerError::config("BOARD_SIZE must be at least 8"));
        }
        if self.num_puzzles == 0 {
            return Err(WorkerError::config("NUM_PUZZLES must be positive"));
        }
        if let Some(max) = self.max_rating {
            if max < self.min_rating {
                return Err(WorkerError::config("MAX_RATING is below MIN_RATING"));
            }
        }
        let durations = [
            self.move_secs,
            self.initial_pause_secs,
            self.final_pause_secs,
            self.break_secs,
        ];
        if durations.iter().flatten().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(WorkerError::config("Durations must be finite and non-negative"));
        }
        Ok(())
    }

    /// Timeline settings for a mode: mode defaults with env overrides applied.
    pub fn timeline(&self, mode: RunMode) -> TimelineConfig {
        let base = mode.default_timeline();
        TimelineConfig {
            fps: self.fps.unwrap_or(base.fps),
            countdown_secs: self.countdown_secs.unwrap_or(base.countdown_secs),
            move_secs: self.move_secs.unwrap_or(base.move_secs),
            initial_pause_secs: self.initial_pause_secs.unwrap_or(base.initial_pause_secs),
            final_pause_secs: self.final_pause_secs.unwrap_or(base.final_pause_secs),
            break_secs: self.break_secs.unwrap_or(base.break_secs),
            ..base
        }
    }

    pub fn output_for(&self, mode: RunMode) -> PathBuf {
        self.output_video
            .clone()
            .unwrap_or_else(|| PathBuf::from(mode.default_output()))
    }

    pub fn puzzle_link(&self, puzzle_id: &str) -> String {
        format!("{}{puzzle_id}", self.puzzle_link_base)
    }

    /// Public URL of the encoded video, by file name.
    pub fn media_url(&self, output: &std::path::Path) -> String {
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}{name}", self.media_url_base)
    }
}

fn parse_opt<T, G>(get: &G, key: &str) -> Result<Option<T>, WorkerError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WorkerError::config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(None),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, WorkerError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.board_size, 800);
        assert_eq!(config.num_puzzles, 5);
        assert_eq!(config.min_rating, 1000);
        assert_eq!(config.queries.len(), 7);
        assert_eq!(config.queries[1].value, "mate in 2");
        assert_eq!(config.queries[3].key, "theme");
        assert!(config.social_targets.is_empty());
        assert!(!config.keep_frames);
        assert!(config.render_workers >= 1);
    }

    #[test]
    fn test_mode_timelines() {
        let config = load(&[]).unwrap();
        let short = config.timeline(RunMode::Short);
        assert_eq!(short.countdown_secs, 4);
        assert_eq!(short.initial_pause_secs, 0.0);

        let marathon = config.timeline(RunMode::Marathon);
        assert_eq!(marathon.countdown_secs, 10);
        assert_eq!(marathon.initial_pause_secs, 2.0);
        assert_eq!(marathon.break_secs, 3.0);

        let config = load(&[("COUNTDOWN_SECS", "6"), ("FPS", "24")]).unwrap();
        let marathon = config.timeline(RunMode::Marathon);
        assert_eq!(marathon.countdown_secs, 6);
        assert_eq!(marathon.fps, 24);
    }

    #[test]
    fn test_output_paths() {
        let config = load(&[]).unwrap();
        assert_eq!(config.output_for(RunMode::Short), PathBuf::from("chess_short.mp4"));
        assert_eq!(
            config.media_url(&config.output_for(RunMode::Short)),
            "https://roynek.com/Chess_Sol_Puzzles/auto_post/chess_short.mp4"
        );
        assert_eq!(
            config.puzzle_link("abc12"),
            "https://roynek.com/Chess_Sol_Puzzles/public/?puzzle=abc12"
        );

        let config = load(&[("OUTPUT_VIDEO", "out/x.mp4")]).unwrap();
        assert_eq!(config.output_for(RunMode::Marathon), PathBuf::from("out/x.mp4"));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(load(&[("FPS", "thirty")]).is_err());
        assert!(load(&[("FPS", "0")]).is_err());
        assert!(load(&[("MIN_RATING", "2000"), ("MAX_RATING", "1500")]).is_err());
        assert!(load(&[("MOVE_SECS", "-1")]).is_err());
        assert!(load(&[("PUZZLE_QUERIES", "nonsense")]).is_err());
    }

    #[test]
    fn test_parse_queries() {
        let queries = parse_queries("q=fork:1300-2400; theme=crushing:1400-2600;").unwrap();
        assert_eq!(
            queries,
            vec![
                PuzzleQuery {
                    key: "q".into(),
                    value: "fork".into(),
                    min_rating: 1300,
                    max_rating: 2400,
                },
                PuzzleQuery {
                    key: "theme".into(),
                    value: "crushing".into(),
                    min_rating: 1400,
                    max_rating: 2600,
                },
            ]
        );
        assert!("q=fork:2400-1300".parse::<PuzzleQuery>().is_err());
        assert!("fork:1300-2400".parse::<PuzzleQuery>().is_err());
    }

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets("facebook:3, x").unwrap();
        assert_eq!(
            targets,
            vec![
                SocialTarget {
                    platform: "facebook".into(),
                    pages: Some("3".into()),
                },
                SocialTarget {
                    platform: "x".into(),
                    pages: None,
                },
            ]
        );
        assert!(parse_targets(":3").is_err());
    }

    #[test]
    fn test_keep_frames_flag() {
        assert!(load(&[("KEEP_FRAMES", "true")]).unwrap().keep_frames);
        assert!(load(&[("KEEP_FRAMES", "1")]).unwrap().keep_frames);
        assert!(!load(&[("KEEP_FRAMES", "no")]).unwrap().keep_frames);
    }
}
