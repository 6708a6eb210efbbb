//! Social post captions and per-puzzle overlay messages.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::Side;

pub const DEFAULT_TEMPLATES: &[&str] = &[
    "Can you find the winning move? 🧩",
    "Today's daily challenge is here!",
    "Test your tactics with this {rating} rated puzzle!",
    "What is the best move here?",
    "Spot the winning sequence! 🔥",
    "{side} to move. Can you see it?",
];

pub const DEFAULT_HASHTAGS: &[&str] = &[
    "#Chess",
    "#ChessPuzzles",
    "#Tactics",
    "#Grandmaster",
    "#BrainTeaser",
];

/// Short messages shown on the board during a marathon video.
pub const DEFAULT_OVERLAY_MESSAGES: &[&str] = &[
    "Can you find the winning move? 🧩",
    "Test your tactics!",
    "What's the best move here?",
    "Spot the winning sequence! 🔥",
    "Chess puzzle challenge!",
];

#[derive(Debug, Clone)]
pub struct CaptionComposer {
    pub templates: Vec<String>,
    pub hashtags: Vec<String>,
    pub hashtag_count: usize,
    /// Trailing line, e.g. "@followers"
    pub signature: Option<String>,
}

impl Default for CaptionComposer {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.iter().map(|s| s.to_string()).collect(),
            hashtags: DEFAULT_HASHTAGS.iter().map(|s| s.to_string()).collect(),
            hashtag_count: 3,
            signature: Some("@followers".to_string()),
        }
    }
}

impl CaptionComposer {
    /// Pick a template, fill it in, and append sampled hashtags and the signature.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        rating: Option<i32>,
        side: Option<Side>,
        rng: &mut R,
    ) -> String {
        // Only templates whose placeholders can be filled, unless none qualify
        let usable: Vec<&String> = self
            .templates
            .iter()
            .filter(|t| {
                (rating.is_some() || !t.contains("{rating}"))
                    && (side.is_some() || !t.contains("{side}"))
            })
            .collect();
        let pool: Vec<&String> = if usable.is_empty() {
            self.templates.iter().collect()
        } else {
            usable
        };

        let message = pool
            .choose(rng)
            .map(|t| fill_template(t, rating, side))
            .unwrap_or_default();

        let count = self.hashtag_count.min(self.hashtags.len());
        let tags = self
            .hashtags
            .choose_multiple(rng, count)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        [Some(message), Some(tags), self.signature.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Substitute `{rating}` and `{side}`. Missing values become "unrated" / "Your side".
pub fn fill_template(template: &str, rating: Option<i32>, side: Option<Side>) -> String {
    let rating_text = rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unrated".to_string());
    let side_text = side.map(Side::label).unwrap_or("Your side");
    template
        .replace("{rating}", &rating_text)
        .replace("{side}", side_text)
}

/// Random overlay message from a pool; `None` when the pool is empty.
pub fn pick_message<R: Rng + ?Sized>(pool: &[String], rng: &mut R) -> Option<String> {
    pool.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fill_template() {
        assert_eq!(
            fill_template("Test your tactics with this {rating} rated puzzle!", Some(1600), None),
            "Test your tactics with this 1600 rated puzzle!"
        );
        assert_eq!(
            fill_template("{side} to move", Some(1), Some(Side::Black)),
            "Black to move"
        );
    }

    #[test]
    fn test_compose_layout() {
        let composer = CaptionComposer {
            templates: vec!["Rated {rating}".to_string()],
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let caption = composer.compose(Some(1800), Some(Side::White), &mut rng);

        let parts: Vec<&str> = caption.split("\n\n").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "Rated 1800");
        let tags: Vec<&str> = parts[1].split(' ').collect();
        assert_eq!(tags.len(), 3);
        assert!(tags.iter().all(|t| DEFAULT_HASHTAGS.contains(t)));
        let mut unique = tags.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        assert_eq!(parts[2], "@followers");
    }

    #[test]
    fn test_compose_skips_rating_template_without_rating() {
        let composer = CaptionComposer {
            templates: vec!["Rated {rating}".to_string(), "Plain".to_string()],
            signature: None,
            hashtag_count: 0,
            ..Default::default()
        };
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(composer.compose(None, None, &mut rng), "Plain");
        }
    }

    #[test]
    fn test_compose_is_seed_deterministic() {
        let composer = CaptionComposer::default();
        let a = composer.compose(Some(1500), Some(Side::Black), &mut StdRng::seed_from_u64(9));
        let b = composer.compose(Some(1500), Some(Side::Black), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pick_message() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pick_message(&[], &mut rng), None);
        let pool = vec!["only".to_string()];
        assert_eq!(pick_message(&pool, &mut rng).as_deref(), Some("only"));
    }
}
