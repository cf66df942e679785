use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

/// First daily-word day. Daily number 0 maps to the first answer.
const DAILY_EPOCH: (i32, u32, u32) = (2024, 1, 1);

pub const WORD_LENGTH: usize = 5;

/// The word lists backing every selection mode.
///
/// Answers keep their file order so the daily index is stable across
/// restarts; the allowed set is the superset accepted as a guess.
pub struct WordList {
    answers: Vec<String>,
    allowed: HashSet<String>,
}

impl WordList {
    /// Parse from newline-separated lists. Blank lines and `#` comments are
    /// skipped; words are lowercased and filtered to the game length.
    pub fn from_lists(answers: &str, extra_allowed: &str) -> Result<Self> {
        let answers: Vec<String> = parse_words(answers).collect();
        if answers.is_empty() {
            return Err(anyhow!("Answer list is empty"));
        }

        let mut allowed: HashSet<String> = answers.iter().cloned().collect();
        allowed.extend(parse_words(extra_allowed));

        Ok(Self { answers, allowed })
    }

    /// Load from `answers.txt` and optional `allowed.txt` in a directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let answers = std::fs::read_to_string(dir.join("answers.txt"))
            .with_context(|| format!("Reading answers.txt from {}", dir.display()))?;
        let allowed = std::fs::read_to_string(dir.join("allowed.txt")).unwrap_or_default();
        Self::from_lists(&answers, &allowed)
    }

    /// Whether a word may be submitted as a guess.
    pub fn is_allowed(&self, word: &str) -> bool {
        self.allowed.contains(&word.trim().to_lowercase())
    }

    /// Whether a word is eligible as a target (answer list only).
    pub fn is_answer(&self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        self.answers.iter().any(|w| *w == word)
    }

    /// The daily word for a given daily number. Historical numbers index the
    /// same list, so past days replay identically.
    pub fn daily_word(&self, daily_number: u32) -> &str {
        &self.answers[daily_number as usize % self.answers.len()]
    }

    /// Uniformly sample one answer-eligible word.
    pub fn random_word<R: Rng>(&self, rng: &mut R) -> String {
        self.answers[rng.gen_range(0..self.answers.len())].clone()
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }
}

fn parse_words(list: &str) -> impl Iterator<Item = String> + '_ {
    list.lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| !word.is_empty() && !word.starts_with('#'))
        .filter(|word| word.chars().count() == WORD_LENGTH && word.chars().all(|c| c.is_alphabetic()))
}

/// Days since the fixed reference date, identifying today's word for the
/// whole UTC day.
pub fn daily_number(today: NaiveDate) -> u32 {
    let (y, m, d) = DAILY_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    today.signed_duration_since(epoch).num_days().max(0) as u32
}

pub fn current_daily_number() -> u32 {
    daily_number(chrono::Utc::now().date_naive())
}

/// Sabotage-mode target assignment: shuffle the players, then each picks a
/// word for the next player in the shuffled cyclic order. The wrap-around
/// guarantees a permutation with no fixed points for two or more players.
pub fn assign_sabotage_targets<R: Rng>(
    player_ids: &[Uuid],
    rng: &mut R,
) -> Vec<(Uuid, Uuid)> {
    if player_ids.is_empty() {
        return Vec::new();
    }

    let mut shuffled = player_ids.to_vec();
    shuffled.shuffle(rng);

    shuffled
        .iter()
        .enumerate()
        .map(|(i, &picker)| (picker, shuffled[(i + 1) % shuffled.len()]))
        .collect()
}
