use game_types::{HardModeViolation, LetterStatus, PlayerGuess};

/// Maximum guesses before a player is out.
pub const MAX_GUESSES: u32 = 6;

/// Solve-time threshold for the competitive time bonus.
pub const SCORE_TIME_THRESHOLD_MS: u64 = 60_000;

const GUESS_BONUS_STEP: i32 = 100;

/// Compare a guess against the target word, letter by letter.
///
/// Two passes over the fixed-length words: the first marks exact positional
/// matches and consumes those target positions; the second scans the
/// remaining target positions left-to-right for each unmatched guess letter.
/// Consuming on match is what makes duplicate letters come out right: a
/// letter occurring once in the target can only be marked in one guess
/// position, and exact matches take priority over displaced ones.
pub fn validate_guess(guess: &str, target: &str) -> Vec<LetterStatus> {
    let guess_chars: Vec<char> = guess.to_lowercase().chars().collect();
    let target_chars: Vec<char> = target.to_lowercase().chars().collect();

    let mut result = vec![LetterStatus::Absent; guess_chars.len()];
    let mut consumed = vec![false; target_chars.len()];

    // Pass 1: exact positional matches
    for (i, &ch) in guess_chars.iter().enumerate() {
        if i < target_chars.len() && target_chars[i] == ch {
            result[i] = LetterStatus::Correct;
            consumed[i] = true;
        }
    }

    // Pass 2: displaced letters against unconsumed target positions
    for (i, &ch) in guess_chars.iter().enumerate() {
        if result[i] == LetterStatus::Correct {
            continue;
        }
        if let Some(j) = target_chars
            .iter()
            .enumerate()
            .position(|(j, &t)| !consumed[j] && t == ch)
        {
            result[i] = LetterStatus::Present;
            consumed[j] = true;
        }
    }

    result
}

pub fn is_winning_result(result: &[LetterStatus]) -> bool {
    !result.is_empty() && result.iter().all(|s| *s == LetterStatus::Correct)
}

pub fn is_out_of_guesses(guess_count: u32) -> bool {
    guess_count >= MAX_GUESSES
}

/// Count of exact matches, used for the lightweight opponent progress
/// broadcast.
pub fn count_correct_letters(result: &[LetterStatus]) -> u32 {
    result.iter().filter(|s| **s == LetterStatus::Correct).count() as u32
}

/// Competitive score for a winning game: a bonus per unused guess plus a
/// time bonus that decays to zero at the threshold.
pub fn calculate_score(guess_count: u32, solve_time_ms: u64) -> i32 {
    let guess_bonus = (MAX_GUESSES as i32 + 1 - guess_count as i32) * GUESS_BONUS_STEP;
    let time_bonus = SCORE_TIME_THRESHOLD_MS.saturating_sub(solve_time_ms) as f64 / 1000.0;
    (guess_bonus as f64 + time_bonus).round() as i32
}

/// Check a guess against the constraints revealed by previous guesses.
///
/// Greens are checked first, in ascending position order, so the reported
/// violation is deterministic; yellows are only examined once every green
/// constraint holds.
pub fn validate_hard_mode(
    current_guess: &str,
    previous: &[PlayerGuess],
) -> Result<(), HardModeViolation> {
    let current: Vec<char> = current_guess.to_lowercase().chars().collect();

    // Accumulate required green letters per position.
    let mut greens: Vec<Option<char>> = vec![None; current.len()];
    for prior in previous {
        let letters: Vec<char> = prior.word.to_lowercase().chars().collect();
        for (pos, status) in prior.letters.iter().enumerate() {
            if *status == LetterStatus::Correct && pos < greens.len() {
                greens[pos] = letters.get(pos).copied();
            }
        }
    }

    for (pos, required) in greens.iter().enumerate() {
        if let Some(letter) = required {
            if current.get(pos) != Some(letter) {
                return Err(HardModeViolation {
                    message: format!("{} letter must be {}", ordinal(pos + 1), letter.to_uppercase()),
                    letter: letter.to_string().to_uppercase(),
                    position: Some(pos as u32),
                });
            }
        }
    }

    // Yellow letters must appear somewhere. A letter already pinned green
    // raises the required occurrence count by one for each such position.
    let green_count = |letter: char| greens.iter().filter(|g| **g == Some(letter)).count();
    let occurrences = |letter: char| current.iter().filter(|c| **c == letter).count();

    let mut checked: Vec<char> = Vec::new();
    for prior in previous {
        let letters: Vec<char> = prior.word.to_lowercase().chars().collect();
        let mut present_in_guess: Vec<char> = Vec::new();
        for (pos, status) in prior.letters.iter().enumerate() {
            if *status == LetterStatus::Present {
                if let Some(&letter) = letters.get(pos) {
                    present_in_guess.push(letter);
                }
            }
        }
        for &letter in &present_in_guess {
            if checked.contains(&letter) {
                continue;
            }
            checked.push(letter);
            let required =
                green_count(letter) + present_in_guess.iter().filter(|c| **c == letter).count();
            if occurrences(letter) < required {
                return Err(HardModeViolation {
                    message: format!("Guess must contain {}", letter.to_uppercase()),
                    letter: letter.to_string().to_uppercase(),
                    position: None,
                });
            }
        }
    }

    Ok(())
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_types::LetterStatus::{Absent, Correct, Present};

    fn guess_with(word: &str, letters: Vec<LetterStatus>) -> PlayerGuess {
        PlayerGuess {
            word: word.to_string(),
            letters,
        }
    }

    #[test]
    fn test_exact_match_is_all_correct() {
        for target in ["crate", "hello", "llama"] {
            let result = validate_guess(target, target);
            assert!(result.iter().all(|s| *s == Correct), "target {}", target);
            assert!(is_winning_result(&result));
        }
    }

    #[test]
    fn test_crane_vs_crate() {
        let result = validate_guess("crane", "crate");
        assert_eq!(result, vec![Correct, Correct, Correct, Absent, Correct]);
    }

    #[test]
    fn test_llama_vs_hello_duplicate_letters() {
        // Target has two l's; both guess l's are displaced, the a's and m
        // match nothing.
        let result = validate_guess("llama", "hello");
        assert_eq!(result, vec![Present, Present, Absent, Absent, Absent]);
    }

    #[test]
    fn test_correct_consumes_before_present() {
        // The single 'e' in "crate" is consumed by the exact match at
        // position 4, so the leading 'e' of "eerie" cannot also be Present.
        let result = validate_guess("eerie", "crate");
        assert_eq!(result[4], Correct);
        assert_eq!(result[0], Absent);
        assert_eq!(result[1], Absent);
    }

    #[test]
    fn test_markings_never_exceed_target_occurrences() {
        let cases = [
            ("lllll", "hello"),
            ("eeeee", "crate"),
            ("aabba", "abaca"),
            ("llama", "hello"),
        ];
        for (guess, target) in cases {
            let result = validate_guess(guess, target);
            for letter in 'a'..='z' {
                let marked = guess
                    .chars()
                    .zip(result.iter())
                    .filter(|(c, s)| *c == letter && **s != Absent)
                    .count();
                let in_target = target.chars().filter(|c| *c == letter).count();
                assert!(
                    marked <= in_target,
                    "{} vs {}: letter {} marked {} times, target has {}",
                    guess,
                    target,
                    letter,
                    marked,
                    in_target
                );
            }
        }
    }

    #[test]
    fn test_winning_result_iff_guess_equals_target() {
        assert!(is_winning_result(&validate_guess("crate", "crate")));
        assert!(!is_winning_result(&validate_guess("crane", "crate")));
        assert!(!is_winning_result(&[]));
    }

    #[test]
    fn test_out_of_guesses_boundary() {
        assert!(!is_out_of_guesses(5));
        assert!(is_out_of_guesses(6));
        assert!(is_out_of_guesses(7));
    }

    #[test]
    fn test_count_correct_letters() {
        assert_eq!(count_correct_letters(&validate_guess("crane", "crate")), 4);
        assert_eq!(count_correct_letters(&validate_guess("zzzzz", "crate")), 0);
    }

    #[test]
    fn test_score_one_guess_instant_win() {
        assert_eq!(calculate_score(1, 0), 660);
    }

    #[test]
    fn test_score_monotonic_in_guess_count() {
        for g in 1..MAX_GUESSES {
            assert!(calculate_score(g, 5_000) > calculate_score(g + 1, 5_000));
        }
    }

    #[test]
    fn test_score_monotonic_in_solve_time() {
        assert!(calculate_score(3, 1_000) > calculate_score(3, 30_000));
        // Past the threshold the time bonus stays at zero.
        assert_eq!(calculate_score(3, 60_000), calculate_score(3, 90_000));
    }

    #[test]
    fn test_hard_mode_green_position_enforced() {
        let previous = vec![guess_with(
            "crane",
            vec![Correct, Absent, Absent, Absent, Absent],
        )];
        let err = validate_hard_mode("stone", &previous).unwrap_err();
        assert_eq!(err.message, "1st letter must be C");
        assert_eq!(err.position, Some(0));

        assert!(validate_hard_mode("candy", &previous).is_ok());
    }

    #[test]
    fn test_hard_mode_green_checked_before_yellow() {
        // Position 0 green 'c' and a yellow 'e'; a guess violating both must
        // report the green violation.
        let previous = vec![guess_with(
            "cider",
            vec![Correct, Absent, Absent, Present, Absent],
        )];
        let err = validate_hard_mode("about", &previous).unwrap_err();
        assert!(err.message.contains("1st letter must be C"));
    }

    #[test]
    fn test_hard_mode_lowest_position_reported_first() {
        let previous = vec![guess_with(
            "crate",
            vec![Correct, Correct, Absent, Absent, Absent],
        )];
        let err = validate_hard_mode("shirt", &previous).unwrap_err();
        assert_eq!(err.position, Some(0));
    }

    #[test]
    fn test_hard_mode_present_letter_required() {
        let previous = vec![guess_with(
            "crane",
            vec![Absent, Present, Absent, Absent, Absent],
        )];
        let err = validate_hard_mode("digit", &previous).unwrap_err();
        assert_eq!(err.message, "Guess must contain R");
        assert_eq!(err.position, None);

        assert!(validate_hard_mode("round", &previous).is_ok());
    }

    #[test]
    fn test_hard_mode_green_raises_required_count() {
        // 'e' green at position 4 and yellow at position 0 means two e's
        // are required.
        let previous = vec![guess_with(
            "eerie",
            vec![Present, Absent, Absent, Absent, Correct],
        )];
        // One 'e' only, at the green position: yellow constraint unmet.
        let err = validate_hard_mode("crate", &previous).unwrap_err();
        assert_eq!(err.message, "Guess must contain E");
        // Two e's, one on the green slot: both constraints met.
        assert!(validate_hard_mode("elope", &previous).is_ok());
    }

    #[test]
    fn test_hard_mode_no_history_accepts_anything() {
        assert!(validate_hard_mode("crate", &[]).is_ok());
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(5), "5th");
    }
}
