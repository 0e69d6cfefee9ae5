//! Confirmation codes: pulling them out of speech transcripts and minting new ones.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

static CODE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z0-9]{6,7})\b").expect("valid code regex"));

/// Six and seven letter words a passenger is likely to say around a code.
const STOP_WORDS: &[&str] = &[
    "CHANGE", "FLIGHT", "FLIGHTS", "PLEASE", "THANKS", "TRAVEL", "FAMILY", "TICKET", "RETURN",
    "SHOULD", "ANOTHER", "BOOKING", "CONFIRM", "CANCEL", "STATUS", "AIRPORT", "MORNING",
    "EVENING", "TONIGHT", "MONDAY", "FRIDAY", "SUNDAY", "TUESDAY", "JANUARY", "OCTOBER",
    "AUGUST", "BECAUSE", "ALREADY", "REALLY", "NEEDED", "WANTED", "CHICAGO", "DALLAS", "BOSTON",
    "DENVER", "SEATTLE", "PHOENIX", "HOUSTON", "ATLANTA", "HELPING", "WINDOW", "PERSON",
    "AGENTS", "NUMBER", "LOOKUP", "RECORD", "CHANGED", "SOMEONE", "ANYONE", "CAMBIAR",
    "GRACIAS", "RESERVA", "QUIERO", "VUELOS", "AYUDAR", "MANANA", "FAMILIA", "ASIENTO",
    "CODIGO", "AGENTE", "PERSONA", "HABLAR", "ESTADO",
];

const PHONETIC: &[(&str, char)] = &[
    ("ALPHA", 'A'), ("ALFA", 'A'), ("BRAVO", 'B'), ("CHARLIE", 'C'), ("DELTA", 'D'),
    ("ECHO", 'E'), ("FOXTROT", 'F'), ("GOLF", 'G'), ("HOTEL", 'H'), ("INDIA", 'I'),
    ("JULIET", 'J'), ("JULIETT", 'J'), ("KILO", 'K'), ("LIMA", 'L'), ("MIKE", 'M'),
    ("NOVEMBER", 'N'), ("OSCAR", 'O'), ("PAPA", 'P'), ("QUEBEC", 'Q'), ("ROMEO", 'R'),
    ("SIERRA", 'S'), ("TANGO", 'T'), ("UNIFORM", 'U'), ("VICTOR", 'V'), ("WHISKEY", 'W'),
    ("XRAY", 'X'), ("X-RAY", 'X'), ("YANKEE", 'Y'), ("ZULU", 'Z'),
    ("ZERO", '0'), ("ONE", '1'), ("TWO", '2'), ("THREE", '3'), ("FOUR", '4'),
    ("FIVE", '5'), ("SIX", '6'), ("SEVEN", '7'), ("EIGHT", '8'), ("NINE", '9'),
];

fn is_code_length(code: &str) -> bool {
    (6..=7).contains(&code.len())
}

/// Finds a 6-7 character confirmation code in a transcript.
///
/// Tries, in order: a code written as one token with at least one digit,
/// a code spelled out with spaces or dashes ("D E M O 1 2 3"), and a code
/// read in the phonetic alphabet ("Delta Echo Mike Oscar One Two Three").
/// Letter-only words are never taken as codes here; "CONNECT" or "MISSED"
/// in ordinary speech must not trigger a lookup.
pub fn extract_confirmation_code(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    let candidates = code_tokens(&upper);

    if let Some(code) = candidates.iter().find(|c| c.chars().any(|ch| ch.is_ascii_digit())) {
        return Some(code.to_string());
    }
    spelled_out(&upper).or_else(|| phonetic(&upper))
}

/// Like [`extract_confirmation_code`], but also accepts a letter-only token
/// that is not a common word. Use only when the passenger is known to be
/// reading out a code, e.g. the turn was classified as a lookup.
pub fn extract_stated_code(text: &str) -> Option<String> {
    extract_confirmation_code(text).or_else(|| {
        let upper = text.to_uppercase();
        code_tokens(&upper)
            .into_iter()
            .find(|c| !STOP_WORDS.contains(c))
            .map(str::to_string)
    })
}

fn code_tokens(upper: &str) -> Vec<&str> {
    CODE_TOKEN
        .captures_iter(upper)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn spelled_out(upper: &str) -> Option<String> {
    let tokens: Vec<&str> = upper
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() < 2 {
        return None;
    }

    let joined: String = tokens.concat();
    if !is_code_length(&joined) || !joined.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    // "DEMO 123" is a code; "MY FLIGHT" is not
    let single_chars = tokens.iter().all(|t| t.len() == 1);
    let has_digit = joined.chars().any(|c| c.is_ascii_digit());
    (single_chars || has_digit).then_some(joined)
}

fn phonetic(upper: &str) -> Option<String> {
    let mut code = String::new();
    for word in upper.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-');
        if let Some((_, ch)) = PHONETIC.iter().find(|(w, _)| *w == word) {
            code.push(*ch);
        } else if word.len() == 1 && word.chars().all(|c| c.is_ascii_alphanumeric()) {
            code.push_str(word);
        }
    }
    is_code_length(&code).then_some(code)
}

/// New six-character code without the easily confused characters (0, O, 1, I).
pub fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_in_sentence() {
        assert_eq!(
            extract_confirmation_code("my code is demo123 thank you").as_deref(),
            Some("DEMO123")
        );
        assert_eq!(extract_confirmation_code("It's ABUELA1").as_deref(), Some("ABUELA1"));
    }

    #[test]
    fn test_common_words_are_not_codes() {
        assert_eq!(extract_confirmation_code("I want to change my flight"), None);
        assert_eq!(extract_confirmation_code("please help"), None);
        assert_eq!(extract_confirmation_code("Quiero cambiar mi vuelo"), None);
    }

    #[test]
    fn test_letter_only_words_need_a_stated_code() {
        assert_eq!(extract_confirmation_code("Please connect me to an agent"), None);
        assert_eq!(extract_confirmation_code("I missed my flight, I'm worried"), None);
        assert_eq!(extract_confirmation_code("It's ABCDEF"), None);

        assert_eq!(extract_stated_code("It's ABCDEF").as_deref(), Some("ABCDEF"));
        assert_eq!(extract_stated_code("my code is demo123").as_deref(), Some("DEMO123"));
        assert_eq!(extract_stated_code("the booking please"), None);
    }

    #[test]
    fn test_digit_candidate_preferred() {
        assert_eq!(
            extract_confirmation_code("change flight TEST456").as_deref(),
            Some("TEST456")
        );
    }

    #[test]
    fn test_spelled_out_code() {
        assert_eq!(extract_confirmation_code("D E M O 1 2 3").as_deref(), Some("DEMO123"));
        assert_eq!(extract_confirmation_code("d-e-m-o-1-2-3").as_deref(), Some("DEMO123"));
    }

    #[test]
    fn test_phonetic_code() {
        assert_eq!(
            extract_confirmation_code("Delta Echo Mike Oscar One Two Three").as_deref(),
            Some("DEMO123")
        );
        assert_eq!(extract_confirmation_code("alpha bravo"), None);
    }

    #[test]
    fn test_generated_code_alphabet() {
        for _ in 0..50 {
            let code = generate_confirmation_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }
}
