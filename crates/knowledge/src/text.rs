//! Word-level text helpers shared by the trigram embedder and the extractive
//! answer model.

/// Lowercased words with leading and trailing punctuation stripped.
///
/// Words are separated by Unicode whitespace; characters are compared as
/// `char`s so Cyrillic and other non-ASCII text is handled like ASCII.
pub fn normalized_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation_and_case() {
        assert_eq!(
            normalized_words("Москва — столица России."),
            vec!["москва", "столица", "россии"]
        );
    }

    #[test]
    fn test_keeps_inner_punctuation() {
        assert_eq!(
            normalized_words("Санкт-Петербург, e-mail!"),
            vec!["санкт-петербург", "e-mail"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(normalized_words("  \n\t ").is_empty());
        assert!(normalized_words("— ... !!").is_empty());
    }
}
