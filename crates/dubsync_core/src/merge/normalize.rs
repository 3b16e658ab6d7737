//! Text cleanup for recognizer output.

/// Sentence-ending punctuation that is collapsed when repeated.
const TERMINAL_PUNCTUATION: [char; 4] = ['.', '!', '?', '।'];

/// Collapse whitespace runs, trim, and collapse repeated terminal punctuation.
///
/// `"so...   what??"` becomes `"so. what?"`.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last: Option<char> = None;

    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
            last = Some(' ');
        }
        for c in word.chars() {
            if TERMINAL_PUNCTUATION.contains(&c) && last == Some(c) {
                continue;
            }
            out.push(c);
            last = Some(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_text("  hello \n\t world  "), "hello world");
    }

    #[test]
    fn collapses_repeated_terminals() {
        assert_eq!(normalize_text("wait!!! what??"), "wait! what?");
        assert_eq!(normalize_text("so..."), "so.");
        assert_eq!(normalize_text("नमस्ते।।"), "नमस्ते।");
    }

    #[test]
    fn keeps_mixed_punctuation() {
        assert_eq!(normalize_text("really?!"), "really?!");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(normalize_text(" \n "), "");
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = normalize_text("a  ..  b!!");
        assert_eq!(normalize_text(&once), once);
    }
}
