//! POSIX shell quoting for values spliced into remote commands

use std::borrow::Cow;

fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}

/// Quote `s` as a single shell word
///
/// Words made only of characters the shell never interprets come back
/// unchanged; anything else is wrapped in single quotes.
pub fn quote(s: &str) -> Cow<'_, str> {
    if !s.is_empty() && s.chars().all(is_plain) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_are_unchanged() {
        assert_eq!(quote("flannel.yaml"), "flannel.yaml");
        assert_eq!(quote("topology.kubernetes.io/zone=cn-hangzhou-a"), "topology.kubernetes.io/zone=cn-hangzhou-a");
    }

    #[test]
    fn metacharacters_are_single_quoted() {
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("x;reboot"), "'x;reboot'");
        assert_eq!(quote("$(id)"), "'$(id)'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn single_quotes_are_escaped() {
        assert_eq!(quote("it's"), r"'it'\''s'");
    }
}
