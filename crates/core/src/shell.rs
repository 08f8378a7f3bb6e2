//! Shell quoting for values interpolated into generated command lines

/// Characters that never need quoting besides ASCII word characters
const SAFE_PUNCTUATION: &str = "@%+=:,./-";

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || SAFE_PUNCTUATION.contains(c)
}

/// Return a shell-escaped version of `value`
///
/// - empty string becomes `''`
/// - strings made only of ASCII word characters and `@%+=:,./-` pass through
/// - anything else is wrapped in single quotes, embedded `'` becoming `'"'"'`
///
/// # Examples
///
/// ```
/// use hostward_core::shell::quote;
///
/// assert_eq!(quote(""), "''");
/// assert_eq!(quote("abc-123_ok"), "abc-123_ok");
/// assert_eq!(quote("it's \"fun\""), r#"'it'"'"'s "fun"'"#);
/// ```
#[must_use]
pub fn quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    if value.chars().all(is_safe_char) {
        return value.to_string();
    }

    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

/// Quote and join several arguments with spaces
#[must_use]
pub fn join<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_quote_safe_passthrough() {
        assert_eq!(quote("abc-123_ok"), "abc-123_ok");
        assert_eq!(quote("user@example.org:/var/www,1+2=3%"), "user@example.org:/var/www,1+2=3%");
    }

    #[test]
    fn test_quote_single_and_double_quotes() {
        assert_eq!(quote("it's \"fun\""), "'it'\"'\"'s \"fun\"'");
    }

    #[test]
    fn test_quote_spaces_and_metacharacters() {
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("$HOME"), "'$HOME'");
        assert_eq!(quote("x;rm -rf /"), "'x;rm -rf /'");
    }

    #[test]
    fn test_quote_non_ascii() {
        assert_eq!(quote("café"), "'café'");
        assert_eq!(quote("домен"), "'домен'");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&["one", "two words", ""]), "one 'two words' ''");
    }
}
