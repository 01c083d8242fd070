use std::time::{SystemTime, UNIX_EPOCH};

/// Leading characters of a session token, safe to log.
pub fn token_prefix(t: &str) -> &str {
    match t.char_indices().nth(12) {
        Some((end, _)) => &t[..end],
        None => t,
    }
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_prefix() {
        assert_eq!(token_prefix("abcdefghijklmnop"), "abcdefghijkl");
        assert_eq!(token_prefix("sess1"), "sess1");
        assert_eq!(token_prefix(""), "");
    }

    #[test]
    fn test_now_millis_is_milliseconds() {
        // Later than 2020-01-01 in ms, earlier than the same instant in µs.
        let now = now_millis();
        assert!(now > 1_577_836_800_000);
        assert!(now < 1_577_836_800_000_000);
    }
}
