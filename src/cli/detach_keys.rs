//! Validation of the `--detach-keys` sequence.
//!
//! A sequence is a comma-separated list of keys. Each key is a single ASCII
//! letter or `ctrl-<value>` where `<value>` is a letter or one of `@^[\]_`.
//! An empty sequence disables detaching.

const CTRL_SYMBOLS: &[char] = &['@', '^', '[', '\\', ']', '_'];

pub fn parse_detach_keys(raw: &str) -> Result<String, String> {
    if raw.starts_with('-') {
        return Err(format!(
            "option --detach-keys requires a value, got {raw:?} which looks like a flag"
        ));
    }
    if raw.is_empty() {
        return Ok(String::new());
    }

    for key in raw.split(',') {
        if !is_valid_key(key) {
            return Err(format!("invalid detach key {key:?} in {raw:?}"));
        }
    }

    Ok(raw.to_string())
}

fn is_valid_key(key: &str) -> bool {
    let (value, ctrl) = match key.strip_prefix("ctrl-") {
        Some(rest) => (rest, true),
        None => (key, false),
    };

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => !ctrl || c.is_ascii_lowercase(),
        (Some(c), None) => ctrl && CTRL_SYMBOLS.contains(&c),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_sequences() {
        for keys in ["ctrl-p,ctrl-q", "a", "ctrl-@", "ctrl-\\,x", "ctrl-_", ""] {
            assert_eq!(parse_detach_keys(keys).as_deref(), Ok(keys), "{keys}");
        }
    }

    #[test]
    fn rejects_flag_lookalikes() {
        let err = parse_detach_keys("--interactive").unwrap_err();
        assert!(err.contains("requires a value"));
    }

    #[test]
    fn rejects_malformed_keys() {
        for keys in ["ctrl-", "ctrl-P", "ab", "ctrl-p,", "1", "ctrl-1", "alt-x"] {
            assert!(parse_detach_keys(keys).is_err(), "{keys}");
        }
    }
}
