//! Per-mode term extraction. Each function returns raw terms in emission
//! order; positions are assigned afterwards by `number_tokens`.

use regex::Regex;

/// standard: lowercase; split on non-alphanumeric; drop empty.
pub fn tokenize_standard(text: &str) -> Vec<String> {
    split_alnum(&text.to_lowercase())
}

/// simple: lowercase; split on non-letter.
pub fn tokenize_simple(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// whitespace: split on whitespace only; case preserved.
pub fn tokenize_whitespace(text: &str) -> Vec<String> {
    text.split_whitespace().map(|s| s.to_string()).collect()
}

/// keyword: a single token equal to the full input, unmodified.
pub fn tokenize_keyword(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

/// email: local part, full domain, and each domain label, lowercased.
pub fn tokenize_email(text: &str) -> Vec<String> {
    let text = text.trim().to_lowercase();
    let Some((local, domain)) = text.split_once('@') else {
        return tokenize_standard(&text);
    };
    if local.is_empty() || domain.is_empty() {
        return tokenize_standard(&text);
    }

    let mut out = vec![local.to_string(), domain.to_string()];
    for label in domain.split('.') {
        if !label.is_empty() {
            out.push(label.to_string());
        }
    }
    out
}

/// url: strip scheme; emit host, each host label, and non-empty path/query segments.
pub fn tokenize_url(text: &str) -> Vec<String> {
    let text = text.trim().to_lowercase();
    let without_scheme = text
        .strip_prefix("https://")
        .or_else(|| text.strip_prefix("http://"))
        .unwrap_or(&text);

    let (host, rest) = match without_scheme.find(['/', '?']) {
        Some(idx) => (&without_scheme[..idx], &without_scheme[idx..]),
        None => (without_scheme, ""),
    };
    // Strip a userinfo@ prefix or :port suffix from the host, if present.
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);

    let mut out = Vec::new();
    if !host.is_empty() {
        out.push(host.to_string());
        for label in host.split('.') {
            if !label.is_empty() {
                out.push(label.to_string());
            }
        }
    }

    for segment in rest.split(['/', '?', '&', '=']) {
        if !segment.is_empty() {
            out.push(segment.to_string());
        }
    }

    out
}

/// phone: each digit group, overlapping 3-digit suffix windows of the last
/// group, and the fully-concatenated digit string.
pub fn tokenize_phone(text: &str) -> Vec<String> {
    let groups: Vec<String> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    if groups.is_empty() {
        return Vec::new();
    }

    let mut out = groups.clone();

    if let Some(last) = groups.last() {
        let chars: Vec<char> = last.chars().collect();
        if chars.len() > 3 {
            for start in 0..=(chars.len() - 3) {
                let window: String = chars[start..start + 3].iter().collect();
                out.push(window);
            }
        }
    }

    let concatenated: String = groups.concat();
    out.push(concatenated);

    out
}

/// pattern: apply a configured regex to extract tokens; default is
/// alphanumeric runs, matching `standard`'s splitting rule.
pub fn tokenize_pattern(text: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

pub fn default_pattern() -> Regex {
    Regex::new(r"[A-Za-z0-9]+").expect("default pattern regex is valid")
}

/// advanced: standard, plus apostrophe/possessive stripping and punctuation
/// normalization (smart quotes / dashes folded before splitting).
pub fn tokenize_advanced(text: &str) -> Vec<String> {
    let normalized = text
        .replace(['\u{2019}', '\u{2018}'], "'")
        .replace(['\u{2014}', '\u{2013}'], "-");

    let without_possessive = strip_possessives(&normalized);
    split_alnum(&without_possessive.to_lowercase())
}

fn strip_possessives(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\'' {
            let rest = &chars[i + 1..];
            if rest.first().map(|c| *c == 's' || *c == 'S') == Some(true)
                && rest.get(1).map(|c| c.is_alphanumeric()) != Some(true)
            {
                i += 2;
                continue;
            }
            if rest.is_empty() {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn split_alnum(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_splits_and_lowercases() {
        assert_eq!(
            tokenize_standard("The Quick, Brown Fox!"),
            vec!["the", "quick", "brown", "fox"]
        );
    }

    #[test]
    fn whitespace_preserves_case() {
        assert_eq!(
            tokenize_whitespace("Hello  World"),
            vec!["Hello", "World"]
        );
    }

    #[test]
    fn keyword_is_single_token() {
        assert_eq!(tokenize_keyword("Hello World"), vec!["Hello World"]);
        assert_eq!(tokenize_keyword(""), Vec::<String>::new());
    }

    #[test]
    fn email_emits_parts() {
        let tokens = tokenize_email("user@sub.example.com");
        for expected in ["user", "sub.example.com", "sub", "example", "com"] {
            assert!(tokens.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn url_strips_scheme_and_splits_path() {
        let tokens = tokenize_url("https://www.example.com/path/to?q=rust");
        assert!(tokens.contains(&"www.example.com".to_string()));
        assert!(tokens.contains(&"www".to_string()));
        assert!(tokens.contains(&"path".to_string()));
        assert!(tokens.contains(&"q".to_string()));
        assert!(tokens.contains(&"rust".to_string()));
    }

    #[test]
    fn phone_emits_groups_and_windows() {
        let tokens = tokenize_phone("555-1234");
        assert!(tokens.contains(&"555".to_string()));
        assert!(tokens.contains(&"1234".to_string()));
        assert!(tokens.contains(&"123".to_string()));
        assert!(tokens.contains(&"234".to_string()));
        assert!(tokens.contains(&"5551234".to_string()));
    }

    #[test]
    fn advanced_strips_possessive() {
        assert_eq!(tokenize_advanced("Frodo's ring"), vec!["frodo", "ring"]);
    }
}
