use unicode_normalization::UnicodeNormalization;

/// Canonical form used for every name comparison in the crate: NFKC, lowercase,
/// punctuation turned into spaces, whitespace collapsed.
///
/// Decimal separators and dimension markers survive (`M8x20`, `2.5`), so
/// nomenclature names keep their distinguishing parts.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ё' => 'е',
            c if c.is_alphanumeric() || c == '.' || c == ',' => c,
            _ => ' ',
        })
        .collect();

    folded
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '.' || c == ','))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a name into normalized word tokens.
pub fn name_tokens(name: &str) -> Vec<String> {
    normalize_name(name)
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Truncates text for log lines without splitting a UTF-8 character.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push('…');
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Болт  М8х20 "), "болт м8х20");
        assert_eq!(normalize_name("Nut-M8"), "nut m8");
        assert_eq!(normalize_name("ООО «Ромашка»"), "ооо ромашка");
        assert_eq!(normalize_name("Ёлка"), "елка");
        assert_eq!(normalize_name("Cable 2.5 mm."), "cable 2.5 mm");
    }

    #[test]
    fn test_name_tokens() {
        assert_eq!(name_tokens("ACME, LLC"), vec!["acme", "llc"]);
        assert!(name_tokens("  --  ").is_empty());
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ромашка", 3), "ром…");
    }
}
