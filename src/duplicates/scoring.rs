use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::record::{effective_quality_score, extract, IdentityBearing, Record};
use crate::util::name_tokens;

// Master score weights
const IDENTITY_WEIGHT: f64 = 30.0;
const SECONDARY_CODE_WEIGHT: f64 = 10.0;
const LEGAL_ADDRESS_WEIGHT: f64 = 20.0;
const LONG_NAME_WEIGHT: f64 = 10.0;
const LEGAL_FORM_WEIGHT: f64 = 10.0;
const QUALITY_WEIGHT: f64 = 20.0;

/// Names longer than this many characters earn `LONG_NAME_WEIGHT`.
const LONG_NAME_CHARS: usize = 10;

lazy_static! {
    /// Legal-entity form abbreviations recognized in counterparty names.
    static ref LEGAL_FORM_TOKENS: HashSet<&'static str> = [
        "ооо", "оао", "зао", "пао", "ао", "ип", "нко", "гуп", "муп", "фгуп", "ано",
        "llc", "ltd", "inc", "corp", "gmbh", "jsc", "plc",
    ]
    .into_iter()
    .collect();
}

/// True if the name contains a legal-entity form token (`ООО`, `LLC`, ...).
pub fn has_legal_form(name: &str) -> bool {
    name_tokens(name)
        .iter()
        .any(|token| LEGAL_FORM_TOKENS.contains(token.as_str()))
}

/// Scores how suitable a record is as the master of its duplicate group.
///
/// Higher is better. The score only ever grows as fields are filled in.
pub fn calculate_master_score(record: &Record) -> f64 {
    let identity = extract(record);
    let mut score = 0.0;

    if identity.has_any() {
        score += IDENTITY_WEIGHT;
    }
    if identity.has_secondary_code() {
        score += SECONDARY_CODE_WEIGHT;
    }
    if record.legal_address().is_some() {
        score += LEGAL_ADDRESS_WEIGHT;
    }
    if record.name.trim().chars().count() > LONG_NAME_CHARS {
        score += LONG_NAME_WEIGHT;
    }
    if has_legal_form(&record.name) {
        score += LEGAL_FORM_WEIGHT;
    }

    score + effective_quality_score(record) * QUALITY_WEIGHT
}

/// Index of the highest-scoring record; ties keep the earliest one.
pub fn select_master(records: &[&Record]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, record) in records.iter().enumerate() {
        let score = calculate_master_score(record);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(name: &str) -> Record {
        Record::new(1, name)
    }

    #[test]
    fn test_score_of_empty_record_is_quality_only() {
        // default quality 0.5 * 20
        assert_eq!(calculate_master_score(&bare("Bolt")), 10.0);
    }

    #[test]
    fn test_score_components() {
        let record = Record::new(1, "ООО Ромашка и партнеры")
            .with_attribute("inn", "7701234567")
            .with_attribute("kpp", "770101001")
            .with_attribute("legal_address", "Москва, ул. Тверская, 1")
            .with_quality_score(1.0);

        // 30 + 10 + 20 + 10 + 10 + 20
        assert_eq!(calculate_master_score(&record), 100.0);
    }

    #[test]
    fn test_legal_address_adds_exactly_twenty() {
        let without = Record::new(1, "Ромашка").with_attribute("inn", "7701234567");
        let with = without
            .clone()
            .with_attribute("legal_address", "Москва, ул. Тверская, 1");

        assert_eq!(
            calculate_master_score(&with) - calculate_master_score(&without),
            20.0
        );
    }

    #[test]
    fn test_blank_legal_address_does_not_count() {
        let without = bare("Ромашка");
        let blank = without.clone().with_attribute("legal_address", "   ");
        assert_eq!(
            calculate_master_score(&blank),
            calculate_master_score(&without)
        );
    }

    #[test]
    fn test_legal_form_detection_is_token_based() {
        assert!(has_legal_form("ООО \"Ромашка\""));
        assert!(has_legal_form("Acme, LLC"));
        assert!(has_legal_form("ИП Иванов"));
        // "ао" inside a word is not a legal form
        assert!(!has_legal_form("Каолин"));
        assert!(!has_legal_form("Bolt M8x20"));
    }

    #[test]
    fn test_long_name_threshold() {
        assert_eq!(
            calculate_master_score(&bare("12345678901")) - calculate_master_score(&bare("1234567890")),
            10.0
        );
    }

    #[test]
    fn test_select_master_prefers_first_on_tie() {
        let a = Record::new(1, "Bolt");
        let b = Record::new(2, "Bolt");
        let c = Record::new(3, "Bolt").with_quality_score(0.9);
        assert_eq!(select_master(&[&a, &b]), Some(0));
        assert_eq!(select_master(&[&a, &b, &c]), Some(2));
        assert_eq!(select_master(&[]), None);
    }
}
