use crate::taxonomy::TaxonomyNode;

/// Generate a prompt asking the model to pick one category among the children
/// of the current taxonomy level.
pub fn level_choice_prompt(
    item_name: &str,
    category_hint: &str,
    path: &[&TaxonomyNode],
    candidates: &[TaxonomyNode],
) -> String {
    let path_text = if path.is_empty() {
        "(top level)".to_string()
    } else {
        path.iter()
            .map(|node| format!("{} {}", node.code, node.name))
            .collect::<Vec<_>>()
            .join(" > ")
    };

    let hint_text = if category_hint.trim().is_empty() {
        "(none)".to_string()
    } else {
        category_hint.trim().to_string()
    };

    let candidate_lines = candidates
        .iter()
        .map(|node| format!("- {}: {}", node.code, node.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
You classify items from an accounting nomenclature into a product taxonomy.

ITEM NAME:
----------
{item}
----------

CATEGORY HINT FROM THE SOURCE SYSTEM: {hint}
CURRENT POSITION IN THE TAXONOMY: {path}

TASK: Choose the ONE category below that best fits the item.

CANDIDATE CATEGORIES:
{candidates}

RETURN FORMAT (JSON):
{{
  "code": "code of the chosen category, or null if none fits",
  "confidence": 0.0
}}

RULES:
- Return only the JSON object, no commentary
- "code" must be copied exactly from the candidate list
- "confidence" is a number between 0 and 1
- Use null for "code" when no candidate is a reasonable fit
"#,
        item = item_name.trim(),
        hint = hint_text,
        path = path_text,
        candidates = candidate_lines,
    )
}
