use std::sync::OnceLock;

use regex::Regex;

use super::domain::AddressInput;

fn secondary_keywords() -> &'static Regex {
    static KEYWORDS: OnceLock<Regex> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        Regex::new(r"(?i)\b(?:apt|unit)\.?|#").expect("secondary keyword pattern compiles")
    })
}

/// Free text handed to the tagger: `"<address1> <address2>, <city>, <state> <zip>"`
/// with `#` removed from both street lines.
pub fn compose_free_text(input: &AddressInput) -> String {
    format!(
        "{} {}, {}, {} {}",
        input.address1.replace('#', "").trim(),
        input.address2.replace('#', "").trim(),
        input.city.trim(),
        input.state.trim(),
        input.zip_code.trim(),
    )
}

/// Rewrite a secondary line into the validator's preferred `Unit <id>` form.
///
/// `"Apt 4B"`, `"Apt4B"`, `"#4B"` and `"unit 4b"` all become `"Unit 4B"`/`"Unit 4b"`.
/// A line holding only keywords becomes blank. Applying it twice yields the
/// same value.
pub fn normalize_secondary_line(line: &str) -> String {
    let stripped = secondary_keywords().replace_all(line, "");
    let remainder = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if remainder.is_empty() {
        return remainder;
    }
    format!("Unit {remainder}")
}
