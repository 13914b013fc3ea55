use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHESIZED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\s*(\d+(?:\.\d+)?)\s*\)$").expect("valid regex"));

const NULL_TOKENS: [&str; 5] = ["na", "nan", "none", "--", "closed"];

/// Trims a categorical cell and maps blanks and the literal `"0"` to null.
pub fn clean_string(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed == "0" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Turns a human-formatted number into an `f64`.
///
/// Handles thousands separators, accounting negatives such as `(1,200)`, and percent
/// signs. Values are divided by 100 when the cell carries a `%` or when the row's
/// parameter is itself the percent row (`is_percent_parameter`). Anything that still
/// fails to parse comes back as null.
pub fn clean_numeric(raw: Option<&str>, is_percent_parameter: bool) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || is_null_token(trimmed) {
        return None;
    }

    let without_commas = trimmed.replace(',', "");
    let is_percent_value = without_commas.contains('%');
    let stripped = without_commas.replace('%', "");

    let candidate = match PARENTHESIZED_NUMBER.captures(&stripped) {
        Some(caps) => format!("-{}", &caps[1]),
        None => stripped,
    };

    let value: f64 = candidate.trim().parse().ok()?;
    if is_percent_parameter || is_percent_value {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

/// True when the cleaned parameter is the dedicated percent row.
pub fn is_percent_parameter(parameter: Option<&str>) -> bool {
    parameter.map(str::trim) == Some("%")
}

fn is_null_token(value: &str) -> bool {
    NULL_TOKENS
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}
