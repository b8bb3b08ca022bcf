//! Scalar clean-up applied to every imported cell before it reaches the writer.
//!
//! The datastore binds parameters, so stripping SQL metacharacters here is a
//! second line only. Every function is total: bad input becomes `None`.

/// Upper bound accepted by numeric fields (inclusive).
pub const MAX_NUMERIC_VALUE: f64 = 999_999.0;

pub const MAX_EQUIPMENT_ITEMS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLimit {
    Name,
    Email,
    Phone,
    Short,
    Long,
}

impl TextLimit {
    pub fn max_chars(self) -> usize {
        match self {
            TextLimit::Name => 200,
            TextLimit::Email => 254,
            TextLimit::Phone => 50,
            TextLimit::Short => 255,
            TextLimit::Long => 2000,
        }
    }

    fn keeps_line_breaks(self) -> bool {
        matches!(self, TextLimit::Long)
    }
}

const SQL_METACHARS: [char; 4] = [';', '\'', '"', '\\'];
const SQL_SEQUENCES: [&str; 3] = ["--", "/*", "*/"];

/// Trims, strips control and SQL metacharacters, and truncates to the limit.
pub fn sanitize_text(raw: &str, limit: TextLimit) -> Option<String> {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| {
            if SQL_METACHARS.contains(c) {
                return false;
            }
            if c.is_control() {
                return limit.keeps_line_breaks() && (*c == '\n' || *c == '\t');
            }
            true
        })
        .collect();

    // Removing "/**/" from "-/**/-" leaves "--", so repeat until stable.
    loop {
        let before = cleaned.len();
        for seq in SQL_SEQUENCES {
            cleaned = cleaned.replace(seq, "");
        }
        if cleaned.len() == before {
            break;
        }
    }

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(truncate_chars(trimmed, limit.max_chars()))
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => value[..end].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Parses a loosely formatted number. Thousands separators and a trailing
/// unit ("82 kg", "180cm") are tolerated; anything else, or a value outside
/// `[0, 999999]`, yields `None`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_unit = trimmed
        .trim_end_matches(|c: char| c.is_alphabetic())
        .trim_end();
    let numeric: String = without_unit.chars().filter(|c| *c != ',' && *c != '_').collect();
    let numeric = numeric.trim();
    if numeric.is_empty() {
        return None;
    }

    let value: f64 = numeric.parse().ok()?;
    if !value.is_finite() || !(0.0..=MAX_NUMERIC_VALUE).contains(&value) {
        return None;
    }
    Some(value)
}

/// Whole-number variant of [`parse_numeric`], rounded half away from zero.
pub fn parse_whole_number(raw: &str) -> Option<i32> {
    parse_numeric(raw).map(|v| v.round() as i32)
}

/// Splits a free-form equipment cell into a de-duplicated item list.
pub fn split_equipment(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for part in raw.split([',', ';', '/', '|', '\n']) {
        let Some(item) = sanitize_text(part, TextLimit::Short) else {
            continue;
        };
        if items.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
            continue;
        }
        items.push(item);
        if items.len() == MAX_EQUIPMENT_ITEMS {
            break;
        }
    }
    items
}
