//! One-client-per-sheet workbooks.
//!
//! The sheet name is the client name. A handful of fields sit at fixed
//! first-row positions in the common template; everything else is found by
//! scanning for label cells and reading their neighbour.

use super::mapping::{CanonicalField, FIELD_MAPPINGS, normalize_header};
use super::normalize::{Grid, build_record};
use super::readers::NamedSheet;
use super::types::{Owner, PendingRecord};

/// Label scan window.
pub const SCAN_ROWS: usize = 20;
pub const SCAN_COLS: usize = 10;

/// Longer cells are treated as values, never labels.
const MAX_LABEL_CHARS: usize = 40;
const MAX_LABEL_WORDS: usize = 4;

const SKIPPED_SHEET_MARKERS: [&str; 3] = ["template", "master", "copy"];

/// First-row cells read before falling back to the label scan: B, C, D.
const FIXED_CELLS: [(CanonicalField, usize); 3] = [
    (CanonicalField::Injuries, 1),
    (CanonicalField::Goals, 2),
    (CanonicalField::Membership, 3),
];

struct LabelKeywords {
    field: CanonicalField,
    keywords: &'static [&'static str],
}

const SHEET_LABELS: &[LabelKeywords] = &[
    LabelKeywords { field: CanonicalField::Injuries, keywords: &["injur"] },
    LabelKeywords { field: CanonicalField::Goals, keywords: &["goal"] },
    LabelKeywords { field: CanonicalField::Membership, keywords: &["member"] },
    LabelKeywords { field: CanonicalField::Email, keywords: &["email"] },
    LabelKeywords { field: CanonicalField::Phone, keywords: &["phone"] },
    LabelKeywords { field: CanonicalField::Equipment, keywords: &["equip"] },
    LabelKeywords { field: CanonicalField::Notes, keywords: &["note"] },
    LabelKeywords { field: CanonicalField::FitnessLevel, keywords: &["level"] },
    LabelKeywords { field: CanonicalField::Age, keywords: &["age"] },
    LabelKeywords { field: CanonicalField::Weight, keywords: &["weight"] },
    LabelKeywords { field: CanonicalField::Height, keywords: &["height"] },
];

fn keywords_for(field: CanonicalField) -> Option<&'static [&'static str]> {
    SHEET_LABELS
        .iter()
        .find(|l| l.field == field)
        .map(|l| l.keywords)
}

#[derive(Debug, Default, PartialEq)]
pub struct SheetImport {
    pub records: Vec<PendingRecord>,
    pub skipped_sheets: Vec<String>,
}

pub fn is_skipped_sheet(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower.is_empty() || SKIPPED_SHEET_MARKERS.iter().any(|m| lower.contains(m))
}

/// Normalizes every eligible sheet into one record.
///
/// `row` on each record is the sheet's 1-based position in the workbook.
pub fn records_from_sheets(sheets: &[NamedSheet], owner: &Owner) -> SheetImport {
    let mut import = SheetImport::default();

    for (idx, sheet) in sheets.iter().enumerate() {
        if is_skipped_sheet(&sheet.name) {
            tracing::debug!("Skipping sheet '{}'", sheet.name);
            import.skipped_sheets.push(sheet.name.clone());
            continue;
        }

        let record = build_record(owner, |field| sheet_value(&sheet.grid, &sheet.name, field));
        match record {
            Some(record) => import.records.push(PendingRecord {
                row: idx + 1,
                sheet: Some(sheet.name.clone()),
                record,
            }),
            // Sheet name sanitized to nothing.
            None => import.skipped_sheets.push(sheet.name.clone()),
        }
    }

    import
}

fn sheet_value(grid: &Grid, sheet_name: &str, field: CanonicalField) -> Option<String> {
    match field {
        CanonicalField::FullName => return Some(sheet_name.to_string()),
        CanonicalField::FirstName | CanonicalField::LastName => return None,
        _ => {}
    }

    fixed_value(grid, field).or_else(|| {
        let keywords = keywords_for(field)?;
        LabelScanner::new(grid, keywords).find().map(|hit| hit.value)
    })
}

/// Fixed first-row cell for `field`, unless it reads as a label or sits
/// right of a label belonging to some other field.
fn fixed_value(grid: &Grid, field: CanonicalField) -> Option<String> {
    let (_, col) = FIXED_CELLS.iter().find(|(f, _)| *f == field)?;
    let value = cell(grid, 0, *col)?;
    if is_label_like(value) {
        return None;
    }

    let left = cell(grid, 0, col - 1).unwrap_or_default();
    let labelled_elsewhere = SHEET_LABELS
        .iter()
        .any(|l| l.field != field && matches_label(left, l.keywords));
    if labelled_elsewhere {
        return None;
    }

    Some(value.to_string())
}

/// Trimmed, non-empty cell text.
fn cell(grid: &Grid, row: usize, col: usize) -> Option<&str> {
    grid.get(row)
        .and_then(|r| r.get(col))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
}

/// A short cell with a word starting with one of `keywords`.
pub fn matches_label(text: &str, keywords: &[&str]) -> bool {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > MAX_LABEL_CHARS {
        return false;
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    words.len() <= MAX_LABEL_WORDS
        && words
            .iter()
            .any(|w| keywords.iter().any(|k| w.starts_with(k)))
}

/// Cells that are obviously labels: "Goals:" or a known column header.
/// Values such as "Lose weight" mention keywords without being labels.
pub fn is_label_like(text: &str) -> bool {
    let text = text.trim();
    if text.ends_with(':') {
        return true;
    }
    let normalized = normalize_header(text);
    FIELD_MAPPINGS
        .iter()
        .any(|m| m.aliases.contains(&normalized.as_str()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelHit {
    pub label: (usize, usize),
    pub value_at: (usize, usize),
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Seeking { row: usize, col: usize },
    InspectRight { row: usize, col: usize },
    InspectBelow { row: usize, col: usize },
    Found { label: (usize, usize), value: (usize, usize) },
    Exhausted,
}

/// Row-major search for a label cell, then its value neighbour.
///
/// The right neighbour is preferred over the one below. A neighbour outside
/// the sheet, empty, or itself a label disqualifies it; when both are
/// disqualified the scan resumes after the label.
pub struct LabelScanner<'a> {
    grid: &'a Grid,
    keywords: &'a [&'a str],
    rows: usize,
    cols: usize,
}

impl<'a> LabelScanner<'a> {
    pub fn new(grid: &'a Grid, keywords: &'a [&'a str]) -> Self {
        Self {
            grid,
            keywords,
            rows: SCAN_ROWS,
            cols: SCAN_COLS,
        }
    }

    pub fn with_window(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn find(&self) -> Option<LabelHit> {
        let mut state = ScanState::Seeking { row: 0, col: 0 };
        loop {
            state = match self.step(state) {
                ScanState::Found { label, value } => {
                    let text = cell(self.grid, value.0, value.1)?;
                    return Some(LabelHit {
                        label,
                        value_at: value,
                        value: text.to_string(),
                    });
                }
                ScanState::Exhausted => return None,
                next => next,
            };
        }
    }

    fn step(&self, state: ScanState) -> ScanState {
        match state {
            ScanState::Seeking { row, col } => {
                if row >= self.rows.min(self.grid.len()) {
                    return ScanState::Exhausted;
                }
                if col >= self.cols.min(self.grid[row].len()) {
                    return ScanState::Seeking { row: row + 1, col: 0 };
                }
                let is_label = cell(self.grid, row, col)
                    .map(|text| matches_label(text, self.keywords))
                    .unwrap_or(false);
                if is_label {
                    ScanState::InspectRight { row, col }
                } else {
                    ScanState::Seeking { row, col: col + 1 }
                }
            }
            ScanState::InspectRight { row, col } => {
                if self.usable(row, col + 1) {
                    ScanState::Found {
                        label: (row, col),
                        value: (row, col + 1),
                    }
                } else {
                    ScanState::InspectBelow { row, col }
                }
            }
            ScanState::InspectBelow { row, col } => {
                if self.usable(row + 1, col) {
                    ScanState::Found {
                        label: (row, col),
                        value: (row + 1, col),
                    }
                } else {
                    ScanState::Seeking { row, col: col + 1 }
                }
            }
            terminal => terminal,
        }
    }

    fn usable(&self, row: usize, col: usize) -> bool {
        cell(self.grid, row, col)
            .map(|text| !is_label_like(text) && !self.is_any_label(text))
            .unwrap_or(false)
    }

    fn is_any_label(&self, text: &str) -> bool {
        text.trim().ends_with(':') || matches_label(text, self.keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner {
            user_id: "coach-1".to_string(),
            organization_id: None,
        }
    }

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn sheet(name: &str, rows: &[&[&str]]) -> NamedSheet {
        NamedSheet {
            name: name.to_string(),
            grid: grid(rows),
        }
    }

    #[test]
    fn test_template_sheets_are_skipped() {
        let sheets = vec![
            sheet("Alice", &[&["", "Bad knee", "Run 5k", "Gold"]]),
            sheet("Master Template", &[&["", "Injuries", "Goals", "Membership"]]),
            sheet("Bob", &[&["Goals", "Bench 100kg"]]),
        ];
        let import = records_from_sheets(&sheets, &owner());

        assert_eq!(import.records.len(), 2);
        assert_eq!(import.skipped_sheets, vec!["Master Template"]);

        let alice = &import.records[0];
        assert_eq!(alice.record.full_name, "Alice");
        assert_eq!(alice.record.injuries.as_deref(), Some("Bad knee"));
        assert_eq!(alice.record.goals.as_deref(), Some("Run 5k"));
        assert_eq!(alice.record.membership.as_deref(), Some("Gold"));
        assert_eq!(alice.sheet.as_deref(), Some("Alice"));
        assert_eq!(alice.row, 1);

        let bob = &import.records[1];
        assert_eq!(bob.record.full_name, "Bob");
        assert_eq!(bob.record.goals.as_deref(), Some("Bench 100kg"));
        assert_eq!(bob.record.injuries, None);
        assert_eq!(bob.row, 3);
    }

    #[test]
    fn test_skip_markers() {
        assert!(is_skipped_sheet("Copy of Alice"));
        assert!(is_skipped_sheet("MASTER"));
        assert!(is_skipped_sheet("  "));
        assert!(!is_skipped_sheet("Alice"));
    }

    #[test]
    fn test_fixed_cell_that_reads_as_label_is_ignored() {
        let g = grid(&[
            &["", "Injuries", "Goals:", ""],
            &["", "Shoulder", "Mobility", ""],
        ]);
        assert_eq!(fixed_value(&g, CanonicalField::Goals), None);
        assert_eq!(
            sheet_value(&g, "Cy", CanonicalField::Goals).as_deref(),
            Some("Mobility")
        );
        assert_eq!(
            sheet_value(&g, "Cy", CanonicalField::Injuries).as_deref(),
            Some("Shoulder")
        );
    }

    #[test]
    fn test_fixed_cell_beside_other_label_is_ignored() {
        let g = grid(&[&["Goals", "Run a marathon"], &["Injuries", "None"]]);
        assert_eq!(fixed_value(&g, CanonicalField::Injuries), None);
        assert_eq!(
            sheet_value(&g, "Di", CanonicalField::Injuries).as_deref(),
            Some("None")
        );
        assert_eq!(
            sheet_value(&g, "Di", CanonicalField::Goals).as_deref(),
            Some("Run a marathon")
        );
    }

    #[test]
    fn test_scanner_prefers_right_then_below() {
        let g = grid(&[&["Email", "ed@example.com"], &["Phone", ""], &["555-0101", ""]]);
        let email = LabelScanner::new(&g, &["email"]).find().unwrap();
        assert_eq!(email.value, "ed@example.com");
        assert_eq!(email.value_at, (0, 1));

        let phone = LabelScanner::new(&g, &["phone"]).find().unwrap();
        assert_eq!(phone.label, (1, 0));
        assert_eq!(phone.value_at, (2, 0));
        assert_eq!(phone.value, "555-0101");
    }

    #[test]
    fn test_scanner_rejects_label_neighbours_and_resumes() {
        let g = grid(&[
            &["Weight", "Height"],
            &["Notes:", ""],
            &["", ""],
            &["", "Weight (kg)", "82"],
        ]);
        let hit = LabelScanner::new(&g, &["weight"]).find().unwrap();
        assert_eq!(hit.label, (3, 1));
        assert_eq!(hit.value, "82");
    }

    #[test]
    fn test_scanner_edges_of_sheet() {
        let g = grid(&[&["", "Age"]]);
        assert_eq!(LabelScanner::new(&g, &["age"]).find(), None);

        let empty: Grid = Vec::new();
        assert_eq!(LabelScanner::new(&empty, &["age"]).find(), None);
    }

    #[test]
    fn test_scanner_window_bounds() {
        let mut rows: Vec<Vec<String>> = vec![vec![String::new(); 2]; 25];
        rows[22] = vec!["Age".to_string(), "40".to_string()];
        assert_eq!(LabelScanner::new(&rows, &["age"]).find(), None);
        assert!(
            LabelScanner::new(&rows, &["age"])
                .with_window(30, 10)
                .find()
                .is_some()
        );
    }

    #[test]
    fn test_long_cells_are_not_labels() {
        assert!(matches_label("Goals", &["goal"]));
        assert!(matches_label("Fitness goal:", &["goal"]));
        assert!(!matches_label("Wants to reach her goal weight before the wedding", &["goal"]));
        assert!(!matches_label("Average", &["age"]));
        assert!(!is_label_like("Lose weight"));
        assert!(is_label_like("Weight"));
    }

    #[test]
    fn test_numeric_fields_from_labels() {
        let sheets = vec![sheet(
            "Eli",
            &[
                &["Profile"],
                &["Age", "34"],
                &["Weight", "80 kg"],
                &["Height", "9999999"],
                &["Equipment", "Bands, mat"],
            ],
        )];
        let import = records_from_sheets(&sheets, &owner());
        let r = &import.records[0].record;
        assert_eq!(r.age, Some(34));
        assert_eq!(r.weight, Some(80.0));
        assert_eq!(r.height, None);
        assert_eq!(r.equipment, vec!["Bands", "mat"]);
    }
}
