use super::error::ImportError;
use super::mapping::{CanonicalField, HeaderMap};
use super::sanitize::{
    TextLimit, parse_numeric, parse_whole_number, sanitize_text, split_equipment,
};
use super::types::{ClientRecord, Owner, PendingRecord};
use serde_json::{Map, Value};

/// A sheet or CSV body as plain text cells.
pub type Grid = Vec<Vec<String>>;

/// Rows inspected when looking for the header row.
pub const HEADER_SEARCH_ROWS: usize = 10;

/// Builds a canonical record from raw field values.
///
/// Returns `None` when no usable name survives sanitization; such rows are
/// dropped without being reported.
pub fn build_record<F>(owner: &Owner, mut raw: F) -> Option<ClientRecord>
where
    F: FnMut(CanonicalField) -> Option<String>,
{
    let full_name = raw(CanonicalField::FullName)
        .and_then(|v| sanitize_text(&v, TextLimit::Name))
        .or_else(|| {
            let first = raw(CanonicalField::FirstName)
                .and_then(|v| sanitize_text(&v, TextLimit::Name));
            let last = raw(CanonicalField::LastName)
                .and_then(|v| sanitize_text(&v, TextLimit::Name));
            let joined = [first, last]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            sanitize_text(&joined, TextLimit::Name)
        })?;

    let mut text = |field, limit| raw(field).and_then(|v| sanitize_text(&v, limit));

    let email = text(CanonicalField::Email, TextLimit::Email);
    let phone = text(CanonicalField::Phone, TextLimit::Phone);
    let goals = text(CanonicalField::Goals, TextLimit::Long);
    let injuries = text(CanonicalField::Injuries, TextLimit::Long);
    let notes = text(CanonicalField::Notes, TextLimit::Long);
    let membership = text(CanonicalField::Membership, TextLimit::Short);
    let fitness_level = text(CanonicalField::FitnessLevel, TextLimit::Short);

    let equipment = raw(CanonicalField::Equipment)
        .map(|v| split_equipment(&v))
        .unwrap_or_default();
    let age = raw(CanonicalField::Age).and_then(|v| parse_whole_number(&v));
    let weight = raw(CanonicalField::Weight).and_then(|v| parse_numeric(&v));
    let height = raw(CanonicalField::Height).and_then(|v| parse_numeric(&v));

    Some(ClientRecord {
        full_name,
        email,
        phone,
        goals,
        injuries,
        equipment,
        notes,
        membership,
        fitness_level,
        age,
        weight,
        height,
        user_id: owner.user_id.clone(),
        organization_id: owner.organization_id.clone(),
    })
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Finds the first row within [`HEADER_SEARCH_ROWS`] whose headers yield a name column.
pub fn locate_header(grid: &Grid) -> Option<(usize, HeaderMap)> {
    grid.iter()
        .take(HEADER_SEARCH_ROWS)
        .enumerate()
        .filter(|(_, row)| !is_blank_row(row))
        .map(|(idx, row)| (idx, HeaderMap::resolve(row.as_slice())))
        .find(|(_, map)| map.has_name())
}

/// Normalizes a header-row table into pending records.
///
/// Row numbers are 1-based positions in the grid, matching what a user sees
/// in their spreadsheet application.
pub fn records_from_grid(
    grid: &Grid,
    owner: &Owner,
    max_rows: usize,
) -> Result<Vec<PendingRecord>, ImportError> {
    let (header_idx, header) = locate_header(grid).ok_or_else(|| {
        ImportError::NoValidRecords(
            "no header row with a name column (expected e.g. Name, Full Name, Client Name, Customer)"
                .to_string(),
        )
    })?;

    let data_rows: Vec<(usize, &Vec<String>)> = grid
        .iter()
        .enumerate()
        .skip(header_idx + 1)
        .filter(|(_, row)| !is_blank_row(row))
        .collect();

    if data_rows.len() > max_rows {
        return Err(ImportError::TooManyRows {
            count: data_rows.len(),
            limit: max_rows,
        });
    }

    let records = data_rows
        .into_iter()
        .filter_map(|(idx, row)| {
            build_record(owner, |field| {
                header.value(field, row.as_slice()).map(str::to_string)
            })
            .map(|record| PendingRecord {
                row: idx + 1,
                sheet: None,
                record,
            })
        })
        .collect();

    Ok(records)
}

/// Text form of a JSON cell. Arrays are joined so equipment lists survive.
pub fn json_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(json_value_text).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => None,
    }
}

/// Normalizes pre-parsed row objects (JSON imports and streamed chunks).
///
/// Keys go through the same header mapping as file columns, resolved per
/// object since rows need not share a key set.
pub fn records_from_objects(
    rows: &[Map<String, Value>],
    owner: &Owner,
    first_row: usize,
) -> Vec<PendingRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, object)| {
            let keys: Vec<&String> = object.keys().collect();
            let header = HeaderMap::resolve(keys.as_slice());
            build_record(owner, |field| {
                header
                    .column(field)
                    .and_then(|col| object.get(keys[col].as_str()))
                    .and_then(json_value_text)
            })
            .map(|record| PendingRecord {
                row: first_row + idx,
                sheet: None,
                record,
            })
        })
        .collect()
}
