//! Decoders turning raw upload bytes into text grids.

use super::error::ImportError;
use super::normalize::Grid;
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One worksheet of a workbook, in workbook order.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSheet {
    pub name: String,
    pub grid: Grid,
}

/// Reads a CSV body. The delimiter is picked from the first line among
/// comma, semicolon and tab; ragged rows are kept as-is.
pub fn read_csv(data: &[u8]) -> Result<Grid, ImportError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(data))
        .from_reader(data);

    let mut grid = Vec::new();
    for (idx, result) in reader.byte_records().enumerate() {
        let record = result
            .map_err(|e| ImportError::unparseable(format!("CSV row {}: {}", idx + 1, e)))?;
        grid.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).trim().to_string())
                .collect(),
        );
    }

    Ok(grid)
}

fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line = data
        .split(|b| *b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or(data);

    let count = |delim: u8| first_line.iter().filter(|b| **b == delim).count();
    // Ties go to the comma.
    [b';', b'\t']
        .into_iter()
        .fold((b',', count(b',')), |best, delim| {
            let n = count(delim);
            if n > best.1 { (delim, n) } else { best }
        })
        .0
}

/// Reads every worksheet of an xlsx/xls/ods workbook.
pub fn read_workbook(data: &[u8]) -> Result<Vec<NamedSheet>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
        .map_err(|e| ImportError::unparseable(format!("workbook could not be opened: {}", e)))?;

    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(ImportError::unparseable("workbook contains no sheets"));
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ImportError::unparseable(format!("sheet '{}': {}", name, e)))?;
        sheets.push(NamedSheet {
            grid: range_to_grid(&range),
            name,
        });
    }

    tracing::debug!("📊 Workbook read: {} sheet(s)", sheets.len());
    Ok(sheets)
}

/// Ranges start at their first used cell; pad so grid positions match the
/// sheet's A1 coordinates.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((row_offset, col_offset)) = range.start() else {
        return Vec::new();
    };
    let col_offset = col_offset as usize;

    let mut grid: Grid = vec![Vec::new(); row_offset as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(cell_text));
        grid.push(cells);
    }
    grid
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_basic() {
        let grid = read_csv(b"\xEF\xBB\xBFName,Email\n Ann , ann@example.com\n").unwrap();
        assert_eq!(grid[0], vec!["Name", "Email"]);
        assert_eq!(grid[1], vec!["Ann", "ann@example.com"]);
    }

    #[test]
    fn test_read_csv_ragged_and_quoted() {
        let grid = read_csv(b"Name,Notes,Phone\n\"Lee, Ann\",\"likes \"\"HIIT\"\"\"\nBo\n").unwrap();
        assert_eq!(grid[1], vec!["Lee, Ann", "likes \"HIIT\""]);
        assert_eq!(grid[2], vec!["Bo"]);
    }

    #[test]
    fn test_read_csv_semicolon_delimiter() {
        let grid = read_csv(b"Name;Goals\nAnn;Run 5k, then 10k\n").unwrap();
        assert_eq!(grid[1], vec!["Ann", "Run 5k, then 10k"]);
    }

    #[test]
    fn test_read_csv_invalid_utf8_is_lossy() {
        let grid = read_csv(b"Name\nJos\xE9\n").unwrap();
        assert!(grid[1][0].starts_with("Jos"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter(b"a,b,c"), b',');
        assert_eq!(detect_delimiter(b"a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter(b"\n\na;b"), b';');
        assert_eq!(detect_delimiter(b"single"), b',');
    }

    #[test]
    fn test_read_workbook_rejects_garbage() {
        let err = read_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, ImportError::Unparseable { .. }));
    }
}
