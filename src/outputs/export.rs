//! Tabular re-export of a previously persisted record table.
//!
//! Reads a table with a `Title` column, appends the three title metric
//! columns computed with [`crate::metrics`], and writes a new file. The input
//! file is never modified. Empty titles count as absent.
//!
//! The format of each side follows its file extension: `.csv` goes through
//! the `csv` crate, `.xlsx` is read with `calamine` (first worksheet, first
//! row as header) and written with `rust_xlsxwriter`.

use crate::error::ExportError;
use crate::metrics::TitleMetrics;
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, WriterBuilder};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const TITLE_COLUMN: &str = "Title";
const METRIC_COLUMNS: [&str; 3] = ["Word_Count", "Character_Count", "Capitalized_Words"];

/// Rows written by [`export_with_metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Header row plus data rows, every cell as text.
#[derive(Debug, Default)]
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Output cell. Counts stay numeric in a workbook.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Count(usize),
}

impl Cell {
    fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => n.to_string(),
        }
    }
}

/// Re-export `input` to `output` with metric columns appended.
///
/// Existing metric columns in the input are replaced rather than duplicated.
///
/// # Arguments
///
/// * `input` - Stored table, `.csv` or `.xlsx`
/// * `output` - Where to write the processed table, `.csv` or `.xlsx`
///
/// # Returns
///
/// The number of data rows written.
///
/// # Errors
///
/// Fails when the input is missing or has no `Title` column, when `output`
/// is the input itself, when either extension is unsupported, or when
/// reading or writing fails.
#[instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn export_with_metrics(input: &Path, output: &Path) -> Result<ExportSummary, ExportError> {
    if !input.exists() {
        return Err(ExportError::MissingInput(input.to_path_buf()));
    }
    if same_file(input, output) {
        return Err(ExportError::SameFile(input.to_path_buf()));
    }
    let input_format = TableFormat::from_path(input)?;
    let output_format = TableFormat::from_path(output)?;
    debug!(?input_format, ?output_format, "Table formats");

    let table = match input_format {
        TableFormat::Csv => read_csv(input)?,
        TableFormat::Xlsx => read_xlsx(input)?,
    };
    let (headers, rows) = with_metrics(table)?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    match output_format {
        TableFormat::Csv => write_csv(output, &headers, &rows)?,
        TableFormat::Xlsx => write_xlsx(output, &headers, &rows)?,
    }

    info!(rows = rows.len(), "Export written");
    Ok(ExportSummary { rows: rows.len() })
}

/// Drop stale metric columns and append freshly computed ones.
fn with_metrics(table: Table) -> Result<(Vec<String>, Vec<Vec<Cell>>), ExportError> {
    let title_idx = table
        .headers
        .iter()
        .position(|h| h == TITLE_COLUMN)
        .ok_or(ExportError::MissingColumn(TITLE_COLUMN))?;
    let keep: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !METRIC_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();
    if keep.len() != table.headers.len() {
        warn!("Input already has metric columns; recomputing them");
    }

    let mut headers: Vec<String> = keep.iter().map(|&i| table.headers[i].clone()).collect();
    headers.extend(METRIC_COLUMNS.iter().map(|c| c.to_string()));

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let title = row
                .get(title_idx)
                .map(String::as_str)
                .filter(|t| !t.is_empty());
            let metrics = TitleMetrics::from_title(title);

            let mut out: Vec<Cell> = keep
                .iter()
                .map(|&i| Cell::Text(row.get(i).cloned().unwrap_or_default()))
                .collect();
            out.push(Cell::Count(metrics.word_count));
            out.push(Cell::Count(metrics.character_count));
            out.push(Cell::Text(metrics.capitalized_joined()));
            out
        })
        .collect();
    Ok((headers, rows))
}

fn read_csv(path: &Path) -> Result<Table, ExportError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|record| record.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
    Ok(Table { headers, rows })
}

fn read_xlsx(path: &Path) -> Result<Table, ExportError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExportError::NoWorksheet(path.to_path_buf()))??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
    let Some(headers) = rows.next() else {
        return Ok(Table::default());
    };
    Ok(Table {
        headers,
        rows: rows.collect(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_csv(path: &Path, headers: &[String], rows: &[Vec<Cell>]) -> Result<(), ExportError> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.iter().map(Cell::to_text))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(path: &Path, headers: &[String], rows: &[Vec<Cell>]) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        let (r, c) = position(0, col)?;
        sheet.write_string(r, c, header.as_str())?;
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let (r, c) = position(i + 1, col)?;
            match cell {
                // Blank cells stay blank rather than holding an empty string
                Cell::Text(s) if s.is_empty() => {}
                Cell::Text(s) => {
                    sheet.write_string(r, c, s.as_str())?;
                }
                Cell::Count(n) => {
                    sheet.write_number(r, c, *n as f64)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn position(row: usize, col: usize) -> Result<(u32, u16), ExportError> {
    match (u32::try_from(row), u16::try_from(col)) {
        (Ok(r), Ok(c)) => Ok((r, c)),
        _ => Err(ExportError::OutOfRange { row, col }),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let table = match TableFormat::from_path(path).unwrap() {
            TableFormat::Csv => read_csv(path).unwrap(),
            TableFormat::Xlsx => read_xlsx(path).unwrap(),
        };
        let mut rows = vec![table.headers];
        rows.extend(table.rows);
        rows
    }

    fn write_input_workbook(path: &Path, rows: &[&[&str]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_export_appends_metrics_and_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("noticias.csv");
        let output = dir.path().join("out/noticias_procesadas.csv");
        let original = "Title,Kicker,Link\n\"Hola Mundo, 2024!\",Casinos,https://e.com/a\ncafé Noticia,Kicker no encontrado,https://e.com/b\n";
        fs::write(&input, original).unwrap();

        let summary = export_with_metrics(&input, &output).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(fs::read_to_string(&input).unwrap(), original);
        let rows = read_rows(&output);
        assert_eq!(
            rows[0],
            vec!["Title", "Kicker", "Link", "Word_Count", "Character_Count", "Capitalized_Words"]
        );
        assert_eq!(rows[1][3..], ["3", "17", "Hola, Mundo"]);
        assert_eq!(rows[2][3..], ["2", "12", "Noticia"]);
    }

    #[test]
    fn test_xlsx_export_reads_and_writes_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("noticias.xlsx");
        let output = dir.path().join("Noticias_Procesadas.xlsx");
        write_input_workbook(
            &input,
            &[
                &["Title", "Kicker", "Link"],
                &["Hola Mundo, 2024!", "Casinos", "https://e.com/a"],
                &["", "Kicker no encontrado", "https://e.com/b"],
            ],
        );
        let before = fs::read(&input).unwrap();

        let summary = export_with_metrics(&input, &output).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(fs::read(&input).unwrap(), before);
        let rows = read_rows(&output);
        assert_eq!(
            rows[0],
            vec!["Title", "Kicker", "Link", "Word_Count", "Character_Count", "Capitalized_Words"]
        );
        assert_eq!(
            rows[1],
            vec!["Hola Mundo, 2024!", "Casinos", "https://e.com/a", "3", "17", "Hola, Mundo"]
        );
        assert_eq!(rows[2][..3], ["", "Kicker no encontrado", "https://e.com/b"]);
        assert_eq!(rows[2][3..5], ["0", "0"]);
    }

    #[test]
    fn test_counts_are_numeric_cells_in_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.xlsx");
        fs::write(&input, "Title\nBrazil Approves New Betting Rules\n").unwrap();

        export_with_metrics(&input, &output).unwrap();

        let mut workbook = open_workbook_auto(&output).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(5.0)));
        assert_eq!(range.get_value((1, 2)), Some(&Data::Float(33.0)));
        assert_eq!(
            range.get_value((1, 3)),
            Some(&Data::String("Brazil, Approves, New, Betting, Rules".to_string()))
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "Title\nx\n").unwrap();
        let output = dir.path().join("out.ods");

        let err = export_with_metrics(&input, &output).unwrap_err();

        assert!(matches!(err, ExportError::UnsupportedFormat(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_title_is_null_guarded() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(&input, "Title,Link\n,https://e.com/a\n").unwrap();

        export_with_metrics(&input, &output).unwrap();

        let rows = read_rows(&output);
        assert_eq!(rows[1][2..], ["0", "0", ""]);
    }

    #[test]
    fn test_existing_metric_columns_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(&input, "Title,Word_Count\nTwo Words,99\n").unwrap();

        export_with_metrics(&input, &output).unwrap();

        let rows = read_rows(&output);
        assert_eq!(
            rows[0],
            vec!["Title", "Word_Count", "Character_Count", "Capitalized_Words"]
        );
        assert_eq!(rows[1], vec!["Two Words", "2", "9", "Two, Words"]);
    }

    #[test]
    fn test_missing_title_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "Headline\nx\n").unwrap();
        let err = export_with_metrics(&input, &dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(err, ExportError::MissingColumn("Title")));
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_with_metrics(&dir.path().join("nope.csv"), &dir.path().join("out.csv"))
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingInput(_)));
    }

    #[test]
    fn test_refuses_to_overwrite_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "Title\nx\n").unwrap();
        let err = export_with_metrics(&input, &input).unwrap_err();
        assert!(matches!(err, ExportError::SameFile(_)));
        assert_eq!(fs::read_to_string(&input).unwrap(), "Title\nx\n");
    }
}
