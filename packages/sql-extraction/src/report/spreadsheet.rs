//! Excel export of stored extraction records.
//!
//! Layout: a `Report Summary` sheet listing every entity of every record,
//! followed by one sheet per record holding its markdown report line by line.

use std::collections::HashSet;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::ReportError;
use crate::types::record::ExtractionRecord;

pub const SUMMARY_SHEET: &str = "Report Summary";
pub const NOTICE_SHEET: &str = "Notice";

const MAX_SHEET_NAME: usize = 31;
const MAX_CELL_CHARS: usize = 32_767;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
const SUMMARY_HEADERS: [&str; 4] = [
    "SQL File Name",
    "Table Name",
    "Operation Type",
    "Creation Source",
];

/// Make a string usable as a worksheet name.
///
/// Drops `[ ] : * ? / \`, truncates to 31 characters, strips leading and
/// trailing apostrophes and falls back to `Untitled`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID_SHEET_CHARS.contains(c))
        .take(MAX_SHEET_NAME)
        .collect();
    let trimmed = cleaned.trim_matches('\'');

    if trimmed.trim().is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out sheet names that are unique ignoring case, as Excel requires.
struct SheetNames {
    taken: HashSet<String>,
}

impl SheetNames {
    fn new() -> Self {
        // Excel reserves "History".
        let taken = [SUMMARY_SHEET, "History"]
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        Self { taken }
    }

    fn claim(&mut self, file_name: &str) -> String {
        let base = sanitize_sheet_name(file_name);
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }

        for n in 2.. {
            let suffix = format!(" ({n})");
            let room = MAX_SHEET_NAME - suffix.chars().count();
            let stem: String = base.chars().take(room).collect();
            let candidate = format!("{}{suffix}", stem.trim_end_matches('\''));
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
        }
        unreachable!("sheet name suffixes are unbounded")
    }
}

fn clip_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Render records as an `.xlsx` document.
///
/// Records are written in the order given; callers pass them sorted by file
/// name. With no records the workbook holds a single `Notice` sheet.
pub fn build_workbook(
    application_name: &str,
    records: &[ExtractionRecord],
) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    if records.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(NOTICE_SHEET)?;
        sheet.write_string_with_format(0, 0, "message", &bold)?;
        sheet.write_string(
            1,
            0,
            format!("No data found for application: {application_name}"),
        )?;
        return Ok(workbook.save_to_buffer()?);
    }

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_summary(summary, records, &bold)?;

    let mut names = SheetNames::new();
    for record in records {
        let sheet = workbook.add_worksheet();
        sheet.set_name(names.claim(&record.sql_file_name))?;
        sheet.set_column_width(0, 120)?;

        let report = record.parser_output_tables.as_deref().unwrap_or_default();
        for (row, line) in report.lines().enumerate() {
            sheet.write_string(row as u32, 0, clip_cell(line))?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_summary(
    sheet: &mut Worksheet,
    records: &[ExtractionRecord],
    bold: &Format,
) -> Result<(), ReportError> {
    for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, bold)?;
        sheet.set_column_width(col as u16, 32)?;
    }

    let mut row = 1u32;
    for record in records {
        let output = record.output();
        let Some(model) = output.model() else {
            continue;
        };

        for entity in &model.entities {
            let cells = [
                record.sql_file_name.as_str(),
                entity.entity_name.as_str(),
                entity.entity_role.as_deref().unwrap_or_default(),
                entity.creation_source.as_deref().unwrap_or_default(),
            ];
            for (col, value) in cells.iter().enumerate() {
                sheet.write_string(row, col as u16, clip_cell(value))?;
            }
            row += 1;
        }
    }

    Ok(())
}
