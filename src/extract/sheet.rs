//! Spreadsheet extraction via calamine (xlsx, xls, ods).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::extract::{ExtractError, ExtractedContent, ExtractionMethod};

pub const SHEET_LIMIT: usize = 10;
pub const ROW_LIMIT: usize = 1000;

pub fn extract(path: &Path) -> Result<ExtractedContent, ExtractError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ExtractError::Sheet(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut text = String::new();
    for name in sheet_names.iter().take(SHEET_LIMIT) {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                log::warn!("skipping sheet {:?}: {}", name, e);
                continue;
            }
        };
        text.push_str(&format!("Sheet: {}\n", name));
        for row in range.rows().take(ROW_LIMIT) {
            let cells: Vec<String> = row
                .iter()
                .filter(|cell| !matches!(cell, Data::Empty))
                .map(|cell| cell.to_string())
                .collect();
            if !cells.is_empty() {
                text.push_str(&cells.join(" "));
            }
            text.push('\n');
        }
    }

    Ok(ExtractedContent {
        text,
        method: ExtractionMethod::Spreadsheet,
    })
}
