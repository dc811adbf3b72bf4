//! CSV export of every stored estimate on the page.

use crate::error::{EstimatorError, Result};
use crate::estimate;
use crate::host::Host;

/// Column order of the export document.
pub const EXPORT_COLUMNS: [&str; 3] = ["Frame", "Item", "Hours"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub frame: String,
    pub item: String,
    pub hours: String,
}

impl ExportRow {
    fn record(&self) -> [&str; 3] {
        [&self.frame, &self.item, &self.hours]
    }
}

/// Suggested file name for a page export.
pub fn export_filename(page_name: &str) -> String {
    let stem: String = page_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "estimates.csv".to_string()
    } else {
        format!("{stem}.csv")
    }
}

/// One row per line item, frames in document order, items in stored order.
/// Fails on the first frame whose stored estimate does not decode.
pub fn collect_rows<H: Host + ?Sized>(host: &H) -> Result<Vec<ExportRow>> {
    let mut rows = vec![];
    for node in host.frames() {
        for item in estimate::read(host, node)? {
            rows.push(ExportRow {
                frame: node.name.clone(),
                item: item.label,
                hours: item.value,
            });
        }
    }
    Ok(rows)
}

pub fn render_csv(rows: &[ExportRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(EXPORT_COLUMNS)?;
    for row in rows {
        wtr.write_record(row.record())?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| EstimatorError::Export(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| EstimatorError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(frame: &str, item: &str, hours: &str) -> ExportRow {
        ExportRow {
            frame: frame.into(),
            item: item.into(),
            hours: hours.into(),
        }
    }

    #[test]
    fn header_only_when_nothing_is_estimated() {
        assert_eq!(render_csv(&[]).unwrap(), "Frame,Item,Hours\n");
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        let csv = render_csv(&[row("Cart, mobile", "Say \"hi\"", "2")]).unwrap();
        assert_eq!(
            csv,
            "Frame,Item,Hours\n\"Cart, mobile\",\"Say \"\"hi\"\"\",2\n"
        );
    }

    #[test]
    fn filename_comes_from_the_page() {
        assert_eq!(export_filename("Checkout Flow"), "Checkout Flow.csv");
        assert_eq!(export_filename("a/b"), "a-b.csv");
        assert_eq!(export_filename("  "), "estimates.csv");
    }
}
