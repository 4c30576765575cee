use crate::types::ResultRow;
use crate::{AnalysisError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Column order of the CSV export
pub const CSV_HEADERS: [&str; 7] = [
    "wallet",
    "type",
    "amount",
    "date",
    "isFirstBuy",
    "sellPercentage",
    "txSignature",
];

fn optional_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row_fields(row: &ResultRow) -> [String; 7] {
    [
        row.wallet.clone(),
        row.trade_type.to_string(),
        row.amount.to_string(),
        row.date.clone(),
        optional_field(row.is_first_buy),
        optional_field(row.sell_percentage),
        row.tx_signature.clone(),
    ]
}

/// Render rows as CSV: a header line, then one line per row, separated by
/// `\n` with no trailing newline. Missing values are empty fields and values
/// containing a comma are quoted. No rows renders as an empty string.
pub fn to_csv(rows: &[ResultRow]) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    wtr.write_record(CSV_HEADERS)
        .map_err(|e| AnalysisError::Export(format!("CSV header error: {}", e)))?;

    for row in rows {
        wtr.write_record(row_fields(row))
            .map_err(|e| AnalysisError::Export(format!("CSV write error: {}", e)))?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| AnalysisError::Export(format!("CSV finalization error: {}", e)))?;

    let mut body = String::from_utf8(data)
        .map_err(|e| AnalysisError::Export(format!("CSV encoding error: {}", e)))?;

    if body.ends_with('\n') {
        body.pop();
    }

    Ok(body)
}
