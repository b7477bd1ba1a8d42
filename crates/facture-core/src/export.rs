//! CSV rendering of a reconciled record.

use crate::error::{Error, Result};
use crate::models::{InvoiceField, InvoiceRecord};

/// Render a record as a two-line CSV document: fixed header row plus one
/// data row in schema column order.
pub fn render_csv(record: &InvoiceRecord) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(InvoiceField::COLUMNS.iter().map(|field| field.as_str()))?;
    writer.write_record(record.to_row())?;
    writer
        .into_inner()
        .map_err(|e| Error::Serialization(e.to_string()))
}
