//! Artifact builder
//!
//! Executes an artifact type's query strategy, counts the rows, and
//! encodes them to CSV. The CSV carries a UTF-8 BOM so spreadsheet tools
//! pick up the encoding; the header row is derived from the first row's
//! column names. An empty result set encodes to an empty (BOM-only) file
//! rather than failing.

use bomx_common::status::ArtifactType;
use thiserror::Error;

use crate::db::{SourceConnection, SourceError, SqlRow};
use crate::features::explosion::catalog::{strategy_for, QueryStrategy};

/// UTF-8 byte order mark prefixed to every artifact.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("csv encoding failed: {0}")]
    Csv(String),
}

/// A generated artifact, ready to upload.
#[derive(Debug, Clone)]
pub struct BuiltArtifact {
    pub file_name: &'static str,
    pub csv: Vec<u8>,
    pub record_count: u64,
}

/// Fetch the rows for one artifact type and encode them.
pub async fn build(
    conn: &mut dyn SourceConnection,
    artifact_type: ArtifactType,
    version: &str,
) -> Result<BuiltArtifact, BuildError> {
    let rows = match strategy_for(artifact_type) {
        QueryStrategy::Literal(sql) => conn.fetch_query(sql).await?,
        QueryStrategy::Procedure(name) => conn.fetch_procedure(name, version).await?,
    };

    let record_count = rows.len() as u64;
    let csv = encode_csv(&rows)?;

    Ok(BuiltArtifact {
        file_name: artifact_type.file_name(),
        csv,
        record_count,
    })
}

/// Encode rows to UTF-8 CSV with a BOM prefix.
pub fn encode_csv(rows: &[SqlRow]) -> Result<Vec<u8>, BuildError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(UTF8_BOM);

    if rows.is_empty() {
        return Ok(buf);
    }

    let mut writer = csv::Writer::from_writer(&mut buf);
    writer
        .write_record(rows[0].column_names())
        .map_err(|e| BuildError::Csv(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row.values().map(|v| v.to_csv_field()))
            .map_err(|e| BuildError::Csv(e.to_string()))?;
    }
    writer.flush().map_err(|e| BuildError::Csv(e.to_string()))?;
    drop(writer);

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;

    fn row(pairs: Vec<(&str, SqlValue)>) -> SqlRow {
        SqlRow::new(
            pairs
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_encode_starts_with_bom() {
        let rows = vec![row(vec![("code", SqlValue::Text("M-1".into()))])];
        let csv = encode_csv(&rows).unwrap();
        assert_eq!(&csv[..3], UTF8_BOM);
    }

    #[test]
    fn test_encode_header_from_first_row() {
        let rows = vec![
            row(vec![
                ("material_code", SqlValue::Text("M-1".into())),
                ("quantity", SqlValue::Int(5)),
            ]),
            row(vec![
                ("material_code", SqlValue::Text("M-2".into())),
                ("quantity", SqlValue::Null),
            ]),
        ];

        let csv = encode_csv(&rows).unwrap();
        let text = String::from_utf8(csv[3..].to_vec()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["material_code,quantity", "M-1,5", "M-2,"]);
    }

    #[test]
    fn test_encode_empty_result_is_bom_only() {
        let csv = encode_csv(&[]).unwrap();
        assert_eq!(csv, UTF8_BOM.to_vec());
    }

    #[test]
    fn test_encode_quotes_embedded_separators() {
        let rows = vec![row(vec![(
            "description",
            SqlValue::Text("bolt, m8".into()),
        )])];
        let csv = encode_csv(&rows).unwrap();
        let text = String::from_utf8(csv[3..].to_vec()).unwrap();
        assert!(text.contains("\"bolt, m8\""));
    }
}
