// restoretool/src/restore/metadata.rs
use crate::errors::RestoreError;
use crate::gateway::{ConnectionGateway, SqlValue, quote_literal};

/// One logical file inside a backup set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFileEntry {
    pub logical_name: String,
    pub file_type: FileType,
    /// Where the file lived when the backup was taken. Informational only;
    /// the restore plan decides where it goes now.
    pub physical_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    Data,
    Log,
    /// Anything the engine reports beyond data/log (filestream, fulltext).
    /// Kept and planned best-effort rather than dropped.
    Other(String),
}

/// Reads the logical file list out of a backup without restoring anything.
/// The returned order is the backup's own internal order.
pub async fn read_file_list(
    gateway: &mut dyn ConnectionGateway,
    backup_path: &str,
) -> Result<Vec<BackupFileEntry>, RestoreError> {
    let sql = format!(
        "RESTORE FILELISTONLY FROM DISK = {}",
        quote_literal(backup_path)
    );
    let rows = gateway
        .query_rows(&sql)
        .await
        .map_err(|e| RestoreError::BackupUnreadable(format!("{}: {}", backup_path, e)))?;

    if rows.is_empty() {
        return Err(RestoreError::BackupUnreadable(format!(
            "{}: engine returned an empty file list",
            backup_path
        )));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let logical_name = row
            .get("LogicalName")
            .and_then(SqlValue::as_text)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RestoreError::BackupUnreadable(format!(
                    "{}: file list row carries no LogicalName",
                    backup_path
                ))
            })?
            .to_string();
        let physical_name = row
            .get("PhysicalName")
            .and_then(SqlValue::as_text)
            .unwrap_or_default()
            .to_string();
        let type_code = row
            .get("Type")
            .and_then(SqlValue::as_text)
            .unwrap_or_default();
        let file_type = match type_code {
            "D" => FileType::Data,
            "L" => FileType::Log,
            other => {
                println!(
                    "⚠️ Backup file '{}' carries a file of unexpected type '{}' ('{}'); it will be relocated like a data file.",
                    backup_path, other, logical_name
                );
                FileType::Other(other.to_string())
            }
        };
        entries.push(BackupFileEntry {
            logical_name,
            file_type,
            physical_name,
        });
    }
    Ok(entries)
}

/// Reads the database name embedded in the backup header.
pub async fn read_database_name(
    gateway: &mut dyn ConnectionGateway,
    backup_path: &str,
) -> Result<String, RestoreError> {
    let sql = format!(
        "RESTORE HEADERONLY FROM DISK = {}",
        quote_literal(backup_path)
    );
    let rows = gateway
        .query_rows(&sql)
        .await
        .map_err(|e| RestoreError::BackupUnreadable(format!("{}: {}", backup_path, e)))?;

    rows.first()
        .and_then(|row| row.get("DatabaseName"))
        .and_then(SqlValue::as_text)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RestoreError::BackupUnreadable(format!(
                "{}: backup header carries no database name",
                backup_path
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{Reply, ScriptedGateway, row};

    fn file_list_rows() -> Vec<crate::gateway::SqlRow> {
        vec![
            row(vec![
                ("LogicalName", SqlValue::Text("sample_data".to_string())),
                ("PhysicalName", SqlValue::Text("C:\\old\\sample.mdf".to_string())),
                ("Type", SqlValue::Text("D".to_string())),
            ]),
            row(vec![
                ("LogicalName", SqlValue::Text("sample_log".to_string())),
                ("PhysicalName", SqlValue::Text("C:\\old\\sample_log.ldf".to_string())),
                ("Type", SqlValue::Text("L".to_string())),
            ]),
        ]
    }

    #[tokio::test]
    async fn test_read_file_list_preserves_backup_order() -> anyhow::Result<()> {
        let mut gateway = ScriptedGateway::new(vec![Reply::Rows(file_list_rows())]);

        let entries = read_file_list(&mut gateway, "/backups/sample.bak").await?;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].logical_name, "sample_data");
        assert_eq!(entries[0].file_type, FileType::Data);
        assert_eq!(entries[1].logical_name, "sample_log");
        assert_eq!(entries[1].file_type, FileType::Log);
        assert!(gateway.issued[0].contains("RESTORE FILELISTONLY FROM DISK = N'/backups/sample.bak'"));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_file_list_matches_columns_by_name_not_position() -> anyhow::Result<()> {
        // Column order differs across engine versions; only names are stable.
        let reordered = vec![row(vec![
            ("Type", SqlValue::Text("L".to_string())),
            ("SomeNewColumn", SqlValue::Int(7)),
            ("PhysicalName", SqlValue::Text("C:\\old\\x_log.ldf".to_string())),
            ("LogicalName", SqlValue::Text("x_log".to_string())),
        ])];
        let mut gateway = ScriptedGateway::new(vec![Reply::Rows(reordered)]);

        let entries = read_file_list(&mut gateway, "/backups/x.bak").await?;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].logical_name, "x_log");
        assert_eq!(entries[0].file_type, FileType::Log);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_file_list_keeps_unknown_file_types() -> anyhow::Result<()> {
        let rows = vec![row(vec![
            ("LogicalName", SqlValue::Text("sample_fs".to_string())),
            ("PhysicalName", SqlValue::Text("C:\\old\\fs".to_string())),
            ("Type", SqlValue::Text("S".to_string())),
        ])];
        let mut gateway = ScriptedGateway::new(vec![Reply::Rows(rows)]);

        let entries = read_file_list(&mut gateway, "/backups/fs.bak").await?;

        assert_eq!(entries[0].file_type, FileType::Other("S".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_file_list_classifies_engine_failure_as_backup_unreadable() {
        let mut gateway =
            ScriptedGateway::new(vec![Reply::Fail("cannot open backup device".to_string())]);

        let err = read_file_list(&mut gateway, "/backups/missing.bak")
            .await
            .unwrap_err();

        assert!(matches!(err, RestoreError::BackupUnreadable(_)));
    }

    #[tokio::test]
    async fn test_read_file_list_rejects_empty_result() {
        let mut gateway = ScriptedGateway::new(vec![Reply::Rows(Vec::new())]);

        let err = read_file_list(&mut gateway, "/backups/empty.bak")
            .await
            .unwrap_err();

        assert!(matches!(err, RestoreError::BackupUnreadable(_)));
    }

    #[tokio::test]
    async fn test_read_database_name_returns_embedded_name() -> anyhow::Result<()> {
        let header = vec![row(vec![
            ("BackupName", SqlValue::Null),
            ("DatabaseName", SqlValue::Text("Sample".to_string())),
            ("BackupType", SqlValue::Int(1)),
        ])];
        let mut gateway = ScriptedGateway::new(vec![Reply::Rows(header)]);

        let name = read_database_name(&mut gateway, "/backups/sample.bak").await?;

        assert_eq!(name, "Sample");
        assert!(gateway.issued[0].contains("RESTORE HEADERONLY FROM DISK = N'/backups/sample.bak'"));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_database_name_without_header_column_is_unreadable() {
        let header = vec![row(vec![("BackupName", SqlValue::Null)])];
        let mut gateway = ScriptedGateway::new(vec![Reply::Rows(header)]);

        let err = read_database_name(&mut gateway, "/backups/odd.bak")
            .await
            .unwrap_err();

        assert!(matches!(err, RestoreError::BackupUnreadable(_)));
    }
}
