// restoretool/src/restore/paths.rs
use crate::errors::RestoreError;
use crate::gateway::{ConnectionGateway, SqlValue, quote_literal};

/// The engine's configured default directories for new database files.
/// Queried per connection: different target servers answer differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPaths {
    pub data_directory: String,
    pub log_directory: String,
}

const DEFAULT_DATA_PATH_SQL: &str =
    "SELECT CAST(SERVERPROPERTY('InstanceDefaultDataPath') AS nvarchar(512))";
const DEFAULT_LOG_PATH_SQL: &str =
    "SELECT CAST(SERVERPROPERTY('InstanceDefaultLogPath') AS nvarchar(512))";

pub async fn default_data_path(
    gateway: &mut dyn ConnectionGateway,
) -> Result<String, RestoreError> {
    resolve_directory(gateway, DEFAULT_DATA_PATH_SQL, "data").await
}

pub async fn default_log_path(
    gateway: &mut dyn ConnectionGateway,
) -> Result<String, RestoreError> {
    resolve_directory(gateway, DEFAULT_LOG_PATH_SQL, "log").await
}

pub async fn read_default_paths(
    gateway: &mut dyn ConnectionGateway,
) -> Result<DefaultPaths, RestoreError> {
    Ok(DefaultPaths {
        data_directory: default_data_path(gateway).await?,
        log_directory: default_log_path(gateway).await?,
    })
}

async fn resolve_directory(
    gateway: &mut dyn ConnectionGateway,
    sql: &str,
    kind: &str,
) -> Result<String, RestoreError> {
    let value = gateway.query_scalar(sql).await?;
    let path = match value {
        Some(SqlValue::Text(p)) if !p.trim().is_empty() => p,
        _ => {
            return Err(RestoreError::EngineConfigurationInvalid(format!(
                "engine reports no default {} directory",
                kind
            )));
        }
    };
    ensure_directory_on_engine(gateway, &path, kind).await?;
    Ok(path)
}

/// Asks the engine itself whether the directory exists; the path lives on the
/// engine host, so a local check would test the wrong file system.
async fn ensure_directory_on_engine(
    gateway: &mut dyn ConnectionGateway,
    path: &str,
    kind: &str,
) -> Result<(), RestoreError> {
    let probe = path.trim_end_matches(['\\', '/']);
    let sql = format!("EXEC master.dbo.xp_fileexist {}", quote_literal(probe));
    let rows = gateway.query_rows(&sql).await?;
    let is_directory = rows
        .first()
        .and_then(|row| row.get("File is a Directory"))
        .and_then(SqlValue::as_int)
        .unwrap_or(0);
    if is_directory != 1 {
        return Err(RestoreError::EngineConfigurationInvalid(format!(
            "default {} directory '{}' does not exist on the engine host",
            kind, path
        )));
    }
    Ok(())
}
