// restoretool/src/restore/mod.rs
pub(crate) mod executor;
pub(crate) mod metadata;
pub(crate) mod paths;
pub(crate) mod plan;
pub(crate) mod sessions;

use anyhow::{Context, Result};

use crate::config::{
    AppConfig, RestoreSettings, backup_path_from_json, connection_string_from_json,
    load_restore_job_from_json,
};
use crate::errors::RestoreError;
use crate::gateway::{ConnectionGateway, TiberiusGateway};

pub use metadata::{BackupFileEntry, FileType};

/// Restores a backup on its own administrative connection. The connection is
/// opened here and dropped on return.
pub async fn restore_sql_backup(
    connection_string: &str,
    backup_path: &str,
    settings: &RestoreSettings,
) -> Result<(), RestoreError> {
    let mut gateway = TiberiusGateway::connect(connection_string).await?;
    restore_with_gateway(&mut gateway, backup_path, settings).await
}

/// Restores a backup over a caller-supplied connection: read the backup's
/// metadata, build a fresh relocation plan, then hand it to the executor.
/// The plan is recomputed on every call so it always reflects the backup's
/// current contents.
pub async fn restore_with_gateway(
    gateway: &mut dyn ConnectionGateway,
    backup_path: &str,
    settings: &RestoreSettings,
) -> Result<(), RestoreError> {
    let entries = metadata::read_file_list(gateway, backup_path).await?;
    let embedded_name = metadata::read_database_name(gateway, backup_path).await?;

    // Default directories are only worth a round-trip when no storage-folder
    // override decides the destinations.
    let defaults = match &settings.new_storage_folder {
        Some(_) => None,
        None => Some(paths::read_default_paths(gateway).await?),
    };
    let restore_plan =
        plan::build_restore_plan(&entries, &embedded_name, settings, defaults.as_ref())?;

    executor::execute_restore(gateway, backup_path, &restore_plan, settings).await
}

/// Lists the logical files inside a backup, in the backup's own order.
pub async fn list_logical_names(
    gateway: &mut dyn ConnectionGateway,
    backup_path: &str,
) -> Result<Vec<BackupFileEntry>, RestoreError> {
    metadata::read_file_list(gateway, backup_path).await
}

/// Reads the database name embedded in a backup's header.
pub async fn get_database_name(
    gateway: &mut dyn ConnectionGateway,
    backup_path: &str,
) -> Result<String, RestoreError> {
    metadata::read_database_name(gateway, backup_path).await
}

pub async fn get_default_data_path(
    gateway: &mut dyn ConnectionGateway,
) -> Result<String, RestoreError> {
    paths::default_data_path(gateway).await
}

pub async fn get_default_log_path(
    gateway: &mut dyn ConnectionGateway,
) -> Result<String, RestoreError> {
    paths::default_log_path(gateway).await
}

/// CLI flow: full restore driven by config.json.
pub async fn run_restore_flow(app_config: &AppConfig) -> Result<()> {
    let job = load_restore_job_from_json(&app_config.raw_json_config)
        .context("Failed to load restore configuration from JSON")?;

    println!("Restore source: {}", job.backup_file_path);
    if let Some(name) = &job.settings.new_database_name {
        println!("Target database will be renamed to '{}'.", name);
    }
    if let Some(folder) = &job.settings.new_storage_folder {
        println!("Database files will be relocated to '{}'.", folder);
    }

    restore_sql_backup(&job.connection_string, &job.backup_file_path, &job.settings)
        .await
        .context("Restore failed")?;
    Ok(())
}

/// CLI flow: print a backup's logical file list and embedded database name.
pub async fn run_inspect_flow(app_config: &AppConfig) -> Result<()> {
    let connection_string = connection_string_from_json(&app_config.raw_json_config)?;
    let backup_path = backup_path_from_json(&app_config.raw_json_config)?;
    let mut gateway = TiberiusGateway::connect(&connection_string)
        .await
        .context("Failed to connect to the target server")?;

    let name = get_database_name(&mut gateway, &backup_path).await?;
    println!("Embedded database name: {}", name);

    let entries = list_logical_names(&mut gateway, &backup_path).await?;
    println!("Logical files ({}):", entries.len());
    for entry in &entries {
        let kind = match &entry.file_type {
            FileType::Data => "data",
            FileType::Log => "log",
            FileType::Other(code) => code,
        };
        println!("  {} [{}] <- {}", entry.logical_name, kind, entry.physical_name);
    }
    Ok(())
}

/// CLI flow: print the engine's default data/log directories.
pub async fn run_paths_flow(app_config: &AppConfig) -> Result<()> {
    let connection_string = connection_string_from_json(&app_config.raw_json_config)?;
    let mut gateway = TiberiusGateway::connect(&connection_string)
        .await
        .context("Failed to connect to the target server")?;

    println!("Default data path: {}", get_default_data_path(&mut gateway).await?);
    println!("Default log path:  {}", get_default_log_path(&mut gateway).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SqlValue;
    use crate::gateway::testing::{Reply, ScriptedGateway, row};

    fn sample_file_list() -> Reply {
        Reply::Rows(vec![
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
        ])
    }

    fn sample_header() -> Reply {
        Reply::Rows(vec![row(vec![(
            "DatabaseName",
            SqlValue::Text("Sample".to_string()),
        )])])
    }

    fn directory_exists() -> Reply {
        Reply::Rows(vec![row(vec![
            ("File Exists", SqlValue::Int(0)),
            ("File is a Directory", SqlValue::Int(1)),
            ("Parent Directory Exists", SqlValue::Int(1)),
        ])])
    }

    // The sample.bak scenario: default settings restore a fresh "Sample"
    // database with its files relocated under the engine's default folders.
    #[tokio::test]
    async fn test_default_restore_places_sample_under_engine_defaults() -> anyhow::Result<()> {
        let mut gateway = ScriptedGateway::new(vec![
            sample_file_list(),
            sample_header(),
            Reply::Scalar(Some(SqlValue::Text("C:\\SqlData\\".to_string()))),
            directory_exists(),
            Reply::Scalar(Some(SqlValue::Text("C:\\SqlLog\\".to_string()))),
            directory_exists(),
            Reply::Scalar(Some(SqlValue::Int(0))), // Sample does not exist yet
            Reply::Ok,                             // RESTORE
        ]);

        restore_with_gateway(&mut gateway, "/backups/sample.bak", &RestoreSettings::default())
            .await?;

        let restore = gateway
            .issued
            .iter()
            .find(|sql| sql.starts_with("RESTORE DATABASE"))
            .expect("restore command should have been issued");
        assert!(restore.starts_with("RESTORE DATABASE [Sample] FROM DISK = N'/backups/sample.bak'"));
        assert!(restore.contains("MOVE N'sample_data' TO N'C:\\SqlData\\Sample_sample_data.mdf'"));
        assert!(restore.contains("MOVE N'sample_log' TO N'C:\\SqlLog\\Sample_sample_log.ldf'"));
        assert!(!restore.contains("REPLACE"));
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_folder_override_skips_default_path_queries() -> anyhow::Result<()> {
        let settings = RestoreSettings {
            new_database_name: Some("RestoredCopy".to_string()),
            new_storage_folder: Some("D:\\Restores".to_string()),
            ..RestoreSettings::default()
        };
        let mut gateway = ScriptedGateway::new(vec![
            sample_file_list(),
            sample_header(),
            Reply::Scalar(Some(SqlValue::Int(0))),
            Reply::Ok, // RESTORE
        ]);

        restore_with_gateway(&mut gateway, "/backups/sample.bak", &settings).await?;

        assert!(gateway.issued.iter().all(|sql| !sql.contains("SERVERPROPERTY")));
        let restore = gateway
            .issued
            .iter()
            .find(|sql| sql.starts_with("RESTORE DATABASE"))
            .expect("restore command should have been issued");
        assert!(restore.starts_with("RESTORE DATABASE [RestoredCopy]"));
        assert!(restore.contains("MOVE N'sample_data' TO N'D:\\Restores\\sample.mdf'"));
        assert!(restore.contains("MOVE N'sample_log' TO N'D:\\Restores\\sample_log.ldf'"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_backup_stops_before_planning() {
        let mut gateway =
            ScriptedGateway::new(vec![Reply::Fail("cannot open backup device".to_string())]);

        let err = restore_with_gateway(
            &mut gateway,
            "/backups/missing.bak",
            &RestoreSettings::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RestoreError::BackupUnreadable(_)));
        assert_eq!(gateway.issued.len(), 1);
    }
}
