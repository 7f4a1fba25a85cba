// restoretool/src/restore/plan.rs
use std::collections::HashSet;

use crate::config::RestoreSettings;
use crate::errors::RestoreError;
use crate::restore::metadata::{BackupFileEntry, FileType};
use crate::restore::paths::DefaultPaths;

/// Where relocated files land, resolved from the settings so the two can
/// never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RelocationBase {
    /// Caller-supplied folder; every file goes there under its original base
    /// filename, data and log alike.
    SingleFolder(String),
    /// The engine's per-type default directories, with filenames derived from
    /// the target database name.
    EngineDefaults(DefaultPaths),
}

/// One move mapping handed to the restore command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveMapping {
    pub logical_name: String,
    pub destination: String,
}

/// The resolved plan for a single restore invocation. Built fresh every time;
/// never cached across attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    pub target_database: String,
    pub moves: Vec<MoveMapping>,
}

/// Combines backup metadata, caller settings and the engine's default
/// directories into a concrete plan: one destination per backup file,
/// collision-checked. `defaults` are only consulted when no storage-folder
/// override is set; callers may pass `None` when the override decides.
pub fn build_restore_plan(
    entries: &[BackupFileEntry],
    embedded_name: &str,
    settings: &RestoreSettings,
    defaults: Option<&DefaultPaths>,
) -> Result<RestorePlan, RestoreError> {
    let target_database = settings
        .new_database_name
        .clone()
        .unwrap_or_else(|| embedded_name.to_string());
    if target_database.trim().is_empty() {
        return Err(RestoreError::AmbiguousRestorePlan(
            "resolved target database name is empty".to_string(),
        ));
    }

    let base = match (&settings.new_storage_folder, defaults) {
        (Some(folder), _) => RelocationBase::SingleFolder(folder.clone()),
        (None, Some(paths)) => RelocationBase::EngineDefaults(paths.clone()),
        (None, None) => {
            return Err(RestoreError::EngineConfigurationInvalid(
                "no storage-folder override is set and the engine's default directories were not resolved".to_string(),
            ));
        }
    };

    let mut moves = Vec::with_capacity(entries.len());
    // Engine hosts are usually Windows: compare destinations case-insensitively.
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let destination = destination_for(entry, &target_database, &base);
        if destination.trim().is_empty() {
            return Err(RestoreError::AmbiguousRestorePlan(format!(
                "no destination could be computed for logical file '{}'",
                entry.logical_name
            )));
        }
        if !seen.insert(destination.to_lowercase()) {
            return Err(RestoreError::AmbiguousRestorePlan(format!(
                "two backup files resolve to the same destination '{}'",
                destination
            )));
        }
        moves.push(MoveMapping {
            logical_name: entry.logical_name.clone(),
            destination,
        });
    }

    Ok(RestorePlan {
        target_database,
        moves,
    })
}

fn destination_for(entry: &BackupFileEntry, target_database: &str, base: &RelocationBase) -> String {
    match base {
        RelocationBase::SingleFolder(folder) => {
            let file_name = base_file_name(&entry.physical_name)
                .map(str::to_string)
                .unwrap_or_else(|| derived_file_name(entry, target_database));
            join_engine_path(folder, &file_name)
        }
        RelocationBase::EngineDefaults(paths) => {
            let directory = match entry.file_type {
                FileType::Log => &paths.log_directory,
                // Non-log files, including unrecognized types, go with the data.
                FileType::Data | FileType::Other(_) => &paths.data_directory,
            };
            join_engine_path(directory, &derived_file_name(entry, target_database))
        }
    }
}

/// Filename used when no storage-folder override is given. It is derived from
/// the *target* name so that restoring the same backup twice under different
/// names never collides on disk.
fn derived_file_name(entry: &BackupFileEntry, target_database: &str) -> String {
    let extension = match entry.file_type {
        FileType::Data => "mdf",
        FileType::Log => "ldf",
        FileType::Other(_) => "ndf",
    };
    format!("{}_{}.{}", target_database, entry.logical_name, extension)
}

/// Last path segment of an engine-side path, accepting either separator.
fn base_file_name(path: &str) -> Option<&str> {
    path.rsplit(['\\', '/']).next().filter(|s| !s.is_empty())
}

/// Joins paths that live on the engine host, so local `Path` semantics do not
/// apply. The separator follows whatever the directory already uses.
fn join_engine_path(directory: &str, file_name: &str) -> String {
    if directory.ends_with('\\') || directory.ends_with('/') {
        format!("{}{}", directory, file_name)
    } else {
        let separator = if directory.contains('\\') { '\\' } else { '/' };
        format!("{}{}{}", directory, separator, file_name)
    }
}
