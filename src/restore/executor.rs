// restoretool/src/restore/executor.rs
use std::time::{Duration, Instant};

use crate::config::RestoreSettings;
use crate::errors::{GatewayError, RestoreError};
use crate::gateway::{ConnectionGateway, SqlValue, quote_ident, quote_literal};
use crate::restore::plan::RestorePlan;
use crate::restore::sessions::evict_other_sessions;

const SINGLE_USER_MAX_ATTEMPTS: u32 = 5;
const SINGLE_USER_RETRY_DELAY: Duration = Duration::from_millis(500);
const SINGLE_USER_DEADLINE: Duration = Duration::from_secs(30);

pub async fn database_exists(
    gateway: &mut dyn ConnectionGateway,
    database: &str,
) -> Result<bool, RestoreError> {
    let sql = format!(
        "SELECT COUNT(*) FROM sys.databases WHERE name = {}",
        quote_literal(database)
    );
    let value = gateway.query_scalar(&sql).await?;
    Ok(matches!(value, Some(SqlValue::Int(n)) if n > 0))
}

/// Runs the full restore sequence for one plan: existence pre-check, optional
/// eviction and single-user transition, the restore command, and the return
/// to multi-user mode. Nothing destructive happens before the restore command
/// itself, so failures up to that point leave any existing database untouched.
pub async fn execute_restore(
    gateway: &mut dyn ConnectionGateway,
    backup_path: &str,
    plan: &RestorePlan,
    settings: &RestoreSettings,
) -> Result<(), RestoreError> {
    let target = &plan.target_database;

    let exists = database_exists(gateway, target).await?;
    if exists && !settings.with_replace {
        return Err(RestoreError::TargetDatabaseExists(target.clone()));
    }

    // Single-user mode only means anything for a database that already exists
    // and is about to be overwritten.
    let mut switched_to_single_user = false;
    if exists && settings.switch_to_single_user_mode {
        if let Err(e) = evict_other_sessions(gateway, target).await {
            println!(
                "⚠️ Session eviction for '{}' failed: {}; relying on the single-user transition.",
                target, e
            );
        }
        switch_to_single_user(gateway, target, settings.command_timeout).await?;
        switched_to_single_user = true;
    }

    println!("Restoring database '{}' from {}...", target, backup_path);
    let restore_sql = build_restore_command(backup_path, plan, settings.with_replace);
    let restore_result = execute_bounded(gateway, &restore_sql, settings.command_timeout)
        .await
        .map_err(|e| RestoreError::RestoreCommandFailed(e.to_string()));

    // Always hand the database back to other users once we switched it away,
    // including when the restore command was aborted by its deadline; a
    // database stuck in single-user mode is worse than a lost error detail.
    let mode_result = if switched_to_single_user {
        switch_to_multi_user(gateway, target, settings.command_timeout).await
    } else {
        Ok(())
    };

    match (restore_result, mode_result) {
        (Ok(()), Ok(())) => {
            println!("✓ Database '{}' restored.", target);
            Ok(())
        }
        (Ok(()), Err(mode_err)) => Err(RestoreError::ModeRestoreFailed(
            target.clone(),
            mode_err.to_string(),
        )),
        (Err(restore_err), Ok(())) => Err(restore_err),
        (Err(restore_err), Err(mode_err)) => {
            // The restore failure is the error the caller needs; the mode
            // failure must not mask it.
            eprintln!(
                "⚠️ Could not return '{}' to multi-user mode after the failed restore: {}",
                target, mode_err
            );
            Err(restore_err)
        }
    }
}

/// Takes exclusive access, retrying while evicted clients race to reconnect.
/// Bounded by both an attempt counter and a wall-clock deadline; the last
/// engine error is carried into the failure so a non-retryable cause (e.g.
/// permission denied) is not lost behind the retry loop.
async fn switch_to_single_user(
    gateway: &mut dyn ConnectionGateway,
    database: &str,
    command_timeout: Option<Duration>,
) -> Result<(), RestoreError> {
    let sql = format!(
        "ALTER DATABASE {} SET SINGLE_USER WITH ROLLBACK IMMEDIATE",
        quote_ident(database)
    );
    let deadline = Instant::now() + SINGLE_USER_DEADLINE;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match execute_bounded(gateway, &sql, command_timeout).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempts >= SINGLE_USER_MAX_ATTEMPTS || Instant::now() >= deadline {
                    return Err(RestoreError::ExclusiveAccessTimeout(
                        database.to_string(),
                        attempts,
                        e.to_string(),
                    ));
                }
                println!(
                    "Single-user transition for '{}' failed (attempt {}/{}): {}; retrying...",
                    database, attempts, SINGLE_USER_MAX_ATTEMPTS, e
                );
                tokio::time::sleep(SINGLE_USER_RETRY_DELAY).await;
            }
        }
    }
}

async fn switch_to_multi_user(
    gateway: &mut dyn ConnectionGateway,
    database: &str,
    command_timeout: Option<Duration>,
) -> Result<(), GatewayError> {
    let sql = format!("ALTER DATABASE {} SET MULTI_USER", quote_ident(database));
    execute_bounded(gateway, &sql, command_timeout).await
}

/// Runs one command under the caller's deadline, if any. Expiry abandons the
/// command and reports it as a timed-out gateway failure, so the caller's
/// failure path (and its multi-user recovery) still runs.
async fn execute_bounded(
    gateway: &mut dyn ConnectionGateway,
    sql: &str,
    limit: Option<Duration>,
) -> Result<(), GatewayError> {
    match limit {
        None => gateway.execute(sql).await,
        Some(limit) => match tokio::time::timeout(limit, gateway.execute(sql)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("command did not complete within {:?}", limit),
            ))),
        },
    }
}

fn build_restore_command(backup_path: &str, plan: &RestorePlan, with_replace: bool) -> String {
    let mut with_parts: Vec<String> = plan
        .moves
        .iter()
        .map(|m| {
            format!(
                "MOVE {} TO {}",
                quote_literal(&m.logical_name),
                quote_literal(&m.destination)
            )
        })
        .collect();
    if with_replace {
        with_parts.push("REPLACE".to_string());
    }
    with_parts.push("RECOVERY".to_string());
    format!(
        "RESTORE DATABASE {} FROM DISK = {} WITH {}",
        quote_ident(&plan.target_database),
        quote_literal(backup_path),
        with_parts.join(", ")
    )
}
