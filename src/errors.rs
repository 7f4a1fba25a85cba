use thiserror::Error;

/// Failures at the connection/transport layer, below any restore semantics.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL Server error: {0}")]
    Tds(#[from] tiberius::error::Error),
}

/// Classified restore failures. Every error surfaced by the restore engine is
/// exactly one of these kinds.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Backup is not readable by the engine: {0}")]
    BackupUnreadable(String),

    #[error("Engine default-path configuration is invalid: {0}")]
    EngineConfigurationInvalid(String),

    #[error("Restore plan is ambiguous: {0}")]
    AmbiguousRestorePlan(String),

    #[error("Target database '{0}' already exists and with_replace is not set")]
    TargetDatabaseExists(String),

    #[error("Could not obtain exclusive access to database '{0}' after {1} attempt(s): {2}")]
    ExclusiveAccessTimeout(String, u32, String),

    #[error("Engine rejected the restore command: {0}")]
    RestoreCommandFailed(String),

    #[error("Database '{0}' was restored but could not be returned to multi-user mode: {1}")]
    ModeRestoreFailed(String, String),

    #[error("Connection failed: {0}")]
    Connection(#[from] GatewayError),
}
