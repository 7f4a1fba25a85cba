// restoretool/src/restore/sessions.rs
use crate::errors::RestoreError;
use crate::gateway::{ConnectionGateway, SqlRow, SqlValue, quote_literal};

/// A session to be evicted. Transient: enumerated, killed, forgotten.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionHandle {
    session_id: i64,
    host_name: String,
    program_name: String,
}

/// Terminates every other active session against `database`. Best-effort by
/// design: new sessions can connect between enumeration and termination, and
/// the single-user transition that follows is the authoritative gate. A
/// session that cannot be killed (already gone, insufficient privilege) is
/// logged and skipped.
pub async fn evict_other_sessions(
    gateway: &mut dyn ConnectionGateway,
    database: &str,
) -> Result<(), RestoreError> {
    let sql = format!(
        "SELECT session_id, host_name, program_name FROM sys.dm_exec_sessions \
         WHERE database_id = DB_ID({}) AND session_id <> @@SPID",
        quote_literal(database)
    );
    let rows = gateway.query_rows(&sql).await?;
    let sessions = sessions_from_rows(&rows);
    if sessions.is_empty() {
        return Ok(());
    }

    println!(
        "Evicting {} other session(s) from database '{}'...",
        sessions.len(),
        database
    );
    for session in &sessions {
        // KILL only accepts a numeric literal.
        let kill = format!("KILL {}", session.session_id);
        if let Err(e) = gateway.execute(&kill).await {
            println!(
                "Could not terminate session {} ({} / {}): {}; skipping.",
                session.session_id, session.host_name, session.program_name, e
            );
        }
    }
    Ok(())
}

fn sessions_from_rows(rows: &[SqlRow]) -> Vec<SessionHandle> {
    rows.iter()
        .filter_map(|row| {
            let session_id = row.get("session_id").and_then(SqlValue::as_int)?;
            Some(SessionHandle {
                session_id,
                host_name: row
                    .get("host_name")
                    .and_then(SqlValue::as_text)
                    .unwrap_or("unknown")
                    .to_string(),
                program_name: row
                    .get("program_name")
                    .and_then(SqlValue::as_text)
                    .unwrap_or("unknown")
                    .to_string(),
            })
        })
        .collect()
}
