//! SQL Server Backup Restore Tool
//!
//! Provides a CLI interface for restoring SQL Server backups: full restore,
//! backup inspection, and engine default-path lookup.

// restoretool/src/main.rs
mod config;
mod errors;
mod gateway;
mod restore;

use anyhow::{Context, Result};
use config::AppConfig;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Define the path to config.json. Expects it in the same directory as the
    // executable or the project root if running with `cargo run`.
    let config_path = PathBuf::from("config.json");
    let app_config = AppConfig::load_from_json(&config_path).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "restore" => {
            println!("🔄 Starting Restore Process...");
            restore::run_restore_flow(&app_config)
                .await
                .context("Restore process failed")?;
        }
        "2" | "inspect" => {
            println!("🔍 Inspecting Backup File...");
            restore::run_inspect_flow(&app_config)
                .await
                .context("Backup inspection failed")?;
        }
        "3" | "paths" => {
            println!("📁 Reading Engine Default Paths...");
            restore::run_paths_flow(&app_config)
                .await
                .context("Default path lookup failed")?;
        }
        _ => {
            println!("❌ Invalid choice. Please enter '1' (restore), '2' (inspect), or '3' (paths).");
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

/// Prompts user to select an operation
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. Restore Backup (or type 'restore')");
    println!("2. Inspect Backup File (or type 'inspect')");
    println!("3. Show Engine Default Paths (or type 'paths')");
    print!("Enter your choice: ");
    let _ = stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
