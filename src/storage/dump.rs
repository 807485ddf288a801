//! Database snapshots through an external backup utility

use crate::config::StorageConfig;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors raised while producing a snapshot
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Failed to run {utility}: {source}")]
    Spawn {
        utility: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup utility exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes timestamped copies of the database into a dump directory
#[derive(Debug, Clone)]
pub struct Dumper {
    utility: String,
    database_path: PathBuf,
    dump_dir: PathBuf,
}

impl Dumper {
    pub fn new(
        utility: impl Into<String>,
        database_path: impl Into<PathBuf>,
        dump_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            utility: utility.into(),
            database_path: database_path.into(),
            dump_dir: dump_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.dump_utility, &config.database_path, &config.dump_dir)
    }

    /// Path the next snapshot will be written to
    pub fn snapshot_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.dump_dir.join(format!("dump_{}.sqlite3", stamp))
    }

    /// Runs `<utility> <database> ".backup '<snapshot>'"` and returns the
    /// snapshot path
    pub async fn dump(&self) -> Result<PathBuf, DumpError> {
        tokio::fs::create_dir_all(&self.dump_dir).await?;
        let target = self.snapshot_path();

        tracing::info!(
            "Dumping {} to {}",
            self.database_path.display(),
            target.display()
        );

        let output = Command::new(&self.utility)
            .arg(&self.database_path)
            .arg(backup_command(&target))
            .output()
            .await
            .map_err(|source| DumpError::Spawn {
                utility: self.utility.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DumpError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::info!("Database dump written to {}", target.display());
        Ok(target)
    }
}

/// The `.backup` dot-command for `target`, quoted for the sqlite3 shell
fn backup_command(target: &Path) -> String {
    let quoted = target.display().to_string().replace('\'', "''");
    format!(".backup '{}'", quoted)
}
