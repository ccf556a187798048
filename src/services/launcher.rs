use std::process::Stdio;
use std::sync::Arc;
use tracing::{error, info};

/// Запуск приложений по команде из конфигурации
pub trait Launcher: Send + Sync {
    /// Запускает процесс и не ждёт его завершения
    fn launch(&self, command: &str) -> bool;
}

pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, command: &str) -> bool {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            error!("Пустая команда запуска");
            return false;
        };

        // Дочерний процесс не ждём: tokio сам заберёт его после завершения
        let spawned = tokio::process::Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                info!("Запущено приложение '{}' (pid: {:?})", command, child.id());
                true
            }
            Err(e) => {
                error!("Не удалось запустить '{}': {}", command, e);
                false
            }
        }
    }
}

pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    fn launch(&self, command: &str) -> bool {
        info!("[DRY RUN] Запуск приложения: {}", command);
        true
    }
}

/// Factory function to create a launcher based on the dry_run flag
pub fn create_launcher(dry_run: bool) -> Arc<dyn Launcher> {
    if dry_run {
        Arc::new(DryRunLauncher)
    } else {
        Arc::new(ProcessLauncher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_reports_failure() {
        let launcher = ProcessLauncher;
        assert!(!launcher.launch("hotswitch-no-such-program-4f1c --flag"));
        assert!(!launcher.launch("   "));
    }

    #[test]
    fn test_dry_run_always_succeeds() {
        assert!(create_launcher(true).launch("obsidian"));
    }
}
