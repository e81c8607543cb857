//! Single-flight operation coordinator and maintenance gate.
//!
//! At most one backup-or-restore operation may be in flight system-wide.
//! Two layers enforce this: a non-blocking in-process mutex (concurrent
//! callers within one process) and an OS advisory lock on a dedicated
//! lock file (a second process instance, e.g. a stray worker, racing the
//! first). Neither layer queues; contention is an immediate `Busy`.
//!
//! The coordinator also owns the maintenance flag consulted by the HTTP
//! middleware while a restore's destructive phase runs.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AppError, Result};

pub struct OperationCoordinator {
    op_lock: Mutex<()>,
    lock_path: PathBuf,
    maintenance: AtomicBool,
}

impl OperationCoordinator {
    /// `lock_path` is the advisory lock file, conventionally
    /// `<backup_dir>/.backup.lock`.
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            op_lock: Mutex::new(()),
            lock_path: lock_path.into(),
            maintenance: AtomicBool::new(false),
        }
    }

    /// Acquire the single-flight lock, or fail immediately with `Busy`.
    /// The returned guard releases both lock layers on drop, including
    /// on panic and early-return paths.
    pub fn begin(&self, operation: &str) -> Result<OperationGuard<'_>> {
        let permit = self.op_lock.try_lock().map_err(|_| AppError::Busy)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.lock_path)?;
        if let Err(e) = lock_file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(AppError::Busy);
            }
            return Err(e.into());
        }

        tracing::debug!(operation, lock_file = %self.lock_path.display(), "operation lock acquired");
        Ok(OperationGuard {
            _permit: permit,
            lock_file: Some(lock_file),
        })
    }

    /// True while a restore's destructive phase is executing.
    pub fn is_maintenance(&self) -> bool {
        self.maintenance.load(Ordering::SeqCst)
    }

    /// Raise the maintenance flag; the returned guard clears it on drop
    /// regardless of how the restore pipeline exits.
    pub fn enter_maintenance(&self) -> MaintenanceGuard<'_> {
        self.maintenance.store(true, Ordering::SeqCst);
        tracing::info!("maintenance mode entered");
        MaintenanceGuard { coordinator: self }
    }
}

/// RAII guard over both single-flight lock layers.
pub struct OperationGuard<'a> {
    _permit: MutexGuard<'a, ()>,
    lock_file: Option<File>,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if let Some(file) = self.lock_file.take() {
            if let Err(e) = file.unlock() {
                tracing::warn!(error = %e, "failed to release operation lock file");
            }
        }
    }
}

/// RAII guard that clears the maintenance flag on drop.
pub struct MaintenanceGuard<'a> {
    coordinator: &'a OperationCoordinator,
}

impl Drop for MaintenanceGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.maintenance.store(false, Ordering::SeqCst);
        tracing::info!("maintenance mode cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn second_caller_gets_busy_immediately() {
        let dir = tempdir().unwrap();
        let coordinator = OperationCoordinator::new(dir.path().join(".backup.lock"));

        let guard = coordinator.begin("backup").unwrap();
        assert!(matches!(
            coordinator.begin("restore"),
            Err(AppError::Busy)
        ));
        drop(guard);
        // Released on drop: a new operation may start.
        coordinator.begin("restore").unwrap();
    }

    #[tokio::test]
    async fn lock_released_even_when_operation_panics() {
        let dir = tempdir().unwrap();
        let coordinator = std::sync::Arc::new(OperationCoordinator::new(
            dir.path().join(".backup.lock"),
        ));

        let inner = coordinator.clone();
        let result = tokio::spawn(async move {
            let _guard = inner.begin("backup").unwrap();
            panic!("operation blew up");
        })
        .await;
        assert!(result.is_err());

        coordinator.begin("backup").unwrap();
    }

    #[tokio::test]
    async fn maintenance_flag_cleared_on_guard_drop() {
        let dir = tempdir().unwrap();
        let coordinator = OperationCoordinator::new(dir.path().join(".backup.lock"));
        assert!(!coordinator.is_maintenance());
        {
            let _guard = coordinator.enter_maintenance();
            assert!(coordinator.is_maintenance());
        }
        assert!(!coordinator.is_maintenance());
    }

    #[tokio::test]
    async fn file_lock_blocks_second_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".backup.lock");
        let a = OperationCoordinator::new(&path);
        // Simulates a second process instance sharing the lock file.
        let b = OperationCoordinator::new(&path);

        let _guard = a.begin("backup").unwrap();
        assert!(matches!(b.begin("backup"), Err(AppError::Busy)));
    }
}
