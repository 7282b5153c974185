//! 台帳プロセスの排他制御（シングルライター制約）
//!
//! 同一データベースに対して追記サーバーが2つ起動することを防ぐファイルロック。
//!
//! - ロックファイルはデータベースファイルの隣（`ledger.db.lock`）
//! - JSON形式でPID・起動時刻・データベースパスを記録
//! - 記録されたPIDが存在しない残留ロックは自動的に解除
//! - Dropでロック解除とファイル削除

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// ロックファイルに保存されるプロセス情報
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockInfo {
    /// 台帳プロセスのPID
    pub pid: u32,
    /// 起動時刻（UTC）
    pub started_at: DateTime<Utc>,
    /// ロック対象のデータベースファイル
    pub database: PathBuf,
}

/// ロック操作に関するエラー型
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// 同一データベースで既に台帳プロセスが起動中
    #[error("Ledger already served for {} (PID: {pid}, started: {started_at})\n\nTo stop: kill -TERM {pid}", database.display())]
    AlreadyRunning {
        /// データベースファイル
        database: PathBuf,
        /// 既存プロセスのPID
        pid: u32,
        /// 起動時刻
        started_at: DateTime<Utc>,
    },

    /// ロック取得に失敗
    #[error("Failed to acquire lock: {0}")]
    AcquireFailed(#[source] std::io::Error),

    /// ロック解除に失敗
    #[error("Failed to release lock: {0}")]
    ReleaseFailed(#[source] std::io::Error),

    /// ロックファイルが破損
    #[error("Lock file corrupted: {0}")]
    Corrupted(String),
}

/// データベースファイルに対応するロックファイルパス
pub fn lock_path(database: &Path) -> PathBuf {
    let mut name = database.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// 指定PIDのプロセスが存在するか確認
pub fn is_process_running(pid: u32) -> bool {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some()
}

/// ロックファイルからロック情報を読み取る
///
/// ロックファイルが存在しない場合は `Ok(None)`。
pub fn read_lock_info(database: &Path) -> Result<Option<LockInfo>, LockError> {
    let path = lock_path(database);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| LockError::Corrupted(format!("Failed to read lock file: {}", e)))?;
    let info: LockInfo = serde_json::from_str(&content)
        .map_err(|e| LockError::Corrupted(format!("Invalid JSON in lock file: {}", e)))?;

    Ok(Some(info))
}

/// 台帳データベースのファイルロック
///
/// RAIIパターンでロック解除を保証する。
pub struct LedgerLock {
    lock_file: Option<File>,
    lock_path: PathBuf,
    info: LockInfo,
}

impl std::fmt::Debug for LedgerLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerLock")
            .field("lock_path", &self.lock_path)
            .field("info", &self.info)
            .finish()
    }
}

impl LedgerLock {
    /// ロックを取得する
    ///
    /// 記録されたPIDが生存していれば `LockError::AlreadyRunning`。
    /// 生存していなければ残留ロックとして削除し、新しいロックを取得する。
    pub fn acquire(database: &Path) -> Result<Self, LockError> {
        let path = lock_path(database);

        match read_lock_info(database) {
            Ok(Some(existing)) if is_process_running(existing.pid) => {
                return Err(LockError::AlreadyRunning {
                    database: existing.database,
                    pid: existing.pid,
                    started_at: existing.started_at,
                });
            }
            Ok(Some(existing)) => {
                warn!(
                    "Stale lock file detected (PID {} not running), cleaning up",
                    existing.pid
                );
                std::fs::remove_file(&path).map_err(LockError::AcquireFailed)?;
            }
            Ok(None) => {}
            Err(LockError::Corrupted(reason)) => {
                // 書き込み途中で落ちたプロセスの残骸。flockで実際の保持者を判定する
                warn!("Replacing unreadable lock file: {}", reason);
            }
            Err(e) => return Err(e),
        }

        // 保持者の記録を消さないよう、flock取得前には切り詰めない
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(LockError::AcquireFailed)?;

        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                LockError::AcquireFailed(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "Lock is held by another process",
                ))
            } else {
                LockError::AcquireFailed(e)
            }
        })?;

        let info = LockInfo {
            pid: std::process::id(),
            started_at: Utc::now(),
            database: database.to_path_buf(),
        };

        let json = serde_json::to_string_pretty(&info)
            .map_err(|e| LockError::AcquireFailed(std::io::Error::other(e)))?;
        file.set_len(0).map_err(LockError::AcquireFailed)?;
        file.write_all(json.as_bytes())
            .map_err(LockError::AcquireFailed)?;
        file.flush().map_err(LockError::AcquireFailed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions).map_err(LockError::AcquireFailed)?;
        }

        debug!(
            "Ledger lock acquired for {} (PID: {})",
            database.display(),
            info.pid
        );

        Ok(Self {
            lock_file: Some(file),
            lock_path: path,
            info,
        })
    }

    /// ロック情報への参照を取得
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    /// ロックを明示的に解除する
    pub fn release(mut self) -> Result<(), LockError> {
        self.release_internal()
    }

    fn release_internal(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.lock_file.take() {
            file.unlock().map_err(LockError::ReleaseFailed)?;
            drop(file);

            if self.lock_path.exists() {
                std::fs::remove_file(&self.lock_path).map_err(LockError::ReleaseFailed)?;
            }

            debug!("Ledger lock released for {}", self.info.database.display());
        }
        Ok(())
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = self.release_internal() {
            tracing::error!("Failed to release ledger lock on drop: {}", e);
        }
    }
}
