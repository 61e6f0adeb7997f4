// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, error, warn};

/// 运行锁错误类型
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 单实例运行锁
///
/// 以原子方式创建锁文件（`create_new`），文件内容为持有者的进程号。
/// 获取失败时立即返回，不等待。
#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
    stale_after: Option<Duration>,
}

impl RunLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stale_after: None,
        }
    }

    /// 修改时间早于 `stale_after` 的锁文件视为残留，获取时直接接管
    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 尝试获取锁
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 成功创建锁文件
    /// * `Ok(false)` - 锁已被持有
    pub fn try_acquire(&self) -> Result<bool, LockError> {
        match self.create_marker() {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !self.is_stale()? {
                    debug!(path = %self.path.display(), "Lock is held by another runner");
                    return Ok(false);
                }
                warn!(
                    path = %self.path.display(),
                    holder = %self.holder().unwrap_or_default(),
                    "Taking over stale lock"
                );
                self.release()?;
                match self.create_marker() {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 删除锁文件，不存在时什么也不做
    pub fn release(&self) -> Result<(), LockError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 获取锁并返回守卫，守卫释放时删除锁文件
    pub fn guard(&self) -> Result<Option<RunGuard>, LockError> {
        if self.try_acquire()? {
            Ok(Some(RunGuard { lock: self.clone() }))
        } else {
            Ok(None)
        }
    }

    /// 锁文件中记录的进程号
    pub fn holder(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
    }

    pub fn is_held(&self) -> bool {
        self.path.exists()
    }

    fn create_marker(&self) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        write!(file, "{}", std::process::id())
    }

    fn is_stale(&self) -> Result<bool, LockError> {
        let Some(stale_after) = self.stale_after else {
            return Ok(false);
        };
        let modified = match fs::metadata(&self.path) {
            Ok(meta) => meta.modified()?,
            // 刚被释放，交给下一次创建判断
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age >= stale_after)
    }
}

/// 运行锁守卫
#[derive(Debug)]
pub struct RunGuard {
    lock: RunLock,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            error!(path = %self.lock.path.display(), "Failed to release run lock: {}", e);
        }
    }
}
