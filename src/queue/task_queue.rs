// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::models::task::{PipelineTask, QueueName};

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 队列文件读写失败
    #[error("Queue file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 队列文件内容无法解析
    #[error("Queue file decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// 队首条目无法识别为任务，已从队列中移除
    #[error("Invalid entry removed from {queue} queue: {entry} ({reason})")]
    InvalidEntry {
        queue: QueueName,
        entry: String,
        reason: String,
    },

    /// 后台任务异常终止
    #[error("Queue task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 任务队列特质
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 追加任务到队尾
    async fn enqueue(&self, queue: QueueName, task: PipelineTask) -> Result<(), QueueError>;

    /// 取出队首任务，队列为空时返回 None
    async fn dequeue(&self, queue: QueueName) -> Result<Option<PipelineTask>, QueueError>;

    /// 清空所有队列
    async fn clear(&self) -> Result<(), QueueError>;
}

/// 队列文件内容：队列名 → 任务列表
///
/// 任务保持原始 JSON，未知的队列名原样保留。
type QueueFile = BTreeMap<String, Vec<Value>>;

fn fresh_queues() -> QueueFile {
    QueueName::ALL
        .iter()
        .map(|name| (name.as_str().to_string(), Vec::new()))
        .collect()
}

/// 基于 JSON 文件的任务队列
///
/// 每次操作都在排他文件锁内完成一次完整的 读取 → 修改 → 覆盖写入，
/// 多个进程共享同一个队列文件也不会丢失更新。
#[derive(Debug, Clone)]
pub struct FileTaskQueue {
    path: PathBuf,
}

impl FileTaskQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&mut QueueFile) -> Result<(T, bool), QueueError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || locked_read_modify_write(&path, op)).await?
    }
}

#[async_trait]
impl TaskQueue for FileTaskQueue {
    async fn enqueue(&self, queue: QueueName, task: PipelineTask) -> Result<(), QueueError> {
        let value = serde_json::to_value(&task)?;
        self.run(move |queues| {
            let entries = queues.entry(queue.as_str().to_string()).or_default();
            entries.push(value);
            debug!(queue = %queue, pending = entries.len(), "Task enqueued");
            Ok(((), true))
        })
        .await
    }

    async fn dequeue(&self, queue: QueueName) -> Result<Option<PipelineTask>, QueueError> {
        self.run(move |queues| {
            let Some(entries) = queues.get_mut(queue.as_str()) else {
                return Ok((Ok(None), false));
            };
            if entries.is_empty() {
                return Ok((Ok(None), false));
            }
            // 无论能否解码都出队，坏条目不能卡住后面的任务
            let head = entries.remove(0);
            debug!(queue = %queue, remaining = entries.len(), "Task dequeued");
            match serde_json::from_value::<PipelineTask>(head.clone()) {
                Ok(task) => Ok((Ok(Some(task)), true)),
                Err(err) => {
                    warn!(queue = %queue, entry = %head, error = %err, "Dropping undecodable queue entry");
                    Ok((
                        Err(QueueError::InvalidEntry {
                            queue,
                            entry: head.to_string(),
                            reason: err.to_string(),
                        }),
                        true,
                    ))
                }
            }
        })
        .await?
    }

    async fn clear(&self) -> Result<(), QueueError> {
        self.run(|queues| {
            *queues = fresh_queues();
            Ok(((), true))
        })
        .await
    }
}

/// 在排他锁内读取、修改并写回队列文件
///
/// `op` 返回 `(结果, 是否需要写回)`。文件不存在或为空时按三个空队列处理并写回。
fn locked_read_modify_write<T>(
    path: &Path,
    op: impl FnOnce(&mut QueueFile) -> Result<(T, bool), QueueError>,
) -> Result<T, QueueError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.lock_exclusive()?;

    let result = read_modify_write(&mut file, op);
    let _ = FileExt::unlock(&file);
    result
}

fn read_modify_write<T>(
    file: &mut File,
    op: impl FnOnce(&mut QueueFile) -> Result<(T, bool), QueueError>,
) -> Result<T, QueueError> {
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let uninitialised = contents.trim().is_empty();
    let mut queues = if uninitialised {
        fresh_queues()
    } else {
        serde_json::from_str::<QueueFile>(&contents)?
    };

    let (value, dirty) = op(&mut queues)?;

    if dirty || uninitialised {
        let data = serde_json::to_vec_pretty(&queues)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&data)?;
        file.set_len(data.len() as u64)?;
        file.sync_all()?;
    }

    Ok(value)
}

#[cfg(test)]
#[path = "task_queue_test.rs"]
mod tests;
