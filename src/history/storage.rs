//! JSONL 持久化
//!
//! 每条记录一行 JSON，追加写入。跨进程安全依赖 fs2 文件锁，
//! 损坏的行在读取时跳过，不让单行脏数据毁掉整个历史。

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Seek, Write};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::history::model::HistoryRecord;
use crate::suite::SuiteExecutionRecord;

const DEFAULT_DIR: &str = ".rusuite";
const HISTORY_FILE: &str = "history.jsonl";
const EXECUTIONS_FILE: &str = "executions.jsonl";
// 20 MB soft limit for compaction
const COMPACTION_THRESHOLD_BYTES: u64 = 20 * 1024 * 1024;
// Keep last 10,000 lines
const MAX_LINES: usize = 10_000;

/// 执行记录的持久化接口
///
/// 编排器只依赖这个 trait，存储实现（文件、内存、别的后端）可替换。
/// 写入失败是编排级错误，由调用方决定如何收场。
pub trait RecordStore: Send + Sync {
    fn append_history(&self, record: &HistoryRecord) -> Result<()>;
    fn list_history(&self) -> Result<Vec<HistoryRecord>>;
    /// 最近 n 条，按时间正序（旧 -> 新）
    fn tail_history(&self, n: usize) -> Result<Vec<HistoryRecord>>;
    fn append_execution(&self, record: &SuiteExecutionRecord) -> Result<()>;
    fn list_executions(&self) -> Result<Vec<SuiteExecutionRecord>>;
}

/// 基于 JSONL 文件的默认实现
///
/// 目录下两个文件: `history.jsonl`（单步历史）和
/// `executions.jsonl`（套件执行汇总）。
pub struct JsonlStore {
    dir: PathBuf,
}

impl Default for JsonlStore {
    fn default() -> Self {
        let dir = std::env::var("RUSUITE_HISTORY_DIR").unwrap_or_else(|_| DEFAULT_DIR.to_string());
        Self { dir: PathBuf::from(dir) }
    }
}

impl JsonlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定目录（测试用）
    pub fn new_with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    fn executions_path(&self) -> PathBuf {
        self.dir.join(EXECUTIONS_FILE)
    }

    fn append_line<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let json = serde_json::to_string(record)?;

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        // 独占锁保证多进程下整行写入
        file.lock_exclusive()?;
        writeln!(file, "{}", json)?;
        drop(file);

        Ok(())
    }

    fn read_lines<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(path)?;
        // 共享锁，避免读到写入方的半行
        file.lock_shared()?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<T>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// 超过阈值时只保留最后 MAX_LINES 行
    ///
    /// 在读路径上惰性触发，追加路径保持最快。按原始行裁剪，
    /// 不做反序列化。
    fn compact_if_needed(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        // 先看元数据，避免每次读取都加锁
        if file.metadata()?.len() < COMPACTION_THRESHOLD_BYTES {
            return Ok(());
        }

        file.lock_exclusive()?;

        // 锁内复查，可能别的进程刚压缩过
        if file.metadata()?.len() < COMPACTION_THRESHOLD_BYTES {
            return Ok(());
        }

        let reader = BufReader::new(&file);
        let lines: Vec<String> = reader
            .lines()
            .map_while(|l| l.ok())
            .filter(|l| !l.trim().is_empty())
            .collect();

        if lines.len() <= MAX_LINES {
            return Ok(());
        }

        let skip = lines.len() - MAX_LINES;

        let mut file = file;
        file.set_len(0)?;
        file.seek(std::io::SeekFrom::Start(0))?;

        let mut writer = std::io::BufWriter::new(file);
        for line in lines.iter().skip(skip) {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl RecordStore for JsonlStore {
    fn append_history(&self, record: &HistoryRecord) -> Result<()> {
        self.append_line(&self.history_path(), record)
    }

    fn list_history(&self) -> Result<Vec<HistoryRecord>> {
        self.compact_if_needed(&self.history_path())?;
        self.read_lines(&self.history_path())
    }

    fn tail_history(&self, n: usize) -> Result<Vec<HistoryRecord>> {
        let records = self.list_history()?;
        let skip = records.len().saturating_sub(n);
        Ok(records.into_iter().skip(skip).collect())
    }

    fn append_execution(&self, record: &SuiteExecutionRecord) -> Result<()> {
        self.append_line(&self.executions_path(), record)
    }

    fn list_executions(&self) -> Result<Vec<SuiteExecutionRecord>> {
        self.read_lines(&self.executions_path())
    }
}
