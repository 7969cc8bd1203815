//! 结果写入服务 - 业务能力层
//!
//! 只负责"追加一行分类结果"能力。
//!
//! - 并发调用由本服务内部的互斥锁串行化，调用方无需加锁
//! - 每条记录先在内存中完整序列化，再一次性写入并 `sync`
//! - 文件不存在（或为空）时先写表头，之后只追加
//! - 写入失败时回滚到写入前的长度；上次运行留下的残缺尾行在首次追加前截掉

use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::paper::ClassificationResult;

/// 结果写入能力
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// 追加一条记录；失败为致命错误
    async fn append(&self, record: &ClassificationResult) -> AppResult<()>;

    /// 已写入记录的论文标识，用于断点续跑
    async fn recorded_identifiers(&self) -> AppResult<HashSet<String>>;

    /// 存储位置（用于日志）
    fn location(&self) -> String;
}

/// CSV 文件结果写入
pub struct CsvSink {
    path: PathBuf,
    /// 互斥锁内记录是否已检查过文件尾部
    lock: Arc<Mutex<bool>>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(false)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn append(&self, record: &ClassificationResult) -> AppResult<()> {
        let path = self.path.clone();
        let lock = self.lock.clone();
        let record = record.clone();
        let location = self.location();

        // 锁在阻塞线程内持有，任务被取消时也不会出现半行记录
        tokio::task::spawn_blocking(move || {
            let mut tail_checked = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if !*tail_checked {
                repair_torn_tail(&path)?;
                *tail_checked = true;
            }
            append_record(&path, &record)
        })
        .await
        .map_err(|e| AppError::persistence(location, e))?
    }

    async fn recorded_identifiers(&self) -> AppResult<HashSet<String>> {
        let path = self.path.clone();
        let location = self.location();

        tokio::task::spawn_blocking(move || read_identifiers(&path))
            .await
            .map_err(|e| AppError::persistence(location, e))?
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// 每行记录的字段数
const RECORD_FIELDS: usize = 4;

/// 文件扫描结果
struct ScanOutcome {
    /// 完整记录的论文标识
    identifiers: HashSet<String>,
    /// 去掉残缺尾行后的文件长度
    valid_len: u64,
    /// 原文件长度
    file_len: u64,
}

/// 扫描结果文件
///
/// 只有以换行结尾且字段数为 4 的行才算完整记录。
/// 最后一行不完整时（上次运行中途退出留下的半行），`valid_len` 指向该行开头。
fn scan_records(path: &Path) -> AppResult<ScanOutcome> {
    let location = path.display().to_string();
    let data = std::fs::read(path).map_err(|e| AppError::persistence(location.as_str(), e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_slice());

    let mut identifiers = HashSet::new();
    let mut row = csv::ByteRecord::new();
    let mut line = 0usize;
    let mut tail_start = 0u64;
    let mut tail_complete = true;

    loop {
        let start = reader.position().byte();
        match reader.read_byte_record(&mut row) {
            Ok(true) => {
                line += 1;
                let end = reader.position().byte();
                let terminated = end > 0 && data.get(end as usize - 1) == Some(&b'\n');
                let complete = terminated && row.len() == RECORD_FIELDS;

                tail_start = start;
                tail_complete = complete;

                // 第一行是表头
                if line == 1 {
                    continue;
                }
                if !complete {
                    warn!("忽略不完整的结果行 {} ({})", line, location);
                    continue;
                }
                let id = String::from_utf8_lossy(&row[0]);
                if !id.is_empty() {
                    identifiers.insert(id.into_owned());
                }
            }
            Ok(false) => break,
            Err(e) => {
                warn!("结果文件从第 {} 行起无法解析 ({}): {}", line + 1, location, e);
                tail_start = start;
                tail_complete = false;
                break;
            }
        }
    }

    let file_len = data.len() as u64;
    Ok(ScanOutcome {
        identifiers,
        valid_len: if tail_complete { file_len } else { tail_start },
        file_len,
    })
}

/// 截掉上次运行留下的残缺尾行
fn repair_torn_tail(path: &Path) -> AppResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let scan = scan_records(path)?;
    if scan.valid_len < scan.file_len {
        let location = path.display().to_string();
        warn!(
            "结果文件末尾有残缺记录，截断 {} 字节 ({})",
            scan.file_len - scan.valid_len,
            location
        );
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| AppError::persistence(location.as_str(), e))?;
        file.set_len(scan.valid_len)
            .and_then(|_| file.sync_data())
            .map_err(|e| AppError::persistence(location.as_str(), e))?;
    }
    Ok(())
}

fn append_record(path: &Path, record: &ClassificationResult) -> AppResult<()> {
    let location = path.display().to_string();
    let io_err = |e: std::io::Error| AppError::persistence(location.as_str(), e);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;

    let prev_len = file.metadata().map_err(io_err)?.len();
    let needs_header = prev_len == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(Vec::new());
    writer
        .serialize(record)
        .map_err(|e| AppError::persistence(location.as_str(), e))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::persistence(location.as_str(), e.into_error()))?;

    // 写入失败时回滚到写入前的长度，不留半行
    if let Err(e) = file.write_all(&bytes).and_then(|_| file.sync_data()) {
        if let Err(rollback) = file.set_len(prev_len) {
            warn!("回滚结果文件失败 ({}): {}", location, rollback);
        }
        return Err(io_err(e));
    }

    debug!(
        "已写入 {} -> {}{}",
        record.identifier,
        location,
        if needs_header { "（含表头）" } else { "" }
    );
    Ok(())
}

fn read_identifiers(path: &Path) -> AppResult<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    scan_records(path).map(|scan| scan.identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taxonomy::Label;

    fn record(id: &str, label: Label) -> ClassificationResult {
        ClassificationResult {
            identifier: id.to_string(),
            title: format!("Title of {}", id),
            excerpt: "line one, with comma\nand \"quotes\"".to_string(),
            label,
        }
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let sink = CsvSink::new(&path);
        sink.append(&record("a.pdf", Label::Other)).await.unwrap();

        // 第二次运行使用新的 sink 实例
        let sink = CsvSink::new(&path);
        sink.append(&record("b.pdf", Label::Error)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("File Name,Title,Abstract,Category").count(), 1);
        assert!(content.starts_with("File Name,Title,Abstract,Category"));
    }

    #[tokio::test]
    async fn test_fields_with_delimiters_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::new(&path);
        let original = record("a.pdf", Label::Category("Optimization".into()));
        sink.append(&original).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], original.excerpt);
        assert_eq!(&rows[0][3], "Optimization");
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_whole_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = Arc::new(CsvSink::new(&path));

        let mut handles = Vec::new();
        for i in 0..40 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.append(&record(&format!("{}.pdf", i), Label::Other)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let ids = sink.recorded_identifiers().await.unwrap();
        assert_eq!(ids.len(), 40);
        assert!(ids.contains("0.pdf") && ids.contains("39.pdf"));
    }

    #[test]
    fn test_recorded_identifiers_of_missing_file_is_empty() {
        let sink = CsvSink::new("/no/such/dir/out.csv");
        let ids = tokio_test::block_on(sink.recorded_identifiers()).unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_location_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // 目录不能作为文件打开
        let sink = CsvSink::new(dir.path());
        let result = sink.append(&record("a.pdf", Label::Other)).await;
        assert!(matches!(result, Err(AppError::Persistence { .. })));
    }

    const TORN: &str = "File Name,Title,Abstract,Category\na.pdf,T,A,Other\nb.pdf,Tit";

    #[tokio::test]
    async fn test_torn_tail_is_ignored_and_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, TORN).unwrap();

        let sink = CsvSink::new(&path);
        let ids = sink.recorded_identifiers().await.unwrap();
        assert_eq!(ids, HashSet::from(["a.pdf".to_string()]));

        sink.append(&record("c.pdf", Label::Other)).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == 4));
        assert_eq!(&rows[0][0], "a.pdf");
        assert_eq!(&rows[1][0], "c.pdf");

        let ids = sink.recorded_identifiers().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains("b.pdf"));
    }

    #[tokio::test]
    async fn test_torn_tail_inside_quoted_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        // 半行恰好断在引号内的换行之后
        std::fs::write(
            &path,
            "File Name,Title,Abstract,Category\na.pdf,T,A,Other\nb.pdf,T,\"line one\n",
        )
        .unwrap();

        let sink = CsvSink::new(&path);
        let ids = sink.recorded_identifiers().await.unwrap();
        assert_eq!(ids, HashSet::from(["a.pdf".to_string()]));

        sink.append(&record("c.pdf", Label::Error)).await.unwrap();
        let ids = sink.recorded_identifiers().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("c.pdf"));
    }

    #[tokio::test]
    async fn test_torn_header_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "File Na").unwrap();

        let sink = CsvSink::new(&path);
        sink.append(&record("a.pdf", Label::Other)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("File Name,Title,Abstract,Category\n"));
        assert_eq!(sink.recorded_identifiers().await.unwrap().len(), 1);
    }

    #[test]
    fn test_rows_with_wrong_field_count_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(
            &path,
            "File Name,Title,Abstract,Category\na.pdf,T\nb.pdf,T,A,Other\n",
        )
        .unwrap();

        let ids = read_identifiers(&path).unwrap();
        assert_eq!(ids, HashSet::from(["b.pdf".to_string()]));
        // 中间的残缺行不会被截掉
        let scan = scan_records(&path).unwrap();
        assert_eq!(scan.valid_len, scan.file_len);
    }
}
