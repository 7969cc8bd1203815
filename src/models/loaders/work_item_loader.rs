use crate::error::{AppError, AppResult};
use crate::models::paper::WorkItem;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 列出文件夹中所有待处理的论文
///
/// 只扫描一层目录，扩展名不区分大小写，按文件名排序以保证提交顺序稳定。
pub async fn load_work_items(folder_path: &str, extension: &str) -> AppResult<Vec<WorkItem>> {
    let folder = PathBuf::from(folder_path);

    if !folder.is_dir() {
        return Err(AppError::Config(format!("文件夹不存在: {}", folder_path)));
    }

    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::Config(format!("无法读取文件夹 {}: {}", folder_path, e)))?;

    // 遇到错误即停止读取，避免对同一个错误反复重试
    let mut listed = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => listed.push(Ok(entry.path())),
            Ok(None) => break,
            Err(e) => {
                listed.push(Err(e));
                break;
            }
        }
    }

    let paths = select_paths(listed, folder_path, extension)?;
    tracing::debug!("在 {} 中找到 {} 个 .{} 文件", folder_path, paths.len(), extension);

    Ok(paths.into_iter().map(WorkItem::new).collect())
}

/// 过滤目录项并排序；任何目录项读取错误都作为配置错误返回
fn select_paths<I>(listed: I, folder_path: &str, extension: &str) -> AppResult<Vec<PathBuf>>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut paths = Vec::new();
    for entry in listed {
        let path = entry.map_err(|e| {
            tracing::error!("读取目录项失败 {}: {}", folder_path, e);
            AppError::Config(format!("读取目录项失败 {}: {}", folder_path, e))
        })?;
        if path.is_file() && has_extension(&path, extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let items = load_work_items(dir.path().to_str().unwrap(), "pdf")
            .await
            .unwrap();
        let names: Vec<_> = items.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_config_error() {
        let result = load_work_items("/definitely/not/here", "pdf").await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_entry_error_stops_listing() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.pdf");
        std::fs::write(&good, b"x").unwrap();

        let listed = vec![
            Ok(good),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "stale handle")),
        ];
        let result = select_paths(listed, "papers", "pdf");
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
