//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::orchestrator::BatchReport;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 论文批量分类模式");
    info!("📁 论文目录: {}", config.source_folder);
    info!("💾 输出文件: {}", config.output_csv);
    info!("🤖 模型: {} ({})", config.llm_model_name, config.llm_api_base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_papers);
    info!("🏷️ 分类目录: {}", config.categories.join(" | "));
    info!("{}", "=".repeat(60));
}

/// 记录论文加载信息
///
/// # 参数
/// - `total`: 论文总数
/// - `max_concurrent`: 最大并发数
pub fn log_items_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 篇待处理的论文", total);
    info!("📋 最多同时处理 {} 篇\n", max_concurrent);
}

/// 打印最终统计信息
pub fn print_final_stats(report: &BatchReport, output_path: &str, elapsed: Duration) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {} (耗时 {:.1} 秒)",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        elapsed.as_secs_f64()
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已写入: {}/{}", report.recorded, report.total);
    for (label, count) in &report.label_counts {
        info!("   - {}: {}", label, count);
    }
    info!("⏭️ 跳过: {} (其中已存在 {})", report.skipped, report.already_recorded);
    if report.not_started > 0 {
        info!("⛔ 未开始: {}", report.not_started);
    }
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("深度学习方法综述", 4), "深度学习...");
    }
}
