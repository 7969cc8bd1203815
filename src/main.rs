use anyhow::Result;
use paper_annotate::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logger::init(config.as_ref().map(|c| c.verbose_logging).unwrap_or(false));

    // 初始化并运行应用
    let _report = App::initialize(config?).await?.run().await?;

    Ok(())
}
