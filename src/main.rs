use anyhow::Result;
use llm_relay::orchestrator::{App, CliArgs};
use llm_relay::utils::logging;
use llm_relay::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let args = CliArgs::parse_from(std::env::args().skip(1))?;

    // 初始化并运行应用
    App::initialize(config).await?.run(args).await?;

    Ok(())
}
