use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use question_enricher::error::ConfigError;
use question_enricher::utils::logger;
use question_enricher::{App, Config, OpenAiClient};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志
    logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(e.downcast_ref::<ConfigError>(), Some(ConfigError::MissingApiKey)) {
                print_api_key_help();
            } else {
                error!("❌ {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 缺少 API 密钥时在这里直接失败，不做任何处理
    let client = Arc::new(OpenAiClient::new(&config)?);

    // 初始化并运行应用
    let mut app = App::initialize(config, client).await?;
    app.run().await?;

    Ok(())
}

fn print_api_key_help() {
    error!("{}", "=".repeat(60));
    error!("错误：未设置 API 密钥");
    error!("");
    error!("请执行以下命令（替换为你的真实 key）：");
    error!("  export LLM_API_KEY=\"sk-xxxxxxxxxxxxxxxxxxxxxxxx\"");
    error!("（也可以使用 DEEPSEEK_API_KEY，或写入 enricher.toml 的 llm_api_key）");
    error!("");
    error!("然后重新运行：");
    error!("  question_enricher");
    error!("{}", "=".repeat(60));
}
