use anyhow::Context;
use perpbot::{
    cli::{build_cli, intent_from_matches, render_result, ORDER_COMMANDS},
    core::config::{ApiKeys, BotConfig},
    core::error::ExchangeError,
    core::exchange::ExchangeGateway,
    core::types::Interval,
    exchanges::BinanceFuturesGateway,
    orders::OrderEngine,
    reports,
    utils::unified_logger::{init_logger, AuditLog, FileAuditLog, LogAudit},
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

async fn run_history(
    gateway: &dyn ExchangeGateway,
    symbol: &str,
    interval: &str,
    limit: &str,
) -> Result<Vec<String>, ExchangeError> {
    let interval = Interval::from_string(interval)?;
    let limit: u32 = limit
        .trim()
        .parse()
        .map_err(|_| ExchangeError::ParseError(format!("Invalid limit: {}", limit)))?;
    reports::history_report(gateway, symbol, interval, limit).await
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // 加载环境变量
    dotenv::dotenv().ok();

    let matches = build_cli().get_matches();
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/bot.yaml");

    let config = BotConfig::load(config_file)?;
    if let Some(parent) = std::path::Path::new(&config.logging.file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建日志目录失败: {}", parent.display()))?;
        }
    }
    init_logger(&config.logging)?;
    log::info!("启动 perpbot, 配置文件: {}", config_file);

    let api_keys = match ApiKeys::from_env("BINANCE") {
        Ok(keys) => Some(keys),
        Err(e) => {
            log::warn!("⚠️ {}，只能使用行情查询命令", e);
            None
        }
    };
    let gateway = Arc::new(BinanceFuturesGateway::new(&config.exchange, api_keys)?);
    log::info!("使用合约接口: {}", gateway.base_url());

    match matches.subcommand() {
        Some(("history", sub_matches)) => {
            let symbol = sub_matches
                .get_one::<String>("SYMBOL")
                .map(String::as_str)
                .unwrap_or_default();
            let interval = sub_matches
                .get_one::<String>("INTERVAL")
                .map(String::as_str)
                .unwrap_or_default();
            let limit = sub_matches
                .get_one::<String>("LIMIT")
                .map(String::as_str)
                .unwrap_or_default();

            let result = run_history(gateway.as_ref(), symbol, interval, limit).await;

            match result {
                Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
                Err(e) => {
                    log::error!("获取历史K线失败: {}", e);
                    println!("Error fetching historical data: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Some(("fear-greed", _)) => {
            let timeout = Duration::from_secs(config.exchange.timeout_secs);
            match reports::fetch_fear_greed(reports::FEAR_GREED_URL, timeout).await {
                Ok(reading) => println!("{}", reading),
                Err(e) => {
                    log::error!("获取恐惧贪婪指数失败: {}", e);
                    println!("Error fetching Fear & Greed Index: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Some((command, sub_matches)) if ORDER_COMMANDS.contains(&command) => {
            let audit: Arc<dyn AuditLog> = match FileAuditLog::open(
                &config.logging.audit_file,
                config.logging.audit_max_size_mb,
            ) {
                Ok(audit) => Arc::new(audit),
                Err(e) => {
                    log::warn!("⚠️ 无法打开审计日志 {}: {}，只写入进程日志", config.logging.audit_file, e);
                    Arc::new(LogAudit)
                }
            };

            let gateway: Arc<dyn ExchangeGateway> = gateway;
            let engine = OrderEngine::bootstrap(gateway, audit.clone(), &config.orders).await;

            // 规则不可用时不解析参数，直接拒绝
            if !engine.rules().is_available() {
                println!("Error: could not retrieve trading rules");
                return Ok(ExitCode::FAILURE);
            }

            let intent = match intent_from_matches(command, sub_matches) {
                Ok(intent) => intent,
                Err(e) => {
                    audit.error(&format!("Invalid {} Order Input: {}", command, e));
                    println!("Error: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };

            match engine.place(&intent).await {
                Ok(result) => {
                    for line in render_result(&result) {
                        println!("{}", line);
                    }
                    if !result.all_succeeded() {
                        return Ok(ExitCode::FAILURE);
                    }
                }
                Err(e) => {
                    println!("Error: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        // subcommand_required 保证一定有已定义的子命令
        _ => unreachable!("clap 已拒绝未知或缺失的子命令"),
    }

    Ok(ExitCode::SUCCESS)
}
