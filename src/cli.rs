//! 命令行定义和参数到交易意图的转换

use clap::{Arg, ArgMatches, Command};

use crate::core::error::OrderError;
use crate::core::types::OrderSide;
use crate::orders::intent::{
    parse_duration, parse_levels, parse_price, parse_quantity, parse_side, OrderIntent,
};
use crate::orders::result::{StrategyResult, SubmissionResult};

pub const ORDER_COMMANDS: [&str; 6] = ["market", "limit", "stop-limit", "oco", "twap", "grid"];

fn positional(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .value_name(name)
        .help(help)
        .required(true)
        .allow_hyphen_values(true)
}

fn side_arg() -> Arg {
    positional("SIDE", "buy 或 sell")
}

fn symbol_arg() -> Arg {
    positional("SYMBOL", "U本位永续合约交易对，例如 BTCUSDT")
}

/// 构建命令行
pub fn build_cli() -> Command {
    Command::new("perpbot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("币安U本位合约下单工具")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .default_value("config/bot.yaml")
                .global(true),
        )
        .subcommand(
            Command::new("market")
                .about("市价单")
                .arg(side_arg())
                .arg(symbol_arg())
                .arg(positional("QUANTITY", "数量")),
        )
        .subcommand(
            Command::new("limit")
                .about("限价单 (GTC)")
                .arg(side_arg())
                .arg(symbol_arg())
                .arg(positional("QUANTITY", "数量"))
                .arg(positional("PRICE", "限价")),
        )
        .subcommand(
            Command::new("stop-limit")
                .about("止损限价单")
                .arg(side_arg())
                .arg(symbol_arg())
                .arg(positional("QUANTITY", "数量"))
                .arg(positional("STOP_PRICE", "触发价"))
                .arg(positional("LIMIT_PRICE", "限价")),
        )
        .subcommand(
            Command::new("oco")
                .about("合成 OCO：止盈 + 止损两笔只减仓条件单")
                .arg(side_arg())
                .arg(symbol_arg())
                .arg(positional("QUANTITY", "数量"))
                .arg(positional("TAKE_PROFIT", "止盈触发价"))
                .arg(positional("STOP_LOSS", "止损触发价")),
        )
        .subcommand(
            Command::new("twap")
                .about("TWAP：总量拆成 10 笔市价单在时长内均匀提交")
                .arg(side_arg())
                .arg(symbol_arg())
                .arg(positional("TOTAL_QUANTITY", "总数量"))
                .arg(positional("DURATION", "总时长（秒）")),
        )
        .subcommand(
            Command::new("grid")
                .about("网格：在价格区间内等距挂限价单")
                .arg(symbol_arg())
                .arg(positional("LOW_PRICE", "区间下沿"))
                .arg(positional("HIGH_PRICE", "区间上沿"))
                .arg(positional("LEVELS", "档数（至少 2）"))
                .arg(positional("QUANTITY", "每档数量"))
                .arg(
                    Arg::new("side")
                        .long("side")
                        .value_name("SIDE")
                        .help("网格方向，默认 buy")
                        .default_value("buy"),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("历史K线")
                .arg(symbol_arg())
                .arg(positional("INTERVAL", "K线周期，例如 1m、1h、1d"))
                .arg(positional("LIMIT", "K线数量")),
        )
        .subcommand(Command::new("fear-greed").about("加密货币恐惧贪婪指数"))
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

/// 把下单子命令的参数转换为交易意图
///
/// 只做文本解析，交易规则相关的检查由校验器完成。
pub fn intent_from_matches(command: &str, matches: &ArgMatches) -> Result<OrderIntent, OrderError> {
    let symbol = value(matches, "SYMBOL").to_string();

    let intent = match command {
        "market" => OrderIntent::Market {
            symbol,
            side: parse_side(value(matches, "SIDE"))?,
            quantity: parse_quantity("quantity", value(matches, "QUANTITY"))?,
        },
        "limit" => OrderIntent::Limit {
            symbol,
            side: parse_side(value(matches, "SIDE"))?,
            quantity: parse_quantity("quantity", value(matches, "QUANTITY"))?,
            price: parse_price("price", "price", value(matches, "PRICE"))?,
        },
        "stop-limit" => OrderIntent::StopLimit {
            symbol,
            side: parse_side(value(matches, "SIDE"))?,
            quantity: parse_quantity("quantity", value(matches, "QUANTITY"))?,
            stop_price: parse_price("stop_price", "stop price", value(matches, "STOP_PRICE"))?,
            limit_price: parse_price("limit_price", "limit price", value(matches, "LIMIT_PRICE"))?,
        },
        "oco" => OrderIntent::SyntheticOco {
            symbol,
            side: parse_side(value(matches, "SIDE"))?,
            quantity: parse_quantity("quantity", value(matches, "QUANTITY"))?,
            take_profit_price: parse_price(
                "take_profit_price",
                "take-profit price",
                value(matches, "TAKE_PROFIT"),
            )?,
            stop_loss_price: parse_price(
                "stop_loss_price",
                "stop-loss price",
                value(matches, "STOP_LOSS"),
            )?,
        },
        "twap" => OrderIntent::Twap {
            symbol,
            side: parse_side(value(matches, "SIDE"))?,
            total_quantity: parse_quantity("quantity", value(matches, "TOTAL_QUANTITY"))?,
            duration_secs: parse_duration(value(matches, "DURATION"))?,
        },
        "grid" => OrderIntent::Grid {
            symbol,
            side: match matches.get_one::<String>("side") {
                Some(side) => parse_side(side)?,
                None => OrderSide::Buy,
            },
            low_price: parse_price("low_price", "low price", value(matches, "LOW_PRICE"))?,
            high_price: parse_price("high_price", "high price", value(matches, "HIGH_PRICE"))?,
            levels: parse_levels(value(matches, "LEVELS"))?,
            quantity_per_level: parse_quantity("quantity", value(matches, "QUANTITY"))?,
        },
        other => {
            return Err(OrderError::rejected(
                "command",
                format!("Unknown order type '{}'.", other),
            ))
        }
    };

    Ok(intent)
}

/// 策略结果的输出行
pub fn render_result(result: &StrategyResult) -> Vec<String> {
    let mut lines = vec!["Order Placed:".to_string()];

    for leg in &result.legs {
        let client_id = leg.request.client_order_id.as_deref().unwrap_or("-");
        let line = match &leg.result {
            SubmissionResult::Success(ack) => format!(
                "  [{}] {} -> Order ID: {}, Status: {}",
                leg.label, client_id, ack.order_id, ack.status
            ),
            SubmissionResult::Failure(err) => {
                format!("  [{}] {} -> Error: {}", leg.label, client_id, err)
            }
        };
        lines.push(line);
    }

    lines.push(result.summary().to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(args: &[&str]) -> Result<OrderIntent, OrderError> {
        let matches = build_cli()
            .try_get_matches_from(std::iter::once("perpbot").chain(args.iter().copied()))
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        intent_from_matches(name, sub)
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_market_args() {
        let intent = parse(&["market", "BUY", "btcusdt", "0.01"]).unwrap();
        assert_eq!(
            intent,
            OrderIntent::Market {
                symbol: "btcusdt".to_string(),
                side: OrderSide::Buy,
                quantity: dec!(0.01),
            }
        );
    }

    #[test]
    fn test_grid_side_defaults_to_buy() {
        let intent = parse(&["grid", "BTCUSDT", "100", "110", "3", "0.002"]).unwrap();
        assert_eq!(intent.side(), OrderSide::Buy);

        let intent =
            parse(&["grid", "BTCUSDT", "100", "110", "3", "0.002", "--side", "sell"]).unwrap();
        assert_eq!(intent.side(), OrderSide::Sell);
    }

    #[test]
    fn test_parse_errors_carry_field() {
        let err = parse(&["limit", "hold", "BTCUSDT", "1", "100"]).unwrap_err();
        assert_eq!(err.field(), Some("side"));

        let err = parse(&["stop-limit", "buy", "BTCUSDT", "1", "x", "100"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid stop price.");

        let err = parse(&["twap", "buy", "BTCUSDT", "1", "ten"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid duration.");
    }

    #[test]
    fn test_missing_positional_is_a_usage_error() {
        assert!(build_cli()
            .try_get_matches_from(["perpbot", "market", "buy", "BTCUSDT"])
            .is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(build_cli().try_get_matches_from(["perpbot"]).is_err());
        assert!(build_cli()
            .try_get_matches_from(["perpbot", "cancel", "BTCUSDT"])
            .is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let matches = build_cli()
            .try_get_matches_from(["perpbot", "fear-greed", "--config", "custom.yaml"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("config").map(String::as_str),
            Some("custom.yaml")
        );
    }
}
