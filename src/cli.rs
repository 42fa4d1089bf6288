//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::csv_candle_adapter::CsvCandleAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_gateway::PaperGateway;
use crate::domain::error::TeletraderError;
use crate::domain::executor;
use crate::domain::interpreter::{parsing_stats, RuleSet, SignalInterpreter};
use crate::domain::ladder::Distributions;
use crate::domain::settings::{parse_distribution, validate_settings, TradeSettings};
use crate::domain::simulator::{self, BacktestWindow};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "teletrader", about = "Trade signal parser, backtester and executor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a signal file and print structured intents
    Parse {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Backtest a signal file against historical candles
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        signals: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Place order ladders for a signal file
    Execute {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        signals: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Parse { input } => run_parse(&input),
        Command::Backtest {
            config,
            signals,
            output,
        } => run_backtest(&config, &signals, output.as_ref()),
        Command::Execute { config, signals } => run_execute(&config, &signals),
    }
}

fn fail(err: &TeletraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Split a signal file into blocks separated by lines containing only `---`.
pub fn read_signal_blocks(path: &PathBuf) -> Result<Vec<String>, TeletraderError> {
    let content = fs::read_to_string(path)?;

    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        if line.trim() == "---" {
            push_block(&mut blocks, &mut current);
        } else {
            current.push(line);
        }
    }
    push_block(&mut blocks, &mut current);
    Ok(blocks)
}

fn push_block(blocks: &mut Vec<String>, current: &mut Vec<&str>) {
    let block = current.join("\n").trim().to_string();
    if !block.is_empty() {
        blocks.push(block);
    }
    current.clear();
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<TradeSettings, TeletraderError> {
    let mut distributions = Distributions::default();
    if let Some(value) = config.get_string("trading", "entry_distribution") {
        distributions.entry =
            parse_distribution(&value).map_err(|reason| TeletraderError::ConfigInvalid {
                section: "trading".into(),
                key: "entry_distribution".into(),
                reason,
            })?;
    }
    if let Some(value) = config.get_string("trading", "target_distribution") {
        distributions.target =
            parse_distribution(&value).map_err(|reason| TeletraderError::ConfigInvalid {
                section: "trading".into(),
                key: "target_distribution".into(),
                reason,
            })?;
    }

    let settings = TradeSettings {
        risk_pct: config.get_double("trading", "risk_pct", 2.0),
        default_size: config.get_double("trading", "default_size", 10.0),
        distributions,
    };
    validate_settings(&settings)?;
    Ok(settings)
}

fn parse_config_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<DateTime<Utc>, TeletraderError> {
    let value =
        config
            .get_string("backtest", key)
            .ok_or_else(|| TeletraderError::ConfigMissing {
                section: "backtest".into(),
                key: key.into(),
            })?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| TeletraderError::ConfigInvalid {
            section: "backtest".into(),
            key: key.into(),
            reason: "invalid date format (expected YYYY-MM-DD)".into(),
        })
}

pub fn build_window(config: &dyn ConfigPort) -> Result<BacktestWindow, TeletraderError> {
    let start = parse_config_date(config, "start_date")?;
    // End date is inclusive: extend to the end of that day
    let end = parse_config_date(config, "end_date")?
        + chrono::Duration::hours(23)
        + chrono::Duration::minutes(59)
        + chrono::Duration::seconds(59);

    if end < start {
        return Err(TeletraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "end_date".into(),
            reason: "end_date is before start_date".into(),
        });
    }

    Ok(BacktestWindow {
        start,
        end,
        interval: config
            .get_string("backtest", "interval")
            .unwrap_or_else(|| "1h".to_string()),
    })
}

pub fn build_market_data(
    config: &dyn ConfigPort,
) -> Result<Box<dyn MarketDataPort>, TeletraderError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.as_str() {
        "csv" => {
            let dir = config
                .get_string("data", "csv_dir")
                .unwrap_or_else(|| "./data".to_string());
            Ok(Box::new(CsvCandleAdapter::new(PathBuf::from(dir))))
        }
        "binance" => Ok(match config.get_string("data", "base_url") {
            Some(url) => Box::new(BinanceAdapter::new(url)),
            None => Box::new(BinanceAdapter::mainnet()),
        }),
        other => Err(TeletraderError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown data source: {}", other),
        }),
    }
}

fn build_interpreter() -> Result<SignalInterpreter, ExitCode> {
    SignalInterpreter::new(&RuleSet::default()).map_err(|e| fail(&e))
}

fn run_parse(input: &PathBuf) -> ExitCode {
    eprintln!("Reading signals from {}", input.display());
    let blocks = match read_signal_blocks(input) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };

    let interpreter = match build_interpreter() {
        Ok(i) => i,
        Err(code) => return code,
    };
    let intents = interpreter.batch_parse(blocks.iter().map(String::as_str));
    let stats = parsing_stats(&intents);

    match serde_json::to_string_pretty(&intents) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: failed to serialize intents: {e}");
            return ExitCode::from(1);
        }
    }

    eprintln!("\n=== Parse Summary ===");
    eprintln!("Signals:      {}", stats.total);
    eprintln!("Successful:   {}", stats.successful);
    eprintln!("Failed:       {}", stats.failed);
    eprintln!("Success Rate: {:.1}%", stats.success_rate);
    if !stats.error_counts.is_empty() {
        let mut errors: Vec<_> = stats.error_counts.iter().collect();
        errors.sort();
        eprintln!("\nErrors:");
        for (error, count) in errors {
            eprintln!("  {}: {}", error, count);
        }
    }
    ExitCode::SUCCESS
}

fn run_backtest(config_path: &PathBuf, signals_path: &PathBuf, output: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match build_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let window = match build_window(&config) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };
    let initial_balance = config.get_double("backtest", "initial_balance", 1000.0);

    // Stage 2: Parse signals
    eprintln!("Reading signals from {}", signals_path.display());
    let blocks = match read_signal_blocks(signals_path) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let interpreter = match build_interpreter() {
        Ok(i) => i,
        Err(code) => return code,
    };
    let intents = interpreter.batch_parse(blocks.iter().map(String::as_str));
    let stats = parsing_stats(&intents);
    eprintln!("Parsed {} signals ({} successful)", stats.total, stats.successful);

    // Stage 3: Simulate
    let market_data = match build_market_data(&config) {
        Ok(m) => m,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Running backtest: {} to {} ({} candles)",
        window.start.date_naive(),
        window.end.date_naive(),
        window.interval,
    );
    let report = simulator::run_backtest(
        &intents,
        &settings,
        initial_balance,
        &window,
        market_data.as_ref(),
    );

    // Stage 4: Console summary
    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Initial Balance:  {:.2}", report.initial_balance);
    eprintln!("Final Balance:    {:.2}", report.final_balance);
    eprintln!("Total PnL:        {:.2} ({:+.2}%)", report.total_pnl, report.total_pnl_pct);
    eprintln!("Total Trades:     {}", report.total_trades);
    eprintln!("Win Rate:         {:.1}%", report.win_rate);
    eprintln!("Max Drawdown:     -{:.1}%", report.max_drawdown);
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe_ratio);
    eprintln!("Profit Factor:    {:.2}", report.profit_factor);

    // Stage 5: Write report
    let json = match serde_json::to_string_pretty(&report) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("error: failed to serialize report: {e}");
            return ExitCode::from(1);
        }
    };
    match output {
        Some(path) => match fs::write(path, &json) {
            Ok(()) => {
                eprintln!("\nReport written to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to write report: {e}");
                ExitCode::from(1)
            }
        },
        None => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
    }
}

fn run_execute(config_path: &PathBuf, signals_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match build_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("Reading signals from {}", signals_path.display());
    let blocks = match read_signal_blocks(signals_path) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let interpreter = match build_interpreter() {
        Ok(i) => i,
        Err(code) => return code,
    };
    let intents = interpreter.batch_parse(blocks.iter().map(String::as_str));

    // Orders go to the in-memory paper gateway; a live gateway plugs in
    // through the same port
    let gateway = PaperGateway::new();
    let mut results = Vec::new();
    for intent in &intents {
        if !intent.is_success() {
            eprintln!(
                "warning: skipping unparseable signal ({})",
                intent.parse_errors.join(", ")
            );
            continue;
        }
        let result = executor::execute(intent, &settings, &gateway);
        eprintln!(
            "{}: size {:.4} at {}x, {} entries, {} targets, stop {}",
            result.symbol.as_deref().unwrap_or("?"),
            result.position_size,
            result.leverage,
            result.entry_orders.len(),
            result.target_orders.len(),
            if result.stop_order.is_some() { "set" } else { "none" },
        );
        results.push(result);
    }

    eprintln!("\n=== Execution Summary ===");
    eprintln!("Signals:        {}", intents.len());
    eprintln!("Executed:       {}", results.len());
    eprintln!(
        "Fully Placed:   {}",
        results.iter().filter(|r| r.fully_placed()).count()
    );
    eprintln!("Orders Placed:  {}", gateway.orders().len());

    match serde_json::to_string_pretty(&results) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize results: {e}");
            ExitCode::from(1)
        }
    }
}
