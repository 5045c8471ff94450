//! CLI entry point for the pair rebalancer.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use pairbalance::{PairConfig, Side};
use pairbalance_broker::binance::BinanceBroker;
use pairbalance_rebalancer::audit::AuditLog;
use pairbalance_rebalancer::config::{Config, ExchangeId};
use pairbalance_rebalancer::engine::{Engine, EngineOptions};
use pairbalance_rebalancer::error::{Error, Result};
use pairbalance_rebalancer::gateway::{RetryPolicy, Venue};
use pairbalance_rebalancer::notify::{LogNotifier, Notifiers, TelegramNotifier};
use pairbalance_rebalancer::scheduler::Scheduler;
use pairbalance_rebalancer::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Periodic per-pair spot rebalancer")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebalance every configured pair, forever
    Run {
        /// Run a single round and exit
        #[arg(long)]
        once: bool,
    },

    /// Show balance, drift and tracked order per pair
    Status,

    /// Reconcile tracked orders without trading
    Reconcile,

    /// Place one limit order, re-pricing on post-only rejection
    Place {
        /// Pair, e.g. ETH/USDT
        #[arg(long)]
        symbol: String,

        #[arg(long, value_enum)]
        side: SideArg,

        #[arg(long)]
        amount: f64,

        #[arg(long)]
        price: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

type LiveEngine = Engine<BinanceBroker, JsonFileStore, Notifiers>;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Command, config: Config) -> Result<()> {
    let mut engine = build_engine(&config)?;
    match command {
        Command::Run { once } => {
            let mut scheduler = Scheduler::new(engine, config.pairs, config.schedule);
            if once {
                scheduler.run_once()?;
                Ok(())
            } else {
                match scheduler.run()? {}
            }
        }
        Command::Status => {
            engine.connect()?;
            for pair in &config.pairs {
                print_status(&mut engine, pair)?;
            }
            Ok(())
        }
        Command::Reconcile => {
            engine.connect()?;
            for pair in &config.pairs {
                let r = engine.reconcile_pair(pair)?;
                println!("{:<12} {:?}", pair.symbol.to_string(), r.action);
            }
            Ok(())
        }
        Command::Place {
            symbol,
            side,
            amount,
            price,
        } => {
            let pair = config
                .pair(&symbol)
                .ok_or_else(|| Error::Config(format!("pair {symbol} is not configured")))?;
            engine.connect()?;
            let outcome = engine.place(pair, side.into(), amount, price)?;
            println!("{outcome:?}");
            Ok(())
        }
    }
}

fn build_engine(config: &Config) -> Result<LiveEngine> {
    let broker = match config.exchange.id {
        ExchangeId::Binance => BinanceBroker::new(
            &config.exchange.api_key,
            &config.exchange.secret_key,
            config.exchange.testnet,
        ),
    };
    let retry = RetryPolicy::new(
        config.exchange.request_retries,
        Duration::from_millis(config.exchange.retry_backoff_ms),
    );
    let venue = Venue::new(broker).with_retry(retry);
    let store = JsonFileStore::open(&config.store.dir)?;

    let mut notifiers = Notifiers::new()
        .with(LogNotifier)
        .with(AuditLog::open(&config.audit_path())?);
    if let Some(tg) = &config.telegram {
        notifiers = notifiers.with(TelegramNotifier::new(&tg.bot_token, &tg.chat_id));
    }
    info!(
        "Exchange {:?} (testnet: {}), {} pairs, {} notification sinks",
        config.exchange.id,
        config.exchange.testnet,
        config.pairs.len(),
        notifiers.len()
    );

    let options = EngineOptions {
        post_only: config.exchange.post_only,
        max_post_only_retries: config.execution.max_post_only_retries,
    };
    Ok(Engine::new(venue, store, notifiers, options))
}

fn print_status(engine: &mut LiveEngine, pair: &PairConfig) -> Result<()> {
    let s = engine.status(pair)?;
    println!("{}", pair.symbol);
    println!(
        "  {:<6} free {:>16.8}  used {:>16.8}",
        pair.symbol.base(),
        s.balance.base.free,
        s.balance.base.used
    );
    println!(
        "  {:<6} free {:>16.8}  used {:>16.8}",
        pair.symbol.quote(),
        s.balance.quote.free,
        s.balance.quote.used
    );
    println!(
        "  price {:.8}  value {:.2}  target {:.2}  drift {:.2} (min {:.2})  execute: {}",
        s.price,
        s.evaluation.value_diff,
        pair.condition_value,
        s.evaluation.total_diff_value,
        pair.min_diff_value,
        s.evaluation.should_execute
    );
    match s.stick.open_order_id() {
        Some(id) => println!(
            "  tracking {} order {id} @ {}",
            s.stick.order_side.map(|side| side.to_string()).unwrap_or_default(),
            s.stick.price.unwrap_or_default()
        ),
        None => println!("  no open order tracked"),
    }
    Ok(())
}
