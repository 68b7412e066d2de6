use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use rbook_builder::build::{BuildConfig, run_build_loop};
use rbook_builder::config::{load_engine_config, merge_engine_config};
use rbook_builder::engine::Engine;

/// UCI エンジンの探索統計から Polyglot 定跡を焼き出すループツール。
///
/// # よく使う例
///
/// - 60 秒ごとに木を覗いて book.bin を上書き:
///   `book_builder --engine /opt/lc0/lc0 --output book.bin --visit-threshold 1000`
///
/// - しきい値 256 から倍々で複数ファイルを出力:
///   `book_builder --engine /opt/lc0/lc0 --output book --visit-threshold 256 --multiwrite`
///
/// Ctrl-C で現在のサイクル完了後に停止する。
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bake a Polyglot opening book from a UCI engine's in-memory search tree"
)]
struct Cli {
    /// Path to the UCI engine binary
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Extra arguments passed to the engine process
    #[arg(long, num_args = 1..)]
    engine_args: Option<Vec<String>>,

    /// Engine configuration file (TOML: path / args / [options])
    #[arg(long)]
    engine_config: Option<PathBuf>,

    /// UCI options to set (format: "Name=Value", can be specified multiple times)
    #[arg(long = "uci-option", num_args = 1..)]
    uci_options: Option<Vec<String>>,

    /// Output path for the book file
    #[arg(long)]
    output: PathBuf,

    /// Only write/recurse into moves whose node has at least this many visits
    /// (ignored by --multiwrite, which uses its own doubling sequence)
    #[arg(long)]
    visit_threshold: u64,

    /// Seconds to let each search run before probing the tree
    #[arg(long, default_value_t = 60)]
    dump_interval: u64,

    /// Log the best move of every probed node (may log a lot of text)
    #[arg(long, default_value_t = false)]
    print_tree: bool,

    /// Write one book per visit threshold, doubling from 256
    #[arg(long, default_value_t = false)]
    multiwrite: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let file_cfg = match &cli.engine_config {
        Some(path) => Some(load_engine_config(path)?),
        None => None,
    };
    let engine_cfg = merge_engine_config(
        file_cfg,
        cli.engine,
        cli.engine_args,
        cli.uci_options.unwrap_or_default(),
    )?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("failed to install the Ctrl-C handler")?;
    }

    info!("spawning engine: {}", engine_cfg.path.display());
    let mut engine = Engine::spawn(&engine_cfg)?;

    let build_cfg = BuildConfig {
        visit_threshold: cli.visit_threshold,
        dump_interval: Duration::from_secs(cli.dump_interval),
        output: cli.output,
        multiwrite: cli.multiwrite,
        print_tree: cli.print_tree,
    };
    run_build_loop(&mut engine, &build_cfg, &running)?;
    info!("stopped by request");
    Ok(())
}
