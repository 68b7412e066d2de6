//! 探索 → 停止 → 展開 → 書き出しのビルドループ。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use rbook_polyglot::{BookEntry, write_book};

use crate::engine::Engine;
use crate::explore::{ExploreConfig, explore_tree};

/// multiwrite の初期しきい値。以後 2 倍ずつ増える。
const MULTIWRITE_START_THRESHOLD: u64 = 256;
/// このエントリ数以下しか得られないしきい値で multiwrite を打ち切る。
const MULTIWRITE_MIN_ENTRIES: usize = 2;

/// ビルドループの設定。
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// 再帰のしきい値 (multiwrite では無視される)
    pub visit_threshold: u64,
    /// 1 サイクルあたりの探索時間
    pub dump_interval: Duration,
    /// 出力先。multiwrite では `<output>-<threshold>n.bin` が派生する
    pub output: PathBuf,
    pub multiwrite: bool,
    pub print_tree: bool,
}

/// `running` が立っている間、探索と書き出しのサイクルを繰り返す。
///
/// 書き出しは毎回フルリライトで、展開がメモリ上で完了するまでファイル
/// には触らない。致命エラーは部分的な定跡を残さずそのまま上へ伝播する。
pub fn run_build_loop(engine: &mut Engine, cfg: &BuildConfig, running: &AtomicBool) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        info!("running search for {:?}", cfg.dump_interval);
        engine.start_search()?;
        std::thread::sleep(cfg.dump_interval);
        engine.stop_search()?;
        run_write_pass(engine, cfg)?;
    }
    Ok(())
}

/// 停止済みのエンジンに対して 1 サイクル分の展開と書き出しを行う。
pub fn run_write_pass(engine: &mut Engine, cfg: &BuildConfig) -> Result<()> {
    if cfg.multiwrite {
        // しきい値ごとに木全体を独立に展開し直す (しきい値間でエントリを
        // 再利用しない)。
        let mut threshold = MULTIWRITE_START_THRESHOLD;
        loop {
            let entries = probe_pass(engine, cfg, threshold)?;
            if entries.len() <= MULTIWRITE_MIN_ENTRIES {
                return Ok(());
            }
            write_entries(&multiwrite_path(&cfg.output, threshold), entries)?;
            threshold *= 2;
        }
    }
    let entries = probe_pass(engine, cfg, cfg.visit_threshold)?;
    write_entries(&cfg.output, entries)
}

fn probe_pass(engine: &mut Engine, cfg: &BuildConfig, threshold: u64) -> Result<Vec<BookEntry>> {
    info!("probing tree (visit threshold {threshold})");
    let explore_cfg = ExploreConfig { visit_threshold: threshold, print_tree: cfg.print_tree };
    let mut entries = Vec::new();
    explore_tree(&mut |path| engine.probe(path), &explore_cfg, &mut entries)?;
    Ok(entries)
}

/// しきい値サフィックス付きの multiwrite 出力パス。出力パス文字列に
/// `-<threshold>n.bin` を連結する。
fn multiwrite_path(output: &Path, threshold: u64) -> PathBuf {
    PathBuf::from(format!("{}-{}n.bin", output.display(), threshold))
}

fn write_entries(path: &Path, mut entries: Vec<BookEntry>) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_book(&mut entries, &mut writer)?;
    writer.flush()?;
    info!("wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}
