//! エンジンが報告する探索木の深さ優先展開。

use log::info;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Move, Position};

use rbook_polyglot::{BookEntry, move_code, position_key};

use crate::engine::ProbeResult;
use crate::error::{EngineError, EngineResult};

/// 展開の設定。
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    /// この訪問数に満たない子は記録もせず再帰もしない
    pub visit_threshold: u64,
    /// ノードごとに最善手をログへ出す
    pub print_tree: bool,
}

/// 初期局面からエンジンの木を展開し、Polyglot エントリを `entries` へ積む。
///
/// `probe` は初期局面からの手順を受け取り、そのノードの子統計を返す。
/// 空の結果は葉の合図で、そのノードのエントリは作らない。再帰は 1 手
/// ずつ手順を伸ばすだけなので、エンジンの木が有限なら必ず停止する
/// (同一局面が別手順で現れても手順違いの別ノードとして扱う)。
pub fn explore_tree<P>(
    probe: &mut P,
    cfg: &ExploreConfig,
    entries: &mut Vec<BookEntry>,
) -> EngineResult<()>
where
    P: FnMut(&[UciMove]) -> EngineResult<ProbeResult>,
{
    let mut path = Vec::new();
    explore_node(probe, cfg, &Chess::default(), &mut path, entries)
}

fn explore_node<P>(
    probe: &mut P,
    cfg: &ExploreConfig,
    pos: &Chess,
    path: &mut Vec<UciMove>,
    entries: &mut Vec<BookEntry>,
) -> EngineResult<()>
where
    P: FnMut(&[UciMove]) -> EngineResult<ProbeResult>,
{
    let children = probe(path)?;
    let Some((best, best_visits)) = best_child(&children) else {
        return Ok(());
    };
    if cfg.print_tree {
        info!("{}{} -> {}", "  ".repeat(path.len()), path_display(path), best);
    }
    let best_move = resolve_move(pos, &best)?;
    entries.push(BookEntry {
        key: position_key(pos),
        mv: move_code(&best_move),
        weight: visit_weight(best_visits),
        learn: 0,
    });
    for (uci, visits) in children {
        if visits < cfg.visit_threshold {
            continue;
        }
        let mv = resolve_move(pos, &uci)?;
        let child = pos
            .clone()
            .play(&mv)
            .map_err(|_| EngineError::IllegalMove { mv: uci.to_string() })?;
        path.push(uci);
        explore_node(probe, cfg, &child, path, entries)?;
        path.pop();
    }
    Ok(())
}

/// 最大訪問数の子。同数なら UCI 表記の辞書順で小さい方を採る
/// (決定的 tie-break)。
fn best_child(children: &ProbeResult) -> Option<(UciMove, u64)> {
    let mut best: Option<(&UciMove, u64)> = None;
    for (mv, visits) in children {
        let better = match &best {
            None => true,
            Some((best_mv, best_visits)) => {
                *visits > *best_visits
                    || (*visits == *best_visits && mv.to_string() < best_mv.to_string())
            }
        };
        if better {
            best = Some((mv, *visits));
        }
    }
    best.map(|(mv, visits)| (mv.clone(), visits))
}

/// dump が報告した UCI 手を現局面の合法手へ解決する。
fn resolve_move(pos: &Chess, uci: &UciMove) -> EngineResult<Move> {
    uci.to_move(pos).map_err(|_| EngineError::IllegalMove { mv: uci.to_string() })
}

/// 訪問数を 16bit 重みへ圧縮する (256 で割り、上限で飽和)。
pub(crate) fn visit_weight(visits: u64) -> u16 {
    (visits / 256).min(u64::from(u16::MAX)) as u16
}

fn path_display(path: &[UciMove]) -> String {
    if path.is_empty() {
        return "startpos".to_string();
    }
    path.iter().map(|mv| mv.to_string()).collect::<Vec<_>>().join(" ")
}
