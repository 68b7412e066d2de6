//! UCI エンジンプロセスのプロトコル driver。
//!
//! 汎用 UCI クライアントではない。`position startpos` + `go infinite` /
//! `stop` の最小サブセットと、探索木を任意局面で覗く非標準の `dumpnode`
//! 診断コマンドだけを話す。起動時の `uci` ハンドシェイクとオプション
//! 設定、終了時の `quit` はプロセス管理として持つ。

use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::LazyLock;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::debug;
use regex::Regex;
use shakmaty::uci::UciMove;

use crate::error::{EngineError, EngineResult};

/// 探索停止の完了を示す sentinel トークン。
pub const STOP_SENTINEL: &str = "bestmove";
/// dumpnode 応答の終端トークン。
pub const DUMP_SENTINEL: &str = "end-dump";

pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 1 ノード分の子統計。エンジンの報告順を保持する。
pub type ProbeResult = Vec<(UciMove, u64)>;

/// エンジンプロセス起動時の設定。
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// 追加の UCI オプション (Name=Value 形式)
    pub uci_options: Vec<String>,
}

/// エンジン stdout の所有状態。Idle ⇔ Searching の状態機械そのもの。
enum ReaderState {
    /// 探索停止中。読み取り側は Engine 本体が持つ。
    Idle(BufReader<ChildStdout>),
    /// `go infinite` 実行中。ドレインスレッドが読み取り側を持ち、
    /// bestmove を観測した時点で返却する。join がそのまま完了シグナル。
    Searching(JoinHandle<EngineResult<BufReader<ChildStdout>>>),
    /// 取り出し中、または致命エラー後の番兵。
    Detached,
}

/// 1 本のエンジンに対する入出力をカプセル化する。
///
/// 状態遷移は Idle → (`start_search`) → Searching → (`stop_search`) →
/// Idle のみ。`probe` は Idle でしか呼べない。状態違反はプログラミング
/// エラーとして即 panic する。
pub struct Engine {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    reader: ReaderState,
    opt_names: HashSet<String>,
}

impl Engine {
    /// エンジンを起動し、UCI ハンドシェイクとオプション設定まで済ませる。
    pub fn spawn(cfg: &EngineConfig) -> EngineResult<Self> {
        let mut cmd = Command::new(&cfg.path);
        if !cfg.args.is_empty() {
            cmd.args(&cfg.args);
        }
        let mut child = cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("engine stdin not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("engine stdout not piped"))?;
        let mut engine = Self {
            child,
            stdin: BufWriter::new(stdin),
            reader: ReaderState::Idle(BufReader::new(stdout)),
            opt_names: HashSet::new(),
        };
        engine.initialize(cfg)?;
        Ok(engine)
    }

    fn initialize(&mut self, cfg: &EngineConfig) -> EngineResult<()> {
        self.write_line("uci")?;
        loop {
            let line = self.read_response_line("uciok")?;
            if let Some(rest) = line.strip_prefix("option ") {
                if let Some(name) = parse_option_name(rest) {
                    self.opt_names.insert(name);
                }
            } else if line.trim() == "uciok" {
                break;
            }
        }
        for opt in &cfg.uci_options {
            match opt.split_once('=') {
                Some((name, value)) => self.set_option_if_available(name.trim(), value.trim())?,
                // "=" なしはオプション名のみとみなし、値なしで送る
                None => self.write_line(&format!("setoption name {}", opt.trim()))?,
            }
        }
        self.sync_ready()
    }

    fn sync_ready(&mut self) -> EngineResult<()> {
        self.write_line("isready")?;
        loop {
            if self.read_response_line("readyok")?.trim() == "readyok" {
                return Ok(());
            }
        }
    }

    /// 初期局面からの無制限探索を開始し、出力のドレインをバックグラウンド
    /// スレッドへ移す。Idle 状態でのみ呼べる。
    pub fn start_search(&mut self) -> EngineResult<()> {
        assert!(
            matches!(self.reader, ReaderState::Idle(_)),
            "start_search called while a search is active"
        );
        self.write_line("position startpos")?;
        self.write_line("go infinite")?;
        let ReaderState::Idle(reader) = std::mem::replace(&mut self.reader, ReaderState::Detached)
        else {
            unreachable!()
        };
        self.reader =
            ReaderState::Searching(std::thread::spawn(move || drain_search_output(reader)));
        Ok(())
    }

    /// `stop` を送り、ドレインスレッドが bestmove を観測して終了するまで
    /// ブロックする。タイムアウトは設けない方針で、応答しないエンジンは
    /// パイプ切断 (ConnectionLost) としてしか検出しない。
    pub fn stop_search(&mut self) -> EngineResult<()> {
        assert!(
            matches!(self.reader, ReaderState::Searching(_)),
            "stop_search called with no active search"
        );
        self.write_line("stop")?;
        let ReaderState::Searching(handle) =
            std::mem::replace(&mut self.reader, ReaderState::Detached)
        else {
            unreachable!()
        };
        let reader = match handle.join() {
            Ok(result) => result?,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        self.reader = ReaderState::Idle(reader);
        Ok(())
    }

    /// 指定手順で到達するノードの子統計を取得する。
    ///
    /// Idle 状態 (stop 完了後) でのみ呼べる。手順が空でもコマンドは
    /// `dumpnode moves` のまま送る。
    pub fn probe(&mut self, moves: &[UciMove]) -> EngineResult<ProbeResult> {
        assert!(
            matches!(self.reader, ReaderState::Idle(_)),
            "probe called while a search is active"
        );
        let mut cmd = String::from("dumpnode moves");
        for mv in moves {
            cmd.push(' ');
            cmd.push_str(&mv.to_string());
        }
        self.write_line(&cmd)?;
        let ReaderState::Idle(reader) = &mut self.reader else { unreachable!() };
        read_dump_children(reader)
    }

    fn read_response_line(&mut self, expected: &'static str) -> EngineResult<String> {
        let ReaderState::Idle(reader) = &mut self.reader else {
            unreachable!("responses are only read in Idle state")
        };
        read_line(reader, expected)
    }

    fn set_option_if_available(&mut self, name: &str, value: &str) -> EngineResult<()> {
        if self.opt_names.is_empty() || self.opt_names.contains(name) {
            self.write_line(&format!("setoption name {name} value {value}"))?;
        }
        Ok(())
    }

    pub fn write_line(&mut self, msg: &str) -> EngineResult<()> {
        self.stdin.write_all(msg.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.write_line("quit");
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// 1 行読む。EOF は期待 sentinel を添えて ConnectionLost。
fn read_line<R: BufRead>(reader: &mut R, expected: &'static str) -> EngineResult<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(EngineError::ConnectionLost { expected });
    }
    Ok(line)
}

/// 探索中の出力を bestmove 行まで読み、リーダーを返す。
///
/// 受信バッファを埋めてエンジンを詰まらせないことが主目的。info 行は
/// pv 以降を刈り取った要約だけを debug ログへ流す。
fn drain_search_output<R: BufRead>(mut reader: R) -> EngineResult<R> {
    loop {
        let line = read_line(&mut reader, STOP_SENTINEL)?;
        if line.contains(STOP_SENTINEL) {
            debug!("search stopped: {}", line.trim_end());
            return Ok(reader);
        }
        let summary = line.split(" pv").next().unwrap_or(&line);
        debug!("> {}", summary.trim_end());
    }
}

static DUMP_MOVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"move=(\S+)").unwrap());
static DUMP_VISITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bn=(\d+)").unwrap());

/// dumpnode 応答を end-dump 行まで解析する。
///
/// 途中の各行は `move=` と `n=` の両トークンを含まなければならない。
/// 欠けた行は値を推測せず ProtocolFault として中断する。
fn read_dump_children<R: BufRead>(reader: &mut R) -> EngineResult<ProbeResult> {
    let mut children = Vec::new();
    loop {
        let line = read_line(reader, DUMP_SENTINEL)?;
        if line.contains(DUMP_SENTINEL) {
            return Ok(children);
        }
        let mv_token = DUMP_MOVE.captures(&line).map(|c| c[1].to_string());
        let visits_token = DUMP_VISITS.captures(&line).map(|c| c[1].to_string());
        let (Some(mv_token), Some(visits_token)) = (mv_token, visits_token) else {
            return Err(protocol_fault("dump line without move=/n= tokens", &line));
        };
        let mv: UciMove = mv_token
            .parse()
            .map_err(|_| protocol_fault("unparseable move token in dump line", &line))?;
        let visits: u64 = visits_token
            .parse()
            .map_err(|_| protocol_fault("visit count out of range in dump line", &line))?;
        children.push((mv, visits));
    }
}

fn protocol_fault(context: &'static str, line: &str) -> EngineError {
    EngineError::Protocol { context, line: line.trim_end().to_string() }
}

/// `option name <Name> type ...` 行 (先頭の `option ` は除去済み) から
/// オプション名を取り出す。
fn parse_option_name(rest: &str) -> Option<String> {
    let rest = rest.trim_start().strip_prefix("name ")?;
    let name = match rest.split_once(" type ") {
        Some((name, _)) => name,
        None => rest,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn dump_parses_children_until_sentinel() {
        let mut input: &[u8] = b"move=e2e4 n=1000 q=0.51\nmove=d2d4 n=412 q=0.47\nend-dump\n";
        let children = read_dump_children(&mut input).unwrap();
        let rendered: Vec<(String, u64)> =
            children.into_iter().map(|(m, n)| (m.to_string(), n)).collect();
        assert_eq!(rendered, vec![("e2e4".to_string(), 1000), ("d2d4".to_string(), 412)]);
    }

    #[test]
    fn dump_without_sentinel_is_connection_lost() {
        let mut input: &[u8] = b"move=e2e4 n=1000\n";
        let err = read_dump_children(&mut input).unwrap_err();
        assert!(matches!(err, EngineError::ConnectionLost { expected } if expected == DUMP_SENTINEL));
    }

    #[test]
    fn dump_line_missing_tokens_is_a_protocol_fault() {
        // n= が無い
        let mut input: &[u8] = b"move=e2e4 visits=77\nend-dump\n";
        assert!(matches!(read_dump_children(&mut input), Err(EngineError::Protocol { .. })));

        // move= が無い
        let mut input: &[u8] = b"n=12 some comment\nend-dump\n";
        assert!(matches!(read_dump_children(&mut input), Err(EngineError::Protocol { .. })));
    }

    #[test]
    fn dump_rejects_unparseable_move_token() {
        let mut input: &[u8] = b"move=castles n=3\nend-dump\n";
        assert!(matches!(read_dump_children(&mut input), Err(EngineError::Protocol { .. })));
    }

    #[test]
    fn drain_stops_at_bestmove_and_returns_the_reader() {
        let input: &[u8] =
            b"info depth 1 nodes 10 pv e2e4\ninfo depth 2 nodes 99 pv e2e4 e7e5\nbestmove e2e4\nremainder\n";
        let mut rest = drain_search_output(input).unwrap();
        let mut tail = String::new();
        rest.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "remainder\n");
    }

    #[test]
    fn drain_without_bestmove_is_connection_lost() {
        let input: &[u8] = b"info depth 1 nodes 10\n";
        let err = drain_search_output(input).unwrap_err();
        assert!(matches!(err, EngineError::ConnectionLost { expected } if expected == STOP_SENTINEL));
    }

    #[test]
    fn option_names_end_at_the_type_keyword() {
        assert_eq!(
            parse_option_name("name Threads type spin default 1 min 1 max 128"),
            Some("Threads".to_string())
        );
        assert_eq!(
            parse_option_name("name Move Overhead type spin default 0"),
            Some("Move Overhead".to_string())
        );
        assert_eq!(parse_option_name("type spin default 1"), None);
    }
}
