//! エンジン通信のエラー型。

use std::io;

use thiserror::Error;

/// エンジンとの通信で起こりうる致命エラー。
///
/// どの variant も現在の実行を中断させる。プロトコル上の期待が破れた
/// ときに値を推測して続行することはない。probe が空の結果を返すのは
/// エラーではなく葉ノードの正常な合図なので、ここには現れない。
#[derive(Debug, Error)]
pub enum EngineError {
    /// 期待したトークンを含まない応答行
    #[error("malformed engine response ({context}): {line:?}")]
    Protocol { context: &'static str, line: String },

    /// sentinel より前に出力ストリームが閉じた
    #[error("engine closed its output stream while waiting for `{expected}`")]
    ConnectionLost { expected: &'static str },

    /// エンジンが現局面で非合法な手を報告した
    #[error("engine reported illegal move `{mv}` for the probed position")]
    IllegalMove { mv: String },

    /// パイプ入出力の失敗
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// エンジン通信の Result 型
pub type EngineResult<T> = Result<T, EngineError>;
