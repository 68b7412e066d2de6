//! エンジン設定 (TOML ファイルと CLI フラグの統合)。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::engine::EngineConfig;

/// エンジン設定ファイル。
///
/// ```toml
/// path = "/opt/lc0/lc0"
/// args = ["--backend=cuda-fp16"]
///
/// [options]
/// Threads = 4
/// MinibatchSize = 256
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineFileConfig {
    /// エンジン実行ファイルへのパス
    pub path: Option<PathBuf>,
    /// エンジンプロセスへ渡す追加引数
    #[serde(default)]
    pub args: Vec<String>,
    /// UCI オプション (名前 → 値)。名前順で適用される。
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

pub fn load_engine_config(path: &Path) -> Result<EngineFileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read engine config at {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("failed to parse engine config at {}", path.display()))
}

/// 設定ファイルと CLI フラグを [`EngineConfig`] へ統合する。CLI が優先。
///
/// ファイル側の options は名前順で先に並び、CLI の `--uci-option` が後に
/// 続く (同名オプションはエンジン側で後勝ちになる)。
pub fn merge_engine_config(
    file: Option<EngineFileConfig>,
    cli_path: Option<PathBuf>,
    cli_args: Option<Vec<String>>,
    cli_options: Vec<String>,
) -> Result<EngineConfig> {
    let file = file.unwrap_or_default();
    let Some(path) = cli_path.or(file.path) else {
        bail!("engine path missing: pass --engine or set `path` in the engine config");
    };
    let args = match cli_args {
        Some(args) => args,
        None => file.args,
    };
    let mut uci_options: Vec<String> = file
        .options
        .iter()
        .map(|(name, value)| format!("{}={}", name, option_value(value)))
        .collect();
    uci_options.extend(cli_options);
    Ok(EngineConfig { path, args, uci_options })
}

/// TOML 値を setoption の値文字列へ。文字列は引用符を剥がして渡す。
fn option_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_args_and_options_table() {
        let cfg: EngineFileConfig = toml::from_str(
            r#"
path = "/opt/lc0/lc0"
args = ["--backend=eigen"]

[options]
Threads = 4
SyzygyPath = "/tb"
"#,
        )
        .unwrap();
        assert_eq!(cfg.path.as_deref(), Some(Path::new("/opt/lc0/lc0")));
        assert_eq!(cfg.args, vec!["--backend=eigen".to_string()]);

        let merged = merge_engine_config(Some(cfg), None, None, Vec::new()).unwrap();
        // 名前順、文字列値は引用符なし
        assert_eq!(
            merged.uci_options,
            vec!["SyzygyPath=/tb".to_string(), "Threads=4".to_string()]
        );
    }

    #[test]
    fn cli_flags_take_precedence_over_the_file() {
        let file = EngineFileConfig {
            path: Some(PathBuf::from("/file/engine")),
            args: vec!["--from-file".to_string()],
            options: BTreeMap::from([("Threads".to_string(), toml::Value::Integer(2))]),
        };
        let merged = merge_engine_config(
            Some(file),
            Some(PathBuf::from("/cli/engine")),
            None,
            vec!["MinibatchSize=256".to_string()],
        )
        .unwrap();

        assert_eq!(merged.path, PathBuf::from("/cli/engine"));
        // CLI が args を渡さないときだけファイル側を使う
        assert_eq!(merged.args, vec!["--from-file".to_string()]);
        // CLI オプションはファイル側の後に並ぶ (エンジン側で後勝ち)
        assert_eq!(
            merged.uci_options,
            vec!["Threads=2".to_string(), "MinibatchSize=256".to_string()]
        );
    }

    #[test]
    fn engine_path_is_required() {
        assert!(merge_engine_config(None, None, None, Vec::new()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<EngineFileConfig>("paht = \"/x\"\n").is_err());
    }
}
