//! UCI エンジンの探索木を覗いて Polyglot 定跡を焼き出すライブラリ。
//!
//! エンジンはサブプロセスとして常駐させ、`go infinite` → `stop` →
//! `dumpnode` のサイクルで木の統計を吸い出す。プロトコル driver は
//! [`engine`]、深さ優先の展開は [`explore`]、ビルドループは [`build`]、
//! 設定の統合は [`config`]。フォーマット本体は `rbook-polyglot` 側。

pub mod build;
pub mod config;
pub mod engine;
pub mod error;
pub mod explore;

pub use build::{BuildConfig, run_build_loop, run_write_pass};
pub use config::{EngineFileConfig, load_engine_config, merge_engine_config};
pub use engine::{Engine, EngineConfig, ProbeResult};
pub use error::{EngineError, EngineResult};
pub use explore::{ExploreConfig, explore_tree};
