//! Polyglot 定跡フォーマット
//!
//! Polyglot 形式 (https://hardy.uhasselt.be/Toga/book_format.html) の
//! エントリ符号化・復号を提供する。ファイルはヘッダもフッタも持たず、
//! 固定長レコードが key 昇順に並ぶだけの構造で、終端 = ファイル終端。
//!
//! # レコード形式 (16 バイト / エントリ、全フィールド BE)
//!
//! | フィールド | サイズ | 説明                                     |
//! |------------|--------|------------------------------------------|
//! | key        | 8      | 局面の Zobrist ハッシュ (u64)            |
//! | move       | 2      | 符号化された指し手 (u16)                 |
//! | weight     | 2      | 重み。訪問数に比例 (u16)                 |
//! | learn      | 4      | 学習タグ。本クレートでは常に 0 (u32)     |
//!
//! # 指し手符号化
//!
//! bit 0-5 = 移動先、bit 6-11 = 移動元、bit 12-14 = 成り
//! (0=なし, 1=ナイト, 2=ビショップ, 3=ルーク, 4=クイーン)。
//! キャスリングは「キングの初期位置 → ルークの初期位置」として
//! 符号化される点が UCI 表記と異なる。詳細は [`encode`]。

pub mod encode;
pub mod entry;

pub use encode::{decode_move, move_code, position_key};
pub use entry::{BookEntry, read_book, write_book};
