//! 指し手符号化と局面キー。

use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Chess, EnPassantMode, Move, Position, Role, Square};

/// 局面の Polyglot キーを返す。
///
/// shakmaty の Zobrist 実装は Polyglot 互換で、アンパッサン対象は実際に
/// 取れる敵ポーンがいる場合のみハッシュに含める (`EnPassantMode::Legal`)。
/// 同一局面なら導出手順に依らず同じキーになる。
pub fn position_key(pos: &Chess) -> u64 {
    let key: Zobrist64 = pos.zobrist_hash(EnPassantMode::Legal);
    key.0
}

/// 合法手を Polyglot の 16bit 符号に変換する。
///
/// キャスリングは移動先をキングの着地点ではなくルークの初期位置として
/// 符号化する。`Move::Castle` はキングとルーク双方のマスを保持している
/// ので、この置き換えは符号化時に完結する。
///
/// 渡された手がその局面で合法であることは呼び出し側の責任。
pub fn move_code(mv: &Move) -> u16 {
    match *mv {
        Move::Normal { from, to, promotion, .. } => pack(from, to, promotion),
        Move::EnPassant { from, to } => pack(from, to, None),
        Move::Castle { king, rook } => pack(king, rook, None),
        Move::Put { .. } => unreachable!("drops do not occur in standard chess"),
    }
}

fn pack(from: Square, to: Square, promotion: Option<Role>) -> u16 {
    u16::from(to) | (u16::from(from) << 6) | (promotion.map_or(0, promotion_code) << 12)
}

fn promotion_code(role: Role) -> u16 {
    match role {
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::Pawn | Role::King => unreachable!("illegal promotion target"),
    }
}

/// 16bit 符号を局面の合法手へ解決する。
///
/// キャスリング符号 (キング初期位置 → ルーク初期位置) はここで
/// `Move::Castle` に引き戻す。合致する合法手が無ければ `None`。
pub fn decode_move(pos: &Chess, code: u16) -> Option<Move> {
    let to = Square::new(u32::from(code & 0x3f));
    let from = Square::new(u32::from((code >> 6) & 0x3f));
    let promotion = match (code >> 12) & 0x7 {
        0 => None,
        1 => Some(Role::Knight),
        2 => Some(Role::Bishop),
        3 => Some(Role::Rook),
        4 => Some(Role::Queen),
        _ => return None,
    };
    pos.legal_moves().into_iter().find(|m| match *m {
        Move::Normal { from: f, to: t, promotion: p, .. } => f == from && t == to && p == promotion,
        Move::EnPassant { from: f, to: t } => promotion.is_none() && f == from && t == to,
        Move::Castle { king, rook } => promotion.is_none() && king == from && rook == to,
        Move::Put { .. } => false,
    })
}
