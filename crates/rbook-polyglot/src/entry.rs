//! 16 バイト固定レコードの読み書き。

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Polyglot エントリ (16 バイト)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookEntry {
    /// 局面の Polyglot Zobrist キー
    pub key: u64,
    /// 符号化された指し手
    pub mv: u16,
    /// 重み (訪問数を 256 で割って飽和させた値)
    pub weight: u16,
    /// 学習タグ。書き出し時は常に 0。
    pub learn: u32,
}

impl BookEntry {
    /// レコード長 (バイト)
    pub const SIZE: usize = 16;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<BigEndian>(self.key)?;
        w.write_u16::<BigEndian>(self.mv)?;
        w.write_u16::<BigEndian>(self.weight)?;
        w.write_u32::<BigEndian>(self.learn)
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            key: r.read_u64::<BigEndian>()?,
            mv: r.read_u16::<BigEndian>()?,
            weight: r.read_u16::<BigEndian>()?,
            learn: r.read_u32::<BigEndian>()?,
        })
    }
}

/// key 昇順に整列してから全件を書き出す。
///
/// 整列は安定ソートなので、同一 key のエントリは渡された順のまま残る
/// (フォーマットは重複 key 間の順序を規定しない)。出力は常に全件書き
/// 直しで、追記モードは無い。
pub fn write_book<W: Write>(entries: &mut [BookEntry], w: &mut W) -> io::Result<()> {
    entries.sort_by_key(|e| e.key);
    for entry in entries.iter() {
        entry.write_to(w)?;
    }
    Ok(())
}

/// ストリーム終端まで全エントリを読み込む。
///
/// 長さが 16 の倍数でないストリームは壊れた定跡として `InvalidData`。
pub fn read_book<R: Read>(r: &mut R) -> io::Result<Vec<BookEntry>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    if buf.len() % BookEntry::SIZE != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("book length {} is not a multiple of {}", buf.len(), BookEntry::SIZE),
        ));
    }
    let mut entries = Vec::with_capacity(buf.len() / BookEntry::SIZE);
    let mut cursor = &buf[..];
    while !cursor.is_empty() {
        entries.push(BookEntry::read_from(&mut cursor)?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_layout_is_big_endian() {
        let entry = BookEntry {
            key: 0x0102_0304_0506_0708,
            mv: 0x1234,
            weight: 0xabcd,
            learn: 0x0011_2233,
        };
        let mut buf = Vec::new();
        entry.write_to(&mut buf).unwrap();
        assert_eq!(
            buf,
            [
                0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // key
                0x12, 0x34, // move
                0xab, 0xcd, // weight
                0x00, 0x11, 0x22, 0x33, // learn
            ]
        );

        let mut cursor = &buf[..];
        assert_eq!(BookEntry::read_from(&mut cursor).unwrap(), entry);
    }

    #[test]
    fn write_book_sorts_by_key_and_keeps_duplicate_order() {
        let a = BookEntry { key: 2, mv: 10, weight: 1, learn: 0 };
        let b = BookEntry { key: 1, mv: 20, weight: 1, learn: 0 };
        let c = BookEntry { key: 2, mv: 30, weight: 1, learn: 0 };
        let mut entries = [a, b, c];
        let mut buf = Vec::new();
        write_book(&mut entries, &mut buf).unwrap();

        let read = read_book(&mut &buf[..]).unwrap();
        // key=2 の 2 件は入力の相対順のまま
        assert_eq!(read, vec![b, a, c]);
    }

    #[test]
    fn read_book_rejects_truncated_streams() {
        let entry = BookEntry { key: 7, mv: 7, weight: 7, learn: 7 };
        let mut buf = Vec::new();
        entry.write_to(&mut buf).unwrap();
        buf.extend_from_slice(&[0xff, 0xff, 0xff]);

        let err = read_book(&mut &buf[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn empty_stream_is_an_empty_book() {
        assert!(read_book(&mut &b""[..]).unwrap().is_empty());
    }
}
