//! ランダムなエントリ集合のファイル書き出し / 読み戻し検証。

use std::fs::File;
use std::io::{BufWriter, Write};

use rand::Rng;
use rbook_polyglot::{BookEntry, read_book, write_book};

#[test]
fn written_books_read_back_in_key_order() {
    let mut rng = rand::rng();
    let mut entries: Vec<BookEntry> = (0..512)
        .map(|_| BookEntry {
            key: rng.random(),
            mv: rng.random(),
            weight: rng.random(),
            learn: 0,
        })
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.bin");
    {
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        write_book(&mut entries, &mut writer).unwrap();
        writer.flush().unwrap();
    }

    let read = read_book(&mut File::open(&path).unwrap()).unwrap();
    assert_eq!(read.len(), entries.len());
    assert!(read.windows(2).all(|w| w[0].key <= w[1].key));
    // write_book は入力スライス自体を整列させるので、読み戻しと一致する
    assert_eq!(read, entries);
}
