//! ファイル内容のハッシュ計算

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// 読み込みブロックサイズ (64 KiB)
pub const BLOCK_SIZE: usize = 64 * 1024;

/// ファイル内容のダイジェスト (BLAKE3, 32バイト)
pub type Digest = blake3::Hash;

/// ファイル内容をブロック単位で読み込みながらハッシュを計算する
///
/// ファイル全体をメモリに載せることはない。
///
/// Args:
///     path: 対象ファイルのパス
///
/// Returns:
///     成功時はダイジェスト、読み取り失敗時は `Error::Unreadable`
pub fn hash_file(path: &Path) -> Result<Digest> {
    let unreadable = |source: io::Error| Error::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(unreadable(e)),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}
