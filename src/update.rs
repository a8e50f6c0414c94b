//! 更新モード: 指定した1ファイルと同一内容のファイルをツリーから探す

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hasher::hash_file;
use crate::matcher::LinkableSet;
use crate::scanner::{normalize_root, scan_same_size, FileRecord, NameFilter};

/// 更新対象ファイルを検証し、正規化したレコードを返す
///
/// 親ディレクトリだけを正規化するので、対象がシンボリックリンクでも解決されない。
/// シンボリックリンク、通常ファイル以外、空ファイルは `Error::InvalidTarget`。
pub fn validate_target(target: &Path) -> Result<FileRecord> {
    let invalid = |reason: &str| Error::InvalidTarget {
        path: target.to_path_buf(),
        reason: reason.to_string(),
    };

    let meta = fs::symlink_metadata(target).map_err(|_| invalid("does not exist"))?;
    if !meta.file_type().is_file() {
        return Err(invalid("is not a file"));
    }
    if meta.len() == 0 {
        return Err(invalid("is empty"));
    }

    let file_name = target.file_name().ok_or_else(|| invalid("is not a file"))?;
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = fs::canonicalize(&parent).map_err(|_| invalid("does not exist"))?;

    Ok(FileRecord::new(parent.join(file_name), meta.len()))
}

/// 更新対象ファイルと同一内容のファイル群を作る
///
/// 対象ファイル自体も集合に含まれ、残すファイルの選択では他と同じ扱いになる。
///
/// Args:
///     target: 更新対象ファイル
///     root: 探索開始ディレクトリ
///     filter: ファイル名フィルタ (任意)
///
/// Returns:
///     一致するファイルがなければNone
pub fn find_update_set(
    target: &Path,
    root: &Path,
    filter: Option<&NameFilter>,
) -> Result<Option<LinkableSet>> {
    normalize_root(root)?;
    let target = validate_target(target)?;
    let digest = hash_file(&target.path).map_err(|e| match e {
        Error::Unreadable { source, .. } => Error::InvalidTarget {
            path: target.path.clone(),
            reason: format!("cannot be read: {}", source),
        },
        other => other,
    })?;

    let candidates = scan_same_size(root, target.size, filter, Some(&target.path))?;
    let size = target.size;
    let mut files = vec![target];

    for candidate in candidates {
        match hash_file(&candidate.path) {
            Ok(d) if d == digest => files.push(candidate),
            Ok(_) => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    if files.len() < 2 {
        return Ok(None);
    }
    log::debug!("{} files identical to {}", files.len() - 1, files[0].path.display());
    Ok(Some(LinkableSet { size, files }))
}
