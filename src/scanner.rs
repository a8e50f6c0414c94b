//! ディレクトリツリーの探索とサイズ別グループ化

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// 探索で見つかったファイルの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// 正規化済みの絶対パス
    pub path: PathBuf,
    /// ファイルサイズ (バイト)
    pub size: u64,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }

    /// ファイル名部分のバイト長
    pub fn name_len(&self) -> usize {
        self.path.file_name().map(|n| n.len()).unwrap_or(0)
    }

    /// フルパスのバイト長
    pub fn path_len(&self) -> usize {
        self.path.as_os_str().len()
    }
}

/// ファイル名に対するglobフィルタ
///
/// パターンはファイル名部分のみに適用される (ディレクトリ部分は見ない)。
#[derive(Debug, Clone)]
pub struct NameFilter {
    matcher: GlobMatcher,
}

impl NameFilter {
    /// パターンをコンパイルする
    ///
    /// Args:
    ///     pattern: `*.so*` のようなシェル形式のパターン
    ///
    /// Returns:
    ///     不正なパターンの場合は `Error::InvalidPattern`
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = Glob::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    pub fn is_match(&self, file_name: &OsStr) -> bool {
        self.matcher.is_match(file_name)
    }
}

/// ファイルサイズをキーにしたグループ
///
/// 各グループ内の順序は探索順。
#[derive(Debug, Default)]
pub struct SizeBuckets {
    buckets: HashMap<u64, Vec<FileRecord>>,
    /// 対象として収集したファイル数
    pub scanned: usize,
    /// 読み取れずにスキップしたエントリ数
    pub skipped: usize,
}

impl SizeBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: FileRecord) {
        self.scanned += 1;
        self.buckets.entry(record.size).or_default().push(record);
    }

    /// サイズの種類数
    fn distinct_sizes(&self) -> usize {
        self.buckets.len()
    }

    /// 2つ以上のファイルを持つグループだけを取り出す
    ///
    /// サイズが一意なファイルは他と一致しようがないので、ここで捨てられハッシュ計算もされない。
    /// 返す順序はサイズの昇順。
    pub fn into_candidates(self) -> Vec<(u64, Vec<FileRecord>)> {
        let mut candidates: Vec<_> = self
            .buckets
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .collect();
        candidates.sort_unstable_by_key(|(size, _)| *size);
        candidates
    }
}

/// 探索ルートを絶対パスに正規化する
///
/// Returns:
///     存在しない、またはディレクトリでない場合は `Error::NotADirectory`
pub fn normalize_root(root: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(root).map_err(|_| Error::NotADirectory(root.to_path_buf()))?;
    if !canonical.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    Ok(canonical)
}

/// ツリー全体を探索してサイズ別にグループ化する
///
/// シンボリックリンク、ディレクトリ、空ファイル、フィルタに一致しないファイルは対象外。
/// 読み取れないエントリは警告を出してスキップする。
///
/// Args:
///     root: 探索開始ディレクトリ
///     filter: ファイル名フィルタ (任意)
///
/// Returns:
///     サイズ別グループ。ルートが不正な場合は `Error::NotADirectory`
pub fn scan_tree(root: &Path, filter: Option<&NameFilter>) -> Result<SizeBuckets> {
    let root = normalize_root(root)?;
    let mut buckets = SizeBuckets::new();
    let skipped = walk_files(&root, filter, |record| buckets.insert(record));
    buckets.skipped = skipped;
    log::info!(
        "scanned {}: {} files, {} distinct sizes, {} skipped",
        root.display(),
        buckets.scanned,
        buckets.distinct_sizes(),
        buckets.skipped
    );
    Ok(buckets)
}

/// 指定サイズのファイルだけを探索する (更新モード用)
///
/// Args:
///     root: 探索開始ディレクトリ
///     size: 一致させるファイルサイズ
///     filter: ファイル名フィルタ (任意)
///     exclude: 結果から除外するパス (更新対象ファイル自身など)
pub fn scan_same_size(
    root: &Path,
    size: u64,
    filter: Option<&NameFilter>,
    exclude: Option<&Path>,
) -> Result<Vec<FileRecord>> {
    let root = normalize_root(root)?;
    let mut found = Vec::new();
    walk_files(&root, filter, |record| {
        if record.size == size && exclude != Some(record.path.as_path()) {
            found.push(record);
        }
    });
    log::info!("found {} files of {} bytes in {}", found.len(), size, root.display());
    Ok(found)
}

/// 対象ファイルを探索順に `visit` へ渡し、スキップしたエントリ数を返す
fn walk_files<F>(root: &Path, filter: Option<&NameFilter>, mut visit: F) -> usize
where
    F: FnMut(FileRecord),
{
    let mut skipped = 0;

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                skipped += 1;
                continue;
            }
        };

        // follow_links(false) なのでシンボリックリンクはis_file()にならない
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(filter) = filter {
            if !filter.is_match(entry.file_name()) {
                continue;
            }
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                log::warn!("skipping {}: {}", entry.path().display(), e);
                skipped += 1;
                continue;
            }
        };

        if size == 0 {
            continue;
        }

        log::trace!("found {} ({} bytes)", entry.path().display(), size);
        visit(FileRecord::new(entry.into_path(), size));
    }

    skipped
}
