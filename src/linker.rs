//! 同一内容ファイルのリンク置換

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use crate::matcher::LinkableSet;
use crate::scanner::FileRecord;

/// リンク置換の動作設定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOptions {
    /// 実際にファイルシステムを変更する (falseならドライラン)
    pub write: bool,
    /// ハードリンクを試さずシンボリックリンクのみ作成する
    pub symlink_only: bool,
    /// シンボリックリンクの参照先を絶対パスにする
    pub absolute: bool,
}

/// リンク置換で使うファイルシステム操作
///
/// テストではこれを差し替えて失敗を再現する。
pub trait FileSystem {
    /// 2つのパスが同一inodeを指しているか
    fn same_file(&self, a: &Path, b: &Path) -> io::Result<bool>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()>;
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// 実ファイルシステム
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn same_file(&self, a: &Path, b: &Path) -> io::Result<bool> {
        is_same_inode(a, b)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        fs::hard_link(original, link)
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }

    /// 内容とパーミッションに加えて更新日時も引き継ぐ
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to)?;
        let meta = fs::metadata(from)?;
        if let Err(e) = filetime::set_file_mtime(to, FileTime::from_last_modification_time(&meta)) {
            log::debug!("cannot keep mtime of {}: {}", to.display(), e);
        }
        Ok(())
    }
}

/// 2つのファイルが既に同一inode (ハードリンク済み) か確認する
///
/// Args:
///     path1: 比較対象のパス1
///     path2: 比較対象のパス2
///
/// Returns:
///     同一inodeならtrue
#[cfg(unix)]
pub fn is_same_inode(path1: &Path, path2: &Path) -> io::Result<bool> {
    let meta1 = fs::metadata(path1)?;
    let meta2 = fs::metadata(path2)?;
    Ok(meta1.dev() == meta2.dev() && meta1.ino() == meta2.ino())
}

#[cfg(not(unix))]
pub fn is_same_inode(path1: &Path, path2: &Path) -> io::Result<bool> {
    Ok(fs::canonicalize(path1)? == fs::canonicalize(path2)?)
}

/// ディレクトリ `from_dir` から `to` への相対パスを求める
///
/// 両方とも絶対パス (または同じ基準の相対パス) であること。
/// `to` が `from_dir` 自身なら空のパスを返す。
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

/// `link` に作るシンボリックリンクの参照先を決める
///
/// 相対指定の場合は `link` の親ディレクトリから `survivor` への相対パス。
/// 親ディレクトリが同じならファイル名だけになる。
pub fn symlink_target(survivor: &Path, link: &Path, absolute: bool) -> PathBuf {
    if absolute {
        return survivor.to_path_buf();
    }
    match link.parent() {
        Some(parent) => relative_path(parent, survivor),
        None => survivor.to_path_buf(),
    }
}

/// 1つの同一内容ファイル群に対する置換計画
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    /// 実体として残すファイル
    pub survivor: FileRecord,
    /// リンクに置き換えるファイル (ソート順)
    pub replaced: Vec<FileRecord>,
}

impl LinkPlan {
    /// 残すファイルを選ぶ
    ///
    /// (ファイル名の長さ, フルパスの長さ) の昇順に安定ソートし、最後の要素を残す。
    /// `libfoo.so.1.0` と `libfoo.so` なら前者が残る。
    ///
    /// Returns:
    ///     ファイルが2つ未満ならNone
    pub fn new(set: LinkableSet) -> Option<Self> {
        if set.files.len() < 2 {
            return None;
        }
        let mut files = set.files;
        files.sort_by_key(|f| (f.name_len(), f.path_len()));
        let survivor = files.pop()?;
        Some(Self {
            survivor,
            replaced: files,
        })
    }
}

/// 1ファイルの置換結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// ハードリンクに置換した
    Hardlinked,
    /// シンボリックリンクに置換した (参照先)
    Symlinked(PathBuf),
    /// ドライランのため置換しなかった
    WouldLink,
    /// 既に同一inode
    AlreadyLinked,
    /// 削除に失敗したため手を付けなかった
    UnlinkFailed(String),
    /// リンク作成に失敗し、実体のコピーで復元した
    Restored(String),
    /// 復元にも失敗した (データ消失の可能性)
    RestoreFailed(String),
    /// 状態確認に失敗した
    Failed(String),
}

impl LinkOutcome {
    /// 統計に計上するリンクかどうか
    pub fn is_link(&self) -> bool {
        matches!(
            self,
            LinkOutcome::Hardlinked | LinkOutcome::Symlinked(_) | LinkOutcome::WouldLink
        )
    }
}

/// リンク置換の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// リンクに置き換えたファイル数
    pub links: usize,
    /// 削減したバイト数
    pub bytes_saved: u64,
    /// 既にリンク済みだったファイル数 (links / bytes_saved には含まない)
    pub already_linked: usize,
    /// 置換できなかったファイル数
    pub failed: usize,
    /// 復元に失敗したファイル数
    pub data_loss: usize,
}

impl LinkStats {
    pub fn record(&mut self, outcome: &LinkOutcome, size: u64) {
        if outcome.is_link() {
            self.links += 1;
            self.bytes_saved += size;
            return;
        }
        match outcome {
            LinkOutcome::AlreadyLinked => self.already_linked += 1,
            LinkOutcome::RestoreFailed(_) => {
                self.failed += 1;
                self.data_loss += 1;
            }
            _ => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &LinkStats) {
        self.links += other.links;
        self.bytes_saved += other.bytes_saved;
        self.already_linked += other.already_linked;
        self.failed += other.failed;
        self.data_loss += other.data_loss;
    }
}

/// リンク置換の実行器
#[derive(Debug, Clone)]
pub struct Linker<F = RealFileSystem> {
    fs: F,
    options: LinkOptions,
}

impl Linker<RealFileSystem> {
    pub fn new(options: LinkOptions) -> Self {
        Self::with_fs(RealFileSystem, options)
    }
}

impl<F: FileSystem> Linker<F> {
    pub fn with_fs(fs: F, options: LinkOptions) -> Self {
        Self { fs, options }
    }

    /// 同一内容ファイル群を計画・置換する
    ///
    /// Args:
    ///     set: 同一内容ファイル群
    ///     on_outcome: (置換対象, 残すファイル, 結果) ごとに呼ばれる
    ///
    /// Returns:
    ///     このファイル群の統計
    pub fn link_set<C>(&self, set: LinkableSet, mut on_outcome: C) -> LinkStats
    where
        C: FnMut(&FileRecord, &FileRecord, &LinkOutcome),
    {
        let mut stats = LinkStats::default();
        let Some(plan) = LinkPlan::new(set) else {
            return stats;
        };

        for member in &plan.replaced {
            let outcome = self.link_member(&plan.survivor, member);
            stats.record(&outcome, plan.survivor.size);
            on_outcome(member, &plan.survivor, &outcome);
        }
        stats
    }

    /// 1ファイルを `survivor` へのリンクに置き換える
    ///
    /// 削除後にハードリンクを試し、失敗すればシンボリックリンクを作る。
    /// シンボリックリンクも作れなければ `survivor` の内容をコピーして元に戻す。
    pub fn link_member(&self, survivor: &FileRecord, member: &FileRecord) -> LinkOutcome {
        match self.fs.same_file(&survivor.path, &member.path) {
            Ok(true) => return LinkOutcome::AlreadyLinked,
            Ok(false) => {}
            Err(e) => return LinkOutcome::Failed(e.to_string()),
        }

        if !self.options.write {
            return LinkOutcome::WouldLink;
        }

        if let Err(e) = self.fs.remove_file(&member.path) {
            return LinkOutcome::UnlinkFailed(e.to_string());
        }

        if !self.options.symlink_only {
            match self.fs.hard_link(&survivor.path, &member.path) {
                Ok(()) => return LinkOutcome::Hardlinked,
                Err(e) => log::debug!(
                    "could not create hardlink {}, symlink instead: {}",
                    member.path.display(),
                    e
                ),
            }
        }

        let target = symlink_target(&survivor.path, &member.path, self.options.absolute);
        match self.fs.symlink(&target, &member.path) {
            Ok(()) => LinkOutcome::Symlinked(target),
            Err(e) => self.restore(survivor, member, e),
        }
    }

    fn restore(&self, survivor: &FileRecord, member: &FileRecord, cause: io::Error) -> LinkOutcome {
        match self.fs.copy(&survivor.path, &member.path) {
            Ok(()) => LinkOutcome::Restored(format!("symlink failed: {}", cause)),
            Err(e) => LinkOutcome::RestoreFailed(format!(
                "symlink failed: {} (restore from {} failed: {})",
                cause,
                survivor.path.display(),
                e
            )),
        }
    }
}
