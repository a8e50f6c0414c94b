//! エラー定義

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// ライブラリ全体で使うエラー
///
/// `Unreadable` だけはファイル単位のエラーで、呼び出し側は警告を出して該当ファイルを除外する。
/// それ以外は実行全体を中断する。
#[derive(Debug, Error)]
pub enum Error {
    /// 探索ルートが存在しない、またはディレクトリではない
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// 更新モードの対象ファイルが不正
    #[error("{}: {reason}", path.display())]
    InvalidTarget { path: PathBuf, reason: String },

    /// ファイル名パターンが不正
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// ファイルの読み取りに失敗した
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 照合用のスレッドプールを起動できなかった
    #[error("cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
