//! 実行設定

use std::path::PathBuf;

use crate::cli::Args;
use crate::error::Result;
use crate::linker::LinkOptions;
use crate::scanner::NameFilter;

/// 照合の方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// ツリー内のファイル同士を照合する
    Tree,
    /// 指定ファイルとツリー内のファイルを照合する
    Update(PathBuf),
}

/// 標準出力に何を出すか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verbosity {
    /// ファイルごとの処理行
    pub actions: bool,
    /// 開始メッセージ
    pub banner: bool,
    /// 最終サマリー
    pub summary: bool,
}

/// 検証済みの実行設定
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub mode: Mode,
    pub filter: Option<NameFilter>,
    pub link: LinkOptions,
    pub output: Verbosity,
    /// ログの詳細度 (-v の数)
    pub log_verbosity: u8,
}

impl Config {
    /// 引数から設定を組み立てる
    ///
    /// Returns:
    ///     パターンが不正な場合は `Error::InvalidPattern`
    pub fn from_args(args: &Args) -> Result<Self> {
        let filter = args.pattern.as_deref().map(NameFilter::new).transpose()?;
        let silent = args.silent || args.quiet >= 2;

        Ok(Self {
            root: args.root.clone(),
            mode: match &args.update {
                Some(path) => Mode::Update(path.clone()),
                None => Mode::Tree,
            },
            filter,
            link: LinkOptions {
                write: args.write,
                symlink_only: args.symlink,
                absolute: args.absolute,
            },
            output: Verbosity {
                actions: args.quiet == 0 && !silent,
                banner: args.quiet == 0 && !silent,
                summary: !silent,
            },
            log_verbosity: args.verbose,
        })
    }

    /// -v を無視するか (警告は常に出る)
    pub fn quiet_logging(&self) -> bool {
        !self.output.summary
    }
}
