//! コマンドライン引数のパース

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// 同一内容のファイルを1つの実体へのリンクに置き換えるツール
///
/// 同一内容のファイル群ごとに、ファイル名が最も長いものを実体として残し、
/// 残りをハードリンク (失敗時はシンボリックリンク) に置き換える。
#[derive(Parser, Debug)]
#[command(name = "linksame")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 探索対象のディレクトリ (デフォルト: カレントディレクトリ)
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// 実際にリンクを書き込む (指定しなければドライラン)
    #[arg(short, long)]
    pub write: bool,

    /// シンボリックリンクのみを使う
    #[arg(short, long)]
    pub symlink: bool,

    /// シンボリックリンクの参照先を絶対パスにする
    #[arg(short, long)]
    pub absolute: bool,

    /// このパターンに一致するファイル名だけを対象にする (例: "libfoo*")
    #[arg(short, long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// ファイルごとの出力を抑制する (-qq でサマリーも抑制)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// 何も出力しない (-qq と同じ)
    #[arg(long)]
    pub silent: bool,

    /// 指定ファイルと同一内容のファイルだけをリンクする
    #[arg(short, long, value_name = "FILE")]
    pub update: Option<PathBuf>,

    /// ログの詳細度 (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// 引数をパースして返す
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["linksame"]);
        assert_eq!(args.root, PathBuf::from("."));
        assert!(!args.write);
        assert!(!args.symlink);
        assert!(!args.absolute);
        assert!(args.pattern.is_none());
        assert_eq!(args.quiet, 0);
        assert!(!args.silent);
        assert!(args.update.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_write_short() {
        let args = Args::parse_from(["linksame", "-w"]);
        assert!(args.write);
    }

    #[test]
    fn test_write_long() {
        let args = Args::parse_from(["linksame", "--write"]);
        assert!(args.write);
    }

    #[test]
    fn test_quiet_counts() {
        let args = Args::parse_from(["linksame", "-qq"]);
        assert_eq!(args.quiet, 2);
    }

    #[test]
    fn test_pattern_and_update() {
        let args = Args::parse_from(["linksame", "-p", "*.so*", "-u", "/tmp/libx.so", "/usr/lib"]);
        assert_eq!(args.pattern.as_deref(), Some("*.so*"));
        assert_eq!(args.update, Some(PathBuf::from("/tmp/libx.so")));
        assert_eq!(args.root, PathBuf::from("/usr/lib"));
    }

    #[test]
    fn test_all_flags() {
        let args = Args::parse_from(["linksame", "-w", "-s", "-a", "--silent", "-vv", "/custom/path"]);
        assert!(args.write);
        assert!(args.symlink);
        assert!(args.absolute);
        assert!(args.silent);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.root, PathBuf::from("/custom/path"));
    }
}
