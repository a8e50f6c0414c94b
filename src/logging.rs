//! ログ出力の初期化
//!
//! `log` ファサードと `env_logger` バックエンドを使う。出力先は標準エラー。
//! 環境変数 `RUST_LOG` が設定されていればそれを優先する。

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// ロガーを初期化する
///
/// 2回目以降の呼び出しは無視される。
///
/// Args:
///     verbose: -v の数 (0=warn, 1=info, 2=debug, 3以上=trace)
///     quiet: trueなら -v を無視する (ファイル単位の警告は常に出す)
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{}{style:#}: {}", level.as_str().to_lowercase(), record.args())
    });

    let _ = builder.try_init();
}

/// CLIフラグからログレベルを決める
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
