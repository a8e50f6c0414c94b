//! 国際化 (i18n) サポート

use sys_locale::get_locale;

/// 現在のロケールが日本語かどうかを判定する
pub fn is_japanese() -> bool {
    get_locale()
        .map(|l| l.starts_with("ja"))
        .unwrap_or(false)
}

/// メッセージキー
#[derive(Clone, Copy)]
pub enum Msg {
    // 処理中メッセージ
    LinkingTree,
    LinkingUpdate,
    SearchRoot,
    NoMatch,

    // サマリー
    SummaryDryRun,
    SummaryComplete,
    TotalSavings,
    TotalAlreadyLinked,
    TotalErrors,
    TotalDataLoss,
}

/// ローカライズされたメッセージを取得する
pub fn msg(key: Msg) -> &'static str {
    if is_japanese() {
        msg_ja(key)
    } else {
        msg_en(key)
    }
}

fn msg_ja(key: Msg) -> &'static str {
    match key {
        // 処理中メッセージ
        Msg::LinkingTree => "同一内容のファイルをリンク中",
        Msg::LinkingUpdate => "次のファイルと同一内容のファイルをリンク中",
        Msg::SearchRoot => "探索ディレクトリ",
        Msg::NoMatch => "同一内容のファイルはありません",

        // サマリー
        Msg::SummaryDryRun => "=== ドライラン結果 (-w で書き込んだ場合) ===",
        Msg::SummaryComplete => "=== 処理完了 ===",
        Msg::TotalSavings => "削減容量:",
        Msg::TotalAlreadyLinked => "リンク済み",
        Msg::TotalErrors => "エラー",
        Msg::TotalDataLoss => "復元失敗",
    }
}

fn msg_en(key: Msg) -> &'static str {
    match key {
        // Processing
        Msg::LinkingTree => "Linking identical files in",
        Msg::LinkingUpdate => "Linking files identical to",
        Msg::SearchRoot => "Search root",
        Msg::NoMatch => "No identical files found",

        // Summary
        Msg::SummaryDryRun => "=== If writing links (-w), would have ===",
        Msg::SummaryComplete => "=== Complete ===",
        Msg::TotalSavings => "Reduced storage by",
        Msg::TotalAlreadyLinked => "Already linked",
        Msg::TotalErrors => "Errors",
        Msg::TotalDataLoss => "Restore failures",
    }
}

/// リンクに置換したファイル数の行
pub fn replaced_files(count: usize) -> String {
    if is_japanese() {
        replaced_files_ja(count)
    } else {
        replaced_files_en(count)
    }
}

fn replaced_files_ja(count: usize) -> String {
    format!("{} 個のファイルをリンクに置換", count)
}

fn replaced_files_en(count: usize) -> String {
    format!("Replaced {} files with links", count)
}

/// バイト数を最上位の2のべき乗単位に丸めて表示する
///
/// 1 KiB を超えると K、1 MiB を超えると M、1 GiB を超えると G を付け、小数1桁で表す。
/// それ以下は `N bytes`。
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes > GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes > MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes > KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
