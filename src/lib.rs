//! 同一内容のファイルを1つの実体へのリンクに置き換えるライブラリ
//!
//! サイズ → ハッシュの2段階で同一内容のファイル群を見つけ、
//! 各群で1ファイルだけを残して他をハードリンク (失敗時はシンボリックリンク) にする。

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod hasher;
pub mod i18n;
pub mod linker;
pub mod logging;
pub mod matcher;
pub mod scanner;
pub mod update;

pub use error::{Error, Result};
