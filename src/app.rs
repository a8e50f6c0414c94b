use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::Args;
use crate::config::{Config, Mode};
use crate::i18n::{format_size, msg, replaced_files, Msg};
use crate::linker::{relative_path, LinkOutcome, LinkStats, Linker};
use crate::logging::init_logging;
use crate::matcher::{dispatch, ResolveSummary};
use crate::scanner::{normalize_root, scan_tree, FileRecord};
use crate::update::{find_update_set, validate_target};

pub fn run(args: Args) -> i32 {
    let result = Config::from_args(&args)
        .context("invalid arguments")
        .and_then(|config| {
            init_logging(config.log_verbosity, config.quiet_logging());
            execute(&config)
        });
    match result {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// 設定に従ってリンク置換を実行し、統計を返す
///
/// ファイル単位の失敗は統計とログに残るだけでエラーにはならない。
/// エラーを返すのはルートや更新対象が不正な場合のみ。
pub fn execute(config: &Config) -> Result<LinkStats> {
    let root = normalize_root(&config.root).context("invalid root")?;
    let reporter = Reporter {
        root: root.clone(),
        actions: config.output.actions,
    };

    let stats = match &config.mode {
        Mode::Tree => {
            if config.output.banner {
                println!("{} {}", msg(Msg::LinkingTree), root.display());
            }
            link_tree(config, &root, &reporter)?
        }
        Mode::Update(target) => {
            let record = validate_target(target).context("invalid update file")?;
            if config.output.banner {
                println!("{} {}", msg(Msg::LinkingUpdate), record.path.display());
                println!("  {}: {}", msg(Msg::SearchRoot), root.display());
            }
            link_update(config, target, &root, &reporter)?
        }
    };

    if config.output.summary {
        print_summary(config, &stats);
    }
    Ok(stats)
}

fn link_tree(config: &Config, root: &Path, reporter: &Reporter) -> Result<LinkStats> {
    let buckets = scan_tree(root, config.filter.as_ref())?;
    let linker = Linker::new(config.link);
    let mut stats = LinkStats::default();
    let mut summary = ResolveSummary::default();

    // 照合結果は到着順に、このスレッドで1グループずつリンクする
    for outcome in dispatch(buckets.into_candidates())? {
        summary.add(&outcome);
        for set in outcome.sets {
            let set_stats = linker.link_set(set, |member, survivor, result| {
                reporter.report(member, survivor, result)
            });
            stats.merge(&set_stats);
        }
    }

    log::info!(
        "{} size groups, {} files hashed, {} unreadable, {} identical sets",
        summary.buckets,
        summary.hashed,
        summary.unreadable,
        summary.sets
    );
    Ok(stats)
}

fn link_update(config: &Config, target: &Path, root: &Path, reporter: &Reporter) -> Result<LinkStats> {
    let set = find_update_set(target, root, config.filter.as_ref()).context("invalid update file")?;
    let Some(set) = set else {
        if config.output.summary {
            println!("{}", msg(Msg::NoMatch));
        }
        return Ok(LinkStats::default());
    };

    let linker = Linker::new(config.link);
    Ok(linker.link_set(set, |member, survivor, result| {
        reporter.report(member, survivor, result)
    }))
}

/// ファイルごとの結果を出力する
///
/// 成功は標準出力、失敗はログ (標準エラー) に出す。
struct Reporter {
    root: PathBuf,
    actions: bool,
}

impl Reporter {
    fn report(&self, member: &FileRecord, survivor: &FileRecord, outcome: &LinkOutcome) {
        let path = self.display(&member.path);
        let base = self.display(&survivor.path);

        match outcome {
            LinkOutcome::Hardlinked => {
                if self.actions {
                    println!("hardlink: {} <--> {}", path, base);
                }
            }
            LinkOutcome::Symlinked(_) => {
                if self.actions {
                    println!("symlink: {} ---> {}", path, base);
                }
            }
            LinkOutcome::WouldLink => {
                if self.actions {
                    println!("link: {} <--> {}", path, base);
                }
            }
            LinkOutcome::AlreadyLinked => {
                log::debug!("already linked: {} <--> {}", path, base);
            }
            LinkOutcome::UnlinkFailed(e) => {
                log::warn!("cannot unlink file {}: {}", member.path.display(), e);
            }
            LinkOutcome::Restored(e) => {
                log::warn!("failed to link {} ({}), original contents restored", member.path.display(), e);
            }
            LinkOutcome::RestoreFailed(e) => {
                log::error!(
                    "DATA LOSS: {} was removed and could not be restored: {}",
                    member.path.display(),
                    e
                );
            }
            LinkOutcome::Failed(e) => {
                log::warn!("skipping {}: {}", member.path.display(), e);
            }
        }
    }

    fn display(&self, path: &Path) -> String {
        relative_path(&self.root, path).display().to_string()
    }
}

fn print_summary(config: &Config, stats: &LinkStats) {
    println!();
    if config.link.write {
        println!("{}", msg(Msg::SummaryComplete));
    } else {
        println!("{}", msg(Msg::SummaryDryRun));
    }
    println!("{}", replaced_files(stats.links));
    println!("{} {}", msg(Msg::TotalSavings), format_size(stats.bytes_saved));
    if stats.already_linked > 0 {
        println!("  {}: {}", msg(Msg::TotalAlreadyLinked), stats.already_linked);
    }
    if stats.failed > 0 {
        println!("  {}: {}", msg(Msg::TotalErrors), stats.failed);
    }
    if stats.data_loss > 0 {
        println!("  {}: {}", msg(Msg::TotalDataLoss), stats.data_loss);
    }
}
