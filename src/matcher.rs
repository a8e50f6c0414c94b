//! 同一サイズのファイル群をハッシュで照合する

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;
use crate::hasher::{hash_file, Digest};
use crate::scanner::FileRecord;

/// 内容が同一 (サイズとダイジェストが一致) のファイル群。常に2つ以上
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkableSet {
    pub size: u64,
    pub files: Vec<FileRecord>,
}

/// 1つのサイズグループを照合した結果
#[derive(Debug, Default)]
pub struct BucketOutcome {
    pub sets: Vec<LinkableSet>,
    /// ハッシュを計算できたファイル数
    pub hashed: usize,
    /// 読み取れずに除外したファイル数
    pub unreadable: usize,
}

/// 照合全体の集計
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSummary {
    pub buckets: usize,
    pub sets: usize,
    pub hashed: usize,
    pub unreadable: usize,
}

impl ResolveSummary {
    pub fn add(&mut self, outcome: &BucketOutcome) {
        self.buckets += 1;
        self.sets += outcome.sets.len();
        self.hashed += outcome.hashed;
        self.unreadable += outcome.unreadable;
    }
}

/// 同一サイズのファイル群をハッシュ値でグループ化する
///
/// 1ファイルしかないハッシュグループは捨てる。結果の順序はダイジェストの初出順。
///
/// Args:
///     size: グループのファイルサイズ
///     files: 同一サイズのファイル (2つ以上であること)
///
/// Returns:
///     照合結果
pub fn resolve_bucket(size: u64, files: Vec<FileRecord>) -> BucketOutcome {
    let mut outcome = BucketOutcome::default();
    let mut order: Vec<Digest> = Vec::new();
    let mut groups: HashMap<Digest, Vec<FileRecord>> = HashMap::new();

    for file in files {
        let digest = match hash_file(&file.path) {
            Ok(digest) => {
                outcome.hashed += 1;
                digest
            }
            Err(e) => {
                log::warn!("{}", e);
                outcome.unreadable += 1;
                continue;
            }
        };
        let group = groups.entry(digest).or_insert_with(|| {
            order.push(digest);
            Vec::new()
        });
        group.push(file);
    }

    for digest in order {
        if let Some(files) = groups.remove(&digest) {
            if files.len() >= 2 {
                log::debug!("{} identical files of {} bytes ({})", files.len(), size, digest.to_hex());
                outcome.sets.push(LinkableSet { size, files });
            }
        }
    }

    outcome
}

/// ワーカーからの照合結果を受け取るイテレータ
///
/// 投入したサイズグループの数だけ結果を返して終了する。
/// ワーカーが panic したグループは結果が届かないため、その分だけ早く終わる。
pub struct Dispatch {
    receiver: Receiver<BucketOutcome>,
    pending: usize,
    // ワーカーが全て終わるまでプールを保持する
    _pool: ThreadPool,
}

impl Iterator for Dispatch {
    type Item = BucketOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending == 0 {
            return None;
        }
        match self.receiver.recv() {
            Ok(outcome) => {
                self.pending -= 1;
                Some(outcome)
            }
            Err(_) => {
                // 残りのワーカーが全て送信せずに終了した (panic)
                log::error!("{} size groups were lost by failed workers", self.pending);
                self.pending = 0;
                None
            }
        }
    }
}

/// サイズグループごとにワーカーを起動して照合する
///
/// 各ワーカーは自分のグループを所有し、結果をチャネルで送るだけで共有状態には触れない。
/// 2ファイル未満のグループは投入しない。
///
/// Args:
///     candidates: `SizeBuckets::into_candidates` の結果
///
/// Returns:
///     結果を到着順に返す `Dispatch`。プールを起動できなければ `Error::WorkerPool`
pub fn dispatch(candidates: Vec<(u64, Vec<FileRecord>)>) -> Result<Dispatch> {
    dispatch_with(candidates, resolve_bucket)
}

fn dispatch_with<F>(candidates: Vec<(u64, Vec<FileRecord>)>, resolve: F) -> Result<Dispatch>
where
    F: Fn(u64, Vec<FileRecord>) -> BucketOutcome + Send + Sync + 'static,
{
    // panic したワーカーはログに残し、プロセスは止めない
    let pool = ThreadPoolBuilder::new()
        .thread_name(|i| format!("linksame-worker-{}", i))
        .panic_handler(|_| log::error!("a size group worker panicked; its files are left as they are"))
        .build()?;

    let resolve = Arc::new(resolve);
    let (sender, receiver) = mpsc::channel();
    let mut pending = 0;

    for (size, files) in candidates {
        if files.len() < 2 {
            continue;
        }
        pending += 1;
        let sender = sender.clone();
        let resolve = Arc::clone(&resolve);
        pool.spawn(move || {
            if sender.send(resolve(size, files)).is_err() {
                log::debug!("result for size {} dropped: receiver closed", size);
            }
        });
    }

    log::debug!("dispatched {} size groups", pending);
    Ok(Dispatch {
        receiver,
        pending,
        _pool: pool,
    })
}

/// 全グループを照合し、結果をまとめて返す
pub fn resolve_all(candidates: Vec<(u64, Vec<FileRecord>)>) -> Result<(Vec<LinkableSet>, ResolveSummary)> {
    let mut summary = ResolveSummary::default();
    let mut sets = Vec::new();
    for outcome in dispatch(candidates)? {
        summary.add(&outcome);
        sets.extend(outcome.sets);
    }
    Ok((sets, summary))
}
