//! 実行全体の制御
//!
//! 入力を等しいバイト範囲に分割してワーカーを 1 つずつ起動し、
//! 集約スレッドの開始から終了までを管理する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::Receiver;

use crate::config::{AggregateConfig, CountBounds};
use crate::error::{AggregateError, Result};
use crate::export::ArtifactSink;
use crate::progress::ProgressReporter;
use crate::reducer::{Reduced, ReducerMessage, reduce_and_export};
use crate::source::ByteSource;
use crate::worker::{ByteRange, ChunkWorker, WorkerStats};

/// 実行結果の概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub workers: usize,
    /// 集計に採用した局面数
    pub positions: i64,
    /// 書き出した要素数
    pub entries: usize,
    /// ワーカー番号順の統計
    pub stats: Vec<WorkerStats>,
}

impl RunSummary {
    /// 全ワーカーの統計の合計
    pub fn total(&self) -> WorkerStats {
        WorkerStats::sum(&self.stats)
    }
}

/// 最初の（`Aborted` 以外の）エラーを残す
fn keep_first(slot: &mut Option<AggregateError>, err: AggregateError) {
    match slot {
        None => *slot = Some(err),
        Some(AggregateError::Aborted) if !matches!(err, AggregateError::Aborted) => {
            *slot = Some(err)
        }
        Some(_) => {}
    }
}

/// 集約スレッドの本体。失敗したら実行中のワーカーを止める
fn reduce_or_abort<K: ArtifactSink + ?Sized>(
    rx: &Receiver<ReducerMessage>,
    bounds: CountBounds,
    sink: &mut K,
    abort: &AtomicBool,
) -> Result<(Reduced, usize)> {
    let reduced = reduce_and_export(rx, bounds, sink);
    if let Err(e) = &reduced {
        log::error!("reducer failed: {e}");
        abort.store(true, Ordering::Relaxed);
    }
    reduced
}

/// 集計を実行して結果を `sink` に書き出す
///
/// いずれかのワーカーが失敗した場合は他のワーカーを中断させ、
/// 何も書き出さずに最初のエラーを返す。
pub fn run<S, K>(
    config: &AggregateConfig,
    source: &S,
    sink: &mut K,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary>
where
    S: ByteSource,
    K: ArtifactSink,
{
    config.validate()?;

    let size = source.len()?;
    let workers = config.resolve_workers();
    let ranges = ByteRange::partition(size, workers);
    let chunk = ranges.first().map_or(0, ByteRange::len);
    log::info!(
        "Computing {} in {workers} slices of {chunk} bytes",
        source.describe()
    );

    let abort = AtomicBool::new(false);
    let (tx, rx) = crossbeam_channel::unbounded::<ReducerMessage>();
    let bounds = config.bounds;

    thread::scope(|scope| -> Result<RunSummary> {
        let abort = &abort;
        let reducer = thread::Builder::new()
            .name("evalmap-reducer".to_string())
            .spawn_scoped(scope, move || reduce_or_abort(&rx, bounds, sink, abort))?;

        let mut first_error = None;
        let mut handles = Vec::with_capacity(ranges.len());
        for (i, range) in ranges.into_iter().enumerate() {
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("evalmap-worker-{i}"))
                .spawn_scoped(scope, move || {
                    let worker = ChunkWorker::new(i, range, config, progress, abort);
                    match worker.run(source) {
                        Ok((tables, stats)) => {
                            let msg = ReducerMessage::Partial {
                                worker: i,
                                tables: Box::new(tables),
                                stats,
                            };
                            // 送れないのは集約側が先に失敗したときのみ
                            tx.send(msg).map_err(|_| AggregateError::Aborted)
                        }
                        Err(e) => {
                            abort.store(true, Ordering::Relaxed);
                            Err(e)
                        }
                    }
                });
            match spawned {
                Ok(handle) => handles.push((i, handle)),
                Err(e) => {
                    abort.store(true, Ordering::Relaxed);
                    keep_first(&mut first_error, e.into());
                    break;
                }
            }
        }

        for (i, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::error!("worker {i} failed: {e}");
                    keep_first(&mut first_error, e);
                }
                Err(_) => {
                    abort.store(true, Ordering::Relaxed);
                    let err = AggregateError::WorkerPanicked { worker: i };
                    keep_first(&mut first_error, err);
                }
            }
        }

        if first_error.is_none() {
            // 集約側が既に終了していれば送信は失敗し、そのエラーは join で拾う
            let _ = tx.send(ReducerMessage::AllWorkersDone { workers });
        }
        drop(tx);

        let reduced = reducer
            .join()
            .unwrap_or(Err(AggregateError::ReducerPanicked));
        match reduced {
            Ok((reduced, entries)) => match first_error {
                None => Ok(RunSummary {
                    workers,
                    positions: reduced.tables.positions(),
                    entries,
                    stats: reduced.stats,
                }),
                Some(e) => Err(e),
            },
            Err(e) => {
                keep_first(&mut first_error, e);
                Err(first_error.unwrap_or(AggregateError::ReducerAbandoned))
            }
        }
    })
}
