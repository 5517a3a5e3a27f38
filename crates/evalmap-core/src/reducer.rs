//! 部分集計の集約
//!
//! ワーカーから届いた部分集計を到着順にマージする。完了は
//! [`ReducerMessage::AllWorkersDone`] で明示的に通知され、それが届く前に
//! チャネルが閉じた場合は中断されたものとして何も書き出さない。

use crossbeam_channel::Receiver;

use crate::config::CountBounds;
use crate::error::{AggregateError, Result};
use crate::export::{ArtifactSink, build_entries};
use crate::table::LookupTables;
use crate::worker::WorkerStats;

/// 集約スレッドへのメッセージ
#[derive(Debug)]
pub enum ReducerMessage {
    /// ワーカー 1 つ分の部分集計
    Partial {
        worker: usize,
        tables: Box<LookupTables>,
        stats: WorkerStats,
    },
    /// 全ワーカーが正常終了した
    AllWorkersDone { workers: usize },
}

/// マージ済みの集計
#[derive(Debug)]
pub struct Reduced {
    pub tables: LookupTables,
    /// ワーカー番号順の統計
    pub stats: Vec<WorkerStats>,
}

/// 部分集計を受け取ってマージする
#[derive(Debug)]
pub struct Reducer {
    tables: LookupTables,
    stats: Vec<(usize, WorkerStats)>,
}

impl Reducer {
    pub fn new(bounds: CountBounds) -> Self {
        Self {
            tables: LookupTables::new(bounds),
            stats: Vec::new(),
        }
    }

    /// 受け取った部分集計の数
    pub fn received(&self) -> usize {
        self.stats.len()
    }

    /// 部分集計を 1 つマージ
    pub fn absorb(
        &mut self,
        worker: usize,
        tables: &LookupTables,
        stats: WorkerStats,
    ) -> Result<()> {
        self.tables.merge(tables)?;
        self.stats.push((worker, stats));
        log::debug!(
            "collected slice from worker {worker} ({} positions)",
            tables.positions()
        );
        Ok(())
    }

    /// 完了通知を検証して結果を返す
    pub fn finish(mut self, workers: usize) -> Result<Reduced> {
        let received = self.received();
        if received != workers {
            return Err(AggregateError::MissingPartials {
                received,
                expected: workers,
            });
        }
        log::info!(
            "Collected {received} slices, with {} positions",
            self.tables.positions()
        );
        self.stats.sort_by_key(|&(worker, _)| worker);
        Ok(Reduced {
            tables: self.tables,
            stats: self.stats.into_iter().map(|(_, s)| s).collect(),
        })
    }

    /// 完了通知が届くまでチャネルを読む
    pub fn drain(mut self, rx: &Receiver<ReducerMessage>) -> Result<Reduced> {
        for msg in rx.iter() {
            match msg {
                ReducerMessage::Partial {
                    worker,
                    tables,
                    stats,
                } => self.absorb(worker, &tables, stats)?,
                ReducerMessage::AllWorkersDone { workers } => return self.finish(workers),
            }
        }
        Err(AggregateError::ReducerAbandoned)
    }
}

/// 集約スレッドの本体: マージ、平均化、1 回だけの書き出し
pub fn reduce_and_export<K: ArtifactSink + ?Sized>(
    rx: &Receiver<ReducerMessage>,
    bounds: CountBounds,
    sink: &mut K,
) -> Result<(Reduced, usize)> {
    let reduced = Reducer::new(bounds).drain(rx)?;
    let entries = build_entries(&reduced.tables)?;
    sink.write_entries(&entries)?;
    log::info!("Wrote {} entries to {}", entries.len(), sink.describe());
    Ok((reduced, entries.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemorySink;
    use crate::table::TableKind;
    use crate::types::{Piece, Square};
    use crossbeam_channel::unbounded;

    fn partial(worker: usize, value: i64) -> ReducerMessage {
        let mut tables = LookupTables::new(CountBounds::default());
        let pawn = Piece::from_fen_char('P').unwrap();
        let sq = Square::from_index(12).unwrap();
        tables
            .record(TableKind::EnemyCount, 0, pawn, sq, value)
            .unwrap();
        let stats = WorkerStats {
            records: 1,
            accepted: 1,
            ..WorkerStats::default()
        };
        ReducerMessage::Partial {
            worker,
            tables: Box::new(tables),
            stats,
        }
    }

    fn done(workers: usize) -> ReducerMessage {
        ReducerMessage::AllWorkersDone { workers }
    }

    fn reduce(rx: &Receiver<ReducerMessage>, sink: &mut MemorySink) -> Result<(Reduced, usize)> {
        reduce_and_export(rx, CountBounds::default(), sink)
    }

    #[test]
    fn test_merges_in_any_order_and_exports_once() {
        let (tx, rx) = unbounded();
        tx.send(partial(1, 2)).unwrap();
        tx.send(partial(0, 1)).unwrap();
        tx.send(done(2)).unwrap();

        let mut sink = MemorySink::new();
        let (reduced, written) = reduce(&rx, &mut sink).unwrap();
        assert_eq!(reduced.stats.len(), 2);
        assert_eq!(sink.writes(), 1);
        let entries = sink.entries().unwrap();
        assert_eq!(entries.len(), written);
        assert_eq!(entries[0].board[12], 1);
        assert_eq!(entries[0].num_cases, 2);
    }

    #[test]
    fn test_disconnect_without_done_writes_nothing() {
        let (tx, rx) = unbounded();
        tx.send(partial(0, 5)).unwrap();
        drop(tx);

        let mut sink = MemorySink::new();
        let err = reduce(&rx, &mut sink).unwrap_err();
        assert!(matches!(err, AggregateError::ReducerAbandoned));
        assert!(sink.entries().is_none());
    }

    #[test]
    fn test_missing_partials_detected() {
        let (tx, rx) = unbounded();
        tx.send(partial(0, 5)).unwrap();
        tx.send(done(3)).unwrap();

        let mut sink = MemorySink::new();
        let err = reduce(&rx, &mut sink).unwrap_err();
        let counts = match err {
            AggregateError::MissingPartials { received, expected } => (received, expected),
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(counts, (1, 3));
        assert_eq!(sink.writes(), 0);
    }
}
