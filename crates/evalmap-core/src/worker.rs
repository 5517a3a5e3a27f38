//! バイト範囲ごとの集計ワーカー
//!
//! 担当範囲 `[start, end)` の先頭を行頭に合わせてから 1 行ずつレコードを
//! デコードし、専用の集計テーブルへ加える。開始位置が `end` 以上のレコードは
//! 読まない。範囲の途中から始まった行は前のワーカーが最後まで読む。

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::board::Board;
use crate::config::AggregateConfig;
use crate::error::{AggregateError, Result};
use crate::outcome::{Outcome, SkipReason};
use crate::progress::ProgressReporter;
use crate::record::PositionRecord;
use crate::score::normalize;
use crate::source::ByteSource;
use crate::table::LookupTables;

const READER_BUF_CAP: usize = 128 * 1024; // 128 KiB

/// 半開区間のバイト範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// 入力全体を `workers` 個の等しい範囲に分割
    ///
    /// 割り切れない末尾の `size % workers` バイトはどの範囲にも含まれない。
    pub fn partition(size: u64, workers: usize) -> Vec<ByteRange> {
        let workers = workers.max(1) as u64;
        let chunk = size / workers;
        (0..workers)
            .map(|i| ByteRange::new(i * chunk, (i + 1) * chunk))
            .collect()
    }

    #[inline]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// ワーカー 1 つ分の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// デコードしたレコード数
    pub records: u64,
    /// 集計に採用した局面数
    pub accepted: u64,
    /// 駒数が範囲外で読み飛ばした数
    pub skipped_bounds: u64,
    /// 評価値が無く読み飛ばした数
    pub skipped_no_eval: u64,
    /// 空白のみの行
    pub blank_lines: u64,
    /// 行頭合わせで捨てたバイト数
    pub bytes_skipped_at_start: u64,
}

impl WorkerStats {
    fn count_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::PieceCountOutOfBounds => self.skipped_bounds += 1,
            SkipReason::NoUsableEvaluation => self.skipped_no_eval += 1,
        }
    }

    /// 複数ワーカーの合計
    pub fn sum<'a>(stats: impl IntoIterator<Item = &'a WorkerStats>) -> WorkerStats {
        stats.into_iter().fold(WorkerStats::default(), |mut acc, s| {
            acc.records += s.records;
            acc.accepted += s.accepted;
            acc.skipped_bounds += s.skipped_bounds;
            acc.skipped_no_eval += s.skipped_no_eval;
            acc.blank_lines += s.blank_lines;
            acc.bytes_skipped_at_start += s.bytes_skipped_at_start;
            acc
        })
    }
}

/// レコード 1 件を処理してテーブルに加える
pub fn process_record(
    record: &PositionRecord,
    config: &AggregateConfig,
    tables: &mut LookupTables,
) -> Result<Outcome<()>> {
    let board = match Board::from_fen(&record.fen, &config.bounds)? {
        Outcome::Accept(board) => board,
        Outcome::Skip(reason) => return Ok(Outcome::Skip(reason)),
    };

    let lines = record.first_pass_lines();
    let score = match normalize(&lines, board.side_to_move(), &config.mate)? {
        Outcome::Accept(score) => score,
        Outcome::Skip(reason) => return Ok(Outcome::Skip(reason)),
    };

    tables.record_board(&board, score.select(config.selection))?;
    Ok(Outcome::Accept(()))
}

/// 1 つのバイト範囲を担当するワーカー
pub struct ChunkWorker<'a> {
    id: usize,
    range: ByteRange,
    config: &'a AggregateConfig,
    progress: &'a dyn ProgressReporter,
    abort: &'a AtomicBool,
}

impl<'a> ChunkWorker<'a> {
    pub fn new(
        id: usize,
        range: ByteRange,
        config: &'a AggregateConfig,
        progress: &'a dyn ProgressReporter,
        abort: &'a AtomicBool,
    ) -> Self {
        Self {
            id,
            range,
            config,
            progress,
            abort,
        }
    }

    /// 独自のハンドルを開いて担当範囲を処理
    pub fn run<S: ByteSource>(&self, source: &S) -> Result<(LookupTables, WorkerStats)> {
        let reader = source.open()?;
        self.scan(reader)
    }

    /// 読み取りハンドルから担当範囲を処理
    pub fn scan<R: Read + Seek>(&self, mut reader: R) -> Result<(LookupTables, WorkerStats)> {
        let ByteRange { start, end } = self.range;
        let mut tables = LookupTables::new(self.config.bounds);
        let mut stats = WorkerStats::default();

        reader.seek(SeekFrom::Start(start))?;
        let mut reader = BufReader::with_capacity(READER_BUF_CAP, reader);
        let mut pos = start;

        self.progress.start_range(self.id, start, end);

        // 途中から始まる場合は次の行頭まで読み捨てる
        if start != 0 {
            let mut partial = Vec::new();
            let n = reader.read_until(b'\n', &mut partial)? as u64;
            pos += n;
            stats.bytes_skipped_at_start = n;
            if partial.last() != Some(&b'\n') {
                log::debug!("worker {}: no line start after {start}", self.id);
                self.progress.finish_range(self.id, 0);
                return Ok((tables, stats));
            }
        }
        log::debug!(
            "worker {}: {start} ({} skipped) - {end}",
            self.id,
            stats.bytes_skipped_at_start
        );

        let mut line = Vec::new();
        while pos < end {
            if self.abort.load(Ordering::Relaxed) {
                return Err(AggregateError::Aborted);
            }

            line.clear();
            let n = reader.read_until(b'\n', &mut line)? as u64;
            if n == 0 {
                return Err(AggregateError::UnexpectedEof { offset: pos, end });
            }
            let record_start = pos;
            pos += n;

            if line.iter().all(u8::is_ascii_whitespace) {
                stats.blank_lines += 1;
                continue;
            }

            let record = match serde_json::from_slice::<PositionRecord>(&line) {
                Ok(record) => record,
                Err(source) => {
                    return Err(AggregateError::Decode {
                        offset: record_start,
                        source,
                    });
                }
            };
            stats.records += 1;

            match process_record(&record, self.config, &mut tables)? {
                Outcome::Accept(()) => {
                    stats.accepted += 1;
                    if stats.accepted % self.config.progress_interval.max(1) == 0 {
                        self.progress.advance(self.id, pos);
                    }
                }
                Outcome::Skip(reason) => stats.count_skip(reason),
            }
        }

        self.progress.finish_range(self.id, tables.positions());
        log::debug!("worker {}: {stats:?}", self.id);
        Ok((tables, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::source::MemorySource;
    use crate::table::TableKind;
    use std::io::Cursor;

    const LINE_A: &str = r#"{"fen":"4k3/8/8/8/8/8/8/4K2R w - -","evals":[{"pvs":[{"cp":100}]}]}"#;
    const LINE_B: &str =
        r#"{"fen":"4k3/8/8/8/8/8/8/4KQ2 b - -","evals":[{"pvs":[{"cp":-50},{"cp":-70}]}]}"#;
    const LINE_C: &str = r#"{"fen":"4k3/8/8/8/8/8/8/R3K3 w - -","evals":[{"pvs":[{"cp":30}]}]}"#;

    type Scanned = Result<(LookupTables, WorkerStats)>;

    fn input(lines: &[&str]) -> Vec<u8> {
        let mut s = String::new();
        for l in lines {
            s.push_str(l);
            s.push('\n');
        }
        s.into_bytes()
    }

    fn scan(data: &[u8], range: ByteRange) -> Scanned {
        let config = AggregateConfig::default();
        let abort = AtomicBool::new(false);
        let worker = ChunkWorker::new(0, range, &config, &NoProgress, &abort);
        worker.scan(Cursor::new(data.to_vec()))
    }

    /// `start` から入力の末尾まで
    fn scan_from(data: &[u8], start: u64) -> Scanned {
        scan(data, ByteRange::new(start, data.len() as u64))
    }

    #[test]
    fn test_partition_equal_chunks_drop_tail() {
        let ranges = ByteRange::partition(10, 3);
        let expected = [(0, 3), (3, 6), (6, 9)].map(|(s, e)| ByteRange::new(s, e));
        assert_eq!(ranges, expected);
        assert_eq!(ByteRange::partition(10, 0), vec![ByteRange::new(0, 10)]);
        assert!(ByteRange::partition(2, 4).iter().all(ByteRange::is_empty));
    }

    #[test]
    fn test_whole_input_from_zero() {
        let data = input(&[LINE_A, LINE_B, LINE_C]);
        let (tables, stats) = scan_from(&data, 0).unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.accepted, 3);
        assert_eq!(tables.positions(), 3);
        assert_eq!(stats.bytes_skipped_at_start, 0);
    }

    #[test]
    fn test_mid_record_start_skips_to_next_line() {
        let data = input(&[LINE_A, LINE_B, LINE_C]);
        let start = 5u64;
        let (tables, stats) = scan_from(&data, start).unwrap();
        let line_a_len = (LINE_A.len() + 1) as u64;
        assert_eq!(stats.bytes_skipped_at_start, line_a_len - start);
        assert_eq!(stats.records, 2);
        assert_eq!(tables.positions(), 2);
    }

    #[test]
    fn test_never_decodes_record_starting_at_end() {
        let data = input(&[LINE_A, LINE_B, LINE_C]);
        let line_b_start = (LINE_A.len() + 1) as u64;

        // LINE_B の開始位置ちょうどで終わる範囲は LINE_A のみ
        let (_, stats) = scan(&data, ByteRange::new(0, line_b_start)).unwrap();
        assert_eq!(stats.records, 1);

        // 1 バイトでも LINE_B にかかれば LINE_B を最後まで読む
        let (_, stats) = scan(&data, ByteRange::new(0, line_b_start + 1)).unwrap();
        assert_eq!(stats.records, 2);
    }

    #[test]
    fn test_start_on_line_boundary_discards_that_line() {
        let data = input(&[LINE_A, LINE_B, LINE_C]);
        let line_b_start = (LINE_A.len() + 1) as u64;
        let (_, stats) = scan_from(&data, line_b_start).unwrap();
        assert_eq!(stats.bytes_skipped_at_start, (LINE_B.len() + 1) as u64);
        assert_eq!(stats.records, 1);
    }

    #[test]
    fn test_decode_failure_is_fatal() {
        let data = input(&[LINE_A, "{\"fen\": \"8/8", LINE_C]);
        let offset = match scan_from(&data, 0).unwrap_err() {
            AggregateError::Decode { offset, .. } => offset,
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(offset, (LINE_A.len() + 1) as u64);
    }

    #[test]
    fn test_eof_before_end_is_fatal() {
        let data = input(&[LINE_A]);
        let range = ByteRange::new(0, data.len() as u64 + 10);
        let err = scan(&data, range).unwrap_err();
        assert!(matches!(err, AggregateError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_malformed_fen_is_fatal() {
        let bad = r#"{"fen":"4k3/8/8/8/8/8/8/4K2 w - -","evals":[{"pvs":[{"cp":1}]}]}"#;
        let data = input(&[LINE_A, bad]);
        let err = scan_from(&data, 0).unwrap_err();
        assert!(matches!(err, AggregateError::Fen(_)));
    }

    #[test]
    fn test_skips_are_counted_not_recorded() {
        let kings_only = r#"{"fen":"4k3/8/8/8/8/8/8/4K3 w - -","evals":[{"pvs":[{"cp":0}]}]}"#;
        let mate_only = r#"{"fen":"4k3/8/8/8/8/8/8/4K2R w - -","evals":[{"pvs":[{"mate":2}]}]}"#;
        let no_evals = r#"{"fen":"4k3/8/8/8/8/8/8/4K2R w - -","evals":[]}"#;
        let data = input(&[kings_only, "", mate_only, no_evals, LINE_A]);
        let (tables, stats) = scan_from(&data, 0).unwrap();
        assert_eq!(stats.records, 4);
        assert_eq!(stats.blank_lines, 1);
        assert_eq!(stats.skipped_bounds, 1);
        assert_eq!(stats.skipped_no_eval, 2);
        assert_eq!(stats.accepted, 1);
        let piece_table = tables.table(TableKind::PieceCount);
        assert_eq!(piece_table.total_count().unwrap(), 3);
    }

    #[test]
    fn test_abort_flag_stops_worker() {
        let data = input(&[LINE_A, LINE_B]);
        let config = AggregateConfig::default();
        let abort = AtomicBool::new(true);
        let range = ByteRange::new(0, data.len() as u64);
        let worker = ChunkWorker::new(1, range, &config, &NoProgress, &abort);
        let err = worker.run(&MemorySource::new(data)).unwrap_err();
        assert!(matches!(err, AggregateError::Aborted));
    }

    #[test]
    fn test_start_inside_last_line_without_newline() {
        let data = LINE_A.as_bytes().to_vec();
        let (tables, stats) = scan_from(&data, 3).unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(tables.positions(), 0);
    }
}
