//! チェス局面の評価値ダンプから、駒数で分類したマスごとの平均評価値を集計する
//!
//! 巨大な JSONL を等しいバイト範囲に分割してワーカースレッドで並列に集計し、
//! 集約スレッドで 1 つの表にまとめて書き出す。

pub mod board;
pub mod config;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod outcome;
pub mod progress;
pub mod record;
pub mod reducer;
pub mod score;
pub mod source;
pub mod table;
pub mod types;
pub mod worker;

pub use board::Board;
pub use config::{AggregateConfig, ConfigError, CountBounds, MateScoring, ScoreSelection};
pub use error::{AggregateError, FenError, OverflowDirection, OverflowError, Result};
pub use export::{ArtifactSink, ExportedBoardEntry, JsonFileSink, MemorySink, build_entries};
pub use orchestrator::{RunSummary, run};
pub use outcome::{Outcome, SkipReason};
pub use progress::{LogProgress, NoProgress, ProgressReporter};
pub use record::PositionRecord;
pub use reducer::{Reducer, ReducerMessage};
pub use score::{EvaluationLine, PositionScore};
pub use source::{ByteSource, FileSource, MemorySource};
pub use table::{LookupCell, LookupTable, LookupTables, TableKind};
pub use types::{Color, Piece, PieceType, Square};
pub use worker::{ByteRange, ChunkWorker, WorkerStats};
