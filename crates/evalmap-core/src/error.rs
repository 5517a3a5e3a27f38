//! 集計処理のエラー型
//!
//! 「レコードを読み飛ばす」ケースは [`crate::Outcome::Skip`] で表し、ここに含めない。
//! ここにあるのは実行全体を中断すべき致命的なエラーのみ。

use std::fmt;

use crate::config::ConfigError;

/// FEN パースエラー
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// 段の幅が 8 筋にならない
    #[error("rank {rank} is {width} files wide, expected 8: {fen:?}")]
    RankWidth {
        rank: usize,
        width: usize,
        fen: String,
    },

    /// 段の数が 8 を超える
    #[error("too many ranks: {fen:?}")]
    TooManyRanks { fen: String },

    /// 段の数が 8 に満たない
    #[error("only {ranks} ranks given: {fen:?}")]
    TooFewRanks { ranks: usize, fen: String },

    /// 不明な駒文字
    #[error("unknown piece {piece:?} in {fen:?}")]
    UnknownPiece { piece: char, fen: String },

    /// 手番が見つからない
    #[error("did not find side to move in {fen:?}")]
    MissingSideToMove { fen: String },
}

/// 加算の方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowDirection {
    Overflow,
    Underflow,
}

impl fmt::Display for OverflowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowDirection::Overflow => f.write_str("overflow"),
            OverflowDirection::Underflow => f.write_str("underflow"),
        }
    }
}

/// 64bit 加算の桁あふれ
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{direction}: {sum} + {value}")]
pub struct OverflowError {
    pub direction: OverflowDirection,
    pub sum: i64,
    pub value: i64,
}

/// 集計全体を中断する致命的エラー
#[derive(thiserror::Error, Debug)]
pub enum AggregateError {
    #[error(transparent)]
    Fen(#[from] FenError),

    #[error(transparent)]
    Overflow(#[from] OverflowError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 担当範囲の終端より前でレコードのデコードに失敗
    #[error("failed to decode record at byte {offset}: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: serde_json::Error,
    },

    /// 集計結果のシリアライズに失敗
    #[error("failed to encode artifact: {0}")]
    Encode(#[source] serde_json::Error),

    /// 担当範囲の終端より前に EOF に達した
    #[error("unexpected end of input at byte {offset}, expected data until {end}")]
    UnexpectedEof { offset: u64, end: u64 },

    /// 平均値が i32 に収まらない
    #[error("average {sum} / {count} = {average} does not fit in i32")]
    AverageOutOfRange { sum: i64, count: i64, average: i64 },

    /// サンプル数が i32 に収まらない
    #[error("case count {count} does not fit in i32")]
    CaseCountOutOfRange { count: i64 },

    /// テーブルの範囲外アクセス
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// 形の異なるテーブル同士のマージ
    #[error("cannot merge tables of different shapes: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// 入力が圧縮されている（バイト範囲で分割できない）
    #[error("{path} looks {kind}-compressed; byte-range partitioning needs an uncompressed file")]
    CompressedInput { path: String, kind: &'static str },

    /// 全ワーカー完了の通知なしに集約チャネルが閉じられた
    #[error("reducer input closed before all workers reported")]
    ReducerAbandoned,

    /// 完了通知時点で受け取った部分集計の数が合わない
    #[error("reducer received {received} partial tables, expected {expected}")]
    MissingPartials { received: usize, expected: usize },

    #[error("worker thread {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("reducer thread panicked")]
    ReducerPanicked,

    /// 他のワーカーの失敗により中断
    #[error("aborted because another worker failed")]
    Aborted,
}

/// 集計処理の Result 型
pub type Result<T> = std::result::Result<T, AggregateError>;
