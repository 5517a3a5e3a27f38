//! 集計設定
//!
//! 駒数の範囲や詰みスコアの換算係数など、実行中は変化しない値をまとめる。
//! 各コンポーネントは生成時にこの値を受け取り、グローバル状態は持たない。

use serde::{Deserialize, Serialize};

/// 1 手番あたりの駒数の上限（盤上に置ける最大数）
pub const MAX_PIECES_PER_SIDE: usize = 16;
/// 盤上の駒数の上限
pub const MAX_PIECES_ON_BOARD: usize = 2 * MAX_PIECES_PER_SIDE;

/// 詰み 1 手あたりの減算値（センチポーン）
pub const DEFAULT_MATE_STEP: i64 = 900;
/// 詰みスコアの上限値（センチポーン）
pub const DEFAULT_MATE_CEILING: i64 = 36 * DEFAULT_MATE_STEP;

/// 設定値の検証エラー
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{what}: minimum {min} is greater than maximum {max}")]
    InvertedRange {
        what: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{what}: maximum {max} exceeds {limit}")]
    AboveLimit {
        what: &'static str,
        max: usize,
        limit: usize,
    },

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("progress interval must be at least 1")]
    ZeroProgressInterval,

    #[error("mate scoring parameters must not be negative (ceiling {ceiling}, step {step})")]
    NegativeMateScoring { ceiling: i64, step: i64 },
}

/// 駒数の範囲（いずれも両端を含む）
///
/// 範囲外の局面は集計対象外として読み飛ばす。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountBounds {
    /// 各手番の駒数の下限
    pub min_enemy: usize,
    /// 各手番の駒数の上限
    pub max_enemy: usize,
    /// 盤上の駒数の下限
    pub min_piece: usize,
    /// 盤上の駒数の上限
    pub max_piece: usize,
}

impl Default for CountBounds {
    fn default() -> Self {
        Self {
            min_enemy: 1,
            max_enemy: MAX_PIECES_PER_SIDE,
            min_piece: 3,
            max_piece: MAX_PIECES_ON_BOARD,
        }
    }
}

impl CountBounds {
    /// 敵駒数テーブルのバケット数
    #[inline]
    pub const fn enemy_buckets(&self) -> usize {
        (self.max_enemy + 1).saturating_sub(self.min_enemy)
    }

    /// 総駒数テーブルのバケット数
    #[inline]
    pub const fn piece_buckets(&self) -> usize {
        (self.max_piece + 1).saturating_sub(self.min_piece)
    }

    /// 手番ごとの駒数が範囲内か
    #[inline]
    pub const fn side_in_bounds(&self, count: usize) -> bool {
        count >= self.min_enemy && count <= self.max_enemy
    }

    /// 盤上の駒数が範囲内か
    #[inline]
    pub const fn total_in_bounds(&self, count: usize) -> bool {
        count >= self.min_piece && count <= self.max_piece
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_enemy > self.max_enemy {
            return Err(ConfigError::InvertedRange {
                what: "enemy count",
                min: self.min_enemy,
                max: self.max_enemy,
            });
        }
        if self.min_piece > self.max_piece {
            return Err(ConfigError::InvertedRange {
                what: "piece count",
                min: self.min_piece,
                max: self.max_piece,
            });
        }
        if self.max_enemy > MAX_PIECES_PER_SIDE {
            return Err(ConfigError::AboveLimit {
                what: "enemy count",
                max: self.max_enemy,
                limit: MAX_PIECES_PER_SIDE,
            });
        }
        if self.max_piece > MAX_PIECES_ON_BOARD {
            return Err(ConfigError::AboveLimit {
                what: "piece count",
                max: self.max_piece,
                limit: MAX_PIECES_ON_BOARD,
            });
        }
        Ok(())
    }
}

/// 詰みスコアの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MateScoring {
    /// 詰み読みの行を無視する
    ///
    /// 詰み行は数が少なく値が極端なため、既定では平均を歪めないよう除外する。
    pub ignore: bool,
    /// 詰みスコアの上限値
    pub ceiling: i64,
    /// 詰みまでの手数 1 あたりの減算値
    pub step: i64,
}

impl Default for MateScoring {
    fn default() -> Self {
        Self {
            ignore: true,
            ceiling: DEFAULT_MATE_CEILING,
            step: DEFAULT_MATE_STEP,
        }
    }
}

/// 局面の代表値としてどちらを使うか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSelection {
    /// 採用した全読み筋の平均
    #[default]
    Mean,
    /// 手番側にとって最善の読み筋
    Best,
}

/// 集計設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub bounds: CountBounds,
    pub mate: MateScoring,
    pub selection: ScoreSelection,
    /// ワーカー数（`None` なら利用可能な並列度 - 1）
    pub workers: Option<usize>,
    /// 進捗報告の間隔（採用局面数）
    pub progress_interval: u64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            bounds: CountBounds::default(),
            mate: MateScoring::default(),
            selection: ScoreSelection::default(),
            workers: None,
            progress_interval: 1 << 16,
        }
    }
}

impl AggregateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::ZeroProgressInterval);
        }
        if self.mate.ceiling < 0 || self.mate.step < 0 {
            return Err(ConfigError::NegativeMateScoring {
                ceiling: self.mate.ceiling,
                step: self.mate.step,
            });
        }
        Ok(())
    }

    /// 使用するワーカー数を決定
    pub fn resolve_workers(&self) -> usize {
        if let Some(n) = self.workers {
            return n.max(1);
        }
        match std::thread::available_parallelism() {
            Ok(n) => n.get().saturating_sub(1).max(1),
            Err(e) => {
                log::warn!("Could not determine available parallelism ({e}); using 1 worker");
                1
            }
        }
    }
}
