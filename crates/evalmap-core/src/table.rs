//! マスごとの集計テーブル
//!
//! `(バケット, 駒, マス)` ごとに評価値の和と件数を持つ。
//! すべての加算は桁あふれを検査し、検出したら致命的エラーとして返す。

use crate::board::Board;
use crate::config::CountBounds;
use crate::error::{AggregateError, OverflowDirection, OverflowError, Result};
use crate::types::{Piece, Square};

/// 桁あふれ検査付きの加算
#[inline]
pub fn checked_accumulate(sum: i64, value: i64) -> std::result::Result<i64, OverflowError> {
    sum.checked_add(value).ok_or_else(|| {
        let direction = if value < 0 {
            OverflowDirection::Underflow
        } else {
            OverflowDirection::Overflow
        };
        OverflowError {
            direction,
            sum,
            value,
        }
    })
}

/// テーブルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// 相手の残り駒数で分類
    EnemyCount,
    /// 盤上の総駒数で分類
    PieceCount,
}

impl TableKind {
    /// 出力順
    pub const ALL: [TableKind; 2] = [TableKind::EnemyCount, TableKind::PieceCount];

    /// 出力の `condition` ラベル
    pub const fn label(self) -> &'static str {
        match self {
            TableKind::EnemyCount => "Number of Enemies",
            TableKind::PieceCount => "Number of pieces",
        }
    }

    /// バケット 0 に対応する駒数
    pub const fn min_count(self, bounds: &CountBounds) -> usize {
        match self {
            TableKind::EnemyCount => bounds.min_enemy,
            TableKind::PieceCount => bounds.min_piece,
        }
    }
}

/// 1 マス分の集計値
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupCell {
    pub sum: i64,
    pub count: i64,
}

impl LookupCell {
    /// 値を 1 件追加
    #[inline]
    pub fn record(&mut self, value: i64) -> std::result::Result<(), OverflowError> {
        let sum = checked_accumulate(self.sum, value)?;
        self.count = checked_accumulate(self.count, 1)?;
        self.sum = sum;
        Ok(())
    }

    /// 他のセルを加算
    #[inline]
    pub fn merge(&mut self, other: &LookupCell) -> std::result::Result<(), OverflowError> {
        let sum = checked_accumulate(self.sum, other.sum)?;
        self.count = checked_accumulate(self.count, other.count)?;
        self.sum = sum;
        Ok(())
    }

    /// 平均値（0 方向への切り捨て）。件数 0 なら 0。
    pub fn average(&self) -> Result<i32> {
        if self.count == 0 {
            return Ok(0);
        }
        let average = self.sum / self.count;
        i32::try_from(average).map_err(|_| AggregateError::AverageOutOfRange {
            sum: self.sum,
            count: self.count,
            average,
        })
    }
}

/// `(バケット, 駒, マス)` で引く密な表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    buckets: usize,
    cells: Vec<LookupCell>,
}

impl LookupTable {
    const CELLS_PER_BUCKET: usize = Piece::NUM * Square::NUM;

    pub fn new(buckets: usize) -> Self {
        Self {
            buckets,
            cells: vec![LookupCell::default(); buckets * Self::CELLS_PER_BUCKET],
        }
    }

    #[inline]
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    #[inline]
    fn offset(&self, bucket: usize, piece: Piece, sq: Square) -> Result<usize> {
        if bucket >= self.buckets {
            return Err(AggregateError::IndexOutOfRange {
                what: "bucket",
                index: bucket,
                len: self.buckets,
            });
        }
        Ok(bucket * Self::CELLS_PER_BUCKET + piece.index() * Square::NUM + sq.index())
    }

    pub fn cell(&self, bucket: usize, piece: Piece, sq: Square) -> Option<&LookupCell> {
        let offset = self.offset(bucket, piece, sq).ok()?;
        self.cells.get(offset)
    }

    /// 1 件記録
    pub fn record(&mut self, bucket: usize, piece: Piece, sq: Square, value: i64) -> Result<()> {
        let offset = self.offset(bucket, piece, sq)?;
        self.cells[offset].record(value)?;
        Ok(())
    }

    /// `(バケット, 駒)` の 64 マス分
    pub fn board(&self, bucket: usize, piece: Piece) -> Option<&[LookupCell]> {
        if bucket >= self.buckets {
            return None;
        }
        let start = bucket * Self::CELLS_PER_BUCKET + piece.index() * Square::NUM;
        self.cells.get(start..start + Square::NUM)
    }

    /// セルごとに加算
    pub fn merge(&mut self, other: &LookupTable) -> Result<()> {
        if self.buckets != other.buckets {
            return Err(AggregateError::ShapeMismatch {
                left: (self.buckets, self.cells.len()),
                right: (other.buckets, other.cells.len()),
            });
        }
        for (dst, src) in self.cells.iter_mut().zip(&other.cells) {
            dst.merge(src)?;
        }
        Ok(())
    }

    /// 全セルの件数の合計
    pub fn total_count(&self) -> Result<i64> {
        let mut total = 0i64;
        for cell in &self.cells {
            total = checked_accumulate(total, cell.count)?;
        }
        Ok(total)
    }
}

/// 敵駒数テーブルと総駒数テーブルの組
///
/// ワーカーごとに 1 つ持ち、最後に集約側で 1 つにマージする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTables {
    bounds: CountBounds,
    enemy: LookupTable,
    pieces: LookupTable,
    positions: i64,
}

impl LookupTables {
    pub fn new(bounds: CountBounds) -> Self {
        Self {
            bounds,
            enemy: LookupTable::new(bounds.enemy_buckets()),
            pieces: LookupTable::new(bounds.piece_buckets()),
            positions: 0,
        }
    }

    #[inline]
    pub fn bounds(&self) -> &CountBounds {
        &self.bounds
    }

    #[inline]
    pub fn table(&self, kind: TableKind) -> &LookupTable {
        match kind {
            TableKind::EnemyCount => &self.enemy,
            TableKind::PieceCount => &self.pieces,
        }
    }

    /// 集計に採用した局面数
    #[inline]
    pub fn positions(&self) -> i64 {
        self.positions
    }

    /// 指定テーブルのセルに 1 件記録
    pub fn record(
        &mut self,
        kind: TableKind,
        bucket: usize,
        piece: Piece,
        sq: Square,
        value: i64,
    ) -> Result<()> {
        match kind {
            TableKind::EnemyCount => self.enemy.record(bucket, piece, sq, value),
            TableKind::PieceCount => self.pieces.record(bucket, piece, sq, value),
        }
    }

    /// 局面 1 つ分を記録
    ///
    /// 駒のある全マスについて、その駒から見た相手の駒数と総駒数の
    /// 両テーブルへ `value` を加える。
    pub fn record_board(&mut self, board: &Board, value: i64) -> Result<()> {
        let piece_bucket = Self::bucket(board.total_count(), self.bounds.min_piece)?;
        for (sq, piece) in board.occupied() {
            let enemies = board.count(!piece.color());
            let enemy_bucket = Self::bucket(enemies, self.bounds.min_enemy)?;
            self.enemy.record(enemy_bucket, piece, sq, value)?;
            self.pieces.record(piece_bucket, piece, sq, value)?;
        }
        self.positions = checked_accumulate(self.positions, 1)?;
        Ok(())
    }

    #[inline]
    fn bucket(count: usize, min: usize) -> Result<usize> {
        match count.checked_sub(min) {
            Some(bucket) => Ok(bucket),
            None => Err(AggregateError::IndexOutOfRange {
                what: "bucket",
                index: count,
                len: min,
            }),
        }
    }

    /// 他の集計を加算
    pub fn merge(&mut self, other: &LookupTables) -> Result<()> {
        self.enemy.merge(&other.enemy)?;
        self.pieces.merge(&other.pieces)?;
        self.positions = checked_accumulate(self.positions, other.positions)?;
        Ok(())
    }
}
