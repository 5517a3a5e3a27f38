//! 評価値の正規化
//!
//! 1 局面に付いた複数の読み筋（センチポーン値または詰み手数）を、
//! センチポーン換算の 1 つの代表値にまとめる。

use crate::config::{MateScoring, ScoreSelection};
use crate::error::OverflowError;
use crate::outcome::{Outcome, SkipReason};
use crate::table::checked_accumulate;
use crate::types::Color;

/// 1 本の読み筋の評価
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationLine {
    /// センチポーン値
    Score(i64),
    /// 詰みまでの手数（正 = 手番側が詰ます）
    Mate(i64),
}

/// 局面の評価値の集約結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionScore {
    /// 採用した読み筋の平均（0 方向への切り捨て）
    pub mean: i64,
    /// 手番側にとって最善の値
    pub best: i64,
    /// 採用した読み筋の数
    pub lines: usize,
}

impl PositionScore {
    /// 設定に従って代表値を選ぶ
    #[inline]
    pub fn select(&self, selection: ScoreSelection) -> i64 {
        match selection {
            ScoreSelection::Mean => self.mean,
            ScoreSelection::Best => self.best,
        }
    }
}

/// 詰み手数をセンチポーン換算
///
/// `ceiling - |mate| * step` に元の符号を付ける。減算後が負になる
/// （遠すぎる詰み）場合は信頼できない値として `None`。
pub fn mate_to_cp(mate: i64, scoring: &MateScoring) -> Option<i64> {
    let distance = i64::try_from(mate.unsigned_abs()).ok()?;
    let discount = distance.checked_mul(scoring.step)?;
    let cp = scoring.ceiling.checked_sub(discount)?;
    if cp < 0 {
        return None;
    }
    Some(if mate < 0 { -cp } else { cp })
}

/// 1 本の読み筋をセンチポーン値へ変換（使わない行は `None`）
#[inline]
pub fn line_to_cp(line: EvaluationLine, scoring: &MateScoring) -> Option<i64> {
    match line {
        EvaluationLine::Score(cp) => Some(cp),
        EvaluationLine::Mate(_) if scoring.ignore => None,
        EvaluationLine::Mate(m) => mate_to_cp(m, scoring),
    }
}

/// 採用値の平均（0 方向への切り捨て）
///
/// 空なら `None`。途中の和は桁あふれ検査を通す。
pub fn mean_score(values: &[i64]) -> Result<Option<i64>, OverflowError> {
    if values.is_empty() {
        return Ok(None);
    }
    let mut acc = 0i64;
    for &v in values {
        acc = checked_accumulate(acc, v)?;
    }
    Ok(Some(acc / values.len() as i64))
}

/// 手番側にとっての最善値（白は最大、黒は最小）
pub fn best_score(values: &[i64], side_to_move: Color) -> Option<i64> {
    match side_to_move {
        Color::White => values.iter().copied().max(),
        Color::Black => values.iter().copied().min(),
    }
}

/// 読み筋の集合を 1 つの評価値にまとめる
pub fn normalize(
    lines: &[EvaluationLine],
    side_to_move: Color,
    scoring: &MateScoring,
) -> Result<Outcome<PositionScore>, OverflowError> {
    let values: Vec<i64> = lines
        .iter()
        .filter_map(|&line| line_to_cp(line, scoring))
        .collect();

    let Some(mean) = mean_score(&values)? else {
        return Ok(Outcome::Skip(SkipReason::NoUsableEvaluation));
    };
    let Some(best) = best_score(&values, side_to_move) else {
        return Ok(Outcome::Skip(SkipReason::NoUsableEvaluation));
    };

    Ok(Outcome::Accept(PositionScore {
        mean,
        best,
        lines: values.len(),
    }))
}
