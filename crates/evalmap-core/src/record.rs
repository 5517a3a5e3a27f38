//! 入力 JSONL の 1 レコード
//!
//! 集計に使うフィールドだけを読む。それ以外（読み筋の指し手、深さ、
//! ノード数など）は無視する。

use serde::Deserialize;

use crate::score::EvaluationLine;

/// 読み筋 1 本分
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PvRecord {
    #[serde(default)]
    pub cp: Option<i64>,
    #[serde(default)]
    pub mate: Option<i64>,
}

impl PvRecord {
    /// `mate` が非 0 なら詰み、それ以外は `cp`（無ければ 0）
    pub fn to_line(&self) -> EvaluationLine {
        match self.mate {
            Some(m) if m != 0 => EvaluationLine::Mate(m),
            _ => EvaluationLine::Score(self.cp.unwrap_or(0)),
        }
    }
}

/// 1 回分の解析結果
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvalPass {
    #[serde(default)]
    pub pvs: Vec<PvRecord>,
}

/// 局面と解析結果
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    pub fen: String,
    #[serde(default)]
    pub evals: Vec<EvalPass>,
}

impl PositionRecord {
    /// 最初の解析結果の読み筋（解析結果が無ければ空）
    pub fn first_pass_lines(&self) -> Vec<EvaluationLine> {
        self.evals
            .first()
            .map(|pass| pass.pvs.iter().map(PvRecord::to_line).collect())
            .unwrap_or_default()
    }
}
