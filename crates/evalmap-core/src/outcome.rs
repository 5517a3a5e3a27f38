//! 局面単位の処理結果

/// 集計対象外として読み飛ばした理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// 駒数が設定範囲外
    PieceCountOutOfBounds,
    /// 使える評価値が 1 つもない
    NoUsableEvaluation,
}

/// 採用 or 読み飛ばし
///
/// 致命的なエラーは `Result` の `Err` 側で返し、ここには含めない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Accept(T),
    Skip(SkipReason),
}

impl<T> Outcome<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Outcome::Accept(v) => Some(v),
            Outcome::Skip(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Outcome::Accept(_) => None,
            Outcome::Skip(reason) => Some(*reason),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Outcome::Skip(_))
    }
}
