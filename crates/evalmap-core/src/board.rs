//! FEN 形式の盤面デコード
//!
//! 配置部と手番のみを読み、キャスリング権などの残りのフィールドは無視する。
//! 表記の破損は致命的エラー、駒数の範囲外は読み飛ばしとして区別する。

use crate::config::CountBounds;
use crate::error::FenError;
use crate::outcome::{Outcome, SkipReason};
use crate::types::{BOARD_HEIGHT, BOARD_WIDTH, Color, Piece, Square};

/// デコード済みの盤面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; Square::NUM],
    side_to_move: Color,
    white_count: usize,
    black_count: usize,
}

impl Board {
    /// FEN 文字列から盤面をデコード
    ///
    /// 駒数が `bounds` の範囲外なら `Outcome::Skip` を返す。
    pub fn from_fen(fen: &str, bounds: &CountBounds) -> Result<Outcome<Board>, FenError> {
        let board = Self::parse_fen(fen)?;
        if board.in_bounds(bounds) {
            Ok(Outcome::Accept(board))
        } else {
            Ok(Outcome::Skip(SkipReason::PieceCountOutOfBounds))
        }
    }

    /// 駒数の範囲を見ずに FEN をパース
    pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
        let (placement, rest) = match fen.find([' ', '\t']) {
            Some(i) => (&fen[..i], &fen[i + 1..]),
            None => {
                return Err(FenError::MissingSideToMove {
                    fen: fen.to_string(),
                });
            }
        };

        let side_to_move = rest
            .chars()
            .next()
            .and_then(Color::from_fen_char)
            .ok_or_else(|| FenError::MissingSideToMove {
                fen: fen.to_string(),
            })?;

        let mut board = Board {
            squares: [None; Square::NUM],
            side_to_move,
            white_count: 0,
            black_count: 0,
        };
        board.parse_placement(placement, fen)?;
        Ok(board)
    }

    /// 配置部をパース（8 段目から 1 段目へ）
    fn parse_placement(&mut self, placement: &str, fen: &str) -> Result<(), FenError> {
        let mut ranks = 0;

        for (i, rank_str) in placement.split('/').enumerate() {
            if i >= BOARD_HEIGHT {
                return Err(FenError::TooManyRanks {
                    fen: fen.to_string(),
                });
            }
            let rank = BOARD_HEIGHT - 1 - i;
            let mut file = 0usize;

            for c in rank_str.chars() {
                if let Some(run) = c.to_digit(10) {
                    file += run as usize;
                    if file > BOARD_WIDTH {
                        return Err(FenError::RankWidth {
                            rank: rank + 1,
                            width: file,
                            fen: fen.to_string(),
                        });
                    }
                    continue;
                }

                let piece = Piece::from_fen_char(c).ok_or_else(|| FenError::UnknownPiece {
                    piece: c,
                    fen: fen.to_string(),
                })?;
                let sq = Square::new(file, rank).ok_or_else(|| FenError::RankWidth {
                    rank: rank + 1,
                    width: file + 1,
                    fen: fen.to_string(),
                })?;

                self.squares[sq.index()] = Some(piece);
                match piece.color() {
                    Color::White => self.white_count += 1,
                    Color::Black => self.black_count += 1,
                }
                file += 1;
            }

            if file != BOARD_WIDTH {
                return Err(FenError::RankWidth {
                    rank: rank + 1,
                    width: file,
                    fen: fen.to_string(),
                });
            }
            ranks += 1;
        }

        if ranks != BOARD_HEIGHT {
            return Err(FenError::TooFewRanks {
                ranks,
                fen: fen.to_string(),
            });
        }
        Ok(())
    }

    /// 駒数が範囲内か
    pub fn in_bounds(&self, bounds: &CountBounds) -> bool {
        bounds.side_in_bounds(self.white_count)
            && bounds.side_in_bounds(self.black_count)
            && bounds.total_in_bounds(self.total_count())
    }

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// 指定手番の駒数
    #[inline]
    pub fn count(&self, color: Color) -> usize {
        match color {
            Color::White => self.white_count,
            Color::Black => self.black_count,
        }
    }

    #[inline]
    pub fn white_count(&self) -> usize {
        self.white_count
    }

    #[inline]
    pub fn black_count(&self) -> usize {
        self.black_count
    }

    #[inline]
    pub fn total_count(&self) -> usize {
        self.white_count + self.black_count
    }

    /// 駒のあるマスを a1 から h8 の順に列挙
    pub fn occupied(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(i, pc)| Some((Square::from_index(i)?, (*pc)?)))
    }
}
