//! 駒（Piece）

use super::Color;

/// 駒の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PieceType {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceType {
    pub const NUM: usize = 6;

    pub const ALL: [PieceType; PieceType::NUM] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PieceType::Pawn => "pawn",
            PieceType::Knight => "knight",
            PieceType::Bishop => "bishop",
            PieceType::Rook => "rook",
            PieceType::Queen => "queen",
            PieceType::King => "king",
        }
    }
}

/// 手番付きの駒
///
/// インデックスは白の P N B R Q K が 0..6、黒が 6..12。
/// 集計テーブルの駒次元と出力順はこの並びに従う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    color: Color,
    piece_type: PieceType,
}

impl Piece {
    /// 駒の数（手番 × 駒種）
    pub const NUM: usize = Color::NUM * PieceType::NUM;

    #[inline]
    pub const fn new(color: Color, piece_type: PieceType) -> Piece {
        Piece { color, piece_type }
    }

    #[inline]
    pub const fn color(self) -> Color {
        self.color
    }

    #[inline]
    pub const fn piece_type(self) -> PieceType {
        self.piece_type
    }

    /// テーブル上のインデックス
    #[inline]
    pub const fn index(self) -> usize {
        self.color.index() * PieceType::NUM + self.piece_type as usize
    }

    /// インデックスから駒を復元
    pub const fn from_index(index: usize) -> Option<Piece> {
        if index >= Piece::NUM {
            return None;
        }
        let color = if index < PieceType::NUM {
            Color::White
        } else {
            Color::Black
        };
        let piece_type = PieceType::ALL[index % PieceType::NUM];
        Some(Piece::new(color, piece_type))
    }

    /// FEN の駒文字から変換（大文字 = 白）
    pub const fn from_fen_char(c: char) -> Option<Piece> {
        let piece_type = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'r' => PieceType::Rook,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(color, piece_type))
    }

    /// 出力用の名前（例: "white pawn"）
    pub fn name(self) -> String {
        format!("{} {}", self.color.name(), self.piece_type.name())
    }

    /// 全駒をインデックス順に列挙
    pub fn all() -> impl Iterator<Item = Piece> {
        (0..Piece::NUM).filter_map(Piece::from_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_index_roundtrip() {
        for i in 0..Piece::NUM {
            let pc = Piece::from_index(i).unwrap();
            assert_eq!(pc.index(), i);
        }
        assert_eq!(Piece::from_index(Piece::NUM), None);
    }

    #[test]
    fn test_piece_from_fen_char_is_case_sensitive() {
        let white_queen = Piece::from_fen_char('Q').unwrap();
        assert_eq!(white_queen.color(), Color::White);
        assert_eq!(white_queen.piece_type(), PieceType::Queen);

        let black_knight = Piece::from_fen_char('n').unwrap();
        assert_eq!(black_knight.color(), Color::Black);
        assert_eq!(black_knight.index(), 7);

        assert_eq!(Piece::from_fen_char('x'), None);
        assert_eq!(Piece::from_fen_char('1'), None);
    }

    #[test]
    fn test_piece_names_follow_index_order() {
        let names: Vec<String> = Piece::all().map(Piece::name).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "white pawn");
        assert_eq!(names[5], "white king");
        assert_eq!(names[6], "black pawn");
        assert_eq!(names[11], "black king");
    }
}
