//! マス（Square）

/// 盤の幅（筋の数）
pub const BOARD_WIDTH: usize = 8;
/// 盤の高さ（段の数）
pub const BOARD_HEIGHT: usize = BOARD_WIDTH;

/// 盤上のマス（0..64）
///
/// `rank * 8 + file` で a1 = 0, h1 = 7, a8 = 56, h8 = 63。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

impl Square {
    /// マスの数
    pub const NUM: usize = BOARD_WIDTH * BOARD_HEIGHT;

    /// 筋と段（いずれも 0 始まり）から生成
    #[inline]
    pub const fn new(file: usize, rank: usize) -> Option<Square> {
        if file >= BOARD_WIDTH || rank >= BOARD_HEIGHT {
            return None;
        }
        Some(Square((rank * BOARD_WIDTH + file) as u8))
    }

    #[inline]
    pub const fn from_index(index: usize) -> Option<Square> {
        if index >= Square::NUM {
            return None;
        }
        Some(Square(index as u8))
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn file(self) -> usize {
        self.index() % BOARD_WIDTH
    }

    #[inline]
    pub const fn rank(self) -> usize {
        self.index() / BOARD_WIDTH
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = (b'a' + self.file() as u8) as char;
        write!(f, "{file}{}", self.rank() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_layout() {
        assert_eq!(Square::new(0, 0).unwrap().index(), 0);
        assert_eq!(Square::new(7, 0).unwrap().index(), 7);
        assert_eq!(Square::new(0, 7).unwrap().index(), 56);
        assert_eq!(Square::new(7, 7).unwrap().to_string(), "h8");
        assert_eq!(Square::new(8, 0), None);
        assert_eq!(Square::from_index(64), None);
    }
}
