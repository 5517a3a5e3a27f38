//! 基本型

mod color;
mod piece;
mod square;

pub use color::Color;
pub use piece::{Piece, PieceType};
pub use square::{BOARD_HEIGHT, BOARD_WIDTH, Square};
