//! 集計結果の出力
//!
//! マージ済みテーブルを `(テーブル, バケット, 駒)` ごとの 64 マスの平均値へ
//! 変換し、1 つの JSON 配列として書き出す。

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{AggregateError, Result};
use crate::table::{LookupTables, TableKind, checked_accumulate};
use crate::types::{Piece, Square};

/// 出力配列の 1 要素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedBoardEntry {
    /// 駒の名前（例: "white pawn"）
    pub piece: String,
    /// 分類の名前
    pub condition: String,
    /// 分類の値（駒数）
    pub condition_value: i32,
    /// a1 = 0 .. h8 = 63 の順の平均評価値
    #[serde(with = "square_array")]
    pub board: [i32; Square::NUM],
    /// 64 マスの件数の合計
    pub num_cases: i32,
}

/// 64 要素の配列を JSON 配列として読み書きする
mod square_array {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::Square;

    pub fn serialize<S>(board: &[i32; Square::NUM], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(board)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[i32; Square::NUM], D::Error>
    where
        D: Deserializer<'de>,
    {
        let cells = Vec::<i32>::deserialize(deserializer)?;
        let len = cells.len();
        cells
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"64 squares"))
    }
}

/// 件数や分類値を出力用の `i32` に変換する
fn to_i32(what: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| AggregateError::IndexOutOfRange {
        what,
        index: value,
        len: i32::MAX as usize,
    })
}

/// マージ済みテーブルから出力要素を作る
///
/// 敵駒数テーブル、総駒数テーブルの順。各テーブル内はバケット順、
/// バケット内は駒のインデックス順。
pub fn build_entries(tables: &LookupTables) -> Result<Vec<ExportedBoardEntry>> {
    let bounds = tables.bounds();
    let capacity = Piece::NUM * (bounds.enemy_buckets() + bounds.piece_buckets());
    let mut entries = Vec::with_capacity(capacity);

    for kind in TableKind::ALL {
        let table = tables.table(kind);
        let min = kind.min_count(bounds);
        for bucket in 0..table.buckets() {
            let condition_value = to_i32("condition value", bucket + min)?;
            for piece in Piece::all() {
                let Some(cells) = table.board(bucket, piece) else {
                    return Err(AggregateError::IndexOutOfRange {
                        what: "bucket",
                        index: bucket,
                        len: table.buckets(),
                    });
                };

                let mut board = [0i32; Square::NUM];
                let mut cases = 0i64;
                for (avg, cell) in board.iter_mut().zip(cells) {
                    *avg = cell.average()?;
                    cases = checked_accumulate(cases, cell.count)?;
                }
                let num_cases = i32::try_from(cases)
                    .map_err(|_| AggregateError::CaseCountOutOfRange { count: cases })?;

                entries.push(ExportedBoardEntry {
                    piece: piece.name(),
                    condition: kind.label().to_string(),
                    condition_value,
                    board,
                    num_cases,
                });
            }
        }
    }
    Ok(entries)
}

/// 出力要素の書き出し先
pub trait ArtifactSink: Send {
    /// 全要素を 1 回で書き出す
    fn write_entries(&mut self, entries: &[ExportedBoardEntry]) -> Result<()>;

    /// ログ用の名前
    fn describe(&self) -> String;
}

/// JSON ファイル（`-` なら標準出力、拡張子 `.gz` なら gzip）
///
/// ファイルへは同じディレクトリの一時ファイルに書いてから置き換えるため、
/// 書き出しに失敗しても途中までの内容は残らない。
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_stdout(&self) -> bool {
        self.path.as_os_str() == "-"
    }

    fn is_gzip(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
    }
}

impl ArtifactSink for JsonFileSink {
    fn write_entries(&mut self, entries: &[ExportedBoardEntry]) -> Result<()> {
        if self.is_stdout() {
            let mut out = io::stdout().lock();
            write_artifact(&mut out, entries)?;
            out.flush()?;
            return Ok(());
        }
        replace_file(&self.path, self.is_gzip(), |w| write_artifact(w, entries))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// `path` と同じディレクトリの一時ファイルに書き、成功したら置き換える
fn replace_file<F>(path: &Path, gzip: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp = BufWriter::new(NamedTempFile::new_in(dir)?);

    let tmp = if gzip {
        let mut enc = GzEncoder::new(tmp, Compression::default());
        write(&mut enc)?;
        enc.finish()?
    } else {
        let mut tmp = tmp;
        write(&mut tmp)?;
        tmp
    };
    let tmp = tmp.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// メモリ上に保持する
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Option<Vec<ExportedBoardEntry>>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き出された要素（未書き出しなら `None`）
    pub fn entries(&self) -> Option<&[ExportedBoardEntry]> {
        self.entries.as_deref()
    }

    /// 書き出し回数
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ArtifactSink for MemorySink {
    fn write_entries(&mut self, entries: &[ExportedBoardEntry]) -> Result<()> {
        self.entries = Some(entries.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

/// JSON 配列と末尾の改行を書き出す
pub fn write_artifact<W>(w: &mut W, entries: &[ExportedBoardEntry]) -> Result<()>
where
    W: Write + ?Sized,
{
    serde_json::to_writer(&mut *w, entries)
        .map_err(AggregateError::Encode)?;
    w.write_all(b"\n")?;
    Ok(())
}
