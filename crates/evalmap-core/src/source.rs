//! 入力ソース
//!
//! ワーカーごとに独立した読み取りハンドルを開けること、長さが分かること
//! だけを要求する。

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AggregateError, Result};

/// シーク可能なバイト列の入力
pub trait ByteSource: Send + Sync {
    type Reader: Read + Seek + Send;

    /// 全体のバイト数
    fn len(&self) -> Result<u64>;

    /// 新しい読み取りハンドルを開く
    fn open(&self) -> Result<Self::Reader>;

    /// ログ用の名前
    fn describe(&self) -> String;
}

/// 圧縮形式の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    Plain,
    Gzip,
    Zstd,
}

impl CompressionKind {
    fn name(self) -> &'static str {
        match self {
            CompressionKind::Plain => "plain",
            CompressionKind::Gzip => "gzip",
            CompressionKind::Zstd => "zstd",
        }
    }
}

/// 先頭のマジックバイトから圧縮形式を判定
pub fn sniff_compression<R: Read>(mut reader: R) -> io::Result<CompressionKind> {
    let mut magic = [0u8; 4];
    let mut n = 0;
    while n < magic.len() {
        let read = reader.read(&mut magic[n..])?;
        if read == 0 {
            break;
        }
        n += read;
    }
    if n >= 2 && magic[0] == 0x1F && magic[1] == 0x8B {
        return Ok(CompressionKind::Gzip);
    }
    if n >= 4 && magic == [0x28, 0xB5, 0x2F, 0xFD] {
        return Ok(CompressionKind::Zstd);
    }
    Ok(CompressionKind::Plain)
}

/// ファイル入力
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// ファイルを確認して入力ソースを作る
    ///
    /// バイト範囲で分割するため、圧縮ファイルは受け付けない。
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let kind = sniff_compression(File::open(&path)?)?;
        if kind != CompressionKind::Plain {
            return Err(AggregateError::CompressedInput {
                path: path.display().to_string(),
                kind: kind.name(),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    type Reader = File;

    fn len(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn open(&self) -> Result<File> {
        Ok(File::open(&self.path)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// メモリ上のバイト列
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    type Reader = Cursor<Arc<[u8]>>;

    fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn open(&self) -> Result<Self::Reader> {
        Ok(Cursor::new(Arc::clone(&self.data)))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.data.len())
    }
}
