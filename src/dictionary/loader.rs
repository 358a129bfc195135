//! 辞書ファイルの読み込み関数

use std::path::{
    Path,
    PathBuf,
};

use serde::Deserialize;
use thiserror::Error;

use super::{
    DictionaryEntry,
    DictionaryIndex,
    normalize,
};

/// 辞書の読み込みエラー
///
/// いずれも起動時に発生し、サーバーは起動を中止する。
#[derive(Error, Debug)]
pub enum LoadError {
    /// ファイルが存在しない、または読み込めない
    #[error("Failed to read dictionary file '{}': {source}", path.display())]
    Io {
        /// 辞書ファイルのパス
        path: PathBuf,
        /// 元のエラー
        #[source]
        source: std::io::Error,
    },

    /// JSON の構造が不正
    #[error("Failed to parse dictionary: {0}")]
    Parse(#[from] serde_json::Error),

    /// エントリーが一件もない
    #[error("Dictionary contains no entries")]
    Empty,

    /// 正規化すると空になるソースフレーズ
    #[error("Dictionary entry #{index} has a blank source phrase")]
    BlankSourcePhrase {
        /// 0 始まりのエントリー番号
        index: usize,
    },
}

/// 辞書ファイルのトップレベル構造
#[derive(Debug, Deserialize)]
struct DictionaryFile {
    /// エントリー一覧
    translations: Vec<DictionaryEntry>,
}

/// 辞書ファイルを読み込んでインデックスを構築する
///
/// # Arguments
/// * `path` - 辞書ファイルのパス
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON パースエラー
/// - 空の辞書、空のソースフレーズ
pub fn load(path: &Path) -> Result<DictionaryIndex, LoadError> {
    tracing::debug!("Loading dictionary from: {:?}", path);

    let content = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;

    parse(&content)
}

/// 辞書ファイルの内容からインデックスを構築する
///
/// # Errors
/// - JSON パースエラー
/// - 空の辞書、空のソースフレーズ
pub fn parse(content: &str) -> Result<DictionaryIndex, LoadError> {
    let file: DictionaryFile = serde_json::from_str(content)?;

    if file.translations.is_empty() {
        return Err(LoadError::Empty);
    }

    if let Some(index) =
        file.translations.iter().position(|entry| normalize(&entry.source_phrase).is_empty())
    {
        return Err(LoadError::BlankSourcePhrase { index });
    }

    let entry_count = file.translations.len();
    let index = DictionaryIndex::from_entries(file.translations);
    tracing::debug!(entries = entry_count, phrases = index.len(), "Dictionary parsed");

    Ok(index)
}
