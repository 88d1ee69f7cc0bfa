//! Типизированные ошибки ядра (store / diff / extract).
//!
//! Политика (см. README, таблица ошибок):
//! - StoreError   — возвращается вызывающему ingest; не ретраится автоматически,
//!   scope остаётся рабочим при следующем вызове.
//! - DiffError    — фоновая: логируется, артефакт и downstream пропускаются,
//!   сам ingest не затронут (снапшот уже закоммичен).
//! - ParseError   — весь набор change-записей перехода отбрасывается целиком,
//!   частичный результат не эмитится никогда.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки SnapshotStore (счётчик, тела снапшотов, scope-каталоги).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid namespace {0:?} (allowed charset: [A-Za-z0-9_.-]+)")]
    InvalidNamespace(String),

    #[error("invalid source {0:?} (allowed charset: [A-Za-z0-9_-]+)")]
    InvalidSource(String),

    #[error("bad counter file {}: {reason}", .path.display())]
    BadCounter { path: PathBuf, reason: String },

    #[error("cannot decompress gzip body: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("store i/o at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Ошибки вызова внешнего diff-инструмента.
///
/// Ненулевой код выхода 1 («файлы различаются») ошибкой НЕ является —
/// это успех с непустым выводом.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("cannot spawn diff tool {bin:?}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("diff tool exited with code {code:?} (expected 0 or 1)")]
    ToolFailed { code: Option<i32> },

    #[error("diff tool timed out after {ms} ms")]
    Timeout { ms: u64 },

    #[error("diff artifact i/o at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ошибки разбора diff-текста конечным автоматом.
#[derive(Debug, Error)]
pub enum ParseError {
    /// До конца входа не встретился ни один range-заголовок и ни один блок
    /// не был разобран: артефакт нечитаем, результат пуст.
    #[error("diff text is unparseable: no range header found")]
    Unparseable,

    /// Строка внутри блока не подошла ни под один элемент грамматики —
    /// жёсткая ошибка, все записи перехода отбрасываются.
    #[error("cannot parse diff line {line_no}: {line:?}")]
    UnexpectedLine { line_no: usize, line: String },
}
