//! Scope — двухуровневый идентификатор независимой последовательности снапшотов.
//!
//! (namespace, source): каждая пара владеет своим каталогом
//! <data>/<namespace>/<source>/ со своим счётчиком и своими артефактами.
//!
//! Валидация charset (она же — защита от path traversal, компоненты не могут
//! содержать '/', '..' и т.п.):
//! - namespace: [A-Za-z0-9_.-]+
//! - source:    [A-Za-z0-9_-]+

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId {
    namespace: String,
    source: String,
}

fn namespace_char_ok(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn source_char_ok(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl ScopeId {
    /// Построить scope с валидацией charset обеих компонент.
    pub fn new(namespace: &str, source: &str) -> Result<Self, StoreError> {
        if namespace.is_empty() || !namespace.chars().all(namespace_char_ok) {
            return Err(StoreError::InvalidNamespace(namespace.to_string()));
        }
        if source.is_empty() || !source.chars().all(source_char_ok) {
            return Err(StoreError::InvalidSource(source.to_string()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            source: source.to_string(),
        })
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Каталог scope под корнем данных.
    pub fn dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.namespace).join(&self.source)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.source)
    }
}

// -------- Имена файлов артефактов внутри каталога scope --------

/// Путь тела снапшота с индексом n.
pub fn snapshot_path(scope_dir: &Path, n: u64) -> PathBuf {
    scope_dir.join(n.to_string())
}

/// Путь diff-артефакта перехода (prior, new).
pub fn diff_path(scope_dir: &Path, prior: u64, new: u64) -> PathBuf {
    scope_dir.join(format!("{}.{}.{}", prior, new, crate::consts::DIFF_EXT))
}

/// Путь батча change-записей, производного от перехода в индекс j.
pub fn changes_path(scope_dir: &Path, new: u64) -> PathBuf {
    scope_dir.join(format!("{}.{}", new, crate::consts::CHANGES_SUFFIX))
}

/// Путь сплющенного по-файлового индекса снапшота n.
pub fn flat_index_path(scope_dir: &Path, n: u64) -> PathBuf {
    scope_dir.join(format!("{}.{}", n, crate::consts::FLAT_INDEX_SUFFIX))
}
