//! Centralized configuration for TimelineDB.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - TimelineConfig::from_env() reads TL_* env vars; fluent with_* setters
//!   override specific fields (builder-style, как в остальном коде).
//!
//! Env vars:
//! - TL_DATA_DIR         — корень данных (default "./data")
//! - TL_DIFF_BIN         — бинарь line-diff инструмента (default "diff")
//! - TL_DIFF_TIMEOUT_MS  — таймаут одного вызова diff (default 30000)
//! - TL_FLATTEN_INDEX    — писать ли <n>.index.json на ingest (default on)

use std::path::PathBuf;

use crate::consts::{
    DEFAULT_DATA_DIR, DEFAULT_DIFF_ARGS, DEFAULT_DIFF_BIN, DEFAULT_DIFF_TIMEOUT_MS,
};

#[derive(Clone, Debug)]
pub struct TimelineConfig {
    /// Корень данных: <data_dir>/<namespace>/<source>/...
    pub data_dir: PathBuf,

    /// Исполняемый файл генерического line-diff инструмента.
    pub diff_bin: String,

    /// Аргументы diff. Дефолт ["-w", "-B"]: нечувствительность к whitespace
    /// и пустым строкам — часть контракта с парсером.
    pub diff_args: Vec<String>,

    /// Таймаут одного вызова diff в миллисекундах. По истечении переход
    /// бросается (не ретраится), child убивается.
    pub diff_timeout_ms: u64,

    /// Писать ли сплющенный по-файловый индекс <n>.index.json при ingest.
    pub flatten_index: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            diff_bin: DEFAULT_DIFF_BIN.to_string(),
            diff_args: DEFAULT_DIFF_ARGS.iter().map(|s| s.to_string()).collect(),
            diff_timeout_ms: DEFAULT_DIFF_TIMEOUT_MS,
            flatten_index: true,
        }
    }
}

impl TimelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TL_DATA_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.data_dir = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("TL_DIFF_BIN") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.diff_bin = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("TL_DIFF_TIMEOUT_MS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.diff_timeout_ms = n;
            }
        }

        if let Ok(v) = std::env::var("TL_FLATTEN_INDEX") {
            let s = v.trim().to_ascii_lowercase();
            cfg.flatten_index = !(s == "0" || s == "false" || s == "off" || s == "no");
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_diff_bin<S: Into<String>>(mut self, bin: S) -> Self {
        self.diff_bin = bin.into();
        self
    }

    pub fn with_diff_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.diff_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_diff_timeout_ms(mut self, ms: u64) -> Self {
        self.diff_timeout_ms = ms;
        self
    }

    pub fn with_flatten_index(mut self, on: bool) -> Self {
        self.flatten_index = on;
        self
    }
}
