//! Общие константы раскладки данных на диске и дефолты конфигурации.

// -------- Раскладка каталога scope: <data>/<namespace>/<source>/ --------

// Счётчик следующего индекса (durable, атомарная перезапись tmp+rename).
pub const COUNTER_FILE: &str = ".counter";
pub const COUNTER_MAGIC: &[u8; 8] = b"TLCOUNT1";
// [magic8][u64 LE next_index]
pub const COUNTER_SIZE: usize = 16;

// Advisory-лок на scope (fs2). Берётся на время write_snapshot.
pub const LOCK_FILE: &str = "LOCK";

// Снапшоты лежат как простые файлы "<n>" (n = индекс).
// Производные артефакты перехода (i = ближайший prior с данными, j = новый):
pub const DIFF_EXT: &str = "diff"; // "<i>.<j>.diff"
pub const CHANGES_SUFFIX: &str = "changes.json"; // "<j>.changes.json"
pub const FLAT_INDEX_SUFFIX: &str = "index.json"; // "<n>.index.json"

// -------- Дефолты конфигурации --------

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_DIFF_BIN: &str = "diff";
// -w: игнор whitespace, -B: игнор пустых строк (см. контракт DiffInvoker).
pub const DEFAULT_DIFF_ARGS: [&str; 2] = ["-w", "-B"];
pub const DEFAULT_DIFF_TIMEOUT_MS: u64 = 30_000;
// Шаг опроса child-процесса diff при ожидании с таймаутом.
pub const DIFF_POLL_INTERVAL_MS: u64 = 10;
