//! ScopeStore — хранилище одной последовательности снапшотов (namespace, source).
//!
//! write_snapshot выполняет read-increment-write счётчика как единое целое:
//! под эксклюзивным fs2-локом scope тело пишется по текущему индексу, затем
//! счётчик атомарно продвигается ровно на единицу. Конкурентные писатели
//! одного scope сериализуются; разные scope полностью независимы.
//!
//! Падение между записью тела и продвижением счётчика оставляет orphan-тело
//! с индексом >= счётчика. Такое тело невалидно по определению (счётчик его
//! не покрывает) и детерминированно удаляется при ensure() — следующая запись
//! получит тот же индекс заново.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::TimelineConfig;
use crate::errors::StoreError;
use crate::lock::acquire_exclusive_lock;
use crate::scope::{snapshot_path, ScopeId};
use crate::store::counter::{init_counter_if_absent, read_counter, write_counter};

pub struct ScopeStore {
    scope: ScopeId,
    dir: PathBuf,
}

impl ScopeStore {
    /// Открыть scope, создав каталог и счётчик при отсутствии, и убрать
    /// orphan-тела, оставшиеся после падения.
    pub fn ensure(cfg: &TimelineConfig, scope: &ScopeId) -> Result<Self, StoreError> {
        let dir = scope.dir(&cfg.data_dir);
        if !dir.is_dir() {
            log::info!("creating scope directory {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }

        let store = Self {
            scope: scope.clone(),
            dir,
        };
        // Инициализация счётчика и уборка orphan-тел — под одним эксклюзивным
        // локом scope: exists-проверка счётчика без лока гонится с rename
        // другого процесса и может откатить живой счётчик в ноль.
        {
            let _lock = acquire_exclusive_lock(&store.dir)?;
            init_counter_if_absent(&store.dir)?;
            store.sweep_orphans()?;
        }
        Ok(store)
    }

    #[inline]
    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Текущее значение счётчика (следующий свободный индекс), без побочных
    /// эффектов.
    pub fn next_index(&self) -> Result<u64, StoreError> {
        read_counter(&self.dir)
    }

    /// Записать тело снапшота по текущему индексу и продвинуть счётчик.
    ///
    /// Возвращает присвоенный индекс. Тело получает завершающий '\n', если его
    /// нет: внешний diff-инструмент шумит про missing final newline.
    pub fn write_snapshot(&self, body: &[u8]) -> Result<u64, StoreError> {
        let _lock = acquire_exclusive_lock(&self.dir)?;

        let index = read_counter(&self.dir)?;
        let path = snapshot_path(&self.dir, index);

        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        f.write_all(body).map_err(|e| StoreError::io(&path, e))?;
        if body.last() != Some(&b'\n') {
            f.write_all(b"\n").map_err(|e| StoreError::io(&path, e))?;
        }
        f.sync_all().map_err(|e| StoreError::io(&path, e))?;

        // Точка коммита: счётчик ушёл за index, тело стало валидным.
        write_counter(&self.dir, index + 1)?;

        log::info!(
            "scope {}: snapshot {} committed ({} bytes)",
            self.scope,
            index,
            body.len()
        );
        Ok(index)
    }

    /// Прочитать тело закоммиченного снапшота. None — индекс вне счётчика
    /// либо тело отсутствует на диске.
    pub fn read_snapshot(&self, index: u64) -> Result<Option<Vec<u8>>, StoreError> {
        if index >= read_counter(&self.dir)? {
            return Ok(None);
        }
        let path = snapshot_path(&self.dir, index);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Есть ли на диске тело снапшота index (без проверки счётчика; используется
    /// prior-сканом DiffInvoker по уже закоммиченным индексам).
    pub fn has_body(&self, index: u64) -> bool {
        snapshot_path(&self.dir, index).is_file()
    }

    /// Удалить тела с индексами >= счётчика (не покрыты коммитом).
    /// Вызывается только под эксклюзивным локом scope: параллельный
    /// write_snapshot другого хэндла мог уже записать тело, но ещё не
    /// продвинуть счётчик.
    fn sweep_orphans(&self) -> Result<(), StoreError> {
        let next = read_counter(&self.dir)?;
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(n) = name.to_str().and_then(|s| s.parse::<u64>().ok()) else {
                continue;
            };
            if n >= next {
                let path = entry.path();
                log::warn!(
                    "scope {}: discarding orphan snapshot body {} (counter at {})",
                    self.scope,
                    path.display(),
                    next
                );
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            }
        }
        Ok(())
    }
}
