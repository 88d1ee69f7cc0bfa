//! timeline — верхнеуровневый хэндл сервиса (аналог Db).
//!
//! ingest(): валидация scope → (опционально) gunzip → синхронный коммит
//! снапшота → сплющивание конверта для downstream-индекса → постановка
//! фоновой переработки. Ответ ингеста не зависит от судьбы фоновой части:
//! снапшот уже закоммичен, всё остальное пересчитываемо.
//!
//! Сериализация писателей одного scope: in-process mutex на scope плюс
//! эксклюзивный fs2-лок внутри write_snapshot (на случай второго процесса).

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use flate2::read::GzDecoder;

use crate::config::TimelineConfig;
use crate::errors::StoreError;
use crate::pipeline::replay_scope;
use crate::record::{ChangeRecord, SnapshotEnvelope};
use crate::scope::{changes_path, flat_index_path, ScopeId};
use crate::sink::{load_batch, ChangeIndexWriter, NullIndexWriter};
use crate::store::ScopeStore;
use crate::worker::WorkerPool;

/// Результат успешного ингеста: присвоенный индекс и размер сохранённого тела.
#[derive(Clone, Copy, Debug)]
pub struct IngestReceipt {
    pub index: u64,
    pub bytes: usize,
}

pub struct Timeline {
    cfg: TimelineConfig,
    sink: Arc<dyn ChangeIndexWriter>,
    workers: WorkerPool,
    write_locks: Mutex<HashMap<ScopeId, Arc<Mutex<()>>>>,
}

impl Timeline {
    /// Открыть сервис с NullIndexWriter (downstream-индекс не подключён).
    pub fn open(cfg: TimelineConfig) -> Self {
        Self::with_sink(cfg, Arc::new(NullIndexWriter))
    }

    pub fn with_sink(cfg: TimelineConfig, sink: Arc<dyn ChangeIndexWriter>) -> Self {
        Self {
            workers: WorkerPool::new(cfg.clone(), sink.clone()),
            sink,
            cfg,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn config(&self) -> &TimelineConfig {
        &self.cfg
    }

    fn write_lock(&self, scope: &ScopeId) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap();
        locks
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Принять снапшот от агента.
    ///
    /// Синхронная часть заканчивается коммитом тела и продвижением счётчика;
    /// diff и извлечение изменений уходят в фоновый воркер scope-а.
    pub fn ingest(
        &self,
        namespace: &str,
        source: &str,
        body: &[u8],
        compressed: bool,
    ) -> Result<IngestReceipt, StoreError> {
        let scope = ScopeId::new(namespace, source)?;

        let decompressed;
        let body: &[u8] = if compressed {
            let mut out = Vec::new();
            GzDecoder::new(body)
                .read_to_end(&mut out)
                .map_err(StoreError::Decompress)?;
            decompressed = out;
            &decompressed
        } else {
            body
        };

        let lock = self.write_lock(&scope);
        let _guard = lock.lock().unwrap();

        let store = ScopeStore::ensure(&self.cfg, &scope)?;
        let index = store.write_snapshot(body)?;

        if self.cfg.flatten_index {
            self.flatten_snapshot(&store, index, body);
        }

        self.workers.enqueue(&scope, index);
        Ok(IngestReceipt {
            index,
            bytes: body.len(),
        })
    }

    /// Сплющить конверт снапшота в по-файловые документы <n>.index.json.
    /// Не-конвертное тело — не ошибка ингеста: храним и диффаем как есть.
    fn flatten_snapshot(&self, store: &ScopeStore, index: u64, body: &[u8]) {
        let Some(env) = SnapshotEnvelope::parse(body) else {
            log::warn!(
                "scope {}: snapshot {} is not an envelope, flat index skipped",
                store.scope(),
                index
            );
            return;
        };
        let docs = env.flatten();
        let path = flat_index_path(store.dir(), index);
        let write = || -> Result<()> {
            let bytes = serde_json::to_vec_pretty(&docs)?;
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, &bytes)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        };
        if let Err(e) = write() {
            log::warn!("scope {}: cannot write flat index {}: {:?}", store.scope(), path.display(), e);
        } else {
            log::info!("scope {}: flat index {} written", store.scope(), path.display());
        }
    }

    /// Пересчитать недостающие diff/changes-артефакты scope (после рестарта).
    /// Выполняется синхронно, минуя очередь воркера, но под мьютексом
    /// переработки scope-а: с фоновым воркером не перекрывается.
    pub fn replay(&self, namespace: &str, source: &str) -> Result<()> {
        let scope = ScopeId::new(namespace, source)?;
        let store = ScopeStore::ensure(&self.cfg, &scope)?;
        let lock = self.workers.processing_lock(&scope);
        let _guard = lock.lock().unwrap();
        replay_scope(&self.cfg, &store, self.sink.as_ref())
    }

    /// Прочитать персистированный батч изменений перехода в индекс j.
    pub fn load_changes(
        &self,
        namespace: &str,
        source: &str,
        j: u64,
    ) -> Result<Vec<ChangeRecord>> {
        let scope = ScopeId::new(namespace, source)?;
        let dir = scope.dir(&self.cfg.data_dir);
        load_batch(&changes_path(&dir, j))
    }

    /// Дождаться фоновых очередей и остановить воркеров.
    pub fn shutdown(self) {
        self.workers.shutdown();
    }
}
