//! worker — фоновые single-flight воркеры по одному на активный scope.
//!
//! Ингест синхронен до коммита снапшота; переработка (diff + extract) уходит
//! в выделенный тред scope-а через mpsc-канал. Гарантии:
//! - переходы одного scope выполняются строго в порядке индексов и никогда
//!   не перекрываются (один тред — одна очередь; синхронный replay берёт
//!   тот же мьютекс переработки);
//! - разные scope работают независимо и параллельно;
//! - отправка в очередь не блокирует и не роняет ответ ингеста;
//! - падение переработки логируется и не трогает закоммиченные снапшоты.

use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::config::TimelineConfig;
use crate::pipeline::process_transition;
use crate::scope::ScopeId;
use crate::sink::ChangeIndexWriter;
use crate::store::ScopeStore;

struct WorkerHandle {
    tx: Sender<u64>,
    join: JoinHandle<()>,
}

pub struct WorkerPool {
    cfg: TimelineConfig,
    sink: Arc<dyn ChangeIndexWriter>,
    workers: Mutex<HashMap<ScopeId, WorkerHandle>>,
    // мьютексы переработки: один на scope, разделяется воркером и replay
    proc_locks: Mutex<HashMap<ScopeId, Arc<Mutex<()>>>>,
}

impl WorkerPool {
    pub fn new(cfg: TimelineConfig, sink: Arc<dyn ChangeIndexWriter>) -> Self {
        Self {
            cfg,
            sink,
            workers: Mutex::new(HashMap::new()),
            proc_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Мьютекс переработки scope-а. Воркер держит его на время каждого
    /// перехода; синхронный replay берёт его же, поэтому переработки одного
    /// scope никогда не перекрываются.
    pub fn processing_lock(&self, scope: &ScopeId) -> Arc<Mutex<()>> {
        let mut locks = self.proc_locks.lock().unwrap();
        locks
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Поставить переход в очередь scope-а; воркер поднимается лениво при
    /// первом обращении.
    pub fn enqueue(&self, scope: &ScopeId, index: u64) {
        let proc_lock = self.processing_lock(scope);
        let mut workers = self.workers.lock().unwrap();
        let handle = workers.entry(scope.clone()).or_insert_with(|| {
            spawn_worker(self.cfg.clone(), scope.clone(), self.sink.clone(), proc_lock)
        });
        if handle.tx.send(index).is_err() {
            // воркер умер (не должно случаться: тред глотает ошибки)
            log::error!("scope {}: worker queue is gone, dropping transition {}", scope, index);
        }
    }

    /// Закрыть очереди и дождаться воркеров. Вызывается из Timeline::shutdown.
    pub fn shutdown(&self) {
        let drained: Vec<(ScopeId, WorkerHandle)> =
            self.workers.lock().unwrap().drain().collect();
        for (scope, handle) in drained {
            drop(handle.tx); // закрывает канал, воркер дорабатывает очередь
            if handle.join.join().is_err() {
                log::error!("scope {}: worker thread panicked", scope);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    cfg: TimelineConfig,
    scope: ScopeId,
    sink: Arc<dyn ChangeIndexWriter>,
    proc_lock: Arc<Mutex<()>>,
) -> WorkerHandle {
    let (tx, rx) = mpsc::channel::<u64>();
    let thread_scope = scope.clone();
    let join = std::thread::Builder::new()
        .name(format!("tl-worker-{}", scope))
        .spawn(move || {
            let store = match ScopeStore::ensure(&cfg, &thread_scope) {
                Ok(store) => store,
                Err(e) => {
                    log::error!("scope {}: worker cannot open store: {}", thread_scope, e);
                    return;
                }
            };
            // строго по одному переходу за раз, в порядке поступления
            while let Ok(index) = rx.recv() {
                let _busy = proc_lock.lock().unwrap();
                if let Err(e) = process_transition(&cfg, &store, index, sink.as_ref()) {
                    log::error!(
                        "scope {}: background processing of {} failed: {:?}",
                        thread_scope,
                        index,
                        e
                    );
                }
            }
        })
        .expect("spawn scope worker thread");
    WorkerHandle { tx, join }
}
