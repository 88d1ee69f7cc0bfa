//! pipeline — фоновая переработка одного перехода: diff → extract → persist →
//! sink.
//!
//! Все шаги идемпотентны и пересчитываемы из персистентного состояния:
//! существующий diff-артефакт переиспользуется байт-в-байт, батч — write-once.
//! Рестарт между коммитом снапшота и фоновой переработкой даёт артефакты,
//! идентичные непрерывному прогону.
//!
//! Политика ошибок:
//! - DiffError  — лог, артефакт опущен, переход брошен (Ok(None));
//! - ParseError — лог, весь набор записей перехода отброшен (Ok(None));
//! - ошибки store/sink всплывают наверх (их логирует воркер).

use anyhow::{Context, Result};

use crate::config::TimelineConfig;
use crate::diff::ensure_artifact;
use crate::extract::extract_changes;
use crate::record::{ChangeRecord, SnapshotEnvelope};
use crate::scope::changes_path;
use crate::sink::{persist_batch, ChangeIndexWriter};
use crate::store::ScopeStore;

/// Переработать переход в индекс j. None — переход не даёт батча (нет prior,
/// diff не отработал или текст не разобрался).
pub fn process_transition(
    cfg: &TimelineConfig,
    store: &ScopeStore,
    j: u64,
    sink: &dyn ChangeIndexWriter,
) -> Result<Option<(u64, Vec<ChangeRecord>)>> {
    let (prior, artifact) = match ensure_artifact(cfg, store, j) {
        Ok(Some(pair)) => pair,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::error!("scope {}: diff for transition to {} failed: {}", store.scope(), j, e);
            return Ok(None);
        }
    };

    let raw = std::fs::read(&artifact)
        .with_context(|| format!("read diff artifact {}", artifact.display()))?;

    let records = if raw.is_empty() {
        // снапшоты идентичны (по модулю whitespace/пустых строк)
        Vec::new()
    } else {
        // collectionTime перехода — из конверта нового снапшота; парсер
        // возьмёт маркер из самого диффа, если конверта нет
        let collection_time = store
            .read_snapshot(j)?
            .and_then(|body| SnapshotEnvelope::parse(&body))
            .and_then(|env| env.collection_time);

        let text = String::from_utf8_lossy(&raw);
        match extract_changes(&text, collection_time.as_deref()) {
            Ok(records) => records,
            Err(e) => {
                log::error!(
                    "scope {}: discarding change set for transition {}->{}: {}",
                    store.scope(),
                    prior,
                    j,
                    e
                );
                return Ok(None);
            }
        }
    };

    persist_batch(&changes_path(store.dir(), j), &records)?;
    sink.write_batch(store.scope(), prior, j, &records)?;

    Ok(Some((prior, records)))
}

/// Пересчитать все недостающие артефакты scope после рестарта: переходы
/// идут строго по порядку, ошибки отдельных переходов не останавливают
/// остальные.
pub fn replay_scope(
    cfg: &TimelineConfig,
    store: &ScopeStore,
    sink: &dyn ChangeIndexWriter,
) -> Result<()> {
    let next = store.next_index()?;
    for j in 1..next {
        if let Err(e) = process_transition(cfg, store, j, sink) {
            log::error!("scope {}: replay of transition to {} failed: {:?}", store.scope(), j, e);
        }
    }
    Ok(())
}
