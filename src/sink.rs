//! sink — граница с downstream-индексом.
//!
//! Батч change-записей перехода персистится рядом со снапшотами
//! (<j>.changes.json, JSON-массив в порядке эмиссии) и отдаётся
//! ChangeIndexWriter. Конкретный bulk-формат индексатора — вне ядра:
//! реализация трейта владеет этим маппингом целиком.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::ChangeRecord;
use crate::scope::ScopeId;

/// Потребитель финального упорядоченного списка change-записей одного
/// перехода (prior → index). Реализуется внешним индексатором.
///
/// Контракт доставки — at-least-once: replay после рестарта передаёт батчи
/// уже обработанных переходов повторно (содержимое батча при этом
/// байт-идентично). Вызовы для одного scope никогда не перекрываются;
/// дедупликация по (scope, index) — на стороне реализации.
pub trait ChangeIndexWriter: Send + Sync {
    fn write_batch(
        &self,
        scope: &ScopeId,
        prior: u64,
        index: u64,
        records: &[ChangeRecord],
    ) -> Result<()>;
}

/// Заглушка по умолчанию: только лог. Держит pipeline работоспособным без
/// подключённого индексатора.
pub struct NullIndexWriter;

impl ChangeIndexWriter for NullIndexWriter {
    fn write_batch(
        &self,
        scope: &ScopeId,
        prior: u64,
        index: u64,
        records: &[ChangeRecord],
    ) -> Result<()> {
        log::info!(
            "scope {}: transition {}->{} produced {} change records",
            scope,
            prior,
            index,
            records.len()
        );
        Ok(())
    }
}

/// Атомарно записать батч (tmp+rename). Существующий файл не перезаписывается:
/// батч производен и write-once.
pub fn persist_batch(path: &Path, records: &[ChangeRecord]) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    let bytes = serde_json::to_vec_pretty(records).context("serialize change batch")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Прочитать персистированный батч перехода.
pub fn load_batch(path: &Path) -> Result<Vec<ChangeRecord>> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}
