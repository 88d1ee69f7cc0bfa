//! store — SnapshotStore: durable-нумерация и immutable-тела снапшотов.
//!
//! Разделение по подмодулям:
//! - counter.rs — durable-счётчик следующего индекса (<scope>/.counter, LE,
//!   атомарная перезапись tmp+rename+fsync).
//! - scope.rs   — ScopeStore: ensure/next_index/write_snapshot/read_snapshot,
//!   детект и удаление orphan-тел после падения.
//!
//! Инвариант последовательности: выданные индексы непрерывны с нуля, не
//! переиспользуются и не пропускаются; тело снапшота валидно только когда
//! счётчик ушёл за его индекс.

pub mod counter;
pub mod scope;

pub use scope::ScopeStore;
