//! diff — вызов внешнего line-diff инструмента и персист diff-артефактов.
//!
//! - invoke.rs — prior-скан, запуск diff с таймаутом, атомарная запись
//!   артефакта <i>.<j>.diff (идемпотентно: существующий артефакт
//!   переиспользуется байт-в-байт).
//!
//! Diff-инструмент трактуется как генерический и непрозрачный: его stdout —
//! единственный вход для extract. Код выхода 1 («различия найдены») — успех.

pub mod invoke;

pub use invoke::{ensure_artifact, find_prior, run_diff};
