#![allow(non_snake_case)]

// Базовые модули
pub mod config;
pub mod consts;
pub mod errors;
pub mod scope;

// Хранение и сериализация писателей
pub mod lock;
pub mod record;
pub mod store; // src/store/{mod,counter,scope}.rs

// Конвейер переработки переходов
pub mod diff; // src/diff/{mod,invoke}.rs
pub mod extract; // src/extract/{mod,ordered,parser}.rs
pub mod pipeline;
pub mod sink;
pub mod worker;

// Верхнеуровневый хэндл и CLI
pub mod cli;
pub mod timeline;

// Удобные реэкспорты
pub use config::TimelineConfig;
pub use errors::{DiffError, ParseError, StoreError};
pub use extract::extract_changes;
pub use record::{ChangeKind, ChangeRecord, SnapshotEnvelope};
pub use scope::ScopeId;
pub use sink::{ChangeIndexWriter, NullIndexWriter};
pub use store::ScopeStore;
pub use timeline::{IngestReceipt, Timeline};
