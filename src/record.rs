//! Модель записей: файловые записи внутри снапшота и производные change-записи.
//!
//! Wire-формат (JSON):
//! - Тело снапшота — конверт {"hostname": ..., "collectionTime": ..., "files": [...]},
//!   где files сериализованы по одной записи на строку (важно для line-diff).
//! - FileRecord — объект с уникальным ключом "name", полем "lastModifiedTime"
//!   и произвольным открытым набором атрибутов (переносится как есть).
//! - ChangeRecord — {"name", "id", "kind", "collectionTime", ...атрибуты
//!   выигравшей стороны}; id = name + ":" + lastModifiedTime выигравшей стороны.
//!
//! Контракт «new side wins»: для modified атрибуты и таймстемпы берутся с новой
//! стороны; для deleted — со старой (другой стороны просто нет).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Зарезервированные ключи wire-формата.
pub const KEY_NAME: &str = "name";
pub const KEY_LAST_MODIFIED: &str = "lastModifiedTime";
pub const KEY_COLLECTION: &str = "collectionTime";
pub const KEY_ID: &str = "id";
pub const KEY_KIND: &str = "kind";
pub const KEY_HOSTNAME: &str = "hostname";
pub const KEY_FILES: &str = "files";

/// Вид изменения, производный от диффа двух соседних снапшотов.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Одна change-запись. attrs — полный набор атрибутов выигравшей стороны
/// (без зарезервированных ключей, они лежат в явных полях).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub name: String,
    pub id: String,
    pub kind: ChangeKind,
    #[serde(rename = "collectionTime", skip_serializing_if = "Option::is_none")]
    pub collection_time: Option<String>,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl ChangeRecord {
    /// Собрать запись из объекта выигравшей стороны.
    ///
    /// id = name + ":" + lastModifiedTime; если у выигравшей стороны нет
    /// lastModifiedTime, правая часть пустая (запись всё равно эмитится).
    pub fn from_side(name: String, kind: ChangeKind, mut side: Map<String, Value>) -> Self {
        let lmt = side
            .get(KEY_LAST_MODIFIED)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let id = format!("{}:{}", name, lmt);

        let collection_time = side
            .get(KEY_COLLECTION)
            .and_then(Value::as_str)
            .map(str::to_string);

        // Явные поля не должны дублироваться во flatten-части.
        side.remove(KEY_NAME);
        side.remove(KEY_ID);
        side.remove(KEY_KIND);
        side.remove(KEY_COLLECTION);

        Self {
            name,
            id,
            kind,
            collection_time,
            attrs: side,
        }
    }
}

/// Конверт снапшота: hostname + collectionTime + массив файловых записей.
#[derive(Clone, Debug, Default)]
pub struct SnapshotEnvelope {
    pub hostname: Option<String>,
    pub collection_time: Option<String>,
    pub files: Vec<Map<String, Value>>,
}

impl SnapshotEnvelope {
    /// Разобрать конверт из тела снапшота. None, если тело — не JSON-объект
    /// с массивом "files" (такие тела храним и диффаем, но не сплющиваем).
    pub fn parse(body: &[u8]) -> Option<Self> {
        let v: Value = serde_json::from_slice(body).ok()?;
        let obj = v.as_object()?;
        let files = obj.get(KEY_FILES)?.as_array()?;

        let mut out = SnapshotEnvelope {
            hostname: obj.get(KEY_HOSTNAME).and_then(Value::as_str).map(String::from),
            collection_time: obj
                .get(KEY_COLLECTION)
                .and_then(Value::as_str)
                .map(String::from),
            files: Vec::with_capacity(files.len()),
        };
        for f in files {
            if let Some(m) = f.as_object() {
                out.files.push(m.clone());
            }
        }
        Some(out)
    }

    /// Сплющить конверт в по-файловые документы для downstream-индекса:
    /// каждая запись получает hostname, collectionTime и
    /// id = name + ":" + collectionTime снапшота.
    pub fn flatten(&self) -> Vec<Map<String, Value>> {
        let ct = self.collection_time.clone().unwrap_or_default();
        let mut docs = Vec::with_capacity(self.files.len());
        for f in &self.files {
            let mut doc = f.clone();
            let name = doc
                .get(KEY_NAME)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            doc.insert(KEY_ID.to_string(), Value::String(format!("{}:{}", name, ct)));
            if let Some(h) = &self.hostname {
                doc.insert(KEY_HOSTNAME.to_string(), Value::String(h.clone()));
            }
            doc.insert(KEY_COLLECTION.to_string(), Value::String(ct.clone()));
            docs.push(doc);
        }
        docs
    }
}
