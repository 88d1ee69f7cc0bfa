//! SideMap — insertion-ordered map «имя файла → запись стороны диффа».
//!
//! Требование детерминизма: порядок эмиссии change-записей — это порядок
//! вставки (старая сторона, затем новая), поэтому обычный HashMap не годится.
//! Повторная вставка по существующему ключу заменяет значение, сохраняя
//! исходную позицию. take() изымает запись, не ломая порядок остальных.

use std::collections::HashMap;

use serde_json::{Map, Value};

#[derive(Default)]
pub struct SideMap {
    // slot в entries; изъятые помечаются None, позиции не сдвигаются
    index: HashMap<String, usize>,
    entries: Vec<(String, Option<Map<String, Value>>)>,
}

impl SideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Вставить или заменить запись; позиция ключа при замене не меняется.
    pub fn insert(&mut self, name: String, record: Map<String, Value>) {
        if let Some(&slot) = self.index.get(&name) {
            self.entries[slot].1 = Some(record);
        } else {
            self.index.insert(name.clone(), self.entries.len());
            self.entries.push((name, Some(record)));
        }
    }

    /// Изъять запись по ключу (для спаривания modified).
    pub fn take(&mut self, name: &str) -> Option<Map<String, Value>> {
        let slot = self.index.remove(name)?;
        self.entries[slot].1.take()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Выгрузить оставшиеся записи в порядке вставки; map остаётся пустым
    /// и готов к следующему блоку.
    pub fn drain_in_order(&mut self) -> Vec<(String, Map<String, Value>)> {
        self.index.clear();
        self.entries
            .drain(..)
            .filter_map(|(name, rec)| rec.map(|r| (name, r)))
            .collect()
    }
}
