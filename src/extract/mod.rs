//! extract — ChangeExtractor: разбор diff-текста в упорядоченный список
//! change-записей.
//!
//! Разделение по подмодулям:
//! - ordered.rs — SideMap: insertion-ordered map имя → запись; замена по ключу
//!   сохраняет позицию. Порядок эмиссии задан структурой, а не случайной
//!   итерацией хэш-таблицы.
//! - parser.rs  — конечный автомат SeekRange → OldSide → NewSide с flush-парой
//!   на границах блоков; восстановление после сжатых форм диффа и битых строк.

pub mod ordered;
pub mod parser;

pub use ordered::SideMap;
pub use parser::extract_changes;
