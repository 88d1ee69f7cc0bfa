//! Конечный автомат diff → change-записи.
//!
//! Входная грамматика (повторяющиеся блоки классического diff без контекста):
//!
//! ```text
//! <range><op><range>      например 2,3c4 / 5d8 / 0a1,2
//! < строка-старой-стороны (ноль и более)
//! ---
//! > строка-новой-стороны  (ноль и более)
//! ```
//!
//! Каждая строка стороны — один JSON-объект, возможно с висячей запятой
//! (снапшот сериализует записи по одной на строку внутри JSON-массива).
//!
//! Состояния: SeekRange → OldSide → NewSide, цикл по блокам.
//! - сжатые формы без явной старой стороны ('>' или новый range-заголовок
//!   прямо в OldSide) — не ошибка: текущая аккумуляция считается полной;
//! - строка, не подошедшая ни под один элемент грамматики внутри блока, —
//!   жёсткий ParseError: записи перехода отбрасываются целиком;
//! - битая JSON-строка стороны — warn и пропуск, блок живёт дальше;
//! - flush спаривает стороны: old∩new → modified (контент новой стороны),
//!   old−new → deleted, остаток new → added; порядок — порядок вставки.

use serde_json::Value;

use crate::errors::ParseError;
use crate::extract::ordered::SideMap;
use crate::record::{ChangeKind, ChangeRecord, KEY_COLLECTION, KEY_NAME};

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    SeekRange,
    OldSide,
    NewSide,
}

enum Line<'a> {
    Range,
    Old(&'a str),
    Divider,
    New(&'a str),
    Other,
}

/// Range-заголовок: digits[,digits]<letter>digits[,digits], по префиксу
/// (хвост после второго диапазона не анализируется, как и в классическом
/// формате «12c13»).
fn is_range_header(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;

    fn span(b: &[u8], i: &mut usize) -> bool {
        let start = *i;
        while *i < b.len() && b[*i].is_ascii_digit() {
            *i += 1;
        }
        if *i == start {
            return false;
        }
        if *i < b.len() && b[*i] == b',' {
            *i += 1;
            let start = *i;
            while *i < b.len() && b[*i].is_ascii_digit() {
                *i += 1;
            }
            if *i == start {
                return false;
            }
        }
        true
    }

    if !span(b, &mut i) {
        return false;
    }
    if i >= b.len() || !b[i].is_ascii_alphabetic() {
        return false;
    }
    i += 1;
    span(b, &mut i)
}

fn classify(raw: &str) -> Line<'_> {
    if raw == "---" {
        return Line::Divider;
    }
    if let Some(rest) = raw.strip_prefix('<') {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            return Line::Old(rest.trim_start());
        }
    }
    if let Some(rest) = raw.strip_prefix('>') {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            return Line::New(rest.trim_start());
        }
    }
    if is_range_header(raw) {
        return Line::Range;
    }
    Line::Other
}

#[derive(Default)]
struct Accum {
    old: SideMap,
    new: SideMap,
    records: Vec<ChangeRecord>,
    // Маркеры конверта, встреченные в диффе: фолбэк collectionTime перехода.
    old_marker: Option<String>,
    new_marker: Option<String>,
}

impl Accum {
    /// Принять одну строку стороны: снять висячую запятую, разобрать JSON,
    /// положить в map по ключу name. Не-JSON — warn и пропуск. Объект без
    /// name, но с collectionTime — маркер конверта.
    fn side_line(&mut self, payload: &str, old_side: bool, raw: &str) {
        let data = payload.trim_end();
        let data = data.strip_suffix(',').unwrap_or(data);

        let parsed: Result<Value, _> = serde_json::from_str(data);
        let obj = match parsed {
            Ok(Value::Object(obj)) => obj,
            _ => {
                log::warn!("line is not in JSON format: {:?}", raw);
                return;
            }
        };

        if let Some(name) = obj.get(KEY_NAME).and_then(Value::as_str) {
            let name = name.to_string();
            if old_side {
                self.old.insert(name, obj);
            } else {
                self.new.insert(name, obj);
            }
            return;
        }

        if let Some(ct) = obj.get(KEY_COLLECTION).and_then(Value::as_str) {
            let slot = if old_side {
                &mut self.old_marker
            } else {
                &mut self.new_marker
            };
            *slot = Some(ct.to_string());
            return;
        }

        log::warn!("skipping record line without a name: {:?}", raw);
    }

    /// Спарить стороны блока и выпустить записи; оба map'а потребляются
    /// ровно один раз.
    fn flush(&mut self) {
        for (name, old_rec) in self.old.drain_in_order() {
            match self.new.take(&name) {
                Some(new_rec) => {
                    // modified: выигрывает новая сторона
                    self.records
                        .push(ChangeRecord::from_side(name, ChangeKind::Modified, new_rec));
                }
                None => {
                    self.records
                        .push(ChangeRecord::from_side(name, ChangeKind::Deleted, old_rec));
                }
            }
        }
        for (name, new_rec) in self.new.drain_in_order() {
            self.records
                .push(ChangeRecord::from_side(name, ChangeKind::Added, new_rec));
        }
    }
}

/// Разобрать diff-текст в упорядоченный список change-записей.
///
/// collection_time — collectionTime перехода (обычно из конверта нового
/// снапшота); при None используется маркер из самого диффа (новая сторона
/// приоритетнее старой). Результатом штампуется каждая запись.
///
/// Детерминированность: одинаковый текст всегда даёт одинаковый список.
pub fn extract_changes(
    diff_text: &str,
    collection_time: Option<&str>,
) -> Result<Vec<ChangeRecord>, ParseError> {
    let mut state = State::SeekRange;
    let mut acc = Accum::default();
    let mut blocks = 0usize;

    for (no, raw) in diff_text.lines().enumerate() {
        // пустая строка — конец входа (в выводе diff -B их не бывает)
        if raw.is_empty() {
            break;
        }
        let line = classify(raw);

        match state {
            State::SeekRange => {
                if let Line::Range = line {
                    state = State::OldSide;
                    blocks += 1;
                }
                // остальное до первого заголовка пропускается
            }

            State::OldSide => match line {
                Line::Old(payload) => acc.side_line(payload, true, raw),
                Line::Divider => state = State::NewSide,
                // сжатая форма без '---': старая сторона пуста или закончилась
                Line::New(payload) => {
                    acc.side_line(payload, false, raw);
                    state = State::NewSide;
                }
                Line::Range => {
                    acc.flush();
                    blocks += 1;
                }
                Line::Other => {
                    log::warn!("abort, cannot parse line {}: {:?}", no + 1, raw);
                    return Err(ParseError::UnexpectedLine {
                        line_no: no + 1,
                        line: raw.to_string(),
                    });
                }
            },

            State::NewSide => match line {
                Line::New(payload) => acc.side_line(payload, false, raw),
                Line::Range => {
                    acc.flush();
                    state = State::OldSide;
                    blocks += 1;
                }
                Line::Old(_) | Line::Divider | Line::Other => {
                    log::warn!("abort, cannot parse line {}: {:?}", no + 1, raw);
                    return Err(ParseError::UnexpectedLine {
                        line_no: no + 1,
                        line: raw.to_string(),
                    });
                }
            },
        }
    }

    if blocks == 0 {
        return Err(ParseError::Unparseable);
    }

    // хвостовой блок
    acc.flush();

    // Штамп collectionTime перехода: вызывающий → маркер новой стороны →
    // маркер старой; без фолбэка записи сохраняют собственное значение.
    let resolved = collection_time
        .map(str::to_string)
        .or(acc.new_marker)
        .or(acc.old_marker);
    if let Some(ct) = resolved {
        for rec in &mut acc.records {
            rec.collection_time = Some(ct.clone());
        }
    }

    Ok(acc.records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_shapes() {
        assert!(is_range_header("5c5"));
        assert!(is_range_header("2,3c4"));
        assert!(is_range_header("0a1,2"));
        assert!(is_range_header("10,12d9"));
        // по префиксу, как в оригинальном формате
        assert!(is_range_header("5c5 trailing"));

        assert!(!is_range_header("c5"));
        assert!(!is_range_header("5c"));
        assert!(!is_range_header("5,c5"));
        assert!(!is_range_header("---"));
        assert!(!is_range_header("< {\"name\": \"x\"}"));
        assert!(!is_range_header(""));
    }

    #[test]
    fn classify_side_lines() {
        assert!(matches!(classify("< {\"a\":1}"), Line::Old("{\"a\":1}")));
        assert!(matches!(classify(">   {}"), Line::New("{}")));
        assert!(matches!(classify("---"), Line::Divider));
        // '<' без пробела — не строка стороны
        assert!(matches!(classify("<{}"), Line::Other));
        assert!(matches!(classify("garbage"), Line::Other));
    }
}
