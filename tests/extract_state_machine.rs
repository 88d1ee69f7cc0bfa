use TimelineDB::errors::ParseError;
use TimelineDB::{extract_changes, ChangeKind};

// Сценарий A: модификация существующего файла + появление нового.
#[test]
fn modified_plus_added() {
    let diff = "\
1,2c1,3
< {\"name\": \"/etc/passwd\", \"lastModifiedTime\": \"2014-09-24T10:00:00Z\"}
---
> {\"name\": \"/etc/passwd\", \"lastModifiedTime\": \"2014-09-24T10:05:00Z\"},
> {\"name\": \"/tmp/x\", \"lastModifiedTime\": \"2014-09-24T10:05:00Z\"}
";
    let recs = extract_changes(diff, Some("2014-09-24T10:05:30Z")).unwrap();
    assert_eq!(recs.len(), 2);

    assert_eq!(recs[0].name, "/etc/passwd");
    assert_eq!(recs[0].kind, ChangeKind::Modified);
    // выигрывает новая сторона: id от нового таймстемпа
    assert_eq!(recs[0].id, "/etc/passwd:2014-09-24T10:05:00Z");
    assert_eq!(recs[0].collection_time.as_deref(), Some("2014-09-24T10:05:30Z"));

    assert_eq!(recs[1].name, "/tmp/x");
    assert_eq!(recs[1].kind, ChangeKind::Added);
    assert_eq!(recs[1].id, "/tmp/x:2014-09-24T10:05:00Z");
}

// Сценарий B: ключ только на старой стороне → ровно одна deleted-запись
// с id от старого таймстемпа.
#[test]
fn deleted_only_old_side() {
    let diff = "\
3d2
< {\"name\": \"/var/tmp/gone\", \"lastModifiedTime\": \"2014-09-24T09:00:00Z\"},
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, ChangeKind::Deleted);
    assert_eq!(recs[0].id, "/var/tmp/gone:2014-09-24T09:00:00Z");
}

// Сценарий C: битая строка внутри блока пропускается, валидная запись
// из того же блока эмитится.
#[test]
fn malformed_line_skipped_block_survives() {
    let diff = "\
1,2d0
< this is not json at all
< {\"name\": \"/etc/hosts\", \"lastModifiedTime\": \"t1\"}
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].name, "/etc/hosts");
    assert_eq!(recs[0].kind, ChangeKind::Deleted);
}

// Сжатая форма: '>' сразу после заголовка, без старой стороны и '---'.
#[test]
fn compressed_block_without_old_side() {
    let diff = "\
0a1
> {\"name\": \"/tmp/new\", \"lastModifiedTime\": \"t2\"}
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, ChangeKind::Added);
}

// Сжатая форма: два заголовка подряд (блок без тела) не ломают разбор.
#[test]
fn adjacent_range_headers() {
    let diff = "\
5c5
7c7
< {\"name\": \"/a\", \"lastModifiedTime\": \"t1\"}
---
> {\"name\": \"/a\", \"lastModifiedTime\": \"t2\"}
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, ChangeKind::Modified);
    assert_eq!(recs[0].id, "/a:t2");
}

// Несколько блоков: порядок эмиссии — по блокам, внутри блока
// старая сторона (deleted/modified) затем новая (added).
#[test]
fn ordering_across_blocks() {
    let diff = "\
1,2c1,2
< {\"name\": \"/b\", \"lastModifiedTime\": \"t1\"}
< {\"name\": \"/a\", \"lastModifiedTime\": \"t1\"}
---
> {\"name\": \"/a\", \"lastModifiedTime\": \"t2\"},
> {\"name\": \"/z\", \"lastModifiedTime\": \"t2\"}
9d9
< {\"name\": \"/c\", \"lastModifiedTime\": \"t1\"}
";
    let recs = extract_changes(diff, None).unwrap();
    let order: Vec<(&str, ChangeKind)> = recs.iter().map(|r| (r.name.as_str(), r.kind)).collect();
    assert_eq!(
        order,
        vec![
            ("/b", ChangeKind::Deleted),
            ("/a", ChangeKind::Modified),
            ("/z", ChangeKind::Added),
            ("/c", ChangeKind::Deleted),
        ]
    );
}

// Идемпотентность: одинаковый текст → одинаковый упорядоченный список.
#[test]
fn extraction_is_idempotent() {
    let diff = "\
1,2c1,2
< {\"name\": \"/b\", \"lastModifiedTime\": \"t1\"}
< {\"name\": \"/a\", \"lastModifiedTime\": \"t1\"}
---
> {\"name\": \"/a\", \"lastModifiedTime\": \"t2\"}
> {\"name\": \"/q\", \"lastModifiedTime\": \"t2\"}
";
    let first = extract_changes(diff, Some("ct")).unwrap();
    for _ in 0..5 {
        assert_eq!(extract_changes(diff, Some("ct")).unwrap(), first);
    }
}

// Пустая строка — конец входа: всё, что лежит за ней, игнорируется
// (в выводе diff -B пустых строк не бывает).
#[test]
fn blank_line_ends_input() {
    let diff = "\
1d0
< {\"name\": \"/kept\", \"lastModifiedTime\": \"t1\"}

3d2
< {\"name\": \"/ignored\", \"lastModifiedTime\": \"t1\"}
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].name, "/kept");
    assert_eq!(recs[0].kind, ChangeKind::Deleted);
}

// Без единого range-заголовка артефакт нечитаем: пусто + сигнал ошибки,
// а не частичный результат.
#[test]
fn unparseable_artifact() {
    match extract_changes("complete garbage\nmore garbage\n", None) {
        Err(ParseError::Unparseable) => {}
        other => panic!("expected Unparseable, got {:?}", other),
    }
    match extract_changes("", None) {
        Err(ParseError::Unparseable) => {}
        other => panic!("expected Unparseable, got {:?}", other),
    }
}

// Мусор внутри блока — жёсткая ошибка: записи перехода отбрасываются целиком.
#[test]
fn garbage_inside_block_discards_everything() {
    let diff = "\
1c1
< {\"name\": \"/a\", \"lastModifiedTime\": \"t1\"}
---
> {\"name\": \"/a\", \"lastModifiedTime\": \"t2\"}
*** totally unexpected ***
";
    match extract_changes(diff, None) {
        Err(ParseError::UnexpectedLine { line_no: 5, .. }) => {}
        other => panic!("expected UnexpectedLine at 5, got {:?}", other),
    }
}

// Маркер конверта в самом диффе даёт фолбэк collectionTime перехода;
// новая сторона приоритетнее старой.
#[test]
fn marker_line_supplies_fallback_collection_time() {
    let diff = "\
2c2
< {\"collectionTime\": \"2014-09-24T10:00:00Z\"}
---
> {\"collectionTime\": \"2014-09-24T10:05:00Z\"}
5c5
< {\"name\": \"/a\", \"lastModifiedTime\": \"t1\"}
---
> {\"name\": \"/a\", \"lastModifiedTime\": \"t2\"}
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].collection_time.as_deref(), Some("2014-09-24T10:05:00Z"));

    // явный collectionTime вызывающего выигрывает у маркера
    let recs = extract_changes(diff, Some("caller-ct")).unwrap();
    assert_eq!(recs[0].collection_time.as_deref(), Some("caller-ct"));
}

// Висячая запятая (запись из середины JSON-массива) снимается перед разбором.
#[test]
fn trailing_comma_stripped() {
    let diff = "\
1d0
< {\"name\": \"/mid/array\", \"lastModifiedTime\": \"t1\"},
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs[0].name, "/mid/array");
}

// Дубликат ключа внутри стороны: значение заменяется, позиция сохраняется,
// запись эмитится один раз.
#[test]
fn duplicate_key_last_value_wins() {
    let diff = "\
1,2d0
< {\"name\": \"/dup\", \"lastModifiedTime\": \"t1\"}
< {\"name\": \"/dup\", \"lastModifiedTime\": \"t9\"}
";
    let recs = extract_changes(diff, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].id, "/dup:t9");
}
