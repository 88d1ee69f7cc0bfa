use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use TimelineDB::{ScopeId, ScopeStore, Timeline, TimelineConfig};

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tl-{}-{}-{}", prefix, pid, t))
}

#[test]
fn concurrent_writers_one_scope_contiguous_indices() -> Result<()> {
    let cfg = TimelineConfig::default()
        .with_data_dir(unique_root("seq"))
        .with_flatten_index(false);
    let tl = Arc::new(Timeline::open(cfg.clone()));

    // N конкурентных писателей в один scope
    const N: usize = 16;
    let mut handles = Vec::new();
    for w in 0..N {
        let tl = tl.clone();
        handles.push(std::thread::spawn(move || {
            let body = format!("writer {} payload\n", w);
            tl.ingest("ns", "src", body.as_bytes(), false).unwrap().index
        }));
    }

    let mut seen = HashSet::new();
    for h in handles {
        let idx = h.join().unwrap();
        assert!(seen.insert(idx), "index {} assigned twice", idx);
    }

    // ровно 0..N-1, без дырок и повторов
    for i in 0..N as u64 {
        assert!(seen.contains(&i), "index {} missing", i);
    }

    let scope = ScopeId::new("ns", "src")?;
    let store = ScopeStore::ensure(&cfg, &scope)?;
    assert_eq!(store.next_index()?, N as u64);
    for i in 0..N as u64 {
        assert!(store.read_snapshot(i)?.is_some(), "body {} missing", i);
    }

    if let Ok(tl) = Arc::try_unwrap(tl) {
        tl.shutdown();
    }
    Ok(())
}

#[test]
fn scopes_are_independent() -> Result<()> {
    let cfg = TimelineConfig::default()
        .with_data_dir(unique_root("seq-indep"))
        .with_flatten_index(false);
    let tl = Timeline::open(cfg.clone());

    assert_eq!(tl.ingest("ns", "a", b"one\n", false)?.index, 0);
    assert_eq!(tl.ingest("ns", "b", b"one\n", false)?.index, 0);
    assert_eq!(tl.ingest("ns", "a", b"two\n", false)?.index, 1);
    assert_eq!(tl.ingest("other.ns", "a", b"one\n", false)?.index, 0);

    tl.shutdown();
    Ok(())
}

#[test]
fn sequence_survives_reopen() -> Result<()> {
    let cfg = TimelineConfig::default()
        .with_data_dir(unique_root("seq-reopen"))
        .with_flatten_index(false);
    let scope = ScopeId::new("ns", "src")?;

    {
        let store = ScopeStore::ensure(&cfg, &scope)?;
        assert_eq!(store.write_snapshot(b"a\n")?, 0);
        assert_eq!(store.write_snapshot(b"b\n")?, 1);
    }
    // "рестарт процесса": новый ScopeStore над тем же каталогом
    {
        let store = ScopeStore::ensure(&cfg, &scope)?;
        assert_eq!(store.next_index()?, 2);
        assert_eq!(store.write_snapshot(b"c\n")?, 2);
    }
    Ok(())
}
