//! Durable-счётчик следующего индекса снапшота.
//!
//! Формат <scope_dir>/.counter (LE):
//! MAGIC8 = "TLCOUNT1"
//! u64 next_index
//!
//! Политика:
//! - Атомарная запись: tmp+rename, затем fsync родительского каталога
//!   (best-effort на не-Unix платформах).
//! - Читается без побочных эффектов; продвижение — только через write_counter
//!   под эксклюзивным локом scope.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, OpenOptions};
#[cfg(unix)]
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::consts::{COUNTER_FILE, COUNTER_MAGIC};
use crate::errors::StoreError;

#[inline]
pub fn counter_path(scope_dir: &Path) -> PathBuf {
    scope_dir.join(COUNTER_FILE)
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Прочитать текущее значение счётчика (следующий свободный индекс).
pub fn read_counter(scope_dir: &Path) -> Result<u64, StoreError> {
    let path = counter_path(scope_dir);
    let mut f = OpenOptions::new()
        .read(true)
        .open(&path)
        .map_err(|e| StoreError::io(&path, e))?;

    let mut magic = [0u8; 8];
    f.read_exact(&mut magic)
        .map_err(|e| StoreError::io(&path, e))?;
    if &magic != COUNTER_MAGIC {
        return Err(StoreError::BadCounter {
            path,
            reason: format!("bad magic {:?} (expected {:?})", magic, COUNTER_MAGIC),
        });
    }

    f.read_u64::<LittleEndian>()
        .map_err(|e| StoreError::io(&path, e))
}

/// Перезаписать счётчик атомарно (tmp+rename) и дождаться диска.
pub fn write_counter(scope_dir: &Path, next_index: u64) -> Result<(), StoreError> {
    let path = counter_path(scope_dir);
    let tmp = scope_dir.join(format!("{}.tmp", COUNTER_FILE));
    let _ = fs::remove_file(&tmp); // best-effort

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .map_err(|e| StoreError::io(&tmp, e))?;

    f.write_all(COUNTER_MAGIC)
        .and_then(|_| f.write_u64::<LittleEndian>(next_index))
        .and_then(|_| f.sync_all())
        .map_err(|e| StoreError::io(&tmp, e))?;

    fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
    let _ = fsync_dir(&path);
    Ok(())
}

/// Создать счётчик со значением 0, если его ещё нет.
///
/// Вызывается только под эксклюзивным локом scope: exists-проверка без лока
/// гонится с rename конкурентного процесса.
pub fn init_counter_if_absent(scope_dir: &Path) -> Result<(), StoreError> {
    let path = counter_path(scope_dir);
    if path.exists() {
        return Ok(());
    }
    log::info!("creating counter {}", path.display());
    write_counter(scope_dir, 0)
}
