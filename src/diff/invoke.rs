//! Вызов внешнего diff и получение артефакта перехода.
//!
//! Контракт с инструментом (дефолт GNU diff -w -B):
//! - exit 0 — файлы совпадают, артефакт пустой;
//! - exit 1 — различия найдены, stdout непустой; это успех, не ошибка;
//! - другой exit / отсутствие бинаря / таймаут — DiffError, переход бросается.
//!
//! Таймаут: child опрашивается через try_wait с дедлайном; stdout вычитывается
//! параллельным тредом, чтобы не задедлочить большой вывод на полном пайпе.
//! По истечении дедлайна child убивается и пожинается.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::config::TimelineConfig;
use crate::consts::DIFF_POLL_INTERVAL_MS;
use crate::errors::DiffError;
use crate::scope::{diff_path, snapshot_path};
use crate::store::ScopeStore;

/// Ближайший прежний индекс с телом на диске: скан j-1, j-2, ... 0.
pub fn find_prior(store: &ScopeStore, j: u64) -> Option<u64> {
    (0..j).rev().find(|&i| store.has_body(i))
}

/// Запустить diff между двумя файлами, вернуть его stdout.
pub fn run_diff(cfg: &TimelineConfig, old: &Path, new: &Path) -> Result<Vec<u8>, DiffError> {
    let mut child = Command::new(&cfg.diff_bin)
        .args(&cfg.diff_args)
        .arg(old)
        .arg(new)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| DiffError::Spawn {
            bin: cfg.diff_bin.clone(),
            source: e,
        })?;

    let mut stdout = child.stdout.take().expect("stdout is piped");
    let reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let res = stdout.read_to_end(&mut buf);
        (buf, res)
    });

    let deadline = Instant::now() + Duration::from_millis(cfg.diff_timeout_ms);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    // дочитываем/закрываем пайп, чтобы тред завершился
                    let _ = reader.join();
                    return Err(DiffError::Timeout {
                        ms: cfg.diff_timeout_ms,
                    });
                }
                std::thread::sleep(Duration::from_millis(DIFF_POLL_INTERVAL_MS));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.join();
                return Err(DiffError::Spawn {
                    bin: cfg.diff_bin.clone(),
                    source: e,
                });
            }
        }
    };

    let (output, read_res) = reader.join().unwrap_or_else(|_| {
        (
            Vec::new(),
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "stdout reader panicked",
            )),
        )
    });
    if let Err(e) = read_res {
        return Err(DiffError::Io {
            path: new.to_path_buf(),
            source: e,
        });
    }

    match status.code() {
        // 0 — нет различий (пустой артефакт), 1 — различия найдены
        Some(0) | Some(1) => Ok(output),
        code => Err(DiffError::ToolFailed { code }),
    }
}

/// Обеспечить diff-артефакт для перехода в индекс j.
///
/// Возвращает Ok(None) для j == 0 или когда нет prior-тела (диффовать не с
/// чем). Существующий артефакт переиспользуется без перевызова инструмента —
/// после рестарта переработка даёт байт-идентичный результат.
pub fn ensure_artifact(
    cfg: &TimelineConfig,
    store: &ScopeStore,
    j: u64,
) -> Result<Option<(u64, PathBuf)>, DiffError> {
    if j == 0 {
        return Ok(None);
    }
    let Some(prior) = find_prior(store, j) else {
        log::warn!("scope {}: no prior snapshot with data before {}", store.scope(), j);
        return Ok(None);
    };

    let artifact = diff_path(store.dir(), prior, j);
    if artifact.is_file() {
        return Ok(Some((prior, artifact)));
    }

    let old = snapshot_path(store.dir(), prior);
    let new = snapshot_path(store.dir(), j);
    log::info!(
        "scope {}: diffing {} and {}",
        store.scope(),
        old.display(),
        new.display()
    );
    let output = run_diff(cfg, &old, &new)?;

    // tmp+rename: наблюдаемый артефакт либо целиком есть, либо его нет
    let tmp = artifact.with_extension("diff.tmp");
    fs::write(&tmp, &output).map_err(|e| DiffError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, &artifact).map_err(|e| DiffError::Io {
        path: artifact.clone(),
        source: e,
    })?;

    Ok(Some((prior, artifact)))
}
