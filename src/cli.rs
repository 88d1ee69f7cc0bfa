//! CLI timelinedb: локальное администрирование данных сервиса.
//!
//! Команды: ingest / status / changes / replay. Транспортный слой (HTTP)
//! живёт снаружи ядра; CLI работает с каталогом данных напрямую.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::TimelineConfig;
use crate::scope::{changes_path, diff_path, ScopeId};
use crate::sink::load_batch;
use crate::store::ScopeStore;
use crate::timeline::Timeline;

#[derive(Parser, Debug)]
#[command(
    name = "timelinedb",
    version,
    about = "Snapshot timeline store with diff-based change extraction",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Принять снапшот из файла и переработать его в фоне.
    Ingest {
        #[arg(long, default_value = "./data")]
        data: PathBuf,
        #[arg(short = 'n', long)]
        namespace: String,
        #[arg(short = 's', long)]
        source: String,
        /// Файл с телом снапшота.
        #[arg(long)]
        file: PathBuf,
        /// Тело сжато gzip.
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Показать состояние scope: счётчик, тела, артефакты переходов.
    Status {
        #[arg(long, default_value = "./data")]
        data: PathBuf,
        #[arg(short = 'n', long)]
        namespace: String,
        #[arg(short = 's', long)]
        source: String,
    },
    /// Напечатать батч change-записей перехода в индекс j.
    Changes {
        #[arg(long, default_value = "./data")]
        data: PathBuf,
        #[arg(short = 'n', long)]
        namespace: String,
        #[arg(short = 's', long)]
        source: String,
        #[arg(long)]
        index: u64,
    },
    /// Пересчитать недостающие diff/changes-артефакты scope.
    Replay {
        #[arg(long, default_value = "./data")]
        data: PathBuf,
        #[arg(short = 'n', long)]
        namespace: String,
        #[arg(short = 's', long)]
        source: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Ingest {
            data,
            namespace,
            source,
            file,
            gzip,
        } => {
            let body =
                std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let tl = Timeline::open(TimelineConfig::from_env().with_data_dir(data));
            let receipt = tl.ingest(&namespace, &source, &body, gzip)?;
            // дождаться фоновой переработки перед выходом процесса
            tl.shutdown();
            println!(
                "snapshot {} committed for {}/{} ({} bytes)",
                receipt.index, namespace, source, receipt.bytes
            );
            Ok(())
        }

        Cmd::Status {
            data,
            namespace,
            source,
        } => {
            let cfg = TimelineConfig::from_env().with_data_dir(data);
            let scope = ScopeId::new(&namespace, &source)?;
            let store = ScopeStore::ensure(&cfg, &scope)?;
            let next = store.next_index()?;
            println!("scope:      {}", scope);
            println!("next index: {}", next);
            for j in 0..next {
                let body = if store.has_body(j) { "body" } else { "-   " };
                let diffed = (0..j)
                    .rev()
                    .find(|&i| diff_path(store.dir(), i, j).is_file())
                    .map(|i| format!("diff {}.{}", i, j))
                    .unwrap_or_else(|| "-".to_string());
                let changes = if changes_path(store.dir(), j).is_file() {
                    "changes"
                } else {
                    "-"
                };
                println!("  {:>6}  {}  {:<12} {}", j, body, diffed, changes);
            }
            Ok(())
        }

        Cmd::Changes {
            data,
            namespace,
            source,
            index,
        } => {
            let cfg = TimelineConfig::from_env().with_data_dir(data);
            let scope = ScopeId::new(&namespace, &source)?;
            let dir = scope.dir(&cfg.data_dir);
            let records = load_batch(&changes_path(&dir, index))?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }

        Cmd::Replay {
            data,
            namespace,
            source,
        } => {
            let tl = Timeline::open(TimelineConfig::from_env().with_data_dir(data));
            tl.replay(&namespace, &source)?;
            println!("replay finished for {}/{}", namespace, source);
            Ok(())
        }
    }
}
