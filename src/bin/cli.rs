//! bookie-storage CLI
//!
//! Writes synthetic entries through the write cache into an entry log, and
//! scans entry logs back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bookie_storage::entrylog::EntryLogReader;
use bookie_storage::{
    flush_write_cache, BufferedChannel, Config, FileChannel, FileStore, HeapAllocator, StorageError,
    SyncPolicy, WriteCache,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// bookie-storage CLI
#[derive(Parser, Debug)]
#[command(name = "bookie-storage-cli")]
#[command(about = "Write and scan bookie entry logs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append synthetic entries to an entry log
    Write {
        /// Entry log file
        file: PathBuf,

        /// Number of ledgers
        #[arg(short, long, default_value = "4")]
        ledgers: i64,

        /// Entries per ledger
        #[arg(short, long, default_value = "1000")]
        entries: i64,

        /// Payload size in bytes
        #[arg(short = 's', long, default_value = "1024")]
        entry_size: usize,

        /// Write cache size in MB
        #[arg(short = 'c', long, default_value = "16")]
        cache_mb: u64,

        /// Force to disk every N unpersisted bytes (0 = only at cache flush)
        #[arg(short = 'b', long, default_value = "0")]
        unpersisted_bound: u64,
    },

    /// Read every record of an entry log and verify checksums
    Scan {
        /// Entry log file
        file: PathBuf,

        /// Print each record
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bookie_storage=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bookie-storage v{}", bookie_storage::VERSION);

    let outcome = match args.command {
        Commands::Write {
            file,
            ledgers,
            entries,
            entry_size,
            cache_mb,
            unpersisted_bound,
        } => {
            let sync_policy = if unpersisted_bound > 0 {
                SyncPolicy::UnpersistedBytes {
                    bound: unpersisted_bound,
                }
            } else {
                SyncPolicy::Explicit
            };
            let config = Config::builder()
                .write_cache_max_size(cache_mb * 1024 * 1024)
                .sync_policy(sync_policy)
                .build();
            write(&file, &config, ledgers, entries, entry_size)
        }
        Commands::Scan { file, verbose } => scan(&file, verbose),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn write(
    path: &Path,
    config: &Config,
    ledgers: i64,
    entries: i64,
    entry_size: usize,
) -> bookie_storage::Result<()> {
    config.validate()?;

    let store = FileChannel::open(path)?;
    let end = store.size()?;
    let channel = BufferedChannel::new(&HeapAllocator, store, end, &config.channel())?;
    let cache = WriteCache::new(
        Arc::new(HeapAllocator),
        config.write_cache_max_size,
        config.write_cache_max_segment_size,
    )?;

    let mut flushes = 0u64;
    for entry_id in 0..entries {
        for ledger_id in 0..ledgers {
            let payload = synthetic_payload(ledger_id, entry_id, entry_size);
            if !cache.put(ledger_id, entry_id, &payload)? {
                flush_write_cache(&cache, &channel)?;
                flushes += 1;
                if !cache.put(ledger_id, entry_id, &payload)? {
                    return Err(StorageError::Config(format!(
                        "entry of {} bytes does not fit an empty write cache",
                        entry_size
                    )));
                }
            }
        }
    }

    let last = flush_write_cache(&cache, &channel)?;
    flushes += 1;
    channel.close()?;
    cache.close();

    tracing::info!(
        entries = ledgers * entries,
        flushes,
        end = last.end_position,
        "entry log written"
    );
    println!(
        "wrote {} entries in {} flushes, log is {} bytes",
        ledgers * entries,
        flushes,
        last.end_position
    );
    Ok(())
}

fn scan(path: &Path, verbose: bool) -> bookie_storage::Result<()> {
    let store = FileChannel::open_read_only(path)?;
    let end = store.size()?;
    let config = Config::default();
    let channel = BufferedChannel::new(&HeapAllocator, store, end, &config.channel())?;

    let mut records = 0u64;
    let mut payload_bytes = 0u64;
    for record in EntryLogReader::new(&channel) {
        let record = record?;
        if verbose {
            println!(
                "offset={} ledger={} entry={} len={}",
                record.offset,
                record.ledger_id,
                record.entry_id,
                record.payload.len()
            );
        }
        records += 1;
        payload_bytes += record.payload.len() as u64;
    }

    println!(
        "{} records, {} payload bytes, {} bytes total",
        records, payload_bytes, end
    );
    Ok(())
}

fn synthetic_payload(ledger_id: i64, entry_id: i64, size: usize) -> Vec<u8> {
    let seed = (ledger_id as u64).wrapping_mul(31).wrapping_add(entry_id as u64);
    (0..size).map(|i| (seed.wrapping_add(i as u64) % 251) as u8).collect()
}
