// ===============================
// src/recorder.rs
// ===============================
//
// JSONL recorder untuk keputusan engine:
// - Tulis setiap Event (Decision / Note) ke file .jsonl (append).
// - BufWriter, flush periodik tiap 1s dan/atau tiap 1000 event.
// - Parent directory dibuat otomatis.
// - Gagal tulis -> reopen sekali, kalau masih gagal event di-drop.
//
// Aktif kalau `--record` / RECORD_FILE di-set (lihat main.rs).
//
use std::path::Path;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info};

use crate::domain::Event;

const FLUSH_EVERY_N_EVENTS: u32 = 1000;

async fn open_writer(path: &str) -> std::io::Result<BufWriter<File>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(BufWriter::new(file))
}

async fn write_line(writer: &mut BufWriter<File>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

/// Record events until the channel closes; returns how many were written.
pub async fn run(mut rx: mpsc::Receiver<Event>, path: String) -> std::io::Result<u64> {
    let mut writer = open_writer(&path).await?;
    info!(%path, "recorder: started");

    let mut flush_tick = interval(Duration::from_secs(1));
    flush_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut since_last_flush: u32 = 0;
    let mut written: u64 = 0;

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                let Some(ev) = maybe_ev else { break };
                let line = match serde_json::to_string(&ev) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(?e, "recorder: serialize error, skip event");
                        continue;
                    }
                };

                if let Err(e) = write_line(&mut writer, &line).await {
                    error!(?e, "recorder: write failed, attempting reopen");
                    writer = open_writer(&path).await?;
                    if let Err(e2) = write_line(&mut writer, &line).await {
                        error!(?e2, "recorder: write failed again after reopen, drop event");
                        continue;
                    }
                }
                written += 1;

                since_last_flush += 1;
                if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                    writer.flush().await?;
                    since_last_flush = 0;
                }
            }

            _ = flush_tick.tick() => {
                let _ = writer.flush().await;
                since_last_flush = 0;
            }
        }
    }

    // Channel closed: flush dan keluar
    writer.flush().await?;
    info!(%path, written, "recorder: channel closed, stopped");
    Ok(written)
}
