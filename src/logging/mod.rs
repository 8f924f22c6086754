use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use chrono::{format::DelayedFormat, DateTime, Local};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use once_cell::sync::Lazy;

use crate::logging::rotate::Rotate;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 等待寫檔線程回覆 flush 的上限
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Log(LogMessage),
    /// 寫出緩衝內容後回覆
    Flush(Sender<()>),
}

pub struct Logger {
    info_writer: Sender<Command>,
    warn_writer: Sender<Command>,
    error_writer: Sender<Command>,
    debug_writer: Sender<Command>,
}

impl Logger {
    pub(crate) fn new(log_name: &str) -> Self {
        Self::in_dir(Path::new("log"), log_name)
    }

    pub(crate) fn in_dir(dir: &Path, log_name: &str) -> Self {
        Logger {
            info_writer: Self::create_writer(dir, &format!("{}_info", log_name)),
            warn_writer: Self::create_writer(dir, &format!("{}_warn", log_name)),
            error_writer: Self::create_writer(dir, &format!("{}_error", log_name)),
            debug_writer: Self::create_writer(dir, &format!("{}_debug", log_name)),
        }
    }

    pub(crate) fn info(&self, log: String) {
        self.send(&self.info_writer, log::Level::Info, log);
    }

    pub(crate) fn warn(&self, log: String) {
        self.send(&self.warn_writer, log::Level::Warn, log);
    }

    pub(crate) fn error(&self, log: String) {
        self.send(&self.error_writer, log::Level::Error, log);
    }

    pub(crate) fn debug(&self, log: String) {
        self.send(&self.debug_writer, log::Level::Debug, log);
    }

    /// Blocks until every writer thread has written out what was queued before this call.
    pub(crate) fn flush(&self) {
        let writers = [
            &self.info_writer,
            &self.warn_writer,
            &self.error_writer,
            &self.debug_writer,
        ];

        let pending: Vec<Receiver<()>> = writers
            .iter()
            .filter_map(|writer| {
                let (ack_tx, ack_rx) = bounded::<()>(0);
                writer.send(Command::Flush(ack_tx)).ok().map(|_| ack_rx)
            })
            .collect();

        for ack in pending {
            if let Err(why) = ack.recv_timeout(FLUSH_TIMEOUT) {
                error_console(format!("Failed to flush log writer because {}", why));
            }
        }
    }

    fn send(&self, writer: &Sender<Command>, level: log::Level, msg: String) {
        if let Err(why) = writer.send(Command::Log(LogMessage::new(level, msg))) {
            error_console(why.to_string());
        }
    }

    fn create_writer(dir: &Path, log_name: &str) -> Sender<Command> {
        let (tx, rx) = unbounded::<Command>();
        let pattern: PathBuf = dir.join(format!("{}_%Y-%m-%d.log", log_name));
        let pattern = pattern.to_string_lossy().into_owned();

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut lines = String::with_capacity(4096);
            let mut last_at = Local::now();

            while let Ok(command) = rx.recv() {
                match command {
                    Command::Log(received) => {
                        if writeln!(
                            &mut lines,
                            "{} {} {}",
                            received.created_at.format("%F %X%.6f"),
                            received.level,
                            received.msg
                        )
                        .is_err()
                        {
                            continue;
                        }

                        last_at = received.created_at;
                        if rx.is_empty() || lines.len() >= 4096 {
                            write_lines(&mut rotate, last_at, &mut lines);
                        }
                    }
                    Command::Flush(ack) => {
                        write_lines(&mut rotate, last_at, &mut lines);
                        let _ = ack.send(());
                    }
                }
            }

            write_lines(&mut rotate, last_at, &mut lines);
        });

        tx
    }
}

fn write_lines(rotate: &mut Rotate, at: DateTime<Local>, lines: &mut String) {
    if lines.is_empty() {
        return;
    }

    if let Err(why) = rotate.write_msg(at, lines.as_bytes()) {
        error_console(format!("Failed to write log file because {:?}", why));
        info_console(lines.clone());
    }

    rotate.flush();
    lines.clear();
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

/// 程式結束前呼叫，確保排隊中的日誌都已寫入檔案
pub fn shutdown() {
    LOGGER.flush();
}

/// stdout 只留給報表，主控台訊息一律寫到 stderr
pub fn info_console(log: String) {
    eprintln!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
