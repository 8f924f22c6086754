use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};

/// 預設單檔最大大小：10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// 依日期切換檔案，單檔超過大小上限時遞增世代編號
pub struct Rotate {
    /// 檔名模式，例如 "log/default_info_%Y-%m-%d.log"
    fn_pattern: String,
    /// 當前基礎檔名（不含 generation，由日期決定）
    cur_base_fn: String,
    out_fh: Option<BufWriter<File>>,
    /// 只增不減
    generation: u32,
    max_size: u64,
    current_size: u64,
}

impl Rotate {
    pub fn new(fn_pattern: String) -> Self {
        Self::with_max_size(fn_pattern, DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(fn_pattern: String, max_size: u64) -> Self {
        Rotate {
            fn_pattern,
            cur_base_fn: String::new(),
            out_fh: None,
            generation: 0,
            max_size,
            current_size: 0,
        }
    }

    /// 寫入日誌訊息，自動處理日期切換與大小輪轉
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        // 日期變更：重設 generation
        if base_fn != self.cur_base_fn || self.out_fh.is_none() {
            self.cur_base_fn = base_fn;
            self.generation = 0;
            self.open_new_file()?;
        }

        if self.current_size > 0 && self.current_size + msg.len() as u64 > self.max_size {
            self.generation += 1;
            self.open_new_file()?;
        }

        let writer = self
            .out_fh
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not open", self.cur_base_fn))?;
        writer.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.out_fh.as_mut() {
            let _ = w.flush();
        }
    }

    /// generation = 0: "log/a_2025-02-03.log"
    /// generation = 1: "log/a_2025-02-03.1.log"
    fn full_fn(&self) -> PathBuf {
        let path = Path::new(&self.cur_base_fn);
        if self.generation == 0 {
            return path.to_path_buf();
        }

        let parent = path.parent().unwrap_or(Path::new(""));
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

        parent.join(format!("{}.{}.{}", stem, self.generation, ext))
    }

    fn open_new_file(&mut self) -> Result<()> {
        self.flush();

        let filename = self.full_fn();
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;

        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out_fh = Some(BufWriter::with_capacity(4096, file));

        Ok(())
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}
