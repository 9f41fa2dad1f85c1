// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/output/record.rs - 诊断文件后台写入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{Sender, channel};
use std::thread::JoinHandle;

use chrono::Utc;
use tracing::{debug, warn};

struct Job {
  path: PathBuf,
  bytes: Vec<u8>,
}

/// 诊断文件的后台写入队列。
///
/// 写入请求即发即忘，失败只记录日志，永远不会反馈给控制循环。
/// `close` 会排空队列后返回；直接丢弃则不等待在途写入。
pub struct Recorder {
  tx: Option<Sender<Job>>,
  worker: Option<JoinHandle<()>>,
  directory: PathBuf,
}

impl Recorder {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    let directory = directory.into();
    let (tx, rx) = channel::<Job>();

    let worker = std::thread::spawn(move || {
      for job in rx {
        if let Some(parent) = job.path.parent() {
          if let Err(err) = fs::create_dir_all(parent) {
            warn!("创建目录 {} 失败: {}", parent.display(), err);
            continue;
          }
        }
        match fs::write(&job.path, &job.bytes) {
          Ok(()) => debug!("后台写入 {} 完成", job.path.display()),
          Err(err) => warn!("后台写入 {} 失败: {}", job.path.display(), err),
        }
      }
    });

    Recorder {
      tx: Some(tx),
      worker: Some(worker),
      directory,
    }
  }

  /// 在记录目录下写入一个固定名称的文件
  pub fn store(&self, filename: &str, bytes: Vec<u8>) {
    let path = self.directory.join(filename);
    if let Some(tx) = &self.tx {
      if tx.send(Job { path, bytes }).is_err() {
        warn!("记录队列已关闭, 丢弃 {}", filename);
      }
    }
  }

  /// 按日期归档一份文件: `YYYY/MM/DD/<prefix>-HH-MM-SS.<ext>`
  pub fn archive(&self, prefix: &str, extension: &str, bytes: Vec<u8>) {
    let now = Utc::now();
    let name = format!(
      "{}/{}-{}.{}",
      now.format("%Y/%m/%d"),
      prefix,
      now.format("%H-%M-%S"),
      extension
    );
    self.store(&name, bytes);
  }

  /// 排空队列并结束写入线程
  pub fn close(mut self) {
    self.tx.take();
    if let Some(worker) = self.worker.take() {
      let _ = worker.join();
    }
  }
}
