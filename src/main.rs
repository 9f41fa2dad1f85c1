// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use zhuimao::model::RemoteDetector;
use zhuimao::output::Recorder;
use zhuimao::robot::HttpActuator;
use zhuimao::task::{HuntController, HuntSchedule, HuntTask};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("执行器接口: {}", args.robot_api);
  info!("推理端点: {}", args.inference_api);
  info!("置信度阈值: {}", args.confidence);
  info!("IoU 阈值: {}", args.iou_threshold);
  info!("类别标签: {:?}", args.class_labels);

  let model_config = args.model_config();
  let actuator = HttpActuator::new(&args.robot_config())?;
  let model = RemoteDetector::new(&args.inferencing_config(), &model_config)?;
  let recorder = args.snapshot_dir.clone().map(Recorder::new);

  let controller = Arc::new(HuntController::new(HuntTask {
    actuator: Arc::new(actuator),
    model: Arc::new(model),
    model_config,
    parameters: args.parameters_config(),
    recorder: recorder.map(Arc::new),
    schedule: HuntSchedule::default(),
  }));

  info!("远程状态: {}", controller.status()?);

  let ctrlc_controller = Arc::clone(&controller);
  ctrlc::set_handler(move || {
    info!("收到中断信号, 准备退出...");
    ctrlc_controller.stop();
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .expect("Error setting Ctrl-C handler");

  info!("开始搜寻...");
  controller.run();
  controller.wait();

  info!("任务完成, 退出");
  Ok(())
}
