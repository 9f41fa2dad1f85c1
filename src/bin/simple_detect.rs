// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/bin/simple_detect.rs - 单帧检测调试工具
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use zhuimao::{
  TARGET_CLASS_ID,
  config::{InferencingConfig, ModelConfig},
  frame::letterbox,
  model::{Model, RemoteDetector},
  nav::select_target,
};

/// Zhuimao 单帧检测调试工具: 对一张本地图像跑一遍完整的
/// 预处理 → 远程推理 → 后处理 → 目标选择流水线
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 待检测的图像文件
  #[arg(long, value_name = "FILE")]
  pub input: PathBuf,

  /// 推理端点地址
  #[arg(long, value_name = "URL")]
  pub inference_api: Url,

  /// 推理端点 Bearer 令牌
  #[arg(long, value_name = "TOKEN")]
  pub inference_token: String,

  /// 综合置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 类别标签表, 逗号分隔
  #[arg(long, default_value = "hat", value_delimiter = ',', value_name = "LABELS")]
  pub class_labels: Vec<String>,

  /// 模型输入张量边长
  #[arg(long, default_value = "640", value_name = "SIZE")]
  pub tensor_size: u32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let model_config = ModelConfig {
    confidence_threshold: args.confidence,
    iou_threshold: args.iou_threshold,
    class_labels: args.class_labels.clone(),
    tensor_size: args.tensor_size,
  };
  let inferencing = InferencingConfig {
    api_url: args.inference_api.clone(),
    api_token: args.inference_token.clone(),
  };

  info!("读取图像: {}", args.input.display());
  let image = image::ImageReader::open(&args.input)
    .with_context(|| format!("无法打开 {}", args.input.display()))?
    .decode()
    .context("图像解码失败")?
    .to_rgb8();

  let (tensor, transform) = letterbox(&image, args.tensor_size);
  info!(
    "信箱缩放: 比例 {:.4}, 填充 ({:.1}, {:.1})",
    transform.ratio, transform.pad_x, transform.pad_y
  );

  let detector = RemoteDetector::new(&inferencing, &model_config)?;

  let now = std::time::Instant::now();
  let result = detector.infer(&tensor)?;
  info!("推理完成, 耗时: {:.2?}, 共 {} 个对象", now.elapsed(), result.len());

  for item in result.items.iter() {
    let label = model_config
      .class_labels
      .get(item.class_id)
      .map(String::as_str)
      .unwrap_or("unknown");
    info!(
      "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}, {:.0})",
      label,
      item.score * 100.0,
      item.bbox[0],
      item.bbox[1],
      item.bbox[2],
      item.bbox[3]
    );
  }

  match select_target(&result, TARGET_CLASS_ID) {
    Some(target) => info!(
      "目标候选: 置信度 {:.2}, 中心 {:.1}, 宽度 {:.1}",
      target.score, target.center_x, target.width
    ),
    None => info!("未发现目标"),
  }

  Ok(())
}
