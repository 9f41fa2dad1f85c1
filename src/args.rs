// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use zhuimao::{InferencingConfig, ModelConfig, ParametersConfig, RobotConfig};

/// Zhuimao 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 机器人执行器 API 基地址
  #[arg(long, value_name = "URL")]
  pub robot_api: Url,

  /// 执行器共享访问密钥
  #[arg(long, value_name = "KEY")]
  pub robot_key: String,

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

  /// 类别标签表, 逗号分隔, 第一个标签为搜寻目标
  #[arg(long, default_value = "hat", value_delimiter = ',', value_name = "LABELS")]
  pub class_labels: Vec<String>,

  /// 模型输入张量边长
  #[arg(long, default_value = "640", value_name = "SIZE")]
  pub tensor_size: u32,

  /// 对准计算所用的图像水平分辨率
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub image_resolution_x: i32,

  /// 判定拦截的目标框宽度阈值
  #[arg(long, default_value = "180", value_name = "PIXELS")]
  pub delta_threshold: i32,

  /// 触发避障的最小距离 (毫米)
  #[arg(long, default_value = "200", value_name = "MM")]
  pub min_distance_to_obstacle: i32,

  /// 避障机动的固定转角 (度)
  #[arg(long, default_value = "30", value_name = "DEGREES")]
  pub angle_delta: i32,

  /// 诊断快照目录, 不指定则不记录
  #[arg(long, value_name = "DIR")]
  pub snapshot_dir: Option<PathBuf>,
}

impl Args {
  pub fn robot_config(&self) -> RobotConfig {
    RobotConfig {
      api_url: self.robot_api.clone(),
      user_key: self.robot_key.clone(),
    }
  }

  pub fn inferencing_config(&self) -> InferencingConfig {
    InferencingConfig {
      api_url: self.inference_api.clone(),
      api_token: self.inference_token.clone(),
    }
  }

  pub fn model_config(&self) -> ModelConfig {
    ModelConfig {
      confidence_threshold: self.confidence,
      iou_threshold: self.iou_threshold,
      class_labels: self.class_labels.clone(),
      tensor_size: self.tensor_size,
    }
  }

  pub fn parameters_config(&self) -> ParametersConfig {
    ParametersConfig {
      image_resolution_x: self.image_resolution_x,
      delta_threshold: self.delta_threshold,
      min_distance_to_obstacle: self.min_distance_to_obstacle,
      angle_delta: self.angle_delta,
    }
  }
}
