// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/config.rs - 配置项定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use url::Url;

/// 机器人执行器接口配置
#[derive(Debug, Clone)]
pub struct RobotConfig {
  /// 执行器 API 基地址
  pub api_url: Url,
  /// 共享访问密钥，随每个请求发送
  pub user_key: String,
}

/// 推理服务接口配置
#[derive(Debug, Clone)]
pub struct InferencingConfig {
  /// 推理端点地址
  pub api_url: Url,
  /// Bearer 令牌
  pub api_token: String,
}

/// 检测模型配置
#[derive(Debug, Clone)]
pub struct ModelConfig {
  /// 综合置信度阈值
  pub confidence_threshold: f32,
  /// NMS IoU 阈值
  pub iou_threshold: f32,
  /// 类别标签表，下标即类别编号，下标 0 为搜寻目标
  pub class_labels: Vec<String>,
  /// 模型输入张量边长
  pub tensor_size: u32,
}

impl ModelConfig {
  pub fn num_classes(&self) -> usize {
    self.class_labels.len()
  }
}

/// 导航参数配置
#[derive(Debug, Clone, Copy)]
pub struct ParametersConfig {
  /// 对准计算所用的图像水平分辨率
  pub image_resolution_x: i32,
  /// 判定拦截的目标框宽度阈值
  pub delta_threshold: i32,
  /// 触发避障的最小距离，毫米
  pub min_distance_to_obstacle: i32,
  /// 避障机动的固定转角，度
  pub angle_delta: i32,
}
