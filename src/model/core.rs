// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/model/core.rs - 模型定义与检测后处理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

/// 输出矩阵每行在类别分数之前的列数: cx, cy, w, h, 框置信度
const BOX_COLUMNS: usize = 5;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  /// 类别编号
  pub class_id: usize,
  /// 综合置信度
  pub score: f32,
  /// 信箱坐标系下的边界框 [x_min, y_min, x_max, y_max]
  pub bbox: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

/// 解码模型输出并过滤。
///
/// 输出为扁平数组，按 `5 + num_classes` 列重排成行；逐行执行:
/// 框置信度过滤、中心式转角点式、最高类别分数扫描、
/// 综合置信度过滤，最后做与类别无关的贪心 NMS。
pub fn postprocess(
  output: &[f32],
  num_classes: usize,
  conf_threshold: f32,
  iou_threshold: f32,
) -> DetectResult {
  let columns = BOX_COLUMNS + num_classes;
  let rows = output.len() / columns;

  let mut detections = Vec::new();
  for row in 0..rows {
    let x = &output[row * columns..(row + 1) * columns];

    let box_conf = x[4];
    if box_conf <= conf_threshold {
      continue;
    }

    // 中心式 (cx, cy, w, h) 转为角点式
    let bbox = [
      x[0] - x[2] / 2.0,
      x[1] - x[3] / 2.0,
      x[0] + x[2] / 2.0,
      x[1] + x[3] / 2.0,
    ];

    let mut best_score = 0.0f32;
    let mut best_class = 0usize;
    for (class_id, &score) in x[BOX_COLUMNS..].iter().enumerate() {
      if score > best_score {
        best_score = score;
        best_class = class_id;
      }
    }

    let score = box_conf * best_score;
    if score <= conf_threshold {
      continue;
    }

    detections.push(DetectItem {
      class_id: best_class,
      score,
      bbox,
    });
  }

  let kept = nms(detections, iou_threshold);
  debug!("检测到 {} 个对象", kept.len());

  DetectResult {
    items: kept.into_boxed_slice(),
  }
}

/// 与类别无关的贪心非极大值抑制。
///
/// 按置信度降序排列后逐个保留，抑制与已保留框重叠超过阈值的
/// 后续框；不同类别的框同样互相抑制。
pub fn nms(mut detections: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  detections.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut suppressed = vec![false; detections.len()];
  let mut keep = Vec::new();

  for i in 0..detections.len() {
    if suppressed[i] {
      continue;
    }
    keep.push(detections[i].clone());

    for j in (i + 1)..detections.len() {
      if suppressed[j] {
        continue;
      }
      if iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  keep
}

/// 轴对齐边界框的交并比；不相交或面积非正时为零。
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);

  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
