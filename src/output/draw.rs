// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/output/draw.rs - 检测结果标注
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::frame::LetterboxTransform;
use crate::model::DetectResult;

const BORDER_THICKNESS: i32 = 2;
const BORDER_COLOR: [u8; 3] = [0, 255, 0];

/// 把信箱坐标系下的检测框画回原始图像。
/// 仅用于诊断输出，不参与任何导航决策。
pub struct Draw {
  border_color: [u8; 3],
  border_thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      border_color: BORDER_COLOR,
      border_thickness: BORDER_THICKNESS,
    }
  }
}

/// 信箱坐标映射回原图像素并裁剪到图像范围内。
/// 映射使用变换里未截断的填充量。
fn map_box(
  bbox: &[f32; 4],
  transform: &LetterboxTransform,
  width: u32,
  height: u32,
) -> Option<(i32, i32, i32, i32)> {
  if transform.ratio <= 0.0 {
    return None;
  }

  let max_x = width as f32 - 1.0;
  let max_y = height as f32 - 1.0;
  let to_x = |x: f32| ((x - transform.pad_x) / transform.ratio).clamp(0.0, max_x);
  let to_y = |y: f32| ((y - transform.pad_y) / transform.ratio).clamp(0.0, max_y);

  let x_min = to_x(bbox[0]) as i32;
  let y_min = to_y(bbox[1]) as i32;
  let x_max = to_x(bbox[2]) as i32;
  let y_max = to_y(bbox[3]) as i32;

  if x_min >= x_max || y_min >= y_max {
    return None;
  }

  Some((x_min, y_min, x_max, y_max))
}

impl Draw {
  /// 返回画好检测框的图像副本
  pub fn annotate(
    &self,
    image: &RgbImage,
    result: &DetectResult,
    transform: &LetterboxTransform,
  ) -> RgbImage {
    let mut annotated = image.clone();
    let (width, height) = annotated.dimensions();

    for item in result.items.iter() {
      let Some((x_min, y_min, x_max, y_max)) = map_box(&item.bbox, transform, width, height)
      else {
        continue;
      };

      for inset in 0..self.border_thickness {
        let x = x_min + inset;
        let y = y_min + inset;
        let w = x_max - x_min - 2 * inset;
        let h = y_max - y_min - 2 * inset;
        if w <= 0 || h <= 0 {
          break;
        }
        draw_hollow_rect_mut(
          &mut annotated,
          Rect::at(x, y).of_size(w as u32, h as u32),
          Rgb(self.border_color),
        );
      }
    }

    annotated
  }
}
