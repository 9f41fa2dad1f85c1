// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/frame.rs - 摄像头帧解码与信箱式预处理
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

use base64::{Engine as _, engine::general_purpose};
use image::{Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

const RGB_CHANNELS: usize = 3;

/// 信箱式填充的底色
const LETTERBOX_FILL: [u8; 3] = [114, 114, 114];

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("Base64 解码失败: {0}")]
  Base64Error(base64::DecodeError),
  #[error("图像解码失败: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 信箱式缩放的几何参数。
///
/// `pad_x`/`pad_y` 保留未截断的实数值，像素粘贴时才向下取整；
/// 坐标换算必须使用这里的值，不能从粘贴位置反推。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
  pub ratio: f32,
  pub pad_x: f32,
  pub pad_y: f32,
  pub target_size: u32,
}

/// 归一化后的 CHW 张量，通道顺序 R、G、B，取值范围 [0, 1]。
/// 每轮处理新建一个，创建后不再修改。
#[derive(Debug, Clone)]
pub struct RgbChwTensor {
  data: Box<[f32]>,
  size: u32,
}

impl RgbChwTensor {
  pub fn as_chw(&self) -> &[f32] {
    &self.data
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 推理请求的张量形状 [1, 3, size, size]
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, self.size as usize, self.size as usize]
  }
}

/// 解码执行器摄像头返回的 Base64 载荷。
///
/// 载荷可能缺少补位，也可能使用 URL 安全字母表；先补齐 `=`，
/// 再按 URL 安全字母表解码，失败后回退到标准字母表。
/// 返回原始字节（供诊断记录使用）与解码后的 RGB 图像。
pub fn decode_camera_payload(payload: &str) -> Result<(Vec<u8>, RgbImage), FrameError> {
  let trimmed = payload.trim();
  let mut encoded = trimmed.to_string();
  let missing = encoded.len() % 4;
  if missing != 0 {
    encoded.push_str(&"=".repeat(4 - missing));
  }

  let bytes = match general_purpose::URL_SAFE.decode(&encoded) {
    Ok(bytes) => bytes,
    Err(_) => general_purpose::STANDARD
      .decode(&encoded)
      .map_err(FrameError::Base64Error)?,
  };

  let image = image::load_from_memory(&bytes)?.to_rgb8();
  debug!("摄像头帧解码完成: {}x{}", image.width(), image.height());

  Ok((bytes, image))
}

/// 信箱式缩放：保持宽高比缩放到 `target_size` 方形画布，
/// 空余部分填充灰色，再归一化为 CHW 张量。
///
/// 过小的输入同样按比例放大后填充，不做裁剪。
pub fn letterbox(image: &RgbImage, target_size: u32) -> (RgbChwTensor, LetterboxTransform) {
  let (width, height) = image.dimensions();

  let ratio = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
  let new_width = (width as f32 * ratio).round() as u32;
  let new_height = (height as f32 * ratio).round() as u32;

  let resized = image::imageops::resize(image, new_width, new_height, FilterType::Triangle);

  let pad_x = (target_size - new_width) as f32 / 2.0;
  let pad_y = (target_size - new_height) as f32 / 2.0;

  let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb(LETTERBOX_FILL));
  image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

  let plane = (target_size as usize) * (target_size as usize);
  let mut data = vec![0f32; RGB_CHANNELS * plane];
  for (x, y, pixel) in canvas.enumerate_pixels() {
    let index = (y as usize) * (target_size as usize) + (x as usize);
    data[index] = pixel[0] as f32 / 255.0;
    data[plane + index] = pixel[1] as f32 / 255.0;
    data[2 * plane + index] = pixel[2] as f32 / 255.0;
  }

  let tensor = RgbChwTensor {
    data: data.into_boxed_slice(),
    size: target_size,
  };
  let transform = LetterboxTransform {
    ratio,
    pad_x,
    pad_y,
    target_size,
  };

  (tensor, transform)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
      .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
      .expect("PNG 编码失败");
    bytes
  }

  #[test]
  fn letterbox_1280x720_example() {
    let image = RgbImage::from_pixel(1280, 720, Rgb([200, 100, 50]));
    let (tensor, transform) = letterbox(&image, 640);

    assert_eq!(transform.ratio, 0.5);
    assert_eq!(transform.pad_x, 0.0);
    assert_eq!(transform.pad_y, 140.0);
    assert_eq!(transform.target_size, 640);
    assert_eq!(tensor.size(), 640);
    assert_eq!(tensor.as_chw().len(), 3 * 640 * 640);
    assert_eq!(tensor.shape(), [1, 3, 640, 640]);

    // 上方填充区域应为灰色 114
    let fill = 114.0 / 255.0;
    assert!((tensor.as_chw()[0] - fill).abs() < 1e-6);
    // 画布中心落在缩放后的图像内
    let center = 320 * 640 + 320;
    assert!((tensor.as_chw()[center] - 200.0 / 255.0).abs() < 0.02);
  }

  #[test]
  fn letterbox_keeps_aspect_ratio() {
    for (width, height, target) in [(1280, 720, 640), (720, 1280, 640), (333, 1000, 640), (50, 50, 640)] {
      let image = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
      let (_, transform) = letterbox(&image, target);

      let expected = (target as f32 / width as f32).min(target as f32 / height as f32);
      assert_eq!(transform.ratio, expected);
      assert!(transform.pad_x >= 0.0 && transform.pad_y >= 0.0);
      // 较长边贴满画布，对应方向的填充恰好为零
      assert!(transform.pad_x == 0.0 || transform.pad_y == 0.0);
    }
  }

  #[test]
  fn letterbox_square_source_has_no_padding() {
    let image = RgbImage::from_pixel(320, 320, Rgb([1, 2, 3]));
    let (_, transform) = letterbox(&image, 640);
    assert_eq!(transform.pad_x, 0.0);
    assert_eq!(transform.pad_y, 0.0);
    assert_eq!(transform.ratio, 2.0);
  }

  #[test]
  fn decode_standard_base64_payload() {
    let image = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
    let png = encode_png(&image);
    let payload = general_purpose::STANDARD.encode(&png);

    let (bytes, decoded) = decode_camera_payload(&payload).expect("解码失败");
    assert_eq!(bytes, png);
    assert_eq!(decoded.dimensions(), (8, 8));
  }

  #[test]
  fn decode_url_safe_payload_without_padding() {
    let image = RgbImage::from_pixel(8, 8, Rgb([200, 0, 0]));
    let png = encode_png(&image);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(&png);

    let (_, decoded) = decode_camera_payload(&payload).expect("解码失败");
    assert_eq!(decoded.dimensions(), (8, 8));
  }

  #[test]
  fn decode_payload_with_surrounding_whitespace() {
    let image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
    let payload = format!("  {}\n", general_purpose::STANDARD.encode(encode_png(&image)));
    assert!(decode_camera_payload(&payload).is_ok());
  }

  #[test]
  fn decode_rejects_non_image_bytes() {
    let payload = general_purpose::STANDARD.encode(b"not an image at all");
    match decode_camera_payload(&payload) {
      Err(FrameError::ImageError(_)) => {}
      other => panic!("期望图像解码错误, 实际: {:?}", other.map(|_| ())),
    }
  }
}
