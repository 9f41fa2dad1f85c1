// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/model/remote.rs - 远程推理模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  config::{InferencingConfig, ModelConfig},
  frame::RgbChwTensor,
  model::{DetectResult, Model, postprocess},
};

const INPUT_TENSOR_NAME: &str = "images";
const INPUT_TENSOR_DATATYPE: &str = "FP32";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum RemoteModelError {
  #[error("推理请求失败: {0}")]
  RequestError(#[from] reqwest::Error),
  #[error("类别标签表为空")]
  NoClassLabels,
}

/// 推理请求载荷: {"inputs": [{"name", "shape", "datatype", "data"}]}
#[derive(Serialize, Debug)]
struct InferencingRequest {
  inputs: Vec<InputTensor>,
}

#[derive(Serialize, Debug)]
struct InputTensor {
  name: String,
  shape: Vec<usize>,
  datatype: String,
  data: Vec<f32>,
}

/// 推理响应载荷: {"outputs": [{"data": [...]}]}
#[derive(Deserialize, Debug)]
struct InferencingResponse {
  #[serde(default)]
  outputs: Vec<OutputTensor>,
}

#[derive(Deserialize, Debug)]
struct OutputTensor {
  #[serde(default)]
  data: Vec<f32>,
}

/// 通过 HTTP 推理端点执行检测的模型。
///
/// 请求携带 Bearer 令牌；响应缺少输出时视为零检测，不算错误。
pub struct RemoteDetector {
  client: Client,
  api_url: Url,
  api_token: String,
  num_classes: usize,
  confidence_threshold: f32,
  iou_threshold: f32,
}

impl RemoteDetector {
  pub fn new(
    inferencing: &InferencingConfig,
    model: &ModelConfig,
  ) -> Result<Self, RemoteModelError> {
    if model.class_labels.is_empty() {
      return Err(RemoteModelError::NoClassLabels);
    }

    info!("创建远程推理客户端: {}", inferencing.api_url);
    debug!(
      "类别数量: {}, 置信度阈值: {}, IoU 阈值: {}",
      model.num_classes(),
      model.confidence_threshold,
      model.iou_threshold
    );

    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    Ok(RemoteDetector {
      client,
      api_url: inferencing.api_url.clone(),
      api_token: inferencing.api_token.clone(),
      num_classes: model.num_classes(),
      confidence_threshold: model.confidence_threshold,
      iou_threshold: model.iou_threshold,
    })
  }
}

fn serialize(tensor: &RgbChwTensor) -> InferencingRequest {
  InferencingRequest {
    inputs: vec![InputTensor {
      name: INPUT_TENSOR_NAME.to_string(),
      shape: tensor.shape().to_vec(),
      datatype: INPUT_TENSOR_DATATYPE.to_string(),
      data: tensor.as_chw().to_vec(),
    }],
  }
}

fn decode_response(
  response: InferencingResponse,
  num_classes: usize,
  conf_threshold: f32,
  iou_threshold: f32,
) -> DetectResult {
  match response.outputs.first() {
    Some(output) => postprocess(&output.data, num_classes, conf_threshold, iou_threshold),
    None => {
      debug!("推理响应无输出, 视为零检测");
      DetectResult::default()
    }
  }
}

impl Model for RemoteDetector {
  type Input = RgbChwTensor;
  type Output = DetectResult;
  type Error = RemoteModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("序列化推理请求");
    let request = serialize(input);

    debug!("发送推理请求");
    let response = self
      .client
      .post(self.api_url.clone())
      .bearer_auth(&self.api_token)
      .json(&request)
      .send()?
      .error_for_status()?;

    let response: InferencingResponse = response.json()?;

    Ok(decode_response(
      response,
      self.num_classes,
      self.confidence_threshold,
      self.iou_threshold,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::letterbox;
  use image::{Rgb, RgbImage};

  #[test]
  fn request_serializes_to_expected_wire_format() {
    let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
    let (tensor, _) = letterbox(&image, 8);
    let request = serialize(&tensor);

    let value = serde_json::to_value(&request).expect("序列化失败");
    let input = &value["inputs"][0];
    assert_eq!(input["name"], "images");
    assert_eq!(input["datatype"], "FP32");
    assert_eq!(input["shape"][0], 1);
    assert_eq!(input["shape"][1], 3);
    assert_eq!(input["shape"][2], 8);
    assert_eq!(input["data"].as_array().map(|d| d.len()), Some(3 * 8 * 8));
  }

  #[test]
  fn response_without_outputs_is_zero_detections() {
    let response: InferencingResponse = serde_json::from_str("{}").expect("反序列化失败");
    let result = decode_response(response, 2, 0.25, 0.2);
    assert!(result.is_empty());
  }

  #[test]
  fn response_with_empty_outputs_is_zero_detections() {
    let response: InferencingResponse =
      serde_json::from_str(r#"{"outputs": []}"#).expect("反序列化失败");
    assert!(decode_response(response, 2, 0.25, 0.2).is_empty());
  }

  #[test]
  fn response_data_is_postprocessed() {
    let json = r#"{"outputs": [{"data": [100.0, 100.0, 20.0, 20.0, 0.9, 0.9, 0.0]}]}"#;
    let response: InferencingResponse = serde_json::from_str(json).expect("反序列化失败");
    let result = decode_response(response, 2, 0.25, 0.2);

    assert_eq!(result.len(), 1);
    assert_eq!(result.items[0].class_id, 0);
    assert_eq!(result.items[0].bbox, [90.0, 90.0, 110.0, 110.0]);
  }
}
