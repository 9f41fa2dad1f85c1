// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/robot/http.rs - 执行器 HTTP 客户端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::RobotConfig;
use crate::robot::Actuator;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Error, Debug)]
pub enum RobotError {
  #[error("执行器请求失败: {0}")]
  RequestError(#[from] reqwest::Error),
  #[error("执行器接口地址无效: {0}")]
  UrlError(#[from] url::ParseError),
}

/// 执行器 HTTP 客户端。
///
/// GET 请求把共享密钥放在 `user_key` 查询参数里，
/// POST 请求放在表单编码的请求体里。
pub struct HttpActuator {
  client: Client,
  api_url: Url,
  user_key: String,
}

impl HttpActuator {
  pub fn new(config: &RobotConfig) -> Result<Self, RobotError> {
    let mut api_url = config.api_url.clone();
    // Url::join 会丢掉不以斜杠结尾的末段
    if !api_url.path().ends_with('/') {
      let path = format!("{}/", api_url.path());
      api_url.set_path(&path);
    }

    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    Ok(HttpActuator {
      client,
      api_url,
      user_key: config.user_key.clone(),
    })
  }

  fn get_text(&self, endpoint: &str) -> Result<String, RobotError> {
    let url = self.api_url.join(endpoint)?;
    debug!("GET {}", url);
    let text = self
      .client
      .get(url)
      .query(&[("user_key", &self.user_key)])
      .send()?
      .error_for_status()?
      .text()?;
    Ok(text)
  }

  fn post_keyed(&self, endpoint: &str) -> Result<(), RobotError> {
    let url = self.api_url.join(endpoint)?;
    debug!("POST {}", url);
    let body = format!("user_key={}", urlencoding::encode(&self.user_key));
    self
      .client
      .post(url)
      .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
      .body(body)
      .send()?
      .error_for_status()?;
    Ok(())
  }
}

impl Actuator for HttpActuator {
  type Error = RobotError;

  fn camera(&self) -> Result<String, Self::Error> {
    self.get_text("camera")
  }

  fn move_forward(&self, length: i32) -> Result<(), Self::Error> {
    self.post_keyed(&format!("forward/{length}"))
  }

  fn move_backward(&self, length: i32) -> Result<(), Self::Error> {
    self.post_keyed(&format!("backward/{length}"))
  }

  fn turn_left(&self, degrees: i32) -> Result<(), Self::Error> {
    self.post_keyed(&format!("left/{degrees}"))
  }

  fn turn_right(&self, degrees: i32) -> Result<(), Self::Error> {
    self.post_keyed(&format!("right/{degrees}"))
  }

  fn distance(&self) -> Result<String, Self::Error> {
    self.get_text("distance")
  }

  fn remote_status(&self) -> Result<String, Self::Error> {
    self.get_text("remote_status")
  }
}
