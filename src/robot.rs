// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/robot.rs - 机器人执行器接口
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::info;

mod http;
pub use self::http::{HttpActuator, RobotError};

/// 一条离散运动指令；每轮产生的指令序列严格按顺序下发。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  MoveForward(i32),
  MoveBackward(i32),
  TurnLeft(i32),
  TurnRight(i32),
}

/// 机器人执行器的抽象接口。
///
/// 所有调用均为同步阻塞；实现方不得并发复用同一连接。
pub trait Actuator {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 读取摄像头, 返回 Base64 编码的图像
  fn camera(&self) -> Result<String, Self::Error>;
  fn move_forward(&self, length: i32) -> Result<(), Self::Error>;
  fn move_backward(&self, length: i32) -> Result<(), Self::Error>;
  fn turn_left(&self, degrees: i32) -> Result<(), Self::Error>;
  fn turn_right(&self, degrees: i32) -> Result<(), Self::Error>;
  /// 读取距离传感器, 返回含毫米数值的字符串
  fn distance(&self) -> Result<String, Self::Error>;
  fn remote_status(&self) -> Result<String, Self::Error>;
}

/// 按顺序下发一串指令，任一失败立即中止。
pub fn dispatch<A: Actuator>(actuator: &A, commands: &[Command]) -> Result<(), A::Error> {
  for command in commands {
    info!("发送指令: {:?}", command);
    match *command {
      Command::MoveForward(length) => actuator.move_forward(length)?,
      Command::MoveBackward(length) => actuator.move_backward(length)?,
      Command::TurnLeft(degrees) => actuator.turn_left(degrees)?,
      Command::TurnRight(degrees) => actuator.turn_right(degrees)?,
    }
  }
  Ok(())
}

/// 从传感器返回串中解析毫米距离。
///
/// 剔除所有非数字字符后解析; 空串解析为 0。
pub fn parse_distance_mm(raw: &str) -> i32 {
  let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
  digits.parse().unwrap_or(0)
}

/// 读取并解析一次距离
pub fn distance_mm<A: Actuator>(actuator: &A) -> Result<i32, A::Error> {
  Ok(parse_distance_mm(&actuator.distance()?))
}
