// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/task.rs - 搜寻任务与控制循环
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::TARGET_CLASS_ID;
use crate::config::{ModelConfig, ParametersConfig};
use crate::frame::{RgbChwTensor, decode_camera_payload, letterbox};
use crate::model::{DetectResult, Model};
use crate::nav::{SearchState, decide, select_target};
use crate::output::{CURRENT_VIEW_FILE, Recorder};
use crate::robot::{Actuator, Command, dispatch, distance_mm};

/// 避障试探的前进长度
const BYPASS_PROBE_LEN: i32 = 20;
/// 避障直行长度的固定增量
const BYPASS_BASE_LEN: i32 = 40;

/// 协作式取消令牌。
///
/// 在每轮开始与每处睡眠点检查；`cancel` 会唤醒所有在途睡眠，
/// 因此取消延迟不超过一轮加一个睡眠间隔。
#[derive(Clone)]
pub struct CancelToken {
  inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

impl CancelToken {
  pub fn new() -> Self {
    CancelToken {
      inner: Arc::new((Mutex::new(false), Condvar::new())),
    }
  }

  pub fn cancel(&self) {
    let (lock, cvar) = &*self.inner;
    *lock.lock().unwrap() = true;
    cvar.notify_all();
  }

  pub fn is_cancelled(&self) -> bool {
    *self.inner.0.lock().unwrap()
  }

  /// 可中断睡眠；返回 false 表示睡眠期间被取消
  pub fn sleep(&self, duration: Duration) -> bool {
    let (lock, cvar) = &*self.inner;
    let deadline = Instant::now() + duration;
    let mut cancelled = lock.lock().unwrap();
    while !*cancelled {
      let now = Instant::now();
      if now >= deadline {
        return true;
      }
      let (guard, _) = cvar.wait_timeout(cancelled, deadline - now).unwrap();
      cancelled = guard;
    }
    false
  }
}

/// 控制循环的节奏参数
#[derive(Debug, Clone, Copy)]
pub struct HuntSchedule {
  /// 两轮之间的最小间隔
  pub tick_interval: Duration,
  /// 一轮失败后的退避时长
  pub failure_backoff: Duration,
}

impl Default for HuntSchedule {
  fn default() -> Self {
    HuntSchedule {
      tick_interval: Duration::from_millis(100),
      failure_backoff: Duration::from_secs(1),
    }
  }
}

/// 避障机动。
///
/// 距离不超过阈值时: 留存现场快照, 重读并记住距离, 左转试探;
/// 读数转清则前进一小段再右转回来; 读数再次转清则按记住的距离
/// 直行绕过。无论完成多少子步骤, 本轮都算已执行避障。
pub fn bypass_obstacle<A: Actuator>(
  actuator: &A,
  params: &ParametersConfig,
  recorder: Option<&Recorder>,
) -> Result<bool, A::Error> {
  let distance = distance_mm(actuator)?;
  debug!("障碍检查: 距离 {} mm", distance);
  if distance > params.min_distance_to_obstacle {
    return Ok(false);
  }

  info!("检测到障碍物: {} mm", distance);
  if let Some(recorder) = recorder {
    if let Ok(payload) = actuator.camera() {
      if let Ok((bytes, _)) = decode_camera_payload(&payload) {
        recorder.store(CURRENT_VIEW_FILE, bytes);
      }
    }
  }

  let remembered = distance_mm(actuator)?;
  dispatch(actuator, &[Command::TurnLeft(params.angle_delta)])?;

  if distance_mm(actuator)? > params.min_distance_to_obstacle {
    dispatch(
      actuator,
      &[
        Command::MoveForward(BYPASS_PROBE_LEN),
        Command::TurnRight(params.angle_delta),
      ],
    )?;
  }

  if distance_mm(actuator)? > params.min_distance_to_obstacle {
    let length = (remembered as f64 / 10.0).ceil() as i32 + BYPASS_BASE_LEN;
    dispatch(actuator, &[Command::MoveForward(length)])?;
  }

  Ok(true)
}

#[cfg(feature = "annotate")]
fn annotate_snapshot(
  recorder: Option<&Recorder>,
  image: &image::RgbImage,
  result: &DetectResult,
  transform: &crate::frame::LetterboxTransform,
) -> Option<Vec<u8>> {
  use crate::output::{CURRENT_VIEW_BOX_FILE, Draw};

  let recorder = recorder?;
  let annotated = Draw::default().annotate(image, result, transform);
  let mut bytes = Vec::new();
  if let Err(err) = annotated.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
  {
    warn!("标注图编码失败: {}", err);
    return None;
  }
  recorder.store(CURRENT_VIEW_BOX_FILE, bytes.clone());
  Some(bytes)
}

/// 一轮视觉处理: 取景 → 解码 → 信箱缩放 → 推理 → 选目标 → 决策 → 下发。
/// 任一步失败都会中止本轮, 由调用方退避后重试。
fn vision_tick<A, M>(
  actuator: &A,
  model: &M,
  model_config: &ModelConfig,
  params: &ParametersConfig,
  recorder: Option<&Recorder>,
  state: &mut SearchState,
) -> anyhow::Result<()>
where
  A: Actuator,
  M: Model<Input = RgbChwTensor, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let payload = actuator.camera().context("读取摄像头失败")?;
  let (raw_bytes, image) = decode_camera_payload(&payload).context("解码摄像头载荷失败")?;
  if let Some(recorder) = recorder {
    recorder.store(CURRENT_VIEW_FILE, raw_bytes);
  }

  let (tensor, transform) = letterbox(&image, model_config.tensor_size);
  let result = model.infer(&tensor).context("推理调用失败")?;
  info!("检测完成: {} 个对象", result.len());

  #[cfg(feature = "annotate")]
  let annotated = annotate_snapshot(recorder, &image, &result, &transform);
  #[cfg(not(feature = "annotate"))]
  let _ = transform;

  let candidate = select_target(&result, TARGET_CLASS_ID);
  let commands = decide(state, false, candidate.as_ref(), params);
  dispatch(actuator, &commands).context("下发指令失败")?;

  #[cfg(feature = "annotate")]
  if state.hat_found {
    if let (Some(recorder), Some(bytes)) = (recorder, annotated) {
      recorder.archive("intercept", "jpg", bytes);
    }
  }

  Ok(())
}

/// 一次搜寻运行所需的全部依赖
pub struct HuntTask<A, M> {
  pub actuator: Arc<A>,
  pub model: Arc<M>,
  pub model_config: ModelConfig,
  pub parameters: ParametersConfig,
  pub recorder: Option<Arc<Recorder>>,
  pub schedule: HuntSchedule,
}

impl<A, M> HuntTask<A, M>
where
  A: Actuator,
  M: Model<Input = RgbChwTensor, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  /// 控制循环主体。
  ///
  /// 每轮: 避障检查 → 视觉处理与决策。失败的一轮只记录日志并
  /// 退避, 不终止运行; 循环在目标拦截、外部停止或取消时结束。
  pub fn run(&self, enabled: &AtomicBool, token: &CancelToken) {
    let mut state = SearchState::default();
    info!("搜寻任务开始");

    while enabled.load(Ordering::SeqCst) && !token.is_cancelled() && !state.hat_found {
      match bypass_obstacle(self.actuator.as_ref(), &self.parameters, self.recorder.as_deref()) {
        Ok(true) => {
          debug!("本轮已执行避障机动");
          continue;
        }
        Ok(false) => {}
        Err(err) => {
          warn!("障碍检查失败: {}", err);
          if !token.sleep(self.schedule.failure_backoff) {
            break;
          }
          continue;
        }
      }

      if let Err(err) = vision_tick(
        self.actuator.as_ref(),
        self.model.as_ref(),
        &self.model_config,
        &self.parameters,
        self.recorder.as_deref(),
        &mut state,
      ) {
        warn!("本轮处理失败: {:#}", err);
        if !token.sleep(self.schedule.failure_backoff) {
          break;
        }
        continue;
      }

      if state.hat_found {
        break;
      }
      if !token.sleep(self.schedule.tick_interval) {
        break;
      }
    }

    info!("搜寻任务结束");
  }
}

struct Worker {
  token: CancelToken,
  handle: Option<JoinHandle<()>>,
}

/// 对外的控制面: 启动、停止、状态查询。
///
/// 同一时刻至多一个运行在后台线程上执行; 启动新运行会先取消
/// 旧运行(不同步等待), 再以全新搜寻状态启动。所有方法都可以
/// 被并发调用。
pub struct HuntController<A, M> {
  task: Arc<HuntTask<A, M>>,
  enabled: Arc<AtomicBool>,
  worker: Mutex<Option<Worker>>,
}

impl<A, M> HuntController<A, M>
where
  A: Actuator + Send + Sync + 'static,
  M: Model<Input = RgbChwTensor, Output = DetectResult> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(task: HuntTask<A, M>) -> Self {
    HuntController {
      task: Arc::new(task),
      enabled: Arc::new(AtomicBool::new(false)),
      worker: Mutex::new(None),
    }
  }

  /// 启动一次新的搜寻运行, 立即返回
  pub fn run(&self) {
    info!("收到启动请求");
    self.enabled.store(true, Ordering::SeqCst);

    let mut worker = self.worker.lock().unwrap();
    if let Some(previous) = worker.take() {
      info!("取消上一次运行");
      previous.token.cancel();
    }

    let token = CancelToken::new();
    let task = Arc::clone(&self.task);
    let enabled = Arc::clone(&self.enabled);
    let thread_token = token.clone();
    let handle = std::thread::spawn(move || task.run(&enabled, &thread_token));

    *worker = Some(Worker {
      token,
      handle: Some(handle),
    });
    info!("搜寻线程已启动");
  }

  /// 请求取消当前运行, 不等待线程退出
  pub fn stop(&self) {
    info!("收到停止请求");
    self.enabled.store(false, Ordering::SeqCst);
    if let Some(worker) = self.worker.lock().unwrap().as_ref() {
      worker.token.cancel();
    }
  }

  /// 同步转发执行器的远程状态
  pub fn status(&self) -> Result<String, A::Error> {
    self.task.actuator.remote_status()
  }

  /// 等待当前运行结束 (目标拦截或被停止)
  pub fn wait(&self) {
    let handle = {
      let mut worker = self.worker.lock().unwrap();
      worker.as_mut().and_then(|w| w.handle.take())
    };
    if let Some(handle) = handle {
      let _ = handle.join();
    }
  }
}
