// 该文件是 Zhuimao （追帽） 项目的一部分。
// src/nav.rs - 目标选择与导航状态机
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::info;

use crate::config::ParametersConfig;
use crate::model::DetectResult;
use crate::robot::Command;

/// 候选目标的最低置信度
const CANDIDATE_MIN_SCORE: f32 = 0.3;
/// 视为对准的中心偏差容限，信箱坐标像素
const ALIGN_TOLERANCE: f32 = 20.0;
/// 对准时的左转角；右转角刻意不同
const ALIGN_LEFT_DEG: i32 = 10;
const ALIGN_RIGHT_DEG: i32 = 9;
/// 光栅搜索的单步转角与一圈上限
const SEARCH_TURN_DEG: i32 = 10;
const SEARCH_FULL_CIRCLE: i32 = 360;
/// 搜索一圈无果后的前进长度
const SEARCH_ADVANCE_LEN: i32 = 40;
/// 接近目标时的前进步长
const APPROACH_STEP_LEN: i32 = 10;

/// 一次搜寻运行的状态；每轮由 `decide` 修改一次，
/// 新的运行从默认值开始。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchState {
  /// 当前光栅搜索已累计的转角，范围 [0, 360]
  pub turn_counter: i32,
  /// 目标已被拦截，运行终止
  pub hat_found: bool,
}

/// 被选中的目标候选，坐标均在信箱坐标系下
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
  pub score: f32,
  pub center_x: f32,
  pub width: f32,
}

/// 在检测集中挑选目标类别里置信度最高的一个。
/// 没有该类别的检测、或最高置信度为零时返回 None。
pub fn select_target(result: &DetectResult, target_class: usize) -> Option<TargetCandidate> {
  let mut best: Option<&crate::model::DetectItem> = None;
  for item in result.items.iter() {
    if item.class_id != target_class {
      continue;
    }
    if best.map(|b| b.score).unwrap_or(0.0) < item.score {
      best = Some(item);
    }
  }

  best.filter(|item| item.score > 0.0).map(|item| TargetCandidate {
    score: item.score,
    center_x: (item.bbox[0] + item.bbox[2]) / 2.0,
    width: item.bbox[2] - item.bbox[0],
  })
}

/// 每轮一次的导航决策。
///
/// 避障机动已执行时本轮不做视觉决策；没有合格候选时执行
/// 光栅搜索；有候选时先对准、再接近，目标框足够宽即判定拦截。
pub fn decide(
  state: &mut SearchState,
  bypassed: bool,
  candidate: Option<&TargetCandidate>,
  params: &ParametersConfig,
) -> Vec<Command> {
  if bypassed {
    return Vec::new();
  }

  let candidate = candidate.filter(|c| c.score > CANDIDATE_MIN_SCORE);

  match candidate {
    None => {
      info!("未发现目标, 继续搜索");
      if state.turn_counter < SEARCH_FULL_CIRCLE {
        state.turn_counter += SEARCH_TURN_DEG;
        vec![Command::TurnRight(SEARCH_TURN_DEG)]
      } else {
        state.turn_counter = 0;
        vec![Command::MoveForward(SEARCH_ADVANCE_LEN)]
      }
    }
    Some(candidate) => {
      info!(
        "发现候选目标: 置信度 {:.2}, 中心 {:.1}, 宽度 {:.1}",
        candidate.score, candidate.center_x, candidate.width
      );
      let center = params.image_resolution_x as f32 / 2.0;

      if (center - candidate.center_x).abs() >= ALIGN_TOLERANCE {
        if candidate.center_x < center {
          vec![Command::TurnLeft(ALIGN_LEFT_DEG)]
        } else {
          vec![Command::TurnRight(ALIGN_RIGHT_DEG)]
        }
      } else if candidate.width < params.delta_threshold as f32 {
        vec![Command::MoveForward(APPROACH_STEP_LEN)]
      } else {
        state.hat_found = true;
        info!("### 帽子已拦截! ###");
        Vec::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;

  fn params() -> ParametersConfig {
    ParametersConfig {
      image_resolution_x: 640,
      delta_threshold: 180,
      min_distance_to_obstacle: 200,
      angle_delta: 30,
    }
  }

  fn candidate(score: f32, center_x: f32, width: f32) -> TargetCandidate {
    TargetCandidate {
      score,
      center_x,
      width,
    }
  }

  fn detections(items: Vec<DetectItem>) -> DetectResult {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }

  #[test]
  fn select_target_picks_highest_score_of_target_class() {
    let result = detections(vec![
      DetectItem { class_id: 1, score: 0.99, bbox: [0.0, 0.0, 10.0, 10.0] },
      DetectItem { class_id: 0, score: 0.5, bbox: [100.0, 0.0, 140.0, 40.0] },
      DetectItem { class_id: 0, score: 0.8, bbox: [200.0, 0.0, 260.0, 60.0] },
    ]);
    let target = select_target(&result, 0).expect("应当选出目标");
    assert_eq!(target.score, 0.8);
    assert_eq!(target.center_x, 230.0);
    assert_eq!(target.width, 60.0);
  }

  #[test]
  fn select_target_none_when_class_absent() {
    let result = detections(vec![DetectItem {
      class_id: 2,
      score: 0.9,
      bbox: [0.0, 0.0, 10.0, 10.0],
    }]);
    assert!(select_target(&result, 0).is_none());
  }

  #[test]
  fn select_target_none_when_best_score_is_zero() {
    let result = detections(vec![DetectItem {
      class_id: 0,
      score: 0.0,
      bbox: [0.0, 0.0, 10.0, 10.0],
    }]);
    assert!(select_target(&result, 0).is_none());
  }

  #[test]
  fn bypassed_tick_emits_nothing_and_keeps_state() {
    let mut state = SearchState { turn_counter: 120, hat_found: false };
    let c = candidate(0.9, 320.0, 200.0);
    let commands = decide(&mut state, true, Some(&c), &params());
    assert!(commands.is_empty());
    assert_eq!(state, SearchState { turn_counter: 120, hat_found: false });
  }

  #[test]
  fn raster_search_turns_right_and_counts() {
    let mut state = SearchState::default();
    let commands = decide(&mut state, false, None, &params());
    assert_eq!(commands, vec![Command::TurnRight(10)]);
    assert_eq!(state.turn_counter, 10);
  }

  #[test]
  fn raster_search_wraps_around_at_full_circle() {
    let mut state = SearchState { turn_counter: 360, hat_found: false };
    let commands = decide(&mut state, false, None, &params());
    assert_eq!(commands, vec![Command::MoveForward(40)]);
    assert_eq!(state.turn_counter, 0);
  }

  #[test]
  fn low_score_candidate_keeps_searching() {
    let mut state = SearchState::default();
    let c = candidate(0.3, 320.0, 200.0);
    let commands = decide(&mut state, false, Some(&c), &params());
    assert_eq!(commands, vec![Command::TurnRight(10)]);
  }

  #[test]
  fn off_center_left_candidate_turns_left_ten() {
    let mut state = SearchState::default();
    let c = candidate(0.9, 280.0, 100.0);
    let commands = decide(&mut state, false, Some(&c), &params());
    assert_eq!(commands, vec![Command::TurnLeft(10)]);
  }

  #[test]
  fn off_center_right_candidate_turns_right_nine() {
    let mut state = SearchState::default();
    let c = candidate(0.9, 360.0, 100.0);
    let commands = decide(&mut state, false, Some(&c), &params());
    assert_eq!(commands, vec![Command::TurnRight(9)]);
  }

  #[test]
  fn centered_narrow_candidate_approaches() {
    let mut state = SearchState::default();
    let c = candidate(0.9, 320.0, 100.0);
    let commands = decide(&mut state, false, Some(&c), &params());
    assert_eq!(commands, vec![Command::MoveForward(10)]);
    assert!(!state.hat_found);
  }

  #[test]
  fn centered_wide_candidate_intercepts() {
    let mut state = SearchState { turn_counter: 40, hat_found: false };
    let c = candidate(0.9, 320.0, 200.0);
    let commands = decide(&mut state, false, Some(&c), &params());
    assert!(commands.is_empty());
    assert!(state.hat_found);
  }
}
