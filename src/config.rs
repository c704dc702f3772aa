// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/config.rs - 评估策略配置
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

use serde::Serialize;
use thiserror::Error;

/// 低于该分数的最佳结果视为不可靠
pub const UNRELIABLE_BELOW: f32 = 2.0;
/// 不低于该分数的最佳结果视为可接受
pub const ACCEPTABLE_FROM: f32 = 5.0;
/// 判断输出是否已是概率分布时，和与 1.0 的容差
pub const PROBABILITY_SUM_TOLERANCE: f32 = 0.01;
/// 信箱填充灰度值
pub const LETTERBOX_FILL: u8 = 128;
/// 报告中保留的前 K 个预测
pub const TOP_K: usize = 3;
/// 95 类、95% 置信度大约需要的分差
pub const TARGET_SPREAD: f32 = 7.5;

/// 模型输出的分布类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OutputKind {
  /// 根据输出之和自动判断
  #[default]
  Auto,
  /// 输出为 logits，总是做 softmax
  Logits,
  /// 输出已经是概率
  Probabilities,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("阈值顺序错误: 不可靠阈值 {unreliable} 大于可接受阈值 {acceptable}")]
  InvertedThresholds { unreliable: f32, acceptable: f32 },
  #[error("概率和容差必须为正数, 实际为 {0}")]
  InvalidTolerance(f32),
  #[error("top-k 至少为 1")]
  ZeroTopK,
}

/// 评分与推荐策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalConfig {
  pub unreliable_below: f32,
  pub acceptable_from: f32,
  pub probability_sum_tolerance: f32,
  pub letterbox_fill: u8,
  pub top_k: usize,
  pub target_spread: f32,
  pub output_kind: OutputKind,
  /// 打分前按输出量化参数反量化，默认直接使用模型输出的整数值
  pub dequantize_output: bool,
}

impl Default for EvalConfig {
  fn default() -> Self {
    Self {
      unreliable_below: UNRELIABLE_BELOW,
      acceptable_from: ACCEPTABLE_FROM,
      probability_sum_tolerance: PROBABILITY_SUM_TOLERANCE,
      letterbox_fill: LETTERBOX_FILL,
      top_k: TOP_K,
      target_spread: TARGET_SPREAD,
      output_kind: OutputKind::Auto,
      dequantize_output: false,
    }
  }
}

impl EvalConfig {
  pub fn with_thresholds(mut self, unreliable_below: f32, acceptable_from: f32) -> Self {
    self.unreliable_below = unreliable_below;
    self.acceptable_from = acceptable_from;
    self
  }

  pub fn with_tolerance(mut self, tolerance: f32) -> Self {
    self.probability_sum_tolerance = tolerance;
    self
  }

  pub fn with_letterbox_fill(mut self, fill: u8) -> Self {
    self.letterbox_fill = fill;
    self
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn with_target_spread(mut self, target_spread: f32) -> Self {
    self.target_spread = target_spread;
    self
  }

  pub fn with_output_kind(mut self, output_kind: OutputKind) -> Self {
    self.output_kind = output_kind;
    self
  }

  pub fn with_dequantize_output(mut self, dequantize_output: bool) -> Self {
    self.dequantize_output = dequantize_output;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.unreliable_below > self.acceptable_from {
      return Err(ConfigError::InvertedThresholds {
        unreliable: self.unreliable_below,
        acceptable: self.acceptable_from,
      });
    }
    // NaN 也在这里被拒绝
    if !(self.probability_sum_tolerance > 0.0) {
      return Err(ConfigError::InvalidTolerance(
        self.probability_sum_tolerance,
      ));
    }
    if self.top_k == 0 {
      return Err(ConfigError::ZeroTopK);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    let config = EvalConfig::default();
    assert_eq!(config.unreliable_below, 2.0);
    assert_eq!(config.acceptable_from, 5.0);
    assert_eq!(config.probability_sum_tolerance, 0.01);
    assert_eq!(config.top_k, 3);
    assert!(!config.dequantize_output);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn inverted_thresholds_are_rejected() {
    let config = EvalConfig::default().with_thresholds(6.0, 5.0);
    assert_eq!(
      config.validate(),
      Err(ConfigError::InvertedThresholds {
        unreliable: 6.0,
        acceptable: 5.0
      })
    );
  }

  #[test]
  fn bad_tolerance_and_top_k_are_rejected() {
    assert!(matches!(
      EvalConfig::default().with_tolerance(0.0).validate(),
      Err(ConfigError::InvalidTolerance(_))
    ));
    assert!(matches!(
      EvalConfig::default().with_tolerance(f32::NAN).validate(),
      Err(ConfigError::InvalidTolerance(_))
    ));
    assert_eq!(
      EvalConfig::default().with_top_k(0).validate(),
      Err(ConfigError::ZeroTopK)
    );
  }
}
