// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/evaluate.rs - 候选推理与评分
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

use std::cmp::Ordering;
use std::collections::BTreeMap;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  config::{EvalConfig, OutputKind},
  frame::RgbF32Frame,
  labels::LabelSet,
  model::{InferenceError, InputTensor, Model},
  strategy::ResizeStrategy,
  variant::Variant,
};

/// 一个预测: 类别索引、标签、概率
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
  pub index: usize,
  pub label: String,
  pub confidence: f32,
}

/// 原始输出的统计量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputStats {
  pub min: f32,
  pub max: f32,
  pub sum: f32,
  pub mean: f32,
}

impl OutputStats {
  pub fn of(values: &[f32]) -> Self {
    let sum: f32 = values.iter().sum();
    Self {
      min: values.iter().copied().fold(f32::INFINITY, f32::min),
      max: values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
      sum,
      mean: sum / values.len().max(1) as f32,
    }
  }
}

/// 单个候选的完整评估结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
  /// 候选生成顺序
  pub order: usize,
  pub variant: String,
  pub raw: Box<[f32]>,
  pub probabilities: Box<[f32]>,
  pub already_probability: bool,
  pub stats: OutputStats,
  /// max(raw) - mean(raw)
  pub score: f32,
  pub top1: Prediction,
  pub top: Vec<Prediction>,
}

#[derive(Debug)]
pub struct CandidateFailure {
  pub order: usize,
  pub variant: String,
  pub error: InferenceError,
}

/// 一轮评估: 成功结果按生成顺序排列，失败候选单独记录
#[derive(Debug, Default)]
pub struct Evaluation {
  pub results: Vec<EvaluationResult>,
  pub failures: Vec<CandidateFailure>,
}

impl Evaluation {
  pub fn attempted(&self) -> usize {
    self.results.len() + self.failures.len()
  }
}

/// |sum - 1| < tolerance
pub fn is_probability_distribution(raw: &[f32], tolerance: f32) -> bool {
  (raw.iter().sum::<f32>() - 1.0).abs() < tolerance
}

/// 先减去最大值再取指数
pub fn softmax(logits: &[f32]) -> Box<[f32]> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// 分差: 原始输出的最大值减去均值
pub fn decisiveness(raw: &[f32]) -> f32 {
  let stats = OutputStats::of(raw);
  stats.max - stats.mean
}

/// 概率最高的 k 个索引，降序，概率相同时索引小者在前
///
/// 输入不含 NaN，+0.0 与 -0.0 视为相等。
pub fn top_k(probabilities: &[f32], k: usize) -> Vec<usize> {
  let mut indices: Vec<usize> = (0..probabilities.len()).collect();
  indices.sort_by(|&a, &b| {
    probabilities[b]
      .partial_cmp(&probabilities[a])
      .unwrap_or(Ordering::Equal)
  });
  indices.truncate(k);
  indices
}

/// 对一个原始输出向量打分
///
/// 输出为空或含非有限值时返回错误，保证不产生残缺结果。
pub fn score_output(
  order: usize,
  variant: &str,
  raw: Box<[f32]>,
  labels: &LabelSet,
  config: &EvalConfig,
) -> Result<EvaluationResult, InferenceError> {
  if raw.is_empty() {
    return Err(InferenceError::OutputLength {
      expected: labels.len(),
      actual: 0,
    });
  }
  if raw.iter().any(|v| !v.is_finite()) {
    return Err(InferenceError::NonFiniteOutput);
  }

  let already_probability = match config.output_kind {
    OutputKind::Auto => is_probability_distribution(&raw, config.probability_sum_tolerance),
    OutputKind::Logits => false,
    OutputKind::Probabilities => true,
  };
  let probabilities = if already_probability {
    raw.clone()
  } else {
    softmax(&raw)
  };

  let stats = OutputStats::of(&raw);
  let score = decisiveness(&raw);

  let top: Vec<Prediction> = top_k(&probabilities, config.top_k.max(1))
    .into_iter()
    .map(|index| Prediction {
      index,
      label: labels.resolve(index),
      confidence: probabilities[index],
    })
    .collect();
  let top1 = top[0].clone();

  Ok(EvaluationResult {
    order,
    variant: variant.to_string(),
    raw,
    probabilities,
    already_probability,
    stats,
    score,
    top1,
    top,
  })
}

/// 依次对每个候选做预处理、推理与打分
pub struct Evaluator<'a, M> {
  model: &'a M,
  labels: &'a LabelSet,
  config: &'a EvalConfig,
}

impl<'a, M: Model> Evaluator<'a, M> {
  pub fn new(model: &'a M, labels: &'a LabelSet, config: &'a EvalConfig) -> Self {
    Self {
      model,
      labels,
      config,
    }
  }

  /// 归一化 → 转换类型 → 推理 → 打分
  fn evaluate_resized(
    &self,
    resized: &RgbF32Frame,
    order: usize,
    variant: &Variant,
  ) -> Result<EvaluationResult, InferenceError> {
    let spec = self.model.spec();
    let normalized = variant.normalize.apply(resized);
    let input = InputTensor::from_frame(&normalized, spec.input_kind);
    let mut raw = self.model.infer(&input)?;
    if self.config.dequantize_output && spec.output_quant.is_quantized() {
      let quant = spec.output_quant;
      raw.iter_mut().for_each(|v| *v = quant.dequantize(*v as i32));
    }
    let result = score_output(order, variant.name(), raw, self.labels, self.config)?;
    debug!(
      "[{}] max={:.4} min={:.4} sum={:.4} mean={:.4}",
      result.variant, result.stats.max, result.stats.min, result.stats.sum, result.stats.mean
    );
    Ok(result)
  }

  /// 评估全部候选，单个候选失败不影响其余候选
  pub fn evaluate_all(&self, image: &RgbImage, variants: &[Variant]) -> Evaluation {
    let target = self.model.spec().target_size();
    let mut resized: BTreeMap<ResizeStrategy, RgbF32Frame> = BTreeMap::new();
    let mut evaluation = Evaluation::default();

    for (order, variant) in variants.iter().enumerate() {
      info!("({}/{}) 评估候选: {}", order + 1, variants.len(), variant);
      let base = resized
        .entry(variant.resize)
        .or_insert_with(|| variant.resize.apply(image, target, self.config.letterbox_fill));

      match self.evaluate_resized(base, order, variant) {
        Ok(result) => {
          info!(
            "({}/{}) 分差 {:.4}, {} @ {:.1}%",
            order + 1,
            variants.len(),
            result.score,
            result.top1.label,
            result.top1.confidence * 100.0
          );
          evaluation.results.push(result);
        }
        Err(error) => {
          warn!("候选 [{}] 推理失败: {}", variant, error);
          evaluation.failures.push(CandidateFailure {
            order,
            variant: variant.name().to_string(),
            error,
          });
        }
      }
    }

    evaluation
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn score(raw: &[f32]) -> EvaluationResult {
    score_output(
      0,
      "test",
      raw.into(),
      &LabelSet::numeric(raw.len()),
      &EvalConfig::default(),
    )
    .unwrap()
  }

  #[test]
  fn probability_detection() {
    assert!(is_probability_distribution(&[0.25; 4], 0.01));
    assert!(is_probability_distribution(&[0.5, 0.495], 0.01));
    assert!(!is_probability_distribution(&[1.0, 2.0, 3.0], 0.01));
    assert!(!is_probability_distribution(&[0.5, 0.48], 0.01));
  }

  #[test]
  fn softmax_is_stable_and_normalized() {
    let probs = softmax(&[1000.0, 1000.0, 999.0]);
    assert!(probs.iter().all(|p| p.is_finite()));
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    assert_eq!(probs[0], probs[1]);
    assert!(probs[2] < probs[0]);
  }

  #[test]
  fn decisiveness_is_max_minus_mean() {
    assert_eq!(decisiveness(&[1.0, 2.0, 3.0, 10.0]), 6.0);
    assert_eq!(decisiveness(&[0.25; 4]), 0.0);
  }

  #[test]
  fn score_uses_raw_values_not_probabilities() {
    let logits = [1.0, 2.0, 3.0, 10.0];
    let from_logits = score(&logits);
    assert!(!from_logits.already_probability);

    let softmaxed = softmax(&logits);
    let from_probs = score(&softmaxed);
    assert!(from_probs.already_probability);

    assert_eq!(from_logits.score, 6.0);
    assert!((from_probs.score - (softmaxed[3] - 0.25)).abs() < 1e-6);
    assert_ne!(from_logits.score, from_probs.score);
    // 两条路径得到相同的概率与 top-1
    assert_eq!(from_logits.top1.index, 3);
    assert_eq!(from_probs.top1.index, 3);
    for (a, b) in from_logits.probabilities.iter().zip(from_probs.probabilities.iter()) {
      assert!((a - b).abs() < 1e-6);
    }
  }

  #[test]
  fn top_k_breaks_ties_by_lower_index() {
    assert_eq!(top_k(&[0.1, 0.3, 0.3, 0.3], 3), vec![1, 2, 3]);
    assert_eq!(top_k(&[0.5, 0.1, 0.4], 3), vec![0, 2, 1]);
    assert_eq!(top_k(&[0.5, 0.5], 3), vec![0, 1]);
    assert_eq!(top_k(&[-0.0, 0.0, -1.0], 2), vec![0, 1]);
  }

  #[test]
  fn top_predictions_stay_inside_label_set() {
    let raw: Vec<f32> = (0..95).map(|i| ((i * 37) % 95) as f32 / 10.0).collect();
    let labels = LabelSet::numeric(95);
    let result = score_output(0, "t", raw.into(), &labels, &EvalConfig::default()).unwrap();
    assert_eq!(result.top.len(), 3);
    for p in &result.top {
      assert!(p.index < 95);
      assert_eq!(p.label, p.index.to_string());
    }
    assert!(result.top[0].confidence >= result.top[1].confidence);
    assert!(result.top[1].confidence >= result.top[2].confidence);
  }

  #[test]
  fn labels_shorter_than_output_use_synthetic_names() {
    let labels = LabelSet::new(vec!["a".into(), "b".into()]);
    let result = score_output(
      0,
      "t",
      vec![0.0, 0.0, 9.0].into(),
      &labels,
      &EvalConfig::default(),
    )
    .unwrap();
    assert_eq!(result.top1.label, "idx_2");
  }

  #[test]
  fn explicit_output_kind_overrides_heuristic() {
    let config = EvalConfig::default().with_output_kind(OutputKind::Logits);
    let labels = LabelSet::numeric(4);
    let result = score_output(0, "t", vec![0.25; 4].into(), &labels, &config).unwrap();
    assert!(!result.already_probability);

    let config = EvalConfig::default().with_output_kind(OutputKind::Probabilities);
    let result = score_output(0, "t", vec![1.0, 2.0, 3.0, 4.0].into(), &labels, &config).unwrap();
    assert!(result.already_probability);
    assert_eq!(&result.probabilities[..], &[1.0, 2.0, 3.0, 4.0]);
  }

  #[test]
  fn empty_or_non_finite_output_is_rejected() {
    let labels = LabelSet::numeric(0);
    let config = EvalConfig::default();
    assert!(matches!(
      score_output(0, "t", Vec::new().into(), &labels, &config),
      Err(InferenceError::OutputLength { .. })
    ));
    assert!(matches!(
      score_output(0, "t", vec![1.0, f32::NAN].into(), &labels, &config),
      Err(InferenceError::NonFiniteOutput)
    ));
  }
}
