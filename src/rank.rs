// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/rank.rs - 排名与推荐
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
use tracing::{error, info};

use crate::{
  config::EvalConfig,
  evaluate::{CandidateFailure, Evaluation, EvaluationResult},
};

/// 最佳分差的质量分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
  Unreliable,
  Mediocre,
  Acceptable,
}

/// 分级附带的建议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Advice {
  /// 输入类型错误 (uint8 与 float32)
  InputKindMismatch,
  /// 输入尺寸与模型期望不符
  InputSizeMismatch,
  /// 模型内部有未建模的预处理层
  InternalPreprocessing,
  /// 尝试其它缩放/裁剪策略
  TryAlternateResize,
  /// 采用最佳候选
  AdoptVariant,
}

impl Verdict {
  pub fn classify(score: f32, config: &EvalConfig) -> Self {
    if score < config.unreliable_below {
      Verdict::Unreliable
    } else if score < config.acceptable_from {
      Verdict::Mediocre
    } else {
      Verdict::Acceptable
    }
  }

  pub fn advice(&self) -> &'static [Advice] {
    match self {
      Verdict::Unreliable => &[
        Advice::InputKindMismatch,
        Advice::InputSizeMismatch,
        Advice::InternalPreprocessing,
      ],
      Verdict::Mediocre => &[Advice::TryAlternateResize],
      Verdict::Acceptable => &[Advice::AdoptVariant],
    }
  }
}

impl std::fmt::Display for Verdict {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Verdict::Unreliable => "Unreliable",
      Verdict::Mediocre => "Mediocre",
      Verdict::Acceptable => "Acceptable",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
  pub verdict: Verdict,
  pub variant: String,
  pub score: f32,
  pub label: String,
  pub confidence: f32,
  pub advice: Vec<Advice>,
}

#[derive(Debug)]
pub struct RankedReport {
  /// 按分差降序
  pub ranked: Vec<EvaluationResult>,
  pub failures: Vec<CandidateFailure>,
  pub recommendation: Recommendation,
}

impl RankedReport {
  pub fn best(&self) -> &EvaluationResult {
    &self.ranked[0]
  }
}

/// 一轮运行的结论
#[derive(Debug)]
pub enum Outcome {
  Ranked(RankedReport),
  /// 所有候选均失败，不给出推荐
  NoUsableResult { failures: Vec<CandidateFailure> },
}

impl Outcome {
  pub fn recommendation(&self) -> Option<&Recommendation> {
    match self {
      Outcome::Ranked(report) => Some(&report.recommendation),
      Outcome::NoUsableResult { .. } => None,
    }
  }

  pub fn failures(&self) -> &[CandidateFailure] {
    match self {
      Outcome::Ranked(report) => &report.failures,
      Outcome::NoUsableResult { failures } => failures,
    }
  }
}

/// 按分差降序稳定排序，分差相同时保持生成顺序
pub fn rank(mut results: Vec<EvaluationResult>) -> Vec<EvaluationResult> {
  results.sort_by(|a, b| {
    b.score
      .partial_cmp(&a.score)
      .unwrap_or(std::cmp::Ordering::Equal)
  });
  results
}

pub fn recommend(evaluation: Evaluation, config: &EvalConfig) -> Outcome {
  let Evaluation { results, failures } = evaluation;
  let ranked = rank(results);

  let Some(best) = ranked.first() else {
    error!("全部 {} 个候选均推理失败, 没有可用结果", failures.len());
    return Outcome::NoUsableResult { failures };
  };

  let verdict = Verdict::classify(best.score, config);
  info!(
    "最佳候选: {} (分差 {:.4}, {})",
    best.variant, best.score, verdict
  );
  let recommendation = Recommendation {
    verdict,
    variant: best.variant.clone(),
    score: best.score,
    label: best.top1.label.clone(),
    confidence: best.top1.confidence,
    advice: verdict.advice().to_vec(),
  };

  Outcome::Ranked(RankedReport {
    ranked,
    failures,
    recommendation,
  })
}
