// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/output/console.rs - 终端报告
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

use std::convert::Infallible;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::EvalConfig,
  evaluate::EvaluationResult,
  model::{InputRangeHint, ModelSpec, TensorKind},
  output::{ModelSummary, ProbeReport, Render},
  rank::{Advice, Outcome, Recommendation, Verdict},
  strategy::Strategy,
};

const RULE_WIDTH: usize = 60;
const BAR_MAX: usize = 40;

#[derive(Error, Debug, PartialEq)]
pub enum ConsoleOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 输出到标准输出
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(ConsoleOutput)
  }
}

fn section(title: &str) {
  println!("\n{}", "═".repeat(RULE_WIDTH));
  println!("  {}", title);
  println!("{}", "═".repeat(RULE_WIDTH));
}

/// 分差条，每 0.25 一格
pub fn spread_bar(spread: f32) -> String {
  let cells = (spread * 4.0).max(0.0) as usize;
  "▓".repeat(cells.min(BAR_MAX))
}

pub fn input_hint_lines(spec: &ModelSpec) -> Vec<String> {
  match spec.input_range_hint() {
    InputRangeHint::Bytes => vec![
      "⚠  输入张量为 UINT8。".to_string(),
      "   应直接传入 [0, 255] 的字节数据，不要使用 float32 输入。".to_string(),
    ],
    InputRangeHint::SignedQuantized { min, max } => vec![
      "⚠  输入张量为 INT8。".to_string(),
      format!("   期望的实数范围 ≈ [{:.3}, {:.3}]", min, max),
    ],
    InputRangeHint::FloatScaled { min, max } => vec![
      "✓  输入张量为 float32。".to_string(),
      format!("   量化参数提示输入范围 ≈ [{:.3}, {:.3}]", min, max),
    ],
    InputRangeHint::FloatUnspecified => vec![
      "✓  输入张量为 float32。".to_string(),
      "   无量化参数 (scale=0)，预处理可能已内置于模型，".to_string(),
      "   或模型期望原始 [0, 255] float32。".to_string(),
    ],
  }
}

pub fn advice_text(advice: Advice, recommendation: &Recommendation) -> String {
  match advice {
    Advice::InputKindMismatch => "(a) 模型输入张量类型错误 (uint8 与 float32)。".to_string(),
    Advice::InputSizeMismatch => "(b) 模型期望的输入尺寸与缩放尺寸不同。".to_string(),
    Advice::InternalPreprocessing => "(c) 模型内部的预处理层以不同方式处理输入。".to_string(),
    Advice::TryAlternateResize => "尝试其它缩放/裁剪策略 (居中裁剪与拉伸)。".to_string(),
    Advice::AdoptVariant => format!("采用 '{}'", recommendation.variant),
  }
}

fn print_summary(summary: &ModelSummary<'_>) {
  let spec = summary.spec;
  println!("\n后端 : {}", summary.backend);
  println!("模型 : {}", summary.model);

  section("模型张量信息");
  println!(
    "  输入形状 : {:?}   类型: {}",
    spec.input_shape(),
    spec.input_kind
  );
  println!(
    "  输入量化 : scale={:.6}  zero_point={}",
    spec.input_quant.scale, spec.input_quant.zero_point
  );
  println!(
    "  输出形状 : [1, {}]   类型: {}",
    spec.num_classes, spec.output_kind
  );
  println!(
    "  输出量化 : scale={:.6}  zero_point={}",
    spec.output_quant.scale, spec.output_quant.zero_point
  );
  println!();
  for line in input_hint_lines(spec) {
    println!("  {}", line);
  }

  let labels = summary.labels;
  if labels.is_synthesized() {
    println!("\n  未找到标签文件，使用数字索引 ({} 类)。", labels.len());
  } else {
    println!(
      "\n  标签: {} 类  ({} … {})",
      labels.len(),
      labels.first().unwrap_or(""),
      labels.last().unwrap_or("")
    );
  }
}

fn print_result(rank: usize, result: &EvaluationResult) {
  let marker = if rank == 0 { " ◀ 最佳" } else { "" };
  println!("\n  [{}] {}{}", rank + 1, result.variant, marker);
  println!(
    "       raw  : max={:.4}  min={:.4}  sum={:.4}  mean={:.4}",
    result.stats.max, result.stats.min, result.stats.sum, result.stats.mean
  );
  println!(
    "       分差 (max−mean) : {:.4}  {}",
    result.score,
    spread_bar(result.score)
  );
  println!(
    "       → {} @ {:.1}%",
    result.top1.label,
    result.top1.confidence * 100.0
  );
  for (i, p) in result.top.iter().enumerate() {
    println!(
      "         #{}: {} ({:.2}%)",
      i + 1,
      p.label,
      p.confidence * 100.0
    );
  }
}

fn print_recommendation(recommendation: &Recommendation, config: &EvalConfig, input_kind: TensorKind) {
  section("推荐");
  println!("  最佳预处理 : {}", recommendation.variant);
  println!(
    "  最佳预测   : {} @ {:.1}%",
    recommendation.label,
    recommendation.confidence * 100.0
  );
  println!("  分差       : {:.4}", recommendation.score);
  println!("  结论       : {}", recommendation.verdict);
  println!();

  match recommendation.verdict {
    Verdict::Unreliable => {
      println!(
        "  ⚠  警告: 即使最佳策略的分差也低于 {:.1}。",
        config.unreliable_below
      );
      println!("     通常意味着以下之一:");
      for advice in &recommendation.advice {
        println!("     {}", advice_text(*advice, recommendation));
      }
      println!("\n     使用的输入类型: {}", input_kind);
    }
    Verdict::Mediocre => {
      println!(
        "  △  分差 {:.2} 一般 (95% 置信度约需 {:.1})。",
        recommendation.score, config.target_spread
      );
      for advice in &recommendation.advice {
        println!("     {}", advice_text(*advice, recommendation));
      }
    }
    Verdict::Acceptable => {
      for advice in &recommendation.advice {
        println!(
          "  ✓  分差 ≥ {:.1}, {}",
          config.acceptable_from,
          advice_text(*advice, recommendation)
        );
      }
    }
  }
}

impl<'a> Render<ModelSummary<'a>> for ConsoleOutput {
  type Error = Infallible;

  fn render_result(&self, result: &ModelSummary<'a>) -> Result<(), Self::Error> {
    print_summary(result);
    Ok(())
  }
}

impl<'a> Render<ProbeReport<'a>> for ConsoleOutput {
  type Error = Infallible;

  fn render_result(&self, result: &ProbeReport<'a>) -> Result<(), Self::Error> {
    print_summary(&result.summary);

    let spec = result.summary.spec;
    let (w, h) = result.image_size;
    section(&format!("图像: {}", result.image));
    println!("  原始尺寸 : {}x{}", w, h);
    println!("  缩放策略 :");
    for resize in result.resizes {
      println!(
        "    {:<12}: {}",
        resize.name(),
        resize.describe(result.image_size, spec.target_size())
      );
    }

    section("预处理对比");
    let failures = result.outcome.failures();
    match result.outcome {
      Outcome::Ranked(report) => {
        for (rank, r) in report.ranked.iter().enumerate() {
          print_result(rank, r);
        }
        for failure in failures {
          println!("\n  [{}]\n    错误: {}", failure.variant, failure.error);
        }
        print_recommendation(&report.recommendation, result.config, spec.input_kind);
      }
      Outcome::NoUsableResult { .. } => {
        for failure in failures {
          println!("\n  [{}]\n    错误: {}", failure.variant, failure.error);
        }
        section("没有可用结果");
        println!("  全部 {} 个候选推理失败，无法给出推荐。", failures.len());
        println!("  请检查模型输入类型与尺寸。");
      }
    }
    println!();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::QuantParams;

  #[test]
  fn from_url_checks_scheme() {
    assert!(ConsoleOutput::from_url(&Url::parse("console:").unwrap()).is_ok());
    assert_eq!(
      ConsoleOutput::from_url(&Url::parse("json:///tmp/r.json").unwrap()).err(),
      Some(ConsoleOutputError::SchemeMismatch("json".to_string()))
    );
  }

  #[test]
  fn spread_bar_is_clamped() {
    assert_eq!(spread_bar(-1.0), "");
    assert_eq!(spread_bar(1.0).chars().count(), 4);
    assert_eq!(spread_bar(100.0).chars().count(), BAR_MAX);
  }

  #[test]
  fn hint_lines_follow_input_kind() {
    let mut spec = ModelSpec {
      height: 224,
      width: 224,
      channels: 3,
      input_kind: TensorKind::Int8,
      input_quant: QuantParams::new(1.0, 0),
      output_kind: TensorKind::Float32,
      output_quant: QuantParams::default(),
      num_classes: 95,
    };
    let lines = input_hint_lines(&spec);
    assert!(lines[1].contains("-128.000") && lines[1].contains("127.000"));

    spec.input_kind = TensorKind::Float32;
    spec.input_quant = QuantParams::default();
    assert_eq!(input_hint_lines(&spec).len(), 3);
  }
}
