// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

use preprobe::config::{
  ACCEPTABLE_FROM, EvalConfig, LETTERBOX_FILL, OutputKind, PROBABILITY_SUM_TOLERANCE, TARGET_SPREAD,
  TOP_K, UNRELIABLE_BELOW,
};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputKindArg {
  /// 根据输出之和判断
  #[default]
  Auto,
  /// 总是做 softmax
  Logits,
  /// 输出已是概率
  Probabilities,
}

impl From<OutputKindArg> for OutputKind {
  fn from(arg: OutputKindArg) -> Self {
    match arg {
      OutputKindArg::Auto => OutputKind::Auto,
      OutputKindArg::Logits => OutputKind::Logits,
      OutputKindArg::Probabilities => OutputKind::Probabilities,
    }
  }
}

/// 为图像分类模型寻找合适的输入预处理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径, 如 tflite:///path/model.tflite
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 测试图像, 如 image:///path/pig.jpg; 省略时只输出模型信息
  #[arg(long, value_name = "IMAGE")]
  pub image: Option<Url>,
  /// 标签文件, 每行一个标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
  /// 报告输出: console: 或 json:///path/report.json
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  /// 低于该分差视为不可靠
  #[arg(long, default_value_t = UNRELIABLE_BELOW)]
  pub unreliable_below: f32,
  /// 不低于该分差视为可接受
  #[arg(long, default_value_t = ACCEPTABLE_FROM)]
  pub acceptable_from: f32,
  /// 判断输出为概率分布时和的容差
  #[arg(long, default_value_t = PROBABILITY_SUM_TOLERANCE)]
  pub tolerance: f32,
  /// 信箱填充灰度值
  #[arg(long, default_value_t = LETTERBOX_FILL)]
  pub letterbox_fill: u8,
  /// 每个候选报告的预测数量
  #[arg(long, default_value_t = TOP_K)]
  pub top_k: usize,
  /// 高置信度所需的分差提示
  #[arg(long, default_value_t = TARGET_SPREAD)]
  pub target_spread: f32,
  /// 模型输出类型
  #[arg(long, value_enum, default_value_t = OutputKindArg::Auto)]
  pub output_kind: OutputKindArg,
  /// 打分前按输出量化参数反量化
  #[arg(long)]
  pub dequantize_output: bool,
}

impl Args {
  pub fn eval_config(&self) -> EvalConfig {
    EvalConfig::default()
      .with_thresholds(self.unreliable_below, self.acceptable_from)
      .with_tolerance(self.tolerance)
      .with_letterbox_fill(self.letterbox_fill)
      .with_top_k(self.top_k)
      .with_target_spread(self.target_spread)
      .with_output_kind(self.output_kind.into())
      .with_dequantize_output(self.dequantize_output)
  }
}
