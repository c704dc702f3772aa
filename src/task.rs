// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/task.rs - 探测任务
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

use anyhow::Context;
use tracing::info;

use crate::{
  config::EvalConfig,
  evaluate::Evaluator,
  input::ImageFileInput,
  labels::LabelSet,
  model::Model,
  output::{ModelSummary, ProbeReport, Render},
  rank::{Outcome, recommend},
  strategy::ResizeStrategy,
  variant::{self, Variant},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 只输出模型元数据，不做推理
pub struct SummaryTask<'a> {
  model_name: &'a str,
  labels: &'a LabelSet,
}

impl<'a> SummaryTask<'a> {
  pub fn new(model_name: &'a str, labels: &'a LabelSet) -> Self {
    Self { model_name, labels }
  }
}

impl<'a, M, O, RE> Task<(), M, O> for SummaryTask<'a>
where
  M: Model,
  O: for<'r> Render<ModelSummary<'r>, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Output = ();
  type Error = anyhow::Error;

  fn run_task(self, _input: (), model: M, output: O) -> Result<(), Self::Error> {
    info!("未指定图像, 仅输出模型信息");
    output
      .render_result(&ModelSummary {
        model: self.model_name,
        backend: model.backend(),
        spec: model.spec(),
        labels: self.labels,
      })
      .context("输出模型信息失败")?;
    Ok(())
  }
}

/// 对一张图像评估全部候选预处理并给出推荐
pub struct ProbeTask<'a> {
  model_name: &'a str,
  labels: &'a LabelSet,
  config: EvalConfig,
  variants: Vec<Variant>,
}

impl<'a> ProbeTask<'a> {
  pub fn new(model_name: &'a str, labels: &'a LabelSet) -> Self {
    Self {
      model_name,
      labels,
      config: EvalConfig::default(),
      variants: variant::standard(),
    }
  }

  pub fn with_config(mut self, config: EvalConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
    self.variants = variants;
    self
  }

  /// 候选用到的缩放策略，按首次出现的顺序
  fn resizes(&self) -> Vec<ResizeStrategy> {
    let mut resizes = Vec::new();
    for v in &self.variants {
      if !resizes.contains(&v.resize) {
        resizes.push(v.resize);
      }
    }
    resizes
  }
}

impl<'a, 'i, M, O, RE> Task<&'i ImageFileInput, M, O> for ProbeTask<'a>
where
  M: Model,
  O: for<'r> Render<ProbeReport<'r>, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Output = Outcome;
  type Error = anyhow::Error;

  fn run_task(self, input: &'i ImageFileInput, model: M, output: O) -> Result<Outcome, Self::Error> {
    self.config.validate().context("评估配置无效")?;

    let spec = model.spec();
    info!(
      "开始探测: {} 个候选, 目标尺寸 {}",
      self.variants.len(),
      spec.target_size()
    );
    let now = std::time::Instant::now();
    let evaluation =
      Evaluator::new(&model, self.labels, &self.config).evaluate_all(input.image(), &self.variants);
    info!(
      "评估完成: {} 成功, {} 失败, 耗时: {:.2?}",
      evaluation.results.len(),
      evaluation.failures.len(),
      now.elapsed()
    );

    let outcome = recommend(evaluation, &self.config);
    let resizes = self.resizes();
    output
      .render_result(&ProbeReport {
        summary: ModelSummary {
          model: self.model_name,
          backend: model.backend(),
          spec,
          labels: self.labels,
        },
        image: input.path(),
        image_size: input.dimensions(),
        resizes: &resizes,
        config: &self.config,
        outcome: &outcome,
      })
      .context("输出报告失败")?;

    Ok(outcome)
  }
}
