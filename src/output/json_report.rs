// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/output/json_report.rs - JSON 报告输出
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

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::EvalConfig,
  evaluate::{CandidateFailure, EvaluationResult},
  model::{InputRangeHint, ModelSpec},
  output::{ModelSummary, ProbeReport, Render},
  rank::{Outcome, Recommendation},
};

#[derive(Error, Debug)]
pub enum JsonReportOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("报告路径为空")]
  EmptyPath,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 将报告写入 JSON 文件
#[derive(Debug)]
pub struct JsonReportOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonReportOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonReportOutput {
  type Error = JsonReportOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonReportOutputError::SchemeMismatch);
    }
    if url.path().is_empty() {
      return Err(JsonReportOutputError::EmptyPath);
    }
    Ok(Self {
      path: PathBuf::from(url.path()),
    })
  }
}

#[derive(Serialize)]
struct FailureRecord<'a> {
  order: usize,
  variant: &'a str,
  error: String,
}

impl<'a> From<&'a CandidateFailure> for FailureRecord<'a> {
  fn from(failure: &'a CandidateFailure) -> Self {
    Self {
      order: failure.order,
      variant: &failure.variant,
      error: failure.error.to_string(),
    }
  }
}

#[derive(Serialize)]
struct ModelRecord<'a> {
  path: &'a str,
  backend: &'static str,
  spec: &'a ModelSpec,
  input_hint: InputRangeHint,
  labels: usize,
  labels_synthesized: bool,
}

impl<'a> From<&ModelSummary<'a>> for ModelRecord<'a> {
  fn from(summary: &ModelSummary<'a>) -> Self {
    Self {
      path: summary.model,
      backend: summary.backend,
      spec: summary.spec,
      input_hint: summary.spec.input_range_hint(),
      labels: summary.labels.len(),
      labels_synthesized: summary.labels.is_synthesized(),
    }
  }
}

#[derive(Serialize)]
struct ProbeRecord<'a> {
  image: &'a str,
  image_size: (u32, u32),
  config: &'a EvalConfig,
  ranked: &'a [EvaluationResult],
  failures: Vec<FailureRecord<'a>>,
  recommendation: Option<&'a Recommendation>,
  no_usable_result: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
  generated_at: String,
  model: ModelRecord<'a>,
  #[serde(skip_serializing_if = "Option::is_none")]
  probe: Option<ProbeRecord<'a>>,
}

impl JsonReportOutput {
  pub fn path(&self) -> &std::path::Path {
    &self.path
  }

  fn write(&self, report: &JsonReport<'_>) -> Result<(), JsonReportOutputError> {
    let file = std::fs::File::create(&self.path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    info!("报告已写入: {}", self.path.display());
    Ok(())
  }
}

impl<'a> Render<ModelSummary<'a>> for JsonReportOutput {
  type Error = JsonReportOutputError;

  fn render_result(&self, result: &ModelSummary<'a>) -> Result<(), Self::Error> {
    self.write(&JsonReport {
      generated_at: Utc::now().to_rfc3339(),
      model: ModelRecord::from(result),
      probe: None,
    })
  }
}

impl<'a> Render<ProbeReport<'a>> for JsonReportOutput {
  type Error = JsonReportOutputError;

  fn render_result(&self, result: &ProbeReport<'a>) -> Result<(), Self::Error> {
    let ranked: &[EvaluationResult] = match result.outcome {
      Outcome::Ranked(report) => &report.ranked,
      Outcome::NoUsableResult { .. } => &[],
    };
    let probe = ProbeRecord {
      image: result.image,
      image_size: result.image_size,
      config: result.config,
      ranked,
      failures: result
        .outcome
        .failures()
        .iter()
        .map(FailureRecord::from)
        .collect(),
      recommendation: result.outcome.recommendation(),
      no_usable_result: matches!(result.outcome, Outcome::NoUsableResult { .. }),
    };
    self.write(&JsonReport {
      generated_at: Utc::now().to_rfc3339(),
      model: ModelRecord::from(&result.summary),
      probe: Some(probe),
    })
  }
}
