// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/output.rs - 报告输出
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

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::EvalConfig,
  labels::LabelSet,
  model::ModelSpec,
  rank::Outcome,
  strategy::ResizeStrategy,
};

pub trait Render<R>: Sized {
  type Error;
  fn render_result(&self, result: &R) -> Result<(), Self::Error>;
}

/// 模型元数据
pub struct ModelSummary<'a> {
  pub model: &'a str,
  pub backend: &'static str,
  pub spec: &'a ModelSpec,
  pub labels: &'a LabelSet,
}

/// 一次完整探测的报告
pub struct ProbeReport<'a> {
  pub summary: ModelSummary<'a>,
  pub image: &'a str,
  pub image_size: (u32, u32),
  pub resizes: &'a [ResizeStrategy],
  pub config: &'a EvalConfig,
  pub outcome: &'a Outcome,
}

mod console;
pub use self::console::{ConsoleOutput, ConsoleOutputError};

#[cfg(feature = "json_report")]
mod json_report;
#[cfg(feature = "json_report")]
pub use self::json_report::{JsonReportOutput, JsonReportOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("终端输出错误: {0}")]
  ConsoleOutputError(#[from] ConsoleOutputError),
  #[cfg(feature = "json_report")]
  #[error("JSON 报告输出错误: {0}")]
  JsonReportOutputError(#[from] JsonReportOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Console(ConsoleOutput),
  #[cfg(feature = "json_report")]
  JsonReport(JsonReportOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ConsoleOutput::SCHEME => Ok(OutputWrapper::Console(ConsoleOutput::from_url(url)?)),
      #[cfg(feature = "json_report")]
      JsonReportOutput::SCHEME => Ok(OutputWrapper::JsonReport(JsonReportOutput::from_url(
        url,
      )?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl<'a> Render<ModelSummary<'a>> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &ModelSummary<'a>) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => output.render_result(result).map_err(|e| match e {}),
      #[cfg(feature = "json_report")]
      OutputWrapper::JsonReport(output) => output.render_result(result).map_err(OutputError::from),
    }
  }
}

impl<'a> Render<ProbeReport<'a>> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &ProbeReport<'a>) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => output.render_result(result).map_err(|e| match e {}),
      #[cfg(feature = "json_report")]
      OutputWrapper::JsonReport(output) => output.render_result(result).map_err(OutputError::from),
    }
  }
}
