// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use preprobe::{
  FromUrl,
  input::ImageFileInput,
  labels::LabelSet,
  model::{Model, TfliteModelBuilder},
  output::OutputWrapper,
  rank::Outcome,
  task::{ProbeTask, SummaryTask, Task},
};

/// 所有候选都失败时的退出码
const EXIT_NO_USABLE_RESULT: u8 = 2;

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型路径: {}", args.model);
  info!("输出路径: {}", args.output);

  let config = args.eval_config();
  config.validate().context("评估配置无效")?;

  let builder = TfliteModelBuilder::from_url(&args.model)?;
  let model_name = builder.model_path().to_string();
  let model = builder
    .build()
    .with_context(|| format!("无法加载模型: {}", args.model))?;
  let labels = LabelSet::load_or_numeric(args.labels.as_deref(), model.num_classes());
  let output = OutputWrapper::from_url(&args.output)?;

  let Some(image_url) = &args.image else {
    SummaryTask::new(&model_name, &labels).run_task((), &model, output)?;
    return Ok(ExitCode::SUCCESS);
  };

  info!("输入图像: {}", image_url);
  let input =
    ImageFileInput::from_url(image_url).with_context(|| format!("无法读取图像: {}", image_url))?;

  let outcome = ProbeTask::new(&model_name, &labels)
    .with_config(config)
    .run_task(&input, &model, output)?;

  match outcome {
    Outcome::Ranked(_) => Ok(ExitCode::SUCCESS),
    Outcome::NoUsableResult { failures } => {
      error!("没有可用结果 ({} 个候选失败)", failures.len());
      Ok(ExitCode::from(EXIT_NO_USABLE_RESULT))
    }
  }
}
