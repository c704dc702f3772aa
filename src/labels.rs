// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/labels.rs - 类别标签
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

use std::path::Path;

use tracing::{info, warn};

/// 与输出向量按索引对齐的类别名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  labels: Box<[String]>,
  synthesized: bool,
}

impl LabelSet {
  pub fn new(labels: Vec<String>) -> Self {
    Self {
      labels: labels.into_boxed_slice(),
      synthesized: false,
    }
  }

  /// 以数字索引作为标签
  pub fn numeric(len: usize) -> Self {
    Self {
      labels: (0..len).map(|i| i.to_string()).collect(),
      synthesized: true,
    }
  }

  /// 每行一个标签，忽略空行
  pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Ok(Self::new(
      content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect(),
    ))
  }

  /// 读取标签文件，失败或为空时退回数字索引
  pub fn load_or_numeric(path: Option<&Path>, num_classes: usize) -> Self {
    let Some(path) = path else {
      info!("未指定标签文件, 使用数字索引");
      return Self::numeric(num_classes);
    };

    match Self::from_file(path) {
      Ok(labels) if labels.is_empty() => {
        warn!("标签文件为空: {}, 使用数字索引", path.display());
        Self::numeric(num_classes)
      }
      Ok(labels) => {
        if labels.len() != num_classes {
          warn!(
            "标签数量 {} 与模型输出长度 {} 不一致",
            labels.len(),
            num_classes
          );
        }
        labels
      }
      Err(e) => {
        warn!("无法读取标签文件 {}: {}, 使用数字索引", path.display(), e);
        Self::numeric(num_classes)
      }
    }
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn is_synthesized(&self) -> bool {
    self.synthesized
  }

  pub fn as_slice(&self) -> &[String] {
    &self.labels
  }

  pub fn first(&self) -> Option<&str> {
    self.labels.first().map(String::as_str)
  }

  pub fn last(&self) -> Option<&str> {
    self.labels.last().map(String::as_str)
  }

  /// 越界时返回 `idx_<i>`
  pub fn resolve(&self, index: usize) -> String {
    self
      .labels
      .get(index)
      .cloned()
      .unwrap_or_else(|| format!("idx_{}", index))
  }
}
