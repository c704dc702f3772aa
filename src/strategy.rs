// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/strategy.rs - 预处理策略
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

/// 具名的纯变换，名称即身份
pub trait Strategy: Copy + std::fmt::Debug {
  fn name(&self) -> &'static str;
}

/// 模型输入的空间尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct TargetSize {
  pub width: u32,
  pub height: u32,
}

impl TargetSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  pub fn square(size: u32) -> Self {
    Self::new(size, size)
  }
}

impl std::fmt::Display for TargetSize {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}x{}", self.width, self.height)
  }
}

mod normalize;
mod resize;
pub use self::normalize::{CHANNEL_MEAN, CHANNEL_STD, NormalizeStrategy};
pub use self::resize::ResizeStrategy;
