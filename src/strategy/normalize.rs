// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/strategy/normalize.rs - 像素归一化策略
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

use super::Strategy;
use crate::frame::RgbF32Frame;

/// ImageNet 各通道均值 (R, G, B)
pub const CHANNEL_MEAN: [f32; 3] = [123.68, 116.779, 103.939];
/// ImageNet 各通道标准差 (R, G, B)
pub const CHANNEL_STD: [f32; 3] = [58.393, 57.12, 57.375];

/// 像素值到模型数值范围的逐元素变换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NormalizeStrategy {
  /// 原样 [0,255]
  Raw,
  /// x / 127.5 - 1，约 [-1,1]
  SymmetricUnit,
  /// x / 255，[0,1]
  Unit,
  /// 按通道 (x - mean) / std
  ChannelStandardize,
}

impl NormalizeStrategy {
  pub const ALL: [NormalizeStrategy; 4] = [
    NormalizeStrategy::Raw,
    NormalizeStrategy::SymmetricUnit,
    NormalizeStrategy::Unit,
    NormalizeStrategy::ChannelStandardize,
  ];

  pub fn normalize_value(&self, channel: usize, x: f32) -> f32 {
    match self {
      NormalizeStrategy::Raw => x,
      NormalizeStrategy::SymmetricUnit => x / 127.5 - 1.0,
      NormalizeStrategy::Unit => x / 255.0,
      NormalizeStrategy::ChannelStandardize => (x - CHANNEL_MEAN[channel]) / CHANNEL_STD[channel],
    }
  }

  pub fn apply(&self, frame: &RgbF32Frame) -> RgbF32Frame {
    if *self == NormalizeStrategy::Raw {
      return frame.clone();
    }
    frame.map_channels(|c, x| self.normalize_value(c, x))
  }
}

impl Strategy for NormalizeStrategy {
  fn name(&self) -> &'static str {
    match self {
      NormalizeStrategy::Raw => "raw [0,255]",
      NormalizeStrategy::SymmetricUnit => "÷127.5−1 [-1,1]",
      NormalizeStrategy::Unit => "÷255 [0,1]",
      NormalizeStrategy::ChannelStandardize => "ImageNet mean-std",
    }
  }
}
