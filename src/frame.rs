// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/frame.rs - NHWC 浮点帧定义
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

use image::RgbImage;
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// HWC 排列的 RGB 浮点帧
///
/// 缩放策略产出 [0,255] 范围的像素，归一化策略在同一布局上产出模型期望的数值。
#[derive(Debug, Clone, PartialEq)]
pub struct RgbF32Frame {
  width: usize,
  height: usize,
  data: Box<[f32]>,
}

impl RgbF32Frame {
  pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width * height;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn pixel(&self, x: usize, y: usize) -> [f32; RGB_CHANNELS] {
    let base = (y * self.width + x) * RGB_CHANNELS;
    [self.data[base], self.data[base + 1], self.data[base + 2]]
  }

  /// 交换 R 与 B 通道
  pub fn reverse_channels(&self) -> Self {
    let mut data = self.data.clone();
    for pixel in data.chunks_exact_mut(RGB_CHANNELS) {
      pixel.swap(0, 2);
    }
    Self {
      width: self.width,
      height: self.height,
      data,
    }
  }

  /// 逐元素变换，闭包参数为 (通道索引, 数值)
  pub fn map_channels(&self, f: impl Fn(usize, f32) -> f32) -> Self {
    let data = self
      .data
      .iter()
      .enumerate()
      .map(|(i, &v)| f(i % RGB_CHANNELS, v))
      .collect();
    Self {
      width: self.width,
      height: self.height,
      data,
    }
  }

  pub fn min(&self) -> f32 {
    self.data.iter().copied().fold(f32::INFINITY, f32::min)
  }

  pub fn max(&self) -> f32 {
    self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
  }

  pub fn mean(&self) -> f32 {
    if self.data.is_empty() {
      return 0.0;
    }
    self.data.iter().sum::<f32>() / self.data.len() as f32
  }
}

impl From<&RgbImage> for RgbF32Frame {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let data = image.as_raw().iter().map(|&v| v as f32).collect();
    Self {
      width: width as usize,
      height: height as usize,
      data,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn from_vec_checks_length() {
    assert_eq!(
      RgbF32Frame::from_vec(2, 2, vec![0.0; 11]),
      Err(FrameError::LengthMismatch {
        expected: 12,
        actual: 11
      })
    );
    assert!(RgbF32Frame::from_vec(2, 2, vec![0.0; 12]).is_ok());
  }

  #[test]
  fn image_conversion_keeps_hwc_layout() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([1, 2, 3]));
    image.put_pixel(1, 0, Rgb([4, 5, 6]));
    let frame = RgbF32Frame::from(&image);
    assert_eq!(frame.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(frame.pixel(1, 0), [4.0, 5.0, 6.0]);
  }

  #[test]
  fn reverse_channels_swaps_red_and_blue() {
    let frame = RgbF32Frame::from_vec(1, 1, vec![10.0, 20.0, 30.0]).unwrap();
    assert_eq!(frame.reverse_channels().as_slice(), &[30.0, 20.0, 10.0]);
  }

  #[test]
  fn statistics() {
    let frame = RgbF32Frame::from_vec(1, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    assert_eq!(frame.min(), 0.0);
    assert_eq!(frame.max(), 5.0);
    assert_eq!(frame.mean(), 2.5);
  }
}
