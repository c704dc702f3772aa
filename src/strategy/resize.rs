// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/strategy/resize.rs - 空间缩放策略
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

use image::{
  Rgb, RgbImage,
  imageops::{self, FilterType},
};

use super::{Strategy, TargetSize};
use crate::frame::RgbF32Frame;

/// 双线性插值
const FILTER: FilterType = FilterType::Triangle;

/// 图像到固定尺寸像素阵列的空间变换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResizeStrategy {
  /// 直接拉伸，忽略宽高比
  Stretch,
  /// 裁剪居中最大区域后缩放
  CenterCrop,
  /// 保持宽高比缩放，灰色填充
  Letterbox,
  /// 短边缩放到目标尺寸后居中裁剪
  ShortSideCrop,
  /// 拉伸后交换 R/B 通道，用于排查通道顺序
  StretchBgr,
}

impl ResizeStrategy {
  pub const MAIN: [ResizeStrategy; 4] = [
    ResizeStrategy::Stretch,
    ResizeStrategy::CenterCrop,
    ResizeStrategy::Letterbox,
    ResizeStrategy::ShortSideCrop,
  ];

  pub const DIAGNOSTIC: [ResizeStrategy; 1] = [ResizeStrategy::StretchBgr];

  /// 产出 [0,255] 范围、目标尺寸的 RGB 浮点帧
  pub fn apply(&self, image: &RgbImage, target: TargetSize, fill: u8) -> RgbF32Frame {
    match self {
      ResizeStrategy::Stretch => RgbF32Frame::from(&stretch(image, target)),
      ResizeStrategy::CenterCrop => RgbF32Frame::from(&center_crop(image, target)),
      ResizeStrategy::Letterbox => RgbF32Frame::from(&letterbox(image, target, fill)),
      ResizeStrategy::ShortSideCrop => RgbF32Frame::from(&short_side_crop(image, target)),
      ResizeStrategy::StretchBgr => RgbF32Frame::from(&stretch(image, target)).reverse_channels(),
    }
  }

  /// 便于人工核对的变换说明
  pub fn describe(&self, source: (u32, u32), target: TargetSize) -> String {
    let (w, h) = source;
    match self {
      ResizeStrategy::Stretch => format!("{}x{} → {}", w, h, target),
      ResizeStrategy::CenterCrop => {
        let (cw, ch) = centered_region(w, h, target);
        format!("{}x{} → {} 经 {}x{} 居中区域", w, h, target, cw, ch)
      }
      ResizeStrategy::Letterbox => {
        let (nw, nh) = fitted_size(w, h, target);
        format!("{}x{} → {}x{} 置于 {} 灰色画布", w, h, nw, nh, target)
      }
      ResizeStrategy::ShortSideCrop => {
        let (nw, nh) = covering_size(w, h, target);
        format!("{}x{} → {}x{} 再裁剪到 {}", w, h, nw, nh, target)
      }
      ResizeStrategy::StretchBgr => format!("{}x{} → {} 并交换 R/B", w, h, target),
    }
  }
}

impl Strategy for ResizeStrategy {
  fn name(&self) -> &'static str {
    match self {
      ResizeStrategy::Stretch => "stretch",
      ResizeStrategy::CenterCrop => "center-crop",
      ResizeStrategy::Letterbox => "letterbox",
      ResizeStrategy::ShortSideCrop => "short-side",
      ResizeStrategy::StretchBgr => "stretch BGR",
    }
  }
}

// 尺寸计算均以 u64 进行，比较宽高比时交叉相乘避免浮点误差

/// 源图中与目标宽高比一致的最大居中区域
fn centered_region(w: u32, h: u32, target: TargetSize) -> (u32, u32) {
  let (w64, h64) = (w as u64, h as u64);
  let (tw, th) = (target.width as u64, target.height as u64);
  if w64 * th >= h64 * tw {
    (((h64 * tw) / th).clamp(1, w64) as u32, h)
  } else {
    (w, ((w64 * th) / tw).clamp(1, h64) as u32)
  }
}

/// 长边贴合目标的缩放尺寸
fn fitted_size(w: u32, h: u32, target: TargetSize) -> (u32, u32) {
  let (w64, h64) = (w as u64, h as u64);
  let (tw, th) = (target.width as u64, target.height as u64);
  if w64 * th >= h64 * tw {
    (target.width, ((h64 * tw) / w64).clamp(1, th) as u32)
  } else {
    (((w64 * th) / h64).clamp(1, tw) as u32, target.height)
  }
}

/// 短边贴合目标的缩放尺寸
fn covering_size(w: u32, h: u32, target: TargetSize) -> (u32, u32) {
  let (w64, h64) = (w as u64, h as u64);
  let (tw, th) = (target.width as u64, target.height as u64);
  if w64 * th >= h64 * tw {
    (((w64 * th) / h64).max(tw) as u32, target.height)
  } else {
    (target.width, ((h64 * tw) / w64).max(th) as u32)
  }
}

fn stretch(image: &RgbImage, target: TargetSize) -> RgbImage {
  imageops::resize(image, target.width, target.height, FILTER)
}

fn center_crop(image: &RgbImage, target: TargetSize) -> RgbImage {
  let (w, h) = image.dimensions();
  let (cw, ch) = centered_region(w, h, target);
  let cropped = imageops::crop_imm(image, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image();
  stretch(&cropped, target)
}

fn letterbox(image: &RgbImage, target: TargetSize, fill: u8) -> RgbImage {
  let (w, h) = image.dimensions();
  let (nw, nh) = fitted_size(w, h, target);
  let resized = imageops::resize(image, nw, nh, FILTER);
  let mut canvas = RgbImage::from_pixel(target.width, target.height, Rgb([fill; 3]));
  let x = (target.width - nw) / 2;
  let y = (target.height - nh) / 2;
  imageops::replace(&mut canvas, &resized, x as i64, y as i64);
  canvas
}

fn short_side_crop(image: &RgbImage, target: TargetSize) -> RgbImage {
  let (w, h) = image.dimensions();
  let (nw, nh) = covering_size(w, h, target);
  let resized = imageops::resize(image, nw, nh, FILTER);
  let left = (nw - target.width) / 2;
  let top = (nh - target.height) / 2;
  imageops::crop_imm(&resized, left, top, target.width, target.height).to_image()
}

#[cfg(test)]
mod tests {
  use super::*;

  const GRAY: [f32; 3] = [128.0, 128.0, 128.0];

  /// 每个像素取不同值的渐变图
  fn gradient(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
      Rgb([
        (x * 255 / w.max(1)) as u8,
        (y * 255 / h.max(1)) as u8,
        ((x + y) % 7 * 30) as u8,
      ])
    })
  }

  fn all_strategies() -> Vec<ResizeStrategy> {
    ResizeStrategy::MAIN
      .iter()
      .chain(ResizeStrategy::DIAGNOSTIC.iter())
      .copied()
      .collect()
  }

  #[test]
  fn output_shape_ignores_source_aspect_ratio() {
    let target = TargetSize::square(8);
    for (w, h) in [(10, 20), (20, 10), (7, 7), (1, 50), (64, 3)] {
      let image = gradient(w, h);
      for strategy in all_strategies() {
        let frame = strategy.apply(&image, target, 128);
        assert_eq!(frame.width(), 8, "{} on {}x{}", strategy.name(), w, h);
        assert_eq!(frame.height(), 8, "{} on {}x{}", strategy.name(), w, h);
        assert_eq!(frame.as_slice().len(), 8 * 8 * 3);
      }
    }
  }

  #[test]
  fn non_square_target_shape() {
    let target = TargetSize::new(6, 4);
    let image = gradient(13, 29);
    for strategy in all_strategies() {
      let frame = strategy.apply(&image, target, 128);
      assert_eq!((frame.width(), frame.height()), (6, 4));
    }
  }

  #[test]
  fn pixel_values_stay_in_byte_range() {
    let image = gradient(31, 17);
    for strategy in all_strategies() {
      let frame = strategy.apply(&image, TargetSize::square(9), 128);
      assert!(frame.min() >= 0.0 && frame.max() <= 255.0);
    }
  }

  #[test]
  fn crops_degenerate_to_plain_resize_on_square_input() {
    let image = gradient(16, 16);
    let target = TargetSize::square(5);
    let plain = ResizeStrategy::Stretch.apply(&image, target, 128);
    assert_eq!(ResizeStrategy::CenterCrop.apply(&image, target, 128), plain);
    assert_eq!(ResizeStrategy::ShortSideCrop.apply(&image, target, 128), plain);
  }

  #[test]
  fn letterbox_pads_with_gray_only_when_needed() {
    let red = RgbImage::from_pixel(10, 20, Rgb([255, 0, 0]));
    let frame = ResizeStrategy::Letterbox.apply(&red, TargetSize::square(4), 128);
    // 10x20 → 2x4，左右各一列填充
    assert_eq!(frame.pixel(0, 0), GRAY);
    assert_eq!(frame.pixel(3, 2), GRAY);
    assert_eq!(frame.pixel(1, 1), [255.0, 0.0, 0.0]);

    let wide = RgbImage::from_pixel(30, 10, Rgb([255, 0, 0]));
    let frame = ResizeStrategy::Letterbox.apply(&wide, TargetSize::square(6), 128);
    assert_eq!(frame.pixel(0, 0), GRAY);
    assert_eq!(frame.pixel(5, 5), GRAY);
    assert_eq!(frame.pixel(3, 3), [255.0, 0.0, 0.0]);

    let square = RgbImage::from_pixel(12, 12, Rgb([255, 0, 0]));
    let frame = ResizeStrategy::Letterbox.apply(&square, TargetSize::square(4), 128);
    for y in 0..4 {
      for x in 0..4 {
        assert_ne!(frame.pixel(x, y), GRAY);
      }
    }
  }

  #[test]
  fn letterbox_uses_configured_fill() {
    let image = RgbImage::from_pixel(4, 8, Rgb([0, 0, 0]));
    let frame = ResizeStrategy::Letterbox.apply(&image, TargetSize::square(4), 77);
    assert_eq!(frame.pixel(0, 0), [77.0, 77.0, 77.0]);
  }

  #[test]
  fn short_side_crop_keeps_center_content() {
    // 中间 20 列为绿色，两侧为蓝色
    let image = RgbImage::from_fn(60, 20, |x, _| {
      if (20..40).contains(&x) {
        Rgb([0, 255, 0])
      } else {
        Rgb([0, 0, 255])
      }
    });
    let frame = ResizeStrategy::ShortSideCrop.apply(&image, TargetSize::square(4), 128);
    assert_eq!(frame.pixel(2, 2), [0.0, 255.0, 0.0]);
    let frame = ResizeStrategy::CenterCrop.apply(&image, TargetSize::square(4), 128);
    assert_eq!(frame.pixel(2, 2), [0.0, 255.0, 0.0]);
  }

  #[test]
  fn strategies_are_deterministic() {
    let image = gradient(23, 41);
    for strategy in all_strategies() {
      let a = strategy.apply(&image, TargetSize::square(7), 128);
      let b = strategy.apply(&image, TargetSize::square(7), 128);
      assert_eq!(a, b);
    }
  }

  #[test]
  fn stretch_bgr_reverses_channels_of_stretch() {
    let image = gradient(9, 5);
    let target = TargetSize::square(3);
    let rgb = ResizeStrategy::Stretch.apply(&image, target, 128);
    let bgr = ResizeStrategy::StretchBgr.apply(&image, target, 128);
    assert_eq!(bgr, rgb.reverse_channels());
  }

  #[test]
  fn size_helpers() {
    let target = TargetSize::square(4);
    assert_eq!(centered_region(10, 20, target), (10, 10));
    assert_eq!(fitted_size(10, 20, target), (2, 4));
    assert_eq!(covering_size(10, 20, target), (4, 8));
    assert_eq!(covering_size(30, 10, target), (12, 4));
  }
}
