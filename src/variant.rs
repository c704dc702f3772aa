// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/variant.rs - 候选预处理组合
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

use crate::strategy::{NormalizeStrategy, ResizeStrategy, Strategy};

/// 一个候选: (缩放策略, 归一化策略)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
  pub resize: ResizeStrategy,
  pub normalize: NormalizeStrategy,
  name: String,
}

impl Variant {
  pub fn new(resize: ResizeStrategy, normalize: NormalizeStrategy) -> Self {
    let name = format!("{} | {}", resize.name(), normalize.name());
    Self {
      resize,
      normalize,
      name,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl std::fmt::Display for Variant {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.name)
  }
}

/// 按定义顺序生成全部候选
///
/// 主缩放策略与归一化策略做笛卡尔积，诊断缩放策略的组合追加在末尾。
pub fn generate(
  resizes: &[ResizeStrategy],
  diagnostics: &[ResizeStrategy],
  normalizes: &[NormalizeStrategy],
) -> Vec<Variant> {
  resizes
    .iter()
    .chain(diagnostics)
    .flat_map(|&resize| {
      normalizes
        .iter()
        .map(move |&normalize| Variant::new(resize, normalize))
    })
    .collect()
}

/// 默认候选集: 4 × 4 + 4
pub fn standard() -> Vec<Variant> {
  generate(
    &ResizeStrategy::MAIN,
    &ResizeStrategy::DIAGNOSTIC,
    &NormalizeStrategy::ALL,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn standard_set_size() {
    let variants = standard();
    assert_eq!(variants.len(), 4 * 4 + 4);
  }

  #[test]
  fn order_follows_definitions() {
    let variants = standard();
    assert_eq!(variants[0].name(), "stretch | raw [0,255]");
    assert_eq!(variants[1].name(), "stretch | ÷127.5−1 [-1,1]");
    assert_eq!(variants[4].resize, ResizeStrategy::CenterCrop);
    assert_eq!(variants[15].name(), "short-side | ImageNet mean-std");
    assert!(
      variants[16..]
        .iter()
        .all(|v| v.resize == ResizeStrategy::StretchBgr)
    );
    assert_eq!(variants, standard());
  }

  #[test]
  fn names_are_unique() {
    let variants = standard();
    let mut names: Vec<_> = variants.iter().map(Variant::name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), variants.len());
  }

  #[test]
  fn custom_sets() {
    let variants = generate(
      &[ResizeStrategy::Letterbox],
      &[],
      &[NormalizeStrategy::Unit, NormalizeStrategy::Raw],
    );
    let names: Vec<_> = variants.iter().map(|v| v.to_string()).collect();
    assert_eq!(names, ["letterbox | ÷255 [0,1]", "letterbox | raw [0,255]"]);
  }
}
