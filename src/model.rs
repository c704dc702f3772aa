// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/model.rs - 模型接口
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

use serde::Serialize;
use thiserror::Error;

use crate::frame::RgbF32Frame;
use crate::strategy::TargetSize;

/// 张量元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TensorKind {
  UInt8,
  Int8,
  Float32,
}

impl std::fmt::Display for TensorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      TensorKind::UInt8 => "uint8",
      TensorKind::Int8 => "int8",
      TensorKind::Float32 => "float32",
    })
  }
}

/// 量化参数，scale 为 0 表示未量化
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QuantParams {
  pub scale: f32,
  pub zero_point: i32,
}

impl QuantParams {
  pub fn new(scale: f32, zero_point: i32) -> Self {
    Self { scale, zero_point }
  }

  pub fn is_quantized(&self) -> bool {
    self.scale != 0.0
  }

  pub fn dequantize(&self, q: i32) -> f32 {
    (q - self.zero_point) as f32 * self.scale
  }
}

/// 模型输入输出描述，加载后不再改变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
  pub height: usize,
  pub width: usize,
  pub channels: usize,
  pub input_kind: TensorKind,
  pub input_quant: QuantParams,
  pub output_kind: TensorKind,
  pub output_quant: QuantParams,
  pub num_classes: usize,
}

impl ModelSpec {
  pub fn input_shape(&self) -> [usize; 4] {
    [1, self.height, self.width, self.channels]
  }

  pub fn target_size(&self) -> TargetSize {
    TargetSize::new(self.width as u32, self.height as u32)
  }

  /// 根据输入类型与量化参数推断模型期望的输入范围
  pub fn input_range_hint(&self) -> InputRangeHint {
    let q = self.input_quant;
    match self.input_kind {
      TensorKind::UInt8 => InputRangeHint::Bytes,
      TensorKind::Int8 => InputRangeHint::SignedQuantized {
        min: q.dequantize(-128),
        max: q.dequantize(127),
      },
      TensorKind::Float32 if q.is_quantized() => InputRangeHint::FloatScaled {
        min: q.dequantize(0),
        max: q.dequantize(255),
      },
      TensorKind::Float32 => InputRangeHint::FloatUnspecified,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum InputRangeHint {
  /// 直接输入 [0,255] 字节
  Bytes,
  /// int8 输入对应的实数范围
  SignedQuantized { min: f32, max: f32 },
  /// float32 输入，量化参数给出的范围
  FloatScaled { min: f32, max: f32 },
  /// float32 且无量化参数，预处理可能内置于模型，或期望原始 [0,255]
  FloatUnspecified,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
  UInt8(Box<[u8]>),
  Int8(Box<[i8]>),
  Float32(Box<[f32]>),
}

impl TensorData {
  pub fn kind(&self) -> TensorKind {
    match self {
      TensorData::UInt8(_) => TensorKind::UInt8,
      TensorData::Int8(_) => TensorKind::Int8,
      TensorData::Float32(_) => TensorKind::Float32,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      TensorData::UInt8(d) => d.len(),
      TensorData::Int8(d) => d.len(),
      TensorData::Float32(d) => d.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// NHWC 批大小为 1 的模型输入
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
  shape: [usize; 4],
  data: TensorData,
}

impl InputTensor {
  /// 按模型声明的元素类型转换，整数类型向零截断并饱和
  pub fn from_frame(frame: &RgbF32Frame, kind: TensorKind) -> Self {
    let values = frame.as_slice();
    let data = match kind {
      TensorKind::UInt8 => TensorData::UInt8(values.iter().map(|&v| v as u8).collect()),
      TensorKind::Int8 => TensorData::Int8(values.iter().map(|&v| v as i8).collect()),
      TensorKind::Float32 => TensorData::Float32(values.into()),
    };
    Self {
      shape: [1, frame.height(), frame.width(), frame.channels()],
      data,
    }
  }

  pub fn shape(&self) -> [usize; 4] {
    self.shape
  }

  pub fn data(&self) -> &TensorData {
    &self.data
  }

  pub fn kind(&self) -> TensorKind {
    self.data.kind()
  }
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("输入形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  ShapeMismatch {
    expected: [usize; 4],
    actual: [usize; 4],
  },
  #[error("输入类型不匹配: 期望 {expected}, 实际 {actual}")]
  KindMismatch {
    expected: TensorKind,
    actual: TensorKind,
  },
  #[error("输出长度不匹配: 期望 {expected}, 实际 {actual}")]
  OutputLength { expected: usize, actual: usize },
  #[error("输出包含非有限值")]
  NonFiniteOutput,
  #[error("推理后端错误: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl InferenceError {
  pub fn backend(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    InferenceError::Backend(e.into())
  }
}

/// 单输入单输出分类模型
///
/// `infer` 在输入形状错误或后端失败时返回 [`InferenceError`]，不允许 panic。
pub trait Model {
  fn spec(&self) -> &ModelSpec;

  fn infer(&self, input: &InputTensor) -> Result<Box<[f32]>, InferenceError>;

  /// 后端名称，仅用于报告
  fn backend(&self) -> &'static str {
    "custom"
  }

  fn shape(&self) -> (usize, usize, usize) {
    let spec = self.spec();
    (spec.height, spec.width, spec.channels)
  }

  fn input_kind(&self) -> TensorKind {
    self.spec().input_kind
  }

  fn input_quant(&self) -> QuantParams {
    self.spec().input_quant
  }

  fn output_quant(&self) -> QuantParams {
    self.spec().output_quant
  }

  fn num_classes(&self) -> usize {
    self.spec().num_classes
  }

  /// 校验输入与模型声明一致
  fn check_input(&self, input: &InputTensor) -> Result<(), InferenceError> {
    let spec = self.spec();
    let expected = spec.input_shape();
    let expected_len: usize = expected.iter().product();
    if input.shape() != expected || input.data().len() != expected_len {
      return Err(InferenceError::ShapeMismatch {
        expected,
        actual: input.shape(),
      });
    }
    if input.kind() != spec.input_kind {
      return Err(InferenceError::KindMismatch {
        expected: spec.input_kind,
        actual: input.kind(),
      });
    }
    Ok(())
  }
}

impl<M: Model + ?Sized> Model for &M {
  fn spec(&self) -> &ModelSpec {
    (**self).spec()
  }

  fn infer(&self, input: &InputTensor) -> Result<Box<[f32]>, InferenceError> {
    (**self).infer(input)
  }

  fn backend(&self) -> &'static str {
    (**self).backend()
  }
}

#[cfg(feature = "model_tflite")]
mod tflite;
#[cfg(feature = "model_tflite")]
pub use self::tflite::{TfliteModel, TfliteModelBuilder, TfliteModelError};

#[cfg(test)]
mod tests {
  use super::*;

  fn spec(kind: TensorKind, quant: QuantParams) -> ModelSpec {
    ModelSpec {
      height: 2,
      width: 2,
      channels: 3,
      input_kind: kind,
      input_quant: quant,
      output_kind: TensorKind::Float32,
      output_quant: QuantParams::default(),
      num_classes: 4,
    }
  }

  struct Fixed(ModelSpec);

  impl Model for Fixed {
    fn spec(&self) -> &ModelSpec {
      &self.0
    }

    fn infer(&self, input: &InputTensor) -> Result<Box<[f32]>, InferenceError> {
      self.check_input(input)?;
      Ok(vec![0.0; self.0.num_classes].into_boxed_slice())
    }
  }

  #[test]
  fn cast_truncates_and_saturates() {
    let frame = RgbF32Frame::from_vec(1, 1, vec![-3.7, 127.9, 300.0]).unwrap();
    let t = InputTensor::from_frame(&frame, TensorKind::UInt8);
    assert_eq!(t.data(), &TensorData::UInt8(vec![0, 127, 255].into()));
    let t = InputTensor::from_frame(&frame, TensorKind::Int8);
    assert_eq!(t.data(), &TensorData::Int8(vec![-3, 127, 127].into()));
    let t = InputTensor::from_frame(&frame, TensorKind::Float32);
    assert_eq!(t.data(), &TensorData::Float32(vec![-3.7, 127.9, 300.0].into()));
    assert_eq!(t.shape(), [1, 1, 1, 3]);
  }

  #[test]
  fn check_input_rejects_wrong_shape_and_kind() {
    let model = Fixed(spec(TensorKind::UInt8, QuantParams::default()));
    let ok = RgbF32Frame::from_vec(2, 2, vec![0.0; 12]).unwrap();
    let bad = RgbF32Frame::from_vec(1, 2, vec![0.0; 6]).unwrap();

    let input = InputTensor::from_frame(&ok, TensorKind::UInt8);
    assert!(model.infer(&input).is_ok());

    let input = InputTensor::from_frame(&bad, TensorKind::UInt8);
    assert!(matches!(
      model.infer(&input),
      Err(InferenceError::ShapeMismatch { .. })
    ));

    let input = InputTensor::from_frame(&ok, TensorKind::Float32);
    assert!(matches!(
      model.infer(&input),
      Err(InferenceError::KindMismatch {
        expected: TensorKind::UInt8,
        actual: TensorKind::Float32
      })
    ));
  }

  #[test]
  fn interface_accessors_read_spec() {
    let model = Fixed(spec(TensorKind::Int8, QuantParams::new(0.5, -1)));
    assert_eq!(model.shape(), (2, 2, 3));
    assert_eq!(model.input_kind(), TensorKind::Int8);
    assert_eq!(model.input_quant(), QuantParams::new(0.5, -1));
    assert!(!model.output_quant().is_quantized());
    assert_eq!(model.num_classes(), 4);
    assert_eq!(model.spec().target_size(), TargetSize::new(2, 2));
  }

  #[test]
  fn input_range_hints() {
    assert_eq!(
      spec(TensorKind::UInt8, QuantParams::default()).input_range_hint(),
      InputRangeHint::Bytes
    );
    assert_eq!(
      spec(TensorKind::Int8, QuantParams::new(0.5, -128)).input_range_hint(),
      InputRangeHint::SignedQuantized {
        min: 0.0,
        max: 127.5
      }
    );
    assert_eq!(
      spec(TensorKind::Float32, QuantParams::new(0.5, 0)).input_range_hint(),
      InputRangeHint::FloatScaled {
        min: 0.0,
        max: 127.5
      }
    );
    assert_eq!(
      spec(TensorKind::Float32, QuantParams::default()).input_range_hint(),
      InputRangeHint::FloatUnspecified
    );
  }
}
