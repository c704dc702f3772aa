// 该文件是 Preprobe （预处理探针） 项目的一部分。
// src/model/tflite.rs - TFLite 推理后端
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
use tracing::{debug, error, info};
use tract_core::prelude::*;
use tract_tflite::Tflite;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{
    InferenceError, InputTensor, Model, ModelSpec, QuantParams, TensorData, TensorKind,
  },
};

const TFLITE_NUM_INPUTS: usize = 1;
const TFLITE_NUM_OUTPUTS: usize = 1;

#[derive(Error, Debug)]
pub enum TfliteModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("不支持的张量类型: {0}")]
  UnsupportedDatumType(String),
  #[error("tract 错误: {0}")]
  TractError(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<TractError> for TfliteModelError {
  fn from(err: TractError) -> Self {
    TfliteModelError::TractError(err.into())
  }
}

/// TFLite 后端配置，启动时确定一次
#[derive(Debug, Clone)]
pub struct TfliteModelBuilder {
  model_path: String,
  optimize: bool,
}

impl FromUrlWithScheme for TfliteModelBuilder {
  const SCHEME: &'static str = "tflite";
}

impl FromUrl for TfliteModelBuilder {
  type Error = TfliteModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TfliteModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }
    if url.path().is_empty() {
      return Err(TfliteModelError::ModelPathError("模型路径为空".to_string()));
    }

    let mut builder = TfliteModelBuilder {
      model_path: url.path().to_string(),
      optimize: true,
    };
    for (k, v) in url.query_pairs() {
      if k == "optimize" {
        builder.optimize = v != "false" && v != "0";
      }
    }
    Ok(builder)
  }
}

impl TfliteModelBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      optimize: true,
    }
  }

  pub fn optimize(mut self, optimize: bool) -> Self {
    self.optimize = optimize;
    self
  }

  pub fn model_path(&self) -> &str {
    &self.model_path
  }

  pub fn build(self) -> Result<TfliteModel, TfliteModelError> {
    info!("加载模型文件: {}", self.model_path);
    let mut file = std::fs::File::open(&self.model_path)?;
    if let Ok(meta) = file.metadata() {
      debug!(
        "模型文件大小: {:.2} MB",
        meta.len() as f64 / (1024.0 * 1024.0)
      );
    }

    let tflite = Tflite::default();
    let proto = tflite.proto_model_for_read(&mut file)?;
    let model = tflite.model_for_proto_model(&proto)?;
    info!("模型解析完成: {} 个节点", model.nodes().len());

    if model.inputs.len() != TFLITE_NUM_INPUTS || model.outputs.len() != TFLITE_NUM_OUTPUTS {
      error!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        TFLITE_NUM_INPUTS,
        TFLITE_NUM_OUTPUTS,
        model.inputs.len(),
        model.outputs.len()
      );
      return Err(TfliteModelError::ModelInvalid(format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        TFLITE_NUM_INPUTS,
        TFLITE_NUM_OUTPUTS,
        model.inputs.len(),
        model.outputs.len()
      )));
    }

    let input_fact = model.input_fact(0)?.clone();
    let output_fact = model.output_fact(0)?.clone();
    debug!("输入张量: {:?}", input_fact);
    debug!("输出张量: {:?}", output_fact);
    let spec = spec_from_facts(&input_fact, &output_fact)?;

    let model = if self.optimize {
      debug!("优化模型");
      model.into_optimized()?
    } else {
      model
    };
    let plan = model.into_runnable()?;
    info!("模型加载完成");

    Ok(TfliteModel {
      plan,
      input_datum_type: input_fact.datum_type,
      spec,
    })
  }
}

pub struct TfliteModel {
  plan: TypedRunnableModel<TypedModel>,
  input_datum_type: DatumType,
  spec: ModelSpec,
}

impl TfliteModel {
  fn to_tract_tensor(&self, input: &InputTensor) -> TractResult<Tensor> {
    let shape = input.shape();
    let tensor = match input.data() {
      TensorData::UInt8(d) => Tensor::from_shape(&shape, &d[..])?,
      TensorData::Int8(d) => Tensor::from_shape(&shape, &d[..])?,
      TensorData::Float32(d) => Tensor::from_shape(&shape, &d[..])?,
    };
    if self.input_datum_type.is_quantized() {
      Ok(tensor.cast_to_dt(self.input_datum_type)?.into_owned())
    } else {
      Ok(tensor)
    }
  }
}

impl Model for TfliteModel {
  fn spec(&self) -> &ModelSpec {
    &self.spec
  }

  fn backend(&self) -> &'static str {
    "tflite (tract)"
  }

  fn infer(&self, input: &InputTensor) -> Result<Box<[f32]>, InferenceError> {
    self.check_input(input)?;

    let tensor = self.to_tract_tensor(input).map_err(InferenceError::backend)?;
    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(InferenceError::backend)?;

    let output = outputs
      .into_iter()
      .next()
      .ok_or(InferenceError::OutputLength {
        expected: self.spec.num_classes,
        actual: 0,
      })?
      .into_tensor();
    let values = raw_output_values(output).map_err(InferenceError::backend)?;
    if values.len() != self.spec.num_classes {
      return Err(InferenceError::OutputLength {
        expected: self.spec.num_classes,
        actual: values.len(),
      });
    }
    Ok(values)
  }
}

/// 按模型输出的原始数值转为 f32，量化类型不做反量化
fn raw_output_values(mut output: Tensor) -> TractResult<Box<[f32]>> {
  let dt = output.datum_type();
  if dt.is_quantized() {
    // 量化类型与对应整数类型的内存布局相同
    unsafe { output.set_datum_type(dt.unquantized()) };
  }
  let values = output.cast_to::<f32>()?;
  Ok(values.as_slice::<f32>()?.into())
}

fn tensor_kind(dt: DatumType) -> Result<TensorKind, TfliteModelError> {
  match dt.unquantized() {
    DatumType::U8 => Ok(TensorKind::UInt8),
    DatumType::I8 => Ok(TensorKind::Int8),
    DatumType::F32 => Ok(TensorKind::Float32),
    other => Err(TfliteModelError::UnsupportedDatumType(format!("{:?}", other))),
  }
}

fn quant_params(dt: DatumType) -> QuantParams {
  if dt.is_quantized() {
    let (zp, scale) = dt.zp_scale();
    QuantParams::new(scale, zp)
  } else {
    QuantParams::default()
  }
}

fn concrete_dims(fact: &TypedFact, what: &str) -> Result<Vec<usize>, TfliteModelError> {
  fact
    .shape
    .as_concrete()
    .map(|dims| dims.to_vec())
    .ok_or_else(|| TfliteModelError::ModelInvalid(format!("{}形状不是定值: {:?}", what, fact.shape)))
}

fn spec_from_facts(input: &TypedFact, output: &TypedFact) -> Result<ModelSpec, TfliteModelError> {
  let in_dims = concrete_dims(input, "输入")?;
  let [batch, height, width, channels] = in_dims[..] else {
    return Err(TfliteModelError::ModelInvalid(format!(
      "输入应为 NHWC 四维, 实际为 {:?}",
      in_dims
    )));
  };
  if batch != 1 || channels != 3 || height == 0 || width == 0 {
    return Err(TfliteModelError::ModelInvalid(format!(
      "输入应为 [1,H,W,3], 实际为 {:?}",
      in_dims
    )));
  }

  let out_dims = concrete_dims(output, "输出")?;
  let num_classes: usize = match out_dims.split_first() {
    Some((&1, rest)) if !rest.is_empty() => rest.iter().product(),
    _ => out_dims.iter().product(),
  };
  if num_classes == 0 {
    return Err(TfliteModelError::ModelInvalid(format!(
      "输出长度为 0: {:?}",
      out_dims
    )));
  }

  Ok(ModelSpec {
    height,
    width,
    channels,
    input_kind: tensor_kind(input.datum_type)?,
    input_quant: quant_params(input.datum_type),
    output_kind: tensor_kind(output.datum_type)?,
    output_quant: quant_params(output.datum_type),
    num_classes,
  })
}
