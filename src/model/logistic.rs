// 该文件是 Qingxi （清晰） 项目的一部分。
// src/model/logistic.rs - 逻辑回归模型
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  features::FeatureVector,
  model::{Classifier, ProbabilityPair, sigmoid},
};

const DIM: usize = FeatureVector::DIM;

#[derive(Error, Debug)]
pub enum LogisticError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("{field} 长度应为 3, 实际为 {actual}")]
  ShapeMismatch { field: &'static str, actual: usize },
  #[error("scale 第 {0} 项必须为正数")]
  InvalidScale(usize),
}

#[derive(Debug, Deserialize)]
struct LogisticFile {
  weights: Vec<f64>,
  intercept: f64,
  #[serde(default)]
  mean: Option<Vec<f64>>,
  #[serde(default)]
  scale: Option<Vec<f64>>,
}

/// 逻辑回归分类器，可选先做标准化 `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticClassifier {
  weights: [f64; DIM],
  intercept: f64,
  mean: [f64; DIM],
  scale: [f64; DIM],
}

impl FromUrlWithScheme for LogisticClassifier {
  const SCHEME: &'static str = "logistic";
}

impl FromUrl for LogisticClassifier {
  type Error = LogisticError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogisticError::SchemeMismatch(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::from_path(url.path())
  }
}

fn to_array(field: &'static str, values: Vec<f64>) -> Result<[f64; DIM], LogisticError> {
  let actual = values.len();
  values
    .try_into()
    .map_err(|_| LogisticError::ShapeMismatch { field, actual })
}

impl LogisticClassifier {
  pub fn new(weights: [f64; DIM], intercept: f64) -> Self {
    Self {
      weights,
      intercept,
      mean: [0.0; DIM],
      scale: [1.0; DIM],
    }
  }

  pub fn with_standardization(
    mut self,
    mean: [f64; DIM],
    scale: [f64; DIM],
  ) -> Result<Self, LogisticError> {
    if let Some(i) = scale.iter().position(|s| !(*s > 0.0)) {
      return Err(LogisticError::InvalidScale(i));
    }
    self.mean = mean;
    self.scale = scale;
    Ok(self)
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LogisticError> {
    let path = path.as_ref();
    info!("加载逻辑回归模型: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json_str(&text)
  }

  pub fn from_json_str(text: &str) -> Result<Self, LogisticError> {
    let file: LogisticFile = serde_json::from_str(text)?;
    let model = Self::new(to_array("weights", file.weights)?, file.intercept);
    let mean = file.mean.map(|m| to_array("mean", m)).transpose()?;
    let scale = file.scale.map(|s| to_array("scale", s)).transpose()?;
    match (mean, scale) {
      (None, None) => Ok(model),
      (mean, scale) => {
        model.with_standardization(mean.unwrap_or([0.0; DIM]), scale.unwrap_or([1.0; DIM]))
      }
    }
  }

  pub fn decision(&self, features: &FeatureVector) -> f64 {
    let x = features.as_array();
    (0..DIM)
      .map(|i| self.weights[i] * (x[i] - self.mean[i]) / self.scale[i])
      .sum::<f64>()
      + self.intercept
  }
}

impl Classifier for LogisticClassifier {
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
    features
      .iter()
      .map(|f| ProbabilityPair::from_clear(sigmoid(self.decision(f))))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_model_is_undecided() {
    let model = LogisticClassifier::new([0.0; DIM], 0.0);
    let p = model.predict_proba(&[FeatureVector::new(123.0, 0.4, 0.9)]);
    assert_eq!(p[0], ProbabilityPair::new(0.5, 0.5));
  }

  #[test]
  fn standardization_is_applied() {
    let model = LogisticClassifier::from_json_str(
      r#"{ "weights": [1.0, 0.0, 0.0], "intercept": 0.5,
           "mean": [100.0, 0.0, 0.0], "scale": [50.0, 1.0, 1.0] }"#,
    )
    .unwrap();
    let features = FeatureVector::new(200.0, 0.0, 0.0);
    assert!((model.decision(&features) - 2.5).abs() < 1e-12);
  }

  #[test]
  fn sharper_patches_score_higher() {
    let model = LogisticClassifier::new([0.01, 5.0, 1.0], -2.0);
    let probs = model.predict_proba(&[
      FeatureVector::new(0.0, 0.0, 0.0),
      FeatureVector::new(400.0, 0.3, 0.5),
    ]);
    assert!(probs[0].clear < 0.5);
    assert!(probs[1].clear > 0.5);
  }

  #[test]
  fn rejects_wrong_shapes() {
    assert!(matches!(
      LogisticClassifier::from_json_str(r#"{ "weights": [1.0, 2.0], "intercept": 0.0 }"#),
      Err(LogisticError::ShapeMismatch { field: "weights", actual: 2 })
    ));
    assert!(matches!(
      LogisticClassifier::from_json_str(
        r#"{ "weights": [1.0, 2.0, 3.0], "intercept": 0.0, "scale": [1.0, 0.0, 1.0] }"#
      ),
      Err(LogisticError::InvalidScale(1))
    ));
  }
}
