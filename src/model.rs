// 该文件是 Qingxi （清晰） 项目的一部分。
// src/model.rs - 模型
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

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, features::FeatureVector};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 一对类别概率 `(P(不清晰), P(清晰))`，两者非负且和为 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityPair {
  pub not_clear: f64,
  pub clear: f64,
}

impl ProbabilityPair {
  pub fn new(not_clear: f64, clear: f64) -> Self {
    Self { not_clear, clear }
  }

  pub fn from_clear(clear: f64) -> Self {
    Self {
      not_clear: 1.0 - clear,
      clear,
    }
  }

  /// 按类别编号排列：`[P(0), P(1)]`
  pub fn as_array(&self) -> [f64; 2] {
    [self.not_clear, self.clear]
  }
}

/// 预训练的二分类概率模型
///
/// 进程启动时加载一次，之后只读使用，可在多个线程间共享。
pub trait Classifier: Send + Sync {
  /// 对每个特征向量给出一对概率，顺序与输入一致
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
    (**self).predict_proba(features)
  }
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
    (**self).predict_proba(features)
  }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
    (**self).predict_proba(features)
  }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
  1.0 / (1.0 + (-x).exp())
}

mod clarity;
pub use self::clarity::{ClarityError, ClarityModel, ClarityReport, PatchScore};

#[cfg(not(any(feature = "model_xgboost", feature = "model_logistic")))]
compile_error!("至少需要启用 `model_xgboost` 或 `model_logistic` 特性之一");

#[cfg(feature = "model_xgboost")]
mod xgboost;
#[cfg(feature = "model_xgboost")]
pub use self::xgboost::{XgboostClassifier, XgboostError};

#[cfg(feature = "model_logistic")]
mod logistic;
#[cfg(feature = "model_logistic")]
pub use self::logistic::{LogisticClassifier, LogisticError};

#[derive(Error, Debug)]
pub enum ModelError {
  #[cfg(feature = "model_xgboost")]
  #[error("XGBoost 模型错误: {0}")]
  XgboostError(#[from] XgboostError),
  #[cfg(feature = "model_logistic")]
  #[error("逻辑回归模型错误: {0}")]
  LogisticError(#[from] LogisticError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum ClassifierWrapper {
  #[cfg(feature = "model_xgboost")]
  Xgboost(XgboostClassifier),
  #[cfg(feature = "model_logistic")]
  Logistic(LogisticClassifier),
}

impl FromUrl for ClassifierWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "model_xgboost")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == XgboostClassifier::SCHEME {
        return Ok(ClassifierWrapper::Xgboost(XgboostClassifier::from_url(url)?));
      }
    }
    #[cfg(feature = "model_logistic")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == LogisticClassifier::SCHEME {
        return Ok(ClassifierWrapper::Logistic(LogisticClassifier::from_url(url)?));
      }
    }
    Err(ModelError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Classifier for ClassifierWrapper {
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
    match self {
      #[cfg(feature = "model_xgboost")]
      ClassifierWrapper::Xgboost(classifier) => classifier.predict_proba(features),
      #[cfg(feature = "model_logistic")]
      ClassifierWrapper::Logistic(classifier) => classifier.predict_proba(features),
    }
  }
}
