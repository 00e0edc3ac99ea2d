// 该文件是 Qingxi （清晰） 项目的一部分。
// src/model/clarity.rs - 清晰度分类流水线
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

use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  decide::{ClassificationResult, DecideError, decide},
  features::FeatureVector,
  frame::ImageFrame,
  grid::{PatchGrid, PatchOrigin},
  model::{Classifier, Model, ProbabilityPair},
  rejection::{Reject, RejectReason},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClarityError {
  #[error("{target_size}x{target_size} 图像中没有完整的 {patch_size}x{patch_size} 补丁")]
  EmptyFeatureSet { patch_size: u32, target_size: u32 },
  #[error("分类器返回 {actual} 组概率, 期望 {expected} 组")]
  ClassifierMismatch { expected: usize, actual: usize },
  #[error("聚合失败: {0}")]
  DecideError(#[from] DecideError),
}

impl Reject for ClarityError {
  fn reject_reason(&self) -> RejectReason {
    match self {
      ClarityError::EmptyFeatureSet { .. } | ClarityError::DecideError(_) => {
        RejectReason::NoScorablePatches
      }
      ClarityError::ClassifierMismatch { .. } => RejectReason::ClassifierMismatch,
    }
  }
}

/// 单个补丁的打分明细
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatchScore {
  pub x: u32,
  pub y: u32,
  pub size: u32,
  pub features: FeatureVector,
  pub probabilities: ProbabilityPair,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClarityReport {
  pub result: ClassificationResult,
  /// 补丁坐标所在的缩放后图像边长
  pub target_size: u32,
  /// 按行优先顺序排列
  pub patches: Vec<PatchScore>,
}

/// 补丁网格、分类器与聚合判定组成的完整流水线
///
/// 分类器由调用方加载后注入，流水线本身不持有可变状态。
pub struct ClarityModel<C> {
  grid: PatchGrid,
  classifier: C,
}

impl<C: Classifier> ClarityModel<C> {
  pub fn new(classifier: C) -> Self {
    Self {
      grid: PatchGrid::default(),
      classifier,
    }
  }

  pub fn with_grid(mut self, grid: PatchGrid) -> Self {
    self.grid = grid;
    self
  }

  pub fn grid(&self) -> &PatchGrid {
    &self.grid
  }

  pub fn classify(&self, image: &DynamicImage) -> Result<ClarityReport, ClarityError> {
    let patches = self.grid.decompose_with_origins(image);
    if patches.is_empty() {
      return Err(ClarityError::EmptyFeatureSet {
        patch_size: self.grid.patch_size(),
        target_size: self.grid.target_size(),
      });
    }

    let (origins, features): (Vec<PatchOrigin>, Vec<FeatureVector>) = patches.into_iter().unzip();
    let probs = self.classifier.predict_proba(&features);
    if probs.len() != features.len() {
      return Err(ClarityError::ClassifierMismatch {
        expected: features.len(),
        actual: probs.len(),
      });
    }
    debug!("补丁概率: {:?}", probs);

    let result = decide(&probs)?;
    info!(
      "判定结果: {} (P(清晰) = {:.4}, 补丁数 = {})",
      result.label, result.probabilities.clear, result.patch_count
    );

    let size = self.grid.patch_size();
    let patches = origins
      .into_iter()
      .zip(features)
      .zip(probs)
      .map(|((origin, features), probabilities)| PatchScore {
        x: origin.x,
        y: origin.y,
        size,
        features,
        probabilities,
      })
      .collect();

    Ok(ClarityReport {
      result,
      target_size: self.grid.target_size(),
      patches,
    })
  }
}

impl<C: Classifier> Model for ClarityModel<C> {
  type Input = ImageFrame;
  type Output = ClarityReport;
  type Error = ClarityError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("处理图像 {} ({}x{})", input.source, input.width(), input.height());
    self.classify(&input.image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decide::ClarityLabel;
  use image::{GrayImage, Luma};

  /// 对所有补丁给出同一组概率
  struct FixedClassifier(ProbabilityPair);

  impl Classifier for FixedClassifier {
    fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
      vec![self.0; features.len()]
    }
  }

  /// 边缘越多越清晰
  struct EdgeClassifier;

  impl Classifier for EdgeClassifier {
    fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
      features
        .iter()
        .map(|f| ProbabilityPair::from_clear(if f.edge_density > 0.0 { 0.9 } else { 0.2 }))
        .collect()
    }
  }

  struct DroppingClassifier;

  impl Classifier for DroppingClassifier {
    fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
      vec![ProbabilityPair::from_clear(0.5); features.len().saturating_sub(1)]
    }
  }

  fn mid_gray() -> ImageFrame {
    ImageFrame::from(GrayImage::from_pixel(64, 64, Luma([128])))
  }

  #[test]
  fn uniform_gray_keeps_the_patch_probability() {
    let pair = ProbabilityPair::new(0.35, 0.65);
    let model = ClarityModel::new(FixedClassifier(pair));
    let report = model.infer(&mid_gray()).unwrap();

    assert_eq!(report.result.patch_count, 64);
    assert_eq!(report.patches.len(), 64);
    assert!((report.result.probabilities.clear - 0.65).abs() < 1e-12);
    assert!((report.result.probabilities.not_clear - 0.35).abs() < 1e-12);
    assert_eq!(report.result.label, ClarityLabel::Clear);
    for patch in &report.patches {
      assert_eq!(patch.features.lap_var, 0.0);
      assert_eq!(patch.features.edge_density, 0.0);
      assert!(patch.features.contrast.abs() < 1e-9);
    }
  }

  #[test]
  fn checkerboard_is_clear_and_flat_is_not() {
    let model = ClarityModel::new(EdgeClassifier);
    let board = GrayImage::from_fn(64, 64, |x, y| {
      Luma([if ((x / 4) + (y / 4)) % 2 == 0 { 20 } else { 230 }])
    });
    let report = model.infer(&ImageFrame::from(board)).unwrap();
    assert_eq!(report.result.label, ClarityLabel::Clear);

    let report = model.infer(&mid_gray()).unwrap();
    assert_eq!(report.result.label, ClarityLabel::NotClear);
  }

  #[test]
  fn oversized_patches_are_rejected() {
    let model = ClarityModel::new(FixedClassifier(ProbabilityPair::from_clear(0.9)))
      .with_grid(PatchGrid::new(128, 64).unwrap());
    let err = model.infer(&mid_gray()).unwrap_err();
    assert_eq!(
      err,
      ClarityError::EmptyFeatureSet {
        patch_size: 128,
        target_size: 64
      }
    );
    assert_eq!(err.reject_reason(), RejectReason::NoScorablePatches);
  }

  #[test]
  fn short_classifier_output_is_rejected() {
    let model = ClarityModel::new(DroppingClassifier);
    let err = model.infer(&mid_gray()).unwrap_err();
    assert_eq!(
      err,
      ClarityError::ClassifierMismatch {
        expected: 64,
        actual: 63
      }
    );
    assert_eq!(err.reject_reason(), RejectReason::ClassifierMismatch);
  }

  #[test]
  fn shared_classifier_serves_several_pipelines() {
    let classifier = std::sync::Arc::new(FixedClassifier(ProbabilityPair::from_clear(0.1)));
    let a = ClarityModel::new(classifier.clone());
    let b = ClarityModel::new(classifier).with_grid(PatchGrid::new(16, 64).unwrap());
    assert_eq!(a.infer(&mid_gray()).unwrap().result.patch_count, 64);
    assert_eq!(b.infer(&mid_gray()).unwrap().result.patch_count, 16);
    assert_eq!(b.grid().patch_size(), 16);
    assert_eq!(b.grid().patch_capacity(), 16);
  }
}
