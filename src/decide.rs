// 该文件是 Qingxi （清晰） 项目的一部分。
// src/decide.rs - 概率聚合与判定
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

use crate::model::ProbabilityPair;

/// 整图清晰度标签，数值与模型训练时的类别编号一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarityLabel {
  NotClear = 0,
  Clear = 1,
}

impl ClarityLabel {
  pub fn id(self) -> u8 {
    self as u8
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ClarityLabel::NotClear => "not_clear",
      ClarityLabel::Clear => "clear",
    }
  }
}

impl std::fmt::Display for ClarityLabel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ClarityLabel::NotClear => write!(f, "不清晰"),
      ClarityLabel::Clear => write!(f, "清晰"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult {
  pub label: ClarityLabel,
  /// 各补丁概率的逐分量均值
  pub probabilities: ProbabilityPair,
  pub patch_count: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecideError {
  #[error("没有可聚合的补丁概率")]
  Empty,
}

/// 对补丁概率取均值并按 arg-max 给出标签
///
/// 均值相等时取 `NotClear`。输入为空时返回错误，不会给出默认标签。
pub fn decide(probs: &[ProbabilityPair]) -> Result<ClassificationResult, DecideError> {
  if probs.is_empty() {
    return Err(DecideError::Empty);
  }

  let mean = ProbabilityPair::new(
    order_free_mean(probs.iter().map(|p| p.not_clear)),
    order_free_mean(probs.iter().map(|p| p.clear)),
  );

  let label = if mean.clear > mean.not_clear {
    ClarityLabel::Clear
  } else {
    ClarityLabel::NotClear
  };

  Ok(ClassificationResult {
    label,
    probabilities: mean,
    patch_count: probs.len(),
  })
}

/// 按值排序后求和，结果与补丁顺序无关
fn order_free_mean(values: impl Iterator<Item = f64>) -> f64 {
  let mut values: Vec<f64> = values.collect();
  values.sort_by(|a, b| a.total_cmp(b));
  values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Vec<ProbabilityPair> {
    [0.91, 0.13, 0.5, 0.77, 0.0314, 0.66, 0.2, 0.999]
      .into_iter()
      .map(ProbabilityPair::from_clear)
      .collect()
  }

  #[test]
  fn empty_sequence_is_rejected() {
    assert_eq!(decide(&[]), Err(DecideError::Empty));
  }

  #[test]
  fn identical_pairs_reduce_to_themselves() {
    let pair = ProbabilityPair::new(0.3, 0.7);
    let result = decide(&vec![pair; 64]).unwrap();
    assert_eq!(result.patch_count, 64);
    assert!((result.probabilities.not_clear - 0.3).abs() < 1e-12);
    assert!((result.probabilities.clear - 0.7).abs() < 1e-12);
    assert_eq!(result.label, ClarityLabel::Clear);
  }

  #[test]
  fn permutation_does_not_change_the_result() {
    let probs = sample();
    let expected = decide(&probs).unwrap();

    let mut reversed = probs.clone();
    reversed.reverse();
    assert_eq!(decide(&reversed).unwrap(), expected);

    let mut rotated = probs.clone();
    rotated.rotate_left(3);
    assert_eq!(decide(&rotated).unwrap(), expected);

    let mut swapped = probs;
    swapped.swap(0, 5);
    swapped.swap(2, 7);
    assert_eq!(decide(&swapped).unwrap(), expected);
  }

  #[test]
  fn mean_is_a_distribution_and_label_is_its_argmax() {
    let result = decide(&sample()).unwrap();
    let p = result.probabilities;
    assert!((p.not_clear + p.clear - 1.0).abs() < 1e-9);
    let expected = if p.clear > p.not_clear {
      ClarityLabel::Clear
    } else {
      ClarityLabel::NotClear
    };
    assert_eq!(result.label, expected);
    assert_eq!(result.patch_count, 8);
  }

  #[test]
  fn tie_resolves_to_not_clear() {
    let result = decide(&[ProbabilityPair::new(0.5, 0.5)]).unwrap();
    assert_eq!(result.label, ClarityLabel::NotClear);

    let result = decide(&[
      ProbabilityPair::from_clear(0.25),
      ProbabilityPair::from_clear(0.75),
    ])
    .unwrap();
    assert_eq!(result.label, ClarityLabel::NotClear);
  }

  #[test]
  fn majority_of_blurry_patches_wins() {
    let mut probs = vec![ProbabilityPair::from_clear(0.1); 40];
    probs.extend(vec![ProbabilityPair::from_clear(0.9); 24]);
    let result = decide(&probs).unwrap();
    assert_eq!(result.label, ClarityLabel::NotClear);
    assert_eq!(result.label.id(), 0);
  }
}
