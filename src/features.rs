// 该文件是 Qingxi （清晰） 项目的一部分。
// src/features.rs - 补丁特征提取
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

use image::{DynamicImage, GrayImage};
use serde::Serialize;

mod canny;
mod gray;
mod laplacian;

pub use self::canny::canny;
pub use self::gray::{luma_bt601, to_gray};
pub use self::laplacian::laplacian;

// 以下常量属于分类模型训练时的特征约定，修改后必须重新训练模型
pub const CANNY_LOW_THRESHOLD: i32 = 50;
pub const CANNY_HIGH_THRESHOLD: i32 = 150;
pub const CONTRAST_EPSILON: f64 = 1e-5;

/// 单个补丁的特征向量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
  /// 拉普拉斯响应的方差（锐度）
  pub lap_var: f64,
  /// 边缘像素占比，取值 [0, 1]
  pub edge_density: f64,
  /// 标准差与均值之比
  pub contrast: f64,
}

impl FeatureVector {
  pub const DIM: usize = 3;

  pub fn new(lap_var: f64, edge_density: f64, contrast: f64) -> Self {
    Self {
      lap_var,
      edge_density,
      contrast,
    }
  }

  /// 按训练时的列顺序排列：`[lap_var, edge_density, contrast]`
  pub fn as_array(&self) -> [f64; Self::DIM] {
    [self.lap_var, self.edge_density, self.contrast]
  }

  pub fn is_finite(&self) -> bool {
    self.as_array().iter().all(|v| v.is_finite())
  }
}

/// 补丁特征提取器
///
/// 输入可以是单通道或三通道补丁。三通道补丁先按 BT.601 转为灰度，
/// 再计算三个特征。提取过程没有错误路径，也没有副作用。
#[derive(Debug, Clone, Copy)]
pub struct PatchFeatureExtractor {
  low_threshold: i32,
  high_threshold: i32,
  epsilon: f64,
}

impl Default for PatchFeatureExtractor {
  fn default() -> Self {
    Self {
      low_threshold: CANNY_LOW_THRESHOLD,
      high_threshold: CANNY_HIGH_THRESHOLD,
      epsilon: CONTRAST_EPSILON,
    }
  }
}

impl PatchFeatureExtractor {
  pub fn extract(&self, patch: &DynamicImage) -> FeatureVector {
    let gray = to_gray(patch);
    self.extract_gray(&gray)
  }

  pub fn extract_gray(&self, gray: &GrayImage) -> FeatureVector {
    let pixel_count = gray.as_raw().len();
    if pixel_count == 0 {
      return FeatureVector::new(0.0, 0.0, 0.0);
    }

    let (_, lap_var) = mean_var(&laplacian(gray));

    let edges = canny(gray, self.low_threshold, self.high_threshold);
    let edge_pixels = edges.as_raw().iter().filter(|&&v| v > 0).count();
    let edge_density = edge_pixels as f64 / pixel_count as f64;

    let intensities: Vec<f64> = gray.as_raw().iter().map(|&v| v as f64).collect();
    let (mean, var) = mean_var(&intensities);
    let contrast = var.sqrt() / (mean + self.epsilon);

    FeatureVector {
      lap_var,
      edge_density,
      contrast,
    }
  }
}

/// 总体均值与总体方差
fn mean_var(values: &[f64]) -> (f64, f64) {
  let n = values.len() as f64;
  let mean = values.iter().sum::<f64>() / n;
  let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
  (mean, var)
}
