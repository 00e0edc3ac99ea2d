// 该文件是 Qingxi （清晰） 项目的一部分。
// src/grid.rs - 图像补丁网格
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

use image::{DynamicImage, imageops::FilterType};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::features::{FeatureVector, PatchFeatureExtractor};

pub const DEFAULT_PATCH_SIZE: u32 = 8;
pub const DEFAULT_TARGET_SIZE: u32 = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
  #[error("补丁尺寸必须大于 0")]
  ZeroPatchSize,
  #[error("目标尺寸必须大于 0")]
  ZeroTargetSize,
}

/// 补丁左上角在缩放后图像中的坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatchOrigin {
  pub x: u32,
  pub y: u32,
}

/// 将图像缩放到固定尺寸并切分为不重叠补丁
///
/// 缩放使用 `image` 的 `Triangle` 滤波，不保持宽高比。缩小时滤波核随缩放比例
/// 展宽，相当于带抗混叠的区域平均，与 OpenCV `INTER_LINEAR` 的 2x2 采样不同。
/// 补丁按行优先顺序遍历（y 在外层，x 在内层），
/// 右侧和底部不完整的补丁直接丢弃，不参与打分。
#[derive(Debug, Clone, Copy)]
pub struct PatchGrid {
  patch_size: u32,
  target_size: u32,
  extractor: PatchFeatureExtractor,
}

impl Default for PatchGrid {
  fn default() -> Self {
    Self {
      patch_size: DEFAULT_PATCH_SIZE,
      target_size: DEFAULT_TARGET_SIZE,
      extractor: PatchFeatureExtractor::default(),
    }
  }
}

impl PatchGrid {
  pub fn new(patch_size: u32, target_size: u32) -> Result<Self, GridError> {
    if patch_size == 0 {
      return Err(GridError::ZeroPatchSize);
    }
    if target_size == 0 {
      return Err(GridError::ZeroTargetSize);
    }
    Ok(Self {
      patch_size,
      target_size,
      extractor: PatchFeatureExtractor::default(),
    })
  }

  pub fn patch_size(&self) -> u32 {
    self.patch_size
  }

  pub fn target_size(&self) -> u32 {
    self.target_size
  }

  /// 每个方向上完整补丁的数量的平方
  pub fn patch_capacity(&self) -> usize {
    let per_axis = (self.target_size / self.patch_size) as usize;
    per_axis * per_axis
  }

  pub fn resize(&self, image: &DynamicImage) -> DynamicImage {
    // 已是目标尺寸时不重新采样
    if image.width() == self.target_size && image.height() == self.target_size {
      return image.clone();
    }
    image.resize_exact(self.target_size, self.target_size, FilterType::Triangle)
  }

  pub fn decompose(&self, image: &DynamicImage) -> Vec<FeatureVector> {
    self
      .decompose_with_origins(image)
      .into_iter()
      .map(|(_, features)| features)
      .collect()
  }

  pub fn decompose_with_origins(&self, image: &DynamicImage) -> Vec<(PatchOrigin, FeatureVector)> {
    let resized = self.resize(image);
    let (width, height) = (resized.width(), resized.height());
    let step = self.patch_size as usize;

    let mut patches = Vec::with_capacity(self.patch_capacity());
    for y in (0..height).step_by(step) {
      for x in (0..width).step_by(step) {
        let patch = resized.crop_imm(x, y, self.patch_size, self.patch_size);
        if patch.width() < self.patch_size || patch.height() < self.patch_size {
          continue;
        }
        patches.push((PatchOrigin { x, y }, self.extractor.extract(&patch)));
      }
    }

    debug!(
      "图像 {}x{} 缩放至 {}x{}，得到 {} 个补丁",
      image.width(),
      image.height(),
      width,
      height,
      patches.len()
    );
    patches
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{GrayImage, Luma, Rgb, RgbImage};

  fn gray_image(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
  }

  #[test]
  fn default_grid_yields_64_patches() {
    let grid = PatchGrid::default();
    let features = grid.decompose(&gray_image(320, 240, 128));
    assert_eq!(features.len(), 64);
    assert_eq!(grid.patch_capacity(), 64);
  }

  #[test]
  fn partial_patches_are_dropped() {
    let grid = PatchGrid::new(10, 64).unwrap();
    let patches = grid.decompose_with_origins(&gray_image(64, 64, 80));
    assert_eq!(patches.len(), 36);
    assert_eq!(grid.patch_capacity(), 36);
    assert!(
      patches
        .iter()
        .all(|(origin, _)| origin.x + 10 <= 64 && origin.y + 10 <= 64)
    );
  }

  #[test]
  fn patch_larger_than_target_yields_nothing() {
    let grid = PatchGrid::new(65, 64).unwrap();
    assert!(grid.decompose(&gray_image(64, 64, 10)).is_empty());
  }

  #[test]
  fn zero_sizes_are_rejected() {
    assert_eq!(PatchGrid::new(0, 64).unwrap_err(), GridError::ZeroPatchSize);
    assert_eq!(PatchGrid::new(8, 0).unwrap_err(), GridError::ZeroTargetSize);
  }

  #[test]
  fn single_pixel_image_still_fills_the_grid() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 200, 30])));
    let features = PatchGrid::default().decompose(&image);
    assert_eq!(features.len(), 64);
    assert!(features.iter().all(|f| f.edge_density == 0.0));
  }

  #[test]
  fn origins_are_row_major() {
    let patches = PatchGrid::default().decompose_with_origins(&gray_image(64, 64, 50));
    let origins: Vec<(u32, u32)> = patches.iter().map(|(o, _)| (o.x, o.y)).collect();
    assert_eq!(origins[0], (0, 0));
    assert_eq!(origins[1], (8, 0));
    assert_eq!(origins[7], (56, 0));
    assert_eq!(origins[8], (0, 8));
    assert_eq!(origins[63], (56, 56));
  }

  #[test]
  fn sequence_follows_image_content() {
    // 只有第二行第三列的补丁含有台阶边缘
    let image = GrayImage::from_fn(64, 64, |x, y| {
      let inside = (8..16).contains(&y) && (16..24).contains(&x);
      Luma([if inside && x >= 20 { 220 } else { 20 }])
    });
    let features = PatchGrid::default().decompose(&DynamicImage::ImageLuma8(image));
    for (i, f) in features.iter().enumerate() {
      if i == 8 + 2 {
        assert!(f.edge_density > 0.0);
      } else {
        assert_eq!(f.lap_var, 0.0, "patch {}", i);
      }
    }
  }
}
