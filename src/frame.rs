// 该文件是 Qingxi （清晰） 项目的一部分。
// src/frame.rs - 图像帧定义
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

use image::{DynamicImage, GrayImage, RgbImage};

/// 一帧已解码的输入图像
///
/// 解码之后图像不再修改，整条流水线只读使用。
#[derive(Debug, Clone)]
pub struct ImageFrame {
  /// 解码后的图像（灰度或彩色）
  pub image: DynamicImage,
  /// 图像来源，通常是文件路径
  pub source: String,
  /// 帧序号，从 0 开始
  pub index: usize,
}

impl ImageFrame {
  pub fn new(image: DynamicImage, source: impl Into<String>, index: usize) -> Self {
    Self {
      image,
      source: source.into(),
      index,
    }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn channels(&self) -> u8 {
    if self.image.color().has_color() { 3 } else { 1 }
  }
}

impl From<RgbImage> for ImageFrame {
  fn from(image: RgbImage) -> Self {
    ImageFrame::new(DynamicImage::ImageRgb8(image), "memory", 0)
  }
}

impl From<GrayImage> for ImageFrame {
  fn from(image: GrayImage) -> Self {
    ImageFrame::new(DynamicImage::ImageLuma8(image), "memory", 0)
  }
}

impl AsRef<DynamicImage> for ImageFrame {
  fn as_ref(&self) -> &DynamicImage {
    &self.image
  }
}

/// 帧的来源描述，用于拒绝结果
pub trait FrameSource {
  fn frame_source(&self) -> &str;
}

impl FrameSource for ImageFrame {
  fn frame_source(&self) -> &str {
    &self.source
  }
}
