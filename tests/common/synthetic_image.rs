// 该文件是 Qingxi （清晰） 项目的一部分。
// tests/common/synthetic_image.rs - 合成测试图像
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

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

pub fn uniform_gray(width: u32, height: u32, value: u8) -> DynamicImage {
  DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
}

/// 黑白棋盘格，`cell` 为格子边长
pub fn checkerboard(width: u32, height: u32, cell: u32) -> DynamicImage {
  DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
    if ((x / cell) + (y / cell)) % 2 == 0 {
      Rgb([20, 20, 20])
    } else {
      Rgb([230, 230, 230])
    }
  }))
}

pub fn single_pixel() -> DynamicImage {
  DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([90, 160, 30])))
}
