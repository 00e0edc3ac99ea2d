// 该文件是 Qingxi （清晰） 项目的一部分。
// src/features/gray.rs - BT.601 灰度转换
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

use image::{DynamicImage, GrayImage, Luma};

// 14 位定点的 BT.601 系数，三者之和为 1 << 14
const LUMA_SHIFT: u32 = 14;
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;

/// 单个 RGB 像素的亮度，四舍五入到整数
pub fn luma_bt601(r: u8, g: u8, b: u8) -> u8 {
  let y = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT + (1 << (LUMA_SHIFT - 1));
  (y >> LUMA_SHIFT) as u8
}

/// 将图像转为 8 位灰度
///
/// 单通道图像只做位深转换；彩色图像忽略 alpha 通道，按 RGB 顺序取分量。
pub fn to_gray(image: &DynamicImage) -> GrayImage {
  if !image.color().has_color() {
    return image.to_luma8();
  }

  let rgb = image.to_rgb8();
  GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
    let [r, g, b] = rgb.get_pixel(x, y).0;
    Luma([luma_bt601(r, g, b)])
  })
}
