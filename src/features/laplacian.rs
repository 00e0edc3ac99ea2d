// 该文件是 Qingxi （清晰） 项目的一部分。
// src/features/laplacian.rs - 离散拉普拉斯算子
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

use image::GrayImage;

/// 镜像边界（`dcb|abcd|cba`），边界像素本身不重复
pub(crate) fn reflect_101(i: isize, n: isize) -> usize {
  if n <= 1 {
    return 0;
  }
  let mut i = i;
  while i < 0 || i >= n {
    if i < 0 {
      i = -i;
    } else {
      i = 2 * (n - 1) - i;
    }
  }
  i as usize
}

/// 以 `[0 1 0; 1 -4 1; 0 1 0]` 卷积灰度图，按行优先返回浮点响应
pub fn laplacian(gray: &GrayImage) -> Vec<f64> {
  let (w, h) = (gray.width() as isize, gray.height() as isize);
  let at = |x: isize, y: isize| -> f64 {
    gray.get_pixel(reflect_101(x, w) as u32, reflect_101(y, h) as u32)[0] as f64
  };

  let mut response = Vec::with_capacity((w * h) as usize);
  for y in 0..h {
    for x in 0..w {
      let value = at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1) - 4.0 * at(x, y);
      response.push(value);
    }
  }
  response
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  #[test]
  fn reflect_101_mirrors_without_repeating_the_edge() {
    assert_eq!(reflect_101(-1, 8), 1);
    assert_eq!(reflect_101(-2, 8), 2);
    assert_eq!(reflect_101(8, 8), 6);
    assert_eq!(reflect_101(9, 8), 5);
    assert_eq!(reflect_101(3, 8), 3);
    assert_eq!(reflect_101(-1, 1), 0);
  }

  #[test]
  fn corner_impulse_uses_mirrored_neighbours() {
    let mut gray = GrayImage::new(3, 3);
    gray.put_pixel(0, 0, Luma([10]));
    let response = laplacian(&gray);
    assert_eq!(response[0], -40.0);
    // (1, 0) 的左邻居是脉冲本身
    assert_eq!(response[1], 10.0);
    assert_eq!(response[3], 10.0);
    assert_eq!(response[4], 0.0);
  }

  #[test]
  fn linear_ramp_has_zero_interior_response() {
    let gray = GrayImage::from_fn(8, 1, |x, _| Luma([(x * 10) as u8]));
    let response = laplacian(&gray);
    for value in &response[1..7] {
      assert_eq!(*value, 0.0);
    }
  }
}
