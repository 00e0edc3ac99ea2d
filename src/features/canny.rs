// 该文件是 Qingxi （清晰） 项目的一部分。
// src/features/canny.rs - 双阈值边缘检测
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

use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

// tan(22.5°) 的 15 位定点表示
const CANNY_SHIFT: u32 = 15;
const TG22: i64 = 13573;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeState {
  Suppressed,
  Weak,
  Strong,
}

/// Canny 边缘检测（不做预先平滑）
///
/// 梯度使用 3x3 Sobel（边界按复制处理），幅值取 `|dx| + |dy|`。
/// 幅值大于 `low` 且为局部极大值的像素成为候选，大于 `high` 的候选作为种子，
/// 与种子八连通的候选最终标记为边缘。返回图中边缘像素为 255，其余为 0。
pub fn canny(gray: &GrayImage, low: i32, high: i32) -> GrayImage {
  let (width, height) = gray.dimensions();
  let (w, h) = (width as isize, height as isize);

  let dx = horizontal_sobel(gray);
  let dy = vertical_sobel(gray);
  let (dx, dy) = (dx.as_raw(), dy.as_raw());

  let magnitude: Vec<i32> = dx
    .iter()
    .zip(dy.iter())
    .map(|(&gx, &gy)| (gx as i32).abs() + (gy as i32).abs())
    .collect();
  // 图像外的幅值视为 0
  let mag_at = |x: isize, y: isize| -> i32 {
    if x < 0 || y < 0 || x >= w || y >= h {
      0
    } else {
      magnitude[(y * w + x) as usize]
    }
  };

  let mut states = vec![EdgeState::Suppressed; magnitude.len()];
  let mut seeds = Vec::new();

  for y in 0..h {
    for x in 0..w {
      let index = (y * w + x) as usize;
      let m = magnitude[index];
      if m <= low {
        continue;
      }

      let (xs, ys) = (dx[index] as i32, dy[index] as i32);
      let ax = xs.abs() as i64;
      let ay = (ys.abs() as i64) << CANNY_SHIFT;
      let tg22x = ax * TG22;

      let is_local_max = if ay < tg22x {
        m > mag_at(x - 1, y) && m >= mag_at(x + 1, y)
      } else {
        let tg67x = tg22x + (ax << (CANNY_SHIFT + 1));
        if ay > tg67x {
          m > mag_at(x, y - 1) && m >= mag_at(x, y + 1)
        } else {
          let s = if (xs ^ ys) < 0 { -1 } else { 1 };
          m > mag_at(x - s, y - 1) && m > mag_at(x + s, y + 1)
        }
      };

      if !is_local_max {
        continue;
      }

      if m > high {
        states[index] = EdgeState::Strong;
        seeds.push((x, y));
      } else {
        states[index] = EdgeState::Weak;
      }
    }
  }

  while let Some((x, y)) = seeds.pop() {
    for ny in (y - 1)..=(y + 1) {
      for nx in (x - 1)..=(x + 1) {
        if nx < 0 || ny < 0 || nx >= w || ny >= h {
          continue;
        }
        let index = (ny * w + nx) as usize;
        if states[index] == EdgeState::Weak {
          states[index] = EdgeState::Strong;
          seeds.push((nx, ny));
        }
      }
    }
  }

  GrayImage::from_fn(width, height, |x, y| {
    let index = (y * width + x) as usize;
    Luma([if states[index] == EdgeState::Strong { 255 } else { 0 }])
  })
}
