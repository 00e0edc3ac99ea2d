// 该文件是 Qingxi （清晰） 项目的一部分。
// src/output/save_heatmap.rs - 补丁清晰度热力图
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

use image::{Rgb, RgbImage, imageops::FilterType};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  decide::ClarityLabel,
  frame::ImageFrame,
  model::{ClarityReport, PatchScore},
  output::Render,
  query_value,
  rejection::Rejection,
};

const DEFAULT_SCALE: u32 = 4;
const MAX_SCALE: u32 = 64;
const MAX_CANVAS_SIDE: u32 = 16384;
const CLEAR_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const NOT_CLEAR_COLOR: Rgb<u8> = Rgb([220, 0, 0]);

#[derive(Error, Debug)]
pub enum SaveHeatmapError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无效的放大倍数: {0}")]
  InvalidScale(String),
  #[error("{target_size}x{target_size} 图像放大 {scale} 倍后超出画布上限")]
  CanvasTooLarge { target_size: u32, scale: u32 },
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把每个补丁的 P(清晰) 画成彩色边框
///
/// 缩放后的图像再按 `scale` 放大，补丁边框从红（不清晰）渐变到绿（清晰），
/// 顶部横条为整图判定结果的颜色。
pub struct SaveHeatmapOutput {
  path: PathBuf,
  scale: u32,
}

impl FromUrlWithScheme for SaveHeatmapOutput {
  const SCHEME: &'static str = "heatmap";
}

impl FromUrl for SaveHeatmapOutput {
  type Error = SaveHeatmapError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SaveHeatmapError::SchemeMismatch);
    }

    let scale = match query_value(url, "scale") {
      Some(text) => match text.parse::<u32>() {
        Ok(scale) if (1..=MAX_SCALE).contains(&scale) => scale,
        _ => return Err(SaveHeatmapError::InvalidScale(text)),
      },
      None => DEFAULT_SCALE,
    };

    Ok(Self {
      path: PathBuf::from(url.path()),
      scale,
    })
  }
}

impl SaveHeatmapOutput {
  /// 连续处理时第 n 帧（n > 0）写到 `<文件名>-<n>.png`
  fn frame_path(&self, index: usize) -> PathBuf {
    if index == 0 {
      return self.path.clone();
    }
    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "heatmap".to_string());
    let extension = self
      .path
      .extension()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "png".to_string());
    self
      .path
      .with_file_name(format!("{}-{:04}.{}", stem, index, extension))
  }

  pub fn draw(
    &self,
    frame: &ImageFrame,
    report: &ClarityReport,
  ) -> Result<RgbImage, SaveHeatmapError> {
    let banner = (self.scale * 2).max(4);
    let side = report
      .target_size
      .checked_mul(self.scale)
      .filter(|side| *side > 0 && *side <= MAX_CANVAS_SIDE - banner)
      .ok_or(SaveHeatmapError::CanvasTooLarge {
        target_size: report.target_size,
        scale: self.scale,
      })?;

    let resized = frame
      .image
      .resize_exact(report.target_size, report.target_size, FilterType::Triangle)
      .resize_exact(side, side, FilterType::Nearest)
      .to_rgb8();

    let mut canvas = RgbImage::new(side, side + banner);
    image::imageops::replace(&mut canvas, &resized, 0, banner as i64);

    let label_color = match report.result.label {
      ClarityLabel::Clear => CLEAR_COLOR,
      ClarityLabel::NotClear => NOT_CLEAR_COLOR,
    };
    draw_filled_rect_mut(
      &mut canvas,
      Rect::at(0, 0).of_size(side, banner),
      label_color,
    );

    for patch in &report.patches {
      self.draw_patch(&mut canvas, patch, banner);
    }
    Ok(canvas)
  }

  fn draw_patch(&self, canvas: &mut RgbImage, patch: &PatchScore, offset: u32) {
    let color = clarity_color(patch.probabilities.clear);
    let x = (patch.x * self.scale) as i32;
    let y = (patch.y * self.scale + offset) as i32;
    let size = patch.size * self.scale;
    if size == 0 {
      return;
    }

    draw_hollow_rect_mut(canvas, Rect::at(x, y).of_size(size, size), color);

    // 内侧再画一圈，放大倍数较小时也能看清
    if size > 2 {
      let inner = Rect::at(x + 1, y + 1).of_size(size - 2, size - 2);
      draw_hollow_rect_mut(canvas, inner, color);
    }
  }
}

/// P(清晰) 从 0 到 1 对应红到绿
fn clarity_color(clear: f64) -> Rgb<u8> {
  let p = clear.clamp(0.0, 1.0);
  Rgb([((1.0 - p) * 255.0).round() as u8, (p * 255.0).round() as u8, 0])
}

fn ensure_parent(path: &Path) -> Result<(), std::io::Error> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

impl Render<ImageFrame, ClarityReport> for SaveHeatmapOutput {
  type Error = SaveHeatmapError;

  fn render_result(&self, frame: &ImageFrame, report: &ClarityReport) -> Result<(), Self::Error> {
    let canvas = self.draw(frame, report)?;
    let path = self.frame_path(frame.index);
    ensure_parent(&path)?;
    canvas.save(&path)?;
    info!("热力图已保存到 {}", path.display());
    Ok(())
  }

  fn render_rejection(
    &self,
    _frame: Option<&ImageFrame>,
    rejection: &Rejection,
  ) -> Result<(), Self::Error> {
    warn!("{} 没有补丁评分，不生成热力图: {}", rejection.source, rejection.message);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    decide::ClassificationResult, features::FeatureVector, model::ProbabilityPair,
  };
  use image::{DynamicImage, GrayImage, Luma};

  fn report(clear: f64) -> ClarityReport {
    let pair = ProbabilityPair::from_clear(clear);
    ClarityReport {
      result: ClassificationResult {
        label: if clear > 0.5 {
          ClarityLabel::Clear
        } else {
          ClarityLabel::NotClear
        },
        probabilities: pair,
        patch_count: 4,
      },
      target_size: 16,
      patches: [(0, 0), (8, 0), (0, 8), (8, 8)]
        .into_iter()
        .map(|(x, y)| PatchScore {
          x,
          y,
          size: 8,
          features: FeatureVector::new(0.0, 0.0, 0.0),
          probabilities: pair,
        })
        .collect(),
    }
  }

  fn frame(index: usize) -> ImageFrame {
    ImageFrame::new(
      DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([128]))),
      "gray.png",
      index,
    )
  }

  #[test]
  fn scale_defaults_and_validation() {
    let url = url::Url::parse("heatmap:///tmp/out.png").unwrap();
    assert_eq!(SaveHeatmapOutput::from_url(&url).unwrap().scale, DEFAULT_SCALE);

    let url = url::Url::parse("heatmap:///tmp/out.png?scale=2").unwrap();
    assert_eq!(SaveHeatmapOutput::from_url(&url).unwrap().scale, 2);

    for bad in ["0", "65", "100000000", "abc"] {
      let url = url::Url::parse(&format!("heatmap:///tmp/out.png?scale={}", bad)).unwrap();
      assert!(
        matches!(
          SaveHeatmapOutput::from_url(&url),
          Err(SaveHeatmapError::InvalidScale(_))
        ),
        "scale {}",
        bad
      );
    }
  }

  #[test]
  fn oversized_canvas_is_an_error() {
    let url = url::Url::parse("heatmap:///tmp/out.png?scale=64").unwrap();
    let output = SaveHeatmapOutput::from_url(&url).unwrap();
    let mut large = report(0.9);
    large.target_size = 4096;
    assert!(matches!(
      output.draw(&frame(0), &large),
      Err(SaveHeatmapError::CanvasTooLarge {
        target_size: 4096,
        scale: 64
      })
    ));

    large.target_size = u32::MAX;
    assert!(output.draw(&frame(0), &large).is_err());
  }

  #[test]
  fn rejections_leave_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("heat.png");
    let url = url::Url::parse(&format!("heatmap://{}", target.display())).unwrap();
    let output = SaveHeatmapOutput::from_url(&url).unwrap();
    let rejection = Rejection {
      source: "gray.png".to_string(),
      reason: crate::rejection::RejectReason::NoScorablePatches,
      message: "没有补丁".to_string(),
    };
    output.render_rejection(Some(&frame(0)), &rejection).unwrap();
    assert!(!target.exists());
  }

  #[test]
  fn colors_follow_clarity() {
    assert_eq!(clarity_color(1.0), Rgb([0, 255, 0]));
    assert_eq!(clarity_color(0.0), Rgb([255, 0, 0]));
    assert_eq!(clarity_color(7.0), Rgb([0, 255, 0]));
  }

  #[test]
  fn draws_banner_and_outlines() {
    let url = url::Url::parse("heatmap:///tmp/out.png?scale=2").unwrap();
    let output = SaveHeatmapOutput::from_url(&url).unwrap();
    let canvas = output.draw(&frame(0), &report(0.9)).unwrap();

    assert_eq!(canvas.width(), 32);
    assert_eq!(canvas.height(), 32 + 4);
    assert_eq!(*canvas.get_pixel(10, 1), CLEAR_COLOR);
    // 第一个补丁左上角位于横条下方
    assert_eq!(*canvas.get_pixel(0, 4), clarity_color(0.9));
    // 补丁内部保留原图
    assert_eq!(*canvas.get_pixel(6, 10), Rgb([128, 128, 128]));
  }

  #[test]
  fn later_frames_get_numbered_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("maps").join("heat.png");
    let url = url::Url::parse(&format!("heatmap://{}", target.display())).unwrap();
    let output = SaveHeatmapOutput::from_url(&url).unwrap();

    output.render_result(&frame(0), &report(0.2)).unwrap();
    output.render_result(&frame(3), &report(0.2)).unwrap();

    assert!(target.exists());
    assert!(dir.path().join("maps").join("heat-0003.png").exists());
    let saved = image::open(&target).unwrap().to_rgb8();
    assert_eq!(*saved.get_pixel(0, 0), NOT_CLEAR_COLOR);
  }
}
