// 该文件是 Qingxi （清晰） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme, query_flag,
  frame::ImageFrame,
  model::ClarityReport,
  output::Render,
  rejection::Rejection,
};

const REJECTED_DIRECTORY: &str = "rejected";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按判定结果归档图像
///
/// 图像保存为 `<目录>/<clear|not_clear>/年/月/日/时-分-秒-序号.png`，
/// 同名 `.txt` 记录标签、两类概率和补丁数。被拒绝的帧只在 `?always` 时
/// 保存到 `rejected/`。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: Mutex::new(0),
      always: query_flag(uri, "always"),
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counter.lock().unwrap_or_else(|e| e.into_inner());
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self, category: &str) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(category)
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn save_frame(
    &self,
    frame: &ImageFrame,
    category: &str,
    record: String,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let path = self.frame_path(category)?;
    to_png_compatible(&frame.image).save(&path)?;
    write_record(&path, record)?;
    info!("{} 已归档到 {}", frame.source, path.display());
    Ok(path)
  }
}

/// PNG 不支持浮点像素，统一转为 8 位
fn to_png_compatible(image: &DynamicImage) -> DynamicImage {
  if image.color().has_color() {
    DynamicImage::ImageRgb8(image.to_rgb8())
  } else {
    DynamicImage::ImageLuma8(image.to_luma8())
  }
}

fn write_record(path: &Path, record: String) -> Result<(), std::io::Error> {
  std::fs::write(path.with_extension("txt"), record)
}

impl Render<ImageFrame, ClarityReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &ImageFrame, report: &ClarityReport) -> Result<(), Self::Error> {
    let result = &report.result;
    let record = format!(
      "{}, {:.4}, {:.4}, {}\n{}",
      result.label.as_str(),
      result.probabilities.not_clear,
      result.probabilities.clear,
      result.patch_count,
      frame.source
    );
    self.save_frame(frame, result.label.as_str(), record)?;
    Ok(())
  }

  fn render_rejection(
    &self,
    frame: Option<&ImageFrame>,
    rejection: &Rejection,
  ) -> Result<(), Self::Error> {
    if !self.always {
      return Ok(());
    }
    if let Some(frame) = frame {
      let record = format!(
        "{}, {}\n{}",
        rejection.reason, rejection.message, rejection.source
      );
      self.save_frame(frame, REJECTED_DIRECTORY, record)?;
    }
    Ok(())
  }
}
