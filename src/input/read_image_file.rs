// 该文件是 Qingxi （清晰） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ImageFrame, input::InputError};

/// 读取并解码一个图像文件
pub(crate) fn decode_image_file(path: &Path) -> Result<DynamicImage, InputError> {
  let shown = path.display().to_string();
  let image = ImageReader::open(path)
    .map_err(|source| InputError::IoError {
      path: shown.clone(),
      source,
    })?
    .with_guessed_format()
    .map_err(|source| InputError::IoError {
      path: shown.clone(),
      source,
    })?
    .decode()
    .map_err(|source| InputError::DecodeError {
      path: shown.clone(),
      source,
    })?;
  debug!("解码图像 {}: {}x{}", shown, image.width(), image.height());
  Ok(image)
}

/// 单个图像文件，只产生一帧
pub struct ImageFileInput {
  path: Option<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(ImageFileInput {
      path: Some(PathBuf::from(url.path())),
    })
  }
}

impl ImageFileInput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.path.take()?;
    Some(
      decode_image_file(&path)
        .map(|image| ImageFrame::new(image, path.display().to_string(), 0)),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rejection::{Reject, RejectReason};
  use image::{Rgb, RgbImage};

  #[test]
  fn yields_the_image_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let frame = input.next().unwrap().unwrap();
    assert_eq!((frame.width(), frame.height()), (20, 10));
    assert_eq!(frame.channels(), 3);
    assert!(input.next().is_none());
  }

  #[test]
  fn garbage_is_a_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"definitely not a png").unwrap();

    let err = ImageFileInput::new(&path).next().unwrap().unwrap_err();
    assert_eq!(err.reject_reason(), RejectReason::BadInput);
    assert_eq!(err.rejected_source(), Some(path.display().to_string().as_str()));
  }

  #[test]
  fn missing_file_is_a_bad_input() {
    let err = ImageFileInput::new("/nonexistent/qingxi.png")
      .next()
      .unwrap()
      .unwrap_err();
    assert!(matches!(err, InputError::IoError { .. }));
  }
}
