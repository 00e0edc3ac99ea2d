// 该文件是 Qingxi （清晰） 项目的一部分。
// src/input/directory_input.rs - 目录批量输入
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

use std::path::PathBuf;

use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  input::{InputError, is_image_path, read_image_file::decode_image_file},
};

/// 目录中的所有图像文件，按文件名排序依次产生
///
/// 无法解码的文件产生 `Err`，迭代继续。
pub struct DirectoryInput {
  files: std::vec::IntoIter<PathBuf>,
  index: usize,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::open(url.path())
  }
}

impl DirectoryInput {
  pub fn open(directory: impl Into<PathBuf>) -> Result<Self, InputError> {
    let directory = directory.into();
    let io_error = |source| InputError::IoError {
      path: directory.display().to_string(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory).map_err(io_error)? {
      let path = entry.map_err(io_error)?.path();
      if path.is_file() && is_image_path(&path) {
        files.push(path);
      }
    }
    files.sort();

    info!("目录 {} 中共有 {} 个图像文件", directory.display(), files.len());
    if files.is_empty() {
      warn!("目录 {} 中没有可处理的图像", directory.display());
    }

    Ok(Self {
      files: files.into_iter(),
      index: 0,
    })
  }

  pub fn remaining(&self) -> usize {
    self.files.len()
  }
}

impl Iterator for DirectoryInput {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.next()?;
    let index = self.index;
    self.index += 1;
    Some(
      decode_image_file(&path)
        .map(|image| ImageFrame::new(image, path.display().to_string(), index)),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{GrayImage, Luma};

  #[test]
  fn lists_images_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.png", "a.png", "c.PNG"] {
      GrayImage::from_pixel(4, 4, Luma([9])).save_with_format(dir.path().join(name), image::ImageFormat::Png).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
    std::fs::write(dir.path().join("broken.jpg"), "not a jpeg").unwrap();

    let input = DirectoryInput::open(dir.path()).unwrap();
    assert_eq!(input.remaining(), 4);

    let items: Vec<_> = input.collect();
    assert!(items[0].is_ok());
    assert!(items[0].as_ref().unwrap().source.ends_with("a.png"));
    assert!(items[1].as_ref().unwrap().source.ends_with("b.png"));
    assert!(items[2].is_err());
    assert!(items[3].as_ref().unwrap().source.ends_with("c.PNG"));
    assert_eq!(items[3].as_ref().unwrap().index, 3);
  }

  #[test]
  fn missing_directory_fails_to_open() {
    assert!(matches!(
      DirectoryInput::open("/nonexistent/qingxi-dir"),
      Err(InputError::IoError { .. })
    ));
  }
}
