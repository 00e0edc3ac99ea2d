// 该文件是 Qingxi （清晰） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;

use crate::{
  FromUrl,
  frame::ImageFrame,
  rejection::{Reject, RejectReason},
};

mod read_image_file;
pub use self::read_image_file::ImageFileInput;

#[cfg(feature = "base64_input")]
mod base64_input;
#[cfg(feature = "base64_input")]
pub use self::base64_input::{Base64Input, decode_payload};

mod directory_input;
pub use self::directory_input::DirectoryInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("无法读取 {path}: {source}")]
  IoError {
    path: String,
    source: std::io::Error,
  },
  #[error("无法解码图像 {path}: {source}")]
  DecodeError {
    path: String,
    source: image::ImageError,
  },
  #[cfg(feature = "base64_input")]
  #[error("base64 解码失败 {path}: {source}")]
  Base64Error {
    path: String,
    source: base64::DecodeError,
  },
  #[error("请求体 {path} 不是合法 JSON: {source}")]
  JsonError {
    path: String,
    source: serde_json::Error,
  },
  #[error("请求体 {0} 中没有提供图像")]
  MissingImage(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl Reject for InputError {
  fn reject_reason(&self) -> RejectReason {
    RejectReason::BadInput
  }

  fn rejected_source(&self) -> Option<&str> {
    match self {
      InputError::IoError { path, .. }
      | InputError::DecodeError { path, .. }
      | InputError::JsonError { path, .. }
      | InputError::MissingImage(path) => Some(path),
      #[cfg(feature = "base64_input")]
      InputError::Base64Error { path, .. } => Some(path),
      InputError::SchemeMismatch(_) => None,
    }
  }
}

/// 按文件扩展名判断是否为支持的图像文件
pub(crate) fn is_image_path(path: &std::path::Path) -> bool {
  const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "base64_input")]
  Base64(Base64Input),
  Directory(DirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    if url.scheme() == ImageFileInput::SCHEME {
      return Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?));
    }
    #[cfg(feature = "base64_input")]
    {
      if url.scheme() == Base64Input::SCHEME {
        return Ok(InputWrapper::Base64(Base64Input::from_url(url)?));
      }
    }
    if url.scheme() == DirectoryInput::SCHEME {
      return Ok(InputWrapper::Directory(DirectoryInput::from_url(url)?));
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Iterator for InputWrapper {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      #[cfg(feature = "base64_input")]
      InputWrapper::Base64(input) => input.next(),
      InputWrapper::Directory(input) => input.next(),
    }
  }
}
