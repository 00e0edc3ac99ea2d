// 该文件是 Qingxi （清晰） 项目的一部分。
// src/input/base64_input.rs - base64 图像负载输入
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

use base64::Engine;
use image::DynamicImage;
use tracing::debug;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ImageFrame, input::InputError};

/// 解码 base64 图像负载
///
/// 支持三种形式：纯 base64 文本、`data:image/png;base64,...` 形式的 data URL
/// （丢弃第一个逗号及之前的内容），以及请求体 `{"image": "..."}`。
pub fn decode_payload(text: &str, source: &str) -> Result<DynamicImage, InputError> {
  let text = text.trim();

  let owned;
  let payload = if text.starts_with('{') {
    let body: serde_json::Value =
      serde_json::from_str(text).map_err(|source_err| InputError::JsonError {
        path: source.to_string(),
        source: source_err,
      })?;
    owned = body
      .get("image")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
      .ok_or_else(|| InputError::MissingImage(source.to_string()))?
      .to_string();
    owned.as_str()
  } else {
    text
  };

  let encoded = match payload.split_once(',') {
    Some((_, data)) => data,
    None => payload,
  };
  let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
  if compact.is_empty() {
    return Err(InputError::MissingImage(source.to_string()));
  }

  let bytes = base64::engine::general_purpose::STANDARD
    .decode(compact.as_bytes())
    .map_err(|err| InputError::Base64Error {
      path: source.to_string(),
      source: err,
    })?;
  debug!("base64 负载 {} 解码为 {} 字节", source, bytes.len());

  image::load_from_memory(&bytes).map_err(|err| InputError::DecodeError {
    path: source.to_string(),
    source: err,
  })
}

/// 存放在文件中的 base64 图像负载，只产生一帧
pub struct Base64Input {
  path: Option<PathBuf>,
}

impl FromUrlWithScheme for Base64Input {
  const SCHEME: &'static str = "base64";
}

impl FromUrl for Base64Input {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Base64Input {
      path: Some(PathBuf::from(url.path())),
    })
  }
}

impl Base64Input {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }
}

impl Iterator for Base64Input {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.path.take()?;
    let source = path.display().to_string();
    let frame = std::fs::read_to_string(&path)
      .map_err(|err| InputError::IoError {
        path: source.clone(),
        source: err,
      })
      .and_then(|text| decode_payload(&text, &source))
      .map(|image| ImageFrame::new(image, source.clone(), 0));
    Some(frame)
  }
}
