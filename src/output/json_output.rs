// 该文件是 Qingxi （清晰） 项目的一部分。
// src/output/json_output.rs - JSON 结果输出
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

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, query_flag,
  frame::ImageFrame,
  model::ClarityReport,
  output::Render,
  rejection::{RejectReason, Rejection},
};

#[derive(Error, Debug)]
pub enum JsonOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

#[derive(Serialize)]
struct PatchRecord {
  x: u32,
  y: u32,
  lap_var: f64,
  edge_density: f64,
  contrast: f64,
  probability: [f64; 2],
}

#[derive(Serialize)]
struct PredictResponse<'a> {
  source: &'a str,
  prediction: u8,
  probability: [f64; 2],
  total_patches: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  patches: Option<Vec<PatchRecord>>,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
  source: &'a str,
  error: &'a str,
  reason: RejectReason,
}

/// 每帧输出一行 JSON
///
/// `json:-` 写到标准输出，`json:///path/to/result.jsonl` 写到文件，
/// 查询参数 `patches` 打开补丁明细。
pub struct JsonOutput {
  sink: Mutex<Box<dyn Write + Send>>,
  with_patches: bool,
}

impl FromUrlWithScheme for JsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let with_patches = query_flag(url, "patches");
    let path = url.path();
    if path.is_empty() || path == "-" {
      return Ok(Self::from_writer(std::io::stdout(), with_patches));
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    debug!("JSON 结果写入 {}", path.display());
    Ok(Self::from_writer(BufWriter::new(file), with_patches))
  }
}

impl JsonOutput {
  pub fn from_writer(writer: impl Write + Send + 'static, with_patches: bool) -> Self {
    Self {
      sink: Mutex::new(Box::new(writer)),
      with_patches,
    }
  }

  fn write_line<T: Serialize>(&self, value: &T) -> Result<(), JsonOutputError> {
    let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
    serde_json::to_writer(&mut *sink, value)?;
    sink.write_all(b"\n")?;
    sink.flush()?;
    Ok(())
  }
}

impl Render<ImageFrame, ClarityReport> for JsonOutput {
  type Error = JsonOutputError;

  fn render_result(&self, frame: &ImageFrame, report: &ClarityReport) -> Result<(), Self::Error> {
    let patches = self.with_patches.then(|| {
      report
        .patches
        .iter()
        .map(|p| PatchRecord {
          x: p.x,
          y: p.y,
          lap_var: p.features.lap_var,
          edge_density: p.features.edge_density,
          contrast: p.features.contrast,
          probability: p.probabilities.as_array(),
        })
        .collect()
    });

    self.write_line(&PredictResponse {
      source: &frame.source,
      prediction: report.result.label.id(),
      probability: report.result.probabilities.as_array(),
      total_patches: report.result.patch_count,
      patches,
    })
  }

  fn render_rejection(
    &self,
    _frame: Option<&ImageFrame>,
    rejection: &Rejection,
  ) -> Result<(), Self::Error> {
    self.write_line(&ErrorResponse {
      source: &rejection.source,
      error: &rejection.message,
      reason: rejection.reason,
    })
  }
}
