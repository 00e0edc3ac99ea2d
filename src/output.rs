// 该文件是 Qingxi （清晰） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::FromUrl;
use crate::FromUrlWithScheme;
use crate::frame::ImageFrame;
use crate::model::ClarityReport;
use crate::rejection::Rejection;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;

  /// 输出一次拒绝；输入解码失败时没有帧
  fn render_rejection(
    &self,
    frame: Option<&Frame>,
    rejection: &Rejection,
  ) -> Result<(), Self::Error>;
}

mod json_output;
pub use self::json_output::{JsonOutput, JsonOutputError};

#[cfg(feature = "save_heatmap")]
mod save_heatmap;
#[cfg(feature = "save_heatmap")]
pub use self::save_heatmap::{SaveHeatmapError, SaveHeatmapOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("JSON 输出错误: {0}")]
  JsonOutputError(#[from] JsonOutputError),
  #[cfg(feature = "save_heatmap")]
  #[error("保存热力图错误: {0}")]
  SaveHeatmapError(#[from] SaveHeatmapError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  JsonOutput(JsonOutput),
  #[cfg(feature = "save_heatmap")]
  SaveHeatmapOutput(SaveHeatmapOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      JsonOutput::SCHEME => {
        let output = JsonOutput::from_url(url)?;
        Ok(OutputWrapper::JsonOutput(output))
      }
      #[cfg(feature = "save_heatmap")]
      SaveHeatmapOutput::SCHEME => {
        let output = SaveHeatmapOutput::from_url(url)?;
        Ok(OutputWrapper::SaveHeatmapOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<ImageFrame, ClarityReport> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &ImageFrame, result: &ClarityReport) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::JsonOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_heatmap")]
      OutputWrapper::SaveHeatmapOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }

  fn render_rejection(
    &self,
    frame: Option<&ImageFrame>,
    rejection: &Rejection,
  ) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::JsonOutput(output) => {
        Render::<ImageFrame, ClarityReport>::render_rejection(output, frame, rejection)
          .map_err(OutputError::from)
      }
      #[cfg(feature = "save_heatmap")]
      OutputWrapper::SaveHeatmapOutput(output) => {
        Render::<ImageFrame, ClarityReport>::render_rejection(output, frame, rejection)
          .map_err(OutputError::from)
      }
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => {
        Render::<ImageFrame, ClarityReport>::render_rejection(output, frame, rejection)
          .map_err(OutputError::from)
      }
    }
  }
}
