// 该文件是 Qingxi （清晰） 项目的一部分。
// src/rejection.rs - 拒绝分类的原因
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

use serde::Serialize;

/// 机器可读的拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
  /// 输入无法解码为图像
  BadInput,
  /// 图像没有产生任何完整补丁
  NoScorablePatches,
  /// 分类器返回的概率数量与补丁数量不符
  ClassifierMismatch,
}

impl RejectReason {
  pub fn as_str(self) -> &'static str {
    match self {
      RejectReason::BadInput => "bad_input",
      RejectReason::NoScorablePatches => "no_scorable_patches",
      RejectReason::ClassifierMismatch => "classifier_mismatch",
    }
  }
}

impl std::fmt::Display for RejectReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 可以转换为拒绝结果的错误
pub trait Reject: std::error::Error {
  fn reject_reason(&self) -> RejectReason;

  /// 出错的输入来源（若错误本身携带）
  fn rejected_source(&self) -> Option<&str> {
    None
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
  pub source: String,
  pub reason: RejectReason,
  pub message: String,
}

impl Rejection {
  pub fn new<E: Reject + ?Sized>(source: impl Into<String>, error: &E) -> Self {
    Self {
      source: source.into(),
      reason: error.reject_reason(),
      message: error.to_string(),
    }
  }

  /// 来源取自错误本身，缺省时使用 `fallback`
  pub fn from_error<E: Reject + ?Sized>(error: &E, fallback: &str) -> Self {
    let source = error.rejected_source().unwrap_or(fallback).to_string();
    Self::new(source, error)
  }
}

impl std::fmt::Display for Rejection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} 被拒绝 ({}): {}", self.source, self.reason, self.message)
  }
}

impl std::error::Error for Rejection {}
