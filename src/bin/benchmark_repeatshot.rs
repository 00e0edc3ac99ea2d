// 该文件是 Qingxi （清晰） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 清晰度判定耗时测试
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use qingxi::{
  FromUrl,
  grid::{DEFAULT_PATCH_SIZE, DEFAULT_TARGET_SIZE, PatchGrid},
  input::InputWrapper,
  model::{ClarityModel, ClassifierWrapper},
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// 清晰度分类参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型，例如 `xgboost:///path/model.json` 或 `logistic:///path/model.json`
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 `image:///path/a.png`、`base64:///path/body.json`、`folder:///path/dir`
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出方式，例如 `json:-`、`heatmap:///path/out.png`、`folder:///path/records`
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 补丁边长
  #[arg(long, value_name = "PATCH_SIZE", default_value_t = DEFAULT_PATCH_SIZE)]
  pub patch_size: u32,
  /// 缩放后的图像边长
  #[arg(long, value_name = "TARGET_SIZE", default_value_t = DEFAULT_TARGET_SIZE)]
  pub target_size: u32,

  /// 重复次数
  #[arg(long, value_name = "REPEAT", default_value_t = 1000)]
  pub repeat: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let grid = PatchGrid::new(args.patch_size, args.target_size)?;
  let model = ClarityModel::new(ClassifierWrapper::from_url(&args.model)?).with_grid(grid);
  info!(
    "图像缩放至 {0}x{0}，补丁 {1}x{1}，最多 {2} 个补丁",
    model.grid().target_size(),
    model.grid().patch_size(),
    model.grid().patch_capacity()
  );
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask::default()
    .with_repeat_times(args.repeat)
    .run_task(input, model, output)?;

  Ok(())
}
