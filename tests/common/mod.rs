// 该文件是 Qingxi （清晰） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

pub mod synthetic_image;

use std::path::{Path, PathBuf};

/// 把逻辑回归模型写到临时目录，返回模型 URL
///
/// 权重偏向边缘密度：平坦图像约为 0.27，棋盘格接近 1。
pub fn write_logistic_model(dir: &Path) -> url::Url {
  let path = dir.join("logistic.json");
  std::fs::write(
    &path,
    r#"{ "weights": [0.001, 40.0, 1.0], "intercept": -1.0 }"#,
  )
  .unwrap();
  url::Url::parse(&format!("logistic://{}", path.display())).unwrap()
}

pub fn save_png(dir: &Path, name: &str, image: &image::DynamicImage) -> PathBuf {
  let path = dir.join(name);
  image.save(&path).unwrap();
  path
}

pub fn read_json_lines(path: &Path) -> Vec<serde_json::Value> {
  std::fs::read_to_string(path)
    .unwrap()
    .lines()
    .map(|line| serde_json::from_str(line).unwrap())
    .collect()
}
