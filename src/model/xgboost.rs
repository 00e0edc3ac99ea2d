// 该文件是 Qingxi （清晰） 项目的一部分。
// src/model/xgboost.rs - 梯度提升树模型
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

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  features::FeatureVector,
  model::{Classifier, ProbabilityPair, sigmoid},
  query_value,
};

const FEATURE_NAMES: [&str; FeatureVector::DIM] = ["lap_var", "edge_density", "contrast"];
const DEFAULT_BASE_SCORE: f64 = 0.5;

#[derive(Error, Debug)]
pub enum XgboostError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("未知特征: {0}")]
  UnknownFeature(String),
  #[error("第 {tree} 棵树结构错误: {reason}")]
  MalformedTree { tree: usize, reason: String },
  #[error("base_score 必须位于 (0, 1) 之间: {0}")]
  InvalidBaseScore(String),
  #[error("模型中没有任何树")]
  EmptyModel,
}

/// `dump_model(dump_format="json")` 导出的节点
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpNode {
  Split {
    nodeid: usize,
    split: String,
    split_condition: f64,
    yes: usize,
    no: usize,
    missing: Option<usize>,
    children: Vec<DumpNode>,
  },
  Leaf {
    nodeid: usize,
    leaf: f64,
  },
}

#[derive(Debug, Clone, Copy)]
enum Node {
  Split {
    feature: usize,
    threshold: f32,
    yes: usize,
    no: usize,
    missing: usize,
  },
  Leaf(f64),
}

#[derive(Debug, Clone)]
struct Tree {
  nodes: Vec<Node>,
}

impl Tree {
  fn leaf_value(&self, features: &[f64; FeatureVector::DIM]) -> f64 {
    let mut index = 0;
    loop {
      match self.nodes[index] {
        Node::Leaf(value) => return value,
        Node::Split {
          feature,
          threshold,
          yes,
          no,
          missing,
        } => {
          let value = features[feature];
          index = if value.is_nan() {
            missing
          } else if (value as f32) < threshold {
            // XGBoost 以 f32 比较特征与阈值
            yes
          } else {
            no
          };
        }
      }
    }
  }

  fn from_dump(tree: usize, root: &DumpNode) -> Result<Self, XgboostError> {
    let malformed = |reason: String| XgboostError::MalformedTree { tree, reason };

    // 合法的树中节点编号恰好为 0..节点总数
    let total = root.node_count();
    let mut slots: Vec<Option<Node>> = vec![None; total];
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
      let (nodeid, flat) = match node {
        DumpNode::Leaf { nodeid, leaf } => (*nodeid, Node::Leaf(*leaf)),
        DumpNode::Split {
          nodeid,
          split,
          split_condition,
          yes,
          no,
          missing,
          children,
        } => {
          let child_ids: Vec<usize> = children.iter().map(DumpNode::nodeid).collect();
          let missing = missing.unwrap_or(*yes);
          for target in [yes, no, &missing] {
            if !child_ids.contains(target) {
              return Err(malformed(format!(
                "节点 {} 指向的 {} 不是它的子节点",
                nodeid, target
              )));
            }
          }
          pending.extend(children.iter());
          let flat = Node::Split {
            feature: resolve_feature(split)?,
            threshold: *split_condition as f32,
            yes: *yes,
            no: *no,
            missing,
          };
          (*nodeid, flat)
        }
      };

      if nodeid >= total {
        return Err(malformed(format!(
          "节点编号 {} 超出节点总数 {}",
          nodeid, total
        )));
      }
      if slots[nodeid].is_some() {
        return Err(malformed(format!("节点编号 {} 重复", nodeid)));
      }
      slots[nodeid] = Some(flat);
    }

    let nodes = slots
      .into_iter()
      .enumerate()
      .map(|(id, slot)| slot.ok_or_else(|| malformed(format!("缺少节点 {}", id))))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Tree { nodes })
  }
}

impl DumpNode {
  fn nodeid(&self) -> usize {
    match self {
      DumpNode::Split { nodeid, .. } | DumpNode::Leaf { nodeid, .. } => *nodeid,
    }
  }

  fn node_count(&self) -> usize {
    let mut count = 0;
    let mut pending = vec![self];
    while let Some(node) = pending.pop() {
      count += 1;
      if let DumpNode::Split { children, .. } = node {
        pending.extend(children.iter());
      }
    }
    count
  }
}

fn resolve_feature(name: &str) -> Result<usize, XgboostError> {
  if let Some(index) = FEATURE_NAMES.iter().position(|n| *n == name) {
    return Ok(index);
  }
  name
    .strip_prefix('f')
    .and_then(|digits| digits.parse::<usize>().ok())
    .filter(|index| *index < FeatureVector::DIM)
    .ok_or_else(|| XgboostError::UnknownFeature(name.to_string()))
}

/// 二分类（`binary:logistic`）梯度提升树
#[derive(Debug, Clone)]
pub struct XgboostClassifier {
  trees: Vec<Tree>,
  base_margin: f64,
}

impl FromUrlWithScheme for XgboostClassifier {
  const SCHEME: &'static str = "xgboost";
}

impl FromUrl for XgboostClassifier {
  type Error = XgboostError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(XgboostError::SchemeMismatch(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let base_score = match query_value(url, "base_score") {
      Some(value) => value
        .parse::<f64>()
        .map_err(|_| XgboostError::InvalidBaseScore(value))?,
      None => DEFAULT_BASE_SCORE,
    };

    Self::from_path(url.path(), base_score)
  }
}

impl XgboostClassifier {
  pub fn from_path(path: impl AsRef<Path>, base_score: f64) -> Result<Self, XgboostError> {
    let path = path.as_ref();
    info!("加载 XGBoost 模型: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json_str(&text, base_score)
  }

  pub fn from_json_str(text: &str, base_score: f64) -> Result<Self, XgboostError> {
    if !(base_score > 0.0 && base_score < 1.0) {
      return Err(XgboostError::InvalidBaseScore(base_score.to_string()));
    }

    let dump: Vec<DumpNode> = serde_json::from_str(text)?;
    if dump.is_empty() {
      return Err(XgboostError::EmptyModel);
    }

    let trees = dump
      .iter()
      .enumerate()
      .map(|(i, root)| Tree::from_dump(i, root))
      .collect::<Result<Vec<_>, _>>()?;

    debug!(
      "树的数量: {}, 节点总数: {}",
      trees.len(),
      trees.iter().map(|t| t.nodes.len()).sum::<usize>()
    );

    Ok(Self {
      trees,
      base_margin: (base_score / (1.0 - base_score)).ln(),
    })
  }

  pub fn tree_count(&self) -> usize {
    self.trees.len()
  }

  pub fn margin(&self, features: &FeatureVector) -> f64 {
    let values = features.as_array();
    self.base_margin + self.trees.iter().map(|t| t.leaf_value(&values)).sum::<f64>()
  }
}

impl Classifier for XgboostClassifier {
  fn predict_proba(&self, features: &[FeatureVector]) -> Vec<ProbabilityPair> {
    features
      .iter()
      .map(|f| ProbabilityPair::from_clear(sigmoid(self.margin(f))))
      .collect()
  }
}
