// 该文件是 FoodCal （食卡） 项目的一部分。
// src/model.rs - 分类模型与预测结果
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
use tracing::debug;

/// 同步推理接口，调用返回前不会让出线程
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("分类结果为空")]
  Empty,
  #[error("类别 {label} 的概率无效: {value}")]
  InvalidProbability { label: String, value: f32 },
  #[error("标签数量 {labels} 与输出数量 {logits} 不一致")]
  LabelCountMismatch { labels: usize, logits: usize },
  #[error("推理后端错误: {0}")]
  Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  pub label: String,
  pub probability: f32,
}

impl Prediction {
  pub fn new(label: impl Into<String>, probability: f32) -> Self {
    Self {
      label: label.into(),
      probability,
    }
  }
}

/// 按概率降序排列的预测集合，至少包含一项
///
/// 排序是稳定的，概率相同时保留模型输出中的先后次序，
/// 因此 [`Predictions::top`] 总是取第一个出现的最大值。
#[derive(Debug, Clone)]
pub struct Predictions {
  items: Box<[Prediction]>,
}

impl Predictions {
  pub fn new(mut items: Vec<Prediction>) -> Result<Self, ClassifyError> {
    if items.is_empty() {
      return Err(ClassifyError::Empty);
    }

    if let Some(bad) = items
      .iter()
      .find(|p| !p.probability.is_finite() || !(0.0..=1.0).contains(&p.probability))
    {
      return Err(ClassifyError::InvalidProbability {
        label: bad.label.clone(),
        value: bad.probability,
      });
    }

    items.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(Self {
      items: items.into_boxed_slice(),
    })
  }

  /// 对原始输出做 softmax 后构造预测集合
  pub fn from_logits<L: AsRef<str>>(labels: &[L], logits: &[f32]) -> Result<Self, ClassifyError> {
    if labels.len() != logits.len() {
      return Err(ClassifyError::LabelCountMismatch {
        labels: labels.len(),
        logits: logits.len(),
      });
    }

    let probabilities = softmax(logits);
    debug!("softmax 后概率: {:?}", probabilities);

    Self::new(
      labels
        .iter()
        .zip(probabilities)
        .map(|(label, probability)| Prediction::new(label.as_ref(), probability))
        .collect(),
    )
  }

  pub fn top(&self) -> &Prediction {
    // 构造时保证非空
    &self.items[0]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
    self.items.iter()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// 将模型标签转换为展示与查询用的名称
///
/// 下划线替换为空格，其余字符保持不变；对任意输入都有定义。
pub fn normalize_label(raw: &str) -> String {
  raw.replace('_', " ")
}

mod fixed_score;
pub use self::fixed_score::{FixedScoreError, FixedScoreModel};
