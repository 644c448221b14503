// 该文件是 FoodCal （食卡） 项目的一部分。
// src/model/fixed_score.rs - 固定分数回放模型
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

use std::{marker::PhantomData, str::FromStr};

use thiserror::Error;
use tracing::debug;

use crate::model::{ClassifyError, Model, Prediction, Predictions};

#[derive(Error, Debug)]
pub enum FixedScoreError {
  #[error("分数项格式错误，应为 label=probability: {0}")]
  Malformed(String),
  #[error("概率无法解析: {0}")]
  Probability(#[from] std::num::ParseFloatError),
  #[error("分数无效: {0}")]
  Invalid(#[from] ClassifyError),
}

/// 对任意帧都返回同一组分数的模型，用于回放与演示
pub struct FixedScoreModel<Frame> {
  scores: Vec<Prediction>,
  _phantom: PhantomData<fn(&Frame)>,
}

impl<Frame> FixedScoreModel<Frame> {
  pub fn new(scores: Vec<Prediction>) -> Result<Self, FixedScoreError> {
    // 提前校验，保证每次推理都能构造出合法结果
    Predictions::new(scores.clone())?;
    Ok(Self {
      scores,
      _phantom: PhantomData,
    })
  }
}

/// 解析 `apple=0.82,banana=0.10` 形式的分数表
impl<Frame> FromStr for FixedScoreModel<Frame> {
  type Err = FixedScoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut scores = Vec::new();
    for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
      let (label, probability) = item
        .split_once('=')
        .ok_or_else(|| FixedScoreError::Malformed(item.to_string()))?;
      let label = label.trim();
      if label.is_empty() {
        return Err(FixedScoreError::Malformed(item.to_string()));
      }
      scores.push(Prediction::new(label, probability.trim().parse()?));
    }
    Self::new(scores)
  }
}

impl<Frame> Model for FixedScoreModel<Frame> {
  type Input = Frame;
  type Output = Predictions;
  type Error = ClassifyError;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("回放固定分数: {:?}", self.scores);
    Predictions::new(self.scores.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_score_table() {
    let model: FixedScoreModel<()> = "apple=0.82, banana=0.10".parse().unwrap();
    let predictions = model.infer(&()).unwrap();
    assert_eq!(predictions.top(), &Prediction::new("apple", 0.82));
    assert_eq!(predictions.len(), 2);
  }

  #[test]
  fn rejects_malformed_tables() {
    assert!(matches!(
      "apple".parse::<FixedScoreModel<()>>(),
      Err(FixedScoreError::Malformed(_))
    ));
    assert!(matches!(
      "apple=high".parse::<FixedScoreModel<()>>(),
      Err(FixedScoreError::Probability(_))
    ));
    assert!(matches!(
      "".parse::<FixedScoreModel<()>>(),
      Err(FixedScoreError::Invalid(ClassifyError::Empty))
    ));
  }
}
