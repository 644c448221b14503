// 该文件是 FoodCal （食卡） 项目的一部分。
// src/enrich.rs - 营养信息查询
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

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// 每 100 克的热量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enrichment {
  pub calories_per_100g: f64,
}

/// 查询失败的原因
///
/// 调用方不区分这些情况，一律视为“未查到”，这里保留细节仅供日志使用。
#[derive(Error, Debug)]
pub enum LookupError {
  #[cfg(feature = "calorie_ninjas")]
  #[error("HTTP 传输错误: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("服务返回非成功状态码: {0}")]
  Status(u16),
  #[error("响应解析错误: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("响应中没有条目")]
  NoItems,
  #[error("查询超时: {0:?}")]
  Timeout(Duration),
}

/// 异步营养查询，每次调用只发出一个请求，不重试
pub trait NutritionLookup: Send + Sync + 'static {
  fn lookup(&self, query: &str) -> impl Future<Output = Result<Enrichment, LookupError>> + Send;
}

#[derive(Deserialize)]
struct NutritionResponse {
  items: Vec<NutritionItem>,
}

#[derive(Deserialize)]
struct NutritionItem {
  calories: f64,
}

/// 从响应体中取第一条目的 `calories`
pub fn parse_calories(body: &[u8]) -> Result<Enrichment, LookupError> {
  let response: NutritionResponse = serde_json::from_slice(body)?;
  let first = response.items.first().ok_or(LookupError::NoItems)?;
  Ok(Enrichment {
    calories_per_100g: first.calories,
  })
}

/// 在接口地址上追加 `query=<百分号编码的食物名>`，接口地址中的片段会被丢弃
pub fn query_url(endpoint: &Url, query: &str) -> Url {
  let param = format!("query={}", urlencoding::encode(query));
  let mut url = endpoint.clone();
  url.set_fragment(None);
  let full = match url.query() {
    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, param),
    _ => param,
  };
  url.set_query(Some(&full));
  url
}

#[cfg(feature = "calorie_ninjas")]
mod calorie_ninjas;
#[cfg(feature = "calorie_ninjas")]
pub use self::calorie_ninjas::{
  API_KEY_HEADER, CalorieNinjas, CalorieNinjasBuilder, CalorieNinjasError, DEFAULT_ENDPOINT,
};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_item_calories_are_used() {
    let enrichment = parse_calories(br#"{"items":[{"calories":52.0}]}"#).unwrap();
    assert_eq!(enrichment.calories_per_100g, 52.0);

    let enrichment = parse_calories(
      br#"{"items":[{"name":"apple","calories":52,"sugar_g":10.3},{"calories":89.0}]}"#,
    )
    .unwrap();
    assert_eq!(enrichment.calories_per_100g, 52.0);
  }

  #[test]
  fn unexpected_shapes_are_misses() {
    assert!(matches!(
      parse_calories(br#"{"items":[]}"#),
      Err(LookupError::NoItems)
    ));
    assert!(matches!(
      parse_calories(br#"{"results":[{"calories":52.0}]}"#),
      Err(LookupError::Parse(_))
    ));
    assert!(matches!(
      parse_calories(br#"{"items":[{"calories":null}]}"#),
      Err(LookupError::Parse(_))
    ));
    assert!(matches!(
      parse_calories(br#"{"items":[{"calories":"52"}]}"#),
      Err(LookupError::Parse(_))
    ));
    assert!(matches!(
      parse_calories(b"<html>rate limited</html>"),
      Err(LookupError::Parse(_))
    ));
  }

  #[test]
  fn query_is_percent_encoded() {
    let endpoint = Url::parse("https://api.calorieninjas.com/v1/nutrition").unwrap();

    let url = query_url(&endpoint, "apple");
    assert_eq!(
      url.as_str(),
      "https://api.calorieninjas.com/v1/nutrition?query=apple"
    );

    let url = query_url(&endpoint, "french fries & ketchup");
    assert_eq!(
      url.as_str(),
      "https://api.calorieninjas.com/v1/nutrition?query=french%20fries%20%26%20ketchup"
    );
    let pairs: Vec<_> = url.query_pairs().collect();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].1, "french fries & ketchup");
  }

  #[test]
  fn query_appends_to_existing_parameters() {
    let endpoint = Url::parse("http://localhost:8080/nutrition?lang=en").unwrap();
    let url = query_url(&endpoint, "crème brûlée");
    let query: Vec<_> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    assert_eq!(
      query,
      [
        ("lang".to_string(), "en".to_string()),
        ("query".to_string(), "crème brûlée".to_string())
      ]
    );
  }

  #[test]
  fn fragment_is_dropped_before_query() {
    let endpoint = Url::parse("http://localhost:8080/nutrition#frag").unwrap();
    let url = query_url(&endpoint, "apple");
    assert_eq!(url.as_str(), "http://localhost:8080/nutrition?query=apple");
    assert_eq!(url.query(), Some("query=apple"));
    assert_eq!(url.fragment(), None);

    let endpoint = Url::parse("http://localhost:8080/nutrition?#frag").unwrap();
    let url = query_url(&endpoint, "apple");
    assert_eq!(url.query(), Some("query=apple"));
  }
}
