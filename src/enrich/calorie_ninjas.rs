// 该文件是 FoodCal （食卡） 项目的一部分。
// src/enrich/calorie_ninjas.rs - CalorieNinjas 营养接口客户端
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

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl,
  enrich::{Enrichment, LookupError, NutritionLookup, parse_calories, query_url},
};

pub const DEFAULT_ENDPOINT: &str = "https://api.calorieninjas.com/v1/nutrition";
pub const API_KEY_HEADER: &str = "X-Api-Key";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum CalorieNinjasError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未配置 API 密钥")]
  MissingApiKey,
  #[error("HTTP 客户端创建失败: {0}")]
  Client(#[from] reqwest::Error),
}

pub struct CalorieNinjasBuilder {
  endpoint: Url,
  api_key: Option<String>,
  timeout: Duration,
}

impl FromUrl for CalorieNinjasBuilder {
  type Error = CalorieNinjasError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !matches!(url.scheme(), "http" | "https") {
      error!("营养接口地址必须为 http(s)，实际为 '{}'", url.scheme());
      return Err(CalorieNinjasError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(CalorieNinjasBuilder {
      endpoint: url.clone(),
      api_key: None,
      timeout: DEFAULT_TIMEOUT,
    })
  }
}

impl CalorieNinjasBuilder {
  pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
    self.api_key = Some(api_key.into());
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<CalorieNinjas, CalorieNinjasError> {
    let api_key = self
      .api_key
      .filter(|key| !key.is_empty())
      .ok_or(CalorieNinjasError::MissingApiKey)?;

    let client = reqwest::Client::builder().timeout(self.timeout).build()?;
    info!(
      "营养接口: {}, 超时: {:?}",
      self.endpoint, self.timeout
    );

    Ok(CalorieNinjas {
      client,
      endpoint: self.endpoint,
      api_key,
    })
  }
}

pub struct CalorieNinjas {
  client: reqwest::Client,
  endpoint: Url,
  api_key: String,
}

impl NutritionLookup for CalorieNinjas {
  async fn lookup(&self, query: &str) -> Result<Enrichment, LookupError> {
    let url = query_url(&self.endpoint, query);
    debug!("查询营养信息: {}", url);

    let response = self
      .client
      .get(url)
      .header(API_KEY_HEADER, &self.api_key)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(LookupError::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    debug!("响应大小: {} 字节", body.len());
    parse_calories(&body)
  }
}

#[cfg(test)]
mod tests {
  use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
  };

  use super::*;

  fn endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).unwrap()
  }

  /// 本地回环服务：接受一个连接，记录请求头并返回固定响应
  async fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
      let (mut stream, _) = listener.accept().await.unwrap();
      let mut request = Vec::new();
      let mut buf = [0u8; 1024];
      while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
          break;
        }
        request.extend_from_slice(&buf[..n]);
      }
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      stream.write_all(response.as_bytes()).await.unwrap();
      stream.shutdown().await.unwrap();
      String::from_utf8(request).unwrap()
    });
    let url = Url::parse(&format!("http://{}/v1/nutrition", addr)).unwrap();
    (url, server)
  }

  fn client(endpoint: &Url) -> CalorieNinjas {
    CalorieNinjasBuilder::from_url(endpoint)
      .unwrap()
      .api_key("k1")
      .timeout(Duration::from_secs(5))
      .build()
      .unwrap()
  }

  #[test]
  fn build_requires_api_key() {
    let result = CalorieNinjasBuilder::from_url(&endpoint()).unwrap().build();
    assert!(matches!(result, Err(CalorieNinjasError::MissingApiKey)));

    let result = CalorieNinjasBuilder::from_url(&endpoint())
      .unwrap()
      .api_key("")
      .build();
    assert!(matches!(result, Err(CalorieNinjasError::MissingApiKey)));
  }

  #[test]
  fn build_with_key_succeeds() {
    let client = CalorieNinjasBuilder::from_url(&endpoint())
      .unwrap()
      .api_key("test-key")
      .timeout(Duration::from_secs(3))
      .build()
      .unwrap();
    assert_eq!(client.endpoint.as_str(), DEFAULT_ENDPOINT);
    assert_eq!(client.api_key, "test-key");
  }

  #[test]
  fn non_http_endpoint_is_rejected() {
    let url = Url::parse("ftp://example.com/nutrition").unwrap();
    assert!(matches!(
      CalorieNinjasBuilder::from_url(&url),
      Err(CalorieNinjasError::SchemeMismatch(_))
    ));
  }

  #[tokio::test]
  async fn lookup_sends_one_keyed_get() {
    let (url, server) = serve_once(
      "200 OK",
      r#"{"items":[{"name":"french fries","calories":52.0}]}"#,
    )
    .await;

    let result = client(&url).lookup("french fries").await;
    let request = server.await.unwrap();

    assert!(
      request.starts_with("GET /v1/nutrition?query=french%20fries HTTP/1.1\r\n"),
      "{}",
      request
    );
    assert!(
      request.to_ascii_lowercase().contains("\r\nx-api-key: k1\r\n"),
      "{}",
      request
    );
    assert_eq!(result.unwrap(), Enrichment { calories_per_100g: 52.0 });
  }

  #[tokio::test]
  async fn non_success_status_is_a_miss() {
    let (url, server) = serve_once("404 Not Found", r#"{"items":[{"calories":52.0}]}"#).await;

    let result = client(&url).lookup("apple").await;
    let request = server.await.unwrap();

    assert!(request.starts_with("GET /v1/nutrition?query=apple "));
    assert!(matches!(result, Err(LookupError::Status(404))));
  }
}
