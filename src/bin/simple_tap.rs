// 该文件是 FoodCal （食卡） 项目的一部分。
// src/bin/simple_tap.rs - 对静态图像回放点击
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

use std::{thread::sleep, time::Duration};

use anyhow::Result;
use clap::Parser;
use url::Url;

use foodcal::{
  FromUrl,
  enrich::{CalorieNinjasBuilder, DEFAULT_ENDPOINT},
  frame::{CapturedFrame, ScreenPoint},
  input::InputWrapper,
  model::FixedScoreModel,
  output::TracingSurface,
  task::{EnrichmentOutcome, PipelineConfig, SelectionPolicy, TapOutcome, TapPipelineBuilder},
};
use tracing::{info, warn};

/// FoodCal 点击回放参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 画面来源，例如 image:///tmp/apple.png?anchor=0,0,-0.5
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 回放的分类分数，例如 apple=0.82,banana=0.10
  #[arg(long, value_name = "SCORES")]
  pub scores: String,
  /// 营养接口地址
  #[arg(long, value_name = "ENDPOINT", default_value = DEFAULT_ENDPOINT)]
  pub endpoint: Url,
  /// 营养接口密钥
  #[arg(long, value_name = "KEY")]
  pub api_key: String,
  /// 点击位置 x（像素）
  #[arg(long, default_value_t = 0.0)]
  pub x: f32,
  /// 点击位置 y（像素）
  #[arg(long, default_value_t = 0.0)]
  pub y: f32,
  /// 点击次数
  #[arg(long, default_value_t = 1)]
  pub taps: usize,
  /// 两次点击之间的间隔（毫秒）
  #[arg(long, default_value_t = 0)]
  pub interval_ms: u64,
  /// 查询超时（秒）
  #[arg(long, default_value_t = 10)]
  pub timeout_secs: u64,
  /// 新点击时中止旧查询
  #[arg(long)]
  pub cancel_superseded: bool,
  /// 只让仍持有标注的会话更新选中食物
  #[arg(long)]
  pub latest_only: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("画面来源: {}", args.input);
  info!("回放分数: {}", args.scores);
  info!("营养接口: {}", args.endpoint);

  let runtime = tokio::runtime::Runtime::new()?;
  let timeout = Duration::from_secs(args.timeout_secs);

  let source = InputWrapper::from_url(&args.input)?;
  let model: FixedScoreModel<CapturedFrame> = args.scores.parse()?;
  let lookup = CalorieNinjasBuilder::from_url(&args.endpoint)?
    .api_key(args.api_key)
    .timeout(timeout)
    .build()?;
  let config = PipelineConfig {
    lookup_timeout: timeout,
    cancel_superseded: args.cancel_superseded,
    selection_policy: if args.latest_only {
      SelectionPolicy::LatestIssuedOnly
    } else {
      SelectionPolicy::LastCompleted
    },
    ..PipelineConfig::default()
  };

  let pipeline = TapPipelineBuilder::new(source, model, lookup, TracingSurface::default())
    .config(config)
    .runtime(runtime.handle().clone())
    .build()?;

  // 主线程扮演界面线程，依次发出点击
  let point = ScreenPoint::new(args.x, args.y);
  let mut handles = Vec::with_capacity(args.taps);
  for index in 0..args.taps {
    info!("第 {} 次点击", index + 1);
    match pipeline.on_tap(point) {
      TapOutcome::Enriching(handle) => handles.push(handle),
      TapOutcome::Rejected(top) => warn!(
        "置信度不足，未标注: {} {:.0}%",
        top.label,
        top.probability * 100.0
      ),
      _ => warn!("本次点击没有产生标注"),
    }
    if args.interval_ms > 0 {
      sleep(Duration::from_millis(args.interval_ms));
    }
  }

  for handle in handles {
    let seq = handle.session().seq;
    match runtime.block_on(handle.outcome()) {
      EnrichmentOutcome::Annotated(food) => info!("会话 #{} 已标注: {:?}", seq, food),
      EnrichmentOutcome::Superseded(food) => info!("会话 #{} 被取代: {:?}", seq, food),
      EnrichmentOutcome::Failed => warn!("会话 #{} 查询失败", seq),
      EnrichmentOutcome::Cancelled => info!("会话 #{} 已中止", seq),
    }
  }

  match pipeline.annotation() {
    Some(annotation) => info!("当前标注:\n{}", annotation.text),
    None => info!("当前没有标注"),
  }
  info!("详情页:\n{}", pipeline.detail_card());

  Ok(())
}
