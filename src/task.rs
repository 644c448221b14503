// 该文件是 FoodCal （食卡） 项目的一部分。
// src/task.rs - 点击识别流水线
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

use std::{
  fmt::Display,
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use thiserror::Error;
use tokio::{
  runtime::Handle,
  task::{AbortHandle, JoinHandle},
};
use tracing::{debug, error, info, warn};

use crate::{
  enrich::{LookupError, NutritionLookup},
  frame::{AnchorTransform, ScreenPoint},
  input::FrameSource,
  model::{Model, Prediction, Predictions, normalize_label},
  output::{Annotation, AnnotationSlot, DetailCard, RenderSurface, SelectedFood},
};

pub const ACCEPTANCE_THRESHOLD: f32 = 0.70;
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// 查询成功但标注已被更新的点击取代时，是否仍更新当前选中食物
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
  /// 最后一个成功的查询获胜，与标注是否显示无关
  #[default]
  LastCompleted,
  /// 只有仍持有标注的会话才会更新选中食物
  LatestIssuedOnly,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub acceptance_threshold: f32,
  pub lookup_timeout: Duration,
  /// 新会话写入标注时中止旧会话仍在进行的查询
  pub cancel_superseded: bool,
  pub selection_policy: SelectionPolicy,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      acceptance_threshold: ACCEPTANCE_THRESHOLD,
      lookup_timeout: LOOKUP_TIMEOUT,
      cancel_superseded: false,
      selection_policy: SelectionPolicy::default(),
    }
  }
}

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("当前线程不在 tokio 运行时中，请显式提供运行时句柄")]
  NoRuntime,
}

/// 会话的终止性失败，交给 [`ErrorReporter`]
#[derive(Error, Debug)]
pub enum TapFailure {
  #[error("点击位置没有命中任何平面")]
  NoTarget,
  #[error("当前没有相机帧")]
  NoFrame,
  #[error("分类失败: {0}")]
  Classification(String),
  #[error("置信度不足: {label} {probability:.2}")]
  LowConfidence { label: String, probability: f32 },
  #[error("营养查询失败 ({query}): {error}")]
  EnrichmentFailed { query: String, error: LookupError },
}

impl TapFailure {
  pub fn kind(&self) -> &'static str {
    match self {
      TapFailure::NoTarget => "no-target",
      TapFailure::NoFrame => "no-frame",
      TapFailure::Classification(_) => "classification",
      TapFailure::LowConfidence { .. } => "low-confidence",
      TapFailure::EnrichmentFailed { .. } => "enrichment",
    }
  }
}

/// 失败上报接口，由外部观测组件实现
pub trait ErrorReporter: Send + Sync {
  fn report(&self, seq: u64, failure: &TapFailure);
}

/// 默认上报：写入日志
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
  fn report(&self, seq: u64, failure: &TapFailure) {
    match failure {
      TapFailure::NoTarget | TapFailure::NoFrame | TapFailure::LowConfidence { .. } => {
        debug!("会话 #{} 结束: {}", seq, failure)
      }
      TapFailure::EnrichmentFailed { .. } => warn!("会话 #{} {}", seq, failure),
      TapFailure::Classification(_) => error!("会话 #{} {}", seq, failure),
    }
  }
}

/// 一次点击会话，在各阶段之间显式传递
#[derive(Debug, Clone, PartialEq)]
pub struct TapSession {
  pub seq: u64,
  /// 规范化后的标签，同时作为查询关键字
  pub label: String,
  pub probability: f32,
  pub anchor: AnchorTransform,
  pub local_text: String,
}

pub enum TapOutcome {
  NoTarget,
  NoFrame,
  ClassificationError,
  Rejected(Prediction),
  /// 并发点击中已有更新的会话写入了标注
  Superseded(TapSession),
  Enriching(EnrichmentHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
  /// 标注已更新为带热量的文本
  Annotated(SelectedFood),
  /// 查询成功，但标注属于更新的会话，写入被丢弃
  Superseded(SelectedFood),
  /// 查询失败，标注保持本地分类文本
  Failed,
  /// 被更新的会话中止
  Cancelled,
}

pub struct EnrichmentHandle {
  session: TapSession,
  task: JoinHandle<EnrichmentOutcome>,
}

impl EnrichmentHandle {
  pub fn session(&self) -> &TapSession {
    &self.session
  }

  pub async fn outcome(self) -> EnrichmentOutcome {
    match self.task.await {
      Ok(outcome) => outcome,
      Err(e) if e.is_cancelled() => EnrichmentOutcome::Cancelled,
      Err(e) => {
        error!("会话 #{} 查询任务异常退出: {}", self.session.seq, e);
        EnrichmentOutcome::Failed
      }
    }
  }
}

pub fn annotation_text(label: &str, probability: f32) -> String {
  let percent = (f64::from(probability) * 100.0).round() as u32;
  format!("Prediction: {label}\nProbability: {percent}%")
}

pub fn enriched_text(local_text: &str, calories_per_100g: f64) -> String {
  format!("{local_text}\nCalories: {calories_per_100g}/100g")
}

struct Shared<S: RenderSurface> {
  slot: AnnotationSlot<S>,
  /// 当前持有标注的会话序号，只增不减
  owner: u64,
  selection: Option<SelectedFood>,
  in_flight: Option<AbortHandle>,
}

fn lock<S: RenderSurface>(shared: &Mutex<Shared<S>>) -> MutexGuard<'_, Shared<S>> {
  shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TapPipelineBuilder<Src, M, L, S> {
  source: Src,
  model: M,
  lookup: L,
  surface: S,
  config: PipelineConfig,
  reporter: Arc<dyn ErrorReporter>,
  runtime: Option<Handle>,
}

impl<Src, M, L, S> TapPipelineBuilder<Src, M, L, S>
where
  Src: FrameSource,
  M: Model<Input = Src::Frame, Output = Predictions>,
  M::Error: Display,
  L: NutritionLookup,
  S: RenderSurface,
{
  pub fn new(source: Src, model: M, lookup: L, surface: S) -> Self {
    Self {
      source,
      model,
      lookup,
      surface,
      config: PipelineConfig::default(),
      reporter: Arc::new(TracingReporter),
      runtime: None,
    }
  }

  pub fn config(mut self, config: PipelineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
    self.reporter = reporter;
    self
  }

  pub fn runtime(mut self, runtime: Handle) -> Self {
    self.runtime = Some(runtime);
    self
  }

  pub fn build(self) -> Result<TapPipeline<Src, M, L, S>, TaskError> {
    let runtime = match self.runtime {
      Some(runtime) => runtime,
      None => Handle::try_current().map_err(|_| TaskError::NoRuntime)?,
    };

    info!(
      "流水线配置: 阈值 {:.2}, 查询超时 {:?}, 中止旧查询 {}, 选中策略 {:?}",
      self.config.acceptance_threshold,
      self.config.lookup_timeout,
      self.config.cancel_superseded,
      self.config.selection_policy
    );

    Ok(TapPipeline {
      source: self.source,
      model: self.model,
      lookup: Arc::new(self.lookup),
      shared: Arc::new(Mutex::new(Shared {
        slot: AnnotationSlot::new(self.surface),
        owner: 0,
        selection: None,
        in_flight: None,
      })),
      next_seq: AtomicU64::new(0),
      reporter: self.reporter,
      config: self.config,
      runtime,
    })
  }
}

/// 点击 → 取帧 → 分类 → 置信度门限 → 本地标注 → 异步查询 → 带热量标注
///
/// 每次点击分配一个递增序号；标注写入以发起顺序为准，而不是完成顺序。
pub struct TapPipeline<Src, M, L, S: RenderSurface> {
  source: Src,
  model: M,
  lookup: Arc<L>,
  shared: Arc<Mutex<Shared<S>>>,
  next_seq: AtomicU64,
  reporter: Arc<dyn ErrorReporter>,
  config: PipelineConfig,
  runtime: Handle,
}

impl<Src, M, L, S> TapPipeline<Src, M, L, S>
where
  Src: FrameSource,
  M: Model<Input = Src::Frame, Output = Predictions>,
  M::Error: Display,
  L: NutritionLookup,
  S: RenderSurface,
{
  /// 处理一次点击，分类在调用线程上同步完成
  pub fn on_tap(&self, point: ScreenPoint) -> TapOutcome {
    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
    debug!("会话 #{} 点击 ({:.1}, {:.1})", seq, point.x, point.y);

    let Some(anchor) = self.source.hit_test(point) else {
      self.reporter.report(seq, &TapFailure::NoTarget);
      return TapOutcome::NoTarget;
    };
    let Some(frame) = self.source.current_frame() else {
      self.reporter.report(seq, &TapFailure::NoFrame);
      return TapOutcome::NoFrame;
    };

    let now = Instant::now();
    let predictions = match self.model.infer(&frame) {
      Ok(predictions) => predictions,
      Err(e) => {
        self
          .reporter
          .report(seq, &TapFailure::Classification(e.to_string()));
        return TapOutcome::ClassificationError;
      }
    };
    let top = predictions.top().clone();
    info!(
      "会话 #{} 推理完成，耗时: {:.2?}, 结果: {} {:.2}",
      seq,
      now.elapsed(),
      top.label,
      top.probability
    );

    if top.probability < self.config.acceptance_threshold {
      self.reporter.report(
        seq,
        &TapFailure::LowConfidence {
          label: top.label.clone(),
          probability: top.probability,
        },
      );
      return TapOutcome::Rejected(top);
    }

    let label = normalize_label(&top.label);
    let session = TapSession {
      seq,
      local_text: annotation_text(&label, top.probability),
      label,
      probability: top.probability,
      anchor,
    };

    {
      let mut shared = lock(&self.shared);
      if seq <= shared.owner {
        debug!("会话 #{} 已被会话 #{} 取代", seq, shared.owner);
        return TapOutcome::Superseded(session);
      }
      shared.slot.set(session.local_text.as_str(), anchor);
      shared.owner = seq;
      if self.config.cancel_superseded {
        if let Some(previous) = shared.in_flight.take() {
          debug!("会话 #{} 中止上一次查询", seq);
          previous.abort();
        }
      }
    }

    let task = self.runtime.spawn(enrich_session(
      session.clone(),
      Arc::clone(&self.lookup),
      Arc::clone(&self.shared),
      Arc::clone(&self.reporter),
      self.config.lookup_timeout,
      self.config.selection_policy,
    ));
    if self.config.cancel_superseded {
      let mut shared = lock(&self.shared);
      if shared.owner == seq {
        shared.in_flight = Some(task.abort_handle());
      }
    }

    TapOutcome::Enriching(EnrichmentHandle { session, task })
  }

  /// 清除标注，仍在进行的查询完成后不会再写入
  pub fn clear_annotation(&self) {
    // 清除也占用一个序号，使之前发起的会话全部过期
    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
    let mut shared = lock(&self.shared);
    shared.slot.clear();
    shared.owner = shared.owner.max(seq);
    if let Some(previous) = shared.in_flight.take() {
      if self.config.cancel_superseded {
        previous.abort();
      }
    }
  }

  pub fn annotation(&self) -> Option<Annotation> {
    lock(&self.shared).slot.content().cloned()
  }

  pub fn selected_food(&self) -> Option<SelectedFood> {
    lock(&self.shared).selection.clone()
  }

  pub fn detail_card(&self) -> DetailCard {
    DetailCard::from(lock(&self.shared).selection.as_ref())
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }
}

async fn enrich_session<L, S>(
  session: TapSession,
  lookup: Arc<L>,
  shared: Arc<Mutex<Shared<S>>>,
  reporter: Arc<dyn ErrorReporter>,
  timeout: Duration,
  policy: SelectionPolicy,
) -> EnrichmentOutcome
where
  L: NutritionLookup,
  S: RenderSurface,
{
  let now = Instant::now();
  let result = match tokio::time::timeout(timeout, lookup.lookup(&session.label)).await {
    Ok(result) => result,
    Err(_) => Err(LookupError::Timeout(timeout)),
  };

  let enrichment = match result {
    Ok(enrichment) => enrichment,
    Err(error) => {
      reporter.report(
        session.seq,
        &TapFailure::EnrichmentFailed {
          query: session.label.clone(),
          error,
        },
      );
      return EnrichmentOutcome::Failed;
    }
  };
  info!(
    "会话 #{} 查询完成，耗时: {:.2?}, {} 每 100 克 {} 千卡",
    session.seq,
    now.elapsed(),
    session.label,
    enrichment.calories_per_100g
  );

  let food = SelectedFood::new(session.label.as_str(), enrichment.calories_per_100g);
  let mut shared = lock(&shared);
  let current = shared.owner == session.seq;
  if current {
    shared.slot.set(
      enriched_text(&session.local_text, enrichment.calories_per_100g),
      session.anchor,
    );
    shared.in_flight = None;
  } else {
    debug!(
      "会话 #{} 的标注已被会话 #{} 取代，丢弃写入",
      session.seq, shared.owner
    );
  }

  if current || policy == SelectionPolicy::LastCompleted {
    shared.selection = Some(food.clone());
  }

  if current {
    EnrichmentOutcome::Annotated(food)
  } else {
    EnrichmentOutcome::Superseded(food)
  }
}
