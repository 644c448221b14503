// 该文件是 FoodCal （食卡） 项目的一部分。
// src/output.rs - 标注输出定义
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

use tracing::debug;

use crate::frame::AnchorTransform;

/// 渲染表面，负责真正绘制与移除文本节点
pub trait RenderSurface: Send + 'static {
  type Node: Send + 'static;

  fn attach(&self, text: &str, anchor: &AnchorTransform) -> Self::Node;
  fn detach(&self, node: Self::Node);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
  pub text: String,
  pub anchor: AnchorTransform,
}

/// 单一标注槽位：任意时刻最多一个节点在表面上
///
/// 槽位只保证替换的原子性，写入顺序由调用方负责。
pub struct AnnotationSlot<S: RenderSurface> {
  surface: S,
  live: Option<(Annotation, S::Node)>,
}

impl<S: RenderSurface> AnnotationSlot<S> {
  pub fn new(surface: S) -> Self {
    Self { surface, live: None }
  }

  /// 先移除旧节点，再挂上新节点
  pub fn set(&mut self, text: impl Into<String>, anchor: AnchorTransform) {
    if let Some((_, node)) = self.live.take() {
      self.surface.detach(node);
    }

    let annotation = Annotation {
      text: text.into(),
      anchor,
    };
    debug!("更新标注: {:?}", annotation.text);
    let node = self.surface.attach(&annotation.text, &annotation.anchor);
    self.live = Some((annotation, node));
  }

  pub fn clear(&mut self) {
    if let Some((annotation, node)) = self.live.take() {
      debug!("清除标注: {:?}", annotation.text);
      self.surface.detach(node);
    }
  }

  pub fn content(&self) -> Option<&Annotation> {
    self.live.as_ref().map(|(annotation, _)| annotation)
  }

  pub fn surface(&self) -> &S {
    &self.surface
  }
}

mod detail;
pub use self::detail::{DetailCard, SelectedFood};

mod tracing_surface;
pub use self::tracing_surface::{TextNode, TracingSurface};

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[derive(Clone, Default)]
  struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
  }

  impl RenderSurface for Recorder {
    type Node = String;

    fn attach(&self, text: &str, _anchor: &AnchorTransform) -> Self::Node {
      self.events.lock().unwrap().push(format!("attach {text}"));
      text.to_string()
    }

    fn detach(&self, node: Self::Node) {
      self.events.lock().unwrap().push(format!("detach {node}"));
    }
  }

  #[test]
  fn set_detaches_previous_before_attaching() {
    let mut slot = AnnotationSlot::new(Recorder::default());
    let anchor = AnchorTransform::from_translation(0.0, 0.0, -0.5);

    slot.set("first", anchor);
    slot.set("second", anchor);

    assert_eq!(
      *slot.surface().events.lock().unwrap(),
      ["attach first", "detach first", "attach second"]
    );
    assert_eq!(slot.content().map(|a| a.text.as_str()), Some("second"));
  }

  #[test]
  fn clear_empties_the_slot() {
    let recorder = Recorder::default();
    let mut slot = AnnotationSlot::new(recorder.clone());

    slot.clear();
    assert!(recorder.events.lock().unwrap().is_empty());

    slot.set("only", AnchorTransform::IDENTITY);
    slot.clear();
    slot.clear();

    assert!(slot.content().is_none());
    assert_eq!(*recorder.events.lock().unwrap(), ["attach only", "detach only"]);
  }
}
