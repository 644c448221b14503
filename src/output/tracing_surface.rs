// 该文件是 FoodCal （食卡） 项目的一部分。
// src/output/tracing_surface.rs - 以日志代替绘制的渲染表面
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

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::{
  frame::{AnchorTransform, LABEL_SCALE},
  output::RenderSurface,
};

#[derive(Debug, PartialEq, Eq)]
pub struct TextNode(u64);

impl TextNode {
  pub fn id(&self) -> u64 {
    self.0
  }
}

/// 无图形环境时使用：把挂载与移除记录到日志
#[derive(Debug, Default)]
pub struct TracingSurface {
  next_id: AtomicU64,
}

impl RenderSurface for TracingSurface {
  type Node = TextNode;

  fn attach(&self, text: &str, anchor: &AnchorTransform) -> Self::Node {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let [x, y, z] = anchor.label_position();
    info!(
      "挂载文本节点 #{} 于 ({:.3}, {:.3}, {:.3}) 缩放 {}: {:?}",
      id, x, y, z, LABEL_SCALE, text
    );
    TextNode(id)
  }

  fn detach(&self, node: Self::Node) {
    info!("移除文本节点 #{}", node.0);
  }
}
