// 该文件是 FoodCal （食卡） 项目的一部分。
// src/frame.rs - 相机帧与空间位姿定义
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

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// 文本节点相对锚点的水平偏移（米）
pub const LABEL_OFFSET_X: f32 = 0.05;
/// 文本节点的统一缩放
pub const LABEL_SCALE: f32 = 0.001;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 屏幕上的点击位置（视图坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
  pub x: f32,
  pub y: f32,
}

impl ScreenPoint {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

/// 世界坐标系下的位姿，按列存储的 4x4 矩阵
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorTransform {
  columns: [[f32; 4]; 4],
}

impl Default for AnchorTransform {
  fn default() -> Self {
    Self::IDENTITY
  }
}

impl AnchorTransform {
  pub const IDENTITY: Self = Self {
    columns: [
      [1.0, 0.0, 0.0, 0.0],
      [0.0, 1.0, 0.0, 0.0],
      [0.0, 0.0, 1.0, 0.0],
      [0.0, 0.0, 0.0, 1.0],
    ],
  };

  pub fn from_columns(columns: [[f32; 4]; 4]) -> Self {
    Self { columns }
  }

  pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
    let mut transform = Self::IDENTITY;
    transform.columns[3] = [x, y, z, 1.0];
    transform
  }

  pub fn columns(&self) -> &[[f32; 4]; 4] {
    &self.columns
  }

  pub fn translation(&self) -> [f32; 3] {
    let [x, y, z, _] = self.columns[3];
    [x, y, z]
  }

  /// 文本节点的放置位置：平移分量左移 [`LABEL_OFFSET_X`]
  pub fn label_position(&self) -> [f32; 3] {
    let [x, y, z] = self.translation();
    [x - LABEL_OFFSET_X, y, z]
  }
}

/// 一帧相机图像，RGB 按 NHWC 紧密排列
///
/// 像素数据以 `Arc` 共享，克隆不复制缓冲区。
#[derive(Debug, Clone)]
pub struct CapturedFrame {
  data: Arc<[u8]>,
  width: u32,
  height: u32,
  captured_at: DateTime<Utc>,
}

impl CapturedFrame {
  pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into(),
      width,
      height,
      captured_at: Utc::now(),
    })
  }

  /// 以当前时间重新标记采集时刻，像素共享
  pub fn recaptured(&self) -> Self {
    Self {
      data: Arc::clone(&self.data),
      width: self.width,
      height: self.height,
      captured_at: Utc::now(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn captured_at(&self) -> DateTime<Utc> {
    self.captured_at
  }

  pub fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}
