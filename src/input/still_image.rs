// 该文件是 FoodCal （食卡） 项目的一部分。
// src/input/still_image.rs - 静态图像帧来源
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AnchorTransform, CapturedFrame, FrameError, ScreenPoint},
  input::FrameSource,
};

#[derive(Error, Debug)]
pub enum StillImageError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Frame error: {0}")]
  FrameError(#[from] FrameError),
  #[error("Invalid anchor '{0}', expected x,y,z")]
  InvalidAnchor(String),
}

/// 默认锚点：相机前方半米
const DEFAULT_ANCHOR: [f32; 3] = [0.0, 0.0, -0.5];

/// 把一张图片当作一直不变的相机画面
///
/// 查询参数：
/// - `anchor=x,y,z` 命中测试返回的世界坐标
/// - `surface=none` 模拟没有可命中的平面
pub struct StillImageSource {
  frame: CapturedFrame,
  anchor: Option<AnchorTransform>,
}

impl FromUrlWithScheme for StillImageSource {
  const SCHEME: &'static str = "image";
}

impl FromUrl for StillImageSource {
  type Error = StillImageError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(StillImageError::SchemaMismatch);
    }

    let mut anchor = Some(AnchorTransform::from_translation(
      DEFAULT_ANCHOR[0],
      DEFAULT_ANCHOR[1],
      DEFAULT_ANCHOR[2],
    ));
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "anchor" => anchor = Some(parse_anchor(&v)?),
        "surface" if v == "none" => anchor = None,
        _ => debug!("忽略未知参数: {}={}", k, v),
      }
    }

    let path = url.path();
    info!("读取图像: {}", path);
    let image: RgbImage = ImageReader::open(path)?.decode()?.into();

    Ok(StillImageSource {
      frame: rgb_image_to_frame(image)?,
      anchor,
    })
  }
}

impl StillImageSource {
  pub fn new(frame: CapturedFrame, anchor: Option<AnchorTransform>) -> Self {
    Self { frame, anchor }
  }
}

impl FrameSource for StillImageSource {
  type Frame = CapturedFrame;

  fn current_frame(&self) -> Option<Self::Frame> {
    Some(self.frame.recaptured())
  }

  /// 只有落在画面内的点击才会命中
  fn hit_test(&self, point: ScreenPoint) -> Option<AnchorTransform> {
    let inside = point.x >= 0.0
      && point.y >= 0.0
      && point.x < self.frame.width() as f32
      && point.y < self.frame.height() as f32;
    if inside { self.anchor } else { None }
  }
}

fn rgb_image_to_frame(image: RgbImage) -> Result<CapturedFrame, FrameError> {
  let (width, height) = image.dimensions();
  CapturedFrame::from_rgb(width, height, image.into_raw())
}

fn parse_anchor(value: &str) -> Result<AnchorTransform, StillImageError> {
  let coords = value
    .split(',')
    .map(|c| c.trim().parse::<f32>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|_| StillImageError::InvalidAnchor(value.to_string()))?;

  match coords.as_slice() {
    &[x, y, z] => Ok(AnchorTransform::from_translation(x, y, z)),
    _ => Err(StillImageError::InvalidAnchor(value.to_string())),
  }
}
