// 该文件是 FoodCal （食卡） 项目的一部分。
// src/input.rs - 帧来源
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

use crate::{
  FromUrl,
  frame::{AnchorTransform, ScreenPoint},
};

/// 相机与世界跟踪会话的接口
pub trait FrameSource {
  type Frame;

  fn current_frame(&self) -> Option<Self::Frame>;
  fn hit_test(&self, point: ScreenPoint) -> Option<AnchorTransform>;
}

#[cfg(feature = "read_image_file")]
mod still_image;
#[cfg(feature = "read_image_file")]
pub use self::still_image::{StillImageError, StillImageSource};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Still image input error: {0}")]
  StillImageError(#[from] StillImageError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  StillImage(StillImageSource),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == StillImageSource::SCHEME {
        let input = StillImageSource::from_url(url)?;
        return Ok(InputWrapper::StillImage(input));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

#[cfg(feature = "read_image_file")]
impl FrameSource for InputWrapper {
  type Frame = crate::frame::CapturedFrame;

  fn current_frame(&self) -> Option<Self::Frame> {
    match self {
      InputWrapper::StillImage(input) => input.current_frame(),
    }
  }

  fn hit_test(&self, point: ScreenPoint) -> Option<AnchorTransform> {
    match self {
      InputWrapper::StillImage(input) => input.hit_test(point),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("v4l2:///dev/video0").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}
