// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 输入模块
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

use image::RgbImage;

mod convert;
pub use self::convert::{FrameDecodeError, PixelFormat};

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::{V4lInput, V4lInputError};

/// 帧来源，每次返回一帧已转换为 RGB 的原始分辨率图像
pub trait FrameSource {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 帧宽高
  fn dimensions(&self) -> (u32, u32);

  fn next_frame(&mut self) -> Result<RgbImage, Self::Error>;
}
