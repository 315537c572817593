// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/v4l_input.rs - V4L 视频输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use v4l::{
  Device, FourCC, Format,
  buffer::Type,
  io::{mmap::Stream, traits::CaptureStream},
  video::Capture,
};

use crate::input::{FrameDecodeError, FrameSource, PixelFormat};

const V4L_BUFFER_COUNT: u32 = 4;

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("摄像头不可用 {device}: {source}")]
  CameraUnavailable {
    device: String,
    #[source]
    source: std::io::Error,
  },
  #[error("不支持的像素格式: {0}")]
  UnsupportedPixelFormat(String),
  #[error("帧解码错误: {0}")]
  Decode(#[from] FrameDecodeError),
}

/// V4L2 摄像头，使用 mmap 流读取
pub struct V4lInput {
  // 字段按声明顺序析构，先停止流再关闭设备
  stream: Stream<'static>,
  _device: Device,
  device_path: String,
  width: u32,
  height: u32,
  stride: usize,
  pixel_format: PixelFormat,
}

impl V4lInput {
  /// 打开摄像头并协商格式，实际分辨率以设备返回为准
  pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, V4lInputError> {
    let unavailable = |source| V4lInputError::CameraUnavailable {
      device: device_path.to_string(),
      source,
    };

    info!("打开摄像头: {}", device_path);
    let device = Device::with_path(device_path).map_err(unavailable)?;

    let supported: Vec<FourCC> = device
      .enum_formats()
      .map_err(unavailable)?
      .into_iter()
      .map(|desc| desc.fourcc)
      .collect();
    debug!("摄像头支持的格式: {:?}", supported);

    let pixel_format = PixelFormat::PREFERRED
      .into_iter()
      .find(|f| supported.contains(&FourCC::new(&f.fourcc())))
      .ok_or_else(|| V4lInputError::UnsupportedPixelFormat(format!("{:?}", supported)))?;

    let requested = Format::new(width, height, FourCC::new(&pixel_format.fourcc()));
    let actual = device.set_format(&requested).map_err(unavailable)?;
    let pixel_format = PixelFormat::from_fourcc(&actual.fourcc.repr)
      .ok_or_else(|| V4lInputError::UnsupportedPixelFormat(actual.fourcc.to_string()))?;

    if (actual.width, actual.height) != (width, height) {
      warn!(
        "摄像头分辨率为 {}x{}, 与请求的 {}x{} 不同",
        actual.width, actual.height, width, height
      );
    }
    info!(
      "摄像头格式: {}x{} {}",
      actual.width, actual.height, actual.fourcc
    );

    let stream = Stream::with_buffers(&device, Type::VideoCapture, V4L_BUFFER_COUNT)
      .map_err(unavailable)?;

    Ok(V4lInput {
      stream,
      _device: device,
      device_path: device_path.to_string(),
      width: actual.width,
      height: actual.height,
      stride: actual.stride as usize,
      pixel_format,
    })
  }
}

impl FrameSource for V4lInput {
  type Error = V4lInputError;

  fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn next_frame(&mut self) -> Result<RgbImage, Self::Error> {
    let (buf, meta) = self.stream.next().map_err(|source| {
      error!("读取摄像头帧失败: {}", source);
      V4lInputError::CameraUnavailable {
        device: self.device_path.clone(),
        source,
      }
    })?;
    debug!("摄像头帧 {} 大小 {} 字节", meta.sequence, meta.bytesused);

    // MJPG 帧只有 bytesused 字节有效
    let used = (meta.bytesused as usize).min(buf.len());
    let data = if used > 0 { &buf[..used] } else { buf };

    Ok(
      self
        .pixel_format
        .decode(data, self.width, self.height, self.stride)?,
    )
  }
}
