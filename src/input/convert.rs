// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/convert.rs - 摄像头像素格式转换
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

use image::{ImageFormat, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameDecodeError {
  #[error("缓冲区大小不匹配: 期望至少 {expected} 字节, 实际 {actual} 字节")]
  BufferSize { expected: usize, actual: usize },
  #[error("步长 {stride} 小于一行像素所需的 {row} 字节")]
  Stride { stride: usize, row: usize },
  #[error("JPEG 解码错误: {0}")]
  Jpeg(#[from] image::ImageError),
}

/// 支持的摄像头像素格式，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  Rgb3,
  Bgr3,
  Yuyv,
  Mjpg,
}

impl PixelFormat {
  pub const PREFERRED: [PixelFormat; 4] = [
    PixelFormat::Rgb3,
    PixelFormat::Bgr3,
    PixelFormat::Yuyv,
    PixelFormat::Mjpg,
  ];

  pub fn fourcc(self) -> [u8; 4] {
    match self {
      PixelFormat::Rgb3 => *b"RGB3",
      PixelFormat::Bgr3 => *b"BGR3",
      PixelFormat::Yuyv => *b"YUYV",
      PixelFormat::Mjpg => *b"MJPG",
    }
  }

  pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
    Self::PREFERRED.into_iter().find(|f| &f.fourcc() == fourcc)
  }

  fn bytes_per_pixel(self) -> usize {
    match self {
      PixelFormat::Rgb3 | PixelFormat::Bgr3 => 3,
      PixelFormat::Yuyv => 2,
      PixelFormat::Mjpg => 0,
    }
  }

  /// 将一帧原始数据转换为 RGB 图像，`stride` 为每行字节数（0 表示紧密排列）
  pub fn decode(
    self,
    data: &[u8],
    width: u32,
    height: u32,
    stride: usize,
  ) -> Result<RgbImage, FrameDecodeError> {
    if self == PixelFormat::Mjpg {
      let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
      return Ok(image.to_rgb8());
    }

    let row = width as usize * self.bytes_per_pixel();
    let stride = if stride == 0 { row } else { stride };
    if stride < row {
      return Err(FrameDecodeError::Stride { stride, row });
    }
    let expected = stride * (height as usize).saturating_sub(1) + row;
    if height > 0 && data.len() < expected {
      return Err(FrameDecodeError::BufferSize {
        expected,
        actual: data.len(),
      });
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height as usize {
      let line = &data[y * stride..y * stride + row];
      match self {
        PixelFormat::Rgb3 => rgb.extend_from_slice(line),
        PixelFormat::Bgr3 => {
          for px in line.chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
          }
        }
        PixelFormat::Yuyv => {
          for pair in line.chunks_exact(4) {
            let (y0, u, y1, v) = (pair[0], pair[1], pair[2], pair[3]);
            rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
            rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
          }
          // 奇数宽度时最后一个像素只有 Y、U
          if width % 2 == 1 {
            let tail = &line[row - 2..];
            rgb.extend_from_slice(&yuv_to_rgb(tail[0], tail[1], 128));
          }
        }
        PixelFormat::Mjpg => unreachable!(),
      }
    }

    RgbImage::from_raw(width, height, rgb).ok_or(FrameDecodeError::BufferSize {
      expected,
      actual: data.len(),
    })
  }
}

// BT.601 全范围
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
  let y = y as f32;
  let u = u as f32 - 128.0;
  let v = v as f32 - 128.0;
  let r = y + 1.402 * v;
  let g = y - 0.344_136 * u - 0.714_136 * v;
  let b = y + 1.772 * u;
  [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

fn clamp_u8(v: f32) -> u8 {
  v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fourcc_lookup() {
    assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
    assert_eq!(PixelFormat::from_fourcc(b"MJPG"), Some(PixelFormat::Mjpg));
    assert_eq!(PixelFormat::from_fourcc(b"NV12"), None);
  }

  #[test]
  fn bgr_is_swapped_to_rgb() {
    let data = [1, 2, 3, 4, 5, 6];
    let image = PixelFormat::Bgr3.decode(&data, 2, 1, 0).unwrap();
    assert_eq!(image.into_raw(), vec![3, 2, 1, 6, 5, 4]);
  }

  #[test]
  fn rgb_with_row_padding() {
    // 每行 2 个像素 + 2 字节填充
    let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
    let image = PixelFormat::Rgb3.decode(&data, 2, 2, 8).unwrap();
    assert_eq!(
      image.into_raw(),
      vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
    );
  }

  #[test]
  fn yuyv_gray_and_white() {
    // U = V = 128 时没有色度
    let data = [0, 128, 255, 128];
    let image = PixelFormat::Yuyv.decode(&data, 2, 1, 0).unwrap();
    assert_eq!(image.into_raw(), vec![0, 0, 0, 255, 255, 255]);
  }

  #[test]
  fn yuyv_red_ish() {
    let data = [76, 85, 76, 255];
    let image = PixelFormat::Yuyv.decode(&data, 2, 1, 0).unwrap();
    let px = image.get_pixel(0, 0);
    assert!(px[0] > 200 && px[1] < 30 && px[2] < 30, "{:?}", px);
  }

  #[test]
  fn short_buffer_is_rejected() {
    let err = PixelFormat::Yuyv.decode(&[0; 6], 2, 2, 0).unwrap_err();
    assert!(matches!(
      err,
      FrameDecodeError::BufferSize {
        expected: 8,
        actual: 6
      }
    ));
  }

  #[test]
  fn mjpg_frames_are_decoded() {
    let source = RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 10]));
    let mut jpeg = std::io::Cursor::new(Vec::new());
    source.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();

    let image = PixelFormat::Mjpg.decode(jpeg.get_ref(), 8, 8, 0).unwrap();
    assert_eq!(image.dimensions(), (8, 8));
    let px = image.get_pixel(4, 4);
    assert!(px[1] > 150 && px[0] < 60 && px[2] < 60, "{:?}", px);
  }
}
