// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/window.rs - 预览窗口输出
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

use std::time::Duration;

use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use thiserror::Error;
use tracing::{debug, info};

use crate::output::{QuitEvent, Render};

const KEY_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Error, Debug)]
pub enum WindowError {
  #[error("窗口错误: {0}")]
  Minifb(#[from] minifb::Error),
}

/// 单个预览窗口，析构时关闭
pub struct WindowOutput {
  window: Window,
  buffer: Vec<u32>,
}

impl WindowOutput {
  pub fn open(title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
    info!("创建预览窗口: {} ({}x{})", title, width, height);
    let mut window = Window::new(
      title,
      width as usize,
      height as usize,
      WindowOptions::default(),
    )?;
    #[allow(deprecated)]
    window.limit_update_rate(Some(KEY_POLL_INTERVAL));

    Ok(Self {
      window,
      buffer: Vec::with_capacity(width as usize * height as usize),
    })
  }
}

/// RGB 转为 minifb 使用的 0RGB 像素
pub fn to_0rgb(image: &RgbImage, buffer: &mut Vec<u32>) {
  buffer.clear();
  buffer.extend(
    image
      .pixels()
      .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
  );
}

impl Render for WindowOutput {
  type Error = WindowError;

  fn render_frame(&mut self, frame: &RgbImage) -> Result<(), Self::Error> {
    to_0rgb(frame, &mut self.buffer);
    let (width, height) = frame.dimensions();
    self
      .window
      .update_with_buffer(&self.buffer, width as usize, height as usize)?;
    Ok(())
  }

  fn poll_quit(&mut self) -> Option<QuitEvent> {
    if !self.window.is_open() {
      debug!("预览窗口已关闭");
      return Some(QuitEvent::WindowClosed);
    }
    if self.window.is_key_pressed(Key::Q, KeyRepeat::No) {
      debug!("按下退出键");
      return Some(QuitEvent::QuitKey);
    }
    None
  }
}

impl Drop for WindowOutput {
  fn drop(&mut self) {
    info!("关闭预览窗口");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn rgb_to_0rgb() {
    let image = RgbImage::from_vec(2, 1, vec![0x12, 0x34, 0x56, 255, 0, 1]).unwrap();
    let mut buffer = vec![42];
    to_0rgb(&image, &mut buffer);
    assert_eq!(buffer, vec![0x0012_3456, 0x00FF_0001]);

    let image = RgbImage::from_pixel(3, 2, Rgb([0, 0, 255]));
    to_0rgb(&image, &mut buffer);
    assert_eq!(buffer.len(), 6);
  }
}
