// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use shanan_lite::model::DEFAULT_THRESHOLD;

/// Shanan Lite 摄像头目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// TFLite 模型文件路径（SSD 后处理输出）
  #[arg(long, value_name = "FILE")]
  pub model: PathBuf,

  /// 标签文件路径，每行一个标签，可带 `<编号>:` 或 `<编号> ` 前缀
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_name = "THRESHOLD", value_parser = parse_threshold)]
  pub threshold: f32,

  /// V4L2 摄像头设备
  #[arg(long, default_value = "/dev/video0", value_name = "DEVICE")]
  pub device: String,

  /// 请求的采集宽度
  #[arg(long, default_value_t = 640, value_name = "PIXELS")]
  pub width: u32,

  /// 请求的采集高度
  #[arg(long, default_value_t = 480, value_name = "PIXELS")]
  pub height: u32,

  /// 标签字体文件，未指定时使用内置字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 推理线程数
  #[arg(long, default_value_t = 1, value_name = "COUNT")]
  pub threads: i32,

  /// 类别不在标签文件中时报错退出，而不是使用占位标签
  #[arg(long)]
  pub strict_labels: bool,

  /// 最大处理帧数，不指定表示无限制
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,
}

fn parse_threshold(s: &str) -> Result<f32, String> {
  let value: f32 = s.parse().map_err(|e| format!("{}", e))?;
  if (0.0..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(format!("阈值 {} 不在 [0, 1] 范围内", value))
  }
}
