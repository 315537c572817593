// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use shanan_lite::{
  input::{FrameSource, V4lInput},
  label::load_labels,
  model::{SsdDetector, TfliteBuilder},
  output::{
    Draw, LabelMissPolicy, WindowOutput,
    draw::{embedded_font, load_font},
  },
  task::{ContinuousTask, Task},
};

const WINDOW_TITLE: &str = "detection result";

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model.display());
  info!("标签文件路径: {}", args.labels.display());
  info!("置信度阈值: {}", args.threshold);
  info!("摄像头设备: {}", args.device);

  let labels = load_labels(&args.labels)?;

  let engine = TfliteBuilder::new(&args.model)
    .threads(args.threads)
    .build()
    .context("模型加载失败")?;
  let detector = SsdDetector::new(engine, args.threshold)?;

  let font = match &args.font {
    Some(path) => load_font(path)?,
    None => embedded_font()?,
  };
  let miss_policy = if args.strict_labels {
    LabelMissPolicy::Error
  } else {
    LabelMissPolicy::Placeholder
  };
  let draw = Draw::new(font).with_miss_policy(miss_policy);

  let camera = V4lInput::open(&args.device, args.width, args.height).context("无法打开摄像头")?;
  let (width, height) = camera.dimensions();
  let window = WindowOutput::open(WINDOW_TITLE, width, height)?;

  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .context("无法设置 Ctrl-C 处理")?;

  let summary = ContinuousTask::new(labels, draw)
    .with_frame_number(args.max_frames)
    .with_interrupt(rx)
    .run_task(camera, detector, window)?;

  info!(
    "处理完成: {} 帧, {} 个检测, {:?}",
    summary.frames, summary.detections, summary.reason
  );
  Ok(())
}
