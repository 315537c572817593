// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 标签文件加载
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

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 类别编号不在标签表中
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("标签表中不存在类别 {0}")]
pub struct LabelLookupMiss(pub u32);

/// 类别编号到名称的映射，加载后不再修改
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
  labels: BTreeMap<u32, String>,
}

impl LabelMap {
  pub fn get(&self, id: u32) -> Result<&str, LabelLookupMiss> {
    self
      .labels
      .get(&id)
      .map(String::as_str)
      .ok_or(LabelLookupMiss(id))
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
    self.labels.iter().map(|(id, name)| (*id, name.as_str()))
  }
}

impl FromIterator<(u32, String)> for LabelMap {
  fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
    Self {
      labels: iter.into_iter().collect(),
    }
  }
}

/// 读取标签文件，支持带编号（`0 person`、`0: person`）和不带编号两种格式
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<LabelMap, LabelError> {
  let path = path.as_ref();
  info!("加载标签文件: {}", path.display());
  let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let labels = parse_labels(&text);
  info!("标签加载完成，共 {} 个类别", labels.len());
  Ok(labels)
}

pub fn parse_labels(text: &str) -> LabelMap {
  text
    .lines()
    .enumerate()
    .filter_map(|(row, line)| parse_line(row as u32, line))
    .inspect(|(id, name)| debug!("标签 {} => {}", id, name))
    .collect()
}

// 按第一段由 ':' 和空白组成的分隔符切成两段
fn parse_line(row: u32, line: &str) -> Option<(u32, String)> {
  let line = line.trim();
  let split = line
    .find(|c: char| c == ':' || c.is_whitespace())
    .map(|start| {
      let rest = &line[start..];
      let sep_len = rest
        .find(|c: char| c != ':' && !c.is_whitespace())
        .unwrap_or(rest.len());
      (&line[..start], &rest[sep_len..])
    });

  match split {
    Some((head, tail)) if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) => {
      match head.parse::<u32>() {
        Ok(id) => Some((id, tail.trim().to_string())),
        Err(e) => {
          warn!("第 {} 行的类别编号 {} 无效 ({}), 跳过该行", row + 1, head, e);
          None
        }
      }
    }
    Some((head, _)) => Some((row, head.to_string())),
    None => Some((row, line.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn as_pairs(labels: &LabelMap) -> Vec<(u32, String)> {
    labels
      .iter()
      .map(|(id, name)| (id, name.to_string()))
      .collect()
  }

  #[test]
  fn indexed_labels() {
    let labels = parse_labels("0 person\n1 bicycle\n");
    assert_eq!(
      as_pairs(&labels),
      vec![(0, "person".to_string()), (1, "bicycle".to_string())]
    );
  }

  #[test]
  fn positional_labels() {
    let labels = parse_labels("person\nbicycle\n");
    assert_eq!(labels.get(0), Ok("person"));
    assert_eq!(labels.get(1), Ok("bicycle"));
    assert_eq!(labels.len(), 2);
  }

  #[test]
  fn colon_separated_and_sparse_ids() {
    let labels = parse_labels("0: person\n2:  car\n  5   traffic light  \n");
    assert_eq!(labels.get(0), Ok("person"));
    assert_eq!(labels.get(2), Ok("car"));
    assert_eq!(labels.get(5), Ok("traffic light"));
    assert_eq!(labels.get(1), Err(LabelLookupMiss(1)));
  }

  #[test]
  fn non_numeric_prefix_falls_back_to_row() {
    // 第一段不是数字时只取第一段作为名称
    let labels = parse_labels("???\nteddy bear\n");
    assert_eq!(labels.get(0), Ok("???"));
    assert_eq!(labels.get(1), Ok("teddy"));
  }

  #[test]
  fn number_without_name_is_positional() {
    let labels = parse_labels("person\n42\n");
    assert_eq!(labels.get(1), Ok("42"));

    let labels = parse_labels("7:");
    assert_eq!(labels.get(7), Ok(""));
  }

  #[test]
  fn out_of_range_index_is_skipped() {
    let labels = parse_labels("0 person\n4294967296 giant\n2 car\n");
    assert_eq!(labels.len(), 2);
    assert_eq!(labels.get(0), Ok("person"));
    assert_eq!(labels.get(1), Err(LabelLookupMiss(1)));
    assert_eq!(labels.get(2), Ok("car"));
    assert!(labels.iter().all(|(_, name)| name != "4294967296"));
  }

  #[test]
  fn blank_lines_keep_their_slot() {
    let labels = parse_labels("person\n\nbicycle");
    assert_eq!(labels.get(1), Ok(""));
    assert_eq!(labels.get(2), Ok("bicycle"));
  }

  #[test]
  fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("shanan-lite-no-such-labels.txt");
    let err = load_labels(&path).unwrap_err();
    match err {
      LabelError::Io { path: p, source } => {
        assert_eq!(p, path);
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
      }
    }
  }

  #[test]
  fn load_from_file() {
    let path = std::env::temp_dir().join(format!("shanan-lite-labels-{}.txt", std::process::id()));
    std::fs::write(&path, "0 person\n1 bicycle\n").unwrap();
    let labels = load_labels(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(labels.get(0), Ok("person"));
    assert_eq!(labels.get(1), Ok("bicycle"));
  }
}
