//! Run configuration from environment variables
//! 从环境变量读取的运行配置

use std::{env, path::PathBuf, str::FromStr};

use crate::{
  error::{Error, Result},
  map::{KeyShape, MapKind},
  workload::SEED,
};

pub const RANGES: [usize; 7] = [50_000, 100_000, 200_000, 400_000, 600_000, 800_000, 1_000_000];
pub const REPEAT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conf {
  /// Element counts, in run order
  /// 元素数量，按运行顺序
  pub ranges: Vec<usize>,
  pub maps: Vec<MapKind>,
  pub shapes: Vec<KeyShape>,
  pub seed: u64,
  /// Repetitions per (scenario, map, size)
  /// 每个 (场景, 实现, 规模) 的重复次数
  pub repeat: usize,
  /// JSON-lines destination, stdout when `None`
  /// JSON 行输出路径，`None` 时为标准输出
  pub out: Option<PathBuf>,
}

impl Default for Conf {
  fn default() -> Self {
    Self {
      ranges: RANGES.to_vec(),
      maps: MapKind::ALL.to_vec(),
      shapes: KeyShape::ALL.to_vec(),
      seed: SEED,
      repeat: REPEAT,
      out: None,
    }
  }
}

impl Conf {
  /// Read `RANGES`, `MAPS`, `SHAPES`, `SEED`, `REPEAT`, `OUT`
  /// 读取 `RANGES`、`MAPS`、`SHAPES`、`SEED`、`REPEAT`、`OUT`
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Same as [`Conf::from_env`] over an arbitrary lookup
  /// 与 [`Conf::from_env`] 相同，但使用任意查找函数
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let d = Self::default();
    let conf = Self {
      ranges: list_or_default(&get, "RANGES", d.ranges, |s| parse_num("RANGES", s))?,
      maps: list_or_default(&get, "MAPS", d.maps, MapKind::from_str)?,
      shapes: list_or_default(&get, "SHAPES", d.shapes, KeyShape::from_str)?,
      seed: get_or_default(&get, "SEED", d.seed)?,
      repeat: get_or_default(&get, "REPEAT", d.repeat)?,
      out: get("OUT").filter(|s| !s.trim().is_empty()).map(PathBuf::from),
    };
    if conf.repeat == 0 {
      return Err(Error::InvalidEnv {
        name: "REPEAT",
        value: "0".into(),
      });
    }
    Ok(conf)
  }
}

fn parse_num<T: FromStr>(name: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::InvalidEnv {
    name,
    value: s.into(),
  })
}

fn get_or_default<T: FromStr>(
  get: &impl Fn(&str) -> Option<String>,
  name: &'static str,
  default: T,
) -> Result<T> {
  match get(name) {
    Some(val) if !val.trim().is_empty() => parse_num(name, val.trim()),
    _ => Ok(default),
  }
}

/// Space-separated list; unset keeps the default, set-but-blank is an error
/// 空格分隔的列表；未设置时用默认值，设置为空白则报错
fn list_or_default<T>(
  get: &impl Fn(&str) -> Option<String>,
  name: &'static str,
  default: Vec<T>,
  parse: impl Fn(&str) -> Result<T>,
) -> Result<Vec<T>> {
  let Some(val) = get(name) else {
    return Ok(default);
  };
  let items = val.split_whitespace().map(parse).collect::<Result<Vec<T>>>()?;
  if items.is_empty() {
    return Err(Error::Empty(name));
  }
  Ok(items)
}
