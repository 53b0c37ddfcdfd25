//! Capability adapter: one operation set over heterogeneous map implementations
//! 能力适配器：为异构映射实现提供统一操作集

use std::{
  collections::{BTreeMap, HashMap},
  fmt::{self, Debug, Display},
  hash::{BuildHasher, Hash},
  str::FromStr,
};

use dashmap::DashMap;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use log::trace;
use rapidhash::RapidHashMap;
use serde::Serialize;

use crate::error::{Error, Result};

/// Key domain: decides hashing/storage specialization
/// 键的值域：决定哈希/存储特化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyShape {
  U32,
  U64,
  Text,
}

impl KeyShape {
  pub const ALL: [KeyShape; 3] = [Self::U32, Self::U64, Self::Text];

  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::U32 => "u32",
      Self::U64 => "u64",
      Self::Text => "text",
    }
  }

  /// Fixed-width integer shape
  /// 定长整数形状
  #[inline]
  #[must_use]
  pub const fn is_int(self) -> bool {
    matches!(self, Self::U32 | Self::U64)
  }
}

impl Display for KeyShape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for KeyShape {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|shape| shape.name().eq_ignore_ascii_case(s))
      .ok_or_else(|| Error::UnknownShape(s.to_string()))
  }
}

/// Key types usable by the harness
/// 基准框架可用的键类型
pub trait Key: Clone + Eq + Hash + Ord + Debug + 'static {
  const SHAPE: KeyShape;
}

impl Key for u32 {
  const SHAPE: KeyShape = KeyShape::U32;
}

impl Key for u64 {
  const SHAPE: KeyShape = KeyShape::U64;
}

impl Key for String {
  const SHAPE: KeyShape = KeyShape::Text;
}

/// Load factor, or the `-1` sentinel when the implementation cannot report it
/// 负载因子；实现无法报告时为哨兵值 `-1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Load(f32);

impl Load {
  pub const UNKNOWN: Load = Load(-1.0);

  /// Live entries over allocated capacity
  /// 存活条目数 / 已分配容量
  #[must_use]
  pub fn ratio(len: usize, cap: usize) -> Self {
    if cap == 0 {
      return Load(0.0);
    }
    Self::known(len as f64 / cap as f64)
  }

  /// Known utilization, clamped to [0, 1]
  /// 已知利用率，截断到 [0, 1]
  #[must_use]
  pub fn known(v: f64) -> Self {
    Load(v.clamp(0.0, 1.0) as f32)
  }

  #[inline]
  #[must_use]
  pub fn is_known(self) -> bool {
    self.0 >= 0.0
  }

  #[inline]
  #[must_use]
  pub fn get(self) -> Option<f32> {
    self.is_known().then_some(self.0)
  }

  /// Raw value as exported (sentinel included)
  /// 导出用的原始值（包含哨兵）
  #[inline]
  #[must_use]
  pub fn raw(self) -> f32 {
    self.0
  }
}

impl Display for Load {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.get() {
      Some(v) => write!(f, "{v:.3}"),
      None => f.write_str("unknown"),
    }
  }
}

/// Uniform operation set over one concrete map
/// 单个具体映射实现上的统一操作集
pub trait MapHandle<K, V> {
  /// Insert or overwrite; returns whether the key existed
  /// 插入或覆盖；返回键是否已存在
  fn put(&mut self, key: K, val: V) -> bool;

  fn get(&self, key: &K) -> Option<V>;

  /// Returns whether the key existed
  /// 返回键是否存在
  fn remove(&mut self, key: &K) -> bool;

  /// Visit live entries in implementation order; `visit` returning `true` stops the walk
  /// 按实现顺序遍历存活条目；`visit` 返回 `true` 时停止
  fn each(&self, visit: &mut dyn FnMut(&K, &V) -> bool);

  /// Capacity hint, no-op where unsupported
  /// 容量提示，不支持时为空操作
  fn reserve(&mut self, _additional: usize) {}

  fn clear(&mut self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn load(&self) -> Load {
    Load::UNKNOWN
  }

  fn shape(&self) -> KeyShape;

  fn name(&self) -> &'static str;
}

/// Implementations the harness knows how to build
/// 基准框架可构建的实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
  Std,
  Hashbrown,
  Rapid,
  Shaped,
  IndexMap,
  BTree,
  DashMap,
}

impl MapKind {
  pub const ALL: [MapKind; 7] = [
    Self::Std,
    Self::Hashbrown,
    Self::Rapid,
    Self::Shaped,
    Self::IndexMap,
    Self::BTree,
    Self::DashMap,
  ];

  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::Std => "std",
      Self::Hashbrown => "hashbrown",
      Self::Rapid => "rapidhash",
      Self::Shaped => "shaped",
      Self::IndexMap => "indexmap",
      Self::BTree => "btree",
      Self::DashMap => "dashmap",
    }
  }
}

impl Display for MapKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for MapKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.name() == s)
      .ok_or_else(|| Error::UnknownMap(s.to_string()))
  }
}

/// Adapter binding one container to a key shape and a label
/// 将单个容器与键形状和名称绑定的适配器
pub struct Adapter<M> {
  map: M,
  shape: KeyShape,
  name: &'static str,
}

impl<M> Adapter<M> {
  pub fn new(name: &'static str, shape: KeyShape, map: M) -> Self {
    Self { map, shape, name }
  }
}

// std and hashbrown expose the same surface
macro_rules! impl_hash_handle {
  ($($map:ident)::+) => {
    impl<K, V, S> MapHandle<K, V> for Adapter<$($map)::+<K, V, S>>
    where
      K: Key,
      V: Clone,
      S: BuildHasher,
    {
      #[inline]
      fn put(&mut self, key: K, val: V) -> bool {
        self.map.insert(key, val).is_some()
      }

      #[inline]
      fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).cloned()
      }

      #[inline]
      fn remove(&mut self, key: &K) -> bool {
        self.map.remove(key).is_some()
      }

      fn each(&self, visit: &mut dyn FnMut(&K, &V) -> bool) {
        for (k, v) in self.map.iter() {
          if visit(k, v) {
            return;
          }
        }
      }

      fn reserve(&mut self, additional: usize) {
        self.map.reserve(additional);
      }

      fn clear(&mut self) {
        self.map.clear();
      }

      #[inline]
      fn len(&self) -> usize {
        self.map.len()
      }

      fn load(&self) -> Load {
        Load::ratio(self.map.len(), self.map.capacity())
      }

      fn shape(&self) -> KeyShape {
        self.shape
      }

      fn name(&self) -> &'static str {
        self.name
      }
    }
  };
}

impl_hash_handle!(HashMap);
impl_hash_handle!(hashbrown::HashMap);

impl<K, V, S> MapHandle<K, V> for Adapter<IndexMap<K, V, S>>
where
  K: Key,
  V: Clone,
  S: BuildHasher,
{
  #[inline]
  fn put(&mut self, key: K, val: V) -> bool {
    self.map.insert(key, val).is_some()
  }

  #[inline]
  fn get(&self, key: &K) -> Option<V> {
    self.map.get(key).cloned()
  }

  #[inline]
  fn remove(&mut self, key: &K) -> bool {
    self.map.swap_remove(key).is_some()
  }

  fn each(&self, visit: &mut dyn FnMut(&K, &V) -> bool) {
    for (k, v) in self.map.iter() {
      if visit(k, v) {
        return;
      }
    }
  }

  fn reserve(&mut self, additional: usize) {
    self.map.reserve(additional);
  }

  fn clear(&mut self) {
    self.map.clear();
  }

  #[inline]
  fn len(&self) -> usize {
    self.map.len()
  }

  fn load(&self) -> Load {
    Load::ratio(self.map.len(), self.map.capacity())
  }

  fn shape(&self) -> KeyShape {
    self.shape
  }

  fn name(&self) -> &'static str {
    self.name
  }
}

// Ordered tree: no capacity notion, so reserve is a no-op and load is unknown
impl<K, V> MapHandle<K, V> for Adapter<BTreeMap<K, V>>
where
  K: Key,
  V: Clone,
{
  #[inline]
  fn put(&mut self, key: K, val: V) -> bool {
    self.map.insert(key, val).is_some()
  }

  #[inline]
  fn get(&self, key: &K) -> Option<V> {
    self.map.get(key).cloned()
  }

  #[inline]
  fn remove(&mut self, key: &K) -> bool {
    self.map.remove(key).is_some()
  }

  fn each(&self, visit: &mut dyn FnMut(&K, &V) -> bool) {
    for (k, v) in self.map.iter() {
      if visit(k, v) {
        return;
      }
    }
  }

  fn clear(&mut self) {
    self.map.clear();
  }

  #[inline]
  fn len(&self) -> usize {
    self.map.len()
  }

  fn shape(&self) -> KeyShape {
    self.shape
  }

  fn name(&self) -> &'static str {
    self.name
  }
}

// Sharded concurrent map: no growth hint, per-shard capacity is not a utilization figure
impl<K, V, S> MapHandle<K, V> for Adapter<DashMap<K, V, S>>
where
  K: Key,
  V: Clone,
  S: BuildHasher + Clone,
{
  #[inline]
  fn put(&mut self, key: K, val: V) -> bool {
    self.map.insert(key, val).is_some()
  }

  #[inline]
  fn get(&self, key: &K) -> Option<V> {
    self.map.get(key).map(|r| r.value().clone())
  }

  #[inline]
  fn remove(&mut self, key: &K) -> bool {
    self.map.remove(key).is_some()
  }

  fn each(&self, visit: &mut dyn FnMut(&K, &V) -> bool) {
    for r in self.map.iter() {
      if visit(r.key(), r.value()) {
        return;
      }
    }
  }

  fn clear(&mut self) {
    self.map.clear();
  }

  #[inline]
  fn len(&self) -> usize {
    self.map.len()
  }

  fn shape(&self) -> KeyShape {
    self.shape
  }

  fn name(&self) -> &'static str {
    self.name
  }
}

/// Build a fresh handle for `kind`.
/// 为 `kind` 构建新的句柄。
///
/// `shape` is resolved here once: `Shaped` picks FNV for integer keys and rapidhash for text.
/// A non-zero `reserve` is passed to the container as a capacity hint.
///
/// `shape` 在此处一次性解析：`Shaped` 对整数键选 FNV，对文本键选 rapidhash。
/// 非零 `reserve` 作为容量提示传给容器。
pub fn build<K, V>(kind: MapKind, shape: KeyShape, reserve: usize) -> Result<Box<dyn MapHandle<K, V>>>
where
  K: Key,
  V: Clone + 'static,
{
  if shape != K::SHAPE {
    return Err(Error::ShapeMismatch {
      expected: shape,
      actual: K::SHAPE,
    });
  }

  let name = kind.name();
  let mut handle: Box<dyn MapHandle<K, V>> = match kind {
    MapKind::Std => Box::new(Adapter::new(name, shape, HashMap::<K, V>::new())),
    MapKind::Hashbrown => Box::new(Adapter::new(name, shape, hashbrown::HashMap::<K, V>::new())),
    MapKind::Rapid => Box::new(Adapter::new(name, shape, RapidHashMap::<K, V>::default())),
    MapKind::Shaped => {
      if shape.is_int() {
        Box::new(Adapter::new(name, shape, FnvHashMap::<K, V>::default()))
      } else {
        Box::new(Adapter::new(name, shape, RapidHashMap::<K, V>::default()))
      }
    }
    MapKind::IndexMap => Box::new(Adapter::new(name, shape, IndexMap::<K, V>::new())),
    MapKind::BTree => Box::new(Adapter::new(name, shape, BTreeMap::<K, V>::new())),
    MapKind::DashMap => Box::new(Adapter::new(name, shape, DashMap::<K, V>::new())),
  };

  if reserve > 0 {
    handle.reserve(reserve);
  }
  trace!("built {name} for {shape} keys, reserve={reserve}");
  Ok(handle)
}
