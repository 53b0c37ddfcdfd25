//! Tests for the capability adapters
//! 能力适配器测试

use aok::{OK, Void};
use log::trace;
use mapbench::{Error, KeyShape, Load, MapHandle, MapKind, build};

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

fn u64_map(kind: MapKind) -> mapbench::Result<Box<dyn MapHandle<u64, u64>>> {
  build::<u64, u64>(kind, KeyShape::U64, 0)
}

#[test]
fn test_put_remove_get() -> Void {
  for kind in MapKind::ALL {
    let mut m = u64_map(kind)?;
    assert_eq!(m.name(), kind.name());
    assert!(m.is_empty());
    for k in [5, 2, 8, 1, 6, 3, 7, 4] {
      assert!(!m.put(k, 1), "{kind}");
    }
    assert_eq!(m.len(), 8, "{kind}");
    for k in [3, 7, 1, 8] {
      assert!(m.remove(&k), "{kind}");
    }
    assert_eq!(m.len(), 4, "{kind}");
    assert_eq!(m.get(&3), None, "{kind}");
    assert_eq!(m.get(&2), Some(1), "{kind}");
    assert!(!m.remove(&3), "{kind}");

    // overwrite reports existence, size unchanged
    assert!(m.put(2, 9));
    assert_eq!(m.get(&2), Some(9));
    assert_eq!(m.len(), 4);
  }
  trace!("put/remove/get passed");
  OK
}

#[test]
fn test_round_trip_text() -> Void {
  let keys: Vec<String> = (0..1000).map(|i| format!("id-{i:05}")).collect();
  for kind in MapKind::ALL {
    let mut m = build::<String, u64>(kind, KeyShape::Text, 0)?;
    assert_eq!(m.shape(), KeyShape::Text);
    for (i, k) in keys.iter().enumerate() {
      m.put(k.clone(), i as u64);
    }
    assert_eq!(m.len(), keys.len());
    for (i, k) in keys.iter().enumerate() {
      assert_eq!(m.get(k), Some(i as u64), "{kind} {k}");
    }
    assert_eq!(m.get(&"absent".to_string()), None);
  }
  OK
}

#[test]
fn test_clear() -> Void {
  for kind in MapKind::ALL {
    let mut m = u64_map(kind)?;
    for k in 1..=100 {
      m.put(k, k);
    }
    m.clear();
    assert_eq!(m.len(), 0, "{kind}");
    assert!((1..=100).all(|k| m.get(&k).is_none()), "{kind}");
    m.clear();
    assert!(m.is_empty());
  }
  OK
}

#[test]
fn test_each() -> Void {
  for kind in MapKind::ALL {
    let mut m = u64_map(kind)?;

    let mut calls = 0;
    m.each(&mut |_, _| {
      calls += 1;
      false
    });
    assert_eq!(calls, 0, "{kind}");

    for k in 1..=50 {
      m.put(k, k * 2);
    }

    let mut sum = 0;
    let mut visited = 0;
    m.each(&mut |k, v| {
      assert_eq!(*v, k * 2);
      sum += k;
      visited += 1;
      false
    });
    assert_eq!(visited, 50, "{kind}");
    assert_eq!(sum, (1..=50).sum::<u64>());

    for stop_at in [1, 7] {
      let mut visited = 0;
      m.each(&mut |_, _| {
        visited += 1;
        visited == stop_at
      });
      assert_eq!(visited, stop_at, "{kind}");
    }
  }
  OK
}

#[test]
fn test_load() -> Void {
  for kind in MapKind::ALL {
    let mut m = u64_map(kind)?;
    for k in 1..=1000 {
      m.put(k, 1);
    }
    let load = m.load();
    match kind {
      MapKind::BTree | MapKind::DashMap => {
        assert_eq!(load, Load::UNKNOWN, "{kind}");
        assert_eq!(load.raw(), -1.0);
        assert_eq!(load.get(), None);
      }
      _ => {
        let v = load.get().expect("known load");
        assert!(v > 0.0 && v <= 1.0, "{kind}: {v}");
      }
    }
  }
  OK
}

#[test]
fn test_reserve_hint() -> Void {
  for kind in [
    MapKind::Std,
    MapKind::Hashbrown,
    MapKind::Rapid,
    MapKind::Shaped,
    MapKind::IndexMap,
  ] {
    let mut m = build::<u32, u64>(kind, KeyShape::U32, 10_000)?;
    for k in 1..=10 {
      m.put(k, 1);
    }
    let v = m.load().get().expect("known load");
    assert!(v <= 0.01, "{kind}: {v}");
  }

  // accepted and ignored
  let mut m = build::<u32, u64>(MapKind::BTree, KeyShape::U32, 10_000)?;
  m.put(1, 1);
  assert_eq!(m.len(), 1);
  OK
}

#[test]
fn test_shape_mismatch() -> Void {
  for kind in MapKind::ALL {
    assert!(matches!(
      build::<u32, u64>(kind, KeyShape::U64, 0),
      Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
      build::<String, u64>(kind, KeyShape::U32, 0),
      Err(Error::ShapeMismatch { .. })
    ));
  }
  OK
}
