use crate::{NodeIdGen, SourceMap, Span};

#[test]
fn span_cover_and_contains() {
    let a = Span::new(4, 10);
    let b = Span::new(8, 20);
    let c = a.cover(b);
    assert_eq!(c, Span::new(4, 20));
    assert!(c.contains(4));
    assert!(c.contains(19));
    assert!(!c.contains(20));
}

#[test]
fn empty_span_slices_nothing() {
    let s = Span::empty(3);
    assert!(s.is_empty());
    assert_eq!(&"abcdef"[s.range()], "");
}

#[test]
fn node_ids_are_dense() {
    let mut ids = NodeIdGen::new();
    let a = ids.fresh();
    let b = ids.fresh();
    assert_eq!(a.as_u32(), 0);
    assert_eq!(b.as_u32(), 1);
    assert_eq!(ids.count(), 2);
}

#[test]
fn source_map_lookup() {
    let mut map = SourceMap::new();
    let main = map.insert("main.wm", "let x = 1;");
    let lib = map.insert("lib.wm", "export let y = 2;");

    assert_eq!(map.get(main).path, "main.wm");
    assert_eq!(map.find("lib.wm"), Some(lib));
    assert_eq!(map.find("missing.wm"), None);
    assert_eq!(map.len(), 2);
}
