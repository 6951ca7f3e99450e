//! Integration tests for deep copy
//!
//! Tests cover:
//! - Scalars, text and sequences copied into independent storage
//! - Hidden record fields reached through privileged grants
//! - Self-referential pointers and shared map values
//! - Absent and empty containers
//! - Opaque handles, callables and channels
//! - Failure paths (native objects) leaving the heap untouched

use std::any::Any;

use replica_engine::object::{Class, FixedArray, NativeObject};
use replica_engine::reflect::grant_by_name;
use replica_engine::value::{Complex, RawHandle};
use replica_engine::{classify, Category, CopyError, Runtime, Scalar, Value};

fn category(rt: &Runtime, value: &Value) -> Category {
    classify(value, rt.heap(), rt.classes()).unwrap()
}

#[derive(Debug)]
struct FileDescriptor(i32);

impl NativeObject for FileDescriptor {
    fn type_name(&self) -> &str {
        "FileDescriptor"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Basic copies
// ============================================================================

#[test]
fn test_copy_scalar() {
    let mut rt = Runtime::new();
    let source = Value::int(5);

    let copy = rt.deep_copy(&source).unwrap();
    assert_eq!(copy, Value::int(5));
    assert!(rt.heap().is_empty());
}

#[test]
fn test_copy_sequence_independent_of_source() {
    let mut rt = Runtime::new();
    let source = rt.alloc_slice(vec![Value::int(1), Value::int(2), Value::int(3)]);

    let copy = rt.deep_copy(&source).unwrap();
    rt.sequence_mut(&source).unwrap().set(0, Value::int(9)).unwrap();

    let copied: Vec<_> = rt.sequence(&copy).unwrap().iter().cloned().collect();
    assert_eq!(copied, vec![Value::int(1), Value::int(2), Value::int(3)]);
    assert_eq!(rt.sequence(&source).unwrap().get(0), Some(&Value::int(9)));
}

#[test]
fn test_copy_record_hidden_field() {
    let mut rt = Runtime::new();
    let class = rt.register_class(
        Class::new("Counter")
            .with_field("label")
            .with_hidden_field("count"),
    );
    let source = rt
        .instantiate(class, vec![Value::str("hits"), Value::int(42)])
        .unwrap();

    let copy = rt.deep_copy(&source).unwrap();
    let record = copy.as_record().unwrap();

    // Normal access cannot see the field at all
    assert_eq!(record.get(rt.classes(), "count"), None);
    assert_eq!(record.get(rt.classes(), "label"), Some(&Value::str("hits")));

    let grant = grant_by_name(rt.classes(), class, "count").unwrap();
    assert_eq!(grant.read(record).unwrap(), &Value::int(42));
}

#[test]
fn test_copy_self_pointer() {
    let mut rt = Runtime::new();
    let p = rt.alloc_ptr(Value::Nil);
    rt.store(&p, p.clone()).unwrap();

    let q = rt.deep_copy(&p).unwrap();
    assert_ne!(q, p);
    assert_eq!(rt.load(&q).unwrap(), &q);
    assert_eq!(rt.load(&p).unwrap(), &p);
}

#[test]
fn test_copy_map_with_shared_pointer() {
    let mut rt = Runtime::new();
    let x = rt.alloc_ptr(Value::int(7));
    let source = rt.alloc_map([(Value::str("a"), x.clone()), (Value::str("b"), x.clone())]);

    let copy = rt.deep_copy(&source).unwrap();
    let map = rt.map(&copy).unwrap();
    let a = map.get(&Value::str("a")).unwrap().clone();
    let b = map.get(&Value::str("b")).unwrap().clone();

    assert_eq!(a, b);
    assert_ne!(a, x);
    assert_eq!(rt.load(&a).unwrap(), &Value::int(7));
}

// ============================================================================
// Independence and topology
// ============================================================================

#[test]
fn test_mutating_source_leaves_copy_alone() {
    let mut rt = Runtime::new();
    let class = rt.register_class(Class::new("Node").with_field("items").with_hidden_field("next"));
    let items = rt.alloc_slice(vec![Value::i64(1), Value::i64(2)]);
    let next = rt.alloc_ptr(Value::f64(0.5));
    let source = rt.instantiate(class, vec![items.clone(), next.clone()]).unwrap();

    let copy = rt.deep_copy(&source).unwrap();

    rt.sequence_mut(&items).unwrap().set(1, Value::i64(99)).unwrap();
    rt.store(&next, Value::f64(-1.0)).unwrap();

    let record = copy.as_record().unwrap();
    let copied_items = record.get(rt.classes(), "items").unwrap().clone();
    let copied_next = grant_by_name(rt.classes(), class, "next")
        .unwrap()
        .read(record)
        .unwrap()
        .clone();

    assert_eq!(rt.sequence(&copied_items).unwrap().get(1), Some(&Value::i64(2)));
    assert_eq!(rt.load(&copied_next).unwrap(), &Value::f64(0.5));

    // And the other way round
    rt.store(&copied_next, Value::f64(3.0)).unwrap();
    assert_eq!(rt.load(&next).unwrap(), &Value::f64(-1.0));
}

#[test]
fn test_shared_sequence_copied_once() {
    let mut rt = Runtime::new();
    let shared = rt.alloc_slice(vec![Value::int(1)]);
    let outer = rt.alloc_slice(vec![shared.clone(), shared.clone(), shared]);

    let (copy, stats) = rt.deep_copy_with_stats(&outer).unwrap();
    let seq = rt.sequence(&copy).unwrap();

    assert_eq!(seq.get(0), seq.get(1));
    assert_eq!(seq.get(1), seq.get(2));
    assert_eq!(stats.identities, 2);
    assert_eq!(stats.shared_hits, 2);
    assert_eq!(stats.allocations, 2);
}

#[test]
fn test_cycle_through_record_and_pointer() {
    let mut rt = Runtime::new();
    let class = rt.register_class(Class::new("Link").with_field("value").with_hidden_field("next"));

    // a -> b -> a, each pointee a record
    let a = rt.alloc_ptr(Value::Nil);
    let b = rt.alloc_ptr(Value::Nil);
    let rec_a = rt.instantiate(class, vec![Value::int(1), b.clone()]).unwrap();
    let rec_b = rt.instantiate(class, vec![Value::int(2), a.clone()]).unwrap();
    rt.store(&a, rec_a).unwrap();
    rt.store(&b, rec_b).unwrap();

    let (a2, stats) = rt.deep_copy_with_stats(&a).unwrap();
    assert_eq!(stats.identities, 2);

    let next = grant_by_name(rt.classes(), class, "next").unwrap();
    let b2 = next.read(rt.load(&a2).unwrap().as_record().unwrap()).unwrap().clone();
    let back = next.read(rt.load(&b2).unwrap().as_record().unwrap()).unwrap().clone();

    assert_eq!(back, a2);
    assert_ne!(a2, a);
    assert_ne!(b2, b);
}

#[test]
fn test_long_pointer_ring() {
    let mut rt = Runtime::new();
    let head = rt.alloc_ptr(Value::Nil);
    let mut prev = head.clone();
    for _ in 1..500 {
        let next = rt.alloc_ptr(Value::Nil);
        rt.store(&prev, next.clone()).unwrap();
        prev = next;
    }
    rt.store(&prev, head.clone()).unwrap();

    let (copy, stats) = rt.deep_copy_with_stats(&head).unwrap();
    assert_eq!(stats.identities, 500);
    assert_eq!(stats.shared_hits, 1);

    let mut cursor = copy.clone();
    for _ in 0..500 {
        cursor = rt.load(&cursor).unwrap().clone();
    }
    assert_eq!(cursor, copy);
}

#[test]
fn test_shape_and_category_preserved() {
    let mut rt = Runtime::new();
    let class = rt.register_class(Class::new("Pair").with_field("l").with_field("r"));
    let closure = rt.alloc_closure(3, vec![Value::int(1)]);
    let block = rt.malloc(16).unwrap();
    let slice = rt.alloc_slice_with_capacity(vec![Value::bool(true)], 8);
    let map = rt.alloc_map([(Value::int(1), Value::str("one"))]);
    let chan = rt.alloc_chan(4);
    let ptr = rt.alloc_ptr(Value::int(0));
    let record = rt.instantiate(class, vec![Value::int(1), Value::int(2)]).unwrap();

    let values = vec![
        Value::Scalar(Scalar::U8(7)),
        Value::Scalar(Scalar::Complex128(Complex::new(1.0, -1.0))),
        Value::str("text"),
        Value::Array(FixedArray::new(vec![Value::int(1), Value::str("x")])),
        slice.clone(),
        map.clone(),
        chan,
        ptr,
        record,
        Value::Address(0xdead_beef),
        block,
        closure,
    ];

    for value in &values {
        let copy = rt.deep_copy(value).unwrap();
        assert_eq!(category(&rt, &copy), category(&rt, value), "category of {:?}", value);
    }

    let slice_copy = rt.deep_copy(&slice).unwrap();
    let (src, dst) = (
        rt.sequence(&slice).unwrap().header(),
        rt.sequence(&slice_copy).unwrap().header(),
    );
    assert!(src.same_shape(&dst));
    assert_ne!(src.data, dst.data);

    let map_copy = rt.deep_copy(&map).unwrap();
    assert_eq!(rt.map(&map_copy).unwrap().len(), rt.map(&map).unwrap().len());
}

#[test]
fn test_absent_and_empty_values() {
    let mut rt = Runtime::new();

    let absent_values = [
        Value::Nil,
        Value::Ptr(None),
        Value::Slice(None),
        Value::Map(None),
        Value::Chan(None),
        Value::Func(None),
    ];
    for absent in absent_values {
        let (copy, stats) = rt.deep_copy_with_stats(&absent).unwrap();
        assert_eq!(copy, absent);
        assert_eq!(stats.identities, 0);
    }
    assert!(rt.heap().is_empty());

    let empty_slice = rt.alloc_slice(Vec::new());
    let empty_map = rt.alloc_map(Vec::<(Value, Value)>::new());

    let slice_copy = rt.deep_copy(&empty_slice).unwrap();
    let map_copy = rt.deep_copy(&empty_map).unwrap();
    assert!(rt.sequence(&slice_copy).unwrap().is_empty());
    assert!(rt.map(&map_copy).unwrap().is_empty());
    assert_ne!(slice_copy, empty_slice);
    assert_ne!(map_copy, empty_map);
}

// ============================================================================
// Category specifics
// ============================================================================

#[test]
fn test_text_storage_not_aliased() {
    let mut rt = Runtime::new();
    let source = Value::str("shared bytes");

    let copy = rt.deep_copy(&source).unwrap();
    let (src, dst) = (source.as_text().unwrap(), copy.as_text().unwrap());
    assert_eq!(src, dst);
    assert!(!src.shares_storage(dst));
    assert_eq!(src.header().len, dst.header().len);
    assert_ne!(src.header().data, dst.header().data);
}

#[test]
fn test_opaque_handles_copied_verbatim() {
    let mut rt = Runtime::new();
    let raw = rt.malloc(32).unwrap();
    let live = rt.heap().len();

    assert_eq!(rt.deep_copy(&raw).unwrap(), raw);
    assert_eq!(rt.deep_copy(&Value::Address(0x1000)).unwrap(), Value::Address(0x1000));
    assert_eq!(
        rt.deep_copy(&Value::RawPtr(RawHandle::NULL)).unwrap(),
        Value::RawPtr(RawHandle::NULL)
    );
    assert_eq!(rt.heap().len(), live);
}

#[test]
fn test_callable_shares_captures() {
    let mut rt = Runtime::new();
    let captured = rt.alloc_ptr(Value::int(1));
    let func = rt.alloc_closure(9, vec![captured]);

    let (copy, stats) = rt.deep_copy_with_stats(&func).unwrap();
    assert_eq!(copy, func);
    assert_eq!(stats.allocations, 0);
}

#[test]
fn test_channel_copy_is_empty_with_same_capacity() {
    let mut rt = Runtime::new();
    let chan = rt.alloc_chan(3);
    rt.channel_mut(&chan).unwrap().try_send(Value::int(1)).unwrap();
    rt.channel_mut(&chan).unwrap().close();

    let pair = Value::Array(FixedArray::new(vec![chan.clone(), chan.clone()]));
    let copy = rt.deep_copy(&pair).unwrap();
    let elements: Vec<_> = copy.as_array().unwrap().iter().cloned().collect();

    assert_eq!(elements[0], elements[1]);
    assert_ne!(elements[0], chan);

    let copied = rt.channel_mut(&elements[0]).unwrap();
    assert_eq!(copied.capacity(), 3);
    assert!(copied.is_empty());
    assert!(!copied.is_closed());
    assert_eq!(rt.channel_mut(&chan).unwrap().len(), 1);
}

#[test]
fn test_map_keys_are_copied() {
    let mut rt = Runtime::new();
    let key_ptr = rt.alloc_ptr(Value::str("key"));
    let map = rt.alloc_map([
        (key_ptr.clone(), Value::int(1)),
        (Value::str("plain"), key_ptr.clone()),
    ]);

    let copy = rt.deep_copy(&map).unwrap();
    let entries = rt.map(&copy).unwrap().entries();
    assert_eq!(entries.len(), 2);

    let copied_key = entries
        .iter()
        .find(|(_, v)| *v == Value::int(1))
        .map(|(k, _)| k.clone())
        .unwrap();
    let copied_value = rt.map(&copy).unwrap().get(&Value::str("plain")).unwrap().clone();

    // Key and value referred to one pointer; so do their copies
    assert_eq!(copied_key, copied_value);
    assert_ne!(copied_key, key_ptr);
    assert_eq!(rt.load(&copied_key).unwrap(), &Value::str("key"));
}

#[test]
fn test_map_containing_itself() {
    let mut rt = Runtime::new();
    let map = rt.alloc_map(Vec::<(Value, Value)>::new());
    rt.map_mut(&map).unwrap().insert(Value::str("self"), map.clone());

    let copy = rt.deep_copy(&map).unwrap();
    assert_ne!(copy, map);
    assert_eq!(rt.map(&copy).unwrap().get(&Value::str("self")), Some(&copy));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_native_object_is_unsupported() {
    let mut rt = Runtime::new();
    let fd = rt.alloc_native(Box::new(FileDescriptor(3)));

    let err = rt.deep_copy(&fd).unwrap_err();
    assert_eq!(
        err,
        CopyError::UnsupportedCategory {
            type_name: "FileDescriptor".to_string()
        }
    );
    assert!(err.to_string().contains("FileDescriptor"));
}

#[test]
fn test_failed_copy_leaves_no_partial_result() {
    let mut rt = Runtime::new();
    let fd = rt.alloc_native(Box::new(FileDescriptor(4)));
    let inner = rt.alloc_ptr(Value::int(1));
    let source = rt.alloc_slice(vec![inner, Value::Map(None), fd]);
    let before = rt.heap().stats();

    let err = rt.deep_copy(&source).unwrap_err();
    assert!(matches!(err, CopyError::UnsupportedCategory { .. }));

    let after = rt.heap().stats();
    assert_eq!(after.live_objects, before.live_objects);
    assert_eq!(after.allocated_bytes, before.allocated_bytes);
}

#[test]
fn test_unregistered_class_is_unsupported() {
    let mut rt = Runtime::new();
    let orphan = Value::Record(replica_engine::Record::new(17, vec![Value::int(1)]));

    let err = rt.deep_copy(&orphan).unwrap_err();
    assert_eq!(err, CopyError::unsupported("class#17"));
}

#[test]
fn test_record_with_extra_slots_is_rejected() {
    let mut rt = Runtime::new();
    let id = rt.register_class(Class::new("Single").with_field("only"));
    let inner = rt.alloc_ptr(Value::int(9));
    let oversized = Value::Record(replica_engine::Record::new(
        id,
        vec![inner, Value::int(2), Value::int(3)],
    ));
    let before = rt.heap().stats();

    let err = rt.deep_copy(&oversized).unwrap_err();
    assert!(matches!(err, CopyError::ContractViolation(_)));
    assert!(err.to_string().contains("Single"));
    assert_eq!(rt.heap().stats().live_objects, before.live_objects);
}

#[test]
fn test_native_downcast_survives_failed_copy() {
    let mut rt = Runtime::new();
    let fd = rt.alloc_native(Box::new(FileDescriptor(5)));
    assert!(rt.deep_copy(&fd).is_err());

    let native = rt.heap().native(fd.gc_ref().unwrap()).unwrap();
    let inner = native.as_any().downcast_ref::<FileDescriptor>().unwrap();
    assert_eq!(inner.0, 5);
}
