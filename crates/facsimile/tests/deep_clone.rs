use chrono::{TimeZone, Utc, Weekday};
use facsimile::{CloneError, Cloner};
use facsimile_heap::{
    Annotation, ArrayData, Body, Calendar, ClassBuilder, ClassRef, Comparator, FieldType, ObjRef,
    Value, builtins,
};
use num_bigint::BigInt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn node_class() -> ClassRef {
    ClassBuilder::new("Node")
        .field("value", FieldType::INT)
        .field("next", FieldType::Reference)
        .build()
}

fn node(class: &ClassRef, value: i32) -> ObjRef {
    let n = ObjRef::allocate_zeroed(class).unwrap();
    n.set_field("value", value).unwrap();
    n
}

fn object(value: Value) -> ObjRef {
    match value {
        Value::Ref(obj) => obj,
        other => panic!("expected an object, got {}", other.kind_name()),
    }
}

fn ints(values: impl IntoIterator<Item = Value>) -> Vec<i32> {
    values.into_iter().filter_map(|v| v.as_int()).collect()
}

#[test]
fn test_enum_constants_are_returned_as_is() {
    let cloner = Cloner::new();
    let color = ClassBuilder::enumeration("Color", ["RED", "GREEN"]).build();
    let red = ObjRef::enum_constant(&color, "RED").unwrap();
    assert!(cloner.deep_clone_ref(&red).unwrap().ptr_eq(&red));
}

#[test]
fn test_immutables_are_returned_as_is() {
    let cloner = Cloner::new();
    let big = builtins::big_integer(BigInt::from(42));
    assert!(cloner.deep_clone_ref(&big).unwrap().ptr_eq(&big));

    let money = ClassBuilder::new("Money")
        .field("cents", FieldType::LONG)
        .annotate(Annotation::immutable())
        .build();
    let price = ObjRef::allocate_zeroed(&money).unwrap();
    assert!(cloner.deep_clone_ref(&price).unwrap().ptr_eq(&price));

    let token = ClassBuilder::new("Token").build();
    cloner.register_immutable([&token]);
    let t = ObjRef::allocate_zeroed(&token).unwrap();
    assert!(cloner.deep_clone_ref(&t).unwrap().ptr_eq(&t));
}

#[test]
fn test_plain_values_pass_through() {
    let cloner = Cloner::new();
    assert!(cloner.deep_clone(&Value::Null).unwrap().is_null());
    assert_eq!(cloner.deep_clone(&Value::Int(7)).unwrap(), Value::Int(7));
    assert_eq!(cloner.deep_clone(&Value::str("hi")).unwrap(), Value::str("hi"));
}

#[test]
fn test_mutable_composite_is_copied() {
    let address = ClassBuilder::new("Address")
        .field("city", FieldType::Reference)
        .build();
    let person = ClassBuilder::new("Person")
        .field("name", FieldType::Reference)
        .field("age", FieldType::INT)
        .field("address", FieldType::Reference)
        .build();

    let home = ObjRef::allocate_zeroed(&address).unwrap();
    home.set_field("city", "Oslo").unwrap();
    let ada = ObjRef::allocate_zeroed(&person).unwrap();
    ada.set_field("name", "Ada").unwrap();
    ada.set_field("age", 36).unwrap();
    ada.set_field("address", &home).unwrap();

    let copy = Cloner::new().deep_clone_ref(&ada).unwrap();
    assert!(!copy.ptr_eq(&ada));
    assert_eq!(copy.field("name").unwrap().as_str(), Some("Ada"));
    assert_eq!(copy.field("age").unwrap(), Value::Int(36));

    let home_copy = object(copy.field("address").unwrap());
    assert!(!home_copy.ptr_eq(&home));
    assert_eq!(home_copy.field("city").unwrap().as_str(), Some("Oslo"));

    home_copy.set_field("city", "Bergen").unwrap();
    assert_eq!(home.field("city").unwrap().as_str(), Some("Oslo"));
}

#[test]
fn test_shared_references_stay_shared() {
    let pair = ClassBuilder::new("Pair")
        .field("p", FieldType::Reference)
        .field("q", FieldType::Reference)
        .build();
    let nodes = node_class();
    let shared = node(&nodes, 1);
    let a = ObjRef::allocate_zeroed(&pair).unwrap();
    a.set_field("p", &shared).unwrap();
    a.set_field("q", &shared).unwrap();

    let copy = Cloner::new().deep_clone_ref(&a).unwrap();
    let p = object(copy.field("p").unwrap());
    let q = object(copy.field("q").unwrap());
    assert!(p.ptr_eq(&q));
    assert!(!p.ptr_eq(&shared));
}

#[test]
fn test_cycles_terminate() {
    let nodes = node_class();
    let c = node(&nodes, 1);
    let d = node(&nodes, 2);
    c.set_field("next", &d).unwrap();
    d.set_field("next", &c).unwrap();

    let c2 = Cloner::new().deep_clone_ref(&c).unwrap();
    let d2 = object(c2.field("next").unwrap());
    let back = object(d2.field("next").unwrap());
    assert!(back.ptr_eq(&c2));
    assert!(!d2.ptr_eq(&d));
    assert_eq!(d2.field("value").unwrap(), Value::Int(2));
}

#[test]
fn test_copied_cycle_is_released_once_broken() {
    let nodes = node_class();
    let a = node(&nodes, 1);
    a.set_field("next", &a).unwrap();

    let copy = Cloner::new().deep_clone_ref(&a).unwrap();
    // Our handle plus the copy's own `next` slot
    assert_eq!(copy.handle_count(), 2);
    copy.set_field("next", Value::Null).unwrap();
    assert_eq!(copy.handle_count(), 1);
    a.set_field("next", Value::Null).unwrap();
}

#[test]
fn test_container_containing_itself() {
    let list = builtins::array_list([Value::Int(1)]);
    if let Body::List(items) = &mut *list.body_mut() {
        items.push(Value::from(&list));
    }

    let copy = Cloner::new().deep_clone_ref(&list).unwrap();
    let body = copy.body();
    let Body::List(items) = &*body else {
        panic!("expected list body");
    };
    assert_eq!(items[0], Value::Int(1));
    assert!(items[1].same(&Value::from(&copy)));
}

#[test]
fn test_object_reachable_from_its_own_list() {
    let owner = ClassBuilder::new("Owner")
        .field("children", FieldType::Reference)
        .build();
    let o = ObjRef::allocate_zeroed(&owner).unwrap();
    let children = builtins::array_list([Value::from(&o)]);
    o.set_field("children", &children).unwrap();

    let copy = Cloner::new().deep_clone_ref(&o).unwrap();
    let list = object(copy.field("children").unwrap());
    let body = list.body();
    let Body::List(items) = &*body else {
        panic!("expected list body");
    };
    assert!(items[0].same(&Value::from(&copy)));
}

#[test]
fn test_linked_hash_map_keeps_insertion_order() {
    let nodes = node_class();
    let map = builtins::linked_hash_map(
        [3, 1, 2].map(|k| (Value::Int(k), Value::from(node(&nodes, k * 10)))),
    );

    let copy = Cloner::new().deep_clone_ref(&map).unwrap();
    let body = copy.body();
    let Body::LinkedMap(entries) = &*body else {
        panic!("expected linked map body");
    };
    assert_eq!(ints(entries.keys().cloned()), [3, 1, 2]);

    let original = map.body();
    let Body::LinkedMap(original_entries) = &*original else {
        panic!("expected linked map body");
    };
    for (key, value) in entries {
        let before = &original_entries[key];
        assert!(!value.same(before));
        assert_eq!(
            object(value.clone()).field("value").unwrap(),
            object(before.clone()).field("value").unwrap()
        );
    }
}

#[test]
fn test_tree_set_keeps_its_comparator() {
    let nodes = node_class();
    let by_value_desc: Comparator = Arc::new(|a: &Value, b: &Value| {
        let key = |v: &Value| {
            v.as_object()
                .and_then(|o| o.field("value").ok())
                .and_then(|v| v.as_int())
                .unwrap_or_default()
        };
        key(b).cmp(&key(a))
    });
    let set = builtins::tree_set(
        Some(by_value_desc),
        [5, 1, 3].map(|v| Value::from(node(&nodes, v))),
    );

    let copy = Cloner::new().deep_clone_ref(&set).unwrap();
    let mut body = copy.body_mut();
    let Body::Sorted(map) = &mut *body else {
        panic!("expected sorted body");
    };
    map.insert(Value::from(node(&nodes, 4)), Value::Null);

    let order: Vec<i32> = map
        .keys()
        .filter_map(|k| k.as_object()?.field("value").ok()?.as_int())
        .collect();
    assert_eq!(order, [5, 4, 3, 1]);
}

#[test]
fn test_tree_map_in_natural_order() {
    let map = builtins::tree_map(None, [2, 9, 4].map(|k| (Value::Int(k), Value::str("x"))));
    let copy = Cloner::new().deep_clone_ref(&map).unwrap();
    let body = copy.body();
    let Body::Sorted(sorted) = &*body else {
        panic!("expected sorted body");
    };
    assert!(sorted.comparator().is_none());
    assert_eq!(ints(sorted.keys().cloned()), [2, 4, 9]);
}

#[test]
fn test_hash_containers_copy_object_elements() {
    let nodes = node_class();
    let key = node(&nodes, 1);
    let map = builtins::hash_map([(Value::from(&key), Value::Int(10))]);
    let concurrent = builtins::concurrent_hash_map([(Value::Int(1), Value::from(&key))]);

    let cloner = Cloner::new();
    let map_copy = cloner.deep_clone_ref(&map).unwrap();
    let body = map_copy.body();
    let Body::HashMap(entries) = &*body else {
        panic!("expected hash map body");
    };
    let (copied_key, value) = entries.iter().next().unwrap();
    assert!(!copied_key.same(&Value::from(&key)));
    assert_eq!(*value, Value::Int(10));

    let concurrent_copy = cloner.deep_clone_ref(&concurrent).unwrap();
    assert_eq!(concurrent_copy.class().name(), "ConcurrentHashMap");
    assert_eq!(concurrent_copy.len(), Some(1));
}

#[test]
fn test_primitive_array_is_independent() {
    let original = ObjRef::array(ArrayData::Int(vec![1, 2, 3, 4]));
    let copy = Cloner::new().deep_clone_ref(&original).unwrap();
    assert!(!copy.ptr_eq(&original));
    assert_eq!(copy.len(), Some(4));

    if let Body::Array(ArrayData::Int(values)) = &mut *copy.body_mut() {
        values[0] = 100;
    }
    assert!(matches!(&*original.body(), Body::Array(ArrayData::Int(v)) if v == &[1, 2, 3, 4]));
    assert!(matches!(&*copy.body(), Body::Array(ArrayData::Int(v)) if v == &[100, 2, 3, 4]));
}

#[test]
fn test_reference_array_copies_elements() {
    let nodes = node_class();
    let shared = node(&nodes, 7);
    let array = ObjRef::typed_array(
        &nodes,
        vec![Value::from(&shared), Value::Null, Value::from(&shared)],
    );

    let copy = Cloner::new().deep_clone_ref(&array).unwrap();
    let body = copy.body();
    let Body::Array(ArrayData::Refs(elements)) = &*body else {
        panic!("expected reference array");
    };
    assert!(!elements[0].same(&Value::from(&shared)));
    assert!(elements[0].same(&elements[2]));
    assert!(elements[1].is_null());
}

#[test]
fn test_enum_array_is_bulk_copied() {
    let color = ClassBuilder::enumeration("Color", ["RED", "GREEN"]).build();
    let red = ObjRef::enum_constant(&color, "RED").unwrap();
    let array = ObjRef::typed_array(&color, vec![Value::from(&red)]);

    let copy = Cloner::new().deep_clone_ref(&array).unwrap();
    assert!(!copy.ptr_eq(&array));
    let body = copy.body();
    let Body::Array(ArrayData::Refs(elements)) = &*body else {
        panic!("expected reference array");
    };
    assert!(elements[0].same(&Value::from(&red)));
}

#[test]
fn test_shallow_versus_deep() {
    let holder = ClassBuilder::new("Holder")
        .field("field", FieldType::Reference)
        .build();
    let nodes = node_class();
    let inner = node(&nodes, 1);
    let x = ObjRef::allocate_zeroed(&holder).unwrap();
    x.set_field("field", &inner).unwrap();

    let cloner = Cloner::new();
    let shallow = cloner.shallow_clone_ref(&x).unwrap();
    let deep = cloner.deep_clone_ref(&x).unwrap();
    assert!(!shallow.ptr_eq(&x));
    assert!(shallow.field("field").unwrap().same(&Value::from(&inner)));
    assert!(!deep.field("field").unwrap().same(&Value::from(&inner)));
}

#[test]
fn test_shallow_container_shares_elements() {
    let nodes = node_class();
    let n = node(&nodes, 1);
    let list = builtins::linked_list([Value::from(&n)]);

    let copy = Cloner::new().shallow_clone_ref(&list).unwrap();
    assert!(!copy.ptr_eq(&list));
    let body = copy.body();
    let Body::Deque(items) = &*body else {
        panic!("expected deque body");
    };
    assert!(items[0].same(&Value::from(&n)));
}

#[test]
fn test_long_generic_chain() {
    const LEN: i32 = 100_000;
    let nodes = node_class();
    let head = node(&nodes, 0);
    let mut tail = head.clone();
    for i in 1..LEN {
        let next = node(&nodes, i);
        tail.set_field("next", &next).unwrap();
        tail = next;
    }

    let copy = Cloner::new().deep_clone_ref(&head).unwrap();
    let mut count = 0;
    let mut cursor = Some(copy);
    while let Some(current) = cursor {
        assert_eq!(current.field("value").unwrap(), Value::Int(count));
        count += 1;
        cursor = current.field("next").unwrap().as_object().cloned();
    }
    assert_eq!(count, LEN);
}

#[test]
fn test_long_linked_list() {
    const LEN: i32 = 100_000;
    let nodes = node_class();
    let list = builtins::linked_list((0..LEN).map(|i| Value::from(node(&nodes, i))));

    let copy = Cloner::new().deep_clone_ref(&list).unwrap();
    let body = copy.body();
    let Body::Deque(items) = &*body else {
        panic!("expected deque body");
    };
    assert_eq!(items.len(), LEN as usize);
    for (i, item) in items.iter().enumerate() {
        let n = item.as_object().unwrap();
        assert_eq!(n.field("value").unwrap(), Value::Int(i as i32));
    }
}

#[test]
fn test_deep_tree_through_lists() {
    const DEPTH: i32 = 100_000;
    let tree = ClassBuilder::new("Tree")
        .field("value", FieldType::INT)
        .field("children", FieldType::Reference)
        .build();
    let root = node(&tree, 0);
    let mut parent = root.clone();
    for i in 1..DEPTH {
        let child = node(&tree, i);
        parent
            .set_field("children", builtins::array_list([Value::from(&child)]))
            .unwrap();
        parent = child;
    }

    let copy = Cloner::new().deep_clone_ref(&root).unwrap();
    let mut depth = 0;
    let mut cursor = Some(copy);
    while let Some(current) = cursor {
        assert_eq!(current.field("value").unwrap(), Value::Int(depth));
        depth += 1;
        cursor = match current.field("children").unwrap() {
            Value::Ref(children) => {
                let body = children.body();
                let Body::List(items) = &*body else {
                    panic!("expected list body");
                };
                items[0].as_object().cloned()
            }
            _ => None,
        };
    }
    assert_eq!(depth, DEPTH);
}

#[test]
fn test_tree_map_values_are_populated() {
    let nodes = node_class();
    let inner = node(&nodes, 9);
    let outer = node(&nodes, 1);
    outer.set_field("next", &inner).unwrap();
    let map = builtins::tree_map(None, [(Value::Int(1), Value::from(&outer))]);

    let copy = Cloner::new().deep_clone_ref(&map).unwrap();
    let body = copy.body();
    let Body::Sorted(entries) = &*body else {
        panic!("expected sorted body");
    };
    let value = entries.get(&Value::Int(1)).unwrap().as_object().unwrap().clone();
    assert!(!value.ptr_eq(&outer));
    let next = value.field("next").unwrap();
    assert!(!next.same(&Value::from(&inner)));
    assert_eq!(next.as_object().unwrap().field("value").unwrap(), Value::Int(9));
}

#[test]
fn test_constructors_do_not_run() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let audited = ClassBuilder::new("Audited")
        .field("id", FieldType::INT)
        .constructor(|obj| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            obj.set_field("id", -1).unwrap();
        })
        .build();
    let original = ObjRef::construct(&audited).unwrap();
    original.set_field("id", 5).unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    let copy = Cloner::new().deep_clone_ref(&original).unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(copy.field("id").unwrap(), Value::Int(5));
}

#[test]
fn test_uninstantiable_type_fails() {
    let holder = ClassBuilder::new("Holder")
        .field("handle", FieldType::Reference)
        .build();
    let socket = ClassBuilder::native("Socket").build();
    let h = ObjRef::allocate_zeroed(&holder).unwrap();
    h.set_field("handle", ObjRef::new(socket, Body::List(Vec::new())))
        .unwrap();

    let err = Cloner::new().deep_clone_ref(&h).unwrap_err();
    assert!(matches!(&err, CloneError::Instantiation { class } if class == "Socket"));
}

#[test]
fn test_shadowed_fields_are_distinct_slots() {
    let base = ClassBuilder::new("Base").field("id", FieldType::LONG).build();
    let derived = ClassBuilder::new("Derived")
        .extends(&base)
        .field("id", FieldType::INT)
        .build();
    let obj = ObjRef::allocate_zeroed(&derived).unwrap();
    obj.write_slot(0, Value::Long(11)).unwrap();
    obj.write_slot(1, Value::Int(22)).unwrap();

    let copy = Cloner::new().deep_clone_ref(&obj).unwrap();
    assert_eq!(copy.read_slot(0).unwrap(), Value::Long(11));
    assert_eq!(copy.read_slot(1).unwrap(), Value::Int(22));
}

#[test]
fn test_calendar_is_copied() {
    let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let cal = builtins::calendar(
        Calendar::new(instant, "Europe/Oslo").with_first_day_of_week(Weekday::Mon),
    );

    let copy = Cloner::new().deep_clone_ref(&cal).unwrap();
    assert!(!copy.ptr_eq(&cal));
    if let Body::Calendar(c) = &mut *copy.body_mut() {
        assert_eq!(c.zone(), "Europe/Oslo");
        assert_eq!(c.first_day_of_week(), Weekday::Mon);
        c.set_instant(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }
    assert!(matches!(&*cal.body(), Body::Calendar(c) if c.instant() == instant));
}
