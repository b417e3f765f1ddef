use tiny_table::{AllocOps, TableError, TinyTable, Variant};

#[test]
fn simple_basic_allocation() {
    let table = TinyTable::create(1024, Variant::Simple, 0.9).unwrap();
    for i in 0..100 {
        let key = i + 1000;
        let value = key * 10;
        let ptr = table.allocate(key, value).unwrap();
        assert_eq!(table.dereference(key, ptr).unwrap(), value);
        table.free(key, ptr);
        assert_eq!(table.dereference(key, ptr).unwrap(), 0);
    }
    assert!(table.is_empty());
}

#[test]
fn simple_multiple_allocations_same_key() {
    let table = TinyTable::create(1024, Variant::Simple, 0.9).unwrap();
    let key = 5000;
    let p1 = table.allocate(key, 123).unwrap();
    let p2 = table.allocate(key, 456).unwrap();
    assert_ne!(p1, p2);
    assert_eq!(table.dereference(key, p1).unwrap(), 123);
    assert_eq!(table.dereference(key, p2).unwrap(), 456);
    table.free(key, p1);
    assert_eq!(table.dereference(key, p1).unwrap(), 0);
    table.free(key, p2);
    assert_eq!(table.dereference(key, p2).unwrap(), 0);
}

#[test]
fn simple_allocate_until_full() {
    let table = TinyTable::create(64, Variant::Simple, 0.9).unwrap();
    let mut allocated = Vec::new();
    let mut key = 1000;
    loop {
        match table.allocate(key, key * 10) {
            Ok(ptr) => allocated.push((key, ptr)),
            Err(TableError::Saturated) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
        key += 1;
    }
    assert!(!allocated.is_empty());
    for &(key, ptr) in &allocated {
        table.free(key, ptr);
    }
    assert!(table.allocate(9999, 99990).is_ok());
}

#[test]
fn simple_resize_supports_growth() {
    let table = TinyTable::create(128, Variant::Simple, 0.9).unwrap();
    for i in 0..64 {
        let key = i + 2000;
        table.allocate(key, key * 10).unwrap();
    }
    table.resize(256).unwrap();
    // Live entries survive the rehash even though their old pointers died.
    assert_eq!(table.len(), 64);
    for i in 64..128 {
        let key = i + 2000;
        let ptr = table.allocate(key, key * 10).unwrap();
        assert_eq!(table.dereference(key, ptr).unwrap(), key * 10);
        table.free(key, ptr);
    }
    assert_eq!(table.len(), 64);
}

#[test]
fn resize_rejected_for_fixed_and_variable() {
    for &variant in &[Variant::Fixed, Variant::Variable] {
        let table = TinyTable::create(1024, variant, 0.9).unwrap();
        let ptr = table.allocate(11, 110).unwrap();
        assert_eq!(table.resize(2048).unwrap_err(), TableError::ResizeUnsupported);
        assert_eq!(table.dereference(11, ptr).unwrap(), 110);
    }
}

#[test]
fn fixed_basic_allocation() {
    let table = TinyTable::create(1024, Variant::Fixed, 0.9).unwrap();
    for i in 0..100 {
        let key = i + 1100;
        let value = key * 10;
        let ptr = table.allocate(key, value).unwrap();
        assert_eq!(table.dereference(key, ptr).unwrap(), value);
        table.free(key, ptr);
        assert_eq!(table.dereference(key, ptr).unwrap(), 0);
    }
}

#[test]
fn fixed_uses_secondary_under_collision_pressure() {
    let table = TinyTable::create(1024, Variant::Fixed, 0.9).unwrap();
    // Hammering one key saturates its primary bucket, after which the
    // secondary must answer: its tag is the handle's low bit.
    let key = 5500;
    let mut handles = Vec::new();
    while let Ok(ptr) = table.allocate(key, 1) {
        handles.push(ptr);
    }
    assert!(handles.iter().any(|ptr| ptr & 1 == 0));
    assert!(handles.iter().any(|ptr| ptr & 1 == 1));
    for ptr in handles {
        table.free(key, ptr);
    }
    assert!(table.is_empty());
}

#[test]
fn variable_basic_allocation() {
    let table = TinyTable::create(1024, Variant::Variable, 0.9).unwrap();
    for i in 0..100 {
        let key = i + 1200;
        let value = key * 10;
        let ptr = table.allocate(key, value).unwrap();
        assert_eq!(table.dereference(key, ptr).unwrap(), value);
        table.free(key, ptr);
        assert_eq!(table.dereference(key, ptr).unwrap(), 0);
    }
}

#[test]
fn variable_allocate_until_full() {
    let table = TinyTable::create(64, Variant::Variable, 0.9).unwrap();
    let mut allocated = Vec::new();
    let mut key = 2500;
    loop {
        match table.allocate(key, key * 50) {
            Ok(ptr) => allocated.push((key, ptr)),
            Err(TableError::Saturated) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
        key += 1;
    }
    assert!(!allocated.is_empty());
    for &(key, ptr) in &allocated {
        table.free(key, ptr);
    }
    assert!(table.allocate(7777, 77770).is_ok());
}

#[test]
fn checked_dereference_reports_misuse() {
    for &variant in &[Variant::Simple, Variant::Fixed, Variant::Variable] {
        let table = TinyTable::create(1024, variant, 0.9).unwrap();
        let ptr = table.allocate(31, 310).unwrap();
        assert_eq!(table.dereference_checked(31, ptr).unwrap(), 310);
        table.free(31, ptr);
        assert_eq!(
            table.dereference_checked(31, ptr).unwrap_err(),
            TableError::KeyMismatch
        );
        // The unchecked read keeps the historical contract instead.
        assert_eq!(table.dereference(31, ptr).unwrap(), 0);
    }
}

#[test]
fn double_free_does_not_corrupt() {
    for &variant in &[Variant::Simple, Variant::Fixed, Variant::Variable] {
        let table = TinyTable::create(1024, variant, 0.9).unwrap();
        let ptr = table.allocate(4000, 999).unwrap();
        table.free(4000, ptr);
        table.free(4000, ptr);
        assert!(table.is_empty());
        let again = table.allocate(4000, 1000).unwrap();
        assert_eq!(table.dereference(4000, again).unwrap(), 1000);
    }
}
