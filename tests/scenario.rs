use bitview::{
    Arith, BitView, Error, LookupError, RangeError, RawField, RawMapping, SchemaError, ViewType,
    make_view_type, resolve_schema,
};

fn status_type() -> std::rc::Rc<ViewType> {
    ViewType::builder("Status")
        .size(8)
        .fields(
            RawMapping::new()
                .bit("flag", 0)
                .nested("block", 1, 6, RawMapping::new().bit("bit", 0).range("pair", 1, 3)),
        )
        .build()
        .unwrap()
}

#[test]
fn test_status_register() {
    let v = status_type().view(0xFF);
    assert_eq!(v.value(), 255);
    assert_eq!(v.get("block").unwrap().value(), 0b11111);
    assert_eq!(v.get("block").unwrap().get("pair").unwrap().value(), 0b11);

    v.get("block").unwrap().set_value(0).unwrap();
    assert_eq!(v.value(), 0b11000001);

    v.get("block").unwrap().set("pair", 3).unwrap();
    assert_eq!(v.value(), 0b11001101);
    assert_eq!(v.get("flag").unwrap().value(), 1);
}

#[test]
fn test_overlap_reports_colliding_bits() {
    let raw = RawMapping::new().range("x", 0, 2).range("y", 1, 3);
    assert_eq!(
        resolve_schema(&raw).unwrap_err(),
        SchemaError::Overlap {
            field: "y".to_string(),
            colliding_bits: 0b10,
        }
    );
}

#[test]
fn test_field_after_open_ended() {
    let raw = RawMapping::new().bit("a", 0).open("b", 1).bit("c", 2);
    assert_eq!(
        resolve_schema(&raw).unwrap_err(),
        SchemaError::TrailingAfterOpenEnded {
            field: "c".to_string()
        }
    );
}

#[test]
fn test_reserved_and_unrecognized_keys() {
    let reserved = RawMapping::new().range("_index_", 0, 2);
    assert_eq!(resolve_schema(&reserved).unwrap_err(), SchemaError::ReservedKey);

    let raw = RawMapping::new()
        .bit("ok", 0)
        .field("text", RawField::Unrecognized("str".to_string()))
        .bit("__dunder__", 1)
        .field(
            "stepped",
            RawField::Slice {
                start: Some(2),
                stop: Some(6),
                step: Some(2),
            },
        );
    assert_eq!(
        resolve_schema(&raw).unwrap_err(),
        SchemaError::UnrecognizedField(vec![
            "text".to_string(),
            "__dunder__".to_string(),
            "stepped".to_string(),
        ])
    );
}

#[test]
fn test_resolve_is_deterministic() {
    let raw = RawMapping::new().range("high", 4, 8).bit("low", 0);
    let first = resolve_schema(&raw).unwrap();
    let second = resolve_schema(&raw).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.names().collect::<Vec<_>>(), vec!["low", "high"]);
}

#[test]
fn test_declarative_boundary() {
    let mapping = resolve_schema(&RawMapping::new().range("low", 0, 4).range("high", 4, 8)).unwrap();
    let ty = make_view_type("Byte", Some(mapping), None, Some(8)).unwrap();
    let mut view = ty.view(0xA5);
    assert_eq!(view.get("high").unwrap().value(), 0xA);
    view.set("low", 0).unwrap();
    assert_eq!(view.value(), 0xA0);
}

#[test]
fn test_overflow_demotion() {
    let mut v = BitView::with_size(7, 3).unwrap();
    assert_eq!(v.checked_add(1).unwrap(), Arith::Int(8));
    assert!(matches!(v.try_add_assign(1), Err(RangeError::Overflow { .. })));
    assert!(matches!(v.checked_sub(8), Err(RangeError::Negative)));
    assert_eq!(v.value(), 7);
}

#[test]
fn test_equality() {
    assert!(BitView::new(5) == 5u128);
    let ty = status_type();
    let a = ty.view(0x2A);
    let b = ty.view(0x2A);
    assert_eq!(a, b);
    assert_ne!(a, BitView::new(0x2A));
}

#[test]
fn test_rejected_writes_leave_value_unchanged() {
    let mut v = status_type().view(0xA5);
    assert!(matches!(
        v.set("pair", 1),
        Err(Error::Lookup(LookupError::UnknownField(_)))
    ));
    assert!(matches!(
        v.get("block").unwrap().set("pair", 4),
        Err(Error::Range(RangeError::DataTooWide { bits: 3, width: 2 }))
    ));
    assert!(matches!(
        v.set(.., 0x100),
        Err(Error::Range(RangeError::Overflow { .. }))
    ));
    assert_eq!(v.value(), 0xA5);
}

#[test]
fn test_display_and_parse() {
    let ty = status_type();
    let v = ty.parse("0b1100_1101", 0).unwrap();
    assert_eq!(v.value(), 0xCD);
    assert!(v.to_string().starts_with("<205 == 0xCD == (0b11001101 & 0b11111111)\n"));
    assert_eq!(format!("{v:?}"), "Status(x=0xCD, base=16)");
}
