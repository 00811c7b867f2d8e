//! Wire-format conformance, run against every backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use hex_literal::hex;
use modelwire_api::enumeration::EnumRegistry;
use modelwire_api::error::CodecError;
use modelwire_api::schema::{LogicalType, TypeDescriptor, WireType};
use modelwire_api::value::{StructValue, Value};
use modelwire_engine::{Backend, Limits, ModelCodec, SchemaCache};

/// One codec per backend, all sharing a private cache.
fn codecs() -> Vec<ModelCodec> {
    let cache = Arc::new(SchemaCache::new());
    Backend::all()
        .into_iter()
        .map(|b| ModelCodec::with_backend(b, Limits::default()).with_cache(Arc::clone(&cache)))
        .collect()
}

fn codec(backend: Backend) -> ModelCodec {
    ModelCodec::with_backend(backend, Limits::default()).with_cache(Arc::new(SchemaCache::new()))
}

fn person() -> TypeDescriptor {
    TypeDescriptor::new("Person")
        .field("name", 1, LogicalType::String)
        .field("age", 2, LogicalType::Integer)
        .field("tags", 3, LogicalType::list(LogicalType::String))
}

fn nicolas() -> StructValue {
    StructValue::new()
        .with("name", "Nicolas")
        .with("age", 26i64)
        .with("tags", vec![Value::from("a"), Value::from("b")])
}

const NICOLAS: [u8; 44] = hex!(
    "0b 000b 00000007 4e69636f6c6173"
    "0a 000c 000000000000001a"
    "0f 000d 0b 00000002 00000001 61 00000001 62"
    "00"
);

/// Decoded form of `value`: every schema field present, absent ones at
/// their absent value.
fn completed(value: StructValue) -> StructValue {
    let mut full = StructValue::new()
        .with("guid", "")
        .with("version", "")
        .with("creationdate", "")
        .with("_baseversion", "")
        .with("name", "")
        .with("age", 0i64)
        .with("tags", Value::List(vec![]));
    for (k, v) in value {
        full.set(k, v);
    }
    full
}

#[test]
fn golden_vector() {
    for codec in codecs() {
        let bytes = codec.encode_value(&person(), &nicolas()).unwrap();
        assert_eq!(bytes, NICOLAS, "{}", codec.backend());
        let back = codec.decode_value(&person(), &NICOLAS).unwrap();
        assert_eq!(back, completed(nicolas()), "{}", codec.backend());
    }
}

#[test]
fn absent_age_is_not_written() {
    for codec in codecs() {
        let value = nicolas().with("age", 0i64);
        let bytes = codec.encode_value(&person(), &value).unwrap();
        assert_eq!(
            bytes,
            hex!(
                "0b 000b 00000007 4e69636f6c6173"
                "0f 000d 0b 00000002 00000001 61 00000001 62"
                "00"
            )
        );
        let back = codec.decode_value(&person(), &bytes).unwrap();
        assert_eq!(back.get("age"), Some(&Value::I64(0)));
    }
}

#[test]
fn all_absent_record_is_a_single_stop() {
    for codec in codecs() {
        let value = StructValue::new()
            .with("name", "")
            .with("tags", Value::List(vec![]));
        assert_eq!(codec.encode_value(&person(), &value).unwrap(), [0]);
        assert_eq!(
            codec.decode_value(&person(), &[0]).unwrap(),
            completed(StructValue::new())
        );
    }
}

#[test]
fn identity_fields_use_reserved_ids() {
    for codec in codecs() {
        let value = StructValue::new().with("guid", "g").with("version", "2");
        let bytes = codec.encode_value(&person(), &value).unwrap();
        assert_eq!(bytes, hex!("0b 0001 00000001 67 0b 0002 00000001 32 00"));
    }
}

#[test]
fn forward_compatibility_both_ways() {
    let wide = person();
    let narrow = TypeDescriptor::new("Person")
        .field("name", 1, LogicalType::String)
        .field("age", 2, LogicalType::Integer);

    for backend in Backend::all() {
        let bytes = codec(backend).encode_value(&wide, &nicolas()).unwrap();
        let back = codec(backend).decode_value(&narrow, &bytes).unwrap();
        assert_eq!(back.get("name"), Some(&Value::from("Nicolas")));
        assert_eq!(back.get("age"), Some(&Value::I64(26)));
        assert!(!back.contains("tags"));

        let short = StructValue::new().with("name", "Nicolas").with("age", 26i64);
        let bytes = codec(backend).encode_value(&narrow, &short).unwrap();
        let back = codec(backend).decode_value(&wide, &bytes).unwrap();
        assert_eq!(back.get("tags"), Some(&Value::List(vec![])));
        assert_eq!(back.get("age"), Some(&Value::I64(26)));
    }
}

#[test]
fn unknown_nested_fields_are_skipped() {
    let address = Arc::new(
        TypeDescriptor::new("Address")
            .field("city", 1, LogicalType::String)
            .field("lines", 2, LogicalType::list(LogicalType::String)),
    );
    let wide = person()
        .field("home", 4, LogicalType::Object(address))
        .field("scores", 5, LogicalType::dict(LogicalType::Float));
    let value = nicolas()
        .with(
            "home",
            StructValue::new()
                .with("city", "Paris")
                .with("lines", vec![Value::from("1 rue")]),
        )
        .with(
            "scores",
            Value::Map(BTreeMap::from([("x".to_owned(), Value::Double(1.5))])),
        );

    for backend in Backend::all() {
        let bytes = codec(backend).encode_value(&wide, &value).unwrap();
        let back = codec(backend).decode_value(&person(), &bytes).unwrap();
        assert_eq!(back, completed(nicolas()));
    }
}

#[test]
fn backends_are_byte_identical_and_cross_decode() {
    let colors = EnumRegistry::sealed("Color", &["red", "green"]);
    let inner = Arc::new(
        TypeDescriptor::new("Inner")
            .field("flag", 1, LogicalType::Boolean)
            .field("ratio", 2, LogicalType::Float),
    );
    let desc = TypeDescriptor::new("Everything")
        .field("s", 1, LogicalType::String)
        .field("i", 2, LogicalType::Int32)
        .field("l", 3, LogicalType::Integer)
        .field("f", 4, LogicalType::Float)
        .field("b", 5, LogicalType::Boolean)
        .field("when", 6, LogicalType::DateTime)
        .field("color", 7, LogicalType::Enumeration(colors))
        .field("inner", 8, LogicalType::Object(Arc::clone(&inner)))
        .field("many", 9, LogicalType::list(LogicalType::Object(inner)))
        .field("grid", 10, LogicalType::list(LogicalType::list(LogicalType::Int32)))
        .field("index", 11, LogicalType::dict(LogicalType::list(LogicalType::String)));

    let inner_value = StructValue::new().with("flag", true).with("ratio", -0.25);
    let value = StructValue::new()
        .with("s", "héllo")
        .with("i", -7i32)
        .with("l", i64::MIN)
        .with("f", 1e300)
        .with("b", true)
        .with("when", 1_700_000_000i64)
        .with("color", "green")
        .with("inner", inner_value.clone())
        .with(
            "many",
            vec![Value::Struct(inner_value), Value::Struct(StructValue::new())],
        )
        .with(
            "grid",
            vec![Value::List(vec![Value::I32(1), Value::I32(2)]), Value::List(vec![])],
        )
        .with(
            "index",
            Value::Map(BTreeMap::from([
                ("k1".to_owned(), Value::List(vec![Value::from("v")])),
                ("k0".to_owned(), Value::List(vec![])),
            ])),
        );

    let [accelerated, portable] = [Backend::Accelerated, Backend::Portable].map(codec);
    let fast = accelerated.encode_value(&desc, &value).unwrap();
    let slow = portable.encode_value(&desc, &value).unwrap();
    assert_eq!(fast, slow);

    let a = accelerated.decode_value(&desc, &slow).unwrap();
    let b = portable.decode_value(&desc, &fast).unwrap();
    assert_eq!(a, b);
    for name in ["s", "i", "l", "f", "b", "when", "color", "grid", "index"] {
        assert_eq!(a.get(name), value.get(name), "{name}");
    }
    let inner = a.get("inner").and_then(Value::as_struct).unwrap();
    assert_eq!(inner.get("flag"), Some(&Value::Bool(true)));

    // decoded nested records carry their absent fields too; re-encoding drops them again
    assert_eq!(portable.encode_value(&desc, &a).unwrap(), slow);
    assert_eq!(accelerated.encode_value(&desc, &b).unwrap(), fast);
}

#[test]
fn map_round_trip_ignores_insertion_order() {
    let desc = TypeDescriptor::new("Counts").field("counts", 1, LogicalType::dict(LogicalType::Integer));
    let forward = Value::Map(BTreeMap::from([
        ("a".to_owned(), Value::I64(4)),
        ("b".to_owned(), Value::I64(5)),
    ]));
    let mut reversed = BTreeMap::new();
    reversed.insert("b".to_owned(), Value::I64(5));
    reversed.insert("a".to_owned(), Value::I64(4));

    for codec in codecs() {
        let one = codec
            .encode_value(&desc, &StructValue::new().with("counts", forward.clone()))
            .unwrap();
        let two = codec
            .encode_value(&desc, &StructValue::new().with("counts", Value::Map(reversed.clone())))
            .unwrap();
        assert_eq!(one, two);
        let back = codec.decode_value(&desc, &one).unwrap();
        assert_eq!(back.get("counts"), Some(&forward));
    }
}

#[test]
fn flipped_wire_tag_is_a_type_mismatch() {
    let mut corrupt = NICOLAS;
    // age header starts right after the name field (3 + 4 + 7 bytes)
    assert_eq!(corrupt[14], WireType::I64.tag());
    corrupt[14] = WireType::Double.tag();

    for codec in codecs() {
        assert_eq!(
            codec.decode_value(&person(), &corrupt),
            Err(CodecError::TypeMismatch {
                field_id: 12,
                expected: WireType::I64,
                found: WireType::Double,
            })
        );
    }
}

#[test]
fn every_truncation_fails_the_same_way() {
    let [accelerated, portable] = [Backend::Accelerated, Backend::Portable].map(codec);
    for cut in 0..NICOLAS.len() {
        let prefix = &NICOLAS[..cut];
        let a = accelerated.decode_value(&person(), prefix);
        let p = portable.decode_value(&person(), prefix);
        assert!(matches!(a, Err(CodecError::TruncatedBuffer { .. })), "cut at {cut}: {a:?}");
        assert_eq!(a, p, "cut at {cut}");
    }
}

#[test]
fn negative_and_oversized_lengths() {
    let negative = hex!("0b 000b ffffffff 00");
    let oversized = hex!("0b 000b 00000100 41 00");
    for codec in codecs() {
        assert_eq!(
            codec.decode_value(&person(), &negative),
            Err(CodecError::NegativeLength(-1))
        );
        assert_eq!(
            codec.decode_value(&person(), &oversized),
            Err(CodecError::TruncatedBuffer {
                needed: 256,
                remaining: 2,
            })
        );
    }
}

#[test]
fn hostile_list_count_is_rejected_before_allocating() {
    let buf = hex!("0f 000d 0b 7fffffff 00");
    let small = hex!("0f 000d 0b 00001000 00");
    for codec in codecs() {
        assert_eq!(
            codec.decode_value(&person(), &buf),
            Err(CodecError::LengthLimit {
                len: i32::MAX as usize,
                limit: Limits::default().max_collection_len,
            })
        );
        assert_eq!(
            codec.decode_value(&person(), &small),
            Err(CodecError::TruncatedBuffer {
                needed: 4096 * 4,
                remaining: 1,
            })
        );
    }
}

#[test]
fn unknown_wire_tag_is_rejected() {
    for codec in codecs() {
        assert_eq!(
            codec.decode_value(&person(), &hex!("07 0063 00")),
            Err(CodecError::UnknownWireType(7))
        );
    }
}

#[test]
fn unknown_enum_member_aborts_decode() {
    let colors = EnumRegistry::sealed("Color", &["red"]);
    let desc = TypeDescriptor::new("Paint").field("color", 1, LogicalType::Enumeration(colors));
    let buf = hex!("0b 000b 00000004 626c7565 00");
    for codec in codecs() {
        assert_eq!(
            codec.decode_value(&desc, &buf),
            Err(CodecError::UnknownEnumMember {
                enumeration: "Color".into(),
                name: "blue".into(),
            })
        );
        assert!(matches!(
            codec.encode_value(&desc, &StructValue::new().with("color", "blue")),
            Err(CodecError::UnknownEnumMember { .. })
        ));
    }
}

#[test]
fn empty_placeholder_differs_from_default_nested_record() {
    let address = Arc::new(TypeDescriptor::new("Address").field("city", 1, LogicalType::String));
    let desc = TypeDescriptor::new("Holder").field("home", 1, LogicalType::Object(address));

    for codec in codecs() {
        let none = codec
            .encode_value(&desc, &StructValue::new().with("home", Value::Empty))
            .unwrap();
        assert_eq!(none, [0]);
        assert_eq!(
            codec.decode_value(&desc, &none).unwrap().get("home"),
            Some(&Value::Empty)
        );

        let defaulted = codec
            .encode_value(&desc, &StructValue::new().with("home", StructValue::new()))
            .unwrap();
        assert_eq!(defaulted, hex!("0c 000b 00 00"));
        let back = codec.decode_value(&desc, &defaulted).unwrap();
        let home = back.get("home").and_then(Value::as_struct).unwrap();
        assert_eq!(home.get("city"), Some(&Value::from("")));
    }
}

#[test]
fn trailing_bytes_are_ignored() {
    let mut buf = NICOLAS.to_vec();
    buf.extend_from_slice(b"garbage");
    for codec in codecs() {
        assert_eq!(
            codec.decode_value(&person(), &buf).unwrap(),
            completed(nicolas())
        );
    }
}

#[test]
fn nesting_depth_is_limited() {
    let leaf = Arc::new(TypeDescriptor::new("Leaf").field("n", 1, LogicalType::Integer));
    let mid = Arc::new(TypeDescriptor::new("Mid").field("leaf", 1, LogicalType::Object(leaf)));
    let top = TypeDescriptor::new("Top").field("mid", 1, LogicalType::Object(mid));
    let value = StructValue::new().with(
        "mid",
        StructValue::new().with("leaf", StructValue::new().with("n", 1i64)),
    );
    let limits = Limits {
        max_depth: 2,
        max_collection_len: 16,
    };

    for backend in Backend::all() {
        let bytes = codec(backend).encode_value(&top, &value).unwrap();
        let shallow = ModelCodec::with_backend(backend, limits).with_cache(Arc::new(SchemaCache::new()));
        assert_eq!(
            shallow.decode_value(&top, &bytes),
            Err(CodecError::DepthExceeded { limit: 2 })
        );
    }
}

#[test]
fn invalid_values_are_rejected_on_encode() {
    for codec in codecs() {
        let wrong = StructValue::new().with("age", "twenty");
        assert_eq!(
            codec.encode_value(&person(), &wrong),
            Err(CodecError::invalid_value("age", "i64", "string"))
        );
        let hole = StructValue::new().with("tags", vec![Value::from("a"), Value::Empty]);
        assert!(matches!(
            codec.encode_value(&person(), &hole),
            Err(CodecError::InvalidValue { .. })
        ));
    }
}

#[test]
fn schema_errors_surface_on_first_use() {
    let duplicate = person().field("nick", 2, LogicalType::String);
    let bad_key = TypeDescriptor::new("Lookup").field(
        "by_id",
        1,
        LogicalType::map(LogicalType::Integer, LogicalType::String),
    );
    for codec in codecs() {
        assert!(matches!(
            codec.encode_value(&duplicate, &StructValue::new()),
            Err(CodecError::SchemaConflict { .. })
        ));
        assert!(matches!(
            codec.decode_value(&bad_key, &[0]),
            Err(CodecError::UnsupportedMapKey { .. })
        ));
    }
}
