#![allow(missing_docs)]

mod common;

use std::{
    collections::{BTreeMap, BTreeSet},
    error::Error as _,
};

use jsonforge::{
    EnumAdapter, ExtractionContext, Formats, FormatsBuilder, Member, NoExtractor, ObjectAdapter,
    SerializationContext, Value, Version, adapter_fn, extract, extract_global, extractor_fn,
    map_adapter, option_adapter, parse, path, reject_extra_keys, serializer_fn, to_json,
    to_json_global, vec_adapter,
};
use rstest::rstest;

use crate::common::DOCUMENT;

#[derive(Debug, PartialEq)]
struct Creative {
    width: u32,
    height: u32,
    weight: f64,
    tags: Vec<String>,
}

fn creative_formats() -> Formats {
    let mut builder = FormatsBuilder::with_bases([Formats::defaults()]);
    builder
        .register_adapter(adapter_fn(
            |ctx, from: &Value| {
                let tags = match from.get("tags")? {
                    Some(tags) => tags
                        .iter_array()?
                        .map(|tag| ctx.extract::<String>(tag))
                        .collect::<Result<Vec<String>, _>>()?,
                    None if ctx.version() >= Version::new(2, 0) => {
                        return Err("tags are required from version 2.0".into());
                    }
                    None => Vec::new(),
                };
                Ok(Creative {
                    width: ctx.extract_sub(from, &path!["size", 0])?,
                    height: ctx.extract_sub(from, &path!["size", 1])?,
                    weight: ctx.extract_sub(from, &path!["weight"])?,
                    tags,
                })
            },
            |ctx, from: &Creative| {
                let mut out = Value::object();
                out.insert(
                    "size",
                    Value::from(vec![ctx.to_json(&from.width)?, ctx.to_json(&from.height)?]),
                )?;
                out.insert("weight", ctx.to_json(&from.weight)?)?;
                out.insert(
                    "tags",
                    from.tags
                        .iter()
                        .map(|tag| ctx.to_json(tag))
                        .collect::<Result<Value, _>>()?,
                )?;
                Ok(out)
            },
        ))
        .unwrap();
    builder.build()
}

#[test]
fn extracts_and_serializes_a_user_type() {
    let doc = parse(DOCUMENT).unwrap();
    let formats = creative_formats();
    let creative: Creative = extract(doc.at_path_str(".creatives[1]").unwrap(), &formats).unwrap();
    assert_eq!(
        creative,
        Creative {
            width: 728,
            height: 90,
            weight: 0.25,
            tags: Vec::new(),
        }
    );
    assert_eq!(
        to_json(&creative, &formats).unwrap().to_string(),
        r#"{"size":[728,90],"tags":[],"weight":0.25}"#
    );
}

#[test]
fn failures_carry_the_nested_path() {
    let doc = parse(r#"{"creatives": [{"size": [1, -2], "weight": 1.0}]}"#).unwrap();
    let ctx = ExtractionContext::new(creative_formats());
    let err = ctx
        .extract_sub::<Creative>(&doc, &path!["creatives", 0])
        .unwrap_err();
    assert_eq!(err.path, path!["creatives", 0, "size", 1]);
    assert!(err.to_string().starts_with("Extraction error at .creatives[0].size[1]: "));
    assert!(err.source().is_some());
}

#[test]
fn version_reaches_the_extractor() {
    let doc = parse(r#"{"size": [1, 2], "weight": 1.0}"#).unwrap();
    let ctx = ExtractionContext::new(creative_formats()).with_version(Version::new(2, 1));
    let err = ctx.extract::<Creative>(&doc).unwrap_err();
    assert_eq!(err.message, "tags are required from version 2.0");
    assert!(err.path.is_empty());

    let ctx = ctx.with_version(Version::new(1, 9));
    assert!(ctx.extract::<Creative>(&doc).is_ok());
}

#[test]
fn unknown_type_is_named_in_the_failure() {
    struct Widget;
    let Err(err) = extract::<Widget>(&Value::object(), &Formats::defaults()) else {
        panic!("extracted a Widget without an extractor");
    };
    assert!(err.to_string().contains("Widget"));
    let cause = err.source().unwrap().downcast_ref::<NoExtractor>().unwrap();
    assert!(cause.type_name.ends_with("Widget"));
}

#[test]
fn standalone_extractors_and_serializers() {
    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    let mut builder = FormatsBuilder::with_bases([Formats::defaults()]);
    builder
        .register_extractor(extractor_fn(|ctx, from| Ok(Celsius(ctx.extract(from)?))))
        .unwrap()
        .register_serializer(serializer_fn(|_ctx, from: &Celsius| {
            Ok(Value::from(format!("{}C", from.0)))
        }))
        .unwrap();
    let formats = builder.build();
    assert_eq!(extract::<Celsius>(&Value::from(21), &formats).unwrap(), Celsius(21.0));
    assert_eq!(to_json(&Celsius(3.5), &formats).unwrap(), Value::from("3.5C"));
}

#[test]
fn user_data_reaches_serializers() {
    struct Units(&'static str);

    let mut builder = FormatsBuilder::new();
    builder
        .register_serializer(serializer_fn(|ctx, from: &f64| {
            let units = ctx.user_data::<Units>().map_or("", |u| u.0);
            Ok(Value::from(format!("{from}{units}")))
        }))
        .unwrap();
    let units = Units("px");
    let ctx = SerializationContext::new(builder.build()).with_user_data(&units);
    assert_eq!(ctx.to_json(&12.0_f64).unwrap(), Value::from("12px"));
}

#[rstest]
#[case(Value::from("42"), 42)]
#[case(Value::from(true), 1)]
#[case(Value::from(41.9), 41)]
fn coercing_formats(#[case] value: Value, #[case] expected: i32) {
    assert_eq!(extract::<i32>(&value, &Formats::coerce()).unwrap(), expected);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Banner,
    Interstitial,
    Native,
}

#[derive(Debug, Default, PartialEq)]
struct Slot {
    id: String,
    floor: f64,
    sizes: Vec<i64>,
    backup: Option<String>,
    placements: BTreeMap<String, Placement>,
}

fn slot_formats(extra_keys: bool) -> Formats {
    let mut slot = ObjectAdapter::<Slot>::new()
        .member(Member::new("id", |s: &Slot| &s.id, |s: &mut Slot| &mut s.id))
        .member(
            Member::new("floor", |s: &Slot| &s.floor, |s: &mut Slot| &mut s.floor)
                .alias("bidfloor")
                .default_value(0.5)
                .default_on_null()
                .check_input(|floor| {
                    if *floor < 0.0 {
                        return Err("floor must not be negative".into());
                    }
                    Ok(())
                }),
        )
        .member(
            Member::new("sizes", |s: &Slot| &s.sizes, |s: &mut Slot| &mut s.sizes)
                .since(Version::new(2, 0)),
        )
        .member(
            Member::new("backup", |s: &Slot| &s.backup, |s: &mut Slot| &mut s.backup)
                .until(Version::new(3, 0)),
        )
        .member(Member::new(
            "placements",
            |s: &Slot| &s.placements,
            |s: &mut Slot| &mut s.placements,
        ));
    if extra_keys {
        slot = slot.on_extract_extra_keys(reject_extra_keys);
    }

    let mut builder = FormatsBuilder::with_bases([Formats::defaults()]);
    builder
        .register_adapter(vec_adapter::<i64>())
        .unwrap()
        .register_adapter(option_adapter::<String>())
        .unwrap()
        .register_adapter(map_adapter::<Placement>())
        .unwrap()
        .register_adapter(EnumAdapter::icase(
            "placement",
            [
                (Placement::Banner, Value::from("banner")),
                (Placement::Interstitial, Value::from("interstitial")),
                (Placement::Interstitial, Value::from("fullscreen")),
                (Placement::Native, Value::from(3)),
            ],
        ))
        .unwrap()
        .register_adapter(slot)
        .unwrap();
    builder.build()
}

const SLOT: &str = r#"{
    "id": "top",
    "bidfloor": 1.25,
    "sizes": [300, 250],
    "backup": null,
    "placements": {"home": "Banner", "article": "FULLSCREEN", "feed": 3}
}"#;

#[test]
fn object_adapter_reads_members_through_their_adapters() {
    let slot: Slot = extract(&parse(SLOT).unwrap(), &slot_formats(false)).unwrap();
    assert_eq!(
        slot,
        Slot {
            id: "top".into(),
            floor: 1.25,
            sizes: vec![300, 250],
            backup: None,
            placements: BTreeMap::from([
                ("article".into(), Placement::Interstitial),
                ("feed".into(), Placement::Native),
                ("home".into(), Placement::Banner),
            ]),
        }
    );
}

#[rstest]
#[case(r#"{"id": "a"}"#, 0.5)]
#[case(r#"{"id": "a", "floor": null}"#, 0.5)]
#[case(r#"{"id": "a", "floor": 2, "bidfloor": 3}"#, 2.0)]
fn member_defaults_and_aliases(#[case] input: &str, #[case] floor: f64) {
    let slot: Slot = extract(&parse(input).unwrap(), &slot_formats(false)).unwrap();
    assert_eq!(slot.floor, floor);
    assert!(slot.sizes.is_empty());
}

#[test]
fn member_failures_carry_the_member_path() {
    let formats = slot_formats(false);

    let err = extract::<Slot>(&parse(r#"{"floor": -1}"#).unwrap(), &formats).unwrap_err();
    assert_eq!(err.path, path!["floor"]);
    assert_eq!(err.message, "floor must not be negative");

    let err = extract::<Slot>(&parse(r#"{"sizes": [1, "2"]}"#).unwrap(), &formats).unwrap_err();
    assert_eq!(err.path, path!["sizes", 1]);

    let err = extract::<Slot>(&parse(r#"{"placements": {"x": "popup"}}"#).unwrap(), &formats)
        .unwrap_err();
    assert_eq!(err.path, path!["placements", "x"]);
    assert_eq!(err.message, r#"Invalid value for placement: "popup""#);

    assert!(extract::<Slot>(&Value::from(1), &formats).is_err());
}

#[test]
fn extra_keys_can_be_rejected() {
    let doc = parse(r#"{"id": "a", "zone": 1, "bidfloor": 2, "area": 0}"#).unwrap();
    assert!(extract::<Slot>(&doc, &slot_formats(false)).is_ok());

    let err = extract::<Slot>(&doc, &slot_formats(true)).unwrap_err();
    assert_eq!(err.message, "Found extra keys in value: area, zone");

    let doc = parse(r#"{"zone": 1}"#).unwrap();
    let err = extract::<Slot>(&doc, &slot_formats(true)).unwrap_err();
    assert_eq!(err.message, "Found extra key in value: zone");
}

#[test]
fn extra_keys_handler_sees_unread_keys() {
    let formats = {
        let mut builder = FormatsBuilder::with_bases([Formats::defaults()]);
        builder
            .register_adapter(
                ObjectAdapter::<Slot>::new()
                    .member(Member::new("id", |s: &Slot| &s.id, |s: &mut Slot| &mut s.id))
                    .on_extract_extra_keys(|_ctx, _from, extra: BTreeSet<String>| {
                        Err(extra.into_iter().collect::<Vec<_>>().join("+").into())
                    }),
            )
            .unwrap();
        builder.build()
    };
    let err = extract::<Slot>(&parse(r#"{"id": "a", "b": 1, "c": 2}"#).unwrap(), &formats)
        .unwrap_err();
    assert_eq!(err.message, "b+c");
}

#[rstest]
#[case(Version::default(), r#"{"backup":"b","floor":1.0,"id":"x","placements":{"p":"interstitial"},"sizes":[1]}"#)]
#[case(Version::new(1, 5), r#"{"backup":"b","floor":1.0,"id":"x","placements":{"p":"interstitial"}}"#)]
#[case(Version::new(2, 0), r#"{"backup":"b","floor":1.0,"id":"x","placements":{"p":"interstitial"},"sizes":[1]}"#)]
#[case(Version::new(3, 1), r#"{"floor":1.0,"id":"x","placements":{"p":"interstitial"},"sizes":[1]}"#)]
fn since_and_until_follow_the_version(#[case] version: Version, #[case] expected: &str) {
    let slot = Slot {
        id: "x".into(),
        floor: 1.0,
        sizes: vec![1],
        backup: Some("b".into()),
        placements: BTreeMap::from([("p".into(), Placement::Interstitial)]),
    };
    let ctx = SerializationContext::new(slot_formats(false)).with_version(version);
    assert_eq!(ctx.to_json(&slot).unwrap().to_string(), expected);
}

#[test]
fn missing_optional_serializes_as_null() {
    let formats = slot_formats(false);
    assert_eq!(to_json(&None::<String>, &formats).unwrap(), Value::Null);
    assert_eq!(
        extract::<Option<String>>(&Value::from("z"), &formats).unwrap(),
        Some("z".into())
    );
}

// The only test in this binary that touches the process-wide formats.
#[test]
fn global_formats_lifecycle() {
    let value = Value::from("7");
    assert!(extract_global::<i64>(&value).is_err());

    let previous = Formats::set_global(Formats::coerce());
    assert_eq!(extract_global::<i64>(&value).unwrap(), 7);
    assert_eq!(to_json_global(&7_i64).unwrap(), Value::from(7));

    let snapshot = Formats::global();
    let replaced = Formats::reset_global();
    assert!(replaced.ptr_eq(&snapshot));
    assert!(extract_global::<i64>(&value).is_err());
    assert_eq!(extract::<i64>(&value, &snapshot).unwrap(), 7);

    assert!(extract_global::<i64>(&Value::from(7)).is_ok());
    drop(previous);
}
