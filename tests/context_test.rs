use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use floip_expression::{
    literal::LiteralCoercer, Context, ContextBuilder, Engine, EngineConfig, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Host data equivalent to `value`: typed leaves written back as the text a
/// host would have sent.
fn to_raw(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Boolean(b) => json!(b),
        Value::List(items) => items.iter().map(to_raw).collect(),
        Value::Map(entries) => entries
            .iter()
            .map(|(key, value)| (key.clone(), to_raw(value)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
        other => json!(other.to_display_string()),
    }
}

#[test]
fn it_types_string_leaves() {
    let ctx = ContextBuilder::default().build(&json!({
        "flow": {
            "answers": ["12", "yes", "false", "2022-02-02", "07:30:00"],
            "when": "2022-02-02T07:30:00+01:00",
        }
    }));

    let Some(Value::Map(flow)) = ctx.get("flow") else {
        panic!("flow should be a map");
    };
    assert_eq!(
        flow.get("answers"),
        Some(&Value::List(vec![
            Value::Integer(12),
            Value::from("yes"),
            Value::Boolean(false),
            Value::Date(NaiveDate::from_ymd_opt(2022, 2, 2).unwrap()),
            Value::Time(NaiveTime::from_hms_opt(7, 30, 0).unwrap()),
        ]))
    );
    assert_eq!(
        flow.get("when"),
        Some(&Value::DateTime(
            Utc.with_ymd_and_hms(2022, 2, 2, 6, 30, 0).unwrap()
        ))
    );
}

#[test]
fn it_is_idempotent() {
    let builder = ContextBuilder::default();
    let ctx = builder.build(&json!({
        "a": "1",
        "b": { "c": ["x", "2.50", null, true] },
        "d": "31-12-2020 10:00:00",
    }));

    let rebuilt = builder.from_pairs(ctx.as_map().clone());
    assert_eq!(rebuilt, ctx);
    assert_eq!(builder.normalize(ctx.clone().into_value()), ctx.into_value());
}

#[test]
fn it_rebuilds_from_equivalent_raw_data() {
    let builder = ContextBuilder::default();
    let ctx = builder.build(&json!({
        "price": "2.50",
        "count": 3,
        "born": "1999-12-31",
        "alarm": "07:30:00",
        "seen": "2022-02-02T07:30:00+01:00",
        "local": "31-12-2020 10:00:00",
        "phone": "0123456789",
        "intl": "+27123456789",
        "flag": "TRUE",
        "nothing": null,
        "nested": { "list": ["1", "one", "2020-02-29", ["0.1"]] },
    }));

    let raw = to_raw(&ctx.clone().into_value());
    assert_eq!(raw["phone"], json!("0123456789"));
    assert_eq!(raw["price"], json!("2.50"));

    let rebuilt = builder.build(&raw);
    assert_eq!(rebuilt, ctx);
    assert_eq!(
        rebuilt.get("seen"),
        Some(&Value::DateTime(
            Utc.with_ymd_and_hms(2022, 2, 2, 6, 30, 0).unwrap()
        ))
    );
    assert_eq!(
        rebuilt.get("alarm"),
        Some(&Value::Time(NaiveTime::from_hms_opt(7, 30, 0).unwrap()))
    );
    assert_eq!(rebuilt.get("phone"), Some(&Value::from("0123456789")));
}

#[test]
fn it_uses_configured_datetime_formats() {
    let config = EngineConfig {
        datetime_formats: vec!["%m/%d/%Y %H:%M".to_string()],
        ..EngineConfig::default()
    };
    let builder = ContextBuilder::new(LiteralCoercer::from_config(&config));
    let ctx = builder.build(&json!({ "us": "12/31/2020 23:00", "eu": "31-12-2020 23:00:00" }));
    assert_eq!(
        ctx.get("us"),
        Some(&Value::DateTime(
            Utc.with_ymd_and_hms(2020, 12, 31, 23, 0, 0).unwrap()
        ))
    );
    assert_eq!(ctx.get("eu"), Some(&Value::from("31-12-2020 23:00:00")));

    let engine = Engine::new(config).unwrap();
    assert_eq!(
        engine.evaluate("@(MONTH(us))", &engine.build_context(&json!({ "us": "12/31/2020 23:00" }))),
        Ok(Value::Integer(12))
    );
    assert_eq!(
        engine.evaluate("@(MONTH(\"12/31/2020 23:00\"))", &Context::new()),
        Ok(Value::Integer(12))
    );
}

#[test]
fn it_never_fails() {
    let builder = ContextBuilder::default();
    for raw in [
        json!(null),
        json!(42),
        json!([{ "a": 1 }]),
        json!({ "deep": [[[[{ "x": "1e999" }]]]] }),
        json!({ "": "" }),
    ] {
        let _ = builder.build(&raw);
    }

    let pairs = BTreeMap::from([("k".to_string(), Value::from("3"))]);
    assert_eq!(
        builder.from_pairs(pairs).get("k"),
        Some(&Value::Integer(3))
    );
}
