use std::sync::Arc;

use floip_expression::{
    compile_block, default_engine, parse_block, parse_template, CallbackModule, Context,
    ContextBuilder, Engine, EngineConfig, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const TEMPLATES: &[&str] = &[
    "Hello @contact.name",
    "@(3 + 2 * 4)",
    "@(2 ^ 3 ^ 2)",
    "@(contact.age / 4)",
    "@(contact.age * 1000000000000 * 1000000000)",
    "@(upper(contact.name) & \"-\" & lower(contact.name))",
    "@(word_slice(\"RapidPro expressions are fun\", 2, 4))",
    "@(if(contact.age > 40, contact.tags[0], contact.nope))",
    "@(if(contact.age < 40, contact.tags[0], contact.nope))",
    "@(or(contact.age = 42, contact.nope))",
    "@(sum(contact.scores) + max(contact.scores))",
    "@(contact.tags[9])",
    "@(contact.missing)",
    "@(1 + \"a\")",
    "@(1 / 0)",
    "@(no_such_function())",
    "@([1, 2, 3][contact.index])",
    "@(DATETIME_ADD(contact.joined, 1, \"M\"))",
    "@(contact)",
    "plain text @@ only",
];

fn context() -> Context {
    ContextBuilder::default().build(&json!({
        "contact": {
            "name": "Marvin",
            "age": 42,
            "tags": ["vip", "beta"],
            "scores": ["1.5", 2, 3],
            "index": "-1",
            "joined": "2019-01-31",
        }
    }))
}

#[test]
fn it_matches_interpreted_evaluation() {
    let engine = default_engine();
    let ctx = context();

    for source in TEMPLATES {
        let interpreted = engine.evaluate(source, &ctx);
        let compiled = engine
            .compile_template(source)
            .and_then(|template| Ok(template.run(&ctx)?));
        assert_eq!(compiled, interpreted, "template: {}", source);

        let interpreted = engine.evaluate_segments(source, &ctx);
        let compiled = engine
            .compile_template(source)
            .and_then(|template| Ok(template.run_segments(&ctx)?));
        assert_eq!(compiled, interpreted, "segments: {}", source);
    }
}

#[test]
fn it_compiles_blocks_once_and_runs_them_often() {
    let compiled = compile_block(&parse_block("price * quantity").unwrap());
    for (price, quantity, total) in [(2, 3, 6), (5, 0, 0), (7, 7, 49)] {
        let mut ctx = Context::new();
        ctx.insert("price", Value::Integer(price));
        ctx.insert("quantity", Value::Integer(quantity));
        assert_eq!(compiled.run(&ctx), Ok(Value::Integer(total)));
    }
    assert_eq!(compiled.expression(), &parse_block("price * quantity").unwrap());
}

#[test]
fn it_runs_compiled_templates_across_threads() {
    let engine = Arc::new(Engine::new(EngineConfig::default()).unwrap());
    let compiled = engine.compile_template("#@(n): @(rept(\"*\", n))").unwrap();

    let handles: Vec<_> = (1..=4)
        .map(|n| {
            let compiled = compiled.clone();
            std::thread::spawn(move || {
                let mut ctx = Context::new();
                ctx.insert("n", Value::Integer(n));
                compiled.run_as_string(&ctx)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        results,
        vec![
            Ok("#1: *".to_string()),
            Ok("#2: **".to_string()),
            Ok("#3: ***".to_string()),
            Ok("#4: ****".to_string()),
        ]
    );
}

#[test]
fn it_binds_custom_functions_at_compile_time() {
    let module = CallbackModule::new("custom").function("double", 1, |_, args| {
        let n = args[0].as_number().map(|n| n.to_decimal() * rust_decimal::Decimal::TWO);
        Ok(n.map(Value::Decimal).unwrap_or(Value::Nil))
    });
    let engine = Engine::with_modules(EngineConfig::default(), vec![module]).unwrap();
    let template = parse_template("@(double(x))").unwrap();
    let compiled = engine.compiler().compile_template(&template);

    let mut ctx = Context::new();
    ctx.insert("x", Value::Integer(21));
    assert_eq!(compiled.run(&ctx), Ok(Value::Integer(42)));
}
