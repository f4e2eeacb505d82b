use floip_expression::{
    evaluate, evaluate_as_string, evaluate_segments, evaluate_with, CallbackModule, Context,
    ContextBuilder, Error, EvalError, ParseError, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn context() -> Context {
    ContextBuilder::default().build(&json!({
        "contact": {
            "name": "Marvin",
            "age": "42",
            "joined": "2019-04-01T09:15:00Z",
            "tags": ["vip", "beta"],
        },
        "balance": 10.5,
    }))
}

#[test]
fn it_renders_shorthand_variables() {
    assert_eq!(
        evaluate("Hello @contact.name", &context()),
        Ok(Value::from("Hello Marvin"))
    );
    assert_eq!(
        evaluate_as_string("@contact.name is @contact.age.", &context()),
        Ok("Marvin is 42.".to_string())
    );
}

#[test]
fn it_keeps_text_only_templates() {
    for text in ["", "plain text", "ünïcode ✓", "email@@example.com"] {
        let expected = text.replace("@@", "@");
        assert_eq!(evaluate(text, &Context::new()), Ok(Value::String(expected)));
    }
}

#[test]
fn it_returns_typed_single_substitutions() {
    let ctx = context();
    assert_eq!(evaluate("@(3 + 2 * 4)", &ctx), Ok(Value::Integer(11)));
    assert_eq!(evaluate("@(2 ^ 3 ^ 2)", &ctx), Ok(Value::Integer(64)));
    assert_eq!(evaluate("@contact.age", &ctx), Ok(Value::Integer(42)));
    assert_eq!(evaluate("@(contact.age >= 18)", &ctx), Ok(Value::Boolean(true)));
    assert!(matches!(evaluate("@contact.joined", &ctx), Ok(Value::DateTime(_))));
    // surrounding text makes it a string
    assert_eq!(evaluate(" @(3 + 2 * 4)", &ctx), Ok(Value::from(" 11")));
}

#[test]
fn it_evaluates_segments() {
    assert_eq!(
        evaluate_segments("@contact.name has @(len(contact.tags)) tags", &context()),
        Ok(vec![
            Value::from("Marvin"),
            Value::from(" has "),
            Value::Integer(2),
            Value::from(" tags"),
        ])
    );
}

#[test]
fn it_calls_functions() {
    let ctx = context();
    assert_eq!(
        evaluate("@(PROPER(LOWER(\"HELLO THERE\")))", &ctx),
        Ok(Value::from("Hello There"))
    );
    assert_eq!(
        evaluate("@(IF(contact.age > 40, \"senior\", \"junior\"))", &ctx),
        Ok(Value::from("senior"))
    );
    assert_eq!(
        evaluate("You owe @(FIXED(balance * 2, 2))", &ctx),
        Ok(Value::from("You owe 21.00"))
    );
    assert_eq!(
        evaluate("@(contact.tags[0] & \"/\" & contact.tags[-1])", &ctx),
        Ok(Value::from("vip/beta"))
    );
    assert_eq!(
        evaluate("@(YEAR(contact.joined))", &ctx),
        Ok(Value::Integer(2019))
    );
}

#[test]
fn it_reports_undefined_variables() {
    assert_eq!(
        evaluate("@(contact.missing)", &context()),
        Err(Error::Eval(EvalError::UndefinedVariable {
            path: "contact.missing".to_string()
        }))
    );
    assert_eq!(
        evaluate("Hi @nobody", &context()),
        Err(Error::Eval(EvalError::UndefinedVariable {
            path: "nobody".to_string()
        }))
    );
}

#[test]
fn it_reports_type_mismatches() {
    assert!(matches!(
        evaluate("@(1 + \"a\")", &Context::new()),
        Err(Error::Eval(EvalError::TypeMismatch { .. }))
    ));
}

#[test]
fn it_reports_parse_errors() {
    assert_eq!(
        evaluate("Hi @(upper(name)", &Context::new()),
        Err(Error::Parse(ParseError::UnbalancedParenthesis { position: 3 }))
    );
    assert_eq!(
        evaluate("Hi @", &Context::new()),
        Err(Error::Parse(ParseError::MissingExpression { position: 3 }))
    );
    assert!(matches!(
        evaluate("@(\"open)", &Context::new()),
        Err(Error::Parse(_))
    ));
}

#[test]
fn it_uses_an_injected_clock() {
    let clock = CallbackModule::new("clock")
        .function("now", 0, |_, _| Ok(Value::from("2020-01-01T00:00:00Z")))
        .function("today", 0, |_, _| Ok(Value::from("2020-01-01")));
    assert_eq!(
        evaluate_with("@(YEAR(NOW())) @(MONTH(TODAY()))", &Context::new(), vec![clock]),
        Ok(Value::from("2020 1"))
    );
}

#[test]
fn it_rejects_arithmetic_without_a_real_result() {
    assert!(matches!(
        evaluate("@((0 - 8) ^ 0.5)", &Context::new()),
        Err(Error::Eval(EvalError::Arithmetic(_)))
    ));
    assert_eq!(
        evaluate("@((0 - 2) ^ 3)", &Context::new()),
        Ok(Value::Integer(-8))
    );
}

#[test]
fn it_compares_numbers_only() {
    let ctx = ContextBuilder::default().build(&json!({ "a": "2020-01-01", "b": "2021-01-01" }));
    for template in ["@(a < b)", "@(\"2020-01-01\" < \"2021-01-01\")"] {
        assert!(
            matches!(
                evaluate(template, &ctx),
                Err(Error::Eval(EvalError::TypeMismatch { .. }))
            ),
            "{}",
            template
        );
    }
    assert_eq!(evaluate("@(YEAR(a) < YEAR(b))", &ctx), Ok(Value::Boolean(true)));
}

#[test]
fn it_bounds_generated_text() {
    assert!(matches!(
        evaluate("@(REPT(\"abc\", 9223372036854775807))", &Context::new()),
        Err(Error::Eval(EvalError::Callback { .. }))
    ));
    assert!(matches!(
        evaluate("@(FIXED(1, 4294967295))", &Context::new()),
        Err(Error::Eval(EvalError::Callback { .. }))
    ));
}
