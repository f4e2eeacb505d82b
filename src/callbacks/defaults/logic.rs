use super::{arg, bool_arg};
use crate::{
    callbacks::{CallbackModule, LazyArguments},
    eval::{Context, EvalError, EvalResult},
    value::Value,
};

pub(super) fn register(module: CallbackModule) -> CallbackModule {
    module
        .lazy("if", 3, if_)
        .lazy_vargs("and", and)
        .lazy_vargs("or", or)
        .function("not", 1, |_, args| Ok(Value::Boolean(!bool_arg("not", &args, 0)?)))
        .function("isnumber", 1, |_, args| {
            let value = arg("isnumber", &args, 0)?;
            Ok(matches!(value, Value::Integer(_) | Value::Decimal(_)).into())
        })
        .function("isbool", 1, |_, args| {
            Ok(matches!(arg("isbool", &args, 0)?, Value::Boolean(_)).into())
        })
        .function("isstring", 1, |_, args| {
            Ok(matches!(arg("isstring", &args, 0)?, Value::String(_)).into())
        })
}

fn condition(args: &dyn LazyArguments, index: usize) -> EvalResult<bool> {
    let value = args.evaluate(index)?;
    value
        .as_bool()
        .ok_or_else(|| EvalError::type_mismatch("boolean", &value))
}

/// Only the chosen branch is evaluated.
fn if_(_: &Context, args: &dyn LazyArguments) -> EvalResult<Value> {
    if condition(args, 0)? {
        args.evaluate(1)
    } else {
        args.evaluate(2)
    }
}

/// Stops at the first false argument.
fn and(_: &Context, args: &dyn LazyArguments) -> EvalResult<Value> {
    for i in 0..args.len() {
        if !condition(args, i)? {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// Stops at the first true argument.
fn or(_: &Context, args: &dyn LazyArguments) -> EvalResult<Value> {
    for i in 0..args.len() {
        if condition(args, i)? {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{ast::Expression, callbacks::module::missing_argument};

    /// Arguments backed by plain values, counting evaluations.
    struct Values {
        values: Vec<Value>,
        evaluated: Cell<usize>,
    }

    impl Values {
        fn new(values: Vec<Value>) -> Self {
            Self {
                values,
                evaluated: Cell::new(0),
            }
        }
    }

    impl LazyArguments for Values {
        fn len(&self) -> usize {
            self.values.len()
        }

        fn expression(&self, _: usize) -> Option<&Expression> {
            None
        }

        fn evaluate(&self, index: usize) -> EvalResult<Value> {
            self.evaluated.set(self.evaluated.get() + 1);
            self.values
                .get(index)
                .cloned()
                .ok_or_else(|| missing_argument("test", index))
        }
    }

    #[test]
    fn test_if_evaluates_one_branch() {
        let args = Values::new(vec![true.into(), "yes".into(), "no".into()]);
        assert_eq!(if_(&Context::new(), &args), Ok("yes".into()));
        assert_eq!(args.evaluated.get(), 2);

        let args = Values::new(vec!["false".into(), "yes".into(), "no".into()]);
        assert_eq!(if_(&Context::new(), &args), Ok("no".into()));
    }

    #[test]
    fn test_if_rejects_non_boolean_condition() {
        let args = Values::new(vec!["maybe".into(), Value::Nil, Value::Nil]);
        assert!(matches!(
            if_(&Context::new(), &args),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_and_or_short_circuit() {
        let args = Values::new(vec![false.into(), "junk".into()]);
        assert_eq!(and(&Context::new(), &args), Ok(false.into()));
        assert_eq!(args.evaluated.get(), 1);

        let args = Values::new(vec![Value::Integer(1), "junk".into()]);
        assert_eq!(or(&Context::new(), &args), Ok(true.into()));
        assert_eq!(args.evaluated.get(), 1);

        let args = Values::new(vec![true.into(), true.into()]);
        assert_eq!(and(&Context::new(), &args), Ok(true.into()));
        assert_eq!(or(&Context::new(), &Values::new(vec![])), Ok(false.into()));
    }
}
