use regex::Regex;
use rust_decimal::RoundingStrategy;

use super::{bool_arg, decimal_arg, integer_arg, text_arg};
use crate::{
    callbacks::CallbackModule,
    eval::{Context, EvalError, EvalResult},
    value::Value,
};

/// Longest text `REPT` may produce, the spreadsheet cell limit.
const MAX_TEXT_CHARS: usize = 32_767;

/// `rust_decimal` cannot represent more fractional digits than this.
const MAX_DECIMAL_PLACES: u32 = 28;

pub(super) fn register(module: CallbackModule, separator: Regex) -> CallbackModule {
    let words = WordSplitter { separator };

    let module = module
        .function("upper", 1, |_, args| {
            Ok(text_arg("upper", &args, 0)?.to_uppercase().into())
        })
        .function("lower", 1, |_, args| {
            Ok(text_arg("lower", &args, 0)?.to_lowercase().into())
        })
        .function("proper", 1, |_, args| Ok(proper(&text_arg("proper", &args, 0)?).into()))
        .function("len", 1, |_, args| {
            Ok(Value::Integer(text_arg("len", &args, 0)?.chars().count() as i64))
        })
        .function("left", 2, left)
        .function("right", 2, right)
        .function("mid", 3, mid)
        .function("rept", 2, rept)
        .function("clean", 1, |_, args| {
            let text = text_arg("clean", &args, 0)?;
            Ok(text.chars().filter(|c| !c.is_control()).collect::<String>().into())
        })
        .function("trim", 1, |_, args| {
            let text = text_arg("trim", &args, 0)?;
            Ok(text.split_whitespace().collect::<Vec<_>>().join(" ").into())
        })
        .function("char", 1, |_, args| from_code("char", &args))
        .function("unichar", 1, |_, args| from_code("unichar", &args))
        .function("code", 1, |_, args| to_code("code", &args))
        .function("unicode", 1, |_, args| to_code("unicode", &args))
        .function("substitute", 3, |_, args| {
            let text = text_arg("substitute", &args, 0)?;
            let old = text_arg("substitute", &args, 1)?;
            let new = text_arg("substitute", &args, 2)?;
            if old.is_empty() {
                return Ok(text.into());
            }
            Ok(text.replace(&old, &new).into())
        })
        .function("text", 1, |_, args| Ok(text_arg("text", &args, 0)?.into()))
        .function("fixed", 1, |_, args| fixed(&args, 2))
        .function("fixed", 2, |_, args| {
            let decimals = integer_arg("fixed", &args, 1)?;
            fixed(&args, decimals)
        })
        .vargs("concatenate", |_, args| {
            Ok(args.iter().map(Value::to_display_string).collect::<String>().into())
        });

    register_words(module, words)
}

fn register_words(module: CallbackModule, words: WordSplitter) -> CallbackModule {
    module
        .function("first_word", 1, |_, args| {
            let text = text_arg("first_word", &args, 0)?;
            Ok(text.split_whitespace().next().unwrap_or_default().into())
        })
        .function("remove_first_word", 1, |_, args| {
            let text = text_arg("remove_first_word", &args, 0)?;
            let rest = text
                .trim_start()
                .split_once(char::is_whitespace)
                .map(|(_, rest)| rest.trim_start())
                .unwrap_or_default();
            Ok(rest.into())
        })
        .function("word", 2, {
            let words = words.clone();
            move |_, args| words.word(&args, false)
        })
        .function("word", 3, {
            let words = words.clone();
            move |_, args| {
                let by_spaces = bool_arg("word", &args, 2)?;
                words.word(&args, by_spaces)
            }
        })
        .function("word_count", 1, {
            let words = words.clone();
            move |_, args| words.count(&args, false)
        })
        .function("word_count", 2, {
            let words = words.clone();
            move |_, args| {
                let by_spaces = bool_arg("word_count", &args, 1)?;
                words.count(&args, by_spaces)
            }
        })
        .function("word_slice", 2, {
            let words = words.clone();
            move |_, args| words.slice(&args, None, false)
        })
        .function("word_slice", 3, {
            let words = words.clone();
            move |_, args| {
                let stop = integer_arg("word_slice", &args, 2)?;
                words.slice(&args, Some(stop), false)
            }
        })
        .function("word_slice", 4, move |_, args| {
            let stop = integer_arg("word_slice", &args, 2)?;
            let by_spaces = bool_arg("word_slice", &args, 3)?;
            words.slice(&args, Some(stop), by_spaces)
        })
}

/// Word boundaries for the `WORD*` family. `by_spaces` switches from the
/// configured separator to plain whitespace.
#[derive(Debug, Clone)]
struct WordSplitter {
    separator: Regex,
}

impl WordSplitter {
    fn split<'a>(&self, text: &'a str, by_spaces: bool) -> Vec<&'a str> {
        if by_spaces {
            text.split_whitespace().collect()
        } else {
            self.separator
                .split(text)
                .filter(|word| !word.is_empty())
                .collect()
        }
    }

    /// 1-based; negative counts from the end. Out of range gives `""`.
    fn word(&self, args: &[Value], by_spaces: bool) -> EvalResult<Value> {
        let text = text_arg("word", args, 0)?;
        let number = integer_arg("word", args, 1)?;
        if number == 0 {
            return Err(EvalError::callback("word", "word number must not be 0"));
        }
        let words = self.split(&text, by_spaces);
        let index = if number > 0 {
            usize::try_from(number - 1).ok()
        } else {
            usize::try_from(number.unsigned_abs())
                .ok()
                .and_then(|back| words.len().checked_sub(back))
        };
        let word = index.and_then(|i| words.get(i)).copied().unwrap_or_default();
        Ok(word.into())
    }

    fn count(&self, args: &[Value], by_spaces: bool) -> EvalResult<Value> {
        let text = text_arg("word_count", args, 0)?;
        Ok(Value::Integer(self.split(&text, by_spaces).len() as i64))
    }

    /// Words `start` (1-based, inclusive) to `stop` (exclusive), joined by a
    /// single space. Negative bounds count from the end; a missing stop means
    /// the end of the text.
    fn slice(&self, args: &[Value], stop: Option<i64>, by_spaces: bool) -> EvalResult<Value> {
        let text = text_arg("word_slice", args, 0)?;
        let start = integer_arg("word_slice", args, 1)?;
        if start == 0 {
            return Err(EvalError::callback("word_slice", "start must not be 0"));
        }
        if stop == Some(0) {
            return Err(EvalError::callback("word_slice", "stop must not be 0"));
        }

        let words = self.split(&text, by_spaces);
        let n = words.len() as i64;
        let from = if start > 0 { start - 1 } else { n + start };
        let to = match stop {
            None => n,
            Some(stop) if stop > 0 => stop - 1,
            Some(stop) => n + stop,
        };

        let from = from.clamp(0, n) as usize;
        let to = to.clamp(0, n) as usize;
        if from >= to {
            return Ok(Value::String(String::new()));
        }
        Ok(words[from..to].join(" ").into())
    }
}

fn proper(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !c.is_alphanumeric();
        }
    }
    out
}

fn char_count(function: &str, args: &[Value], index: usize) -> EvalResult<usize> {
    let count = integer_arg(function, args, index)?;
    usize::try_from(count).map_err(|_| {
        EvalError::callback(function, format!("character count must not be negative: {}", count))
    })
}

fn left(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let text = text_arg("left", &args, 0)?;
    let count = char_count("left", &args, 1)?;
    Ok(text.chars().take(count).collect::<String>().into())
}

fn right(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let text = text_arg("right", &args, 0)?;
    let count = char_count("right", &args, 1)?;
    let len = text.chars().count();
    Ok(text
        .chars()
        .skip(len.saturating_sub(count))
        .collect::<String>()
        .into())
}

/// `MID(text, start, count)` with a 1-based start.
fn mid(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let text = text_arg("mid", &args, 0)?;
    let start = integer_arg("mid", &args, 1)?;
    if start < 1 {
        return Err(EvalError::callback("mid", "start must be at least 1"));
    }
    let count = char_count("mid", &args, 2)?;
    Ok(text
        .chars()
        .skip((start - 1) as usize)
        .take(count)
        .collect::<String>()
        .into())
}

fn rept(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let text = text_arg("rept", &args, 0)?;
    let count = char_count("rept", &args, 1)?;
    let total = text.chars().count().checked_mul(count);
    if !total.is_some_and(|total| total <= MAX_TEXT_CHARS) {
        return Err(EvalError::callback(
            "rept",
            format!("result would exceed {} characters", MAX_TEXT_CHARS),
        ));
    }
    Ok(text.repeat(count).into())
}

fn from_code(function: &str, args: &[Value]) -> EvalResult<Value> {
    let code = integer_arg(function, args, 0)?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::String(c.to_string()))
        .ok_or_else(|| EvalError::callback(function, format!("invalid character code {}", code)))
}

fn to_code(function: &str, args: &[Value]) -> EvalResult<Value> {
    let text = text_arg(function, args, 0)?;
    text.chars()
        .next()
        .map(|c| Value::Integer(i64::from(u32::from(c))))
        .ok_or_else(|| EvalError::callback(function, "empty text"))
}

fn fixed(args: &[Value], decimals: i64) -> EvalResult<Value> {
    let number = decimal_arg("fixed", args, 0)?;
    let places = u32::try_from(decimals)
        .map_err(|_| EvalError::callback("fixed", "decimals must not be negative"))?;
    if places > MAX_DECIMAL_PLACES {
        return Err(EvalError::callback(
            "fixed",
            format!("at most {} decimals are supported", MAX_DECIMAL_PLACES),
        ));
    }
    let rounded = number.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    Ok(format!("{:.*}", places as usize, rounded).into())
}
