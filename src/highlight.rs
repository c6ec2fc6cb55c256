use crate::models::{Highlight, Value};

pub const DEFAULT_THRESHOLD: f64 = 130.0;

/// Anything that may hold a number: cells, strings, plain numbers.
pub trait Classifiable {
    fn as_float(&self) -> Option<f64>;
}

impl Classifiable for f64 {
    fn as_float(&self) -> Option<f64> {
        Some(*self)
    }
}

impl Classifiable for i32 {
    fn as_float(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl Classifiable for str {
    fn as_float(&self) -> Option<f64> {
        self.trim().parse().ok()
    }
}

impl Classifiable for String {
    fn as_float(&self) -> Option<f64> {
        self.as_str().as_float()
    }
}

impl Classifiable for Value {
    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Text(text) => text.as_float(),
            Value::Missing | Value::Date(_) => None,
        }
    }
}

pub fn classify<T: Classifiable + ?Sized>(value: &T) -> Highlight {
    classify_with(value, DEFAULT_THRESHOLD)
}

/// `>= threshold` is high, below is low. NaN and non-numbers are unclassifiable.
pub fn classify_with<T: Classifiable + ?Sized>(value: &T, threshold: f64) -> Highlight {
    match value.as_float() {
        Some(number) if number >= threshold => Highlight::High,
        Some(number) if number < threshold => Highlight::Low,
        _ => Highlight::Unclassifiable,
    }
}
