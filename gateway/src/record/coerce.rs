//! Total conversion functions between [`Value`] and each supported scalar
//! kind. Every conversion exists in a strict form (`to_T_strict`, fails on
//! null/unsupported-kind/overflow) and a lenient form (`to_T`/`to_T_or`,
//! swallows the failure behind a caller-supplied or zero default).

use common::err::GatewayError;

use super::time_parse::parse_time;
use super::value::Value;
use chrono::NaiveDateTime;

fn coercion_err(v: &Value, to: &'static str) -> GatewayError {
    GatewayError::CoercionFailure { from: v.kind(), to }
}

pub fn to_bool_strict(v: &Value) -> Result<bool, GatewayError> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::I64(i) => Ok(*i != 0),
        Value::U64(u) => Ok(*u != 0),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(coercion_err(v, "bool")),
        },
        _ => Err(coercion_err(v, "bool")),
    }
}

pub fn to_bool_or(v: &Value, default: bool) -> bool {
    to_bool_strict(v).unwrap_or(default)
}

pub fn to_bool(v: &Value) -> bool {
    to_bool_or(v, false)
}

pub fn to_i64_strict(v: &Value) -> Result<i64, GatewayError> {
    match v {
        Value::I64(i) => Ok(*i),
        Value::U64(u) => i64::try_from(*u).map_err(|_| coercion_err(v, "i64")),
        Value::F64(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Ok(*f as i64)
            } else {
                Err(coercion_err(v, "i64"))
            }
        }
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        Value::Str(s) => s.trim().parse::<i64>().map_err(|_| coercion_err(v, "i64")),
        _ => Err(coercion_err(v, "i64")),
    }
}

pub fn to_i64_or(v: &Value, default: i64) -> i64 {
    to_i64_strict(v).unwrap_or(default)
}

pub fn to_i64(v: &Value) -> i64 {
    to_i64_or(v, 0)
}

pub fn to_u64_strict(v: &Value) -> Result<u64, GatewayError> {
    match v {
        Value::U64(u) => Ok(*u),
        // negative values cannot produce unsigned results
        Value::I64(i) => u64::try_from(*i).map_err(|_| coercion_err(v, "u64")),
        Value::F64(f) => {
            if *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64 {
                Ok(*f as u64)
            } else {
                Err(coercion_err(v, "u64"))
            }
        }
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        Value::Str(s) => s.trim().parse::<u64>().map_err(|_| coercion_err(v, "u64")),
        _ => Err(coercion_err(v, "u64")),
    }
}

pub fn to_u64_or(v: &Value, default: u64) -> u64 {
    to_u64_strict(v).unwrap_or(default)
}

pub fn to_u64(v: &Value) -> u64 {
    to_u64_or(v, 0)
}

pub fn to_f64_strict(v: &Value) -> Result<f64, GatewayError> {
    match v {
        Value::F64(f) => Ok(*f),
        Value::I64(i) => Ok(*i as f64),
        Value::U64(u) => Ok(*u as f64),
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| coercion_err(v, "f64")),
        _ => Err(coercion_err(v, "f64")),
    }
}

pub fn to_f64_or(v: &Value, default: f64) -> f64 {
    to_f64_strict(v).unwrap_or(default)
}

pub fn to_f64(v: &Value) -> f64 {
    to_f64_or(v, 0.0)
}

pub fn to_string_strict(v: &Value) -> Result<String, GatewayError> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::I64(i) => Ok(i.to_string()),
        Value::U64(u) => Ok(u.to_string()),
        Value::F64(f) => Ok(f.to_string()),
        Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|_| coercion_err(v, "string")),
        Value::Time(t) => Ok(t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        _ => Err(coercion_err(v, "string")),
    }
}

pub fn to_string_or(v: &Value, default: String) -> String {
    to_string_strict(v).unwrap_or(default)
}

pub fn to_string_val(v: &Value) -> String {
    to_string_or(v, String::new())
}

pub fn to_bytes_strict(v: &Value) -> Result<Vec<u8>, GatewayError> {
    match v {
        Value::Bytes(b) => Ok(b.clone()),
        Value::Str(s) => Ok(s.clone().into_bytes()),
        _ => Err(coercion_err(v, "bytes")),
    }
}

pub fn to_bytes_or(v: &Value, default: Vec<u8>) -> Vec<u8> {
    to_bytes_strict(v).unwrap_or(default)
}

pub fn to_bytes(v: &Value) -> Vec<u8> {
    to_bytes_or(v, Vec::new())
}

pub fn to_time_strict(v: &Value) -> Result<NaiveDateTime, GatewayError> {
    match v {
        Value::Time(t) => Ok(*t),
        Value::Str(s) => parse_time(s).ok_or_else(|| coercion_err(v, "time")),
        Value::I64(i) => chrono::DateTime::from_timestamp(*i, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| coercion_err(v, "time")),
        Value::U64(u) => chrono::DateTime::from_timestamp(*u as i64, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| coercion_err(v, "time")),
        _ => Err(coercion_err(v, "time")),
    }
}

pub fn to_time_or(v: &Value, default: NaiveDateTime) -> NaiveDateTime {
    to_time_strict(v).unwrap_or(default)
}

pub fn to_array_strict(v: &Value) -> Result<Vec<Value>, GatewayError> {
    match v {
        Value::Array(a) => Ok(a.iter().map(Value::shallow_clone).collect()),
        _ => Err(coercion_err(v, "array")),
    }
}

pub fn to_array(v: &Value) -> Vec<Value> {
    to_array_strict(v).unwrap_or_default()
}

macro_rules! impl_narrow_signed {
    ($($strict:ident, $lenient_or:ident, $lenient:ident => $t:ty),* $(,)?) => {
        $(
            pub fn $strict(v: &Value) -> Result<$t, GatewayError> {
                let i = to_i64_strict(v)?;
                <$t>::try_from(i).map_err(|_| coercion_err(v, stringify!($t)))
            }
            pub fn $lenient_or(v: &Value, default: $t) -> $t {
                $strict(v).unwrap_or(default)
            }
            pub fn $lenient(v: &Value) -> $t {
                $lenient_or(v, 0)
            }
        )*
    };
}

macro_rules! impl_narrow_unsigned {
    ($($strict:ident, $lenient_or:ident, $lenient:ident => $t:ty),* $(,)?) => {
        $(
            pub fn $strict(v: &Value) -> Result<$t, GatewayError> {
                let u = to_u64_strict(v)?;
                <$t>::try_from(u).map_err(|_| coercion_err(v, stringify!($t)))
            }
            pub fn $lenient_or(v: &Value, default: $t) -> $t {
                $strict(v).unwrap_or(default)
            }
            pub fn $lenient(v: &Value) -> $t {
                $lenient_or(v, 0)
            }
        )*
    };
}

impl_narrow_signed!(
    to_i8_strict, to_i8_or, to_i8 => i8,
    to_i16_strict, to_i16_or, to_i16 => i16,
    to_i32_strict, to_i32_or, to_i32 => i32,
);

impl_narrow_unsigned!(
    to_u8_strict, to_u8_or, to_u8 => u8,
    to_u16_strict, to_u16_or, to_u16 => u16,
    to_u32_strict, to_u32_or, to_u32 => u32,
);
