use chrono::NaiveDateTime;

use super::Record;

/// The enumerated set of scalar/composite kinds a [`Record`] column can
/// hold. `Opaque` absorbs anything that doesn't fit one of the named kinds
/// (e.g. a JSON shape with no natural scalar mapping) so round-tripping
/// through JSON never loses data, per the "open-ended dynamic value" design
/// note.
#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Time(NaiveDateTime),
    Array(Vec<Value>),
    Record(Record),
    Opaque(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Shallow clone: scalars copy, `Record` aliases the same handle.
    /// Never exposed directly on `Record` itself — only values that flow
    /// through the column map are copied this way.
    pub(crate) fn shallow_clone(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::I64(v) => Value::I64(*v),
            Value::U64(v) => Value::U64(*v),
            Value::F64(v) => Value::F64(*v),
            Value::Str(s) => Value::Str(s.clone()),
            Value::Bytes(b) => Value::Bytes(b.clone()),
            Value::Time(t) => Value::Time(*t),
            Value::Array(a) => Value::Array(a.iter().map(Value::shallow_clone).collect()),
            Value::Record(r) => Value::Record(r.share()),
            Value::Opaque(v) => Value::Opaque(v.clone()),
        }
    }
}

/// Normalizing ingestion for the public `Record::set` path. Implemented for
/// the scalar kinds plus `Option<T>` (nil pointer -> null) and `Box<T>`
/// (pointer to a scalar -> that scalar), mirroring the pointer-dereference
/// rules of the value coercion component. `Record`/`Vec<Value>` inputs are
/// deep-copied by `Record::set` itself (not here) to break aliasing.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! impl_into_value_signed {
    ($($t:ty),*) => {
        $(impl IntoValue for $t {
            fn into_value(self) -> Value {
                Value::I64(self as i64)
            }
        })*
    };
}

macro_rules! impl_into_value_unsigned {
    ($($t:ty),*) => {
        $(impl IntoValue for $t {
            fn into_value(self) -> Value {
                Value::U64(self as u64)
            }
        })*
    };
}

impl_into_value_signed!(i8, i16, i32, i64, isize);
impl_into_value_unsigned!(u8, u16, u32, u64, usize);

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::F64(self as f64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::F64(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Bytes(self)
    }
}

impl IntoValue for NaiveDateTime {
    fn into_value(self) -> Value {
        Value::Time(self)
    }
}

impl IntoValue for serde_json::Value {
    fn into_value(self) -> Value {
        Value::Opaque(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            None => Value::Null,
            Some(v) => v.into_value(),
        }
    }
}

impl<T: IntoValue> IntoValue for Box<T> {
    fn into_value(self) -> Value {
        (*self).into_value()
    }
}

impl IntoValue for Record {
    fn into_value(self) -> Value {
        Value::Record(self)
    }
}
