//! Validation hook for bound arguments.
//!
//! The engine does not know argument types, so it discovers their shape by
//! driving their `Serialize` impl through a no-output serializer: every struct found
//! at the top level, inside a sequence or as a map value is encoded and handed
//! to the [`Validator`]. Fields of a struct are not descended into; nested
//! validation is the validator's business.

use std::fmt;

use serde::Serialize;
use serde::ser;
use serde_json::{Map, Value};

/// Structural validation of struct-shaped arguments.
pub trait Validator: Send + Sync {
    /// `name` is the Rust type name (or enum variant name) being validated.
    fn validate_struct(&self, name: &'static str, value: &Value) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&'static str, &Value) -> Result<(), String> + Send + Sync,
{
    fn validate_struct(&self, name: &'static str, value: &Value) -> Result<(), String> {
        (self)(name, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

impl ser::Error for ValidationError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValidationError(msg.to_string())
    }
}

/// Validate `value` and, recursively, every sequence element and map value.
pub fn validate<T>(validator: &dyn Validator, value: &T) -> Result<(), ValidationError>
where
    T: Serialize + ?Sized,
{
    value.serialize(ShapeWalker { validator })
}

/// A serializer that produces nothing and only reports structs.
struct ShapeWalker<'a> {
    validator: &'a dyn Validator,
}

impl<'a> ShapeWalker<'a> {
    fn elements(self) -> Elements<'a> {
        Elements {
            validator: self.validator,
        }
    }

    fn record(self, name: &'static str, len: usize) -> StructRecord<'a> {
        StructRecord {
            validator: self.validator,
            name,
            fields: Map::with_capacity(len),
        }
    }
}

macro_rules! skip_scalars {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(fn $method(self, _v: $ty) -> Result<(), ValidationError> {
            Ok(())
        })*
    };
}

impl<'a> ser::Serializer for ShapeWalker<'a> {
    type Ok = ();
    type Error = ValidationError;
    type SerializeSeq = Elements<'a>;
    type SerializeTuple = Elements<'a>;
    type SerializeTupleStruct = Elements<'a>;
    type SerializeTupleVariant = Elements<'a>;
    type SerializeMap = Elements<'a>;
    type SerializeStruct = StructRecord<'a>;
    type SerializeStructVariant = StructRecord<'a>;

    skip_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
        serialize_unit_struct: &'static str,
    }

    fn serialize_none(self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), ValidationError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ValidationError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), ValidationError> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Elements<'a>, ValidationError> {
        Ok(self.elements())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Elements<'a>, ValidationError> {
        Ok(self.elements())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Elements<'a>, ValidationError> {
        Ok(self.elements())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Elements<'a>, ValidationError> {
        Ok(self.elements())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Elements<'a>, ValidationError> {
        Ok(self.elements())
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<StructRecord<'a>, ValidationError> {
        Ok(self.record(name, len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructRecord<'a>, ValidationError> {
        Ok(self.record(variant, len))
    }
}

/// Walks each element of a sequence, tuple or map (values only).
struct Elements<'a> {
    validator: &'a dyn Validator,
}

impl Elements<'_> {
    fn walk<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        value.serialize(ShapeWalker {
            validator: self.validator,
        })
    }
}

impl ser::SerializeSeq for Elements<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.walk(value)
    }

    fn end(self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl ser::SerializeTuple for Elements<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.walk(value)
    }

    fn end(self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Elements<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.walk(value)
    }

    fn end(self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Elements<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.walk(value)
    }

    fn end(self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl ser::SerializeMap for Elements<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, _key: &T) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.walk(value)
    }

    fn end(self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Collects a struct's fields as JSON and validates the struct on `end`.
struct StructRecord<'a> {
    validator: &'a dyn Validator,
    name: &'static str,
    fields: Map<String, Value>,
}

impl StructRecord<'_> {
    fn field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), ValidationError> {
        let value = serde_json::to_value(value).map_err(<ValidationError as ser::Error>::custom)?;
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    fn finish(self) -> Result<(), ValidationError> {
        self.validator
            .validate_struct(self.name, &Value::Object(self.fields))
            .map_err(ValidationError)
    }
}

impl ser::SerializeStruct for StructRecord<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValidationError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), ValidationError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for StructRecord<'_> {
    type Ok = ();
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValidationError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), ValidationError> {
        self.finish()
    }
}
