//! A `serde::Serializer` that builds a `Dep` directly. Shapes follow
//! `serde_json::to_value` (structs and maps become `Map`, externally tagged
//! enums, map keys as strings) but numbers are kept exact and non-finite
//! floats survive instead of collapsing to null.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser;
use thiserror::Error;

use super::Dep;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot capture value: {0}")]
pub struct CaptureError(String);

impl ser::Error for CaptureError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

pub(super) struct Capture;

fn capture<T: Serialize + ?Sized>(value: &T) -> Result<Dep, CaptureError> {
    value.serialize(Capture)
}

fn key_string(key: Dep) -> Result<String, CaptureError> {
    match key {
        Dep::Str(s) => Ok(s.to_string()),
        Dep::Int(i) => Ok(i.to_string()),
        Dep::UInt(u) => Ok(u.to_string()),
        Dep::Bool(b) => Ok(b.to_string()),
        other => Err(CaptureError(format!("map key must be a string, got {other:?}"))),
    }
}

fn tagged(variant: &'static str, value: Dep) -> Dep {
    Dep::Map(BTreeMap::from([(variant.to_string(), value)]))
}

impl ser::Serializer for Capture {
    type Ok = Dep;
    type Error = CaptureError;

    type SerializeSeq = SeqCapture;
    type SerializeTuple = SeqCapture;
    type SerializeTupleStruct = SeqCapture;
    type SerializeTupleVariant = SeqCapture;
    type SerializeMap = MapCapture;
    type SerializeStruct = MapCapture;
    type SerializeStructVariant = MapCapture;

    fn serialize_bool(self, v: bool) -> Result<Dep, CaptureError> {
        Ok(Dep::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Dep, CaptureError> {
        if let Ok(i) = i64::try_from(v) {
            return Ok(Dep::Int(i));
        }
        u64::try_from(v)
            .map(Dep::UInt)
            .map_err(|_| CaptureError(format!("integer {v} is out of range")))
    }

    fn serialize_u8(self, v: u8) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Dep, CaptureError> {
        Ok(Dep::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Dep, CaptureError> {
        Ok(Dep::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Dep, CaptureError> {
        u64::try_from(v)
            .map(Dep::from)
            .map_err(|_| CaptureError(format!("integer {v} is out of range")))
    }

    fn serialize_f32(self, v: f32) -> Result<Dep, CaptureError> {
        Ok(Dep::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Dep, CaptureError> {
        Ok(Dep::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Dep, CaptureError> {
        Ok(Dep::Str(v.to_string().into()))
    }

    fn serialize_str(self, v: &str) -> Result<Dep, CaptureError> {
        Ok(Dep::Str(v.into()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Dep, CaptureError> {
        Ok(Dep::Seq(v.iter().map(|b| Dep::Int((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Dep, CaptureError> {
        Ok(Dep::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Dep, CaptureError> {
        capture(value)
    }

    fn serialize_unit(self) -> Result<Dep, CaptureError> {
        Ok(Dep::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Dep, CaptureError> {
        Ok(Dep::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Dep, CaptureError> {
        Ok(Dep::Str(variant.into()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Dep, CaptureError> {
        capture(value)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Dep, CaptureError> {
        Ok(tagged(variant, capture(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(None, len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(None, len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(None, len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(Some(variant), len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::new(None))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::new(None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::new(Some(variant)))
    }
}

/// Sequences, tuples and tuple variants.
pub(super) struct SeqCapture {
    variant: Option<&'static str>,
    items: Vec<Dep>,
}

impl SeqCapture {
    fn new(variant: Option<&'static str>, len: usize) -> Self {
        Self {
            variant,
            items: Vec::with_capacity(len),
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.items.push(capture(value)?);
        Ok(())
    }

    fn finish(self) -> Dep {
        let seq = Dep::Seq(self.items);
        match self.variant {
            Some(variant) => tagged(variant, seq),
            None => seq,
        }
    }
}

impl ser::SerializeSeq for SeqCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value)
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value)
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value)
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value)
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}

/// Maps, structs and struct variants.
pub(super) struct MapCapture {
    variant: Option<&'static str>,
    entries: BTreeMap<String, Dep>,
    key: Option<String>,
}

impl MapCapture {
    fn new(variant: Option<&'static str>) -> Self {
        Self {
            variant,
            entries: BTreeMap::new(),
            key: None,
        }
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), CaptureError> {
        self.entries.insert(key.to_string(), capture(value)?);
        Ok(())
    }

    fn finish(self) -> Dep {
        let map = Dep::Map(self.entries);
        match self.variant {
            Some(variant) => tagged(variant, map),
            None => map,
        }
    }
}

impl ser::SerializeMap for MapCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), CaptureError> {
        self.key = Some(key_string(capture(key)?)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        let key = self
            .key
            .take()
            .ok_or_else(|| CaptureError("map value without a key".to_string()))?;
        self.entries.insert(key, capture(value)?);
        Ok(())
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.insert(key, value)
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapCapture {
    type Ok = Dep;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.insert(key, value)
    }

    fn end(self) -> Result<Dep, CaptureError> {
        Ok(self.finish())
    }
}
