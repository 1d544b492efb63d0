//! Содержит реализацию типажа `Serialize` для экспорта декодированных деревьев
//! структур в экосистему serde

use serde::ser::{Serialize, SerializeMap, SerializeSeq, SerializeStruct, Serializer};

use crate::label::Label;
use crate::resref::ResRef;
use crate::string::{LocString, StrRef, SubString};
use crate::value::{Struct, Value};

impl Serialize for Label {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    match self.as_str() {
      Ok(value) => serializer.serialize_str(value),
      Err(..) => serializer.serialize_bytes(self.as_ref()),
    }
  }
}

impl Serialize for ResRef {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    match self.as_str() {
      Ok(value) => serializer.serialize_str(value),
      Err(..) => serializer.serialize_bytes(self.as_bytes()),
    }
  }
}

impl Serialize for StrRef {
  #[inline]
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    serializer.serialize_u32(self.0)
  }
}

impl Serialize for SubString {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    let mut state = serializer.serialize_struct("SubString", 2)?;
    state.serialize_field("id", &self.id)?;
    state.serialize_field("string", &self.string)?;
    state.end()
  }
}

impl Serialize for LocString {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    let mut state = serializer.serialize_struct("LocString", 2)?;
    state.serialize_field("str_ref", &self.str_ref)?;
    state.serialize_field("strings", &self.strings)?;
    state.end()
  }
}

impl Serialize for Value {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    use self::Value::*;

    match *self {
      Byte(val)       => serializer.serialize_u8(val),
      Char(val)       => serializer.serialize_i8(val),
      Word(val)       => serializer.serialize_u16(val),
      Short(val)      => serializer.serialize_i16(val),
      Dword(val)      => serializer.serialize_u32(val),
      Int(val)        => serializer.serialize_i32(val),
      Dword64(val)    => serializer.serialize_u64(val),
      Int64(val)      => serializer.serialize_i64(val),
      Float(val)      => serializer.serialize_f32(val),
      Double(val)     => serializer.serialize_f64(val),
      String(ref val) => serializer.serialize_str(val),
      ResRef(ref val) => val.serialize(serializer),
      LocString(ref val) => val.serialize(serializer),
      Void(ref val)   => serializer.serialize_bytes(val),
      Struct(ref val) => val.serialize(serializer),
      List(ref val)   => {
        let mut seq = serializer.serialize_seq(Some(val.len()))?;
        for item in val {
          seq.serialize_element(item)?;
        }
        seq.end()
      },
    }
  }
}

/// Структура сериализуется как отображение меток полей на их значения;
/// идентификатор типа структуры при экспорте не сохраняется
impl Serialize for Struct {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
  {
    let mut map = serializer.serialize_map(Some(self.fields.len()))?;
    for (label, value) in &self.fields {
      map.serialize_entry(label, value)?;
    }
    map.end()
  }
}
