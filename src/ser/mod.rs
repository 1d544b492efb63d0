//! Кодировщик GFF контейнера: собирает шесть областей файла и записывает их
//! в байтовый буфер вместе с заголовком

use std::collections::HashMap;
use byteorder::{LE, WriteBytesExt};
use encoding::{EncoderTrap, EncodingRef};
use encoding::all::UTF_8;
use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::header::{Header, Section, Signature, HEADER_SIZE};
use crate::label::Label;
use crate::raw::{self, FieldType};
use crate::resref::{ResRef, MAX_RESREF_LEN};
use crate::string::LocString;
use crate::value::{Struct, Value};

mod value;

/// Собирает области GFF файла. Записи полей создаются сразу с окончательными
/// смещениями: данные комплексных полей получают смещение в момент добавления
/// в область данных, а поля-списки -- заранее вычисленное смещение в области
/// индексов списков. Заполнение смещений задним числом в уже созданных полях
/// не применяется
pub struct Encoder {
  /// Записи структур файла
  structs: Vec<raw::Struct>,
  /// Записи полей файла
  fields: Vec<raw::Field>,
  /// Названия всех полей всех структур файла в порядке их добавления, без повторов
  labels: IndexSet<Label>,
  /// Область с данными комплексных полей. Первые 4 байта -- нулевая заглушка,
  /// не дающая реальным данным получить зарезервированное смещение 0
  field_data: Vec<u8>,
  /// Область с индексами полей многопольных структур
  field_indices: Vec<u32>,
  /// Область с содержимым списков. Заполняется последней, в порядке назначения
  /// смещений спискам
  list_indices: Vec<u32>,
  /// Смещения уже записанных локализуемых строк по их байтовому представлению.
  /// Одинаковые тексты разделяют одно место в области данных
  shared_text: HashMap<Vec<u8>, u32>,
  /// Кодировка, используемая для кодирования строк
  encoding: EncodingRef,
  /// Способ обработки символов, не представимых в выбранной кодировке
  trap: EncoderTrap,
}

impl Encoder {
  /// Создает кодировщик, записывающий строки в кодировке `UTF-8`
  #[inline]
  pub fn new() -> Self {
    Self::with_encoding(UTF_8, EncoderTrap::Strict)
  }
  /// Создает кодировщик, записывающий строки в указанной кодировке.
  ///
  /// # Параметры
  /// - `encoding`: Кодировка для символов в строках
  /// - `trap`: Способ обработки символов, которые не удалось представить
  ///   в выбранной кодировке
  pub fn with_encoding(encoding: EncodingRef, trap: EncoderTrap) -> Self {
    Encoder {
      structs: Vec::new(),
      fields: Vec::new(),
      labels: IndexSet::new(),
      field_data: vec![0; 4],
      field_indices: Vec::new(),
      list_indices: Vec::new(),
      shared_text: HashMap::new(),
      encoding,
      trap,
    }
  }

  /// Добавляет в файл структуру с указанным идентификатором типа и возвращает ее индекс.
  /// Поля структуры перечисляются позже, вызовом [`close_struct`](#method.close_struct)
  pub fn add_struct(&mut self, tag: u32) -> u32 {
    self.structs.push(raw::Struct { tag, data: 0, fields: 0 });
    (self.structs.len() - 1) as u32
  }

  /// Завершает структуру, привязывая к ней перечисленные поля. Единственное поле
  /// адресуется индексом прямо из записи структуры; несколько полей -- через
  /// непрерывный участок области индексов полей
  pub fn close_struct(&mut self, index: u32, fields: &[u32]) -> Result<()> {
    if index as usize >= self.structs.len() {
      return Err(Error::Invariant("close_struct called for unknown struct".into()));
    }
    let data = match fields.len() {
      0 => 0,
      1 => fields[0],
      _ => {
        let offset = (self.field_indices.len() * 4) as u32;
        self.field_indices.extend_from_slice(fields);
        offset
      },
    };
    let record = &mut self.structs[index as usize];
    record.data = data;
    record.fields = fields.len() as u32;
    Ok(())
  }

  /// Добавляет в список известных названий полей указанное и возвращает его индекс
  /// в этом списке. Если такое название уже имеется, повторно оно не добавляется
  pub fn add_label(&mut self, label: Label) -> u32 {
    if let Some((index, ..)) = self.labels.get_full(&label) {
      return index as u32;
    }
    self.labels.insert(label);
    (self.labels.len() - 1) as u32
  }

  /// Добавляет запись поля с уже вычисленным содержимым `data` и возвращает индекс поля
  pub fn add_field(&mut self, label: Label, tag: FieldType, data: u32) -> u32 {
    let label = self.add_label(label);
    self.fields.push(raw::Field { tag: tag as u32, label, data });
    (self.fields.len() - 1) as u32
  }

//-------------------------------------------------------------------------------------------------
// Создание полей конкретных типов
//-------------------------------------------------------------------------------------------------
  /// Создает поле с байтовым значением
  pub fn field_byte(&mut self, label: &str, value: u8) -> Result<u32> {
    Ok(self.add_field(label.parse()?, FieldType::Byte, value as u32))
  }
  /// Создает поле с 4-байтовым беззнаковым значением
  pub fn field_dword(&mut self, label: &str, value: u32) -> Result<u32> {
    Ok(self.add_field(label.parse()?, FieldType::Dword, value))
  }
  /// Создает строковое поле, добавляя текст в область данных
  pub fn field_string(&mut self, label: &str, value: &str) -> Result<u32> {
    let offset = self.append_string(value)?;
    Ok(self.add_field(label.parse()?, FieldType::String, offset))
  }
  /// Создает поле со ссылкой на ресурс, добавляя ее в область данных
  pub fn field_resref(&mut self, label: &str, value: &ResRef) -> Result<u32> {
    let offset = self.append_resref(value)?;
    Ok(self.add_field(label.parse()?, FieldType::ResRef, offset))
  }
  /// Создает поле с локализуемой строкой, добавляя ее в область данных
  pub fn field_loc_string(&mut self, label: &str, value: &LocString) -> Result<u32> {
    let offset = self.append_loc_string(value)?;
    Ok(self.add_field(label.parse()?, FieldType::LocString, offset))
  }
  /// Создает поле-список, ссылающееся на заранее вычисленное байтовое смещение
  /// в области индексов списков
  pub fn field_list(&mut self, label: &str, offset: u32) -> Result<u32> {
    Ok(self.add_field(label.parse()?, FieldType::List, offset))
  }

//-------------------------------------------------------------------------------------------------
// Добавление данных комплексных полей
//-------------------------------------------------------------------------------------------------
  /// Дополняет область данных нулями до границы 4 байт
  fn align(&mut self) {
    while self.field_data.len() % 4 != 0 {
      self.field_data.push(0);
    }
  }
  /// Добавляет 8-байтовое значение и возвращает его смещение
  fn append_u64(&mut self, value: u64) -> u32 {
    let offset = self.field_data.len() as u32;
    self.field_data.extend_from_slice(&value.to_le_bytes());
    offset
  }
  /// Добавляет 4 байта длины и байты строки в выбранной кодировке,
  /// возвращает смещение записанных данных
  fn append_string(&mut self, value: &str) -> Result<u32> {
    let bytes = self.encoding.encode(value, self.trap)?;
    let offset = self.field_data.len() as u32;
    self.field_data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    self.field_data.extend_from_slice(&bytes);
    self.align();
    Ok(offset)
  }
  /// Добавляет 4 байта длины и байты имени ресурса. Пустая ссылка также занимает
  /// 4 байта длины: записывать вместо нее зарезервированное смещение 0 нельзя
  fn append_resref(&mut self, value: &ResRef) -> Result<u32> {
    if value.len() > MAX_RESREF_LEN {
      return Err(Error::TooLongResRef(value.len()));
    }
    let offset = self.field_data.len() as u32;
    self.field_data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    self.field_data.extend_from_slice(value.as_bytes());
    self.align();
    Ok(offset)
  }
  /// Добавляет локализуемую строку: общий размер, ссылку на таблицу локализации,
  /// количество частей и сами части. Одинаковые строки разделяют одно смещение
  fn append_loc_string(&mut self, value: &LocString) -> Result<u32> {
    let mut payload = Vec::new();
    let mut encoded = Vec::with_capacity(value.strings.len());
    let mut total = 8u32;
    for sub in &value.strings {
      let bytes = self.encoding.encode(&sub.string, self.trap)?;
      total += 8 + bytes.len() as u32;
      encoded.push((sub.id, bytes));
    }
    payload.extend_from_slice(&total.to_le_bytes());
    payload.extend_from_slice(&value.str_ref.0.to_le_bytes());
    payload.extend_from_slice(&(value.strings.len() as u32).to_le_bytes());
    for (id, bytes) in encoded {
      payload.extend_from_slice(&id.to_le_bytes());
      payload.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
      payload.extend_from_slice(&bytes);
    }

    if let Some(&offset) = self.shared_text.get(&payload) {
      return Ok(offset);
    }
    let offset = self.field_data.len() as u32;
    self.field_data.extend_from_slice(&payload);
    self.align();
    self.shared_text.insert(payload, offset);
    Ok(offset)
  }
  /// Добавляет 4 байта длины и байты произвольных данных
  fn append_void(&mut self, value: &[u8]) -> u32 {
    let offset = self.field_data.len() as u32;
    self.field_data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    self.field_data.extend_from_slice(value);
    self.align();
    offset
  }

//-------------------------------------------------------------------------------------------------
// Списки
//-------------------------------------------------------------------------------------------------
  /// Записывает содержимое списка в область индексов списков. Списки обязаны
  /// записываться в том же порядке, в котором им назначались смещения; нарушение
  /// порядка означает ошибку планирования и завершает кодирование
  pub fn commit_list(&mut self, offset: u32, indices: &[u32]) -> Result<()> {
    if (self.list_indices.len() * 4) as u32 != offset {
      return Err(Error::Invariant("list is written at a different offset than planned".into()));
    }
    self.list_indices.push(indices.len() as u32);
    self.list_indices.extend_from_slice(indices);
    Ok(())
  }

//-------------------------------------------------------------------------------------------------
// Кодирование произвольного дерева структур
//-------------------------------------------------------------------------------------------------
  /// Добавляет в файл дерево структур, обходя его в глубину, и возвращает индекс
  /// корневой структуры дерева. Смещения спискам назначаются в порядке обхода
  pub fn encode_tree(&mut self, root: &Struct) -> Result<u32> {
    let mut planned = 0;
    let mut pending = Vec::new();
    let index = self.write_tree_struct(root, &mut planned, &mut pending)?;
    for (offset, indices) in pending {
      self.commit_list(offset, &indices)?;
    }
    Ok(index)
  }

  fn write_tree_struct(
    &mut self,
    struct_: &Struct,
    planned: &mut u32,
    pending: &mut Vec<(u32, Vec<u32>)>,
  ) -> Result<u32> {
    let index = self.add_struct(struct_.tag);
    let mut fields = Vec::with_capacity(struct_.fields.len());
    for (&label, value) in &struct_.fields {
      let field = match value {
        Value::Byte(v)      => self.add_field(label, FieldType::Byte, *v as u32),
        Value::Char(v)      => self.add_field(label, FieldType::Char, *v as u8 as u32),
        Value::Word(v)      => self.add_field(label, FieldType::Word, *v as u32),
        Value::Short(v)     => self.add_field(label, FieldType::Short, *v as u16 as u32),
        Value::Dword(v)     => self.add_field(label, FieldType::Dword, *v),
        Value::Int(v)       => self.add_field(label, FieldType::Int, *v as u32),
        Value::Float(v)     => self.add_field(label, FieldType::Float, v.to_bits()),
        Value::Dword64(v)   => {
          let offset = self.append_u64(*v);
          self.add_field(label, FieldType::Dword64, offset)
        },
        Value::Int64(v)     => {
          let offset = self.append_u64(*v as u64);
          self.add_field(label, FieldType::Int64, offset)
        },
        Value::Double(v)    => {
          let offset = self.append_u64(v.to_bits());
          self.add_field(label, FieldType::Double, offset)
        },
        Value::String(v)    => {
          let offset = self.append_string(v)?;
          self.add_field(label, FieldType::String, offset)
        },
        Value::ResRef(v)    => {
          let offset = self.append_resref(v)?;
          self.add_field(label, FieldType::ResRef, offset)
        },
        Value::LocString(v) => {
          let offset = self.append_loc_string(v)?;
          self.add_field(label, FieldType::LocString, offset)
        },
        Value::Void(v)      => {
          let offset = self.append_void(v);
          self.add_field(label, FieldType::Void, offset)
        },
        Value::Struct(v)    => {
          let child = self.write_tree_struct(v, planned, pending)?;
          self.add_field(label, FieldType::Struct, child)
        },
        Value::List(items)  => {
          let offset = *planned;
          *planned += 4 + 4 * items.len() as u32;
          let slot = pending.len();
          pending.push((offset, Vec::with_capacity(items.len())));
          let field = self.add_field(label, FieldType::List, offset);
          for item in items {
            let child = self.write_tree_struct(item, planned, pending)?;
            pending[slot].1.push(child);
          }
          field
        },
      };
      fields.push(field);
    }
    self.close_struct(index, &fields)?;
    Ok(index)
  }

//-------------------------------------------------------------------------------------------------
  /// Завершает кодирование: вычисляет карту областей и записывает заголовок
  /// и все области в байтовый буфер
  pub fn finish(self, signature: Signature) -> Result<Vec<u8>> {
    let structs_len = (self.structs.len() * 12) as u32;
    let fields_len  = (self.fields.len() * 12) as u32;
    let labels_len  = (self.labels.len() * 16) as u32;
    let data_len    = self.field_data.len() as u32;
    let fi_len      = (self.field_indices.len() * 4) as u32;
    let li_len      = (self.list_indices.len() * 4) as u32;

    let mut header = Header::new(signature);
    let mut offset = HEADER_SIZE as u32;
    header.structs       = Section { offset, count: self.structs.len() as u32 };
    offset += structs_len;
    header.fields        = Section { offset, count: self.fields.len() as u32 };
    offset += fields_len;
    header.labels        = Section { offset, count: self.labels.len() as u32 };
    offset += labels_len;
    header.field_data    = Section { offset, count: data_len };
    offset += data_len;
    header.field_indices = Section { offset, count: fi_len };
    offset += fi_len;
    header.list_indices  = Section { offset, count: li_len };
    offset += li_len;

    let mut bytes = Vec::with_capacity(offset as usize);
    header.write(&mut bytes)?;
    for struct_ in &self.structs {
      struct_.write(&mut bytes)?;
    }
    for field in &self.fields {
      field.write(&mut bytes)?;
    }
    for label in &self.labels {
      label.write(&mut bytes)?;
    }
    bytes.extend_from_slice(&self.field_data);
    for index in &self.field_indices {
      bytes.write_u32::<LE>(*index)?;
    }
    for index in &self.list_indices {
      bytes.write_u32::<LE>(*index)?;
    }
    Ok(bytes)
  }
}

impl Default for Encoder {
  #[inline]
  fn default() -> Self { Encoder::new() }
}

/// Записывает дерево структур в байтовое представление GFF файла с указанной сигнатурой
pub fn encode(signature: Signature, root: &Struct) -> Result<Vec<u8>> {
  let mut encoder = Encoder::new();
  encoder.encode_tree(root)?;
  encoder.finish(signature)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_data_offset_zero_is_reserved() {
    let mut encoder = Encoder::new();
    // Первая же строка получает смещение за нулевой заглушкой
    let offset = encoder.append_string("").unwrap();
    assert_eq!(offset, 4);
    // Пустая строка занимает 4 байта длины
    assert_eq!(encoder.append_string("").unwrap(), 8);
  }

  #[test]
  fn variable_payloads_are_aligned() {
    let mut encoder = Encoder::new();
    assert_eq!(encoder.append_string("ab").unwrap(), 4);
    // 4 байта длины + 2 байта текста выравниваются до 12
    assert_eq!(encoder.append_string("x").unwrap(), 12);
  }

  #[test]
  fn equal_loc_strings_share_offset() {
    let mut encoder = Encoder::new();
    let text = LocString::new("Hello");
    let first = encoder.append_loc_string(&text).unwrap();
    let second = encoder.append_loc_string(&text).unwrap();
    assert_eq!(first, second);
    assert_ne!(encoder.append_loc_string(&LocString::new("Bye")).unwrap(), first);
  }

  #[test]
  fn lists_are_committed_in_planned_order() {
    let mut encoder = Encoder::new();
    encoder.commit_list(0, &[0, 1]).unwrap();
    encoder.commit_list(12, &[2]).unwrap();
    // Следующий список обязан начинаться с байта 20
    match encoder.commit_list(24, &[]) {
      Err(Error::Invariant(..)) => {},
      _ => panic!("expected Invariant"),
    }
  }

  #[test]
  fn labels_are_not_duplicated() {
    let mut encoder = Encoder::new();
    let a = encoder.field_dword("Index", 0).unwrap();
    let b = encoder.field_dword("Index", 1).unwrap();
    assert_ne!(a, b);
    assert_eq!(encoder.labels.len(), 1);
  }
}
