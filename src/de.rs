//! Декодер GFF контейнера: преобразует байтовый буфер в дерево типизированных структур

use std::io::{Cursor, Seek, SeekFrom};
use byteorder::{ByteOrder, LE, ReadBytesExt};
use encoding::{DecoderTrap, EncodingRef};
use encoding::all::UTF_8;

use crate::error::{Error, Result, SectionKind, UnknownFieldType};
use crate::header::{Header, Signature, HEADER_SIZE};
use crate::label::Label;
use crate::raw::{self, FieldType, Field as RawField, Struct as RawStruct};
use crate::resref::ResRef;
use crate::string::{LocString, StrRef, SubString};
use crate::value::{Struct, Value};

/// Максимальная глубина вложенности структур. Корректные файлы являются деревьями
/// и ограничены куда меньшей глубиной; превышение означает зацикленные ссылки
const MAX_DEPTH: u32 = 128;

macro_rules! read_records {
  ($cursor:expr, $section:expr, $type:ident) => ({
    $cursor.seek(SeekFrom::Start($section.offset as u64))?;
    let mut vec = Vec::with_capacity($section.count as usize);
    for _ in 0..$section.count {
      vec.push($type::read($cursor)?);
    }
    vec
  });
  ($cursor:expr, $section:expr) => ({
    $cursor.seek(SeekFrom::Start($section.offset as u64))?;
    // Размер области указан в байтах, каждая запись занимает 4 байта
    let count = $section.count / 4;
    let mut vec = Vec::with_capacity(count as usize);
    for _ in 0..count {
      vec.push($cursor.read_u32::<LE>()?);
    }
    vec
  });
}

/// Осуществляет разбор GFF контейнера из байтового буфера в дерево структур.
///
/// Декодер загружает все шесть областей файла при создании, проверяя их границы,
/// а затем за один проход строит дерево [`Struct`] от корневой структуры
///
/// [`Struct`]: ../value/struct.Struct.html
pub struct Decoder<'a> {
  /// Заголовок файла, содержащий сигнатуру и карту областей
  header: Header,
  /// Записи структур из файла
  structs: Vec<raw::Struct>,
  /// Записи полей из файла
  fields: Vec<raw::Field>,
  /// Метки полей из файла
  labels: Vec<Label>,
  /// Область с данными комплексных полей
  field_data: &'a [u8],
  /// Область с индексами полей многопольных структур
  field_indices: Vec<u32>,
  /// Область с содержимым списков
  list_indices: Vec<u32>,
  /// Кодировка, используемая для декодирования строк
  encoding: EncodingRef,
  /// Способ обработки ошибок декодирования строк
  trap: DecoderTrap,
  /// Поля с неизвестными идентификаторами типов, встреченные при разборе
  unknown: Vec<UnknownFieldType>,
}

impl<'a> Decoder<'a> {
  /// Создает декодер для чтения GFF контейнера из указанного буфера с использованием
  /// кодировки `UTF-8` для декодирования строк и генерацией ошибки в случае, если
  /// декодировать набор байт, как строку в этой кодировке, не удалось.
  ///
  /// # Ошибки
  /// В случае, если заголовок файла некорректен или объявленные в нем области выходят
  /// за пределы буфера
  pub fn new(bytes: &'a [u8]) -> Result<Self> {
    Self::with_encoding(bytes, UTF_8, DecoderTrap::Strict)
  }
  /// Создает декодер для чтения GFF контейнера из указанного буфера с использованием
  /// указанной кодировки для декодирования строк.
  ///
  /// # Параметры
  /// - `bytes`: Буфер с содержимым файла
  /// - `encoding`: Кодировка для декодирования символов в строках
  /// - `trap`: Способ обработки символов в строках, которые не удалось декодировать с
  ///   использованием выбранной кодировки
  pub fn with_encoding(bytes: &'a [u8], encoding: EncodingRef, trap: DecoderTrap) -> Result<Self> {
    if bytes.len() < HEADER_SIZE {
      return Err(Error::MalformedHeader("file is shorter than 56-byte GFF header"));
    }
    let mut cursor = Cursor::new(bytes);
    let header = Header::read(&mut cursor)?;
    if header.version.major() != 3 {
      return Err(Error::MalformedHeader("unsupported format version"));
    }
    header.check(bytes.len() as u64)?;

    let structs = read_records!(&mut cursor, header.structs, RawStruct);
    let fields  = read_records!(&mut cursor, header.fields, RawField);
    let labels  = read_records!(&mut cursor, header.labels, Label);

    let start = header.field_data.offset as usize;
    let field_data = &bytes[start..start + header.field_data.count as usize];

    let field_indices = read_records!(&mut cursor, header.field_indices);
    let list_indices  = read_records!(&mut cursor, header.list_indices);

    Ok(Decoder {
      header, structs, fields, labels, field_data,
      field_indices, list_indices,
      encoding, trap,
      unknown: Vec::new(),
    })
  }

  /// Сигнатура файла, определяющая вид хранимого в нем ресурса
  #[inline]
  pub fn signature(&self) -> Signature { self.header.signature }

  /// Строит дерево структур от корневой структуры файла.
  ///
  /// # Ошибки
  /// Первая же некорректная ссылка на смещение или индекс завершает разбор. Поля
  /// с неизвестными идентификаторами типов пропускаются, их соседи продолжают
  /// разбираться; если такие поля были, по окончании разбора возвращается ошибка
  /// [`Error::UnknownFieldTypes`] с полным перечнем нарушений
  ///
  /// [`Error::UnknownFieldTypes`]: ../error/enum.Error.html#variant.UnknownFieldTypes
  pub fn decode(mut self) -> Result<Struct> {
    let root = self.read_struct(0, 0)?;
    if !self.unknown.is_empty() {
      return Err(Error::UnknownFieldTypes(self.unknown));
    }
    Ok(root)
  }

  fn read_struct(&mut self, index: u32, depth: u32) -> Result<Struct> {
    if depth > MAX_DEPTH {
      // Дерево такой глубины возможно только при зацикленных ссылках структур
      return Err(Error::InvalidOffset { section: SectionKind::Structs, offset: index as u64 });
    }
    let raw = *self.structs.get(index as usize).ok_or(Error::InvalidOffset {
      section: SectionKind::Structs,
      offset: index as u64,
    })?;

    let mut result = Struct::new(raw.tag);
    match raw.fields {
      0 => {},
      // Единственное поле адресуется индексом прямо из записи структуры
      1 => self.read_field(raw.data, &mut result, depth)?,
      count => {
        if raw.data % 4 != 0 {
          return Err(Error::InvalidOffset { section: SectionKind::FieldIndices, offset: raw.data as u64 });
        }
        let start = (raw.data / 4) as usize;
        let indices = self.field_indices
          .get(start..start + count as usize)
          .ok_or(Error::InvalidOffset { section: SectionKind::FieldIndices, offset: raw.data as u64 })?
          .to_vec();
        for field in indices {
          self.read_field(field, &mut result, depth)?;
        }
      },
    }
    Ok(result)
  }

  fn read_field(&mut self, index: u32, target: &mut Struct, depth: u32) -> Result<()> {
    let field = *self.fields.get(index as usize).ok_or(Error::InvalidOffset {
      section: SectionKind::Fields,
      offset: index as u64,
    })?;
    let label = *self.labels.get(field.label as usize).ok_or(Error::InvalidOffset {
      section: SectionKind::Labels,
      offset: field.label as u64,
    })?;

    let value = match FieldType::from_u32(field.tag) {
      // Неизвестный тип фатален для поля, но соседние поля продолжают разбираться,
      // чтобы диагностика содержала все нарушения сразу
      None => {
        self.unknown.push(UnknownFieldType { field: index, tag: field.tag });
        return Ok(());
      },
      Some(FieldType::Byte)      => Value::Byte(field.data as u8),
      Some(FieldType::Char)      => Value::Char(field.data as u8 as i8),
      Some(FieldType::Word)      => Value::Word(field.data as u16),
      Some(FieldType::Short)     => Value::Short(field.data as u16 as i16),
      Some(FieldType::Dword)     => Value::Dword(field.data),
      Some(FieldType::Int)       => Value::Int(field.data as i32),
      Some(FieldType::Float)     => Value::Float(f32::from_bits(field.data)),
      Some(FieldType::Dword64)   => Value::Dword64(self.read_u64(field.data)?),
      Some(FieldType::Int64)     => Value::Int64(self.read_u64(field.data)? as i64),
      Some(FieldType::Double)    => Value::Double(f64::from_bits(self.read_u64(field.data)?)),
      Some(FieldType::String)    => Value::String(self.read_string(field.data)?),
      Some(FieldType::ResRef)    => Value::ResRef(self.read_resref(field.data)?),
      Some(FieldType::LocString) => Value::LocString(self.read_loc_string(field.data)?),
      Some(FieldType::Void)      => Value::Void(self.read_void(field.data)?),
      Some(FieldType::Struct)    => Value::Struct(self.read_struct(field.data, depth + 1)?),
      Some(FieldType::List)      => Value::List(self.read_list(field.data, depth + 1)?),
    };
    target.fields.insert(label, value);
    Ok(())
  }

//-------------------------------------------------------------------------------------------------
// Чтение данных комплексных полей
//-------------------------------------------------------------------------------------------------
  /// Срез области данных полей длиной `len` байт, начиная с указанного смещения
  fn data_slice(&self, offset: u64, len: usize) -> Result<&'a [u8]> {
    let start = offset as usize;
    start.checked_add(len)
      .and_then(|end| self.field_data.get(start..end))
      .ok_or(Error::InvalidOffset { section: SectionKind::FieldData, offset })
  }
  fn read_u32_at(&self, offset: u64) -> Result<u32> {
    Ok(LE::read_u32(self.data_slice(offset, 4)?))
  }
  fn read_u64(&self, offset: u32) -> Result<u64> {
    Ok(LE::read_u64(self.data_slice(offset as u64, 8)?))
  }
  /// Читает 4 байта длины и следующие за ними байты строки, интерпретирует их
  /// в соответствии с кодировкой декодера и возвращает полученную строку
  fn read_string(&self, offset: u32) -> Result<String> {
    if offset == 0 {
      // Нулевое смещение исторически означает отсутствие данных
      return Ok(String::new());
    }
    let len = self.read_u32_at(offset as u64)? as usize;
    let bytes = self.data_slice(offset as u64 + 4, len)?;
    Ok(self.encoding.decode(bytes, self.trap)?)
  }
  /// Читает 4 байта длины и следующие за ними байты имени ресурса. Принимаются оба
  /// встречающихся на практике представления пустой ссылки: нулевая длина и нулевое
  /// смещение-заглушка
  fn read_resref(&self, offset: u32) -> Result<ResRef> {
    if offset == 0 {
      return Ok(ResRef::default());
    }
    let len = self.read_u32_at(offset as u64)? as usize;
    let bytes = self.data_slice(offset as u64 + 4, len)?;
    Ok(ResRef(bytes.to_owned()))
  }
  /// Читает локализуемую строку: общий размер, ссылку на таблицу локализации,
  /// количество частей и сами части с идентификаторами языка
  fn read_loc_string(&self, offset: u32) -> Result<LocString> {
    if offset == 0 {
      return Ok(LocString::default());
    }
    let mut pos = offset as u64;
    let _total = self.read_u32_at(pos)?;
    let str_ref = StrRef(self.read_u32_at(pos + 4)?);
    let count   = self.read_u32_at(pos + 8)?;
    pos += 12;

    let mut strings = Vec::new();
    for _ in 0..count {
      let id  = self.read_u32_at(pos)?;
      let len = self.read_u32_at(pos + 4)? as usize;
      let bytes = self.data_slice(pos + 8, len)?;
      strings.push(SubString { id, string: self.encoding.decode(bytes, self.trap)? });
      pos += 8 + len as u64;
    }
    Ok(LocString { str_ref, strings })
  }
  /// Читает 4 байта длины и следующие за ними байты произвольных данных
  fn read_void(&self, offset: u32) -> Result<Vec<u8>> {
    if offset == 0 {
      return Ok(Vec::new());
    }
    let len = self.read_u32_at(offset as u64)? as usize;
    Ok(self.data_slice(offset as u64 + 4, len)?.to_owned())
  }
  /// Читает содержимое списка: по байтовому смещению в области индексов списков
  /// расположено количество элементов и индексы структур-элементов
  fn read_list(&mut self, offset: u32, depth: u32) -> Result<Vec<Struct>> {
    if offset % 4 != 0 {
      return Err(Error::InvalidOffset { section: SectionKind::ListIndices, offset: offset as u64 });
    }
    let start = (offset / 4) as usize;
    let count = *self.list_indices.get(start).ok_or(Error::InvalidOffset {
      section: SectionKind::ListIndices,
      offset: offset as u64,
    })? as usize;
    let indices = self.list_indices
      .get(start + 1..start + 1 + count)
      .ok_or(Error::InvalidOffset { section: SectionKind::ListIndices, offset: offset as u64 })?
      .to_vec();

    let mut items = Vec::with_capacity(indices.len());
    for index in indices {
      items.push(self.read_struct(index, depth)?);
    }
    Ok(items)
  }
}

/// Осуществляет разбор GFF контейнера из байтового буфера. Возвращает сигнатуру
/// файла и дерево структур от корня
pub fn decode(bytes: &[u8]) -> Result<(Signature, Struct)> {
  let decoder = Decoder::new(bytes)?;
  let signature = decoder.signature();
  Ok((signature, decoder.decode()?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn too_short_buffer_is_malformed_header() {
    match Decoder::new(b"DLG V3.2") {
      Err(Error::MalformedHeader(..)) => {},
      _ => panic!("expected MalformedHeader"),
    }
  }

  #[test]
  fn wrong_version_is_malformed_header() {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(b"DLG ");
    bytes[4..8].copy_from_slice(b"V9.0");
    match Decoder::new(&bytes) {
      Err(Error::MalformedHeader(..)) => {},
      _ => panic!("expected MalformedHeader"),
    }
  }

  #[test]
  fn truncated_section_is_fatal() {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(b"DLG ");
    bytes[4..8].copy_from_slice(b"V3.2");
    // Одна структура по смещению сразу за заголовком, но самих байт в буфере нет
    bytes[8..12].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
    bytes[12..16].copy_from_slice(&1u32.to_le_bytes());
    match Decoder::new(&bytes) {
      Err(Error::Truncated { section: SectionKind::Structs, .. }) => {},
      _ => panic!("expected Truncated"),
    }
  }
}
