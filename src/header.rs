//! Содержит описания структур заголовка GFF файла: сигнатуру, версию и карту областей

use std::fmt::{self, Display, Formatter};
use std::io::{Read, Write};
use byteorder::{LE, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result, SectionKind};

/// Размер заголовка GFF файла в байтах: сигнатура, версия и шесть описаний областей
pub const HEADER_SIZE: usize = 56;

/// Определяет вид содержимого файла. Сигнатура записана в первых 4-х байтах файла
/// и дополнена пробелами до 4-х символов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 4]);

impl Signature {
  /// Сигнатура диалогового ресурса
  pub const DLG: Signature = Signature(*b"DLG ");

  /// Читает из указанного потока 4 байта сигнатуры файла
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    let mut sig = [0u8; 4];
    reader.read_exact(&mut sig)?;
    Ok(Signature(sig))
  }
  /// Записывает 4 байта сигнатуры в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_all(&self.0)?;
    Ok(())
  }
}

impl From<[u8; 4]> for Signature {
  fn from(arr: [u8; 4]) -> Self { Signature(arr) }
}

impl AsRef<[u8]> for Signature {
  fn as_ref(&self) -> &[u8] { &self.0 }
}

impl Display for Signature {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", String::from_utf8_lossy(&self.0))
  }
}

/// Версия формата файла. Записана во вторых 4-х байтах файла, сразу после сигнатуры
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version([u8; 4]);

impl Version {
  /// Версия GFF формата, записываемая кодировщиком. Исторические файлы данной раскладки
  /// все имеют старший номер версии 3, который декодер и требует
  pub const V3_2: Version = Version(*b"V3.2");

  /// Старший номер версии формата файла, хранимый в байте 1 версии
  #[inline]
  pub fn major(&self) -> u8 { self.0[1].wrapping_sub(b'0') }
  /// Младший номер версии формата файла, хранимый в байте 3 версии
  #[inline]
  pub fn minor(&self) -> u8 { self.0[3].wrapping_sub(b'0') }

  /// Читает версию файла из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;
    Ok(Version(version))
  }
  /// Записывает версию файла в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_all(&self.0)?;
    Ok(())
  }
}

impl Display for Version {
  /// Выводит версию в поток в формате `<major>.<minor>`
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}.{}", self.major(), self.minor())
  }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Описание области файла: смещение от начала файла и количество записей в области
#[derive(Debug, Default, Clone, Copy)]
pub struct Section {
  /// Смещение в байтах от начала файла
  pub offset: u32,
  /// Количество записей по смещению `offset`. Для областей структур, полей и меток --
  /// количество элементов, для областей данных и индексов -- количество байт
  pub count: u32,
}

impl Section {
  /// Читает описание области из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Section {
      offset: reader.read_u32::<LE>()?,
      count:  reader.read_u32::<LE>()?,
    })
  }
  /// Записывает описание области файла в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_u32::<LE>(self.offset)?;
    writer.write_u32::<LE>(self.count)?;
    Ok(())
  }
  /// Размер области в байтах при указанном размере одной записи
  #[inline]
  fn byte_len(&self, element_size: u32) -> u64 {
    self.count as u64 * element_size as u64
  }
  /// Проверяет, что область с записями указанного размера целиком помещается
  /// в буфер длины `available`
  fn check(&self, kind: SectionKind, element_size: u32, available: u64) -> Result<()> {
    let end = self.offset as u64 + self.byte_len(element_size);
    if end > available {
      return Err(Error::Truncated { section: kind, end, available });
    }
    Ok(())
  }
}

/// Заголовок GFF файла. Содержит вид файла, версию формата и информацию о 6 областях
/// файла с данными:
/// - Список структур в файле
/// - Общий список полей всех структур файла
/// - Список уникальных названий полей
/// - Список с данными полей
/// - Вспомогательный список для индексов полей сложных структур
/// - Вспомогательный список для хранения списочных значений полей
#[derive(Debug)]
pub struct Header {
  /// Конкретный вид GFF файла
  pub signature: Signature,
  /// Версия файла
  pub version: Version,

  /// Местоположение и количество структур файла
  pub structs: Section,
  /// Местоположение и количество полей структур файла
  pub fields: Section,
  /// Местоположение и количество меток полей
  pub labels: Section,
  /// Местоположение и размер в байтах области с данными комплексных полей
  pub field_data: Section,
  /// Местоположение и размер в байтах области с индексами полей
  pub field_indices: Section,
  /// Местоположение и размер в байтах области с индексами списков
  pub list_indices: Section,
}

impl Header {
  /// Создает заголовок для пустого файла с указанным типом
  #[inline]
  pub fn new(signature: Signature) -> Self {
    Header {
      signature,
      version:       Version::V3_2,
      structs:       Section::default(),
      fields:        Section::default(),
      labels:        Section::default(),
      field_data:    Section::default(),
      field_indices: Section::default(),
      list_indices:  Section::default(),
    }
  }
  /// Читает значение GFF заголовка из потока
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Header {
      signature:     Signature::read(reader)?,
      version:       Version::read(reader)?,

      structs:       Section::read(reader)?,
      fields:        Section::read(reader)?,
      labels:        Section::read(reader)?,
      field_data:    Section::read(reader)?,
      field_indices: Section::read(reader)?,
      list_indices:  Section::read(reader)?,
    })
  }
  /// Записывает значение GFF заголовка в поток
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    self.signature.write(writer)?;
    self.version.write(writer)?;

    self.structs.write(writer)?;
    self.fields.write(writer)?;
    self.labels.write(writer)?;
    self.field_data.write(writer)?;
    self.field_indices.write(writer)?;
    self.list_indices.write(writer)
  }
  /// Проверяет, что все объявленные в заголовке области целиком помещаются в буфер
  /// длины `available` байт
  pub fn check(&self, available: u64) -> Result<()> {
    self.structs.check(SectionKind::Structs, 12, available)?;
    self.fields.check(SectionKind::Fields, 12, available)?;
    self.labels.check(SectionKind::Labels, 16, available)?;
    self.field_data.check(SectionKind::FieldData, 1, available)?;
    self.field_indices.check(SectionKind::FieldIndices, 1, available)?;
    self.list_indices.check(SectionKind::ListIndices, 1, available)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;
  use super::*;

  #[test]
  fn header_roundtrips_through_stream() {
    let mut header = Header::new(Signature::DLG);
    header.structs = Section { offset: 56, count: 3 };
    header.list_indices = Section { offset: 1000, count: 28 };

    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE);
    assert_eq!(&bytes[0..4], b"DLG ");
    assert_eq!(&bytes[4..8], b"V3.2");

    let read = Header::read(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(read.signature, Signature::DLG);
    assert_eq!(read.version, Version::V3_2);
    assert_eq!(read.structs.count, 3);
    assert_eq!(read.list_indices.offset, 1000);
  }

  #[test]
  fn truncated_section_is_detected() {
    let mut header = Header::new(Signature::DLG);
    header.labels = Section { offset: 56, count: 4 };

    // 4 метки занимают 64 байта, в буфер длиной 100 байт они не влезают
    match header.check(100) {
      Err(Error::Truncated { section: SectionKind::Labels, end: 120, available: 100 }) => {},
      other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
    assert!(header.check(120).is_ok());
  }
}
