//! Вспомогательный модуль, содержащий описание записей, непосредственно хранимых
//! в областях GFF файла на диске

use std::io::{Read, Write};
use byteorder::{LE, ReadBytesExt, WriteBytesExt};

use crate::error::Result;

/// Типы полей, которые возможно встретить в GFF файле
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FieldType {
  /// Беззнаковое байтовое значение (от 0 до 255), занимающее один байт
  Byte = 0,
  /// Символ текста в диапазоне `0x00-0xFF`, занимающий один байт
  Char = 1,
  /// Беззнаковое целое (от 0 до 65535), занимающее 2 байта
  Word = 2,
  /// Знаковое целое (от -32768 до 32767), занимающее 2 байта
  Short = 3,
  /// Беззнаковое целое, занимающее 4 байта
  Dword = 4,
  /// Знаковое целое, занимающее 4 байта
  Int = 5,
  /// Беззнаковое целое, занимающее 8 байт
  Dword64 = 6,
  /// Знаковое целое, занимающее 8 байт
  Int64 = 7,
  /// Число с плавающей запятой одинарной точности, занимающее 4 байта
  Float = 8,
  /// Число с плавающей запятой двойной точности, занимающее 8 байт
  Double = 9,
  /// Нелокализуемая строка. Используется для текста, который игрок не видит:
  /// комментариев дизайнеров, тегов объектов, ключей параметров скриптов
  String = 10,
  /// Имя файла ресурса, до 16 символов
  ResRef = 11,
  /// Локализуемая строка. Содержит ссылку на таблицу локализации и несколько строк,
  /// каждую со своим номером языка
  LocString = 12,
  /// Произвольные данные любой длины
  Void = 13,
  /// Вложенная структура
  Struct = 14,
  /// Список значений любой длины
  List = 15,
}

impl FieldType {
  /// Возвращает `true`, если данные поля указанного типа хранятся не в записи поля,
  /// а в отдельной области данных GFF файла. Поля типа `Struct` и `List` хранятся
  /// совершенно отдельно и данный метод для них возвращает `false`
  #[inline]
  pub fn is_complex(&self) -> bool {
    use self::FieldType::*;

    match *self {
      Dword64 | Int64 | Double | String | ResRef | LocString | Void => true,
      _ => false,
    }
  }
  /// Определяет тип поля по его числовому идентификатору из файла.
  /// Известные идентификаторы лежат в диапазоне `[0; 15]`
  #[inline]
  pub fn from_u32(value: u32) -> Option<Self> {
    use self::FieldType::*;

    Some(match value {
       0 => Byte,
       1 => Char,
       2 => Word,
       3 => Short,
       4 => Dword,
       5 => Int,
       6 => Dword64,
       7 => Int64,
       8 => Float,
       9 => Double,
      10 => String,
      11 => ResRef,
      12 => LocString,
      13 => Void,
      14 => Struct,
      15 => List,
      _ => return None,
    })
  }
}

/// Описание структуры, как оно хранится в GFF файле: 12 байт
#[derive(Debug, Clone, Copy)]
pub struct Struct {
  /// Идентификатор типа структуры. Почти все исторические писатели записывают сюда 0,
  /// поэтому прочитанное значение сохраняется и используется при повторной записи
  pub tag: u32,
  /// Или индекс в массиве полей (если `self.fields == 1`), или смещение в байтах
  /// в области индексов полей
  pub data: u32,
  /// Количество полей структуры
  pub fields: u32,
}

impl Struct {
  /// Читает 12 байт записи структуры из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Struct {
      tag:    reader.read_u32::<LE>()?,
      data:   reader.read_u32::<LE>()?,
      fields: reader.read_u32::<LE>()?,
    })
  }
  /// Записывает 12 байт записи структуры в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_u32::<LE>(self.tag)?;
    writer.write_u32::<LE>(self.data)?;
    writer.write_u32::<LE>(self.fields)?;
    Ok(())
  }
}

/// Описание поля структуры, как оно хранится в GFF файле: 12 байт
#[derive(Debug, Clone, Copy)]
pub struct Field {
  /// Идентификатор типа поля
  pub tag: u32,
  /// Индекс в массиве меток, определяющий метку, привязанную к данному полю
  pub label: u32,
  /// Сами данные для простых типов или смещение в области с данными для комплексных.
  /// Для поля-структуры -- индекс в массиве структур, для поля-списка -- байтовое
  /// смещение в области индексов списков
  pub data: u32,
}

impl Field {
  /// Читает 12 байт записи поля из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Field {
      tag:   reader.read_u32::<LE>()?,
      label: reader.read_u32::<LE>()?,
      data:  reader.read_u32::<LE>()?,
    })
  }
  /// Записывает 12 байт записи поля в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_u32::<LE>(self.tag)?;
    writer.write_u32::<LE>(self.label)?;
    writer.write_u32::<LE>(self.data)?;
    Ok(())
  }
}
