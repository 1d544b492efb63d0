//! Содержит реализацию структуры, описывающей название поля в GFF файле и реализацию типажей для
//! конвертации других типов данных в метку и обратно

use std::fmt;
use std::io::{Read, Write};
use std::result::Result;
use std::str::{from_utf8, FromStr, Utf8Error};

use crate::error::Error;

/// Описание названия поля структуры GFF файла. GFF файл состоит из дерева структур, а каждая
/// структура -- из полей с именем и значением. Имена полей представлены данной структурой.
///
/// В файле метка занимает ровно 16 байт; если текст короче, остаток заполняется нулевыми
/// байтами. Сами данные метки при этом нулевой байт не содержат
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label([u8; 16]);

impl Label {
  /// Возвращает представление данной метки как текста, если он представлен в виде `UTF-8` строки
  pub fn as_str(&self) -> Result<&str, Utf8Error> {
    let len = self.0.iter().position(|&b| b == 0).unwrap_or(self.0.len());
    from_utf8(&self.0[..len])
  }

  /// Пытается создать метку из указанного массива байт.
  ///
  /// # Ошибки
  /// В случае, если длина среза превышает 16 байт, возвращается ошибка
  /// [`Error::TooLongLabel`](./error/enum.Error.html#variant.TooLongLabel)
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
    if bytes.len() > 16 {
      return Err(Error::TooLongLabel(bytes.len()));
    }

    let mut storage = [0u8; 16];
    storage[..bytes.len()].copy_from_slice(bytes);
    Ok(Label(storage))
  }

  /// Читает 16 байт метки из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
    let mut storage = [0u8; 16];
    reader.read_exact(&mut storage)?;
    Ok(Label(storage))
  }
  /// Записывает 16 байт метки в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
    writer.write_all(&self.0)?;
    Ok(())
  }
}

impl fmt::Debug for Label {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if let Ok(value) = self.as_str() {
      return write!(f, "Label({})", value);
    }
    write!(f, "Label(")?;
    self.0.fmt(f)?;
    write!(f, ")")
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let value = self.as_str().map_err(|_| fmt::Error)?;
    write!(f, "{}", value)
  }
}

impl From<[u8; 16]> for Label {
  fn from(arr: [u8; 16]) -> Self { Label(arr) }
}

impl AsRef<[u8]> for Label {
  fn as_ref(&self) -> &[u8] { &self.0 }
}

impl FromStr for Label {
  type Err = Error;

  #[inline]
  fn from_str(value: &str) -> Result<Self, Error> {
    Self::from_bytes(value.as_bytes())
  }
}

#[cfg(test)]
mod tests {
  use super::Label;

  #[test]
  fn label_constructs_from_str() {
    assert_eq!(Label::from(*b"Speaker\0\0\0\0\0\0\0\0\0"), "Speaker".parse().unwrap());
    assert_eq!(Label::from(*b"EndConversation\0"), "EndConversation".parse().unwrap());
    assert!("definitely_too_long_label".parse::<Label>().is_err());
  }

  #[test]
  fn trailing_zeroes_do_not_belong_to_text() {
    let label: Label = "Index".parse().unwrap();
    assert_eq!(label.as_str().unwrap(), "Index");
    assert_eq!(label.to_string(), "Index");
  }
}
