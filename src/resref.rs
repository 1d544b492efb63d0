//! Содержит реализацию структуры, описывающей ссылку на ресурс и реализацию типажей для
//! конвертации других типов данных в ссылку и обратно

use std::fmt;
use std::str::{self, FromStr, Utf8Error};

use crate::error::Error;

/// Максимальная длина ссылки на ресурс в байтах
pub const MAX_RESREF_LEN: usize = 16;

/// Представляет ссылку на игровой ресурс: имя файла скрипта, звука или шаблона объекта
/// без расширения. Ссылка не превышает 16 байт; пустая ссылка означает отсутствие ресурса
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ResRef(pub(crate) Vec<u8>);

impl ResRef {
  /// Пытается создать ссылку на ресурс из указанного массива байт.
  ///
  /// # Ошибки
  /// В случае, если длина среза превышает 16 байт, возвращается ошибка
  /// [`Error::TooLongResRef`](./error/enum.Error.html#variant.TooLongResRef)
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
    if bytes.len() > MAX_RESREF_LEN {
      return Err(Error::TooLongResRef(bytes.len()));
    }
    Ok(ResRef(bytes.to_owned()))
  }

  /// Возвращает `true`, если ссылка не указывает ни на какой ресурс
  #[inline]
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Длина ссылки в байтах
  #[inline]
  pub fn len(&self) -> usize { self.0.len() }

  /// Байтовое представление ссылки, как оно хранится в файле
  #[inline]
  pub fn as_bytes(&self) -> &[u8] { &self.0 }

  /// Возвращает представление данной ссылки на ресурс как строки, если она представлена
  /// в виде `UTF-8` строки
  #[inline]
  pub fn as_str(&self) -> Result<&str, Utf8Error> {
    str::from_utf8(&self.0)
  }
}

impl fmt::Debug for ResRef {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if let Ok(value) = str::from_utf8(&self.0) {
      return write!(f, "ResRef({})", value);
    }
    self.0.fmt(f)
  }
}

impl fmt::Display for ResRef {
  #[inline]
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let value = self.as_str().map_err(|_| fmt::Error)?;
    write!(f, "{}", value)
  }
}

impl FromStr for ResRef {
  type Err = Error;

  #[inline]
  fn from_str(value: &str) -> Result<Self, Error> {
    Self::from_bytes(value.as_bytes())
  }
}

#[cfg(test)]
mod tests {
  use super::ResRef;

  #[test]
  fn resref_respects_length_limit() {
    assert!("nw_all_mod001".parse::<ResRef>().is_ok());
    assert!("".parse::<ResRef>().unwrap().is_empty());
    assert!("name_longer_than_16b".parse::<ResRef>().is_err());
  }
}
