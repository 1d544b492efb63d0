//! Содержит реализации структур, описывающих локализуемые строки, хранящиеся в GFF файле

use std::fmt;

/// Маска, определяющая принадлежность строки TLK файлу модуля
const USER_TLK_MASK: u32 = 0x8000_0000;

/// Индекс в файле `dialog.tlk`, содержащий локализованный текст
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrRef(pub u32);

impl StrRef {
  /// Значение, записываемое в файл, когда ссылки на таблицу локализации нет
  pub const ABSENT: StrRef = StrRef(0xFFFF_FFFF);

  /// Определяет, что ссылка на таблицу локализации отсутствует
  #[inline]
  pub fn is_absent(&self) -> bool { self.0 == Self::ABSENT.0 }

  /// Определяет, является ли строка индексом не из основного TLK файла игры, а из TLK
  /// файла модуля. Строка является строкой из TLK файла модуля, если старший бит в ее
  /// идентификаторе взведен
  #[inline]
  pub fn is_user(&self) -> bool { !self.is_absent() && self.0 & USER_TLK_MASK != 0 }

  /// Определяет индекс строки в TLK файле
  #[inline]
  pub fn code(&self) -> u32 { self.0 & !USER_TLK_MASK }
}

impl fmt::Debug for StrRef {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if self.is_absent() {
      return write!(f, "StrRef(absent)");
    }
    write!(f, "StrRef(code: {}, user: {})", self.code(), self.is_user())
  }
}

impl Default for StrRef {
  #[inline]
  fn default() -> Self { StrRef::ABSENT }
}

/// Виды языков, на которых могут храниться локализованные строки в объекте [`LocString`]
///
/// [`LocString`]: struct.LocString.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
  /// Английский язык
  English = 0,
  /// Французский язык
  French  = 1,
  /// Немецкий язык
  German  = 2,
  /// Итальянский язык
  Italian = 3,
  /// Испанский язык
  Spanish = 4,
  /// Польский язык
  Polish  = 5,
  /// Корейский язык
  Korean  = 128,
  /// Традиционный китайский
  ChineseTraditional = 129,
  /// Упрощенный китайский
  ChineseSimplified  = 130,
  /// Японский
  Japanese = 131,
}

impl Language {
  /// Определяет язык по его номеру из файла. Для неизвестных номеров возвращает `None`
  pub fn from_u32(value: u32) -> Option<Self> {
    use self::Language::*;

    Some(match value {
      0 => English,
      1 => French,
      2 => German,
      3 => Italian,
      4 => Spanish,
      5 => Polish,
      128 => Korean,
      129 => ChineseTraditional,
      130 => ChineseSimplified,
      131 => Japanese,
      _ => return None,
    })
  }
}

/// Виды пола персонажа, для которых могут храниться отдельные локализованные строки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
  /// Строка предназначена для персонажа мужского или неопределенного пола
  Male = 0,
  /// Строка предназначена для персонажа женского пола
  Female = 1,
}

/// Часть локализованной строки, хранящая текст для одного языка и пола.
///
/// В файле идентификатор части хранится одним числом: номер языка, умноженный на 2,
/// плюс номер пола. Идентификатор хранится в сыром виде, чтобы файлы с неизвестными
/// номерами языков выживали при повторной записи
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubString {
  /// Идентификатор языка и пола, как он записан в файле
  pub id: u32,
  /// Текст многоязыковой строки для данного языка и пола
  pub string: String,
}

impl SubString {
  /// Создает часть локализованной строки для указанного языка и пола
  #[inline]
  pub fn new(language: Language, gender: Gender, string: String) -> Self {
    SubString { id: (language as u32) * 2 + gender as u32, string }
  }
  /// Язык данной части строки, если его номер известен
  #[inline]
  pub fn language(&self) -> Option<Language> { Language::from_u32(self.id / 2) }
  /// Пол персонажа, для которого написана данная часть строки
  #[inline]
  pub fn gender(&self) -> Gender {
    if self.id % 2 == 0 { Gender::Male } else { Gender::Female }
  }
}

/// Локализуемая строка: ссылка на строку во внешней таблице локализации и/или набор
/// строк для конкретных языков, хранимый прямо в файле
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct LocString {
  /// Индекс в TLK файле, содержащий локализованный текст
  pub str_ref: StrRef,
  /// Список локализованных строк для каждого языка и пола
  pub strings: Vec<SubString>,
}

impl LocString {
  /// Создает локализованную строку с единственной частью для английского языка
  /// и без ссылки на внешнюю таблицу
  pub fn new<S: Into<String>>(text: S) -> Self {
    LocString {
      str_ref: StrRef::ABSENT,
      strings: vec![SubString::new(Language::English, Gender::Male, text.into())],
    }
  }
  /// Текст первой части строки -- текст на языке по умолчанию
  #[inline]
  pub fn first(&self) -> Option<&str> {
    self.strings.first().map(|s| s.string.as_str())
  }
  /// Текст части строки с указанным идентификатором языка и пола
  pub fn get(&self, id: u32) -> Option<&str> {
    self.strings.iter().find(|s| s.id == id).map(|s| s.string.as_str())
  }
  /// Возвращает `true`, если строка не содержит ни частей, ни ссылки на таблицу
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.str_ref.is_absent() && self.strings.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn substring_id_packs_language_and_gender() {
    let sub = SubString::new(Language::German, Gender::Female, "Hallo".into());
    assert_eq!(sub.id, 5);
    assert_eq!(sub.language(), Some(Language::German));
    assert_eq!(sub.gender(), Gender::Female);
  }

  #[test]
  fn unknown_language_is_preserved() {
    let sub = SubString { id: 1000, string: "?".into() };
    assert_eq!(sub.language(), None);
    assert_eq!(sub.gender(), Gender::Male);
  }
}
