//! Содержит типизированное представление значений полей GFF файла и дерево структур,
//! получаемое в результате декодирования контейнера

use indexmap::IndexMap;

use crate::error::Result;
use crate::label::Label;
use crate::raw::FieldType;
use crate::resref::ResRef;
use crate::string::LocString;

/// Типизированное значение одного поля структуры. Каждому из 16 типов полей GFF файла
/// соответствует свой вариант; декодер порождает вариант, отвечающий идентификатору
/// типа в файле, а методы доступа [`Struct`] требуют ожидаемый вариант
///
/// [`Struct`]: struct.Struct.html
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  /// Беззнаковое байтовое значение
  Byte(u8),
  /// Символ текста в диапазоне `0x00-0xFF`
  Char(i8),
  /// Беззнаковое целое из 2 байт
  Word(u16),
  /// Знаковое целое из 2 байт
  Short(i16),
  /// Беззнаковое целое из 4 байт
  Dword(u32),
  /// Знаковое целое из 4 байт
  Int(i32),
  /// Беззнаковое целое из 8 байт
  Dword64(u64),
  /// Знаковое целое из 8 байт
  Int64(i64),
  /// Число с плавающей запятой одинарной точности
  Float(f32),
  /// Число с плавающей запятой двойной точности
  Double(f64),
  /// Нелокализуемая строка
  String(String),
  /// Ссылка на игровой ресурс
  ResRef(ResRef),
  /// Локализуемая строка
  LocString(LocString),
  /// Произвольные бинарные данные
  Void(Vec<u8>),
  /// Вложенная структура
  Struct(Struct),
  /// Список структур
  List(Vec<Struct>),
}

impl Value {
  /// Тип поля, в котором данное значение хранится в файле
  pub fn field_type(&self) -> FieldType {
    use self::Value::*;

    match *self {
      Byte(..)      => FieldType::Byte,
      Char(..)      => FieldType::Char,
      Word(..)      => FieldType::Word,
      Short(..)     => FieldType::Short,
      Dword(..)     => FieldType::Dword,
      Int(..)       => FieldType::Int,
      Dword64(..)   => FieldType::Dword64,
      Int64(..)     => FieldType::Int64,
      Float(..)     => FieldType::Float,
      Double(..)    => FieldType::Double,
      String(..)    => FieldType::String,
      ResRef(..)    => FieldType::ResRef,
      LocString(..) => FieldType::LocString,
      Void(..)      => FieldType::Void,
      Struct(..)    => FieldType::Struct,
      List(..)      => FieldType::List,
    }
  }
}

/// Пустой список структур, возвращаемый методами доступа при отсутствии поля
const NO_STRUCTS: &[Struct] = &[];

/// Структура GFF файла в виде дерева: идентификатор типа и упорядоченный набор
/// полей с метками. Порядок полей совпадает с порядком их перечисления в файле
/// и сохраняется при повторной записи
#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
  /// Идентификатор типа структуры, прочитанный из файла или назначенный при создании
  pub tag: u32,
  /// Поля структуры в порядке их перечисления в файле
  pub fields: IndexMap<Label, Value>,
}

impl Struct {
  /// Создает структуру без полей с указанным идентификатором типа
  #[inline]
  pub fn new(tag: u32) -> Self {
    Struct { tag, fields: IndexMap::new() }
  }

  /// Добавляет в структуру поле с указанной меткой. Поле с той же меткой заменяется
  ///
  /// # Ошибки
  /// В случае, если метка длиннее 16 байт, возвращается ошибка
  /// [`Error::TooLongLabel`](../error/enum.Error.html#variant.TooLongLabel)
  pub fn insert(&mut self, label: &str, value: Value) -> Result<()> {
    self.fields.insert(label.parse()?, value);
    Ok(())
  }

  /// Значение поля с указанной меткой, если такое поле есть
  pub fn get(&self, label: &str) -> Option<&Value> {
    let label = Label::from_bytes(label.as_bytes()).ok()?;
    self.fields.get(&label)
  }

  /// Возвращает `true`, если структура содержит поле с указанной меткой
  #[inline]
  pub fn has(&self, label: &str) -> bool {
    self.get(label).is_some()
  }

  /// Целочисленное значение поля или умолчание, если поле отсутствует или хранит
  /// значение нечислового типа. Исторические писатели записывали счетчики полями
  /// разной ширины, поэтому принимаются все целочисленные варианты
  pub fn u32_or(&self, label: &str, default: u32) -> u32 {
    match self.get(label) {
      Some(&Value::Byte(v))  => v as u32,
      Some(&Value::Word(v))  => v as u32,
      Some(&Value::Dword(v)) => v,
      Some(&Value::Int(v))   => v as u32,
      _ => default,
    }
  }

  /// Логическое значение поля или умолчание. Ненулевое число любого целого типа
  /// считается истиной
  pub fn bool_or(&self, label: &str, default: bool) -> bool {
    match self.get(label) {
      Some(&Value::Byte(v))  => v != 0,
      Some(&Value::Word(v))  => v != 0,
      Some(&Value::Dword(v)) => v != 0,
      Some(&Value::Int(v))   => v != 0,
      _ => default,
    }
  }

  /// Текст строкового поля или пустая строка, если поле отсутствует
  pub fn string_or(&self, label: &str) -> String {
    match self.get(label) {
      Some(Value::String(v)) => v.clone(),
      _ => String::new(),
    }
  }

  /// Ссылка на ресурс из поля или пустая ссылка, если поле отсутствует
  pub fn resref_or(&self, label: &str) -> ResRef {
    match self.get(label) {
      Some(Value::ResRef(v)) => v.clone(),
      _ => ResRef::default(),
    }
  }

  /// Локализуемая строка из поля или пустая строка без частей, если поле отсутствует
  pub fn loc_string_or(&self, label: &str) -> LocString {
    match self.get(label) {
      Some(Value::LocString(v)) => v.clone(),
      _ => LocString::default(),
    }
  }

  /// Элементы поля-списка или пустой срез, если поле отсутствует
  pub fn list_or(&self, label: &str) -> &[Struct] {
    match self.get(label) {
      Some(Value::List(v)) => v,
      _ => NO_STRUCTS,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accessors_tolerate_missing_and_mistyped_fields() {
    let mut s = Struct::new(0);
    s.insert("Delay", Value::Dword(7)).unwrap();
    s.insert("AnimLoop", Value::Byte(1)).unwrap();
    s.insert("Comment", Value::String("note".into())).unwrap();

    assert_eq!(s.u32_or("Delay", 0), 7);
    assert_eq!(s.u32_or("Missing", 42), 42);
    assert_eq!(s.u32_or("Comment", 42), 42);
    assert!(s.bool_or("AnimLoop", false));
    assert_eq!(s.string_or("Comment"), "note");
    assert!(s.list_or("EntryList").is_empty());
  }

  #[test]
  fn insert_preserves_order() {
    let mut s = Struct::new(0);
    s.insert("B", Value::Byte(0)).unwrap();
    s.insert("A", Value::Byte(1)).unwrap();
    let labels: Vec<_> = s.fields.keys().map(|l| l.to_string()).collect();
    assert_eq!(labels, ["B", "A"]);
  }
}
