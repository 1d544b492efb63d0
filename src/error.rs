//! Реализация структур, описывающих ошибки кодирования или декодирования DLG ресурсов

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::io;
use std::result;

use self::Error::*;

/// Названия областей GFF файла, используемые для указания места возникновения ошибки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
  /// Область с описаниями структур
  Structs,
  /// Область с описаниями полей структур
  Fields,
  /// Область с метками полей
  Labels,
  /// Область с данными комплексных полей
  FieldData,
  /// Область со списками индексов полей
  FieldIndices,
  /// Область со списками индексов элементов списков
  ListIndices,
}

impl fmt::Display for SectionKind {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    let name = match *self {
      SectionKind::Structs      => "structs",
      SectionKind::Fields       => "fields",
      SectionKind::Labels       => "labels",
      SectionKind::FieldData    => "field data",
      SectionKind::FieldIndices => "field indices",
      SectionKind::ListIndices  => "list indices",
    };
    fmt.write_str(name)
  }
}

/// Описание одного поля с неизвестным идентификатором типа. Декодер собирает все такие
/// поля, прежде чем завершить разбор с ошибкой [`Error::UnknownFieldTypes`]
///
/// [`Error::UnknownFieldTypes`]: enum.Error.html#variant.UnknownFieldTypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownFieldType {
  /// Индекс поля в области полей файла
  pub field: u32,
  /// Идентификатор типа, записанный в файле для этого поля
  pub tag: u32,
}

/// Виды ошибок, которые могут возникнуть при чтении и записи DLG ресурса
#[derive(Debug)]
pub enum Error {
  /// Произошла ошибка чтения или записи из/в нижележащего буфера
  Io(io::Error),
  /// Произошла ошибка кодирования или декодирования строки, например, из-за использования
  /// символа, не поддерживаемого кодировкой
  Encoding(Cow<'static, str>),
  /// Заголовок файла не соответствует GFF формату: файл слишком короткий, сигнатура
  /// не является известной или версия формата не поддерживается
  MalformedHeader(&'static str),
  /// Одна из областей файла, объявленных в заголовке, выходит за пределы буфера
  Truncated {
    /// Область, которая не поместилась в буфер
    section: SectionKind,
    /// Позиция в байтах, на которой область заканчивается согласно заголовку
    end: u64,
    /// Реальный размер буфера в байтах
    available: u64,
  },
  /// Структура или поле ссылается на несуществующее смещение или индекс
  InvalidOffset {
    /// Область, на которую указывает некорректная ссылка
    section: SectionKind,
    /// Значение ссылки, записанное в файле
    offset: u64,
  },
  /// В файле встретились поля с неизвестными идентификаторами типов. Разбор продолжается
  /// до конца файла, чтобы ошибка содержала полный список нарушений
  UnknownFieldTypes(Vec<UnknownFieldType>),
  /// Некорректное значение для метки. Метка не должна превышать по длине 16 байт,
  /// но указанное значение больше. Ошибка содержит длину текста, который пытаются преобразовать
  TooLongLabel(usize),
  /// Некорректное значение для ссылки на ресурс. Ссылка не должна превышать по длине
  /// 16 байт, но указанное значение больше
  TooLongResRef(usize),
  /// Граф диалога нарушает структурные инварианты и не может быть записан.
  /// Кодировщик прерывается на первом нарушении и не возвращает частичный результат
  Invariant(Cow<'static, str>),
}
/// Тип результата, используемый в методах данной библиотеки
pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      Io(ref err) => err.fmt(fmt),
      Encoding(ref msg) => msg.fmt(fmt),
      MalformedHeader(msg) => write!(fmt, "Malformed GFF header: {}", msg),
      Truncated { section, end, available } => write!(
        fmt, "Declared {} section ends at byte {}, but buffer contains only {} bytes",
        section, end, available
      ),
      InvalidOffset { section, offset } => write!(
        fmt, "Reference into {} section is out of range: {}",
        section, offset
      ),
      UnknownFieldTypes(ref list) => {
        write!(fmt, "File contains {} field(s) of unknown type:", list.len())?;
        for e in list {
          write!(fmt, " (field: {}, tag: {})", e.field, e.tag)?;
        }
        Ok(())
      },
      TooLongLabel(len) => write!(fmt, "Too long label: label can contain up to 16 bytes, but string contains {} bytes", len),
      TooLongResRef(len) => write!(fmt, "Too long resource reference: it can contain up to 16 bytes, but string contains {} bytes", len),
      Invariant(ref msg) => write!(fmt, "Dialog invariant violated: {}", msg),
    }
  }
}

impl error::Error for Error {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match *self {
      Io(ref err) => Some(err),
      _ => None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(value: io::Error) -> Self { Io(value) }
}
/// Реализация для конвертации из ошибок кодирования библиотеки `encoding`
impl From<Cow<'static, str>> for Error {
  fn from(value: Cow<'static, str>) -> Self { Encoding(value) }
}
