//! Модель графа диалога: записи NPC, ответы игрока, стартовые указатели
//! и проверка структурных инвариантов графа

use std::fmt;
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};
use indexmap::IndexMap;

use crate::de::Decoder;
use crate::error::{Error, Result};
use crate::header::Signature;
use crate::resref::ResRef;
use crate::ser::Encoder;
use crate::string::LocString;

mod lift;
mod lower;
mod plan;

/// Вид узла диалога: реплика NPC или ответ игрока
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
  /// Реплика NPC
  Entry,
  /// Ответ игрока
  Reply,
}

impl NodeKind {
  /// Вид узлов, на которые указывают указатели узла данного вида: реплики NPC
  /// ссылаются на ответы игрока и наоборот
  #[inline]
  pub fn opposite(self) -> NodeKind {
    match self {
      NodeKind::Entry => NodeKind::Reply,
      NodeKind::Reply => NodeKind::Entry,
    }
  }
}

/// Анимация, проигрываемая говорящим во время реплики. Числовые значения совпадают
/// с номерами зацикленных анимаций инструментария, сдвинутыми на 100; `Default`
/// означает, что анимация не задана
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Animation {
  /// Анимация не задана
  Default = 0,
  /// Пауза
  Pause = 100,
  /// Вторая вариация паузы
  Pause2 = 101,
  /// Слушает собеседника
  Listen = 102,
  /// Медитирует
  Meditate = 103,
  /// Молится
  Worship = 104,
  /// Смотрит вдаль
  LookFar = 105,
  /// Сидит на стуле
  SitChair = 106,
  /// Сидит на полу
  SitCross = 107,
  /// Обычный разговор
  TalkNormal = 108,
  /// Умоляет
  TalkPleading = 109,
  /// Настаивает
  TalkForceful = 110,
  /// Смеется
  TalkLaughing = 111,
  /// Обыскивает на уровне пола
  GetLow = 112,
  /// Обыскивает на уровне пояса
  GetMid = 113,
  /// Усталая пауза
  PauseTired = 114,
  /// Пьяная пауза
  PauseDrunk = 115,
  /// Лежит лицом вниз
  DeadFront = 116,
  /// Лежит на спине
  DeadBack = 117,
}

impl Animation {
  /// Определяет анимацию по ее номеру из файла. Для неизвестных номеров возвращает `None`
  pub fn from_u32(value: u32) -> Option<Self> {
    use self::Animation::*;

    Some(match value {
      0   => Default,
      100 => Pause,
      101 => Pause2,
      102 => Listen,
      103 => Meditate,
      104 => Worship,
      105 => LookFar,
      106 => SitChair,
      107 => SitCross,
      108 => TalkNormal,
      109 => TalkPleading,
      110 => TalkForceful,
      111 => TalkLaughing,
      112 => GetLow,
      113 => GetMid,
      114 => PauseTired,
      115 => PauseDrunk,
      116 => DeadFront,
      117 => DeadBack,
      _ => return None,
    })
  }
  /// Номер анимации, записываемый в файл
  #[inline]
  pub fn as_u32(self) -> u32 { self as u32 }
}

impl Default for Animation {
  #[inline]
  fn default() -> Self { Animation::Default }
}

/// Предупреждения, собираемые при декодировании и проверке диалога. В отличие от
/// ошибок [`Error`], предупреждения не прерывают работу: диалог возвращается
/// вместе с их списком
///
/// [`Error`]: ../error/enum.Error.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
  /// В файле не было списка стартовых указателей, но записи есть; синтезирован
  /// стартовый указатель на первую запись
  FallbackApplied,
  /// Узел содержал неизвестный номер анимации; анимация сброшена в значение
  /// по умолчанию
  UnknownAnimation {
    /// Номер анимации, записанный в файле
    value: u32,
  },
  /// Индекс указателя выходит за пределы целевой последовательности; указатель
  /// оставлен неразрешенным
  PointerResolutionMiss {
    /// Вид узлов, среди которых искалась цель
    target: NodeKind,
    /// Индекс, записанный в файле
    index: u32,
  },
  /// Узел ссылается на задание, но номер его записи в журнале не указан
  QuestEntryMissing {
    /// Вид узла
    kind: NodeKind,
    /// Индекс узла в его последовательности
    node: usize,
  },
}

impl fmt::Display for Warning {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    use self::Warning::*;

    match *self {
      FallbackApplied => write!(fmt, "Starting list is absent, start pointer to the first entry was synthesized"),
      UnknownAnimation { value } => write!(fmt, "Unknown animation {}, reset to default", value),
      PointerResolutionMiss { target, index } => write!(fmt, "Pointer index {} is out of range of {:?} sequence", index, target),
      QuestEntryMissing { kind, node } => write!(fmt, "{:?} {} references a quest, but has no journal entry number", kind, node),
    }
  }
}

/// Указатель из узла диалога на узел противоположного вида или стартовый
/// указатель на запись NPC. Хранит локальный индекс цели в ее последовательности;
/// после разрешения цель можно получать методом [`Dialog::target_of`]
///
/// [`Dialog::target_of`]: struct.Dialog.html#method.target_of
#[derive(Debug, Clone, PartialEq)]
pub struct DialogPtr {
  /// Локальный индекс целевого узла в его последовательности или
  /// [`UNRESOLVED`](#associatedconstant.UNRESOLVED)
  pub index: u32,
  /// Вид узлов, среди которых находится цель
  pub target_kind: NodeKind,
  /// Скрипт, определяющий, показывается ли ветка; пустая ссылка означает
  /// безусловный показ
  pub script_appears: ResRef,
  /// Параметры, передаваемые скрипту условия, в порядке их перечисления в файле
  pub condition_params: IndexMap<String, String>,
  /// Признак перекрестной ссылки на чужую ветку дерева, а не владения ею
  pub is_link: bool,
  /// Комментарий к перекрестной ссылке; имеет смысл только при взведенном
  /// [`is_link`](#structfield.is_link)
  pub link_comment: Option<String>,
  /// Признак стартового указателя; взведен только у членов [`Dialog::starts`]
  ///
  /// [`Dialog::starts`]: struct.Dialog.html#structfield.starts
  pub is_start: bool,
  /// Признак того, что индекс указателя был успешно разрешен в целевой узел
  pub resolved: bool,
  /// Идентификатор типа структуры, из которой указатель был прочитан;
  /// используется при повторной записи
  pub tag: u32,
}

impl DialogPtr {
  /// Значение индекса, означающее неразрешенный указатель
  pub const UNRESOLVED: u32 = 0xFFFF_FFFF;

  /// Создает указатель на узел указанного вида
  pub fn new(target_kind: NodeKind, index: u32) -> Self {
    DialogPtr {
      index,
      target_kind,
      script_appears: ResRef::default(),
      condition_params: IndexMap::new(),
      is_link: false,
      link_comment: None,
      is_start: false,
      resolved: false,
      tag: 0,
    }
  }
  /// Создает стартовый указатель на запись NPC с указанным индексом
  pub fn start(index: u32) -> Self {
    let mut ptr = Self::new(NodeKind::Entry, index);
    ptr.is_start = true;
    ptr
  }
}

/// Значение задержки узла, означающее, что задержка не задана
pub const DELAY_DEFAULT: u32 = 0xFFFF_FFFF;

/// Узел графа диалога: реплика NPC или ответ игрока вместе с исходящими
/// из него указателями
#[derive(Debug, Clone, PartialEq)]
pub struct DialogNode {
  /// Вид узла
  pub kind: NodeKind,
  /// Тег говорящего. Имеет смысл только для реплик NPC; пустое значение
  /// означает владельца диалога
  pub speaker: String,
  /// Комментарий дизайнера; игрок его не видит
  pub comment: String,
  /// Тег задания в журнале, которое затрагивает данный узел
  pub quest: String,
  /// Номер записи журнала задания; имеет смысл только при непустом
  /// [`quest`](#structfield.quest)
  pub quest_entry: Option<u32>,
  /// Скрипт, выполняемый при показе узла
  pub script_action: ResRef,
  /// Звуковой файл, проигрываемый вместе с узлом
  pub sound: ResRef,
  /// Задержка перед показом узла в секундах или [`DELAY_DEFAULT`]
  ///
  /// [`DELAY_DEFAULT`]: constant.DELAY_DEFAULT.html
  pub delay: u32,
  /// Анимация говорящего
  pub animation: Animation,
  /// Признак зацикливания анимации
  pub animation_loop: bool,
  /// Локализуемый текст узла
  pub text: LocString,
  /// Указатели на узлы противоположного вида в порядке их перечисления в файле
  pub pointers: Vec<DialogPtr>,
  /// Параметры, передаваемые скрипту действия, в порядке их перечисления в файле
  pub action_params: IndexMap<String, String>,
  /// Идентификатор типа структуры, из которой узел был прочитан;
  /// используется при повторной записи
  pub tag: u32,
}

impl DialogNode {
  /// Создает пустой узел указанного вида
  pub fn new(kind: NodeKind) -> Self {
    DialogNode {
      kind,
      speaker: String::new(),
      comment: String::new(),
      quest: String::new(),
      quest_entry: None,
      script_action: ResRef::default(),
      sound: ResRef::default(),
      delay: DELAY_DEFAULT,
      animation: Animation::Default,
      animation_loop: false,
      text: LocString::default(),
      pointers: Vec::new(),
      action_params: IndexMap::new(),
      tag: 0,
    }
  }
  /// Создает пустую реплику NPC
  #[inline]
  pub fn entry() -> Self { Self::new(NodeKind::Entry) }
  /// Создает пустой ответ игрока
  #[inline]
  pub fn reply() -> Self { Self::new(NodeKind::Reply) }
}

/// Граф диалога: корневой агрегат, владеющий своими узлами и стартовыми
/// указателями. Узлы хранятся в массивах, а связи между ними -- локальными
/// индексами, перепроверяемыми при каждом обращении; владеющих циклов в графе нет
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
  /// Задержка камеры на репликах NPC
  pub delay_entry: u32,
  /// Задержка камеры на ответах игрока
  pub delay_reply: u32,
  /// Количество слов в диалоге, подсчитанное инструментарием. Переносится
  /// при перезаписи как есть и никак не пересчитывается
  pub num_words: u32,
  /// Скрипт, выполняемый при нормальном завершении диалога
  pub script_end: ResRef,
  /// Скрипт, выполняемый при прерывании диалога
  pub script_abort: ResRef,
  /// Запрет приближения камеры во время диалога
  pub prevent_zoom: bool,
  /// Реплики NPC в порядке их перечисления в файле
  pub entries: Vec<DialogNode>,
  /// Ответы игрока в порядке их перечисления в файле
  pub replies: Vec<DialogNode>,
  /// Стартовые указатели: возможные точки входа в диалог в порядке их проверки
  pub starts: Vec<DialogPtr>,
  /// Идентификатор типа корневой структуры файла; используется при повторной записи
  pub root_tag: u32,
}

impl Dialog {
  /// Создает пустой диалог
  pub fn new() -> Self {
    Dialog {
      delay_entry: 0,
      delay_reply: 0,
      num_words: 0,
      script_end: ResRef::default(),
      script_abort: ResRef::default(),
      prevent_zoom: false,
      entries: Vec::new(),
      replies: Vec::new(),
      starts: Vec::new(),
      root_tag: 0xFFFF_FFFF,
    }
  }

  /// Осуществляет разбор DLG ресурса из байтового буфера. Строки декодируются
  /// из `UTF-8`. Возвращает граф диалога и список предупреждений, собранных
  /// при подъеме графа
  pub fn decode(bytes: &[u8]) -> Result<(Dialog, Vec<Warning>)> {
    Self::lift_from(Decoder::new(bytes)?)
  }
  /// Осуществляет разбор DLG ресурса из байтового буфера с использованием
  /// указанной кодировки строк
  pub fn decode_with_encoding(bytes: &[u8], encoding: EncodingRef, trap: DecoderTrap) -> Result<(Dialog, Vec<Warning>)> {
    Self::lift_from(Decoder::with_encoding(bytes, encoding, trap)?)
  }
  fn lift_from(decoder: Decoder) -> Result<(Dialog, Vec<Warning>)> {
    if decoder.signature() != Signature::DLG {
      return Err(Error::MalformedHeader("signature is not DLG"));
    }
    let root = decoder.decode()?;
    let mut warnings = Vec::new();
    let dialog = lift::lift(&root, &mut warnings);
    Ok((dialog, warnings))
  }

  /// Записывает граф диалога в байтовое представление DLG ресурса. Строки
  /// кодируются в `UTF-8`.
  ///
  /// # Ошибки
  /// Нарушение структурных инвариантов графа прерывает кодирование на первом
  /// нарушении; частичный результат не возвращается
  pub fn encode(&self) -> Result<Vec<u8>> {
    lower::lower(self, Encoder::new())
  }
  /// Записывает граф диалога в байтовое представление DLG ресурса
  /// с использованием указанной кодировки строк
  pub fn encode_with_encoding(&self, encoding: EncodingRef, trap: EncoderTrap) -> Result<Vec<u8>> {
    lower::lower(self, Encoder::with_encoding(encoding, trap))
  }

  /// Проверяет структурные инварианты графа.
  ///
  /// Нарушения, с которыми граф не может быть записан -- указатель за пределами
  /// целевой последовательности или указатель неверного вида -- возвращаются
  /// ошибкой [`Error::Invariant`]. Менее серьезные проблемы собираются в список
  /// предупреждений; пустой список означает полную корректность
  ///
  /// [`Error::Invariant`]: ../error/enum.Error.html#variant.Invariant
  pub fn validate(&self) -> Result<Vec<Warning>> {
    let mut warnings = Vec::new();

    for (kind, nodes) in &[(NodeKind::Entry, &self.entries), (NodeKind::Reply, &self.replies)] {
      let target_len = match kind {
        NodeKind::Entry => self.replies.len(),
        NodeKind::Reply => self.entries.len(),
      };
      for (i, node) in nodes.iter().enumerate() {
        if !node.quest.is_empty() && node.quest_entry.is_none() {
          warnings.push(Warning::QuestEntryMissing { kind: *kind, node: i });
        }
        for ptr in &node.pointers {
          if ptr.target_kind != kind.opposite() {
            return Err(Error::Invariant("node pointer targets a node of its own kind".into()));
          }
          if ptr.is_start {
            return Err(Error::Invariant("start pointer is owned by a node".into()));
          }
          check_index(ptr, target_len)?;
        }
      }
    }
    for ptr in &self.starts {
      if ptr.target_kind != NodeKind::Entry {
        return Err(Error::Invariant("start pointer must target an entry".into()));
      }
      check_index(ptr, self.entries.len())?;
    }
    Ok(warnings)
  }

  /// Целевой узел указателя, если его индекс разрешается в пределах целевой
  /// последовательности. Индекс перепроверяется при каждом обращении
  pub fn target_of(&self, ptr: &DialogPtr) -> Option<&DialogNode> {
    if ptr.index == DialogPtr::UNRESOLVED {
      return None;
    }
    let nodes = match ptr.target_kind {
      NodeKind::Entry => &self.entries,
      NodeKind::Reply => &self.replies,
    };
    nodes.get(ptr.index as usize)
  }
}

impl Default for Dialog {
  #[inline]
  fn default() -> Self { Dialog::new() }
}

/// Проверяет, что индекс указателя либо сентинель, либо лежит в пределах
/// целевой последовательности
fn check_index(ptr: &DialogPtr, target_len: usize) -> Result<()> {
  if ptr.index != DialogPtr::UNRESOLVED && ptr.index as usize >= target_len {
    return Err(Error::Invariant("pointer index is out of range of its target sequence".into()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validate_accepts_sentinel_indices() {
    let mut dialog = Dialog::new();
    dialog.entries.push(DialogNode::entry());
    let mut ptr = DialogPtr::new(NodeKind::Reply, DialogPtr::UNRESOLVED);
    ptr.tag = 0;
    dialog.entries[0].pointers.push(ptr);
    dialog.starts.push(DialogPtr::start(0));

    assert!(dialog.validate().unwrap().is_empty());
  }

  #[test]
  fn validate_rejects_out_of_range_index() {
    let mut dialog = Dialog::new();
    dialog.entries.push(DialogNode::entry());
    dialog.starts.push(DialogPtr::start(5));

    match dialog.validate() {
      Err(Error::Invariant(..)) => {},
      other => panic!("expected Invariant, got {:?}", other),
    }
  }

  #[test]
  fn validate_warns_about_missing_quest_entry() {
    let mut dialog = Dialog::new();
    let mut node = DialogNode::entry();
    node.quest = "main_quest".into();
    dialog.entries.push(node);
    dialog.starts.push(DialogPtr::start(0));

    let warnings = dialog.validate().unwrap();
    assert_eq!(warnings, [Warning::QuestEntryMissing { kind: NodeKind::Entry, node: 0 }]);
  }

  #[test]
  fn target_is_revalidated_on_access() {
    let mut dialog = Dialog::new();
    dialog.entries.push(DialogNode::entry());
    let start = DialogPtr::start(0);
    assert!(dialog.target_of(&start).is_some());

    dialog.entries.clear();
    assert!(dialog.target_of(&start).is_none());
  }
}
