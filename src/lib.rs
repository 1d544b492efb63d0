//! Кодек диалоговых ресурсов (DLG) игр на движке Aurora (Neverwinter Nights,
//! The Witcher). Диалог хранится в бинарном GFF контейнере из семи областей;
//! библиотека декодирует такой контейнер в граф диалога [`Dialog`] и кодирует
//! граф обратно в байтовое представление, совместимое с оригинальным
//! инструментарием и движком игры.
//!
//! ```rust,no_run
//! # fn example(bytes: &[u8]) -> gff_dlg::Result<()> {
//! let (dialog, warnings) = gff_dlg::decode_dialog(bytes)?;
//! for warning in &warnings {
//!   println!("{}", warning);
//! }
//! let bytes = gff_dlg::encode_dialog(&dialog)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Dialog`]: dlg/struct.Dialog.html
#![warn(missing_docs)]

pub mod de;
pub mod dlg;
pub mod error;
pub mod header;
pub mod label;
pub mod raw;
pub mod resref;
pub mod ser;
pub mod string;
pub mod value;

pub use crate::dlg::{Animation, Dialog, DialogNode, DialogPtr, NodeKind, Warning};
pub use crate::error::{Error, Result};
pub use crate::header::{Header, Section, Signature, Version};
pub use crate::label::Label;
pub use crate::resref::ResRef;
pub use crate::string::{Gender, Language, LocString, StrRef, SubString};
pub use crate::value::{Struct, Value};

/// Осуществляет разбор DLG ресурса из байтового буфера. Возвращает граф диалога
/// и список предупреждений, собранных при подъеме графа; фатальные проблемы
/// файла возвращаются ошибкой
pub fn decode_dialog(bytes: &[u8]) -> Result<(Dialog, Vec<Warning>)> {
  Dialog::decode(bytes)
}

/// Записывает граф диалога в байтовое представление DLG ресурса. Нарушение
/// структурных инвариантов графа прерывает кодирование; частичный результат
/// не возвращается
pub fn encode_dialog(dialog: &Dialog) -> Result<Vec<u8>> {
  dialog.encode()
}

/// Проверяет структурные инварианты графа диалога, не кодируя его.
/// Пустой список предупреждений означает полную корректность
pub fn validate(dialog: &Dialog) -> Result<Vec<Warning>> {
  dialog.validate()
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;
  use super::*;

  /// Диалог из одной реплики "Hello" и стартового указателя на нее
  fn minimal_dialog() -> Dialog {
    let mut dialog = Dialog::new();
    let mut entry = DialogNode::entry();
    entry.text = LocString::new("Hello");
    dialog.entries.push(entry);
    dialog.starts.push(DialogPtr::start(0));
    dialog
  }

  /// Диалог, задействующий все виды содержимого: параметры, задание,
  /// перекрестную ссылку, скрипты и звук
  fn rich_dialog() -> Dialog {
    let mut dialog = Dialog::new();
    dialog.delay_entry = 1;
    dialog.delay_reply = 2;
    dialog.num_words = 17;
    dialog.script_end = "end_normal".parse().unwrap();
    dialog.script_abort = "end_abort".parse().unwrap();
    dialog.prevent_zoom = true;

    let mut entry = DialogNode::entry();
    entry.speaker = "guard".into();
    entry.text = LocString::new("Halt!");
    entry.animation = Animation::TalkForceful;
    entry.animation_loop = true;
    entry.sound = "vo_halt".parse().unwrap();
    entry.script_action = "act_alarm".parse().unwrap();
    entry.quest = "city_watch".into();
    entry.quest_entry = Some(10);
    entry.action_params.insert("alarm".into(), "on".into());
    let mut to_reply = DialogPtr::new(NodeKind::Reply, 0);
    to_reply.script_appears = "check_rep".parse().unwrap();
    to_reply.condition_params.insert("quest".into(), "Q1".into());
    to_reply.condition_params.insert("state".into(), "open".into());
    entry.pointers.push(to_reply);
    dialog.entries.push(entry);

    let mut reply = DialogNode::reply();
    reply.text = LocString::new("I live here.");
    let mut back = DialogPtr::new(NodeKind::Entry, 0);
    back.is_link = true;
    back.link_comment = Some("cross-ref".into());
    reply.pointers.push(back);
    dialog.replies.push(reply);

    let mut start = DialogPtr::start(0);
    start.script_appears = "start_check".parse().unwrap();
    dialog.starts.push(start);
    dialog
  }

  #[test]
  fn minimal_dialog_roundtrips() {
    let bytes = encode_dialog(&minimal_dialog()).unwrap();
    assert_eq!(&bytes[0..4], b"DLG ");

    // Длина файла равна концу области индексов списков
    let header = Header::read(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(bytes.len() as u32, header.list_indices.offset + header.list_indices.count);
    assert!(bytes.len() > 500 && bytes.len() < 1200, "unexpected size: {}", bytes.len());

    let (dialog, warnings) = decode_dialog(&bytes).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(dialog.entries.len(), 1);
    assert!(dialog.replies.is_empty());
    assert_eq!(dialog.entries[0].text.first(), Some("Hello"));
    assert_eq!(dialog.starts.len(), 1);
    assert_eq!(dialog.starts[0].index, 0);
    assert!(dialog.starts[0].resolved);
  }

  #[test]
  fn missing_starting_list_produces_fallback_start() {
    // Файл без StartingList собирается универсальным кодировщиком дерева
    let mut first = Struct::new(0);
    first.insert("Text", Value::LocString(LocString::new("one"))).unwrap();
    let mut second = Struct::new(0);
    second.insert("Text", Value::LocString(LocString::new("two"))).unwrap();
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![first, second])).unwrap();
    let bytes = ser::encode(Signature::DLG, &root).unwrap();

    let (dialog, warnings) = decode_dialog(&bytes).unwrap();
    assert_eq!(warnings, vec![Warning::FallbackApplied]);
    assert_eq!(dialog.entries.len(), 2);
    assert_eq!(dialog.starts.len(), 1);
    assert_eq!(dialog.starts[0].index, 0);
    assert!(dialog.starts[0].resolved);

    // После перезаписи стартовый список присутствует явно
    let bytes = encode_dialog(&dialog).unwrap();
    let (dialog, warnings) = decode_dialog(&bytes).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(dialog.entries.len(), 2);
    assert_eq!(dialog.starts.len(), 1);
  }

  #[test]
  fn link_pointer_preserves_comment_and_takes_five_fields() {
    let bytes = encode_dialog(&rich_dialog()).unwrap();

    let (_, tree) = de::decode(&bytes).unwrap();
    let link = &tree.list_or("ReplyList")[0].list_or("EntriesList")[0];
    assert_eq!(link.fields.len(), 5);
    assert_eq!(link.get("LinkComment"), Some(&Value::String("cross-ref".into())));
    // Обычный указатель несет четыре поля
    let plain = &tree.list_or("EntryList")[0].list_or("RepliesList")[0];
    assert_eq!(plain.fields.len(), 4);

    let (dialog, _) = decode_dialog(&bytes).unwrap();
    assert!(dialog.replies[0].pointers[0].is_link);
    assert_eq!(dialog.replies[0].pointers[0].link_comment.as_deref(), Some("cross-ref"));
  }

  #[test]
  fn condition_params_roundtrip_in_insertion_order() {
    let bytes = encode_dialog(&rich_dialog()).unwrap();

    let (dialog, _) = decode_dialog(&bytes).unwrap();
    let params = &dialog.entries[0].pointers[0].condition_params;
    let pairs: Vec<_> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(pairs, [("quest", "Q1"), ("state", "open")]);

    // В дереве список условий состоит ровно из двух структур параметров
    let (_, tree) = de::decode(&bytes).unwrap();
    let list = tree.list_or("EntryList")[0].list_or("RepliesList")[0].list_or("ConditionParams");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].get("Key"), Some(&Value::String("quest".into())));
    assert_eq!(list[0].get("Value"), Some(&Value::String("Q1".into())));
  }

  #[test]
  fn empty_resource_references_are_emitted_explicitly() {
    let bytes = encode_dialog(&minimal_dialog()).unwrap();

    let (_, tree) = de::decode(&bytes).unwrap();
    let entry = &tree.list_or("EntryList")[0];
    assert_eq!(entry.get("Sound"), Some(&Value::ResRef(ResRef::default())));
    assert_eq!(entry.get("Script"), Some(&Value::ResRef(ResRef::default())));

    let (dialog, _) = decode_dialog(&bytes).unwrap();
    assert!(dialog.entries[0].sound.is_empty());
    assert!(dialog.entries[0].script_action.is_empty());
  }

  #[test]
  fn unknown_animation_decodes_to_default_and_reencodes_as_default() {
    let mut entry = Struct::new(0);
    entry.insert("Text", Value::LocString(LocString::new("hm"))).unwrap();
    entry.insert("Animation", Value::Dword(9999)).unwrap();
    let mut start = Struct::new(0);
    start.insert("Index", Value::Dword(0)).unwrap();
    start.insert("Active", Value::ResRef(ResRef::default())).unwrap();
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![entry])).unwrap();
    root.insert("StartingList", Value::List(vec![start])).unwrap();
    let bytes = ser::encode(Signature::DLG, &root).unwrap();

    let (dialog, warnings) = decode_dialog(&bytes).unwrap();
    assert_eq!(warnings, vec![Warning::UnknownAnimation { value: 9999 }]);
    assert_eq!(dialog.entries[0].animation, Animation::Default);

    let bytes = encode_dialog(&dialog).unwrap();
    let (_, tree) = de::decode(&bytes).unwrap();
    assert_eq!(tree.list_or("EntryList")[0].get("Animation"), Some(&Value::Dword(0)));
  }

  #[test]
  fn reencode_is_byte_identical() {
    for dialog in &[minimal_dialog(), rich_dialog()] {
      let first = encode_dialog(dialog).unwrap();
      let (decoded, _) = decode_dialog(&first).unwrap();
      let second = encode_dialog(&decoded).unwrap();
      assert_eq!(first, second);
    }
  }

  #[test]
  fn encoding_is_deterministic() {
    let dialog = rich_dialog();
    assert_eq!(encode_dialog(&dialog).unwrap(), encode_dialog(&dialog).unwrap());
  }

  #[test]
  fn decoded_dialog_survives_roundtrip_structurally() {
    let bytes = encode_dialog(&rich_dialog()).unwrap();
    let (first, _) = decode_dialog(&bytes).unwrap();
    let (second, _) = decode_dialog(&encode_dialog(&first).unwrap()).unwrap();
    assert_eq!(first, second);

    // Подъем ничего не потерял относительно исходного графа
    assert_eq!(first.delay_entry, 1);
    assert_eq!(first.num_words, 17);
    assert!(first.prevent_zoom);
    assert_eq!(first.script_end.as_str().unwrap(), "end_normal");
    assert_eq!(first.entries[0].speaker, "guard");
    assert_eq!(first.entries[0].quest_entry, Some(10));
    assert_eq!(first.entries[0].animation, Animation::TalkForceful);
    assert!(first.entries[0].animation_loop);
    let action: Vec<_> = first.entries[0].action_params.iter()
      .map(|(k, v)| (k.as_str(), v.as_str()))
      .collect();
    assert_eq!(action, [("alarm", "on")]);
    assert_eq!(first.starts[0].script_appears.as_str().unwrap(), "start_check");
  }

  #[test]
  fn non_dlg_signature_is_rejected() {
    let root = Struct::new(0xFFFF_FFFF);
    let bytes = ser::encode(Signature::from(*b"ITP "), &root).unwrap();
    match decode_dialog(&bytes) {
      Err(Error::MalformedHeader(..)) => {},
      other => panic!("expected MalformedHeader, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn decoded_tree_exports_through_serde() {
    let bytes = encode_dialog(&minimal_dialog()).unwrap();
    let (_, tree) = de::decode(&bytes).unwrap();
    let json = serde_json::to_value(&tree).unwrap();

    assert_eq!(json["EntryList"][0]["Text"]["strings"][0]["string"], "Hello");
    assert_eq!(json["StartingList"][0]["Index"], 0);
    assert_eq!(json["EntryList"][0]["Sound"], "");
  }
}
