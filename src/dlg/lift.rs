//! Подъем декодированного дерева структур в граф диалога

use indexmap::IndexMap;
use log::warn;

use crate::dlg::{Animation, Dialog, DialogNode, DialogPtr, NodeKind, Warning, DELAY_DEFAULT};
use crate::value::{Struct, Value};

/// Строит граф диалога из корневой структуры DLG ресурса.
///
/// Подъем толерантен к неполным и исторически искаженным файлам: отсутствующие
/// поля получают значения по умолчанию, посторонние структуры в списках указателей
/// пропускаются, неизвестные анимации сбрасываются, а при отсутствии стартовых
/// указателей синтезируется указатель на первую запись. Все отклонения собираются
/// в `warnings`
pub fn lift(root: &Struct, warnings: &mut Vec<Warning>) -> Dialog {
  let mut dialog = Dialog::new();
  dialog.root_tag = root.tag;

  dialog.delay_entry  = root.u32_or("DelayEntry", 0);
  dialog.delay_reply  = root.u32_or("DelayReply", 0);
  dialog.num_words    = root.u32_or("NumWords", 0);
  dialog.script_end   = root.resref_or("EndConversation");
  dialog.script_abort = root.resref_or("EndConverAbort");
  dialog.prevent_zoom = root.bool_or("PreventZoomIn", false);

  for struct_ in root.list_or("EntryList") {
    let node = lift_node(struct_, NodeKind::Entry, warnings);
    dialog.entries.push(node);
  }
  for struct_ in root.list_or("ReplyList") {
    let node = lift_node(struct_, NodeKind::Reply, warnings);
    dialog.replies.push(node);
  }
  for struct_ in root.list_or("StartingList") {
    if let Some(ptr) = lift_ptr(struct_, NodeKind::Entry, true) {
      dialog.starts.push(ptr);
    }
  }

  if dialog.starts.is_empty() && !dialog.entries.is_empty() {
    warn!("dialog has no starting list, synthesizing start pointer to the first entry");
    warnings.push(Warning::FallbackApplied);
    dialog.starts.push(DialogPtr::start(0));
  }

  resolve(&mut dialog, warnings);
  dialog
}

fn lift_node(struct_: &Struct, kind: NodeKind, warnings: &mut Vec<Warning>) -> DialogNode {
  let mut node = DialogNode::new(kind);
  node.tag = struct_.tag;

  if kind == NodeKind::Entry {
    node.speaker = struct_.string_or("Speaker");
  }
  let animation = struct_.u32_or("Animation", 0);
  node.animation = match Animation::from_u32(animation) {
    Some(value) => value,
    None => {
      warn!("unknown animation {}, falling back to default", animation);
      warnings.push(Warning::UnknownAnimation { value: animation });
      Animation::Default
    },
  };
  node.animation_loop = struct_.bool_or("AnimLoop", false);
  node.text          = struct_.loc_string_or("Text");
  node.script_action = struct_.resref_or("Script");
  node.action_params = lift_params(struct_.list_or("ActionParams"));
  node.delay         = struct_.u32_or("Delay", DELAY_DEFAULT);
  node.comment       = struct_.string_or("Comment");
  node.sound         = struct_.resref_or("Sound");
  node.quest         = struct_.string_or("Quest");
  node.quest_entry   = if struct_.has("QuestEntry") {
    Some(struct_.u32_or("QuestEntry", 0))
  } else {
    None
  };

  let children = match kind {
    NodeKind::Entry => "RepliesList",
    NodeKind::Reply => "EntriesList",
  };
  for struct_ in struct_.list_or(children) {
    if let Some(ptr) = lift_ptr(struct_, kind.opposite(), false) {
      node.pointers.push(ptr);
    }
  }
  node
}

fn lift_ptr(struct_: &Struct, target_kind: NodeKind, is_start: bool) -> Option<DialogPtr> {
  if !is_pointer_struct(struct_) {
    warn!("skipping struct that does not look like a pointer (tag: {})", struct_.tag);
    return None;
  }

  // Индекс указателя читается как сырое 32-битное значение; исторические файлы
  // могут хранить его полем типа FLOAT
  let index = match struct_.get("Index") {
    Some(&Value::Dword(value)) => value,
    Some(&Value::Float(value)) => value as u32,
    _ => DialogPtr::UNRESOLVED,
  };

  let mut ptr = DialogPtr::new(target_kind, index);
  ptr.tag = struct_.tag;
  ptr.is_start = is_start;
  ptr.script_appears = struct_.resref_or("Active");
  ptr.condition_params = lift_params(struct_.list_or("ConditionParams"));
  if !is_start {
    ptr.is_link = struct_.bool_or("IsChild", false);
    if ptr.is_link {
      ptr.link_comment = Some(struct_.string_or("LinkComment"));
    }
  }
  Some(ptr)
}

/// Определяет, выглядит ли структура как указатель, а не как узел с содержимым:
/// указатель несет поле `Index` и не несет ни одного из полей содержимого
fn is_pointer_struct(struct_: &Struct) -> bool {
  struct_.has("Index") && !struct_.has("Text") && !struct_.has("Speaker") && !struct_.has("Animation")
}

fn lift_params(structs: &[Struct]) -> IndexMap<String, String> {
  let mut params = IndexMap::new();
  for struct_ in structs {
    params.insert(struct_.string_or("Key"), struct_.string_or("Value"));
  }
  params
}

/// Разрешает индексы всех указателей: указатели записей NPC ищут цель среди
/// ответов игрока, остальные -- среди записей NPC. Сентинельные индексы остаются
/// неразрешенными молча, вышедшие за пределы -- с предупреждением
fn resolve(dialog: &mut Dialog, warnings: &mut Vec<Warning>) {
  let entries = dialog.entries.len();
  let replies = dialog.replies.len();

  for node in &mut dialog.entries {
    for ptr in &mut node.pointers {
      resolve_ptr(ptr, replies, warnings);
    }
  }
  for node in &mut dialog.replies {
    for ptr in &mut node.pointers {
      resolve_ptr(ptr, entries, warnings);
    }
  }
  for ptr in &mut dialog.starts {
    resolve_ptr(ptr, entries, warnings);
  }
}

fn resolve_ptr(ptr: &mut DialogPtr, target_len: usize, warnings: &mut Vec<Warning>) {
  if ptr.index == DialogPtr::UNRESOLVED {
    return;
  }
  if (ptr.index as usize) < target_len {
    ptr.resolved = true;
  } else {
    warn!("pointer index {} is out of range of {:?} sequence", ptr.index, ptr.target_kind);
    warnings.push(Warning::PointerResolutionMiss { target: ptr.target_kind, index: ptr.index });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::string::LocString;

  fn pointer(index: u32) -> Struct {
    let mut struct_ = Struct::new(0);
    struct_.insert("Index", Value::Dword(index)).unwrap();
    struct_.insert("Active", Value::ResRef(Default::default())).unwrap();
    struct_
  }

  fn entry(text: &str, pointers: Vec<Struct>) -> Struct {
    let mut struct_ = Struct::new(0);
    struct_.insert("Text", Value::LocString(LocString::new(text))).unwrap();
    struct_.insert("RepliesList", Value::List(pointers)).unwrap();
    struct_
  }

  #[test]
  fn missing_starting_list_synthesizes_fallback_start() {
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![entry("a", vec![]), entry("b", vec![])])).unwrap();

    let mut warnings = Vec::new();
    let dialog = lift(&root, &mut warnings);

    assert_eq!(warnings, [Warning::FallbackApplied]);
    assert_eq!(dialog.entries.len(), 2);
    assert_eq!(dialog.starts.len(), 1);
    assert_eq!(dialog.starts[0].index, 0);
    assert!(dialog.starts[0].is_start);
    assert!(dialog.starts[0].script_appears.is_empty());
    assert!(dialog.starts[0].condition_params.is_empty());
  }

  #[test]
  fn empty_dialog_gets_no_fallback_start() {
    let root = Struct::new(0xFFFF_FFFF);
    let mut warnings = Vec::new();
    let dialog = lift(&root, &mut warnings);

    assert!(warnings.is_empty());
    assert!(dialog.starts.is_empty());
  }

  #[test]
  fn float_index_is_accepted() {
    let mut ptr = Struct::new(0);
    ptr.insert("Index", Value::Float(1.0)).unwrap();
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![entry("a", vec![ptr]), entry("b", vec![])])).unwrap();
    root.insert("ReplyList", Value::List(vec![{
      let mut reply = Struct::new(0);
      reply.insert("Text", Value::LocString(LocString::new("r"))).unwrap();
      reply
    }, {
      let mut reply = Struct::new(0);
      reply.insert("Text", Value::LocString(LocString::new("r2"))).unwrap();
      reply
    }])).unwrap();
    root.insert("StartingList", Value::List(vec![pointer(0)])).unwrap();

    let mut warnings = Vec::new();
    let dialog = lift(&root, &mut warnings);

    assert!(warnings.is_empty());
    assert_eq!(dialog.entries[0].pointers[0].index, 1);
    assert!(dialog.entries[0].pointers[0].resolved);
  }

  #[test]
  fn content_struct_in_pointer_list_is_skipped() {
    let stray = entry("should not be here", vec![]);
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![entry("a", vec![stray, pointer(0)])])).unwrap();
    root.insert("ReplyList", Value::List(vec![{
      let mut reply = Struct::new(0);
      reply.insert("Text", Value::LocString(LocString::new("r"))).unwrap();
      reply
    }])).unwrap();
    root.insert("StartingList", Value::List(vec![pointer(0)])).unwrap();

    let mut warnings = Vec::new();
    let dialog = lift(&root, &mut warnings);

    assert!(warnings.is_empty());
    assert_eq!(dialog.entries[0].pointers.len(), 1);
    assert_eq!(dialog.entries[0].pointers[0].index, 0);
  }

  #[test]
  fn out_of_range_pointer_stays_unresolved_with_warning() {
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![entry("a", vec![pointer(7)])])).unwrap();
    root.insert("StartingList", Value::List(vec![pointer(0)])).unwrap();

    let mut warnings = Vec::new();
    let dialog = lift(&root, &mut warnings);

    assert_eq!(warnings, [Warning::PointerResolutionMiss { target: NodeKind::Reply, index: 7 }]);
    assert!(!dialog.entries[0].pointers[0].resolved);
    assert!(dialog.target_of(&dialog.entries[0].pointers[0]).is_none());
  }

  #[test]
  fn unknown_animation_falls_back_to_default() {
    let mut node = entry("a", vec![]);
    node.insert("Animation", Value::Dword(9999)).unwrap();
    let mut root = Struct::new(0xFFFF_FFFF);
    root.insert("EntryList", Value::List(vec![node])).unwrap();
    root.insert("StartingList", Value::List(vec![pointer(0)])).unwrap();

    let mut warnings = Vec::new();
    let dialog = lift(&root, &mut warnings);

    assert_eq!(warnings, [Warning::UnknownAnimation { value: 9999 }]);
    assert_eq!(dialog.entries[0].animation, Animation::Default);
  }
}
