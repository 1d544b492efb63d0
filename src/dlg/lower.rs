//! Понижение графа диалога в области GFF файла.
//!
//! Структуры перечисляются в пакетном порядке "сначала записи": корень, каждая
//! реплика NPC сразу со своими указателями, каждый ответ игрока со своими,
//! стартовые обертки, затем структуры параметров по мере потребления их списков.
//! Этот порядок закреплен оригинальным инструментарием и не подлежит изменению

use std::collections::HashMap;
use indexmap::IndexMap;

use crate::dlg::plan::{ListKey, Plan};
use crate::dlg::{Dialog, DialogNode, DialogPtr, NodeKind};
use crate::error::Result;
use crate::header::Signature;
use crate::ser::Encoder;

/// Записывает граф диалога в байтовое представление DLG ресурса с помощью
/// указанного кодировщика контейнера
pub fn lower(dialog: &Dialog, mut encoder: Encoder) -> Result<Vec<u8>> {
  // Граф с нарушенными инвариантами не записывается вовсе; предупреждения
  // проверки кодированию не мешают
  dialog.validate()?;

  let plan = Plan::new(dialog);
  let mut members: HashMap<ListKey, Vec<u32>> = HashMap::new();

  // Структуры в пакетном порядке "сначала записи"
  let root = encoder.add_struct(dialog.root_tag);

  let mut entry_structs = Vec::with_capacity(dialog.entries.len());
  let mut entry_ptr_structs = Vec::with_capacity(dialog.entries.len());
  for node in &dialog.entries {
    entry_structs.push(encoder.add_struct(node.tag));
    let ptrs: Vec<u32> = node.pointers.iter().map(|ptr| encoder.add_struct(ptr.tag)).collect();
    entry_ptr_structs.push(ptrs);
  }
  let mut reply_structs = Vec::with_capacity(dialog.replies.len());
  let mut reply_ptr_structs = Vec::with_capacity(dialog.replies.len());
  for node in &dialog.replies {
    reply_structs.push(encoder.add_struct(node.tag));
    let ptrs: Vec<u32> = node.pointers.iter().map(|ptr| encoder.add_struct(ptr.tag)).collect();
    reply_ptr_structs.push(ptrs);
  }
  let start_structs: Vec<u32> = dialog.starts.iter().map(|ptr| encoder.add_struct(ptr.tag)).collect();

  for (node, ptrs) in entry_ptr_structs.iter().enumerate() {
    members.insert(ListKey::Children { kind: NodeKind::Entry, node }, ptrs.clone());
  }
  for (node, ptrs) in reply_ptr_structs.iter().enumerate() {
    members.insert(ListKey::Children { kind: NodeKind::Reply, node }, ptrs.clone());
  }
  members.insert(ListKey::Entries, entry_structs.clone());
  members.insert(ListKey::Replies, reply_structs.clone());
  members.insert(ListKey::Starts, start_structs.clone());

  // Поля, в том же порядке структур; структуры параметров добавляются
  // по мере потребления их списков
  write_root_fields(&mut encoder, dialog, root, &plan)?;
  for (node, value) in dialog.entries.iter().enumerate() {
    write_node_fields(&mut encoder, entry_structs[node], value, NodeKind::Entry, node, &plan, &mut members)?;
    for (ptr, value) in value.pointers.iter().enumerate() {
      let params = ListKey::PtrParams { kind: NodeKind::Entry, node, ptr };
      write_ptr_fields(&mut encoder, entry_ptr_structs[node][ptr], value, params, &plan, &mut members)?;
    }
  }
  for (node, value) in dialog.replies.iter().enumerate() {
    write_node_fields(&mut encoder, reply_structs[node], value, NodeKind::Reply, node, &plan, &mut members)?;
    for (ptr, value) in value.pointers.iter().enumerate() {
      let params = ListKey::PtrParams { kind: NodeKind::Reply, node, ptr };
      write_ptr_fields(&mut encoder, reply_ptr_structs[node][ptr], value, params, &plan, &mut members)?;
    }
  }
  for (start, value) in dialog.starts.iter().enumerate() {
    let params = ListKey::StartParams { start };
    write_start_fields(&mut encoder, start_structs[start], value, params, &plan, &mut members)?;
  }

  // Образ области индексов списков, в порядке назначения смещений планировщиком
  let no_members = Vec::new();
  for (key, offset) in plan.iter() {
    let indices = members.get(key).unwrap_or(&no_members);
    encoder.commit_list(offset, indices)?;
  }

  encoder.finish(Signature::DLG)
}

/// Поля корневой структуры; их ровно девять, в закрепленном порядке
fn write_root_fields(encoder: &mut Encoder, dialog: &Dialog, index: u32, plan: &Plan) -> Result<()> {
  let mut fields = Vec::with_capacity(9);
  fields.push(encoder.field_dword("DelayEntry", dialog.delay_entry)?);
  fields.push(encoder.field_dword("DelayReply", dialog.delay_reply)?);
  fields.push(encoder.field_dword("NumWords", dialog.num_words)?);
  fields.push(encoder.field_resref("EndConversation", &dialog.script_end)?);
  fields.push(encoder.field_resref("EndConverAbort", &dialog.script_abort)?);
  fields.push(encoder.field_byte("PreventZoomIn", dialog.prevent_zoom as u8)?);
  fields.push(encoder.field_list("EntryList", plan.offset(&ListKey::Entries)?)?);
  fields.push(encoder.field_list("ReplyList", plan.offset(&ListKey::Replies)?)?);
  fields.push(encoder.field_list("StartingList", plan.offset(&ListKey::Starts)?)?);
  encoder.close_struct(index, &fields)
}

/// Поля узла в закрепленном порядке. Реплика NPC дополнительно несет поле
/// `Speaker`, номер записи журнала пишется только при непустом задании
fn write_node_fields(
  encoder: &mut Encoder,
  index: u32,
  node: &DialogNode,
  kind: NodeKind,
  position: usize,
  plan: &Plan,
  members: &mut HashMap<ListKey, Vec<u32>>,
) -> Result<()> {
  let mut fields = Vec::with_capacity(12);
  if kind == NodeKind::Entry {
    fields.push(encoder.field_string("Speaker", &node.speaker)?);
  }
  fields.push(encoder.field_dword("Animation", node.animation.as_u32())?);
  fields.push(encoder.field_byte("AnimLoop", node.animation_loop as u8)?);
  fields.push(encoder.field_loc_string("Text", &node.text)?);
  fields.push(encoder.field_resref("Script", &node.script_action)?);

  let params = ListKey::NodeParams { kind, node: position };
  fields.push(encoder.field_list("ActionParams", plan.offset(&params)?)?);
  let structs = write_params(encoder, &node.action_params)?;
  members.insert(params, structs);

  fields.push(encoder.field_dword("Delay", node.delay)?);
  fields.push(encoder.field_string("Comment", &node.comment)?);
  fields.push(encoder.field_resref("Sound", &node.sound)?);
  fields.push(encoder.field_string("Quest", &node.quest)?);
  if !node.quest.is_empty() {
    fields.push(encoder.field_dword("QuestEntry", node.quest_entry.unwrap_or(0))?);
  }

  let children = ListKey::Children { kind, node: position };
  let label = match kind {
    NodeKind::Entry => "RepliesList",
    NodeKind::Reply => "EntriesList",
  };
  fields.push(encoder.field_list(label, plan.offset(&children)?)?);

  encoder.close_struct(index, &fields)
}

/// Поля указателя узла в закрепленном порядке. Комментарий перекрестной ссылки
/// пишется только для самих перекрестных ссылок, поэтому такой указатель несет
/// пять полей вместо четырех
fn write_ptr_fields(
  encoder: &mut Encoder,
  index: u32,
  ptr: &DialogPtr,
  params: ListKey,
  plan: &Plan,
  members: &mut HashMap<ListKey, Vec<u32>>,
) -> Result<()> {
  let mut fields = Vec::with_capacity(5);
  fields.push(encoder.field_dword("Index", ptr.index)?);
  fields.push(encoder.field_resref("Active", &ptr.script_appears)?);
  fields.push(encoder.field_list("ConditionParams", plan.offset(&params)?)?);
  let structs = write_params(encoder, &ptr.condition_params)?;
  members.insert(params, structs);
  fields.push(encoder.field_byte("IsChild", ptr.is_link as u8)?);
  if ptr.is_link {
    let comment = ptr.link_comment.as_ref().map(String::as_str).unwrap_or("");
    fields.push(encoder.field_string("LinkComment", comment)?);
  }
  encoder.close_struct(index, &fields)
}

/// Поля стартовой обертки: индекс, скрипт условия и его параметры
fn write_start_fields(
  encoder: &mut Encoder,
  index: u32,
  ptr: &DialogPtr,
  params: ListKey,
  plan: &Plan,
  members: &mut HashMap<ListKey, Vec<u32>>,
) -> Result<()> {
  let mut fields = Vec::with_capacity(3);
  fields.push(encoder.field_dword("Index", ptr.index)?);
  fields.push(encoder.field_resref("Active", &ptr.script_appears)?);
  fields.push(encoder.field_list("ConditionParams", plan.offset(&params)?)?);
  let structs = write_params(encoder, &ptr.condition_params)?;
  members.insert(params, structs);
  encoder.close_struct(index, &fields)
}

/// Добавляет по структуре из двух строковых полей `Key` и `Value` на каждую
/// пару параметров и возвращает индексы добавленных структур
fn write_params(encoder: &mut Encoder, params: &IndexMap<String, String>) -> Result<Vec<u32>> {
  let mut structs = Vec::with_capacity(params.len());
  for (key, value) in params {
    let index = encoder.add_struct(0);
    let key_field = encoder.field_string("Key", key)?;
    let value_field = encoder.field_string("Value", value)?;
    encoder.close_struct(index, &[key_field, value_field])?;
    structs.push(index);
  }
  Ok(structs)
}
