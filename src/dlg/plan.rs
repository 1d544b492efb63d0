//! Планировщик раскладки области индексов списков.
//!
//! Смещения всех спискам назначаются до создания первого поля, поэтому
//! поля-списки сразу создаются с окончательными смещениями и перезапись
//! уже созданных полей не требуется

use indexmap::IndexMap;

use crate::dlg::{Dialog, NodeKind};
use crate::error::{Error, Result};

/// Ключ списка в плане раскладки: какой именно список диалога имеется в виду
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKey {
  /// Список всех реплик NPC (`EntryList` корневой структуры)
  Entries,
  /// Список всех ответов игрока (`ReplyList` корневой структуры)
  Replies,
  /// Список стартовых указателей (`StartingList` корневой структуры)
  Starts,
  /// Список указателей узла: `RepliesList` реплики или `EntriesList` ответа
  Children {
    /// Вид узла-владельца
    kind: NodeKind,
    /// Индекс узла-владельца в его последовательности
    node: usize,
  },
  /// Параметры условия показа указателя узла
  PtrParams {
    /// Вид узла-владельца
    kind: NodeKind,
    /// Индекс узла-владельца в его последовательности
    node: usize,
    /// Индекс указателя среди указателей узла
    ptr: usize,
  },
  /// Параметры условия показа стартового указателя
  StartParams {
    /// Индекс стартового указателя
    start: usize,
  },
  /// Параметры действия узла
  NodeParams {
    /// Вид узла-владельца
    kind: NodeKind,
    /// Индекс узла-владельца в его последовательности
    node: usize,
  },
}

/// План раскладки области индексов списков: байтовое смещение каждого списка
/// диалога. Порядок обхода плана совпадает с порядком назначения смещений
#[derive(Debug)]
pub struct Plan {
  /// Смещения списков в порядке их назначения
  offsets: IndexMap<ListKey, u32>,
  /// Суммарный размер области индексов списков в байтах
  total: u32,
}

impl Plan {
  /// Вычисляет раскладку для указанного диалога. Смещения назначаются в жестко
  /// заданном порядке: три корневых списка, списки указателей реплик, списки
  /// указателей ответов, параметры условий всех указателей (реплик, ответов,
  /// стартов), параметры действий всех узлов (реплик, ответов)
  pub fn new(dialog: &Dialog) -> Self {
    let mut plan = Plan { offsets: IndexMap::new(), total: 0 };

    plan.push(ListKey::Entries, dialog.entries.len());
    plan.push(ListKey::Replies, dialog.replies.len());
    plan.push(ListKey::Starts, dialog.starts.len());

    for (node, value) in dialog.entries.iter().enumerate() {
      plan.push(ListKey::Children { kind: NodeKind::Entry, node }, value.pointers.len());
    }
    for (node, value) in dialog.replies.iter().enumerate() {
      plan.push(ListKey::Children { kind: NodeKind::Reply, node }, value.pointers.len());
    }

    for (node, value) in dialog.entries.iter().enumerate() {
      for (ptr, value) in value.pointers.iter().enumerate() {
        plan.push(ListKey::PtrParams { kind: NodeKind::Entry, node, ptr }, value.condition_params.len());
      }
    }
    for (node, value) in dialog.replies.iter().enumerate() {
      for (ptr, value) in value.pointers.iter().enumerate() {
        plan.push(ListKey::PtrParams { kind: NodeKind::Reply, node, ptr }, value.condition_params.len());
      }
    }
    for (start, value) in dialog.starts.iter().enumerate() {
      plan.push(ListKey::StartParams { start }, value.condition_params.len());
    }

    for (node, value) in dialog.entries.iter().enumerate() {
      plan.push(ListKey::NodeParams { kind: NodeKind::Entry, node }, value.action_params.len());
    }
    for (node, value) in dialog.replies.iter().enumerate() {
      plan.push(ListKey::NodeParams { kind: NodeKind::Reply, node }, value.action_params.len());
    }
    plan
  }

  /// Назначает очередному списку следующее свободное смещение. Каждый список
  /// занимает `4 + 4 * count` байт; пустой список занимает 4 байта нулевого счетчика
  fn push(&mut self, key: ListKey, count: usize) {
    self.offsets.insert(key, self.total);
    self.total += 4 + 4 * count as u32;
  }

  /// Запланированное байтовое смещение указанного списка
  pub fn offset(&self, key: &ListKey) -> Result<u32> {
    self.offsets.get(key).copied()
      .ok_or_else(|| Error::Invariant("list was not assigned an offset by the planner".into()))
  }

  /// Обходит план в порядке назначения смещений
  pub fn iter(&self) -> impl Iterator<Item = (&ListKey, u32)> + '_ {
    self.offsets.iter().map(|(key, &offset)| (key, offset))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dlg::{DialogNode, DialogPtr};

  #[test]
  fn every_list_occupies_count_plus_header() {
    let mut dialog = Dialog::new();
    let mut entry = DialogNode::entry();
    let mut ptr = DialogPtr::new(NodeKind::Reply, 0);
    ptr.condition_params.insert("quest".into(), "Q1".into());
    ptr.condition_params.insert("state".into(), "open".into());
    entry.pointers.push(ptr);
    entry.action_params.insert("a".into(), "b".into());
    dialog.entries.push(entry);
    dialog.replies.push(DialogNode::reply());
    dialog.starts.push(DialogPtr::start(0));

    let plan = Plan::new(&dialog);

    // EntryList: 1 элемент, ReplyList: 1, StartingList: 1
    assert_eq!(plan.offset(&ListKey::Entries).unwrap(), 0);
    assert_eq!(plan.offset(&ListKey::Replies).unwrap(), 8);
    assert_eq!(plan.offset(&ListKey::Starts).unwrap(), 16);
    // Список указателей реплики: 1 элемент, ответа: пустой
    assert_eq!(plan.offset(&ListKey::Children { kind: NodeKind::Entry, node: 0 }).unwrap(), 24);
    assert_eq!(plan.offset(&ListKey::Children { kind: NodeKind::Reply, node: 0 }).unwrap(), 32);
    // Параметры условий: у указателя реплики две пары, у старта ни одной
    assert_eq!(plan.offset(&ListKey::PtrParams { kind: NodeKind::Entry, node: 0, ptr: 0 }).unwrap(), 36);
    assert_eq!(plan.offset(&ListKey::StartParams { start: 0 }).unwrap(), 48);
    // Параметры действий: у реплики одна пара, у ответа ни одной
    assert_eq!(plan.offset(&ListKey::NodeParams { kind: NodeKind::Entry, node: 0 }).unwrap(), 52);
    assert_eq!(plan.offset(&ListKey::NodeParams { kind: NodeKind::Reply, node: 0 }).unwrap(), 60);
  }

  #[test]
  fn plan_iteration_follows_assignment_order() {
    let mut dialog = Dialog::new();
    dialog.entries.push(DialogNode::entry());
    dialog.starts.push(DialogPtr::start(0));

    let plan = Plan::new(&dialog);
    let offsets: Vec<u32> = plan.iter().map(|(_, offset)| offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort();
    assert_eq!(offsets, sorted);
  }
}
