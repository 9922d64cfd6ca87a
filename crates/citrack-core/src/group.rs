//! Overview grouping: rows bucketed by username.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::row::ChangeRow;

/// All rows of one username, in their incoming order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowGroup {
  pub username: String,
  /// Identifier of the first row seen for this username.
  pub user_id:  String,
  pub rows:     Vec<ChangeRow>,
}

/// Group rows by username. Groups appear in first-seen order; no row is
/// dropped or duplicated.
pub fn group_by_username(rows: impl IntoIterator<Item = ChangeRow>) -> Vec<RowGroup> {
  let mut groups: Vec<RowGroup> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();

  for row in rows {
    match index.get(&row.username) {
      Some(&i) => groups[i].rows.push(row),
      None => {
        index.insert(row.username.clone(), groups.len());
        groups.push(RowGroup {
          username: row.username.clone(),
          user_id:  row.user_id.clone(),
          rows:     vec![row],
        });
      }
    }
  }

  groups
}
