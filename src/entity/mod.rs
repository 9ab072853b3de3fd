//! SeaORM entity definitions and the set of tables the store must carry.

pub mod seeder_history;
pub mod setting;
pub mod user;

/// Every table owned by the panel store, in synchronisation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Table {
  Users,
  Settings,
  SeederHistory,
}

impl Table {
  pub const ALL: [Table; 3] =
    [Table::Users, Table::Settings, Table::SeederHistory];

  /// Canonical table identifier; matches the entity's `table_name`.
  pub fn name(self) -> &'static str {
    match self {
      Table::Users => "users",
      Table::Settings => "settings",
      Table::SeederHistory => "history_of_seeders",
    }
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::EntityName;

  use super::*;

  #[test]
  fn test_names_match_entities() {
    assert_eq!(Table::Users.name(), user::Entity.table_name());
    assert_eq!(Table::Settings.name(), setting::Entity.table_name());
    assert_eq!(
      Table::SeederHistory.name(),
      seeder_history::Entity.table_name()
    );
  }
}
