pub mod account;
pub mod ledger;

pub use account::Account;
pub use ledger::Ledger;

use crate::{
  entity::{Table, seeder_history, setting, user},
  prelude::*,
};

/// Row count of `table` is zero. Query failures are returned, never read as
/// either answer.
pub async fn is_empty(db: &DatabaseConnection, table: Table) -> Result<bool> {
  let count = match table {
    Table::Users => user::Entity::find().count(db).await?,
    Table::Settings => setting::Entity::find().count(db).await?,
    Table::SeederHistory => seeder_history::Entity::find().count(db).await?,
  };
  Ok(count == 0)
}
