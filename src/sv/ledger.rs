//! Seeder ledger: which one-time data seeders have already run.

use crate::{entity::seeder_history, prelude::*};

pub struct Ledger<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Ledger<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Names of every recorded seeder, oldest first.
  pub async fn names(&self) -> Result<Vec<String>> {
    let names = seeder_history::Entity::find()
      .select_only()
      .column(seeder_history::Column::SeederName)
      .order_by_asc(seeder_history::Column::Id)
      .into_tuple::<String>()
      .all(self.db)
      .await?;
    Ok(names)
  }

  pub async fn contains(&self, name: &str) -> Result<bool> {
    let count = seeder_history::Entity::find()
      .filter(seeder_history::Column::SeederName.eq(name))
      .count(self.db)
      .await?;
    Ok(count > 0)
  }

  pub async fn record(&self, name: &str) -> Result<seeder_history::Model> {
    let record = seeder_history::ActiveModel {
      seeder_name: Set(name.to_owned()),
      created_at: Set(Utc::now().naive_utc()),
      ..Default::default()
    };

    Ok(record.insert(self.db).await?)
  }
}
