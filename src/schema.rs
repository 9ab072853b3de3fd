//! Additive schema synchronisation driven by the entity definitions.
//!
//! Missing tables are created, missing columns are added and declared
//! indices are ensured. Nothing is ever dropped or truncated, so running the
//! pass again over an unchanged entity set changes nothing.

use sea_orm::{
  IdenStatic, Iterable, PrimaryKeyToColumn, Schema, Statement,
  sea_query::{Alias, ColumnDef, ColumnType, Index, Table as Ddl},
};

use crate::{
  entity::{Table, seeder_history, setting, user},
  prelude::*,
};

/// What a synchronisation pass did to one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableChange {
  pub created: bool,
  pub added_columns: Vec<String>,
}

impl TableChange {
  pub fn is_noop(&self) -> bool {
    !self.created && self.added_columns.is_empty()
  }
}

/// Reconciles every known table in order. Stops at the first table that
/// cannot be reconciled; tables handled before it keep their changes.
pub async fn sync(
  db: &DatabaseConnection,
) -> Result<Vec<(Table, TableChange)>> {
  let schema = Schema::new(db.get_database_backend());
  let mut changes = Vec::with_capacity(Table::ALL.len());

  for table in Table::ALL {
    let change = match table {
      Table::Users => reconcile(db, &schema, table, user::Entity).await,
      Table::Settings => reconcile(db, &schema, table, setting::Entity).await,
      Table::SeederHistory => {
        reconcile(db, &schema, table, seeder_history::Entity).await
      }
    }?;

    if change.is_noop() {
      debug!(table = table.name(), "schema up to date");
    } else {
      info!(
        table = table.name(),
        created = change.created,
        added = ?change.added_columns,
        "schema updated"
      );
    }
    changes.push((table, change));
  }

  Ok(changes)
}

async fn reconcile<E: EntityTrait>(
  db: &DatabaseConnection,
  schema: &Schema,
  table: Table,
  entity: E,
) -> Result<TableChange> {
  let backend = db.get_database_backend();
  let existing = existing_columns(db, table).await?;
  let mut change = TableChange::default();

  if existing.is_empty() {
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt))
      .await
      .map_err(|e| Error::schema(table.name(), e))?;
    change.created = true;
  } else {
    let mut missing = Vec::new();

    let mut present = Vec::new();

    for column in E::Column::iter() {
      let name = column.as_str();
      let def = column.def();

      match existing.iter().find(|(have, _)| have.eq_ignore_ascii_case(name)) {
        Some((_, declared)) => {
          present.push(column);
          let want = Affinity::of(def.get_column_type());
          let have = Affinity::of_declared(declared);
          if let (Some(want), Some(have)) = (want, have) {
            if want != have {
              return Err(Error::schema(
                table.name(),
                format!(
                  "column `{name}` is stored as {declared} ({have:?}), \
                   expected {want:?}"
                ),
              ));
            }
          }
        }
        None => missing.push(column),
      }
    }

    // check everything before altering anything
    for column in &missing {
      let name = column.as_str();
      if E::PrimaryKey::iter().any(|pk| pk.into_column().as_str() == name) {
        return Err(Error::schema(
          table.name(),
          format!("primary key column `{}` is missing", column.as_str()),
        ));
      }
    }

    // legacy tables may predate a column's UNIQUE constraint
    for column in present {
      if column.def().is_unique() {
        unique_index(db, table, column.as_str()).await?;
      }
    }

    for column in missing {
      add_column(db, table, column).await?;
      change.added_columns.push(column.as_str().to_owned());
    }
  }

  for mut stmt in schema.create_index_from_entity(entity) {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt))
      .await
      .map_err(|e| Error::schema(table.name(), e))?;
  }

  Ok(change)
}

async fn add_column<C: ColumnTrait>(
  db: &DatabaseConnection,
  table: Table,
  column: C,
) -> Result<()> {
  let backend = db.get_database_backend();
  let name = column.as_str();
  let def = column.def();
  let column_type = def.get_column_type().clone();

  let mut col = ColumnDef::new_with_type(Alias::new(name), column_type.clone());
  if def.is_null() {
    col.null();
  } else {
    col.not_null();
  }

  if let Some(default) = def.get_column_default() {
    col.default(default.clone());
  } else if !def.is_null() {
    // existing rows need a value for a NOT NULL column
    match Affinity::of(&column_type) {
      Some(Affinity::Integer) => col.default(0),
      Some(Affinity::Real) => col.default(0.0),
      Some(Affinity::Text) => col.default(""),
      _ => {
        return Err(Error::schema(
          table.name(),
          format!("cannot add NOT NULL column `{name}` without a default"),
        ));
      }
    };
  }

  let stmt = Ddl::alter()
    .table(Alias::new(table.name()))
    .add_column(&mut col)
    .to_owned();
  db.execute(backend.build(&stmt))
    .await
    .map_err(|e| Error::schema(table.name(), e))?;

  // ADD COLUMN cannot carry a UNIQUE constraint everywhere
  if def.is_unique() {
    unique_index(db, table, name).await?;
  }

  debug!(table = table.name(), column = name, "column added");
  Ok(())
}

/// Ensures a unique index on `column`. Fails when stored rows already hold
/// duplicate values.
async fn unique_index(
  db: &DatabaseConnection,
  table: Table,
  column: &str,
) -> Result<()> {
  let index = Index::create()
    .name(format!("idx_{}_{}_unique", table.name(), column))
    .table(Alias::new(table.name()))
    .col(Alias::new(column))
    .unique()
    .if_not_exists()
    .to_owned();

  db.execute(db.get_database_backend().build(&index)).await.map_err(|e| {
    Error::schema(table.name(), format!("unique index on `{column}`: {e}"))
  })?;
  Ok(())
}

/// Column names and declared types currently present for `table`. Empty when
/// the table does not exist.
async fn existing_columns(
  db: &DatabaseConnection,
  table: Table,
) -> Result<Vec<(String, String)>> {
  let backend = db.get_database_backend();
  let stmt = match backend {
    DbBackend::Sqlite => Statement::from_string(
      backend,
      format!(
        "SELECT name, type AS col_type FROM pragma_table_info('{}')",
        table.name()
      ),
    ),
    DbBackend::Postgres => Statement::from_sql_and_values(
      backend,
      "SELECT column_name::text AS name, data_type::text AS col_type \
       FROM information_schema.columns \
       WHERE table_schema = current_schema() AND table_name = $1",
      [table.name().into()],
    ),
    DbBackend::MySql => Statement::from_sql_and_values(
      backend,
      "SELECT CAST(column_name AS CHAR) AS name, \
       CAST(data_type AS CHAR) AS col_type \
       FROM information_schema.columns \
       WHERE table_schema = DATABASE() AND table_name = ?",
      [table.name().into()],
    ),
  };

  let rows =
    db.query_all(stmt).await.map_err(|e| Error::schema(table.name(), e))?;

  rows
    .iter()
    .map(|row| {
      let name: String = row.try_get("", "name")?;
      let declared: String = row.try_get("", "col_type")?;
      Ok((name, declared))
    })
    .collect::<std::result::Result<_, sea_orm::DbErr>>()
    .map_err(|e| Error::schema(table.name(), e))
}

/// Coarse storage class used to detect conflicting column types. Types that
/// do not fall clearly into one class are never reported as conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
  Integer,
  Real,
  Text,
  Blob,
}

impl Affinity {
  fn of(column_type: &ColumnType) -> Option<Self> {
    match column_type {
      ColumnType::TinyInteger
      | ColumnType::SmallInteger
      | ColumnType::Integer
      | ColumnType::BigInteger
      | ColumnType::TinyUnsigned
      | ColumnType::SmallUnsigned
      | ColumnType::Unsigned
      | ColumnType::BigUnsigned => Some(Self::Integer),
      ColumnType::Float | ColumnType::Double => Some(Self::Real),
      ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => {
        Some(Self::Text)
      }
      ColumnType::Binary(_) | ColumnType::VarBinary(_) | ColumnType::Blob => {
        Some(Self::Blob)
      }
      _ => None,
    }
  }

  /// Follows SQLite's type affinity rules, which also classify the
  /// `information_schema` type names of PostgreSQL and MySQL.
  fn of_declared(declared: &str) -> Option<Self> {
    let declared = declared.to_ascii_uppercase();
    if declared.contains("INT") {
      Some(Self::Integer)
    } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
      Some(Self::Text)
    } else if declared.contains("BLOB") || declared == "BYTEA" {
      Some(Self::Blob)
    } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
      Some(Self::Real)
    } else {
      None
    }
  }
}
