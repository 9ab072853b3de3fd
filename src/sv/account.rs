use crate::{entity::user, prelude::*};

pub struct Account<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Account<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Inserts an account. `password` must already be hashed.
  pub async fn create(
    &self,
    username: &str,
    password: String,
  ) -> Result<user::Model> {
    let user = user::ActiveModel {
      username: Set(username.to_owned()),
      password: Set(password),
      ..Default::default()
    };

    Ok(user.insert(self.db).await?)
  }

  pub async fn by_username(
    &self,
    username: &str,
  ) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::Username.eq(username))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn all(&self) -> Result<Vec<user::Model>> {
    let users =
      user::Entity::find().order_by_asc(user::Column::Id).all(self.db).await?;
    Ok(users)
  }

  pub async fn set_password(
    &self,
    user: user::Model,
    hash: String,
  ) -> Result<()> {
    user::ActiveModel { password: Set(hash), ..user.into() }
      .update(self.db)
      .await?;
    Ok(())
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(user::Entity::find().count(self.db).await?)
  }
}
