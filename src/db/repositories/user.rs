use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use tracing::info;

use super::SortDir;
use crate::config::LimitsConfig;
use crate::entities::{commanders, games, prelude::*, users};
use crate::error::{Error, Result};
use crate::validation;

/// Input for a new account. The password arrives pre-hashed; this layer
/// never sees plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

/// Partial profile update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Sortable columns for the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    Username,
    CreatedAt,
}

impl UserSort {
    fn column(self) -> users::Column {
        match self {
            Self::Username => users::Column::Username,
            Self::CreatedAt => users::Column::CreatedAt,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserListQuery {
    pub limit: u64,
    pub offset: u64,
    pub sort: UserSort,
    pub dir: SortDir,
    pub username_contains: Option<String>,
}

impl Default for UserListQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            sort: UserSort::Username,
            dir: SortDir::Asc,
            username_contains: None,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
    limits: LimitsConfig,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, limits: LimitsConfig) -> Self {
        Self { conn, limits }
    }

    /// Register an account. The username uniqueness check here is the
    /// friendly fast path; the unique index is what holds under concurrent
    /// registration, surfacing as [`Error::Conflict`] via the driver.
    pub async fn create(&self, new: NewUser) -> Result<users::Model> {
        let username = validation::normalize_username(&new.username)?;
        let email = new
            .email
            .as_deref()
            .map(validation::normalize_email)
            .transpose()?;

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let taken = Users::find()
            .filter(users::Column::Username.eq(username.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if taken {
            return Err(Error::Conflict("username is already taken".to_string()));
        }

        if let Some(ref email) = email {
            let taken = Users::find()
                .filter(users::Column::Email.eq(email.as_str()))
                .one(&txn)
                .await?
                .is_some();
            if taken {
                return Err(Error::Conflict("email is already registered".to_string()));
            }
        }

        let model = users::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(new.password_hash),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(user_id = model.id, "registered user");
        Ok(model)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        Ok(Users::find_by_id(id).one(&self.conn).await?)
    }

    /// Login-path lookup. Normalizes the same way `create` does but applies
    /// no policy, so a malformed username simply finds nothing.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        let username = username.trim().to_lowercase();
        Ok(Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?)
    }

    /// Profile update. Users own themselves, so the owner check is simply
    /// `id == caller_id`; a foreign id is indistinguishable from a missing
    /// row.
    pub async fn update(&self, id: i32, caller_id: i32, patch: UserPatch) -> Result<users::Model> {
        if patch.username.is_none() && patch.email.is_none() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        if id != caller_id {
            return Err(Error::NotFoundOrForbidden);
        }

        let mut update = Users::update_many();

        if let Some(ref username) = patch.username {
            let username = validation::normalize_username(username)?;
            let taken = Users::find()
                .filter(users::Column::Username.eq(username.as_str()))
                .filter(users::Column::Id.ne(id))
                .one(&self.conn)
                .await?
                .is_some();
            if taken {
                return Err(Error::Conflict("username is already taken".to_string()));
            }
            update = update.col_expr(users::Column::Username, Expr::value(username));
        }

        if let Some(ref email) = patch.email {
            let email = validation::normalize_email(email)?;
            let taken = Users::find()
                .filter(users::Column::Email.eq(email.as_str()))
                .filter(users::Column::Id.ne(id))
                .one(&self.conn)
                .await?
                .is_some();
            if taken {
                return Err(Error::Conflict("email is already registered".to_string()));
            }
            update = update.col_expr(users::Column::Email, Expr::value(email));
        }

        let result = update
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFoundOrForbidden);
        }

        self.find_by_id(id).await?.ok_or(Error::NotFoundOrForbidden)
    }

    /// Store a new (pre-hashed) password.
    pub async fn change_password(&self, id: i32, caller_id: i32, new_hash: String) -> Result<()> {
        if id != caller_id {
            return Err(Error::NotFoundOrForbidden);
        }

        let result = Users::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_hash))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFoundOrForbidden);
        }

        info!(user_id = id, "changed password");
        Ok(())
    }

    /// Remove an account and everything it owns, in one transaction.
    /// Deleting twice (or a foreign id) returns `false`, never an error.
    pub async fn delete(&self, id: i32, caller_id: i32) -> Result<bool> {
        if id != caller_id {
            return Ok(false);
        }

        let txn = self.conn.begin().await?;

        Games::delete_many()
            .filter(games::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        Commanders::delete_many()
            .filter(commanders::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        let result = Users::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!(user_id = id, "deleted user and owned rows");
        }
        Ok(removed)
    }

    /// Directory listing. Deliberately unscoped: there is no per-caller
    /// ownership dimension over accounts.
    pub async fn list(&self, query: UserListQuery) -> Result<Vec<users::Model>> {
        validation::validate_page(query.limit, self.limits.max_page_size)?;

        let mut find = Users::find();

        if let Some(fragment) = query.username_contains {
            find = find.filter(users::Column::Username.contains(fragment.trim().to_lowercase()));
        }

        Ok(find
            .order_by(query.sort.column(), query.dir.into())
            .limit(query.limit)
            .offset(query.offset)
            .all(&self.conn)
            .await?)
    }
}
