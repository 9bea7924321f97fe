use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    sea_query::{Expr, Func, SimpleExpr},
};
use tracing::info;

use super::{MIN_GAMES_FOR_STATS, SortDir};
use crate::config::LimitsConfig;
use crate::entities::{commanders, games, prelude::*};
use crate::error::{Error, Result};
use crate::validation;

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct CommanderPatch {
    pub name: Option<String>,
    pub colors: Option<String>,
}

/// Sortable columns for commander listings. `Name` sorts on the lower-cased
/// shadow column so ordering ignores display case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommanderSort {
    Name,
    CreatedAt,
    UpdatedAt,
}

impl CommanderSort {
    fn column(self) -> commanders::Column {
        match self {
            Self::Name => commanders::Column::NameLower,
            Self::CreatedAt => commanders::Column::CreatedAt,
            Self::UpdatedAt => commanders::Column::UpdatedAt,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommanderListQuery {
    pub limit: u64,
    pub offset: u64,
    pub sort: CommanderSort,
    pub dir: SortDir,
    /// Case-insensitive substring on the name.
    pub name_contains: Option<String>,
    /// Exact color identity; canonicalized before matching.
    pub colors: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

impl Default for CommanderListQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            sort: CommanderSort::Name,
            dir: SortDir::Asc,
            name_contains: None,
            colors: None,
            created_from: None,
            created_to: None,
        }
    }
}

pub struct CommanderRepository {
    conn: DatabaseConnection,
    limits: LimitsConfig,
}

impl CommanderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, limits: LimitsConfig) -> Self {
        Self { conn, limits }
    }

    /// Create a commander for the caller. The per-owner cap and the
    /// case-insensitive name check run inside the insert transaction; the
    /// `(user_id, name_lower)` unique index is the backstop under
    /// concurrent creates.
    pub async fn create(
        &self,
        caller_id: i32,
        name: &str,
        colors: &str,
    ) -> Result<commanders::Model> {
        let name = validation::validate_commander_name(name)?;
        let colors = validation::canonical_colors(colors)?;
        let name_lower = name.to_lowercase();

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let owned = Commanders::find()
            .filter(commanders::Column::UserId.eq(caller_id))
            .count(&txn)
            .await?;
        if owned >= self.limits.max_commanders_per_user {
            return Err(Error::Conflict(format!(
                "commander limit reached ({} per user)",
                self.limits.max_commanders_per_user
            )));
        }

        let duplicate = Commanders::find()
            .filter(commanders::Column::UserId.eq(caller_id))
            .filter(commanders::Column::NameLower.eq(name_lower.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if duplicate {
            return Err(Error::Conflict(
                "a commander with this name already exists".to_string(),
            ));
        }

        let model = commanders::ActiveModel {
            user_id: Set(caller_id),
            name: Set(name),
            name_lower: Set(name_lower),
            colors: Set(colors),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            commander_id = model.id,
            user_id = caller_id,
            "created commander"
        );
        Ok(model)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<commanders::Model>> {
        Ok(Commanders::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn update(
        &self,
        id: i32,
        caller_id: i32,
        patch: CommanderPatch,
    ) -> Result<commanders::Model> {
        if patch.name.is_none() && patch.colors.is_none() {
            return Err(Error::Validation("no fields to update".to_string()));
        }

        let mut update = Commanders::update_many();

        if let Some(ref name) = patch.name {
            let name = validation::validate_commander_name(name)?;
            let name_lower = name.to_lowercase();

            let duplicate = Commanders::find()
                .filter(commanders::Column::UserId.eq(caller_id))
                .filter(commanders::Column::NameLower.eq(name_lower.as_str()))
                .filter(commanders::Column::Id.ne(id))
                .one(&self.conn)
                .await?
                .is_some();
            if duplicate {
                return Err(Error::Conflict(
                    "a commander with this name already exists".to_string(),
                ));
            }

            update = update
                .col_expr(commanders::Column::Name, Expr::value(name))
                .col_expr(commanders::Column::NameLower, Expr::value(name_lower));
        }

        if let Some(ref colors) = patch.colors {
            let colors = validation::canonical_colors(colors)?;
            update = update.col_expr(commanders::Column::Colors, Expr::value(colors));
        }

        let result = update
            .col_expr(
                commanders::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(commanders::Column::Id.eq(id))
            .filter(commanders::Column::UserId.eq(caller_id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFoundOrForbidden);
        }

        Commanders::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFoundOrForbidden)
    }

    /// Remove a commander and its games in one transaction. Returns `false`
    /// when nothing was removed, so repeat deletes and foreign ids look the
    /// same.
    pub async fn delete(&self, id: i32, caller_id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        Games::delete_many()
            .filter(games::Column::CommanderId.eq(id))
            .filter(games::Column::UserId.eq(caller_id))
            .exec(&txn)
            .await?;

        let result = Commanders::delete_many()
            .filter(commanders::Column::Id.eq(id))
            .filter(commanders::Column::UserId.eq(caller_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!(commander_id = id, user_id = caller_id, "deleted commander");
        }
        Ok(removed)
    }

    pub async fn list(
        &self,
        caller_id: i32,
        query: CommanderListQuery,
    ) -> Result<Vec<commanders::Model>> {
        validation::validate_page(query.limit, self.limits.max_page_size)?;
        validation::validate_date_range(query.created_from, query.created_to)?;

        let mut find = Commanders::find().filter(commanders::Column::UserId.eq(caller_id));

        if let Some(ref fragment) = query.name_contains {
            find = find
                .filter(commanders::Column::NameLower.contains(fragment.trim().to_lowercase()));
        }

        if let Some(ref colors) = query.colors {
            let colors = validation::canonical_colors(colors)?;
            find = find.filter(commanders::Column::Colors.eq(colors));
        }

        // Timestamps are RFC 3339 strings; a bare date sorts before any
        // timestamp on that date, so the upper bound is the next day,
        // exclusive.
        if let Some(from) = query.created_from {
            find = find.filter(commanders::Column::CreatedAt.gte(from.to_string()));
        }
        if let Some(to) = query.created_to
            && let Some(next) = to.succ_opt()
        {
            find = find.filter(commanders::Column::CreatedAt.lt(next.to_string()));
        }

        Ok(find
            .order_by(query.sort.column(), query.dir.into())
            .limit(query.limit)
            .offset(query.offset)
            .all(&self.conn)
            .await?)
    }

    /// Case-insensitive substring search over the caller's commanders,
    /// name-ascending.
    pub async fn search(
        &self,
        caller_id: i32,
        fragment: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<commanders::Model>> {
        validation::validate_page(limit, self.limits.max_page_size)?;

        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            return Err(Error::Validation(
                "search fragment must not be empty".to_string(),
            ));
        }

        Ok(Commanders::find()
            .filter(commanders::Column::UserId.eq(caller_id))
            .filter(commanders::Column::NameLower.contains(fragment))
            .order_by_asc(commanders::Column::NameLower)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?)
    }

    /// The caller's most successful commanders: at least
    /// [`MIN_GAMES_FOR_STATS`] games, ordered by win rate descending with a
    /// name-ascending tie-break.
    pub async fn popular(&self, caller_id: i32, limit: u64) -> Result<Vec<commanders::Model>> {
        validation::validate_page(limit, self.limits.max_page_size)?;

        // AVG over the 0/1 won column is the win rate; grouping by the
        // primary key keeps the selected commander columns well-defined.
        Ok(Commanders::find()
            .filter(commanders::Column::UserId.eq(caller_id))
            .join(JoinType::InnerJoin, commanders::Relation::Games.def())
            .group_by(commanders::Column::Id)
            .having(Expr::expr(games::Column::Id.count()).gte(MIN_GAMES_FOR_STATS))
            .order_by_desc(SimpleExpr::from(Func::avg(Expr::col((
                games::Entity,
                games::Column::Won,
            )))))
            .order_by_asc(commanders::Column::NameLower)
            .limit(limit)
            .all(&self.conn)
            .await?)
    }
}
