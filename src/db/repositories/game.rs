use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait, sea_query::Expr,
};
use tracing::info;

use super::SortDir;
use crate::config::LimitsConfig;
use crate::entities::{games, prelude::*};
use crate::error::{Error, Result};
use crate::validation;

/// Input for a new game row.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub commander_id: i32,
    pub date: NaiveDate,
    pub player_count: i32,
    pub won: bool,
    pub starting_player_won: bool,
    pub sol_ring_turn_one_won: bool,
    pub rounds: Option<i32>,
    pub notes: Option<String>,
}

/// Partial update. `rounds` and `notes` are nullable columns, so they use
/// two-level options: the outer level is "was the field supplied", the
/// inner is the stored value, letting a patch clear them.
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    pub commander_id: Option<i32>,
    pub date: Option<NaiveDate>,
    pub player_count: Option<i32>,
    pub won: Option<bool>,
    pub starting_player_won: Option<bool>,
    pub sol_ring_turn_one_won: Option<bool>,
    pub rounds: Option<Option<i32>>,
    pub notes: Option<Option<String>>,
}

impl GamePatch {
    fn is_empty(&self) -> bool {
        self.commander_id.is_none()
            && self.date.is_none()
            && self.player_count.is_none()
            && self.won.is_none()
            && self.starting_player_won.is_none()
            && self.sol_ring_turn_one_won.is_none()
            && self.rounds.is_none()
            && self.notes.is_none()
    }
}

/// Sortable columns for game listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSort {
    Date,
    CreatedAt,
    PlayerCount,
}

impl GameSort {
    fn column(self) -> games::Column {
        match self {
            Self::Date => games::Column::Date,
            Self::CreatedAt => games::Column::CreatedAt,
            Self::PlayerCount => games::Column::PlayerCount,
        }
    }
}

/// Filter predicates shared by `list` and `export`.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub commander_id: Option<i32>,
    pub won: Option<bool>,
    pub player_count: Option<i32>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct GameListQuery {
    pub limit: u64,
    pub offset: u64,
    pub sort: GameSort,
    pub dir: SortDir,
    pub filter: GameFilter,
}

impl Default for GameListQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            sort: GameSort::Date,
            dir: SortDir::Desc,
            filter: GameFilter::default(),
        }
    }
}

pub struct GameRepository {
    conn: DatabaseConnection,
    limits: LimitsConfig,
}

impl GameRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, limits: LimitsConfig) -> Self {
        Self { conn, limits }
    }

    /// The referenced commander must exist and belong to the caller; a
    /// foreign commander and a missing one produce the same error.
    async fn assert_commander_owned<C>(commander_id: i32, caller_id: i32, conn: &C) -> Result<()>
    where
        C: ConnectionTrait,
    {
        match Commanders::find_by_id(commander_id).one(conn).await? {
            Some(commander) if commander.user_id == caller_id => Ok(()),
            _ => Err(Error::NotFoundOrForbidden),
        }
    }

    pub async fn create(&self, caller_id: i32, new: NewGame) -> Result<games::Model> {
        validation::validate_player_count(new.player_count)?;
        validation::validate_game_date(new.date, chrono::Utc::now().date_naive())?;
        if let Some(rounds) = new.rounds {
            validation::validate_rounds(rounds)?;
        }
        if let Some(ref notes) = new.notes {
            validation::validate_notes(notes)?;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        Self::assert_commander_owned(new.commander_id, caller_id, &txn).await?;

        let model = games::ActiveModel {
            user_id: Set(caller_id),
            commander_id: Set(new.commander_id),
            date: Set(new.date),
            player_count: Set(new.player_count),
            won: Set(new.won),
            starting_player_won: Set(new.starting_player_won),
            sol_ring_turn_one_won: Set(new.sol_ring_turn_one_won),
            rounds: Set(new.rounds),
            notes: Set(new.notes),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(game_id = model.id, user_id = caller_id, "recorded game");
        Ok(model)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<games::Model>> {
        Ok(Games::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn update(&self, id: i32, caller_id: i32, patch: GamePatch) -> Result<games::Model> {
        if patch.is_empty() {
            return Err(Error::Validation("no fields to update".to_string()));
        }

        let mut update = Games::update_many();

        if let Some(date) = patch.date {
            validation::validate_game_date(date, chrono::Utc::now().date_naive())?;
            update = update.col_expr(games::Column::Date, Expr::value(date));
        }

        if let Some(player_count) = patch.player_count {
            validation::validate_player_count(player_count)?;
            update = update.col_expr(games::Column::PlayerCount, Expr::value(player_count));
        }

        if let Some(won) = patch.won {
            update = update.col_expr(games::Column::Won, Expr::value(won));
        }

        if let Some(starting_player_won) = patch.starting_player_won {
            update = update.col_expr(
                games::Column::StartingPlayerWon,
                Expr::value(starting_player_won),
            );
        }

        if let Some(sol_ring_turn_one_won) = patch.sol_ring_turn_one_won {
            update = update.col_expr(
                games::Column::SolRingTurnOneWon,
                Expr::value(sol_ring_turn_one_won),
            );
        }

        if let Some(rounds) = patch.rounds {
            if let Some(rounds) = rounds {
                validation::validate_rounds(rounds)?;
            }
            update = update.col_expr(games::Column::Rounds, Expr::value(rounds));
        }

        if let Some(notes) = patch.notes {
            if let Some(ref notes) = notes {
                validation::validate_notes(notes)?;
            }
            update = update.col_expr(games::Column::Notes, Expr::value(notes));
        }

        let txn = self.conn.begin().await?;

        if let Some(commander_id) = patch.commander_id {
            // Re-pointing a game at another commander re-runs the
            // co-ownership check, inside the same transaction as the
            // write.
            Self::assert_commander_owned(commander_id, caller_id, &txn).await?;
            update = update.col_expr(games::Column::CommanderId, Expr::value(commander_id));
        }

        let result = update
            .col_expr(
                games::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(games::Column::Id.eq(id))
            .filter(games::Column::UserId.eq(caller_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFoundOrForbidden);
        }

        let model = Games::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFoundOrForbidden)?;

        txn.commit().await?;

        Ok(model)
    }

    /// Returns `false` when nothing was removed, so repeat deletes and
    /// foreign ids look the same.
    pub async fn delete(&self, id: i32, caller_id: i32) -> Result<bool> {
        let result = Games::delete_many()
            .filter(games::Column::Id.eq(id))
            .filter(games::Column::UserId.eq(caller_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    fn apply_filter(mut find: Select<Games>, caller_id: i32, filter: &GameFilter) -> Select<Games> {
        find = find.filter(games::Column::UserId.eq(caller_id));

        if let Some(commander_id) = filter.commander_id {
            find = find.filter(games::Column::CommanderId.eq(commander_id));
        }
        if let Some(won) = filter.won {
            find = find.filter(games::Column::Won.eq(won));
        }
        if let Some(player_count) = filter.player_count {
            find = find.filter(games::Column::PlayerCount.eq(player_count));
        }
        if let Some(from) = filter.date_from {
            find = find.filter(games::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_to {
            find = find.filter(games::Column::Date.lte(to));
        }

        find
    }

    pub async fn list(&self, caller_id: i32, query: GameListQuery) -> Result<Vec<games::Model>> {
        validation::validate_page(query.limit, self.limits.max_page_size)?;
        validation::validate_date_range(query.filter.date_from, query.filter.date_to)?;

        let find = Self::apply_filter(Games::find(), caller_id, &query.filter);

        Ok(find
            .order_by(query.sort.column(), query.dir.into())
            .limit(query.limit)
            .offset(query.offset)
            .all(&self.conn)
            .await?)
    }

    /// Unpaginated read with the same predicates as `list`, date-ascending.
    /// Feeds the out-of-scope export surface.
    pub async fn export(&self, caller_id: i32, filter: GameFilter) -> Result<Vec<games::Model>> {
        validation::validate_date_range(filter.date_from, filter.date_to)?;

        let find = Self::apply_filter(Games::find(), caller_id, &filter);

        Ok(find.order_by_asc(games::Column::Date).all(&self.conn).await?)
    }
}
