//! SQLite store behind a single facade.
//!
//! [`Store`] owns the connection pool and exposes one public async method
//! per repository operation; the repositories themselves stay private so
//! every caller goes through the same ownership-scoped surface.

use std::path::Path;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, Statement,
    TransactionTrait,
};
use tracing::info;

use crate::config::{LimitsConfig, StorageConfig};
use crate::error::{Error, Result};

pub mod migrator;
pub mod repositories;

pub use crate::entities::commanders::Model as Commander;
pub use crate::entities::games::Model as Game;
pub use crate::entities::users::Model as User;
pub use repositories::SortDir;
pub use repositories::commander::{CommanderListQuery, CommanderPatch, CommanderSort};
pub use repositories::game::{GameFilter, GameListQuery, GamePatch, GameSort, NewGame};
pub use repositories::stats::{
    CommanderStats, DimensionBreakdown, RateByColors, RateByPlayerCount, UserOverview,
};
pub use repositories::user::{NewUser, UserListQuery, UserPatch, UserSort};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    limits: LimitsConfig,
}

impl Store {
    /// Connect with the configured pool bounds and run migrations.
    pub async fn connect(config: &StorageConfig, limits: LimitsConfig) -> Result<Self> {
        Self::with_pool_options(
            &config.database_path,
            config.max_connections,
            config.min_connections,
            limits,
        )
        .await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
        limits: LimitsConfig,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // File-backed URLs get their parent directory and file created up
        // front; sqlite does not create missing directories itself.
        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .map_err(|e| Error::Storage(format!("cannot create database file: {e}")))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn, limits })
    }

    /// Liveness probe: one `SELECT 1` round-trip through the pool.
    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Begin a transaction; commit or roll back on the returned handle,
    /// dropping it rolls back.
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.conn.begin().await?)
    }

    /// Drain the pool. Every clone of this store dies with it.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    fn users(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone(), self.limits)
    }

    fn commanders(&self) -> repositories::commander::CommanderRepository {
        repositories::commander::CommanderRepository::new(self.conn.clone(), self.limits)
    }

    fn games(&self) -> repositories::game::GameRepository {
        repositories::game::GameRepository::new(self.conn.clone(), self.limits)
    }

    fn stats(&self) -> repositories::stats::StatsRepository {
        repositories::stats::StatsRepository::new(self.conn.clone(), self.limits)
    }

    // Users

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        self.users().create(new).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.users().find_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.users().find_by_username(username).await
    }

    pub async fn update_user(&self, id: i32, caller_id: i32, patch: UserPatch) -> Result<User> {
        self.users().update(id, caller_id, patch).await
    }

    pub async fn change_password(&self, id: i32, caller_id: i32, new_hash: String) -> Result<()> {
        self.users().change_password(id, caller_id, new_hash).await
    }

    pub async fn delete_user(&self, id: i32, caller_id: i32) -> Result<bool> {
        self.users().delete(id, caller_id).await
    }

    pub async fn list_users(&self, query: UserListQuery) -> Result<Vec<User>> {
        self.users().list(query).await
    }

    // Commanders

    pub async fn create_commander(
        &self,
        caller_id: i32,
        name: &str,
        colors: &str,
    ) -> Result<Commander> {
        self.commanders().create(caller_id, name, colors).await
    }

    pub async fn get_commander(&self, id: i32) -> Result<Option<Commander>> {
        self.commanders().find_by_id(id).await
    }

    pub async fn update_commander(
        &self,
        id: i32,
        caller_id: i32,
        patch: CommanderPatch,
    ) -> Result<Commander> {
        self.commanders().update(id, caller_id, patch).await
    }

    pub async fn delete_commander(&self, id: i32, caller_id: i32) -> Result<bool> {
        self.commanders().delete(id, caller_id).await
    }

    pub async fn list_commanders(
        &self,
        caller_id: i32,
        query: CommanderListQuery,
    ) -> Result<Vec<Commander>> {
        self.commanders().list(caller_id, query).await
    }

    pub async fn search_commanders(
        &self,
        caller_id: i32,
        fragment: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Commander>> {
        self.commanders()
            .search(caller_id, fragment, limit, offset)
            .await
    }

    pub async fn popular_commanders(&self, caller_id: i32, limit: u64) -> Result<Vec<Commander>> {
        self.commanders().popular(caller_id, limit).await
    }

    // Games

    pub async fn create_game(&self, caller_id: i32, new: NewGame) -> Result<Game> {
        self.games().create(caller_id, new).await
    }

    pub async fn get_game(&self, id: i32) -> Result<Option<Game>> {
        self.games().find_by_id(id).await
    }

    pub async fn update_game(&self, id: i32, caller_id: i32, patch: GamePatch) -> Result<Game> {
        self.games().update(id, caller_id, patch).await
    }

    pub async fn delete_game(&self, id: i32, caller_id: i32) -> Result<bool> {
        self.games().delete(id, caller_id).await
    }

    pub async fn list_games(&self, caller_id: i32, query: GameListQuery) -> Result<Vec<Game>> {
        self.games().list(caller_id, query).await
    }

    pub async fn export_games(&self, caller_id: i32, filter: GameFilter) -> Result<Vec<Game>> {
        self.games().export(caller_id, filter).await
    }

    // Statistics

    pub async fn user_overview(&self, user_id: i32) -> Result<UserOverview> {
        self.stats().user_overview(user_id).await
    }

    pub async fn commander_breakdown(
        &self,
        user_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<CommanderStats>> {
        self.stats().commander_breakdown(user_id, limit, offset).await
    }

    pub async fn dimension_breakdown(&self, user_id: i32) -> Result<DimensionBreakdown> {
        self.stats().dimension_breakdown(user_id).await
    }
}
