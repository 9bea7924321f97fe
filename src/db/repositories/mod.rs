//! Per-aggregate repositories behind the [`Store`](super::Store) facade.
//!
//! Every mutating call takes the caller's user id and resolves ownership in
//! the WHERE clause, so a foreign row and a missing row are indistinguishable
//! to the caller.

pub mod commander;
pub mod game;
pub mod stats;
pub mod user;

use sea_orm::Order;

/// Commanders with fewer games than this are noise in rankings and
/// per-commander breakdowns, so those reads filter them out.
pub const MIN_GAMES_FOR_STATS: i64 = 5;

/// Sort direction for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl From<SortDir> for Order {
    fn from(dir: SortDir) -> Self {
        match dir {
            SortDir::Asc => Self::Asc,
            SortDir::Desc => Self::Desc,
        }
    }
}
