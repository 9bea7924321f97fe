use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
    sea_query::{Expr, Func, SimpleExpr},
};

use super::MIN_GAMES_FOR_STATS;
use crate::config::LimitsConfig;
use crate::entities::{commanders, games, prelude::*};
use crate::error::Result;
use crate::validation;

/// Per-user headline numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct UserOverview {
    pub total_games: i64,
    /// Wins over games as a percentage, rounded to 2 decimals; 0 when no
    /// games are recorded.
    pub win_rate: f64,
    pub total_commanders: i64,
    /// Mean of the recorded (non-null) rounds values, rounded to 2
    /// decimals; 0 when nothing is recorded.
    pub avg_rounds: f64,
}

/// One commander's aggregate line in the per-commander breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct CommanderStats {
    pub commander_id: i32,
    pub name: String,
    pub colors: String,
    pub games: i64,
    pub wins: i64,
    pub win_rate: f64,
    pub starting_player_wins: i64,
    pub sol_ring_wins: i64,
    pub avg_rounds: f64,
    pub last_played: NaiveDate,
}

/// Raw grouped row; rates are computed in Rust at the boundary.
#[derive(Debug, Clone, FromQueryResult)]
struct CommanderStatsRow {
    commander_id: i32,
    name: String,
    colors: String,
    games: i64,
    wins: i64,
    starting_player_wins: i64,
    sol_ring_wins: i64,
    avg_rounds: Option<f64>,
    last_played: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateByPlayerCount {
    pub player_count: i32,
    pub games: i64,
    pub win_rate_percent: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateByColors {
    pub colors: String,
    pub games: i64,
    pub win_rate_percent: u32,
}

/// Win rate sliced by table size and by exact color identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionBreakdown {
    pub by_player_count: Vec<RateByPlayerCount>,
    pub by_colors: Vec<RateByColors>,
}

pub struct StatsRepository {
    conn: DatabaseConnection,
    limits: LimitsConfig,
}

impl StatsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, limits: LimitsConfig) -> Self {
        Self { conn, limits }
    }

    /// Totals across everything the user has recorded. All aggregation is
    /// SQL-side; the only Rust math is the rate division.
    pub async fn user_overview(&self, user_id: i32) -> Result<UserOverview> {
        // An ungrouped aggregate always yields one row; COUNT is 0 and the
        // other two are NULL when the user has no games.
        let totals: Option<(i64, Option<i64>, Option<f64>)> = Games::find()
            .select_only()
            .column_as(games::Column::Id.count(), "total_games")
            .column_as(games::Column::Won.sum(), "wins")
            .column_as(
                SimpleExpr::from(Func::avg(Expr::col(games::Column::Rounds))),
                "avg_rounds",
            )
            .filter(games::Column::UserId.eq(user_id))
            .into_tuple()
            .one(&self.conn)
            .await?;

        let total_commanders: Option<i64> = Commanders::find()
            .select_only()
            .column_as(commanders::Column::Id.count(), "count")
            .filter(commanders::Column::UserId.eq(user_id))
            .into_tuple()
            .one(&self.conn)
            .await?;

        let (total_games, wins, avg_rounds) = totals.unwrap_or((0, None, None));

        Ok(UserOverview {
            total_games,
            win_rate: percentage(wins.unwrap_or(0), total_games),
            total_commanders: total_commanders.unwrap_or(0),
            avg_rounds: round2(avg_rounds.unwrap_or(0.0)),
        })
    }

    /// Games grouped per commander, joined for name and colors, filtered to
    /// commanders at or above the significance floor. Ordered by games
    /// played, then win rate.
    pub async fn commander_breakdown(
        &self,
        user_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<CommanderStats>> {
        validation::validate_page(limit, self.limits.max_page_size)?;

        // Grouping by the commander primary key (through the FK) keeps the
        // joined name/colors columns well-defined under SQLite's GROUP BY.
        let rows = Games::find()
            .select_only()
            .column(games::Column::CommanderId)
            .column_as(commanders::Column::Name, "name")
            .column_as(commanders::Column::Colors, "colors")
            .column_as(games::Column::Id.count(), "games")
            .column_as(games::Column::Won.sum(), "wins")
            .column_as(
                games::Column::StartingPlayerWon.sum(),
                "starting_player_wins",
            )
            .column_as(games::Column::SolRingTurnOneWon.sum(), "sol_ring_wins")
            .column_as(
                SimpleExpr::from(Func::avg(Expr::col((games::Entity, games::Column::Rounds)))),
                "avg_rounds",
            )
            .column_as(games::Column::Date.max(), "last_played")
            .join(JoinType::InnerJoin, games::Relation::Commanders.def())
            .filter(games::Column::UserId.eq(user_id))
            .group_by(games::Column::CommanderId)
            .having(Expr::expr(games::Column::Id.count()).gte(MIN_GAMES_FOR_STATS))
            .order_by_desc(games::Column::Id.count())
            .order_by_desc(SimpleExpr::from(Func::avg(Expr::col((
                games::Entity,
                games::Column::Won,
            )))))
            .limit(limit)
            .offset(offset)
            .into_model::<CommanderStatsRow>()
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| CommanderStats {
                commander_id: row.commander_id,
                name: row.name,
                colors: row.colors,
                games: row.games,
                wins: row.wins,
                win_rate: percentage(row.wins, row.games),
                starting_player_wins: row.starting_player_wins,
                sol_ring_wins: row.sol_ring_wins,
                avg_rounds: round2(row.avg_rounds.unwrap_or(0.0)),
                last_played: row.last_played,
            })
            .collect())
    }

    /// Win rate by table size and by exact canonical color string, each an
    /// integer percent. Groups come from existing rows, so counts are never
    /// zero.
    pub async fn dimension_breakdown(&self, user_id: i32) -> Result<DimensionBreakdown> {
        let by_player_count: Vec<(i32, i64, i64)> = Games::find()
            .select_only()
            .column(games::Column::PlayerCount)
            .column_as(games::Column::Id.count(), "games")
            .column_as(games::Column::Won.sum(), "wins")
            .filter(games::Column::UserId.eq(user_id))
            .group_by(games::Column::PlayerCount)
            .order_by_asc(games::Column::PlayerCount)
            .into_tuple()
            .all(&self.conn)
            .await?;

        let by_colors: Vec<(String, i64, i64)> = Games::find()
            .select_only()
            .column_as(commanders::Column::Colors, "colors")
            .column_as(games::Column::Id.count(), "games")
            .column_as(games::Column::Won.sum(), "wins")
            .join(JoinType::InnerJoin, games::Relation::Commanders.def())
            .filter(games::Column::UserId.eq(user_id))
            .group_by(commanders::Column::Colors)
            .order_by_asc(commanders::Column::Colors)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(DimensionBreakdown {
            by_player_count: by_player_count
                .into_iter()
                .map(|(player_count, games, wins)| RateByPlayerCount {
                    player_count,
                    games,
                    win_rate_percent: percent_of(wins, games),
                })
                .collect(),
            by_colors: by_colors
                .into_iter()
                .map(|(colors, games, wins)| RateByColors {
                    colors,
                    games,
                    win_rate_percent: percent_of(wins, games),
                })
                .collect(),
        })
    }
}

/// Share of `part` in `total` as a percentage rounded to 2 decimals; 0 when
/// the denominator is 0, never NaN.
fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Integer percent, rounded to nearest; 0 for an empty group.
fn percent_of(part: i64, total: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert!((percentage(3, 5) - 60.0).abs() < f64::EPSILON);
        assert!((percentage(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((percentage(2, 3) - 66.67).abs() < f64::EPSILON);
        assert!((percentage(5, 5) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert!((percentage(0, 0)).abs() < f64::EPSILON);
        assert!(!percentage(0, 0).is_nan());
    }

    #[test]
    fn round2_rounds_to_nearest_hundredth() {
        assert!((round2(33.333_333) - 33.33).abs() < f64::EPSILON);
        assert!((round2(66.666_666) - 66.67).abs() < f64::EPSILON);
        assert!((round2(59.999) - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_of_rounds_to_nearest() {
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(1, 2), 50);
        assert_eq!(percent_of(0, 0), 0);
    }
}
