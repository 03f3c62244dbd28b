// Aggregation Engine (C11): bounded-time rollups over playbook execution
// traces, grouped by incident_type / playbook / action_type. Grounded in
// gateway-storage::database's optional-filter SQL pattern
// (`$1::text IS NULL OR column = $1`), extended with `GROUP BY ... FILTER
// (WHERE status = 'completed')` for the success/failure split. Statuses
// are the canonical set in gateway_core::validation::ACTION_STATUS_VALUES;
// the write path rejects anything outside it before a row is ever stored.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gateway_core::{GatewayError, Result};
use gateway_storage::Database;
use serde::Serialize;

/// Maximum span a single `time_range` may request; a stand-in for a row
/// budget (the underlying multi-column index keeps any window this size
/// cheap to scan).
const MAX_TIME_RANGE_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub previous_window_success_rate: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownEntry {
    pub dimension_value: String,
    pub total_executions: i64,
    pub successful_executions: i64,
    pub failed_executions: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationResponse {
    pub time_range: String,
    pub total_executions: i64,
    pub successful_executions: i64,
    pub failed_executions: i64,
    pub success_rate: f64,
    pub confidence: &'static str,
    pub min_samples_met: bool,
    pub breakdown: Vec<BreakdownEntry>,
    pub trend: Option<Trend>,
}

fn success_rate(successful: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64
    }
}

/// Parses strings like `"7d"` / `"30d"` into a window `[start, now)`.
/// Rejects windows wider than `MAX_TIME_RANGE_DAYS`.
pub fn parse_time_range(time_range: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let days: i64 = time_range
        .strip_suffix('d')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| {
            GatewayError::validation(vec![gateway_core::validation::ValidationFailure::invalid_format(
                "time_range",
                "expected a value like '7d' or '30d'",
            )])
        })?;

    if days <= 0 || days > MAX_TIME_RANGE_DAYS {
        return Err(GatewayError::validation(vec![
            gateway_core::validation::ValidationFailure::invalid_format(
                "time_range",
                format!("must be between 1 and {MAX_TIME_RANGE_DAYS} days"),
            ),
        ]));
    }

    let now = Utc::now();
    Ok((now - ChronoDuration::days(days), now))
}

pub struct AggregationEngine {
    db: Database,
}

struct CoreTotals {
    total: i64,
    successful: i64,
    failed: i64,
}

impl AggregationEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn by_incident_type(
        &self,
        incident_type: &str,
        time_range: &str,
        min_samples: i64,
    ) -> Result<AggregationResponse> {
        let (start, end) = parse_time_range(time_range)?;

        let core = self
            .core_totals(Some(incident_type), None, None, None, start, end)
            .await?;
        let breakdown = self
            .breakdown_by("playbook_id", Some(incident_type), None, None, None, start, end)
            .await?;
        let trend = self
            .trend(Some(incident_type), None, None, None, start, end, &core)
            .await?;

        Ok(self.build_response(time_range, core, min_samples, breakdown, trend))
    }

    pub async fn by_playbook(
        &self,
        playbook_id: &str,
        playbook_version: Option<&str>,
        time_range: &str,
        min_samples: i64,
    ) -> Result<AggregationResponse> {
        let (start, end) = parse_time_range(time_range)?;

        let core = self
            .core_totals(None, Some(playbook_id), playbook_version, None, start, end)
            .await?;
        let breakdown = self
            .breakdown_by(
                "incident_type",
                None,
                Some(playbook_id),
                playbook_version,
                None,
                start,
                end,
            )
            .await?;
        let trend = self
            .trend(None, Some(playbook_id), playbook_version, None, start, end, &core)
            .await?;

        Ok(self.build_response(time_range, core, min_samples, breakdown, trend))
    }

    pub async fn multi_dimensional(
        &self,
        incident_type: Option<&str>,
        playbook_id: Option<&str>,
        action_type: Option<&str>,
        time_range: &str,
    ) -> Result<AggregationResponse> {
        let (start, end) = parse_time_range(time_range)?;

        let core = self
            .core_totals(incident_type, playbook_id, None, action_type, start, end)
            .await?;
        let trend = self
            .trend(incident_type, playbook_id, None, action_type, start, end, &core)
            .await?;

        // No single breakdown dimension makes sense once every dimension
        // is already pinned by the caller.
        Ok(self.build_response(time_range, core, 0, Vec::new(), trend))
    }

    fn build_response(
        &self,
        time_range: &str,
        core: CoreTotals,
        min_samples: i64,
        breakdown: Vec<BreakdownEntry>,
        trend: Option<Trend>,
    ) -> AggregationResponse {
        let rate = success_rate(core.successful, core.total);
        let min_samples_met = core.total >= min_samples;
        AggregationResponse {
            time_range: time_range.to_string(),
            total_executions: core.total,
            successful_executions: core.successful,
            failed_executions: core.failed,
            success_rate: rate,
            confidence: if min_samples_met { "high" } else { "low" },
            min_samples_met,
            breakdown,
            trend,
        }
    }

    async fn core_totals(
        &self,
        incident_type: Option<&str>,
        playbook_id: Option<&str>,
        playbook_version: Option<&str>,
        action_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CoreTotals> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS successful,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed
            FROM playbook_execution_traces
            WHERE ($1::text IS NULL OR incident_type = $1)
              AND ($2::text IS NULL OR playbook_id = $2)
              AND ($3::text IS NULL OR playbook_version = $3)
              AND ($4::text IS NULL OR action_type = $4)
              AND created_at >= $5
              AND created_at < $6
            "#,
        )
        .bind(incident_type)
        .bind(playbook_id)
        .bind(playbook_version)
        .bind(action_type)
        .bind(start)
        .bind(end)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| GatewayError::Internal(e.into()))?;

        Ok(CoreTotals {
            total: row.0,
            successful: row.1,
            failed: row.2,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn breakdown_by(
        &self,
        dimension_column: &str,
        incident_type: Option<&str>,
        playbook_id: Option<&str>,
        playbook_version: Option<&str>,
        action_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BreakdownEntry>> {
        // dimension_column is a compile-time-trusted literal ("playbook_id"
        // or "incident_type"), never derived from request input.
        let query = format!(
            r#"
            SELECT
                {dimension_column} AS dimension_value,
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS successful,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed
            FROM playbook_execution_traces
            WHERE ($1::text IS NULL OR incident_type = $1)
              AND ($2::text IS NULL OR playbook_id = $2)
              AND ($3::text IS NULL OR playbook_version = $3)
              AND ($4::text IS NULL OR action_type = $4)
              AND created_at >= $5
              AND created_at < $6
            GROUP BY {dimension_column}
            ORDER BY total DESC
            "#
        );

        let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(&query)
            .bind(incident_type)
            .bind(playbook_id)
            .bind(playbook_version)
            .bind(action_type)
            .bind(start)
            .bind(end)
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|(dimension_value, total, successful, failed)| BreakdownEntry {
                dimension_value,
                total_executions: total,
                successful_executions: successful,
                failed_executions: failed,
                success_rate: success_rate(successful, total),
            })
            .collect())
    }

    /// Compares the current window against the immediately preceding
    /// window of equal length. Returns `None` when there's no prior data
    /// to compare against (either window genuinely empty).
    async fn trend(
        &self,
        incident_type: Option<&str>,
        playbook_id: Option<&str>,
        playbook_version: Option<&str>,
        action_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        current: &CoreTotals,
    ) -> Result<Option<Trend>> {
        let window = end - start;
        let previous = self
            .core_totals(
                incident_type,
                playbook_id,
                playbook_version,
                action_type,
                start - window,
                start,
            )
            .await?;

        if previous.total == 0 || current.total == 0 {
            return Ok(None);
        }

        let previous_rate = success_rate(previous.successful, previous.total);
        let current_rate = success_rate(current.successful, current.total);
        let change_percent = (current_rate - previous_rate) * 100.0;

        const STABLE_EPSILON_PERCENT: f64 = 1.0;
        let direction = if change_percent > STABLE_EPSILON_PERCENT {
            TrendDirection::Improving
        } else if change_percent < -STABLE_EPSILON_PERCENT {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        Ok(Some(Trend {
            direction,
            previous_window_success_rate: previous_rate,
            change_percent,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_time_range() {
        let (start, end) = parse_time_range("7d").unwrap();
        assert!(end - start >= ChronoDuration::days(6));
    }

    #[test]
    fn rejects_unbounded_time_range() {
        assert!(parse_time_range("365d").is_err());
    }

    #[test]
    fn rejects_malformed_time_range() {
        assert!(parse_time_range("a week").is_err());
    }

    #[test]
    fn success_rate_handles_zero_total() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(8, 10), 0.8);
    }
}
