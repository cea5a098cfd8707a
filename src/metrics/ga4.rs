//! GA4 Data API Metric Source
//!
//! Pulls one site's daily metrics via the GA4 Data API `runReport` method:
//! one aggregate report (views, users, sessions, engagement rate) followed
//! by the traffic-source, landing-page, and country breakdowns. Every row
//! carries the run's period label and a fixed label prefix so the
//! reconciler can key it to a stable grid row.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::MetricSource;
use crate::config::{AnalyticsConfig, GoogleConfig};
use crate::constants::{labels, limits};
use crate::types::{MetricRow, MetricValue, PeriodLabel, PulseError, Result, Site};

const DEFAULT_API_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";

/// GA4 Data API client with secure token handling
pub struct Ga4MetricSource {
    /// Access token stored securely - never exposed in logs or debug output
    token: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for Ga4MetricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ga4MetricSource")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Ga4MetricSource {
    pub fn new(analytics: &AnalyticsConfig, google: &GoogleConfig) -> Result<Self> {
        let token = google.resolve_token().ok_or_else(|| {
            PulseError::MissingCredentials(
                "Google access token not found. Set GOOGLE_ACCESS_TOKEN or google.access_token"
                    .to_string(),
            )
        })?;

        let api_base = analytics
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(analytics.timeout_secs))
            .build()
            .map_err(|e| PulseError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            token: SecretString::from(token),
            api_base,
            client,
        })
    }

    async fn run_report(&self, site: &Site, request: &RunReportRequest) -> Result<Vec<ReportRow>> {
        let url = format!(
            "{}/properties/{}:runReport",
            self.api_base, site.property_id
        );

        debug!(property = %site.property_id, "sending runReport request");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(request)
            .send()
            .await
            .map_err(|e| PulseError::fetch(&site.name, format!("runReport failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PulseError::fetch(
                &site.name,
                format!("GA4 API error ({}): {}", status, body),
            ));
        }

        let body: RunReportResponse = response.json().await.map_err(|e| {
            PulseError::fetch(&site.name, format!("failed to parse GA4 response: {}", e))
        })?;

        Ok(body.rows)
    }

    /// Aggregate rows: views, users, sessions, engagement rate.
    async fn fetch_totals(&self, site: &Site, period: &PeriodLabel) -> Result<Vec<MetricRow>> {
        let request = RunReportRequest::totals(period);
        let rows = self.run_report(site, &request).await?;

        let Some(row) = rows.first() else {
            return Ok(Vec::new());
        };

        let metric = |i: usize| -> u64 {
            row.metric_values
                .get(i)
                .and_then(|v| v.value.parse::<u64>().ok())
                .unwrap_or(0)
        };

        let engagement = row
            .metric_values
            .get(3)
            .map(|v| format_engagement_rate(&v.value))
            .unwrap_or_default();

        Ok(vec![
            MetricRow::count(labels::TOTAL_VIEWS, period, metric(0)),
            MetricRow::count(labels::TOTAL_USERS, period, metric(1)),
            MetricRow::count(labels::TOTAL_SESSIONS, period, metric(2)),
            MetricRow::new(
                labels::ENGAGEMENT_RATE,
                period.clone(),
                MetricValue::Percent(engagement),
            ),
        ])
    }

    /// One breakdown report: `prefix + dimension value` rows, highest first.
    async fn fetch_breakdown(
        &self,
        site: &Site,
        period: &PeriodLabel,
        dimension: &str,
        metric: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<MetricRow>> {
        let request = RunReportRequest::breakdown(period, dimension, metric, limit);
        let rows = self.run_report(site, &request).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let key = row.dimension_values.first()?.value.as_str();
                let value = row
                    .metric_values
                    .first()
                    .and_then(|v| v.value.parse::<u64>().ok())?;
                Some(MetricRow::count(format!("{}{}", prefix, key), period, value))
            })
            .collect())
    }
}

#[async_trait]
impl MetricSource for Ga4MetricSource {
    async fn fetch(&self, site: &Site, period: &PeriodLabel) -> Result<Vec<MetricRow>> {
        let mut rows = self.fetch_totals(site, period).await?;
        if rows.is_empty() {
            // No aggregate data for the period: treated as a fetch failure
            // upstream, so skip the breakdown calls entirely.
            warn!(site = %site.name, period = %period, "GA4 returned no aggregate rows");
            return Ok(rows);
        }

        rows.extend(
            self.fetch_breakdown(
                site,
                period,
                "sessionSource",
                "sessions",
                labels::SOURCE_PREFIX,
                limits::MAX_SOURCES,
            )
            .await?,
        );
        rows.extend(
            self.fetch_breakdown(
                site,
                period,
                "landingPage",
                "screenPageViews",
                labels::LANDING_PREFIX,
                limits::MAX_LANDING_PAGES,
            )
            .await?,
        );
        rows.extend(
            self.fetch_breakdown(
                site,
                period,
                "country",
                "totalUsers",
                labels::COUNTRY_PREFIX,
                limits::MAX_COUNTRIES,
            )
            .await?,
        );

        debug!(site = %site.name, rows = rows.len(), "assembled metric batch");
        Ok(rows)
    }

    fn name(&self) -> &str {
        "ga4"
    }

    async fn health_check(&self, site: &Site) -> Result<bool> {
        let period = PeriodLabel::new("yesterday");
        let request = RunReportRequest::totals(&period);

        match self.run_report(site, &request).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(site = %site.name, "GA4 health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// GA4 returns engagementRate as a fraction string ("0.5432"); the grid
/// stores it as a display percentage ("54.3%").
fn format_engagement_rate(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(fraction) => format!("{:.1}%", fraction * 100.0),
        Err(_) => format!("{}%", raw),
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportRequest {
    date_ranges: Vec<DateRange>,
    metrics: Vec<MetricSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<DimensionSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_bys: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<String>,
}

impl RunReportRequest {
    fn totals(period: &PeriodLabel) -> Self {
        Self {
            date_ranges: vec![DateRange::single(period)],
            metrics: ["screenPageViews", "totalUsers", "sessions", "engagementRate"]
                .into_iter()
                .map(MetricSpec::new)
                .collect(),
            dimensions: Vec::new(),
            order_bys: Vec::new(),
            limit: None,
        }
    }

    fn breakdown(period: &PeriodLabel, dimension: &str, metric: &str, limit: usize) -> Self {
        Self {
            date_ranges: vec![DateRange::single(period)],
            metrics: vec![MetricSpec::new(metric)],
            dimensions: vec![DimensionSpec {
                name: dimension.to_string(),
            }],
            order_bys: vec![OrderBy::metric_desc(metric)],
            limit: Some(limit.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRange {
    start_date: String,
    end_date: String,
}

impl DateRange {
    fn single(period: &PeriodLabel) -> Self {
        Self {
            start_date: period.to_string(),
            end_date: period.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MetricSpec {
    name: String,
}

impl MetricSpec {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DimensionSpec {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBy {
    metric: MetricOrderBy,
    desc: bool,
}

impl OrderBy {
    fn metric_desc(name: &str) -> Self {
        Self {
            metric: MetricOrderBy {
                metric_name: name.to_string(),
            },
            desc: true,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricOrderBy {
    metric_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RunReportResponse {
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ReportRow {
    dimension_values: Vec<ReportValue>,
    metric_values: Vec<ReportValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ReportValue {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_engagement_rate() {
        assert_eq!(format_engagement_rate("0.5432"), "54.3%");
        assert_eq!(format_engagement_rate("1"), "100.0%");
        assert_eq!(format_engagement_rate("n/a"), "n/a%");
    }

    #[test]
    fn test_totals_request_shape() {
        let request = RunReportRequest::totals(&PeriodLabel::new("2024-01-01"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["dateRanges"][0]["startDate"], "2024-01-01");
        assert_eq!(json["metrics"][0]["name"], "screenPageViews");
        assert!(json.get("dimensions").is_none());
        assert!(json.get("limit").is_none());
    }

    #[test]
    fn test_breakdown_request_shape() {
        let request = RunReportRequest::breakdown(
            &PeriodLabel::new("2024-01-01"),
            "sessionSource",
            "sessions",
            5,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["dimensions"][0]["name"], "sessionSource");
        assert_eq!(json["limit"], "5");
        assert_eq!(json["orderBys"][0]["metric"]["metricName"], "sessions");
        assert_eq!(json["orderBys"][0]["desc"], true);
    }

    #[test]
    fn test_response_tolerates_missing_rows() {
        let body: RunReportResponse = serde_json::from_str("{}").unwrap();
        assert!(body.rows.is_empty());
    }
}
