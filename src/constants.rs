//! Global Constants
//!
//! Centralized constants for labels, grid tuning, and network defaults.
//! All magic numbers should be defined here with documentation.

/// Item-label constants for the daily report rows.
///
/// The labels are the stable row keys in every site's grid; changing one
/// would orphan the existing row and start a new time series, so treat
/// these as frozen.
pub mod labels {
    /// Total page views for the whole site.
    pub const TOTAL_VIEWS: &str = "★全体PV";

    /// Total unique users.
    pub const TOTAL_USERS: &str = "★全体UU";

    /// Total sessions.
    pub const TOTAL_SESSIONS: &str = "★セッション数";

    /// Engagement rate, stored as a percentage string (e.g. "54.3%").
    pub const ENGAGEMENT_RATE: &str = "★エンゲージメント率";

    /// Prefix for per-traffic-source session rows.
    pub const SOURCE_PREFIX: &str = "流入: ";

    /// Prefix for per-landing-page view rows.
    pub const LANDING_PREFIX: &str = "LP: ";

    /// Prefix for per-country user rows.
    pub const COUNTRY_PREFIX: &str = "国: ";

    /// Row label for the generated narrative summary.
    pub const NARRATIVE: &str = "✎AI所感";
}

/// Grid layout and tuning.
pub mod grid {
    /// Caption seeded into cell (1,1) when a site's worksheet is created.
    pub const CAPTION: &str = "項目 / 日付";

    /// Minimum number of slots a fresh column is allocated with.
    ///
    /// Pre-allocates room for rows not yet known; purely a tuning knob,
    /// never a cap (the column grows past it on demand).
    pub const MIN_COLUMN_ROWS: usize = 100;

    /// 1-based grid row where item labels start (row 1 is the header).
    pub const FIRST_LABEL_ROW: usize = 2;

    /// 1-based grid column where period columns start (column 1 holds labels).
    pub const FIRST_PERIOD_COLUMN: usize = 2;
}

/// Breakdown row limits for one report batch.
pub mod limits {
    /// Traffic-source rows per batch.
    pub const MAX_SOURCES: usize = 5;

    /// Landing-page rows per batch.
    pub const MAX_LANDING_PAGES: usize = 10;

    /// Country rows per batch.
    pub const MAX_COUNTRIES: usize = 5;
}

/// Narrative generation.
pub mod narrative {
    /// Target summary length in characters, passed to the prompt.
    pub const TARGET_CHARS: usize = 300;

    /// Visible marker written into the row when generation fails.
    pub const FALLBACK_TEXT: &str = "（コメント生成に失敗しました）";

    /// Timeout for the narrative call, seconds. The only remote call with
    /// its own deadline; everything else uses the client-level timeout.
    pub const TIMEOUT_SECS: u64 = 60;
}

/// Network defaults.
pub mod network {
    /// Default HTTP client timeout, seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}
