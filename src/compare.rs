// Comparison orchestration: resolve both pitchers, fetch both event sets,
// gate, aggregate.
//
// The two per-pitcher pipelines are independent and run concurrently; the
// trend view needs both, so aggregation only starts after the join point.
// The gate is all-or-nothing: no partial comparison is ever produced.

use thiserror::Error;
use tracing::info;

use crate::aggregate::location::location_points;
use crate::aggregate::summary::{count_by_pitch_type, mean_velocity_by_pitch_type};
use crate::aggregate::trend::trend_over_time;
use crate::lookup::{IdentityService, LookupError, LookupOutcome, PlayerIdentity, PlayerQuery};
use crate::protocol::{ComparisonReport, PitcherReport};
use crate::statcast::{DateRange, FetchError, PitchData, PitchSource};

// ---------------------------------------------------------------------------
// Request-scoped context
// ---------------------------------------------------------------------------

/// Identity plus fetched events for one pitcher.
#[derive(Debug, Clone)]
pub struct PitcherData {
    pub identity: PlayerIdentity,
    pub data: PitchData,
}

/// Everything one comparison request resolved and fetched. Owned by the
/// single request that produced it; dropped when the reply has been sent.
#[derive(Debug, Clone)]
pub struct ComparisonContext {
    pub pitcher_a: PitcherData,
    pub pitcher_b: PitcherData,
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CompareError {
    /// One or both name pairs matched no identity. Lists every unresolved
    /// pitcher; the comparison never proceeds partially.
    #[error("no identity found for: {}", names.join(", "))]
    IdentityNotFound { names: Vec<String> },

    /// Identity resolved but zero pitch events in the window. Gates the
    /// comparison exactly like an unresolved identity.
    #[error("no pitch data in the requested window for: {}", names.join(", "))]
    EmptyDataSet { names: Vec<String> },

    #[error("identity lookup failed for {name}: {source}")]
    Lookup { name: String, source: LookupError },

    #[error("pitch data fetch failed for {name}: {source}")]
    Fetch { name: String, source: FetchError },
}

// ---------------------------------------------------------------------------
// Per-pitcher pipeline
// ---------------------------------------------------------------------------

/// Result of one pitcher's resolve→fetch pipeline before the gate.
enum PitcherOutcome {
    Resolved(PitcherData),
    NotFound { name: String },
}

async fn resolve_and_fetch<I, S>(
    identity: &I,
    source: &S,
    query: &PlayerQuery,
    range: &DateRange,
) -> Result<PitcherOutcome, CompareError>
where
    I: IdentityService + ?Sized,
    S: PitchSource + ?Sized,
{
    let name = query.display_name();

    let outcome = identity
        .resolve(query)
        .await
        .map_err(|source| CompareError::Lookup {
            name: name.clone(),
            source,
        })?;

    let identity = match outcome {
        LookupOutcome::Match(identity) => identity,
        LookupOutcome::NotFound => return Ok(PitcherOutcome::NotFound { name }),
    };

    let data = source
        .fetch(identity.id, range)
        .await
        .map_err(|source| CompareError::Fetch {
            name: name.clone(),
            source,
        })?;

    info!(
        pitcher = %identity.display_name,
        player_id = identity.id,
        events = data.events.len(),
        "fetched pitch events"
    );

    Ok(PitcherOutcome::Resolved(PitcherData { identity, data }))
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Run the full comparison pipeline for two pitchers over a date range.
///
/// The two resolve→fetch pipelines run concurrently. After the join point,
/// the gate applies in order: transport failures first, then unresolved
/// identities (all of them named), then empty data sets (all of them named).
pub async fn run_comparison<I, S>(
    identity: &I,
    source: &S,
    pitcher_a: &PlayerQuery,
    pitcher_b: &PlayerQuery,
    range: &DateRange,
) -> Result<ComparisonContext, CompareError>
where
    I: IdentityService + ?Sized,
    S: PitchSource + ?Sized,
{
    let (a, b) = tokio::join!(
        resolve_and_fetch(identity, source, pitcher_a, range),
        resolve_and_fetch(identity, source, pitcher_b, range),
    );
    let (a, b) = (a?, b?);

    let mut not_found = Vec::new();
    if let PitcherOutcome::NotFound { name } = &a {
        not_found.push(name.clone());
    }
    if let PitcherOutcome::NotFound { name } = &b {
        not_found.push(name.clone());
    }
    if !not_found.is_empty() {
        return Err(CompareError::IdentityNotFound { names: not_found });
    }

    let (PitcherOutcome::Resolved(a), PitcherOutcome::Resolved(b)) = (a, b) else {
        unreachable!("NotFound handled above");
    };

    let mut empty = Vec::new();
    if a.data.is_empty() {
        empty.push(a.identity.display_name.clone());
    }
    if b.data.is_empty() {
        empty.push(b.identity.display_name.clone());
    }
    if !empty.is_empty() {
        return Err(CompareError::EmptyDataSet { names: empty });
    }

    Ok(ComparisonContext {
        pitcher_a: a,
        pitcher_b: b,
    })
}

/// Aggregate a gated context into the report the page renders. Export paths
/// are attached by the app layer once the artifacts exist.
pub fn build_report(ctx: &ComparisonContext) -> ComparisonReport {
    ComparisonReport {
        pitcher_a: pitcher_report(&ctx.pitcher_a),
        pitcher_b: pitcher_report(&ctx.pitcher_b),
        trend: trend_over_time(
            &ctx.pitcher_a.identity.display_name,
            &ctx.pitcher_a.data.events,
            &ctx.pitcher_b.identity.display_name,
            &ctx.pitcher_b.data.events,
        ),
    }
}

fn pitcher_report(pitcher: &PitcherData) -> PitcherReport {
    PitcherReport {
        label: pitcher.identity.display_name.clone(),
        pitch_counts: count_by_pitch_type(&pitcher.data.events),
        velocity_by_type: mean_velocity_by_pitch_type(&pitcher.data.events),
        locations: location_points(&pitcher.data.events),
        export_path: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    // ---- In-process fakes ----

    struct FakeIdentity {
        ids: HashMap<String, u64>,
    }

    impl FakeIdentity {
        fn with(entries: &[(&str, u64)]) -> Self {
            Self {
                ids: entries
                    .iter()
                    .map(|(name, id)| (name.to_string(), *id))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl IdentityService for FakeIdentity {
        async fn resolve(&self, query: &PlayerQuery) -> Result<LookupOutcome, LookupError> {
            let name = query.display_name();
            Ok(match self.ids.get(&name) {
                Some(&id) => LookupOutcome::Match(PlayerIdentity {
                    id,
                    display_name: name,
                }),
                None => LookupOutcome::NotFound,
            })
        }
    }

    struct FailingIdentity;

    #[async_trait]
    impl IdentityService for FailingIdentity {
        async fn resolve(&self, _query: &PlayerQuery) -> Result<LookupOutcome, LookupError> {
            Err(LookupError::Transport {
                message: "connection refused".to_string(),
            })
        }
    }

    struct FakeSource {
        data: HashMap<u64, String>,
    }

    impl FakeSource {
        fn with(entries: &[(u64, &str)]) -> Self {
            Self {
                data: entries
                    .iter()
                    .map(|(id, csv)| (*id, csv.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PitchSource for FakeSource {
        async fn fetch(
            &self,
            player_id: u64,
            _range: &DateRange,
        ) -> Result<PitchData, FetchError> {
            let csv = self
                .data
                .get(&player_id)
                .cloned()
                .unwrap_or_else(|| HEADER.to_string());
            PitchData::from_csv(csv).map_err(|e| FetchError::Decode {
                message: e.to_string(),
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PitchSource for FailingSource {
        async fn fetch(
            &self,
            _player_id: u64,
            _range: &DateRange,
        ) -> Result<PitchData, FetchError> {
            Err(FetchError::Status { status: 503 })
        }
    }

    // ---- Fixtures ----

    const HEADER: &str = "pitch_type,game_date,release_speed,plate_x,plate_z\n";

    fn csv_a() -> String {
        format!(
            "{HEADER}\
             FF,2025-03-28,95.0,-0.12,2.51\n\
             FF,2025-03-28,96.0,-0.08,2.62\n\
             SL,2025-03-29,85.0,0.44,1.90\n"
        )
    }

    fn csv_b() -> String {
        format!(
            "{HEADER}\
             FC,2025-03-30,92.0,0.10,2.20\n\
             FC,2025-03-31,93.0,0.05,2.30\n"
        )
    }

    fn range() -> DateRange {
        DateRange {
            start: "2025-03-28".parse().unwrap(),
            end: "2025-04-01".parse().unwrap(),
        }
    }

    fn queries() -> (PlayerQuery, PlayerQuery) {
        (
            PlayerQuery::new("Shohei", "Ohtani"),
            PlayerQuery::new("Gerrit", "Cole"),
        )
    }

    // ---- Happy path ----

    #[tokio::test]
    async fn two_resolved_pitchers_produce_a_full_report() {
        let identity =
            FakeIdentity::with(&[("Shohei Ohtani", 660271), ("Gerrit Cole", 543037)]);
        let source = FakeSource::with(&[(660271, &csv_a()), (543037, &csv_b())]);
        let (qa, qb) = queries();

        let ctx = run_comparison(&identity, &source, &qa, &qb, &range())
            .await
            .unwrap();

        assert_eq!(ctx.pitcher_a.identity.id, 660271);
        assert_eq!(ctx.pitcher_a.data.events.len(), 3);
        assert_eq!(ctx.pitcher_b.data.events.len(), 2);

        let report = build_report(&ctx);
        assert_eq!(report.pitcher_a.label, "Shohei Ohtani");
        assert_eq!(report.pitcher_a.pitch_counts.len(), 2);
        assert_eq!(report.pitcher_a.pitch_counts[0].count, 2);
        assert_eq!(
            report.pitcher_a.velocity_by_type[0].mean_release_speed,
            Some(95.5)
        );
        assert_eq!(report.pitcher_a.locations.len(), 3);
        assert!(report.pitcher_a.export_path.is_none());

        // Trend spans both pitchers: A has 2 distinct dates, B has 2,
        // disjoint.
        assert_eq!(report.trend.len(), 4);
        assert_eq!(report.trend[0].pitcher, "Shohei Ohtani");
        assert_eq!(report.trend[3].pitcher, "Gerrit Cole");
    }

    // ---- Gate: identity not found ----

    #[tokio::test]
    async fn one_unresolved_pitcher_gates_the_whole_comparison() {
        let identity = FakeIdentity::with(&[("Shohei Ohtani", 660271)]);
        let source = FakeSource::with(&[(660271, &csv_a())]);
        let (qa, qb) = queries();

        let err = run_comparison(&identity, &source, &qa, &qb, &range())
            .await
            .unwrap_err();

        match err {
            CompareError::IdentityNotFound { names } => {
                assert_eq!(names, vec!["Gerrit Cole".to_string()]);
            }
            other => panic!("expected IdentityNotFound, got: {other}"),
        }
    }

    #[tokio::test]
    async fn both_unresolved_pitchers_are_named() {
        let identity = FakeIdentity::with(&[]);
        let source = FakeSource::with(&[]);
        let (qa, qb) = queries();

        let err = run_comparison(&identity, &source, &qa, &qb, &range())
            .await
            .unwrap_err();

        match err {
            CompareError::IdentityNotFound { names } => {
                assert_eq!(
                    names,
                    vec!["Shohei Ohtani".to_string(), "Gerrit Cole".to_string()]
                );
            }
            other => panic!("expected IdentityNotFound, got: {other}"),
        }
    }

    // ---- Gate: empty data set ----

    #[tokio::test]
    async fn resolved_identity_with_no_events_gates_like_not_found() {
        let identity =
            FakeIdentity::with(&[("Shohei Ohtani", 660271), ("Gerrit Cole", 543037)]);
        // Cole resolves but has no rows in the window.
        let source = FakeSource::with(&[(660271, &csv_a())]);
        let (qa, qb) = queries();

        let err = run_comparison(&identity, &source, &qa, &qb, &range())
            .await
            .unwrap_err();

        match err {
            CompareError::EmptyDataSet { names } => {
                assert_eq!(names, vec!["Gerrit Cole".to_string()]);
            }
            other => panic!("expected EmptyDataSet, got: {other}"),
        }
    }

    #[tokio::test]
    async fn unresolved_identity_reported_before_empty_data() {
        // A resolves with empty data, B does not resolve at all. The gate
        // reports the identity failure.
        let identity = FakeIdentity::with(&[("Shohei Ohtani", 660271)]);
        let source = FakeSource::with(&[]);
        let (qa, qb) = queries();

        let err = run_comparison(&identity, &source, &qa, &qb, &range())
            .await
            .unwrap_err();

        assert!(
            matches!(err, CompareError::IdentityNotFound { .. }),
            "got: {err}"
        );
    }

    // ---- Transport failures surface distinctly ----

    #[tokio::test]
    async fn lookup_transport_failure_is_not_reported_as_not_found() {
        let source = FakeSource::with(&[]);
        let (qa, qb) = queries();

        let err = run_comparison(&FailingIdentity, &source, &qa, &qb, &range())
            .await
            .unwrap_err();

        match err {
            CompareError::Lookup { name, source } => {
                assert_eq!(name, "Shohei Ohtani");
                assert!(matches!(source, LookupError::Transport { .. }));
            }
            other => panic!("expected Lookup transport error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_failure_names_the_affected_pitcher() {
        let identity =
            FakeIdentity::with(&[("Shohei Ohtani", 660271), ("Gerrit Cole", 543037)]);
        let (qa, qb) = queries();

        let err = run_comparison(&identity, &FailingSource, &qa, &qb, &range())
            .await
            .unwrap_err();

        match err {
            CompareError::Fetch { name, source } => {
                assert_eq!(name, "Shohei Ohtani");
                assert!(matches!(source, FetchError::Status { status: 503 }));
            }
            other => panic!("expected Fetch error, got: {other}"),
        }
    }
}
