//! Static route table.
//!
//! # Design Decisions
//! - Built once at startup, read-only afterwards (no locking)
//! - Two pattern kinds: exact suffix, and leading literal + variable
//!   segment + trailing literal
//! - Routes are evaluated in table order and the first structural match
//!   wins; the table must stay unambiguous, which [`RouteTable::validate`]
//!   checks and the tests enforce
//! - Per-route request/error counters live next to the route

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::handlers::Endpoint;
use crate::observability::metrics;

/// Top-level path namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Read-only queries.
    Select,
    /// Mutating deletes.
    Delete,
}

impl Family {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "select" => Some(Family::Select),
            "delete" => Some(Family::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Select => "select",
            Family::Delete => "delete",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suffix pattern of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(&'static str),
    /// `{leading}<param>{trailing}`; the parameter is non-empty and holds no `/`.
    Parametric {
        leading: &'static str,
        trailing: &'static str,
    },
}

/// Result of matching a pattern against a suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch<'a> {
    pub param: Option<&'a str>,
}

impl RoutePattern {
    pub fn matches<'a>(&self, suffix: &'a str) -> Option<PatternMatch<'a>> {
        match *self {
            RoutePattern::Exact(literal) => {
                (suffix == literal).then_some(PatternMatch { param: None })
            }
            RoutePattern::Parametric { leading, trailing } => {
                let param = suffix.strip_prefix(leading)?.strip_suffix(trailing)?;
                if param.is_empty() || param.contains('/') {
                    return None;
                }
                Some(PatternMatch { param: Some(param) })
            }
        }
    }
}

/// A single routable endpoint.
#[derive(Debug)]
pub struct Route {
    pub family: Family,
    pub pattern: RoutePattern,
    pub endpoint: Endpoint,
    /// Metric label, e.g. `/select/{}/loki/api/v1/query`.
    pub metric_path: &'static str,
    requests: AtomicU64,
    errors: AtomicU64,
}

impl Route {
    pub fn new(
        family: Family,
        pattern: RoutePattern,
        endpoint: Endpoint,
        metric_path: &'static str,
    ) -> Self {
        Self {
            family,
            pattern,
            endpoint,
            metric_path,
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        metrics::record_request(self.metric_path);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::record_request_error(self.metric_path);
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Two routes in one family that can claim the same suffix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("routes {first} and {second} overlap in family {family}")]
pub struct AmbiguousRoutes {
    pub family: Family,
    pub first: &'static str,
    pub second: &'static str,
}

#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

const LABEL_VALUES_LEADING: &str = "loki/api/v1/label/";
const LABEL_VALUES_TRAILING: &str = "/values";

impl RouteTable {
    /// Wrap a list of routes, checking that no two of them overlap.
    pub fn new(routes: Vec<Route>) -> Result<Self, AmbiguousRoutes> {
        let table = Self { routes };
        table.validate()?;
        Ok(table)
    }

    /// The front end's fixed route set.
    pub fn standard() -> Self {
        use Endpoint::*;
        use Family::*;
        use RoutePattern::*;

        let routes = vec![
            Route::new(
                Select,
                Parametric {
                    leading: LABEL_VALUES_LEADING,
                    trailing: LABEL_VALUES_TRAILING,
                },
                LabelValues,
                "/select/{}/loki/api/v1/label/{}/values",
            ),
            Route::new(Select, Exact("loki/api/v1/query"), Query, "/select/{}/loki/api/v1/query"),
            Route::new(
                Select,
                Exact("loki/api/v1/query_range"),
                QueryRange,
                "/select/{}/loki/api/v1/query_range",
            ),
            Route::new(Select, Exact("loki/api/v1/tail"), Tail, "/select/{}/loki/api/v1/tail"),
            Route::new(Select, Exact("loki/api/v1/series"), Series, "/select/{}/loki/api/v1/series"),
            Route::new(
                Select,
                Exact("loki/api/v1/series/count"),
                SeriesCount,
                "/select/{}/loki/api/v1/series/count",
            ),
            Route::new(Select, Exact("loki/api/v1/label"), Labels, "/select/{}/loki/api/v1/label"),
            Route::new(Select, Exact("loki/api/v1/labels"), Labels, "/select/{}/loki/api/v1/labels"),
            Route::new(
                Select,
                Exact("loki/api/v1/label/count"),
                LabelsCount,
                "/select/{}/loki/api/v1/label/count",
            ),
            Route::new(
                Select,
                Exact("loki/api/v1/labels/count"),
                LabelsCount,
                "/select/{}/loki/api/v1/labels/count",
            ),
            Route::new(
                Select,
                Exact("loki/api/v1/status/tsdb"),
                StatusTsdb,
                "/select/{}/loki/api/v1/status/tsdb",
            ),
            Route::new(
                Select,
                Exact("loki/api/v1/status/active_queries"),
                ActiveQueries,
                "/select/{}/loki/api/v1/status/active_queries",
            ),
            Route::new(Select, Exact("loki/api/v1/export"), Export, "/select/{}/loki/api/v1/export"),
            Route::new(
                Select,
                Exact("loki/api/v1/export/native"),
                ExportNative,
                "/select/{}/loki/api/v1/export/native",
            ),
            Route::new(Select, Exact("loki/federate"), Federate, "/select/{}/loki/federate"),
            Route::new(
                Delete,
                Exact("prometheus/api/v1/admin/tsdb/delete_series"),
                DeleteSeries,
                "/delete/{}/prometheus/api/v1/admin/tsdb/delete_series",
            ),
        ];

        let table = Self { routes };
        debug_assert_eq!(table.validate(), Ok(()));
        table
    }

    /// First route of `family` whose pattern matches `suffix`.
    pub fn lookup<'a>(
        &self,
        family: Family,
        suffix: &'a str,
    ) -> Option<(&Route, PatternMatch<'a>)> {
        self.routes
            .iter()
            .filter(|route| route.family == family)
            .find_map(|route| route.pattern.matches(suffix).map(|m| (route, m)))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Check that no two routes in a family can match the same suffix.
    pub fn validate(&self) -> Result<(), AmbiguousRoutes> {
        for (i, a) in self.routes.iter().enumerate() {
            for b in &self.routes[i + 1..] {
                if a.family == b.family && overlaps(&a.pattern, &b.pattern) {
                    return Err(AmbiguousRoutes {
                        family: a.family,
                        first: a.metric_path,
                        second: b.metric_path,
                    });
                }
            }
        }
        Ok(())
    }
}

fn overlaps(a: &RoutePattern, b: &RoutePattern) -> bool {
    match (a, b) {
        (RoutePattern::Exact(x), RoutePattern::Exact(y)) => x == y,
        (RoutePattern::Exact(x), p @ RoutePattern::Parametric { .. })
        | (p @ RoutePattern::Parametric { .. }, RoutePattern::Exact(x)) => p.matches(x).is_some(),
        (
            RoutePattern::Parametric {
                leading: l1,
                trailing: t1,
            },
            RoutePattern::Parametric {
                leading: l2,
                trailing: t2,
            },
        ) => {
            // Conservative: literals that nest can share a suffix.
            (l1.starts_with(l2) || l2.starts_with(l1)) && (t1.ends_with(t2) || t2.ends_with(t1))
        }
    }
}
