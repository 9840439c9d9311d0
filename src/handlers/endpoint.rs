//! Endpoint identities and how their responses are shaped.

use std::fmt;

/// How an endpoint reports success and failure to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStyle {
    /// Engine body passed through; errors as a JSON error document.
    Json,
    /// Engine body passed through; errors as plain text.
    Plain,
    /// Empty 204 on success; errors as plain text.
    NoContent,
}

/// Every operation the front end dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Query,
    QueryRange,
    Tail,
    Series,
    SeriesCount,
    Labels,
    LabelsCount,
    LabelValues,
    StatusTsdb,
    ActiveQueries,
    Export,
    ExportNative,
    Federate,
    DeleteSeries,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Query => "query",
            Endpoint::QueryRange => "query_range",
            Endpoint::Tail => "tail",
            Endpoint::Series => "series",
            Endpoint::SeriesCount => "series_count",
            Endpoint::Labels => "labels",
            Endpoint::LabelsCount => "labels_count",
            Endpoint::LabelValues => "label_values",
            Endpoint::StatusTsdb => "status_tsdb",
            Endpoint::ActiveQueries => "active_queries",
            Endpoint::Export => "export",
            Endpoint::ExportNative => "export_native",
            Endpoint::Federate => "federate",
            Endpoint::DeleteSeries => "delete_series",
        }
    }

    pub fn style(self) -> ResponseStyle {
        match self {
            Endpoint::Export | Endpoint::ExportNative | Endpoint::Federate => ResponseStyle::Plain,
            Endpoint::DeleteSeries => ResponseStyle::NoContent,
            _ => ResponseStyle::Json,
        }
    }

    /// Browser-facing query endpoints allow any origin.
    pub fn allows_cors(self) -> bool {
        matches!(
            self,
            Endpoint::Query
                | Endpoint::QueryRange
                | Endpoint::Tail
                | Endpoint::Series
                | Endpoint::SeriesCount
                | Endpoint::Labels
                | Endpoint::LabelsCount
                | Endpoint::LabelValues
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
