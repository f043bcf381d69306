use std::path::PathBuf;

use thiserror::Error;
use wingedge::{EdgeId, FaceId, TopologyError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while assembling features from a tiled library.
///
/// A query is aborted before any tile is read by [`Error::InvalidQuery`], by
/// criteria the feature table cannot satisfy, or by an unreadable theme
/// schema. Everything else is scoped to one (tile, level) unit and reported
/// next to the units that succeeded.
#[derive(Debug, Error)]
pub enum Error {
    /// A property criterion names a field the feature table does not have.
    #[error("unknown attribute `{attribute}` in {table}; valid attributes: {}", valid.join(", "))]
    UnknownAttribute {
        table: String,
        attribute: String,
        valid: Vec<String>,
    },

    /// A criterion value is absent from the description table for the attribute.
    #[error("unknown value `{value}` for {table}.{attribute}; valid values: {}", valid.join(", "))]
    UnknownValue {
        table: String,
        attribute: String,
        value: String,
        valid: Vec<String>,
    },

    /// A face boundary could not be traced.
    #[error("malformed topology in {face} at {edge}: {source}")]
    MalformedTopology {
        face: FaceId,
        edge: EdgeId,
        #[source]
        source: TopologyError,
    },

    /// The requested table does not exist for this tile or theme.
    #[error("table `{table}` not found in {}", path.display())]
    MissingTable { path: PathBuf, table: String },

    /// The table reader failed, or the table content is unusable.
    #[error("failed to read table `{table}` in {}: {source:#}", path.display())]
    Io {
        path: PathBuf,
        table: String,
        #[source]
        source: anyhow::Error,
    },

    /// The query parameters are unusable.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl Error {
    /// True for errors that mean "no data here" rather than a failure.
    pub fn is_missing(&self) -> bool {
        matches!(self, Error::MissingTable { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, table: impl Into<String>, source: anyhow::Error) -> Self {
        Error::Io { path: path.into(), table: table.into(), source }
    }
}

impl From<TopologyError> for Error {
    fn from(source: TopologyError) -> Self {
        Error::MalformedTopology { face: source.face(), edge: source.edge(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_attribute_lists_valid_names() {
        let err = Error::UnknownAttribute {
            table: "roadl.lft".into(),
            attribute: "surface".into(),
            valid: vec!["f_code".into(), "med".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown attribute `surface` in roadl.lft; valid attributes: f_code, med",
        );
    }

    #[test]
    fn topology_error_keeps_face_and_edge() {
        let err: Error = TopologyError::Unresolved { face: FaceId(4), edge: EdgeId(9) }.into();
        match err {
            Error::MalformedTopology { face, edge, .. } => {
                assert_eq!(face, FaceId(4));
                assert_eq!(edge, EdgeId(9));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_table_is_not_a_failure() {
        let err = Error::MissingTable { path: PathBuf::from("lib/trans"), table: "edg".into() };
        assert!(err.is_missing());
        assert!(!Error::InvalidQuery("x".into()).is_missing());
    }
}
