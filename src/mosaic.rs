//! Region queries across the tiles of a library.
//!
//! A query is split into (tile, level) units. Units share nothing but the
//! caller's [`Session`], so they run on the rayon pool; their outputs are
//! merged afterwards in unit order, which keeps the result independent of
//! scheduling.

use std::{
    collections::BTreeMap,
    sync::{atomic::{AtomicBool, Ordering}, Arc},
};

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assemble::{Assembly, FeatureAssembler};
use crate::config::{MosaicConfig, StitchMode};
use crate::error::{Error, Result};
use crate::feature::{FeatureRecord, Signature, TopologyLevel};
use crate::library::{FeatureClass, Library, Theme};
use crate::resolve::Criterion;
use crate::table::{Session, TableReader};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// What to extract: a region, a theme, levels and an optional filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// (south, north) in degrees.
    pub latlim: (f64, f64),
    /// (west, east) in degrees; west > east crosses the antimeridian.
    pub lonlim: (f64, f64),
    pub theme: String,
    pub levels: Vec<TopologyLevel>,
    pub feature_table: Option<String>,
    pub criteria: Option<Vec<Criterion>>,
}

impl Query {
    /// A whole-globe query on `theme` with no levels yet.
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            latlim: (-90.0, 90.0),
            lonlim: (-180.0, 180.0),
            theme: theme.into(),
            levels: Vec::new(),
            feature_table: None,
            criteria: None,
        }
    }

    pub fn region(mut self, latlim: (f64, f64), lonlim: (f64, f64)) -> Self {
        self.latlim = latlim;
        self.lonlim = lonlim;
        self
    }

    pub fn level(mut self, level: TopologyLevel) -> Self {
        self.levels.push(level);
        self
    }

    pub fn levels(mut self, levels: impl IntoIterator<Item = TopologyLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    pub fn feature_table(mut self, table: impl Into<String>) -> Self {
        self.feature_table = Some(table.into());
        self
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.get_or_insert_with(Vec::new).push(criterion);
        self
    }

    /// Check the parameters; every problem is [`Error::InvalidQuery`].
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidQuery(msg));

        let (south, north) = self.latlim;
        if !(south.is_finite() && north.is_finite()) || south > north || south < -90.0 || north > 90.0 {
            return invalid(format!("latlim ({south}, {north}) must satisfy -90 <= south <= north <= 90"));
        }
        let (west, east) = self.lonlim;
        if !(west.is_finite() && east.is_finite()) || !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return invalid(format!("lonlim ({west}, {east}) must lie within [-180, 180]"));
        }
        if self.levels.is_empty() {
            return invalid("no topology level requested".to_string());
        }
        Theme::new(&self.theme)?;

        let has_criteria = self.criteria.as_ref().is_some_and(|c| !c.is_empty());
        match &self.feature_table {
            None if has_criteria => invalid("property criteria need a feature table".to_string()),
            None => Ok(()),
            Some(table) => match FeatureClass::from_table(table) {
                None => invalid(format!("`{table}` is not a face, line, point or text feature table")),
                Some(class) if !self.levels.contains(&class.level) => {
                    invalid(format!("`{table}` is a {} table but only {:?} was requested", class.level, self.levels))
                }
                Some(_) => Ok(()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit {
    pub tile: i64,
    pub level: TopologyLevel,
}

/// An error scoped to one unit.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: Unit,
    pub error: Error,
}

/// Everything a query produced.
#[derive(Debug, Default)]
pub struct MosaicResult {
    pub features: BTreeMap<TopologyLevel, Vec<FeatureRecord>>,
    /// Units that failed as a whole.
    pub failures: Vec<UnitFailure>,
    /// Entities dropped from otherwise successful units.
    pub faults: Vec<UnitFailure>,
    /// Units not run because the query was cancelled.
    pub skipped: Vec<Unit>,
}

impl MosaicResult {
    /// Records at `level`; empty if none.
    pub fn records(&self, level: TopologyLevel) -> &[FeatureRecord] {
        self.features.get(&level).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total number of records over all levels.
    pub fn len(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// True when every unit ran and nothing was dropped.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.faults.is_empty() && self.skipped.is_empty()
    }
}

/// Shared flag for stopping a running query between units.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }

    #[inline] pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

enum Outcome {
    Done(Assembly),
    Failed(Error),
    Skipped,
}

// ---------------------------------------------------------------------------
// Stitcher
// ---------------------------------------------------------------------------

/// Runs queries against one library.
pub struct MosaicStitcher<'a, R> {
    session: &'a Session<R>,
    library: &'a Library,
    config: MosaicConfig,
}

impl<'a, R: TableReader> MosaicStitcher<'a, R> {
    pub fn new(session: &'a Session<R>, library: &'a Library) -> Self {
        Self { session, library, config: MosaicConfig::default() }
    }

    pub fn with_config(mut self, config: MosaicConfig) -> Self {
        self.config = config;
        self
    }

    #[inline] pub fn config(&self) -> &MosaicConfig { &self.config }

    pub fn query(&self, query: &Query) -> Result<MosaicResult> {
        self.query_with_cancel(query, &CancelToken::new())
    }

    /// Run `query`, checking `cancel` before each unit.
    ///
    /// An invalid query, criteria that do not fit the feature table, or an
    /// unreadable theme schema fail the whole query. Failures of single
    /// units are reported in the result.
    pub fn query_with_cancel(&self, query: &Query, cancel: &CancelToken) -> Result<MosaicResult> {
        query.validate()?;
        let theme = Theme::discover(self.session, self.library, &query.theme)?;
        if let (Some(table), Some(criteria)) = (&query.feature_table, &query.criteria) {
            self.check_criteria(&theme, table, criteria)?;
        }

        let mut levels = query.levels.clone();
        levels.sort();
        levels.dedup();

        let tiles = self.library.tiles().select(query.latlim, query.lonlim);
        let units: Vec<Unit> = tiles.iter()
            .flat_map(|&tile| levels.iter().map(move |&level| Unit { tile, level }))
            .collect();
        debug!("query on {}: {} tile(s), {} unit(s)", theme.name(), tiles.len(), units.len());

        let assembler = FeatureAssembler::new(self.session, self.library, &self.config);
        let run = |unit: &Unit| -> Outcome {
            if cancel.is_cancelled() {
                return Outcome::Skipped;
            }
            match assembler.assemble(
                unit.tile,
                &theme,
                unit.level,
                query.feature_table.as_deref(),
                query.criteria.as_deref(),
            ) {
                Ok(assembly) => Outcome::Done(assembly),
                Err(e) if e.is_missing() => {
                    debug!("tile {} {}: {e}", unit.tile, unit.level);
                    Outcome::Done(Assembly::default())
                }
                Err(e) => {
                    warn!("tile {} {} failed: {e}", unit.tile, unit.level);
                    Outcome::Failed(e)
                }
            }
        };

        let outcomes: Vec<Outcome> = if self.config.parallel {
            units.par_iter().map(run).collect()
        } else {
            units.iter().map(run).collect()
        };

        let result = self.merge(units.into_iter().zip(outcomes));
        info!(
            "query on {}: {} record(s) from {} tile(s), {} failed unit(s), {} skipped",
            theme.name(), result.len(), tiles.len(), result.failures.len(), result.skipped.len(),
        );
        Ok(result)
    }

    /// Resolve `criteria` against the feature table once, so that unknown
    /// attributes and values fail the query instead of every unit.
    fn check_criteria(&self, theme: &Theme, table: &str, criteria: &[Criterion]) -> Result<()> {
        if criteria.is_empty() {
            return Ok(());
        }
        let dir = self.library.theme_dir(theme);
        if let Some(table) = self.session.try_table(&dir, table)? {
            let resolver = self.session.resolver(&dir)?;
            resolver.match_predicate(&table, &[], criteria, self.config.filter_mode)?;
        }
        Ok(())
    }

    /// Combine unit outputs in unit order.
    fn merge(&self, outcomes: impl IntoIterator<Item = (Unit, Outcome)>) -> MosaicResult {
        let mut result = MosaicResult::default();
        let mut groups: AHashMap<(TopologyLevel, String, Signature), usize> = AHashMap::new();

        for (unit, outcome) in outcomes {
            let assembly = match outcome {
                Outcome::Done(assembly) => assembly,
                Outcome::Failed(error) => {
                    result.failures.push(UnitFailure { unit, error });
                    continue;
                }
                Outcome::Skipped => {
                    result.skipped.push(unit);
                    continue;
                }
            };

            result.faults.extend(assembly.faults.into_iter().map(|error| UnitFailure { unit, error }));
            let records = result.features.entry(unit.level).or_default();
            for record in assembly.records {
                let mergeable = self.config.stitch_mode == StitchMode::MergeBySignature
                    && record.level != TopologyLevel::Text;
                if !mergeable {
                    records.push(record);
                    continue;
                }

                let key = (record.level, record.feature_table.to_ascii_lowercase(), record.signature.clone());
                match groups.get(&key) {
                    Some(&i) => records[i].absorb(record),
                    None => {
                        groups.insert(key, records.len());
                        records.push(record);
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Query {
        Query::new("trans").level(TopologyLevel::Edge)
    }

    #[test]
    fn valid_queries_pass() {
        assert!(query().validate().is_ok());
        assert!(query().region((0.0, 10.0), (170.0, -170.0)).validate().is_ok());
        assert!(query().feature_table("roadl.lft").criterion(Criterion::new("med", 1)).validate().is_ok());
    }

    #[test]
    fn invalid_queries_are_rejected() {
        let bad = [
            query().region((10.0, 0.0), (0.0, 1.0)),
            query().region((-95.0, 0.0), (0.0, 1.0)),
            query().region((0.0, 1.0), (0.0, 181.0)),
            query().region((0.0, f64::NAN), (0.0, 1.0)),
            Query::new("trans"),
            Query::new("../trans").level(TopologyLevel::Edge),
            query().criterion(Criterion::new("med", 1)),
            query().feature_table("roadl.xyz"),
            query().feature_table("builtupa.aft"),
        ];
        for q in bad {
            assert!(matches!(q.validate(), Err(Error::InvalidQuery(_))), "{q:?}");
        }
    }

    #[test]
    fn empty_criteria_need_no_feature_table() {
        let mut q = query();
        q.criteria = Some(Vec::new());
        assert!(q.validate().is_ok());
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
