//! Pipeline configuration and its builder.
//!
//! Every configuration source (builder calls, `.pipe` files, CLI flags) goes
//! through [`PipelineConfigBuilder`], so bad configuration is rejected before
//! any file is opened.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::aggregator::AggregationSpec;
use crate::computation::Terminal;
use crate::error::{PipelineError, PipelineResult};
use crate::filter::{ConditionSet, FilterSpec, Literal};

/// Origin file plus the filter and aggregations to apply while copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    origin: PathBuf,
    filter: FilterSpec,
    aggregations: AggregationSpec,
}

impl PipelineConfig {
    /// Start configuring a copy of `origin`.
    ///
    /// Fails with [`PipelineError::SourceNotFound`] if `origin` does not exist.
    pub fn builder(origin: impl AsRef<Path>) -> PipelineResult<PipelineConfigBuilder> {
        PipelineConfigBuilder::new(origin)
    }

    /// Same as [`Self::builder`] with the origin given as directory and file name.
    pub fn builder_in(
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
    ) -> PipelineResult<PipelineConfigBuilder> {
        PipelineConfigBuilder::new(directory.as_ref().join(filename))
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn aggregations(&self) -> &AggregationSpec {
        &self.aggregations
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "origin: {}", self.origin.display())?;
        for (column, set) in self.filter.iter() {
            writeln!(f, "select {column} {set}")?;
        }
        for (column, terminal) in self.aggregations.iter() {
            writeln!(f, "compute {column} {terminal}")?;
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`]. Each call validates its arguments eagerly.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    origin: PathBuf,
    filter: FilterSpec,
    aggregations: AggregationSpec,
}

impl PipelineConfigBuilder {
    fn new(origin: impl AsRef<Path>) -> PipelineResult<Self> {
        let origin = origin.as_ref().to_path_buf();
        if !origin.exists() {
            return Err(PipelineError::SourceNotFound { path: origin });
        }
        Ok(Self {
            origin,
            filter: FilterSpec::default(),
            aggregations: AggregationSpec::default(),
        })
    }

    /// Require records to hold one of `values` in `column`.
    ///
    /// Repeated calls for the same column add values. All values for one
    /// column must be strings, or all longs.
    pub fn select_any<I, V>(mut self, column: impl Into<String>, values: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let column = column.into();
        let set = ConditionSet::from_literals(values.into_iter().map(Into::into).collect())
            .map_err(|e| match e {
                PipelineError::Configuration { message } => {
                    PipelineError::configuration(format!("column '{column}': {message}"))
                }
                other => other,
            })?;
        log::debug!("select_any {column} {set}");
        self.filter.add(column, set)?;
        Ok(self)
    }

    /// Compute `terminal` over `column`, replacing any earlier choice for it.
    pub fn compute(mut self, column: impl Into<String>, terminal: Terminal) -> Self {
        let column = column.into();
        if let Some(previous) = self.aggregations.set(column.clone(), terminal) {
            log::debug!("compute {column}: {terminal} replaces {previous}");
        }
        self
    }

    pub fn done(self) -> PipelineConfig {
        PipelineConfig {
            origin: self.origin,
            filter: self.filter,
            aggregations: self.aggregations,
        }
    }
}
