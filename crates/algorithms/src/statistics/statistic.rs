//! Statistic names and dispatch

use std::fmt;
use std::str::FromStr;

use gridstat_core::{Error, Result};

use super::reducer::{
    Extremum, ExtremumReducer, FrequencyReducer, FrequencyStat, MedianReducer, MomentReducer,
    MomentStat, ProductReducer, ReduceOptions, reduce_chunks, reduce_values,
};

/// A named reduction over a set of cell values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Statistic {
    Asm,
    Count,
    Entropy,
    Max,
    Mean,
    Median,
    Min,
    Mode,
    Std,
    Sum,
    Unique,
    Var,
    /// Product of the values; windowed and band-wise statistics only
    Prod,
}

/// The operation a statistic is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Zonal,
    Aggregate,
    Local,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Zonal => "zonal statistics",
            Operation::Aggregate => "aggregate",
            Operation::Local => "local statistics",
        })
    }
}

impl Statistic {
    /// Statistics accepted by zonal statistics, in name order
    pub const ZONAL: [Statistic; 12] = [
        Statistic::Asm,
        Statistic::Count,
        Statistic::Entropy,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Min,
        Statistic::Mode,
        Statistic::Std,
        Statistic::Sum,
        Statistic::Unique,
        Statistic::Var,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::Asm => "asm",
            Statistic::Count => "count",
            Statistic::Entropy => "entropy",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Min => "min",
            Statistic::Mode => "mode",
            Statistic::Std => "std",
            Statistic::Sum => "sum",
            Statistic::Unique => "unique",
            Statistic::Var => "var",
            Statistic::Prod => "prod",
        }
    }

    /// Whether the statistic is computed from merged frequency tables
    pub fn is_frequency(self) -> bool {
        matches!(
            self,
            Statistic::Mode | Statistic::Entropy | Statistic::Asm | Statistic::Unique
        )
    }

    pub fn supports(self, op: Operation) -> bool {
        match self {
            Statistic::Prod => op != Operation::Zonal,
            _ => true,
        }
    }

    /// `self`, or an error if `op` does not accept it
    pub fn check(self, op: Operation) -> Result<Self> {
        if self.supports(op) {
            Ok(self)
        } else {
            Err(Error::invalid_parameter(
                "statistic",
                self,
                format!("not supported by {op}"),
            ))
        }
    }

    /// Parse a list of names, rejecting unknown names and an empty list
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Statistic>> {
        if names.is_empty() {
            return Err(Error::EmptyStatistics);
        }
        names.iter().map(|n| n.as_ref().parse()).collect()
    }

    /// Reduce chunks of values, merging partials through a tree
    pub fn reduce_chunks(self, chunks: &[&[f64]], options: &ReduceOptions) -> f64 {
        match self {
            Statistic::Asm => reduce_chunks(&FrequencyReducer(FrequencyStat::Asm), chunks, options),
            Statistic::Entropy => {
                reduce_chunks(&FrequencyReducer(FrequencyStat::Entropy), chunks, options)
            }
            Statistic::Mode => reduce_chunks(&FrequencyReducer(FrequencyStat::Mode), chunks, options),
            Statistic::Unique => {
                reduce_chunks(&FrequencyReducer(FrequencyStat::Unique), chunks, options)
            }
            Statistic::Count => reduce_chunks(&MomentReducer(MomentStat::Count), chunks, options),
            Statistic::Sum => reduce_chunks(&MomentReducer(MomentStat::Sum), chunks, options),
            Statistic::Mean => reduce_chunks(&MomentReducer(MomentStat::Mean), chunks, options),
            Statistic::Var => reduce_chunks(&MomentReducer(MomentStat::Var), chunks, options),
            Statistic::Std => reduce_chunks(&MomentReducer(MomentStat::Std), chunks, options),
            Statistic::Min => reduce_chunks(&ExtremumReducer(Extremum::Min), chunks, options),
            Statistic::Max => reduce_chunks(&ExtremumReducer(Extremum::Max), chunks, options),
            Statistic::Median => reduce_chunks(&MedianReducer, chunks, options),
            Statistic::Prod => reduce_chunks(&ProductReducer, chunks, options),
        }
    }

    /// Reduce one slice of values (NaN = null)
    pub fn reduce(self, values: &[f64]) -> f64 {
        match self {
            Statistic::Asm => reduce_values(&FrequencyReducer(FrequencyStat::Asm), values),
            Statistic::Entropy => reduce_values(&FrequencyReducer(FrequencyStat::Entropy), values),
            Statistic::Mode => reduce_values(&FrequencyReducer(FrequencyStat::Mode), values),
            Statistic::Unique => reduce_values(&FrequencyReducer(FrequencyStat::Unique), values),
            Statistic::Count => reduce_values(&MomentReducer(MomentStat::Count), values),
            Statistic::Sum => reduce_values(&MomentReducer(MomentStat::Sum), values),
            Statistic::Mean => reduce_values(&MomentReducer(MomentStat::Mean), values),
            Statistic::Var => reduce_values(&MomentReducer(MomentStat::Var), values),
            Statistic::Std => reduce_values(&MomentReducer(MomentStat::Std), values),
            Statistic::Min => reduce_values(&ExtremumReducer(Extremum::Min), values),
            Statistic::Max => reduce_values(&ExtremumReducer(Extremum::Max), values),
            Statistic::Median => reduce_values(&MedianReducer, values),
            Statistic::Prod => reduce_values(&ProductReducer, values),
        }
    }

    /// Value reported for a zone that covers no cells at all
    pub fn absent_value(self) -> f64 {
        match self {
            Statistic::Count => 0.0,
            _ => f64::NAN,
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asm" => Ok(Statistic::Asm),
            "count" => Ok(Statistic::Count),
            "entropy" => Ok(Statistic::Entropy),
            "max" => Ok(Statistic::Max),
            "mean" => Ok(Statistic::Mean),
            "median" => Ok(Statistic::Median),
            "min" => Ok(Statistic::Min),
            "mode" => Ok(Statistic::Mode),
            "std" => Ok(Statistic::Std),
            "sum" => Ok(Statistic::Sum),
            "unique" => Ok(Statistic::Unique),
            "var" => Ok(Statistic::Var),
            "prod" => Ok(Statistic::Prod),
            _ => Err(Error::UnknownStatistic(s.to_string())),
        }
    }
}
