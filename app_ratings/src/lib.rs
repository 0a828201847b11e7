//! Counts ratings per movie and lists movies from least to most rated.
//!
//! Input records are `userID\tmovieID\trating\ttimestamp`. The job runs in
//! two steps: count ratings per movie, then regroup by count so movies come
//! out in ascending count order.

use common::{KeyValue, RunConfig, RunSummary, Stage, Step};
use serde::{Serialize, Serializer};
use std::{
    fmt,
    io::{BufRead, Write},
    num::ParseIntError,
    str::FromStr,
};

/// Minimum number of digits a count is printed with.
pub const COUNT_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected 4 tab-separated fields, found {found}")]
    FieldCount { found: usize },
}

/// One line of the ratings dataset. Fields are kept as raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating<'a> {
    pub user_id: &'a str,
    pub movie_id: &'a str,
    pub rating: &'a str,
    pub timestamp: &'a str,
}

impl<'a> Rating<'a> {
    pub fn parse(line: &'a str) -> Result<Self, ParseError> {
        match line.split('\t').collect::<Vec<_>>().as_slice() {
            &[user_id, movie_id, rating, timestamp] => Ok(Rating {
                user_id,
                movie_id,
                rating,
                timestamp,
            }),
            fields => Err(ParseError::FieldCount {
                found: fields.len(),
            }),
        }
    }
}

/// A rating count that prints zero-padded to [`COUNT_WIDTH`] digits but
/// orders by value, so counts past `99999` still sort after smaller ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaddedCount(pub u64);

impl fmt::Display for PaddedCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = COUNT_WIDTH)
    }
}

impl FromStr for PaddedCount {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(PaddedCount)
    }
}

impl Serialize for PaddedCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn mapper_get_movies(line: String) -> Result<Vec<KeyValue<String, u64>>, ParseError> {
    let rating = Rating::parse(&line)?;
    Ok(vec![KeyValue::new(rating.movie_id.to_string(), 1)])
}

/// Emits `(count, movie)`: the swap makes the next step group by count.
pub fn reducer_count_ratings(movie_id: &String, values: Vec<u64>) -> Vec<KeyValue<PaddedCount, String>> {
    let count = values.into_iter().sum();
    vec![KeyValue::new(PaddedCount(count), movie_id.clone())]
}

pub fn reducer_sort(count: &PaddedCount, movies: Vec<String>) -> Vec<KeyValue<String, PaddedCount>> {
    movies
        .into_iter()
        .map(|movie| KeyValue::new(movie, *count))
        .collect()
}

pub fn pipeline() -> impl Stage<Input = Vec<u8>, Output = KeyValue<String, PaddedCount>> {
    Step::from_lines("count_ratings", mapper_get_movies, reducer_count_ratings)
        .then(Step::reduce_only("sort", reducer_sort))
}

pub fn run<R: BufRead, W: Write>(input: R, output: W, config: &RunConfig) -> common::Result<RunSummary> {
    common::run(&pipeline(), input, output, config)
}
