use crate::{
    config::MalformedPolicy, error::BoxError, shuffle::group_by_key, Error, Group, KeyValue,
    Result, RunConfig,
};
use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use itertools::Itertools;
use std::thread;
use tracing::{debug, trace, warn};

type MapFn<I, K, V> =
    Box<dyn Fn(I) -> std::result::Result<Vec<KeyValue<K, V>>, BoxError> + Send + Sync>;
type ReduceFn<K, V, O> = Box<dyn Fn(&K, Vec<V>) -> Vec<O> + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Records dropped under [`MalformedPolicy::Skip`].
    pub skipped: usize,
}

/// One or more map/group/reduce steps run back to back.
pub trait Stage {
    type Input;
    type Output;

    fn name(&self) -> &str;

    fn execute(
        &self,
        input: Vec<Self::Input>,
        config: &RunConfig,
        stats: &mut StageStats,
    ) -> Result<Vec<Self::Output>>;

    /// Feeds the output of `self` into `next`.
    fn then<S>(self, next: S) -> Chain<Self, S>
    where
        Self: Sized,
        S: Stage<Input = Self::Output>,
    {
        Chain {
            name: format!("{}>{}", self.name(), next.name()),
            first: self,
            second: next,
        }
    }
}

/// A mapper and a reducer with the grouping routine between them.
pub struct Step<I, K, V, O> {
    name: String,
    mapper: MapFn<I, K, V>,
    reducer: ReduceFn<K, V, O>,
}

impl<I, K, V, O> Step<I, K, V, O>
where
    I: 'static,
    K: 'static,
    V: 'static,
    O: 'static,
{
    pub fn new<M, E, R>(name: impl Into<String>, mapper: M, reducer: R) -> Self
    where
        M: Fn(I) -> std::result::Result<Vec<KeyValue<K, V>>, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
        R: Fn(&K, Vec<V>) -> Vec<O> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            mapper: Box::new(move |record: I| {
                mapper(record).map_err(|err| -> BoxError { Box::new(err) })
            }),
            reducer: Box::new(reducer),
        }
    }
}

impl<K, V, O> Step<Vec<u8>, K, V, O>
where
    K: 'static,
    V: 'static,
    O: 'static,
{
    /// A step fed raw input lines. Each line is decoded as UTF-8 before it
    /// reaches `mapper`; a line that fails to decode is a malformed record.
    pub fn from_lines<M, E, R>(name: impl Into<String>, mapper: M, reducer: R) -> Self
    where
        M: Fn(String) -> std::result::Result<Vec<KeyValue<K, V>>, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
        R: Fn(&K, Vec<V>) -> Vec<O> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            mapper: Box::new(move |raw: Vec<u8>| -> std::result::Result<_, BoxError> {
                let line = String::from_utf8(raw)?;
                mapper(line).map_err(|err| -> BoxError { Box::new(err) })
            }),
            reducer: Box::new(reducer),
        }
    }
}

impl<K, V, O> Step<KeyValue<K, V>, K, V, O>
where
    K: 'static,
    V: 'static,
    O: 'static,
{
    /// A step whose input is already keyed; the mapper passes pairs through.
    pub fn reduce_only<R>(name: impl Into<String>, reducer: R) -> Self
    where
        R: Fn(&K, Vec<V>) -> Vec<O> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            mapper: Box::new(|kv: KeyValue<K, V>| -> std::result::Result<_, BoxError> {
                Ok(vec![kv])
            }),
            reducer: Box::new(reducer),
        }
    }
}

impl<I, K, V, O> Step<I, K, V, O>
where
    K: Ord + Clone + Send,
    V: Send,
    O: Send + Sync,
{
    fn map_all(
        &self,
        input: Vec<I>,
        policy: MalformedPolicy,
        stats: &mut StageStats,
    ) -> Result<Vec<KeyValue<K, V>>> {
        let mut intermediate = Vec::with_capacity(input.len());
        for (index, record) in input.into_iter().enumerate() {
            match (self.mapper)(record) {
                Ok(mut kva) => intermediate.append(&mut kva),
                Err(source) if policy == MalformedPolicy::Fail => {
                    return Err(Error::Map {
                        stage: self.name.clone(),
                        record: index + 1,
                        source,
                    });
                }
                Err(source) => {
                    warn!(stage = %self.name, record = index + 1, error = %source, "skipping malformed record");
                    stats.skipped += 1;
                }
            }
        }
        Ok(intermediate)
    }

    fn reduce_sequential(&self, groups: Vec<Group<K, V>>) -> Vec<O> {
        groups
            .into_iter()
            .flat_map(|group| (self.reducer)(&group.key, group.values))
            .collect()
    }

    /// Workers drain a shared queue of groups; outputs are put back in group
    /// order so the result matches [`Step::reduce_sequential`].
    fn reduce_parallel(&self, groups: Vec<Group<K, V>>, workers: usize) -> Vec<O> {
        let total = groups.len();
        let pending = SegQueue::new();
        groups
            .into_iter()
            .enumerate()
            .for_each(|task| pending.push(task));

        let finished: DashMap<usize, Vec<O>> = DashMap::with_capacity(total);
        thread::scope(|scope| {
            for worker in 0..workers.min(total) {
                let (pending, finished) = (&pending, &finished);
                scope.spawn(move || {
                    let mut reduced = 0usize;
                    while let Some((index, group)) = pending.pop() {
                        finished.insert(index, (self.reducer)(&group.key, group.values));
                        reduced += 1;
                    }
                    trace!(stage = %self.name, worker, reduced, "reduce worker exit");
                });
            }
        });

        let mut finished = finished.into_iter().collect_vec();
        finished.sort_unstable_by_key(|(index, _)| *index);
        finished.into_iter().flat_map(|(_, output)| output).collect()
    }
}

impl<I, K, V, O> Stage for Step<I, K, V, O>
where
    K: Ord + Clone + Send,
    V: Send,
    O: Send + Sync,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, input: Vec<I>, config: &RunConfig, stats: &mut StageStats) -> Result<Vec<O>> {
        let records = input.len();
        let intermediate = self.map_all(input, config.on_malformed, stats)?;
        let groups = group_by_key(intermediate);
        debug!(stage = %self.name, records, groups = groups.len(), "map done");

        let output = if config.reduce_workers > 1 && groups.len() > 1 {
            self.reduce_parallel(groups, config.reduce_workers)
        } else {
            self.reduce_sequential(groups)
        };
        debug!(stage = %self.name, emitted = output.len(), "reduce done");
        Ok(output)
    }
}

pub struct Chain<A, B> {
    name: String,
    first: A,
    second: B,
}

impl<A, B> Stage for Chain<A, B>
where
    A: Stage,
    B: Stage<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &self,
        input: Vec<A::Input>,
        config: &RunConfig,
        stats: &mut StageStats,
    ) -> Result<Vec<B::Output>> {
        let intermediate = self.first.execute(input, config, stats)?;
        debug!(
            from = self.first.name(),
            to = self.second.name(),
            records = intermediate.len(),
            "hand off"
        );
        self.second.execute(intermediate, config, stats)
    }
}
