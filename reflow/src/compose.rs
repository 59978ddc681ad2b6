use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};

use crate::{ComposeError, DynSource, Source};

// Heterogeneous positional combine. Every member emission re-reads the
// current value of all members (accessors included) and recombines; the
// output withholds while any member's current value is still absent.
macro_rules! impl_combine {
    ($name:ident, $func:ident, $($S:ident $field:ident),+) => {
        pub struct $name<$($S: Source),+> {
            $($field: Arc<$S>,)+
        }

        impl<$($S: Source),+> Clone for $name<$($S),+> {
            fn clone(&self) -> Self {
                $name {
                    $($field: self.$field.clone(),)+
                }
            }
        }

        /// Combine independently-changing sources into one positional tuple.
        pub fn $func<$($S: Source),+>($($field: $S),+) -> $name<$($S),+> {
            $name {
                $($field: Arc::new($field),)+
            }
        }

        impl<$($S: Source),+> Source for $name<$($S),+>
        where
            $($S::Item: PartialEq,)+
        {
            type Item = ($($S::Item,)+);

            fn current(&self) -> Option<Self::Item> {
                Some(($(self.$field.current()?,)+))
            }

            fn changes(&self) -> BoxStream<'static, Self::Item> {
                let ticks = stream::select_all(vec![
                    $(self.$field.changes().map(|_| ()).boxed(),)+
                ]);
                $(let $field = self.$field.clone();)+
                distinct(
                    ticks.filter_map(move |_| {
                        let combined = Some(($(
                            match $field.current() {
                                Some(value) => value,
                                None => return futures::future::ready(None),
                            },
                        )+));
                        futures::future::ready(combined)
                    }),
                )
            }
        }
    };
}

impl_combine!(Combine2, combine2, A a, B b);
impl_combine!(Combine3, combine3, A a, B b, C c);
impl_combine!(Combine4, combine4, A a, B b, C c, D d);

// Several members emit their current value at subscription time, which would
// recombine the same output once per already-seeded member. Suppressing
// consecutive equal combined outputs keeps one recombination per actual
// change; members are always re-read first, so any moved accessor value
// still gets through.
fn distinct<S, T>(stream: S) -> BoxStream<'static, T>
where
    S: futures::Stream<Item = T> + Send + 'static,
    T: Clone + PartialEq + Send + 'static,
{
    let mut last: Option<T> = None;
    stream
        .filter(move |item| {
            let fresh = last.as_ref() != Some(item);
            if fresh {
                last = Some(item.clone());
            }
            futures::future::ready(fresh)
        })
        .boxed()
}

fn tick_streams<T: Clone + Send + 'static>(
    sources: &[DynSource<T>],
) -> Vec<BoxStream<'static, ()>> {
    sources
        .iter()
        .map(|source| source.changes().map(|_| ()).boxed())
        .collect()
}

/// Homogeneous positional combine: the output is a `Vec` aligned with the
/// input order.
pub struct CombineVec<T: Clone + Send + 'static> {
    sources: Vec<DynSource<T>>,
}

impl<T: Clone + Send + 'static> Clone for CombineVec<T> {
    fn clone(&self) -> Self {
        CombineVec {
            sources: self.sources.clone(),
        }
    }
}

pub fn combine_vec<T: Clone + Send + 'static>(
    sources: Vec<DynSource<T>>,
) -> Result<CombineVec<T>, ComposeError> {
    if sources.is_empty() {
        return Err(ComposeError::NoSources);
    }
    Ok(CombineVec { sources })
}

impl<T: Clone + PartialEq + Send + 'static> Source for CombineVec<T> {
    type Item = Vec<T>;

    fn current(&self) -> Option<Vec<T>> {
        self.sources.iter().map(|source| source.current()).collect()
    }

    fn changes(&self) -> BoxStream<'static, Vec<T>> {
        let sources = self.sources.clone();
        distinct(
            stream::select_all(tick_streams(&self.sources)).filter_map(move |_| {
                let combined: Option<Vec<T>> =
                    sources.iter().map(|source| source.current()).collect();
                futures::future::ready(combined)
            }),
        )
    }
}

/// Keyed combine: the output is a map with the configured keys and each
/// source's latest value.
pub struct CombineMap<T: Clone + Send + 'static> {
    entries: Vec<(String, DynSource<T>)>,
}

impl<T: Clone + Send + 'static> Clone for CombineMap<T> {
    fn clone(&self) -> Self {
        CombineMap {
            entries: self.entries.clone(),
        }
    }
}

pub fn combine_map<T: Clone + Send + 'static>(
    entries: Vec<(impl Into<String>, DynSource<T>)>,
) -> Result<CombineMap<T>, ComposeError> {
    let entries: Vec<(String, DynSource<T>)> = entries
        .into_iter()
        .map(|(key, source)| (key.into(), source))
        .collect();
    if entries.is_empty() {
        return Err(ComposeError::NoSources);
    }
    let mut seen = std::collections::BTreeSet::new();
    for (key, _) in &entries {
        if !seen.insert(key.clone()) {
            return Err(ComposeError::DuplicateKey(key.clone()));
        }
    }
    Ok(CombineMap { entries })
}

impl<T: Clone + PartialEq + Send + 'static> Source for CombineMap<T> {
    type Item = BTreeMap<String, T>;

    fn current(&self) -> Option<BTreeMap<String, T>> {
        self.entries
            .iter()
            .map(|(key, source)| source.current().map(|value| (key.clone(), value)))
            .collect()
    }

    fn changes(&self) -> BoxStream<'static, BTreeMap<String, T>> {
        let entries = self.entries.clone();
        let ticks: Vec<BoxStream<'static, ()>> = self
            .entries
            .iter()
            .map(|(_, source)| source.changes().map(|_| ()).boxed())
            .collect();
        distinct(stream::select_all(ticks).filter_map(move |_| {
            let combined: Option<BTreeMap<String, T>> = entries
                .iter()
                .map(|(key, source)| source.current().map(|value| (key.clone(), value)))
                .collect();
            futures::future::ready(combined)
        }))
    }
}

/// Merge: emits the latest value from whichever source just changed, not a
/// tuple. There is no single combined current value, so `current()` is `None`
/// and consumers react to emissions only.
pub struct MergeSources<T: Clone + Send + 'static> {
    sources: Vec<DynSource<T>>,
}

impl<T: Clone + Send + 'static> Clone for MergeSources<T> {
    fn clone(&self) -> Self {
        MergeSources {
            sources: self.sources.clone(),
        }
    }
}

pub fn merge<T: Clone + Send + 'static>(
    sources: Vec<DynSource<T>>,
) -> Result<MergeSources<T>, ComposeError> {
    if sources.is_empty() {
        return Err(ComposeError::NoSources);
    }
    Ok(MergeSources { sources })
}

impl<T: Clone + Send + 'static> Source for MergeSources<T> {
    type Item = T;

    fn current(&self) -> Option<T> {
        None
    }

    fn changes(&self) -> BoxStream<'static, T> {
        stream::select_all(self.sources.iter().map(|source| source.changes())).boxed()
    }
}
