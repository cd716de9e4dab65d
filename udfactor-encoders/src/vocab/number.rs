use std::cell::RefCell;
use std::hash::Hash;

use numberer::Numberer;
use serde_derive::{Deserialize, Serialize};

/// Number the symbols of a vocabulary.
#[allow(clippy::len_without_is_empty)]
pub trait Number<V>
where
    V: Clone + Eq + Hash,
{
    /// Construct a numberer for symbols.
    fn new(numberer: Numberer<V>) -> Self;

    /// Get the number of symbols.
    ///
    /// This includes reserved numerical representations that do
    /// not correspond to interned symbols.
    fn len(&self) -> usize;

    /// Get the number of a symbol.
    ///
    /// Mutable implementations of this trait must add the symbol if it
    /// is unknown and always return [`Option::Some`].
    fn number(&self, value: V) -> Option<usize>;

    /// Get the number of a symbol without ever adding it.
    fn lookup(&self, value: &V) -> Option<usize>;

    /// Get the symbol corresponding to a number.
    ///
    /// Returns [`Option::None`] if the number is unknown *or* a
    /// reserved number.
    fn value(&self, number: usize) -> Option<V>;
}

/// An immutable numberer.
///
/// Lookups of unknown symbols return [`Option::None`]. This numberer
/// can be shared between threads.
#[derive(Debug, Deserialize, Serialize)]
pub struct ImmutableNumberer<V>(Numberer<V>)
where
    V: Clone + Eq + Hash;

impl<V> Number<V> for ImmutableNumberer<V>
where
    V: Clone + Eq + Hash,
{
    fn new(numberer: Numberer<V>) -> Self {
        ImmutableNumberer(numberer)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn number(&self, value: V) -> Option<usize> {
        self.0.number(&value)
    }

    fn lookup(&self, value: &V) -> Option<usize> {
        self.0.number(value)
    }

    fn value(&self, number: usize) -> Option<V> {
        self.0.value(number).cloned()
    }
}

/// A mutable numberer using interior mutability.
///
/// Unknown symbols are added on lookup. Since the numberer is not
/// `Sync`, it is confined to a single writer.
#[derive(Debug, Deserialize, Serialize)]
pub struct MutableNumberer<V>(RefCell<Numberer<V>>)
where
    V: Clone + Eq + Hash;

impl<V> MutableNumberer<V>
where
    V: Clone + Eq + Hash,
{
    /// Stop numbering new symbols.
    pub fn into_immutable(self) -> ImmutableNumberer<V> {
        ImmutableNumberer(self.0.into_inner())
    }
}

impl<V> Number<V> for MutableNumberer<V>
where
    V: Clone + Eq + Hash,
{
    fn new(numberer: Numberer<V>) -> Self {
        MutableNumberer(RefCell::new(numberer))
    }

    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn number(&self, value: V) -> Option<usize> {
        Some(self.0.borrow_mut().add(value))
    }

    fn lookup(&self, value: &V) -> Option<usize> {
        self.0.borrow().number(value)
    }

    fn value(&self, number: usize) -> Option<V> {
        self.0.borrow().value(number).cloned()
    }
}
