/// Decides whether entries recorded by a function are kept.
pub trait Predicate: Send + Sync {
    fn accepts(&self, function: &str) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accepts(&self, function: &str) -> bool {
        self(function)
    }
}

pub struct And<A, B>(A, B);

impl<A: Predicate, B: Predicate> Predicate for And<A, B> {
    fn accepts(&self, function: &str) -> bool {
        self.0.accepts(function) && self.1.accepts(function)
    }
}

pub struct Or<A, B>(A, B);

impl<A: Predicate, B: Predicate> Predicate for Or<A, B> {
    fn accepts(&self, function: &str) -> bool {
        self.0.accepts(function) || self.1.accepts(function)
    }
}

pub struct Not<A>(A);

impl<A: Predicate> Predicate for Not<A> {
    fn accepts(&self, function: &str) -> bool {
        !self.0.accepts(function)
    }
}

pub trait PredicateExt: Predicate + Sized {
    fn and<P: Predicate>(self, other: P) -> And<Self, P> {
        And(self, other)
    }

    fn or<P: Predicate>(self, other: P) -> Or<Self, P> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<P: Predicate> PredicateExt for P {}

/// Accepts exactly the listed function names.
#[derive(Debug, Clone)]
pub struct Only(Vec<String>);

impl Predicate for Only {
    fn accepts(&self, function: &str) -> bool {
        self.0.iter().any(|name| name == function)
    }
}

pub fn only<I, N>(names: I) -> Only
where
    I: IntoIterator<Item = N>,
    N: Into<String>,
{
    Only(names.into_iter().map(Into::into).collect())
}

/// Accepts everything except the listed function names.
pub fn except<I, N>(names: I) -> Not<Only>
where
    I: IntoIterator<Item = N>,
    N: Into<String>,
{
    only(names).not()
}
