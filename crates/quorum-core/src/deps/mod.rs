//! Dependency values and structural equality.
//!
//! A `Deps` snapshot is the list of values a memoized callback closes over.
//! Two snapshots are equivalent iff they have the same length and every
//! positional pair is `deep_equal`. Comparison is by value all the way down:
//! sequences compare in order, maps compare as unordered key sets, integers
//! and floats compare exactly (`1 == 1.0`, `NaN == NaN`, but never through a
//! lossy cast), and shared cells are followed through their contents with
//! cycle detection.

mod capture;

pub use capture::CaptureError;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use serde::Serialize;
use smallvec::SmallVec;

#[derive(Debug, Clone, Default)]
pub enum Dep {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Str(Rc<str>),
    Seq(Vec<Dep>),
    Map(BTreeMap<String, Dep>),
    /// Interior-mutable node; may participate in reference cycles.
    Shared(Rc<RefCell<Dep>>),
    /// A value that could not be captured. Equal to nothing, itself included,
    /// so a snapshot holding one always counts as changed.
    Unknown,
}

impl Dep {
    /// Captures any serializable value structurally. Numbers keep their
    /// exact value, non-finite floats included.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Dep {
        Dep::try_of(value).unwrap_or_else(|e| {
            log::warn!("Dep::of: {e}; the dependency will always count as changed");
            Dep::Unknown
        })
    }

    pub fn try_of<T: Serialize + ?Sized>(value: &T) -> Result<Dep, CaptureError> {
        value.serialize(capture::Capture)
    }

    pub fn shared(value: impl Into<Dep>) -> Dep {
        Dep::Shared(Rc::new(RefCell::new(value.into())))
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

type CellPtr = *const RefCell<Dep>;

/// Structural equality. Terminates on cyclic `Shared` graphs: a pair of cells
/// already under comparison is assumed equal.
pub fn deep_equal(a: &Dep, b: &Dep) -> bool {
    let mut seen = HashSet::new();
    eq_inner(a, b, &mut seen)
}

fn eq_inner(a: &Dep, b: &Dep, seen: &mut HashSet<(CellPtr, CellPtr)>) -> bool {
    match (a, b) {
        (Dep::Shared(x), Dep::Shared(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            if !seen.insert((Rc::as_ptr(x), Rc::as_ptr(y))) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            eq_inner(&x, &y, seen)
        }
        (Dep::Shared(x), other) => eq_inner(&x.borrow(), other, seen),
        (other, Dep::Shared(y)) => eq_inner(other, &y.borrow(), seen),
        (Dep::Null, Dep::Null) => true,
        (Dep::Bool(x), Dep::Bool(y)) => x == y,
        (Dep::Int(x), Dep::Int(y)) => x == y,
        (Dep::UInt(x), Dep::UInt(y)) => x == y,
        (Dep::Int(x), Dep::UInt(y)) | (Dep::UInt(y), Dep::Int(x)) => {
            u64::try_from(*x).is_ok_and(|x| x == *y)
        }
        (Dep::Float(x), Dep::Float(y)) => float_eq(*x, *y),
        (Dep::Int(x), Dep::Float(y)) | (Dep::Float(y), Dep::Int(x)) => {
            int_float_eq(i128::from(*x), *y)
        }
        (Dep::UInt(x), Dep::Float(y)) | (Dep::Float(y), Dep::UInt(x)) => {
            int_float_eq(i128::from(*x), *y)
        }
        (Dep::Str(x), Dep::Str(y)) => x == y,
        (Dep::Seq(xs), Dep::Seq(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| eq_inner(x, y, seen))
        }
        (Dep::Map(xs), Dep::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| eq_inner(x, y, seen)))
        }
        _ => false,
    }
}

fn float_eq(x: f64, y: f64) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

/// True only when `f` is integral and converts to `i` without rounding.
fn int_float_eq(i: i128, f: f64) -> bool {
    // 2^127; every integral float below it converts to i128 exactly
    const LIMIT: f64 = i128::MAX as f64;
    f.fract() == 0.0 && f.abs() < LIMIT && f as i128 == i
}

/// Ordered dependency snapshot.
#[derive(Debug, Clone, Default)]
pub struct Deps(SmallVec<[Dep; 4]>);

impl Deps {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn push(&mut self, dep: impl Into<Dep>) {
        self.0.push(dep.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dep> {
        self.0.iter()
    }

    /// Same length and every position deeply equal.
    pub fn equivalent(&self, other: &Deps) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }
}

impl PartialEq for Deps {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent(other)
    }
}

impl FromIterator<Dep> for Deps {
    fn from_iter<I: IntoIterator<Item = Dep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds a `Deps` snapshot from anything convertible into `Dep`.
///
/// ```rust
/// use quorum_core::{deps, Dep};
///
/// let page = 2;
/// let d = deps![page, "title", Dep::of(&vec![1, 2])];
/// assert_eq!(d.len(), 3);
/// ```
#[macro_export]
macro_rules! deps {
    () => { $crate::deps::Deps::new() };
    ($($dep:expr),+ $(,)?) => {{
        let mut d = $crate::deps::Deps::new();
        $( d.push($dep); )+
        d
    }};
}

impl From<serde_json::Value> for Dep {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Dep::Null,
            Value::Bool(b) => Dep::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Dep::Int(i),
                (None, Some(u)) => Dep::UInt(u),
                (None, None) => Dep::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Dep::Str(s.into()),
            Value::Array(xs) => Dep::Seq(xs.into_iter().map(Dep::from).collect()),
            Value::Object(m) => Dep::Map(m.into_iter().map(|(k, v)| (k, Dep::from(v))).collect()),
        }
    }
}

impl From<bool> for Dep {
    fn from(b: bool) -> Self {
        Dep::Bool(b)
    }
}

macro_rules! int_dep {
    ($($t:ty),*) => {$(
        impl From<$t> for Dep {
            fn from(i: $t) -> Self {
                Dep::Int(i as i64)
            }
        }
    )*};
}
int_dep!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Dep {
    fn from(i: u64) -> Self {
        i64::try_from(i).map_or(Dep::UInt(i), Dep::Int)
    }
}

impl From<usize> for Dep {
    fn from(i: usize) -> Self {
        Dep::from(i as u64)
    }
}

impl From<f64> for Dep {
    fn from(f: f64) -> Self {
        Dep::Float(f)
    }
}

impl From<f32> for Dep {
    fn from(f: f32) -> Self {
        Dep::Float(f as f64)
    }
}

impl From<&str> for Dep {
    fn from(s: &str) -> Self {
        Dep::Str(s.into())
    }
}

impl From<String> for Dep {
    fn from(s: String) -> Self {
        Dep::Str(s.into())
    }
}

impl From<&String> for Dep {
    fn from(s: &String) -> Self {
        Dep::Str(s.as_str().into())
    }
}

impl<T: Into<Dep>> From<Option<T>> for Dep {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Dep::Null)
    }
}

impl<T: Into<Dep>> From<Vec<T>> for Dep {
    fn from(xs: Vec<T>) -> Self {
        Dep::Seq(xs.into_iter().map(Into::into).collect())
    }
}

impl From<Rc<RefCell<Dep>>> for Dep {
    fn from(cell: Rc<RefCell<Dep>>) -> Self {
        Dep::Shared(cell)
    }
}
