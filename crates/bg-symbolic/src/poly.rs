//! Sparse multivariate polynomials with exact rational coefficients.
//!
//! The indeterminates are [`Atom`]s: plain symbols, function applications
//! such as `exp(x)`, or powers whose exponent is not an integer. Anything that
//! is not polynomial in the atoms is hidden inside one.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::expr::Expr;
use crate::symbol::Symbol;

/// Elementary functions that may appear inside an atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Func {
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
}

impl Func {
    pub fn name(self) -> &'static str {
        match self {
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
        }
    }

    pub fn from_name(name: &str) -> Option<Func> {
        match name {
            "exp" => Some(Func::Exp),
            "log" | "ln" => Some(Func::Log),
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            _ => None,
        }
    }
}

/// An indeterminate of the polynomial ring.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    Symbol(Symbol),
    Apply(Func, Box<Expr>),
    /// `base ^ exponent` where the exponent is not an integer constant.
    Pow(Box<Expr>, Box<Expr>),
}

impl Atom {
    /// The symbol, if this atom is a bare symbol.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Atom::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Atom::Symbol(s) => {
                out.insert(s.clone());
            }
            Atom::Apply(_, arg) => arg.collect_symbols(out),
            Atom::Pow(base, exp) => {
                base.collect_symbols(out);
                exp.collect_symbols(out);
            }
        }
    }
}

/// Largest integer exponent [`Expr::pow_int`](crate::Expr::pow_int) expands.
pub const MAX_EXPONENT: u32 = 1 << 20;

/// Power product of atoms. Exponents are always positive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Monomial(BTreeMap<Atom, u32>);

impl Monomial {
    pub fn one() -> Self {
        Self(BTreeMap::new())
    }

    pub fn atom(atom: Atom, exp: u32) -> Self {
        let mut map = BTreeMap::new();
        if exp > 0 {
            map.insert(atom, exp);
        }
        Self(map)
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn degree(&self) -> u64 {
        self.0.values().map(|&e| u64::from(e)).sum()
    }

    pub fn factors(&self) -> impl Iterator<Item = (&Atom, u32)> {
        self.0.iter().map(|(a, e)| (a, *e))
    }

    pub fn exponent(&self, atom: &Atom) -> u32 {
        self.0.get(atom).copied().unwrap_or(0)
    }

    /// Split into the factors whose atom satisfies `pred`, and the rest.
    pub fn partition(&self, mut pred: impl FnMut(&Atom) -> bool) -> (Monomial, Monomial) {
        let (inside, outside) = self
            .0
            .iter()
            .map(|(a, e)| (a.clone(), *e))
            .partition(|(a, _)| pred(a));
        (Self(inside), Self(outside))
    }

    /// The monomial with `atom` removed entirely.
    pub fn without(&self, atom: &Atom) -> Monomial {
        let mut map = self.0.clone();
        map.remove(atom);
        Self(map)
    }

    /// `self * other`, or `None` if an exponent overflows.
    pub fn checked_mul(&self, other: &Monomial) -> Option<Monomial> {
        let mut map = self.0.clone();
        for (atom, exp) in &other.0 {
            let slot = map.entry(atom.clone()).or_insert(0);
            *slot = slot.checked_add(*exp)?;
        }
        Some(Self(map))
    }

    /// # Panics
    ///
    /// If an exponent overflows `u32`.
    pub fn mul(&self, other: &Monomial) -> Monomial {
        match self.checked_mul(other) {
            Some(m) => m,
            None => exponent_overflow(),
        }
    }

    /// `self / other`, or `None` when `other` does not divide `self`.
    pub fn div(&self, other: &Monomial) -> Option<Monomial> {
        let mut map = self.0.clone();
        for (atom, exp) in &other.0 {
            let have = map.get_mut(atom)?;
            match (*have).cmp(exp) {
                Ordering::Less => return None,
                Ordering::Equal => {
                    map.remove(atom);
                }
                Ordering::Greater => *have -= exp,
            }
        }
        Some(Self(map))
    }

    pub fn gcd(&self, other: &Monomial) -> Monomial {
        let map = self
            .0
            .iter()
            .filter_map(|(atom, exp)| other.0.get(atom).map(|o| (atom.clone(), *exp.min(o))))
            .collect();
        Self(map)
    }

    /// Lexicographic comparison; the smallest atom is the most significant.
    fn lex_cmp(&self, other: &Monomial) -> Ordering {
        let mut a = self.0.iter().peekable();
        let mut b = other.0.iter().peekable();
        loop {
            match (a.peek(), b.peek()) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some((ka, ea)), Some((kb, eb))) => match ka.cmp(kb) {
                    Ordering::Less => return Ordering::Greater,
                    Ordering::Greater => return Ordering::Less,
                    Ordering::Equal => match ea.cmp(eb) {
                        Ordering::Equal => {
                            a.next();
                            b.next();
                        }
                        other => return other,
                    },
                },
            }
        }
    }
}

#[cold]
#[track_caller]
fn exponent_overflow() -> ! {
    panic!("monomial exponent overflows u32")
}

/// Graded lexicographic order. This is a monomial order (compatible with
/// multiplication), which exact division relies on.
impl Ord for Monomial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.degree()
            .cmp(&other.degree())
            .then_with(|| self.lex_cmp(other))
    }
}

impl PartialOrd for Monomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sparse polynomial. Never stores a zero coefficient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Poly(BTreeMap<Monomial, BigRational>);

impl Poly {
    pub fn zero() -> Self {
        Self(BTreeMap::new())
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn constant(value: BigRational) -> Self {
        Self::term(Monomial::one(), value)
    }

    pub fn term(mon: Monomial, coeff: BigRational) -> Self {
        let mut poly = Self::zero();
        poly.add_term(mon, coeff);
        poly
    }

    pub fn from_atom(atom: Atom) -> Self {
        Self::term(Monomial::atom(atom, 1), BigRational::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|c| c.is_one())
    }

    /// The value when the polynomial has no atoms at all.
    pub fn as_constant(&self) -> Option<BigRational> {
        match self.0.len() {
            0 => Some(BigRational::zero()),
            1 => self
                .0
                .iter()
                .next()
                .filter(|(mon, _)| mon.is_one())
                .map(|(_, c)| c.clone()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Terms in ascending monomial order.
    pub fn terms(&self) -> impl DoubleEndedIterator<Item = (&Monomial, &BigRational)> {
        self.0.iter()
    }

    pub fn leading(&self) -> Option<(&Monomial, &BigRational)> {
        self.0.last_key_value()
    }

    pub fn add_term(&mut self, mon: Monomial, coeff: BigRational) {
        if coeff.is_zero() {
            return;
        }
        match self.0.entry(mon) {
            Entry::Vacant(slot) => {
                slot.insert(coeff);
            }
            Entry::Occupied(mut slot) => {
                *slot.get_mut() += coeff;
                if slot.get().is_zero() {
                    slot.remove();
                }
            }
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (mon, coeff) in &other.0 {
            out.add_term(mon.clone(), coeff.clone());
        }
        out
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (mon, coeff) in &other.0 {
            out.add_term(mon.clone(), -coeff.clone());
        }
        out
    }

    pub fn neg(&self) -> Poly {
        Self(self.0.iter().map(|(m, c)| (m.clone(), -c.clone())).collect())
    }

    pub fn scale(&self, factor: &BigRational) -> Poly {
        if factor.is_zero() {
            return Poly::zero();
        }
        Self(self.0.iter().map(|(m, c)| (m.clone(), c * factor)).collect())
    }

    pub fn mul_term(&self, mon: &Monomial, coeff: &BigRational) -> Poly {
        if coeff.is_zero() {
            return Poly::zero();
        }
        Self(
            self.0
                .iter()
                .map(|(m, c)| (m.mul(mon), c * coeff))
                .collect(),
        )
    }

    /// `self * other`, or `None` if an exponent overflows.
    pub fn checked_mul(&self, other: &Poly) -> Option<Poly> {
        let mut out = Poly::zero();
        for (ma, ca) in &self.0 {
            for (mb, cb) in &other.0 {
                out.add_term(ma.checked_mul(mb)?, ca * cb);
            }
        }
        Some(out)
    }

    /// # Panics
    ///
    /// If an exponent overflows `u32`.
    pub fn mul(&self, other: &Poly) -> Poly {
        match self.checked_mul(other) {
            Some(p) => p,
            None => exponent_overflow(),
        }
    }

    /// Exact quotient `self / divisor`, or `None` if the division leaves a
    /// remainder (or the divisor is zero).
    pub fn div_exact(&self, divisor: &Poly) -> Option<Poly> {
        let (lead_mon, lead_coeff) = divisor.leading()?;
        let mut rem = self.clone();
        let mut quot = Poly::zero();
        loop {
            let (factor, coeff) = match rem.leading() {
                None => break,
                Some((mon, c)) => (mon.div(lead_mon)?, c / lead_coeff),
            };
            rem = rem.sub(&divisor.mul_term(&factor, &coeff));
            quot.add_term(factor, coeff);
        }
        Some(quot)
    }

    /// Greatest monomial dividing every term.
    pub fn monomial_content(&self) -> Monomial {
        let mut iter = self.0.keys();
        let Some(first) = iter.next() else {
            return Monomial::one();
        };
        let mut acc = first.clone();
        for mon in iter {
            if acc.is_one() {
                break;
            }
            acc = acc.gcd(mon);
        }
        acc
    }

    /// Divide every term by a monomial known to divide all of them.
    pub fn div_monomial(&self, mon: &Monomial) -> Poly {
        let mut out = Poly::zero();
        for (m, c) in &self.0 {
            if let Some(q) = m.div(mon) {
                out.add_term(q, c.clone());
            }
        }
        out
    }

    pub(crate) fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        for mon in self.0.keys() {
            for (atom, _) in mon.factors() {
                atom.collect_symbols(out);
            }
        }
    }
}
