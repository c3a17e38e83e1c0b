//! Exact symbolic expressions: rational functions over [`Atom`]s.
//!
//! Every [`Expr`] is kept in a normalized form `num / den`:
//! - zero is `0 / 1`;
//! - the common monomial factor of `num` and `den` is divided out;
//! - `den` is monic (its leading coefficient is one);
//! - if either side divides the other exactly, the quotient replaces them.
//!
//! This makes polynomials canonical, so structural equality is reliable for
//! them. For rational functions use [`Expr::is_equivalent`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{SymbolicError, SymbolicResult};
use crate::poly::{Atom, Func, MAX_EXPONENT, Monomial, Poly};
use crate::symbol::Symbol;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr {
    num: Poly,
    den: Poly,
}

impl Expr {
    pub fn zero() -> Self {
        Self {
            num: Poly::zero(),
            den: Poly::one(),
        }
    }

    pub fn one() -> Self {
        Self::integer(1)
    }

    pub fn integer(value: i64) -> Self {
        Self::rational(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn rational(value: BigRational) -> Self {
        Self::from_poly(Poly::constant(value))
    }

    /// `numer / denom` as an exact constant.
    pub fn ratio(numer: i64, denom: i64) -> SymbolicResult<Self> {
        if denom == 0 {
            return Err(SymbolicError::DivisionByZero);
        }
        Ok(Self::rational(BigRational::new(numer.into(), denom.into())))
    }

    pub fn symbol(symbol: impl Into<Symbol>) -> Self {
        Self::from_atom(Atom::Symbol(symbol.into()))
    }

    pub fn from_atom(atom: Atom) -> Self {
        Self::from_poly(Poly::from_atom(atom))
    }

    pub fn from_poly(num: Poly) -> Self {
        Self {
            num,
            den: Poly::one(),
        }
    }

    /// Build `num / den`. `den` must be nonzero.
    fn normalized(mut num: Poly, mut den: Poly) -> Self {
        if num.is_zero() {
            return Self::zero();
        }
        let common = num.monomial_content().gcd(&den.monomial_content());
        if !common.is_one() {
            num = num.div_monomial(&common);
            den = den.div_monomial(&common);
        }
        if let Some(lead) = den.leading().map(|(_, c)| c.clone()) {
            if !lead.is_one() {
                let inv = lead.recip();
                num = num.scale(&inv);
                den = den.scale(&inv);
            }
        }
        if den.is_one() {
            return Self::from_poly(num);
        }
        if let Some(q) = num.div_exact(&den) {
            return Self::from_poly(q);
        }
        if let Some(q) = den.div_exact(&num) {
            if let Some(lead) = q.leading().map(|(_, c)| c.clone()) {
                let inv = lead.recip();
                return Self {
                    num: Poly::constant(inv.clone()),
                    den: q.scale(&inv),
                };
            }
        }
        Self { num, den }
    }

    pub fn numerator(&self) -> &Poly {
        &self.num
    }

    pub fn denominator(&self) -> &Poly {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.den.is_one() && self.num.is_one()
    }

    pub fn is_polynomial(&self) -> bool {
        self.den.is_one()
    }

    /// The value, if this expression is a constant.
    pub fn as_rational(&self) -> Option<BigRational> {
        if self.den.is_one() {
            self.num.as_constant()
        } else {
            None
        }
    }

    /// The symbol, if this expression is exactly one bare symbol.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        if !self.den.is_one() || self.num.len() != 1 {
            return None;
        }
        let (mon, coeff) = self.num.leading()?;
        if !coeff.is_one() {
            return None;
        }
        let mut factors = mon.factors();
        match (factors.next(), factors.next()) {
            (Some((atom, 1)), None) => atom.as_symbol(),
            _ => None,
        }
    }

    fn add_expr(&self, rhs: &Expr) -> Expr {
        if self.den.is_one() && rhs.den.is_one() {
            return Self::from_poly(self.num.add(&rhs.num));
        }
        if self.den == rhs.den {
            return Self::normalized(self.num.add(&rhs.num), self.den.clone());
        }
        Self::normalized(
            self.num.mul(&rhs.den).add(&rhs.num.mul(&self.den)),
            self.den.mul(&rhs.den),
        )
    }

    fn mul_expr(&self, rhs: &Expr) -> Expr {
        if self.den.is_one() && rhs.den.is_one() {
            return Self::from_poly(self.num.mul(&rhs.num));
        }
        Self::normalized(self.num.mul(&rhs.num), self.den.mul(&rhs.den))
    }

    fn neg_expr(&self) -> Expr {
        Self {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    /// `self * rhs`, failing instead of panicking when an exponent
    /// overflows.
    pub fn checked_mul(&self, rhs: &Expr) -> SymbolicResult<Expr> {
        let num = self.num.checked_mul(&rhs.num).ok_or_else(product_overflow)?;
        if self.den.is_one() && rhs.den.is_one() {
            return Ok(Self::from_poly(num));
        }
        let den = self.den.checked_mul(&rhs.den).ok_or_else(product_overflow)?;
        Ok(Self::normalized(num, den))
    }

    pub fn checked_div(&self, rhs: &Expr) -> SymbolicResult<Expr> {
        if rhs.is_zero() {
            return Err(SymbolicError::DivisionByZero);
        }
        let num = self.num.checked_mul(&rhs.den).ok_or_else(product_overflow)?;
        let den = self.den.checked_mul(&rhs.num).ok_or_else(product_overflow)?;
        Ok(Self::normalized(num, den))
    }

    pub fn recip(&self) -> SymbolicResult<Expr> {
        Self::one().checked_div(self)
    }

    /// `self ^ n` by repeated squaring. `|n|` may not exceed
    /// [`MAX_EXPONENT`].
    pub fn pow_int(&self, n: i64) -> SymbolicResult<Expr> {
        let mut exp = n.unsigned_abs();
        if exp > u64::from(MAX_EXPONENT) {
            return Err(SymbolicError::ExponentOutOfRange {
                exponent: n.to_string(),
            });
        }
        let base = if n < 0 { self.recip()? } else { self.clone() };
        let mut result = Self::one();
        let mut square = base;
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.checked_mul(&square)?;
            }
            exp >>= 1;
            if exp > 0 {
                square = square.checked_mul(&square)?;
            }
        }
        Ok(result)
    }

    /// `self ^ exponent`. Integer exponents expand; anything else becomes a
    /// power atom.
    pub fn pow(&self, exponent: &Expr) -> SymbolicResult<Expr> {
        if let Some(q) = exponent.as_rational() {
            if q.is_integer() {
                let n = q
                    .to_integer()
                    .to_i64()
                    .ok_or_else(|| SymbolicError::ExponentOutOfRange {
                        exponent: q.to_string(),
                    })?;
                return self.pow_int(n);
            }
            if self.is_zero() {
                return if q.is_positive() {
                    Ok(Self::zero())
                } else {
                    Err(SymbolicError::DivisionByZero)
                };
            }
            if self.is_one() {
                return Ok(Self::one());
            }
        }
        Ok(Self::from_atom(Atom::Pow(
            Box::new(self.clone()),
            Box::new(exponent.clone()),
        )))
    }

    pub fn sqrt(&self) -> SymbolicResult<Expr> {
        self.pow(&Self::rational(BigRational::new(BigInt::from(1), BigInt::from(2))))
    }

    /// Apply an elementary function, folding the trivial constant cases.
    pub fn apply(func: Func, arg: Expr) -> Expr {
        if let Some(q) = arg.as_rational() {
            match func {
                Func::Exp | Func::Cos if q.is_zero() => return Self::one(),
                Func::Sin | Func::Tan if q.is_zero() => return Self::zero(),
                Func::Log if q.is_one() => return Self::zero(),
                _ => {}
            }
        }
        Self::from_atom(Atom::Apply(func, Box::new(arg)))
    }

    pub fn exp(&self) -> Expr {
        Self::apply(Func::Exp, self.clone())
    }

    pub fn is_equivalent(&self, other: &Expr) -> bool {
        (self - other).is_zero()
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    pub(crate) fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        self.num.collect_symbols(out);
        self.den.collect_symbols(out);
    }

    pub fn contains_symbol(&self, symbol: &Symbol) -> bool {
        self.free_symbols().contains(symbol)
    }

    /// Simultaneous substitution of symbols.
    ///
    /// Fails only if the substituted denominator vanishes.
    pub fn subs(&self, map: &HashMap<Symbol, Expr>) -> SymbolicResult<Expr> {
        if map.is_empty() {
            return Ok(self.clone());
        }
        let num = subs_poly(&self.num, map)?;
        if self.den.is_one() {
            return Ok(num);
        }
        let den = subs_poly(&self.den, map)?;
        num.checked_div(&den)
    }
}

fn product_overflow() -> SymbolicError {
    SymbolicError::ExponentOutOfRange {
        exponent: format!("product exceeds {}", u32::MAX),
    }
}

fn subs_poly(poly: &Poly, map: &HashMap<Symbol, Expr>) -> SymbolicResult<Expr> {
    let mut acc = Expr::zero();
    for (mon, coeff) in poly.terms() {
        acc += &subs_term(mon, coeff, map)?;
    }
    Ok(acc)
}

fn subs_term(
    mon: &Monomial,
    coeff: &BigRational,
    map: &HashMap<Symbol, Expr>,
) -> SymbolicResult<Expr> {
    let mut term = Expr::rational(coeff.clone());
    for (atom, exp) in mon.factors() {
        let value = subs_atom(atom, map)?;
        term = term.checked_mul(&value.pow_int(i64::from(exp))?)?;
    }
    Ok(term)
}

fn subs_atom(atom: &Atom, map: &HashMap<Symbol, Expr>) -> SymbolicResult<Expr> {
    match atom {
        Atom::Symbol(s) => Ok(map
            .get(s)
            .cloned()
            .unwrap_or_else(|| Expr::symbol(s.clone()))),
        Atom::Apply(func, arg) => Ok(Expr::apply(*func, arg.subs(map)?)),
        Atom::Pow(base, exp) => base.subs(map)?.pow(&exp.subs(map)?),
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $inner:ident) => {
        impl $trait<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                self.$inner(rhs)
            }
        }

        impl $trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                (&self).$inner(&rhs)
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                (&self).$inner(rhs)
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                self.$inner(&rhs)
            }
        }
    };
}

forward_binop!(Add, add, add_expr);
// `*` panics if an exponent overflows `u32`; parsed input goes through
// `checked_mul`.
forward_binop!(Mul, mul, mul_expr);

impl Expr {
    fn sub_expr(&self, rhs: &Expr) -> Expr {
        self.add_expr(&rhs.neg_expr())
    }
}

forward_binop!(Sub, sub, sub_expr);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.neg_expr()
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.neg_expr()
    }
}

impl AddAssign<&Expr> for Expr {
    fn add_assign(&mut self, rhs: &Expr) {
        *self = self.add_expr(rhs);
    }
}

impl SubAssign<&Expr> for Expr {
    fn sub_assign(&mut self, rhs: &Expr) {
        *self = self.sub_expr(rhs);
    }
}

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        iter.fold(Expr::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Expr> for Expr {
    fn sum<I: Iterator<Item = &'a Expr>>(iter: I) -> Expr {
        iter.fold(Expr::zero(), |acc, x| acc + x)
    }
}

impl Default for Expr {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<BigRational> for Expr {
    fn from(value: BigRational) -> Self {
        Self::rational(value)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Self::symbol(symbol)
    }
}

impl From<&Symbol> for Expr {
    fn from(symbol: &Symbol) -> Self {
        Self::symbol(symbol.clone())
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

/// Fractions print one group per product of atoms absent from the
/// denominator, so `(c*r*dx + x)/(c*r)` reads `dx + x/(c*r)`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den.is_one() {
            return write!(f, "{}", self.num);
        }
        let den_atoms: BTreeSet<&Atom> = self
            .den
            .terms()
            .flat_map(|(m, _)| m.factors().map(|(a, _)| a))
            .collect();
        let mut groups: BTreeMap<Monomial, Poly> = BTreeMap::new();
        for (mon, coeff) in self.num.terms() {
            let (inner, outer) = mon.partition(|a| den_atoms.contains(a));
            groups.entry(outer).or_default().add_term(inner, coeff.clone());
        }
        for (i, (key, coeff)) in groups.into_iter().rev().enumerate() {
            let part = Self::normalized(coeff, self.den.clone());
            write_group(f, i == 0, &part, &key)?;
        }
        Ok(())
    }
}

/// `part * key` as one signed summand.
fn write_group(
    f: &mut fmt::Formatter<'_>,
    first: bool,
    part: &Expr,
    key: &Monomial,
) -> fmt::Result {
    let single = match part.num.leading() {
        Some((mon, coeff)) if part.num.len() == 1 => Some((mon, coeff)),
        _ => None,
    };
    let negative = single.is_some_and(|(_, c)| c.is_negative());
    match (first, negative) {
        (true, true) => f.write_str("-")?,
        (true, false) => {}
        (false, true) => f.write_str(" - ")?,
        (false, false) => f.write_str(" + ")?,
    }
    match single {
        Some((mon, coeff)) => write!(f, "{}", Poly::term(mon.mul(key), coeff.abs()))?,
        None if key.is_one() => write!(f, "({})", part.num)?,
        None => write!(f, "({})*{key}", part.num)?,
    }
    if part.den.is_one() {
        Ok(())
    } else if is_bare_factor(&part.den) {
        write!(f, "/{}", part.den)
    } else {
        write!(f, "/({})", part.den)
    }
}

/// One term, unit coefficient, one atom: prints without parentheses.
fn is_bare_factor(poly: &Poly) -> bool {
    match poly.leading() {
        Some((mon, coeff)) if poly.len() == 1 && coeff.is_one() => mon.factors().count() == 1,
        _ => false,
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        // descending: highest degree first, constant last
        for (i, (mon, coeff)) in self.terms().rev().enumerate() {
            let negative = coeff.is_negative();
            if i == 0 {
                if negative {
                    f.write_str("-")?;
                }
            } else if negative {
                f.write_str(" - ")?;
            } else {
                f.write_str(" + ")?;
            }
            let magnitude = coeff.abs();
            if mon.is_one() {
                write!(f, "{magnitude}")?;
            } else if magnitude.is_one() {
                write!(f, "{mon}")?;
            } else {
                write!(f, "{magnitude}*{mon}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return f.write_str("1");
        }
        for (i, (atom, exp)) in self.factors().enumerate() {
            if i > 0 {
                f.write_str("*")?;
            }
            match (atom, exp) {
                (_, 1) => write!(f, "{atom}")?,
                (Atom::Pow(..), _) => write!(f, "({atom})^{exp}")?,
                _ => write!(f, "{atom}^{exp}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(s) => write!(f, "{s}"),
            Atom::Apply(func, arg) => write!(f, "{}({arg})", func.name()),
            Atom::Pow(base, exp) => {
                if base.as_symbol().is_some() {
                    write!(f, "{base}")?;
                } else {
                    write!(f, "({base})")?;
                }
                match exp.as_rational() {
                    Some(q) if q.is_integer() && !q.is_negative() => write!(f, "^{exp}"),
                    _ if exp.as_symbol().is_some() => write!(f, "^{exp}"),
                    _ => write!(f, "^({exp})"),
                }
            }
        }
    }
}
