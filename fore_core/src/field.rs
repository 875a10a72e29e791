//! Arithmetic over `GF(p)` and its quadratic extension `GF(p^2)`.
//!
//! The base prime is the Mersenne prime `p = 2^31 - 1`. The extension is
//! `GF(p)[t] / (t^2 - t - 1)`, so the distinguished element `φ = t`
//! satisfies `φ^2 = φ + 1`. Every element is stored as a canonical pair
//! `a + b·φ` with both components in `[0, p)`.

use log::error;
use once_cell::sync::Lazy;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroize;

use crate::error::ForeError;

/// Mersenne prime `p = 2^31 - 1`.
pub const P: u32 = (1 << 31) - 1;

const P64: u64 = P as u64;

/// Order of the multiplicative group of `GF(p^2)`, `p^2 - 1`.
pub const GROUP_ORDER: u64 = P64 * P64 - 1;

/// Multiplicative order of `φ`. Its norm is `-1`, so `φ^(p+1) = -1` and the
/// order is `2(p + 1) = 2^32`, a proper divisor of [`GROUP_ORDER`].
pub const PHI_ORDER: u64 = 2 * (P64 + 1);

/// Reduces `x < 2^62` modulo `p` by folding the high bits onto the low bits.
#[inline]
pub fn modp(x: u64) -> u32 {
    let r = (x >> 31) + (x & P64);
    let r = (r >> 31) + (r & P64);
    let r = r as u32;
    if r >= P { r - P } else { r }
}

#[inline]
pub fn add_mod(a: u32, b: u32) -> u32 {
    let s = a + b;
    if s >= P { s - P } else { s }
}

#[inline]
pub fn sub_mod(a: u32, b: u32) -> u32 {
    if a >= b { a - b } else { a + P - b }
}

#[inline]
pub fn neg_mod(a: u32) -> u32 {
    if a == 0 { 0 } else { P - a }
}

#[inline]
pub fn mul_mod(a: u32, b: u32) -> u32 {
    modp(a as u64 * b as u64)
}

/// Reduces an exponent modulo the multiplicative group order.
#[inline]
pub const fn reduce_exponent(exponent: u64) -> u64 {
    exponent % GROUP_ORDER
}

/// Parameters of a quadratic extension `GF(prime)[t] / (t^2 - trace·t - norm)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionParams {
    pub prime: u64,
    pub trace: u64,
    pub norm: u64,
}

impl ExtensionParams {
    /// The pair the arithmetic in this module is specialized for.
    pub const MERSENNE31_GOLDEN: Self = Self::new(P64, 1, 1);

    pub const fn new(prime: u64, trace: u64, norm: u64) -> Self {
        Self { prime, trace, norm }
    }

    /// Discriminant `trace^2 + 4·norm` reduced mod `prime`.
    pub fn discriminant(&self) -> u64 {
        let p = self.prime as u128;
        let t = self.trace as u128 % p;
        let n = self.norm as u128 % p;
        ((t * t + 4 * n) % p) as u64
    }

    /// Euler's criterion: the polynomial has no root in the base field iff
    /// the discriminant is a quadratic non-residue, `d^((p-1)/2) = p - 1`.
    pub fn is_irreducible(&self) -> bool {
        if self.prime < 3 || self.prime.is_multiple_of(2) {
            return false;
        }
        let d = self.discriminant();
        if d == 0 {
            return false;
        }
        pow_mod(d, (self.prime - 1) / 2, self.prime) == self.prime - 1
    }
}

fn pow_mod(base: u64, mut exp: u64, modulus: u64) -> u64 {
    let m = modulus as u128;
    let mut base = base as u128 % m;
    let mut acc = 1u128 % m;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % m;
        }
        base = base * base % m;
        exp >>= 1;
    }
    acc as u64
}

/// Irreducibility of `t^2 - t - 1` over `GF(2^31 - 1)`.
pub fn check_irreducible() -> bool {
    ExtensionParams::MERSENNE31_GOLDEN.is_irreducible()
}

static FIELD_INVARIANT: Lazy<bool> = Lazy::new(check_irreducible);

/// One-time startup check of the configured field. Evaluated on first call,
/// cached for the process lifetime.
pub fn ensure_field_invariant() -> Result<(), ForeError> {
    if *FIELD_INVARIANT {
        return Ok(());
    }
    let params = ExtensionParams::MERSENNE31_GOLDEN;
    error!(
        "field invariant failed prime={} discriminant={}",
        params.prime,
        params.discriminant()
    );
    Err(ForeError::ConfigurationInvariantViolation {
        prime: params.prime,
        discriminant: params.discriminant(),
    })
}

/// Element `a + b·φ` of `GF(p^2)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FieldElement {
    a: u32,
    b: u32,
}

impl FieldElement {
    pub const ZERO: Self = Self { a: 0, b: 0 };
    pub const ONE: Self = Self { a: 1, b: 0 };
    /// The generator `φ`, a root of `t^2 - t - 1`.
    pub const PHI: Self = Self { a: 0, b: 1 };

    /// Builds an element, reducing both components mod `p`.
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            a: modp(a as u64),
            b: modp(b as u64),
        }
    }

    pub fn from_scalar(value: u32) -> Self {
        Self::new(value, 0)
    }

    /// Accepts only components already in `[0, p)`.
    pub fn try_from_canonical(a: u32, b: u32) -> Result<Self, ForeError> {
        if a >= P || b >= P {
            return Err(ForeError::NonCanonicalElement { a, b });
        }
        Ok(Self { a, b })
    }

    pub const fn a(&self) -> u32 {
        self.a
    }

    pub const fn b(&self) -> u32 {
        self.b
    }

    pub fn is_zero(&self) -> bool {
        self.a == 0 && self.b == 0
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            a: add_mod(self.a, other.a),
            b: add_mod(self.b, other.b),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self {
            a: sub_mod(self.a, other.a),
            b: sub_mod(self.b, other.b),
        }
    }

    pub fn neg(&self) -> Self {
        Self {
            a: neg_mod(self.a),
            b: neg_mod(self.b),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        mul_ext(self, other)
    }

    pub fn pow(&self, exponent: u64) -> Self {
        exp(*self, exponent)
    }

    /// Multiplicative inverse, `None` for zero.
    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        Some(exp(*self, GROUP_ORDER - 1))
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            a: u32,
            b: u32,
        }
        let helper = Helper::deserialize(deserializer)?;
        FieldElement::try_from_canonical(helper.a, helper.b).map_err(D::Error::custom)
    }
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        self.a.zeroize();
        self.b.zeroize();
    }
}

/// `(a + bφ)(c + dφ) = (ac + bd) + (ad + bc + bd)φ`, folding `φ^2 = φ + 1`.
#[inline]
pub fn mul_ext(x: &FieldElement, y: &FieldElement) -> FieldElement {
    let ac = mul_mod(x.a, y.a);
    let bd = mul_mod(x.b, y.b);
    let ad_bc = add_mod(mul_mod(x.a, y.b), mul_mod(x.b, y.a));
    FieldElement {
        a: add_mod(ac, bd),
        b: add_mod(ad_bc, bd),
    }
}

/// `base^exponent` with the exponent reduced mod `p^2 - 1` first.
pub fn exp(base: FieldElement, exponent: u64) -> FieldElement {
    let e = reduce_exponent(exponent);
    let mut result = FieldElement::ONE;
    let mut current = base;
    let bits = 64 - e.leading_zeros();
    for i in 0..bits {
        let mask = (((e >> i) & 1) as u32).wrapping_neg();
        let product = mul_ext(&result, &current);
        result = FieldElement {
            a: (!mask & result.a) | (mask & product.a),
            b: (!mask & result.b) | (mask & product.b),
        };
        current = mul_ext(&current, &current);
    }
    result
}

/// `base^(-exponent)`, computed as `base^(order - exponent mod order)`.
pub fn exp_inverse(base: FieldElement, exponent: u64) -> FieldElement {
    let k = reduce_exponent(exponent);
    exp(base, (GROUP_ORDER - k) % GROUP_ORDER)
}
