//! Purpose: Bit-exact IEEE-754 precision quantization (narrow then widen).
//! Exports: `Precision`, `quantize`, `quantize_slice`, `quantize_to_half`,
//! `quantize_to_single`, `quantize_to_double`, `f32_to_f16_bits`, `f16_bits_to_f32`.
//! Role: Lets callers compare floating-point values at a reduced precision.
//! Invariants: Every narrowing step rounds to nearest, ties to even, and keeps the sign.
//! Invariants: A NaN never narrows to the infinity bit pattern.
use crate::core::error::{Error, ErrorKind};

const F32_SIGN_MASK: u32 = 0x8000_0000;
const F32_EXP_MASK: u32 = 0x7f80_0000;
const F32_MAN_MASK: u32 = 0x007f_ffff;
const F32_IMPLICIT_BIT: u32 = 0x0080_0000;
const F32_EXP_BIAS: i32 = 127;

const F16_EXP_MASK: u16 = 0x7c00;
const F16_MAN_MASK: u16 = 0x03ff;
const F16_QUIET_BIT: u16 = 0x0200;
const F16_IMPLICIT_BIT: u32 = 0x0400;
const F16_EXP_BIAS: i32 = 15;
const F16_EXP_MAX: i32 = 0x1f;

// Mantissa bits dropped when narrowing 23 -> 10.
const MAN_SHIFT: u32 = 13;
// Largest right shift that can still round up to the smallest subnormal.
const MAX_SUBNORMAL_SHIFT: u32 = 24;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Precision {
    Half,
    Single,
    Double,
}

impl Precision {
    pub fn bits(self) -> u32 {
        match self {
            Precision::Half => 16,
            Precision::Single => 32,
            Precision::Double => 64,
        }
    }
}

impl TryFrom<u32> for Precision {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self, Error> {
        match bits {
            16 => Ok(Precision::Half),
            32 => Ok(Precision::Single),
            64 => Ok(Precision::Double),
            _ => Err(Error::new(ErrorKind::UnsupportedPrecision)
                .with_message(format!("unsupported precision {bits} bits"))
                .with_hint("Use 16, 32, or 64.")),
        }
    }
}

pub fn quantize(value: f64, bits: u32) -> Result<f64, Error> {
    Ok(quantize_to(value, Precision::try_from(bits)?))
}

pub fn quantize_slice(values: &[f64], bits: u32) -> Result<Vec<f64>, Error> {
    let precision = Precision::try_from(bits)?;
    Ok(values
        .iter()
        .map(|value| quantize_to(*value, precision))
        .collect())
}

pub fn quantize_to(value: f64, precision: Precision) -> f64 {
    match precision {
        Precision::Half => quantize_to_half(value),
        Precision::Single => quantize_to_single(value),
        Precision::Double => quantize_to_double(value),
    }
}

pub fn quantize_to_half(value: f64) -> f64 {
    let single = value as f32;
    let half = f32_to_f16_bits(single.to_bits());
    f64::from(f32::from_bits(f16_bits_to_f32(half)))
}

pub fn quantize_to_single(value: f64) -> f64 {
    f64::from(value as f32)
}

pub fn quantize_to_double(value: f64) -> f64 {
    value
}

/// Narrows a binary32 bit pattern to binary16, rounding to nearest even.
pub fn f32_to_f16_bits(bits: u32) -> u16 {
    let sign = ((bits & F32_SIGN_MASK) >> 16) as u16;
    let exp = ((bits & F32_EXP_MASK) >> 23) as i32;
    let man = bits & F32_MAN_MASK;

    if exp == 0xff {
        if man == 0 {
            return sign | F16_EXP_MASK;
        }
        return sign | F16_EXP_MASK | F16_QUIET_BIT | (man >> MAN_SHIFT) as u16;
    }

    let half_exp = exp - F32_EXP_BIAS + F16_EXP_BIAS;
    if half_exp >= F16_EXP_MAX {
        return sign | F16_EXP_MASK;
    }

    if half_exp <= 0 {
        // binary32 zeros and subnormals land here too and flush to signed zero.
        let shift = (14 - half_exp) as u32;
        if shift > MAX_SUBNORMAL_SHIFT {
            return sign;
        }
        let full = man | F32_IMPLICIT_BIT;
        let mut half_man = full >> shift;
        let guard = (full >> (shift - 1)) & 1;
        let sticky = full & ((1 << (shift - 1)) - 1) != 0;
        if guard == 1 && (sticky || half_man & 1 == 1) {
            // A carry out of the subnormal field yields the smallest normal.
            half_man += 1;
        }
        return sign | half_man as u16;
    }

    let mut out = ((half_exp as u32) << 10) | (man >> MAN_SHIFT);
    let guard = (man >> (MAN_SHIFT - 1)) & 1;
    let sticky = man & ((1 << (MAN_SHIFT - 1)) - 1) != 0;
    if guard == 1 && (sticky || out & 1 == 1) {
        // Mantissa overflow carries into the exponent; 0x7c00 is infinity.
        out += 1;
    }
    sign | out as u16
}

/// Widens a binary16 bit pattern to binary32. Exact for every input.
pub fn f16_bits_to_f32(half: u16) -> u32 {
    let sign = u32::from(half & 0x8000) << 16;
    let exp = ((half & F16_EXP_MASK) >> 10) as i32;
    let mut man = u32::from(half & F16_MAN_MASK);

    if exp == 0 {
        if man == 0 {
            return sign;
        }
        let mut exp32 = F32_EXP_BIAS - F16_EXP_BIAS + 1;
        while man & F16_IMPLICIT_BIT == 0 {
            man <<= 1;
            exp32 -= 1;
        }
        man &= u32::from(F16_MAN_MASK);
        return sign | ((exp32 as u32) << 23) | (man << MAN_SHIFT);
    }

    if exp == F16_EXP_MAX {
        return sign | F32_EXP_MASK | (man << MAN_SHIFT);
    }

    let exp32 = (exp - F16_EXP_BIAS + F32_EXP_BIAS) as u32;
    sign | (exp32 << 23) | (man << MAN_SHIFT)
}
