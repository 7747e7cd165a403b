use crate::f;

/// Extends primitives with more specific formatting options
pub trait ValueExt {
    /// Better scientific number formatting
    ///
    /// The default is not very consistent for scientific in particular, so this
    /// allows easy definition.
    ///
    /// Works for anything that can be represented as scientific using the
    /// `LowerExp` trait, which is pretty much every numerical primitive.
    ///
    /// ```rust
    /// # use ecltools_utils::ValueExt;
    /// let number = -1.0;
    /// assert_eq!(number.sci(5, 2), "-1.00000e+00".to_string());
    /// assert_eq!((1.0).sci(5, 2), "1.00000e+00".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;

    /// Fortran list-format scientific notation with a `0.` mantissa
    ///
    /// The formatted keyword files normalise every real to a fractional
    /// mantissa, e.g. pi as `0.31415927E+01`. Doubles use a `D` exponent
    /// character instead of `E`.
    ///
    /// ```rust
    /// # use ecltools_utils::ValueExt;
    /// assert_eq!((3.1415927_f64).fortran(8, 'E'), "0.31415927E+01".to_string());
    /// assert_eq!((-12.5_f64).fortran(8, 'E'), "-0.12500000E+02".to_string());
    /// assert_eq!((0.0_f64).fortran(8, 'D'), "0.00000000D+00".to_string());
    /// ```
    fn fortran(&self, digits: usize, exp_char: char) -> String;
}

impl<T: std::fmt::LowerExp> ValueExt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let mut num = f!("{:.precision$e}", &self, precision = precision);
        // Safe to `unwrap` as `num` is guaranteed to contain `'e'`
        let exp = num.split_off(num.find('e').unwrap());
        // Make sure the exponent is signed
        let (sign, exp) = match exp.strip_prefix("e-") {
            Some(exp) => ('-', exp),
            None => ('+', &exp[1..]),
        };
        // Pad the exponent with zeros if needed and put it back on the number
        num.push_str(&f!("e{}{:0>pad$}", sign, exp, pad = exp_pad));
        num
    }

    fn fortran(&self, digits: usize, exp_char: char) -> String {
        let digits = digits.max(1);
        let mut num = f!("{:.precision$e}", &self, precision = digits - 1);
        // Safe to `unwrap` as `num` is guaranteed to contain `'e'`
        let exp = num.split_off(num.find('e').unwrap());
        let exponent: i32 = exp[1..].parse().unwrap();

        let negative = num.starts_with('-');
        let mantissa: String = num.chars().filter(char::is_ascii_digit).collect();

        // A zero mantissa keeps a zero exponent, otherwise shifting the
        // decimal point in front of the first digit bumps the exponent by one
        let exponent = if mantissa.bytes().all(|b| b == b'0') {
            0
        } else {
            exponent + 1
        };

        let sign = if exponent < 0 { '-' } else { '+' };
        f!(
            "{}0.{}{}{}{:02}",
            if negative { "-" } else { "" },
            mantissa,
            exp_char,
            sign,
            exponent.abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fortran_normalises_mantissa() {
        assert_eq!((1.0_f32).fortran(8, 'E'), "0.10000000E+01");
        assert_eq!((0.0625_f64).fortran(8, 'E'), "0.62500000E-01");
        assert_eq!((1.0e-10_f64).fortran(8, 'D'), "0.10000000D-09");
    }

    #[test]
    fn fortran_keeps_sign() {
        assert_eq!((-0.5_f64).fortran(4, 'E'), "-0.5000E+00");
    }
}
