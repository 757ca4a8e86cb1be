//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::{Debug, Display};

/// Trait for types that can be stored in a raster cell.
///
/// Land-use maps and masks are read as integers; the float
/// implementations exist so continuous layers can share the same I/O.
pub trait RasterElement:
    Copy + Debug + Display + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, rejecting values the type cannot hold exactly
    fn from_f64(value: f64) -> Option<Self>;
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn from_f64(value: f64) -> Option<Self> {
                if value.fract() != 0.0 {
                    return None;
                }
                NumCast::from(value)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn from_f64(value: f64) -> Option<Self> {
                NumCast::from(value)
            }
        }
    };
}

impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_from_f64_rejects_fractions() {
        assert_eq!(<i32 as RasterElement>::from_f64(7.0), Some(7));
        assert_eq!(<i32 as RasterElement>::from_f64(7.5), None);
        assert_eq!(<u8 as RasterElement>::from_f64(-1.0), None);
    }

    #[test]
    fn test_nodata() {
        assert!((-9999_i32).is_nodata(Some(-9999)));
        assert!(!3_i32.is_nodata(None));
        assert!(f64::NAN.is_nodata(None));
    }
}
