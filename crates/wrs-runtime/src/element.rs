use core::fmt::Debug;

use crate::layout::ScalarType;

/// A scalar that occupies exactly one 32-bit buffer word.
pub trait Element:
    bytemuck::Pod + Debug + PartialEq + PartialOrd + Send + Sync + 'static
{
    /// The scalar type used when describing buffer layouts.
    const SCALAR: ScalarType;

    /// Reinterpret the value as a buffer word.
    fn to_word(self) -> u32 {
        bytemuck::cast(self)
    }

    /// Reinterpret a buffer word as a value.
    fn from_word(word: u32) -> Self {
        bytemuck::cast(word)
    }
}

/// An element that can be accumulated.
pub trait Numeric: Element + num_traits::Zero + num_traits::FromPrimitive {
    /// Adds two values. Integer types wrap on overflow.
    fn accumulate(self, rhs: Self) -> Self;
}

/// A floating point element.
pub trait Float: Numeric + num_traits::Float {
    /// Divides the value by an element count.
    fn divide_by_count(self, count: usize) -> Self {
        match Self::from_usize(count) {
            Some(count) => self / count,
            None => Self::nan(),
        }
    }
}

macro_rules! impl_element {
    ($ty:ty, $scalar:ident) => {
        impl Element for $ty {
            const SCALAR: ScalarType = ScalarType::$scalar;
        }
    };
}

impl_element!(f32, F32);
impl_element!(u32, U32);
impl_element!(i32, I32);

impl Numeric for f32 {
    fn accumulate(self, rhs: Self) -> Self {
        self + rhs
    }
}

impl Numeric for u32 {
    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl Numeric for i32 {
    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl Float for f32 {}
