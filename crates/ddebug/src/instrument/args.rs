//! Argument tuples whose elements can be formatted one by one

use std::fmt::Debug;

/// A tuple of `Debug` values.
///
/// Traced functions take their arguments as one tuple so each argument can
/// be printed on its own line; the inspector uses the same trait for
/// multi-value calls.
pub trait DebugTuple {
    fn debug_values(&self) -> Vec<&dyn Debug>;
}

impl DebugTuple for () {
    fn debug_values(&self) -> Vec<&dyn Debug> {
        Vec::new()
    }
}

macro_rules! impl_debug_tuple {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: Debug),+> DebugTuple for ($($name,)+) {
            fn debug_values(&self) -> Vec<&dyn Debug> {
                vec![$(&self.$index as &dyn Debug),+]
            }
        }
    };
}

impl_debug_tuple!(A: 0);
impl_debug_tuple!(A: 0, B: 1);
impl_debug_tuple!(A: 0, B: 1, C: 2);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_debug_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);
