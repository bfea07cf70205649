//! Typed ids for welded vertices, input triangles and charts.
//!
//! Every cross-reference between the vertex graph and the chart graph goes
//! through these ids; neither graph holds a pointer into the other. The
//! storage integer is a type parameter (`u32` by default), so very small or
//! very large meshes can pick `u16` or `u64`.

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Integer storage for a mesh id.
///
/// Implemented for `u16`, `u32` and `u64`. The largest value of each type is
/// reserved as the invalid sentinel.
pub trait MeshIndex: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Sentinel for "no element".
    const INVALID: Self;

    /// Narrow a `usize`.
    ///
    /// # Panics
    /// Panics in debug builds if `v` does not fit below the sentinel.
    fn from_usize(v: usize) -> Self;

    /// Widen to `usize`.
    fn to_usize(self) -> usize;
}

macro_rules! impl_mesh_index {
    ($($int:ty),*) => {
        $(
            impl MeshIndex for $int {
                const INVALID: Self = <$int>::MAX;

                #[inline]
                fn from_usize(v: usize) -> Self {
                    debug_assert!(
                        (v as u128) < <$int>::MAX as u128,
                        "id {} does not fit in {}",
                        v,
                        stringify!($int)
                    );
                    v as $int
                }

                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_mesh_index!(u16, u32, u64);

/// Id of a welded vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId<I: MeshIndex = u32>(I);

/// Id of an input triangle, in welded (concatenated batch) order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId<I: MeshIndex = u32>(I);

/// Id of a chart.
///
/// Charts created at initialization share their id with the triangle they
/// wrap; every merge allocates a fresh id past all previous ones.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ChartId<I: MeshIndex = u32>(I);

macro_rules! impl_index_type {
    ($name:ident, $tag:literal) => {
        impl<I: MeshIndex> $name<I> {
            /// Id for slot `index`.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// The sentinel id.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::INVALID)
            }

            /// Slot of this id.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// Whether this is not the sentinel.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != I::INVALID
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $tag, self.index())
                } else {
                    write!(f, "{}(INVALID)", $tag)
                }
            }
        }

        impl<I: MeshIndex> Default for $name<I> {
            fn default() -> Self {
                Self::invalid()
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(FaceId, "F");
impl_index_type!(ChartId, "C");

impl<I: MeshIndex> From<FaceId<I>> for ChartId<I> {
    /// The chart that wraps a single triangle at initialization.
    fn from(face: FaceId<I>) -> Self {
        ChartId(face.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_and_sentinel() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert!(v.is_valid());

        assert!(!VertexId::<u32>::invalid().is_valid());
        assert_eq!(FaceId::<u16>::default(), FaceId::invalid());
    }

    #[test]
    fn test_initial_chart_matches_face() {
        let f: FaceId = FaceId::new(17);
        let c: ChartId = f.into();
        assert_eq!(c.index(), 17);
    }

    #[test]
    fn test_storage_widths() {
        let v: VertexId<u16> = VertexId::new(1000);
        assert_eq!(v.index(), 1000);

        let c: ChartId<u64> = ChartId::new(1 << 40);
        assert_eq!(c.index(), 1 << 40);
    }

    #[test]
    fn test_ids_order_by_slot() {
        let mut ids: Vec<ChartId> = [9, 2, 33].map(ChartId::new).to_vec();
        ids.sort();
        assert_eq!(ids, [2, 9, 33].map(ChartId::<u32>::new));
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexId::<u32>::new(42)), "V(42)");
        assert_eq!(format!("{:?}", ChartId::<u32>::new(7)), "C(7)");
        assert_eq!(format!("{:?}", FaceId::<u32>::invalid()), "F(INVALID)");
    }
}
