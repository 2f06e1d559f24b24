//! Bootstrapping - place long-lived subsystems in one up-front block.
//!
//! An engine sizes every subsystem first, reserves a region per subsystem in
//! a [`GlobalTable`], allocates the table once, and then constructs each
//! subsystem in its region. The allocator state is one such subsystem; see
//! [`AllocatorState::storage_layout`](crate::AllocatorState::storage_layout).
//!
//! ```rust
//! use lifealloc::boot::GlobalTable;
//! use lifealloc::{AllocConfig, AllocatorState, Lifetime};
//!
//! let mut builder = GlobalTable::builder();
//! let alloc_region = builder.reserve(AllocatorState::storage_layout());
//! let table = builder.build().unwrap();
//!
//! let mut state = table.place(alloc_region, AllocatorState::new(AllocConfig::default())).unwrap();
//! state.allocate_bytes(64, Lifetime::APP, None).unwrap();
//! // `state` is torn down in place when dropped, then the table's block is freed.
//! ```

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Identifies a region reserved in a [`GlobalTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(usize);

/// Errors from sizing or binding table regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    /// The combined layout of every region overflows `isize`.
    LayoutOverflow,
    /// The id does not belong to this table.
    UnknownRegion(RegionId),
    /// Something is already placed in the region.
    RegionTaken(RegionId),
    /// The value does not fit the region's reserved layout.
    LayoutMismatch {
        region: RegionId,
        reserved: Layout,
        requested: Layout,
    },
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::LayoutOverflow => write!(f, "global table layout overflows"),
            BootError::UnknownRegion(id) => write!(f, "region {} is not part of this table", id.0),
            BootError::RegionTaken(id) => write!(f, "region {} is already bound", id.0),
            BootError::LayoutMismatch { region, reserved, requested } => write!(
                f,
                "region {} reserved {} bytes aligned to {}, value needs {} aligned to {}",
                region.0,
                reserved.size(),
                reserved.align(),
                requested.size(),
                requested.align()
            ),
        }
    }
}

impl std::error::Error for BootError {}

/// Collects region layouts before the table is allocated.
#[derive(Debug, Default)]
pub struct GlobalTableBuilder {
    regions: Vec<Layout>,
}

impl GlobalTableBuilder {
    /// Reserve a region for a value with `layout`.
    pub fn reserve(&mut self, layout: Layout) -> RegionId {
        self.regions.push(layout);
        RegionId(self.regions.len() - 1)
    }

    /// Reserve a region sized and aligned for `T`.
    pub fn reserve_for<T>(&mut self) -> RegionId {
        self.reserve(Layout::new::<T>())
    }

    /// Lay the regions out back to back and allocate the zeroed block.
    pub fn build(self) -> Result<GlobalTable, BootError> {
        let mut total = Layout::from_size_align(0, 1).map_err(|_| BootError::LayoutOverflow)?;
        let mut regions = Vec::with_capacity(self.regions.len());
        for layout in self.regions {
            let (extended, offset) = total.extend(layout).map_err(|_| BootError::LayoutOverflow)?;
            total = extended;
            regions.push(Region {
                offset,
                layout,
                bound: Cell::new(false),
            });
        }

        // Never ask the system for zero bytes.
        let block_layout = Layout::from_size_align(total.pad_to_align().size().max(1), total.align())
            .map_err(|_| BootError::LayoutOverflow)?;
        // SAFETY: block_layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(block_layout) };
        let Some(base) = NonNull::new(raw) else {
            handle_alloc_error(block_layout);
        };

        #[cfg(feature = "log")]
        log::debug!(
            "lifealloc: global table of {} bytes for {} regions",
            block_layout.size(),
            regions.len()
        );

        Ok(GlobalTable {
            base,
            layout: block_layout,
            regions: regions.into_boxed_slice(),
        })
    }
}

struct Region {
    offset: usize,
    layout: Layout,
    bound: Cell<bool>,
}

/// One zeroed block holding every reserved region.
pub struct GlobalTable {
    base: NonNull<u8>,
    layout: Layout,
    regions: Box<[Region]>,
}

impl GlobalTable {
    /// Start reserving regions.
    pub fn builder() -> GlobalTableBuilder {
        GlobalTableBuilder::default()
    }

    /// Total bytes of the underlying block.
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Number of reserved regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Whether a value is currently placed in `id`.
    pub fn is_bound(&self, id: RegionId) -> bool {
        self.regions.get(id.0).is_some_and(|r| r.bound.get())
    }

    /// Construct `value` in region `id`.
    ///
    /// The value is dropped in place, and the region released, when the
    /// returned handle is dropped.
    pub fn place<T>(&self, id: RegionId, value: T) -> Result<Placed<'_, T>, BootError> {
        let region = self.regions.get(id.0).ok_or(BootError::UnknownRegion(id))?;
        if region.bound.get() {
            return Err(BootError::RegionTaken(id));
        }

        let requested = Layout::new::<T>();
        if requested.size() > region.layout.size() || requested.align() > region.layout.align() {
            return Err(BootError::LayoutMismatch {
                region: id,
                reserved: region.layout,
                requested,
            });
        }

        // SAFETY: `offset` lies inside the block (Layout::extend), the region
        // is large and aligned enough for T, and no other value occupies it.
        let ptr = unsafe {
            let ptr = self.base.as_ptr().add(region.offset).cast::<T>();
            ptr.write(value);
            NonNull::new_unchecked(ptr)
        };
        region.bound.set(true);

        Ok(Placed {
            ptr,
            bound: &region.bound,
            _owns: PhantomData,
        })
    }
}

impl Drop for GlobalTable {
    fn drop(&mut self) {
        // SAFETY: allocated in `build()` with the same layout. Placed handles
        // borrow the table, so none can outlive it.
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

/// A value constructed inside a [`GlobalTable`] region.
pub struct Placed<'t, T> {
    ptr: NonNull<T>,
    bound: &'t Cell<bool>,
    _owns: PhantomData<T>,
}

impl<'t, T> Deref for Placed<'t, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the value was written in `place` and is alive until drop.
        unsafe { self.ptr.as_ref() }
    }
}

impl<'t, T> DerefMut for Placed<'t, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above; the handle is the only path to the value.
        unsafe { self.ptr.as_mut() }
    }
}

impl<'t, T> Drop for Placed<'t, T> {
    fn drop(&mut self) {
        // SAFETY: the value is initialized and dropped exactly once here.
        unsafe { std::ptr::drop_in_place(self.ptr.as_ptr()) };
        self.bound.set(false);
    }
}
