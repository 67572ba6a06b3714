use std::os::raw::c_uint;

/// Controls how host memory of a matrix is allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostMemOption {
    /// Ordinary pageable memory. Transfers go through a driver staging buffer.
    NotPinned,
    /// Page-locked, write-combined memory. Fast for the host to write and the device to read,
    /// very slow for the host to read.
    WriteOptimized,
    /// Page-locked memory suitable for transfers in either direction.
    RwOptimized,
}

impl Default for HostMemOption {
    fn default() -> Self {
        HostMemOption::RwOptimized
    }
}

impl HostMemOption {
    /// Returns true if this option requests page-locked memory.
    pub fn is_pinned(self) -> bool {
        self != HostMemOption::NotPinned
    }

    /// The page-locked allocation flags this option maps to. Empty for pageable memory.
    pub fn alloc_flags(self) -> HostAllocFlags {
        match self {
            HostMemOption::NotPinned => HostAllocFlags::empty(),
            HostMemOption::WriteOptimized => {
                HostAllocFlags::PORTABLE | HostAllocFlags::DEVICEMAP | HostAllocFlags::WRITECOMBINED
            }
            HostMemOption::RwOptimized => HostAllocFlags::PORTABLE | HostAllocFlags::DEVICEMAP,
        }
    }
}

bitflags! {
    /// Flags for page-locked host allocations.
    pub struct HostAllocFlags: c_uint {
        /// The memory is considered page-locked by every context, not only the allocating one.
        const PORTABLE = 0x01;

        /// Map the allocation into the device address space, so the device can read and write
        /// it without a copy.
        const DEVICEMAP = 0x02;

        /// Allocate write-combined memory. Writes from the host bypass its caches, which makes
        /// host reads very slow.
        const WRITECOMBINED = 0x04;
    }
}

/// Hints how kernels will access the device memory of a matrix.
///
/// Only consulted when the device half is allocated independently; an aliased device half has
/// the access pattern of the host buffer it views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceMemOption {
    /// Kernels read and write the memory.
    ReadWrite,
    /// Kernels only write the memory.
    WriteOnly,
    /// Kernels only read the memory.
    ReadOnly,
}

impl Default for DeviceMemOption {
    fn default() -> Self {
        DeviceMemOption::ReadWrite
    }
}

/// Where the primary copy of a container's data lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Device memory.
    Device,
    /// Host memory.
    Host,
    /// Device image (texture) memory.
    Image,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_common_usage() {
        assert_eq!(HostMemOption::RwOptimized, HostMemOption::default());
        assert_eq!(DeviceMemOption::ReadWrite, DeviceMemOption::default());
    }

    #[test]
    fn pageable_memory_has_no_flags() {
        assert!(!HostMemOption::NotPinned.is_pinned());
        assert!(HostMemOption::NotPinned.alloc_flags().is_empty());
    }

    #[test]
    fn write_optimized_is_write_combined() {
        let flags = HostMemOption::WriteOptimized.alloc_flags();
        assert!(flags.contains(HostAllocFlags::WRITECOMBINED | HostAllocFlags::DEVICEMAP));
        assert!(!HostMemOption::RwOptimized
            .alloc_flags()
            .contains(HostAllocFlags::WRITECOMBINED));
    }
}
