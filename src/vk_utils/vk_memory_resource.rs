use std::marker::{Send, Sync};

// https://gpuopen-librariesandsdks.github.io/VulkanMemoryAllocator/html/choosing_memory_type.html

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VkMemoryPreference {
  /// Usage: vertex, index buffers, depth attachment.
  GpuOnly,
  /// CPU-mapped memory that is read on GPU. Persistently mapped.
  ///
  /// Usage: per-frame uniform buffers.
  GpuMappable,
  /// Temporary allocation used when copying CPU data to GPU-only memory.
  /// No guarantee if it's CPU or GPU. Nor should you care.
  ///
  /// Will be persistently mapped.
  ScratchTransfer,
}

pub fn determine_gpu_allocation_info(
  memory_pref: VkMemoryPreference,
) -> vma::AllocationCreateInfo {
  match memory_pref {
    VkMemoryPreference::GpuOnly => vma::AllocationCreateInfo {
      usage: vma::MemoryUsage::AutoPreferDevice,
      ..Default::default()
    },
    VkMemoryPreference::GpuMappable => vma::AllocationCreateInfo {
      usage: vma::MemoryUsage::AutoPreferDevice,
      flags: vma::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE
        | vma::AllocationCreateFlags::MAPPED,
      ..Default::default()
    },
    VkMemoryPreference::ScratchTransfer => vma::AllocationCreateInfo {
      usage: vma::MemoryUsage::Auto,
      flags: vma::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE
        | vma::AllocationCreateFlags::MAPPED,
      ..Default::default()
    },
  }
}

pub fn get_persistently_mapped_pointer(
  allocator: &vma::Allocator,
  allocation: &vma::Allocation,
) -> Option<MemoryMapPointer> {
  let alloc_info = allocator.get_allocation_info(allocation);
  let ptr = alloc_info.mapped_data;
  if ptr.is_null() {
    None
  } else {
    Some(MemoryMapPointer(ptr as *mut u8))
  }
}

/// Wrapper over a raw pointer to make it moveable and accessible from other threads
#[derive(Debug, Clone, Copy)]
pub struct MemoryMapPointer(pub *mut u8);
unsafe impl Send for MemoryMapPointer {}
unsafe impl Sync for MemoryMapPointer {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scratch_memory_is_mapped() {
    let info = determine_gpu_allocation_info(VkMemoryPreference::ScratchTransfer);
    assert!(info.flags.contains(vma::AllocationCreateFlags::MAPPED));
    assert!(info
      .flags
      .contains(vma::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE));
  }

  #[test]
  fn test_uniform_memory_prefers_device_and_is_mapped() {
    let info = determine_gpu_allocation_info(VkMemoryPreference::GpuMappable);
    assert!(matches!(info.usage, vma::MemoryUsage::AutoPreferDevice));
    assert!(info.flags.contains(vma::AllocationCreateFlags::MAPPED));
  }

  #[test]
  fn test_gpu_only_memory_is_not_mapped() {
    let info = determine_gpu_allocation_info(VkMemoryPreference::GpuOnly);
    assert!(!info.flags.contains(vma::AllocationCreateFlags::MAPPED));
  }
}
