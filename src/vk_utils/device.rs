use log::{info, trace, warn};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::extensions::{
  ext::DebugUtils,
  khr::{Surface, Swapchain},
};
use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::{FrameError, FrameResult};
use crate::vk_ctx::QueueFamilies;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

fn from_c_str<'a>(s: &'a [c_char]) -> &'a CStr {
  unsafe { CStr::from_ptr(s.as_ptr()) }
}

fn get_app_version() -> u32 {
  let to_u32 = |s: &str| s.parse::<u32>().unwrap_or(0);

  vk::make_api_version(
    0,
    to_u32(env!("CARGO_PKG_VERSION_MAJOR")),
    to_u32(env!("CARGO_PKG_VERSION_MINOR")),
    to_u32(env!("CARGO_PKG_VERSION_PATCH")),
  )
}

fn get_layer_names(entry: &ash::Entry, graphics_debugging: bool) -> Vec<CString> {
  let mut layer_names = Vec::new();
  if !graphics_debugging {
    return layer_names;
  }

  let available = entry
    .enumerate_instance_layer_properties()
    .unwrap_or_default();
  let has_validation = available
    .iter()
    .any(|layer| from_c_str(&layer.layer_name).to_bytes() == VALIDATION_LAYER.as_bytes());

  match (has_validation, CString::new(VALIDATION_LAYER)) {
    (true, Ok(name)) => layer_names.push(name),
    _ => warn!("{} requested, but not installed", VALIDATION_LAYER),
  }
  layer_names
}

fn get_extension_names(
  display_handle: RawDisplayHandle,
  graphics_debugging: bool,
) -> FrameResult<Vec<*const c_char>> {
  let mut names = ash_window::enumerate_required_extensions(display_handle)?.to_vec();
  if graphics_debugging {
    names.push(DebugUtils::name().as_ptr());
  }
  Ok(names)
}

pub fn create_instance(
  entry: &ash::Entry,
  display_handle: RawDisplayHandle,
  graphics_debugging: bool,
) -> FrameResult<ash::Instance> {
  let app_name = CString::new(env!("CARGO_PKG_NAME")).unwrap_or_default();

  // 1.1 for negative viewport height
  let app_info = vk::ApplicationInfo::builder()
    .application_name(&app_name)
    .application_version(get_app_version())
    .api_version(vk::API_VERSION_1_1);

  // https://github.com/EmbarkStudios/kajiya/blob/main/crates/lib/kajiya-backend/src/vulkan/instance.rs#L52
  let layer_names = get_layer_names(entry, graphics_debugging);
  let layers_names_raw: Vec<*const c_char> = layer_names
    .iter()
    .map(|raw_name| raw_name.as_ptr())
    .collect();

  let extension_names_raw = get_extension_names(display_handle, graphics_debugging)?;

  let create_info = vk::InstanceCreateInfo::builder()
    .application_info(&app_info)
    .enabled_layer_names(&layers_names_raw)
    .enabled_extension_names(&extension_names_raw);

  let instance = unsafe { entry.create_instance(&create_info, None)? };
  trace!("Ash instance created");
  Ok(instance)
}

fn find_queue_families(
  instance: &ash::Instance,
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
  phys_device: vk::PhysicalDevice,
) -> FrameResult<Option<QueueFamilies>> {
  let q_props = unsafe { instance.get_physical_device_queue_family_properties(phys_device) };

  let mut graphics = None;
  let mut present = None;
  for (index, q) in q_props.iter().enumerate() {
    let index = index as u32;
    let is_gfx = q.queue_count > 0 && q.queue_flags.contains(vk::QueueFlags::GRAPHICS);
    let is_present_support = unsafe {
      surface_loader.get_physical_device_surface_support(phys_device, index, surface_khr)?
    };

    // one family that can do both is best
    if is_gfx && is_present_support {
      return Ok(Some(QueueFamilies {
        graphics: index,
        present: index,
      }));
    }
    if is_gfx && graphics.is_none() {
      graphics = Some(index);
    }
    if is_present_support && present.is_none() {
      present = Some(index);
    }
  }

  Ok(graphics.zip(present).map(|(graphics, present)| QueueFamilies { graphics, present }))
}

fn supports_swapchain(instance: &ash::Instance, phys_device: vk::PhysicalDevice) -> bool {
  let extensions = unsafe { instance.enumerate_device_extension_properties(phys_device) }
    .unwrap_or_default();
  extensions
    .iter()
    .any(|ext| from_c_str(&ext.extension_name) == Swapchain::name())
}

fn has_surface_formats_and_modes(
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
  phys_device: vk::PhysicalDevice,
) -> FrameResult<bool> {
  let formats =
    unsafe { surface_loader.get_physical_device_surface_formats(phys_device, surface_khr)? };
  let modes =
    unsafe { surface_loader.get_physical_device_surface_present_modes(phys_device, surface_khr)? };
  Ok(!formats.is_empty() && !modes.is_empty())
}

/// Picks physical device e.g. "GeForce GTX 1050 Ti" with queue families that
/// can render and present to `surface_khr`. Discrete GPUs win.
pub fn pick_physical_device(
  instance: &ash::Instance,
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
) -> FrameResult<(vk::PhysicalDevice, QueueFamilies)> {
  let phys_devices = unsafe { instance.enumerate_physical_devices()? };
  trace!("Found {} physical devices", phys_devices.len());

  let mut best: Option<(vk::PhysicalDevice, QueueFamilies, bool)> = None;
  for phys_device in phys_devices {
    if !supports_swapchain(instance, phys_device)
      || !has_surface_formats_and_modes(surface_loader, surface_khr, phys_device)?
    {
      continue;
    }
    let families = match find_queue_families(instance, surface_loader, surface_khr, phys_device)? {
      Some(f) => f,
      None => continue,
    };

    let props = unsafe { instance.get_physical_device_properties(phys_device) };
    let is_discrete = props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
    let replace = match best {
      None => true,
      Some((_, _, best_is_discrete)) => is_discrete && !best_is_discrete,
    };
    if replace {
      best = Some((phys_device, families, is_discrete));
    }
  }

  let (phys_device, families, _) = best.ok_or(FrameError::NoSuitableGpu)?;
  let props = unsafe { instance.get_physical_device_properties(phys_device) };
  info!(
    "Using physical device: {:?}",
    from_c_str(&props.device_name)
  );
  Ok((phys_device, families))
}

/// Logical device with one queue from each (unique) family.
pub fn pick_device_and_queues(
  instance: &ash::Instance,
  phys_device: vk::PhysicalDevice,
  queue_families: &QueueFamilies,
) -> FrameResult<(ash::Device, vk::Queue, vk::Queue)> {
  trace!("Will pick logical device");
  let queue_prio = [1.0f32]; // only one queue per family
  let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
    .unique()
    .into_iter()
    .map(|family| {
      vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(family)
        .queue_priorities(&queue_prio)
        .build()
    })
    .collect();

  let device_extension_names_raw = [Swapchain::name().as_ptr()];
  let features = vk::PhysicalDeviceFeatures::default();
  let device_create_info = vk::DeviceCreateInfo::builder()
    .queue_create_infos(&queue_create_infos)
    .enabled_extension_names(&device_extension_names_raw)
    .enabled_features(&features);

  let device = unsafe { instance.create_device(phys_device, &device_create_info, None)? };
  trace!("Logical device created");

  let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
  let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };
  Ok((device, graphics_queue, present_queue))
}
