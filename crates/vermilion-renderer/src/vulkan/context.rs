//! Device context: instance, physical-device selection, logical device,
//! queues, and the shared per-frame synchronization primitives.

use ash::khr::{surface, swapchain};
use ash::{vk, Device, Entry, Instance};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use vermilion_common::{AppInfo, Config};

use super::error::{RenderError, RenderResult};
use super::{ENGINE_NAME, ENGINE_VERSION, MAX_INFLIGHT, REQUIRED_VK_VERSION};
use crate::window::WindowSource;

/// Validation behavior, resolved once at init time.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub wanted_layers: Vec<CString>,
    /// Apply debug labels to created objects when the tooling is present.
    pub debug_markers: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wanted_layers: vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()],
            debug_markers: true,
        }
    }
}

impl ValidationConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Queue family indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
    pub compute: Option<u32>,
    pub transfer: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some()
            && self.present.is_some()
            && self.compute.is_some()
            && self.transfer.is_some()
    }
}

/// Chosen swapchain settings for a surface, with the rating the device
/// selection uses.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SwapSupport {
    pub caps: vk::SurfaceCapabilitiesKHR,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub score: i64,
}

const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Rate a surface's swapchain support and pick its settings.
///
/// `None` means the swapchain is unusable on this device (no formats or no
/// present modes).
pub(crate) fn rate_swap_support(
    caps: vk::SurfaceCapabilitiesKHR,
    formats: &[vk::SurfaceFormatKHR],
    modes: &[vk::PresentModeKHR],
) -> Option<SwapSupport> {
    if formats.is_empty() || modes.is_empty() {
        return None;
    }

    let mut score = 0i64;

    let format = if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        // No preferred format reported: the driver takes whatever we ask for.
        score += 200;
        PREFERRED_SURFACE_FORMAT
    } else {
        let mut best = formats[0];
        for candidate in formats {
            if candidate.format == PREFERRED_SURFACE_FORMAT.format
                && candidate.color_space == PREFERRED_SURFACE_FORMAT.color_space
            {
                best = *candidate;
                score += 100;
                break;
            }
        }
        best
    };

    // FIFO is always available as the fallback.
    let mut present_mode = vk::PresentModeKHR::FIFO;
    for &mode in modes {
        if mode == vk::PresentModeKHR::MAILBOX {
            present_mode = mode;
            score += 500;
            break;
        } else if mode == vk::PresentModeKHR::IMMEDIATE {
            present_mode = mode;
            score += 300;
            break;
        }
    }

    score += caps.max_image_extent.width as i64 + caps.max_image_extent.height as i64;

    Some(SwapSupport {
        caps,
        format,
        present_mode,
        score,
    })
}

/// Rate one physical device, or `None` if it fails a hard requirement.
pub(crate) fn rate_device(
    device_type: vk::PhysicalDeviceType,
    features: &vk::PhysicalDeviceFeatures,
    families: QueueFamilyIndices,
    has_required_extensions: bool,
    swap_score: Option<i64>,
) -> Option<i64> {
    // Disqualifications first.
    if features.image_cube_array == vk::FALSE {
        return None;
    }
    if !families.is_complete() {
        return None;
    }
    if !has_required_extensions {
        return None;
    }
    let swap_score = swap_score?;

    let mut score = 0i64;
    if device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        score += 10_000;
    }
    if features.sampler_anisotropy == vk::TRUE {
        score += 100;
    }
    score += swap_score * 2;
    Some(score)
}

/// Main context holding everything the resource managers and the screen
/// subsystem share.
pub struct DeviceContext {
    pub entry: Entry,
    pub instance: Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_families: QueueFamilyIndices,

    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub compute_queue: vk::Queue,
    pub transfer_queue: vk::Queue,

    pub surface_loader: surface::Instance,
    pub swapchain_loader: swapchain::Device,

    pub device_properties: vk::PhysicalDeviceProperties,
    pub device_features: vk::PhysicalDeviceFeatures,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,

    /// Pool for one-shot and presentation command buffers.
    pub general_pool: vk::CommandPool,
    pub in_flight_fences: [vk::Fence; MAX_INFLIGHT],

    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    debug_names: Option<ash::ext::debug_utils::Device>,
}

impl DeviceContext {
    /// Bring up the instance and device, returning the context together with
    /// the surface created for `window` (the screen subsystem takes it over).
    ///
    /// # Safety
    /// The window's handles must stay valid for the lifetime of the context.
    pub unsafe fn new<W: WindowSource>(
        window: &W,
        app_info: &AppInfo,
        config: &Config,
        validation: ValidationConfig,
    ) -> RenderResult<(Self, vk::SurfaceKHR)> {
        let entry = Entry::linked();

        if validation.enabled {
            check_layer_support(&entry, &validation.wanted_layers)?;
        }

        let display_handle = window.raw_display_handle()?;
        let instance = create_instance(&entry, display_handle, app_info, &validation)?;

        let (debug_utils, debug_messenger) = if validation.enabled {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_callback));
            let messenger = loader
                .create_debug_utils_messenger(&info, None)
                .map_err(|e| RenderError::driver("vkCreateDebugUtilsMessengerEXT", e))?;
            (Some(loader), Some(messenger))
        } else {
            (None, None)
        };

        let surface_loader = surface::Instance::new(&entry, &instance);
        let surface_handle = ash_window::create_surface(
            &entry,
            &instance,
            display_handle,
            window.raw_window_handle()?,
            None,
        )
        .map_err(|e| RenderError::driver("vkCreateSurfaceKHR", e))?;

        let physical_device =
            pick_physical_device(&instance, &surface_loader, surface_handle, config)?;

        let device_properties = instance.get_physical_device_properties(physical_device);
        let device_features = instance.get_physical_device_features(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        let queue_families =
            find_queue_families(&instance, physical_device, &surface_loader, surface_handle);
        if !queue_families.is_complete() {
            return Err(RenderError::unsupported(
                "selected device is missing a graphics, present, compute, or transfer queue",
            ));
        }

        let (device, graphics_queue, present_queue, compute_queue, transfer_queue) =
            create_logical_device(&instance, physical_device, &device_features, queue_families)?;

        let swapchain_loader = swapchain::Device::new(&instance, &device);

        let debug_names = if validation.enabled && validation.debug_markers {
            Some(ash::ext::debug_utils::Device::new(&instance, &device))
        } else {
            None
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_families.graphics.unwrap_or(0));
        let general_pool = device
            .create_command_pool(&pool_info, None)
            .map_err(|e| RenderError::driver("vkCreateCommandPool", e))?;

        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let mut in_flight_fences = [vk::Fence::null(); MAX_INFLIGHT];
        for fence in &mut in_flight_fences {
            *fence = device
                .create_fence(&fence_info, None)
                .map_err(|e| RenderError::driver("vkCreateFence", e))?;
        }

        Ok((
            Self {
                entry,
                instance,
                physical_device,
                device,
                queue_families,
                graphics_queue,
                present_queue,
                compute_queue,
                transfer_queue,
                surface_loader,
                swapchain_loader,
                device_properties,
                device_features,
                memory_properties,
                general_pool,
                in_flight_fences,
                debug_utils,
                debug_messenger,
                debug_names,
            },
            surface_handle,
        ))
    }

    /// Query and rate the swapchain support of the context's device against
    /// `surface`.
    pub(crate) unsafe fn swap_support(
        &self,
        surface_handle: vk::SurfaceKHR,
    ) -> RenderResult<SwapSupport> {
        let caps = self
            .surface_loader
            .get_physical_device_surface_capabilities(self.physical_device, surface_handle)
            .map_err(|e| RenderError::driver("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
        let formats = self
            .surface_loader
            .get_physical_device_surface_formats(self.physical_device, surface_handle)
            .map_err(|e| RenderError::driver("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
        let modes = self
            .surface_loader
            .get_physical_device_surface_present_modes(self.physical_device, surface_handle)
            .map_err(|e| RenderError::driver("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?;

        rate_swap_support(caps, &formats, &modes)
            .ok_or_else(|| RenderError::unsupported("surface reports no formats or present modes"))
    }

    /// Attach a debugger-visible name to a Vulkan object. No-op unless
    /// validation with debug markers is active.
    pub unsafe fn set_debug_name<T: vk::Handle>(&self, object: T, label: &str) {
        if let Some(names) = &self.debug_names {
            let Ok(name) = CString::new(label) else {
                return;
            };
            let info = vk::DebugUtilsObjectNameInfoEXT::default()
                .object_handle(object)
                .object_name(&name);
            let _ = names.set_debug_utils_object_name(&info);
        }
    }

    /// Block until every queue on the device drains.
    pub fn wait_idle(&self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.wait_idle();

            for fence in self.in_flight_fences {
                self.device.destroy_fence(fence, None);
            }
            self.device.destroy_command_pool(self.general_pool, None);
            self.device.destroy_device(None);

            if let (Some(loader), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Fail unless every wanted layer is installed.
unsafe fn check_layer_support(entry: &Entry, wanted: &[CString]) -> RenderResult<()> {
    let available = entry
        .enumerate_instance_layer_properties()
        .map_err(|e| RenderError::driver("vkEnumerateInstanceLayerProperties", e))?;

    for layer in &available {
        let name = CStr::from_ptr(layer.layer_name.as_ptr());
        log::debug!("instance layer available: {:?}", name);
    }

    for wanted_layer in wanted {
        let found = available
            .iter()
            .any(|l| CStr::from_ptr(l.layer_name.as_ptr()) == wanted_layer.as_c_str());
        if !found {
            return Err(RenderError::unsupported(format!(
                "validation requested but layer {:?} is not installed",
                wanted_layer
            )));
        }
    }
    Ok(())
}

unsafe fn create_instance(
    entry: &Entry,
    display_handle: raw_window_handle::RawDisplayHandle,
    app_info: &AppInfo,
    validation: &ValidationConfig,
) -> RenderResult<Instance> {
    let app_name = CString::new(app_info.name.as_str())
        .map_err(|_| RenderError::unsupported("application name contains an interior NUL"))?;

    let vk_app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(
            0,
            app_info.version.major,
            app_info.version.minor,
            app_info.version.patch,
        ))
        .engine_name(ENGINE_NAME)
        .engine_version(ENGINE_VERSION)
        .api_version(REQUIRED_VK_VERSION);

    let mut extensions = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| RenderError::driver("vkEnumerateInstanceExtensionProperties", e))?
        .to_vec();
    if validation.enabled {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    for &ext in &extensions {
        log::debug!("instance extension requested: {:?}", CStr::from_ptr(ext));
    }

    let layer_ptrs: Vec<*const c_char> = if validation.enabled {
        validation.wanted_layers.iter().map(|l| l.as_ptr()).collect()
    } else {
        Vec::new()
    };

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&vk_app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layer_ptrs);

    entry
        .create_instance(&create_info, None)
        .map_err(|e| RenderError::driver("vkCreateInstance", e))
}

unsafe fn find_queue_families(
    instance: &Instance,
    device: vk::PhysicalDevice,
    surface_loader: &surface::Instance,
    surface_handle: vk::SurfaceKHR,
) -> QueueFamilyIndices {
    let families = instance.get_physical_device_queue_family_properties(device);
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        if family.queue_count == 0 {
            continue;
        }
        let i = i as u32;

        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(i);
        }
        if family.queue_flags.contains(vk::QueueFlags::COMPUTE) {
            indices.compute = Some(i);
        }
        if family.queue_flags.contains(vk::QueueFlags::TRANSFER) {
            indices.transfer = Some(i);
        }
        if surface_loader
            .get_physical_device_surface_support(device, i, surface_handle)
            .unwrap_or(false)
        {
            indices.present = Some(i);
        }

        if indices.is_complete() {
            break;
        }
    }
    indices
}

unsafe fn has_required_extensions(instance: &Instance, device: vk::PhysicalDevice) -> bool {
    let Ok(available) = instance.enumerate_device_extension_properties(device) else {
        return false;
    };
    available
        .iter()
        .any(|e| CStr::from_ptr(e.extension_name.as_ptr()) == swapchain::NAME)
}

unsafe fn pick_physical_device(
    instance: &Instance,
    surface_loader: &surface::Instance,
    surface_handle: vk::SurfaceKHR,
    config: &Config,
) -> RenderResult<vk::PhysicalDevice> {
    let devices = instance
        .enumerate_physical_devices()
        .map_err(|e| RenderError::driver("vkEnumeratePhysicalDevices", e))?;
    if devices.is_empty() {
        return Err(RenderError::unsupported("no Vulkan-capable GPU found"));
    }

    // A valid user override skips scoring entirely; out-of-range falls back
    // to the automatic pick.
    let preferred = config.number("GPUIndex", -1.0) as i64;
    if preferred >= 0 && (preferred as usize) < devices.len() {
        let chosen = devices[preferred as usize];
        log_selected_device(instance, chosen, "config override");
        return Ok(chosen);
    }

    let mut best: Option<(vk::PhysicalDevice, i64)> = None;
    for &device in &devices {
        let props = instance.get_physical_device_properties(device);
        let features = instance.get_physical_device_features(device);
        let families = find_queue_families(instance, device, surface_loader, surface_handle);
        let extensions_ok = has_required_extensions(instance, device);

        let swap_score = query_swap_score(surface_loader, device, surface_handle);
        let Some(score) = rate_device(
            props.device_type,
            &features,
            families,
            extensions_ok,
            swap_score,
        ) else {
            continue;
        };

        // Ties keep the earlier device.
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((device, score));
        }
    }

    let (chosen, _) = best.ok_or_else(|| {
        RenderError::unsupported("could not automatically find a suitable graphics card")
    })?;
    log_selected_device(instance, chosen, "auto");
    Ok(chosen)
}

unsafe fn query_swap_score(
    surface_loader: &surface::Instance,
    device: vk::PhysicalDevice,
    surface_handle: vk::SurfaceKHR,
) -> Option<i64> {
    let caps = surface_loader
        .get_physical_device_surface_capabilities(device, surface_handle)
        .ok()?;
    let formats = surface_loader
        .get_physical_device_surface_formats(device, surface_handle)
        .ok()?;
    let modes = surface_loader
        .get_physical_device_surface_present_modes(device, surface_handle)
        .ok()?;
    rate_swap_support(caps, &formats, &modes).map(|s| s.score)
}

unsafe fn log_selected_device(instance: &Instance, device: vk::PhysicalDevice, how: &str) {
    let props = instance.get_physical_device_properties(device);
    let name = CStr::from_ptr(props.device_name.as_ptr());
    log::info!("selected GPU ({}): {:?}", how, name);
}

#[allow(clippy::type_complexity)]
unsafe fn create_logical_device(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    supported_features: &vk::PhysicalDeviceFeatures,
    families: QueueFamilyIndices,
) -> RenderResult<(Device, vk::Queue, vk::Queue, vk::Queue, vk::Queue)> {
    let graphics = families.graphics.expect("checked by caller");
    let present = families.present.expect("checked by caller");
    let compute = families.compute.expect("checked by caller");
    let transfer = families.transfer.expect("checked by caller");

    // One queue per unique family among graphics/present/compute. Transfer
    // rides along with whichever of those shares its family.
    let mut unique_families = vec![graphics];
    for family in [present, compute] {
        if !unique_families.contains(&family) {
            unique_families.push(family);
        }
    }

    let priorities = [1.0f32];
    let queue_infos: Vec<_> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities)
        })
        .collect();

    let extensions = [swapchain::NAME.as_ptr()];

    let mut enabled = vk::PhysicalDeviceFeatures::default().image_cube_array(true);
    if supported_features.sampler_anisotropy == vk::TRUE {
        enabled = enabled.sampler_anisotropy(true);
    }

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extensions)
        .enabled_features(&enabled);

    let device = instance
        .create_device(physical_device, &create_info, None)
        .map_err(|e| RenderError::driver("vkCreateDevice", e))?;

    let graphics_queue = device.get_device_queue(graphics, 0);
    let present_queue = device.get_device_queue(present, 0);
    let compute_queue = device.get_device_queue(compute, 0);
    let transfer_queue = if unique_families.contains(&transfer) {
        device.get_device_queue(transfer, 0)
    } else {
        graphics_queue
    };

    Ok((
        device,
        graphics_queue,
        present_queue,
        compute_queue,
        transfer_queue,
    ))
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _ty: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*data).p_message).to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("validation: {}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("validation: {}", message);
    } else {
        log::debug!("validation: {}", message);
    }
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with_extent(width: u32, height: u32) -> vk::SurfaceCapabilitiesKHR {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.max_image_extent = vk::Extent2D { width, height };
        caps
    }

    fn full_features() -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default()
            .image_cube_array(true)
            .sampler_anisotropy(true)
    }

    fn complete_families() -> QueueFamilyIndices {
        QueueFamilyIndices {
            graphics: Some(0),
            present: Some(0),
            compute: Some(0),
            transfer: Some(0),
        }
    }

    #[test]
    fn test_swap_support_rejects_empty_lists() {
        let caps = caps_with_extent(100, 100);
        let format = PREFERRED_SURFACE_FORMAT;
        assert!(rate_swap_support(caps, &[], &[vk::PresentModeKHR::FIFO]).is_none());
        assert!(rate_swap_support(caps, &[format], &[]).is_none());
    }

    #[test]
    fn test_swap_support_no_preferred_format_bonus() {
        let caps = caps_with_extent(0, 0);
        let undefined = vk::SurfaceFormatKHR {
            format: vk::Format::UNDEFINED,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let support =
            rate_swap_support(caps, &[undefined], &[vk::PresentModeKHR::FIFO]).unwrap();
        assert_eq!(support.score, 200);
        assert_eq!(support.format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(support.present_mode, vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_swap_support_credits_preferred_format_before_break() {
        let caps = caps_with_extent(0, 0);
        let other = vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let support = rate_swap_support(
            caps,
            &[other, PREFERRED_SURFACE_FORMAT],
            &[vk::PresentModeKHR::FIFO],
        )
        .unwrap();
        assert_eq!(support.score, 100);
        assert_eq!(support.format.format, PREFERRED_SURFACE_FORMAT.format);
        assert_eq!(
            support.format.color_space,
            PREFERRED_SURFACE_FORMAT.color_space
        );
    }

    #[test]
    fn test_swap_support_unmatched_format_scores_zero() {
        let caps = caps_with_extent(0, 0);
        let other = vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let support = rate_swap_support(caps, &[other], &[vk::PresentModeKHR::FIFO]).unwrap();
        assert_eq!(support.score, 0);
        assert_eq!(support.format.format, other.format);
    }

    #[test]
    fn test_swap_support_present_mode_bonuses() {
        let caps = caps_with_extent(0, 0);
        let formats = [PREFERRED_SURFACE_FORMAT];

        let mailbox = rate_swap_support(
            caps,
            &formats,
            &[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        )
        .unwrap();
        assert_eq!(mailbox.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(mailbox.score, 100 + 500);

        let immediate =
            rate_swap_support(caps, &formats, &[vk::PresentModeKHR::IMMEDIATE]).unwrap();
        assert_eq!(immediate.present_mode, vk::PresentModeKHR::IMMEDIATE);
        assert_eq!(immediate.score, 100 + 300);

        let fifo = rate_swap_support(caps, &formats, &[vk::PresentModeKHR::FIFO]).unwrap();
        assert_eq!(fifo.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(fifo.score, 100);
    }

    #[test]
    fn test_swap_support_adds_max_extent() {
        let caps = caps_with_extent(1920, 1080);
        let support =
            rate_swap_support(caps, &[PREFERRED_SURFACE_FORMAT], &[vk::PresentModeKHR::FIFO])
                .unwrap();
        assert_eq!(support.score, 100 + 1920 + 1080);
    }

    #[test]
    fn test_rate_device_disqualifications() {
        let no_cube = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);
        assert_eq!(
            rate_device(
                vk::PhysicalDeviceType::DISCRETE_GPU,
                &no_cube,
                complete_families(),
                true,
                Some(0),
            ),
            None
        );

        let incomplete = QueueFamilyIndices {
            graphics: Some(0),
            ..Default::default()
        };
        assert_eq!(
            rate_device(
                vk::PhysicalDeviceType::DISCRETE_GPU,
                &full_features(),
                incomplete,
                true,
                Some(0),
            ),
            None
        );

        assert_eq!(
            rate_device(
                vk::PhysicalDeviceType::DISCRETE_GPU,
                &full_features(),
                complete_families(),
                false,
                Some(0),
            ),
            None
        );

        assert_eq!(
            rate_device(
                vk::PhysicalDeviceType::DISCRETE_GPU,
                &full_features(),
                complete_families(),
                true,
                None,
            ),
            None
        );
    }

    #[test]
    fn test_rate_device_score_composition() {
        // Discrete + anisotropy + swapchain score counted twice.
        let score = rate_device(
            vk::PhysicalDeviceType::DISCRETE_GPU,
            &full_features(),
            complete_families(),
            true,
            Some(700),
        )
        .unwrap();
        assert_eq!(score, 10_000 + 100 + 1400);

        let integrated = rate_device(
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            &full_features(),
            complete_families(),
            true,
            Some(700),
        )
        .unwrap();
        assert!(score > integrated);
    }
}
