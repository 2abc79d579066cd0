//! Execution backends, memory placements and the global aperture policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A device an arena or kernel can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceTarget {
    /// A CUDA device by ordinal.
    Cuda {
        /// Device ordinal.
        device: u32,
    },
    /// An OpenCL device by platform and device index.
    #[serde(rename = "opencl")]
    OpenCl {
        /// Platform index.
        platform: u32,
        /// Device index within the platform.
        device: u32,
    },
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda { device } => write!(f, "cuda:{device}"),
            Self::OpenCl { platform, device } => write!(f, "opencl:{platform}.{device}"),
        }
    }
}

/// Target execution context for a compiled kernel.
///
/// Backends differ only in how logical threads (one per particle) map to
/// physical execution. The mapping never changes numerical results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    /// Single-threaded host loop over particles.
    CpuSerial,
    /// Host thread pool, one task per particle.
    CpuThreaded {
        /// Worker count. `0` uses the global rayon pool.
        #[serde(default)]
        threads: usize,
    },
    /// CUDA grid, one GPU thread per particle.
    Cuda {
        /// Device ordinal.
        device: u32,
    },
    /// OpenCL NDRange, one work item per particle.
    #[serde(rename = "opencl")]
    OpenCl {
        /// Platform index.
        platform: u32,
        /// Device index within the platform.
        device: u32,
    },
}

impl Backend {
    /// Whether kernels for this backend run on the host.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::CpuSerial | Self::CpuThreaded { .. })
    }

    /// Whether this backend is single-threaded host execution.
    ///
    /// Only such kernels expose their internal per-element entry points.
    pub fn is_host_serial(&self) -> bool {
        matches!(self, Self::CpuSerial)
    }

    /// Where memory consumed by kernels for this backend must live.
    pub fn placement(&self) -> Placement {
        match *self {
            Self::CpuSerial | Self::CpuThreaded { .. } => Placement::Host,
            Self::Cuda { device } => Placement::Device(DeviceTarget::Cuda { device }),
            Self::OpenCl { platform, device } => {
                Placement::Device(DeviceTarget::OpenCl { platform, device })
            }
        }
    }

    /// Short identifier used in generated source headers and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CpuSerial => "cpu_serial",
            Self::CpuThreaded { .. } => "cpu_openmp",
            Self::Cuda { .. } => "cuda",
            Self::OpenCl { .. } => "opencl",
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::CpuSerial
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpuSerial => write!(f, "cpu_serial"),
            Self::CpuThreaded { threads: 0 } => write!(f, "cpu_threaded"),
            Self::CpuThreaded { threads } => write!(f, "cpu_threaded({threads})"),
            Self::Cuda { device } => write!(f, "cuda:{device}"),
            Self::OpenCl { platform, device } => write!(f, "opencl:{platform}.{device}"),
        }
    }
}

/// Where the bytes of an arena currently live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Host RAM.
    Host,
    /// Memory owned by a device context.
    Device(DeviceTarget),
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device(target) => write!(f, "{target}"),
        }
    }
}

/// Which element shapes are preceded by the global rectangular aperture check.
///
/// The check marks a particle lost when `|x|` or `|y|` exceeds the
/// configured global limit. It is baked into the synthesized kernel, so
/// the policy is part of the kernel cache key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApertureCheckPolicy {
    /// Only ahead of drift-like shapes.
    #[default]
    DriftOnly,
    /// Ahead of every element.
    AllElements,
    /// Never.
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_backends_place_on_host() {
        assert_eq!(Backend::CpuSerial.placement(), Placement::Host);
        assert_eq!(Backend::CpuThreaded { threads: 4 }.placement(), Placement::Host);
        assert!(Backend::CpuSerial.is_host_serial());
        assert!(!Backend::CpuThreaded { threads: 0 }.is_host_serial());
    }

    #[test]
    fn device_backends_place_on_device() {
        assert_eq!(
            Backend::Cuda { device: 1 }.placement(),
            Placement::Device(DeviceTarget::Cuda { device: 1 })
        );
        assert!(!Backend::OpenCl { platform: 0, device: 0 }.is_host());
    }

    #[test]
    fn backend_deserializes_from_tagged_json() {
        let b: Backend = serde_json::from_str(r#"{"kind":"cpu_threaded","threads":3}"#).unwrap();
        assert_eq!(b, Backend::CpuThreaded { threads: 3 });
        let b: Backend = serde_json::from_str(r#"{"kind":"cpu_serial"}"#).unwrap();
        assert_eq!(b, Backend::CpuSerial);
    }

    #[test]
    fn default_policy_is_drift_only() {
        assert_eq!(ApertureCheckPolicy::default(), ApertureCheckPolicy::DriftOnly);
    }
}
