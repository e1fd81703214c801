//! Target description: architecture, platform, and enabled CPU features.
//!
//! Every encoder entry point takes an [`Environment`] by reference and
//! consults `features` before accepting a form that needs an extension.
//! This is the concrete mechanism behind the encoder "validation floor"
//! (rejecting forms whose required extension isn't enabled).

use core::fmt;
use target_lexicon::{Architecture, OperatingSystem, Triple};

/// Target instruction-set architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 32-bit x86. Encoders in this crate do not target it directly, but
    /// it shares the legacy/VEX prefix machinery with `X86_64`.
    X86,
    /// x86-64 ("amd64").
    X86_64,
    /// 64-bit ARM.
    Aarch64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        })
    }
}

/// Host operating system, relevant to the Runtime's W^X strategy and the
/// calling convention catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Macos,
    Windows,
    Freebsd,
    Other,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
            Platform::Freebsd => "freebsd",
            Platform::Other => "other",
        })
    }
}

macro_rules! cpu_features {
    ($( $(#[$meta:meta])* $name:ident => $bit:expr ),+ $(,)?) => {
        /// A bitset of CPU extension flags gating which encoder forms are
        /// accepted. Modeled as a raw bitmask (rather than pulling in
        /// `bitflags` for a single use site) in the same texture as this
        /// crate's register-unit masks.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct CpuFeatureSet(u64);

        impl CpuFeatureSet {
            /// The empty feature set.
            pub const fn empty() -> Self {
                CpuFeatureSet(0)
            }

            $(
                $(#[$meta])*
                pub const fn $name(self) -> bool {
                    self.0 & (1 << $bit) != 0
                }
            )+

            /// Set `feature` to enabled and return `self`.
            pub fn with(mut self, feature: CpuFeature) -> Self {
                self.0 |= 1 << (feature as u32);
                self
            }

            /// Report whether `feature` is enabled.
            pub fn has(self, feature: CpuFeature) -> bool {
                self.0 & (1 << (feature as u32)) != 0
            }
        }
    };
}

cpu_features! {
    /// SSE2 (baseline on all supported x86-64 CPUs).
    sse2 => 0,
    /// SSE4.1.
    sse4_1 => 1,
    /// AVX.
    avx => 2,
    /// AVX2.
    avx2 => 3,
    /// AVX-512 foundation.
    avx512f => 4,
    /// FMA3.
    fma => 5,
    /// BMI1/BMI2.
    bmi => 6,
    /// AArch64 NEON (Advanced SIMD), baseline on all AArch64 CPUs.
    neon => 7,
    /// AArch64 CRC32 extension.
    crc32 => 8,
    /// AES extension (x86 AES-NI or AArch64 Crypto AES).
    aes => 9,
    /// SHA2 extension (x86 SHA or AArch64 Crypto SHA2).
    sha2 => 10,
}

/// Enumerates a single feature for use with [`CpuFeatureSet::with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CpuFeature {
    Sse2 = 0,
    Sse41 = 1,
    Avx = 2,
    Avx2 = 3,
    Avx512f = 4,
    Fma = 5,
    Bmi = 6,
    Neon = 7,
    Crc32 = 8,
    Aes = 9,
    Sha2 = 10,
}

/// The tuple of architecture, platform, and enabled CPU features that
/// every encoder and ABI decision in this crate is made against.
#[derive(Debug, Clone, Copy)]
pub struct Environment {
    /// Target architecture.
    pub arch: Arch,
    /// Target platform, relevant to calling convention selection and the
    /// Runtime's W^X strategy.
    pub platform: Platform,
    /// Enabled CPU extensions.
    pub features: CpuFeatureSet,
}

impl Environment {
    /// Build an `Environment` for an explicit architecture/platform with
    /// no optional features enabled beyond the architecture's baseline.
    pub fn new(arch: Arch, platform: Platform) -> Self {
        let features = match arch {
            Arch::X86 | Arch::X86_64 => CpuFeatureSet::empty().with(CpuFeature::Sse2),
            Arch::Aarch64 => CpuFeatureSet::empty().with(CpuFeature::Neon),
        };
        Environment {
            arch,
            platform,
            features,
        }
    }

    /// Probe the running process's host triple and CPU, the way
    /// `cranelift_native::builder()` does, and build a matching
    /// `Environment`.
    pub fn host() -> Self {
        let triple = Triple::host();
        let arch = match triple.architecture {
            Architecture::X86_64 => Arch::X86_64,
            Architecture::X86_32(_) => Arch::X86,
            Architecture::Aarch64(_) => Arch::Aarch64,
            other => panic!("unsupported host architecture: {other:?}"),
        };
        let platform = match triple.operating_system {
            OperatingSystem::Linux => Platform::Linux,
            OperatingSystem::Darwin(_) | OperatingSystem::MacOSX(_) => Platform::Macos,
            OperatingSystem::Windows => Platform::Windows,
            OperatingSystem::Freebsd => Platform::Freebsd,
            _ => Platform::Other,
        };
        let mut env = Environment::new(arch, platform);
        env.features = detect_host_features(arch);
        env
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect_host_features(arch: Arch) -> CpuFeatureSet {
    let mut set = CpuFeatureSet::empty().with(CpuFeature::Sse2);
    let cpuid = raw_cpuid::CpuId::new();
    if let Some(info) = cpuid.get_feature_info() {
        if info.has_sse41() {
            set = set.with(CpuFeature::Sse41);
        }
        if info.has_avx() {
            set = set.with(CpuFeature::Avx);
        }
        if info.has_aesni() {
            set = set.with(CpuFeature::Aes);
        }
    }
    if let Some(info) = cpuid.get_extended_feature_info() {
        if info.has_avx2() {
            set = set.with(CpuFeature::Avx2);
        }
        if info.has_avx512f() {
            set = set.with(CpuFeature::Avx512f);
        }
        if info.has_bmi1() && info.has_bmi2() {
            set = set.with(CpuFeature::Bmi);
        }
        if info.has_sha() {
            set = set.with(CpuFeature::Sha2);
        }
    }
    let _ = arch;
    set
}

#[cfg(target_arch = "aarch64")]
fn detect_host_features(_arch: Arch) -> CpuFeatureSet {
    // No portable AArch64 cpuid probe in std; NEON is a mandatory baseline
    // extension on every AArch64 implementation we target (AAPCS64 and
    // the Apple variant both require it), so it is the only feature we
    // can claim without a platform-specific hwcap read.
    CpuFeatureSet::empty().with(CpuFeature::Neon)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_host_features(_arch: Arch) -> CpuFeatureSet {
    CpuFeatureSet::empty()
}
