//! Reader of `config/platforms.toml`.

#![deny(warnings)]

use serde_derive::Deserialize;
use std::{
    collections::{BTreeMap, HashSet},
    fmt, fs,
    path::{Path, PathBuf},
};

/// How PSCI calls reach the firmware.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PsciConduit {
    Hvc,
    Smc,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UartModel {
    Pl011,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UartConfig {
    pub model: UartModel,
    pub base: u64,
}

/// One PCI host controller.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PciHost {
    pub name: String,
    pub ecam_base: u64,
    pub io_base: u64,
    pub mem32_base: u64,
    pub mem64_base: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub name: String,
    pub nr_cpus: usize,
    pub boot_cpu: usize,
    /// MPIDR of each core, indexed by core number.
    pub cpu_map: Vec<u64>,
    pub log_level: String,
    pub psci: PsciConduit,
    pub uart: UartConfig,
    pub pci_hosts: Vec<PciHost>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    UnknownPlatform(String),
    NoCpus,
    BootCpuOutOfRange { boot_cpu: usize, nr_cpus: usize },
    CpuMapLength { expected: usize, found: usize },
    DuplicateHost(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            Self::Parse(e) => write!(f, "malformed platform description: {}", e),
            Self::UnknownPlatform(name) => write!(f, "unknown platform {:?}", name),
            Self::NoCpus => write!(f, "nr-cpus must be at least 1"),
            Self::BootCpuOutOfRange { boot_cpu, nr_cpus } => {
                write!(f, "boot-cpu {} is not below nr-cpus {}", boot_cpu, nr_cpus)
            }
            Self::CpuMapLength { expected, found } => {
                write!(f, "cpu-map has {} entries, expected {}", found, expected)
            }
            Self::DuplicateHost(name) => write!(f, "pci host {:?} listed twice", name),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
struct RawPlatformConfig {
    nr_cpus: usize,
    boot_cpu: Option<usize>,
    cpu_map: Option<Vec<u64>>,
    log_level: Option<String>,
    psci: PsciConduit,
    uart: UartConfig,
    #[serde(default)]
    pci_hosts: Vec<PciHost>,
}

impl PlatformConfig {
    /// The description shipped with the workspace.
    pub fn default_file() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("config")
            .join("platforms.toml")
    }

    /// Load `platform` from the shipped description.
    pub fn select(platform: impl AsRef<str>) -> Result<Self, ConfigError> {
        Self::load(Self::default_file(), platform)
    }

    pub fn load(path: impl AsRef<Path>, platform: impl AsRef<str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        Self::parse(&text, platform)
    }

    /// Parse `platform` out of the TOML document `text`.
    pub fn parse(text: &str, platform: impl AsRef<str>) -> Result<Self, ConfigError> {
        let platform = platform.as_ref();
        let mut file = toml::from_str::<BTreeMap<String, RawPlatformConfig>>(text)?;
        let raw = file
            .remove(platform)
            .ok_or_else(|| ConfigError::UnknownPlatform(platform.into()))?;

        if raw.nr_cpus == 0 {
            return Err(ConfigError::NoCpus);
        }
        let boot_cpu = raw.boot_cpu.unwrap_or(0);
        if boot_cpu >= raw.nr_cpus {
            return Err(ConfigError::BootCpuOutOfRange {
                boot_cpu,
                nr_cpus: raw.nr_cpus,
            });
        }
        let cpu_map = raw
            .cpu_map
            .unwrap_or_else(|| (0..raw.nr_cpus as u64).collect());
        if cpu_map.len() != raw.nr_cpus {
            return Err(ConfigError::CpuMapLength {
                expected: raw.nr_cpus,
                found: cpu_map.len(),
            });
        }
        let mut names = HashSet::new();
        for host in raw.pci_hosts.iter() {
            if !names.insert(host.name.as_str()) {
                return Err(ConfigError::DuplicateHost(host.name.clone()));
            }
        }

        Ok(Self {
            name: platform.into(),
            nr_cpus: raw.nr_cpus,
            boot_cpu,
            cpu_map,
            log_level: raw.log_level.unwrap_or_else(|| "warn".into()),
            psci: raw.psci,
            uart: raw.uart,
            pci_hosts: raw.pci_hosts,
        })
    }
}
