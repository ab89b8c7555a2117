use serde::Serialize;

pub const MIN_MEMORY_MB: u64 = 1024;
/// Left to the OS and the launcher itself.
const RESERVED_MEMORY_MB: u64 = 1536;

/// Memory bounds offered by the RAM slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub total_ram_mb: u64,
    pub min_memory_mb: u64,
    pub max_memory_mb: u64,
}

impl SystemInfo {
    pub fn detect() -> Self {
        let mut system = sysinfo::System::new();
        system.refresh_memory();
        Self::from_total_mb(system.total_memory() / 1024 / 1024)
    }

    pub fn from_total_mb(total_ram_mb: u64) -> Self {
        Self {
            total_ram_mb,
            min_memory_mb: MIN_MEMORY_MB,
            max_memory_mb: total_ram_mb
                .saturating_sub(RESERVED_MEMORY_MB)
                .max(MIN_MEMORY_MB),
        }
    }
}
