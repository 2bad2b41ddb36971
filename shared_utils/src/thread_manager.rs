//! Engine thread policy
//!
//! Decides how many worker threads the external encoder may use:
//! - On Linux hosts the encoder is pinned to a single thread by default so a
//!   background shrink job cannot starve the rest of the machine
//! - Elsewhere the encoder keeps its own (full) parallelism
//! - `VID_SHRINK_THREADS` overrides whatever policy the caller picked

/// Environment override for the encoder thread count (`0` = unbounded)
pub const THREADS_ENV_VAR: &str = "VID_SHRINK_THREADS";

/// How the encoder's internal parallelism is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPolicy {
    /// Platform default: 1 thread on Linux, encoder default elsewhere
    #[default]
    Auto,
    /// Exactly this many threads (clamped to the host core count)
    Fixed(usize),
    /// Never pass a thread limit to the encoder
    Unbounded,
}

/// Host facts the policy depends on; split out so tests can fake a platform
#[derive(Debug, Clone, Copy)]
pub struct HostInfo {
    pub is_linux: bool,
    pub cpu_count: usize,
}

impl HostInfo {
    pub fn detect() -> Self {
        Self {
            is_linux: cfg!(target_os = "linux"),
            cpu_count: num_cpus::get(),
        }
    }
}

/// Resolves `policy` for the current host, honouring `VID_SHRINK_THREADS`.
///
/// `None` means "do not pass `-threads`; let the encoder decide".
pub fn resolve_engine_threads(policy: ThreadPolicy) -> Option<usize> {
    let policy = env_override().unwrap_or(policy);
    resolve_for_host(policy, HostInfo::detect())
}

pub fn resolve_for_host(policy: ThreadPolicy, host: HostInfo) -> Option<usize> {
    match policy {
        ThreadPolicy::Auto if host.is_linux => Some(1),
        ThreadPolicy::Auto => None,
        ThreadPolicy::Fixed(n) => Some(n.clamp(1, host.cpu_count.max(1))),
        ThreadPolicy::Unbounded => None,
    }
}

fn env_override() -> Option<ThreadPolicy> {
    let raw = std::env::var(THREADS_ENV_VAR).ok()?;
    match parse_thread_override(&raw) {
        Some(policy) => Some(policy),
        None => {
            tracing::warn!(
                var = THREADS_ENV_VAR,
                value = %raw,
                "Ignoring unparsable thread override"
            );
            None
        }
    }
}

fn parse_thread_override(raw: &str) -> Option<ThreadPolicy> {
    match raw.trim() {
        "auto" => Some(ThreadPolicy::Auto),
        "0" => Some(ThreadPolicy::Unbounded),
        other => other.parse::<usize>().ok().map(ThreadPolicy::Fixed),
    }
}
