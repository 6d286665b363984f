use std::sync::{OnceLock, RwLock};

/// Host name reported when platform resolution fails. The record builder
/// must never fail, so a fixed non-empty placeholder is cached instead.
const UNKNOWN_HOST: &str = "unknown-host";

/// Process-wide identity attached to every record built in this process.
///
/// Holds the two read-mostly values every record carries: the local host
/// name (resolved lazily, exactly once, then cached for the process
/// lifetime) and an optional cluster/environment label (set explicitly,
/// usually once, before steady-state logging begins).
///
/// Construct one `ProcessIdentity` at process start and share it by
/// `Arc` with every formatter; there is no hidden global state.
///
/// A cluster label set while other threads are concurrently building
/// records becomes visible on a best-effort basis: the lock guarantees
/// the value is never torn, but records already being built keep the
/// snapshot they read.
pub struct ProcessIdentity {
    host: OnceLock<String>,
    cluster: RwLock<Option<String>>,
}

impl ProcessIdentity {
    pub fn new() -> Self {
        Self {
            host: OnceLock::new(),
            cluster: RwLock::new(None),
        }
    }

    /// Local host name, resolved on first call and cached forever.
    ///
    /// Concurrent first callers race only on who pays the resolution
    /// cost; all of them observe the same cached value.
    pub fn host_name(&self) -> &str {
        self.host.get_or_init(resolve_host_name)
    }

    /// Store the cluster/environment label, trimmed of surrounding
    /// whitespace. Effective for all records built after the call;
    /// calling again overwrites the label for future records.
    pub fn set_cluster_name(&self, name: &str) {
        let mut cluster = self.cluster.write().expect("cluster lock poisoned");
        *cluster = Some(name.trim().to_string());
    }

    /// Current cluster label, absent until [`set_cluster_name`] is called.
    ///
    /// [`set_cluster_name`]: ProcessIdentity::set_cluster_name
    pub fn cluster_name(&self) -> Option<String> {
        self.cluster.read().expect("cluster lock poisoned").clone()
    }
}

impl Default for ProcessIdentity {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}
