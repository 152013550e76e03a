//! Platform capability port: CPU affinity and thread naming.
//!
//! The core scheduler never touches the OS directly — it goes through this
//! crate's free functions, keyed by a [`NativeHandle`] obtained from a
//! running [`std::thread::JoinHandle`]. The Linux implementation below
//! mirrors the pthread calls the original C++ `beehive` scheduler used
//! (`pthread_getaffinity_np`/`pthread_setaffinity_np`,
//! `pthread_getname_np`/`pthread_setname_np`); other targets get a
//! best-effort no-op fallback rather than a compile error, since affinity
//! and naming are advisory everywhere that isn't Linux.

#[cfg(unix)]
pub type NativeHandle = libc::pthread_t;
#[cfg(not(unix))]
pub type NativeHandle = u64;

/// Number of logical processors available to the process.
pub fn num_processors() -> usize {
    num_cpus::get()
}

/// Returns the CPU affinity mask for `handle` as one `bool` per logical
/// processor (`true` = pinned to that processor). Returns an empty vector if
/// the affinity mask could not be read.
pub fn get_affinity(handle: NativeHandle) -> Vec<bool> {
    imp::get_affinity(handle)
}

/// Restricts `handle` to run only on the processors where `mask[i]` is
/// `true`. Indices beyond the platform's processor count are ignored.
pub fn set_affinity(handle: NativeHandle, mask: &[bool]) {
    imp::set_affinity(handle, mask);
}

/// Returns the OS-level name of the thread identified by `handle`, or `None`
/// if it could not be read.
pub fn get_name(handle: NativeHandle) -> Option<String> {
    imp::get_name(handle)
}

/// Sets the OS-level name of the thread identified by `handle`. Most
/// platforms cap thread names at a small fixed length (16 bytes including
/// the terminator on Linux); longer names are truncated.
pub fn set_name(handle: NativeHandle, name: &str) {
    imp::set_name(handle, name);
}

#[cfg(target_os = "linux")]
mod imp {
    use super::NativeHandle;
    use beehive_log::warn;
    use std::ffi::CString;

    pub fn get_affinity(handle: NativeHandle) -> Vec<bool> {
        unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            let ok = libc::pthread_getaffinity_np(handle, std::mem::size_of_val(&set), &mut set);
            if ok != 0 {
                warn!("pthread_getaffinity_np failed with code {ok}");
                return Vec::new();
            }
            (0..libc::CPU_SETSIZE as usize)
                .map(|cpu| libc::CPU_ISSET(cpu, &set))
                .collect()
        }
    }

    pub fn set_affinity(handle: NativeHandle, mask: &[bool]) {
        unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            for (cpu, &pinned) in mask.iter().enumerate() {
                if pinned && cpu < libc::CPU_SETSIZE as usize {
                    libc::CPU_SET(cpu, &mut set);
                }
            }
            let ok = libc::pthread_setaffinity_np(handle, std::mem::size_of_val(&set), &set);
            if ok != 0 {
                warn!("pthread_setaffinity_np failed with code {ok}");
            }
        }
    }

    pub fn get_name(handle: NativeHandle) -> Option<String> {
        const MAX_LEN: usize = 16;
        let mut buf = vec![0_u8; MAX_LEN];
        let ok = unsafe {
            libc::pthread_getname_np(handle, buf.as_mut_ptr().cast(), buf.len())
        };
        if ok != 0 {
            warn!("pthread_getname_np failed with code {ok}");
            return None;
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Some(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    pub fn set_name(handle: NativeHandle, name: &str) {
        const MAX_LEN: usize = 15; // 16 bytes including the NUL terminator
        let truncated = if name.len() > MAX_LEN {
            let mut end = MAX_LEN;
            while end > 0 && !name.is_char_boundary(end) {
                end -= 1;
            }
            &name[..end]
        } else {
            name
        };
        let Ok(cname) = CString::new(truncated) else {
            warn!("thread name {name:?} contains an interior NUL, skipping rename");
            return;
        };
        let ok = unsafe { libc::pthread_setname_np(handle, cname.as_ptr()) };
        if ok != 0 {
            warn!("pthread_setname_np failed with code {ok}");
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::NativeHandle;

    pub fn get_affinity(_handle: NativeHandle) -> Vec<bool> {
        Vec::new()
    }

    pub fn set_affinity(_handle: NativeHandle, _mask: &[bool]) {}

    pub fn get_name(_handle: NativeHandle) -> Option<String> {
        None
    }

    pub fn set_name(_handle: NativeHandle, _name: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_processors_is_at_least_one() {
        assert!(num_processors() >= 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn current_thread_affinity_round_trips() {
        let handle = unsafe { libc::pthread_self() };
        let mask = get_affinity(handle);
        assert!(!mask.is_empty());
        assert!(mask.iter().any(|&pinned| pinned));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn current_thread_name_round_trips() {
        let handle = unsafe { libc::pthread_self() };
        set_name(handle, "beehive-test");
        assert_eq!(get_name(handle).as_deref(), Some("beehive-test"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn set_name_truncates_at_a_char_boundary_instead_of_panicking() {
        // Every codepoint here is 3 bytes, so a naive `&name[..15]` would
        // land mid-codepoint instead of on a char boundary.
        let name = "\u{2603}".repeat(10);
        let handle = unsafe { libc::pthread_self() };
        set_name(handle, &name);
    }
}
