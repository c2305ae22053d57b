use std::os::unix::thread::JoinHandleExt;
use std::thread::JoinHandle;

use snafu::prelude::*;

#[derive(Snafu, Debug, Copy, Clone, Eq, PartialEq)]
pub enum PinError {
    #[snafu(display("core {core} is outside the CPU set"))]
    NoSuchCore { core: usize },
    #[snafu(display("failed to set affinity to core {core} (errno={errno})"))]
    Affinity { core: usize, errno: i32 },
    #[snafu(display("failed to set priority {priority} (errno={errno})"))]
    Priority { priority: i32, errno: i32 },
}

pub fn online_cores() -> usize {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    n.max(1) as usize
}

/// The core the calling thread is running on right now.
pub fn current_core() -> Option<usize> {
    let core = unsafe { libc::sched_getcpu() };
    (core >= 0).then_some(core as usize)
}

fn pin_pthread(thread: libc::pthread_t, core: usize) -> Result<(), PinError> {
    ensure!(core < libc::CPU_SETSIZE as usize, NoSuchCoreSnafu { core });
    let ret = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::pthread_setaffinity_np(thread, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    ensure!(ret == 0, AffinitySnafu { core, errno: ret });
    Ok(())
}

fn set_priority(thread: libc::pthread_t, priority: i32) -> Result<(), PinError> {
    let ret = unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = priority;
        libc::pthread_setschedparam(thread, libc::SCHED_FIFO, &param)
    };
    ensure!(ret == 0, PrioritySnafu { priority, errno: ret });
    Ok(())
}

/// Pin the calling thread to `core`.
pub fn pin_current(core: usize) -> Result<(), PinError> {
    pin_pthread(unsafe { libc::pthread_self() }, core)
}

/// Migrate a spawned thread to `core` and optionally run it under
/// `SCHED_FIFO` at `priority`.
pub fn pin_thread<T>(
    handle: &JoinHandle<T>,
    core: usize,
    priority: Option<i32>,
) -> Result<(), PinError> {
    let thread = handle.as_pthread_t();
    pin_pthread(thread, core)?;
    if let Some(priority) = priority {
        set_priority(thread, priority)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_cores() {
        assert!(online_cores() >= 1);
        assert!(current_core().is_some());
    }

    #[test]
    fn test_out_of_range_core() {
        let core = libc::CPU_SETSIZE as usize;
        assert_eq!(pin_current(core), Err(PinError::NoSuchCore { core }));
    }

    #[test]
    fn test_pin_spawned_thread() {
        let core = current_core().unwrap();
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            rx.recv().unwrap();
            current_core()
        });
        pin_thread(&handle, core, None).unwrap();
        tx.send(()).unwrap();
        assert_eq!(handle.join().unwrap(), Some(core));
    }
}
