// OS-visible thread naming. std::thread::Builder already names the
// thread for Rust-side introspection; this makes the name show up in
// debuggers and /proc as well.

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) fn set_current_thread_name(name: &str) {
    // The kernel limit is 16 bytes including the terminator.
    let mut end = name.len().min(15);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let Ok(cname) = std::ffi::CString::new(&name[..end]) else {
        return;
    };
    unsafe {
        libc::pthread_setname_np(libc::pthread_self(), cname.as_ptr());
    }
}

#[cfg(target_os = "macos")]
pub(crate) fn set_current_thread_name(name: &str) {
    let Ok(cname) = std::ffi::CString::new(name) else {
        return;
    };
    unsafe {
        libc::pthread_setname_np(cname.as_ptr());
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos")))]
pub(crate) fn set_current_thread_name(_name: &str) {}
