//! Named file mapping, mapped view and data-valid event

use std::ffi::c_void;
use std::ptr::NonNull;
use std::time::Duration;

use tracing::{debug, trace};
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW,
    UnmapViewOfFile, VirtualQuery,
};
use windows::Win32::System::Threading::{OpenEventW, SYNCHRONIZATION_ACCESS_RIGHTS, WaitForSingleObject};
use windows::core::PCWSTR;

use super::wide_string;
use crate::connection::{DataSignal, Platform, RawRegion, SharedView, WaitResult};
use crate::{Result, TelemetryError};

/// `SYNCHRONIZE` access right, all the reader needs on the event
const SYNCHRONIZE: u32 = 0x0010_0000;

/// [`Platform`] backed by the Win32 file mapping and event APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

/// Open file mapping handle, closed on drop.
#[derive(Debug)]
pub struct MappingHandle(HANDLE);

impl Drop for MappingHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by OpenFileMappingW and is closed once.
        let _ = unsafe { CloseHandle(self.0) };
    }
}

/// Read-only mapped view, unmapped on drop.
#[derive(Debug)]
pub struct MappedView {
    region: RawRegion,
}

impl Drop for MappedView {
    fn drop(&mut self) {
        let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.region.base().as_ptr() as *mut c_void };
        // SAFETY: the address was returned by MapViewOfFile and is unmapped once.
        let _ = unsafe { UnmapViewOfFile(addr) };
    }
}

impl SharedView for MappedView {
    fn len(&self) -> usize {
        self.region.len()
    }

    fn read_i32(&self, offset: usize) -> Option<i32> {
        self.region.read_i32(offset)
    }

    fn copy_out(&self, offset: usize, dst: &mut [u8]) -> bool {
        self.region.copy_out(offset, dst)
    }

    fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.region.bytes(offset, len)
    }
}

/// Open event handle with wait access, closed on drop.
#[derive(Debug)]
pub struct EventHandle(HANDLE);

impl Drop for EventHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by OpenEventW and is closed once.
        let _ = unsafe { CloseHandle(self.0) };
    }
}

impl DataSignal for EventHandle {
    fn wait(&self, timeout: Duration) -> Result<WaitResult> {
        let ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        // SAFETY: the handle stays open for the lifetime of self.
        let result = unsafe { WaitForSingleObject(self.0, ms) };

        match result {
            WAIT_OBJECT_0 => Ok(WaitResult::Signaled),
            WAIT_TIMEOUT => Ok(WaitResult::Timeout),
            _ => {
                let win_err = windows::core::Error::from_thread();
                Err(TelemetryError::windows_api_error("WaitForSingleObject", win_err))
            }
        }
    }
}

// SAFETY: kernel handles and a read-only view may be used from any thread.
unsafe impl Send for MappingHandle {}
unsafe impl Send for MappedView {}
unsafe impl Send for EventHandle {}

impl Platform for Win32Platform {
    type Mapping = MappingHandle;
    type View = MappedView;
    type Signal = EventHandle;

    fn open_mapping(&mut self, name: &str) -> Result<MappingHandle> {
        let wide_name = wide_string(name);
        // SAFETY: wide_name is null-terminated and outlives the call.
        let handle = unsafe { OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr())) }
            .map_err(|e| TelemetryError::windows_api_error("OpenFileMappingW", e))?;
        trace!(name, "OpenFileMappingW succeeded");
        Ok(MappingHandle(handle))
    }

    fn map_view(&mut self, mapping: &MappingHandle) -> Result<MappedView> {
        // SAFETY: mapping holds an open file mapping handle.
        let addr = unsafe { MapViewOfFile(mapping.0, FILE_MAP_READ, 0, 0, 0) };
        let Some(base) = NonNull::new(addr.Value as *mut u8) else {
            let win_err = windows::core::Error::from_thread();
            return Err(TelemetryError::windows_api_error("MapViewOfFile", win_err));
        };

        let mut info = MEMORY_BASIC_INFORMATION::default();
        // SAFETY: info is a valid out-parameter of the size passed.
        let written = unsafe {
            VirtualQuery(
                Some(base.as_ptr() as *const c_void),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            let win_err = windows::core::Error::from_thread();
            // SAFETY: base was just mapped and is not referenced elsewhere.
            let _ = unsafe { UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: base.as_ptr() as *mut c_void }) };
            return Err(TelemetryError::windows_api_error("VirtualQuery", win_err));
        }

        debug!(len = info.RegionSize, "Mapped view of simulator shared memory");
        // SAFETY: VirtualQuery reports RegionSize readable bytes from base,
        // mapped until MappedView unmaps them.
        let region = unsafe { RawRegion::new(base, info.RegionSize) };
        Ok(MappedView { region })
    }

    fn open_signal(&mut self, name: &str) -> Result<EventHandle> {
        let wide_name = wide_string(name);
        // SAFETY: wide_name is null-terminated and outlives the call.
        let handle = unsafe {
            OpenEventW(SYNCHRONIZATION_ACCESS_RIGHTS(SYNCHRONIZE), false, PCWSTR::from_raw(wide_name.as_ptr()))
        }
        .map_err(|e| TelemetryError::windows_api_error("OpenEventW", e))?;
        trace!(name, "OpenEventW succeeded");
        Ok(EventHandle(handle))
    }
}
