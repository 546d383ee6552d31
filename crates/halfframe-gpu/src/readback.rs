//! Synchronous GPU-to-CPU frame download.

use std::sync::mpsc;

use crate::buffers::GpuFrameBuffers;
use crate::error::GpuError;

/// Copy `frame.output` into `frame.staging`, submit `encoder`, block until
/// the staging buffer maps, and copy its bytes into `out`.
///
/// `out` must be exactly `frame.byte_size()` long.
pub fn submit_and_read(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    mut encoder: wgpu::CommandEncoder,
    frame: &GpuFrameBuffers,
    out: &mut [u8],
) -> Result<(), GpuError> {
    let size = frame.byte_size();
    if out.len() as u64 != size {
        return Err(GpuError::Readback(format!(
            "destination is {} bytes, expected {size}",
            out.len()
        )));
    }

    encoder.copy_buffer_to_buffer(&frame.output, 0, &frame.staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = frame.staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| GpuError::Readback(e.to_string()))?;

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(GpuError::Readback(e.to_string())),
        Err(_) => return Err(GpuError::Readback("map callback dropped".into())),
    }

    {
        let data = slice.get_mapped_range();
        out.copy_from_slice(&data);
    }
    frame.staging.unmap();
    Ok(())
}
