//! Flat big-endian binary rasters (GAMMA `fcomplex` / `float` images).
//!
//! Files carry no framing; the shape lives in the companion parameter record.

use crate::types::{OffsetComplex, OffsetError, OffsetGrid, OffsetResult};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

fn read_exact_file(path: &Path, expected_bytes: usize) -> OffsetResult<Vec<u8>> {
    if !path.is_file() {
        return Err(OffsetError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }
    let file_bytes = std::fs::metadata(path)?.len();
    if file_bytes != expected_bytes as u64 {
        return Err(OffsetError::InvalidFormat(format!(
            "{}: expected {} bytes, found {}",
            path.display(),
            expected_bytes,
            file_bytes
        )));
    }
    let mut buffer = Vec::with_capacity(expected_bytes);
    File::open(path)?.read_to_end(&mut buffer)?;
    if buffer.len() != expected_bytes {
        return Err(OffsetError::InvalidFormat(format!(
            "{}: file changed while reading",
            path.display()
        )));
    }
    Ok(buffer)
}

fn grid_bytes(shape: (usize, usize), cell_bytes: usize) -> OffsetResult<usize> {
    shape
        .0
        .checked_mul(shape.1)
        .and_then(|cells| cells.checked_mul(cell_bytes))
        .ok_or_else(|| {
            OffsetError::InvalidFormat(format!(
                "grid shape {:?} overflows the addressable size",
                shape
            ))
        })
}

/// Read a big-endian complex64 grid of the given `(rows, cols)` shape
pub fn read_complex_be<P: AsRef<Path>>(path: P, shape: (usize, usize)) -> OffsetResult<OffsetGrid> {
    let path = path.as_ref();
    log::debug!("Reading complex grid {:?} from {}", shape, path.display());
    let buffer = read_exact_file(path, grid_bytes(shape, 8)?)?;
    let mut interleaved = vec![0.0f32; buffer.len() / 4];
    BigEndian::read_f32_into(&buffer, &mut interleaved);
    let values: Vec<OffsetComplex> = interleaved
        .chunks_exact(2)
        .map(|pair| OffsetComplex::new(pair[0], pair[1]))
        .collect();
    Array2::from_shape_vec(shape, values).map_err(|e| OffsetError::InvalidFormat(e.to_string()))
}

/// Write a complex grid as row-major big-endian complex64
pub fn write_complex_be<P: AsRef<Path>>(path: P, grid: &OffsetGrid) -> OffsetResult<()> {
    let path = path.as_ref();
    log::debug!("Writing complex grid {:?} to {}", grid.dim(), path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    for value in grid.iter() {
        writer.write_f32::<BigEndian>(value.re)?;
        writer.write_f32::<BigEndian>(value.im)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a big-endian float32 grid
pub fn read_real_be<P: AsRef<Path>>(path: P, shape: (usize, usize)) -> OffsetResult<Array2<f32>> {
    let path = path.as_ref();
    let buffer = read_exact_file(path, grid_bytes(shape, 4)?)?;
    let mut values = vec![0.0f32; buffer.len() / 4];
    BigEndian::read_f32_into(&buffer, &mut values);
    Array2::from_shape_vec(shape, values).map_err(|e| OffsetError::InvalidFormat(e.to_string()))
}

/// Write a real grid as row-major big-endian float32
pub fn write_real_be<P: AsRef<Path>>(path: P, grid: &Array2<f32>) -> OffsetResult<()> {
    let path = path.as_ref();
    log::debug!("Writing real grid {:?} to {}", grid.dim(), path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    for &value in grid.iter() {
        writer.write_f32::<BigEndian>(value)?;
    }
    writer.flush()?;
    Ok(())
}
