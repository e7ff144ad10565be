//! MNIST IDX file loading
//!
//! Parses the big-endian IDX image/label format into an in-memory
//! [`Dataset`], pixels normalized to `[0, 1]`. Expected files under the
//! data directory:
//!
//! ```text
//! train-images-idx3-ubyte    train-labels-idx1-ubyte
//! t10k-images-idx3-ubyte     t10k-labels-idx1-ubyte
//! ```

use crate::error::{CliError, CliResult};
use ndarray::Array2;
use spikegrad_core::Dataset;
use std::fs;
use std::path::Path;

const IMAGE_MAGIC: u32 = 0x0000_0803;
const LABEL_MAGIC: u32 = 0x0000_0801;

/// Read a big-endian u32 and advance the byte offset
fn read_be_u32(data: &[u8], offset: &mut usize) -> CliResult<u32> {
    let end = *offset + 4;
    if data.len() < end {
        return Err(CliError::dataset("IDX file truncated in header"));
    }
    let b = &data[*offset..end];
    *offset = end;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Parse an IDX image file into `(flattened pixels, rows, cols)`
fn read_images(path: &Path) -> CliResult<(Array2<f32>, usize, usize)> {
    let data = fs::read(path)
        .map_err(|e| CliError::dataset(format!("cannot read {}: {}", path.display(), e)))?;

    let mut offset = 0usize;
    let magic = read_be_u32(&data, &mut offset)?;
    if magic != IMAGE_MAGIC {
        return Err(CliError::dataset(format!(
            "{}: bad image magic {:#010x}",
            path.display(),
            magic
        )));
    }
    let count = read_be_u32(&data, &mut offset)? as usize;
    let rows = read_be_u32(&data, &mut offset)? as usize;
    let cols = read_be_u32(&data, &mut offset)? as usize;

    let image_size = rows * cols;
    let total_bytes = count * image_size;
    if data.len() < offset + total_bytes {
        return Err(CliError::dataset(format!(
            "{}: image payload truncated",
            path.display()
        )));
    }

    // Flatten as (count, rows*cols) in row-major order, normalized to [0,1]
    let pixels: Vec<f32> = data[offset..offset + total_bytes]
        .iter()
        .map(|&b| b as f32 / 255.0)
        .collect();
    let images = Array2::from_shape_vec((count, image_size), pixels)
        .map_err(|e| CliError::dataset(format!("{}: {}", path.display(), e)))?;

    Ok((images, rows, cols))
}

/// Parse an IDX label file
fn read_labels(path: &Path) -> CliResult<Vec<usize>> {
    let data = fs::read(path)
        .map_err(|e| CliError::dataset(format!("cannot read {}: {}", path.display(), e)))?;

    let mut offset = 0usize;
    let magic = read_be_u32(&data, &mut offset)?;
    if magic != LABEL_MAGIC {
        return Err(CliError::dataset(format!(
            "{}: bad label magic {:#010x}",
            path.display(),
            magic
        )));
    }
    let count = read_be_u32(&data, &mut offset)? as usize;
    if data.len() < offset + count {
        return Err(CliError::dataset(format!(
            "{}: label payload truncated",
            path.display()
        )));
    }

    Ok(data[offset..offset + count]
        .iter()
        .map(|&b| b as usize)
        .collect())
}

/// Load one split (images + labels) from a data directory
pub fn load_split(data_dir: &Path, images_file: &str, labels_file: &str) -> CliResult<Dataset> {
    let (images, rows, cols) = read_images(&data_dir.join(images_file))?;
    if (rows, cols) != (28, 28) {
        return Err(CliError::dataset(format!(
            "unexpected MNIST image shape: {}x{}",
            rows, cols
        )));
    }

    let labels = read_labels(&data_dir.join(labels_file))?;
    if labels.len() != images.nrows() {
        return Err(CliError::dataset(format!(
            "image/label count mismatch: {} images, {} labels",
            images.nrows(),
            labels.len()
        )));
    }

    Ok(Dataset::new(images, labels)?)
}

/// Load the canonical train split
pub fn load_train(data_dir: &Path) -> CliResult<Dataset> {
    load_split(data_dir, "train-images-idx3-ubyte", "train-labels-idx1-ubyte")
}

/// Load the canonical test split
pub fn load_test(data_dir: &Path) -> CliResult<Dataset> {
    load_split(data_dir, "t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte")
}
