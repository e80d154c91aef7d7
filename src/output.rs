//! Binary output artifact.
//!
//! Layout (little-endian, no padding):
//!
//! ```text
//! offset              field     type  count
//! 0                   nx        i32   1
//! 4                   ny        i32   1
//! 8                   x axis    f32   nx
//! 8 + 4nx             y axis    f32   ny
//! 8 + 4nx + 4ny       results   i32   nx * ny   (cell (i, j) at i * ny + j)
//! ```
//!
//! Axes are always written as IEEE-754 binary32, whatever precision the
//! kernel ran in. Readers load them with `np.fromfile(f, np.float32, n)`.
//!
//! [`write_dat`] never leaves a partial file at the destination: the artifact
//! is assembled in a temporary file in the same directory and renamed into
//! place only once every byte is flushed.

use log::{debug, info};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::buffer::ResultBuffer;
use crate::config::GridSpec;
use crate::error::SerializationError;
use crate::grid::AxisArrays;

const HEADER_LEN: usize = 8;
const ELEMENT_LEN: usize = 4;

/// Size in bytes of the artifact for `grid`.
pub fn encoded_len(grid: GridSpec) -> usize {
    HEADER_LEN + ELEMENT_LEN * (grid.nx + grid.ny + grid.cells())
}

/// Contents of an artifact read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DatFile {
    pub axes: AxisArrays<f32>,
    pub results: ResultBuffer,
}

impl DatFile {
    pub fn grid(&self) -> GridSpec {
        self.results.grid()
    }
}

/// Encodes the artifact into `writer`.
pub fn write_to<W: Write>(
    writer: &mut W,
    axes: &AxisArrays<f32>,
    results: &ResultBuffer,
) -> Result<(), SerializationError> {
    let grid = results.grid();
    check_len("x axis", grid.nx, axes.x().len())?;
    check_len("y axis", grid.ny, axes.y().len())?;

    writer.write_all(&header_field(grid.nx)?.to_le_bytes())?;
    writer.write_all(&header_field(grid.ny)?.to_le_bytes())?;
    for value in axes.x().iter().chain(axes.y()) {
        writer.write_all(&value.to_le_bytes())?;
    }
    for cell in results.as_slice() {
        writer.write_all(&cell.to_le_bytes())?;
    }
    Ok(())
}

/// Writes the artifact to `path`, atomically.
pub fn write_dat(
    path: &Path,
    axes: &AxisArrays<f32>,
    results: &ResultBuffer,
) -> Result<(), SerializationError> {
    let io_err = |source: io::Error| SerializationError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let temp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    debug!("Staging output in {:?}", temp.path());

    // On any early return `temp` is dropped, which deletes the staging file.
    let mut writer = BufWriter::new(temp);
    write_to(&mut writer, axes, results).map_err(|err| match err {
        SerializationError::Stream(source) => io_err(source),
        other => other,
    })?;
    let temp = writer
        .into_inner()
        .map_err(|err| io_err(err.into_error()))?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|err| io_err(err.error))?;

    let grid = results.grid();
    info!(
        "Wrote {}x{} grid to {:?} ({} bytes)",
        grid.nx,
        grid.ny,
        path,
        encoded_len(grid)
    );
    Ok(())
}

/// Decodes an artifact from `reader`.
pub fn read_from<R: Read>(reader: &mut R) -> Result<DatFile, SerializationError> {
    let nx = read_i32(reader, "header")?;
    let ny = read_i32(reader, "header")?;
    if nx < 0 || ny < 0 {
        return Err(SerializationError::NegativeDimension { nx, ny });
    }
    let grid = GridSpec {
        nx: nx as usize,
        ny: ny as usize,
    };

    let x = read_vec(reader, grid.nx, "x axis", f32::from_le_bytes)?;
    let y = read_vec(reader, grid.ny, "y axis", f32::from_le_bytes)?;
    let cells = read_vec(reader, grid.cells(), "results", i32::from_le_bytes)?;

    Ok(DatFile {
        axes: AxisArrays::from_parts(x, y),
        results: ResultBuffer::from_cells(grid, cells),
    })
}

/// Reads the artifact at `path`.
pub fn read_dat(path: &Path) -> Result<DatFile, SerializationError> {
    let file = File::open(path).map_err(|source| SerializationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_from(&mut BufReader::new(file))
}

fn header_field(value: usize) -> Result<i32, SerializationError> {
    i32::try_from(value).map_err(|_| SerializationError::DimensionOverflow { value })
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), SerializationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SerializationError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

fn read_word<R: Read>(reader: &mut R, what: &'static str) -> Result<[u8; 4], SerializationError> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => SerializationError::Truncated { what },
        _ => SerializationError::Stream(err),
    })?;
    Ok(word)
}

fn read_i32<R: Read>(reader: &mut R, what: &'static str) -> Result<i32, SerializationError> {
    read_word(reader, what).map(i32::from_le_bytes)
}

fn read_vec<R: Read, T>(
    reader: &mut R,
    count: usize,
    what: &'static str,
    decode: fn([u8; 4]) -> T,
) -> Result<Vec<T>, SerializationError> {
    (0..count)
        .map(|_| read_word(reader, what).map(decode))
        .collect()
}
