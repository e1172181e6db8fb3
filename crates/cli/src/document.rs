//! JSON documents read and written by the CLI
//!
//! A raster document stores cells row-major per band, `null` for missing
//! cells. A feature document is a serialized [`FeatureCollection`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use gridstat_core::raster::AnyRaster;
use gridstat_core::vector::FeatureCollection;
use gridstat_core::{CRS, DataType, GeoTransform, with_any_raster};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterDocument {
    pub dtype: DataType,
    /// `[bands, rows, cols]`
    pub shape: [usize; 3],
    pub data: Vec<Option<f64>>,
    #[serde(default)]
    pub transform: GeoTransform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CRS>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
    /// Chunk size `[rows, cols]`; the whole grid is one chunk when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<[usize; 2]>,
}

impl RasterDocument {
    pub fn from_raster(raster: &AnyRaster) -> Self {
        let (bands, rows, cols) = raster.shape();
        let values = raster.to_f64_nan();
        let valid = raster.validity_mask();
        let data = values
            .iter()
            .zip(valid.iter())
            .map(|(&v, &ok)| ok.then_some(v))
            .collect();

        let chunks = with_any_raster!(raster, s => {
            let grid = s.chunk_grid();
            match (grid.row_chunks().first(), grid.col_chunks().first()) {
                (Some(&r), Some(&c)) if grid.len() > 1 => Some([r, c]),
                _ => None,
            }
        });

        Self {
            dtype: raster.data_type(),
            shape: [bands, rows, cols],
            data,
            transform: *raster.transform(),
            crs: raster.crs().cloned(),
            nodata: raster.nodata_f64(),
            chunks,
        }
    }

    pub fn into_raster(self) -> Result<AnyRaster> {
        let [bands, rows, cols] = self.shape;
        if self.data.len() != bands * rows * cols {
            bail!(
                "document holds {} cells, shape {:?} needs {}",
                self.data.len(),
                self.shape,
                bands * rows * cols
            );
        }

        if let Some((i, v)) = self
            .data
            .iter()
            .enumerate()
            .find_map(|(i, v)| v.filter(|&v| !self.dtype.can_represent(v)).map(|v| (i, v)))
        {
            bail!("cell {} holds {}, which {} cannot represent", i, v, self.dtype);
        }

        let valid = Array3::from_shape_vec(
            (bands, rows, cols),
            self.data.iter().map(Option::is_some).collect(),
        )?;
        let values = Array3::from_shape_vec(
            (bands, rows, cols),
            self.data.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
        )?;

        let raster = AnyRaster::from_f64_cells(
            self.dtype,
            &values,
            &valid,
            self.nodata,
            self.transform,
            self.crs,
        );
        match self.chunks {
            Some([r, c]) => Ok(with_any_raster!(raster, s => AnyRaster::from(s.with_chunk_size(r, c)?))),
            None => Ok(raster),
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

pub fn read_raster_from<R: Read>(reader: R) -> Result<AnyRaster> {
    let doc: RasterDocument = serde_json::from_reader(reader).context("Invalid raster document")?;
    doc.into_raster()
}

pub fn read_raster(path: &Path) -> Result<AnyRaster> {
    read_raster_from(open(path)?).with_context(|| format!("Failed to read raster {}", path.display()))
}

pub fn read_features(path: &Path) -> Result<FeatureCollection> {
    serde_json::from_reader(open(path)?)
        .with_context(|| format!("Failed to read features {}", path.display()))
}

/// Write any serializable value as pretty JSON
pub fn write_json<S: Serialize + ?Sized>(value: &S, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn write_raster(raster: &AnyRaster, path: &Path) -> Result<()> {
    write_json(&RasterDocument::from_raster(raster), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstat_core::RasterStack;
    use tempfile::tempdir;

    #[test]
    fn test_raster_document_file_round_trip() {
        let data = Array3::from_shape_vec((2, 2, 2), vec![1i16, -5, 3, 4, 5, 6, -5, 8]).unwrap();
        let mut stack = RasterStack::from_array(data).with_chunk_size(1, 2).unwrap();
        stack.set_nodata(Some(-5));
        stack.set_crs(Some(CRS::from_epsg(32633)));
        stack.set_transform(GeoTransform::new(10.0, 20.0, 2.0, -2.0));

        let dir = tempdir().unwrap();
        let path = dir.path().join("raster.json");
        write_raster(&AnyRaster::from(stack), &path).unwrap();

        let back = read_raster(&path).unwrap();
        assert_eq!(back.data_type(), DataType::I16);
        assert_eq!(back.shape(), (2, 2, 2));
        assert_eq!(back.nodata_f64(), Some(-5.0));
        assert_eq!(back.crs(), Some(&CRS::from_epsg(32633)));
        assert_eq!(back.transform().pixel_width, 2.0);

        let s = back.downcast::<i16>().unwrap();
        assert_eq!(s.data().as_slice().unwrap(), &[1, -5, 3, 4, 5, 6, -5, 8]);
        assert_eq!(s.chunk_grid().len(), 2);
    }

    #[test]
    fn test_nulls_use_default_nodata() {
        let json = r#"{"dtype": "u8", "shape": [1, 1, 3], "data": [1, null, 3]}"#;
        let raster = read_raster_from(json.as_bytes()).unwrap();
        let s = raster.downcast::<u8>().unwrap();
        assert_eq!(s.nodata(), Some(0));
        assert_eq!(s.data().as_slice().unwrap(), &[1, 0, 3]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let json = r#"{"dtype": "f64", "shape": [1, 2, 2], "data": [1, 2, 3]}"#;
        assert!(read_raster_from(json.as_bytes()).is_err());
    }

    #[test]
    fn test_out_of_range_cell_rejected() {
        let json = r#"{"dtype": "u8", "shape": [1, 1, 2], "data": [300, 7]}"#;
        let err = read_raster_from(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("cannot represent"));

        let json = r#"{"dtype": "i16", "shape": [1, 1, 2], "data": [1.5, 7]}"#;
        assert!(read_raster_from(json.as_bytes()).is_err());
    }

    #[test]
    fn test_features_round_trip() {
        let fc: FeatureCollection = vec![geo_types::Geometry::Point(geo_types::Point::new(1.0, 2.0))]
            .into_iter()
            .collect();
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");
        write_json(&fc, &path).unwrap();
        let back = read_features(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.crs().is_none());
    }
}
