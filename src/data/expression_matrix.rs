//! Expression matrix with sparse or dense storage for single-cell count data.

use crate::error::{PrepError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nalgebra::DMatrix;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Backing store for an expression matrix.
///
/// Raw counts are typically sparse; normalized residual matrices and PCA
/// scores are dense. Every stage operates through the uniform accessors on
/// [`ExpressionMatrix`], so the backing is an implementation detail.
#[derive(Debug, Clone)]
enum Storage {
    /// CSR with cells as the outer (row) dimension.
    Sparse(CsMat<f64>),
    Dense(DMatrix<f64>),
}

/// A cells×genes expression matrix.
///
/// Rows are cells, columns are genes. Values are non-negative; raw counts
/// are integral but the same type carries normalized values through the
/// pipeline. Every transform consumes a reference and returns a fresh
/// matrix; nothing mutates in place.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    data: Storage,
    /// Cell identifiers (row names).
    cell_ids: Vec<String>,
    /// Gene identifiers (column names).
    gene_ids: Vec<String>,
}

impl ExpressionMatrix {
    /// Create a matrix from a sparse CSR store (cells × genes).
    pub fn from_sparse(
        data: CsMat<f64>,
        cell_ids: Vec<String>,
        gene_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        check_labels(nrows, ncols, &cell_ids, &gene_ids)?;
        Ok(Self {
            data: Storage::Sparse(data),
            cell_ids,
            gene_ids,
        })
    }

    /// Create a matrix from a dense store (cells × genes).
    pub fn from_dense(
        data: DMatrix<f64>,
        cell_ids: Vec<String>,
        gene_ids: Vec<String>,
    ) -> Result<Self> {
        check_labels(data.nrows(), data.ncols(), &cell_ids, &gene_ids)?;
        Ok(Self {
            data: Storage::Dense(data),
            cell_ids,
            gene_ids,
        })
    }

    /// Get the value at (cell, gene), returning 0 for missing sparse entries.
    #[inline]
    pub fn get(&self, cell: usize, gene: usize) -> f64 {
        match &self.data {
            Storage::Sparse(m) => m.get(cell, gene).copied().unwrap_or(0.0),
            Storage::Dense(m) => m[(cell, gene)],
        }
    }

    /// Number of cells (rows).
    #[inline]
    pub fn n_cells(&self) -> usize {
        match &self.data {
            Storage::Sparse(m) => m.rows(),
            Storage::Dense(m) => m.nrows(),
        }
    }

    /// Number of genes (columns).
    #[inline]
    pub fn n_genes(&self) -> usize {
        match &self.data {
            Storage::Sparse(m) => m.cols(),
            Storage::Dense(m) => m.ncols(),
        }
    }

    /// Cell identifiers.
    #[inline]
    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    /// Gene identifiers.
    #[inline]
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Whether the backing store is sparse.
    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self.data, Storage::Sparse(_))
    }

    /// Index of a gene by exact identifier.
    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|g| g == gene_id)
    }

    /// Dense copy of one cell's row.
    pub fn row_dense(&self, cell: usize) -> Vec<f64> {
        match &self.data {
            Storage::Sparse(m) => {
                let mut dense = vec![0.0; self.n_genes()];
                if let Some(row) = m.outer_view(cell) {
                    for (gene, &val) in row.iter() {
                        dense[gene] = val;
                    }
                }
                dense
            }
            Storage::Dense(m) => m.row(cell).iter().cloned().collect(),
        }
    }

    /// Total counts per cell (row sums).
    pub fn row_sums(&self) -> Vec<f64> {
        match &self.data {
            Storage::Sparse(m) => (0..self.n_cells())
                .into_par_iter()
                .map(|cell| {
                    m.outer_view(cell)
                        .map(|v| v.iter().map(|(_, &val)| val).sum())
                        .unwrap_or(0.0)
                })
                .collect(),
            Storage::Dense(m) => (0..m.nrows())
                .into_par_iter()
                .map(|cell| m.row(cell).iter().sum())
                .collect(),
        }
    }

    /// Total counts per gene (column sums).
    pub fn col_sums(&self) -> Vec<f64> {
        match &self.data {
            Storage::Sparse(m) => {
                let mut sums = vec![0.0; self.n_genes()];
                for row in m.outer_iterator() {
                    for (gene, &val) in row.iter() {
                        sums[gene] += val;
                    }
                }
                sums
            }
            Storage::Dense(m) => (0..m.ncols()).map(|g| m.column(g).iter().sum()).collect(),
        }
    }

    /// Maximum value per gene (column max).
    ///
    /// Missing sparse entries count as 0, so an all-zero gene has max 0.
    pub fn col_max(&self) -> Vec<f64> {
        match &self.data {
            Storage::Sparse(m) => {
                let mut maxes = vec![0.0; self.n_genes()];
                for row in m.outer_iterator() {
                    for (gene, &val) in row.iter() {
                        if val > maxes[gene] {
                            maxes[gene] = val;
                        }
                    }
                }
                maxes
            }
            Storage::Dense(m) => (0..m.ncols())
                .map(|g| m.column(g).iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)))
                .collect(),
        }
    }

    /// Subset to the given cells (by row index), preserving order of `indices`.
    pub fn subset_cells(&self, indices: &[usize]) -> Result<Self> {
        for &cell in indices {
            if cell >= self.n_cells() {
                return Err(PrepError::InvalidParameter(format!(
                    "Cell index {} out of bounds",
                    cell
                )));
            }
        }
        let new_cell_ids: Vec<String> =
            indices.iter().map(|&c| self.cell_ids[c].clone()).collect();

        match &self.data {
            Storage::Sparse(m) => {
                let mut tri = TriMat::new((indices.len(), self.n_genes()));
                for (new_row, &old_row) in indices.iter().enumerate() {
                    if let Some(row) = m.outer_view(old_row) {
                        for (gene, &val) in row.iter() {
                            tri.add_triplet(new_row, gene, val);
                        }
                    }
                }
                Self::from_sparse(tri.to_csr(), new_cell_ids, self.gene_ids.clone())
            }
            Storage::Dense(m) => {
                let mut dense = DMatrix::zeros(indices.len(), self.n_genes());
                for (new_row, &old_row) in indices.iter().enumerate() {
                    dense.row_mut(new_row).copy_from(&m.row(old_row));
                }
                Self::from_dense(dense, new_cell_ids, self.gene_ids.clone())
            }
        }
    }

    /// Subset to the given genes (by column index), preserving order of `indices`.
    ///
    /// An empty `indices` slice is legal and yields a matrix with zero genes.
    pub fn subset_genes(&self, indices: &[usize]) -> Result<Self> {
        for &gene in indices {
            if gene >= self.n_genes() {
                return Err(PrepError::InvalidParameter(format!(
                    "Gene index {} out of bounds",
                    gene
                )));
            }
        }
        let new_gene_ids: Vec<String> =
            indices.iter().map(|&g| self.gene_ids[g].clone()).collect();

        match &self.data {
            Storage::Sparse(m) => {
                let col_map: HashMap<usize, usize> = indices
                    .iter()
                    .enumerate()
                    .map(|(new_idx, &old_idx)| (old_idx, new_idx))
                    .collect();
                let mut tri = TriMat::new((self.n_cells(), indices.len()));
                for (cell, row) in m.outer_iterator().enumerate() {
                    for (old_gene, &val) in row.iter() {
                        if let Some(&new_gene) = col_map.get(&old_gene) {
                            tri.add_triplet(cell, new_gene, val);
                        }
                    }
                }
                Self::from_sparse(tri.to_csr(), self.cell_ids.clone(), new_gene_ids)
            }
            Storage::Dense(m) => {
                let mut dense = DMatrix::zeros(self.n_cells(), indices.len());
                for (new_col, &old_col) in indices.iter().enumerate() {
                    dense.column_mut(new_col).copy_from(&m.column(old_col));
                }
                Self::from_dense(dense, self.cell_ids.clone(), new_gene_ids)
            }
        }
    }

    /// Dense copy of the full matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        match &self.data {
            Storage::Sparse(m) => {
                let mut dense = DMatrix::zeros(self.n_cells(), self.n_genes());
                for (cell, row) in m.outer_iterator().enumerate() {
                    for (gene, &val) in row.iter() {
                        dense[(cell, gene)] = val;
                    }
                }
                dense
            }
            Storage::Dense(m) => m.clone(),
        }
    }

    /// Apply `f` elementwise, returning a new matrix.
    ///
    /// Sparse backing survives only when `f(0) == 0`; otherwise the result
    /// densifies, since the transform fills in the implicit zeros.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        match &self.data {
            Storage::Sparse(m) if f(0.0) == 0.0 => {
                let mapped = m.map(|&v| f(v));
                Self {
                    data: Storage::Sparse(mapped),
                    cell_ids: self.cell_ids.clone(),
                    gene_ids: self.gene_ids.clone(),
                }
            }
            _ => {
                let dense = self.to_dense().map(f);
                Self {
                    data: Storage::Dense(dense),
                    cell_ids: self.cell_ids.clone(),
                    gene_ids: self.gene_ids.clone(),
                }
            }
        }
    }

    /// Scale each cell's row by a per-cell factor.
    pub fn scale_rows(&self, factors: &[f64]) -> Result<Self> {
        if factors.len() != self.n_cells() {
            return Err(PrepError::DimensionMismatch {
                expected: self.n_cells(),
                actual: factors.len(),
            });
        }
        match &self.data {
            Storage::Sparse(m) => {
                let mut tri = TriMat::new((self.n_cells(), self.n_genes()));
                for (cell, row) in m.outer_iterator().enumerate() {
                    for (gene, &val) in row.iter() {
                        tri.add_triplet(cell, gene, val * factors[cell]);
                    }
                }
                Self::from_sparse(tri.to_csr(), self.cell_ids.clone(), self.gene_ids.clone())
            }
            Storage::Dense(m) => {
                let mut dense = m.clone();
                for cell in 0..dense.nrows() {
                    let mut row = dense.row_mut(cell);
                    row *= factors[cell];
                }
                Self::from_dense(dense, self.cell_ids.clone(), self.gene_ids.clone())
            }
        }
    }

    /// Load a matrix from a delimited file, gzip-decompressing when the
    /// path ends in `.gz`.
    ///
    /// Fails with [`PrepError::MissingInput`] when the file does not exist.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PrepError::MissingInput(path.to_path_buf()));
        }
        let file = File::open(path)?;
        if path.extension().is_some_and(|e| e == "gz") {
            Self::from_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            Self::from_reader(BufReader::new(file))
        }
    }

    /// Write the matrix as delimited text, gzip-compressing when the path
    /// ends in `.gz`.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        if path.extension().is_some_and(|e| e == "gz") {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            self.write_delimited(&mut encoder)?;
            encoder.finish()?;
            Ok(())
        } else {
            let mut writer = BufWriter::new(file);
            self.write_delimited(&mut writer)
        }
    }

    /// Parse a matrix from delimited text.
    ///
    /// Expected format:
    /// - First row: header with gene IDs (first field is the cell ID header)
    /// - Subsequent rows: cell ID followed by values
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| PrepError::EmptyData("Empty matrix file".to_string()))??;
        let header: Vec<&str> = header_line.split(',').collect();
        if header.len() < 2 {
            return Err(PrepError::EmptyData(
                "Matrix file must have at least one gene column".to_string(),
            ));
        }
        let gene_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_genes = gene_ids.len();

        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut cell_ids: Vec<String> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            cell_ids.push(fields[0].trim().to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                if col_idx >= n_genes {
                    break;
                }
                let value: f64 =
                    value_str
                        .trim()
                        .parse()
                        .map_err(|_| PrepError::InvalidCount {
                            value: value_str.to_string(),
                            row: row_idx,
                            col: col_idx,
                        })?;
                if value != 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        if cell_ids.is_empty() {
            return Err(PrepError::EmptyData("No cells in matrix file".to_string()));
        }

        let mut tri = TriMat::new((cell_ids.len(), n_genes));
        for (row, col, val) in triplets {
            tri.add_triplet(row, col, val);
        }
        Self::from_sparse(tri.to_csr(), cell_ids, gene_ids)
    }

    fn write_delimited<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "cell_id")?;
        for gene_id in &self.gene_ids {
            write!(writer, ",{}", gene_id)?;
        }
        writeln!(writer)?;

        for (cell, cell_id) in self.cell_ids.iter().enumerate() {
            write!(writer, "{}", cell_id)?;
            for gene in 0..self.n_genes() {
                write!(writer, ",{}", self.get(cell, gene))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

fn check_labels(
    nrows: usize,
    ncols: usize,
    cell_ids: &[String],
    gene_ids: &[String],
) -> Result<()> {
    if nrows != cell_ids.len() {
        return Err(PrepError::DimensionMismatch {
            expected: nrows,
            actual: cell_ids.len(),
        });
    }
    if ncols != gene_ids.len() {
        return Err(PrepError::DimensionMismatch {
            expected: ncols,
            actual: gene_ids.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> ExpressionMatrix {
        // 3 cells × 4 genes
        let mut tri = TriMat::new((3, 4));
        tri.add_triplet(0, 0, 10.0);
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(1, 0, 5.0);
        tri.add_triplet(1, 2, 7.0);
        tri.add_triplet(2, 0, 2.0);
        tri.add_triplet(2, 3, 4.0);
        // gene 1 is only in cell 0, gene 3 only in cell 2

        let cell_ids = vec!["Cell_1".to_string(), "Cell_2".to_string(), "Cell_3".to_string()];
        let gene_ids = vec![
            "Gene_A".to_string(),
            "Gene_B".to_string(),
            "Gene_C".to_string(),
            "Gene_D".to_string(),
        ];
        ExpressionMatrix::from_sparse(tri.to_csr(), cell_ids, gene_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_cells(), 3);
        assert_eq!(mat.n_genes(), 4);
        assert!(mat.is_sparse());
    }

    #[test]
    fn test_get_values() {
        let mat = create_test_matrix();
        assert_eq!(mat.get(0, 0), 10.0);
        assert_eq!(mat.get(0, 2), 0.0); // sparse entry
        assert_eq!(mat.get(2, 3), 4.0);
    }

    #[test]
    fn test_label_mismatch_rejected() {
        let tri: TriMat<f64> = TriMat::new((2, 2));
        let result = ExpressionMatrix::from_sparse(
            tri.to_csr(),
            vec!["only_one".to_string()],
            vec!["a".to_string(), "b".to_string()],
        );
        assert!(matches!(result, Err(PrepError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_row_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.row_sums(), vec![11.0, 12.0, 6.0]);
    }

    #[test]
    fn test_col_sums_and_max() {
        let mat = create_test_matrix();
        assert_eq!(mat.col_sums(), vec![17.0, 1.0, 7.0, 4.0]);
        assert_eq!(mat.col_max(), vec![10.0, 1.0, 7.0, 4.0]);
    }

    #[test]
    fn test_subset_cells() {
        let mat = create_test_matrix();
        let subset = mat.subset_cells(&[0, 2]).unwrap();
        assert_eq!(subset.n_cells(), 2);
        assert_eq!(subset.cell_ids(), &["Cell_1", "Cell_3"]);
        assert_eq!(subset.get(1, 3), 4.0);
    }

    #[test]
    fn test_subset_genes_preserves_order() {
        let mat = create_test_matrix();
        let subset = mat.subset_genes(&[0, 2]).unwrap();
        assert_eq!(subset.gene_ids(), &["Gene_A", "Gene_C"]);
        assert_eq!(subset.get(1, 1), 7.0);
    }

    #[test]
    fn test_subset_genes_empty_is_legal() {
        let mat = create_test_matrix();
        let subset = mat.subset_genes(&[]).unwrap();
        assert_eq!(subset.n_genes(), 0);
        assert_eq!(subset.n_cells(), 3);
    }

    #[test]
    fn test_map_values_preserves_sparsity_when_zero_fixed() {
        let mat = create_test_matrix();
        let doubled = mat.map_values(|v| v * 2.0);
        assert!(doubled.is_sparse());
        assert_eq!(doubled.get(0, 0), 20.0);
        assert_eq!(doubled.get(0, 2), 0.0);
    }

    #[test]
    fn test_map_values_densifies_when_zero_moves() {
        let mat = create_test_matrix();
        let shifted = mat.map_values(|v| v + 1.0);
        assert!(!shifted.is_sparse());
        assert_eq!(shifted.get(0, 2), 1.0);
    }

    #[test]
    fn test_scale_rows() {
        let mat = create_test_matrix();
        let scaled = mat.scale_rows(&[1.0, 2.0, 0.5]).unwrap();
        assert_eq!(scaled.get(1, 2), 14.0);
        assert_eq!(scaled.get(2, 3), 2.0);
    }

    #[test]
    fn test_csv_roundtrip() {
        let mat = create_test_matrix();
        let temp = NamedTempFile::new().unwrap();
        mat.to_path(temp.path()).unwrap();

        let loaded = ExpressionMatrix::from_path(temp.path()).unwrap();
        assert_eq!(loaded.cell_ids(), mat.cell_ids());
        assert_eq!(loaded.gene_ids(), mat.gene_ids());
        for cell in 0..mat.n_cells() {
            for gene in 0..mat.n_genes() {
                assert_eq!(loaded.get(cell, gene), mat.get(cell, gene));
            }
        }
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mat = create_test_matrix();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.csv.gz");
        mat.to_path(&path).unwrap();

        let loaded = ExpressionMatrix::from_path(&path).unwrap();
        assert_eq!(loaded.n_cells(), mat.n_cells());
        assert_eq!(loaded.get(1, 2), 7.0);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let err = ExpressionMatrix::from_path("/no/such/file.csv.gz").unwrap_err();
        match err {
            PrepError::MissingInput(path) => {
                assert!(path.to_string_lossy().contains("no/such/file"));
            }
            other => panic!("expected MissingInput, got {:?}", other),
        }
    }
}
