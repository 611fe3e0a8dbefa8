use crate::error::{FieldError, Result};
use crate::quantity::FieldSet;
use ndarray_npy::write_npy;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-name-safe form of a field label: `Re(ux)` becomes `Re_ux`,
/// `total:rho` becomes `total_rho`.
pub fn file_stem(label: &str) -> String {
    label
        .chars()
        .filter(|c| *c != ')')
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Writes every field as `<dir>/<prefix>_<label>.npy` and returns the paths.
pub fn write_field_set(fields: &FieldSet<f64>, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| FieldError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(fields.len());
    for (key, values) in fields.iter() {
        let path = dir.join(format!("{}_{}.npy", prefix, file_stem(&key.to_string())));
        write_npy(&path, values).map_err(|e| FieldError::storage(&path, e.to_string()))?;
        debug!(path = %path.display(), shape = ?values.dim(), "exported field");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{Component, FieldKey, Quantity};
    use ndarray::{array, Array2};
    use ndarray_npy::read_npy;

    #[test]
    fn label_stems() {
        assert_eq!(file_stem("Re(ux)"), "Re_ux");
        assert_eq!(file_stem("total:rho"), "total_rho");
        assert_eq!(file_stem("abs(p)"), "abs_p");
    }

    #[test]
    fn writes_one_file_per_field() {
        let dir = std::env::temp_dir().join(format!("jet-fields-export-{}", std::process::id()));
        let mut fields = FieldSet::new();
        fields
            .insert(Quantity::AxialVelocity, array![[1.0, 2.0], [3.0, 4.0]])
            .unwrap();
        fields
            .insert(
                FieldKey::new(Quantity::Pressure, Component::Imaginary),
                array![[0.5, 0.0], [0.0, -0.5]],
            )
            .unwrap();

        let paths = write_field_set(&fields, &dir, "case1").unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&dir.join("case1_ux.npy")));
        assert!(paths.contains(&dir.join("case1_Im_p.npy")));

        let back: Array2<f64> = read_npy(dir.join("case1_ux.npy")).unwrap();
        assert_eq!(&back, fields.get(Quantity::AxialVelocity).unwrap());
        fs::remove_dir_all(&dir).unwrap();
    }
}
