pub mod postal_load;

use pyo3::prelude::*;

#[pyfunction]
fn import_postal_data(
    file_path: &str,
    db_name: &str,
    db_user: &str,
    db_password: &str,
    db_host: &str,
    db_port: &str,
) -> PyResult<(u64, u64, u64)> {
    let config = postal_load::ImportConfig {
        file_path: file_path.to_string(),
        db_name: db_name.to_string(),
        db_user: db_user.to_string(),
        db_password: db_password.to_string(),
        db_host: db_host.to_string(),
        db_port: db_port.to_string(),
    };
    let report = postal_load::launch_import(config)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))?;
    Ok((report.rows_read, report.rows_inserted, report.rows_skipped))
}

#[pymodule]
#[pyo3(name = "duckdb_postal")]
fn duckdb_postal(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(import_postal_data, m)?)?;
    Ok(())
}
