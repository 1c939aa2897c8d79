/*
 * File: /main.rs
 * Created Date: Tuesday, October 14th 2026
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-14				Command line front end: factorize an .npy matrix
 */

use std::env;
use std::error::Error;
use std::fs::File;
use std::process;
use std::time::Instant;

use chrono::Local;
use log::{error, info, LevelFilter};
use ndarray_npy::WriteNpyExt;

use fast_nmf::{init_logger, CliConfig, DataMatrix, NmfModel};

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn run(config: CliConfig) -> Result<(), Box<dyn Error>> {
    let method = "fast_nmf";
    let nmf = config.get_nmf().clone();
    let (n_samples, n_features) = config.get_matrix().dim();
    info!(
        "[method: {}] [{}] Matrix {}x{}, solver: {}, beta_loss: {}, n_components: {:?}",
        method,
        timestamp(),
        n_samples,
        n_features,
        nmf.solver,
        nmf.beta_loss,
        nmf.n_components
    );

    let x = DataMatrix::dense(config.get_matrix().clone());
    let mut model = NmfModel::with_config(nmf);
    let start = Instant::now();
    let w = model.fit_transform(&x, None, None)?;
    info!(
        "[method: {}] [{}] Factorized in {:.2}s, {} iterations, reconstruction error {:.6}",
        method,
        timestamp(),
        start.elapsed().as_secs_f32(),
        model.n_iter().unwrap_or(0),
        model.reconstruction_err().unwrap_or(f64::NAN)
    );

    let out = config.get_output_dir();
    w.write_npy(File::create(out.join("W.npy"))?)?;
    if let Some(h) = model.components() {
        h.write_npy(File::create(out.join("H.npy"))?)?;
    }
    info!(
        "[method: {}] [{}] Wrote W.npy and H.npy to {}",
        method,
        timestamp(),
        out.display()
    );
    Ok(())
}

fn main() {
    init_logger(LevelFilter::Info);

    let config = CliConfig::new(env::args()).unwrap_or_else(|err| {
        error!("Problem parsing arguments: {}", err);
        eprintln!("usage: fast_nmf <matrix.npy> <n_components> [config.toml]");
        process::exit(1);
    });

    if let Err(err) = run(config) {
        error!("Application error: {}", err);
        process::exit(1);
    }
}
