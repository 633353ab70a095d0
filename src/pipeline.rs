//! File-level entry points: each one resolves the pair's paths, runs one stage and
//! writes that stage's products.

use crate::config::{PairConfig, PairPaths, Stage};
use crate::core::{CleanedOffsets, OffsetCleaner, ScatterStacker, StackedOffsets, StackerParams};
use crate::io::ampcor::{find_chunk_outputs, read_observations};
use crate::io::raster::{read_complex_be, write_complex_be, write_real_be};
use crate::io::{AmpcorHeader, AmpcorPlan, InterferogramScript, OffsetParams, SlcGeometry};
use crate::types::{valid_cell_count, OffsetResult};
use std::path::{Path, PathBuf};

/// Write the matcher chunk inputs and batch script for a pair
pub fn plan_ampcor(config: &PairConfig) -> OffsetResult<Vec<PathBuf>> {
    let paths = PairPaths::resolve(config, Stage::PlanAmpcor)?;
    log::info!("🧭 Planning AMPCOR run for {}", paths.pair);

    let reference = SlcGeometry::load(&paths.ref_par)?;
    let secondary = SlcGeometry::load(&paths.sec_par)?;
    let plan = AmpcorPlan::new(
        &config.reference,
        &config.secondary,
        &config.ampcor_bin,
        config.n_proc,
    );
    let headers = plan.chunks(&reference, &secondary, config.initial_offset)?;
    plan.write(&paths.data_dir, &headers)
}

/// Stack a pair's matcher outputs into `<pair>.offmap.{par,off,snr}`
pub fn stack_pair(config: &PairConfig) -> OffsetResult<StackedOffsets> {
    let paths = PairPaths::resolve(config, Stage::Stack)?;
    log::info!("🧱 Stacking dense offsets for {}", paths.pair);

    let params = match &config.stacker {
        Some(params) => params.clone(),
        None => StackerParams::from_header(&AmpcorHeader::load(&paths.ampcor_header)?),
    };
    log::debug!("Stacker parameters: {:?}", params);

    let chunks = find_chunk_outputs(&paths.data_dir, &paths.pair)?;
    let observations = read_observations(&chunks, config.layout, &paths.pair)?;

    let mut stacker = ScatterStacker::new(params);
    if paths.ref_par.is_file() {
        stacker = stacker.with_geometry(SlcGeometry::load(&paths.ref_par)?);
    } else {
        log::warn!(
            "{} not found, interferogram fields of the header left at zero",
            paths.ref_par.display()
        );
    }
    let mut stacked = stacker.stack(&observations)?;
    stacked.params.title = paths.pair.clone();

    std::fs::create_dir_all(&paths.out_dir)?;
    stacked.params.write(&paths.offmap_par)?;
    write_complex_be(&paths.offmap_off, &stacked.grid)?;
    write_real_be(&paths.offmap_snr, &stacked.quality)?;
    log::info!(
        "Stacked grid {:?} with {} valid cells written to {}",
        stacked.grid.dim(),
        valid_cell_count(&stacked.grid),
        paths.offmap_off.display()
    );
    Ok(stacked)
}

/// Clean a stacked offset map and write the interferogram-ready products
pub fn clean_pair(config: &PairConfig) -> OffsetResult<CleanedOffsets> {
    let cleaner = OffsetCleaner::new(config.cleaner.clone())?;
    let paths = PairPaths::resolve(config, Stage::Clean)?;
    log::info!("🧹 Cleaning dense offsets for {}", paths.pair);

    let header = OffsetParams::load(&paths.offmap_par)?;
    let grid = read_complex_be(&paths.offmap_off, header.shape())?;
    let cleaned = cleaner.clean(&grid, &header)?;

    std::fs::create_dir_all(&paths.out_dir)?;
    write_complex_be(&paths.interp_off, &cleaned.grid)?;
    cleaned.params.write(&paths.interp_par)?;

    let (range_step, azimuth_step) = config
        .cleaner
        .target_spacing
        .unwrap_or((header.rgsp, header.azsp));
    let script = InterferogramScript::for_pair(
        &config.interf_bin,
        &config.reference,
        &config.secondary,
        &script_argument(&paths, &paths.interp_par),
        &script_argument(&paths, &paths.interp_off),
        range_step,
        azimuth_step,
    );
    script.write(&paths.interf_script)?;

    log::info!(
        "Cleaned offsets written: {} ({:?})",
        paths.interp_off.display(),
        cleaned.grid.dim()
    );
    Ok(cleaned)
}

/// Human-readable summary of a parameter file
pub fn describe_par<P: AsRef<Path>>(path: P) -> OffsetResult<String> {
    Ok(OffsetParams::load(path)?.describe())
}

/// Script arguments are relative when the script sits next to the products
fn script_argument(paths: &PairPaths, product: &Path) -> String {
    match product.file_name() {
        Some(name) if paths.out_dir == paths.data_dir => name.to_string_lossy().into_owned(),
        _ => product.display().to_string(),
    }
}
