use densoff::io::raster::read_complex_be;
use densoff::io::{AmpcorHeader, OffsetParams};
use densoff::pipeline::describe_par;
use densoff::{clean_pair, plan_ampcor, stack_pair, OffsetError, PairConfig};
use std::fmt::Write as _;
use std::path::Path;

const SLC_PAR: &str = "title:     ICEYE test scene\n\
range_samples:                  600\n\
azimuth_lines:                  300\n\
range_pixel_spacing:            0.500000   m\n\
azimuth_pixel_spacing:          0.250000   m\n";

fn write_scene(dir: &Path) {
    std::fs::write(dir.join("R.par"), SLC_PAR).unwrap();
    std::fs::write(dir.join("S.par"), SLC_PAR).unwrap();
}

/// Matcher output for an 8x10 estimation grid split over two chunks
fn write_matcher_outputs(dir: &Path) {
    for (index, rows) in [(1, 0..4), (2, 4..8)] {
        let mut text = String::from("     *** AMPCOR ***\n");
        for row in rows {
            for col in 0..10 {
                let _ = writeln!(
                    text,
                    "{:>8} {:>12.5} {:>8} {:>12.5} {:>12.5} {:>12.5} {:>12.5} {:>12.5}",
                    31 + 30 * col,
                    1.5,
                    45 + 30 * row,
                    -0.75,
                    15.0,
                    0.01,
                    0.01,
                    0.0
                );
            }
        }
        std::fs::write(dir.join(format!("R-S.offmap_{}", index)), text).unwrap();
    }
}

#[cfg(unix)]
fn assert_mode(path: &Path, expected: u32) {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, expected, "{}", path.display());
}

#[cfg(not(unix))]
fn assert_mode(_path: &Path, _expected: u32) {}

#[test]
fn test_plan_stack_clean() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_scene(dir.path());

    let mut config = PairConfig::new(dir.path(), "R", "S");
    config.n_proc = 2;
    config.interf_bin = "interf_offset64b".to_string();
    config.cleaner.target_spacing = Some((60, 60));

    // Matcher planning
    let written = plan_ampcor(&config).expect("Failed to plan AMPCOR run");
    assert_eq!(written.len(), 3);
    let header = AmpcorHeader::load(dir.path().join("R-S.offmap_2.in")).expect("Failed to read header");
    assert_eq!(header.azimuth, (90, 240, 30));
    assert_eq!(header.range, (1, 600, 30));
    let batch = std::fs::read_to_string(dir.path().join("bat_R-S")).unwrap();
    assert_eq!(
        batch,
        "ampcor R-S.offmap_1.in old &\nampcor R-S.offmap_2.in old &\n"
    );
    assert_mode(&dir.path().join("R-S.offmap_1.in"), 0o755);

    // Stacking
    write_matcher_outputs(dir.path());
    let stacked = stack_pair(&config).expect("Failed to stack");
    assert_eq!(stacked.grid.dim(), (8, 10));
    assert_eq!(stacked.params.ofw_w, 64);

    // Cleaning
    let cleaned = clean_pair(&config).expect("Failed to clean");
    println!("{}", serde_json::to_string_pretty(&cleaned.report).unwrap());
    assert_eq!(cleaned.grid.dim(), (4, 5));

    let params = OffsetParams::load(dir.path().join("R-S.offmap.par.interp")).unwrap();
    assert_eq!((params.npix, params.nrec), (5, 4));
    assert_eq!((params.rgsp, params.azsp), (60, 60));
    assert_eq!(params.x_end, params.x_start + 4 * 60);
    assert_eq!(params.y_end, params.y_start + 3 * 60);

    let grid = read_complex_be(dir.path().join("R-S.offmap.off.new.interp"), params.shape()).unwrap();
    assert_eq!(grid, cleaned.grid);
    assert!((grid[[2, 2]].re - 1.5).abs() < 1e-5);
    assert!((grid[[2, 2]].im + 0.75).abs() < 1e-5);

    let script_path = dir.path().join("bat_inter.R-S");
    let script = std::fs::read_to_string(&script_path).unwrap();
    assert_eq!(
        script,
        "interf_offset64b R.slc S.slc R.par S.par R-S.offmap.par.interp \
         R-S.offmap.off.new.interp R.pwr1 S.pwr2 cocoR-S.dat 30 30 60 60"
    );
    assert_mode(&script_path, 0o777);

    let summary = describe_par(dir.path().join("R-S.offmap.par.interp")).unwrap();
    assert!(summary.contains("R-S"));
}

#[test]
fn test_clean_without_stacked_map_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = PairConfig::new(dir.path(), "R", "S");
    match clean_pair(&config) {
        Err(OffsetError::MissingInputFile { path }) => {
            assert_eq!(path, dir.path().join("R-S.offmap.par"));
        }
        other => panic!("expected MissingInputFile, got {:?}", other.map(|c| c.report)),
    }
}

#[test]
fn test_stack_without_matcher_output_is_insufficient() {
    let dir = tempfile::tempdir().unwrap();
    write_scene(dir.path());
    let config = PairConfig::new(dir.path(), "R", "S");
    plan_ampcor(&config).expect("Failed to plan AMPCOR run");

    assert!(matches!(
        stack_pair(&config),
        Err(OffsetError::InsufficientObservations { .. })
    ));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PairConfig::new(dir.path(), "R", "S");
    config.cleaner = config.cleaner.clone().with_fill().with_boxcar();
    let path = dir.path().join("pair.json");
    config.to_json_file(&path).unwrap();

    let loaded = PairConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
}
