use std::fs;

use anyhow::Result;
use armarker_multi::{ConfigError, MultiMarkerConfig, PatternIdTable, PatternType};

#[test]
fn loads_from_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cube.dat");
    fs::write(
        &path,
        "# two faces of a cube\n2\n\n10\n50\n1 0 0 0\n0 1 0 0\n0 0 1 25\n\n11\n50\n1 0 0 0\n0 0 -1 -25\n0 1 0 0\n",
    )?;

    let config = MultiMarkerConfig::from_file(&path, &mut PatternIdTable::new())?;
    assert_eq!(config.len(), 2);
    assert!(config.markers().iter().all(|m| m.pattern_type == PatternType::Matrix));

    // Two perpendicular faces are not planar.
    let fit = config.plane_fit()?;
    assert!(fit.planarity > 1e-3);
    Ok(())
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = MultiMarkerConfig::from_file(dir.path().join("nope.dat"), &mut PatternIdTable::new())
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn zero_marker_file_is_invalid() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.dat");
    fs::write(&path, "0\n")?;
    let err = MultiMarkerConfig::from_file(&path, &mut PatternIdTable::new()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    Ok(())
}

#[test]
fn config_serializes_to_json() -> Result<()> {
    let config = MultiMarkerConfig::parse(
        "1\n3\n40\n1 0 0 0\n0 1 0 0\n0 0 1 0\n",
        &mut PatternIdTable::new(),
    )?;
    let json = serde_json::to_string(&config)?;
    let back: MultiMarkerConfig = serde_json::from_str(&json)?;
    assert_eq!(config, back);
    Ok(())
}
