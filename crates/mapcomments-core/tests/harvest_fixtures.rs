//! Harvest the fixture module on disk through the directory loader

use mapcomments_core::{
    CommentMap, CommentMode, DiagnosticKind, DirLoader, Error, Harvester,
};
use std::path::PathBuf;

const GEOMETRY: &str = "example.com/shapes/geometry";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("shapes")
}

fn harvester() -> Harvester<DirLoader> {
    Harvester::new(DirLoader::new(fixtures_dir()))
}

fn key(suffix: &str) -> String {
    format!("{GEOMETRY}.{suffix}")
}

#[test]
fn test_harvest_geometry_synopsis() {
    let mut comments = CommentMap::new();
    harvester()
        .harvest(&mut comments, "./geometry", CommentMode::Synopsis)
        .expect("harvest geometry");

    let expected = [
        ("Circle", "Circle is round."),
        ("Circle.Center", "Center of the circle."),
        ("Circle.Radius", "Radius in pixels."),
        ("Point", "Point is a location on the plane."),
        ("Point.X", "X is the horizontal coordinate."),
        ("Point.Y", "Y is the vertical coordinate."),
        ("Polygon", "Shapes come in a few kinds."),
        ("Polygon.Points", "Points are the vertices."),
        ("Square", "Square has four equal sides."),
        ("Square.Side", "Length of a side."),
        ("Stringer", "Stringer is implemented by Point."),
        ("Stringer.String", "String formats the shape."),
    ];
    let expected: CommentMap = expected
        .iter()
        .map(|(k, v)| (key(k), v.to_string()))
        .collect();

    assert_eq!(comments, expected);
}

#[test]
fn test_harvest_geometry_full_comment() {
    let mut comments = CommentMap::new();
    harvester()
        .harvest(&mut comments, GEOMETRY, CommentMode::Full)
        .expect("harvest geometry");

    assert_eq!(
        comments[&key("Point")],
        "Point is a location on the plane. Coordinates are in pixels."
    );
    assert_eq!(
        comments[&key("Licensed")],
        "Copyright 2024 The Shapes Authors."
    );
    assert_eq!(comments[&key("Stringer")], "Stringer is implemented by [Point].");
    assert!(!comments.contains_key(&key("hidden.Visible")));
}

#[test]
fn test_harvest_same_package_twice_by_different_paths() {
    let mut by_dir = CommentMap::new();
    harvester()
        .harvest(&mut by_dir, "./geometry", CommentMode::Synopsis)
        .unwrap();

    let mut both = by_dir.clone();
    harvester()
        .harvest(&mut both, GEOMETRY, CommentMode::Synopsis)
        .unwrap();

    // Same keys, same values: last write wins with identical text
    assert_eq!(by_dir, both);
}

#[test]
fn test_broken_package_reports_syntax_errors() {
    let mut comments = CommentMap::new();
    let err = harvester()
        .harvest(&mut comments, "./broken", CommentMode::Synopsis)
        .unwrap_err();

    let Error::PackageLoad(err) = err else {
        panic!("expected a package load error, got {err:?}");
    };
    assert!(err.errors_of_kind(DiagnosticKind::Parse).count() >= 1);
    assert!(
        err.to_string().contains("broken.go:"),
        "message should carry positions: {err}"
    );
    assert!(comments.is_empty());
}

#[test]
fn test_batch_stops_at_first_failure() {
    let mut comments = CommentMap::new();
    let result = harvester().harvest_all(
        &mut comments,
        ["./geometry", "./broken", "./missing"],
        CommentMode::Synopsis,
    );

    assert!(matches!(result, Err(Error::PackageLoad(_))));
    assert!(comments.contains_key(&key("Point")));
}

#[test]
fn test_missing_package() {
    let mut comments = CommentMap::new();
    let err = harvester()
        .harvest(&mut comments, "./missing", CommentMode::Synopsis)
        .unwrap_err();

    let Error::PackageLoad(err) = err else {
        panic!("expected a package load error, got {err:?}");
    };
    assert_eq!(err.errors()[0].kind, DiagnosticKind::List);
}
