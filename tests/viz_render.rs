use eia_trends::models::{Metric, Observation};
use eia_trends::viz;
use tempfile::tempdir;

fn sample_points() -> Vec<Observation> {
    let mut out = Vec::new();
    // Series 1: CO residential
    for (period, v) in [
        ("2023-01", 2_400_000.0),
        ("2023-02", 2_410_000.0),
        ("2023-03", 2_420_000.0),
    ] {
        out.push(Observation {
            period: period.into(),
            state_id: "CO".into(),
            state_name: "Colorado".into(),
            sector_id: "RES".into(),
            sector_name: "residential".into(),
            customers: Some(v),
            price: None,
            revenue: None,
            sales: None,
        });
    }
    // Series 2: TX residential
    for (period, v) in [
        ("2023-01", 10_100_000.0),
        ("2023-02", 10_150_000.0),
        ("2023-03", 10_200_000.0),
    ] {
        out.push(Observation {
            period: period.into(),
            state_id: "TX".into(),
            state_name: "Texas".into(),
            sector_id: "RES".into(),
            sector_name: "residential".into(),
            customers: Some(v),
            price: None,
            revenue: None,
            sales: None,
        });
    }
    out
}

#[test]
fn renders_svg() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chart.svg");
    viz::plot_lines(&sample_points(), Metric::Customers, &path, 800, 500).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("<svg"));
}

#[test]
fn renders_png() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chart.png");
    viz::plot_lines(&sample_points(), Metric::Customers, &path, 800, 500).unwrap();

    let meta = std::fs::metadata(&path).unwrap();
    assert!(meta.len() > 0, "png has content");
}

#[test]
fn empty_input_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chart.svg");
    let err = viz::plot_lines(&[], Metric::Customers, &path, 800, 500).unwrap_err();
    assert!(err.to_string().contains("no data"));
}

#[test]
fn all_missing_metric_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chart.svg");
    let mut points = sample_points();
    for p in &mut points {
        p.customers = None;
    }
    let err = viz::plot_lines(&points, Metric::Customers, &path, 800, 500).unwrap_err();
    assert!(err.to_string().contains("no numeric values"));
}
