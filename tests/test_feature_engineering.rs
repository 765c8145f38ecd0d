//! Integration test: transformations, aggregation and variant building

use costbench::config::PipelineConfig;
use costbench::dataset::Dataset;
use costbench::feature_engineering::{
    aggregate_groups, build_variants, CurveFitter, FeatureTransformer, LeastSquaresFitter,
    TransformDecision, VariantKind,
};
use costbench::training::PolynomialRegression;
use costbench::Result;
use ndarray::Array1;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts polynomial fits while delegating to least squares
#[derive(Default)]
struct CountingFitter {
    calls: AtomicUsize,
}

impl CurveFitter for CountingFitter {
    fn fit(&self, x: &Array1<f64>, y: &Array1<f64>, degree: usize) -> Result<PolynomialRegression> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LeastSquaresFitter.fit(x, y, degree)
    }
}

fn column(values: impl IntoIterator<Item = f64>) -> Vec<Option<f64>> {
    values.into_iter().map(Some).collect()
}

fn pair(build: impl Fn(std::ops::Range<usize>) -> Dataset) -> (Dataset, Dataset) {
    (build(0..40), build(40..50))
}

/// Heavy right tail: mostly small values with a few large ones
fn skewed_value(i: usize) -> f64 {
    if i % 10 == 0 { 500.0 + i as f64 } else { (i % 7) as f64 + 1.0 }
}

#[test]
fn test_skewed_feature_logged_without_polynomial_fit() {
    let (train, test) = pair(|rows| {
        Dataset::from_columns(
            vec![
                ("skewed".to_string(), column(rows.clone().map(skewed_value))),
                ("y".to_string(), column(rows.map(|i| 10.0 + i as f64))),
            ],
            "y",
        )
        .unwrap()
    });

    let transformer = FeatureTransformer::default().with_fitter(CountingFitter::default());
    let (train_out, test_out, reports) = transformer.transform_features(&train, &test).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].decision, TransformDecision::Log1p);
    assert!(reports[0].skewness.unwrap() > 0.5);
    assert_eq!(transformer.fitter().calls.load(Ordering::SeqCst), 0);

    // Same mapping on both splits
    for (data, rows) in [(&train_out, 0..40), (&test_out, 40..50)] {
        let values = data.column_values("skewed").unwrap();
        for (v, i) in values.iter().zip(rows) {
            assert!((v.unwrap() - skewed_value(i).ln_1p()).abs() < 1e-12);
        }
    }
}

#[test]
fn test_quadratic_relationship_replaced_by_curve() {
    // Near-symmetric range keeps the features unskewed
    let x_of = |i: usize| (i % 21) as f64 - 10.0;
    let (train, test) = pair(|rows| {
        let rows: Vec<usize> = rows.collect();
        Dataset::from_columns(
            vec![
                ("quad".to_string(), column(rows.iter().map(|&i| x_of(i)))),
                ("shifted".to_string(), column(rows.iter().map(|&i| x_of(i) + 3.0))),
                ("y".to_string(), column(rows.iter().map(|&i| 200.0 + x_of(i) * x_of(i)))),
            ],
            "y",
        )
        .unwrap()
    });

    let transformer = FeatureTransformer::default().with_fitter(CountingFitter::default());
    let (train_out, _, reports) = transformer.transform_features(&train, &test).unwrap();

    // y depends on x² only, so the curve beats the line for both columns
    for report in &reports {
        assert_eq!(report.decision, TransformDecision::Polynomial, "{}", report.feature);
        assert!(report.r2_gain.unwrap() > 0.01);
    }
    let quad = train_out.column_values("quad").unwrap();
    let y = train_out.target_array().unwrap();
    for (q, target) in quad.iter().zip(y.iter()) {
        assert!((q.unwrap() - target).abs() < 1e-6);
    }
    assert_eq!(transformer.fitter().calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_linear_feature_left_unchanged() {
    let x_of = |i: usize| (i % 21) as f64 - 10.0;
    let (train, test) = pair(|rows| {
        let rows: Vec<usize> = rows.collect();
        Dataset::from_columns(
            vec![
                ("lin".to_string(), column(rows.iter().map(|&i| x_of(i)))),
                ("y".to_string(), column(rows.iter().map(|&i| 50.0 + 3.0 * x_of(i)))),
            ],
            "y",
        )
        .unwrap()
    });

    let (train_out, test_out, reports) = FeatureTransformer::default().transform_features(&train, &test).unwrap();
    assert_eq!(reports[0].decision, TransformDecision::Unchanged);
    assert_eq!(train_out.column_values("lin").unwrap(), train.column_values("lin").unwrap());
    assert_eq!(test_out.column_values("lin").unwrap(), test.column_values("lin").unwrap());
}

#[test]
fn test_aggregation_sums_constituents() {
    let n = 6;
    let mut columns = Vec::new();
    for level in 1..=7u32 {
        let values = column((0..n).map(|r| (r * 10 + level as usize) as f64));
        columns.push((format!("lines.N{}", level), values));
    }
    columns.push(("other".to_string(), column((0..n).map(|r| r as f64))));
    columns.push(("y".to_string(), column((0..n).map(|r| 100.0 + r as f64))));
    let data = Dataset::from_columns(columns, "y").unwrap();

    let out = aggregate_groups(&data).unwrap();
    let names = out.column_names();

    assert!(names.iter().all(|c| !c.starts_with("lines.N")));
    assert!(names.contains(&"lines_agg_N1to4".to_string()));
    assert!(names.contains(&"lines_agg_N5to7".to_string()));
    assert!(names.contains(&"other".to_string()));

    let low = out.column_values("lines_agg_N1to4").unwrap();
    let high = out.column_values("lines_agg_N5to7").unwrap();
    for r in 0..n {
        let expected_low: f64 = (1..=4).map(|l| (r * 10 + l) as f64).sum();
        let expected_high: f64 = (5..=7).map(|l| (r * 10 + l) as f64).sum();
        assert_eq!(low[r], Some(expected_low));
        assert_eq!(high[r], Some(expected_high));
    }
}

#[test]
fn test_eight_variants_with_matching_schemas() {
    let (train, test) = pair(|rows| {
        let rows: Vec<usize> = rows.collect();
        Dataset::from_columns(
            vec![
                ("costtot".to_string(), column(rows.iter().map(|&i| 5.0 + i as f64))),
                ("assets.N3".to_string(), column(rows.iter().map(|&i| (i % 9) as f64))),
                ("assets.N6".to_string(), column(rows.iter().map(|&i| (i % 4) as f64))),
                ("skewed".to_string(), column(rows.iter().map(|&i| skewed_value(i)))),
                ("y".to_string(), column(rows.iter().map(|&i| 100.0 + 2.0 * i as f64))),
            ],
            "y",
        )
        .unwrap()
    });

    let variants = build_variants(&train, &test, &PipelineConfig::default().with_target("y")).unwrap();
    assert_eq!(variants.len(), 8);

    let kinds: Vec<VariantKind> = variants.iter().map(|v| v.kind).collect();
    assert_eq!(kinds, VariantKind::ALL.to_vec());

    for variant in &variants {
        assert_eq!(variant.train.column_names(), variant.test.column_names(), "{}", variant.name());
        assert_eq!(variant.train.height(), 40);
        assert_eq!(variant.test.height(), 10);
    }

    let by_kind = |kind: VariantKind| variants.iter().find(|v| v.kind == kind).unwrap();
    assert_eq!(by_kind(VariantKind::YLog).target(), "y_log");
    assert_eq!(by_kind(VariantKind::Raw).target(), "y");
    assert!(by_kind(VariantKind::Agg).train.has_column("costtot"));
    assert!(!by_kind(VariantKind::NonAgg).train.has_column("costtot"));
    assert!(by_kind(VariantKind::GroupAgg).train.has_column("assets_agg_N1to4"));
}
