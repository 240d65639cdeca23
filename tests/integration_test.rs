use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use usagestats::analysis::funnel::{ALL_REQUESTS, HUMAN_TRAFFIC, INFRA_REQUESTS, NON_HUMAN};
use usagestats::analysis::traffic::PORTAL_OTHER;
use usagestats::{load_dataset_async, Config, Dashboard, StatsError};

fn write_json(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn setup_test_data_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    write_json(
        dir,
        "traffic_types.json",
        r#"[{"type":"Likely Human","count":1000},{"type":"Bot","count":200},{"type":"AI-Assistant / Bot","count":50}]"#,
    );
    write_json(
        dir,
        "total_tool_visits.json",
        r#"[{"tool":"EUI","visits":200},{"tool":"RUI","visits":80},{"tool":"CDE","visits":20}]"#,
    );
    write_json(
        dir,
        "request_types.json",
        r#"[{"request_type":"Images","count":400},{"request_type":"API Calls","count":300}]"#,
    );
    write_json(
        dir,
        "geo_distribution.json",
        r#"[{"c_country":"US","visits":120},{"c_country":"-","visits":999},{"c_country":"DE","visits":60},{"c_country":"JP","visits":20}]"#,
    );
    write_json(
        dir,
        "tool_visits_by_month.json",
        r#"[{"month_year":"2025-10","EUI":90,"RUI":30},{"month_year":"2025-11","EUI":60,"RUI":30},{"month_year":"2025-12","EUI":50,"RUI":20}]"#,
    );
    write_json(
        dir,
        "event_types.json",
        r#"[{"event":"click","count":10},{"event":"hover","count":30}]"#,
    );
    write_json(
        dir,
        "cohort_retention.json",
        r#"[
            {"cohort_month":"2025-10","months_since_first":0,"retained_sessions":40,"cohort_size":40,"retention_pct":100.0},
            {"cohort_month":"2025-10","months_since_first":2,"retained_sessions":8,"cohort_size":40,"retention_pct":20.0},
            {"cohort_month":"2025-11","months_since_first":0,"retained_sessions":30,"cohort_size":30,"retention_pct":100.0},
            {"cohort_month":"2025-11","months_since_first":1,"retained_sessions":6,"cohort_size":30,"retention_pct":20.0},
            {"cohort_month":"2025-12","months_since_first":0,"retained_sessions":25,"cohort_size":25,"retention_pct":100.0}
        ]"#,
    );
    write_json(
        dir,
        "error_breakdown.json",
        r#"{"by_source":[{"tool":"EUI","errors":9}],
            "by_tool":[{"month_year":"2025-11","tool":"EUI","errors":4},{"month_year":"2025-11","tool":"Unknown","errors":7}],
            "by_month":[{"month_year":"2025-11","total_errors":10}]}"#,
    );
    write_json(
        dir,
        "feature_cooccurrence.json",
        r#"{"rules":[
            {"antecedents":["tool:EUI"],"consequent":"event:click","support":0.2,"confidence":0.6,"lift":1.5},
            {"antecedents":["tool:RUI"],"consequent":"feature:organ_select","support":0.001,"confidence":0.9,"lift":2.0}
        ]}"#,
    );
    write_json(
        dir,
        "detected_events.json",
        r#"[{"tool":"EUI","month":"2025-10","event_type":"mom_spike","from_value":10,"to_value":90,"magnitude_pct":800.0}]"#,
    );

    temp_dir
}

#[tokio::test]
async fn test_full_workflow() {
    let temp_dir = setup_test_data_dir();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    // Load every published file; the unpublished ones stay empty
    let dataset = load_dataset_async(config.data_dir.clone(), 2).await.unwrap();
    assert_eq!(dataset.traffic_types.len(), 3);
    assert!(dataset.forecasts.is_empty());
    assert!(dataset.geo_anomalies.is_empty());

    let mut dashboard = Dashboard::new(config).unwrap();
    let report = dashboard.report(&dataset).unwrap();

    // Overview
    assert_eq!(report.overview.total_visits, 300);
    assert_eq!(report.overview.total_requests, 1250);
    assert_eq!(report.overview.human_pct, 80.0);
    assert_eq!(report.overview.country_count, 3);
    assert_eq!(report.overview.first_month.as_deref(), Some("Oct 2025"));
    assert_eq!(report.overview.last_month.as_deref(), Some("Dec 2025"));

    // Request funnel
    let graph = &report.request_funnel.graph;
    let root = graph.node(ALL_REQUESTS).unwrap();
    assert!((root.value - 1250f64.sqrt()).abs() < 1e-9);
    assert_eq!(graph.node(INFRA_REQUESTS).unwrap().actual_value, 700.0);
    assert_eq!(graph.node(NON_HUMAN).unwrap().actual_value, 250.0);
    let human = graph.node(HUMAN_TRAFFIC).unwrap();
    assert!((graph.outflow(HUMAN_TRAFFIC) - human.value).abs() < 1e-9);

    // Geography
    let regions: Vec<_> = report.regions.iter().map(|r| (r.name.as_str(), r.value)).collect();
    assert_eq!(regions, vec![("Americas", 120), ("Europe", 60), ("Asia-Pacific", 20)]);
    assert_eq!(report.top_countries.last().unwrap().name, "US");

    // Retention: 2025-12 has no follow-up and drops out, but still sets the boundary
    assert_eq!(report.retention.cohorts, vec!["2025-10", "2025-11"]);
    assert_eq!(report.retention.max_lag, 2);
    assert_eq!(report.retention_through.as_deref(), Some("2025-12"));
    let gap = report.retention.cell("2025-10", 1).unwrap();
    assert_eq!(gap.value, None);
    assert!(report.retention.cell("2025-10", 2).unwrap().is_truncated);
    assert!(report.retention.cell("2025-11", 1).unwrap().is_truncated);
    assert!(!report.retention.cell("2025-11", 0).unwrap().is_truncated);

    // Insights
    assert_eq!(report.rules.len(), 1);
    assert_eq!(report.rules[0].label, "EUI -> click");
    assert_eq!(report.spikes[0].visit_jump, 80.0);
    assert_eq!(report.error_trend.series(PORTAL_OTHER).unwrap().data, vec![6]);
    assert_eq!(report.event_types[0].name, "hover");

    // Memoization
    let again = dashboard.report(&dataset).unwrap();
    assert!(Arc::ptr_eq(&report, &again));
}

#[tokio::test]
async fn test_report_serializes_for_the_frontend() {
    let temp_dir = setup_test_data_dir();
    let dataset = load_dataset_async(temp_dir.path().to_path_buf(), 4).await.unwrap();
    let mut dashboard = Dashboard::new(Config::default()).unwrap();
    let report = dashboard.report(&dataset).unwrap();

    let json = serde_json::to_value(report.as_ref()).unwrap();
    let first_node = &json["requestFunnel"]["graph"]["nodes"][0];
    assert_eq!(first_node["name"], "All Requests");
    assert_eq!(first_node["actualValue"], 1250.0);
    assert!(json["retention"]["matrix"][0][1]["value"].is_null());
    assert_eq!(json["retention"]["matrix"][0][1]["isTruncated"], false);
}

#[tokio::test]
async fn test_error_handling() {
    // Data directory that does not exist
    {
        let temp_dir = TempDir::new().unwrap();
        let result = load_dataset_async(temp_dir.path().join("2025-typo"), 2).await;
        assert!(matches!(result, Err(StatsError::Io { .. })));
    }

    // Malformed file
    {
        let temp_dir = setup_test_data_dir();
        write_json(temp_dir.path(), "cohort_retention.json", r#"[{"cohort_month":"2025-10"}]"#);
        let result = load_dataset_async(temp_dir.path().to_path_buf(), 2).await;
        assert!(matches!(result, Err(StatsError::Json { .. })));
    }

    // Malformed month key surfaces when deriving, not when loading
    {
        let temp_dir = setup_test_data_dir();
        write_json(
            temp_dir.path(),
            "cohort_retention.json",
            r#"[{"cohort_month":"Oct 2025","months_since_first":0,"retained_sessions":1,"cohort_size":1}]"#,
        );
        let dataset = load_dataset_async(temp_dir.path().to_path_buf(), 2).await.unwrap();
        let mut dashboard = Dashboard::new(Config::default()).unwrap();
        assert!(matches!(
            dashboard.report(&dataset),
            Err(StatsError::InvalidFormat { .. })
        ));
    }
}

#[test]
fn test_empty_directory_gives_empty_report() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = tokio_test::block_on(load_dataset_async(temp_dir.path().to_path_buf(), 1)).unwrap();
    let mut dashboard = Dashboard::new(Config::default()).unwrap();
    let report = dashboard.report(&dataset).unwrap();

    assert!(report.retention.is_empty());
    assert_eq!(report.overview.total_requests, 0);
    assert!(report.request_funnel.graph.nodes.is_empty());
    assert!(report.request_funnel.graph.links.is_empty());
    assert!(report.regions.is_empty());
}
