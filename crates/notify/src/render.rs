use karat_core::domain::report::RunReport;
use tera::{Context, Tera};

/// HTML report: a summary block, one detail row per product, and a
/// failures section when anything went wrong.
const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body { font-family: Arial, sans-serif; color: #222; }
  table { border-collapse: collapse; margin: 12px 0; }
  th, td { border: 1px solid #ccc; padding: 6px 10px; text-align: left; }
  th { background: #f4f4f4; }
  .failed { color: #a40000; }
  .skipped { color: #666; }
</style>
</head>
<body>
<h2>Price update report: {{ report.mode }}</h2>
<p>Run {{ report.run_id }} started {{ report.started_at }}.</p>

<h3>Summary</h3>
<table>
  <tr><th>Gold rate (24K)</th><td>{{ report.snapshot.gold_rate_per_gram }}/g</td></tr>
  <tr><th>Silver rate</th><td>{{ report.snapshot.silver_rate_per_gram }}/g</td></tr>
  <tr><th>GST</th><td>{{ report.snapshot.gst_pct }}%</td></tr>
  <tr><th>Updated</th><td>{{ counts.updated }}</td></tr>
  <tr><th>Skipped</th><td>{{ counts.skipped }}</td></tr>
  <tr><th>Failed</th><td>{{ counts.failed }}</td></tr>
</table>

{% if report.outcomes %}
<h3>Products</h3>
<table>
  <tr><th>Product</th><th>Old price</th><th>New price</th><th>Compare-at</th><th>Status</th></tr>
  {% for outcome in report.outcomes %}
  <tr>
    <td>{{ outcome.title }} ({{ outcome.handle }})</td>
    <td>{{ outcome.old_price }}</td>
    <td>{% if outcome.new_price %}{{ outcome.new_price }}{% else %}&mdash;{% endif %}</td>
    <td>{% if outcome.compare_at %}{{ outcome.compare_at }}{% else %}&mdash;{% endif %}</td>
    <td class="{{ outcome.status }}">{{ outcome.status }}</td>
  </tr>
  {% endfor %}
</table>
{% endif %}

{% if counts.failed > 0 %}
<h3 class="failed">Failures</h3>
<ul>
  {% for outcome in report.outcomes %}{% if outcome.failure %}
  <li><strong>{{ outcome.handle }}</strong> [{{ outcome.failure.kind }}]: {{ outcome.failure.message }}</li>
  {% endif %}{% endfor %}
</ul>
{% endif %}
</body>
</html>
"#;

pub fn render_html(report: &RunReport) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("report", report);
    context.insert("counts", &report.counts());
    Tera::one_off(REPORT_TEMPLATE, &context, true)
}

/// Plain-text summary for log-line delivery.
pub fn render_text(report: &RunReport) -> String {
    let counts = report.counts();
    let mut lines = vec![
        format!("price update `{}` run {}", report.mode, report.run_id),
        format!(
            "rates: gold {}/g, silver {}/g, gst {}%",
            report.snapshot.gold_rate_per_gram,
            report.snapshot.silver_rate_per_gram,
            report.snapshot.gst_pct
        ),
        format!(
            "outcomes: {} updated, {} skipped, {} failed",
            counts.updated, counts.skipped, counts.failed
        ),
    ];
    for outcome in report.failures() {
        if let Some(failure) = &outcome.failure {
            lines.push(format!("  failed {}: {}", outcome.handle, failure.message));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{render_html, render_text};
    use karat_core::domain::product::ProductId;
    use karat_core::domain::rates::RateSnapshot;
    use karat_core::domain::report::{
        FailureKind, OutcomeFailure, OutcomeStatus, RunReport, UpdateOutcome,
    };

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    fn report() -> RunReport {
        RunReport {
            run_id: Uuid::nil(),
            mode: "automatic".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            snapshot: RateSnapshot {
                gold_rate_per_gram: dec("7000"),
                silver_rate_per_gram: dec("90"),
                gst_pct: dec("3"),
                default_purity_factor: Decimal::ONE,
                silver_weight_multiplier: dec("1000"),
                lab_diamond_price_per_carat: dec("40000"),
                diamond_slots: Vec::new(),
                as_of: Utc::now(),
            },
            outcomes: vec![
                UpdateOutcome {
                    product_id: ProductId("gid://store/Product/1".to_string()),
                    handle: "heritage-ring".to_string(),
                    title: "Heritage Ring".to_string(),
                    old_price: dec("80000"),
                    new_price: Some(dec("81885")),
                    compare_at: Some(dec("102356.25")),
                    status: OutcomeStatus::Updated,
                    failure: None,
                },
                UpdateOutcome {
                    product_id: ProductId("gid://store/Product/2".to_string()),
                    handle: "broken-bangle".to_string(),
                    title: "Broken Bangle".to_string(),
                    old_price: dec("5000"),
                    new_price: None,
                    compare_at: None,
                    status: OutcomeStatus::Failed,
                    failure: Some(OutcomeFailure {
                        kind: FailureKind::RemoteWrite,
                        message: "variant is locked".to_string(),
                    }),
                },
            ],
        }
    }

    #[test]
    fn html_report_carries_counts_rows_and_failures() {
        let html = render_html(&report()).expect("render");
        assert!(html.contains("heritage-ring"));
        assert!(html.contains("102356.25"));
        assert!(html.contains("variant is locked"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn empty_report_still_renders() {
        let mut empty = report();
        empty.outcomes.clear();
        let html = render_html(&empty).expect("render");
        assert!(html.contains("Summary"));
        assert!(!html.contains("Products"));
    }

    #[test]
    fn text_report_lists_failures() {
        let text = render_text(&report());
        assert!(text.contains("1 updated, 0 skipped, 1 failed"));
        assert!(text.contains("failed broken-bangle: variant is locked"));
    }
}
