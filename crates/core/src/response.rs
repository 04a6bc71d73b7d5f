//! Shapes free-form advisory text into the stable `AdvisoryResponse` contract.

use crate::domain::advisory::{AdvisoryResponse, AdvisoryResult, ResponseMeta};

pub const MAX_REASONS: usize = 6;
pub const PLACEHOLDER_REASON: &str = "Advisory generated from current telemetry.";

/// Markers that only count as bullets when whitespace follows, so `**bold**` survives.
const SPACED_BULLETS: &[char] = &['*', '•'];

pub fn to_response(result: &AdvisoryResult) -> AdvisoryResponse {
    let reasons = reasons_from_text(&result.advisory_text);
    let recommendation = reasons.first().cloned().unwrap_or_else(|| PLACEHOLDER_REASON.to_string());

    AdvisoryResponse {
        recommendation,
        reasons,
        source: result.source,
        meta: ResponseMeta { rain_forecast: result.rain },
    }
}

/// One reason per non-empty line, bullet markers stripped, at most `MAX_REASONS`.
pub fn reasons_from_text(text: &str) -> Vec<String> {
    let reasons: Vec<String> = text
        .lines()
        .map(|line| strip_bullet(line.trim()).trim())
        .filter(|line| !line.is_empty())
        .take(MAX_REASONS)
        .map(str::to_string)
        .collect();

    if reasons.is_empty() {
        return vec![PLACEHOLDER_REASON.to_string()];
    }
    reasons
}

/// Strips a leading run of dashes, or one `*`/`•` bullet followed by whitespace.
fn strip_bullet(line: &str) -> &str {
    if line.starts_with('-') {
        return line.trim_start_matches('-');
    }

    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(marker), Some(next)) if SPACED_BULLETS.contains(&marker) && next.is_whitespace() => {
            &line[marker.len_utf8()..]
        }
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::{reasons_from_text, to_response, MAX_REASONS, PLACEHOLDER_REASON};
    use crate::domain::advisory::{AdvisoryResult, AdvisorySource};
    use crate::domain::forecast::RainForecast;
    use crate::domain::sensor::SensorReading;

    fn result_with(text: &str, source: AdvisorySource) -> AdvisoryResult {
        AdvisoryResult {
            sensor: SensorReading::default(),
            rain: RainForecast { today_rain_mm: 2.5, rain_prob: 40.0 },
            advisory_text: text.to_string(),
            source,
        }
    }

    #[test]
    fn ten_line_advisory_is_capped_to_six_reasons() {
        let text = (1..=10).map(|index| format!("- step {index}")).collect::<Vec<_>>().join("\n");
        let reasons = reasons_from_text(&text);

        assert_eq!(reasons.len(), MAX_REASONS);
        assert_eq!(reasons[0], "step 1");
        assert_eq!(reasons[5], "step 6");
    }

    #[test]
    fn empty_text_yields_single_placeholder() {
        let response = to_response(&result_with("  \n\n - \n", AdvisorySource::Llm));
        assert_eq!(response.reasons, vec![PLACEHOLDER_REASON.to_string()]);
        assert_eq!(response.recommendation, PLACEHOLDER_REASON);
    }

    #[test]
    fn markers_and_whitespace_are_stripped() {
        let reasons = reasons_from_text("* Open the valve\n  -- Flush filters  \n• Check pH\nplain line");
        assert_eq!(reasons, vec!["Open the valve", "Flush filters", "Check pH", "plain line"]);
    }

    #[test]
    fn markdown_emphasis_survives_bullet_stripping() {
        let reasons = reasons_from_text("**Irrigate:** apply 10mm tonight\n- **Check** drip lines\n* *Skip* fertigation");
        assert_eq!(
            reasons,
            vec!["**Irrigate:** apply 10mm tonight", "**Check** drip lines", "*Skip* fertigation"]
        );
    }

    #[test]
    fn recommendation_is_first_reason_and_meta_carries_forecast() {
        let response = to_response(&result_with("\n- irrigate lightly\n- watch humidity", AdvisorySource::Fallback));

        assert_eq!(response.recommendation, "irrigate lightly");
        assert_eq!(response.reasons.len(), 2);
        assert_eq!(response.source, AdvisorySource::Fallback);
        assert_eq!(response.meta.rain_forecast, RainForecast { today_rain_mm: 2.5, rain_prob: 40.0 });
    }
}
