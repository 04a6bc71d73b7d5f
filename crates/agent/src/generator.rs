use std::sync::Arc;

use fieldcast_core::config::LlmConfig;
use fieldcast_core::domain::format_measure;
use fieldcast_core::{AdvisorySource, RainForecast, RetrievedNote, SensorReading};
use tera::{Context, Tera};
use tracing::{debug, warn};

use crate::fallback::fallback_advisory;
use crate::llm::{ChatRequest, LlmClient, LlmError};

pub const SYSTEM_INSTRUCTION: &str =
    "You are a practical irrigation advisor. Reply only with concise, actionable bullet points.";

/// Notes included in the prompt, regardless of how many were retrieved.
pub const PROMPT_NOTE_LIMIT: usize = 3;

const USER_TEMPLATE: &str = "Live Field Data:
- Soil Moisture: {{ soil_moisture }} %
- Humidity: {{ humidity }} %
- TDS Level: {{ tds }} ppm
- Field Temperature: {{ temperature }} C
- Today's total rainfall: {{ today_rain_mm }} mm

Reference Notes:
{{ notes }}

Give irrigation advice for today.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedAdvisory {
    pub text: String,
    pub source: AdvisorySource,
}

impl GeneratedAdvisory {
    fn fallback(sensor: &SensorReading, rain: &RainForecast) -> Self {
        Self { text: fallback_advisory(sensor, rain), source: AdvisorySource::Fallback }
    }
}

pub struct AdvisoryGenerator {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    temperature: f32,
}

impl AdvisoryGenerator {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: u32, temperature: f32) -> Self {
        Self { client, max_tokens, temperature }
    }

    pub fn from_config(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self::new(client, config.max_tokens, config.temperature)
    }

    pub fn build_request(
        &self,
        sensor: &SensorReading,
        rain: &RainForecast,
        notes: &[RetrievedNote],
    ) -> Result<ChatRequest, LlmError> {
        Ok(ChatRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: render_user_prompt(sensor, rain, notes)?,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }

    /// Always yields an advisory. Model failures are logged and replaced by the fallback.
    pub async fn generate(
        &self,
        sensor: &SensorReading,
        rain: &RainForecast,
        notes: &[RetrievedNote],
        correlation_id: &str,
    ) -> GeneratedAdvisory {
        if !self.client.is_available() {
            debug!(
                event_name = "advisory.llm.skipped",
                correlation_id,
                "hosted model not configured; using fallback advisory"
            );
            return GeneratedAdvisory::fallback(sensor, rain);
        }

        let outcome = match self.build_request(sensor, rain, notes) {
            Ok(request) => self.client.complete(&request).await,
            Err(error) => Err(error),
        };

        match outcome {
            Ok(text) if !text.trim().is_empty() => {
                debug!(event_name = "advisory.llm.completed", correlation_id, chars = text.len());
                GeneratedAdvisory { text, source: AdvisorySource::Llm }
            }
            Ok(_) => {
                warn!(
                    event_name = "advisory.llm.failed",
                    correlation_id,
                    kind = LlmError::Empty.kind(),
                    "hosted model returned no text; using fallback advisory"
                );
                GeneratedAdvisory::fallback(sensor, rain)
            }
            Err(LlmError::Unavailable) => {
                debug!(
                    event_name = "advisory.llm.skipped",
                    correlation_id,
                    "hosted model unavailable; using fallback advisory"
                );
                GeneratedAdvisory::fallback(sensor, rain)
            }
            Err(error) => {
                warn!(
                    event_name = "advisory.llm.failed",
                    correlation_id,
                    kind = error.kind(),
                    error = %error,
                    "hosted model call failed; using fallback advisory"
                );
                GeneratedAdvisory::fallback(sensor, rain)
            }
        }
    }
}

pub fn render_user_prompt(
    sensor: &SensorReading,
    rain: &RainForecast,
    notes: &[RetrievedNote],
) -> Result<String, LlmError> {
    let joined = notes
        .iter()
        .take(PROMPT_NOTE_LIMIT)
        .map(RetrievedNote::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    let mut context = Context::new();
    context.insert("soil_moisture", &format_measure(sensor.soil_moisture));
    context.insert("humidity", &format_measure(sensor.humidity));
    context.insert("tds", &format_measure(sensor.tds));
    context.insert("temperature", &format_measure(sensor.temperature));
    context.insert("today_rain_mm", &format_measure(rain.today_rain_mm));
    context.insert("notes", if joined.is_empty() { "N/A" } else { joined.as_str() });

    Tera::one_off(USER_TEMPLATE, &context, false).map_err(|error| LlmError::Prompt(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fieldcast_core::{AdvisorySource, RainForecast, RetrievedNote, SensorReading};

    use super::{render_user_prompt, AdvisoryGenerator, SYSTEM_INSTRUCTION};
    use crate::fallback::fallback_advisory;
    use crate::llm::{ChatRequest, LlmClient, LlmError, NoopLlmClient};

    struct ScriptedLlm {
        reply: Result<String, LlmError>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new(reply: Result<String, LlmError>) -> Arc<Self> {
            Arc::new(Self { reply, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.seen.lock().expect("lock").push(request.clone());
            self.reply.clone()
        }
    }

    fn sensor() -> SensorReading {
        SensorReading { soil_moisture: 20.0, humidity: 50.0, tds: 300.0, temperature: 30.0 }
    }

    fn notes(texts: &[&str]) -> Vec<RetrievedNote> {
        texts.iter().filter_map(|text| RetrievedNote::from_page(text)).collect()
    }

    #[test]
    fn prompt_lists_field_data_and_first_three_notes() {
        let rain = RainForecast { today_rain_mm: 4.0, rain_prob: 90.0 };
        let prompt =
            render_user_prompt(&sensor(), &rain, &notes(&["one", "two", "three", "four"])).expect("renders");

        assert!(prompt.contains("Soil Moisture: 20 %"));
        assert!(prompt.contains("TDS Level: 300 ppm"));
        assert!(prompt.contains("Today's total rainfall: 4 mm"));
        assert!(prompt.contains("one\ntwo\nthree"));
        assert!(!prompt.contains("four"));
    }

    #[test]
    fn prompt_marks_missing_notes_and_keeps_markup_literal() {
        let empty = render_user_prompt(&sensor(), &RainForecast::default(), &[]).expect("renders");
        assert!(empty.contains("Reference Notes:\nN/A"));

        let markup = render_user_prompt(&sensor(), &RainForecast::default(), &notes(&["N < 5 & P > 2"]))
            .expect("renders");
        assert!(markup.contains("N < 5 & P > 2"));
    }

    #[tokio::test]
    async fn unavailable_capability_uses_fallback_without_calling_out() {
        let generator = AdvisoryGenerator::new(Arc::new(NoopLlmClient), 280, 0.2);
        let generated = generator.generate(&sensor(), &RainForecast::default(), &[], "corr-1").await;

        assert_eq!(generated.source, AdvisorySource::Fallback);
        assert_eq!(generated.text, fallback_advisory(&sensor(), &RainForecast::default()));
    }

    #[tokio::test]
    async fn model_text_is_returned_verbatim() {
        let llm = ScriptedLlm::new(Ok("  - Irrigate lightly\n".to_string()));
        let generator = AdvisoryGenerator::new(llm.clone(), 280, 0.2);

        let generated =
            generator.generate(&sensor(), &RainForecast::default(), &notes(&["Crown root"]), "corr-2").await;

        assert_eq!(generated.source, AdvisorySource::Llm);
        assert_eq!(generated.text, "  - Irrigate lightly\n");

        let seen = llm.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system, SYSTEM_INSTRUCTION);
        assert_eq!(seen[0].max_tokens, 280);
        assert!(seen[0].user.contains("Crown root"));
    }

    #[tokio::test]
    async fn failures_and_blank_text_fall_back() {
        for reply in [
            Err(LlmError::Timeout { secs: 30 }),
            Err(LlmError::HttpStatus(503)),
            Err(LlmError::Unavailable),
            Ok("   \n".to_string()),
        ] {
            let generator = AdvisoryGenerator::new(ScriptedLlm::new(reply), 280, 0.2);
            let generated = generator.generate(&sensor(), &RainForecast::default(), &[], "corr-3").await;
            assert_eq!(generated.source, AdvisorySource::Fallback);
            assert_eq!(generated.text.lines().count(), 4);
        }
    }
}
