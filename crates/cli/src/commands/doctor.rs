use fieldcast_core::config::{AppConfig, LoadOptions};
use fieldcast_core::TelemetryStore;
use fieldcast_integrations::{PagedDocumentRetriever, RespTelemetryStore};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] =
    ["weather_api_key", "llm_credential", "reference_document", "telemetry_store"];

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_weather_key(&config));
            checks.push(check_llm_credential(&config));
            checks.extend(run_io_checks(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    // Skipped checks are designed fallbacks, not failures.
    let healthy = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if healthy { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if healthy {
        "doctor: no readiness check failed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_weather_key(config: &AppConfig) -> DoctorCheck {
    if config.has_weather_key() {
        DoctorCheck {
            name: "weather_api_key",
            status: CheckStatus::Pass,
            details: format!("forecasts requested for `{}`", config.location.city),
        }
    } else {
        DoctorCheck {
            name: "weather_api_key",
            status: CheckStatus::Skipped,
            details: "no weather API key; the zero rain forecast will be used".to_string(),
        }
    }
}

fn check_llm_credential(config: &AppConfig) -> DoctorCheck {
    if config.has_llm_credential() {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Pass,
            details: format!("{:?} model `{}` via {}", config.llm.provider, config.llm.model, config.llm_base_url()),
        }
    } else {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Skipped,
            details: "no model credential; rule-based fallback advisories will be used".to_string(),
        }
    }
}

fn run_io_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return ["reference_document", "telemetry_store"]
                .into_iter()
                .map(|name| DoctorCheck {
                    name,
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                })
                .collect();
        }
    };

    runtime.block_on(async {
        vec![check_reference_document(config).await, check_telemetry_store(config).await]
    })
}

async fn check_reference_document(config: &AppConfig) -> DoctorCheck {
    let retriever = PagedDocumentRetriever::from_config(&config.knowledge);
    let path = config.knowledge.document_path.display();

    match retriever.read_notes(config.knowledge.top_k).await {
        Ok(notes) if notes.is_empty() => DoctorCheck {
            name: "reference_document",
            status: CheckStatus::Fail,
            details: format!("`{path}` has no non-empty pages"),
        },
        Ok(notes) => DoctorCheck {
            name: "reference_document",
            status: CheckStatus::Pass,
            details: format!("`{path}` yields {} reference notes", notes.len()),
        },
        Err(error) => DoctorCheck {
            name: "reference_document",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn check_telemetry_store(config: &AppConfig) -> DoctorCheck {
    let store = RespTelemetryStore::from_config(&config.telemetry);
    let key = &config.telemetry.key;

    match store.get(key).await {
        Ok(Some(_)) => DoctorCheck {
            name: "telemetry_store",
            status: CheckStatus::Pass,
            details: format!("snapshot `{key}` present at {}", store.address()),
        },
        Ok(None) => DoctorCheck {
            name: "telemetry_store",
            status: CheckStatus::Fail,
            details: format!("{} is reachable but has no snapshot under `{key}`", store.address()),
        },
        Err(error) => DoctorCheck {
            name: "telemetry_store",
            status: CheckStatus::Fail,
            details: format!("{}: {error}", store.address()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
