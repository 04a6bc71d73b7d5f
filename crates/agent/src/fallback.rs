use fieldcast_core::domain::format_measure;
use fieldcast_core::{RainForecast, SensorReading};

/// Soil moisture (percent) below which irrigation is recommended.
pub const IRRIGATION_THRESHOLD: f64 = 35.0;

/// Deterministic advisory used whenever the hosted model is unavailable or fails.
pub fn fallback_advisory(sensor: &SensorReading, rain: &RainForecast) -> String {
    let moisture = format_measure(sensor.soil_moisture);
    let moisture_line = if sensor.soil_moisture < IRRIGATION_THRESHOLD {
        format!("- Soil moisture is low ({moisture}%). Start controlled, low-volume irrigation.")
    } else {
        format!("- Soil moisture is stable ({moisture}%). Avoid immediate irrigation.")
    };

    [
        moisture_line,
        format!(
            "- Humidity is {}%. Monitor airflow around the crop canopy.",
            format_measure(sensor.humidity)
        ),
        format!(
            "- Temperature is {}C. Watch for water stress around midday.",
            format_measure(sensor.temperature)
        ),
        format!(
            "- Today's forecast rainfall is {}mm. Adjust the irrigation schedule accordingly.",
            format_measure(rain.today_rain_mm)
        ),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use fieldcast_core::{RainForecast, SensorReading};

    use super::fallback_advisory;

    fn sensor(soil_moisture: f64) -> SensorReading {
        SensorReading { soil_moisture, humidity: 50.0, tds: 300.0, temperature: 30.0 }
    }

    #[test]
    fn low_moisture_recommends_irrigation() {
        let text = fallback_advisory(&sensor(20.0), &RainForecast::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("low (20%)"));
        assert!(lines[0].contains("low-volume irrigation"));
        assert!(lines[1].contains("50%"));
        assert!(lines[2].contains("30C"));
        assert!(lines[3].contains("0mm"));
    }

    #[test]
    fn threshold_itself_counts_as_stable() {
        let text = fallback_advisory(&sensor(35.0), &RainForecast::default());
        assert!(text.starts_with("- Soil moisture is stable (35%)"));
        assert!(text.contains("Avoid immediate irrigation"));

        let just_below = fallback_advisory(&sensor(34.9), &RainForecast::default());
        assert!(just_below.starts_with("- Soil moisture is low (34.9%)"));
    }

    #[test]
    fn rainfall_line_reflects_forecast() {
        let rain = RainForecast { today_rain_mm: 4.25, rain_prob: 90.0 };
        let text = fallback_advisory(&sensor(60.0), &rain);
        assert!(text.lines().last().is_some_and(|line| line.contains("4.25mm")));
    }

    #[test]
    fn every_line_is_a_bullet() {
        let text = fallback_advisory(&SensorReading::default(), &RainForecast::default());
        assert!(text.lines().all(|line| line.starts_with("- ")));
    }
}
