pub mod advisory;
pub mod forecast;
pub mod knowledge;
pub mod sensor;

/// Renders a measurement the way field staff read it: whole numbers without a
/// trailing `.0`, everything else with its natural precision.
pub fn format_measure(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
