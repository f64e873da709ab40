use serde::{Deserialize, Serialize};

/// A geocoded city as returned by the API server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Payload of `GET /api/weather/{city}`.
///
/// The forecast document is kept as raw JSON; interpreting it is the job of
/// whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub city: City,
    pub weather: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_response_keeps_forecast_opaque() {
        let body = r#"{
            "city": {"name": "London", "lat": 51.5, "lon": -0.12},
            "weather": {"current": {"temp": 281.4}, "daily": []}
        }"#;

        let parsed: WeatherResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.city.name, "London");
        assert_eq!(parsed.city.country, None);
        assert_eq!(parsed.weather["current"]["temp"], 281.4);
    }
}
