//! Daily weather forecast, mirroring the Open-Meteo `daily` block.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily forecast as returned by Open-Meteo: one array per variable, all
/// indexed by day.
///
/// Nothing guarantees the arrays have equal length; [`WeatherForecast::days`]
/// stops at the shortest one. Open-Meteo reports a missing value as `null`,
/// which is kept as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    /// Forecast dates.
    #[serde(default)]
    pub time: Vec<NaiveDate>,
    /// WMO weather interpretation codes.
    #[serde(default, rename = "weathercode")]
    pub weather_code: Vec<Option<u8>>,
    /// Daily maximum temperatures in Celsius.
    #[serde(default, rename = "temperature_2m_max")]
    pub temperature_max: Vec<Option<f64>>,
    /// Daily minimum temperatures in Celsius.
    #[serde(default, rename = "temperature_2m_min")]
    pub temperature_min: Vec<Option<f64>>,
    /// Daily precipitation sums in millimetres.
    #[serde(default, rename = "precipitation_sum")]
    pub precipitation: Vec<Option<f64>>,
}

/// One day of a [`WeatherForecast`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherDay {
    /// The forecast day.
    pub date: NaiveDate,
    /// WMO weather interpretation code
    pub code: Option<u8>,
    /// Daily maximum temperature in Celsius
    pub temperature_max: Option<f64>,
    /// Daily minimum temperature in Celsius
    pub temperature_min: Option<f64>,
    /// Precipitation sum in millimetres
    pub precipitation: Option<f64>,
}

impl WeatherForecast {
    /// Regroup the parallel arrays into one value per day.
    #[must_use]
    pub fn days(&self) -> Vec<WeatherDay> {
        self.time
            .iter()
            .zip(&self.weather_code)
            .zip(&self.temperature_max)
            .zip(&self.temperature_min)
            .zip(&self.precipitation)
            .map(
                |((((date, code), temperature_max), temperature_min), precipitation)| WeatherDay {
                    date: *date,
                    code: *code,
                    temperature_max: *temperature_max,
                    temperature_min: *temperature_min,
                    precipitation: *precipitation,
                },
            )
            .collect()
    }
}

impl WeatherDay {
    /// Human-readable label for the WMO weather code.
    #[must_use]
    pub fn description(&self) -> &'static str {
        let Some(code) = self.code else {
            return "Unknown";
        };
        match code {
            0 => "Clear sky",
            1 => "Mainly clear",
            2 => "Partly cloudy",
            3 => "Overcast",
            45 => "Fog",
            48 => "Depositing rime fog",
            51 => "Light drizzle",
            53 => "Moderate drizzle",
            55 => "Dense drizzle",
            56 => "Light freezing drizzle",
            57 => "Dense freezing drizzle",
            61 => "Slight rain",
            63 => "Moderate rain",
            65 => "Heavy rain",
            66 => "Light freezing rain",
            67 => "Heavy freezing rain",
            71 => "Slight snow fall",
            73 => "Moderate snow fall",
            75 => "Heavy snow fall",
            77 => "Snow grains",
            80 => "Slight rain showers",
            81 => "Moderate rain showers",
            82 => "Violent rain showers",
            85 => "Slight snow showers",
            86 => "Heavy snow showers",
            95 => "Thunderstorm",
            96 => "Thunderstorm with slight hail",
            99 => "Thunderstorm with heavy hail",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN_METEO_DAILY: &str = r#"{
        "time": ["2024-06-01", "2024-06-02", "2024-06-03"],
        "weathercode": [0, 61, 95],
        "temperature_2m_max": [24.1, 19.5, 21.0],
        "temperature_2m_min": [11.2, 12.8, 13.4],
        "precipitation_sum": [0.0, 6.4, 12.1]
    }"#;

    #[test]
    fn test_days_from_open_meteo() {
        let forecast: WeatherForecast = serde_json::from_str(OPEN_METEO_DAILY).unwrap();
        let days = forecast.days();

        assert_eq!(days.len(), 3);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(days[1].code, Some(61));
        assert_eq!(days[1].temperature_max, Some(19.5));
        assert_eq!(days[1].temperature_min, Some(12.8));
        assert_eq!(days[1].precipitation, Some(6.4));
        assert_eq!(days[2].description(), "Thunderstorm");
    }

    #[test]
    fn test_days_stop_at_shortest_array() {
        let forecast = WeatherForecast {
            time: vec![
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            ],
            weather_code: vec![Some(3), Some(3)],
            temperature_max: vec![Some(18.0), Some(17.0)],
            temperature_min: vec![Some(9.0)],
            precipitation: vec![Some(0.0), Some(0.2)],
        };

        assert_eq!(forecast.days().len(), 1);
        assert!(WeatherForecast::default().days().is_empty());
    }

    #[test]
    fn test_unknown_code() {
        let day = WeatherDay {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            code: Some(42),
            temperature_max: None,
            temperature_min: None,
            precipitation: None,
        };
        assert_eq!(day.description(), "Unknown");

        let missing = WeatherDay { code: None, ..day };
        assert_eq!(missing.description(), "Unknown");
    }

    #[test]
    fn test_nulls_from_open_meteo() {
        let json = r#"{
            "time": ["2024-06-01", "2024-06-02"],
            "weathercode": [3, null],
            "temperature_2m_max": [null, 19.5],
            "temperature_2m_min": [11.2, null],
            "precipitation_sum": [0.0, null]
        }"#;
        let forecast: WeatherForecast = serde_json::from_str(json).unwrap();
        let days = forecast.days();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].code, Some(3));
        assert_eq!(days[0].temperature_max, None);
        assert_eq!(days[1].temperature_max, Some(19.5));
        assert_eq!(days[1].precipitation, None);
        assert_eq!(days[1].description(), "Unknown");
    }

    #[test]
    fn test_day_json_is_camel_case() {
        let forecast: WeatherForecast = serde_json::from_str(OPEN_METEO_DAILY).unwrap();
        let json = serde_json::to_value(forecast.days()[0]).unwrap();

        assert_eq!(json["date"], "2024-06-01");
        assert_eq!(json["temperatureMax"], 24.1);
        assert_eq!(json["temperatureMin"], 11.2);
    }
}
