// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Day/night cycle, triangular heat curve, rain timer
// ABOUTME: Grounded on WeatherSystem; a tick advances time and may flip rain or fall to night

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::config::SimulationConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weather {
    pub day: u32,
    pub turn_in_day: u32,
    pub is_night: bool,
    pub heat: i32,
    pub rain_timer: i32,
    pub raining: bool,
}

impl Weather {
    pub fn new() -> Self {
        Self {
            day: 1,
            turn_in_day: 0,
            is_night: false,
            heat: 100,
            rain_timer: 1200,
            raining: false,
        }
    }

    /// Advance by one tick. Returns event messages for the bounded queue.
    pub fn tick(&mut self, config: &SimulationConfig, rng: &mut impl Rng) -> Vec<String> {
        let mut messages = Vec::new();

        if !self.is_night {
            self.turn_in_day += 1;
            let day_factor = if config.day_length > 1 {
                1.0 - ((self.turn_in_day as f64 / (config.day_length - 1) as f64) * 2.0 - 1.0).abs()
            } else {
                1.0
            };
            self.heat = config.heat_min + ((config.heat_max - config.heat_min) as f64 * day_factor) as i32;

            if self.turn_in_day >= config.day_length {
                self.is_night = true;
                self.heat = config.heat_min;
                messages.push("Night falls. Press Space to rest.".to_string());
            }
        }

        self.rain_timer -= 1;
        if self.raining {
            if self.rain_timer <= 0 {
                self.raining = false;
                self.rain_timer = rng.gen_range(config.rain_interval_min..=config.rain_interval_max) as i32;
                messages.push("Rain fades.".to_string());
            }
        } else if self.rain_timer <= 0 {
            self.raining = true;
            self.rain_timer = rng.gen_range(config.rain_duration_min..=config.rain_duration_max) as i32;
            messages.push("Rain arrives! Wellsprings surge.".to_string());
        }

        messages
    }

    /// Only succeeds at night; returns a refusal message otherwise.
    pub fn end_day(&mut self) -> Vec<String> {
        if !self.is_night {
            return vec!["Can only rest at night. Wait for day to end.".to_string()];
        }
        self.day += 1;
        self.turn_in_day = 0;
        self.is_night = false;
        self.heat = 100;
        vec![format!("Day {} begins.", self.day)]
    }
}

impl Default for Weather {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn heat_peaks_at_midday() {
        let config = SimulationConfig::default();
        let mut weather = Weather::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let midday = config.day_length / 2;
        for _ in 0..midday {
            weather.tick(&config, &mut rng);
        }
        assert!(weather.heat > config.heat_min);
    }

    #[test]
    fn reaching_day_length_falls_to_night() {
        let config = SimulationConfig::default();
        let mut weather = Weather::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..(config.day_length + 1) {
            weather.tick(&config, &mut rng);
        }
        assert!(weather.is_night);
        assert_eq!(weather.heat, config.heat_min);
    }

    #[test]
    fn end_day_is_noop_during_daytime() {
        let mut weather = Weather::new();
        let before_day = weather.day;
        let messages = weather.end_day();
        assert_eq!(weather.day, before_day);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn end_day_advances_day_at_night() {
        let config = SimulationConfig::default();
        let mut weather = Weather::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..(config.day_length + 1) {
            weather.tick(&config, &mut rng);
        }
        let messages = weather.end_day();
        assert_eq!(weather.day, 2);
        assert!(!weather.is_night);
        assert_eq!(messages.len(), 1);
    }
}
