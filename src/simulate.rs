//! Synthetic clinic network feed.
//!
//! Clinics sit on a small grid. Each simulated day an outbreak may start at a
//! random epicenter, and clinics closer to it report more cases. After every
//! day the complete record set so far is re-analysed from scratch.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::analyze;
use crate::config::Thresholds;
use crate::models::{AlertTally, AnalysisResult, ClinicRecord};

pub const CLINIC_NAMES: [&str; 12] = [
    "City General Hospital",
    "Riverside Clinic",
    "Downtown Health Center",
    "Northside Medical",
    "Eastwood Clinic",
    "Westfield Hospital",
    "Central Care Center",
    "Southside Clinic",
    "Highland Medical",
    "Parkview Health",
    "Lakeside Hospital",
    "Metro Health Center",
];

const OUTBREAK_START_CHANCE: f64 = 0.10;
const OUTBREAK_END_CHANCE: f64 = 0.15;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("clinic count must be between 1 and {max}, got {got}")]
    ClinicCount { got: usize, max: usize },

    #[error("outbreak probability must be within 0..=100, got {0}")]
    Probability(u32),
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub clinics: usize,
    /// Percent chance that a candidate outbreak actually starts.
    pub outbreak_probability: u32,
    pub start_date: NaiveDate,
    pub grid_width: i32,
    pub grid_height: i32,
}

impl SimulationConfig {
    pub fn new(clinics: usize, outbreak_probability: u32, start_date: NaiveDate) -> Self {
        Self {
            clinics,
            outbreak_probability,
            start_date,
            grid_width: 10,
            grid_height: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clinic {
    pub name: String,
    pub position: (i32, i32),
}

impl Clinic {
    fn distance_to(&self, other: &Clinic) -> f64 {
        let dx = f64::from(self.position.0 - other.position.0);
        let dy = f64::from(self.position.1 - other.position.1);
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug)]
pub struct FeedTick {
    pub day: u32,
    pub date: NaiveDate,
    pub new_records: usize,
    pub outbreak_epicenter: Option<String>,
    pub result: AnalysisResult,
    /// Alerts dated on this tick's day only, so tallies can be summed
    /// across ticks without counting earlier days twice.
    pub new_alerts: AlertTally,
}

pub struct FeedSimulator {
    rng: StdRng,
    config: SimulationConfig,
    clinics: Vec<Clinic>,
    epicenter: Option<usize>,
    day: u32,
    records: Vec<ClinicRecord>,
}

impl FeedSimulator {
    pub fn new(config: SimulationConfig, seed: Option<u64>) -> Result<Self, SimulationError> {
        let cells = (config.grid_width.max(0) * config.grid_height.max(0)) as usize;
        let max = CLINIC_NAMES.len().min(cells);
        if config.clinics == 0 || config.clinics > max {
            return Err(SimulationError::ClinicCount {
                got: config.clinics,
                max,
            });
        }
        if config.outbreak_probability > 100 {
            return Err(SimulationError::Probability(config.outbreak_probability));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut cells: Vec<(i32, i32)> = (0..config.grid_width)
            .flat_map(|x| (0..config.grid_height).map(move |y| (x, y)))
            .collect();
        cells.shuffle(&mut rng);

        let clinics = CLINIC_NAMES
            .iter()
            .zip(cells)
            .take(config.clinics)
            .map(|(name, position)| Clinic {
                name: name.to_string(),
                position,
            })
            .collect();

        Ok(Self {
            rng,
            config,
            clinics,
            epicenter: None,
            day: 0,
            records: Vec::new(),
        })
    }

    pub fn clinics(&self) -> &[Clinic] {
        &self.clinics
    }

    pub fn records(&self) -> &[ClinicRecord] {
        &self.records
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn outbreak_epicenter(&self) -> Option<&Clinic> {
        self.epicenter.map(|index| &self.clinics[index])
    }

    /// Attempts to start an outbreak. Returns whether one is now active.
    pub fn trigger_outbreak(&mut self) -> bool {
        if self.epicenter.is_some() {
            return true;
        }
        let chance = f64::from(self.config.outbreak_probability) / 100.0;
        if self.rng.gen::<f64>() < chance {
            let index = self.rng.gen_range(0..self.clinics.len());
            info!(epicenter = %self.clinics[index].name, day = self.day, "outbreak started");
            self.epicenter = Some(index);
        }
        self.epicenter.is_some()
    }

    /// Advances one day and returns the records generated for it.
    pub fn step(&mut self) -> &[ClinicRecord] {
        let date = self.config.start_date + Duration::days(i64::from(self.day));
        self.day += 1;

        if self.epicenter.is_none() && self.rng.gen::<f64>() < OUTBREAK_START_CHANCE {
            self.trigger_outbreak();
        }
        if self.epicenter.is_some() && self.rng.gen::<f64>() < OUTBREAK_END_CHANCE {
            debug!(day = self.day, "outbreak ended");
            self.epicenter = None;
        }

        let first_new = self.records.len();
        for index in 0..self.clinics.len() {
            let record = self.generate(index, date);
            self.records.push(record);
        }
        &self.records[first_new..]
    }

    /// Steps one day and re-runs the analysis over everything generated so far.
    pub fn tick(&mut self, thresholds: &Thresholds) -> FeedTick {
        let new_records = self.step().len();
        let date = self.config.start_date + Duration::days(i64::from(self.day) - 1);
        let result = analyze(&self.records, thresholds);

        let todays: Vec<_> = result
            .alerts
            .iter()
            .filter(|alert| alert.date == date)
            .cloned()
            .collect();

        FeedTick {
            day: self.day,
            date,
            new_records,
            outbreak_epicenter: self.outbreak_epicenter().map(|c| c.name.clone()),
            new_alerts: AlertTally::from_alerts(&todays),
            result,
        }
    }

    fn generate(&mut self, index: usize, date: NaiveDate) -> ClinicRecord {
        let daily: u64 = match self.epicenter {
            Some(epicenter) => {
                let distance = self.clinics[index].distance_to(&self.clinics[epicenter]);
                if distance <= 2.0 {
                    self.rng.gen_range(20..=40)
                } else if distance <= 4.0 {
                    self.rng.gen_range(15..=30)
                } else {
                    self.rng.gen_range(10..=20)
                }
            }
            None => self.rng.gen_range(5..=15),
        };

        let fever_and_cough = self.share(daily, 0.6, 0.8);
        let severe = self.share(daily, 0.05, 0.15);
        let remaining = daily - fever_and_cough;

        ClinicRecord {
            date,
            site_id: self.clinics[index].name.clone(),
            total_patients: daily + self.rng.gen_range(0..=10),
            fever_cases: fever_and_cough + remaining / 2,
            cough_cases: fever_and_cough + remaining / 3,
            fever_and_cough_cases: fever_and_cough,
            sore_throat_cases: self.share(daily, 0.1, 0.3),
            body_ache_cases: self.share(daily, 0.05, 0.2),
            headache_cases: self.share(daily, 0.1, 0.25),
            severe_cases: severe,
        }
    }

    fn share(&mut self, daily: u64, low: f64, high: f64) -> u64 {
        (daily as f64 * self.rng.gen_range(low..high)).floor() as u64
    }
}
